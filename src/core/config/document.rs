//! core::config::document
//!
//! The persisted configuration document.
//!
//! # Format
//!
//! ```yaml
//! access-token: <token for the "default" context>
//! auth-contexts:
//!   <name>: <token>
//! context: <selected context name>
//! <any-other-key>: <passed through untouched>
//! ```
//!
//! # Invariants
//!
//! - Unknown keys survive every edit with their values and position intact.
//! - Keys are addressed as path segments, never as dotted strings, so a
//!   context named `test@example.com` or `a.b` round-trips unchanged.
//! - Writes go to a temporary file that is renamed over the original while
//!   holding [`ConfigLock`]; a failed write leaves the document untouched.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

use serde_yaml::{Mapping, Value};

use super::lock::{ConfigLock, DEFAULT_LOCK_TIMEOUT};
use super::ConfigError;

/// Top-level key holding the default context's token.
pub const ACCESS_TOKEN_KEY: &str = "access-token";
/// Top-level key holding the context → token mapping.
pub const CONTEXTS_KEY: &str = "auth-contexts";
/// Top-level key holding the selected context name.
pub const CONTEXT_KEY: &str = "context";
/// Name of the context whose token lives at the top level.
pub const DEFAULT_CONTEXT: &str = "default";

/// An in-memory copy of the persisted document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    root: Mapping,
}

impl Document {
    /// Load the document at `path`.
    ///
    /// A missing file yields an empty document. A file that exists but
    /// cannot be read is [`ConfigError::Io`]; one that is not a YAML mapping
    /// is [`ConfigError::Parse`].
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match read_text(path)? {
            Some(contents) => Self::parse(&contents, path),
            None => Ok(Self::default()),
        }
    }

    /// Parse document text. `path` is only used in error messages.
    pub fn parse(contents: &str, path: &Path) -> Result<Self, ConfigError> {
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        let value: Value = serde_yaml::from_str(contents).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        match value {
            Value::Mapping(root) => Ok(Self { root }),
            Value::Null => Ok(Self::default()),
            _ => Err(ConfigError::Parse {
                path: path.to_path_buf(),
                message: "top level must be a mapping".to_string(),
            }),
        }
    }

    /// Look up a value by key path.
    pub fn lookup<S: AsRef<str>>(&self, path: &[S]) -> Option<&Value> {
        let (first, rest) = path.split_first()?;
        let mut current = self.root.get(first.as_ref())?;
        for key in rest {
            current = current.as_mapping()?.get(key.as_ref())?;
        }
        Some(current)
    }

    /// Set a value at a key path, creating intermediate mappings.
    ///
    /// An existing key keeps its position; a non-mapping value in the way
    /// of the path is replaced by a mapping.
    pub fn set(&mut self, path: &[&str], value: Value) {
        let Some((last, parents)) = path.split_last() else {
            return;
        };
        let mut current = &mut self.root;
        for key in parents {
            let entry_key = Value::String(key.to_string());
            let needs_map = !matches!(current.get(*key), Some(Value::Mapping(_)));
            if needs_map {
                current.insert(entry_key.clone(), Value::Mapping(Mapping::new()));
            }
            current = match current.get_mut(*key) {
                Some(Value::Mapping(m)) => m,
                _ => return,
            };
        }
        current.insert(Value::String(last.to_string()), value);
    }

    /// Remove the value at a key path, keeping the order of its siblings.
    pub fn remove(&mut self, path: &[&str]) -> Option<Value> {
        let (last, parents) = path.split_last()?;
        let mut current = &mut self.root;
        for key in parents {
            current = current.get_mut(*key)?.as_mapping_mut()?;
        }
        let removed = current.get(*last).cloned()?;
        let kept: Mapping = current
            .iter()
            .filter(|(k, _)| k.as_str() != Some(*last))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        *current = kept;
        Some(removed)
    }

    /// The selected context name, or `default`.
    pub fn current_context(&self) -> &str {
        self.root
            .get(CONTEXT_KEY)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_CONTEXT)
    }

    /// Every known context name, `default` first, then in document order.
    pub fn context_names(&self) -> Vec<String> {
        let mut names = vec![DEFAULT_CONTEXT.to_string()];
        if let Some(Value::Mapping(contexts)) = self.root.get(CONTEXTS_KEY) {
            for key in contexts.keys() {
                if let Some(name) = scalar_to_string(key) {
                    if name != DEFAULT_CONTEXT {
                        names.push(name);
                    }
                }
            }
        }
        names
    }

    /// Whether `name` is a known context.
    pub fn has_context(&self, name: &str) -> bool {
        name == DEFAULT_CONTEXT || self.lookup(&[CONTEXTS_KEY, name]).is_some()
    }

    /// The token stored for a context.
    ///
    /// `default` reads the top-level field; any other name must be present in
    /// the contexts mapping or the lookup fails with
    /// [`ConfigError::ContextMissing`].
    pub fn token_for(&self, context: &str) -> Result<Option<String>, ConfigError> {
        if context.is_empty() || context == DEFAULT_CONTEXT {
            return Ok(self.root.get(ACCESS_TOKEN_KEY).and_then(scalar_to_string));
        }
        match self.lookup(&[CONTEXTS_KEY, context]) {
            Some(value) => Ok(scalar_to_string(value)),
            None => Err(ConfigError::ContextMissing(context.to_string())),
        }
    }

    /// The key path under which a context's token is stored.
    pub fn token_path(context: &str) -> Vec<&str> {
        if context.is_empty() || context == DEFAULT_CONTEXT {
            vec![ACCESS_TOKEN_KEY]
        } else {
            vec![CONTEXTS_KEY, context]
        }
    }

    /// Serialize to YAML text.
    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        if self.root.is_empty() {
            return Ok(String::new());
        }
        serde_yaml::to_string(&self.root).map_err(|e| ConfigError::InvalidValue {
            name: "config".to_string(),
            message: e.to_string(),
        })
    }

    /// Write the document atomically: temp file, sync, rename.
    ///
    /// Callers that modify an existing file should go through [`edit`] so
    /// the write happens under the config lock.
    pub fn write_atomic(&self, path: &Path) -> Result<(), ConfigError> {
        write_text(path, &self.to_yaml()?)
    }
}

fn read_text(path: &Path) -> Result<Option<String>, ConfigError> {
    match fs::read_to_string(path) {
        Ok(contents) => Ok(Some(contents)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "config file not found, using empty document");
            Ok(None)
        }
        Err(e) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

fn write_text(path: &Path, contents: &str) -> Result<(), ConfigError> {
    let write_err = |path: &Path, source: std::io::Error| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| write_err(parent, e))?;
    }

    let temp_path = temp_path_for(path);
    let result = (|| {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)
            .map_err(|e| write_err(&temp_path, e))?;

        #[cfg(unix)]
        file.set_permissions(fs::Permissions::from_mode(0o600))
            .map_err(|e| write_err(&temp_path, e))?;

        file.write_all(contents.as_bytes())
            .map_err(|e| write_err(&temp_path, e))?;
        file.sync_all().map_err(|e| write_err(&temp_path, e))?;
        fs::rename(&temp_path, path).map_err(|e| write_err(path, e))
    })();

    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    result
}

/// Rewrite only the lines of `text` whose top-level scalar changed between
/// `before` and `after`.
///
/// Returns `None` when the change cannot be expressed that way (a removed
/// key, a changed mapping or sequence, unusual layout); the caller then
/// serializes the whole document.
fn patch_in_place(
    text: &str,
    before: &Document,
    after: &Document,
    path: &Path,
) -> Option<String> {
    if before.root.keys().any(|k| !after.root.contains_key(k)) {
        return None;
    }
    let mut patched = text.to_string();
    for (key, value) in &after.root {
        if before.root.get(key) == Some(value) {
            continue;
        }
        patched = replace_top_level_line(&patched, key.as_str()?, value)?;
    }
    match Document::parse(&patched, path) {
        Ok(reparsed) if reparsed == *after => Some(patched),
        _ => {
            tracing::debug!(
                path = %path.display(),
                "in-place edit not possible, rewriting document"
            );
            None
        }
    }
}

/// Replace the `key:` entry at column 0 (and its indented continuation
/// lines) with `key: value`, or append it when absent.
fn replace_top_level_line(text: &str, key: &str, value: &Value) -> Option<String> {
    if value.is_mapping() || value.is_sequence() {
        return None;
    }
    let mut entry = Mapping::new();
    entry.insert(Value::String(key.to_string()), value.clone());
    let line = serde_yaml::to_string(&entry).ok()?;
    if line.lines().count() != 1 {
        return None;
    }

    let lines: Vec<&str> = text.split_inclusive('\n').collect();
    let Some(start) = lines.iter().position(|l| is_entry_for(l, key)) else {
        let mut out = text.to_string();
        if !out.is_empty() && !out.ends_with('\n') {
            out.push('\n');
        }
        out.push_str(&line);
        return Some(out);
    };
    let end = lines[start + 1..]
        .iter()
        .position(|l| !is_continuation(l))
        .map_or(lines.len(), |n| start + 1 + n);

    let mut out = String::with_capacity(text.len() + line.len());
    lines[..start].iter().for_each(|l| out.push_str(l));
    out.push_str(&line);
    lines[end..].iter().for_each(|l| out.push_str(l));
    Some(out)
}

fn is_entry_for(line: &str, key: &str) -> bool {
    [
        format!("{}:", key),
        format!("\"{}\":", key),
        format!("'{}':", key),
    ]
    .iter()
    .any(|prefix| {
        line.strip_prefix(prefix.as_str()).is_some_and(|rest| {
            rest.is_empty() || rest.starts_with([' ', '\t', '\r', '\n'])
        })
    })
}

fn is_continuation(line: &str) -> bool {
    line.starts_with([' ', '\t']) && !line.trim().is_empty()
}

/// Apply `f` to the document at `path` under the config lock and write the
/// result back.
///
/// The document is re-read after the lock is taken so concurrent writers
/// never lose each other's edits. If `f` fails nothing is written. Changed
/// top-level scalars are rewritten in place; every other byte of the file
/// stays as it was.
pub fn edit<F>(path: &Path, f: F) -> Result<Document, ConfigError>
where
    F: FnOnce(&mut Document) -> Result<(), ConfigError>,
{
    let _lock = ConfigLock::acquire(path, DEFAULT_LOCK_TIMEOUT)?;
    let original = read_text(path)?;
    let before = match &original {
        Some(text) => Document::parse(text, path)?,
        None => Document::default(),
    };
    let mut document = before.clone();
    f(&mut document)?;

    let contents = match original
        .as_deref()
        .and_then(|text| patch_in_place(text, &before, &document, path))
    {
        Some(patched) => patched,
        None => document.to_yaml()?,
    };
    write_text(path, &contents)?;
    tracing::debug!(path = %path.display(), "config file written");
    Ok(document)
}

/// Set a single key path in the document at `path`.
pub fn persist(path: &Path, key: &[&str], value: Value) -> Result<(), ConfigError> {
    edit(path, |doc| {
        doc.set(key, value);
        Ok(())
    })
    .map(|_| ())
}

/// [`edit`] on the blocking pool, for callers on the async runtime.
///
/// Waiting for the lock sleeps the calling thread.
pub async fn edit_async<F>(path: PathBuf, f: F) -> Result<Document, ConfigError>
where
    F: FnOnce(&mut Document) -> Result<(), ConfigError> + Send + 'static,
{
    tokio::task::spawn_blocking(move || edit(&path, f))
        .await
        .map_err(|e| ConfigError::Lock(format!("config update task failed: {}", e)))?
}

/// [`persist`] on the blocking pool.
pub async fn persist_async(
    path: PathBuf,
    key: Vec<String>,
    value: Value,
) -> Result<(), ConfigError> {
    edit_async(path, move |doc| {
        let key: Vec<&str> = key.iter().map(String::as_str).collect();
        doc.set(&key, value);
        Ok(())
    })
    .await
    .map(|_| ())
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "config.yaml".into());
    name.push(".tmp");
    path.with_file_name(name)
}

/// Render a scalar YAML value as a string; mappings and sequences yield `None`.
pub fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Tagged(tagged) => scalar_to_string(&tagged.value),
        _ => None,
    }
}
