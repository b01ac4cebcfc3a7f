//! core::config
//!
//! Layered configuration: flags, environment, persisted document, defaults.
//!
//! # Precedence
//!
//! For every setting, the first defined source wins:
//! 1. Explicit command-line flag
//! 2. Environment variable
//! 3. Persisted document
//! 4. Built-in default
//!
//! The access token is the one exception to plain key lookup: its document
//! layer depends on the selected context. `default` reads the top-level
//! `access-token`, any other name reads `auth-contexts.<name>`.
//!
//! # Document Location
//!
//! 1. `--config <path>` if given
//! 2. `<user config dir>/doctl/config.yaml`
//!
//! # Example
//!
//! ```no_run
//! use std::collections::{BTreeMap, HashMap};
//! use doctl::core::config::{settings, Resolver};
//!
//! let resolver = Resolver::new(settings::global_settings());
//! let effective = resolver.resolve(&BTreeMap::new(), &HashMap::new()).unwrap();
//! println!("API: {}", effective.string(settings::API_URL).unwrap_or_default());
//! ```

pub mod document;
pub mod lock;
pub mod settings;

pub use document::Document;
pub use lock::ConfigLock;
pub use settings::{Provided, Scope, SettingKind, SettingSpec, SettingValue, Source};

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use serde_yaml::Value;
use thiserror::Error;

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    Parse { path: PathBuf, message: String },

    #[error("failed to write config file '{path}': {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("context \"{0}\" does not exist")]
    ContextMissing(String),

    #[error("access token is required. (hint: run 'doctl auth init')")]
    MissingToken,

    #[error("invalid value for {name}: {message}")]
    InvalidValue { name: String, message: String },

    #[error("failed to acquire config lock: {0}")]
    Lock(String),

    #[error("timed out waiting for config lock '{0}'")]
    LockTimeout(PathBuf),

    #[error("cannot determine the user configuration directory")]
    NoConfigDir,
}

/// Canonical name of the program, used for the config directory.
pub const APP_NAME: &str = "doctl";

/// Default document location: `<user config dir>/doctl/config.yaml`.
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    let base = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
    Ok(base.join(APP_NAME).join("config.yaml"))
}

#[derive(Debug, Clone)]
struct Resolved {
    value: SettingValue,
    source: Source,
}

/// The effective settings for one invocation.
#[derive(Debug, Clone)]
pub struct Effective {
    values: BTreeMap<String, Resolved>,
    by_flag: HashMap<String, String>,
    document: Document,
    config_path: PathBuf,
}

impl Effective {
    fn canonical<'a>(&'a self, name: &'a str) -> &'a str {
        if self.values.contains_key(name) {
            name
        } else {
            self.by_flag.get(name).map(String::as_str).unwrap_or(name)
        }
    }

    /// Look up a value by canonical name or long flag name.
    pub fn get(&self, name: &str) -> Option<&SettingValue> {
        self.values.get(self.canonical(name)).map(|r| &r.value)
    }

    /// Which source supplied the value.
    pub fn source(&self, name: &str) -> Option<Source> {
        self.values.get(self.canonical(name)).map(|r| r.source)
    }

    /// Whether the value came from an explicit flag.
    pub fn is_explicit(&self, name: &str) -> bool {
        self.source(name) == Some(Source::Flag)
    }

    pub fn string(&self, name: &str) -> Option<String> {
        match self.get(name)? {
            SettingValue::Str(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    pub fn int(&self, name: &str) -> Option<i64> {
        match self.get(name)? {
            SettingValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Boolean value; unset reads as `false`.
    pub fn flag(&self, name: &str) -> bool {
        self.bool(name).unwrap_or(false)
    }

    pub fn bool(&self, name: &str) -> Option<bool> {
        match self.get(name)? {
            SettingValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn list(&self, name: &str) -> Vec<String> {
        match self.get(name) {
            Some(SettingValue::List(items)) => items.clone(),
            Some(SettingValue::Str(s)) => split_list(s),
            _ => Vec::new(),
        }
    }

    /// The document this invocation was resolved against.
    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// The selected context name.
    pub fn context_name(&self) -> String {
        self.string(settings::CONTEXT)
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| document::DEFAULT_CONTEXT.to_string())
    }

    /// Resolve the bearer token.
    ///
    /// An explicit flag or environment token wins. Otherwise the token of the
    /// selected context is read from the document; a named context that does
    /// not exist is [`ConfigError::ContextMissing`].
    pub fn access_token(&self) -> Result<String, ConfigError> {
        if let Some(token) = self.string(settings::ACCESS_TOKEN).filter(|t| !t.is_empty()) {
            return Ok(token);
        }
        self.document
            .token_for(&self.context_name())?
            .filter(|t| !t.is_empty())
            .ok_or(ConfigError::MissingToken)
    }
}

/// Resolves effective settings from a set of declarations.
#[derive(Debug, Clone)]
pub struct Resolver {
    specs: Vec<SettingSpec>,
}

impl Resolver {
    pub fn new(specs: Vec<SettingSpec>) -> Self {
        Self { specs }
    }

    pub fn specs(&self) -> &[SettingSpec] {
        &self.specs
    }

    /// Produce the effective settings.
    ///
    /// `flags` is keyed by canonical name; `env` is a snapshot of the process
    /// environment. Missing optional settings are not an error.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::Parse`] / [`ConfigError::Io`] if the document exists but is unusable
    /// - [`ConfigError::InvalidValue`] if an environment or document value has the wrong type
    pub fn resolve(
        &self,
        flags: &BTreeMap<String, Provided<SettingValue>>,
        env: &HashMap<String, String>,
    ) -> Result<Effective, ConfigError> {
        let config_path = match flags.get(settings::CONFIG_PATH) {
            Some(Provided::Explicit(SettingValue::Str(p))) if !p.is_empty() => PathBuf::from(p),
            _ => default_config_path()?,
        };
        let document = Document::load(&config_path)?;
        self.resolve_with_document(flags, env, document, config_path)
    }

    /// Same as [`Resolver::resolve`] against an already loaded document.
    pub fn resolve_with_document(
        &self,
        flags: &BTreeMap<String, Provided<SettingValue>>,
        env: &HashMap<String, String>,
        document: Document,
        config_path: PathBuf,
    ) -> Result<Effective, ConfigError> {
        let mut values = BTreeMap::new();
        let mut by_flag = HashMap::new();

        for spec in &self.specs {
            by_flag.insert(spec.long.to_string(), spec.canonical.clone());

            let resolved = if let Some(Provided::Explicit(value)) = flags.get(&spec.canonical) {
                Some(Resolved {
                    value: value.clone(),
                    source: Source::Flag,
                })
            } else if let Some(raw) = spec.env.and_then(|var| env.get(var)) {
                Some(Resolved {
                    value: parse_env_value(spec, raw)?,
                    source: Source::Env,
                })
            } else if let Some(raw) = lookup_document(&document, spec) {
                Some(Resolved {
                    value: document_value(spec, raw)?,
                    source: Source::Document,
                })
            } else {
                spec.default.clone().map(|value| Resolved {
                    value,
                    source: Source::Default,
                })
            };

            if let Some(resolved) = resolved {
                tracing::trace!(
                    setting = %spec.canonical,
                    source = %resolved.source,
                    "resolved setting"
                );
                values.insert(spec.canonical.clone(), resolved);
            }
        }

        Ok(Effective {
            values,
            by_flag,
            document,
            config_path,
        })
    }
}

fn lookup_document<'a>(document: &'a Document, spec: &SettingSpec) -> Option<&'a Value> {
    if spec.doc_path.is_empty() {
        return None;
    }
    document.lookup(&spec.doc_path).filter(|v| !v.is_null())
}

fn invalid(spec: &SettingSpec, message: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        name: spec.canonical.clone(),
        message: message.into(),
    }
}

/// Parse an environment string according to the setting's kind.
pub fn parse_env_value(spec: &SettingSpec, raw: &str) -> Result<SettingValue, ConfigError> {
    match spec.kind {
        SettingKind::Str => Ok(SettingValue::Str(raw.to_string())),
        SettingKind::Int => raw
            .trim()
            .parse::<i64>()
            .map(SettingValue::Int)
            .map_err(|_| invalid(spec, format!("expected an integer, got {:?}", raw))),
        SettingKind::Bool => parse_bool(raw)
            .map(SettingValue::Bool)
            .ok_or_else(|| invalid(spec, format!("expected a boolean, got {:?}", raw))),
        SettingKind::List => Ok(SettingValue::List(split_list(raw))),
    }
}

fn document_value(spec: &SettingSpec, raw: &Value) -> Result<SettingValue, ConfigError> {
    match (spec.kind, raw) {
        (SettingKind::Str, other) => document::scalar_to_string(other)
            .map(SettingValue::Str)
            .ok_or_else(|| invalid(spec, "expected a scalar value")),
        (SettingKind::Int, Value::Number(n)) => n
            .as_i64()
            .map(SettingValue::Int)
            .ok_or_else(|| invalid(spec, format!("expected an integer, got {}", n))),
        (SettingKind::Bool, Value::Bool(b)) => Ok(SettingValue::Bool(*b)),
        (SettingKind::List, Value::Sequence(items)) => Ok(SettingValue::List(
            items.iter().filter_map(document::scalar_to_string).collect(),
        )),
        (_, Value::String(s)) => parse_env_value(spec, s),
        _ => Err(invalid(spec, "value has the wrong type")),
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use settings::{global_settings, ACCESS_TOKEN, API_URL, CONTEXT, HTTP_RETRY_MAX, TRACE};

    fn resolver() -> Resolver {
        let mut specs = global_settings();
        for spec in &mut specs {
            spec.bind(&[]);
        }
        Resolver::new(specs)
    }

    fn doc(yaml: &str) -> Document {
        Document::parse(yaml, Path::new("config.yaml")).unwrap()
    }

    fn resolve(
        flags: &[(&str, SettingValue)],
        env: &[(&str, &str)],
        document: Document,
    ) -> Result<Effective, ConfigError> {
        let flags = flags
            .iter()
            .map(|(k, v)| (k.to_string(), Provided::Explicit(v.clone())))
            .collect();
        let env = env
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        resolver().resolve_with_document(&flags, &env, document, PathBuf::from("config.yaml"))
    }

    #[test]
    fn defaults_apply_when_nothing_set() {
        let eff = resolve(&[], &[], Document::default()).unwrap();
        assert_eq!(eff.string(API_URL).as_deref(), Some(settings::DEFAULT_API_URL));
        assert_eq!(eff.int(HTTP_RETRY_MAX), Some(5));
        assert!(!eff.flag(TRACE));
        assert_eq!(eff.source(API_URL), Some(Source::Default));
        assert!(eff.get(settings::TEMPLATE).is_none());
    }

    #[test]
    fn flag_beats_env_beats_document() {
        let document = doc("api-url: http://doc\n");
        let env = [("DIGITALOCEAN_API_URL", "http://env")];

        let eff = resolve(&[], &[], document.clone()).unwrap();
        assert_eq!(eff.string(API_URL).as_deref(), Some("http://doc"));
        assert_eq!(eff.source(API_URL), Some(Source::Document));

        let eff = resolve(&[], &env, document.clone()).unwrap();
        assert_eq!(eff.string(API_URL).as_deref(), Some("http://env"));

        let eff = resolve(
            &[(API_URL, SettingValue::Str("http://flag".into()))],
            &env,
            document,
        )
        .unwrap();
        assert_eq!(eff.string(API_URL).as_deref(), Some("http://flag"));
        assert_eq!(eff.source(API_URL), Some(Source::Flag));
    }

    #[test]
    fn explicit_false_flag_beats_true_document() {
        let eff = resolve(
            &[(TRACE, SettingValue::Bool(false))],
            &[],
            doc("trace: true\n"),
        )
        .unwrap();
        assert_eq!(eff.bool(TRACE), Some(false));
        assert!(eff.is_explicit(TRACE));
    }

    #[test]
    fn lookup_by_flag_name() {
        let eff = resolve(&[], &[], Document::default()).unwrap();
        assert_eq!(eff.int("http-retry-max"), Some(5));
    }

    #[test]
    fn document_integer_is_typed() {
        let eff = resolve(&[], &[], doc("http-retry-max: 0\n")).unwrap();
        assert_eq!(eff.int(HTTP_RETRY_MAX), Some(0));
    }

    #[test]
    fn bad_env_integer_is_rejected() {
        let mut spec = SettingSpec::int("retries").env("RETRIES");
        spec.bind(&[]);
        let err = parse_env_value(&spec, "many").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn env_booleans() {
        let mut spec = SettingSpec::bool("x");
        spec.bind(&[]);
        assert_eq!(parse_env_value(&spec, "1").unwrap(), SettingValue::Bool(true));
        assert_eq!(parse_env_value(&spec, "no").unwrap(), SettingValue::Bool(false));
        assert!(parse_env_value(&spec, "maybe").is_err());
    }

    #[test]
    fn default_context_reads_top_level_token() {
        let eff = resolve(&[], &[], doc("access-token: first\n")).unwrap();
        assert_eq!(eff.access_token().unwrap(), "first");
    }

    #[test]
    fn named_context_reads_mapping() {
        let document = doc("access-token: first\nauth-contexts:\n  next: second\ncontext: next\n");
        let eff = resolve(&[], &[], document).unwrap();
        assert_eq!(eff.context_name(), "next");
        assert_eq!(eff.access_token().unwrap(), "second");
    }

    #[test]
    fn context_flag_overrides_document_selection() {
        let document = doc("access-token: first\nauth-contexts:\n  next: second\ncontext: next\n");
        let eff = resolve(
            &[(CONTEXT, SettingValue::Str("default".into()))],
            &[],
            document,
        )
        .unwrap();
        assert_eq!(eff.access_token().unwrap(), "first");
    }

    #[test]
    fn missing_context_is_config_error() {
        let eff = resolve(
            &[(CONTEXT, SettingValue::Str("ghost".into()))],
            &[],
            doc("access-token: first\n"),
        )
        .unwrap();
        assert!(matches!(
            eff.access_token(),
            Err(ConfigError::ContextMissing(name)) if name == "ghost"
        ));
    }

    #[test]
    fn explicit_token_skips_context_lookup() {
        let eff = resolve(
            &[
                (ACCESS_TOKEN, SettingValue::Str("flag-token".into())),
                (CONTEXT, SettingValue::Str("ghost".into())),
            ],
            &[],
            Document::default(),
        )
        .unwrap();
        assert_eq!(eff.access_token().unwrap(), "flag-token");
    }

    #[test]
    fn no_token_anywhere() {
        let eff = resolve(&[], &[], Document::default()).unwrap();
        assert!(matches!(eff.access_token(), Err(ConfigError::MissingToken)));
    }

    #[test]
    fn resolving_twice_is_stable() {
        let document = doc("api-url: http://doc\n");
        let a = resolve(&[], &[("DIGITALOCEAN_API_URL", "http://env")], document.clone()).unwrap();
        let b = resolve(&[], &[("DIGITALOCEAN_API_URL", "http://env")], document).unwrap();
        assert_eq!(a.string(API_URL), b.string(API_URL));
        assert_eq!(a.source(API_URL), b.source(API_URL));
    }

    #[test]
    fn list_from_string_value() {
        assert_eq!(split_list("ID, Name,,Status"), vec!["ID", "Name", "Status"]);
    }
}
