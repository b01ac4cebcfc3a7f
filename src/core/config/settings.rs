//! core::config::settings
//!
//! Setting declarations and typed values.
//!
//! # Design
//!
//! A [`SettingSpec`] describes one named value: its canonical dotted name, the
//! flag forms that set it, an optional environment variable, and the key under
//! which the persisted document may carry it. The same declaration drives the
//! command-line parser and the resolver, so the two can never disagree about
//! what a flag means.
//!
//! Command-line presence is tracked with [`Provided`], which distinguishes a
//! flag that was never given from one explicitly set to its zero value.

use std::fmt;

use serde::Serialize;

/// Access token used as the bearer credential.
pub const ACCESS_TOKEN: &str = "auth.access-token";
/// Selected authentication context.
pub const CONTEXT: &str = "auth.context";
/// Base URL of the API.
pub const API_URL: &str = "api.url";
/// Location of the persisted document.
pub const CONFIG_PATH: &str = "config.path";
/// Maximum number of retries for transient failures.
pub const HTTP_RETRY_MAX: &str = "http.retry-max";
/// Per-request deadline in seconds.
pub const HTTP_TIMEOUT: &str = "http.timeout";
/// Transport tracing switch.
pub const TRACE: &str = "trace";
/// Output type (`text` or `json`).
pub const OUTPUT: &str = "output.type";
/// Comma-separated column selection.
pub const FORMAT: &str = "output.format";
/// Header suppression switch.
pub const NO_HEADER: &str = "output.no-header";
/// Template applied to each rendered record.
pub const TEMPLATE: &str = "output.template";
/// Whether prompts may be shown.
pub const INTERACTIVE: &str = "interactive";

/// Default API endpoint.
pub const DEFAULT_API_URL: &str = "https://api.digitalocean.com";

/// Default number of retries for transient failures.
pub const DEFAULT_RETRY_MAX: i64 = 5;

/// The shape of a setting's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingKind {
    Str,
    Int,
    Bool,
    List,
}

/// A typed setting value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum SettingValue {
    Str(String),
    Int(i64),
    Bool(bool),
    List(Vec<String>),
}

impl SettingValue {
    /// The kind of this value.
    pub fn kind(&self) -> SettingKind {
        match self {
            SettingValue::Str(_) => SettingKind::Str,
            SettingValue::Int(_) => SettingKind::Int,
            SettingValue::Bool(_) => SettingKind::Bool,
            SettingValue::List(_) => SettingKind::List,
        }
    }
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingValue::Str(s) => write!(f, "{}", s),
            SettingValue::Int(i) => write!(f, "{}", i),
            SettingValue::Bool(b) => write!(f, "{}", b),
            SettingValue::List(items) => write!(f, "{}", items.join(",")),
        }
    }
}

/// A value as seen on the command line.
///
/// `Unset` means the flag did not appear at all, which is different from a
/// flag explicitly given as `false`, `0`, or the empty string.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Provided<T> {
    #[default]
    Unset,
    Explicit(T),
}

impl<T> Provided<T> {
    /// Returns the explicit value, if any.
    pub fn explicit(self) -> Option<T> {
        match self {
            Provided::Unset => None,
            Provided::Explicit(v) => Some(v),
        }
    }

    /// Borrowing variant of [`Provided::explicit`].
    pub fn as_ref(&self) -> Provided<&T> {
        match self {
            Provided::Unset => Provided::Unset,
            Provided::Explicit(v) => Provided::Explicit(v),
        }
    }

    pub fn is_set(&self) -> bool {
        matches!(self, Provided::Explicit(_))
    }
}

impl<T> From<Option<T>> for Provided<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => Provided::Explicit(v),
            None => Provided::Unset,
        }
    }
}

/// Where an effective value came from, highest precedence first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Source {
    Flag,
    Env,
    Document,
    Default,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Flag => write!(f, "flag"),
            Source::Env => write!(f, "environment"),
            Source::Document => write!(f, "config file"),
            Source::Default => write!(f, "default"),
        }
    }
}

/// Whether a setting belongs to the whole program or a single command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Global,
    Local,
}

/// Declaration of one setting and the flag that sets it.
#[derive(Debug, Clone)]
pub struct SettingSpec {
    /// Dotted canonical name. Filled from the command path when not given.
    pub canonical: String,
    /// Long flag name (`--<long>`).
    pub long: &'static str,
    /// Optional short flag (`-<short>`).
    pub short: Option<char>,
    /// Environment variable consulted when the flag is absent.
    pub env: Option<&'static str>,
    pub kind: SettingKind,
    pub default: Option<SettingValue>,
    pub help: &'static str,
    pub scope: Scope,
    /// Key path inside the persisted document. Empty means the document is
    /// never consulted for this setting.
    pub doc_path: Vec<String>,
    /// Propagates to every descendant of the declaring command.
    pub persistent: bool,
    pub hidden: bool,
    explicit_doc_path: bool,
}

impl SettingSpec {
    /// Declare a setting of the given kind, set by `--<long>`.
    pub fn new(long: &'static str, kind: SettingKind) -> Self {
        Self {
            canonical: String::new(),
            long,
            short: None,
            env: None,
            kind,
            default: None,
            help: "",
            scope: Scope::Local,
            doc_path: Vec::new(),
            persistent: false,
            hidden: false,
            explicit_doc_path: false,
        }
    }

    pub fn string(long: &'static str) -> Self {
        Self::new(long, SettingKind::Str)
    }

    pub fn int(long: &'static str) -> Self {
        Self::new(long, SettingKind::Int)
    }

    pub fn bool(long: &'static str) -> Self {
        Self::new(long, SettingKind::Bool)
    }

    pub fn list(long: &'static str) -> Self {
        Self::new(long, SettingKind::List)
    }

    pub fn short(mut self, short: char) -> Self {
        self.short = Some(short);
        self
    }

    pub fn env(mut self, var: &'static str) -> Self {
        self.env = Some(var);
        self
    }

    pub fn help(mut self, help: &'static str) -> Self {
        self.help = help;
        self
    }

    pub fn default_value(mut self, value: SettingValue) -> Self {
        self.default = Some(value);
        self
    }

    pub fn default_str(self, value: &str) -> Self {
        self.default_value(SettingValue::Str(value.to_string()))
    }

    pub fn default_int(self, value: i64) -> Self {
        self.default_value(SettingValue::Int(value))
    }

    pub fn default_bool(self, value: bool) -> Self {
        self.default_value(SettingValue::Bool(value))
    }

    /// Mark as a program-wide setting with a fixed canonical name.
    pub fn global(mut self, canonical: &str) -> Self {
        self.canonical = canonical.to_string();
        self.scope = Scope::Global;
        self.persistent = true;
        self
    }

    /// Override the document key path.
    pub fn doc_key(mut self, path: &[&str]) -> Self {
        self.doc_path = path.iter().map(|s| s.to_string()).collect();
        self.explicit_doc_path = true;
        self
    }

    /// Keep this setting out of the persisted document.
    pub fn no_doc(self) -> Self {
        self.doc_key(&[])
    }

    /// Inherit this flag into every subcommand of the declaring command.
    pub fn persistent(mut self) -> Self {
        self.persistent = true;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    /// Fill in the canonical name and document path from the declaring
    /// command's path (`["compute", "action", "wait"]`).
    pub fn bind(&mut self, command_path: &[&str]) {
        if self.canonical.is_empty() {
            let mut parts: Vec<&str> = command_path.to_vec();
            parts.push(self.long);
            self.canonical = parts.join(".");
        }
        if !self.explicit_doc_path {
            self.doc_path = match self.scope {
                Scope::Global => vec![self.long.to_string()],
                Scope::Local => command_path
                    .iter()
                    .map(|s| s.to_string())
                    .chain(std::iter::once(self.long.to_string()))
                    .collect(),
            };
        }
    }
}

/// The settings every command inherits from the root.
pub fn global_settings() -> Vec<SettingSpec> {
    vec![
        SettingSpec::string("access-token")
            .short('t')
            .env("DIGITALOCEAN_ACCESS_TOKEN")
            .help("API V2 access token")
            .global(ACCESS_TOKEN)
            .no_doc(),
        SettingSpec::string("context")
            .env("DIGITALOCEAN_CONTEXT")
            .help("Specify a custom authentication context name")
            .global(CONTEXT),
        SettingSpec::string("api-url")
            .short('u')
            .env("DIGITALOCEAN_API_URL")
            .help("Override default API endpoint")
            .default_str(DEFAULT_API_URL)
            .global(API_URL),
        SettingSpec::string("config")
            .short('c')
            .help("Specify a custom config file")
            .global(CONFIG_PATH)
            .no_doc(),
        SettingSpec::int("http-retry-max")
            .help(
                "Set maximum number of retries for requests that fail with a 5xx error; \
                 0 disables retries",
            )
            .default_int(DEFAULT_RETRY_MAX)
            .global(HTTP_RETRY_MAX),
        SettingSpec::int("http-timeout")
            .help("Per-request deadline in seconds; unset means no deadline")
            .global(HTTP_TIMEOUT),
        SettingSpec::bool("trace")
            .help("Show a log of network activity while performing a command")
            .default_bool(false)
            .global(TRACE),
        SettingSpec::string("output")
            .short('o')
            .help("Desired output format [text|json]")
            .default_str("text")
            .global(OUTPUT),
        SettingSpec::list("format")
            .help("Columns for output in a comma-separated list")
            .global(FORMAT)
            .no_doc(),
        SettingSpec::bool("no-header")
            .help("Return raw data with no headers")
            .default_bool(false)
            .global(NO_HEADER)
            .no_doc(),
        SettingSpec::string("template")
            .help("Go template format applied to each record")
            .global(TEMPLATE)
            .no_doc(),
        SettingSpec::bool("interactive")
            .help("Enable interactive behavior; defaults to true when stdin is a terminal")
            .global(INTERACTIVE),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_local_setting_uses_command_path() {
        let mut spec = SettingSpec::int("poll-timeout");
        spec.bind(&["compute", "action", "wait"]);
        assert_eq!(spec.canonical, "compute.action.wait.poll-timeout");
        assert_eq!(
            spec.doc_path,
            vec!["compute", "action", "wait", "poll-timeout"]
        );
    }

    #[test]
    fn bind_global_setting_keeps_canonical_name() {
        let mut spec = SettingSpec::string("api-url").global(API_URL);
        spec.bind(&[]);
        assert_eq!(spec.canonical, API_URL);
        assert_eq!(spec.doc_path, vec!["api-url"]);
    }

    #[test]
    fn no_doc_survives_binding() {
        let mut spec = SettingSpec::string("config").global(CONFIG_PATH).no_doc();
        spec.bind(&[]);
        assert!(spec.doc_path.is_empty());
    }

    #[test]
    fn global_catalogue_has_unique_flags() {
        let specs = global_settings();
        let mut longs: Vec<_> = specs.iter().map(|s| s.long).collect();
        longs.sort();
        longs.dedup();
        assert_eq!(longs.len(), specs.len());

        let mut shorts: Vec<_> = specs.iter().filter_map(|s| s.short).collect();
        let count = shorts.len();
        shorts.sort();
        shorts.dedup();
        assert_eq!(shorts.len(), count);
    }

    #[test]
    fn provided_distinguishes_unset_from_false() {
        let unset: Provided<bool> = None.into();
        let explicit: Provided<bool> = Some(false).into();
        assert!(!unset.is_set());
        assert!(explicit.is_set());
        assert_eq!(explicit.explicit(), Some(false));
    }

    #[test]
    fn source_order_is_precedence() {
        assert!(Source::Flag < Source::Env);
        assert!(Source::Env < Source::Document);
        assert!(Source::Document < Source::Default);
    }
}
