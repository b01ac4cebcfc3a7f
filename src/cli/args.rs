//! cli::args
//!
//! Process inputs and small argument types shared by commands.
//!
//! The dispatcher never reads the process environment itself; [`argv`] and
//! [`env_snapshot`] are taken once in `run` and passed down, so tests can
//! drive the dispatcher with synthetic inputs.

use std::collections::HashMap;

use clap::ValueEnum;

/// Command-line arguments, including the program name.
pub fn argv() -> Vec<String> {
    std::env::args().collect()
}

/// A copy of the process environment.
pub fn env_snapshot() -> HashMap<String, String> {
    std::env::vars().collect()
}

/// Supported shells for completion
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    #[value(name = "powershell")]
    PowerShell,
    Elvish,
}

impl Shell {
    /// Parse a shell name, ignoring case.
    pub fn parse(name: &str) -> Option<Self> {
        <Self as ValueEnum>::from_str(name, true).ok()
    }

    /// Accepted names, for error messages.
    pub fn names() -> Vec<String> {
        Self::value_variants()
            .iter()
            .filter_map(|s| s.to_possible_value())
            .map(|v| v.get_name().to_string())
            .collect()
    }
}
