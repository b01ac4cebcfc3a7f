//! version command - Show the program version

use std::io::Write;

use anyhow::Result;
use async_trait::async_trait;

use crate::cli::registry::{CommandSpec, Handler};
use crate::engine::Invocation;

pub fn command() -> CommandSpec {
    CommandSpec::leaf("version", "Show the current version", Version)
}

/// `doctl version <semver>`
pub fn version_line() -> String {
    format!("doctl version {}", env!("CARGO_PKG_VERSION"))
}

struct Version;

#[async_trait]
impl Handler for Version {
    async fn run(&self, inv: &mut Invocation) -> Result<()> {
        writeln!(inv.out, "{}", version_line())?;
        Ok(())
    }
}
