//! completion command - Generate shell completion scripts

use std::io::Write;

use anyhow::{bail, Result};
use async_trait::async_trait;
use clap_complete::{generate, shells};

use crate::cli::args::Shell;
use crate::cli::registry::{ArgCount, CommandSpec, Handler, PROGRAM};
use crate::engine::Invocation;

pub fn command() -> CommandSpec {
    CommandSpec::leaf("completion", "Generate shell completion scripts", Completion)
        .long_about(
            "Writes a completion script for the given shell to stdout.\n\n\
             For example, to load completions in the current bash session:\n\n    \
             source <(doctl completion bash)",
        )
        .args(ArgCount::exactly(1), "<bash|zsh|fish|powershell|elvish>")
}

/// Render the completion script for `shell`.
pub fn script(shell: Shell) -> Result<Vec<u8>> {
    let mut cmd = super::registry()?.to_clap();
    let mut out = Vec::new();
    match shell {
        Shell::Bash => generate(shells::Bash, &mut cmd, PROGRAM, &mut out),
        Shell::Zsh => generate(shells::Zsh, &mut cmd, PROGRAM, &mut out),
        Shell::Fish => generate(shells::Fish, &mut cmd, PROGRAM, &mut out),
        Shell::PowerShell => generate(shells::PowerShell, &mut cmd, PROGRAM, &mut out),
        Shell::Elvish => generate(shells::Elvish, &mut cmd, PROGRAM, &mut out),
    }
    Ok(out)
}

struct Completion;

#[async_trait]
impl Handler for Completion {
    async fn run(&self, inv: &mut Invocation) -> Result<()> {
        let name = inv.arg(0).unwrap_or_default();
        let Some(shell) = Shell::parse(name) else {
            bail!(
                "unsupported shell {:?}; expected one of: {}",
                name,
                Shell::names().join(", ")
            );
        };
        let script = script(shell)?;
        inv.out.write_all(&script)?;
        inv.out.flush()?;
        Ok(())
    }
}
