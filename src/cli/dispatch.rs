//! cli::dispatch
//!
//! Runs one invocation against the command tree.
//!
//! # Design
//!
//! The dispatcher owns every step between argv and the handler:
//! 1. Parse with clap. Help and version short-circuit with exit 0.
//! 2. Walk the matches down to the selected command.
//! 3. Collect the flags that were given on the command line.
//! 4. Resolve settings (flag, environment, document, default).
//! 5. Check positional argument counts.
//! 6. Ask for confirmation on destructive commands.
//! 7. Run the handler and map its result to an exit code.
//!
//! Errors are printed once, here, as `Error: <chain>`.

use std::collections::{BTreeMap, HashMap};
use std::io::Write;

use clap::error::ErrorKind;
use clap::parser::ValueSource;
use clap::ArgMatches;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use super::registry::{Registry, FORCE, POSITIONAL};
use crate::core::config::{settings, Provided, Resolver, SettingKind, SettingSpec, SettingValue};
use crate::engine::{cancel, Invocation, Io};
use crate::ui::prompts::PromptError;

/// Exit status for any failure other than cancellation.
pub const EXIT_FAILURE: u8 = 1;

/// Errors in how a command was invoked.
#[derive(Debug, Error)]
pub enum UsageError {
    #[error("({command}) command is missing required arguments")]
    MissingArgs { command: String },

    #[error("({command}) command contains too many arguments")]
    TooManyArgs { command: String },

    #[error("operation aborted")]
    Aborted,

    #[error("invalid value for --{flag}: {message}")]
    InvalidFlag { flag: String, message: String },

    #[error("{0}")]
    Parse(String),
}

fn report(err: &mut dyn Write, message: impl std::fmt::Display) {
    let _ = writeln!(err, "Error: {}", message);
    let _ = err.flush();
}

/// Run `argv` (including the program name) and return the exit status.
pub async fn execute(
    registry: &Registry,
    argv: Vec<String>,
    env: &HashMap<String, String>,
    mut io: Io,
    cancel: CancellationToken,
) -> u8 {
    let matches = match registry.to_clap().try_get_matches_from(&argv) {
        Ok(matches) => matches,
        Err(e) => return parse_failure(e, &mut io),
    };

    let mut id = 0;
    let mut leaf = &matches;
    while let Some((name, sub)) = leaf.subcommand() {
        match registry.find_child(id, name) {
            Some(child) => {
                id = child;
                leaf = sub;
            }
            None => break,
        }
    }
    let command = registry.get(id);
    let dotted = registry.dotted(id);

    let specs = registry.settings_for(id);
    let flags = provided_flags(leaf, &specs);
    let resolver = Resolver::new(specs);
    let effective = match resolver.resolve(&flags, env) {
        Ok(effective) => effective,
        Err(e) => {
            report(&mut *io.err, e);
            return EXIT_FAILURE;
        }
    };
    super::init_tracing(effective.flag(settings::TRACE));
    tracing::debug!(command = %dotted, "dispatching");

    let Some(handler) = command.handler.clone() else {
        let _ = write!(io.out, "{}", registry.help_for(id));
        let _ = io.out.flush();
        return 0;
    };

    let args: Vec<String> = leaf
        .try_get_many::<String>(POSITIONAL)
        .ok()
        .flatten()
        .map(|values| values.cloned().collect())
        .unwrap_or_default();
    if let Err(e) = check_arg_count(&dotted, args.len(), command.args.min, command.args.max) {
        report(&mut *io.err, e);
        return EXIT_FAILURE;
    }

    let mut inv = Invocation::new(dotted, args, effective, io, cancel.clone());

    if let Some(action) = command.destructive {
        if let Err(e) = confirm(&mut inv, action) {
            report(&mut *inv.err, format!("{:#}", e));
            return EXIT_FAILURE;
        }
    }

    match handler.run(&mut inv).await {
        Ok(()) => 0,
        Err(e) if cancel.is_cancelled() || cancel::is_cancelled(&e) => {
            tracing::debug!("command cancelled: {:#}", e);
            cancel::EXIT_CANCELLED
        }
        Err(e) => {
            report(&mut *inv.err, format!("{:#}", e));
            EXIT_FAILURE
        }
    }
}

fn parse_failure(e: clap::Error, io: &mut Io) -> u8 {
    match e.kind() {
        ErrorKind::DisplayHelp
        | ErrorKind::DisplayVersion
        | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
            let _ = write!(io.out, "{}", e.render());
            let _ = io.out.flush();
            0
        }
        _ => {
            let rendered = e.render().to_string();
            let first = rendered.lines().next().unwrap_or_default();
            let message = first.strip_prefix("error: ").unwrap_or(first);
            report(&mut *io.err, UsageError::Parse(message.to_string()));
            EXIT_FAILURE
        }
    }
}

/// Flags given on the command line, keyed by canonical name.
fn provided_flags(
    matches: &ArgMatches,
    specs: &[SettingSpec],
) -> BTreeMap<String, Provided<SettingValue>> {
    let mut flags = BTreeMap::new();
    for spec in specs {
        let id = spec.canonical.as_str();
        let given = matches!(matches.try_contains_id(id), Ok(true))
            && matches.value_source(id) == Some(ValueSource::CommandLine);
        if !given {
            continue;
        }
        let value = match spec.kind {
            SettingKind::Bool => matches
                .try_get_one::<bool>(id)
                .ok()
                .flatten()
                .map(|b| SettingValue::Bool(*b)),
            SettingKind::Int => matches
                .try_get_one::<i64>(id)
                .ok()
                .flatten()
                .map(|i| SettingValue::Int(*i)),
            SettingKind::Str => matches
                .try_get_one::<String>(id)
                .ok()
                .flatten()
                .map(|s| SettingValue::Str(s.clone())),
            SettingKind::List => matches
                .try_get_many::<String>(id)
                .ok()
                .flatten()
                .map(|values| SettingValue::List(values.cloned().collect())),
        };
        flags.insert(spec.canonical.clone(), value.into());
    }
    flags
}

/// Positional count check, done before any handler runs.
pub fn check_arg_count(
    command: &str,
    given: usize,
    min: usize,
    max: Option<usize>,
) -> Result<(), UsageError> {
    if given < min {
        return Err(UsageError::MissingArgs {
            command: command.to_string(),
        });
    }
    if max.is_some_and(|max| given > max) {
        return Err(UsageError::TooManyArgs {
            command: command.to_string(),
        });
    }
    Ok(())
}

fn confirm(inv: &mut Invocation, action: &str) -> anyhow::Result<()> {
    if inv.settings.flag(FORCE) {
        return Ok(());
    }
    if !inv.interactive() {
        return Err(UsageError::Aborted.into());
    }
    match inv.interaction.confirm(action) {
        Ok(true) => Ok(()),
        Ok(false) | Err(PromptError::Cancelled) => Err(UsageError::Aborted.into()),
        Err(e) => Err(e.into()),
    }
}
