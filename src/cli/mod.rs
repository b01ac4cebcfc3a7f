//! cli
//!
//! Command-line interface layer.
//!
//! # Responsibilities
//!
//! - Build the command tree once at start-up
//! - Parse arguments and resolve settings for the selected command
//! - Run the handler and turn its result into an exit status
//!
//! # Architecture
//!
//! [`registry`] holds the immutable descriptor tree, [`dispatch`] runs one
//! invocation against it, and [`commands`] declares the built-in commands.
//! Handlers receive an [`crate::engine::Invocation`]; they never read the
//! process environment or global state.

pub mod args;
pub mod commands;
pub mod dispatch;
pub mod registry;

pub use args::Shell;
pub use dispatch::{execute, UsageError};
pub use registry::{ArgCount, CommandSpec, Handler, Registry, RegistryError};

use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use crate::api::client::HTTP_TARGET;
use crate::engine::{cancel, Io};

/// Install the tracing subscriber. `RUST_LOG` overrides the default `warn`
/// filter; `trace` additionally enables per-attempt HTTP records.
///
/// Only the first call in a process has any effect.
pub fn init_tracing(trace: bool) {
    let mut filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    if trace {
        if let Ok(directive) = format!("{}=trace", HTTP_TARGET).parse() {
            filter = filter.add_directive(directive);
        }
    }
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .with_target(false)
        .try_init();
}

/// Run the CLI application and return the process exit status.
///
/// This is the main entry point called from `main.rs`.
pub async fn run() -> u8 {
    let registry = match commands::registry() {
        Ok(registry) => registry,
        Err(e) => {
            eprintln!("Error: {}", e);
            return dispatch::EXIT_FAILURE;
        }
    };

    let token = CancellationToken::new();
    cancel::install(token.clone());

    let env = args::env_snapshot();
    let work = execute(&registry, args::argv(), &env, Io::stdio(), token.clone());
    tokio::pin!(work);

    tokio::select! {
        code = &mut work => code,
        _ = token.cancelled() => {
            // Give the command a moment to wind down cleanly.
            match tokio::time::timeout(cancel::GRACE_PERIOD, &mut work).await {
                Ok(0) => 0,
                _ => cancel::EXIT_CANCELLED,
            }
        }
    }
}
