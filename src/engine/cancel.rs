//! engine::cancel
//!
//! Process-wide interrupt handling.
//!
//! SIGINT and SIGTERM cancel a shared token. Handlers observe it at every
//! network wait; the binary then exits with [`EXIT_CANCELLED`] unless the
//! command finished cleanly within [`GRACE_PERIOD`].

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::OperationError;
use crate::api::ApiError;

/// Exit status after an interrupt.
pub const EXIT_CANCELLED: u8 = 130;

/// How long a cancelled invocation may take to wind down.
pub const GRACE_PERIOD: Duration = Duration::from_secs(1);

/// Spawn a task that cancels `token` on SIGINT or SIGTERM.
///
/// Must be called from within a Tokio runtime.
pub fn install(token: CancellationToken) {
    tokio::spawn(async move {
        wait_for_signal().await;
        tracing::debug!("interrupt received, cancelling");
        token.cancel();
    });
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut term) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = term.recv() => {}
            }
        }
        Err(e) => {
            tracing::warn!("failed to install SIGTERM handler: {}", e);
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

/// Whether an error is the result of cancellation.
pub fn is_cancelled(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        if let Some(e) = cause.downcast_ref::<ApiError>() {
            return e.is_cancelled();
        }
        if let Some(e) = cause.downcast_ref::<OperationError>() {
            return e.is_cancelled();
        }
        false
    })
}
