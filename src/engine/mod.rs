//! engine
//!
//! Runs one command invocation and the long-running work it may start.
//!
//! # Modules
//!
//! - [`context`] - The [`Invocation`] handed to every handler
//! - [`poll`] - Action polling until a terminal state
//! - [`stream`] - Copying live-log URLs to stdout
//! - [`cancel`] - SIGINT/SIGTERM handling
//!
//! # Invariants
//!
//! - Polls are strictly sequential; a new poll is issued only after the
//!   previous response or error has been observed
//! - Once an action is seen in a terminal state, polling stops
//! - Cancellation is cooperative: every wait races the invocation's
//!   [`CancellationToken`](tokio_util::sync::CancellationToken)

pub mod cancel;
pub mod context;
pub mod poll;
pub mod stream;

pub use context::{Invocation, Io};

use thiserror::Error;

use crate::api::ApiError;

/// Errors from long-running operations.
#[derive(Debug, Error)]
pub enum OperationError {
    #[error("action {id} {reason}")]
    ActionFailed { id: u64, reason: String },

    #[error("action {id} timed out waiting to complete (last status: {last_status})")]
    ActionTimeout { id: u64, last_status: String },

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("failed to stream logs from {url}: server returned {status}")]
    Stream { url: String, status: u16 },

    #[error("failed to write output: {0}")]
    Io(#[from] std::io::Error),

    #[error("operation cancelled")]
    Cancelled,
}

impl OperationError {
    pub fn is_cancelled(&self) -> bool {
        match self {
            OperationError::Cancelled => true,
            OperationError::Api(e) => e.is_cancelled(),
            _ => false,
        }
    }
}
