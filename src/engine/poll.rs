//! engine::poll
//!
//! Polls an action until it reaches a terminal state.
//!
//! # Design
//!
//! [`poll_action`] is a stream of poll observations. Each item is either
//! [`PollState::Pending`] or [`PollState::Terminal`]; after a terminal item,
//! a timeout, a transport error, or cancellation the stream ends. Callers
//! that only care about the outcome use [`wait_for_action`].
//!
//! The interval between polls is `max(5s, timeout / 60)`. A deadline check
//! happens before every poll but the first.

use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, Stream, StreamExt};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::OperationError;
use crate::api::resources::{Action, ActionStatus};
use crate::api::{ApiClient, ApiError};

/// Shortest pause between two polls.
pub const MIN_INTERVAL: Duration = Duration::from_secs(5);

/// Default `--poll-timeout`, in minutes.
pub const DEFAULT_TIMEOUT_MINUTES: i64 = 5;

/// Something that can fetch the current state of an action.
#[async_trait]
pub trait ActionFetcher: Send + Sync {
    async fn fetch_action(&self, action: &ActionRef) -> Result<Action, ApiError>;
}

#[async_trait]
impl ActionFetcher for ApiClient {
    async fn fetch_action(&self, action: &ActionRef) -> Result<Action, ApiError> {
        self.get(&action.path(), "action").await
    }
}

/// Where an action can be read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionRef {
    /// `/v2/actions/<id>`
    Global(u64),
    /// `<resource>/actions/<id>`, e.g. `/v2/droplets/3/actions/7`
    Scoped { resource: String, id: u64 },
}

impl ActionRef {
    pub fn id(&self) -> u64 {
        match self {
            ActionRef::Global(id) | ActionRef::Scoped { id, .. } => *id,
        }
    }

    pub fn path(&self) -> String {
        match self {
            ActionRef::Global(id) => format!("/v2/actions/{}", id),
            ActionRef::Scoped { resource, id } => {
                format!("{}/actions/{}", resource.trim_end_matches('/'), id)
            }
        }
    }
}

/// One observation of an action.
#[derive(Debug, Clone)]
pub enum PollState {
    Pending(Action),
    Terminal(Action),
}

/// Timing for a polling loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub timeout: Duration,
    pub interval: Duration,
}

impl PollConfig {
    /// Timing for a `--poll-timeout` given in minutes.
    pub fn from_minutes(minutes: u64) -> Self {
        Self::with_timeout(Duration::from_secs(minutes.saturating_mul(60)))
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout,
            interval: MIN_INTERVAL.max(timeout / 60),
        }
    }
}

struct PollLoop<'a, F: ?Sized> {
    fetcher: &'a F,
    action: ActionRef,
    config: PollConfig,
    cancel: CancellationToken,
    started: Instant,
    polls: u32,
    last_status: Option<ActionStatus>,
    done: bool,
}

impl<F: ActionFetcher + ?Sized> PollLoop<'_, F> {
    async fn step(&mut self) -> Result<PollState, OperationError> {
        if self.polls > 0 {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    self.done = true;
                    return Err(OperationError::Cancelled);
                }
                _ = tokio::time::sleep(self.config.interval) => {}
            }
            if self.started.elapsed() >= self.config.timeout {
                self.done = true;
                return Err(OperationError::ActionTimeout {
                    id: self.action.id(),
                    last_status: self
                        .last_status
                        .map_or_else(|| "unknown".to_string(), |s| s.to_string()),
                });
            }
        }

        self.polls += 1;
        let action = match self.fetcher.fetch_action(&self.action).await {
            Ok(action) => action,
            Err(e) => {
                self.done = true;
                return Err(e.into());
            }
        };
        tracing::debug!(
            action = action.id,
            status = %action.status,
            poll = self.polls,
            "polled action"
        );
        self.last_status = Some(action.status);

        if action.status.is_terminal() {
            self.done = true;
            Ok(PollState::Terminal(action))
        } else {
            Ok(PollState::Pending(action))
        }
    }
}

/// Stream of observations of `action`.
pub fn poll_action<'a, F>(
    fetcher: &'a F,
    action: ActionRef,
    config: PollConfig,
    cancel: CancellationToken,
) -> impl Stream<Item = Result<PollState, OperationError>> + 'a
where
    F: ActionFetcher + ?Sized,
{
    let state = PollLoop {
        fetcher,
        action,
        config,
        cancel,
        started: Instant::now(),
        polls: 0,
        last_status: None,
        done: false,
    };
    stream::unfold(state, |mut state| async move {
        if state.done {
            return None;
        }
        let item = state.step().await;
        Some((item, state))
    })
}

/// Poll until terminal. An `errored` action is [`OperationError::ActionFailed`].
pub async fn wait_for_action<F>(
    fetcher: &F,
    action: ActionRef,
    config: PollConfig,
    cancel: CancellationToken,
) -> Result<Action, OperationError>
where
    F: ActionFetcher + ?Sized,
{
    let id = action.id();
    let mut polls = Box::pin(poll_action(fetcher, action, config, cancel));
    while let Some(state) = polls.next().await {
        if let PollState::Terminal(action) = state? {
            if action.status == ActionStatus::Errored {
                return Err(OperationError::ActionFailed {
                    id: action.id,
                    reason: "has errored".to_string(),
                });
            }
            return Ok(action);
        }
    }
    // The stream only ends after a terminal item or an error.
    Err(OperationError::ActionTimeout {
        id,
        last_status: "unknown".to_string(),
    })
}
