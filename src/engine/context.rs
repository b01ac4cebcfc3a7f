//! engine::context
//!
//! Per-invocation context passed to command handlers.
//!
//! # Design
//!
//! The [`Invocation`] carries everything a handler may touch: the resolved
//! settings, positional arguments, output streams, the interaction source,
//! and the cancellation token. There is no global client; handlers build
//! one from the settings with [`Invocation::client`].
//!
//! The access token is resolved lazily so that commands which create
//! contexts (such as `auth init --context new`) do not fail before they run.

use std::io::{self, Write};
use std::time::Duration;

use anyhow::Context as _;
use tokio_util::sync::CancellationToken;

use crate::api::{ApiClient, RetryPolicy};
use crate::core::config::{settings, ConfigError, Effective};
use crate::ui::output::{self, RenderOptions, Tabular};
use crate::ui::prompts::{InteractionSource, TerminalInteraction};

/// The streams and interaction source of one invocation.
pub struct Io {
    pub out: Box<dyn Write + Send>,
    pub err: Box<dyn Write + Send>,
    pub interaction: Box<dyn InteractionSource>,
}

impl Io {
    /// The process's stdout, stderr, and terminal.
    pub fn stdio() -> Self {
        Self {
            out: Box::new(io::stdout()),
            err: Box::new(io::stderr()),
            interaction: Box::new(TerminalInteraction::new()),
        }
    }
}

/// Everything a handler needs for one command.
pub struct Invocation {
    /// Dotted command path, e.g. `compute.action.get`.
    pub command: String,
    /// Positional arguments after the command path.
    pub args: Vec<String>,
    pub settings: Effective,
    pub out: Box<dyn Write + Send>,
    pub err: Box<dyn Write + Send>,
    pub interaction: Box<dyn InteractionSource>,
    pub cancel: CancellationToken,
    http: reqwest::Client,
}

impl Invocation {
    pub fn new(
        command: impl Into<String>,
        args: Vec<String>,
        settings: Effective,
        io: Io,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            command: command.into(),
            args,
            settings,
            out: io.out,
            err: io.err,
            interaction: io.interaction,
            cancel,
            http: reqwest::Client::new(),
        }
    }

    /// Positional argument `i`, if present.
    pub fn arg(&self, i: usize) -> Option<&str> {
        self.args.get(i).map(String::as_str)
    }

    /// Whether prompts may be shown. `--interactive` wins over terminal
    /// detection.
    pub fn interactive(&self) -> bool {
        self.settings
            .bool(settings::INTERACTIVE)
            .unwrap_or_else(|| self.interaction.is_interactive())
    }

    /// A client authenticated with the effective access token.
    pub fn client(&self) -> anyhow::Result<ApiClient> {
        let token = self.settings.access_token()?;
        self.client_with_token(token)
    }

    /// A client authenticated with an explicit token.
    pub fn client_with_token(&self, token: impl Into<String>) -> anyhow::Result<ApiClient> {
        let base = self
            .settings
            .string(settings::API_URL)
            .unwrap_or_else(|| settings::DEFAULT_API_URL.to_string());
        let client = ApiClient::new(self.http.clone(), &base, token)?
            .with_retry(self.retry_policy()?)
            .with_timeout(self.http_timeout()?)
            .with_cancel(self.cancel.clone());
        tracing::debug!(
            base_url = %client.base_url(),
            retries = client.retry().max_retries(),
            "created API client"
        );
        Ok(client)
    }

    fn retry_policy(&self) -> Result<RetryPolicy, ConfigError> {
        let max = self
            .settings
            .int(settings::HTTP_RETRY_MAX)
            .unwrap_or(settings::DEFAULT_RETRY_MAX);
        u32::try_from(max)
            .map(RetryPolicy::new)
            .map_err(|_| ConfigError::InvalidValue {
                name: settings::HTTP_RETRY_MAX.to_string(),
                message: format!("must be a non-negative integer, got {}", max),
            })
    }

    fn http_timeout(&self) -> Result<Option<Duration>, ConfigError> {
        match self.settings.int(settings::HTTP_TIMEOUT) {
            None | Some(0) => Ok(None),
            Some(secs) => u64::try_from(secs)
                .map(|s| Some(Duration::from_secs(s)))
                .map_err(|_| ConfigError::InvalidValue {
                    name: settings::HTTP_TIMEOUT.to_string(),
                    message: format!("must be a non-negative number of seconds, got {}", secs),
                }),
        }
    }

    pub fn render_options(&self) -> anyhow::Result<RenderOptions> {
        Ok(RenderOptions::from_settings(&self.settings)?)
    }

    /// Render records to stdout.
    pub fn display<T: Tabular>(&mut self, items: &[T]) -> anyhow::Result<()> {
        let opts = self.render_options()?;
        output::render(&mut *self.out, items, &opts)?;
        self.out.flush().context("failed to flush output")?;
        Ok(())
    }

    /// Render one record to stdout.
    pub fn display_one<T: Tabular>(&mut self, item: &T) -> anyhow::Result<()> {
        self.display(std::slice::from_ref(item))
    }

    /// Write a `Notice:` line to stdout.
    pub fn notice(&mut self, message: &str) -> anyhow::Result<()> {
        output::notice(&mut *self.out, message)?;
        Ok(())
    }
}
