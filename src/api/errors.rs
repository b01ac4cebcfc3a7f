//! api::errors
//!
//! Transport error types.
//!
//! # Display Forms
//!
//! ```text
//! GET https://api.digitalocean.com/v2/account: 401 Unable to authenticate you
//! GET https://api.digitalocean.com/v2/account: 500 something broke; giving up after 6 attempt(s)
//! ```
//!
//! The "giving up" suffix appears only when retries were enabled.

use thiserror::Error;

/// Errors from the HTTP client.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// The server rejected the request (4xx). Never retried.
    #[error("{method} {url}: {status} {message}")]
    Client {
        method: String,
        url: String,
        status: u16,
        /// Error id from the response body, e.g. `unauthorized`.
        id: Option<String>,
        message: String,
    },

    /// A 5xx response or network failure that survived every retry.
    #[error("{method} {url}: {}{}", server_detail(.status, .message), giving_up(.attempts))]
    Server {
        method: String,
        url: String,
        /// `None` when no response was received.
        status: Option<u16>,
        message: String,
        /// Total attempts made, when retries were enabled.
        attempts: Option<u32>,
    },

    /// Request paths are relative to the base URL and must start with `/`.
    #[error("invalid request path {0:?}: must start with '/'")]
    InvalidPath(String),

    #[error("invalid base URL {url:?}: {message}")]
    InvalidBaseUrl { url: String, message: String },

    /// The request could not be constructed, e.g. a token with invalid
    /// header characters.
    #[error("{method} {url}: invalid request: {message}")]
    Request {
        method: String,
        url: String,
        message: String,
    },

    /// The response body could not be decoded.
    #[error("{method} {url}: failed to decode response: {message}")]
    Decode {
        method: String,
        url: String,
        message: String,
    },

    #[error("request cancelled")]
    Cancelled,
}

impl ApiError {
    /// HTTP status code, if a response was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Client { status, .. } => Some(*status),
            ApiError::Server { status, .. } => *status,
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ApiError::Cancelled)
    }
}

fn server_detail(status: &Option<u16>, message: &str) -> String {
    match status {
        Some(code) => format!("{} {}", code, message),
        None => message.to_string(),
    }
}

fn giving_up(attempts: &Option<u32>) -> String {
    match attempts {
        Some(n) => format!("; giving up after {} attempt(s)", n),
        None => String::new(),
    }
}
