//! engine::stream
//!
//! Copies a live-log URL to an output stream.
//!
//! The body is written chunk by chunk as it arrives and flushed after every
//! chunk. Cancellation closes the connection and counts as success.

use std::io::Write;

use tokio_util::sync::CancellationToken;

use super::OperationError;
use crate::api::{ApiClient, ApiError};

/// Strip the query string, which carries signatures on pre-signed URLs.
fn redact(url: &str) -> String {
    url.split('?').next().unwrap_or(url).to_string()
}

/// Stream `url` into `out` until EOF or cancellation. Returns the number of
/// bytes copied.
pub async fn stream_logs(
    client: &ApiClient,
    url: &str,
    out: &mut (dyn Write + Send),
    cancel: &CancellationToken,
) -> Result<u64, OperationError> {
    tracing::debug!(url = %redact(url), "streaming logs");

    let mut response = match client.get_absolute(url).await {
        Ok(response) => response,
        Err(ApiError::Cancelled) => return Ok(0),
        Err(e) => return Err(e.into()),
    };
    if !response.status().is_success() {
        return Err(OperationError::Stream {
            url: redact(url),
            status: response.status().as_u16(),
        });
    }

    let mut copied: u64 = 0;
    loop {
        let chunk = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!(bytes = copied, "log stream cancelled");
                return Ok(copied);
            }
            chunk = response.chunk() => chunk,
        };
        let chunk = chunk.map_err(|e| ApiError::Server {
            method: "GET".to_string(),
            url: redact(url),
            status: None,
            message: e.to_string(),
            attempts: None,
        })?;
        match chunk {
            Some(bytes) => {
                out.write_all(&bytes)?;
                out.flush()?;
                copied += bytes.len() as u64;
            }
            None => return Ok(copied),
        }
    }
}
