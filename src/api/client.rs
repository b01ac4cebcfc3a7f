//! api::client
//!
//! Authenticated HTTP client for the DigitalOcean API.
//!
//! # Design
//!
//! Every request goes through [`ApiClient::send`], which owns the retry
//! loop:
//!
//! - 2xx/3xx responses are returned with their JSON body parsed
//! - 4xx responses fail immediately with [`ApiError::Client`]
//! - 5xx responses and network failures are retried on the
//!   [`RetryPolicy`] schedule, then fail with [`ApiError::Server`]
//!
//! Waits between attempts race the cancellation token, so an interrupt
//! ends the loop promptly with [`ApiError::Cancelled`].
//!
//! # Tracing
//!
//! Each attempt is logged at `trace` level under the `doctl::http` target.

use std::time::{Duration, Instant};

use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use reqwest::{Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use super::backoff::RetryPolicy;
use super::errors::ApiError;
use super::request::{RateLimit, Request, Response};

/// User agent sent with every request.
pub const USER_AGENT_VALUE: &str = concat!("doctl/", env!("CARGO_PKG_VERSION"));

/// Page size used when walking paginated collections.
pub const PER_PAGE: u32 = 200;

/// Tracing target for request logs.
pub const HTTP_TARGET: &str = "doctl::http";

/// Client bound to one base URL and one access token.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
    retry: RetryPolicy,
    timeout: Option<Duration>,
    cancel: CancellationToken,
}

// Custom Debug to avoid exposing the token
impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("retry", &self.retry)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Error body returned by the API on failure.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Outcome of a single failed attempt.
enum Failure {
    /// Not worth retrying.
    Fatal(ApiError),
    /// Retry if the policy allows.
    Transient {
        status: Option<u16>,
        message: String,
    },
}

impl ApiClient {
    /// Create a client.
    ///
    /// The base URL must be an absolute http(s) URL; a trailing `/` is
    /// dropped.
    pub fn new(
        http: reqwest::Client,
        base_url: &str,
        token: impl Into<String>,
    ) -> Result<Self, ApiError> {
        let trimmed = base_url.trim().trim_end_matches('/');
        let parsed = Url::parse(trimmed).map_err(|e| ApiError::InvalidBaseUrl {
            url: base_url.to_string(),
            message: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ApiError::InvalidBaseUrl {
                url: base_url.to_string(),
                message: format!("unsupported scheme '{}'", parsed.scheme()),
            });
        }
        Ok(Self {
            http,
            base_url: trimmed.to_string(),
            token: token.into(),
            retry: RetryPolicy::default(),
            timeout: None,
            cancel: CancellationToken::new(),
        })
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Per-attempt timeout.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn retry(&self) -> RetryPolicy {
        self.retry
    }

    /// Full URL for a request path.
    pub fn url_for(&self, path: &str) -> Result<String, ApiError> {
        if !path.starts_with('/') {
            return Err(ApiError::InvalidPath(path.to_string()));
        }
        Ok(format!("{}{}", self.base_url, path))
    }

    /// Send a request, retrying transient failures.
    pub async fn send(&self, req: &Request) -> Result<Response, ApiError> {
        let url = self.url_for(&req.path)?;
        let method = req.method.to_string();
        let mut delays = self.retry.delays();
        let mut attempts: u32 = 0;

        loop {
            attempts += 1;
            let started = Instant::now();
            let (status, message) = match self.attempt(req, &url).await {
                Ok(resp) => {
                    tracing::trace!(
                        target: HTTP_TARGET,
                        "{} {} -> {} in {:?}",
                        method,
                        url,
                        resp.status,
                        started.elapsed()
                    );
                    return Ok(resp);
                }
                Err(Failure::Fatal(err)) => {
                    tracing::trace!(
                        target: HTTP_TARGET,
                        "{} {} -> {} in {:?}",
                        method,
                        url,
                        err.status().map_or_else(|| "error".to_string(), |s| s.to_string()),
                        started.elapsed()
                    );
                    return Err(err);
                }
                Err(Failure::Transient { status, message }) => (status, message),
            };

            let outcome = status.map_or_else(|| message.clone(), |s| s.to_string());
            let Some(delay) = delays.next() else {
                tracing::trace!(
                    target: HTTP_TARGET,
                    "{} {} -> {} in {:?}; giving up",
                    method,
                    url,
                    outcome,
                    started.elapsed()
                );
                return Err(ApiError::Server {
                    method,
                    url,
                    status,
                    message,
                    attempts: self.retry.enabled().then_some(attempts),
                });
            };

            tracing::trace!(
                target: HTTP_TARGET,
                "{} {} -> {} in {:?}; retrying in {:?}",
                method,
                url,
                outcome,
                started.elapsed(),
                delay
            );

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(ApiError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    /// Fetch a single object stored under `key` in the response envelope.
    pub async fn get<T: DeserializeOwned>(&self, path: &str, key: &str) -> Result<T, ApiError> {
        let req = Request::get(path);
        let resp = self.send(&req).await?;
        resp.field(key).map_err(|e| self.decode_error(&req, e))
    }

    /// Walk every page of a collection stored under `key`.
    pub async fn list_all<T: DeserializeOwned>(
        &self,
        req: Request,
        key: &str,
    ) -> Result<Vec<T>, ApiError> {
        let mut items = Vec::new();
        let mut page: u32 = 1;
        loop {
            let paged = req.clone().query("page", page).query("per_page", PER_PAGE);
            let resp = self.send(&paged).await?;
            let batch: Option<Vec<T>> = resp.field(key).map_err(|e| self.decode_error(&req, e))?;
            items.extend(batch.unwrap_or_default());
            if resp.next_page().is_none() {
                return Ok(items);
            }
            page += 1;
        }
    }

    /// Error for a response whose body did not have the expected shape.
    pub fn decode_error(&self, req: &Request, err: impl std::fmt::Display) -> ApiError {
        ApiError::Decode {
            method: req.method.to_string(),
            url: format!("{}{}", self.base_url, req.path),
            message: err.to_string(),
        }
    }

    /// Issue a plain GET against an absolute URL, without authentication
    /// or retries. Used for pre-signed log URLs.
    pub async fn get_absolute(&self, url: &str) -> Result<reqwest::Response, ApiError> {
        let request = self
            .http
            .get(url)
            .header(USER_AGENT, USER_AGENT_VALUE)
            .build()
            .map_err(|e| ApiError::Request {
                method: Method::GET.to_string(),
                url: url.to_string(),
                message: e.to_string(),
            })?;
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(ApiError::Cancelled),
            result = self.http.execute(request) => result.map_err(|e| ApiError::Server {
                method: Method::GET.to_string(),
                url: url.to_string(),
                status: None,
                message: e.to_string(),
                attempts: None,
            }),
        }
    }

    async fn attempt(&self, req: &Request, url: &str) -> Result<Response, Failure> {
        let method = req.method.to_string();
        let mut builder = self
            .http
            .request(req.method.clone(), url)
            .bearer_auth(&self.token)
            .header(USER_AGENT, USER_AGENT_VALUE);
        if !req.query.is_empty() {
            builder = builder.query(&req.query);
        }
        for (name, value) in &req.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &req.body {
            builder = builder.json(body);
        }
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        let request = builder.build().map_err(|e| {
            Failure::Fatal(ApiError::Request {
                method: method.clone(),
                url: url.to_string(),
                message: e.to_string(),
            })
        })?;

        let response = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(Failure::Fatal(ApiError::Cancelled)),
            result = self.http.execute(request) => result,
        };
        let response = response.map_err(|e| Failure::Transient {
            status: None,
            message: e.to_string(),
        })?;

        let status = response.status();
        let rate = RateLimit::from_headers(response.headers());
        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.contains("json"));
        let bytes = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(Failure::Fatal(ApiError::Cancelled)),
            result = response.bytes() => result,
        };
        let bytes = bytes.map_err(|e| Failure::Transient {
            status: Some(status.as_u16()),
            message: e.to_string(),
        })?;

        if status.as_u16() < 400 {
            let body = if bytes.is_empty() || !is_json {
                None
            } else {
                let value: Value = serde_json::from_slice(&bytes).map_err(|e| {
                    Failure::Fatal(ApiError::Decode {
                        method: method.clone(),
                        url: url.to_string(),
                        message: e.to_string(),
                    })
                })?;
                Some(value)
            };
            return Ok(Response {
                status: status.as_u16(),
                body,
                rate,
            });
        }

        let parsed: ErrorBody = serde_json::from_slice(&bytes).unwrap_or_default();
        let message = parsed
            .message
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| reason(status));

        if status.is_client_error() {
            Err(Failure::Fatal(ApiError::Client {
                method,
                url: url.to_string(),
                status: status.as_u16(),
                id: parsed.id,
                message,
            }))
        } else {
            Err(Failure::Transient {
                status: Some(status.as_u16()),
                message,
            })
        }
    }
}

fn reason(status: StatusCode) -> String {
    status
        .canonical_reason()
        .map(str::to_string)
        .unwrap_or_else(|| status.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer, retries: u32) -> ApiClient {
        ApiClient::new(reqwest::Client::new(), &server.uri(), "secret")
            .unwrap()
            .with_retry(RetryPolicy::new(retries))
    }

    #[test]
    fn rejects_relative_path() {
        let c = ApiClient::new(reqwest::Client::new(), "https://api.example.com/", "t").unwrap();
        assert_eq!(c.base_url(), "https://api.example.com");
        assert!(matches!(c.url_for("v2/account"), Err(ApiError::InvalidPath(_))));
        assert_eq!(
            c.url_for("/v2/account").unwrap(),
            "https://api.example.com/v2/account"
        );
    }

    #[test]
    fn rejects_bad_base_url() {
        assert!(ApiClient::new(reqwest::Client::new(), "not a url", "t").is_err());
        assert!(ApiClient::new(reqwest::Client::new(), "ftp://x", "t").is_err());
    }

    #[test]
    fn debug_hides_token() {
        let c = ApiClient::new(reqwest::Client::new(), "https://api.example.com", "hunter2")
            .unwrap();
        assert!(!format!("{:?}", c).contains("hunter2"));
    }

    #[tokio::test]
    async fn success_parses_body_and_sends_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/account"))
            .and(header("authorization", "Bearer secret"))
            .and(header("user-agent", USER_AGENT_VALUE))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"account": {"email": "a@b.c"}}))
                    .insert_header("RateLimit-Remaining", "10"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let resp = client(&server, 0).send(&Request::get("/v2/account")).await.unwrap();
        assert_eq!(resp.status, 200);
        assert_eq!(resp.raw("account").unwrap()["email"], "a@b.c");
        assert_eq!(resp.rate.remaining, Some(10));
    }

    #[tokio::test]
    async fn client_error_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/account"))
            .respond_with(ResponseTemplate::new(401).set_body_json(
                json!({"id": "unauthorized", "message": "Unable to authenticate you"}),
            ))
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server, 3)
            .send(&Request::get("/v2/account"))
            .await
            .unwrap_err();
        match err {
            ApiError::Client {
                status, id, message, ..
            } => {
                assert_eq!(status, 401);
                assert_eq!(id.as_deref(), Some("unauthorized"));
                assert_eq!(message, "Unable to authenticate you");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn client_error_without_body_uses_reason() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = client(&server, 0)
            .send(&Request::get("/v2/apps/x"))
            .await
            .unwrap_err();
        assert!(err.to_string().ends_with("404 Not Found"), "{err}");
    }

    #[tokio::test]
    async fn server_error_retried_then_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(2)
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        let resp = client(&server, 3).send(&Request::get("/v2/account")).await.unwrap();
        assert_eq!(resp.raw("ok"), Some(&json!(true)));
    }

    #[tokio::test]
    async fn server_error_gives_up_after_retries() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .expect(3)
            .mount(&server)
            .await;

        let err = client(&server, 2)
            .send(&Request::get("/v2/account"))
            .await
            .unwrap_err();
        assert!(
            err.to_string().ends_with("giving up after 3 attempt(s)"),
            "{err}"
        );
    }

    #[tokio::test]
    async fn server_error_without_retries_has_no_attempt_count() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server, 0)
            .send(&Request::get("/v2/account"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Server { attempts: None, .. }));
    }

    #[tokio::test]
    async fn cancellation_interrupts_backoff() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let cancel = CancellationToken::new();
        let c = client(&server, 5).with_cancel(cancel.clone());
        cancel.cancel();
        let err = c.send(&Request::get("/v2/account")).await.unwrap_err();
        assert!(err.is_cancelled());
    }

    #[tokio::test]
    async fn list_all_follows_pages() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/actions"))
            .and(query_param("page", "1"))
            .and(query_param("per_page", "200"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "actions": [{"id": 1}, {"id": 2}],
                "links": {"pages": {"next": "http://x/v2/actions?page=2"}}
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v2/actions"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "actions": [{"id": 3}],
                "links": {}
            })))
            .mount(&server)
            .await;

        let items: Vec<Value> = client(&server, 0)
            .list_all(Request::get("/v2/actions"), "actions")
            .await
            .unwrap();
        let ids: Vec<i64> = items.iter().map(|v| v["id"].as_i64().unwrap()).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }
}
