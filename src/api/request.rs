//! api::request
//!
//! Request and response descriptors exchanged between handlers and the
//! HTTP client.

use chrono::{DateTime, TimeZone, Utc};
use reqwest::header::HeaderMap;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// A request built by a handler.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    /// Path relative to the base URL; must start with `/`.
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl Request {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::POST, path).json(body)
    }

    pub fn put(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::PUT, path).json(body)
    }

    pub fn patch(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::PATCH, path).json(body)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Rate-limit metadata observed on a response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RateLimit {
    pub limit: Option<u64>,
    pub remaining: Option<u64>,
    pub reset_at: Option<DateTime<Utc>>,
}

impl RateLimit {
    /// Read `RateLimit-Limit`, `RateLimit-Remaining`, and `RateLimit-Reset`
    /// (Unix seconds). Missing or malformed headers are left unset.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let number = |name: &str| -> Option<u64> {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse().ok())
        };
        Self {
            limit: number("RateLimit-Limit"),
            remaining: number("RateLimit-Remaining"),
            reset_at: number("RateLimit-Reset")
                .and_then(|secs| i64::try_from(secs).ok())
                .and_then(|secs| Utc.timestamp_opt(secs, 0).single()),
        }
    }
}

/// A successful response.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: u16,
    /// Parsed JSON body, when the server sent one.
    pub body: Option<Value>,
    pub rate: RateLimit,
}

impl Response {
    /// Deserialize the value under a top-level key, e.g. `{"account": {...}}`.
    pub fn field<T: DeserializeOwned>(&self, key: &str) -> Result<T, serde_json::Error> {
        let value = self
            .body
            .as_ref()
            .and_then(|b| b.get(key))
            .cloned()
            .unwrap_or(Value::Null);
        serde_json::from_value(value)
    }

    /// The raw value under a top-level key.
    pub fn raw(&self, key: &str) -> Option<&Value> {
        self.body.as_ref().and_then(|b| b.get(key))
    }

    /// URL of the next page, from `links.pages.next`.
    pub fn next_page(&self) -> Option<&str> {
        self.body
            .as_ref()?
            .get("links")?
            .get("pages")?
            .get("next")?
            .as_str()
            .filter(|s| !s.is_empty())
    }
}
