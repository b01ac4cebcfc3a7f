//! api
//!
//! Transport to the DigitalOcean API.
//!
//! # Modules
//!
//! - [`client`] - Authenticated client with retries and pagination
//! - [`request`] - Request and response descriptors, rate-limit metadata
//! - [`backoff`] - Retry schedule
//! - [`errors`] - Transport errors
//! - [`resources`] - Response types used by the built-in commands
//!
//! # Design
//!
//! Handlers build [`Request`]s and hand them to an [`ApiClient`] passed in
//! through the invocation context. Retries are internal to the client and
//! never visible to handlers.

pub mod backoff;
pub mod client;
pub mod errors;
pub mod request;
pub mod resources;

pub use backoff::RetryPolicy;
pub use client::ApiClient;
pub use errors::ApiError;
pub use request::{RateLimit, Request, Response};
