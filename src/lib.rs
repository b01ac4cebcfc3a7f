//! doctl - Command-line client for the DigitalOcean API
//!
//! This crate is the core of the CLI: layered configuration, an authenticated
//! HTTP client with retries, a command registry and dispatcher, output
//! rendering, and the long-running operations (action polling, log
//! streaming) that commands build on.
//!
//! # Architecture
//!
//! - [`cli`] - Command tree, dispatcher, and the built-in commands
//! - [`core`] - Settings resolution and the persisted config document
//! - [`api`] - HTTP client, retry schedule, and response types
//! - [`engine`] - Invocation context, action polling, log streaming, signals
//! - [`ui`] - Tables, templates, value formatting, and prompts
//!
//! # Invariants
//!
//! 1. A setting's effective value comes from the highest-precedence source
//!    that defines it: flag, environment, config document, default
//! 2. Client errors (4xx) are never retried; the client retries 5xx and
//!    network failures at most `--http-retry-max` times
//! 3. The config document is only written under its lock, via
//!    write-to-temp-then-rename, and unknown keys survive every edit
//! 4. Each invocation prints at most one error and exits 0, 1, or 130

pub mod api;
pub mod cli;
pub mod core;
pub mod engine;
pub mod ui;
