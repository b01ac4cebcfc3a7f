//! core
//!
//! Configuration for doctl.
//!
//! # Modules
//!
//! - [`config`] - Setting declarations, the persisted document, and the
//!   layered resolver that turns flags, environment, and document into the
//!   effective settings of one invocation
//!
//! # Design Principles
//!
//! - Resolution is pure and deterministic: the same inputs give the same view
//! - The persisted document is the only state shared across invocations

pub mod config;
