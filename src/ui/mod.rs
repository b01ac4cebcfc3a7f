//! ui
//!
//! User interaction utilities.
//!
//! # Modules
//!
//! - [`output`] - Tables, JSON, templates, and notices
//! - [`format`] - Cell formatting for times, lists, and sizes
//! - [`template`] - Go-style templates over JSON values
//! - [`prompts`] - Interactive prompts and confirmations
//!
//! # Design
//!
//! All output and prompts go through this module so that non-interactive
//! runs and tests behave the same as a terminal session.

pub mod format;
pub mod output;
pub mod prompts;
pub mod template;
