//! Shared utilities for the quiz lobby workspace.
//!
//! Logging bootstrap and JST timestamp helpers used by the server crate
//! and its integration tests.

pub mod logger;
pub mod time;
