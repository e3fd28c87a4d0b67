//! Test utilities for code built on fake roles
//!
//! Fixtures for valid snowflakes and groups, plus a backend wrapper that
//! records every call so tests can assert exact backend traffic.

pub mod fixtures;
pub mod recording;

pub use fixtures::*;
pub use recording::{BackendCall, RecordingBackend};
