//! Shared error definitions and helpers used across all avc crates.

pub mod error;

pub use error::{AvcError, Error, FromMessage, Result};
