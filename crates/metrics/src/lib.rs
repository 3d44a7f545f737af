//! Metric names shared by the engine and the coordinator.
//!
//! Crates record through the `metrics` facade behind their optional
//! `metrics` feature. Nothing is exported unless the embedding program
//! installs a recorder.
//!
//! ```rust,ignore
//! use avc_metrics::{counter, overlays};
//!
//! counter!(overlays::INSTALLED_TOTAL).increment(1);
//! ```

mod definitions;

pub use definitions::*;

// Re-export metrics macros for convenience
pub use metrics::{counter, gauge};
