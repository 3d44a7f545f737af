//! In-process extension host.
//!
//! Wires per-tab [`avc_engine::ControlEngine`]s to one
//! [`avc_coordinator::MuteCoordinator`] through JSON-encoded messages, the
//! way the browser's extension runtime connects content scripts and the
//! background context.

pub mod extension;
pub mod port;
pub mod tabs;

pub use {
    extension::Extension,
    port::BackgroundPort,
    tabs::{SharedEngine, TabTable},
};
