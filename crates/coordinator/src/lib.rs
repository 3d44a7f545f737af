//! Background-context mute coordination.
//!
//! Tracks which origins the user switched to loud for this browser session,
//! answers each page's initial-state query, and broadcasts toggles to every
//! open tab of the toggled origin.

pub mod error;
pub mod matcher;
pub mod service;
pub mod toolbar;

pub use {
    error::{CoordinatorError, Error, Result},
    matcher::HostMatcher,
    service::{MuteCoordinator, Tabs, ToggleOutcome},
    toolbar::{RecordingToolbar, Toolbar, ToolbarState, update_toolbar},
};
