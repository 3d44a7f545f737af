//! Per-tab video control engine.
//!
//! Discovers video elements as the page DOM mutates, keeps exactly one
//! control overlay per attached video, and mirrors the tab's loudness onto
//! every video it controls.
//!
//! The page is reached through the [`Document`] and [`MediaElement`] traits.
//! [`memory::MemoryDocument`] implements them in memory for tests, the
//! in-process runtime, and simulations.

pub mod background;
pub mod dom;
pub mod engine;
pub mod error;
pub mod glob;
pub mod memory;
pub mod overlay;
pub mod reconcile;
pub mod registry;
pub mod template;
pub mod timecode;

pub use {
    background::{BackgroundClient, Disconnected, query_initial_state},
    dom::{
        BoxSizing, ControlInput, Document, ElementLayout, HostEvent, Insets, MediaElement,
        MediaEvent, MutationRecord, NodeId, PointerEvent, ReadyState, Rect,
    },
    engine::{ControlEngine, EngineState},
    error::{EngineError, Error, Result},
    glob::{glob_matches, in_pattern_list, page_qualifies},
    memory::{MemoryDocument, MemoryVideo},
    overlay::{Overlay, OverlayView, Placement, PlayState},
    registry::OverlayRegistry,
    template::{BundledTemplate, OverlayTemplate, StaticTemplate, TemplateSource},
    timecode::format_time,
};
