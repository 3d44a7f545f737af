//! Host page abstraction.
//!
//! The engine never owns page elements. It reads and writes them through
//! [`Document`] and [`MediaElement`], and consumes host notifications
//! (mutations, media events, pointer, intersection, layout, control input)
//! from a single ordered event queue.

use crate::{Result, overlay::OverlayView};

/// Stable identity of a node for the lifetime of the page.
pub type NodeId = u64;

/// Element bounding box in viewport coordinates (CSS pixels).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub top: f64,
    pub left: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            top,
            left,
            width,
            height,
        }
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }
}

/// CSS `box-sizing` of the video element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BoxSizing {
    #[default]
    ContentBox,
    BorderBox,
}

/// Per-edge lengths (padding or border widths).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Insets {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Insets {
    pub fn uniform(width: f64) -> Self {
        Self {
            top: width,
            right: width,
            bottom: width,
            left: width,
        }
    }
}

/// Box model of an element: its border box plus the edges inside it.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ElementLayout {
    pub rect: Rect,
    pub box_sizing: BoxSizing,
    pub padding: Insets,
    pub border: Insets,
}

impl ElementLayout {
    pub fn from_rect(rect: Rect) -> Self {
        Self {
            rect,
            ..Default::default()
        }
    }

    /// Area the picture is drawn in.
    ///
    /// With `content-box` sizing the border box grows around the declared
    /// size, so padding and border are removed. With `border-box` sizing the
    /// declared size is the border box itself and is used unchanged.
    pub fn picture_rect(&self) -> Rect {
        match self.box_sizing {
            BoxSizing::BorderBox => self.rect,
            BoxSizing::ContentBox => {
                let left = self.border.left + self.padding.left;
                let right = self.border.right + self.padding.right;
                let top = self.border.top + self.padding.top;
                let bottom = self.border.bottom + self.padding.bottom;
                Rect {
                    top: self.rect.top + top,
                    left: self.rect.left + left,
                    width: (self.rect.width - left - right).max(0.0),
                    height: (self.rect.height - top - bottom).max(0.0),
                }
            },
        }
    }
}

/// `HTMLMediaElement.readyState`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum ReadyState {
    #[default]
    HaveNothing = 0,
    HaveMetadata = 1,
    HaveCurrentData = 2,
    HaveFutureData = 3,
    HaveEnoughData = 4,
}

/// Playback properties of a host video element.
pub trait MediaElement {
    fn paused(&self) -> bool;
    fn play(&mut self);
    fn pause(&mut self);

    fn muted(&self) -> bool;
    fn set_muted(&mut self, muted: bool);

    /// Volume in `0.0..=1.0`.
    fn volume(&self) -> f64;
    fn set_volume(&mut self, volume: f64);

    fn current_time(&self) -> f64;
    fn set_current_time(&mut self, seconds: f64);

    /// `NaN` until metadata is known, `INFINITY` for live streams.
    fn duration(&self) -> f64;

    fn ready_state(&self) -> ReadyState;

    /// Whether the loaded media carries an audio track.
    fn has_audio(&self) -> bool;

    /// Toggle the browser's native control chrome.
    fn set_controls(&mut self, controls: bool);

    fn request_fullscreen(&mut self) -> Result<()>;

    fn layout(&self) -> ElementLayout;
}

/// Native media events the overlay listens to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaEvent {
    Play,
    Playing,
    Pause,
    Ended,
    TimeUpdate,
    VolumeChange,
    LoadedData,
}

/// Pointer activity over the video element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerEvent {
    Enter,
    Leave,
    Click,
}

/// Input committed on one of the overlay's affordances.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlInput {
    PlayPause,
    Mute,
    Fullscreen,
    /// Progress bar committed at this value (`0..=1000`).
    Seek(f64),
    /// Volume bar committed at this value (`0..=100`).
    Volume(f64),
}

/// One `childList` mutation record.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MutationRecord {
    pub added: Vec<NodeId>,
    pub removed: Vec<NodeId>,
}

/// A host notification, in delivery order.
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    /// A batch of subtree mutations below the observed root.
    Mutations(Vec<MutationRecord>),
    Media { target: NodeId, event: MediaEvent },
    Pointer { target: NodeId, event: PointerEvent },
    /// The video entered or left its scrolling container's view.
    Intersection { target: NodeId, visible: bool },
    /// The video's size or position changed.
    Layout { target: NodeId },
    Control { target: NodeId, input: ControlInput },
}

impl HostEvent {
    /// Video the event is about, if any.
    pub fn target(&self) -> Option<NodeId> {
        match self {
            Self::Mutations(_) => None,
            Self::Media { target, .. }
            | Self::Pointer { target, .. }
            | Self::Intersection { target, .. }
            | Self::Layout { target }
            | Self::Control { target, .. } => Some(*target),
        }
    }
}

/// The page document as seen from the content context.
pub trait Document {
    type Video: MediaElement;

    /// Full URL of the page.
    fn url(&self) -> &str;

    fn body(&self) -> NodeId;

    /// Child nodes in document order. Detached subtrees keep their children.
    fn children(&self, node: NodeId) -> Vec<NodeId>;

    fn is_video(&self, node: NodeId) -> bool;

    /// Whether the node is currently attached below the body.
    fn is_connected(&self, node: NodeId) -> bool;

    fn video(&self, node: NodeId) -> Option<&Self::Video>;
    fn video_mut(&mut self, node: NodeId) -> Option<&mut Self::Video>;

    /// Window scroll offset `(x, y)`.
    fn scroll_offset(&self) -> (f64, f64);

    /// Start delivering `childList` mutations for the subtree below `root`.
    fn observe_mutations(&mut self, root: NodeId);
    fn disconnect_mutations(&mut self);

    /// Start delivering media, pointer, intersection and layout events for
    /// a video.
    fn bind_video(&mut self, video: NodeId);
    fn unbind_video(&mut self, video: NodeId);

    /// Insert or refresh the overlay subtree for a video.
    fn render_overlay(&mut self, video: NodeId, view: &OverlayView);
    fn remove_overlay(&mut self, video: NodeId);

    /// Next pending notification, if any.
    fn next_event(&mut self) -> Option<HostEvent>;
}
