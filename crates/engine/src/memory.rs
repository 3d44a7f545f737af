//! In-memory page host.
//!
//! A small DOM with the notification behaviour of a browser page: subtree
//! mutations are batched per checkpoint, media events are only delivered to
//! bound videos, and detached subtrees keep their children. Used by tests,
//! the in-process runtime, and the CLI simulator.

use std::collections::{HashMap, HashSet, VecDeque};

use tracing::trace;

use crate::{
    dom::{
        ControlInput, Document, ElementLayout, HostEvent, MediaElement, MediaEvent,
        MutationRecord, NodeId, PointerEvent, ReadyState, Rect,
    },
    error::{EngineError, Result},
    overlay::OverlayView,
};

/// A simulated `<video>` element.
#[derive(Debug, Clone)]
pub struct MemoryVideo {
    paused: bool,
    muted: bool,
    volume: f64,
    current_time: f64,
    duration: f64,
    ready_state: ReadyState,
    has_audio: bool,
    controls: bool,
    fullscreen: bool,
    fullscreen_allowed: bool,
    layout: ElementLayout,
    outbox: Vec<MediaEvent>,
}

impl Default for MemoryVideo {
    fn default() -> Self {
        Self {
            paused: true,
            muted: false,
            volume: 1.0,
            current_time: 0.0,
            duration: f64::NAN,
            ready_state: ReadyState::HaveNothing,
            has_audio: false,
            controls: true,
            fullscreen: false,
            fullscreen_allowed: true,
            layout: ElementLayout::from_rect(Rect::new(0.0, 0.0, 640.0, 360.0)),
            outbox: Vec::new(),
        }
    }
}

impl MemoryVideo {
    pub fn with_muted(mut self, muted: bool) -> Self {
        self.muted = muted;
        self
    }

    pub fn with_volume(mut self, volume: f64) -> Self {
        self.volume = volume;
        self
    }

    pub fn with_layout(mut self, layout: ElementLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Media already buffered when the page script runs.
    pub fn with_loaded(mut self, duration: f64, has_audio: bool) -> Self {
        self.ready_state = ReadyState::HaveEnoughData;
        self.duration = duration;
        self.has_audio = has_audio;
        self
    }

    pub fn playing(mut self) -> Self {
        self.paused = false;
        self
    }

    pub fn deny_fullscreen(mut self) -> Self {
        self.fullscreen_allowed = false;
        self
    }

    /// Buffer the first frame, firing `loadeddata`.
    pub fn finish_loading(&mut self, duration: f64, has_audio: bool) {
        self.ready_state = ReadyState::HaveEnoughData;
        self.duration = duration;
        self.has_audio = has_audio;
        self.outbox.push(MediaEvent::LoadedData);
    }

    /// Play forward, firing `timeupdate`, and `pause`/`ended` at the end.
    pub fn advance(&mut self, seconds: f64) {
        if self.paused {
            return;
        }
        self.current_time += seconds;
        if self.duration.is_finite() && self.current_time >= self.duration {
            self.current_time = self.duration;
            self.outbox.push(MediaEvent::TimeUpdate);
            self.paused = true;
            self.outbox.push(MediaEvent::Pause);
            self.outbox.push(MediaEvent::Ended);
        } else {
            self.outbox.push(MediaEvent::TimeUpdate);
        }
    }

    /// Change the reported duration, e.g. a stream switching source.
    pub fn set_duration(&mut self, duration: f64) {
        self.duration = duration;
    }

    pub fn controls(&self) -> bool {
        self.controls
    }

    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }

    fn take_events(&mut self) -> Vec<MediaEvent> {
        std::mem::take(&mut self.outbox)
    }
}

impl MediaElement for MemoryVideo {
    fn paused(&self) -> bool {
        self.paused
    }

    fn play(&mut self) {
        if self.paused {
            self.paused = false;
            self.outbox.push(MediaEvent::Play);
            self.outbox.push(MediaEvent::Playing);
        }
    }

    fn pause(&mut self) {
        if !self.paused {
            self.paused = true;
            self.outbox.push(MediaEvent::Pause);
        }
    }

    fn muted(&self) -> bool {
        self.muted
    }

    fn set_muted(&mut self, muted: bool) {
        if self.muted != muted {
            self.muted = muted;
            self.outbox.push(MediaEvent::VolumeChange);
        }
    }

    fn volume(&self) -> f64 {
        self.volume
    }

    fn set_volume(&mut self, volume: f64) {
        if volume.is_nan() {
            return;
        }
        let volume = volume.clamp(0.0, 1.0);
        if self.volume != volume {
            self.volume = volume;
            self.outbox.push(MediaEvent::VolumeChange);
        }
    }

    fn current_time(&self) -> f64 {
        self.current_time
    }

    fn set_current_time(&mut self, seconds: f64) {
        if !seconds.is_finite() {
            return;
        }
        let upper = if self.duration.is_finite() {
            self.duration
        } else {
            f64::MAX
        };
        self.current_time = seconds.clamp(0.0, upper);
        self.outbox.push(MediaEvent::TimeUpdate);
    }

    fn duration(&self) -> f64 {
        self.duration
    }

    fn ready_state(&self) -> ReadyState {
        self.ready_state
    }

    fn has_audio(&self) -> bool {
        self.has_audio
    }

    fn set_controls(&mut self, controls: bool) {
        self.controls = controls;
    }

    fn request_fullscreen(&mut self) -> Result<()> {
        if !self.fullscreen_allowed {
            return Err(EngineError::FullscreenDenied(
                "request not triggered by user activation".into(),
            ));
        }
        self.fullscreen = true;
        Ok(())
    }

    fn layout(&self) -> ElementLayout {
        self.layout
    }
}

#[derive(Debug)]
struct Node {
    tag: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    video: Option<MemoryVideo>,
}

/// A simulated page document.
#[derive(Debug)]
pub struct MemoryDocument {
    url: String,
    body: NodeId,
    nodes: HashMap<NodeId, Node>,
    next_id: NodeId,
    scroll: (f64, f64),
    observed_root: Option<NodeId>,
    pending_mutations: Vec<MutationRecord>,
    queue: VecDeque<HostEvent>,
    bound: HashSet<NodeId>,
    overlays: HashMap<NodeId, OverlayView>,
    render_counts: HashMap<NodeId, usize>,
}

impl MemoryDocument {
    pub fn new(url: impl Into<String>) -> Self {
        let mut doc = Self {
            url: url.into(),
            body: 0,
            nodes: HashMap::new(),
            next_id: 1,
            scroll: (0.0, 0.0),
            observed_root: None,
            pending_mutations: Vec::new(),
            queue: VecDeque::new(),
            bound: HashSet::new(),
            overlays: HashMap::new(),
            render_counts: HashMap::new(),
        };
        doc.body = doc.insert_node("body", None);
        doc
    }

    /// Create a detached element.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.insert_node(tag, None)
    }

    /// Create a detached `<video>` element.
    pub fn create_video(&mut self, video: MemoryVideo) -> NodeId {
        self.insert_node("video", Some(video))
    }

    pub fn tag(&self, node: NodeId) -> Option<&str> {
        self.nodes.get(&node).map(|n| n.tag.as_str())
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(&node).and_then(|n| n.parent)
    }

    /// Append `child` to `parent`, moving it if it already has a parent.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        if !self.nodes.contains_key(&parent) {
            return Err(EngineError::UnknownNode(parent));
        }
        if !self.nodes.contains_key(&child) {
            return Err(EngineError::UnknownNode(child));
        }
        if child == parent || self.is_inclusive_ancestor(child, parent) {
            return Err(EngineError::Message(format!(
                "cannot insert node {child} into its own subtree"
            )));
        }

        if self.parent(child).is_some() {
            self.remove(child)?;
        }

        if let Some(node) = self.nodes.get_mut(&parent) {
            node.children.push(child);
        }
        if let Some(node) = self.nodes.get_mut(&child) {
            node.parent = Some(parent);
        }
        if self.is_observed(parent) {
            self.pending_mutations.push(MutationRecord {
                added: vec![child],
                removed: Vec::new(),
            });
        }
        Ok(())
    }

    /// Detach `node` from its parent. Its own subtree stays intact.
    pub fn remove(&mut self, node: NodeId) -> Result<()> {
        let parent = self.parent(node).ok_or(EngineError::UnknownNode(node))?;
        let observed = self.is_observed(parent);

        if let Some(p) = self.nodes.get_mut(&parent) {
            p.children.retain(|c| *c != node);
        }
        if let Some(n) = self.nodes.get_mut(&node) {
            n.parent = None;
        }
        if observed {
            self.pending_mutations.push(MutationRecord {
                added: Vec::new(),
                removed: vec![node],
            });
        }
        Ok(())
    }

    /// Drop a detached subtree entirely, as the garbage collector would.
    pub fn discard(&mut self, node: NodeId) {
        if self.parent(node).is_some() {
            return;
        }
        let mut stack = vec![node];
        while let Some(id) = stack.pop() {
            if let Some(n) = self.nodes.remove(&id) {
                stack.extend(n.children);
            }
            self.bound.remove(&id);
            self.overlays.remove(&id);
        }
    }

    pub fn set_scroll(&mut self, x: f64, y: f64) {
        self.scroll = (x, y);
    }

    /// Move or resize a video, notifying its layout observer.
    pub fn set_layout(&mut self, video: NodeId, layout: ElementLayout) {
        if let Some(v) = self.video_node_mut(video) {
            v.layout = layout;
            self.notify(HostEvent::Layout { target: video });
        }
    }

    /// Report the video entering or leaving its scrolling container's view.
    pub fn set_intersecting(&mut self, video: NodeId, visible: bool) {
        self.notify(HostEvent::Intersection {
            target: video,
            visible,
        });
    }

    pub fn pointer(&mut self, video: NodeId, event: PointerEvent) {
        self.notify(HostEvent::Pointer {
            target: video,
            event,
        });
    }

    /// Operate one of the overlay's affordances. Ignored without an overlay.
    pub fn control(&mut self, video: NodeId, input: ControlInput) {
        if self.overlays.contains_key(&video) {
            self.queue.push_back(HostEvent::Control {
                target: video,
                input,
            });
        }
    }

    /// Last overlay subtree rendered for a video.
    pub fn overlay(&self, video: NodeId) -> Option<&OverlayView> {
        self.overlays.get(&video)
    }

    pub fn overlay_count(&self) -> usize {
        self.overlays.len()
    }

    /// How many times the overlay for a video has been (re)rendered.
    pub fn render_count(&self, video: NodeId) -> usize {
        self.render_counts.get(&video).copied().unwrap_or(0)
    }

    pub fn is_bound(&self, video: NodeId) -> bool {
        self.bound.contains(&video)
    }

    pub fn is_observing(&self) -> bool {
        self.observed_root.is_some()
    }

    /// Whether any notification is waiting.
    pub fn has_pending(&self) -> bool {
        !self.pending_mutations.is_empty()
            || !self.queue.is_empty()
            || self.bound.iter().any(|id| {
                self.nodes
                    .get(id)
                    .and_then(|n| n.video.as_ref())
                    .is_some_and(|v| !v.outbox.is_empty())
            })
    }

    fn insert_node(&mut self, tag: &str, video: Option<MemoryVideo>) -> NodeId {
        let id = self.next_id;
        self.next_id += 1;
        self.nodes.insert(id, Node {
            tag: tag.to_ascii_lowercase(),
            parent: None,
            children: Vec::new(),
            video,
        });
        id
    }

    fn video_node_mut(&mut self, node: NodeId) -> Option<&mut MemoryVideo> {
        self.nodes.get_mut(&node).and_then(|n| n.video.as_mut())
    }

    fn is_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    fn is_observed(&self, node: NodeId) -> bool {
        self.observed_root
            .is_some_and(|root| self.is_inclusive_ancestor(root, node))
    }

    fn notify(&mut self, event: HostEvent) {
        if event.target().is_some_and(|t| self.bound.contains(&t)) {
            self.queue.push_back(event);
        }
    }

    fn collect_media_events(&mut self) {
        let mut ids: Vec<NodeId> = self
            .nodes
            .iter()
            .filter(|(_, n)| n.video.as_ref().is_some_and(|v| !v.outbox.is_empty()))
            .map(|(id, _)| *id)
            .collect();
        ids.sort_unstable();

        for id in ids {
            let bound = self.bound.contains(&id);
            let Some(video) = self.video_node_mut(id) else {
                continue;
            };
            let events = video.take_events();
            if !bound {
                continue;
            }
            self.queue.extend(
                events
                    .into_iter()
                    .map(|event| HostEvent::Media { target: id, event }),
            );
        }
    }
}

impl Document for MemoryDocument {
    type Video = MemoryVideo;

    fn url(&self) -> &str {
        &self.url
    }

    fn body(&self) -> NodeId {
        self.body
    }

    fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.nodes
            .get(&node)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    fn is_video(&self, node: NodeId) -> bool {
        self.nodes.get(&node).is_some_and(|n| n.video.is_some())
    }

    fn is_connected(&self, node: NodeId) -> bool {
        self.nodes.contains_key(&node) && self.is_inclusive_ancestor(self.body, node)
    }

    fn video(&self, node: NodeId) -> Option<&MemoryVideo> {
        self.nodes.get(&node).and_then(|n| n.video.as_ref())
    }

    fn video_mut(&mut self, node: NodeId) -> Option<&mut MemoryVideo> {
        self.video_node_mut(node)
    }

    fn scroll_offset(&self) -> (f64, f64) {
        self.scroll
    }

    fn observe_mutations(&mut self, root: NodeId) {
        self.observed_root = Some(root);
    }

    fn disconnect_mutations(&mut self) {
        self.observed_root = None;
        self.pending_mutations.clear();
    }

    fn bind_video(&mut self, video: NodeId) {
        // Events fired before a listener existed are not replayed.
        if let Some(v) = self.video_node_mut(video) {
            v.outbox.clear();
        }
        self.bound.insert(video);
    }

    fn unbind_video(&mut self, video: NodeId) {
        self.bound.remove(&video);
        self.queue.retain(|event| event.target() != Some(video));
    }

    fn render_overlay(&mut self, video: NodeId, view: &OverlayView) {
        trace!(video, displayed = view.displayed, "render overlay");
        self.overlays.insert(video, view.clone());
        *self.render_counts.entry(video).or_default() += 1;
    }

    fn remove_overlay(&mut self, video: NodeId) {
        self.overlays.remove(&video);
    }

    fn next_event(&mut self) -> Option<HostEvent> {
        if !self.pending_mutations.is_empty() {
            let batch = std::mem::take(&mut self.pending_mutations);
            return Some(HostEvent::Mutations(batch));
        }
        self.collect_media_events();
        self.queue.pop_front()
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mutations_are_only_recorded_while_observing() {
        let mut doc = MemoryDocument::new("https://a.test/");
        let body = doc.body();
        let early = doc.create_element("div");
        doc.append_child(body, early).unwrap();
        assert!(doc.next_event().is_none());

        doc.observe_mutations(body);
        let late = doc.create_element("div");
        doc.append_child(early, late).unwrap();
        doc.remove(early).unwrap();

        let Some(HostEvent::Mutations(batch)) = doc.next_event() else {
            panic!("expected a mutation batch");
        };
        assert_eq!(batch, vec![
            MutationRecord {
                added: vec![late],
                removed: vec![],
            },
            MutationRecord {
                added: vec![],
                removed: vec![early],
            },
        ]);
        assert!(doc.next_event().is_none());
    }

    #[test]
    fn detached_subtrees_keep_their_children() {
        let mut doc = MemoryDocument::new("https://a.test/");
        let body = doc.body();
        let wrapper = doc.create_element("div");
        let video = doc.create_video(MemoryVideo::default());
        doc.append_child(wrapper, video).unwrap();
        doc.append_child(body, wrapper).unwrap();
        assert!(doc.is_connected(video));

        doc.remove(wrapper).unwrap();
        assert!(!doc.is_connected(video));
        assert_eq!(doc.children(wrapper), vec![video]);
    }

    #[test]
    fn discarding_drops_only_detached_subtrees() {
        let mut doc = MemoryDocument::new("https://a.test/");
        let body = doc.body();
        let wrapper = doc.create_element("DIV");
        let video = doc.create_video(MemoryVideo::default());
        doc.append_child(wrapper, video).unwrap();
        doc.append_child(body, wrapper).unwrap();
        assert_eq!(doc.tag(wrapper), Some("div"));

        doc.discard(wrapper);
        assert!(doc.is_connected(video));

        doc.bind_video(video);
        doc.remove(wrapper).unwrap();
        doc.discard(wrapper);
        assert_eq!(doc.tag(wrapper), None);
        assert!(doc.video(video).is_none());
        assert!(!doc.is_bound(video));
        assert!(!doc.has_pending());
    }

    #[test]
    fn cycles_are_rejected() {
        let mut doc = MemoryDocument::new("https://a.test/");
        let outer = doc.create_element("div");
        let inner = doc.create_element("div");
        doc.append_child(outer, inner).unwrap();
        assert!(doc.append_child(inner, outer).is_err());
    }

    #[test]
    fn media_events_reach_bound_videos_only() {
        let mut doc = MemoryDocument::new("https://a.test/");
        let body = doc.body();
        let video = doc.create_video(MemoryVideo::default());
        doc.append_child(body, video).unwrap();

        doc.video_mut(video).unwrap().play();
        doc.bind_video(video);
        assert!(doc.next_event().is_none());

        doc.video_mut(video).unwrap().pause();
        assert_eq!(
            doc.next_event(),
            Some(HostEvent::Media {
                target: video,
                event: MediaEvent::Pause,
            })
        );

        doc.unbind_video(video);
        doc.video_mut(video).unwrap().play();
        doc.pointer(video, PointerEvent::Enter);
        assert!(doc.next_event().is_none());
    }

    #[test]
    fn volume_is_clamped_by_the_element() {
        let mut video = MemoryVideo::default();
        video.set_volume(-0.2);
        assert_eq!(video.volume(), 0.0);
        video.set_volume(3.0);
        assert_eq!(video.volume(), 1.0);
    }

    #[test]
    fn playback_reaching_the_end_pauses() {
        let mut video = MemoryVideo::default().with_loaded(2.0, false).playing();
        video.advance(5.0);
        assert!(video.paused());
        assert_eq!(video.current_time(), 2.0);
        assert_eq!(video.take_events(), vec![
            MediaEvent::TimeUpdate,
            MediaEvent::Pause,
            MediaEvent::Ended,
        ]);
    }
}
