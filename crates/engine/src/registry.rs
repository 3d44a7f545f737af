//! Video → overlay registry.
//!
//! Membership mirrors "this video currently has an installed overlay".
//! Lookups never insert, and entries for videos that left the page without
//! a removal notification are swept by [`OverlayRegistry::prune`].

use std::collections::HashMap;

use crate::{dom::NodeId, overlay::Overlay};

#[derive(Debug, Default)]
pub struct OverlayRegistry {
    entries: HashMap<NodeId, Overlay>,
}

impl OverlayRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, video: NodeId) -> bool {
        self.entries.contains_key(&video)
    }

    pub fn get(&self, video: NodeId) -> Option<&Overlay> {
        self.entries.get(&video)
    }

    pub fn get_mut(&mut self, video: NodeId) -> Option<&mut Overlay> {
        self.entries.get_mut(&video)
    }

    /// Register an overlay. A video already holding one is left untouched and
    /// the new overlay is handed back.
    pub fn insert(&mut self, overlay: Overlay) -> Result<(), Overlay> {
        let video = overlay.video();
        if self.entries.contains_key(&video) {
            return Err(overlay);
        }
        self.entries.insert(video, overlay);
        Ok(())
    }

    pub fn remove(&mut self, video: NodeId) -> Option<Overlay> {
        self.entries.remove(&video)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered videos in ascending id order.
    pub fn ids(&self) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = self.entries.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Remove every entry.
    pub fn drain(&mut self) -> Vec<Overlay> {
        let mut overlays: Vec<Overlay> = self.entries.drain().map(|(_, o)| o).collect();
        overlays.sort_unstable_by_key(Overlay::video);
        overlays
    }

    /// Remove entries whose video is no longer attached.
    pub fn prune(&mut self, is_connected: impl Fn(NodeId) -> bool) -> Vec<Overlay> {
        let stale: Vec<NodeId> = self
            .ids()
            .into_iter()
            .filter(|id| !is_connected(*id))
            .collect();
        stale
            .into_iter()
            .filter_map(|id| self.entries.remove(&id))
            .collect()
    }
}
