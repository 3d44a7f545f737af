//! Mutation batch → registry operations.
//!
//! Planning is pure: it reads the document and the current registry
//! membership and returns the ordered operations the engine must apply.
//! Membership is simulated while planning so that a video added and removed
//! within one batch, or removed and re-added, yields a consistent plan.

use std::collections::HashSet;

use crate::{
    dom::{Document, MutationRecord, NodeId},
    registry::OverlayRegistry,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryOp {
    Install(NodeId),
    Destroy(NodeId),
}

/// Videos in the subtree rooted at `root`, including `root`, in document order.
pub fn descendant_videos<D: Document>(doc: &D, root: NodeId) -> Vec<NodeId> {
    let mut videos = Vec::new();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if doc.is_video(node) {
            videos.push(node);
        }
        let mut children = doc.children(node);
        children.reverse();
        stack.extend(children);
    }
    videos
}

/// Plan the registry changes for one mutation batch.
///
/// Records are handled in delivery order, added nodes before removed nodes
/// within a record. Added videos that are no longer attached by the time the
/// batch is handled are skipped.
pub fn reconcile<D: Document>(
    doc: &D,
    registry: &OverlayRegistry,
    batch: &[MutationRecord],
) -> Vec<RegistryOp> {
    let mut members: HashSet<NodeId> = registry.ids().into_iter().collect();
    let mut ops = Vec::new();

    for record in batch {
        for &added in &record.added {
            for video in descendant_videos(doc, added) {
                if doc.is_connected(video) && members.insert(video) {
                    ops.push(RegistryOp::Install(video));
                }
            }
        }
        for &removed in &record.removed {
            for video in descendant_videos(doc, removed) {
                if members.remove(&video) {
                    ops.push(RegistryOp::Destroy(video));
                }
            }
        }
    }
    ops
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{
            memory::{MemoryDocument, MemoryVideo},
            overlay::Overlay,
            template::{BUNDLED_MARKUP, OverlayTemplate},
        },
    };

    fn register(registry: &mut OverlayRegistry, video: NodeId) {
        let template = OverlayTemplate::parse(BUNDLED_MARKUP).unwrap();
        registry
            .insert(Overlay::new(video, template, &MemoryVideo::default()))
            .unwrap();
    }

    #[test]
    fn descendants_are_found_in_document_order() {
        let mut doc = MemoryDocument::new("https://a.test/");
        let body = doc.body();
        let section = doc.create_element("section");
        let first = doc.create_video(MemoryVideo::default());
        let nested = doc.create_element("div");
        let second = doc.create_video(MemoryVideo::default());
        doc.append_child(body, section).unwrap();
        doc.append_child(section, first).unwrap();
        doc.append_child(section, nested).unwrap();
        doc.append_child(nested, second).unwrap();

        assert_eq!(descendant_videos(&doc, body), vec![first, second]);
        assert_eq!(descendant_videos(&doc, second), vec![second]);
        let paragraph = doc.create_element("p");
        assert!(descendant_videos(&doc, paragraph).is_empty());
    }

    #[test]
    fn added_subtree_installs_unregistered_videos() {
        let mut doc = MemoryDocument::new("https://a.test/");
        let body = doc.body();
        let wrapper = doc.create_element("div");
        let known = doc.create_video(MemoryVideo::default());
        let fresh = doc.create_video(MemoryVideo::default());
        doc.append_child(wrapper, known).unwrap();
        doc.append_child(wrapper, fresh).unwrap();
        doc.append_child(body, wrapper).unwrap();

        let mut registry = OverlayRegistry::new();
        register(&mut registry, known);

        let batch = [MutationRecord {
            added: vec![wrapper],
            removed: vec![],
        }];
        assert_eq!(reconcile(&doc, &registry, &batch), vec![
            RegistryOp::Install(fresh)
        ]);
    }

    #[test]
    fn removed_subtree_destroys_registered_videos() {
        let mut doc = MemoryDocument::new("https://a.test/");
        let wrapper = doc.create_element("div");
        let video = doc.create_video(MemoryVideo::default());
        let stray = doc.create_video(MemoryVideo::default());
        doc.append_child(wrapper, video).unwrap();
        doc.append_child(wrapper, stray).unwrap();

        let mut registry = OverlayRegistry::new();
        register(&mut registry, video);

        let batch = [MutationRecord {
            added: vec![],
            removed: vec![wrapper],
        }];
        assert_eq!(reconcile(&doc, &registry, &batch), vec![
            RegistryOp::Destroy(video)
        ]);
    }

    #[test]
    fn moved_video_is_destroyed_then_reinstalled() {
        let mut doc = MemoryDocument::new("https://a.test/");
        let body = doc.body();
        let video = doc.create_video(MemoryVideo::default());
        doc.append_child(body, video).unwrap();

        let mut registry = OverlayRegistry::new();
        register(&mut registry, video);

        let batch = [
            MutationRecord {
                added: vec![],
                removed: vec![video],
            },
            MutationRecord {
                added: vec![video],
                removed: vec![],
            },
        ];
        assert_eq!(reconcile(&doc, &registry, &batch), vec![
            RegistryOp::Destroy(video),
            RegistryOp::Install(video),
        ]);
    }

    #[test]
    fn added_then_removed_in_one_batch_is_a_no_op() {
        let mut doc = MemoryDocument::new("https://a.test/");
        let video = doc.create_video(MemoryVideo::default());

        let batch = [MutationRecord {
            added: vec![video],
            removed: vec![video],
        }];
        assert!(reconcile(&doc, &OverlayRegistry::new(), &batch).is_empty());
    }
}
