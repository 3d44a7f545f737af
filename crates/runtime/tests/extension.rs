#![allow(clippy::unwrap_used, clippy::expect_used)]
//! End-to-end behaviour of tabs, overlays and the mute coordinator.

use std::sync::Arc;

use {
    avc_config::{MemorySettingsStore, Settings},
    avc_coordinator::{HostMatcher, ToggleOutcome, ToolbarState},
    avc_engine::{
        ControlInput, Document, EngineState, MediaElement, MediaEvent, MemoryDocument,
        MemoryVideo, NodeId, StaticTemplate, template::classes,
    },
    avc_runtime::Extension,
};

fn extension(settings: Settings) -> Extension {
    Extension::new(Arc::new(MemorySettingsStore::with_settings(&settings).unwrap()))
}

fn page(url: &str, videos: usize) -> (MemoryDocument, Vec<NodeId>) {
    let mut doc = MemoryDocument::new(url);
    let body = doc.body();
    let ids = (0..videos)
        .map(|_| {
            let id = doc.create_video(MemoryVideo::default().with_loaded(90.0, true));
            doc.append_child(body, id).unwrap();
            id
        })
        .collect();
    (doc, ids)
}

async fn muted(ext: &Extension, tab: u32, video: NodeId) -> bool {
    ext.with_tab(tab, |engine| engine.document().video(video).unwrap().muted())
        .await
        .unwrap()
}

#[tokio::test]
async fn two_tabs_of_one_origin_converge_on_toggle() {
    let ext = extension(Settings::default());
    let (doc_a, videos_a) = page("https://video.example.com/a", 1);
    let (doc_b, videos_b) = page("https://video.example.com/b", 2);
    let (doc_c, videos_c) = page("https://elsewhere.example.com/", 1);
    let a = ext.open_tab(doc_a).await.unwrap();
    let b = ext.open_tab(doc_b).await.unwrap();
    let c = ext.open_tab(doc_c).await.unwrap();

    assert!(muted(&ext, a, videos_a[0]).await);
    assert!(ext.toolbar().shows(a, ToolbarState::for_loudness(false)));

    let outcome = ext.click_action(a).await;
    assert_eq!(outcome, ToggleOutcome::Toggled {
        matcher: HostMatcher::from_origin("https://video.example.com"),
        loud: true,
        notified: vec![a, b],
    });

    assert!(!muted(&ext, a, videos_a[0]).await);
    for video in &videos_b {
        assert!(!muted(&ext, b, *video).await);
    }
    assert!(muted(&ext, c, videos_c[0]).await);
    for tab in [a, b] {
        assert!(ext.toolbar().shows(tab, ToolbarState::for_loudness(true)));
        let loud = ext.with_tab(tab, |engine| engine.tab_is_loud()).await.unwrap();
        assert!(loud);
    }
    assert!(ext.toolbar().shows(c, ToolbarState::for_loudness(false)));

    // Overlays followed the volume change without a manual pump.
    let overlay_muted = ext
        .with_tab(b, |engine| engine.overlay(videos_b[1]).unwrap().is_muted())
        .await
        .unwrap();
    assert!(!overlay_muted);

    // Toggling from the other tab flips both back.
    ext.click_action(b).await;
    assert!(muted(&ext, a, videos_a[0]).await);
    assert!(ext.toolbar().shows(a, ToolbarState::for_loudness(false)));
}

#[tokio::test]
async fn loud_origin_survives_navigation_within_the_session() {
    let ext = extension(Settings::default());
    let (doc, _) = page("https://video.example.com/first", 1);
    let tab = ext.open_tab(doc).await.unwrap();
    ext.click_action(tab).await;

    let (doc, videos) = page("https://video.example.com/second", 1);
    ext.navigate(tab, doc).await.unwrap();
    assert!(!muted(&ext, tab, videos[0]).await);

    let (doc, videos) = page("https://other.example.com/", 1);
    let other = ext.open_tab(doc).await.unwrap();
    assert!(muted(&ext, other, videos[0]).await);
}

#[tokio::test]
async fn skipped_page_does_not_answer_the_toggle() {
    let settings = Settings {
        blacklist: vec!["*skip.example.com*".into()],
        ..Settings::default()
    };
    let ext = extension(settings);
    let (doc, videos) = page("https://skip.example.com/", 1);
    let tab = ext.open_tab(doc).await.unwrap();

    let state = ext.with_tab(tab, |engine| engine.state()).await.unwrap();
    assert_eq!(state, EngineState::Skipped);
    let controls = ext
        .with_tab(tab, |engine| engine.document().video(videos[0]).unwrap().controls())
        .await
        .unwrap();
    assert!(controls);

    assert_eq!(ext.click_action(tab).await, ToggleOutcome::Skipped { tab });
    assert!(ext.coordinator().loud_origins().await.is_empty());
}

#[tokio::test]
async fn overlays_follow_dom_mutations() {
    let ext = extension(Settings::default());
    let (doc, _) = page("https://feed.example.com/", 0);
    let tab = ext.open_tab(doc).await.unwrap();

    let (wrapper, video) = ext
        .with_tab(tab, |engine| {
            let doc = engine.document_mut();
            let body = doc.body();
            let wrapper = doc.create_element("article");
            let video = doc.create_video(MemoryVideo::default());
            doc.append_child(wrapper, video).unwrap();
            doc.append_child(body, wrapper).unwrap();
            (wrapper, video)
        })
        .await
        .unwrap();
    ext.pump(tab).await.unwrap();

    let installed = ext
        .with_tab(tab, |engine| {
            engine.overlay(video).is_some() && engine.document().overlay(video).is_some()
        })
        .await
        .unwrap();
    assert!(installed);
    assert!(muted(&ext, tab, video).await);

    ext.with_tab(tab, |engine| engine.document_mut().remove(wrapper).unwrap())
        .await
        .unwrap();
    ext.pump(tab).await.unwrap();
    let count = ext.with_tab(tab, |engine| engine.overlay_count()).await.unwrap();
    assert_eq!(count, 0);
}

#[tokio::test]
async fn repeated_pause_leaves_a_single_paused_class() {
    let ext = extension(Settings::default());
    let (doc, videos) = page("https://video.example.com/", 1);
    let tab = ext.open_tab(doc).await.unwrap();
    let video = videos[0];

    for _ in 0..3 {
        ext.with_tab(tab, |engine| {
            engine
                .document_mut()
                .video_mut(video)
                .unwrap()
                .pause();
        })
        .await
        .unwrap();
        ext.pump(tab).await.unwrap();
    }

    let classes_on_root = ext
        .with_tab(tab, |engine| engine.document().overlay(video).unwrap().classes.clone())
        .await
        .unwrap();
    assert!(classes_on_root.contains(classes::PAUSED));
    assert!(!classes_on_root.contains(classes::PLAYING));
}

#[tokio::test]
async fn volume_bar_boundaries_drive_mute() {
    let ext = extension(Settings::default());
    let (doc, videos) = page("https://video.example.com/", 1);
    let tab = ext.open_tab(doc).await.unwrap();
    let video = videos[0];

    ext.with_tab(tab, |engine| {
        engine
            .document_mut()
            .control(video, ControlInput::Volume(0.0))
    })
    .await
    .unwrap();
    ext.pump(tab).await.unwrap();
    assert!(muted(&ext, tab, video).await);

    ext.with_tab(tab, |engine| {
        engine
            .document_mut()
            .control(video, ControlInput::Volume(1.0))
    })
    .await
    .unwrap();
    ext.pump(tab).await.unwrap();
    assert!(!muted(&ext, tab, video).await);

    let view = ext
        .with_tab(tab, |engine| engine.document().overlay(video).unwrap().clone())
        .await
        .unwrap();
    assert_eq!(view.volume, 1.0);
    assert!(!view.has_class(classes::MUTED));
}

#[tokio::test]
async fn playback_runs_through_to_the_end() {
    let ext = extension(Settings::default());
    let (doc, videos) = page("https://video.example.com/", 1);
    let tab = ext.open_tab(doc).await.unwrap();
    let video = videos[0];

    ext.with_tab(tab, |engine| {
        engine.document_mut().control(video, ControlInput::PlayPause);
    })
    .await
    .unwrap();
    ext.pump_all().await;
    ext.with_tab(tab, |engine| {
        engine.document_mut().video_mut(video).unwrap().advance(120.0);
    })
    .await
    .unwrap();
    ext.pump_all().await;

    let view = ext
        .with_tab(tab, |engine| engine.document().overlay(video).unwrap().clone())
        .await
        .unwrap();
    assert!(view.has_class(classes::PAUSED));
    assert_eq!(view.progress, 1000.0);
    assert_eq!(view.timecode_current, "1:30");
    assert_eq!(view.timecode_duration, "1:30");
}

#[tokio::test]
async fn template_failure_keeps_the_page_running() {
    let store = MemorySettingsStore::new();
    let ext = Extension::with_templates(
        Arc::new(store),
        Arc::new(StaticTemplate::new("<div class=\"avc-play-pause\"></div>")),
    );
    let (doc, videos) = page("https://video.example.com/", 1);
    let tab = ext.open_tab(doc).await.unwrap();

    let (state, has_overlay, controls) = ext
        .with_tab(tab, |engine| {
            (
                engine.state(),
                engine.overlay(videos[0]).is_some(),
                engine.document().video(videos[0]).unwrap().controls(),
            )
        })
        .await
        .unwrap();
    assert_eq!(state, EngineState::Running);
    assert!(!has_overlay);
    assert!(!controls);

    // The tab still answers the coordinator.
    assert!(matches!(
        ext.click_action(tab).await,
        ToggleOutcome::Toggled { loud: true, .. }
    ));
}

#[tokio::test]
async fn closed_tabs_leave_the_broadcast() {
    let ext = extension(Settings::default());
    let (doc, _) = page("https://video.example.com/1", 1);
    let first = ext.open_tab(doc).await.unwrap();
    let (doc, _) = page("https://video.example.com/2", 1);
    let second = ext.open_tab(doc).await.unwrap();

    ext.close_tab(second).await.unwrap();
    assert!(ext.close_tab(second).await.is_err());
    assert!(ext.toolbar().icon(second).is_none());

    let ToggleOutcome::Toggled { notified, .. } = ext.click_action(first).await else {
        panic!("expected a toggle");
    };
    assert_eq!(notified, vec![first]);
    assert_eq!(ext.tab_ids().await, vec![first]);
}

#[tokio::test]
async fn media_events_for_the_video_reach_the_overlay() {
    let ext = extension(Settings::default());
    let (doc, videos) = page("https://video.example.com/", 1);
    let tab = ext.open_tab(doc).await.unwrap();
    let video = videos[0];

    let changed = ext
        .with_tab(tab, |engine| {
            engine.document_mut().video_mut(video).unwrap().play();
            engine.document_mut().next_event()
        })
        .await
        .unwrap();
    assert_eq!(
        changed,
        Some(avc_engine::HostEvent::Media {
            target: video,
            event: MediaEvent::Play,
        })
    );
}
