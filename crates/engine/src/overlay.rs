//! Per-video control overlay.
//!
//! An overlay mirrors its video's state (play state, volume, progress,
//! audio presence) into a rendered [`OverlayView`], and turns input on its
//! affordances back into playback changes. It is both observer and
//! controller: a control never updates the view directly, the media event
//! that follows does.

use std::collections::BTreeSet;

use tracing::debug;

use crate::{
    dom::{
        ControlInput, Document, ElementLayout, MediaElement, MediaEvent, NodeId, PointerEvent,
        ReadyState,
    },
    error::{EngineError, Result},
    template::{OverlayTemplate, PROGRESS_MAX, VOLUME_MAX, classes},
    timecode::format_time,
};

/// Volume applied when un-muting a video whose volume is zero.
pub const UNMUTE_VOLUME: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayState {
    #[default]
    Paused,
    Playing,
}

/// Absolute position of the control bar in document coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Placement {
    pub top: f64,
    pub left: f64,
    pub width: f64,
}

impl Placement {
    /// Bar aligned to the bottom edge of the video picture, full width.
    pub fn for_video(layout: &ElementLayout, scroll: (f64, f64), bar_height: f64) -> Self {
        let picture = layout.picture_rect();
        Self {
            top: scroll.1 + picture.bottom() - bar_height,
            left: scroll.0 + picture.left,
            width: picture.width,
        }
    }
}

/// Rendered state of an overlay subtree.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayView {
    /// State classes on the overlay root.
    pub classes: BTreeSet<&'static str>,
    /// Whether the overlay is displayed at all.
    pub displayed: bool,
    pub placement: Placement,
    /// Progress bar value, `0..=1000`.
    pub progress: f64,
    /// Volume bar value, `0..=100`.
    pub volume: f64,
    pub timecode_current: String,
    pub timecode_duration: String,
}

impl OverlayView {
    pub fn has_class(&self, class: &str) -> bool {
        self.classes.contains(class)
    }
}

/// Custom controls attached to one video element.
#[derive(Debug)]
pub struct Overlay {
    video: NodeId,
    template: OverlayTemplate,
    play_state: PlayState,
    muted: bool,
    has_audio: bool,
    mouse_in: bool,
    visible: bool,
    /// Last intersection report, if any arrived yet.
    intersecting: Option<bool>,
    loaded: bool,
    placement: Placement,
    progress: f64,
    volume: f64,
    timecode_current: String,
    timecode_duration: String,
}

impl Overlay {
    /// Build an overlay for `video` without touching the page.
    pub fn new<M: MediaElement>(video: NodeId, template: OverlayTemplate, media: &M) -> Self {
        let mut overlay = Self {
            video,
            template,
            play_state: if media.paused() {
                PlayState::Paused
            } else {
                PlayState::Playing
            },
            muted: media.muted(),
            has_audio: false,
            mouse_in: false,
            visible: false,
            intersecting: None,
            loaded: false,
            placement: Placement::default(),
            progress: 0.0,
            volume: 0.0,
            timecode_current: format_time(0.0),
            timecode_duration: format_time(0.0),
        };
        overlay.update_volume(media.volume(), media.muted());
        overlay
    }

    /// Insert the overlay into the page and start listening to its video.
    ///
    /// A video that already has a frame loaded is treated as if
    /// `loadeddata` had just fired.
    pub fn install<D: Document>(&mut self, doc: &mut D) {
        doc.bind_video(self.video);
        let ready = doc
            .video(self.video)
            .is_some_and(|media| media.ready_state() > ReadyState::HaveMetadata);
        if ready {
            self.on_loaded_data(doc);
        }
        self.render(doc);
    }

    /// Stop listening and remove the overlay subtree.
    pub fn destroy<D: Document>(self, doc: &mut D) {
        doc.unbind_video(self.video);
        doc.remove_overlay(self.video);
    }

    /// Recompute the bar's rectangle from the video's current layout.
    pub fn position<D: Document>(&mut self, doc: &D) -> bool {
        let Some(media) = doc.video(self.video) else {
            return false;
        };
        let placement = Placement::for_video(
            &media.layout(),
            doc.scroll_offset(),
            self.template.bar_height(),
        );
        let changed = placement != self.placement;
        self.placement = placement;
        changed
    }

    pub fn render<D: Document>(&self, doc: &mut D) {
        doc.render_overlay(self.video, &self.view());
    }

    /// React to a native media event. Returns whether the view changed.
    pub fn handle_media<D: Document>(&mut self, event: MediaEvent, doc: &D) -> bool {
        self.track(|overlay| match event {
            MediaEvent::Play | MediaEvent::Playing => overlay.play_state = PlayState::Playing,
            MediaEvent::Pause | MediaEvent::Ended => overlay.play_state = PlayState::Paused,
            MediaEvent::TimeUpdate => {
                if let Some(media) = doc.video(overlay.video) {
                    overlay.update_progress(media.current_time(), media.duration());
                }
            },
            MediaEvent::VolumeChange => {
                if let Some(media) = doc.video(overlay.video) {
                    overlay.update_volume(media.volume(), media.muted());
                }
            },
            MediaEvent::LoadedData => overlay.on_loaded_data(doc),
        })
    }

    /// React to pointer activity over the video.
    pub fn handle_pointer<D: Document>(&mut self, event: PointerEvent, doc: &mut D) -> Result<bool> {
        match event {
            PointerEvent::Enter => Ok(self.track(|o| o.mouse_in = true)),
            PointerEvent::Leave => Ok(self.track(|o| o.mouse_in = false)),
            PointerEvent::Click => {
                self.apply_control(ControlInput::PlayPause, doc)?;
                Ok(false)
            },
        }
    }

    /// Show or hide the overlay as the video scrolls in and out of view.
    pub fn set_visible(&mut self, visible: bool) -> bool {
        self.track(|o| {
            o.intersecting = Some(visible);
            o.visible = visible;
        })
    }

    /// Apply control input to the video. The view follows through the media
    /// events the video fires in response.
    pub fn apply_control<D: Document>(&self, input: ControlInput, doc: &mut D) -> Result<()> {
        let media = doc
            .video_mut(self.video)
            .ok_or(EngineError::UnknownNode(self.video))?;

        match input {
            ControlInput::PlayPause => {
                if media.paused() {
                    media.play();
                } else {
                    media.pause();
                }
            },
            ControlInput::Mute => {
                if media.muted() {
                    media.set_muted(false);
                    if media.volume() <= 0.0 {
                        media.set_volume(UNMUTE_VOLUME);
                    }
                } else {
                    media.set_muted(true);
                }
            },
            ControlInput::Fullscreen => media.request_fullscreen()?,
            ControlInput::Seek(value) => {
                let duration = media.duration();
                if duration.is_finite() {
                    media.set_current_time(value / PROGRESS_MAX * duration);
                } else {
                    debug!(video = self.video, "seek ignored, duration unknown");
                }
            },
            ControlInput::Volume(value) => {
                media.set_volume(value / VOLUME_MAX);
                media.set_muted(value <= 0.0);
            },
        }
        Ok(())
    }

    pub fn view(&self) -> OverlayView {
        let mut state = BTreeSet::new();
        state.insert(match self.play_state {
            PlayState::Paused => classes::PAUSED,
            PlayState::Playing => classes::PLAYING,
        });
        if self.muted {
            state.insert(classes::MUTED);
        }
        if !self.has_audio {
            state.insert(classes::NO_AUDIO);
        }
        if self.mouse_in {
            state.insert(classes::MOUSE_IN);
        }

        OverlayView {
            classes: state,
            displayed: self.visible,
            placement: self.placement,
            progress: self.progress,
            volume: self.volume,
            timecode_current: self.timecode_current.clone(),
            timecode_duration: self.timecode_duration.clone(),
        }
    }

    pub fn video(&self) -> NodeId {
        self.video
    }

    pub fn play_state(&self) -> PlayState {
        self.play_state
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn has_audio(&self) -> bool {
        self.has_audio
    }

    pub fn is_mouse_in(&self) -> bool {
        self.mouse_in
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn placement(&self) -> Placement {
        self.placement
    }

    /// First frame available: audio can be probed and layout is meaningful.
    fn on_loaded_data<D: Document>(&mut self, doc: &D) {
        if self.loaded {
            return;
        }
        self.loaded = true;

        if let Some(media) = doc.video(self.video) {
            self.update_volume(media.volume(), media.muted());
            self.has_audio = media.has_audio();
        }
        // Shown unless the video was already reported off screen.
        self.visible = self.intersecting.unwrap_or(true);
        self.position(doc);
    }

    fn update_progress(&mut self, current_time: f64, duration: f64) {
        // Keep the last known position while the duration is unknown.
        if duration.is_finite() && duration > 0.0 {
            self.progress = (PROGRESS_MAX * current_time / duration).clamp(0.0, PROGRESS_MAX);
        }
        self.timecode_current = format_time(current_time);
        self.timecode_duration = format_time(duration);
    }

    fn update_volume(&mut self, volume: f64, muted: bool) {
        self.muted = muted;
        self.volume = if muted {
            0.0
        } else {
            VOLUME_MAX * volume
        };
    }

    fn track(&mut self, apply: impl FnOnce(&mut Self)) -> bool {
        let before = self.view();
        apply(self);
        self.view() != before
    }
}
