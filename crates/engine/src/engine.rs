//! Per-tab control engine: initialization, mutation handling, and message
//! handling for one page load.

use std::sync::Arc;

use {
    avc_config::{Settings, SettingsStore},
    avc_protocol::{TabLoudness, ToContent},
    tracing::{debug, info, warn},
    url::Url,
};

#[cfg(feature = "metrics")]
use avc_metrics::{counter, overlays as overlay_metrics};

use crate::{
    background::{BackgroundClient, query_initial_state},
    dom::{Document, HostEvent, MediaElement, NodeId},
    error::{EngineError, Result},
    glob::page_qualifies,
    overlay::Overlay,
    reconcile::{RegistryOp, descendant_videos, reconcile},
    registry::OverlayRegistry,
    template::{TemplateSource, load_template},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Constructed, [`ControlEngine::start`] not called yet.
    Created,
    /// The page did not qualify. Nothing is observed and messages are ignored.
    Skipped,
    Running,
    /// The page was unloaded.
    TornDown,
}

/// Drives the overlays of one page.
pub struct ControlEngine<D: Document> {
    document: D,
    settings_store: Arc<dyn SettingsStore>,
    background: Arc<dyn BackgroundClient>,
    templates: Arc<dyn TemplateSource>,
    settings: Settings,
    origin: String,
    tab_is_loud: bool,
    state: EngineState,
    registry: OverlayRegistry,
}

impl<D: Document> ControlEngine<D> {
    pub fn new(
        document: D,
        settings_store: Arc<dyn SettingsStore>,
        background: Arc<dyn BackgroundClient>,
        templates: Arc<dyn TemplateSource>,
    ) -> Result<Self> {
        let origin = Url::parse(document.url())?.origin().ascii_serialization();
        Ok(Self {
            document,
            settings_store,
            background,
            templates,
            settings: Settings::default(),
            origin,
            tab_is_loud: false,
            state: EngineState::Created,
            registry: OverlayRegistry::new(),
        })
    }

    /// Run the page-load protocol: settings, qualification, initial
    /// loudness, initial scan, then mutation observation.
    pub async fn start(&mut self) -> EngineState {
        if self.state != EngineState::Created {
            debug!(state = ?self.state, "engine already started");
            return self.state;
        }

        self.settings = match self.settings_store.load().await {
            Ok(settings) => settings,
            Err(e) => {
                warn!(error = %e, "failed to read settings, using defaults");
                Settings::default()
            },
        };

        if !page_qualifies(&self.settings, self.document.url()) {
            debug!(url = self.document.url(), "page does not qualify, skipping");
            self.state = EngineState::Skipped;
            return self.state;
        }

        self.tab_is_loud = match query_initial_state(self.background.as_ref(), &self.origin).await
        {
            Ok(answer) => answer.tab_is_loud || !self.settings.always_mute,
            Err(e) => {
                warn!(origin = %self.origin, error = %e, "initial state query failed");
                !self.settings.always_mute
            },
        };

        let body = self.document.body();
        for video in descendant_videos(&self.document, body) {
            self.install_logged(video).await;
        }

        self.document.observe_mutations(body);
        self.state = EngineState::Running;
        info!(
            origin = %self.origin,
            loud = self.tab_is_loud,
            overlays = self.registry.len(),
            "control engine running"
        );
        self.state
    }

    /// Handle every pending host notification, in order. Returns how many
    /// were handled.
    pub async fn pump(&mut self) -> usize {
        let mut handled = 0;
        while let Some(event) = self.document.next_event() {
            self.dispatch(event).await;
            handled += 1;
        }
        handled
    }

    pub async fn dispatch(&mut self, event: HostEvent) {
        if self.state != EngineState::Running {
            debug!(state = ?self.state, "event dropped, engine not running");
            return;
        }

        match event {
            HostEvent::Mutations(batch) => {
                for op in reconcile(&self.document, &self.registry, &batch) {
                    match op {
                        RegistryOp::Install(video) => self.install_logged(video).await,
                        RegistryOp::Destroy(video) => self.destroy(video),
                    }
                }
            },
            HostEvent::Media { target, event } => {
                if let Some(overlay) = self.registry.get_mut(target)
                    && overlay.handle_media(event, &self.document)
                {
                    overlay.render(&mut self.document);
                }
            },
            HostEvent::Pointer { target, event } => {
                if let Some(overlay) = self.registry.get_mut(target) {
                    match overlay.handle_pointer(event, &mut self.document) {
                        Ok(true) => overlay.render(&mut self.document),
                        Ok(false) => {},
                        Err(e) => warn!(video = target, error = %e, "pointer input failed"),
                    }
                }
            },
            HostEvent::Intersection { target, visible } => {
                if let Some(overlay) = self.registry.get_mut(target)
                    && overlay.set_visible(visible)
                {
                    overlay.render(&mut self.document);
                }
            },
            HostEvent::Layout { target } => {
                if let Some(overlay) = self.registry.get_mut(target)
                    && overlay.position(&self.document)
                {
                    overlay.render(&mut self.document);
                }
            },
            HostEvent::Control { target, input } => {
                if let Some(overlay) = self.registry.get(target)
                    && let Err(e) = overlay.apply_control(input, &mut self.document)
                {
                    warn!(video = target, ?input, error = %e, "control input failed");
                }
            },
        }
    }

    /// Answer a message from the background context.
    pub fn handle_message(&mut self, message: ToContent) -> Option<TabLoudness> {
        if self.state != EngineState::Running {
            debug!(topic = message.topic(), "message ignored, engine not running");
            return None;
        }

        match message {
            ToContent::GetTabIsLoud => Some(TabLoudness {
                origin: self.origin.clone(),
                tab_is_loud: self.tab_is_loud,
            }),
            ToContent::SetTabIsLoud(loud) => {
                debug!(origin = %self.origin, loud, "tab loudness changed");
                self.tab_is_loud = loud;
                // Videos without an overlay are included: their native
                // controls are already disabled.
                let body = self.document.body();
                for video in descendant_videos(&self.document, body) {
                    if let Some(media) = self.document.video_mut(video) {
                        media.set_muted(!loud);
                    }
                }
                None
            },
        }
    }

    /// Install an overlay on `video`. Already registered videos are left as
    /// they are.
    pub async fn install(&mut self, video: NodeId) -> Result<()> {
        if self.registry.contains(video) {
            return Ok(());
        }

        let media = self
            .document
            .video_mut(video)
            .ok_or(EngineError::NotAVideo(video))?;
        media.set_controls(false);
        media.set_muted(!self.tab_is_loud);
        if let Some(volume) = self.settings.initial_volume_fraction() {
            media.set_volume(volume);
        }

        let template = load_template(self.templates.as_ref()).await?;

        let media = self
            .document
            .video(video)
            .ok_or(EngineError::UnknownNode(video))?;
        let mut overlay = Overlay::new(video, template, media);
        overlay.install(&mut self.document);
        if overlay.position(&self.document) {
            overlay.render(&mut self.document);
        }

        match self.registry.insert(overlay) {
            Ok(()) => {
                #[cfg(feature = "metrics")]
                counter!(overlay_metrics::INSTALLED_TOTAL).increment(1);
                debug!(video, "overlay installed");
            },
            Err(overlay) => overlay.destroy(&mut self.document),
        }
        Ok(())
    }

    /// Remove the overlay of `video`, if it has one.
    pub fn destroy(&mut self, video: NodeId) {
        if let Some(overlay) = self.registry.remove(video) {
            overlay.destroy(&mut self.document);
            #[cfg(feature = "metrics")]
            counter!(overlay_metrics::DESTROYED_TOTAL).increment(1);
            debug!(video, "overlay destroyed");
        }
    }

    /// Destroy overlays whose video left the page unnoticed. Returns how
    /// many were removed.
    pub fn prune(&mut self) -> usize {
        let document = &self.document;
        let stale = self.registry.prune(|video| document.is_connected(video));
        let count = stale.len();
        for overlay in stale {
            debug!(video = overlay.video(), "pruning detached overlay");
            overlay.destroy(&mut self.document);
        }
        #[cfg(feature = "metrics")]
        counter!(overlay_metrics::PRUNED_TOTAL).increment(count as u64);
        count
    }

    /// Page unload: stop observing and destroy every overlay.
    pub fn teardown(&mut self) {
        if self.state == EngineState::Running {
            self.document.disconnect_mutations();
        }
        for overlay in self.registry.drain() {
            overlay.destroy(&mut self.document);
        }
        self.state = EngineState::TornDown;
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn tab_is_loud(&self) -> bool {
        self.tab_is_loud
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn document(&self) -> &D {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut D {
        &mut self.document
    }

    pub fn overlay(&self, video: NodeId) -> Option<&Overlay> {
        self.registry.get(video)
    }

    pub fn overlay_count(&self) -> usize {
        self.registry.len()
    }

    pub fn registered_videos(&self) -> Vec<NodeId> {
        self.registry.ids()
    }

    async fn install_logged(&mut self, video: NodeId) {
        if let Err(e) = self.install(video).await {
            #[cfg(feature = "metrics")]
            counter!(overlay_metrics::INSTALL_ERRORS_TOTAL).increment(1);
            warn!(video, error = %e, "overlay not installed, native controls stay disabled");
        }
    }
}
