//! The whole extension in one process: a background coordinator and one
//! control engine per open tab.

use std::sync::{
    Arc,
    atomic::{AtomicU32, Ordering},
};

use {
    avc_common::{Error, Result},
    avc_config::SettingsStore,
    avc_coordinator::{MuteCoordinator, RecordingToolbar, ToggleOutcome},
    avc_engine::{BundledTemplate, ControlEngine, Document, MemoryDocument, TemplateSource},
    avc_protocol::TabId,
    futures::future::join_all,
    tokio::sync::Mutex,
    tracing::{debug, info},
};

use crate::{
    port::BackgroundPort,
    tabs::{SharedEngine, TabTable},
};

pub struct Extension {
    settings: Arc<dyn SettingsStore>,
    templates: Arc<dyn TemplateSource>,
    tabs: Arc<TabTable>,
    toolbar: Arc<RecordingToolbar>,
    coordinator: Arc<MuteCoordinator>,
    next_tab: AtomicU32,
}

impl Extension {
    /// Extension with the bundled overlay template.
    pub fn new(settings: Arc<dyn SettingsStore>) -> Self {
        Self::with_templates(settings, Arc::new(BundledTemplate))
    }

    pub fn with_templates(
        settings: Arc<dyn SettingsStore>,
        templates: Arc<dyn TemplateSource>,
    ) -> Self {
        let tabs = Arc::new(TabTable::new());
        let toolbar = Arc::new(RecordingToolbar::new());
        let coordinator = Arc::new(MuteCoordinator::new(
            settings.clone(),
            tabs.clone(),
            toolbar.clone(),
        ));
        Self {
            settings,
            templates,
            tabs,
            toolbar,
            coordinator,
            next_tab: AtomicU32::new(1),
        }
    }

    /// Open a new tab showing `document` and run its page-load protocol.
    pub async fn open_tab(&self, document: MemoryDocument) -> Result<TabId> {
        let tab = self.next_tab.fetch_add(1, Ordering::Relaxed);
        self.load(tab, document).await?;
        info!(tab, "tab opened");
        Ok(tab)
    }

    /// Replace the page shown in `tab`. The old page is unloaded first.
    pub async fn navigate(&self, tab: TabId, document: MemoryDocument) -> Result<()> {
        if self.tabs.engine(tab).await.is_none() {
            return Err(Error::message(format!("no tab {tab}")));
        }
        self.load(tab, document).await
    }

    pub async fn close_tab(&self, tab: TabId) -> Result<()> {
        let engine = self
            .tabs
            .remove(tab)
            .await
            .ok_or_else(|| Error::message(format!("no tab {tab}")))?;
        engine.lock().await.teardown();
        self.toolbar.forget(tab);
        info!(tab, "tab closed");
        Ok(())
    }

    /// Toolbar button clicked while `tab` is active.
    pub async fn click_action(&self, tab: TabId) -> ToggleOutcome {
        self.coordinator.toggle(tab).await
    }

    /// Deliver the pending page notifications of one tab.
    pub async fn pump(&self, tab: TabId) -> Result<usize> {
        let engine = self.engine(tab).await?;
        let handled = engine.lock().await.pump().await;
        Ok(handled)
    }

    /// Deliver pending page notifications in every tab.
    pub async fn pump_all(&self) -> usize {
        let mut engines = Vec::new();
        for tab in self.tabs.ids().await {
            if let Some(engine) = self.tabs.engine(tab).await {
                engines.push(engine);
            }
        }
        let pumps = engines.iter().map(|engine| async move {
            engine.lock().await.pump().await
        });
        join_all(pumps).await.into_iter().sum()
    }

    /// Run `f` against the engine of the page loaded in `tab`.
    pub async fn with_tab<R>(
        &self,
        tab: TabId,
        f: impl FnOnce(&mut ControlEngine<MemoryDocument>) -> R,
    ) -> Result<R> {
        let engine = self.engine(tab).await?;
        let mut engine = engine.lock().await;
        Ok(f(&mut *engine))
    }

    pub async fn tab_ids(&self) -> Vec<TabId> {
        self.tabs.ids().await
    }

    pub fn coordinator(&self) -> &MuteCoordinator {
        &self.coordinator
    }

    pub fn toolbar(&self) -> &RecordingToolbar {
        &self.toolbar
    }

    async fn engine(&self, tab: TabId) -> Result<SharedEngine> {
        self.tabs
            .engine(tab)
            .await
            .ok_or_else(|| Error::message(format!("no tab {tab}")))
    }

    async fn load(&self, tab: TabId, document: MemoryDocument) -> Result<()> {
        let url = document.url().to_string();
        let port = Arc::new(BackgroundPort::new(tab, Arc::downgrade(&self.coordinator)));
        let engine = ControlEngine::new(
            document,
            self.settings.clone(),
            port,
            self.templates.clone(),
        )
        .map_err(Error::other)?;
        let engine = Arc::new(Mutex::new(engine));

        if let Some(previous) = self.tabs.insert(tab, url.as_str(), engine.clone()).await {
            previous.lock().await.teardown();
        }

        let state = engine.lock().await.start().await;
        debug!(tab, url = %url, ?state, "page loaded");
        Ok(())
    }
}
