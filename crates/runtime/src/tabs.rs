//! Open tabs and their content engines.

use std::{collections::HashMap, sync::Arc};

use {
    async_trait::async_trait,
    avc_coordinator::{HostMatcher, Tabs},
    avc_engine::{ControlEngine, MemoryDocument},
    avc_protocol::{ProtocolError, TabId, ToContent, decode, encode},
    serde_json::Value,
    tokio::sync::{Mutex, RwLock},
    tracing::debug,
};

pub type SharedEngine = Arc<Mutex<ControlEngine<MemoryDocument>>>;

struct TabEntry {
    url: String,
    engine: SharedEngine,
}

/// Tab id → the engine of the page currently loaded in it.
#[derive(Default)]
pub struct TabTable {
    tabs: RwLock<HashMap<TabId, TabEntry>>,
}

impl TabTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a page into `tab`, returning the engine of the page it replaces.
    pub async fn insert(
        &self,
        tab: TabId,
        url: impl Into<String>,
        engine: SharedEngine,
    ) -> Option<SharedEngine> {
        let entry = TabEntry {
            url: url.into(),
            engine,
        };
        self.tabs
            .write()
            .await
            .insert(tab, entry)
            .map(|previous| previous.engine)
    }

    pub async fn remove(&self, tab: TabId) -> Option<SharedEngine> {
        self.tabs.write().await.remove(&tab).map(|entry| entry.engine)
    }

    pub async fn engine(&self, tab: TabId) -> Option<SharedEngine> {
        self.tabs.read().await.get(&tab).map(|entry| entry.engine.clone())
    }

    pub async fn url(&self, tab: TabId) -> Option<String> {
        self.tabs.read().await.get(&tab).map(|entry| entry.url.clone())
    }

    pub async fn ids(&self) -> Vec<TabId> {
        let mut ids: Vec<TabId> = self.tabs.read().await.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}

#[async_trait]
impl Tabs for TabTable {
    async fn send(&self, tab: TabId, message: ToContent) -> Result<Option<Value>, ProtocolError> {
        let engine = self
            .engine(tab)
            .await
            .ok_or(ProtocolError::Unreachable { tab_id: tab })?;

        let message: ToContent = decode(encode(&message)?)?;
        let mut engine = engine.lock().await;
        let answer = engine.handle_message(message);
        if !message.expects_response() {
            // Let the overlays observe the resulting volume changes.
            let handled = engine.pump().await;
            debug!(tab, topic = message.topic(), handled, "message applied");
        }

        answer.map(|answer| encode(&answer)).transpose()
    }

    async fn tabs_matching(&self, matcher: &HostMatcher) -> Vec<TabId> {
        let mut ids: Vec<TabId> = self
            .tabs
            .read()
            .await
            .iter()
            .filter(|(_, entry)| matcher.matches(&entry.url))
            .map(|(tab, _)| *tab)
            .collect();
        ids.sort_unstable();
        ids
    }
}
