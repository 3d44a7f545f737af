//! Toolbar button state per tab.

use std::{collections::HashMap, sync::Mutex};

use {async_trait::async_trait, avc_protocol::TabId};

pub const ICON_LOUD: &str = "icons/speaker.svg";
pub const ICON_MUTED: &str = "icons/mute.svg";
pub const TITLE_LOUD: &str = "Mute videos on this domain";
pub const TITLE_MUTED: &str = "Un-mute videos on this domain";

/// What the toolbar button shows for one tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolbarState {
    pub icon: &'static str,
    pub title: &'static str,
}

impl ToolbarState {
    /// The button offers the opposite of the current state.
    pub fn for_loudness(loud: bool) -> Self {
        if loud {
            Self {
                icon: ICON_LOUD,
                title: TITLE_LOUD,
            }
        } else {
            Self {
                icon: ICON_MUTED,
                title: TITLE_MUTED,
            }
        }
    }
}

/// The browser's per-tab toolbar button.
#[async_trait]
pub trait Toolbar: Send + Sync {
    async fn set_icon(&self, tab: TabId, path: &str);
    async fn set_title(&self, tab: TabId, title: &str);
}

/// Toolbar that only remembers what it was told.
#[derive(Debug, Default)]
pub struct RecordingToolbar {
    icons: Mutex<HashMap<TabId, String>>,
    titles: Mutex<HashMap<TabId, String>>,
}

impl RecordingToolbar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn icon(&self, tab: TabId) -> Option<String> {
        let icons = self.icons.lock().unwrap_or_else(|e| e.into_inner());
        icons.get(&tab).cloned()
    }

    pub fn title(&self, tab: TabId) -> Option<String> {
        let titles = self.titles.lock().unwrap_or_else(|e| e.into_inner());
        titles.get(&tab).cloned()
    }

    /// Whether the tab currently shows `state`.
    pub fn shows(&self, tab: TabId, state: ToolbarState) -> bool {
        self.icon(tab).as_deref() == Some(state.icon)
            && self.title(tab).as_deref() == Some(state.title)
    }

    /// Tab closed: forget its button.
    pub fn forget(&self, tab: TabId) {
        self.icons
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&tab);
        self.titles
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&tab);
    }
}

#[async_trait]
impl Toolbar for RecordingToolbar {
    async fn set_icon(&self, tab: TabId, path: &str) {
        let mut icons = self.icons.lock().unwrap_or_else(|e| e.into_inner());
        icons.insert(tab, path.to_string());
    }

    async fn set_title(&self, tab: TabId, title: &str) {
        let mut titles = self.titles.lock().unwrap_or_else(|e| e.into_inner());
        titles.insert(tab, title.to_string());
    }
}

/// Apply the button state for `loud` to one tab.
pub async fn update_toolbar(toolbar: &dyn Toolbar, tab: TabId, loud: bool) {
    let state = ToolbarState::for_loudness(loud);
    toolbar.set_icon(tab, state.icon).await;
    toolbar.set_title(tab, state.title).await;
}
