//! The background mute coordinator.
//!
//! Owns the session's loud-origin set. Tabs reach it only through messages:
//! each page asks for its initial state on load, and a toolbar click flips
//! the clicked tab's origin and pushes the new state to every tab of that
//! origin.

use std::{collections::HashSet, sync::Arc};

use {
    async_trait::async_trait,
    avc_config::{Settings, SettingsStore},
    avc_protocol::{
        InitialState, ProtocolError, TabId, TabLoudness, ToBackground, ToContent, decode, encode,
    },
    serde_json::Value,
    tokio::sync::RwLock,
    tracing::{debug, info, warn},
};

#[cfg(feature = "metrics")]
use avc_metrics::{coordinator as coord_metrics, counter, gauge, labels};

use crate::{
    error::Result,
    matcher::HostMatcher,
    toolbar::{Toolbar, update_toolbar},
};

// ── Tabs ────────────────────────────────────────────────────────────────────

/// The browser's open tabs, as seen from the background context.
#[async_trait]
pub trait Tabs: Send + Sync {
    /// Deliver a message to a tab's content script. `Ok(None)` means the
    /// tab received it but nothing answered.
    async fn send(
        &self,
        tab: TabId,
        message: ToContent,
    ) -> std::result::Result<Option<Value>, ProtocolError>;

    /// Open tabs whose URL falls under `matcher`.
    async fn tabs_matching(&self, matcher: &HostMatcher) -> Vec<TabId>;
}

// ── Coordinator ─────────────────────────────────────────────────────────────

/// Result of a toolbar click.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// The clicked tab did not answer; nothing changed.
    Skipped { tab: TabId },
    Toggled {
        matcher: HostMatcher,
        loud: bool,
        /// Tabs the new state was delivered to.
        notified: Vec<TabId>,
    },
}

pub struct MuteCoordinator {
    settings: Arc<dyn SettingsStore>,
    tabs: Arc<dyn Tabs>,
    toolbar: Arc<dyn Toolbar>,
    loud: RwLock<HashSet<HostMatcher>>,
}

impl MuteCoordinator {
    pub fn new(
        settings: Arc<dyn SettingsStore>,
        tabs: Arc<dyn Tabs>,
        toolbar: Arc<dyn Toolbar>,
    ) -> Self {
        Self {
            settings,
            tabs,
            toolbar,
            loud: RwLock::new(HashSet::new()),
        }
    }

    /// Route a content script message and produce its answer.
    pub async fn handle_message(&self, tab: TabId, message: ToBackground) -> Result<Value> {
        match message {
            ToBackground::GetInitialState(request) => {
                let state = self.initial_state(tab, &request.origin).await;
                Ok(encode(&state)?)
            },
        }
    }

    /// Loudness for a page of `origin` that just loaded in `tab`.
    pub async fn initial_state(&self, tab: TabId, origin: &str) -> InitialState {
        let matcher = HostMatcher::from_origin(origin);
        let listed = self.loud.read().await.contains(&matcher);
        let tab_is_loud = listed || !self.load_settings().await.always_mute;

        update_toolbar(self.toolbar.as_ref(), tab, tab_is_loud).await;
        debug!(tab, %matcher, tab_is_loud, "initial state");
        InitialState { tab_is_loud }
    }

    /// Toolbar click on `tab`: flip its origin and push the result to every
    /// tab of that origin.
    pub async fn toggle(&self, tab: TabId) -> ToggleOutcome {
        let current = match self.tabs.send(tab, ToContent::GetTabIsLoud).await {
            Ok(Some(answer)) => decode::<TabLoudness>(answer),
            Ok(None) => Err(ProtocolError::NoResponse {
                topic: ToContent::GetTabIsLoud.topic(),
            }),
            Err(e) => Err(e),
        };
        let current = match current {
            Ok(current) => current,
            Err(e) => {
                debug!(tab, error = %e, "toggle skipped, tab did not answer");
                #[cfg(feature = "metrics")]
                counter!(coord_metrics::TOGGLES_SKIPPED_TOTAL).increment(1);
                return ToggleOutcome::Skipped { tab };
            },
        };

        let matcher = HostMatcher::from_origin(&current.origin);
        let loud = !current.tab_is_loud;
        {
            let mut set = self.loud.write().await;
            if loud {
                set.insert(matcher.clone());
            } else {
                set.remove(&matcher);
            }
            #[cfg(feature = "metrics")]
            gauge!(coord_metrics::LOUD_ORIGINS).set(set.len() as f64);
        }

        #[cfg(feature = "metrics")]
        counter!(
            coord_metrics::TOGGLES_TOTAL,
            labels::ORIGIN => matcher.to_string(),
            labels::LOUD => loud.to_string()
        )
        .increment(1);

        let mut notified = Vec::new();
        for target in self.tabs.tabs_matching(&matcher).await {
            update_toolbar(self.toolbar.as_ref(), target, loud).await;
            match self.tabs.send(target, ToContent::SetTabIsLoud(loud)).await {
                Ok(_) => notified.push(target),
                Err(e) => warn!(tab = target, error = %e, "failed to push loudness"),
            }
        }

        info!(%matcher, loud, tabs = notified.len(), "origin toggled");
        ToggleOutcome::Toggled {
            matcher,
            loud,
            notified,
        }
    }

    pub async fn is_loud(&self, matcher: &HostMatcher) -> bool {
        self.loud.read().await.contains(matcher)
    }

    /// Snapshot of the loud-origin set, sorted.
    pub async fn loud_origins(&self) -> Vec<HostMatcher> {
        let mut matchers: Vec<HostMatcher> = self.loud.read().await.iter().cloned().collect();
        matchers.sort();
        matchers
    }

    async fn load_settings(&self) -> Settings {
        match self.settings.load().await {
            Ok(settings) => settings,
            Err(e) => {
                warn!(error = %e, "failed to read settings, using defaults");
                Settings::default()
            },
        }
    }
}
