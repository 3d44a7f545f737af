//! Content → background channel for one tab.

use std::sync::Weak;

use {
    async_trait::async_trait,
    avc_coordinator::{CoordinatorError, MuteCoordinator},
    avc_engine::BackgroundClient,
    avc_protocol::{ProtocolError, TabId, ToBackground, decode, encode},
    serde_json::Value,
};

/// Delivers a tab's messages to the coordinator through their JSON form.
///
/// Holds the coordinator weakly: the coordinator reaches the tab's engine
/// through the tab table, and the engine owns this port.
pub struct BackgroundPort {
    tab: TabId,
    coordinator: Weak<MuteCoordinator>,
}

impl BackgroundPort {
    pub fn new(tab: TabId, coordinator: Weak<MuteCoordinator>) -> Self {
        Self { tab, coordinator }
    }
}

#[async_trait]
impl BackgroundClient for BackgroundPort {
    async fn send(&self, message: ToBackground) -> Result<Value, ProtocolError> {
        let topic = message.topic();
        let Some(coordinator) = self.coordinator.upgrade() else {
            return Err(ProtocolError::NoResponse { topic });
        };

        let message: ToBackground = decode(encode(&message)?)?;
        coordinator
            .handle_message(self.tab, message)
            .await
            .map_err(|CoordinatorError::Protocol(e)| e)
    }
}
