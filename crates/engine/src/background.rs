//! Content-side view of the background context.

use {
    async_trait::async_trait,
    avc_protocol::{InitialState, InitialStateRequest, ProtocolError, ToBackground, decode},
    serde_json::Value,
};

/// Channel from a tab's content script to the background context.
#[async_trait]
pub trait BackgroundClient: Send + Sync {
    /// Send a message and wait for the raw answer.
    async fn send(&self, message: ToBackground) -> Result<Value, ProtocolError>;
}

/// Ask the coordinator whether pages of `origin` are currently loud.
pub async fn query_initial_state(
    client: &dyn BackgroundClient,
    origin: &str,
) -> Result<InitialState, ProtocolError> {
    let answer = client
        .send(ToBackground::GetInitialState(InitialStateRequest {
            origin: origin.to_string(),
        }))
        .await?;
    decode(answer)
}

/// A background that is never reachable, e.g. while the extension reloads.
#[derive(Debug, Default, Clone, Copy)]
pub struct Disconnected;

#[async_trait]
impl BackgroundClient for Disconnected {
    async fn send(&self, message: ToBackground) -> Result<Value, ProtocolError> {
        Err(ProtocolError::NoResponse {
            topic: message.topic(),
        })
    }
}
