//! Content ↔ background message definitions.
//!
//! All messages are JSON objects tagged by `topic`, with an optional `data`
//! payload, matching the extension runtime's structured-clone message channel.
//!
//! Topics:
//! - `get-initial-state`: content → background, answered with [`InitialState`]
//! - `get-tab-is-loud`: background → content, answered with [`TabLoudness`]
//! - `set-tab-is-loud`: background → content push, no answer

use {
    serde::{Deserialize, Serialize, de::DeserializeOwned},
    thiserror::Error,
};

// ── Identifiers ──────────────────────────────────────────────────────────────

/// Browser tab identifier, as assigned by the host browser.
pub type TabId = u32;

pub mod topics {
    pub const GET_INITIAL_STATE: &str = "get-initial-state";
    pub const GET_TAB_IS_LOUD: &str = "get-tab-is-loud";
    pub const SET_TAB_IS_LOUD: &str = "set-tab-is-loud";
}

// ── Errors ───────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("no response to {topic}")]
    NoResponse { topic: &'static str },

    #[error("receiving end does not exist (tab {tab_id})")]
    Unreachable { tab_id: TabId },
}

// ── Messages ─────────────────────────────────────────────────────────────────

/// Messages sent by a content script to the background context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "topic", content = "data")]
pub enum ToBackground {
    #[serde(rename = "get-initial-state")]
    GetInitialState(InitialStateRequest),
}

impl ToBackground {
    pub fn topic(&self) -> &'static str {
        match self {
            Self::GetInitialState(_) => topics::GET_INITIAL_STATE,
        }
    }
}

/// Messages sent by the background context to one tab's content script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "topic", content = "data")]
pub enum ToContent {
    #[serde(rename = "get-tab-is-loud")]
    GetTabIsLoud,
    /// Fire-and-forget push of the tab's new loudness.
    #[serde(rename = "set-tab-is-loud")]
    SetTabIsLoud(bool),
}

impl ToContent {
    pub fn topic(&self) -> &'static str {
        match self {
            Self::GetTabIsLoud => topics::GET_TAB_IS_LOUD,
            Self::SetTabIsLoud(_) => topics::SET_TAB_IS_LOUD,
        }
    }

    /// Whether the sender waits for an answer.
    pub fn expects_response(&self) -> bool {
        matches!(self, Self::GetTabIsLoud)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitialStateRequest {
    pub origin: String,
}

/// Answer to `get-initial-state`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitialState {
    pub tab_is_loud: bool,
}

/// Answer to `get-tab-is-loud`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabLoudness {
    pub origin: String,
    pub tab_is_loud: bool,
}

// ── Encoding ─────────────────────────────────────────────────────────────────

/// Serialize a message or answer for the channel.
pub fn encode<T: Serialize>(message: &T) -> Result<serde_json::Value, ProtocolError> {
    Ok(serde_json::to_value(message)?)
}

/// Deserialize a message or answer received from the channel.
pub fn decode<T: DeserializeOwned>(value: serde_json::Value) -> Result<T, ProtocolError> {
    Ok(serde_json::from_value(value)?)
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, serde_json::json};

    #[test]
    fn initial_state_request_wire_shape() {
        let msg = ToBackground::GetInitialState(InitialStateRequest {
            origin: "https://video.example.com".into(),
        });
        assert_eq!(
            encode(&msg).unwrap(),
            json!({
                "topic": "get-initial-state",
                "data": { "origin": "https://video.example.com" }
            })
        );
        assert_eq!(msg.topic(), topics::GET_INITIAL_STATE);
    }

    #[test]
    fn content_topics_wire_shape() {
        assert_eq!(
            encode(&ToContent::GetTabIsLoud).unwrap(),
            json!({ "topic": "get-tab-is-loud" })
        );
        assert_eq!(
            encode(&ToContent::SetTabIsLoud(true)).unwrap(),
            json!({ "topic": "set-tab-is-loud", "data": true })
        );
    }

    #[test]
    fn answers_use_camel_case() {
        assert_eq!(
            encode(&InitialState { tab_is_loud: true }).unwrap(),
            json!({ "tabIsLoud": true })
        );
        let answer: TabLoudness = decode(json!({
            "origin": "http://localhost:8080",
            "tabIsLoud": false
        }))
        .unwrap();
        assert_eq!(answer.origin, "http://localhost:8080");
        assert!(!answer.tab_is_loud);
    }

    #[test]
    fn unknown_topic_is_malformed() {
        let err = decode::<ToContent>(json!({ "topic": "avc-reload" })).unwrap_err();
        assert!(matches!(err, ProtocolError::Malformed(_)));
    }

    #[test]
    fn only_queries_expect_answers() {
        assert!(ToContent::GetTabIsLoud.expects_response());
        assert!(!ToContent::SetTabIsLoud(false).expects_response());
    }
}
