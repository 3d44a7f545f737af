//! Engine error types.

use {avc_protocol::ProtocolError, thiserror::Error};

use crate::dom::NodeId;

/// Errors that can occur while driving overlays.
///
/// None of these are fatal to the page: the engine logs them and leaves the
/// affected video with native controls disabled.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("overlay template has no element with class {class}")]
    TemplateMissingClass { class: &'static str },

    #[error("node {0} is not a video element")]
    NotAVideo(NodeId),

    #[error("node {0} is not in the document")]
    UnknownNode(NodeId),

    #[error("fullscreen request denied: {0}")]
    FullscreenDenied(String),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("invalid page url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("{0}")]
    Message(String),
}

pub type Error = EngineError;
pub type Result<T> = std::result::Result<T, Error>;
