use {avc_protocol::ProtocolError, thiserror::Error};

#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

pub type Error = CoordinatorError;
pub type Result<T> = std::result::Result<T, Error>;
