use dialog_message_chunker::ChunkerError;
use dialog_navigation::NavigationError;
use thiserror::Error;

use crate::transport::MessageId;

/// Failure reported by a chat transport.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Message {0} not found")]
    MessageNotFound(MessageId),

    #[error("Request rejected by chat service: {0}")]
    Rejected(String),

    #[error("Transport I/O error: {0}")]
    Io(String),
}

pub type TransportResult<T> = std::result::Result<T, TransportError>;

pub type Result<T> = std::result::Result<T, GatewayError>;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error(transparent)]
    Navigation(#[from] NavigationError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Chunker(#[from] ChunkerError),

    #[error("Role directory error: {0}")]
    Directory(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
