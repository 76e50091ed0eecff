use crate::protocol::ProtocolError;
use thiserror::Error;

/// Transport errors
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Failed to bind listener: {0}")]
    BindFailed(String),

    #[error("Invalid listen address: {0}")]
    InvalidAddress(String),

    #[error("Failed to read message: {0}")]
    ReadError(String),

    #[error("Failed to write message: {0}")]
    WriteError(String),

    #[error("Malformed message: {0}")]
    Malformed(#[from] ProtocolError),

    #[error("HTTP server error: {0}")]
    ServerError(String),

    #[error("Transport already started")]
    AlreadyStarted,
}

/// Result type for transport operations
pub type Result<T> = std::result::Result<T, TransportError>;
