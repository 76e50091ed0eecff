// Error types for Protocol module

use thiserror::Error;

/// Protocol framing errors
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Failed to decode message: {0}")]
    DecodeError(String),

    #[error("Failed to encode message: {0}")]
    EncodeError(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Result type for protocol operations
pub type Result<T> = std::result::Result<T, ProtocolError>;
