//! Centralized error types for the order board.

use thiserror::Error;

/// Main error type for order board operations.
#[derive(Error, Debug)]
pub enum BoardError {
    #[error("Invalid board code: {0:?}")]
    InvalidCode(String),

    #[error("Malformed STOMP frame: {0}")]
    Frame(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for order board operations.
pub type BoardResult<T> = Result<T, BoardError>;

impl BoardError {
    /// Create a frame error.
    pub fn frame(msg: impl Into<String>) -> Self {
        Self::Frame(msg.into())
    }

    /// Create a protocol error.
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }
}
