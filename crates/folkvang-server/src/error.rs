//! Error types for folkvang-server

use crate::config::ConfigError;
use thiserror::Error;

/// Server error type
#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WebSocket handshake failed: {0}")]
    Handshake(String),
}

/// Result type for server operations
pub type Result<T> = std::result::Result<T, ServerError>;
