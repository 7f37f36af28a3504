//! Error types for capture, decoding and replay

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Command execution failed: {0}")]
    CommandFailed(String),

    #[error("Command timeout: {0}")]
    Timeout(String),

    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ReplayError>;
