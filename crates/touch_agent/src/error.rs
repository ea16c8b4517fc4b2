//! Error types for input injection

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TouchError {
    #[error("Identifier not mapped: {0}")]
    UnmappedIdentifier(String),

    #[error("Event channel unavailable: {0}")]
    ChannelUnavailable(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Device offline: {0}")]
    DeviceOffline(String),

    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("Command execution failed: {0}")]
    CommandFailed(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TouchError {
    /// Wrap a failed channel write
    pub(crate) fn channel(err: std::io::Error) -> Self {
        TouchError::ChannelUnavailable(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, TouchError>;
