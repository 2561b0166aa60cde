//! Voice TTS Error Types
//!
//! Infrastructure failures (network, disk, model load, audio) travel as
//! `VoiceError`. Validation problems such as unknown voices are answered with
//! descriptive strings by the tool layer and never show up here.

use thiserror::Error;

/// Central error type for Voice TTS
#[derive(Error, Debug)]
pub enum VoiceError {
    #[error("Asset error: {0}")]
    Asset(String),

    #[error("Asset integrity error: {0}")]
    Integrity(String),

    #[error("TTS engine error: {0}")]
    Engine(String),

    #[error("Audio playback error: {0}")]
    Audio(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Background task failed: {0}")]
    Task(String),

    #[error("Lock poisoned: {0}")]
    Lock(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias for Voice TTS operations
pub type VoiceResult<T> = Result<T, VoiceError>;

/// Helper to convert Mutex/RwLock poison errors
impl<T> From<std::sync::PoisonError<T>> for VoiceError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        VoiceError::Lock(err.to_string())
    }
}

impl From<tokio::task::JoinError> for VoiceError {
    fn from(err: tokio::task::JoinError) -> Self {
        VoiceError::Task(err.to_string())
    }
}
