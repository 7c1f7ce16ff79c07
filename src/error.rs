//! talkasmic Error Types
//!
//! Every failure is terminal for the single request it affects; nothing here
//! is meant to bring the process down.

use thiserror::Error;

/// Central error type for talkasmic
#[derive(Error, Debug)]
pub enum TalkError {
    #[error("Device query failed: {0}")]
    DeviceQuery(String),

    #[error("Invalid {name}: {value} (accepted range {min}..={max})")]
    InvalidParameter {
        name: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },

    #[error("Voice unavailable: {0}")]
    VoiceUnavailable(String),

    #[error("Device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("Speech synthesis error: {0}")]
    Synthesis(String),

    #[error("Playback error: {0}")]
    Playback(String),

    #[error("Export error: {0}")]
    Export(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Lock poisoned: {0}")]
    Lock(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias for talkasmic operations
pub type TalkResult<T> = Result<T, TalkError>;

/// Helper to convert lock poison errors
impl<T> From<std::sync::PoisonError<T>> for TalkError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        TalkError::Lock(err.to_string())
    }
}

impl From<hound::Error> for TalkError {
    fn from(err: hound::Error) -> Self {
        TalkError::Export(err.to_string())
    }
}
