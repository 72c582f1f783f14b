// src/error.rs
use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, TrackingError>;

#[derive(Debug, thiserror::Error)]
pub enum TrackingError {
    /// One of the three joint landmarks is missing, low-confidence or degenerate.
    /// Frame-local: the frame is skipped and the session is left untouched.
    #[error("joint angle unavailable: insufficient landmark confidence")]
    AngleUnavailable,

    /// Only surfaced when even the default profile cannot be resolved.
    #[error("no exercise profile found for '{name}'")]
    ProfileNotFound { name: String },

    #[error("invalid exercise profile '{name}': {reason}")]
    InvalidProfile { name: String, reason: String },

    #[error("no session has been started")]
    SessionNotStarted,

    #[error("session has already finished")]
    SessionAlreadyFinished,

    #[error("failed to read config '{path}': {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("malformed landmark recording: {0}")]
    Recording(String),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl TrackingError {
    /// Lifecycle misuse indicates an integration bug rather than a runtime condition.
    pub fn is_lifecycle_misuse(&self) -> bool {
        matches!(self, Self::SessionNotStarted | Self::SessionAlreadyFinished)
    }
}
