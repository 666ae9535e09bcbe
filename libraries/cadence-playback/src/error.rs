//! Error types for queue and playback management

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Direction of an adjacent-track skip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Next,
    Previous,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Next => f.write_str("next"),
            Self::Previous => f.write_str("previous"),
        }
    }
}

/// Errors raised by a media backend
///
/// These are the transport-level causes wrapped by
/// [`PlaybackError::LoadFailure`] and [`PlaybackError::TransportFault`].
#[derive(Debug, Error)]
pub enum BackendError {
    /// The media resource could not be opened or read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The platform media server went away
    #[error("Server died")]
    ServerDied,

    /// The backend variant does not support the requested capability
    #[error("Unsupported by this backend: {0}")]
    Unsupported(&'static str),

    /// The load did not complete in time
    #[error("Load timed out after {0:?}")]
    Timeout(Duration),

    /// A newer load, a reset or a destroy replaced this load before it completed
    #[error("Load cancelled before it completed")]
    Cancelled,

    /// Anything else the backend reports
    #[error("{0}")]
    Other(String),
}

/// Playback errors
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// Skip-by-id found no matching track
    #[error("The track was not found")]
    NotFound(String),

    /// Skip next/previous at a queue boundary
    #[error("There is no {0} tracks")]
    NoAdjacentTrack(Direction),

    /// The backend could not prepare the track
    #[error("Failed to load track {track_id}: {source}")]
    LoadFailure {
        track_id: String,
        #[source]
        source: BackendError,
    },

    /// The backend reported a fatal error during playback
    #[error("Transport fault: {0}")]
    TransportFault(#[source] BackendError),

    /// Raw track input was rejected
    #[error("Invalid track: {0}")]
    InvalidTrack(String),

    /// The bound backend cannot perform the operation
    #[error("Unsupported operation: {0}")]
    Unsupported(#[source] BackendError),

    /// The command loop owning the engine is gone
    #[error("Playback engine is closed")]
    EngineClosed,
}

impl PlaybackError {
    /// Coarse classification used in notification payloads
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::NoAdjacentTrack(_) => ErrorKind::NoAdjacentTrack,
            Self::LoadFailure { .. } => ErrorKind::LoadFailure,
            Self::TransportFault(_) => ErrorKind::TransportFault,
            Self::InvalidTrack(_) => ErrorKind::InvalidTrack,
            Self::Unsupported(_) => ErrorKind::Unsupported,
            Self::EngineClosed => ErrorKind::EngineClosed,
        }
    }

    /// Expected outcomes the caller recovers from; never logged as faults
    pub fn is_expected(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::NoAdjacentTrack(_))
    }
}

/// Serializable error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    NoAdjacentTrack,
    LoadFailure,
    TransportFault,
    InvalidTrack,
    Unsupported,
    EngineClosed,
}

/// Result type for playback operations
pub type Result<T> = std::result::Result<T, PlaybackError>;
