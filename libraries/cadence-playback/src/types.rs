//! Core types for playback management

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Coarse playback state
///
/// Derived from backend flags, never stored independently of them.
/// The engine remembers only the last state it notified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    /// Nothing loaded
    #[default]
    None,

    /// Preparing media or waiting for data
    Buffering,

    /// Currently playing
    Playing,

    /// Loaded but not advancing
    Paused,

    /// Reached the end or explicitly stopped
    Stopped,
}

impl PlaybackState {
    /// Whether this state counts as playing for `onPlay`
    pub fn is_playing(self) -> bool {
        matches!(self, Self::Playing)
    }

    /// Whether this state counts as paused for `onPause`
    pub fn is_paused(self) -> bool {
        matches!(self, Self::Paused)
    }

    /// Whether this state counts as stopped for `onStop`
    pub fn is_stopped(self) -> bool {
        matches!(self, Self::Stopped)
    }
}

/// Configuration for the playback engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Volume applied to every backend the engine binds (0.0-1.0, default: 1.0)
    pub initial_volume: f32,

    /// Pending loads older than this are rejected (milliseconds, 0 disables, default: 30000)
    pub load_timeout_ms: u64,
}

impl EngineConfig {
    /// Load timeout, or `None` when disabled
    pub fn load_timeout(&self) -> Option<Duration> {
        (self.load_timeout_ms > 0).then(|| Duration::from_millis(self.load_timeout_ms))
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            initial_volume: 1.0,
            load_timeout_ms: 30_000,
        }
    }
}
