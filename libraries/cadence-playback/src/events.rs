//! Playback Events
//!
//! One-way notifications from the engine to the host. Within one logical
//! operation they are delivered in this order:
//! - `Update` (track/position/duration metadata)
//! - edge-triggered lifecycle events (`Play`, `Pause`, `Stop`)
//! - `StateChange`

use crate::error::{ErrorKind, PlaybackError};
use crate::track::Track;
use crate::types::PlaybackState;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Events emitted by the playback engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlaybackEvent {
    /// The backend finished preparing the current track
    Load { track: Track },

    /// Entered a playing state
    Play,

    /// Entered a paused state
    Pause,

    /// Entered a stopped state
    Stop,

    /// Coarse state changed
    StateChange { state: PlaybackState },

    /// A track played to its end
    End { track: Track },

    /// Load failure or transport fault
    Error { kind: ErrorKind, message: String },

    /// Track, position or duration may have changed
    Update {
        track: Option<Track>,
        position_ms: u64,
        duration_ms: u64,
        buffered_fraction: f32,
    },
}

impl PlaybackEvent {
    pub(crate) fn error(error: &PlaybackError) -> Self {
        Self::Error {
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

/// Receiver of engine notifications
///
/// The engine calls the sink; the sink never calls the engine.
pub trait NotificationSink: Send {
    fn notify(&mut self, event: PlaybackEvent);
}

/// Records every event, mostly for tests
impl NotificationSink for Vec<PlaybackEvent> {
    fn notify(&mut self, event: PlaybackEvent) {
        self.push(event);
    }
}

/// Forwards events to an async consumer; a closed receiver drops them
impl NotificationSink for mpsc::UnboundedSender<PlaybackEvent> {
    fn notify(&mut self, event: PlaybackEvent) {
        let _ = self.send(event);
    }
}

/// Discards every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl NotificationSink for NullSink {
    fn notify(&mut self, _event: PlaybackEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BackendError;

    #[test]
    fn events_serialize_with_type_tag() {
        let json = serde_json::to_value(PlaybackEvent::StateChange {
            state: PlaybackState::Playing,
        })
        .unwrap();
        assert_eq!(json["type"], "state_change");
        assert_eq!(json["state"], "playing");

        let json = serde_json::to_value(PlaybackEvent::Play).unwrap();
        assert_eq!(json["type"], "play");
    }

    #[test]
    fn error_event_carries_kind_and_message() {
        let error = PlaybackError::LoadFailure {
            track_id: "a".into(),
            source: BackendError::ServerDied,
        };
        let PlaybackEvent::Error { kind, message } = PlaybackEvent::error(&error) else {
            panic!("expected error event");
        };
        assert_eq!(kind, ErrorKind::LoadFailure);
        assert!(message.contains("Server died"));
    }

    #[test]
    fn channel_sink_tolerates_closed_receiver() {
        let (mut tx, rx) = mpsc::unbounded_channel();
        tx.notify(PlaybackEvent::Play);
        drop(rx);
        tx.notify(PlaybackEvent::Pause);
    }
}
