//! Cadence - Playback Engine
//!
//! Platform-agnostic queue and playback state management.
//!
//! This crate provides:
//! - An ordered track queue with a current-track cursor
//! - A backend contract shared by local, view-bound and cast backends
//! - A playback engine that keeps queue, cursor and backend in sync
//! - Edge-triggered state notifications for the host
//!
//! # Architecture
//!
//! `cadence-playback` owns no threads and no platform decoder:
//! - Backends are plugged in behind the [`Backend`] trait
//! - Backend callbacks arrive as [`BackendEvent`]s stamped with the
//!   [`LoadId`] of the load they belong to; stale ones are dropped
//! - Notifications leave through a [`NotificationSink`]
//!
//! The engine expects a single serialized owner; `cadence-service`
//! provides one on top of tokio.
//!
//! # Example: Basic Playback
//!
//! ```rust
//! use cadence_playback::{
//!     Ack, BackendEvent, BackendKind, EngineConfig, PlaybackEngine, PlaybackEvent,
//!     PlaybackState, SimulatedBackend, Track,
//! };
//! use std::time::Duration;
//!
//! let backend = SimulatedBackend::new(BackendKind::LocalDecode);
//! let mut engine = PlaybackEngine::new(
//!     Box::new(backend),
//!     Vec::<PlaybackEvent>::new(),
//!     EngineConfig::default(),
//! );
//!
//! let track = Track::builder("track1", "/music/song.mp3")
//!     .local(true)
//!     .title("My Song")
//!     .build()
//!     .unwrap();
//!
//! // First track in an empty queue becomes current and starts loading
//! let ack = engine.add(None, vec![track]).unwrap();
//! assert!(matches!(ack, Ack::Loading(_)));
//!
//! engine.play();
//!
//! // The platform driver reports the media ready
//! let load = engine.current_load().unwrap();
//! engine.handle_backend_event(
//!     load,
//!     BackendEvent::Prepared {
//!         duration: Duration::from_secs(180),
//!     },
//! );
//! assert_eq!(engine.state(), PlaybackState::Playing);
//! ```
//!
//! # Example: Boundaries
//!
//! ```rust
//! use cadence_playback::{
//!     BackendKind, EngineConfig, NullSink, PlaybackEngine, PlaybackError, SimulatedBackend,
//! };
//!
//! let mut engine = PlaybackEngine::new(
//!     Box::new(SimulatedBackend::new(BackendKind::LocalDecode)),
//!     NullSink,
//!     EngineConfig::default(),
//! );
//!
//! assert!(matches!(
//!     engine.skip_to_next(),
//!     Err(PlaybackError::NoAdjacentTrack(_))
//! ));
//! ```

pub mod backend;
mod engine;
mod error;
mod events;
mod queue;
mod track;
pub mod types;

// Public exports
pub use backend::{
    backend_channel, Backend, BackendEvent, BackendEventReceiver, BackendEventSender,
    BackendKind, CacheLease, Capabilities, LoadEvent, LoadId, SimulatedBackend, ViewHandle,
};
pub use engine::{Ack, PendingLoad, PlaybackEngine};
pub use error::{BackendError, Direction, ErrorKind, PlaybackError, Result};
pub use events::{NotificationSink, NullSink, PlaybackEvent};
pub use queue::{Queue, QueueOutcome};
pub use track::{CachePolicy, Track, TrackBuilder, TrackData, TrackMetadata, TrackSource};
pub use types::{EngineConfig, PlaybackState};
