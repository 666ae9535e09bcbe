//! Media backend contract
//!
//! A backend binds one track at a time and reports transport state. The
//! engine owns exactly one backend behind [`Backend`] and never downcasts
//! it, so local decoders, view-bound video players and cast targets are
//! interchangeable.
//!
//! Backends do not call back into the engine. Platform drivers push
//! [`BackendEvent`]s through a [`BackendEventSender`]; the serialized
//! command loop hands each one to `PlaybackEngine::handle_backend_event`,
//! which applies it to the backend via [`Backend::handle_event`].
//!
//! Every event is stamped with the [`LoadId`] of the load it belongs to.
//! The engine drops events whose load has since been replaced, reset or
//! moved to another backend, so at most one load is ever live.

mod cache;
mod simulated;

pub use cache::CacheLease;
pub use simulated::SimulatedBackend;

use crate::error::BackendError;
use crate::track::Track;
use crate::types::PlaybackState;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;

/// Backend variants sharing the [`Backend`] contract
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// In-process decoder
    LocalDecode,

    /// Decoder rendering onto a host surface (video capable)
    ViewBound,

    /// Remote playback on a cast target
    CastCapable,
}

/// What a backend variant can do beyond the common transport contract
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    /// Can render onto a [`ViewHandle`]
    pub video: bool,

    /// Plays on another device
    pub remote: bool,

    /// Supports speeds other than 1.0
    pub speed_control: bool,
}

impl BackendKind {
    pub fn default_capabilities(self) -> Capabilities {
        match self {
            Self::LocalDecode => Capabilities::default(),
            Self::ViewBound => Capabilities {
                video: true,
                ..Default::default()
            },
            Self::CastCapable => Capabilities {
                remote: true,
                ..Default::default()
            },
        }
    }
}

/// Opaque handle to a host rendering surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ViewHandle(pub u64);

/// Identity of one `load` call, allocated by the engine
///
/// Ids increase monotonically for the lifetime of an engine, across
/// backend swaps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LoadId(pub u64);

impl std::fmt::Display for LoadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Driver callbacks delivered to the engine
#[derive(Debug)]
pub enum BackendEvent {
    BufferingStart,
    BufferingEnd,

    /// Media is ready; duration is known
    Prepared { duration: Duration },

    /// Reached end of media
    Completed,

    SeekComplete,

    /// Periodic buffered-fraction report (0-100)
    Progress { buffered_percent: u8 },

    /// Fatal error from the driver
    Error(BackendError),
}

/// A [`BackendEvent`] together with the load it was raised for
#[derive(Debug)]
pub struct LoadEvent {
    pub load: LoadId,
    pub event: BackendEvent,
}

/// Sending half used by platform drivers to deliver [`BackendEvent`]s
/// onto the engine's serialized context
#[derive(Debug, Clone)]
pub struct BackendEventSender {
    tx: mpsc::UnboundedSender<LoadEvent>,
}

impl BackendEventSender {
    /// Deliver an event raised for `load`; returns false once the engine
    /// loop is gone
    pub fn send(&self, load: LoadId, event: BackendEvent) -> bool {
        self.tx.send(LoadEvent { load, event }).is_ok()
    }
}

/// Receiving half consumed by the command loop
pub type BackendEventReceiver = mpsc::UnboundedReceiver<LoadEvent>;

/// Create a connected driver → engine event channel
pub fn backend_channel() -> (BackendEventSender, BackendEventReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (BackendEventSender { tx }, rx)
}

/// Capability contract every media backend implements
///
/// `play`, `pause` and `stop` record intent even when nothing is loaded, so
/// a `play` issued before the media is prepared is honoured on `Prepared`.
pub trait Backend: Send {
    fn kind(&self) -> BackendKind;

    fn capabilities(&self) -> Capabilities {
        self.kind().default_capabilities()
    }

    /// Begin loading `track` as load `load`
    ///
    /// Must tear down the previous media resource (and any cache lease)
    /// before starting. Completion arrives later as
    /// [`BackendEvent::Prepared`] or [`BackendEvent::Error`]. Every event
    /// raised for this media, up to the next `load`, `reset` or `destroy`,
    /// carries `load`.
    ///
    /// # Errors
    /// Returns an error when the load cannot even be started.
    fn load(&mut self, track: &Track, load: LoadId) -> Result<(), BackendError>;

    /// Release the loaded media without destroying the backend
    fn reset(&mut self);

    fn play(&mut self);
    fn pause(&mut self);
    fn stop(&mut self);

    /// Coarse state in priority order: ended > buffering > not loaded >
    /// paused > playing
    fn state(&self) -> PlaybackState;

    fn position(&self) -> Duration;
    fn buffered_position(&self) -> Duration;
    fn duration(&self) -> Duration;

    /// Buffered fraction of the media (0.0-1.0)
    fn buffered_fraction(&self) -> f32;

    fn seek_to(&mut self, position: Duration);

    fn speed(&self) -> f32 {
        1.0
    }

    fn volume(&self) -> f32;
    fn set_volume(&mut self, volume: f32);

    /// Attach or detach a rendering surface
    ///
    /// # Errors
    /// Backends without video support return [`BackendError::Unsupported`].
    fn bind_view(&mut self, view: Option<ViewHandle>) -> Result<(), BackendError> {
        let _ = view;
        Err(BackendError::Unsupported("view binding"))
    }

    /// Apply a driver callback to the backend's internal flags
    fn handle_event(&mut self, event: &BackendEvent);

    /// Release every held resource; safe to call more than once
    fn destroy(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variant_capabilities() {
        assert!(BackendKind::ViewBound.default_capabilities().video);
        assert!(BackendKind::CastCapable.default_capabilities().remote);
        assert_eq!(
            BackendKind::LocalDecode.default_capabilities(),
            Capabilities::default()
        );
    }

    #[test]
    fn event_channel_reports_closed_receiver() {
        let (tx, mut rx) = backend_channel();
        assert!(tx.send(LoadId(3), BackendEvent::BufferingStart));
        assert!(matches!(
            rx.try_recv(),
            Ok(LoadEvent {
                load: LoadId(3),
                event: BackendEvent::BufferingStart
            })
        ));

        drop(rx);
        assert!(!tx.send(LoadId(3), BackendEvent::Completed));
    }

    #[test]
    fn load_ids_order_by_issue() {
        assert!(LoadId(1) < LoadId(2));
        assert_eq!(LoadId(7).to_string(), "#7");
    }
}
