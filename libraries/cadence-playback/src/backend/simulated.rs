//! Reference backend with simulated media
//!
//! Follows the full [`Backend`] contract without touching any platform
//! decoder: media "prepares" when the driver says so, and time only moves
//! when [`SimulatedBackend::advance`] is called. Used by tests and by the
//! headless CLI, and able to stand in for any [`BackendKind`].

use super::{
    Backend, BackendEvent, BackendEventSender, BackendKind, CacheLease, Capabilities, LoadId,
    ViewHandle,
};
use crate::error::BackendError;
use crate::track::Track;
use crate::types::PlaybackState;
use std::collections::VecDeque;
use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};
use url::Url;

/// Duration assumed for tracks that do not advertise one
const DEFAULT_MEDIA_DURATION: Duration = Duration::from_secs(180);

#[derive(Debug)]
struct Media {
    load: LoadId,
    track_id: String,
    duration: Duration,
    position: Duration,
}

/// In-memory [`Backend`] implementation
#[derive(Debug)]
pub struct SimulatedBackend {
    kind: BackendKind,
    capabilities: Capabilities,

    /// When set, the backend acts as its own driver: loads prepare and
    /// seeks complete asynchronously through this channel
    events: Option<BackendEventSender>,

    // Transport flags, as a platform player would keep them
    loaded: bool,
    buffering: bool,
    ended: bool,
    started: bool,
    playing: bool,
    buffered: f32,

    media: Option<Media>,
    volume: f32,
    view: Option<ViewHandle>,

    proxy_base: Option<Url>,
    cache: Option<CacheLease>,
    live_leases: Arc<AtomicUsize>,

    /// Errors returned by upcoming `load` calls, oldest first
    scripted_failures: VecDeque<BackendError>,

    destroyed: bool,
}

impl SimulatedBackend {
    pub fn new(kind: BackendKind) -> Self {
        Self {
            kind,
            capabilities: kind.default_capabilities(),
            events: None,
            loaded: false,
            buffering: false,
            ended: false,
            started: false,
            playing: false,
            buffered: 0.0,
            media: None,
            volume: 1.0,
            view: None,
            proxy_base: None,
            cache: None,
            live_leases: Arc::new(AtomicUsize::new(0)),
            scripted_failures: VecDeque::new(),
            destroyed: false,
        }
    }

    /// Drive this backend's own callbacks through `events`
    pub fn with_events(mut self, events: BackendEventSender) -> Self {
        self.events = Some(events);
        self
    }

    /// Route cacheable remote tracks through a proxy rooted at `base`
    pub fn with_cache_proxy(mut self, base: Url) -> Self {
        self.proxy_base = Some(base);
        self
    }

    /// Make the next `load` fail synchronously with `error`
    pub fn fail_next_load(&mut self, error: BackendError) {
        self.scripted_failures.push_back(error);
    }

    /// Move simulated time forward while playing
    ///
    /// Returns true when the end of the media was reached. With an event
    /// channel attached the matching [`BackendEvent::Completed`] is also
    /// emitted.
    pub fn advance(&mut self, elapsed: Duration) -> bool {
        if !self.loaded || !self.playing {
            return false;
        }
        let Some(media) = self.media.as_mut() else {
            return false;
        };

        media.position = (media.position + elapsed).min(media.duration);
        trace!(position = ?media.position, "Simulated clock advanced");

        let finished = media.position >= media.duration;
        if finished {
            self.emit(BackendEvent::Completed);
        }
        finished
    }

    /// Counter of cache leases currently held (shared, for inspection)
    pub fn live_cache_leases(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.live_leases)
    }

    /// Id of the track whose media is bound, prepared or not
    pub fn loaded_track_id(&self) -> Option<&str> {
        self.media.as_ref().map(|media| media.track_id.as_str())
    }

    pub fn view(&self) -> Option<ViewHandle> {
        self.view
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Send `event` for the media currently bound, if any
    fn emit(&self, event: BackendEvent) {
        let (Some(events), Some(media)) = (&self.events, &self.media) else {
            return;
        };
        if !events.send(media.load, event) {
            debug!("Engine loop gone, dropping simulated backend event");
        }
    }

    fn release_media(&mut self) {
        self.media = None;
        self.cache = None;
        self.playing = false;
        self.buffered = 0.0;
    }
}

impl Backend for SimulatedBackend {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    fn load(&mut self, track: &Track, load: LoadId) -> Result<(), BackendError> {
        self.release_media();
        self.loaded = false;
        self.ended = false;

        if let Some(error) = self.scripted_failures.pop_front() {
            self.buffering = false;
            return Err(error);
        }

        if let Some(base) = &self.proxy_base {
            self.cache = CacheLease::acquire(track, base, &self.live_leases);
        }
        let source = self
            .cache
            .as_ref()
            .map_or_else(|| track.source().url.clone(), |lease| lease.proxied_url().to_string());
        debug!(%load, track_id = track.id(), %source, "Simulated media bound");

        let duration = track
            .metadata()
            .duration
            .unwrap_or(DEFAULT_MEDIA_DURATION);
        self.media = Some(Media {
            load,
            track_id: track.id().to_string(),
            duration,
            position: Duration::ZERO,
        });
        self.buffering = true;

        self.emit(BackendEvent::Prepared { duration });
        Ok(())
    }

    fn reset(&mut self) {
        self.release_media();
        self.buffering = false;
        self.ended = false;
        self.loaded = false;
    }

    fn play(&mut self) {
        self.started = true;
        if !self.loaded {
            return;
        }
        self.playing = true;
        self.buffering = false;
        self.ended = false;
    }

    fn pause(&mut self) {
        self.started = false;
        if !self.loaded {
            return;
        }
        self.playing = false;
    }

    fn stop(&mut self) {
        self.started = false;
        if !self.loaded {
            return;
        }
        self.playing = false;
        self.ended = true;
    }

    fn state(&self) -> PlaybackState {
        if self.ended {
            PlaybackState::Stopped
        } else if self.buffering {
            PlaybackState::Buffering
        } else if !self.loaded {
            PlaybackState::None
        } else if !self.playing {
            PlaybackState::Paused
        } else {
            PlaybackState::Playing
        }
    }

    fn position(&self) -> Duration {
        match (&self.media, self.loaded) {
            (Some(media), true) => media.position,
            _ => Duration::ZERO,
        }
    }

    fn buffered_position(&self) -> Duration {
        self.duration().mul_f32(self.buffered)
    }

    fn duration(&self) -> Duration {
        match (&self.media, self.loaded) {
            (Some(media), true) => media.duration,
            _ => Duration::ZERO,
        }
    }

    fn buffered_fraction(&self) -> f32 {
        self.buffered
    }

    fn seek_to(&mut self, position: Duration) {
        if !self.loaded {
            return;
        }
        if let Some(media) = self.media.as_mut() {
            media.position = position.min(media.duration);
        }
        self.buffering = true;
        self.emit(BackendEvent::SeekComplete);
    }

    fn volume(&self) -> f32 {
        self.volume
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
    }

    fn bind_view(&mut self, view: Option<ViewHandle>) -> Result<(), BackendError> {
        if !self.capabilities.video {
            return Err(BackendError::Unsupported("view binding"));
        }
        self.view = view;
        Ok(())
    }

    fn handle_event(&mut self, event: &BackendEvent) {
        match event {
            BackendEvent::BufferingStart => self.buffering = true,
            BackendEvent::BufferingEnd | BackendEvent::SeekComplete => self.buffering = false,
            BackendEvent::Prepared { duration } => {
                let Some(media) = self.media.as_mut() else {
                    debug!("Prepared with no media bound, ignoring");
                    return;
                };
                media.duration = *duration;
                self.playing = self.started;
                self.loaded = true;
                self.buffering = false;
            }
            BackendEvent::Completed => {
                if let Some(media) = self.media.as_mut() {
                    media.position = media.duration;
                }
                self.playing = false;
                self.ended = true;
            }
            BackendEvent::Progress { buffered_percent } => {
                self.buffered = f32::from((*buffered_percent).min(100)) / 100.0;
            }
            BackendEvent::Error(_) => {}
        }
    }

    fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.reset();
        self.view = None;
        self.events = None;
        self.destroyed = true;
    }
}
