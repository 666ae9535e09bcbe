//! Playback engine - core orchestration
//!
//! Composes the [`Queue`] with the bound [`Backend`]: every queue outcome
//! that asks for a reload rebinds the backend to the current track, and
//! every backend state change flows through [`PlaybackEngine::update_state`],
//! the single point that notifies the sink.
//!
//! The engine is not thread-safe by itself. It expects one serialized owner
//! (see `cadence-service`) delivering commands and backend events in order.
//!
//! Each load is issued under a fresh [`LoadId`]. Only events stamped with
//! the id of the load currently bound are applied; anything older belongs
//! to media that was replaced, reset or left behind on a swapped-out
//! backend and is dropped.

use crate::{
    backend::{Backend, BackendEvent, BackendKind, LoadId, ViewHandle},
    error::{BackendError, PlaybackError, Result},
    events::{NotificationSink, PlaybackEvent},
    queue::{Queue, QueueOutcome},
    track::{Track, TrackData},
    types::{EngineConfig, PlaybackState},
};
use std::collections::HashSet;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

/// Acknowledgement of a successful command
#[must_use]
#[derive(Debug)]
pub enum Ack {
    /// Command fully applied
    Done,

    /// Command applied; the backend is loading the current track
    Loading(PendingLoad),
}

impl Ack {
    /// Wait until the command's load (if any) resolves
    pub async fn wait(self) -> Result<()> {
        match self {
            Self::Done => Ok(()),
            Self::Loading(pending) => pending.wait().await,
        }
    }
}

/// Outcome of a load that is still in flight
///
/// Resolves `Ok` when the backend reports the media prepared and
/// `Err(LoadFailure)` when it reports an error, times out or is cancelled.
#[derive(Debug)]
pub struct PendingLoad {
    track_id: String,
    rx: oneshot::Receiver<Result<()>>,
}

impl PendingLoad {
    pub fn track_id(&self) -> &str {
        &self.track_id
    }

    pub async fn wait(self) -> Result<()> {
        self.rx.await.unwrap_or(Err(PlaybackError::EngineClosed))
    }

    /// Non-blocking check; `None` while the load is still running
    pub fn try_outcome(&mut self) -> Option<Result<()>> {
        match self.rx.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(Err(PlaybackError::EngineClosed)),
        }
    }
}

/// The load the backend is currently working on (at most one)
struct LoadInFlight {
    track_id: String,
    started: Instant,
    responder: oneshot::Sender<Result<()>>,
}

/// Central playback management
///
/// Orchestrates:
/// - Queue mutations and the current-track cursor
/// - Rebinding the backend when the current track changes
/// - Transport control (play/pause/stop/seek/volume)
/// - Edge-triggered state notifications
pub struct PlaybackEngine<S: NotificationSink> {
    queue: Queue,
    backend: Box<dyn Backend>,
    sink: S,
    config: EngineConfig,

    /// Last state delivered to the sink
    notified_state: PlaybackState,

    pending_load: Option<LoadInFlight>,

    /// Load the bound backend is working on; events for any other are stale
    bound_load: Option<LoadId>,

    /// Next id to issue, never reused across backend swaps
    next_load: u64,
}

impl<S: NotificationSink> PlaybackEngine<S> {
    /// Create new playback engine around `backend`
    pub fn new(mut backend: Box<dyn Backend>, sink: S, config: EngineConfig) -> Self {
        backend.set_volume(config.initial_volume);

        Self {
            queue: Queue::new(),
            backend,
            sink,
            config,
            notified_state: PlaybackState::None,
            pending_load: None,
            bound_load: None,
            next_load: 1,
        }
    }

    // ===== Queue Commands =====

    /// Insert tracks before `anchor_id`, or append them
    pub fn add(&mut self, anchor_id: Option<&str>, tracks: Vec<Track>) -> Result<Ack> {
        let outcome = self.queue.add(anchor_id, tracks);
        self.apply(outcome)
    }

    /// Validate raw host input and add it
    ///
    /// Nothing is added when any entry is invalid.
    pub fn add_data(&mut self, anchor_id: Option<&str>, data: Vec<TrackData>) -> Result<Ack> {
        let tracks = data
            .into_iter()
            .map(Track::try_from)
            .collect::<Result<Vec<_>>>()?;
        self.add(anchor_id, tracks)
    }

    /// Remove every track whose id is listed
    pub fn remove<I, T>(&mut self, ids: I) -> Result<Ack>
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let ids: HashSet<String> = ids.into_iter().map(Into::into).collect();
        let outcome = self.queue.remove(&ids);
        self.apply(outcome)
    }

    /// Make the first track with `id` current
    pub fn skip(&mut self, id: &str) -> Result<Ack> {
        let outcome = self.queue.skip(id).map_err(rejected)?;
        self.apply(outcome)
    }

    pub fn skip_to_next(&mut self) -> Result<Ack> {
        let outcome = self.queue.skip_to_next().map_err(rejected)?;
        self.apply(outcome)
    }

    pub fn skip_to_previous(&mut self) -> Result<Ack> {
        let outcome = self.queue.skip_to_previous().map_err(rejected)?;
        self.apply(outcome)
    }

    /// Insert `track` right after the current one and play it from there
    pub fn load(&mut self, track: Track) -> Result<Ack> {
        let outcome = self.queue.insert_after_current_and_select(track);
        self.apply(outcome)
    }

    /// [`load`](Self::load) for raw host input
    pub fn load_data(&mut self, data: TrackData) -> Result<Ack> {
        self.load(Track::try_from(data)?)
    }

    /// Clear the queue and release the backend's media
    pub fn reset(&mut self) {
        self.queue.clear();
        self.cancel_pending_load();
        self.bound_load = None;
        self.backend.reset();
        self.sync_state();
    }

    /// Copy every track of this queue into `other`, before `anchor_id`
    pub fn copy_queue_to<T: NotificationSink>(
        &self,
        other: &mut PlaybackEngine<T>,
        anchor_id: Option<&str>,
    ) -> Result<Ack> {
        other.add(anchor_id, self.queue.tracks().to_vec())
    }

    // ===== Transport =====

    pub fn play(&mut self) {
        self.backend.play();
        self.sync_state();
    }

    pub fn pause(&mut self) {
        self.backend.pause();
        self.sync_state();
    }

    pub fn stop(&mut self) {
        self.backend.stop();
        self.sync_state();
    }

    pub fn seek_to(&mut self, position: Duration) {
        self.backend.seek_to(position);
        self.sync_state();
    }

    /// Set volume (0.0-1.0)
    pub fn set_volume(&mut self, volume: f32) {
        self.backend.set_volume(volume);
        self.update_metadata();
    }

    /// Attach or detach a rendering surface on view-capable backends
    pub fn bind_view(&mut self, view: Option<ViewHandle>) -> Result<()> {
        self.backend.bind_view(view).map_err(|e| match e {
            BackendError::Unsupported(_) => PlaybackError::Unsupported(e),
            other => PlaybackError::TransportFault(other),
        })
    }

    /// Replace the bound backend, carrying the current track over
    ///
    /// The old backend is destroyed. Volume and play/pause intent move to
    /// the new one, which then loads the current track.
    pub fn swap_backend(&mut self, mut backend: Box<dyn Backend>) -> Result<Ack> {
        let previous = self.backend.state();
        backend.set_volume(self.backend.volume());

        self.cancel_pending_load();
        self.bound_load = None;
        self.backend.destroy();
        self.backend = backend;
        info!(kind = ?self.backend.kind(), "Backend swapped");

        self.rebind(previous)
    }

    /// Release every backend resource; the engine stays queryable
    pub fn destroy(&mut self) {
        self.cancel_pending_load();
        self.bound_load = None;
        self.backend.destroy();
    }

    // ===== Backend Callbacks =====

    /// Apply one driver callback, in delivery order
    ///
    /// Events whose `load` is not the one currently bound are dropped
    /// before the backend sees them.
    pub fn handle_backend_event(&mut self, load: LoadId, event: BackendEvent) {
        if self.bound_load != Some(load) {
            debug!(%load, ?event, "Dropping event from a replaced load");
            return;
        }
        self.backend.handle_event(&event);

        match event {
            BackendEvent::BufferingStart
            | BackendEvent::BufferingEnd
            | BackendEvent::SeekComplete => self.sync_state(),
            BackendEvent::Prepared { .. } => {
                if let Some(load) = self.pending_load.take() {
                    let _ = load.responder.send(Ok(()));
                }
                self.sync_state();

                if let Some(track) = self.queue.current().cloned() {
                    info!(track_id = track.id(), "Track loaded");
                    self.sink.notify(PlaybackEvent::Load { track });
                }
            }
            BackendEvent::Completed => {
                self.sync_state();

                if let Some(track) = self.queue.current().cloned() {
                    self.sink.notify(PlaybackEvent::End { track });
                }
                if let Err(e) = self.skip_to_next() {
                    debug!("Playback finished: {}", e);
                }
            }
            BackendEvent::Progress { .. } => self.update_metadata(),
            BackendEvent::Error(source) => self.fault(source),
        }
    }

    /// Reject the pending load when it has been running longer than the
    /// configured timeout; returns whether it did
    pub fn expire_load(&mut self, now: Instant) -> bool {
        let Some(timeout) = self.config.load_timeout() else {
            return false;
        };
        let expired = self
            .pending_load
            .as_ref()
            .is_some_and(|load| now.saturating_duration_since(load.started) >= timeout);
        if !expired {
            return false;
        }

        if let Some(load) = self.pending_load.take() {
            warn!(track_id = %load.track_id, ?timeout, "Load timed out");
            self.fail_load(load, BackendError::Timeout(timeout), true);
        }
        true
    }

    /// Periodic metadata refresh while something is playing
    pub fn publish_progress(&mut self) {
        if self.queue.current().is_some() && self.backend.state().is_playing() {
            self.update_metadata();
        }
    }

    // ===== State Notification =====

    /// Deliver `state` to the sink
    ///
    /// Always sends a metadata update first. When the state differs from the
    /// last notified one, each lifecycle event fires only if its predicate
    /// newly became true, followed by the generic state change.
    pub fn update_state(&mut self, state: PlaybackState) {
        self.update_metadata();

        let previous = self.notified_state;
        if state == previous {
            return;
        }

        if state.is_playing() && !previous.is_playing() {
            self.sink.notify(PlaybackEvent::Play);
        }
        if state.is_paused() && !previous.is_paused() {
            self.sink.notify(PlaybackEvent::Pause);
        }
        if state.is_stopped() && !previous.is_stopped() {
            self.sink.notify(PlaybackEvent::Stop);
        }

        debug!(?previous, ?state, "Playback state changed");
        self.sink.notify(PlaybackEvent::StateChange { state });
        self.notified_state = state;
    }

    fn sync_state(&mut self) {
        let state = self.backend.state();
        self.update_state(state);
    }

    fn update_metadata(&mut self) {
        self.sink.notify(PlaybackEvent::Update {
            track: self.queue.current().cloned(),
            position_ms: self.backend.position().as_millis() as u64,
            duration_ms: self.backend.duration().as_millis() as u64,
            buffered_fraction: self.backend.buffered_fraction(),
        });
    }

    // ===== State Queries =====

    pub fn state(&self) -> PlaybackState {
        self.backend.state()
    }

    pub fn position(&self) -> Duration {
        self.backend.position()
    }

    pub fn buffered_position(&self) -> Duration {
        self.backend.buffered_position()
    }

    pub fn duration(&self) -> Duration {
        self.backend.duration()
    }

    pub fn speed(&self) -> f32 {
        self.backend.speed()
    }

    pub fn volume(&self) -> f32 {
        self.backend.volume()
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.backend.kind()
    }

    /// All tracks in playback order
    pub fn queue(&self) -> &[Track] {
        self.queue.tracks()
    }

    pub fn cursor(&self) -> Option<usize> {
        self.queue.cursor()
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.queue.current()
    }

    pub fn is_loading(&self) -> bool {
        self.pending_load.is_some()
    }

    /// Id the backend's events must carry to be applied
    pub fn current_load(&self) -> Option<LoadId> {
        self.bound_load
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    // ===== Internal =====

    fn apply(&mut self, outcome: QueueOutcome) -> Result<Ack> {
        match outcome {
            QueueOutcome::Unchanged => Ok(Ack::Done),
            QueueOutcome::Reload => {
                let previous = self.backend.state();
                self.rebind(previous)
            }
        }
    }

    /// Bind the backend to the current track, restoring the transport
    /// intent that `previous` implies
    fn rebind(&mut self, previous: PlaybackState) -> Result<Ack> {
        let Some(track) = self.queue.current().cloned() else {
            debug!("Queue is empty, resetting");
            self.reset();
            return Ok(Ack::Done);
        };

        debug!(track_id = track.id(), ?previous, "Updating current track");
        let loading = self.begin_load(&track);

        // Issued right after the load starts; the backend applies it once prepared
        if previous.is_playing() {
            self.play();
        } else if previous.is_paused() {
            self.pause();
        }

        self.update_metadata();
        loading.map(Ack::Loading)
    }

    fn begin_load(&mut self, track: &Track) -> Result<PendingLoad> {
        self.cancel_pending_load();

        let load = LoadId(self.next_load);
        self.next_load += 1;

        let track_id = track.id().to_string();
        let result = self.backend.load(track, load);
        self.bound_load = result.is_ok().then_some(load);
        let loading = match result {
            Ok(()) => {
                info!(%load, track_id = %track_id, url = %track.source().url, "Loading track");
                let (responder, rx) = oneshot::channel();
                self.pending_load = Some(LoadInFlight {
                    track_id: track_id.clone(),
                    started: Instant::now(),
                    responder,
                });
                Ok(PendingLoad { track_id, rx })
            }
            Err(source) => {
                let error = PlaybackError::LoadFailure { track_id, source };
                warn!("{}", error);
                self.notify_error(&error);
                Err(error)
            }
        };

        self.sync_state();
        loading
    }

    fn cancel_pending_load(&mut self) {
        if let Some(load) = self.pending_load.take() {
            debug!(track_id = %load.track_id, "Cancelling pending load");
            self.fail_load(load, BackendError::Cancelled, false);
        }
    }

    /// Reject a pending load, optionally raising `onError` as well
    fn fail_load(&mut self, load: LoadInFlight, source: BackendError, notify: bool) {
        let error = PlaybackError::LoadFailure {
            track_id: load.track_id,
            source,
        };
        if notify {
            self.notify_error(&error);
        }
        let _ = load.responder.send(Err(error));
    }

    fn fault(&mut self, source: BackendError) {
        match self.pending_load.take() {
            Some(load) => {
                warn!(track_id = %load.track_id, "Backend failed while loading: {}", source);
                self.fail_load(load, source, true);
            }
            None => {
                let error = PlaybackError::TransportFault(source);
                warn!("{}", error);
                self.notify_error(&error);
            }
        }
    }

    fn notify_error(&mut self, error: &PlaybackError) {
        self.sink.notify(PlaybackEvent::error(error));
    }
}

/// Skip failures go back to the caller; expected ones are logged at debug only
fn rejected(error: PlaybackError) -> PlaybackError {
    if error.is_expected() {
        debug!("Skip rejected: {}", error);
    } else {
        warn!("Skip failed: {}", error);
    }
    error
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::SimulatedBackend;
    use crate::error::{Direction, ErrorKind};

    type Engine = PlaybackEngine<Vec<PlaybackEvent>>;

    fn track(id: &str) -> Track {
        Track::builder(id, format!("/music/{}.mp3", id))
            .local(true)
            .duration(Duration::from_secs(60))
            .build()
            .unwrap()
    }

    fn engine() -> Engine {
        PlaybackEngine::new(
            Box::new(SimulatedBackend::new(BackendKind::LocalDecode)),
            Vec::<PlaybackEvent>::new(),
            EngineConfig::default(),
        )
    }

    fn prepared() -> BackendEvent {
        BackendEvent::Prepared {
            duration: Duration::from_secs(60),
        }
    }

    /// Deliver `event` as the driver of the currently bound load would
    fn deliver(engine: &mut Engine, event: BackendEvent) {
        let load = engine.current_load().expect("a load is bound");
        engine.handle_backend_event(load, event);
    }

    /// Events other than metadata updates
    fn lifecycle(engine: &mut Engine) -> Vec<PlaybackEvent> {
        engine
            .sink_mut()
            .drain(..)
            .filter(|event| !matches!(event, PlaybackEvent::Update { .. }))
            .collect()
    }

    fn playing_engine(ids: &[&str]) -> Engine {
        let mut engine = engine();
        let _ = engine
            .add(None, ids.iter().map(|id| track(id)).collect())
            .unwrap();
        deliver(&mut engine, prepared());
        engine.play();
        engine.sink_mut().clear();
        engine
    }

    #[test]
    fn first_add_loads_and_resolves_on_prepared() {
        let mut engine = engine();
        let ack = engine.add(None, vec![track("x")]).unwrap();
        let Ack::Loading(mut pending) = ack else {
            panic!("expected a load");
        };
        assert_eq!(pending.track_id(), "x");
        assert!(pending.try_outcome().is_none());
        assert_eq!(engine.state(), PlaybackState::Buffering);

        deliver(&mut engine, prepared());
        assert!(matches!(pending.try_outcome(), Some(Ok(()))));
        assert_eq!(engine.state(), PlaybackState::Paused);

        let events = lifecycle(&mut engine);
        assert!(events.contains(&PlaybackEvent::Load { track: track("x") }));
    }

    #[test]
    fn append_without_reload_is_done() {
        let mut engine = playing_engine(&["a"]);
        let ack = engine.add(None, vec![track("b")]).unwrap();
        assert!(matches!(ack, Ack::Done));
        assert!(engine.sink().is_empty());
    }

    #[test]
    fn paused_to_playing_fires_play_then_state_change_once() {
        let mut engine = engine();
        let _ = engine.add(None, vec![track("a")]).unwrap();
        deliver(&mut engine, prepared());
        engine.sink_mut().clear();

        engine.play();
        let events = engine.sink_mut().drain(..).collect::<Vec<_>>();
        assert!(matches!(events[0], PlaybackEvent::Update { .. }));
        assert_eq!(events[1], PlaybackEvent::Play);
        assert_eq!(
            events[2],
            PlaybackEvent::StateChange {
                state: PlaybackState::Playing
            }
        );
        assert_eq!(events.len(), 3);
    }

    #[test]
    fn unchanged_state_only_updates_metadata() {
        let mut engine = engine();
        let _ = engine.add(None, vec![track("a")]).unwrap();
        deliver(&mut engine, prepared());
        assert_eq!(engine.state(), PlaybackState::Paused);
        engine.sink_mut().clear();

        engine.pause();
        let events = engine.sink_mut().drain(..).collect::<Vec<_>>();
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], PlaybackEvent::Update { .. }));
    }

    #[test]
    fn buffering_fluctuation_fires_no_lifecycle_event() {
        let mut engine = engine();
        let _ = engine.add(None, vec![track("a")]).unwrap();
        engine.sink_mut().clear();

        engine.update_state(PlaybackState::None);
        engine.update_state(PlaybackState::Buffering);
        let events = lifecycle(&mut engine);
        assert_eq!(
            events,
            vec![
                PlaybackEvent::StateChange {
                    state: PlaybackState::None
                },
                PlaybackEvent::StateChange {
                    state: PlaybackState::Buffering
                },
            ]
        );
    }

    #[test]
    fn skip_while_playing_keeps_playing() {
        let mut engine = playing_engine(&["a", "b"]);
        let ack = engine.skip_to_next().unwrap();
        assert!(matches!(ack, Ack::Loading(_)));
        assert_eq!(engine.current_track().unwrap().id(), "b");

        deliver(&mut engine, prepared());
        assert_eq!(engine.state(), PlaybackState::Playing);
    }

    #[test]
    fn skip_while_paused_stays_paused() {
        let mut engine = playing_engine(&["a", "b"]);
        engine.pause();
        let _ = engine.skip("b").unwrap();
        deliver(&mut engine, prepared());
        assert_eq!(engine.state(), PlaybackState::Paused);
    }

    #[test]
    fn skip_failures_leave_queue_untouched() {
        let mut engine = playing_engine(&["a", "b"]);

        assert!(matches!(
            engine.skip("zzz"),
            Err(PlaybackError::NotFound(_))
        ));
        assert!(matches!(
            engine.skip_to_previous(),
            Err(PlaybackError::NoAdjacentTrack(Direction::Previous))
        ));
        assert_eq!(engine.cursor(), Some(0));
        assert!(engine.sink().is_empty());
    }

    #[test]
    fn sync_load_failure_notifies_and_returns_error() {
        let mut backend = SimulatedBackend::new(BackendKind::LocalDecode);
        backend.fail_next_load(BackendError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "missing file",
        )));
        let mut engine = PlaybackEngine::new(
            Box::new(backend),
            Vec::<PlaybackEvent>::new(),
            EngineConfig::default(),
        );

        let err = engine.add(None, vec![track("a"), track("b")]).unwrap_err();
        assert!(matches!(err, PlaybackError::LoadFailure { .. }));
        assert!(engine.sink().iter().any(|event| matches!(
            event,
            PlaybackEvent::Error {
                kind: ErrorKind::LoadFailure,
                ..
            }
        )));

        // Queue survives and stays navigable
        assert_eq!(engine.queue().len(), 2);
        assert_eq!(engine.cursor(), Some(0));
        assert!(matches!(engine.skip_to_next(), Ok(Ack::Loading(_))));
    }

    #[test]
    fn async_error_rejects_pending_load() {
        let mut engine = engine();
        let Ack::Loading(mut pending) = engine.add(None, vec![track("a")]).unwrap() else {
            panic!("expected a load");
        };
        engine.sink_mut().clear();

        deliver(&mut engine, BackendEvent::Error(BackendError::ServerDied));

        assert!(matches!(
            pending.try_outcome(),
            Some(Err(PlaybackError::LoadFailure {
                source: BackendError::ServerDied,
                ..
            }))
        ));
        assert_eq!(
            lifecycle(&mut engine),
            vec![PlaybackEvent::Error {
                kind: ErrorKind::LoadFailure,
                message: "Failed to load track a: Server died".to_string(),
            }]
        );
        assert!(!engine.is_loading());
    }

    #[test]
    fn error_without_pending_load_is_transport_fault() {
        let mut engine = playing_engine(&["a"]);
        deliver(&mut engine, BackendEvent::Error(BackendError::Other("boom".into())));

        let events = lifecycle(&mut engine);
        assert!(matches!(
            events.as_slice(),
            [PlaybackEvent::Error {
                kind: ErrorKind::TransportFault,
                ..
            }]
        ));
        assert_eq!(engine.current_track().unwrap().id(), "a");
    }

    #[test]
    fn new_load_cancels_previous_pending() {
        let mut engine = engine();
        let _ = engine.add(None, vec![track("a"), track("b")]);
        let Ack::Loading(mut first) = engine.skip("a").unwrap() else {
            panic!("expected a load");
        };
        let Ack::Loading(mut second) = engine.skip("b").unwrap() else {
            panic!("expected a load");
        };

        assert!(matches!(
            first.try_outcome(),
            Some(Err(PlaybackError::LoadFailure {
                source: BackendError::Cancelled,
                ..
            }))
        ));
        assert!(second.try_outcome().is_none());
        assert!(!engine
            .sink()
            .iter()
            .any(|event| matches!(event, PlaybackEvent::Error { .. })));
    }

    fn timed(id: &str, secs: u64) -> Track {
        Track::builder(id, format!("/music/{}.mp3", id))
            .local(true)
            .duration(Duration::from_secs(secs))
            .build()
            .unwrap()
    }

    #[test]
    fn prepared_from_replaced_load_is_dropped() {
        let mut engine = engine();
        let _ = engine
            .add(None, vec![timed("a", 600), timed("b", 10)])
            .unwrap();
        let stale = engine.current_load().unwrap();
        let Ack::Loading(mut pending) = engine.skip("b").unwrap() else {
            panic!("expected a load");
        };
        assert_ne!(engine.current_load(), Some(stale));
        engine.sink_mut().clear();

        engine.handle_backend_event(
            stale,
            BackendEvent::Prepared {
                duration: Duration::from_secs(600),
            },
        );
        assert!(pending.try_outcome().is_none());
        assert!(engine.is_loading());
        assert_eq!(engine.duration(), Duration::ZERO);
        assert_eq!(engine.state(), PlaybackState::Buffering);
        assert!(engine.sink().is_empty());

        deliver(
            &mut engine,
            BackendEvent::Prepared {
                duration: Duration::from_secs(10),
            },
        );
        assert!(matches!(pending.try_outcome(), Some(Ok(()))));
        assert_eq!(engine.duration(), Duration::from_secs(10));
        let loads: Vec<_> = lifecycle(&mut engine)
            .into_iter()
            .filter(|event| matches!(event, PlaybackEvent::Load { .. }))
            .collect();
        assert_eq!(loads, vec![PlaybackEvent::Load { track: timed("b", 10) }]);
    }

    #[test]
    fn completion_from_replaced_load_is_dropped() {
        let mut engine = playing_engine(&["a", "b", "c"]);
        let stale = engine.current_load().unwrap();
        let _ = engine.skip("b").unwrap();
        deliver(&mut engine, prepared());
        engine.sink_mut().clear();

        engine.handle_backend_event(stale, BackendEvent::Completed);
        assert!(engine.sink().is_empty());
        assert_eq!(engine.current_track().unwrap().id(), "b");
        assert_eq!(engine.state(), PlaybackState::Playing);
    }

    #[test]
    fn error_from_replaced_load_leaves_pending_alone() {
        let mut engine = engine();
        let _ = engine.add(None, vec![track("a"), track("b")]).unwrap();
        let stale = engine.current_load().unwrap();
        let Ack::Loading(mut pending) = engine.skip("b").unwrap() else {
            panic!("expected a load");
        };
        engine.sink_mut().clear();

        engine.handle_backend_event(stale, BackendEvent::Error(BackendError::ServerDied));
        assert!(pending.try_outcome().is_none());
        assert!(engine.is_loading());
        assert!(engine.sink().is_empty());
    }

    #[test]
    fn events_from_swapped_out_backend_are_dropped() {
        let mut engine = playing_engine(&["a", "b"]);
        let stale = engine.current_load().unwrap();
        let _ = engine
            .swap_backend(Box::new(SimulatedBackend::new(BackendKind::CastCapable)))
            .unwrap();
        assert!(engine.current_load().is_some_and(|load| load > stale));
        engine.sink_mut().clear();

        engine.handle_backend_event(stale, prepared());
        engine.handle_backend_event(stale, BackendEvent::Completed);
        assert!(engine.is_loading());
        assert!(engine.sink().is_empty());
        assert_eq!(engine.current_track().unwrap().id(), "a");

        deliver(&mut engine, prepared());
        assert_eq!(engine.state(), PlaybackState::Playing);
    }

    #[test]
    fn reset_unbinds_the_load() {
        let mut engine = playing_engine(&["a"]);
        let stale = engine.current_load().unwrap();
        engine.reset();
        assert!(engine.current_load().is_none());
        engine.sink_mut().clear();

        engine.handle_backend_event(stale, BackendEvent::Error(BackendError::ServerDied));
        assert!(engine.sink().is_empty());
    }

    #[test]
    fn completion_ends_track_and_advances() {
        let mut engine = playing_engine(&["a", "b"]);
        deliver(&mut engine, BackendEvent::Completed);

        let events = lifecycle(&mut engine);
        assert_eq!(events[0], PlaybackEvent::Stop);
        assert_eq!(
            events[1],
            PlaybackEvent::StateChange {
                state: PlaybackState::Stopped
            }
        );
        assert_eq!(events[2], PlaybackEvent::End { track: track("a") });
        assert_eq!(engine.current_track().unwrap().id(), "b");

        // Play intent carried over from the finished track
        deliver(&mut engine, prepared());
        assert_eq!(engine.state(), PlaybackState::Playing);
    }

    #[test]
    fn completion_of_last_track_stops() {
        let mut engine = playing_engine(&["a"]);
        deliver(&mut engine, BackendEvent::Completed);

        assert_eq!(engine.state(), PlaybackState::Stopped);
        assert_eq!(engine.cursor(), Some(0));
        assert!(!engine.is_loading());
    }

    #[test]
    fn removing_everything_resets() {
        let mut engine = playing_engine(&["a", "b"]);
        let ack = engine.remove(["a", "b"]).unwrap();
        assert!(matches!(ack, Ack::Done));
        assert_eq!(engine.state(), PlaybackState::None);
        assert_eq!(engine.cursor(), None);
        assert!(engine.current_track().is_none());
    }

    #[test]
    fn removing_current_reloads_following() {
        let mut engine = playing_engine(&["a", "b", "c"]);
        let ack = engine.remove(vec!["a".to_string()]).unwrap();
        assert!(matches!(ack, Ack::Loading(ref p) if p.track_id() == "b"));
    }

    #[test]
    fn anchor_insert_before_current_reloads_same_track() {
        let mut engine = playing_engine(&["a", "b"]);
        let _ = engine.skip("b").unwrap();
        deliver(&mut engine, prepared());

        let ack = engine.add(Some("a"), vec![track("x")]).unwrap();
        let Ack::Loading(pending) = ack else {
            panic!("expected a reload");
        };
        assert_eq!(pending.track_id(), "b");
        assert_eq!(engine.cursor(), Some(2));
    }

    #[test]
    fn load_inserts_after_current() {
        let mut engine = playing_engine(&["a", "b"]);
        let ack = engine.load(track("new")).unwrap();
        assert!(matches!(ack, Ack::Loading(ref p) if p.track_id() == "new"));

        let ids: Vec<&str> = engine.queue().iter().map(Track::id).collect();
        assert_eq!(ids, ["a", "new", "b"]);
        assert_eq!(engine.cursor(), Some(1));
    }

    #[test]
    fn invalid_raw_input_adds_nothing() {
        let mut engine = engine();
        let data = vec![
            TrackData {
                id: "ok".into(),
                url: "https://example.com/ok.mp3".into(),
                ..Default::default()
            },
            TrackData {
                id: "bad".into(),
                url: String::new(),
                ..Default::default()
            },
        ];

        assert!(matches!(
            engine.add_data(None, data),
            Err(PlaybackError::InvalidTrack(_))
        ));
        assert!(engine.queue().is_empty());
    }

    #[test]
    fn load_timeout_rejects_and_notifies() {
        let mut engine = PlaybackEngine::new(
            Box::new(SimulatedBackend::new(BackendKind::LocalDecode)),
            Vec::<PlaybackEvent>::new(),
            EngineConfig {
                load_timeout_ms: 1_000,
                ..Default::default()
            },
        );
        let Ack::Loading(mut pending) = engine.add(None, vec![track("a")]).unwrap() else {
            panic!("expected a load");
        };

        assert!(!engine.expire_load(Instant::now()));
        assert!(engine.expire_load(Instant::now() + Duration::from_secs(2)));

        assert!(matches!(
            pending.try_outcome(),
            Some(Err(PlaybackError::LoadFailure {
                source: BackendError::Timeout(_),
                ..
            }))
        ));
        assert!(engine.sink().iter().any(|event| matches!(
            event,
            PlaybackEvent::Error {
                kind: ErrorKind::LoadFailure,
                ..
            }
        )));

        // A late prepare still binds the track
        deliver(&mut engine, prepared());
        assert_eq!(engine.state(), PlaybackState::Paused);
    }

    #[test]
    fn disabled_timeout_never_expires() {
        let mut engine = PlaybackEngine::new(
            Box::new(SimulatedBackend::new(BackendKind::LocalDecode)),
            Vec::<PlaybackEvent>::new(),
            EngineConfig {
                load_timeout_ms: 0,
                ..Default::default()
            },
        );
        let _ = engine.add(None, vec![track("a")]).unwrap();
        assert!(!engine.expire_load(Instant::now() + Duration::from_secs(3600)));
        assert!(engine.is_loading());
    }

    #[test]
    fn swap_backend_carries_track_and_intent() {
        let mut engine = playing_engine(&["a", "b"]);
        engine.set_volume(0.4);

        let ack = engine
            .swap_backend(Box::new(SimulatedBackend::new(BackendKind::CastCapable)))
            .unwrap();
        assert!(matches!(ack, Ack::Loading(ref p) if p.track_id() == "a"));
        assert_eq!(engine.backend_kind(), BackendKind::CastCapable);
        assert_eq!(engine.volume(), 0.4);

        deliver(&mut engine, prepared());
        assert_eq!(engine.state(), PlaybackState::Playing);
    }

    #[test]
    fn copy_queue_into_other_engine() {
        let source = playing_engine(&["a", "b"]);
        let mut target = playing_engine(&["z"]);

        let _ = source.copy_queue_to(&mut target, Some("z")).unwrap();
        let ids: Vec<&str> = target.queue().iter().map(Track::id).collect();
        assert_eq!(ids, ["a", "b", "z"]);
        assert_eq!(target.current_track().unwrap().id(), "z");
    }

    #[test]
    fn view_binding_depends_on_backend() {
        let mut audio = engine();
        assert!(matches!(
            audio.bind_view(Some(ViewHandle(1))),
            Err(PlaybackError::Unsupported(_))
        ));

        let mut video = PlaybackEngine::new(
            Box::new(SimulatedBackend::new(BackendKind::ViewBound)),
            Vec::<PlaybackEvent>::new(),
            EngineConfig::default(),
        );
        assert!(video.bind_view(Some(ViewHandle(1))).is_ok());
    }

    #[test]
    fn initial_volume_is_applied() {
        let engine = PlaybackEngine::new(
            Box::new(SimulatedBackend::new(BackendKind::LocalDecode)),
            Vec::<PlaybackEvent>::new(),
            EngineConfig {
                initial_volume: 0.25,
                ..Default::default()
            },
        );
        assert_eq!(engine.volume(), 0.25);
    }

    #[test]
    fn progress_only_published_while_playing() {
        let mut engine = playing_engine(&["a"]);
        engine.publish_progress();
        assert_eq!(engine.sink().len(), 1);

        engine.pause();
        engine.sink_mut().clear();
        engine.publish_progress();
        assert!(engine.sink().is_empty());
    }
}
