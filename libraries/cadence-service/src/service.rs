//! Player service - the serialized owner of a playback engine
//!
//! One tokio task owns the [`PlaybackEngine`] and multiplexes three
//! inputs: host commands, backend callbacks and a progress tick. Nothing
//! else touches the engine, so no locks are needed.

use crate::command::{Command, PlayerStatus, Responder};
use crate::config::ServiceConfig;
use cadence_playback::{
    Ack, Backend, BackendEventReceiver, EngineConfig, LoadEvent, NotificationSink,
    PlaybackEngine, PlaybackError, PlaybackEvent, PlaybackState, Result, Track, TrackData,
    ViewHandle,
};
use std::ops::ControlFlow;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, oneshot};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

/// Command loop around one engine
pub struct PlayerService<S: NotificationSink> {
    engine: PlaybackEngine<S>,
    commands: mpsc::Receiver<Command>,
    backend_events: BackendEventReceiver,
    config: ServiceConfig,
}

impl<S: NotificationSink + 'static> PlayerService<S> {
    /// Move `engine` onto its own task and return a handle to it
    ///
    /// `backend_events` must be the receiving end of the channel the bound
    /// backend's driver sends on. Must be called within a tokio runtime.
    pub fn spawn(
        engine: PlaybackEngine<S>,
        backend_events: BackendEventReceiver,
        config: ServiceConfig,
    ) -> PlayerHandle {
        let (tx, commands) = mpsc::channel(config.channel_capacity());

        let service = Self {
            engine,
            commands,
            backend_events,
            config,
        };
        tokio::spawn(service.run());

        PlayerHandle { commands: tx }
    }

    async fn run(mut self) {
        info!(
            backend = ?self.engine.backend_kind(),
            interval = ?self.config.progress_interval(),
            "Player service started"
        );

        let mut ticker = tokio::time::interval(self.config.progress_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                command = self.commands.recv() => {
                    let Some(command) = command else {
                        debug!("All player handles dropped");
                        self.engine.destroy();
                        break;
                    };
                    if self.handle_command(command).is_break() {
                        break;
                    }
                }
                Some(LoadEvent { load, event }) = self.backend_events.recv() => {
                    self.engine.handle_backend_event(load, event);
                }
                _ = ticker.tick() => {
                    self.engine.expire_load(Instant::now());
                    self.engine.publish_progress();
                }
            }
        }

        info!("Player service stopped");
    }

    fn handle_command(&mut self, command: Command) -> ControlFlow<()> {
        debug!(command = command.name(), "Handling command");
        let engine = &mut self.engine;

        match command {
            // ===== Queue =====
            Command::Add {
                anchor_id,
                tracks,
                respond,
            } => acknowledge(engine.add(anchor_id.as_deref(), tracks), respond),
            Command::AddData {
                anchor_id,
                data,
                respond,
            } => acknowledge(engine.add_data(anchor_id.as_deref(), data), respond),
            Command::Remove { ids, respond } => acknowledge(engine.remove(ids), respond),
            Command::Skip { id, respond } => acknowledge(engine.skip(&id), respond),
            Command::SkipToNext { respond } => acknowledge(engine.skip_to_next(), respond),
            Command::SkipToPrevious { respond } => {
                acknowledge(engine.skip_to_previous(), respond);
            }
            Command::Load { track, respond } => acknowledge(engine.load(track), respond),
            Command::LoadData { data, respond } => acknowledge(engine.load_data(data), respond),
            Command::Reset { respond } => {
                engine.reset();
                let _ = respond.send(Ok(()));
            }

            // ===== Transport =====
            Command::Play { respond } => {
                engine.play();
                let _ = respond.send(Ok(()));
            }
            Command::Pause { respond } => {
                engine.pause();
                let _ = respond.send(Ok(()));
            }
            Command::Stop { respond } => {
                engine.stop();
                let _ = respond.send(Ok(()));
            }
            Command::SeekTo { position, respond } => {
                engine.seek_to(position);
                let _ = respond.send(Ok(()));
            }
            Command::SetVolume { volume, respond } => {
                engine.set_volume(volume);
                let _ = respond.send(Ok(()));
            }
            Command::BindView { view, respond } => {
                let _ = respond.send(engine.bind_view(view));
            }
            Command::SwapBackend { backend, respond } => {
                acknowledge(engine.swap_backend(backend), respond);
            }

            // ===== Queries =====
            Command::GetQueue { respond } => {
                let _ = respond.send(Ok(engine.queue().to_vec()));
            }
            Command::GetCurrentTrack { respond } => {
                let _ = respond.send(Ok(engine.current_track().cloned()));
            }
            Command::Status { respond } => {
                let _ = respond.send(Ok(status(engine)));
            }

            Command::Destroy { respond } => {
                engine.destroy();
                let _ = respond.send(Ok(()));
                return ControlFlow::Break(());
            }
        }

        ControlFlow::Continue(())
    }
}

impl PlayerService<mpsc::UnboundedSender<PlaybackEvent>> {
    /// Build an engine around `backend` with a channel sink and spawn it
    ///
    /// Returns the handle and the stream of notifications.
    pub fn start(
        backend: Box<dyn Backend>,
        backend_events: BackendEventReceiver,
        engine_config: EngineConfig,
        config: ServiceConfig,
    ) -> (PlayerHandle, mpsc::UnboundedReceiver<PlaybackEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let engine = PlaybackEngine::new(backend, tx, engine_config);
        (Self::spawn(engine, backend_events, config), rx)
    }
}

/// Answer `respond` now, or once the pending load resolves
fn acknowledge(ack: Result<Ack>, respond: Responder<()>) {
    match ack {
        Ok(Ack::Done) => {
            let _ = respond.send(Ok(()));
        }
        Ok(Ack::Loading(pending)) => {
            tokio::spawn(async move {
                let _ = respond.send(pending.wait().await);
            });
        }
        Err(e) => {
            let _ = respond.send(Err(e));
        }
    }
}

fn status<S: NotificationSink>(engine: &PlaybackEngine<S>) -> PlayerStatus {
    PlayerStatus {
        state: engine.state(),
        position: engine.position(),
        buffered_position: engine.buffered_position(),
        duration: engine.duration(),
        speed: engine.speed(),
        volume: engine.volume(),
        backend: engine.backend_kind(),
        current_track_id: engine.current_track().map(|t| t.id().to_string()),
        loading: engine.is_loading(),
        load: engine.current_load(),
    }
}

/// Cloneable handle to a running [`PlayerService`]
///
/// Every method is a request/response round trip through the loop.
/// Commands that load a track resolve once the backend has prepared it (or
/// failed to). After the loop ends every call returns
/// [`PlaybackError::EngineClosed`].
#[derive(Debug, Clone)]
pub struct PlayerHandle {
    commands: mpsc::Sender<Command>,
}

impl PlayerHandle {
    async fn request<T>(&self, build: impl FnOnce(Responder<T>) -> Command) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(build(tx))
            .await
            .map_err(|_| PlaybackError::EngineClosed)?;
        rx.await.unwrap_or(Err(PlaybackError::EngineClosed))
    }

    /// Whether the loop has stopped
    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }

    // ===== Queue =====

    pub async fn add(&self, anchor_id: Option<&str>, tracks: Vec<Track>) -> Result<()> {
        let anchor_id = anchor_id.map(str::to_owned);
        self.request(|respond| Command::Add {
            anchor_id,
            tracks,
            respond,
        })
        .await
    }

    pub async fn add_data(&self, anchor_id: Option<&str>, data: Vec<TrackData>) -> Result<()> {
        let anchor_id = anchor_id.map(str::to_owned);
        self.request(|respond| Command::AddData {
            anchor_id,
            data,
            respond,
        })
        .await
    }

    pub async fn remove<I, T>(&self, ids: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let ids = ids.into_iter().map(Into::into).collect();
        self.request(|respond| Command::Remove { ids, respond }).await
    }

    pub async fn skip(&self, id: &str) -> Result<()> {
        let id = id.to_owned();
        self.request(|respond| Command::Skip { id, respond }).await
    }

    pub async fn skip_to_next(&self) -> Result<()> {
        self.request(|respond| Command::SkipToNext { respond })
            .await
    }

    pub async fn skip_to_previous(&self) -> Result<()> {
        self.request(|respond| Command::SkipToPrevious { respond })
            .await
    }

    /// Insert `track` after the current one and make it current
    pub async fn load(&self, track: Track) -> Result<()> {
        self.request(|respond| Command::Load { track, respond })
            .await
    }

    pub async fn load_data(&self, data: TrackData) -> Result<()> {
        self.request(|respond| Command::LoadData { data, respond })
            .await
    }

    pub async fn reset(&self) -> Result<()> {
        self.request(|respond| Command::Reset { respond }).await
    }

    // ===== Transport =====

    pub async fn play(&self) -> Result<()> {
        self.request(|respond| Command::Play { respond }).await
    }

    pub async fn pause(&self) -> Result<()> {
        self.request(|respond| Command::Pause { respond }).await
    }

    pub async fn stop(&self) -> Result<()> {
        self.request(|respond| Command::Stop { respond }).await
    }

    pub async fn seek_to(&self, position: Duration) -> Result<()> {
        self.request(|respond| Command::SeekTo { position, respond })
            .await
    }

    pub async fn set_volume(&self, volume: f32) -> Result<()> {
        self.request(|respond| Command::SetVolume { volume, respond })
            .await
    }

    pub async fn bind_view(&self, view: Option<ViewHandle>) -> Result<()> {
        self.request(|respond| Command::BindView { view, respond })
            .await
    }

    /// Move playback to another backend
    ///
    /// The new backend's driver must send on the channel this service
    /// was spawned with. Events the old backend still has queued are
    /// dropped.
    pub async fn swap_backend(&self, backend: Box<dyn Backend>) -> Result<()> {
        self.request(|respond| Command::SwapBackend { backend, respond })
            .await
    }

    /// Destroy the backend and stop the loop
    pub async fn destroy(&self) -> Result<()> {
        self.request(|respond| Command::Destroy { respond }).await
    }

    // ===== Queries =====

    pub async fn get_queue(&self) -> Result<Vec<Track>> {
        self.request(|respond| Command::GetQueue { respond }).await
    }

    pub async fn get_current_track(&self) -> Result<Option<Track>> {
        self.request(|respond| Command::GetCurrentTrack { respond })
            .await
    }

    pub async fn status(&self) -> Result<PlayerStatus> {
        self.request(|respond| Command::Status { respond }).await
    }

    pub async fn state(&self) -> Result<PlaybackState> {
        Ok(self.status().await?.state)
    }

    pub async fn position(&self) -> Result<Duration> {
        Ok(self.status().await?.position)
    }

    pub async fn buffered_position(&self) -> Result<Duration> {
        Ok(self.status().await?.buffered_position)
    }

    pub async fn duration(&self) -> Result<Duration> {
        Ok(self.status().await?.duration)
    }

    pub async fn speed(&self) -> Result<f32> {
        Ok(self.status().await?.speed)
    }

    pub async fn volume(&self) -> Result<f32> {
        Ok(self.status().await?.volume)
    }
}
