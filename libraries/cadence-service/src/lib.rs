//! Cadence - Player Service
//!
//! Runs a [`PlaybackEngine`](cadence_playback::PlaybackEngine) on a single
//! tokio task. Commands, backend callbacks and periodic progress are
//! serialized through that task, and callers talk to it through a
//! cloneable [`PlayerHandle`].
//!
//! # Example
//!
//! ```rust
//! use cadence_playback::{
//!     backend_channel, BackendKind, EngineConfig, PlaybackState, SimulatedBackend, Track,
//! };
//! use cadence_service::{PlayerService, ServiceConfig};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> cadence_playback::Result<()> {
//! let (events_tx, events_rx) = backend_channel();
//! let backend = SimulatedBackend::new(BackendKind::LocalDecode).with_events(events_tx);
//!
//! let (player, _notifications) = PlayerService::start(
//!     Box::new(backend),
//!     events_rx,
//!     EngineConfig::default(),
//!     ServiceConfig::default(),
//! );
//!
//! let track = Track::builder("intro", "/music/intro.mp3").local(true).build()?;
//! player.add(None, vec![track]).await?;
//! player.play().await?;
//! assert_eq!(player.state().await?, PlaybackState::Playing);
//!
//! player.destroy().await?;
//! # Ok(())
//! # }
//! ```

mod command;
mod config;
mod service;

pub use command::PlayerStatus;
pub use config::ServiceConfig;
pub use service::{PlayerHandle, PlayerService};
