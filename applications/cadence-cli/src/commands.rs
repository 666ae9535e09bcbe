//! Subcommand implementations

use crate::config::CliConfig;
use crate::error::{CliError, Result};
use cadence_playback::{
    backend_channel, PlaybackError, PlaybackEvent, SimulatedBackend, Track, TrackData,
};
use cadence_service::{PlayerHandle, PlayerService};
use std::io::Write;
use std::path::Path;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Read a queue file: a JSON array of track objects
pub fn read_queue(path: &Path) -> Result<Vec<TrackData>> {
    let raw = std::fs::read_to_string(path)?;
    let data: Vec<TrackData> = serde_json::from_str(&raw)?;
    if data.is_empty() {
        return Err(CliError::Queue(format!("{} contains no tracks", path.display())));
    }
    Ok(data)
}

/// Validate every entry of a queue file
pub fn validate_queue(data: Vec<TrackData>) -> Result<Vec<Track>> {
    data.into_iter()
        .enumerate()
        .map(|(index, entry)| {
            Track::try_from(entry).map_err(|e| CliError::Queue(format!("entry {}: {}", index, e)))
        })
        .collect()
}

/// Print a validated queue, one track per line
pub fn print_queue(tracks: &[Track], out: &mut impl Write) -> Result<()> {
    for (index, track) in tracks.iter().enumerate() {
        let metadata = track.metadata();
        let title = metadata.title.as_deref().unwrap_or("-");
        let artist = metadata.artist.as_deref().unwrap_or("-");
        let origin = if track.source().is_remote() {
            "remote"
        } else {
            "local"
        };
        let cached = if track.cache().is_enabled() {
            ", cached"
        } else {
            ""
        };

        writeln!(
            out,
            "{:>3}. {} | {} - {} ({}{})",
            index + 1,
            track.id(),
            artist,
            title,
            origin,
            cached
        )?;
    }
    Ok(())
}

/// `cadence queue <file>`
pub fn queue(path: &Path) -> Result<()> {
    let tracks = validate_queue(read_queue(path)?)?;
    let mut stdout = std::io::stdout().lock();
    print_queue(&tracks, &mut stdout)?;
    writeln!(stdout, "{} track(s)", tracks.len())?;
    Ok(())
}

/// `cadence play <file>`
///
/// Plays the queue on a simulated backend, staying `dwell` on each track,
/// and prints every notification as a JSON line. Ctrl-C stops early.
pub async fn play(config: &CliConfig, path: &Path, dwell: Duration) -> Result<()> {
    let data = read_queue(path)?;

    let (driver, events) = backend_channel();
    let mut backend = SimulatedBackend::new(config.backend.kind).with_events(driver);
    if let Some(proxy) = config.backend.cache_proxy_url()? {
        backend = backend.with_cache_proxy(proxy);
    }

    let (player, notifications) = PlayerService::start(
        Box::new(backend),
        events,
        config.engine.clone(),
        config.service,
    );
    let printer = tokio::spawn(print_notifications(notifications));

    info!(tracks = data.len(), "Starting playback");
    player.add_data(None, data).await?;
    player.play().await?;

    tokio::select! {
        result = walk_queue(&player, dwell) => result?,
        _ = tokio::signal::ctrl_c() => info!("Interrupted"),
    }

    player.stop().await?;
    player.destroy().await?;

    if let Err(e) = printer.await {
        warn!("Notification printer failed: {}", e);
    }
    Ok(())
}

/// Advance through the queue until its last track has played
async fn walk_queue(player: &PlayerHandle, dwell: Duration) -> Result<()> {
    loop {
        tokio::time::sleep(dwell).await;
        match player.skip_to_next().await {
            Ok(()) => {}
            Err(PlaybackError::NoAdjacentTrack(_)) => return Ok(()),
            Err(e) => return Err(e.into()),
        }
    }
}

async fn print_notifications(mut notifications: mpsc::UnboundedReceiver<PlaybackEvent>) {
    while let Some(event) = notifications.recv().await {
        match serde_json::to_string(&event) {
            Ok(line) => println!("{}", line),
            Err(e) => warn!("Failed to encode notification: {}", e),
        }
    }
}
