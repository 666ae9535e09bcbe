//! Commands accepted by the player loop
//!
//! Every variant carries the oneshot that answers the caller.

use cadence_playback::{
    Backend, BackendKind, LoadId, PlaybackState, Result, Track, TrackData, ViewHandle,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::oneshot;

pub(crate) type Responder<T> = oneshot::Sender<Result<T>>;

/// Point-in-time view of the transport
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerStatus {
    pub state: PlaybackState,
    pub position: Duration,
    pub buffered_position: Duration,
    pub duration: Duration,
    pub speed: f32,
    pub volume: f32,
    pub backend: BackendKind,
    pub current_track_id: Option<String>,
    pub loading: bool,

    /// Load the backend's events must be stamped with to be applied
    pub load: Option<LoadId>,
}

pub(crate) enum Command {
    // Queue
    Add {
        anchor_id: Option<String>,
        tracks: Vec<Track>,
        respond: Responder<()>,
    },
    AddData {
        anchor_id: Option<String>,
        data: Vec<TrackData>,
        respond: Responder<()>,
    },
    Remove {
        ids: Vec<String>,
        respond: Responder<()>,
    },
    Skip {
        id: String,
        respond: Responder<()>,
    },
    SkipToNext {
        respond: Responder<()>,
    },
    SkipToPrevious {
        respond: Responder<()>,
    },
    Load {
        track: Track,
        respond: Responder<()>,
    },
    LoadData {
        data: TrackData,
        respond: Responder<()>,
    },
    Reset {
        respond: Responder<()>,
    },

    // Transport
    Play {
        respond: Responder<()>,
    },
    Pause {
        respond: Responder<()>,
    },
    Stop {
        respond: Responder<()>,
    },
    SeekTo {
        position: Duration,
        respond: Responder<()>,
    },
    SetVolume {
        volume: f32,
        respond: Responder<()>,
    },
    BindView {
        view: Option<ViewHandle>,
        respond: Responder<()>,
    },
    SwapBackend {
        backend: Box<dyn Backend>,
        respond: Responder<()>,
    },

    // Queries
    GetQueue {
        respond: Responder<Vec<Track>>,
    },
    GetCurrentTrack {
        respond: Responder<Option<Track>>,
    },
    Status {
        respond: Responder<PlayerStatus>,
    },

    Destroy {
        respond: Responder<()>,
    },
}

impl Command {
    /// Short name for logs
    pub(crate) fn name(&self) -> &'static str {
        match self {
            Self::Add { .. } => "add",
            Self::AddData { .. } => "add_data",
            Self::Remove { .. } => "remove",
            Self::Skip { .. } => "skip",
            Self::SkipToNext { .. } => "skip_to_next",
            Self::SkipToPrevious { .. } => "skip_to_previous",
            Self::Load { .. } => "load",
            Self::LoadData { .. } => "load_data",
            Self::Reset { .. } => "reset",
            Self::Play { .. } => "play",
            Self::Pause { .. } => "pause",
            Self::Stop { .. } => "stop",
            Self::SeekTo { .. } => "seek_to",
            Self::SetVolume { .. } => "set_volume",
            Self::BindView { .. } => "bind_view",
            Self::SwapBackend { .. } => "swap_backend",
            Self::GetQueue { .. } => "get_queue",
            Self::GetCurrentTrack { .. } => "get_current_track",
            Self::Status { .. } => "status",
            Self::Destroy { .. } => "destroy",
        }
    }
}
