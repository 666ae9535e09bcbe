//! Playable queue entries

use crate::error::{PlaybackError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Where a track's media comes from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackSource {
    /// URL or local path of the media
    pub url: String,

    /// Whether `url` refers to local storage
    pub local: bool,
}

impl TrackSource {
    pub fn is_remote(&self) -> bool {
        !self.local
    }
}

/// Bounds for the transient proxy cache a backend may allocate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CachePolicy {
    /// Maximum number of cached files (0 = unbounded/unused)
    pub max_files: u32,

    /// Maximum cache size in bytes (0 = unbounded/unused)
    pub max_size: u64,
}

impl CachePolicy {
    /// Caching is requested when either bound is set
    pub fn is_enabled(&self) -> bool {
        self.max_files > 0 || self.max_size > 0
    }
}

/// Display metadata carried with a track
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TrackMetadata {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub artwork: Option<String>,

    /// Duration advertised by the host, before the backend knows better
    pub duration: Option<Duration>,

    /// Arbitrary host payload, passed through untouched
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// One playable queue entry
///
/// Immutable once built. The queue owns its tracks; copying a track into
/// another queue is a clone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    id: String,
    source: TrackSource,
    cache: CachePolicy,
    metadata: TrackMetadata,
}

impl Track {
    /// Start building a track with the required identity and locator
    pub fn builder(id: impl Into<String>, url: impl Into<String>) -> TrackBuilder {
        TrackBuilder {
            track: Track {
                id: id.into(),
                source: TrackSource {
                    url: url.into(),
                    local: false,
                },
                cache: CachePolicy::default(),
                metadata: TrackMetadata::default(),
            },
        }
    }

    /// Identifier, unique within a queue at any instant
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn source(&self) -> &TrackSource {
        &self.source
    }

    pub fn cache(&self) -> CachePolicy {
        self.cache
    }

    pub fn metadata(&self) -> &TrackMetadata {
        &self.metadata
    }
}

/// Builder for [`Track`]
#[derive(Debug, Clone)]
pub struct TrackBuilder {
    track: Track,
}

impl TrackBuilder {
    pub fn local(mut self, local: bool) -> Self {
        self.track.source.local = local;
        self
    }

    pub fn cache(mut self, max_files: u32, max_size: u64) -> Self {
        self.track.cache = CachePolicy {
            max_files,
            max_size,
        };
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.track.metadata.title = Some(title.into());
        self
    }

    pub fn artist(mut self, artist: impl Into<String>) -> Self {
        self.track.metadata.artist = Some(artist.into());
        self
    }

    pub fn album(mut self, album: impl Into<String>) -> Self {
        self.track.metadata.album = Some(album.into());
        self
    }

    pub fn duration(mut self, duration: Duration) -> Self {
        self.track.metadata.duration = Some(duration);
        self
    }

    pub fn metadata(mut self, metadata: TrackMetadata) -> Self {
        self.track.metadata = metadata;
        self
    }

    /// Validate and finish the track
    ///
    /// # Errors
    /// Returns [`PlaybackError::InvalidTrack`] for an empty id or url, or for
    /// a remote url that is not an absolute URL.
    pub fn build(self) -> Result<Track> {
        let track = self.track;

        if track.id.is_empty() {
            return Err(PlaybackError::InvalidTrack("missing id".to_string()));
        }
        if track.source.url.is_empty() {
            return Err(PlaybackError::InvalidTrack(format!(
                "track {} has no url",
                track.id
            )));
        }
        if track.source.is_remote() {
            Url::parse(&track.source.url).map_err(|e| {
                PlaybackError::InvalidTrack(format!(
                    "track {} has invalid url {}: {}",
                    track.id, track.source.url, e
                ))
            })?;
        }

        Ok(track)
    }
}

/// Raw track input as sent by the host
///
/// ```json
/// { "id": "1", "url": "https://example.com/a.mp3", "title": "A", "cacheMaxFiles": 5 }
/// ```
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackData {
    pub id: String,
    pub url: String,
    #[serde(default)]
    pub local: bool,
    #[serde(default)]
    pub cache_max_files: u32,
    #[serde(default)]
    pub cache_max_size: u64,
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub artwork: Option<String>,

    /// Duration in milliseconds
    pub duration: Option<u64>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl TryFrom<TrackData> for Track {
    type Error = PlaybackError;

    fn try_from(data: TrackData) -> Result<Self> {
        let metadata = TrackMetadata {
            title: data.title,
            artist: data.artist,
            album: data.album,
            artwork: data.artwork,
            duration: data.duration.map(Duration::from_millis),
            extra: data.extra,
        };

        Track::builder(data.id, data.url)
            .local(data.local)
            .cache(data.cache_max_files, data.cache_max_size)
            .metadata(metadata)
            .build()
    }
}
