//! Transient proxy-cache lease held for the lifetime of one load

use crate::track::Track;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::debug;
use url::Url;

/// Scoped cache resource for a remote track
///
/// Acquired at `load` and released on drop, which happens on the next
/// `load`, on `reset` and on `destroy`.
#[derive(Debug)]
pub struct CacheLease {
    track_id: String,
    proxied_url: Url,
    live: Arc<AtomicUsize>,
}

impl CacheLease {
    /// Acquire a lease when the track is remote and asks for caching
    ///
    /// `live` counts outstanding leases across the owning backend.
    pub fn acquire(track: &Track, proxy_base: &Url, live: &Arc<AtomicUsize>) -> Option<Self> {
        if !track.source().is_remote() || !track.cache().is_enabled() {
            return None;
        }

        let mut proxied_url = proxy_base.clone();
        proxied_url
            .path_segments_mut()
            .ok()?
            .pop_if_empty()
            .push(track.id());
        proxied_url
            .query_pairs_mut()
            .append_pair("url", &track.source().url);

        live.fetch_add(1, Ordering::SeqCst);
        debug!(track_id = track.id(), %proxied_url, "Cache lease acquired");

        Some(Self {
            track_id: track.id().to_string(),
            proxied_url,
            live: Arc::clone(live),
        })
    }

    /// URL the decoder should read through
    pub fn proxied_url(&self) -> &Url {
        &self.proxied_url
    }
}

impl Drop for CacheLease {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
        debug!(track_id = %self.track_id, "Cache lease released");
    }
}
