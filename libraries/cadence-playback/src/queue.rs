//! Ordered track queue with a current-track cursor
//!
//! The queue never talks to a backend. Every mutation reports whether the
//! track at the cursor has to be (re)bound, and the engine acts on that.
//!
//! ```text
//! tracks:  [A] [B] [C] [D]
//!                   ^
//!                 cursor = 2  (C is current)
//! ```

use crate::error::{Direction, PlaybackError, Result};
use crate::track::Track;
use std::collections::HashSet;
use tracing::debug;

/// Whether a queue mutation requires the engine to rebind the current track
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueOutcome {
    /// The track at the cursor must be (re)loaded
    Reload,

    /// Positions may have been renumbered but the current track is untouched
    Unchanged,
}

/// Ordered sequence of tracks plus the cursor selecting the current one
///
/// Invariant after every public operation: empty ⇒ cursor unset,
/// non-empty ⇒ `0 <= cursor < len`.
#[derive(Debug, Clone, Default)]
pub struct Queue {
    tracks: Vec<Track>,
    cursor: Option<usize>,
}

impl Queue {
    /// Create new empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert tracks before `anchor_id`, or append when no anchor is given
    ///
    /// An anchor that is not in the queue behaves like an append. When the
    /// insertion lands at or before the cursor the cursor shifts with its
    /// track and a reload is signalled for that same track.
    pub fn add(&mut self, anchor_id: Option<&str>, tracks: Vec<Track>) -> QueueOutcome {
        if tracks.is_empty() {
            return QueueOutcome::Unchanged;
        }

        let count = tracks.len();
        let Some(cursor) = self.cursor else {
            // Empty queue: the first added track becomes current
            self.tracks.extend(tracks);
            self.cursor = Some(0);
            debug!(count, "Queue was empty, selecting first added track");
            return QueueOutcome::Reload;
        };

        let index = anchor_id
            .and_then(|id| self.position_of(id))
            .unwrap_or(self.tracks.len());

        self.tracks.splice(index..index, tracks);

        if cursor >= index {
            self.cursor = Some(cursor + count);
            debug!(index, count, "Inserted before current track, cursor shifted");
            QueueOutcome::Reload
        } else {
            debug!(index, count, "Inserted after current track");
            QueueOutcome::Unchanged
        }
    }

    /// Remove every track whose id is in `ids`
    ///
    /// Absent ids are ignored. Removing the current track moves the cursor to
    /// the first surviving track that followed it (or the last track when
    /// none did) and signals a reload.
    pub fn remove(&mut self, ids: &HashSet<String>) -> QueueOutcome {
        let Some(cursor) = self.cursor else {
            return QueueOutcome::Unchanged;
        };

        let mut removed_before = 0;
        let mut current_removed = false;
        let mut index = 0;

        self.tracks.retain(|track| {
            let keep = !ids.contains(track.id());
            if !keep {
                if index < cursor {
                    removed_before += 1;
                } else if index == cursor {
                    current_removed = true;
                }
            }
            index += 1;
            keep
        });

        if self.tracks.is_empty() {
            debug!("Queue emptied by removal");
            self.cursor = None;
            return QueueOutcome::Reload;
        }

        let renumbered = cursor - removed_before;
        if current_removed {
            self.cursor = Some(renumbered.min(self.tracks.len() - 1));
            debug!(cursor = ?self.cursor, "Current track removed");
            QueueOutcome::Reload
        } else {
            self.cursor = Some(renumbered);
            QueueOutcome::Unchanged
        }
    }

    /// Select the first track with the given id
    pub fn skip(&mut self, id: &str) -> Result<QueueOutcome> {
        let index = self
            .position_of(id)
            .ok_or_else(|| PlaybackError::NotFound(id.to_string()))?;

        self.cursor = Some(index);
        Ok(QueueOutcome::Reload)
    }

    /// Advance the cursor by one
    pub fn skip_to_next(&mut self) -> Result<QueueOutcome> {
        match self.cursor {
            Some(cursor) if cursor + 1 < self.tracks.len() => {
                self.cursor = Some(cursor + 1);
                Ok(QueueOutcome::Reload)
            }
            _ => Err(PlaybackError::NoAdjacentTrack(Direction::Next)),
        }
    }

    /// Move the cursor back by one
    pub fn skip_to_previous(&mut self) -> Result<QueueOutcome> {
        match self.cursor {
            Some(cursor) if cursor > 0 => {
                self.cursor = Some(cursor - 1);
                Ok(QueueOutcome::Reload)
            }
            _ => Err(PlaybackError::NoAdjacentTrack(Direction::Previous)),
        }
    }

    /// Insert a track right after the current one and make it current
    pub fn insert_after_current_and_select(&mut self, track: Track) -> QueueOutcome {
        let index = self
            .cursor
            .map_or(0, |cursor| (cursor + 1).min(self.tracks.len()));

        self.tracks.insert(index, track);
        self.cursor = Some(index);
        QueueOutcome::Reload
    }

    /// Remove every track and unset the cursor
    pub fn clear(&mut self) {
        self.tracks.clear();
        self.cursor = None;
    }

    /// Index of the first track with the given id
    pub fn position_of(&self, id: &str) -> Option<usize> {
        self.tracks.iter().position(|track| track.id() == id)
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    /// Track at the cursor
    pub fn current(&self) -> Option<&Track> {
        self.cursor.and_then(|cursor| self.tracks.get(cursor))
    }

    /// All tracks in playback order
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}
