//! Watched-episode bookkeeping in the user's document
//!
//! The user document keeps two fields this module cares about:
//!
//! ```json
//! {
//!   "videoSource": "gogoanime",
//!   "episodesWatched": {
//!     "154587": [{ "mediaId": 154587, "episodeNumber": 1, "episodeTitle": "The Journey's End" }]
//!   }
//! }
//! ```
//!
//! Every change is one merge write; nothing is cached here, so the document
//! store stays the single source of truth (last write wins).

use crate::source::EpisodeSource;
use crate::store::{DocumentStore, StoreError, UserId};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;

/// Document field holding the watched lists keyed by media id
pub const EPISODES_WATCHED_FIELD: &str = "episodesWatched";

/// Document field holding the preferred episode source
pub const VIDEO_SOURCE_FIELD: &str = "videoSource";

/// Errors that can occur while reading or writing watched state
#[derive(Debug, Error)]
pub enum WatchedError {
    /// The document store failed
    #[error("Document store error: {0}")]
    Store(#[from] StoreError),

    /// The stored list for a media entry has an unexpected shape
    #[error("Malformed watched list for media {media_id}: {source}")]
    Malformed {
        media_id: u64,
        source: serde_json::Error,
    },
}

/// One episode marked as watched
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchedEpisode {
    pub media_id: u64,
    /// 1-based position of the episode in the list it was marked from
    pub episode_number: u32,
    #[serde(default)]
    pub episode_title: String,
}

/// Builds the "every episode watched" list for a media entry
///
/// Episode numbers follow the order of `titles`, starting at 1.
pub fn all_episodes(media_id: u64, titles: &[String]) -> Vec<WatchedEpisode> {
    titles
        .iter()
        .enumerate()
        .map(|(index, title)| WatchedEpisode {
            media_id,
            episode_number: index as u32 + 1,
            episode_title: title.clone(),
        })
        .collect()
}

/// Reads and writes watched state and the source preference of users
pub struct WatchedSync<S> {
    store: S,
}

impl<S: DocumentStore> WatchedSync<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns the underlying document store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Reads the watched list of one media entry
    ///
    /// No user, no document, a missing entry or a `null` entry all yield
    /// `None`, meaning every episode is shown as unwatched.
    pub fn get_watched(
        &self,
        user: Option<&UserId>,
        media_id: u64,
    ) -> Result<Option<Vec<WatchedEpisode>>, WatchedError> {
        let Some(user) = user else {
            return Ok(None);
        };

        let Some(document) = self.store.read(user)? else {
            return Ok(None);
        };

        let entry = document
            .get(EPISODES_WATCHED_FIELD)
            .and_then(|lists| lists.get(media_id.to_string()))
            .cloned()
            .unwrap_or(Value::Null);

        if entry.is_null() {
            return Ok(None);
        }

        serde_json::from_value(entry)
            .map(Some)
            .map_err(|source| WatchedError::Malformed { media_id, source })
    }

    /// Replaces the watched list of a media entry with `episodes`
    ///
    /// An empty list is stored as `null`, the same as [`Self::unmark_all`].
    pub fn mark_all_watched(
        &self,
        user: &UserId,
        media_id: u64,
        episodes: &[WatchedEpisode],
    ) -> Result<(), WatchedError> {
        if episodes.is_empty() {
            return self.unmark_all(user, media_id);
        }

        self.write_list(user, media_id, serde_json::to_value(episodes).map_err(StoreError::from)?)
    }

    /// Clears the watched list of a media entry
    pub fn unmark_all(&self, user: &UserId, media_id: u64) -> Result<(), WatchedError> {
        self.write_list(user, media_id, Value::Null)
    }

    /// Whether every one of `known_count` episodes is marked
    ///
    /// Always `false` when no episodes are known.
    pub fn all_watched(
        &self,
        user: &UserId,
        media_id: u64,
        known_count: usize,
    ) -> Result<bool, WatchedError> {
        if known_count == 0 {
            return Ok(false);
        }

        Ok(self
            .get_watched(Some(user), media_id)?
            .is_some_and(|list| list.len() == known_count))
    }

    /// Marks every episode watched, or clears the list if it already was
    ///
    /// Returns whether all episodes are marked after the write.
    pub fn toggle_all_watched(
        &self,
        user: &UserId,
        media_id: u64,
        titles: &[String],
    ) -> Result<bool, WatchedError> {
        if titles.is_empty() {
            self.unmark_all(user, media_id)?;
            return Ok(false);
        }

        if self.all_watched(user, media_id, titles.len())? {
            self.unmark_all(user, media_id)?;
            Ok(false)
        } else {
            self.mark_all_watched(user, media_id, &all_episodes(media_id, titles))?;
            Ok(true)
        }
    }

    /// Adds one episode to the watched list, keeping the list ordered
    pub fn mark_episode_watched(
        &self,
        user: &UserId,
        episode: WatchedEpisode,
    ) -> Result<(), WatchedError> {
        let media_id = episode.media_id;
        let mut list = self.get_watched(Some(user), media_id)?.unwrap_or_default();

        list.retain(|e| e.episode_number != episode.episode_number);
        list.push(episode);
        list.sort_by_key(|e| e.episode_number);

        self.mark_all_watched(user, media_id, &list)
    }

    /// Removes one episode from the watched list
    pub fn unmark_episode(
        &self,
        user: &UserId,
        media_id: u64,
        episode_number: u32,
    ) -> Result<(), WatchedError> {
        let Some(mut list) = self.get_watched(Some(user), media_id)? else {
            return Ok(());
        };

        list.retain(|e| e.episode_number != episode_number);

        if list.is_empty() {
            self.unmark_all(user, media_id)
        } else {
            self.mark_all_watched(user, media_id, &list)
        }
    }

    /// Reads the raw `videoSource` preference of a user
    pub fn preferred_source(&self, user: &UserId) -> Result<Option<String>, WatchedError> {
        Ok(self
            .store
            .read(user)?
            .and_then(|doc| doc.get(VIDEO_SOURCE_FIELD).cloned())
            .and_then(|value| value.as_str().map(str::to_string)))
    }

    /// Stores the preferred episode source of a user
    pub fn set_preferred_source(
        &self,
        user: &UserId,
        source: EpisodeSource,
    ) -> Result<(), WatchedError> {
        self.store
            .merge(user, json!({ VIDEO_SOURCE_FIELD: source.as_str() }))?;
        Ok(())
    }

    fn write_list(&self, user: &UserId, media_id: u64, list: Value) -> Result<(), WatchedError> {
        let patch = json!({ EPISODES_WATCHED_FIELD: { media_id.to_string(): list } });
        self.store.merge(user, patch)?;
        Ok(())
    }
}
