//! aniproject - Browse anime episode lists from several sources
//!
//! This library pulls episode lists from Crunchyroll (as listed on AniList),
//! GoGoAnime and Aniwatch, pages through them and keeps track of which
//! episodes a user has watched.
//!
//! The entry point is [`EpisodeBrowser`]. It decides which source to show,
//! fetches it, slices the current page and decorates rows with the user's
//! watched markers.
//!
//! # Examples
//!
//! ```no_run
//! use aniproject::{
//!     AniListClient, AniWatchClient, BrowserEvent, Config, EpisodeBrowser, GoGoAnimeClient,
//!     JsonFileStore, UserId,
//! };
//!
//! let config = Config::default();
//! let anilist = AniListClient::new(&config.anilist_url, config.http_timeout).unwrap();
//! let media = anilist.fetch_media(154587).unwrap();
//!
//! let mut browser = EpisodeBrowser::new(
//!     media.into(),
//!     GoGoAnimeClient::new(&config.consumet_url, config.http_timeout).unwrap(),
//!     AniWatchClient::new(&config.aniwatch_url, config.http_timeout).unwrap(),
//!     JsonFileStore::open_default().unwrap(),
//!     Some(UserId::new("me")),
//!     &config,
//! )
//! .with_event_handler(|event| {
//!     if let BrowserEvent::FetchFinished { source, episode_count } = event {
//!         println!("{source}: {episode_count} episodes");
//!     }
//! });
//!
//! browser.mount().unwrap();
//! for row in browser.view().rows {
//!     println!("{:>3} {}", row.position, row.label);
//! }
//! ```

mod browser;
mod config;
mod pager;
mod providers;
mod records;
mod source;
mod store;
mod watched;

use thiserror::Error;

pub use browser::{
    BrowserEvent, EpisodeBrowser, EpisodeListView, FetchStatus, FetchTicket, FetchedEpisodes,
    MediaContext,
};
pub use config::{Config, DEFAULT_ANILIST_URL, DEFAULT_ANIWATCH_URL, DEFAULT_CONSUMET_URL};
pub use pager::{DEFAULT_PAGE_SIZE, OffsetPolicy, Page, Pager};
pub use providers::{
    AniListClient, AniWatchApi, AniWatchClient, AniWatchEpisode, GoGoAnimeApi, GoGoAnimeClient,
    GoGoAnimeEpisode, MediaCandidate, MediaInfo, StreamingEpisode, best_candidate,
    normalize_query,
};
pub use records::{EpisodeRecord, EpisodeRow, RowContext};
pub use source::{EpisodeSource, resolve_initial_source};
pub use store::{DocumentStore, JsonFileStore, MemoryStore, UserId, merge_document};
pub use watched::{
    EPISODES_WATCHED_FIELD, VIDEO_SOURCE_FIELD, WatchedEpisode, WatchedSync, all_episodes,
};

// Re-export error types
pub use providers::ProviderError;
pub use source::UnknownSourceError;
pub use store::StoreError;
pub use watched::WatchedError;

/// Top-level error type for aniproject operations
#[derive(Debug, Error)]
pub enum AniProjectError {
    /// Error while talking to an episode source
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Error in the document store
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Error while reading or writing watched state
    #[error("Watched state error: {0}")]
    Watched(#[from] WatchedError),
}
