//! Episode list orchestration
//!
//! `EpisodeBrowser` owns everything an episode list needs while it is on
//! screen: the active source and its fetch status, the fetched records, the
//! page offset, the Aniwatch candidates and a read cache of the user's
//! watched list.
//!
//! Fetches are split into [`EpisodeBrowser::begin_fetch`] and
//! [`EpisodeBrowser::complete_fetch`]. Every begin bumps a generation
//! counter and only the completion carrying the latest generation is
//! applied, so a slow response to an older request can never overwrite the
//! result of a newer one.

use crate::AniProjectError;
use crate::config::Config;
use crate::pager::{OffsetPolicy, Pager};
use crate::providers::{
    AniWatchApi, GoGoAnimeApi, MediaCandidate, MediaInfo, ProviderError, StreamingEpisode,
    best_candidate, normalize_query,
};
use crate::records::{EpisodeRecord, EpisodeRow, RowContext, wrap};
use crate::source::{EpisodeSource, resolve_initial_source};
use crate::store::{DocumentStore, UserId};
use crate::watched::{WatchedEpisode, WatchedSync, all_episodes};

/// The media entry whose episodes are browsed
#[derive(Debug, Clone, PartialEq)]
pub struct MediaContext {
    pub id: u64,
    /// Title used to query the secondary sources
    pub title: String,
    /// Media format such as "TV", used to rank Aniwatch candidates
    pub format: Option<String>,
    /// Expected episode count, used to rank Aniwatch candidates
    pub episode_count: Option<u32>,
    /// Streaming episodes supplied with the media page
    pub primary: Vec<StreamingEpisode>,
}

impl From<MediaInfo> for MediaContext {
    fn from(info: MediaInfo) -> Self {
        Self {
            id: info.id,
            title: info.title,
            format: info.format,
            episode_count: info.episode_count,
            primary: info.streaming_episodes,
        }
    }
}

/// Where the active source stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStatus {
    /// Nothing requested yet
    Idle,
    /// A fetch is in flight; rows are replaced by placeholders
    Loading,
    /// The last fetch succeeded (possibly with zero episodes)
    Loaded,
    /// The last fetch failed
    Failed,
}

/// Handle for one issued fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    pub source: EpisodeSource,
    pub generation: u64,
}

/// Result of fetching one source
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FetchedEpisodes {
    pub records: Vec<EpisodeRecord>,
    /// Aniwatch search hits; `None` leaves the current candidates untouched
    pub candidates: Option<Vec<MediaCandidate>>,
}

/// Event emitted while the browser works
///
/// These events let callers show progress or log what happened without the
/// browser printing anything itself.
#[derive(Debug, Clone, PartialEq)]
pub enum BrowserEvent {
    /// The source shown on mount was decided
    SourceResolved {
        source: EpisodeSource,
        from_preference: bool,
    },

    /// A fetch was issued
    FetchStarted {
        source: EpisodeSource,
        generation: u64,
    },

    /// A fetch result was applied
    FetchFinished {
        source: EpisodeSource,
        episode_count: usize,
    },

    /// A fetch failed
    FetchFailed {
        source: EpisodeSource,
        message: String,
    },

    /// A response arrived after a newer fetch had been issued and was dropped
    StaleResponseDiscarded {
        source: EpisodeSource,
        generation: u64,
        latest: u64,
    },

    /// A different page was selected
    PageChanged { selected: usize, offset: usize },

    /// The watched list of the media entry was written
    WatchedStateWritten { media_id: u64, watched_count: usize },
}

/// Everything needed to draw the episode list
#[derive(Debug, Clone, PartialEq)]
pub struct EpisodeListView<'a> {
    pub source: EpisodeSource,
    pub status: FetchStatus,
    /// Rows of the current page; empty while loading
    pub rows: Vec<EpisodeRow>,
    /// Number of placeholder rows to draw while loading
    pub placeholders: usize,
    pub page_count: usize,
    pub item_offset: usize,
    /// Message shown when the source has nothing for this media entry
    pub not_available: Option<String>,
    /// Aniwatch matches to pick from; only set when there is a choice
    pub candidates: Option<&'a [MediaCandidate]>,
    /// Candidate id preselected in the picker
    pub default_candidate: String,
}

type EventHandler = Box<dyn FnMut(BrowserEvent)>;

/// Episode list state for one media entry
pub struct EpisodeBrowser<G, A, S> {
    media: MediaContext,
    gogoanime: G,
    aniwatch: A,
    watched: WatchedSync<S>,
    user: Option<UserId>,
    pager: Pager,
    offset_policy: OffsetPolicy,
    source: EpisodeSource,
    status: FetchStatus,
    generation: u64,
    episodes: Vec<EpisodeRecord>,
    item_offset: usize,
    candidates: Vec<MediaCandidate>,
    watched_cache: Option<Vec<WatchedEpisode>>,
    on_event: Option<EventHandler>,
}

impl<G, A, S> EpisodeBrowser<G, A, S>
where
    G: GoGoAnimeApi,
    A: AniWatchApi,
    S: DocumentStore,
{
    /// Creates a browser; nothing is fetched until [`Self::mount`]
    ///
    /// # Arguments
    ///
    /// * `media` - The media entry and its pre-supplied streaming episodes
    /// * `gogoanime` - GoGoAnime episode lookups
    /// * `aniwatch` - Aniwatch search and episode lookups
    /// * `store` - Document store holding user profiles
    /// * `user` - The signed-in user, if any
    /// * `config` - Page size and offset policy
    pub fn new(
        media: MediaContext,
        gogoanime: G,
        aniwatch: A,
        store: S,
        user: Option<UserId>,
        config: &Config,
    ) -> Self {
        Self {
            media,
            gogoanime,
            aniwatch,
            watched: WatchedSync::new(store),
            user,
            pager: Pager::new(config.page_size),
            offset_policy: config.offset_policy,
            source: EpisodeSource::Crunchyroll,
            status: FetchStatus::Idle,
            generation: 0,
            episodes: Vec::new(),
            item_offset: 0,
            candidates: Vec::new(),
            watched_cache: None,
            on_event: None,
        }
    }

    /// Registers a callback receiving every [`BrowserEvent`]
    pub fn with_event_handler<F>(mut self, handler: F) -> Self
    where
        F: FnMut(BrowserEvent) + 'static,
    {
        self.on_event = Some(Box::new(handler));
        self
    }

    pub fn media(&self) -> &MediaContext {
        &self.media
    }

    pub fn user(&self) -> Option<&UserId> {
        self.user.as_ref()
    }

    pub fn source(&self) -> EpisodeSource {
        self.source
    }

    pub fn status(&self) -> FetchStatus {
        self.status
    }

    pub fn is_loading(&self) -> bool {
        self.status == FetchStatus::Loading
    }

    /// Full episode list of the active source
    pub fn episodes(&self) -> &[EpisodeRecord] {
        &self.episodes
    }

    pub fn item_offset(&self) -> usize {
        self.item_offset
    }

    pub fn page_size(&self) -> usize {
        self.pager.page_size()
    }

    /// Aniwatch search hits from the last Aniwatch fetch
    pub fn candidates(&self) -> &[MediaCandidate] {
        &self.candidates
    }

    /// Watched list as last read from the store
    pub fn watched(&self) -> Option<&[WatchedEpisode]> {
        self.watched_cache.as_deref()
    }

    pub fn watched_sync(&self) -> &WatchedSync<S> {
        &self.watched
    }

    /// Decides the initial source and loads it
    ///
    /// A signed-in user's stored preference wins. A failing profile lookup
    /// is treated like a missing preference.
    pub fn mount(&mut self) -> Result<(), AniProjectError> {
        let preference = match &self.user {
            Some(user) => match self.watched.preferred_source(user) {
                Ok(preference) => preference,
                Err(e) => {
                    tracing::warn!(user = %user, error = %e, "profile lookup failed, using default source");
                    None
                }
            },
            None => None,
        };

        let source = resolve_initial_source(preference.as_deref(), self.media.primary.len());
        let from_preference = preference
            .as_deref()
            .is_some_and(|p| p.parse::<EpisodeSource>().ok() == Some(source));

        self.emit(BrowserEvent::SourceResolved {
            source,
            from_preference,
        });

        self.select_source(source)?;
        Ok(())
    }

    /// Switches to `source` and loads its episodes
    ///
    /// Returns `false` without fetching when `source` is already active and
    /// loaded.
    pub fn select_source(&mut self, source: EpisodeSource) -> Result<bool, AniProjectError> {
        if source == self.source && self.status == FetchStatus::Loaded {
            return Ok(false);
        }

        let ticket = self.begin_fetch(source);
        let result = self.fetch(source);
        self.complete_fetch(ticket, result)?;
        self.reload_watched();

        Ok(true)
    }

    /// Loads the episodes of the Aniwatch entry the user picked
    pub fn select_candidate(&mut self, candidate_id: &str) -> Result<(), AniProjectError> {
        let ticket = self.begin_fetch(EpisodeSource::AniWatch);

        let result = self
            .aniwatch
            .episodes_by_id(candidate_id)
            .map(|episodes| FetchedEpisodes {
                records: wrap(episodes.unwrap_or_default(), EpisodeRecord::AniWatch),
                candidates: None,
            });

        self.complete_fetch(ticket, result)?;
        self.reload_watched();
        Ok(())
    }

    /// Marks `source` active and issues a new fetch generation
    ///
    /// Use together with [`Self::complete_fetch`] when the fetch itself runs
    /// elsewhere, for example on a worker thread.
    pub fn begin_fetch(&mut self, source: EpisodeSource) -> FetchTicket {
        if source != self.source {
            self.candidates.clear();
            if self.offset_policy == OffsetPolicy::ResetOnSourceChange {
                self.item_offset = 0;
            }
        }

        self.source = source;
        self.status = FetchStatus::Loading;
        self.generation += 1;

        tracing::debug!(%source, generation = self.generation, "fetch started");
        self.emit(BrowserEvent::FetchStarted {
            source,
            generation: self.generation,
        });

        FetchTicket {
            source,
            generation: self.generation,
        }
    }

    /// Applies the result of a fetch issued by [`Self::begin_fetch`]
    ///
    /// Returns `Ok(false)` when a newer fetch has been issued since; the
    /// result is then dropped. Provider errors of the current fetch put the
    /// browser into [`FetchStatus::Failed`] and are returned.
    pub fn complete_fetch(
        &mut self,
        ticket: FetchTicket,
        result: Result<FetchedEpisodes, ProviderError>,
    ) -> Result<bool, AniProjectError> {
        if ticket.generation != self.generation {
            tracing::debug!(
                source = %ticket.source,
                generation = ticket.generation,
                latest = self.generation,
                "discarding stale response"
            );
            self.emit(BrowserEvent::StaleResponseDiscarded {
                source: ticket.source,
                generation: ticket.generation,
                latest: self.generation,
            });
            return Ok(false);
        }

        match result {
            Ok(fetched) => {
                self.episodes = fetched.records;
                if let Some(candidates) = fetched.candidates {
                    self.candidates = candidates;
                }
                self.status = FetchStatus::Loaded;

                self.emit(BrowserEvent::FetchFinished {
                    source: ticket.source,
                    episode_count: self.episodes.len(),
                });
                Ok(true)
            }
            Err(e) => {
                self.episodes.clear();
                self.status = FetchStatus::Failed;

                self.emit(BrowserEvent::FetchFailed {
                    source: ticket.source,
                    message: e.to_string(),
                });
                Err(e.into())
            }
        }
    }

    /// Fetches the episode list of `source` without touching any state
    pub fn fetch(&self, source: EpisodeSource) -> Result<FetchedEpisodes, ProviderError> {
        let query = normalize_query(&self.media.title);

        match source {
            EpisodeSource::Crunchyroll => Ok(FetchedEpisodes {
                records: wrap(self.media.primary.clone(), EpisodeRecord::Crunchyroll),
                candidates: None,
            }),
            EpisodeSource::GoGoAnime => {
                let episodes = self.gogoanime.fetch_episodes(&query)?.unwrap_or_default();
                Ok(FetchedEpisodes {
                    records: wrap(episodes, EpisodeRecord::GoGoAnime),
                    candidates: None,
                })
            }
            EpisodeSource::AniWatch => {
                let candidates = self.aniwatch.search(&query)?;

                let episodes = match best_candidate(
                    &candidates,
                    self.media.format.as_deref(),
                    self.episode_count_hint(),
                ) {
                    Some(best) => self.aniwatch.episodes_by_id(&best.id)?.unwrap_or_default(),
                    None => Vec::new(),
                };

                Ok(FetchedEpisodes {
                    records: wrap(episodes, EpisodeRecord::AniWatch),
                    candidates: Some(candidates),
                })
            }
        }
    }

    /// Moves to the page the pagination control selected
    pub fn change_page(&mut self, selected: usize) -> Result<(), AniProjectError> {
        self.item_offset = self.pager.offset_for_page(selected, self.episodes.len());

        self.emit(BrowserEvent::PageChanged {
            selected,
            offset: self.item_offset,
        });

        self.reload_watched();
        Ok(())
    }

    /// Re-reads the watched list of the signed-in user
    pub fn refresh_watched(&mut self) -> Result<(), AniProjectError> {
        self.watched_cache = self.watched.get_watched(self.user.as_ref(), self.media.id)?;
        Ok(())
    }

    /// Re-reads the watched list after a fetch or page change
    ///
    /// A failing read only drops the watched markers.
    fn reload_watched(&mut self) {
        if let Err(e) = self.refresh_watched() {
            tracing::warn!(media_id = self.media.id, error = %e, "watched lookup failed, showing episodes unmarked");
            self.watched_cache = None;
        }
    }

    /// Whether every episode of the active list is marked as watched
    pub fn all_episodes_watched(&self) -> Result<bool, AniProjectError> {
        match &self.user {
            Some(user) => Ok(self
                .watched
                .all_watched(user, self.media.id, self.episodes.len())?),
            None => Ok(false),
        }
    }

    /// Marks every episode watched, or clears the list if all already are
    ///
    /// Returns the new state, or `None` when no user is signed in.
    pub fn toggle_all_watched(&mut self) -> Result<Option<bool>, AniProjectError> {
        let Some(user) = self.user.clone() else {
            return Ok(None);
        };

        let titles = self.episode_titles();
        let all_watched = self.watched.toggle_all_watched(&user, self.media.id, &titles)?;
        self.after_watched_write()?;

        Ok(Some(all_watched))
    }

    /// Marks every episode of the active list as watched
    ///
    /// Returns `false` without writing when no user is signed in or the
    /// active list is empty.
    pub fn mark_all_watched(&mut self) -> Result<bool, AniProjectError> {
        let Some(user) = self.user.clone() else {
            return Ok(false);
        };

        if self.episodes.is_empty() {
            return Ok(false);
        }

        let episodes = all_episodes(self.media.id, &self.episode_titles());
        self.watched.mark_all_watched(&user, self.media.id, &episodes)?;
        self.after_watched_write()?;
        Ok(true)
    }

    /// Clears the watched list of the media entry
    pub fn unmark_all(&mut self) -> Result<bool, AniProjectError> {
        let Some(user) = self.user.clone() else {
            return Ok(false);
        };

        self.watched.unmark_all(&user, self.media.id)?;
        self.after_watched_write()?;
        Ok(true)
    }

    /// Toggles the watched marker of the episode at `position` (1-based)
    ///
    /// Returns the new state, or `None` when no user is signed in or the
    /// position is outside the active list.
    pub fn toggle_episode(&mut self, position: usize) -> Result<Option<bool>, AniProjectError> {
        let Some(user) = self.user.clone() else {
            return Ok(None);
        };

        let Some(record) = position
            .checked_sub(1)
            .and_then(|index| self.episodes.get(index))
        else {
            return Ok(None);
        };

        let episode_number = position as u32;
        let is_watched = self
            .watched_cache
            .as_deref()
            .is_some_and(|list| list.iter().any(|w| w.episode_number == episode_number));

        if is_watched {
            self.watched.unmark_episode(&user, self.media.id, episode_number)?;
        } else {
            let episode = WatchedEpisode {
                media_id: self.media.id,
                episode_number,
                episode_title: record.title(),
            };
            self.watched.mark_episode_watched(&user, episode)?;
        }

        self.after_watched_write()?;
        Ok(Some(!is_watched))
    }

    /// Stores `source` as the signed-in user's preferred source
    pub fn set_preferred_source(&self, source: EpisodeSource) -> Result<bool, AniProjectError> {
        let Some(user) = &self.user else {
            return Ok(false);
        };

        self.watched.set_preferred_source(user, source)?;
        Ok(true)
    }

    /// Builds the view of the current page
    pub fn view(&self) -> EpisodeListView<'_> {
        let page = self.pager.page(&self.episodes, self.item_offset);
        let loading = self.is_loading();

        let ctx = RowContext {
            media_id: self.media.id,
            primary: &self.media.primary,
            watched: self.watched_cache.as_deref(),
        };

        let rows = if loading {
            Vec::new()
        } else {
            page.items
                .iter()
                .enumerate()
                .map(|(key, record)| record.to_row(self.item_offset + key + 1, &ctx))
                .collect()
        };

        let finished = matches!(self.status, FetchStatus::Loaded | FetchStatus::Failed);
        let not_available = (finished && self.episodes.is_empty())
            .then(|| format!("Not available on {}", self.source));

        let candidates = (self.source == EpisodeSource::AniWatch && self.candidates.len() > 1)
            .then_some(self.candidates.as_slice());

        EpisodeListView {
            source: self.source,
            status: self.status,
            rows,
            placeholders: if loading { self.pager.page_size() } else { 0 },
            page_count: page.page_count,
            item_offset: self.item_offset,
            not_available,
            candidates,
            default_candidate: normalize_query(&self.media.title),
        }
    }

    fn episode_count_hint(&self) -> Option<u32> {
        self.media.episode_count.or_else(|| {
            let len = self.media.primary.len();
            (len > 0).then_some(len as u32)
        })
    }

    fn episode_titles(&self) -> Vec<String> {
        self.episodes.iter().map(EpisodeRecord::title).collect()
    }

    fn after_watched_write(&mut self) -> Result<(), AniProjectError> {
        self.refresh_watched()?;
        let watched_count = self.watched_cache.as_ref().map_or(0, Vec::len);
        self.emit(BrowserEvent::WatchedStateWritten {
            media_id: self.media.id,
            watched_count,
        });
        Ok(())
    }

    fn emit(&mut self, event: BrowserEvent) {
        if let Some(handler) = self.on_event.as_mut() {
            handler(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{AniWatchEpisode, GoGoAnimeEpisode};
    use crate::store::{MemoryStore, StoreError};
    use serde_json::{Value, json};
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;
    use std::sync::Arc;

    #[derive(Default)]
    struct FakeGoGo {
        episodes: Option<Vec<GoGoAnimeEpisode>>,
        calls: Cell<usize>,
        fail: bool,
    }

    impl GoGoAnimeApi for FakeGoGo {
        fn fetch_episodes(
            &self,
            _query: &str,
        ) -> Result<Option<Vec<GoGoAnimeEpisode>>, ProviderError> {
            self.calls.set(self.calls.get() + 1);
            if self.fail {
                return Err(ProviderError::RequestError("HTTP 502 Bad Gateway".to_string()));
            }
            Ok(self.episodes.clone())
        }
    }

    #[derive(Default)]
    struct FakeAniWatch {
        candidates: Vec<MediaCandidate>,
        episodes: Vec<(String, Vec<AniWatchEpisode>)>,
        searched: RefCell<Vec<String>>,
    }

    impl AniWatchApi for FakeAniWatch {
        fn search(&self, query: &str) -> Result<Vec<MediaCandidate>, ProviderError> {
            self.searched.borrow_mut().push(query.to_string());
            Ok(self.candidates.clone())
        }

        fn episodes_by_id(&self, id: &str) -> Result<Option<Vec<AniWatchEpisode>>, ProviderError> {
            Ok(self
                .episodes
                .iter()
                .find(|(candidate, _)| candidate == id)
                .map(|(_, episodes)| episodes.clone()))
        }
    }

    struct FailingStore;

    impl DocumentStore for FailingStore {
        fn read(&self, _user: &UserId) -> Result<Option<Value>, StoreError> {
            Err(StoreError::DataDirectoryNotFound)
        }

        fn merge(&self, _user: &UserId, _patch: Value) -> Result<(), StoreError> {
            Err(StoreError::DataDirectoryNotFound)
        }
    }

    fn streaming(count: usize) -> Vec<StreamingEpisode> {
        (1..=count)
            .map(|n| StreamingEpisode {
                title: format!("Episode {n}"),
                thumbnail: None,
                url: format!("https://www.crunchyroll.com/watch/{n}"),
                site: "Crunchyroll".to_string(),
            })
            .collect()
    }

    fn gogo(count: usize) -> Vec<GoGoAnimeEpisode> {
        (1..=count)
            .map(|n| GoGoAnimeEpisode {
                id: format!("show-episode-{n}"),
                number: n as f64,
                url: None,
            })
            .collect()
    }

    fn aniwatch_episodes(count: usize) -> Vec<AniWatchEpisode> {
        (1..=count as u32)
            .map(|n| AniWatchEpisode {
                episode_id: format!("show-1?ep={n}"),
                number: n,
                title: format!("Title {n}"),
                is_filler: false,
            })
            .collect()
    }

    fn candidate(id: &str, sub: u32) -> MediaCandidate {
        MediaCandidate {
            id: id.to_string(),
            name: id.to_string(),
            format: Some("TV".to_string()),
            sub_episodes: Some(sub),
        }
    }

    fn media(primary: usize) -> MediaContext {
        MediaContext {
            id: 100,
            title: "Show: The Series!".to_string(),
            format: Some("TV".to_string()),
            episode_count: Some(12),
            primary: streaming(primary),
        }
    }

    fn config(policy: OffsetPolicy) -> Config {
        Config {
            offset_policy: policy,
            ..Config::default()
        }
    }

    type TestBrowser = EpisodeBrowser<FakeGoGo, FakeAniWatch, Arc<MemoryStore>>;

    fn browser(primary: usize, gogo_episodes: Option<Vec<GoGoAnimeEpisode>>) -> TestBrowser {
        EpisodeBrowser::new(
            media(primary),
            FakeGoGo {
                episodes: gogo_episodes,
                ..FakeGoGo::default()
            },
            FakeAniWatch::default(),
            Arc::new(MemoryStore::new()),
            None,
            &config(OffsetPolicy::ResetOnSourceChange),
        )
    }

    #[test]
    fn test_mount_without_user_uses_primary() {
        let mut b = browser(45, None);
        b.mount().unwrap();

        assert_eq!(b.source(), EpisodeSource::Crunchyroll);
        assert_eq!(b.status(), FetchStatus::Loaded);

        let view = b.view();
        assert_eq!(view.page_count, 3);
        assert_eq!(view.rows.len(), 20);
        assert_eq!(view.rows[0].position, 1);
        assert_eq!(view.not_available, None);
    }

    #[test]
    fn test_mount_without_primary_falls_back_to_gogoanime() {
        let mut b = browser(0, Some(gogo(5)));
        b.mount().unwrap();

        assert_eq!(b.source(), EpisodeSource::GoGoAnime);
        assert_eq!(b.episodes().len(), 5);
        assert_eq!(b.gogoanime.calls.get(), 1);
    }

    #[test]
    fn test_mount_uses_stored_preference() {
        let user = UserId::new("u1");
        let store = Arc::new(MemoryStore::with_document(
            user.clone(),
            json!({ "videoSource": "GoGoAnime" }),
        ));

        let mut b = EpisodeBrowser::new(
            media(10),
            FakeGoGo {
                episodes: Some(gogo(3)),
                ..FakeGoGo::default()
            },
            FakeAniWatch::default(),
            store,
            Some(user),
            &Config::default(),
        );

        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        b = b.with_event_handler(move |event| sink.borrow_mut().push(event));

        b.mount().unwrap();

        assert_eq!(b.source(), EpisodeSource::GoGoAnime);
        assert_eq!(
            events.borrow()[0],
            BrowserEvent::SourceResolved {
                source: EpisodeSource::GoGoAnime,
                from_preference: true,
            }
        );
    }

    #[test]
    fn test_profile_lookup_failure_falls_back_silently() {
        let mut b = EpisodeBrowser::new(
            media(4),
            FakeGoGo::default(),
            FakeAniWatch::default(),
            FailingStore,
            Some(UserId::new("u1")),
            &Config::default(),
        );

        b.mount().unwrap();
        assert_eq!(b.source(), EpisodeSource::Crunchyroll);
        assert_eq!(b.status(), FetchStatus::Loaded);
        assert_eq!(b.episodes().len(), 4);
    }

    #[test]
    fn test_failing_watched_read_only_drops_markers() {
        let mut b = EpisodeBrowser::new(
            media(25),
            FakeGoGo {
                episodes: Some(gogo(3)),
                ..FakeGoGo::default()
            },
            FakeAniWatch::default(),
            FailingStore,
            Some(UserId::new("u1")),
            &Config::default(),
        );

        b.mount().unwrap();
        assert_eq!(b.watched(), None);
        assert!(b.view().rows.iter().all(|row| !row.watched));

        b.change_page(1).unwrap();
        assert_eq!(b.view().rows.len(), 5);

        assert!(b.select_source(EpisodeSource::GoGoAnime).unwrap());
        assert_eq!(b.status(), FetchStatus::Loaded);

        // explicit reads and writes still report the failure
        assert!(b.refresh_watched().is_err());
        assert!(b.mark_all_watched().is_err());
    }

    #[test]
    fn test_selecting_active_loaded_source_is_noop() {
        let mut b = browser(0, Some(gogo(5)));
        b.mount().unwrap();
        assert_eq!(b.gogoanime.calls.get(), 1);

        assert!(!b.select_source(EpisodeSource::GoGoAnime).unwrap());
        assert_eq!(b.gogoanime.calls.get(), 1);
    }

    #[test]
    fn test_loaded_but_empty_source_is_not_refetched() {
        let mut b = browser(0, None);
        b.mount().unwrap();
        assert_eq!(b.status(), FetchStatus::Loaded);
        assert!(b.episodes().is_empty());

        assert!(!b.select_source(EpisodeSource::GoGoAnime).unwrap());
        assert_eq!(b.gogoanime.calls.get(), 1);
    }

    #[test]
    fn test_gogoanime_null_means_empty_and_not_loading() {
        let mut b = browser(3, None);
        b.mount().unwrap();

        assert!(b.select_source(EpisodeSource::GoGoAnime).unwrap());
        assert!(b.episodes().is_empty());
        assert!(!b.is_loading());

        let view = b.view();
        assert!(view.rows.is_empty());
        assert_eq!(view.page_count, 0);
        assert_eq!(view.not_available.as_deref(), Some("Not available on gogoanime"));
    }

    #[test]
    fn test_provider_failure_sets_failed_status() {
        let mut b = EpisodeBrowser::new(
            media(3),
            FakeGoGo {
                fail: true,
                ..FakeGoGo::default()
            },
            FakeAniWatch::default(),
            MemoryStore::new(),
            None,
            &Config::default(),
        );
        b.mount().unwrap();

        let err = b.select_source(EpisodeSource::GoGoAnime).unwrap_err();
        assert!(matches!(err, AniProjectError::Provider(_)));
        assert_eq!(b.status(), FetchStatus::Failed);
        assert!(b.episodes().is_empty());

        // a failed source is fetched again when re-selected
        assert!(b.select_source(EpisodeSource::GoGoAnime).is_err());
        assert_eq!(b.gogoanime.calls.get(), 2);
    }

    #[test]
    fn test_paging_through_forty_five_episodes() {
        let mut b = browser(45, None);
        b.mount().unwrap();

        b.change_page(2).unwrap();
        let view = b.view();
        assert_eq!(view.item_offset, 40);
        assert_eq!(view.rows.len(), 5);
        assert_eq!(view.rows[0].position, 41);
        assert_eq!(view.rows[4].position, 45);
    }

    #[test]
    fn test_preserved_offset_yields_empty_page_on_shorter_source() {
        let mut b = EpisodeBrowser::new(
            media(45),
            FakeGoGo {
                episodes: Some(gogo(10)),
                ..FakeGoGo::default()
            },
            FakeAniWatch::default(),
            MemoryStore::new(),
            None,
            &config(OffsetPolicy::Preserve),
        );
        b.mount().unwrap();
        b.change_page(2).unwrap();

        b.select_source(EpisodeSource::GoGoAnime).unwrap();

        let view = b.view();
        assert_eq!(view.item_offset, 40);
        assert!(view.rows.is_empty());
        assert_eq!(view.page_count, 1);
        assert_eq!(view.not_available, None);
    }

    #[test]
    fn test_offset_resets_on_source_change_by_default() {
        let mut b = browser(45, Some(gogo(10)));
        b.mount().unwrap();
        b.change_page(2).unwrap();

        b.select_source(EpisodeSource::GoGoAnime).unwrap();

        let view = b.view();
        assert_eq!(view.item_offset, 0);
        assert_eq!(view.rows.len(), 10);
    }

    #[test]
    fn test_stale_response_is_discarded_when_newer_fetch_was_issued() {
        let mut b = browser(3, None);
        b.mount().unwrap();

        let gogo_ticket = b.begin_fetch(EpisodeSource::GoGoAnime);
        let aniwatch_ticket = b.begin_fetch(EpisodeSource::AniWatch);

        let aniwatch_result = Ok(FetchedEpisodes {
            records: wrap(aniwatch_episodes(2), EpisodeRecord::AniWatch),
            candidates: Some(vec![candidate("show-1", 2)]),
        });
        let gogo_result = Ok(FetchedEpisodes {
            records: wrap(gogo(7), EpisodeRecord::GoGoAnime),
            candidates: None,
        });

        // Aniwatch answers first, GoGoAnime last. Applying responses in
        // arrival order would leave the GoGoAnime list on screen.
        assert!(b.complete_fetch(aniwatch_ticket, aniwatch_result).unwrap());
        assert!(!b.complete_fetch(gogo_ticket, gogo_result).unwrap());

        assert_eq!(b.source(), EpisodeSource::AniWatch);
        assert_eq!(b.episodes().len(), 2);
        assert!(
            b.episodes()
                .iter()
                .all(|r| r.source() == EpisodeSource::AniWatch)
        );
        assert_eq!(b.status(), FetchStatus::Loaded);
    }

    #[test]
    fn test_stale_failure_does_not_fail_current_fetch() {
        let mut b = browser(3, None);
        let old = b.begin_fetch(EpisodeSource::GoGoAnime);
        let current = b.begin_fetch(EpisodeSource::Crunchyroll);

        let stale = b.complete_fetch(old, Err(ProviderError::RequestError("timeout".to_string())));
        assert!(!stale.unwrap());
        assert_eq!(b.status(), FetchStatus::Loading);

        let fetched = b.fetch(EpisodeSource::Crunchyroll);
        assert!(b.complete_fetch(current, fetched).unwrap());
        assert_eq!(b.episodes().len(), 3);
    }

    #[test]
    fn test_loading_view_shows_placeholders() {
        let mut b = browser(45, None);
        b.mount().unwrap();
        b.begin_fetch(EpisodeSource::GoGoAnime);

        let view = b.view();
        assert_eq!(view.status, FetchStatus::Loading);
        assert!(view.rows.is_empty());
        assert_eq!(view.placeholders, 20);
        assert_eq!(view.not_available, None);
    }

    #[test]
    fn test_aniwatch_candidates_and_manual_selection() {
        let aniwatch = FakeAniWatch {
            candidates: vec![candidate("show-movie", 1), candidate("show-1", 12)],
            episodes: vec![
                ("show-1".to_string(), aniwatch_episodes(12)),
                ("show-movie".to_string(), aniwatch_episodes(1)),
            ],
            ..FakeAniWatch::default()
        };
        let mut b = EpisodeBrowser::new(
            media(0),
            FakeGoGo::default(),
            aniwatch,
            MemoryStore::new(),
            None,
            &Config::default(),
        );

        b.select_source(EpisodeSource::AniWatch).unwrap();
        assert_eq!(b.aniwatch.searched.borrow().as_slice(), ["show the series"]);
        assert_eq!(b.episodes().len(), 12);

        let view = b.view();
        assert_eq!(view.candidates.map(<[_]>::len), Some(2));
        assert_eq!(view.default_candidate, "show the series");

        b.select_candidate("show-movie").unwrap();
        assert_eq!(b.episodes().len(), 1);
        assert_eq!(b.candidates().len(), 2);

        b.select_source(EpisodeSource::Crunchyroll).unwrap();
        assert!(b.view().candidates.is_none());
        assert!(b.candidates().is_empty());
    }

    #[test]
    fn test_watched_decorations_and_mark_all_round_trip() {
        let user = UserId::new("u1");
        let store = Arc::new(MemoryStore::new());
        let mut b = EpisodeBrowser::new(
            media(3),
            FakeGoGo::default(),
            FakeAniWatch::default(),
            Arc::clone(&store),
            Some(user.clone()),
            &Config::default(),
        );
        b.mount().unwrap();
        assert_eq!(b.watched(), None);
        assert!(!b.all_episodes_watched().unwrap());

        assert!(b.mark_all_watched().unwrap());
        assert!(b.view().rows.iter().all(|row| row.watched));
        assert!(b.all_episodes_watched().unwrap());

        assert!(b.unmark_all().unwrap());
        assert_eq!(b.watched(), None);
        assert!(b.view().rows.iter().all(|row| !row.watched));

        assert_eq!(b.toggle_all_watched().unwrap(), Some(true));
        assert_eq!(b.toggle_all_watched().unwrap(), Some(false));

        let stored = store.read(&user).unwrap().unwrap();
        assert_eq!(stored["episodesWatched"]["100"], Value::Null);
    }

    #[test]
    fn test_mark_all_on_empty_list_writes_nothing() {
        let user = UserId::new("u1");
        let store = Arc::new(MemoryStore::new());
        let mut b = EpisodeBrowser::new(
            media(0),
            FakeGoGo::default(),
            FakeAniWatch::default(),
            Arc::clone(&store),
            Some(user.clone()),
            &Config::default(),
        );
        b.mount().unwrap();
        assert!(b.episodes().is_empty());

        assert!(!b.mark_all_watched().unwrap());
        assert_eq!(store.read(&user).unwrap(), None);
        assert!(!b.all_episodes_watched().unwrap());
    }

    #[test]
    fn test_toggle_single_episode() {
        let user = UserId::new("u1");
        let mut b = EpisodeBrowser::new(
            media(3),
            FakeGoGo::default(),
            FakeAniWatch::default(),
            MemoryStore::new(),
            Some(user),
            &Config::default(),
        );
        b.mount().unwrap();

        assert_eq!(b.toggle_episode(2).unwrap(), Some(true));
        let rows = b.view().rows;
        assert!(!rows[0].watched);
        assert!(rows[1].watched);

        assert_eq!(b.toggle_episode(2).unwrap(), Some(false));
        assert_eq!(b.toggle_episode(0).unwrap(), None);
        assert_eq!(b.toggle_episode(4).unwrap(), None);
    }

    #[test]
    fn test_watched_actions_without_user() {
        let mut b = browser(3, None);
        b.mount().unwrap();

        assert!(!b.mark_all_watched().unwrap());
        assert_eq!(b.toggle_all_watched().unwrap(), None);
        assert!(!b.set_preferred_source(EpisodeSource::AniWatch).unwrap());
    }

    #[test]
    fn test_set_preferred_source() {
        let user = UserId::new("u1");
        let store = Arc::new(MemoryStore::new());
        let b = EpisodeBrowser::new(
            media(3),
            FakeGoGo::default(),
            FakeAniWatch::default(),
            Arc::clone(&store),
            Some(user.clone()),
            &Config::default(),
        );

        assert!(b.set_preferred_source(EpisodeSource::AniWatch).unwrap());
        assert_eq!(
            store.read(&user).unwrap(),
            Some(json!({ "videoSource": "aniwatch" }))
        );
    }
}
