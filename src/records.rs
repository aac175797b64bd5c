//! Episode records and how they are shown
//!
//! Each source keeps its own episode shape. `EpisodeRecord` tags the shape
//! with its source and `EpisodeRecord::to_row` is the single place that turns
//! any of them into a display row.

use crate::providers::{AniWatchEpisode, GoGoAnimeEpisode, StreamingEpisode};
use crate::source::EpisodeSource;
use crate::watched::WatchedEpisode;
use serde::Serialize;

/// An episode as delivered by one of the sources
#[derive(Debug, Clone, PartialEq)]
pub enum EpisodeRecord {
    Crunchyroll(StreamingEpisode),
    GoGoAnime(GoGoAnimeEpisode),
    AniWatch(AniWatchEpisode),
}

/// Data shared by all rows of one rendered page
#[derive(Debug, Clone, Copy)]
pub struct RowContext<'a> {
    /// Media id the episodes belong to
    pub media_id: u64,
    /// Pre-supplied streaming episodes; their thumbnails are reused by
    /// sources that have none
    pub primary: &'a [StreamingEpisode],
    /// Watched list of the signed-in user, if any
    pub watched: Option<&'a [WatchedEpisode]>,
}

/// One rendered line of the episode list
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EpisodeRow {
    /// 1-based position in the full list; this is the number stored when
    /// the episode is marked as watched
    pub position: usize,
    pub source: EpisodeSource,
    /// Text shown for the episode
    pub label: String,
    /// Where the episode can be watched
    pub link: String,
    pub thumbnail: Option<String>,
    pub is_filler: bool,
    pub watched: bool,
}

impl EpisodeRecord {
    /// Source the record came from
    pub fn source(&self) -> EpisodeSource {
        match self {
            EpisodeRecord::Crunchyroll(_) => EpisodeSource::Crunchyroll,
            EpisodeRecord::GoGoAnime(_) => EpisodeSource::GoGoAnime,
            EpisodeRecord::AniWatch(_) => EpisodeSource::AniWatch,
        }
    }

    /// Title worth storing alongside a watched marker
    pub fn title(&self) -> String {
        match self {
            EpisodeRecord::Crunchyroll(e) => e.title.clone(),
            EpisodeRecord::GoGoAnime(e) => format_number(e.number),
            EpisodeRecord::AniWatch(e) => e.title.clone(),
        }
    }

    /// Renders the record at `position` (1-based) of the full list
    pub fn to_row(&self, position: usize, ctx: &RowContext<'_>) -> EpisodeRow {
        let fallback_thumbnail = || {
            position
                .checked_sub(1)
                .and_then(|index| ctx.primary.get(index))
                .and_then(|e| e.thumbnail.clone())
        };

        let (label, link, thumbnail, is_filler) = match self {
            EpisodeRecord::Crunchyroll(e) => {
                (e.title.clone(), e.url.clone(), e.thumbnail.clone(), false)
            }
            EpisodeRecord::GoGoAnime(e) => {
                let number = format_number(e.number);
                (
                    format!("Episode {number}"),
                    watch_link(ctx.media_id, EpisodeSource::GoGoAnime, &number, &e.id),
                    fallback_thumbnail(),
                    false,
                )
            }
            EpisodeRecord::AniWatch(e) => {
                let number = e.number.to_string();
                (
                    format!("{number} - {}", e.title),
                    watch_link(ctx.media_id, EpisodeSource::AniWatch, &number, &e.episode_id),
                    fallback_thumbnail(),
                    e.is_filler,
                )
            }
        };

        let watched = ctx.watched.is_some_and(|list| {
            list.iter()
                .any(|w| w.episode_number as usize == position)
        });

        EpisodeRow {
            position,
            source: self.source(),
            label,
            link,
            thumbnail,
            is_filler,
            watched,
        }
    }
}

/// Wraps provider lists into records
pub(crate) fn wrap<T>(items: Vec<T>, tag: fn(T) -> EpisodeRecord) -> Vec<EpisodeRecord> {
    items.into_iter().map(tag).collect()
}

/// Formats an episode number without a trailing ".0"
fn format_number(number: f64) -> String {
    if number.fract() == 0.0 {
        format!("{}", number as i64)
    } else {
        format!("{number}")
    }
}

/// Builds the in-app watch page link for an episode
fn watch_link(media_id: u64, source: EpisodeSource, episode: &str, query: &str) -> String {
    format!(
        "/watch/{media_id}?source={source}&episode={episode}&q={}",
        urlencoding::encode(query)
    )
}
