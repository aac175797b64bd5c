//! Episode sources and the rules for picking the active one
//!
//! Three upstream services can supply the episode list of a media entry.
//! Exactly one of them is active at a time; users may store a preferred one
//! in their profile document.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error returned when a string names no known episode source
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown episode source: {0}")]
pub struct UnknownSourceError(pub String);

/// Upstream provider of an episode list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EpisodeSource {
    /// Streaming episodes handed in with the media page (already fetched)
    Crunchyroll,
    /// Episodes looked up by title on GoGoAnime
    GoGoAnime,
    /// Episodes looked up on Aniwatch, with manual candidate selection
    AniWatch,
}

impl EpisodeSource {
    /// All sources, in the order they are offered to the user
    pub const ALL: [EpisodeSource; 3] = [
        EpisodeSource::Crunchyroll,
        EpisodeSource::GoGoAnime,
        EpisodeSource::AniWatch,
    ];

    /// Stable identifier used in profile documents and watch links
    pub fn as_str(&self) -> &'static str {
        match self {
            EpisodeSource::Crunchyroll => "crunchyroll",
            EpisodeSource::GoGoAnime => "gogoanime",
            EpisodeSource::AniWatch => "aniwatch",
        }
    }

    /// Human readable name for menus
    pub fn display_name(&self) -> &'static str {
        match self {
            EpisodeSource::Crunchyroll => "Crunchyroll",
            EpisodeSource::GoGoAnime => "GoGoAnime",
            EpisodeSource::AniWatch => "Aniwatch",
        }
    }
}

impl fmt::Display for EpisodeSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EpisodeSource {
    type Err = UnknownSourceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "crunchyroll" => Ok(EpisodeSource::Crunchyroll),
            "gogoanime" => Ok(EpisodeSource::GoGoAnime),
            "aniwatch" => Ok(EpisodeSource::AniWatch),
            _ => Err(UnknownSourceError(s.to_string())),
        }
    }
}

/// Decides which source is active when the episode list is first shown
///
/// A stored preference wins. Without one, the pre-supplied list is used
/// when it has episodes, otherwise GoGoAnime.
///
/// # Arguments
///
/// * `preference` - The `videoSource` value from the user's profile, if any
/// * `primary_len` - Number of episodes in the pre-supplied list
pub fn resolve_initial_source(preference: Option<&str>, primary_len: usize) -> EpisodeSource {
    if let Some(source) = preference.and_then(|p| p.parse::<EpisodeSource>().ok()) {
        return source;
    }

    if primary_len > 0 {
        EpisodeSource::Crunchyroll
    } else {
        EpisodeSource::GoGoAnime
    }
}
