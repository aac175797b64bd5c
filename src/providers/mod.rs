//! Upstream episode providers
//!
//! This module holds the episode shapes returned by each upstream service,
//! the traits the episode browser talks to, and the HTTP clients that
//! implement them.
mod anilist;
mod aniwatch;
mod gogoanime;
mod wire_types;

pub use anilist::{AniListClient, MediaInfo};
pub use aniwatch::AniWatchClient;
pub use gogoanime::GoGoAnimeClient;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while talking to an episode provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Request to the provider failed
    #[error("Request failed: {0}")]
    RequestError(String),

    /// Failed to parse the provider's JSON response
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// The requested media does not exist upstream
    #[error("Media not found: {0}")]
    MediaNotFound(String),

    /// The API returned invalid or unexpected data
    #[error("API returned invalid data: {0}")]
    InvalidData(String),
}

/// A streaming episode handed in with the media page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamingEpisode {
    /// Episode title as published by the streaming site
    pub title: String,
    /// Thumbnail image, if the site provides one
    pub thumbnail: Option<String>,
    /// Link to the episode on the streaming site
    pub url: String,
    /// Name of the streaming site
    pub site: String,
}

/// An episode as listed by GoGoAnime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoGoAnimeEpisode {
    /// Episode slug used to request the stream
    pub id: String,
    /// Episode number, fractional for recap or half episodes
    pub number: f64,
    /// Episode page on GoGoAnime
    pub url: Option<String>,
}

/// An episode as listed by Aniwatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AniWatchEpisode {
    /// Episode identifier used to request the stream
    pub episode_id: String,
    pub number: u32,
    pub title: String,
    pub is_filler: bool,
}

/// A search hit from Aniwatch that may be the media being browsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaCandidate {
    /// Aniwatch media slug
    pub id: String,
    /// Display name
    pub name: String,
    /// Media format such as "TV" or "Movie"
    pub format: Option<String>,
    /// Number of subbed episodes available
    pub sub_episodes: Option<u32>,
}

/// Episode lookups on GoGoAnime.
pub trait GoGoAnimeApi {
    /// Fetches the episode list for a title.
    ///
    /// Returns `Ok(None)` when GoGoAnime has nothing for the query.
    fn fetch_episodes(&self, query: &str) -> Result<Option<Vec<GoGoAnimeEpisode>>, ProviderError>;
}

/// Search and episode lookups on Aniwatch.
pub trait AniWatchApi {
    /// Searches for media matching the query.
    fn search(&self, query: &str) -> Result<Vec<MediaCandidate>, ProviderError>;

    /// Fetches the episode list of one media entry by its Aniwatch id.
    ///
    /// Returns `Ok(None)` when the id is unknown.
    fn episodes_by_id(&self, id: &str) -> Result<Option<Vec<AniWatchEpisode>>, ProviderError>;
}

/// Normalizes a media title into a search query
///
/// Lowercases the title, drops everything that is not an ASCII letter,
/// digit or whitespace, and collapses runs of whitespace.
pub fn normalize_query(title: &str) -> String {
    let kept: String = title
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || c.is_whitespace())
        .collect();

    kept.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Picks the search hit most likely to be the media being browsed
///
/// Preference order: same format and same episode count, then same format,
/// then the first hit.
pub fn best_candidate<'a>(
    candidates: &'a [MediaCandidate],
    format: Option<&str>,
    episode_count_hint: Option<u32>,
) -> Option<&'a MediaCandidate> {
    let same_format = |candidate: &&MediaCandidate| match (format, candidate.format.as_deref()) {
        (Some(wanted), Some(found)) => wanted.eq_ignore_ascii_case(found),
        _ => false,
    };

    if let Some(hint) = episode_count_hint {
        if let Some(candidate) = candidates
            .iter()
            .filter(same_format)
            .find(|c| c.sub_episodes == Some(hint))
        {
            return Some(candidate);
        }
    }

    candidates
        .iter()
        .find(same_format)
        .or_else(|| candidates.first())
}

/// Strips markup and entities that upstream services leave in text fields
pub(crate) fn clean_text(raw: &str) -> String {
    nanohtml2text::html2text(raw).trim().to_string()
}

/// Builds the blocking HTTP client shared by the provider implementations
pub(crate) fn build_http_client(
    timeout: std::time::Duration,
) -> Result<reqwest::blocking::Client, ProviderError> {
    reqwest::blocking::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("aniproject/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| ProviderError::RequestError(e.to_string()))
}

/// Joins path segments onto a base URL, percent-encoding each segment
pub(crate) fn endpoint(base_url: &str, segments: &[&str]) -> Result<reqwest::Url, ProviderError> {
    let mut url = reqwest::Url::parse(base_url)
        .map_err(|e| ProviderError::RequestError(format!("Invalid base URL {base_url}: {e}")))?;

    url.path_segments_mut()
        .map_err(|_| ProviderError::RequestError(format!("Invalid base URL {base_url}")))?
        .pop_if_empty()
        .extend(segments);

    Ok(url)
}

/// Decodes a JSON response, mapping 404 to `Ok(None)`
pub(crate) fn read_json<T: DeserializeOwned>(
    response: reqwest::blocking::Response,
) -> Result<Option<T>, ProviderError> {
    if response.status() == 404 {
        return Ok(None);
    }

    if !response.status().is_success() {
        return Err(ProviderError::RequestError(format!(
            "HTTP {} {}",
            response.status().as_u16(),
            response.status().canonical_reason().unwrap_or("Unknown")
        )));
    }

    response
        .json()
        .map(Some)
        .map_err(|e| ProviderError::ParseError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: &str, format: Option<&str>, sub: Option<u32>) -> MediaCandidate {
        MediaCandidate {
            id: id.to_string(),
            name: id.to_string(),
            format: format.map(str::to_string),
            sub_episodes: sub,
        }
    }

    #[test]
    fn test_normalize_query() {
        assert_eq!(normalize_query("Frieren: Beyond Journey's End"), "frieren beyond journeys end");
        assert_eq!(normalize_query("  Re:ZERO  -Starting Life- "), "rezero starting life");
        assert_eq!(normalize_query("Oshi no Ko 2nd Season"), "oshi no ko 2nd season");
    }

    #[test]
    fn test_best_candidate_prefers_format_and_count() {
        let candidates = vec![
            candidate("one-piece-film-red", Some("Movie"), Some(1)),
            candidate("one-piece-special", Some("TV"), Some(2)),
            candidate("one-piece", Some("TV"), Some(1100)),
        ];

        let best = best_candidate(&candidates, Some("tv"), Some(1100)).unwrap();
        assert_eq!(best.id, "one-piece");

        let best = best_candidate(&candidates, Some("TV"), Some(12)).unwrap();
        assert_eq!(best.id, "one-piece-special");

        let best = best_candidate(&candidates, Some("OVA"), None).unwrap();
        assert_eq!(best.id, "one-piece-film-red");
    }

    #[test]
    fn test_best_candidate_empty() {
        assert!(best_candidate(&[], Some("TV"), Some(12)).is_none());
    }

    #[test]
    fn test_endpoint_encodes_segments() {
        let url = endpoint("https://api.example.org/", &["anime", "gogoanime", "one piece"]).unwrap();
        assert_eq!(url.as_str(), "https://api.example.org/anime/gogoanime/one%20piece");
    }

    #[test]
    fn test_clean_text_decodes_entities() {
        assert_eq!(clean_text("  Sword &amp; Sorcery "), "Sword & Sorcery");
    }
}
