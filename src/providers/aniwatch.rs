/// Aniwatch episode provider implementation.
use super::wire_types::{AniWatchAnime, AniWatchEpisodeItem, AniWatchEpisodes, AniWatchSearch};
use super::{
    AniWatchApi, AniWatchEpisode, MediaCandidate, ProviderError, build_http_client, clean_text,
    endpoint, read_json,
};
use std::time::Duration;

/// Episode provider backed by an aniwatch-api instance.
///
/// Aniwatch search often ranks the wrong entry first, so the search results
/// are handed back as candidates and episodes are loaded by media id.
pub struct AniWatchClient {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl AniWatchClient {
    /// Creates a client for the aniwatch-api instance at `base_url`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ProviderError> {
        Ok(Self {
            client: build_http_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn convert_candidate(anime: AniWatchAnime) -> MediaCandidate {
        MediaCandidate {
            id: anime.id,
            name: clean_text(&anime.name),
            format: anime.format,
            sub_episodes: anime.episodes.and_then(|counts| counts.sub),
        }
    }

    fn convert_episode(item: AniWatchEpisodeItem) -> AniWatchEpisode {
        let title = item
            .title
            .map(|t| clean_text(&t))
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| format!("Episode {}", item.number));

        AniWatchEpisode {
            episode_id: item.episode_id,
            number: item.number,
            title,
            is_filler: item.is_filler,
        }
    }
}

impl AniWatchApi for AniWatchClient {
    fn search(&self, query: &str) -> Result<Vec<MediaCandidate>, ProviderError> {
        let url = endpoint(&self.base_url, &["anime", "search"])?;

        let response = self
            .client
            .get(url)
            .query(&[("q", query)])
            .send()
            .map_err(|e| ProviderError::RequestError(e.to_string()))?;

        let search: Option<AniWatchSearch> = read_json(response)?;

        Ok(search
            .map(|s| s.animes.into_iter().map(Self::convert_candidate).collect())
            .unwrap_or_default())
    }

    fn episodes_by_id(&self, id: &str) -> Result<Option<Vec<AniWatchEpisode>>, ProviderError> {
        let url = endpoint(&self.base_url, &["anime", "episodes", id])?;

        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| ProviderError::RequestError(e.to_string()))?;

        let episodes: Option<AniWatchEpisodes> = read_json(response)?;

        Ok(episodes
            .filter(|e| !e.episodes.is_empty())
            .map(|e| e.episodes.into_iter().map(Self::convert_episode).collect()))
    }
}
