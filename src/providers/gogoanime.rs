/// GoGoAnime episode provider implementation.
use super::wire_types::{GoGoEpisode, GoGoMediaInfo, GoGoSearchPage, GoGoSearchResult};
use super::{GoGoAnimeApi, GoGoAnimeEpisode, ProviderError, build_http_client, endpoint, read_json};
use std::time::Duration;

/// Episode provider backed by a Consumet instance.
///
/// Looks the title up with the GoGoAnime search endpoint and then loads the
/// episode list of the best hit from the info endpoint.
pub struct GoGoAnimeClient {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl GoGoAnimeClient {
    /// Creates a client for the Consumet instance at `base_url`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ProviderError> {
        Ok(Self {
            client: build_http_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Subbed releases are listed first upstream but not always; prefer them.
    fn pick_result(results: &[GoGoSearchResult]) -> Option<&GoGoSearchResult> {
        results
            .iter()
            .find(|r| r.sub_or_dub.as_deref() == Some("sub"))
            .or_else(|| results.first())
    }

    fn convert_episode(episode: GoGoEpisode) -> GoGoAnimeEpisode {
        GoGoAnimeEpisode {
            id: episode.id,
            number: episode.number,
            url: episode.url,
        }
    }

    fn search(&self, query: &str) -> Result<Option<GoGoSearchPage>, ProviderError> {
        let url = endpoint(&self.base_url, &["anime", "gogoanime", query])?;

        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| ProviderError::RequestError(e.to_string()))?;

        read_json(response)
    }

    fn info(&self, id: &str) -> Result<Option<GoGoMediaInfo>, ProviderError> {
        let url = endpoint(&self.base_url, &["anime", "gogoanime", "info", id])?;

        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| ProviderError::RequestError(e.to_string()))?;

        read_json(response)
    }
}

impl GoGoAnimeApi for GoGoAnimeClient {
    fn fetch_episodes(&self, query: &str) -> Result<Option<Vec<GoGoAnimeEpisode>>, ProviderError> {
        let Some(page) = self.search(query)? else {
            return Ok(None);
        };

        let Some(hit) = Self::pick_result(&page.results) else {
            return Ok(None);
        };

        let Some(info) = self.info(&hit.id)? else {
            return Ok(None);
        };

        if info.episodes.is_empty() {
            return Ok(None);
        }

        Ok(Some(
            info.episodes.into_iter().map(Self::convert_episode).collect(),
        ))
    }
}
