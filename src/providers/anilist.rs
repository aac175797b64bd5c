/// AniList media lookup, the source of the pre-supplied streaming episodes.
use super::wire_types::{AniListMedia, AniListResponse, AniListStreamingEpisode};
use super::{ProviderError, StreamingEpisode, build_http_client, clean_text};
use serde_json::json;
use std::time::Duration;

const MEDIA_QUERY: &str = r#"
query ($id: Int) {
  Media(id: $id, type: ANIME) {
    id
    title { romaji english }
    format
    episodes
    streamingEpisodes { title thumbnail url site }
  }
}
"#;

/// What the episode list needs to know about a media entry.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaInfo {
    /// AniList media id, also the key of the watched-episode record
    pub id: u64,
    /// Title used to query the secondary providers
    pub title: String,
    /// Media format such as "TV" or "MOVIE"
    pub format: Option<String>,
    /// Planned episode count, if known
    pub episode_count: Option<u32>,
    /// Streaming episodes listed by AniList
    pub streaming_episodes: Vec<StreamingEpisode>,
}

/// Client for the AniList GraphQL API.
pub struct AniListClient {
    client: reqwest::blocking::Client,
    endpoint: String,
}

impl AniListClient {
    /// Creates a client for the GraphQL endpoint at `endpoint`.
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, ProviderError> {
        Ok(Self {
            client: build_http_client(timeout)?,
            endpoint: endpoint.to_string(),
        })
    }

    /// Fetches title, format and streaming episodes for one media id.
    pub fn fetch_media(&self, media_id: u64) -> Result<MediaInfo, ProviderError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&json!({ "query": MEDIA_QUERY, "variables": { "id": media_id } }))
            .send()
            .map_err(|e| ProviderError::RequestError(e.to_string()))?;

        // AniList answers unknown ids with 404 and a GraphQL error body
        if response.status() == 404 {
            return Err(ProviderError::MediaNotFound(media_id.to_string()));
        }

        if !response.status().is_success() {
            return Err(ProviderError::RequestError(format!(
                "HTTP {} {}",
                response.status().as_u16(),
                response.status().canonical_reason().unwrap_or("Unknown")
            )));
        }

        let body: AniListResponse = response
            .json()
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        Self::convert_response(media_id, body)
    }

    fn convert_response(media_id: u64, body: AniListResponse) -> Result<MediaInfo, ProviderError> {
        if let Some(error) = body.errors.first() {
            return Err(ProviderError::InvalidData(error.message.clone()));
        }

        let media = body
            .data
            .and_then(|d| d.media)
            .ok_or_else(|| ProviderError::MediaNotFound(media_id.to_string()))?;

        Self::convert_media(media)
    }

    fn convert_media(media: AniListMedia) -> Result<MediaInfo, ProviderError> {
        let title = media
            .title
            .romaji
            .or(media.title.english)
            .ok_or_else(|| {
                ProviderError::InvalidData(format!("Media {} has no title", media.id))
            })?;

        Ok(MediaInfo {
            id: media.id,
            title,
            format: media.format,
            episode_count: media.episodes,
            streaming_episodes: media
                .streaming_episodes
                .into_iter()
                .filter_map(Self::convert_episode)
                .collect(),
        })
    }

    /// Entries without a link cannot be watched and are skipped.
    fn convert_episode(episode: AniListStreamingEpisode) -> Option<StreamingEpisode> {
        let url = episode.url?;

        Some(StreamingEpisode {
            title: episode
                .title
                .map(|t| clean_text(&t))
                .unwrap_or_default(),
            thumbnail: episode.thumbnail,
            url,
            site: episode.site.unwrap_or_else(|| "Crunchyroll".to_string()),
        })
    }
}
