/// Upstream API response types for deserialization.
///
/// These structures mirror the JSON returned by the AniList GraphQL API,
/// the Consumet GoGoAnime endpoints and the aniwatch-api endpoints.
use serde::Deserialize;

/// GraphQL envelope returned by AniList.
#[derive(Debug, Deserialize)]
pub(super) struct AniListResponse {
    pub data: Option<AniListData>,
    #[serde(default)]
    pub errors: Vec<AniListError>,
}

#[derive(Debug, Deserialize)]
pub(super) struct AniListError {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct AniListData {
    #[serde(rename = "Media")]
    pub media: Option<AniListMedia>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct AniListMedia {
    pub id: u64,
    pub title: AniListTitle,
    /// TV, MOVIE, OVA, ...
    pub format: Option<String>,
    /// Planned episode count, null while airing with an unknown total
    pub episodes: Option<u32>,
    #[serde(default)]
    pub streaming_episodes: Vec<AniListStreamingEpisode>,
}

#[derive(Debug, Deserialize)]
pub(super) struct AniListTitle {
    pub romaji: Option<String>,
    pub english: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct AniListStreamingEpisode {
    pub title: Option<String>,
    pub thumbnail: Option<String>,
    pub url: Option<String>,
    pub site: Option<String>,
}

/// Search page from the Consumet GoGoAnime endpoint.
#[derive(Debug, Deserialize)]
pub(super) struct GoGoSearchPage {
    #[serde(default)]
    pub results: Vec<GoGoSearchResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct GoGoSearchResult {
    pub id: String,
    /// "sub" or "dub"
    pub sub_or_dub: Option<String>,
}

/// Media info with embedded episodes from the Consumet GoGoAnime endpoint.
#[derive(Debug, Deserialize)]
pub(super) struct GoGoMediaInfo {
    #[serde(default)]
    pub episodes: Vec<GoGoEpisode>,
}

#[derive(Debug, Deserialize)]
pub(super) struct GoGoEpisode {
    pub id: String,
    pub number: f64,
    pub url: Option<String>,
}

/// Search results from aniwatch-api.
#[derive(Debug, Deserialize)]
pub(super) struct AniWatchSearch {
    #[serde(default)]
    pub animes: Vec<AniWatchAnime>,
}

#[derive(Debug, Deserialize)]
pub(super) struct AniWatchAnime {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub format: Option<String>,
    pub episodes: Option<AniWatchEpisodeCounts>,
}

#[derive(Debug, Deserialize)]
pub(super) struct AniWatchEpisodeCounts {
    pub sub: Option<u32>,
}

/// Episode list from aniwatch-api.
#[derive(Debug, Deserialize)]
pub(super) struct AniWatchEpisodes {
    #[serde(default)]
    pub episodes: Vec<AniWatchEpisodeItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct AniWatchEpisodeItem {
    pub episode_id: String,
    pub number: u32,
    pub title: Option<String>,
    #[serde(default)]
    pub is_filler: bool,
}
