//! Runtime configuration

use crate::pager::{DEFAULT_PAGE_SIZE, OffsetPolicy};
use std::path::PathBuf;
use std::time::Duration;

/// Default AniList GraphQL endpoint
pub const DEFAULT_ANILIST_URL: &str = "https://graphql.anilist.co";

/// Default Consumet instance (self-hosted, default port)
pub const DEFAULT_CONSUMET_URL: &str = "http://localhost:3000";

/// Default aniwatch-api instance (self-hosted, default port)
pub const DEFAULT_ANIWATCH_URL: &str = "http://localhost:4000";

/// Settings for the providers, the pager and the document store
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub anilist_url: String,
    pub consumet_url: String,
    pub aniwatch_url: String,
    /// Per-request timeout for every provider call
    pub http_timeout: Duration,
    pub page_size: usize,
    pub offset_policy: OffsetPolicy,
    /// Where user documents are kept; `None` uses the platform data directory
    pub store_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            anilist_url: DEFAULT_ANILIST_URL.to_string(),
            consumet_url: DEFAULT_CONSUMET_URL.to_string(),
            aniwatch_url: DEFAULT_ANIWATCH_URL.to_string(),
            http_timeout: Duration::from_secs(20),
            page_size: DEFAULT_PAGE_SIZE,
            offset_policy: OffsetPolicy::default(),
            store_dir: None,
        }
    }
}
