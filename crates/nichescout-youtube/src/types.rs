//! YouTube Data API v3 request and response types.
//!
//! Wire structs mirror the `search` and `videos` list responses. Statistics
//! arrive as decimal strings (`"viewCount": "12345"`) and are decoded with
//! [`de_count`]; absent counters (likes hidden by the uploader) become 0.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};

/// Upper bound on `maxResults` for `search` and on ids per `videos` call.
pub const MAX_PAGE_SIZE: u32 = 50;

/// Sort order passed to the `search` endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchOrder {
    #[default]
    Relevance,
    ViewCount,
    Date,
}

impl SearchOrder {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SearchOrder::Relevance => "relevance",
            SearchOrder::ViewCount => "viewCount",
            SearchOrder::Date => "date",
        }
    }
}

/// One page request against the video search provider.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub query: String,
    pub order: SearchOrder,
    /// Clamped to [`MAX_PAGE_SIZE`] by the client.
    pub max_results: u32,
    pub region_code: Option<String>,
    pub published_after: Option<DateTime<Utc>>,
    pub category_id: Option<String>,
    pub page_token: Option<String>,
}

/// Lightweight search hit, before statistics are resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoHit {
    pub video_id: String,
    pub title: String,
    pub description: String,
    pub channel_id: String,
    pub channel_title: String,
    pub published_at: Option<DateTime<Utc>>,
    pub thumbnail_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchPage {
    pub hits: Vec<VideoHit>,
    pub next_page_token: Option<String>,
}

/// Full statistics for a single video.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoDetail {
    pub video_id: String,
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub category_id: Option<String>,
    pub channel_id: String,
    pub channel_title: String,
    pub thumbnail_url: Option<String>,
    pub view_count: u64,
    pub like_count: u64,
    pub comment_count: u64,
    pub duration_seconds: u64,
    pub published_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// search
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SearchListResponse {
    #[serde(default)]
    pub next_page_token: Option<String>,
    #[serde(default)]
    pub items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SearchItem {
    pub id: SearchItemId,
    #[serde(default)]
    pub snippet: Option<Snippet>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SearchItemId {
    /// Absent for channel/playlist results, which are skipped.
    #[serde(default)]
    pub video_id: Option<String>,
}

// ---------------------------------------------------------------------------
// videos
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(crate) struct VideoListResponse {
    #[serde(default)]
    pub items: Vec<VideoItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct VideoItem {
    pub id: String,
    #[serde(default)]
    pub snippet: Option<Snippet>,
    #[serde(default)]
    pub statistics: Option<Statistics>,
    #[serde(default)]
    pub content_details: Option<ContentDetails>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Snippet {
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub channel_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub channel_title: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub category_id: Option<String>,
    #[serde(default)]
    pub thumbnails: Option<Thumbnails>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct Thumbnails {
    #[serde(default)]
    pub high: Option<Thumbnail>,
    #[serde(default)]
    pub medium: Option<Thumbnail>,
    #[serde(default)]
    pub default: Option<Thumbnail>,
}

impl Thumbnails {
    /// Best available thumbnail, preferring the larger renditions.
    pub(crate) fn best_url(&self) -> Option<String> {
        self.high
            .as_ref()
            .or(self.medium.as_ref())
            .or(self.default.as_ref())
            .map(|t| t.url.clone())
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct Thumbnail {
    pub url: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Statistics {
    #[serde(default, deserialize_with = "de_count")]
    pub view_count: u64,
    #[serde(default, deserialize_with = "de_count")]
    pub like_count: u64,
    #[serde(default, deserialize_with = "de_count")]
    pub comment_count: u64,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ContentDetails {
    #[serde(default)]
    pub duration: Option<String>,
}

/// Decode a counter sent either as a decimal string or a JSON number.
fn de_count<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Count {
        Text(String),
        Number(u64),
    }

    match Option::<Count>::deserialize(deserializer)? {
        None => Ok(0),
        Some(Count::Number(n)) => Ok(n),
        Some(Count::Text(s)) => s.trim().parse::<u64>().map_err(serde::de::Error::custom),
    }
}
