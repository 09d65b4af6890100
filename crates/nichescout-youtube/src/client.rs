//! HTTP client for the YouTube Data API v3.
//!
//! Wraps `reqwest` with API key handling, the Google error envelope, and
//! retry with back-off for transient failures. Quota exhaustion surfaces as
//! [`YoutubeError::QuotaExceeded`] and is never retried.

use std::time::Duration;

use chrono::{DateTime, Utc};
use nichescout_core::AppConfig;
use reqwest::{Client, StatusCode, Url};

use crate::duration::parse_iso8601_duration;
use crate::error::YoutubeError;
use crate::provider::{VideoDetails, VideoSearch};
use crate::retry::retry_with_backoff;
use crate::types::{
    SearchListResponse, SearchPage, SearchRequest, VideoDetail, VideoHit, VideoItem,
    VideoListResponse, MAX_PAGE_SIZE,
};

const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/youtube/v3/";

pub(crate) const USER_AGENT: &str = "nichescout/0.1 (competitive-research)";

/// Client for the YouTube Data API.
///
/// Use [`YoutubeClient::new`] for production or
/// [`YoutubeClient::with_base_url`] to point at a mock server in tests.
pub struct YoutubeClient {
    client: Client,
    api_key: String,
    base_url: Url,
    max_retries: u32,
    backoff_base_ms: u64,
}

impl YoutubeClient {
    /// Creates a client pointed at the production API.
    ///
    /// # Errors
    ///
    /// Returns [`YoutubeError::MissingApiKey`] if `api_key` is blank, or
    /// [`YoutubeError::Http`] if the `reqwest::Client` cannot be built.
    pub fn new(api_key: &str, timeout_secs: u64) -> Result<Self, YoutubeError> {
        Self::with_base_url(api_key, timeout_secs, DEFAULT_BASE_URL)
    }

    /// Creates a client with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`YoutubeError::MissingApiKey`] if `api_key` is blank,
    /// [`YoutubeError::InvalidBaseUrl`] if `base_url` does not parse, or
    /// [`YoutubeError::Http`] if the `reqwest::Client` cannot be built.
    pub fn with_base_url(
        api_key: &str,
        timeout_secs: u64,
        base_url: &str,
    ) -> Result<Self, YoutubeError> {
        if api_key.trim().is_empty() {
            return Err(YoutubeError::MissingApiKey);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(USER_AGENT)
            .build()?;

        // Exactly one trailing slash so `join("search")` appends a segment
        // instead of replacing the last one.
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised).map_err(|e| YoutubeError::InvalidBaseUrl {
            url: base_url.to_owned(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            api_key: api_key.to_owned(),
            base_url,
            max_retries: 3,
            backoff_base_ms: 500,
        })
    }

    /// Builds a client from application configuration.
    ///
    /// # Errors
    ///
    /// Returns [`YoutubeError::MissingApiKey`] when `YOUTUBE_API_KEY` is unset,
    /// plus any error from [`YoutubeClient::with_base_url`].
    pub fn from_config(config: &AppConfig) -> Result<Self, YoutubeError> {
        let key = config
            .youtube_api_key
            .as_deref()
            .ok_or(YoutubeError::MissingApiKey)?;
        Ok(
            Self::with_base_url(key, config.http_timeout_secs, &config.youtube_base_url)?
                .with_retry_policy(config.http_max_retries, config.http_backoff_base_ms),
        )
    }

    #[must_use]
    pub fn with_retry_policy(mut self, max_retries: u32, backoff_base_ms: u64) -> Self {
        self.max_retries = max_retries;
        self.backoff_base_ms = backoff_base_ms;
        self
    }

    /// Fetches one page from the `search` endpoint (videos only).
    ///
    /// # Errors
    ///
    /// - [`YoutubeError::QuotaExceeded`] when the daily quota is spent.
    /// - [`YoutubeError::RateLimited`] / [`YoutubeError::Api`] for other
    ///   non-2xx statuses that survive the retry budget.
    /// - [`YoutubeError::Http`] on network failure.
    /// - [`YoutubeError::Deserialize`] if the body does not match.
    pub async fn search(&self, request: &SearchRequest) -> Result<SearchPage, YoutubeError> {
        let max_results = request.max_results.clamp(1, MAX_PAGE_SIZE).to_string();
        let published_after = request
            .published_after
            .map(|t| t.format("%Y-%m-%dT%H:%M:%SZ").to_string());

        let mut params: Vec<(&str, &str)> = vec![
            ("part", "snippet"),
            ("type", "video"),
            ("q", &request.query),
            ("order", request.order.as_str()),
            ("maxResults", &max_results),
        ];
        if let Some(region) = request.region_code.as_deref() {
            params.push(("regionCode", region));
        }
        if let Some(after) = published_after.as_deref() {
            params.push(("publishedAfter", after));
        }
        if let Some(category) = request.category_id.as_deref() {
            params.push(("videoCategoryId", category));
        }
        if let Some(token) = request.page_token.as_deref() {
            params.push(("pageToken", token));
        }

        let url = self.build_url("search", &params)?;
        let body = self.get_json(&url).await?;
        let parsed: SearchListResponse =
            serde_json::from_value(body).map_err(|e| YoutubeError::Deserialize {
                context: format!("search(q={})", request.query),
                source: e,
            })?;

        let hits = parsed
            .items
            .into_iter()
            .filter_map(|item| {
                let video_id = item.id.video_id?;
                let snippet = item.snippet.unwrap_or_default();
                Some(VideoHit {
                    video_id,
                    title: snippet.title,
                    description: snippet.description,
                    channel_id: snippet.channel_id,
                    channel_title: snippet.channel_title,
                    published_at: snippet.published_at,
                    thumbnail_url: snippet.thumbnails.and_then(|t| t.best_url()),
                })
            })
            .collect();

        Ok(SearchPage {
            hits,
            next_page_token: parsed.next_page_token.filter(|t| !t.is_empty()),
        })
    }

    /// Fetches snippet, statistics and content details for up to 50 ids.
    ///
    /// Ids the API does not know are absent from the result.
    ///
    /// # Errors
    ///
    /// Same as [`YoutubeClient::search`].
    pub async fn videos(&self, ids: &[String]) -> Result<Vec<VideoDetail>, YoutubeError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let joined = ids.join(",");
        let url = self.build_url(
            "videos",
            &[("part", "snippet,statistics,contentDetails"), ("id", &joined)],
        )?;
        let body = self.get_json(&url).await?;
        let parsed: VideoListResponse =
            serde_json::from_value(body).map_err(|e| YoutubeError::Deserialize {
                context: format!("videos(count={})", ids.len()),
                source: e,
            })?;

        Ok(parsed.items.into_iter().filter_map(into_detail).collect())
    }

    /// Builds `base/endpoint?key=..&extra..` with percent-encoded pairs.
    fn build_url(&self, endpoint: &str, extra: &[(&str, &str)]) -> Result<Url, YoutubeError> {
        let mut url = self
            .base_url
            .join(endpoint)
            .map_err(|e| YoutubeError::InvalidBaseUrl {
                url: self.base_url.to_string(),
                reason: e.to_string(),
            })?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("key", &self.api_key);
            for (k, v) in extra {
                pairs.append_pair(k, v);
            }
        }
        Ok(url)
    }

    async fn get_json(&self, url: &Url) -> Result<serde_json::Value, YoutubeError> {
        retry_with_backoff(self.max_retries, self.backoff_base_ms, || {
            self.request_json(url)
        })
        .await
    }

    /// Sends a GET request, maps non-2xx bodies through the Google error
    /// envelope, and parses the response body as JSON.
    async fn request_json(&self, url: &Url) -> Result<serde_json::Value, YoutubeError> {
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(classify_error(status, &body));
        }

        serde_json::from_str(&body).map_err(|e| YoutubeError::Deserialize {
            context: redact_key(url),
            source: e,
        })
    }
}

impl VideoSearch for YoutubeClient {
    async fn search_page(&self, request: &SearchRequest) -> Result<SearchPage, YoutubeError> {
        self.search(request).await
    }
}

impl VideoDetails for YoutubeClient {
    async fn video_details(&self, ids: &[String]) -> Result<Vec<VideoDetail>, YoutubeError> {
        self.videos(ids).await
    }
}

/// Maps a non-2xx response to an error using the `error.errors[].reason`
/// field of the Google API envelope.
fn classify_error(status: StatusCode, body: &str) -> YoutubeError {
    let envelope = serde_json::from_str::<serde_json::Value>(body).ok();
    let error = envelope.as_ref().and_then(|v| v.get("error"));
    let message = error
        .and_then(|e| e.get("message"))
        .and_then(serde_json::Value::as_str)
        .unwrap_or("unknown error")
        .to_string();
    let reasons: Vec<&str> = error
        .and_then(|e| e.get("errors"))
        .and_then(serde_json::Value::as_array)
        .map(|errs| {
            errs.iter()
                .filter_map(|e| e.get("reason").and_then(serde_json::Value::as_str))
                .collect()
        })
        .unwrap_or_default();

    if reasons
        .iter()
        .any(|r| matches!(*r, "quotaExceeded" | "dailyLimitExceeded"))
    {
        return YoutubeError::QuotaExceeded(message);
    }
    if status == StatusCode::TOO_MANY_REQUESTS
        || reasons
            .iter()
            .any(|r| matches!(*r, "rateLimitExceeded" | "userRateLimitExceeded"))
    {
        return YoutubeError::RateLimited;
    }
    YoutubeError::Api {
        status: status.as_u16(),
        message,
    }
}

fn redact_key(url: &Url) -> String {
    let mut clean = url.clone();
    clean.set_query(None);
    clean.to_string()
}

fn into_detail(item: VideoItem) -> Option<VideoDetail> {
    let Some(snippet) = item.snippet else {
        tracing::warn!(video_id = %item.id, "video has no snippet; skipping");
        return None;
    };
    let published_at: DateTime<Utc> = match snippet.published_at {
        Some(ts) => ts,
        None => {
            tracing::warn!(video_id = %item.id, "video has no publishedAt; skipping");
            return None;
        }
    };
    let stats = item.statistics.unwrap_or_default();
    let raw_duration = item.content_details.and_then(|c| c.duration);
    let duration_seconds = match raw_duration.as_deref().map(parse_iso8601_duration) {
        Some(Some(secs)) => secs,
        Some(None) => {
            tracing::warn!(
                video_id = %item.id,
                duration = raw_duration.as_deref().unwrap_or_default(),
                "malformed ISO-8601 duration; using 0"
            );
            0
        }
        None => 0,
    };

    Some(VideoDetail {
        video_id: item.id,
        title: snippet.title,
        description: snippet.description,
        tags: snippet.tags,
        category_id: snippet.category_id,
        channel_id: snippet.channel_id,
        channel_title: snippet.channel_title,
        thumbnail_url: snippet.thumbnails.and_then(|t| t.best_url()),
        view_count: stats.view_count,
        like_count: stats.like_count,
        comment_count: stats.comment_count,
        duration_seconds,
        published_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client(base_url: &str) -> YoutubeClient {
        YoutubeClient::with_base_url("test-key", 30, base_url)
            .expect("client construction should not fail")
    }

    #[test]
    fn build_url_appends_endpoint_and_key() {
        let client = test_client("https://www.googleapis.com/youtube/v3");
        let url = client.build_url("videos", &[("id", "a,b")]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://www.googleapis.com/youtube/v3/videos?key=test-key&id=a%2Cb"
        );
    }

    #[test]
    fn build_url_tolerates_trailing_slash() {
        let client = test_client("https://www.googleapis.com/youtube/v3/");
        let url = client.build_url("search", &[("q", "lofi beats")]).unwrap();
        assert!(
            url.as_str()
                .starts_with("https://www.googleapis.com/youtube/v3/search?key=test-key"),
            "unexpected url: {url}"
        );
        assert!(url.as_str().contains("q=lofi+beats"));
    }

    #[test]
    fn blank_api_key_is_a_configuration_error() {
        let err = YoutubeClient::with_base_url("  ", 30, DEFAULT_BASE_URL)
            .err()
            .expect("blank key must be rejected");
        assert!(err.is_configuration());
    }

    #[test]
    fn classifies_quota_and_rate_limit_reasons() {
        let quota =
            r#"{"error":{"code":403,"message":"quota","errors":[{"reason":"quotaExceeded"}]}}"#;
        assert!(matches!(
            classify_error(StatusCode::FORBIDDEN, quota),
            YoutubeError::QuotaExceeded(ref m) if m == "quota"
        ));

        let rate =
            r#"{"error":{"code":403,"message":"slow","errors":[{"reason":"rateLimitExceeded"}]}}"#;
        assert!(matches!(
            classify_error(StatusCode::FORBIDDEN, rate),
            YoutubeError::RateLimited
        ));

        assert!(matches!(
            classify_error(StatusCode::BAD_REQUEST, "not json"),
            YoutubeError::Api { status: 400, .. }
        ));
    }

    #[test]
    fn deserialize_context_does_not_leak_key() {
        let client = test_client("https://www.googleapis.com/youtube/v3");
        let url = client.build_url("search", &[]).unwrap();
        assert!(!redact_key(&url).contains("test-key"));
    }
}
