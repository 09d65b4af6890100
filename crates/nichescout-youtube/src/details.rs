//! Batched resolution of full video statistics.

use std::collections::HashMap;

use nichescout_core::{Candidate, CandidateMetrics};

use crate::error::YoutubeError;
use crate::provider::VideoDetails;
use crate::types::{VideoDetail, MAX_PAGE_SIZE};

/// Ids per `videos` call.
pub const DETAILS_BATCH_SIZE: usize = MAX_PAGE_SIZE as usize;

/// Resolve details for `ids` in sequential batches of [`DETAILS_BATCH_SIZE`].
///
/// `on_batch(done, total)` is called after each batch, where `done` counts
/// requested ids. Ids the provider does not return are dropped; the output
/// keeps the order of `ids` and contains each id at most once.
///
/// # Errors
///
/// Returns the first batch error; earlier batches are discarded.
pub async fn resolve_details<D, F>(
    provider: &D,
    ids: &[String],
    mut on_batch: F,
) -> Result<Vec<VideoDetail>, YoutubeError>
where
    D: VideoDetails,
    F: FnMut(usize, usize),
{
    let total = ids.len();
    let mut by_id: HashMap<String, VideoDetail> = HashMap::with_capacity(total);
    let mut done = 0;

    for chunk in ids.chunks(DETAILS_BATCH_SIZE) {
        let details = provider.video_details(chunk).await?;
        tracing::debug!(
            requested = chunk.len(),
            returned = details.len(),
            "resolved detail batch"
        );
        for detail in details {
            by_id.entry(detail.video_id.clone()).or_insert(detail);
        }
        done += chunk.len();
        on_batch(done, total);
    }

    let resolved: Vec<VideoDetail> = ids.iter().filter_map(|id| by_id.remove(id)).collect();
    if resolved.len() < total {
        tracing::debug!(
            requested = total,
            resolved = resolved.len(),
            "some ids had no details"
        );
    }
    Ok(resolved)
}

impl From<VideoDetail> for Candidate {
    fn from(detail: VideoDetail) -> Self {
        Candidate {
            video_id: detail.video_id,
            title: detail.title,
            description: detail.description,
            tags: detail.tags,
            category_id: detail.category_id,
            channel_id: detail.channel_id,
            channel_title: detail.channel_title,
            thumbnail_url: detail.thumbnail_url,
            view_count: detail.view_count,
            like_count: detail.like_count,
            comment_count: detail.comment_count,
            duration_seconds: detail.duration_seconds,
            published_at: detail.published_at,
            embedding: None,
            metrics: CandidateMetrics::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use chrono::Utc;

    use super::*;

    fn detail(id: &str) -> VideoDetail {
        VideoDetail {
            video_id: id.to_string(),
            title: id.to_string(),
            description: String::new(),
            tags: vec![],
            category_id: None,
            channel_id: "UC".to_string(),
            channel_title: "c".to_string(),
            thumbnail_url: None,
            view_count: 1,
            like_count: 0,
            comment_count: 0,
            duration_seconds: 60,
            published_at: Utc::now(),
        }
    }

    /// Knows every id except those listed in `missing`; returns batches reversed.
    struct FakeDetails {
        missing: Vec<String>,
        fail_on_call: Option<usize>,
        calls: Mutex<Vec<usize>>,
    }

    impl FakeDetails {
        fn new() -> Self {
            Self {
                missing: vec![],
                fail_on_call: None,
                calls: Mutex::new(vec![]),
            }
        }
    }

    impl VideoDetails for FakeDetails {
        async fn video_details(&self, ids: &[String]) -> Result<Vec<VideoDetail>, YoutubeError> {
            let call = {
                let mut calls = self.calls.lock().unwrap();
                calls.push(ids.len());
                calls.len()
            };
            if self.fail_on_call == Some(call) {
                return Err(YoutubeError::RateLimited);
            }
            Ok(ids
                .iter()
                .rev()
                .filter(|id| !self.missing.contains(id))
                .map(|id| detail(id))
                .collect())
        }
    }

    fn id_list(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("v{i}")).collect()
    }

    #[tokio::test]
    async fn batches_by_fifty_and_reports_progress() {
        let provider = FakeDetails::new();
        let ids = id_list(120);
        let mut progress = vec![];
        let out = resolve_details(&provider, &ids, |done, total| progress.push((done, total)))
            .await
            .unwrap();

        assert_eq!(*provider.calls.lock().unwrap(), vec![50, 50, 20]);
        assert_eq!(progress, vec![(50, 120), (100, 120), (120, 120)]);
        assert_eq!(out.len(), 120);
    }

    #[tokio::test]
    async fn preserves_input_order_and_drops_missing() {
        let mut provider = FakeDetails::new();
        provider.missing = vec!["v1".to_string()];
        let ids = id_list(4);
        let out = resolve_details(&provider, &ids, |_, _| {}).await.unwrap();
        let got: Vec<&str> = out.iter().map(|d| d.video_id.as_str()).collect();
        assert_eq!(got, vec!["v0", "v2", "v3"]);
    }

    #[tokio::test]
    async fn failed_batch_fails_resolution() {
        let mut provider = FakeDetails::new();
        provider.fail_on_call = Some(2);
        let err = resolve_details(&provider, &id_list(80), |_, _| {})
            .await
            .unwrap_err();
        assert!(matches!(err, YoutubeError::RateLimited));
    }

    #[tokio::test]
    async fn empty_input_makes_no_calls() {
        let provider = FakeDetails::new();
        let out = resolve_details(&provider, &[], |_, _| {}).await.unwrap();
        assert!(out.is_empty());
        assert!(provider.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn detail_converts_to_unscored_candidate() {
        let candidate = Candidate::from(detail("abc"));
        assert_eq!(candidate.video_id, "abc");
        assert!(candidate.embedding.is_none());
        assert!(candidate.metrics.combined_score.abs() < f64::EPSILON);
    }
}
