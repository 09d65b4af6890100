//! Two-tier query planning and paginated candidate discovery.
//!
//! The niche phrase drives a primary query for roughly three quarters of the
//! desired count; the source video's tags, when present, drive a secondary
//! query for the rest. Hits are merged primary-first and deduplicated by id.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::error::YoutubeError;
use crate::provider::VideoSearch;
use crate::types::{SearchOrder, SearchRequest, VideoHit, MAX_PAGE_SIZE};

/// Number of tags combined into the secondary query.
pub const MAX_SECONDARY_TAGS: usize = 7;

/// Guard against providers that cycle page tokens.
pub const MAX_PAGES_PER_QUERY: usize = 20;

/// Inputs to candidate discovery.
#[derive(Debug, Clone, Default)]
pub struct PlanInput {
    pub niche_query: String,
    /// Source video tags; may be empty.
    pub tags: Vec<String>,
    pub region_code: Option<String>,
    pub published_after: Option<DateTime<Utc>>,
    pub desired: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedQuery {
    pub query: String,
    pub target: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QueryPlan {
    pub queries: Vec<PlannedQuery>,
}

/// Split the desired count between the niche query and the tag query.
///
/// Pure; issues no requests. An empty niche phrase with no usable tags, or a
/// desired count of zero, yields an empty plan.
#[must_use]
pub fn plan_queries(input: &PlanInput) -> QueryPlan {
    if input.desired == 0 {
        return QueryPlan::default();
    }

    let niche = input.niche_query.trim();
    let tag_query = secondary_query(&input.tags);

    let mut queries = Vec::with_capacity(2);
    match tag_query {
        Some(tag_query) if !niche.is_empty() => {
            let primary = (input.desired * 3).div_ceil(4);
            queries.push(PlannedQuery {
                query: niche.to_string(),
                target: primary,
            });
            let remaining = input.desired - primary;
            if remaining > 0 {
                queries.push(PlannedQuery {
                    query: tag_query,
                    target: remaining,
                });
            }
        }
        Some(tag_query) => queries.push(PlannedQuery {
            query: tag_query,
            target: input.desired,
        }),
        None if !niche.is_empty() => queries.push(PlannedQuery {
            query: niche.to_string(),
            target: input.desired,
        }),
        None => {}
    }

    QueryPlan { queries }
}

/// Top tags, trimmed and deduplicated in first-seen order, joined by spaces.
fn secondary_query(tags: &[String]) -> Option<String> {
    let mut seen = HashSet::new();
    let picked: Vec<&str> = tags
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty() && seen.insert(t.to_lowercase()))
        .take(MAX_SECONDARY_TAGS)
        .collect();
    (!picked.is_empty()).then(|| picked.join(" "))
}

/// Execute the plan against `search`, returning unique hits in merge order.
///
/// A failing query is logged and skipped. The call only fails when every
/// issued query failed, in which case the first error is returned. A short
/// final count is accepted as-is.
///
/// # Errors
///
/// Returns the first [`YoutubeError`] when no query produced results.
pub async fn discover_candidates<S: VideoSearch>(
    search: &S,
    input: &PlanInput,
) -> Result<Vec<VideoHit>, YoutubeError> {
    let plan = plan_queries(input);
    let mut batches = Vec::with_capacity(plan.queries.len());
    let mut first_error = None;

    for planned in &plan.queries {
        match run_query(search, planned, input).await {
            Ok(hits) => {
                tracing::debug!(
                    query = %planned.query,
                    target = planned.target,
                    fetched = hits.len(),
                    "query complete"
                );
                batches.push(hits);
            }
            Err(e) => {
                tracing::warn!(query = %planned.query, error = %e, "search query failed; skipping");
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
    }

    if batches.is_empty() {
        if let Some(err) = first_error {
            return Err(err);
        }
    }

    let merged = merge_unique(batches);
    tracing::info!(
        desired = input.desired,
        unique = merged.len(),
        "candidate discovery complete"
    );
    Ok(merged)
}

/// Page through one query until its target is reached or pages run out.
///
/// An error after at least one successful page keeps what was gathered.
async fn run_query<S: VideoSearch>(
    search: &S,
    planned: &PlannedQuery,
    input: &PlanInput,
) -> Result<Vec<VideoHit>, YoutubeError> {
    let mut hits: Vec<VideoHit> = Vec::with_capacity(planned.target);
    let mut page_token: Option<String> = None;

    for page in 0..MAX_PAGES_PER_QUERY {
        let remaining = planned.target.saturating_sub(hits.len());
        if remaining == 0 {
            break;
        }
        let request = SearchRequest {
            query: planned.query.clone(),
            order: SearchOrder::ViewCount,
            max_results: u32::try_from(remaining)
                .unwrap_or(MAX_PAGE_SIZE)
                .min(MAX_PAGE_SIZE),
            region_code: input.region_code.clone(),
            published_after: input.published_after,
            category_id: None,
            page_token: page_token.take(),
        };

        let result = match search.search_page(&request).await {
            Ok(result) => result,
            Err(e) if page > 0 => {
                tracing::warn!(
                    query = %planned.query,
                    page,
                    gathered = hits.len(),
                    error = %e,
                    "pagination failed; keeping hits gathered so far"
                );
                break;
            }
            Err(e) => return Err(e),
        };

        tracing::debug!(query = %planned.query, page, returned = result.hits.len(), "search page");
        hits.extend(result.hits.into_iter().take(remaining));

        match result.next_page_token {
            Some(token) => page_token = Some(token),
            None => break,
        }
    }

    Ok(hits)
}

/// Concatenate batches in order, keeping the first occurrence of each id.
#[must_use]
pub fn merge_unique(batches: Vec<Vec<VideoHit>>) -> Vec<VideoHit> {
    let mut seen = HashSet::new();
    let mut merged: Vec<VideoHit> = batches.into_iter().flatten().collect();
    merged.retain(|hit| seen.insert(hit.video_id.clone()));
    merged
}

#[cfg(test)]
#[path = "planner_test.rs"]
mod tests;
