//! Composite performance/relevance scoring with IQR outlier rejection.
//!
//! Pure and deterministic: the same candidates, options and `now` always
//! produce the same ordering and scores. Never errors; empty input yields
//! empty output.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use nichescout_core::{Candidate, ScoringWeights};

/// Outlier rejection needs more than this many candidates to be meaningful.
const MIN_OUTLIER_SAMPLE: usize = 10;

/// Score assigned to every candidate when a signal has no spread.
const DEGENERATE_SCORE: f64 = 50.0;

#[derive(Debug, Clone, PartialEq)]
pub struct ScoringOptions {
    pub weights: ScoringWeights,
    /// Tags of the source video; empty means "no source".
    pub source_tags: Vec<String>,
    pub source_category: Option<String>,
    pub remove_outliers: bool,
    /// Maximum number of candidates returned.
    pub limit: usize,
}

impl Default for ScoringOptions {
    fn default() -> Self {
        Self {
            weights: ScoringWeights::default(),
            source_tags: Vec::new(),
            source_category: None,
            remove_outliers: true,
            limit: 50,
        }
    }
}

/// Compute metrics, drop view-count outliers, normalize, combine and rank.
///
/// Returns at most `options.limit` candidates sorted by descending
/// `metrics.combined_score`; ties keep input order.
#[must_use]
pub fn score_candidates(
    candidates: Vec<Candidate>,
    options: &ScoringOptions,
    now: DateTime<Utc>,
) -> Vec<Candidate> {
    if candidates.is_empty() {
        return candidates;
    }

    let source_tags = tag_set(&options.source_tags);
    let mut scored: Vec<Candidate> = candidates
        .into_iter()
        .map(|mut c| {
            c.metrics.engagement_rate = engagement_rate(&c);
            c.metrics.view_velocity = view_velocity(&c, now);
            c.metrics.tag_overlap_score = tag_overlap(&source_tags, &c.tags);
            c.metrics.category_match = match options.source_category.as_deref() {
                Some(source) => c.category_id.as_deref() == Some(source),
                None => true,
            };
            c
        })
        .collect();

    if options.remove_outliers && scored.len() > MIN_OUTLIER_SAMPLE {
        let before = scored.len();
        scored = remove_view_outliers(scored);
        tracing::debug!(
            before,
            after = scored.len(),
            "removed view-count outliers"
        );
    }

    let engagement = normalize(&collect(&scored, |c| c.metrics.engagement_rate));
    let velocity = normalize(&collect(&scored, |c| c.metrics.view_velocity));
    let overlap = normalize(&collect(&scored, |c| c.metrics.tag_overlap_score));

    let w = options.weights;
    for (i, c) in scored.iter_mut().enumerate() {
        let bonus = if c.metrics.category_match {
            w.category_bonus()
        } else {
            0.0
        };
        c.metrics.combined_score =
            engagement[i] * w.engagement + velocity[i] * w.velocity + overlap[i] * w.tag + bonus;
    }

    scored.sort_by(|a, b| b.metrics.combined_score.total_cmp(&a.metrics.combined_score));
    scored.truncate(options.limit);
    scored
}

/// `(likes + comments) / views × 100`, or 0 when the video has no views.
#[allow(clippy::cast_precision_loss)]
fn engagement_rate(c: &Candidate) -> f64 {
    if c.view_count == 0 {
        return 0.0;
    }
    (c.like_count.saturating_add(c.comment_count)) as f64 / c.view_count as f64 * 100.0
}

/// Views per whole day since publish, with a one-day floor.
#[allow(clippy::cast_precision_loss)]
fn view_velocity(c: &Candidate, now: DateTime<Utc>) -> f64 {
    let days = (now - c.published_at).num_days().max(1);
    c.view_count as f64 / days as f64
}

fn tag_set(tags: &[String]) -> HashSet<String> {
    tags.iter()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Jaccard similarity × 100; 50 when there are no source tags.
#[allow(clippy::cast_precision_loss)]
fn tag_overlap(source: &HashSet<String>, candidate_tags: &[String]) -> f64 {
    if source.is_empty() {
        return DEGENERATE_SCORE;
    }
    let candidate = tag_set(candidate_tags);
    let intersection = source.intersection(&candidate).count();
    let union = source.union(&candidate).count();
    intersection as f64 / union as f64 * 100.0
}

/// Keep candidates whose views lie within `[Q1 − 1.5·IQR, Q3 + 1.5·IQR]`.
#[allow(clippy::cast_precision_loss)]
fn remove_view_outliers(candidates: Vec<Candidate>) -> Vec<Candidate> {
    let mut views: Vec<f64> = candidates.iter().map(|c| c.view_count as f64).collect();
    views.sort_by(f64::total_cmp);
    let q1 = quantile(&views, 0.25);
    let q3 = quantile(&views, 0.75);
    let iqr = q3 - q1;
    let (low, high) = (q1 - 1.5 * iqr, q3 + 1.5 * iqr);

    candidates
        .into_iter()
        .filter(|c| {
            let v = c.view_count as f64;
            v >= low && v <= high
        })
        .collect()
}

/// Linear interpolation between closest ranks over sorted `values`.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub(crate) fn quantile(sorted: &[f64], p: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        n => {
            let pos = p * (n - 1) as f64;
            let lo = pos.floor() as usize;
            let hi = pos.ceil() as usize;
            sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
        }
    }
}

/// Min–max normalize to [0, 100]; every value maps to 50 when max == min.
#[must_use]
pub fn normalize(values: &[f64]) -> Vec<f64> {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;
    if !range.is_finite() || range <= 0.0 {
        return vec![DEGENERATE_SCORE; values.len()];
    }
    values.iter().map(|v| (v - min) / range * 100.0).collect()
}

fn collect(candidates: &[Candidate], f: impl Fn(&Candidate) -> f64) -> Vec<f64> {
    candidates.iter().map(f).collect()
}

#[cfg(test)]
#[path = "scorer_test.rs"]
mod tests;
