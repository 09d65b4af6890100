//! Context building and tolerant interpretation of oracle output.
//!
//! Oracle responses are untrusted: missing keys, wrong types and
//! out-of-range scores degrade to empty values with a warning instead of
//! failing the stage.

use std::collections::HashSet;

use nichescout_core::{Candidate, CandidateMatch, ConceptDraft, ContentGap, ExtendedInsights};
use serde_json::{json, Value};

/// Description characters included per competitor in oracle context.
const CONTEXT_DESCRIPTION_CHARS: usize = 500;

/// Competitor and concept context shared by every oracle call.
#[must_use]
pub fn build_context(
    niche_query: &str,
    concept: &ConceptDraft,
    matches: &[CandidateMatch],
    candidates: &[Candidate],
) -> Value {
    let competitors: Vec<Value> = matches
        .iter()
        .filter_map(|m| {
            let c = candidates.iter().find(|c| c.video_id == m.video_id)?;
            Some(json!({
                "video_id": c.video_id,
                "title": c.title,
                "description": c
                    .description
                    .chars()
                    .take(CONTEXT_DESCRIPTION_CHARS)
                    .collect::<String>(),
                "tags": c.tags,
                "channel": c.channel_title,
                "views": c.view_count,
                "engagement_rate": c.metrics.engagement_rate,
                "views_per_day": c.metrics.view_velocity,
                "duration_seconds": c.duration_seconds,
                "similarity": m.similarity,
            }))
        })
        .collect();

    json!({
        "niche": niche_query,
        "concept": {
            "title": concept.title,
            "description": concept.description,
            "tags": concept.tags,
        },
        "competitors": competitors,
    })
}

/// Split the pattern response into the opaque summary and optional
/// extended insights.
#[must_use]
pub fn parse_patterns(value: Value) -> (Value, Option<ExtendedInsights>) {
    let extended = ExtendedInsights {
        hook_patterns: string_list(&value, "hook_patterns"),
        thumbnail_patterns: string_list(&value, "thumbnail_patterns"),
        audience_notes: value
            .get("audience_notes")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ToOwned::to_owned),
    };
    let extended = (!extended.is_empty()).then_some(extended);
    (value, extended)
}

/// Gaps with a non-empty description and a numeric score, clamped to [0, 100].
#[must_use]
pub fn parse_gaps(value: &Value) -> Vec<ContentGap> {
    let Some(items) = value.get("gaps").and_then(Value::as_array).or(value.as_array()) else {
        tracing::warn!("gap response has no gaps array");
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| {
            let description = item
                .get("description")
                .or_else(|| item.get("gap"))
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty());
            let score = item.get("score").and_then(|s| {
                s.as_f64()
                    .or_else(|| s.as_str().and_then(|t| t.trim().parse::<f64>().ok()))
            });
            match (description, score) {
                (Some(description), Some(score)) if score.is_finite() => Some(ContentGap {
                    description: description.to_string(),
                    score: score.clamp(0.0, 100.0),
                }),
                _ => {
                    tracing::warn!(entry = %item, "skipping malformed gap entry");
                    None
                }
            }
        })
        .collect()
}

/// Trimmed, case-insensitively unique strings under `key`, or the value
/// itself when it is a bare array.
#[must_use]
pub fn string_list(value: &Value, key: &str) -> Vec<String> {
    let Some(items) = value.get(key).and_then(Value::as_array).or(value.as_array()) else {
        return Vec::new();
    };
    let mut seen = HashSet::new();
    items
        .iter()
        .filter_map(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty() && seen.insert(s.to_lowercase()))
        .map(ToOwned::to_owned)
        .collect()
}

#[must_use]
pub fn parse_description(value: &Value) -> Option<String> {
    value
        .get("description")
        .and_then(Value::as_str)
        .or(value.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToOwned::to_owned)
}

/// Mean gap score; 0 when there are no gaps.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn validation_score(gaps: &[ContentGap]) -> f64 {
    if gaps.is_empty() {
        return 0.0;
    }
    gaps.iter().map(|g| g.score).sum::<f64>() / gaps.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_extended_insights_when_present() {
        let (summary, extended) = parse_patterns(json!({
            "summary": "List-style titles dominate",
            "hook_patterns": ["Question in first 5s", "question in first 5s"],
            "audience_notes": "  "
        }));
        assert_eq!(summary["summary"], "List-style titles dominate");
        let extended = extended.expect("hooks present");
        assert_eq!(extended.hook_patterns, vec!["Question in first 5s"]);
        assert!(extended.audience_notes.is_none());
    }

    #[test]
    fn no_extended_fields_means_none() {
        let (_, extended) = parse_patterns(json!({"summary": "x"}));
        assert!(extended.is_none());
    }

    #[test]
    fn gaps_are_clamped_and_malformed_entries_skipped() {
        let gaps = parse_gaps(&json!({
            "gaps": [
                {"description": "No beginner builds under $500", "score": 140},
                {"description": "", "score": 50},
                {"gap": "Few AMD-only builds", "score": "35.5"},
                {"description": "Missing score"},
                {"description": "Negative", "score": -3}
            ]
        }));
        let scores: Vec<f64> = gaps.iter().map(|g| g.score).collect();
        assert_eq!(scores, vec![100.0, 35.5, 0.0]);
        assert_eq!(gaps[1].description, "Few AMD-only builds");
    }

    #[test]
    fn wrong_shape_yields_no_gaps() {
        assert!(parse_gaps(&json!({"gaps": "none"})).is_empty());
        assert!(parse_gaps(&json!(42)).is_empty());
    }

    #[test]
    fn validation_score_is_mean_or_zero() {
        assert!(validation_score(&[]).abs() < f64::EPSILON);
        let gaps = vec![
            ContentGap {
                description: "a".into(),
                score: 80.0,
            },
            ContentGap {
                description: "b".into(),
                score: 40.0,
            },
        ];
        assert!((validation_score(&gaps) - 60.0).abs() < 1e-9);
    }

    #[test]
    fn string_lists_accept_keyed_or_bare_arrays() {
        assert_eq!(
            string_list(&json!({"titles": ["A", " a ", "B", 3]}), "titles"),
            vec!["A", "B"]
        );
        assert_eq!(string_list(&json!(["x"]), "tags"), vec!["x"]);
        assert!(string_list(&json!({"tags": "x"}), "tags").is_empty());
    }

    #[test]
    fn description_accepts_keyed_or_bare_string() {
        assert_eq!(
            parse_description(&json!({"description": " New copy "})).as_deref(),
            Some("New copy")
        );
        assert_eq!(parse_description(&json!("plain")).as_deref(), Some("plain"));
        assert_eq!(parse_description(&json!({})), None);
    }
}
