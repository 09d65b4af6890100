use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum number of description characters fed into an embedding text.
const EMBED_DESCRIPTION_CHARS: usize = 2_000;

/// A competitor video considered as a reference for the user's niche.
///
/// Statistics come from the detail provider; `metrics` are derived by the
/// scorer and `embedding` is attached by the EMBED stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub video_id: String,
    pub title: String,
    pub description: String,
    /// Tag set. Order is irrelevant; duplicates are ignored by the scorer.
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
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
    #[serde(default)]
    pub metrics: CandidateMetrics,
}

/// Scores derived by the candidate scorer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateMetrics {
    /// `(likes + comments) / views * 100`.
    pub engagement_rate: f64,
    /// Views per day since publish.
    pub view_velocity: f64,
    /// Jaccard tag similarity to the source video, in [0, 100].
    pub tag_overlap_score: f64,
    pub category_match: bool,
    pub combined_score: f64,
}

/// Weights applied to the normalized signals when computing the combined score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub engagement: f64,
    pub velocity: f64,
    pub tag: f64,
    pub category: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            engagement: 0.4,
            velocity: 0.3,
            tag: 0.2,
            category: 0.1,
        }
    }
}

impl ScoringWeights {
    /// Flat bonus added for a category match.
    #[must_use]
    pub fn category_bonus(&self) -> f64 {
        self.category * 100.0
    }
}

impl Candidate {
    /// Text submitted to the embedding provider for this candidate.
    #[must_use]
    pub fn embedding_text(&self) -> String {
        compose_embedding_text(&self.title, &self.description, &self.tags)
    }

    #[must_use]
    pub fn has_embedding(&self) -> bool {
        self.embedding.as_ref().is_some_and(|v| !v.is_empty())
    }
}

/// Joins title, description and tags into a single embedding input.
///
/// Empty parts are skipped and long descriptions are truncated.
#[must_use]
pub fn compose_embedding_text(title: &str, description: &str, tags: &[String]) -> String {
    let description: String = description
        .trim()
        .chars()
        .take(EMBED_DESCRIPTION_CHARS)
        .collect();
    let tags = tags
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(", ");

    [title.trim(), description.as_str(), tags.as_str()]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
