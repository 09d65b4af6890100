use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::candidate::compose_embedding_text;

/// Version stamped into every persisted analysis payload.
pub const ANALYSIS_ARTIFACT_VERSION: u32 = 1;

/// The user's own content idea.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConceptDraft {
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

impl ConceptDraft {
    #[must_use]
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        tags: Vec<String>,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            tags,
            embedding: None,
        }
    }

    #[must_use]
    pub fn embedding_text(&self) -> String {
        compose_embedding_text(&self.title, &self.description, &self.tags)
    }
}

/// One candidate's cosine similarity to the concept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateMatch {
    pub video_id: String,
    pub similarity: f32,
}

/// A content gap reported by the oracle, scored 0–100.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentGap {
    pub description: String,
    pub score: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Suggestions {
    pub title_variants: Vec<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
}

/// Optional fields the pattern call may return beyond its summary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtendedInsights {
    #[serde(default)]
    pub hook_patterns: Vec<String>,
    #[serde(default)]
    pub thumbnail_patterns: Vec<String>,
    #[serde(default)]
    pub audience_notes: Option<String>,
}

impl ExtendedInsights {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hook_patterns.is_empty()
            && self.thumbnail_patterns.is_empty()
            && self.audience_notes.is_none()
    }
}

/// Output of the ANALYSIS stage, persisted as a versioned JSON artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub version: u32,
    /// Direct competitors, most similar first.
    pub top_matches: Vec<CandidateMatch>,
    /// Opaque oracle output; never inspected.
    pub pattern_summary: serde_json::Value,
    pub gaps: Vec<ContentGap>,
    pub suggestions: Suggestions,
    /// Mean gap score in [0, 100]; 0 when the oracle reported no gaps.
    pub validation_score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extended: Option<ExtendedInsights>,
    pub created_at: DateTime<Utc>,
}

impl AnalysisResult {
    #[must_use]
    pub fn top_matched_candidate_ids(&self) -> Vec<&str> {
        self.top_matches.iter().map(|m| m.video_id.as_str()).collect()
    }
}
