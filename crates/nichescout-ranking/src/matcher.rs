//! Concept-to-competitor similarity ranking.

use nichescout_core::{Candidate, CandidateMatch, ConceptDraft};

use crate::embeddings::TextEmbedder;
use crate::error::RankingError;
use crate::vector::cosine_similarity;

pub const DEFAULT_TOP_K: usize = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct MatchOutcome {
    /// At most `top_k` candidates with a valid embedding, most similar first.
    pub top_matches: Vec<CandidateMatch>,
    /// Every candidate, most similar first; invalid embeddings score 0.
    pub all_scores: Vec<CandidateMatch>,
    /// The vector the concept was compared with; persisted by the caller.
    pub concept_embedding: Vec<f32>,
}

/// Rank candidates by cosine similarity to `concept`.
///
/// Candidates without a usable embedding (absent, dimension mismatch, zero
/// norm) get similarity 0, stay in `all_scores` and never enter the top-K.
/// Sorting is stable so ties keep candidate order.
#[must_use]
pub fn rank_by_similarity(
    concept: &[f32],
    candidates: &[Candidate],
    top_k: usize,
) -> (Vec<CandidateMatch>, Vec<CandidateMatch>) {
    let mut scored: Vec<(CandidateMatch, bool)> = candidates
        .iter()
        .map(|c| {
            let similarity = c
                .embedding
                .as_deref()
                .and_then(|e| cosine_similarity(concept, e));
            if similarity.is_none() {
                tracing::warn!(
                    video_id = %c.video_id,
                    has_embedding = c.embedding.is_some(),
                    "candidate embedding unusable; similarity set to 0"
                );
            }
            (
                CandidateMatch {
                    video_id: c.video_id.clone(),
                    similarity: similarity.unwrap_or(0.0),
                },
                similarity.is_some(),
            )
        })
        .collect();

    scored.sort_by(|a, b| b.0.similarity.total_cmp(&a.0.similarity));

    let top = scored
        .iter()
        .filter(|(_, valid)| *valid)
        .take(top_k)
        .map(|(m, _)| m.clone())
        .collect();
    let all = scored.into_iter().map(|(m, _)| m).collect();
    (top, all)
}

/// Embed the concept (unless it already carries an embedding) and rank
/// `candidates` against it.
///
/// # Errors
///
/// Returns [`RankingError`] if the embedding provider fails.
pub async fn match_concept<E: TextEmbedder>(
    embedder: &E,
    concept: &ConceptDraft,
    candidates: &[Candidate],
    top_k: usize,
) -> Result<MatchOutcome, RankingError> {
    let concept_embedding = match concept.embedding.clone().filter(|e| !e.is_empty()) {
        Some(existing) => existing,
        None => {
            let mut vectors = embedder.embed(&[concept.embedding_text()]).await?;
            vectors.pop().ok_or(RankingError::CountMismatch {
                expected: 1,
                got: 0,
            })?
        }
    };

    let (top_matches, all_scores) = rank_by_similarity(&concept_embedding, candidates, top_k);
    tracing::info!(
        candidates = candidates.len(),
        matched = top_matches.len(),
        "concept matching complete"
    );

    Ok(MatchOutcome {
        top_matches,
        all_scores,
        concept_embedding,
    })
}
