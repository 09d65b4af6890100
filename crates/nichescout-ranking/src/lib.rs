//! Candidate scoring and concept-to-competitor similarity matching.

pub mod embeddings;
pub mod error;
pub mod matcher;
pub mod scorer;
pub mod vector;

pub use embeddings::{EmbeddingClient, TextEmbedder};
pub use error::RankingError;
pub use matcher::{match_concept, rank_by_similarity, MatchOutcome, DEFAULT_TOP_K};
pub use scorer::{score_candidates, ScoringOptions};
pub use vector::cosine_similarity;
