//! Query results

use std::sync::Arc;

use crate::domain::knowledge::KnowledgeChunk;

/// A cached chunk scored against a query
#[derive(Debug, Clone)]
pub struct SimilarityResult {
    pub chunk: Arc<KnowledgeChunk>,
    pub similarity: f32,
}

impl SimilarityResult {
    pub fn new(chunk: Arc<KnowledgeChunk>, similarity: f32) -> Self {
        Self { chunk, similarity }
    }
}

/// Outcome of a cache query.
///
/// `NotReady` means the cache has not finished loading; an empty
/// `Matches` means it is loaded and nothing cleared the threshold.
#[derive(Debug, Clone)]
pub enum QueryOutcome {
    NotReady,
    Matches(Vec<SimilarityResult>),
}

impl QueryOutcome {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Matches(_))
    }

    /// Matches, or `None` when the cache was not ready
    pub fn into_matches(self) -> Option<Vec<SimilarityResult>> {
        match self {
            Self::NotReady => None,
            Self::Matches(matches) => Some(matches),
        }
    }
}
