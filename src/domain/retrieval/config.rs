//! Retrieval configuration

use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

/// Matches must score strictly above this cosine similarity
pub const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.55;

/// Number of chunks returned when the caller does not ask for a count
pub const DEFAULT_TOP_K: usize = 3;

/// Upper bound accepted for `top_k`
pub const MAX_TOP_K: usize = 50;

/// Configuration for semantic retrieval
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Minimum cosine similarity (exclusive) for a chunk to be returned
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,

    /// Number of chunks returned per query
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Start loading the cache in the background as soon as the server starts
    #[serde(default = "default_true")]
    pub warmup_on_start: bool,
}

fn default_similarity_threshold() -> f32 {
    DEFAULT_SIMILARITY_THRESHOLD
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

fn default_true() -> bool {
    true
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: default_similarity_threshold(),
            top_k: default_top_k(),
            warmup_on_start: default_true(),
        }
    }
}

impl RetrievalConfig {
    pub fn with_similarity_threshold(mut self, threshold: f32) -> Self {
        self.similarity_threshold = threshold;
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_warmup_on_start(mut self, warmup: bool) -> Self {
        self.warmup_on_start = warmup;
        self
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        validate_top_k(self.top_k)?;
        validate_threshold(self.similarity_threshold)
    }
}

pub fn validate_top_k(top_k: usize) -> Result<(), DomainError> {
    if top_k == 0 || top_k > MAX_TOP_K {
        return Err(DomainError::validation(format!(
            "Invalid top_k {}: must be between 1 and {}",
            top_k, MAX_TOP_K
        )));
    }

    Ok(())
}

pub fn validate_threshold(threshold: f32) -> Result<(), DomainError> {
    if !(-1.0..=1.0).contains(&threshold) {
        return Err(DomainError::validation(format!(
            "Invalid similarity threshold {}: must be between -1.0 and 1.0",
            threshold
        )));
    }

    Ok(())
}
