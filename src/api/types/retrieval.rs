//! Retrieval API types

use serde::{Deserialize, Serialize};

use crate::domain::{CacheState, LoadReport, RetrievalOutcome, SimilarityResult};

/// POST /v1/retrieval/search body
#[derive(Debug, Clone, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default)]
    pub top_k: Option<usize>,
    #[serde(default)]
    pub similarity_threshold: Option<f32>,
}

/// Outcome discriminator of a search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStatus {
    NotReady,
    NoMatches,
    Found,
}

/// One matched chunk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchDto {
    pub source: String,
    pub page: i32,
    pub similarity: f32,
    pub text: String,
}

impl From<&SimilarityResult> for MatchDto {
    fn from(result: &SimilarityResult) -> Self {
        Self {
            source: result.chunk.source().to_string(),
            page: result.chunk.page(),
            similarity: result.similarity,
            text: result.chunk.text().to_string(),
        }
    }
}

/// Search response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub status: SearchStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub matches: Vec<MatchDto>,
}

impl From<RetrievalOutcome> for SearchResponse {
    fn from(outcome: RetrievalOutcome) -> Self {
        match outcome {
            RetrievalOutcome::NotReady { message } => Self {
                status: SearchStatus::NotReady,
                message: Some(message),
                context: None,
                matches: Vec::new(),
            },
            RetrievalOutcome::NoMatches => Self {
                status: SearchStatus::NoMatches,
                message: None,
                context: None,
                matches: Vec::new(),
            },
            RetrievalOutcome::Found { context, matches } => Self {
                status: SearchStatus::Found,
                message: None,
                context: Some(context),
                matches: matches.iter().map(MatchDto::from).collect(),
            },
        }
    }
}

/// GET /v1/retrieval/status response
#[derive(Debug, Clone, Serialize)]
pub struct CacheStatusResponse {
    pub state: CacheState,
    pub chunks: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<LoadReport>,
}

/// POST /v1/retrieval/warmup response
#[derive(Debug, Clone, Serialize)]
pub struct WarmupResponse {
    pub state: CacheState,
    pub started: bool,
}
