//! Semantic retrieval over cached knowledge chunks

mod cache;
mod config;
mod context;
mod result;

pub use cache::{CacheState, LoadReport, RetrievalCache};
pub use config::{
    validate_threshold, validate_top_k, RetrievalConfig, DEFAULT_SIMILARITY_THRESHOLD,
    DEFAULT_TOP_K, MAX_TOP_K,
};
pub use context::{format_context, RetrievalOutcome, CONTEXT_HEADER, NOT_READY_MESSAGE};
pub use result::{QueryOutcome, SimilarityResult};
