//! Domain layer - Core retrieval logic and entities

pub mod embedding;
pub mod error;
pub mod knowledge;
pub mod retrieval;

pub use embedding::{EmbeddingProvider, EmbeddingRequest, EmbeddingResponse, EmbeddingTaskType};
pub use error::DomainError;
pub use knowledge::{ChunkRecord, ChunkSource, KnowledgeChunk};
pub use retrieval::{
    CacheState, LoadReport, QueryOutcome, RetrievalCache, RetrievalConfig, RetrievalOutcome,
    SimilarityResult,
};
