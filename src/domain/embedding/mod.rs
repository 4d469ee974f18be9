//! Embedding provider domain models and traits

mod provider;
mod request;
mod response;

pub use provider::EmbeddingProvider;
pub use request::{EmbeddingInput, EmbeddingRequest, EmbeddingTaskType};
pub use response::{
    cosine_similarity, dot, l2_norm, Embedding, EmbeddingResponse, EmbeddingUsage,
};

#[cfg(test)]
pub use provider::mock::MockEmbeddingProvider;
