//! Embedding provider implementations

mod factory;
mod gemini;
mod http_client;
mod openai;

pub use factory::{EmbeddingProviderConfig, EmbeddingProviderFactory, EmbeddingProviderType};
pub use gemini::GeminiEmbeddingProvider;
pub use http_client::{HttpClient, HttpClientTrait};
pub use openai::OpenAiEmbeddingProvider;

#[cfg(test)]
pub use http_client::mock::MockHttpClient;
