//! Titan retrieval service
//!
//! Keeps every embedded document chunk of the knowledge base in memory and
//! answers free-text questions with the most similar chunks, formatted as a
//! context block for a language-model prompt.
//! - Chunks are read once from PostgreSQL (or a JSON seed file)
//! - Queries are embedded with Gemini or OpenAI
//! - Served over HTTP or from the command line

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;

use tracing::info;

use api::state::AppState;
use domain::RetrievalCache;
use infrastructure::embedding::{
    EmbeddingProviderConfig, EmbeddingProviderFactory, EmbeddingProviderType,
};
use infrastructure::knowledge::ChunkSourceFactory;
use infrastructure::services::RetrievalService;

/// Create the application state with default configuration
pub async fn create_app_state() -> anyhow::Result<AppState> {
    create_app_state_with_config(&AppConfig::default()).await
}

/// Create the application state with custom configuration.
///
/// Nothing is read from the database here; the cache starts empty and is
/// filled by a warm-up.
pub async fn create_app_state_with_config(config: &AppConfig) -> anyhow::Result<AppState> {
    config.retrieval.validate()?;

    let retrieval_service = create_retrieval_service(config).await?;

    Ok(AppState::new(Arc::new(retrieval_service)))
}

/// Wire the chunk source, cache and embedding provider together
pub async fn create_retrieval_service(config: &AppConfig) -> anyhow::Result<RetrievalService> {
    let source = ChunkSourceFactory::create(&config.source, &config.database).await?;
    let cache = Arc::new(RetrievalCache::new(source));

    let embedding_config = resolve_embedding_config(&config.embedding);
    let provider = EmbeddingProviderFactory::create(&embedding_config)?;

    info!(
        provider = provider.provider_name(),
        model = embedding_config.model.as_deref().unwrap_or(provider.default_model()),
        "Embedding provider configured"
    );

    let mut service = RetrievalService::new(cache, provider, config.retrieval.clone())
        .with_embedding_dimensions(embedding_config.dimensions)
        .with_embedding_timeout(embedding_config.timeout());

    if let Some(model) = &embedding_config.model {
        service = service.with_embedding_model(model);
    }

    Ok(service)
}

/// Fall back to the provider's conventional environment variable when no
/// key is configured
fn resolve_embedding_config(config: &EmbeddingProviderConfig) -> EmbeddingProviderConfig {
    let mut resolved = config.clone();

    if resolved.api_key.trim().is_empty() {
        let var = match resolved.provider {
            EmbeddingProviderType::Gemini => "GEMINI_API_KEY",
            EmbeddingProviderType::OpenAi => "OPENAI_API_KEY",
        };

        if let Ok(key) = std::env::var(var) {
            info!("Using embedding API key from {}", var);
            resolved.api_key = key;
        }
    }

    resolved
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CacheState;
    use crate::infrastructure::knowledge::ChunkSourceType;

    fn in_memory_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.source.source_type = ChunkSourceType::InMemory;
        config.embedding.api_key = "test-key".to_string();
        config
    }

    #[tokio::test]
    async fn test_create_app_state_starts_uninitialized() {
        let state = create_app_state_with_config(&in_memory_config()).await.unwrap();

        assert_eq!(state.cache().state(), CacheState::Uninitialized);
        assert_eq!(state.retrieval_service.config().top_k, 3);
    }

    #[tokio::test]
    async fn test_create_app_state_rejects_bad_retrieval_config() {
        let mut config = in_memory_config();
        config.retrieval.top_k = 0;

        assert!(create_app_state_with_config(&config).await.is_err());
    }

    #[test]
    fn test_configured_key_wins_over_environment() {
        let config = EmbeddingProviderConfig {
            api_key: "configured".to_string(),
            ..Default::default()
        };

        assert_eq!(resolve_embedding_config(&config).api_key, "configured");
    }
}
