use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use super::http_client::HttpClient;
use super::{GeminiEmbeddingProvider, OpenAiEmbeddingProvider};
use crate::domain::{DomainError, EmbeddingProvider};

/// Supported embedding backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingProviderType {
    #[default]
    Gemini,
    #[serde(alias = "openai")]
    OpenAi,
}

/// Embedding provider configuration
#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingProviderConfig {
    #[serde(default)]
    pub provider: EmbeddingProviderType,

    #[serde(default)]
    pub api_key: String,

    /// Override of the provider's API base URL
    #[serde(default)]
    pub base_url: Option<String>,

    /// Model name; the provider default when unset
    #[serde(default)]
    pub model: Option<String>,

    /// Requested output dimensionality, for models that support it
    #[serde(default)]
    pub dimensions: Option<usize>,

    /// Upper bound for one embedding call, in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    15
}

impl Default for EmbeddingProviderConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProviderType::default(),
            api_key: String::new(),
            base_url: None,
            model: None,
            dimensions: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl EmbeddingProviderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Factory for creating embedding providers
#[derive(Debug)]
pub struct EmbeddingProviderFactory;

impl EmbeddingProviderFactory {
    /// Create an embedding provider from configuration
    pub fn create(config: &EmbeddingProviderConfig) -> Result<Arc<dyn EmbeddingProvider>, DomainError> {
        if config.api_key.trim().is_empty() {
            return Err(DomainError::configuration(
                "embedding.api_key is required (set APP__EMBEDDING__API_KEY)",
            ));
        }

        // The service applies its own deadline; this one only stops runaway sockets
        let http_client = HttpClient::with_timeout(config.timeout() + Duration::from_secs(5))?;

        match config.provider {
            EmbeddingProviderType::OpenAi => {
                let provider = match &config.base_url {
                    Some(url) => OpenAiEmbeddingProvider::with_base_url(http_client, &config.api_key, url),
                    None => OpenAiEmbeddingProvider::new(http_client, &config.api_key),
                };
                Ok(Arc::new(provider))
            }

            EmbeddingProviderType::Gemini => {
                let provider = match &config.base_url {
                    Some(url) => GeminiEmbeddingProvider::with_base_url(http_client, &config.api_key, url),
                    None => GeminiEmbeddingProvider::new(http_client, &config.api_key),
                };
                Ok(Arc::new(provider))
            }
        }
    }
}
