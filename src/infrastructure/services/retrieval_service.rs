//! Retrieval service
//!
//! Turns a free-text question into a prompt context block: embeds the
//! question, scores it against the in-memory cache and formats the best
//! matches. Embedding failures are logged and reported as "no matches";
//! they never reach the caller as errors.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info};

use crate::domain::embedding::{Embedding, EmbeddingProvider, EmbeddingRequest, EmbeddingTaskType};
use crate::domain::retrieval::{
    validate_threshold, validate_top_k, QueryOutcome, RetrievalCache, RetrievalConfig,
    RetrievalOutcome,
};
use crate::domain::DomainError;

const DEFAULT_EMBEDDING_TIMEOUT: Duration = Duration::from_secs(15);

/// Per-call overrides of the configured retrieval settings
#[derive(Debug, Clone, Copy, Default)]
pub struct SearchOptions {
    pub top_k: Option<usize>,
    pub similarity_threshold: Option<f32>,
}

impl SearchOptions {
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = Some(top_k);
        self
    }

    pub fn with_similarity_threshold(mut self, threshold: f32) -> Self {
        self.similarity_threshold = Some(threshold);
        self
    }
}

/// Semantic search over the retrieval cache
#[derive(Debug)]
pub struct RetrievalService {
    cache: Arc<RetrievalCache>,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    config: RetrievalConfig,
    embedding_model: String,
    embedding_dimensions: Option<usize>,
    embedding_timeout: Duration,
}

impl RetrievalService {
    /// Create a service using the provider's default model
    pub fn new(
        cache: Arc<RetrievalCache>,
        embedding_provider: Arc<dyn EmbeddingProvider>,
        config: RetrievalConfig,
    ) -> Self {
        let embedding_model = embedding_provider.default_model().to_string();

        Self {
            cache,
            embedding_provider,
            config,
            embedding_model,
            embedding_dimensions: None,
            embedding_timeout: DEFAULT_EMBEDDING_TIMEOUT,
        }
    }

    pub fn with_embedding_model(mut self, model: impl Into<String>) -> Self {
        self.embedding_model = model.into();
        self
    }

    pub fn with_embedding_dimensions(mut self, dimensions: Option<usize>) -> Self {
        self.embedding_dimensions = dimensions;
        self
    }

    pub fn with_embedding_timeout(mut self, timeout: Duration) -> Self {
        self.embedding_timeout = timeout;
        self
    }

    pub fn cache(&self) -> &Arc<RetrievalCache> {
        &self.cache
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// Search the cache for chunks relevant to `query`.
    ///
    /// Returns `Err` only for invalid arguments.
    pub async fn search(
        &self,
        query: &str,
        options: SearchOptions,
    ) -> Result<RetrievalOutcome, DomainError> {
        let top_k = options.top_k.unwrap_or(self.config.top_k);
        let threshold = options
            .similarity_threshold
            .unwrap_or(self.config.similarity_threshold);

        if query.trim().is_empty() {
            return Err(DomainError::validation("Query text cannot be empty"));
        }
        validate_top_k(top_k)?;
        validate_threshold(threshold)?;

        // Checked before embedding so warm-up requests cost nothing upstream
        if !self.cache.is_ready() {
            info!(state = ?self.cache.state(), "Retrieval requested before cache is ready");
            return Ok(RetrievalOutcome::not_ready());
        }

        let query_vector = match self.embed_query(query).await {
            Ok(vector) => vector,
            Err(e) => {
                error!(
                    provider = self.embedding_provider.provider_name(),
                    error = %e,
                    "Query embedding failed; returning no matches"
                );
                return Ok(RetrievalOutcome::NoMatches);
            }
        };

        let matches = match self.cache.query(&query_vector, top_k, threshold) {
            QueryOutcome::NotReady => return Ok(RetrievalOutcome::not_ready()),
            QueryOutcome::Matches(matches) => matches,
        };

        debug!(
            matches = matches.len(),
            best = ?matches.first().map(|m| m.similarity),
            "Retrieval finished"
        );

        Ok(RetrievalOutcome::from_matches(matches))
    }

    /// Prompt-ready text for `query` with default settings: the context
    /// block, the wait message, or an empty string.
    pub async fn context_for(&self, query: &str) -> String {
        match self.search(query, SearchOptions::default()).await {
            Ok(outcome) => outcome.prompt_text().to_string(),
            Err(e) => {
                debug!(error = %e, "Rejected retrieval query");
                String::new()
            }
        }
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, DomainError> {
        let mut request = EmbeddingRequest::single(&self.embedding_model, text)
            .with_task_type(EmbeddingTaskType::RetrievalQuery);

        if let Some(dimensions) = self.embedding_dimensions {
            request = request.with_dimensions(dimensions);
        }

        let response = tokio::time::timeout(
            self.embedding_timeout,
            self.embedding_provider.embed(request),
        )
        .await
        .map_err(|_| {
            DomainError::provider(
                self.embedding_provider.provider_name(),
                format!("Embedding timed out after {:?}", self.embedding_timeout),
            )
        })??;

        response
            .into_embeddings()
            .into_iter()
            .next()
            .map(Embedding::into_vector)
            .ok_or_else(|| DomainError::internal("No embedding returned"))
    }
}
