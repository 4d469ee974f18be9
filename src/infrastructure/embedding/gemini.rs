//! Google Gemini embedding provider implementation

use async_trait::async_trait;
use serde::Deserialize;

use super::HttpClientTrait;
use crate::domain::embedding::{
    Embedding, EmbeddingInput, EmbeddingProvider, EmbeddingRequest, EmbeddingResponse,
    EmbeddingUsage,
};
use crate::domain::DomainError;

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

const EMBEDDING_MODELS: &[(&str, usize)] = &[
    ("gemini-embedding-001", 3072),
    ("text-embedding-004", 768),
];

/// Gemini embedding provider.
///
/// Single inputs use `:embedContent`, batches use `:batchEmbedContents`.
/// The request task type is forwarded as `taskType`.
#[derive(Debug)]
pub struct GeminiEmbeddingProvider<C: HttpClientTrait> {
    client: C,
    api_key: String,
    base_url: String,
}

impl<C: HttpClientTrait> GeminiEmbeddingProvider<C> {
    pub fn new(client: C, api_key: impl Into<String>) -> Self {
        Self::with_base_url(client, api_key, DEFAULT_GEMINI_BASE_URL)
    }

    pub fn with_base_url(
        client: C,
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn model_path(model: &str) -> String {
        if model.starts_with("models/") {
            model.to_string()
        } else {
            format!("models/{}", model)
        }
    }

    fn url(&self, model: &str, method: &str) -> String {
        format!("{}/v1beta/{}:{}", self.base_url, Self::model_path(model), method)
    }

    fn headers(&self) -> Vec<(&str, &str)> {
        vec![
            ("x-goog-api-key", self.api_key.as_str()),
            ("Content-Type", "application/json"),
        ]
    }

    fn content_body(request: &EmbeddingRequest, text: &str) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": Self::model_path(request.model()),
            "content": { "parts": [{ "text": text }] },
        });

        if let Some(task_type) = request.task_type() {
            body["taskType"] = serde_json::json!(task_type.as_gemini_str());
        }

        if let Some(dims) = request.dimensions() {
            body["outputDimensionality"] = serde_json::json!(dims);
        }

        body
    }

    async fn embed_single(
        &self,
        request: &EmbeddingRequest,
        text: &str,
    ) -> Result<Vec<Embedding>, DomainError> {
        let body = Self::content_body(request, text);
        let json = self
            .client
            .post_json(&self.url(request.model(), "embedContent"), self.headers(), &body)
            .await?;

        let response: GeminiEmbedResponse = serde_json::from_value(json).map_err(|e| {
            DomainError::provider("gemini", format!("Failed to parse embedding response: {}", e))
        })?;

        Ok(vec![Embedding::new(0, response.embedding.values)])
    }

    async fn embed_batch(
        &self,
        request: &EmbeddingRequest,
        texts: &[String],
    ) -> Result<Vec<Embedding>, DomainError> {
        let requests: Vec<serde_json::Value> = texts
            .iter()
            .map(|text| Self::content_body(request, text))
            .collect();
        let body = serde_json::json!({ "requests": requests });

        let json = self
            .client
            .post_json(&self.url(request.model(), "batchEmbedContents"), self.headers(), &body)
            .await?;

        let response: GeminiBatchEmbedResponse = serde_json::from_value(json).map_err(|e| {
            DomainError::provider("gemini", format!("Failed to parse embedding response: {}", e))
        })?;

        Ok(response
            .embeddings
            .into_iter()
            .enumerate()
            .map(|(idx, values)| Embedding::new(idx, values.values))
            .collect())
    }
}

#[async_trait]
impl<C: HttpClientTrait> EmbeddingProvider for GeminiEmbeddingProvider<C> {
    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse, DomainError> {
        let embeddings = match request.input() {
            EmbeddingInput::Single(text) => self.embed_single(&request, text).await?,
            EmbeddingInput::Batch(texts) => self.embed_batch(&request, texts).await?,
        };

        // Gemini does not report token usage for embeddings
        Ok(EmbeddingResponse::new(
            request.model().to_string(),
            embeddings,
            EmbeddingUsage::default(),
        ))
    }

    fn provider_name(&self) -> &'static str {
        "gemini"
    }

    fn default_model(&self) -> &'static str {
        "gemini-embedding-001"
    }

    fn dimensions(&self, model: &str) -> Option<usize> {
        let name = model.trim_start_matches("models/");

        EMBEDDING_MODELS
            .iter()
            .find(|(known, _)| *known == name)
            .map(|(_, dims)| *dims)
    }
}

#[derive(Debug, Deserialize)]
struct GeminiEmbedResponse {
    embedding: GeminiValues,
}

#[derive(Debug, Deserialize)]
struct GeminiBatchEmbedResponse {
    embeddings: Vec<GeminiValues>,
}

#[derive(Debug, Deserialize)]
struct GeminiValues {
    values: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::embedding::EmbeddingTaskType;
    use crate::infrastructure::embedding::MockHttpClient;

    const EMBED_URL: &str =
        "https://generativelanguage.googleapis.com/v1beta/models/gemini-embedding-001:embedContent";
    const BATCH_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models/gemini-embedding-001:batchEmbedContents";

    #[tokio::test]
    async fn test_embed_single_sends_task_type() {
        let client = MockHttpClient::new().with_response(
            EMBED_URL,
            serde_json::json!({"embedding": {"values": [0.25, -0.5]}}),
        );
        let provider = GeminiEmbeddingProvider::new(client, "gm-key");

        let request = EmbeddingRequest::single("gemini-embedding-001", "chính sách bảo hành")
            .with_task_type(EmbeddingTaskType::RetrievalQuery);
        let response = provider.embed(request).await.unwrap();

        assert_eq!(response.first().unwrap().vector(), &[0.25, -0.5]);

        let (_, body) = provider.client.requests().remove(0);
        assert_eq!(body["taskType"], "RETRIEVAL_QUERY");
        assert_eq!(body["model"], "models/gemini-embedding-001");
        assert_eq!(body["content"]["parts"][0]["text"], "chính sách bảo hành");
    }

    #[tokio::test]
    async fn test_embed_batch() {
        let client = MockHttpClient::new().with_response(
            BATCH_URL,
            serde_json::json!({"embeddings": [{"values": [1.0]}, {"values": [2.0]}]}),
        );
        let provider = GeminiEmbeddingProvider::new(client, "gm-key");

        let request =
            EmbeddingRequest::batch("models/gemini-embedding-001", vec!["a".into(), "b".into()]);
        let response = provider.embed(request).await.unwrap();

        assert_eq!(response.embeddings().len(), 2);
        assert_eq!(response.embeddings()[1].index(), 1);
        assert_eq!(response.embeddings()[1].vector(), &[2.0]);

        let (_, body) = provider.client.requests().remove(0);
        assert_eq!(body["requests"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_output_dimensionality() {
        let client = MockHttpClient::new()
            .with_response(EMBED_URL, serde_json::json!({"embedding": {"values": [1.0]}}));
        let provider = GeminiEmbeddingProvider::new(client, "gm-key");

        let request = EmbeddingRequest::single("gemini-embedding-001", "x").with_dimensions(768);
        provider.embed(request).await.unwrap();

        let (_, body) = provider.client.requests().remove(0);
        assert_eq!(body["outputDimensionality"], 768);
        assert!(body.get("taskType").is_none());
    }

    #[tokio::test]
    async fn test_embed_error() {
        let client = MockHttpClient::new().with_error(EMBED_URL, "quota exceeded");
        let provider = GeminiEmbeddingProvider::new(client, "gm-key");

        let request = EmbeddingRequest::single("gemini-embedding-001", "x");

        assert!(provider.embed(request).await.is_err());
    }

    #[tokio::test]
    async fn test_malformed_response() {
        let client = MockHttpClient::new().with_response(EMBED_URL, serde_json::json!({"oops": 1}));
        let provider = GeminiEmbeddingProvider::new(client, "gm-key");

        let request = EmbeddingRequest::single("gemini-embedding-001", "x");
        let err = provider.embed(request).await.unwrap_err();

        assert!(matches!(err, DomainError::Provider { .. }));
    }

    #[test]
    fn test_provider_info() {
        let provider = GeminiEmbeddingProvider::new(MockHttpClient::new(), "k");

        assert_eq!(provider.provider_name(), "gemini");
        assert_eq!(provider.default_model(), "gemini-embedding-001");
        assert_eq!(provider.dimensions("models/gemini-embedding-001"), Some(3072));
        assert_eq!(provider.dimensions("text-embedding-004"), Some(768));
        assert_eq!(provider.dimensions("unknown"), None);
    }
}
