//! Knowledge chunk entity and its raw storage record

use serde::{Deserialize, Serialize};

use crate::domain::embedding::l2_norm;
use crate::domain::DomainError;

/// A raw row of the chunk feed, as stored by the ingestion process
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkRecord {
    /// Chunk text
    pub text: String,
    /// Embedding serialized as a JSON array of numbers
    pub vector_data: String,
    /// File name of the source document
    pub source: String,
    /// Page (or position) index inside the source document
    pub page: i32,
}

impl ChunkRecord {
    pub fn new(
        text: impl Into<String>,
        vector_data: impl Into<String>,
        source: impl Into<String>,
        page: i32,
    ) -> Self {
        Self {
            text: text.into(),
            vector_data: vector_data.into(),
            source: source.into(),
            page,
        }
    }

    /// Build a record from an already decoded vector
    pub fn from_vector(
        text: impl Into<String>,
        vector: &[f32],
        source: impl Into<String>,
        page: i32,
    ) -> Self {
        let vector_data = serde_json::to_string(vector).unwrap_or_else(|_| "[]".to_string());
        Self::new(text, vector_data, source, page)
    }
}

/// An embedded fragment of a source document.
///
/// The Euclidean norm of the embedding is computed once at construction so
/// that scoring a query only needs a dot product per chunk.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KnowledgeChunk {
    text: String,
    #[serde(skip)]
    embedding: Vec<f32>,
    #[serde(skip)]
    norm: f32,
    source: String,
    page: i32,
}

impl KnowledgeChunk {
    pub fn new(text: impl Into<String>, embedding: Vec<f32>, source: impl Into<String>, page: i32) -> Self {
        let norm = l2_norm(&embedding);

        Self {
            text: text.into(),
            embedding,
            norm,
            source: source.into(),
            page,
        }
    }

    /// Decode a stored record. Fails on vectors that are not a JSON array of
    /// finite numbers.
    pub fn from_record(record: ChunkRecord) -> Result<Self, DomainError> {
        let embedding: Vec<f32> = serde_json::from_str(&record.vector_data).map_err(|e| {
            DomainError::malformed_chunk(format!(
                "invalid vector for '{}' page {}: {}",
                record.source, record.page, e
            ))
        })?;

        if let Some(position) = embedding.iter().position(|v| !v.is_finite()) {
            return Err(DomainError::malformed_chunk(format!(
                "non-finite value at position {} for '{}' page {}",
                position, record.source, record.page
            )));
        }

        Ok(Self::new(record.text, embedding, record.source, record.page))
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn embedding(&self) -> &[f32] {
        &self.embedding
    }

    pub fn norm(&self) -> f32 {
        self.norm
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn page(&self) -> i32 {
        self.page
    }

    pub fn dimensions(&self) -> usize {
        self.embedding.len()
    }
}
