//! In-memory chunk source for development and testing

use std::path::Path;

use async_trait::async_trait;

use crate::domain::{ChunkRecord, ChunkSource, DomainError};

/// Chunk source backed by a fixed list of records
#[derive(Debug, Clone, Default)]
pub struct InMemoryChunkSource {
    records: Vec<ChunkRecord>,
}

impl InMemoryChunkSource {
    pub fn new(records: Vec<ChunkRecord>) -> Self {
        Self { records }
    }

    /// Load records from a JSON array of `{text, vector_data, source, page}`
    pub async fn from_json_file(path: impl AsRef<Path>) -> Result<Self, DomainError> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
            DomainError::storage(format!("Failed to read seed file {}: {}", path.display(), e))
        })?;

        let records: Vec<ChunkRecord> = serde_json::from_str(&raw).map_err(|e| {
            DomainError::storage(format!("Invalid seed file {}: {}", path.display(), e))
        })?;

        Ok(Self::new(records))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl ChunkSource for InMemoryChunkSource {
    async fn load_records(&self) -> Result<Vec<ChunkRecord>, DomainError> {
        Ok(self.records.clone())
    }

    fn source_type(&self) -> &'static str {
        "in_memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_load_records() {
        let source = InMemoryChunkSource::new(vec![
            ChunkRecord::new("a", "[1.0]", "a.pdf", 1),
            ChunkRecord::new("b", "[0.5]", "b.pdf", 2),
        ]);

        let records = source.load_records().await.unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[1].source, "b.pdf");
    }

    #[tokio::test]
    async fn test_from_json_file() {
        let path = std::env::temp_dir().join(format!("titan-seed-{}.json", std::process::id()));
        tokio::fs::write(
            &path,
            r#"[{"text": "Bảo hành 12 tháng", "vector_data": "[0.1, 0.2]", "source": "policy.pdf", "page": 3}]"#,
        )
        .await
        .unwrap();

        let source = InMemoryChunkSource::from_json_file(&path).await.unwrap();
        tokio::fs::remove_file(&path).await.ok();

        assert_eq!(source.len(), 1);
        let records = source.load_records().await.unwrap();
        assert_eq!(records[0].page, 3);
    }

    #[tokio::test]
    async fn test_from_missing_file() {
        let result = InMemoryChunkSource::from_json_file("/nonexistent/seed.json").await;

        assert!(matches!(result, Err(DomainError::Storage { .. })));
    }
}
