//! Chunk source factory

use std::sync::Arc;

use serde::Deserialize;
use tracing::info;

use super::{InMemoryChunkSource, PostgresChunkSource, PostgresConfig};
use crate::domain::{ChunkSource, DomainError};

/// Where the cache reads its chunks from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkSourceType {
    #[default]
    Postgres,
    InMemory,
}

/// Chunk source selection
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChunkSourceConfig {
    #[serde(default, rename = "type")]
    pub source_type: ChunkSourceType,

    /// JSON seed file for the in-memory source
    #[serde(default)]
    pub seed_file: Option<String>,
}

/// Factory for creating chunk sources
#[derive(Debug)]
pub struct ChunkSourceFactory;

impl ChunkSourceFactory {
    pub async fn create(
        config: &ChunkSourceConfig,
        database: &PostgresConfig,
    ) -> Result<Arc<dyn ChunkSource>, DomainError> {
        match config.source_type {
            ChunkSourceType::Postgres => {
                info!(
                    chunks_table = %database.chunks_table,
                    materials_table = %database.materials_table,
                    "Using PostgreSQL chunk source"
                );
                Ok(Arc::new(PostgresChunkSource::connect_lazy(database.clone())?))
            }
            ChunkSourceType::InMemory => {
                let source = match &config.seed_file {
                    Some(path) => InMemoryChunkSource::from_json_file(path).await?,
                    None => InMemoryChunkSource::default(),
                };
                info!(records = source.len(), "Using in-memory chunk source");
                Ok(Arc::new(source))
            }
        }
    }
}
