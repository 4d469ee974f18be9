//! Chunk source trait definition

use async_trait::async_trait;
use std::fmt::Debug;

#[cfg(test)]
use mockall::automock;

use super::ChunkRecord;
use crate::domain::DomainError;

/// Read-only feed of embedded chunks produced by the ingestion process
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ChunkSource: Send + Sync + Debug {
    /// Read every stored chunk in one bulk query
    async fn load_records(&self) -> Result<Vec<ChunkRecord>, DomainError>;

    /// Short name used in logs
    fn source_type(&self) -> &'static str;
}
