//! Knowledge chunks and the feed they are loaded from

mod chunk;
mod source;

pub use chunk::{ChunkRecord, KnowledgeChunk};
pub use source::ChunkSource;

#[cfg(test)]
pub use source::MockChunkSource;
