//! Chunk source implementations

mod factory;
mod in_memory;
mod postgres;

pub use factory::{ChunkSourceConfig, ChunkSourceFactory, ChunkSourceType};
pub use in_memory::InMemoryChunkSource;
pub use postgres::{PostgresChunkSource, PostgresConfig};
