//! PostgreSQL chunk source

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use tracing::{debug, warn};

use crate::domain::{ChunkRecord, ChunkSource, DomainError};

/// PostgreSQL connection and table configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PostgresConfig {
    /// Database connection URL
    #[serde(default = "default_url")]
    pub url: String,
    /// Maximum number of connections in the pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Table holding chunk text, vectors and page indexes
    #[serde(default = "default_chunks_table")]
    pub chunks_table: String,
    /// Table holding the source documents (file names)
    #[serde(default = "default_materials_table")]
    pub materials_table: String,
}

fn default_url() -> String {
    "postgres://localhost/titan".to_string()
}

fn default_max_connections() -> u32 {
    5
}

fn default_connect_timeout_secs() -> u64 {
    30
}

fn default_chunks_table() -> String {
    "training_knowledge_chunks".to_string()
}

fn default_materials_table() -> String {
    "training_materials".to_string()
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            max_connections: default_max_connections(),
            connect_timeout_secs: default_connect_timeout_secs(),
            chunks_table: default_chunks_table(),
            materials_table: default_materials_table(),
        }
    }
}

impl PostgresConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_tables(mut self, chunks: impl Into<String>, materials: impl Into<String>) -> Self {
        self.chunks_table = chunks.into();
        self.materials_table = materials.into();
        self
    }

    /// Table names are interpolated into SQL, so only plain identifiers
    /// (optionally schema-qualified) are accepted.
    pub fn validate(&self) -> Result<(), DomainError> {
        for name in [&self.chunks_table, &self.materials_table] {
            let valid = !name.is_empty()
                && name
                    .split('.')
                    .all(|part| {
                        !part.is_empty()
                            && part.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
                    });

            if !valid {
                return Err(DomainError::configuration(format!(
                    "Invalid table name '{}'",
                    name
                )));
            }
        }

        Ok(())
    }
}

/// Reads embedded chunks joined with their source document
#[derive(Debug, Clone)]
pub struct PostgresChunkSource {
    pool: PgPool,
    config: PostgresConfig,
}

impl PostgresChunkSource {
    pub fn new(pool: PgPool, config: PostgresConfig) -> Result<Self, DomainError> {
        config.validate()?;
        Ok(Self { pool, config })
    }

    /// Build a source with a lazily connected pool; the first load opens
    /// the connection.
    pub fn connect_lazy(config: PostgresConfig) -> Result<Self, DomainError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .connect_lazy(&config.url)
            .map_err(|e| DomainError::configuration(format!("Invalid database URL: {}", e)))?;

        Self::new(pool, config)
    }

    pub(crate) fn select_sql(&self) -> String {
        format!(
            "SELECT c.chunk_text, c.vector_data, m.file_name, COALESCE(c.page_index, 0)::INT4 AS page_index \
             FROM {} c JOIN {} m ON c.material_id = m.material_id",
            self.config.chunks_table, self.config.materials_table
        )
    }

    fn decode_row(row: &PgRow) -> Result<ChunkRecord, sqlx::Error> {
        let text: Option<String> = row.try_get("chunk_text")?;
        let vector_data: Option<String> = row.try_get("vector_data")?;
        let source: Option<String> = row.try_get("file_name")?;
        let page: i32 = row.try_get("page_index")?;

        Ok(ChunkRecord {
            text: text.unwrap_or_default(),
            // NULL vectors fall through to the parse step and are skipped there
            vector_data: vector_data.unwrap_or_default(),
            source: source.unwrap_or_default(),
            page,
        })
    }
}

#[async_trait]
impl ChunkSource for PostgresChunkSource {
    async fn load_records(&self) -> Result<Vec<ChunkRecord>, DomainError> {
        let sql = self.select_sql();
        debug!(sql = %sql, "Loading knowledge chunks");

        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to load knowledge chunks: {}", e)))?;

        let mut records = Vec::with_capacity(rows.len());

        for row in &rows {
            match Self::decode_row(row) {
                Ok(record) => records.push(record),
                Err(e) => warn!(error = %e, "Skipping undecodable chunk row"),
            }
        }

        Ok(records)
    }

    fn source_type(&self) -> &'static str {
        "postgres"
    }
}
