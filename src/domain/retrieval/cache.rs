//! In-memory retrieval cache over embedded knowledge chunks
//!
//! The cache is filled exactly once from a [`ChunkSource`] and then serves
//! read-only nearest-neighbour queries by linear-scan cosine similarity.
//! Lifecycle: `Uninitialized -> Populating -> Ready`. A failed bulk read
//! drops back to `Uninitialized` so that a later `populate` can retry.

use std::cmp::Ordering as CmpOrdering;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::OnceCell;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::{QueryOutcome, SimilarityResult};
use crate::domain::embedding::{dot, l2_norm};
use crate::domain::knowledge::{ChunkSource, KnowledgeChunk};
use crate::domain::DomainError;

/// Lifecycle state of the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheState {
    Uninitialized,
    Populating,
    Ready,
}

/// Summary of a completed load
#[derive(Debug, Clone, Serialize)]
pub struct LoadReport {
    pub rows_read: usize,
    pub chunks_loaded: usize,
    pub rows_skipped: usize,
    pub duration_ms: u64,
    pub loaded_at: DateTime<Utc>,
}

#[derive(Debug)]
struct Snapshot {
    chunks: Vec<Arc<KnowledgeChunk>>,
    report: LoadReport,
}

/// Resets the populating flag unless the load completed
struct PopulatingGuard<'a> {
    flag: &'a AtomicBool,
    armed: bool,
}

impl<'a> PopulatingGuard<'a> {
    fn enter(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self { flag, armed: true }
    }

    fn complete(mut self) {
        self.armed = false;
    }
}

impl Drop for PopulatingGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.flag.store(false, Ordering::SeqCst);
        }
    }
}

/// Owned by a warm-up task; releases the claim if the task fails or is
/// dropped before the load completes
struct WarmupClaim {
    cache: Arc<RetrievalCache>,
    armed: bool,
}

impl WarmupClaim {
    fn complete(mut self) {
        self.armed = false;
    }
}

impl Drop for WarmupClaim {
    fn drop(&mut self) {
        if self.armed {
            self.cache.warmup_claimed.store(false, Ordering::SeqCst);
        }
    }
}

/// Process-wide cache of embedded chunks, shared behind an `Arc`
pub struct RetrievalCache {
    source: Arc<dyn ChunkSource>,
    snapshot: OnceCell<Snapshot>,
    populating: AtomicBool,
    warmup_claimed: AtomicBool,
}

impl std::fmt::Debug for RetrievalCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetrievalCache")
            .field("source", &self.source.source_type())
            .field("state", &self.state())
            .field("chunks", &self.len())
            .finish()
    }
}

impl RetrievalCache {
    /// Create an empty cache reading from the given source
    pub fn new(source: Arc<dyn ChunkSource>) -> Self {
        Self {
            source,
            snapshot: OnceCell::new(),
            populating: AtomicBool::new(false),
            warmup_claimed: AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> CacheState {
        if self.snapshot.initialized() {
            CacheState::Ready
        } else if self.populating.load(Ordering::SeqCst)
            || self.warmup_claimed.load(Ordering::SeqCst)
        {
            CacheState::Populating
        } else {
            CacheState::Uninitialized
        }
    }

    pub fn is_ready(&self) -> bool {
        self.snapshot.initialized()
    }

    /// Number of cached chunks (0 until ready)
    pub fn len(&self) -> usize {
        self.snapshot.get().map_or(0, |s| s.chunks.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Report of the completed load, if any
    pub fn report(&self) -> Option<&LoadReport> {
        self.snapshot.get().map(|s| &s.report)
    }

    /// Load every chunk from the source, once.
    ///
    /// Concurrent callers share a single load; once ready, further calls
    /// return the existing report without touching the source.
    pub async fn populate(&self) -> Result<LoadReport, DomainError> {
        let snapshot = self.snapshot.get_or_try_init(|| self.load()).await?;
        Ok(snapshot.report.clone())
    }

    /// Run [`populate`](Self::populate) on a background task.
    ///
    /// The cache reports `Populating` from the moment this returns.
    pub fn spawn_warmup(self: &Arc<Self>) -> JoinHandle<Result<LoadReport, DomainError>> {
        self.warmup_claimed.store(true, Ordering::SeqCst);
        self.spawn_claimed()
    }

    /// Start a background load unless one is already running or done.
    ///
    /// Returns `None` when another caller holds the warm-up claim or the
    /// cache is ready. A failed load releases the claim.
    pub fn try_spawn_warmup(
        self: &Arc<Self>,
    ) -> Option<JoinHandle<Result<LoadReport, DomainError>>> {
        if self.is_ready() {
            return None;
        }

        self.warmup_claimed
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()?;

        Some(self.spawn_claimed())
    }

    fn spawn_claimed(self: &Arc<Self>) -> JoinHandle<Result<LoadReport, DomainError>> {
        let claim = WarmupClaim {
            cache: Arc::clone(self),
            armed: true,
        };

        tokio::spawn(async move {
            let cache = Arc::clone(&claim.cache);

            info!(
                source = cache.source.source_type(),
                "Loading retrieval cache in the background"
            );

            let result = cache.populate().await;

            match &result {
                Ok(_) => claim.complete(),
                Err(e) => error!(error = %e, "Retrieval cache warm-up failed"),
            }

            result
        })
    }

    /// Score every cached chunk against `query_vector` and return the
    /// `top_k` best whose similarity is strictly above `similarity_threshold`.
    pub fn query(&self, query_vector: &[f32], top_k: usize, similarity_threshold: f32) -> QueryOutcome {
        match self.snapshot.get() {
            Some(snapshot) => QueryOutcome::Matches(rank(
                &snapshot.chunks,
                query_vector,
                top_k,
                similarity_threshold,
            )),
            None => QueryOutcome::NotReady,
        }
    }

    async fn load(&self) -> Result<Snapshot, DomainError> {
        let guard = PopulatingGuard::enter(&self.populating);
        let start = Instant::now();

        let records = self.source.load_records().await.map_err(|e| {
            error!(error = %e, "Failed to read knowledge chunks");
            match e {
                DomainError::Storage { .. } => e,
                other => DomainError::storage(other.to_string()),
            }
        })?;

        let rows_read = records.len();
        let mut chunks = Vec::with_capacity(rows_read);

        for record in records {
            match KnowledgeChunk::from_record(record) {
                Ok(chunk) => chunks.push(Arc::new(chunk)),
                Err(e) => warn!(error = %e, "Skipping knowledge chunk"),
            }
        }

        let report = LoadReport {
            rows_read,
            chunks_loaded: chunks.len(),
            rows_skipped: rows_read - chunks.len(),
            duration_ms: start.elapsed().as_millis() as u64,
            loaded_at: Utc::now(),
        };

        info!(
            rows_read = report.rows_read,
            chunks_loaded = report.chunks_loaded,
            rows_skipped = report.rows_skipped,
            duration_ms = report.duration_ms,
            "Retrieval cache ready"
        );

        guard.complete();

        Ok(Snapshot { chunks, report })
    }
}

fn rank(
    chunks: &[Arc<KnowledgeChunk>],
    query_vector: &[f32],
    top_k: usize,
    similarity_threshold: f32,
) -> Vec<SimilarityResult> {
    let query_norm = l2_norm(query_vector);

    if query_norm == 0.0 || top_k == 0 {
        debug!("Zero-norm query or empty top_k; nothing to score");
        return Vec::new();
    }

    let mut results: Vec<SimilarityResult> = chunks
        .iter()
        .filter(|chunk| chunk.norm() > 0.0 && chunk.dimensions() == query_vector.len())
        .filter_map(|chunk| {
            let similarity = dot(query_vector, chunk.embedding()) / (query_norm * chunk.norm());
            (similarity > similarity_threshold)
                .then(|| SimilarityResult::new(Arc::clone(chunk), similarity))
        })
        .collect();

    results.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(CmpOrdering::Equal)
    });
    results.truncate(top_k);

    results
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::sync::Notify;

    use super::*;
    use crate::domain::knowledge::{ChunkRecord, MockChunkSource};
    use crate::domain::retrieval::DEFAULT_SIMILARITY_THRESHOLD;

    fn record(text: &str, vector: &[f32], page: i32) -> ChunkRecord {
        ChunkRecord::from_vector(text, vector, "handbook.pdf", page)
    }

    /// Unit vector in the plane whose cosine with [1, 0] is `similarity`
    fn at_similarity(similarity: f32) -> Vec<f32> {
        vec![similarity, (1.0 - similarity * similarity).sqrt()]
    }

    fn source_with(records: Vec<ChunkRecord>) -> Arc<dyn ChunkSource> {
        let mut source = MockChunkSource::new();
        source
            .expect_load_records()
            .returning(move || Ok(records.clone()));
        source.expect_source_type().return_const("mock");
        Arc::new(source)
    }

    async fn ready_cache(records: Vec<ChunkRecord>) -> RetrievalCache {
        let cache = RetrievalCache::new(source_with(records));
        cache.populate().await.unwrap();
        cache
    }

    fn texts(outcome: QueryOutcome) -> Vec<String> {
        outcome
            .into_matches()
            .unwrap()
            .iter()
            .map(|r| r.chunk.text().to_string())
            .collect()
    }

    /// Blocks in `load_records` until released
    #[derive(Debug)]
    struct GatedSource {
        gate: Arc<Notify>,
        records: Vec<ChunkRecord>,
    }

    #[async_trait]
    impl ChunkSource for GatedSource {
        async fn load_records(&self) -> Result<Vec<ChunkRecord>, DomainError> {
            self.gate.notified().await;
            Ok(self.records.clone())
        }

        fn source_type(&self) -> &'static str {
            "gated"
        }
    }

    #[tokio::test]
    async fn test_threshold_and_top_k_scenario() {
        let cache = ready_cache(vec![
            record("C", &at_similarity(0.5), 3),
            record("A", &at_similarity(0.9), 1),
            record("B", &at_similarity(0.7), 2),
        ])
        .await;

        let outcome = cache.query(&[1.0, 0.0], 2, DEFAULT_SIMILARITY_THRESHOLD);

        assert_eq!(texts(outcome), vec!["A", "B"]);
    }

    #[tokio::test]
    async fn test_below_threshold_excluded_even_with_room() {
        let cache = ready_cache(vec![
            record("A", &at_similarity(0.9), 1),
            record("C", &at_similarity(0.5), 3),
        ])
        .await;

        let outcome = cache.query(&[1.0, 0.0], 5, DEFAULT_SIMILARITY_THRESHOLD);

        assert_eq!(texts(outcome), vec!["A"]);
    }

    #[tokio::test]
    async fn test_threshold_is_strict() {
        let cache = ready_cache(vec![record("exact", &[1.0, 0.0], 1)]).await;

        let outcome = cache.query(&[1.0, 0.0], 3, 1.0);

        assert!(outcome.into_matches().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_results_sorted_bounded_and_above_threshold() {
        let records: Vec<ChunkRecord> = (0..40)
            .map(|i| {
                let angle = i as f32 * 0.04;
                record(&format!("chunk-{i}"), &[angle.cos(), angle.sin()], i)
            })
            .collect();
        let cache = ready_cache(records).await;

        for top_k in [1, 3, 10, 100] {
            let matches = cache
                .query(&[0.8, 0.6], top_k, DEFAULT_SIMILARITY_THRESHOLD)
                .into_matches()
                .unwrap();

            assert!(matches.len() <= top_k);
            assert!(matches.iter().all(|m| m.similarity > DEFAULT_SIMILARITY_THRESHOLD));
            assert!(matches.windows(2).all(|w| w[0].similarity >= w[1].similarity));
        }
    }

    #[tokio::test]
    async fn test_zero_query_vector_returns_empty() {
        let cache = ready_cache(vec![record("A", &[1.0, 0.0], 1)]).await;

        let outcome = cache.query(&[0.0, 0.0], 3, DEFAULT_SIMILARITY_THRESHOLD);

        assert!(outcome.is_ready());
        assert!(outcome.into_matches().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_zero_norm_chunk_never_scored() {
        let cache = ready_cache(vec![
            record("zero", &[0.0, 0.0], 1),
            record("real", &[1.0, 0.0], 2),
        ])
        .await;

        let outcome = cache.query(&[1.0, 0.0], 3, -1.0);

        assert_eq!(texts(outcome), vec!["real"]);
    }

    #[tokio::test]
    async fn test_dimension_mismatch_skipped() {
        let cache = ready_cache(vec![
            record("short", &[1.0, 0.0], 1),
            record("long", &[1.0, 0.0, 0.0], 2),
        ])
        .await;

        let outcome = cache.query(&[1.0, 0.0, 0.0], 3, DEFAULT_SIMILARITY_THRESHOLD);

        assert_eq!(texts(outcome), vec!["long"]);
    }

    #[tokio::test]
    async fn test_top_k_zero_returns_empty() {
        let cache = ready_cache(vec![record("A", &[1.0, 0.0], 1)]).await;

        assert!(cache.query(&[1.0, 0.0], 0, 0.0).into_matches().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_query_before_populate_is_not_ready() {
        let cache = RetrievalCache::new(source_with(vec![record("A", &[1.0, 0.0], 1)]));

        assert_eq!(cache.state(), CacheState::Uninitialized);
        assert!(matches!(cache.query(&[1.0, 0.0], 3, 0.0), QueryOutcome::NotReady));
        assert!(matches!(cache.query(&[0.0, 0.0], 3, 0.0), QueryOutcome::NotReady));
        assert!(cache.report().is_none());
    }

    #[tokio::test]
    async fn test_populate_reads_source_once() {
        let mut source = MockChunkSource::new();
        source
            .expect_load_records()
            .times(1)
            .returning(|| Ok(vec![record("A", &[1.0, 0.0], 1)]));
        source.expect_source_type().return_const("mock");
        let cache = RetrievalCache::new(Arc::new(source));

        let first = cache.populate().await.unwrap();
        let second = cache.populate().await.unwrap();

        assert_eq!(first.chunks_loaded, 1);
        assert_eq!(second.loaded_at, first.loaded_at);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.state(), CacheState::Ready);
    }

    #[tokio::test]
    async fn test_concurrent_populate_reads_source_once() {
        let mut source = MockChunkSource::new();
        source
            .expect_load_records()
            .times(1)
            .returning(|| Ok(vec![record("A", &[1.0, 0.0], 1), record("B", &[0.0, 1.0], 2)]));
        source.expect_source_type().return_const("mock");
        let cache = Arc::new(RetrievalCache::new(Arc::new(source)));

        let handles: Vec<_> = (0..8).map(|_| cache.spawn_warmup()).collect();
        let results = futures::future::join_all(handles).await;

        for result in results {
            assert_eq!(result.unwrap().unwrap().chunks_loaded, 2);
        }
        assert_eq!(cache.len(), 2);
    }

    #[tokio::test]
    async fn test_malformed_row_skipped() {
        let cache = ready_cache(vec![
            ChunkRecord::new("broken", "[0.1, oops", "bad.pdf", 1),
            record("valid", &[1.0, 0.0], 2),
        ])
        .await;

        let report = cache.report().unwrap();
        assert_eq!(report.rows_read, 2);
        assert_eq!(report.chunks_loaded, 1);
        assert_eq!(report.rows_skipped, 1);
        assert_eq!(cache.len(), 1);
        assert_eq!(texts(cache.query(&[1.0, 0.0], 3, 0.0)), vec!["valid"]);
    }

    #[tokio::test]
    async fn test_empty_source_is_ready_with_no_matches() {
        let cache = ready_cache(vec![]).await;

        assert_eq!(cache.state(), CacheState::Ready);
        assert!(cache.is_empty());
        assert!(cache.query(&[1.0], 3, 0.0).into_matches().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_read_can_be_retried() {
        let mut source = MockChunkSource::new();
        let mut seq = mockall::Sequence::new();
        source
            .expect_load_records()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Err(DomainError::storage("connection reset")));
        source
            .expect_load_records()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(vec![record("A", &[1.0, 0.0], 1)]));
        source.expect_source_type().return_const("mock");
        let cache = RetrievalCache::new(Arc::new(source));

        let err = cache.populate().await.unwrap_err();
        assert!(matches!(err, DomainError::Storage { .. }));
        assert_eq!(cache.state(), CacheState::Uninitialized);

        cache.populate().await.unwrap();
        assert_eq!(cache.state(), CacheState::Ready);
    }

    #[tokio::test]
    async fn test_try_spawn_warmup_claims_once() {
        let gate = Arc::new(Notify::new());
        let source = GatedSource {
            gate: Arc::clone(&gate),
            records: vec![record("A", &[1.0, 0.0], 1)],
        };
        let cache = Arc::new(RetrievalCache::new(Arc::new(source)));

        let first = cache.try_spawn_warmup();
        assert!(first.is_some());
        assert_eq!(cache.state(), CacheState::Populating);
        assert!(cache.try_spawn_warmup().is_none());

        gate.notify_one();
        first.unwrap().await.unwrap().unwrap();

        assert_eq!(cache.state(), CacheState::Ready);
        assert!(cache.try_spawn_warmup().is_none());
    }

    #[tokio::test]
    async fn test_failed_warmup_releases_claim() {
        let mut source = MockChunkSource::new();
        let mut seq = mockall::Sequence::new();
        source
            .expect_load_records()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Err(DomainError::storage("connection reset")));
        source
            .expect_load_records()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(vec![record("A", &[1.0, 0.0], 1)]));
        source.expect_source_type().return_const("mock");
        let cache = Arc::new(RetrievalCache::new(Arc::new(source)));

        let failed = cache.try_spawn_warmup().unwrap().await.unwrap();
        assert!(failed.is_err());
        assert_eq!(cache.state(), CacheState::Uninitialized);

        let report = cache.try_spawn_warmup().unwrap().await.unwrap().unwrap();
        assert_eq!(report.chunks_loaded, 1);
        assert_eq!(cache.state(), CacheState::Ready);
    }

    #[tokio::test]
    async fn test_not_ready_while_populating() {
        let gate = Arc::new(Notify::new());
        let source = GatedSource {
            gate: Arc::clone(&gate),
            records: vec![record("A", &[1.0, 0.0], 1)],
        };
        let cache = Arc::new(RetrievalCache::new(Arc::new(source)));

        let warmup = cache.spawn_warmup();

        tokio::time::timeout(Duration::from_secs(1), async {
            while cache.state() != CacheState::Populating {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("warm-up never started");

        assert!(matches!(cache.query(&[1.0, 0.0], 3, 0.0), QueryOutcome::NotReady));

        gate.notify_one();
        let report = warmup.await.unwrap().unwrap();

        assert_eq!(report.chunks_loaded, 1);
        assert_eq!(cache.state(), CacheState::Ready);
        assert_eq!(texts(cache.query(&[1.0, 0.0], 3, 0.0)), vec!["A"]);
    }
}
