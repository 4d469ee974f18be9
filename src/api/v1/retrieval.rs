//! Retrieval endpoint handlers

use axum::{extract::State, http::StatusCode, Json};
use tracing::{debug, info};

use crate::api::state::AppState;
use crate::api::types::{
    ApiError, CacheStatusResponse, JsonBody, SearchRequest, SearchResponse, WarmupResponse,
};
use crate::infrastructure::services::SearchOptions;

/// POST /v1/retrieval/search
pub async fn search(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<SearchRequest>,
) -> Result<Json<SearchResponse>, ApiError> {
    debug!(top_k = ?request.top_k, threshold = ?request.similarity_threshold, "Retrieval search");

    let options = SearchOptions {
        top_k: request.top_k,
        similarity_threshold: request.similarity_threshold,
    };

    let outcome = state
        .retrieval_service
        .search(&request.query, options)
        .await
        .map_err(ApiError::from)?;

    Ok(Json(SearchResponse::from(outcome)))
}

/// GET /v1/retrieval/status
pub async fn status(State(state): State<AppState>) -> Json<CacheStatusResponse> {
    let cache = state.cache();

    Json(CacheStatusResponse {
        state: cache.state(),
        chunks: cache.len(),
        report: cache.report().cloned(),
    })
}

/// POST /v1/retrieval/warmup
///
/// Starts a background load unless one is running or the cache is ready.
/// Always answers 202; `started` tells whether this call kicked off a load.
pub async fn warmup(State(state): State<AppState>) -> (StatusCode, Json<WarmupResponse>) {
    let cache = state.cache();
    // Outcome is logged by the cache; the handle is not awaited
    let started = cache.try_spawn_warmup().is_some();

    if started {
        info!("Warm-up requested over HTTP");
    }

    (
        StatusCode::ACCEPTED,
        Json(WarmupResponse {
            state: cache.state(),
            started,
        }),
    )
}
