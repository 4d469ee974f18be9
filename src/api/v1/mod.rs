//! v1 API endpoints

pub mod retrieval;

use axum::{
    routing::{get, post},
    Router,
};

use super::state::AppState;

/// Create v1 API router
pub fn create_v1_router() -> Router<AppState> {
    Router::new()
        .route("/retrieval/search", post(retrieval::search))
        .route("/retrieval/status", get(retrieval::status))
        .route("/retrieval/warmup", post(retrieval::warmup))
}
