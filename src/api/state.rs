//! Application state for shared services

use std::sync::Arc;

use crate::domain::RetrievalCache;
use crate::infrastructure::services::RetrievalService;

/// Application state shared by all handlers
#[derive(Debug, Clone)]
pub struct AppState {
    pub retrieval_service: Arc<RetrievalService>,
}

impl AppState {
    pub fn new(retrieval_service: Arc<RetrievalService>) -> Self {
        Self { retrieval_service }
    }

    pub fn cache(&self) -> &Arc<RetrievalCache> {
        self.retrieval_service.cache()
    }
}
