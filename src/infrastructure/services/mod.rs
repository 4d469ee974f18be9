//! Application services

mod retrieval_service;

pub use retrieval_service::{RetrievalService, SearchOptions};
