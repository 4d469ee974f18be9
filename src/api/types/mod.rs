//! Request and response types for the HTTP API

pub mod error;
pub mod json;
pub mod retrieval;

pub use error::{ApiError, ApiErrorResponse};
pub use json::JsonBody;
pub use retrieval::{
    CacheStatusResponse, MatchDto, SearchRequest, SearchResponse, SearchStatus, WarmupResponse,
};
