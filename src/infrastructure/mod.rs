//! Infrastructure layer - External service implementations

pub mod embedding;
pub mod knowledge;
pub mod logging;
pub mod services;
