//! Error types for the cache
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache.
///
/// Only caller mistakes surface here. Races inside a sweep are resolved in
/// place and never become an error value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Key absent, or present but past its idle-age or lifespan
    #[error("Key not found")]
    NotFound,

    /// Non-positive capacity or lifespan at construction
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, CacheError>;
