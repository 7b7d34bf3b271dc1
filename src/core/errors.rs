// src/core/errors.rs

//! Defines the primary error type for the cache engine.

use std::sync::Arc;
use thiserror::Error;

/// The main error enum for cache operations.
///
/// Read-path failures are recovered locally as misses by the engine, so these
/// surface only from write paths and configuration handling. Using `thiserror`
/// allows for clean error definitions and automatic `From` trait implementations.
#[derive(Error, Debug, Clone)]
pub enum CacheError {
    #[error("IO Error: {0}")]
    Io(Arc<std::io::Error>),

    #[error("Serialization Error: {0}")]
    Serialization(String),

    #[error("Invalid cache life profile: {0}")]
    InvalidCacheLife(String),

    #[error("Unknown cache life profile: {0}")]
    UnknownCacheLifeProfile(String),
}

// `std::io::Error` is not cloneable; wrapping it in an Arc allows for cheap,
// shared cloning of the error value.
impl From<std::io::Error> for CacheError {
    fn from(e: std::io::Error) -> Self {
        CacheError::Io(Arc::new(e))
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(e: serde_json::Error) -> Self {
        CacheError::Serialization(e.to_string())
    }
}
