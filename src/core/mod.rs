// src/core/mod.rs

//! The central module containing the core logic and data structures of rendercache.

pub mod engine;
pub mod errors;
pub mod life;
pub mod manifest;
pub mod storage;

pub use engine::CacheEngine;
pub use errors::CacheError;
pub use manifest::TagManifest;
