// src/lib.rs

pub mod config;
pub mod core;

// Re-export
pub use crate::config::CacheConfig;
pub use crate::core::engine::{CacheEngine, CacheLookup, EntryContext};
pub use crate::core::errors::CacheError;
pub use crate::core::manifest::{RevalidateDurations, TagManifest};
