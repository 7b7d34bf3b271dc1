// src/config.rs

//! Cache engine configuration: loading, defaults, and validation.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::Deserialize;

use crate::core::life::{self, CacheLifeProfile};

/// Default response header carrying the comma-separated tag list for route
/// and page entries.
pub const DEFAULT_TAGS_HEADER: &str = "x-cache-tags";

#[derive(Deserialize, Debug, Clone)]
pub struct CacheConfig {
    /// Root directory of the durable tier.
    #[serde(default = "default_storage_root")]
    pub storage_root: PathBuf,
    /// Maximum number of entries held by the memory tier; `0` disables the
    /// tier entirely.
    #[serde(default = "default_memory_capacity")]
    pub memory_capacity: usize,
    /// When false, `set` never writes the durable tier.
    #[serde(default = "default_flush_to_disk")]
    pub flush_to_disk: bool,
    /// Response header the tag list is read from on route and page entries.
    #[serde(default = "default_tags_header_name")]
    pub tags_header_name: String,
    /// Named cache-life profiles resolvable at policy declaration sites.
    #[serde(default = "default_cache_life")]
    pub cache_life: IndexMap<String, CacheLifeProfile>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            storage_root: default_storage_root(),
            memory_capacity: default_memory_capacity(),
            flush_to_disk: default_flush_to_disk(),
            tags_header_name: default_tags_header_name(),
            cache_life: default_cache_life(),
        }
    }
}

fn default_storage_root() -> PathBuf {
    PathBuf::from("cache")
}

fn default_memory_capacity() -> usize {
    1024
}

fn default_flush_to_disk() -> bool {
    true
}

fn default_tags_header_name() -> String {
    DEFAULT_TAGS_HEADER.to_string()
}

/// The built-in profile table; a config file may extend or override it.
fn default_cache_life() -> IndexMap<String, CacheLifeProfile> {
    IndexMap::from([(
        "default".to_string(),
        CacheLifeProfile {
            stale: Some(300.0),
            revalidate: Some(900.0),
            expire: Some(f64::INFINITY),
        },
    )])
}

impl CacheConfig {
    /// Loads and validates a configuration from a TOML file.
    pub fn from_file(path: &str) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file '{path}'"))?;
        let config: CacheConfig =
            toml::from_str(&raw).with_context(|| format!("Failed to parse config file '{path}'"))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates every configured cache-life profile. Raised at load time so
    /// a bad profile fails startup rather than a later declaration site.
    pub fn validate(&self) -> Result<()> {
        for (name, profile) in &self.cache_life {
            life::validate_profile(name, profile)
                .with_context(|| format!("Invalid [cache_life] entry '{name}'"))?;
        }
        Ok(())
    }
}
