// src/core/storage/entry.rs

//! Cache entry shapes: the kind-polymorphic value union and the sidecar
//! metadata formats persisted next to durable payloads.

use bytes::Bytes;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// The structural kind of a cache entry, determining its serialization and
/// durable path convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheKind {
    /// A route handler response: raw bytes plus headers and status.
    #[default]
    Route,
    /// A server-rendered document under the app directory.
    AppPage,
    /// A server-rendered document under the pages directory.
    Page,
    /// An upstream fetch payload.
    Fetch,
}

/// A stored entry. Immutable once written; a later `set` with the same key
/// supersedes it wholesale.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    /// Write time in epoch milliseconds; read back from the primary file's
    /// mtime on durable loads.
    pub last_modified: u64,
    pub value: CachedValue,
}

/// The kind-polymorphic payload union. Serialization, path derivation, and
/// validity checking each dispatch on it exhaustively.
#[derive(Debug, Clone, PartialEq)]
pub enum CachedValue {
    Route(RouteBytes),
    Page(PageDocument),
    Fetch(FetchPayload),
}

/// A route handler response body with its headers and status.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteBytes {
    pub body: Bytes,
    pub headers: IndexMap<String, String>,
    pub status: u16,
}

/// A rendered document plus its hydration payload and optional streamed
/// segments.
#[derive(Debug, Clone, PartialEq)]
pub struct PageDocument {
    pub html: Bytes,
    /// Serialized payload for client hydration; absent for fallback renders.
    pub data: Option<Bytes>,
    /// Opaque marker for a render that was cut short and resumes on request.
    pub postponed: Option<String>,
    pub headers: IndexMap<String, String>,
    pub status: u16,
    /// Ordered mapping from segment path to payload, for partially rendered
    /// routes.
    pub segments: Option<IndexMap<String, Bytes>>,
}

/// An upstream fetch result with the tags recorded against it. The durable
/// file is the source of truth for the tag list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchPayload {
    pub body: serde_json::Value,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Sidecar metadata persisted next to a route payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteMeta {
    #[serde(default)]
    pub headers: IndexMap<String, String>,
    pub status: u16,
}

/// Sidecar metadata persisted next to a rendered document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageMeta {
    #[serde(default)]
    pub headers: IndexMap<String, String>,
    #[serde(default = "default_status")]
    pub status: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postponed: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segment_paths: Option<Vec<String>>,
}

fn default_status() -> u16 {
    200
}

impl Default for PageMeta {
    fn default() -> Self {
        Self {
            headers: IndexMap::new(),
            status: default_status(),
            postponed: None,
            segment_paths: None,
        }
    }
}

/// Splits the designated response header into the entry's tag list.
pub fn tags_from_headers(headers: &IndexMap<String, String>, header_name: &str) -> Vec<String> {
    headers
        .get(header_name)
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|tag| !tag.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
