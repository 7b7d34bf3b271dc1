// src/core/engine.rs

//! The cache engine orchestrator: composes the memory tier, the durable tier,
//! and the tag manifest into `get`, `set`, and `revalidate_tag`.

use std::sync::Arc;

use tracing::debug;

use crate::config::CacheConfig;
use crate::core::errors::CacheError;
use crate::core::manifest::{RevalidateDurations, TagManifest, epoch_ms};
use crate::core::storage::durable::{DurableTier, FileAccess};
use crate::core::storage::entry::{CacheEntry, CacheKind, CachedValue, tags_from_headers};
use crate::core::storage::memory::MemoryTier;

/// Per-operation context a caller passes into `get` and `set`.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryContext {
    pub kind: CacheKind,
    /// Hard tags requested against this key.
    pub tags: Vec<String>,
    /// Soft tags carried implicitly by the surrounding render.
    pub soft_tags: Vec<String>,
    /// Tags the current operation has already explicitly revalidated. A hit
    /// on any of these is never served back to the operation that
    /// invalidated it.
    pub revalidated_tags: Vec<String>,
    /// Fallback renders carry no hydration payload.
    pub is_fallback: bool,
    /// Whether the route renders partially and streams segments.
    pub partial_rendering: bool,
    /// Cleared for preview/draft renders that must not pollute the durable
    /// store.
    pub persist: bool,
}

impl EntryContext {
    pub fn new(kind: CacheKind) -> Self {
        Self {
            kind,
            tags: Vec::new(),
            soft_tags: Vec::new(),
            revalidated_tags: Vec::new(),
            is_fallback: false,
            partial_rendering: false,
            persist: true,
        }
    }
}

impl Default for EntryContext {
    fn default() -> Self {
        Self::new(CacheKind::Route)
    }
}

/// The result of a lookup: the entry plus an optional descriptor asking the
/// caller to merge newly requested tags into the persisted fetch entry.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheLookup {
    pub entry: CacheEntry,
    /// Set when the caller requested tags the stored fetch entry does not
    /// carry yet. The merged list is the stored tags followed by the missing
    /// requested ones.
    pub pending_tag_merge: Option<Vec<String>>,
}

/// Orchestrates the two storage tiers and the tag manifest. Owns the
/// kind-specific path and serialization rules through its durable tier.
pub struct CacheEngine {
    memory: Option<Arc<MemoryTier>>,
    durable: DurableTier,
    manifest: Arc<TagManifest>,
    flush_to_disk: bool,
    tags_header: String,
}

impl CacheEngine {
    pub fn new(
        config: &CacheConfig,
        files: Arc<dyn FileAccess>,
        manifest: Arc<TagManifest>,
    ) -> Self {
        let memory =
            (config.memory_capacity > 0).then(|| Arc::new(MemoryTier::new(config.memory_capacity)));
        Self {
            memory,
            durable: DurableTier::new(config.storage_root.clone(), files),
            manifest,
            flush_to_disk: config.flush_to_disk,
            tags_header: config.tags_header_name.clone(),
        }
    }

    pub fn manifest(&self) -> &Arc<TagManifest> {
        &self.manifest
    }

    /// Retrieves a valid entry for `key`, performing any pending fetch-tag
    /// merge on behalf of the caller.
    pub async fn get(
        &self,
        key: &str,
        ctx: &EntryContext,
    ) -> Result<Option<CacheEntry>, CacheError> {
        match self.lookup(key, ctx).await? {
            None => Ok(None),
            Some(CacheLookup {
                entry,
                pending_tag_merge: None,
            }) => Ok(Some(entry)),
            Some(CacheLookup {
                mut entry,
                pending_tag_merge: Some(merged),
            }) => {
                // Rewrite the entry so the durable tag list stays a superset
                // of every tag ever requested against this key.
                if let CachedValue::Fetch(payload) = &mut entry.value {
                    payload.tags = merged.clone();
                }
                let mut merge_ctx = ctx.clone();
                merge_ctx.tags = merged;
                self.set(key, Some(entry.value.clone()), &merge_ctx).await?;
                Ok(Some(entry))
            }
        }
    }

    /// The read state machine: memory hit, else durable read with memory
    /// backfill, with the validity check applied to whichever tier produced
    /// the entry. All read-path I/O failures surface as misses.
    pub async fn lookup(
        &self,
        key: &str,
        ctx: &EntryContext,
    ) -> Result<Option<CacheLookup>, CacheError> {
        if let Some(memory) = &self.memory
            && let Some(entry) = memory.get(key)
        {
            if !self.is_valid(&entry, ctx) {
                debug!(key, "memory tier hit failed validity check");
                return Ok(None);
            }
            return Ok(Some(self.with_tag_merge(entry, ctx)));
        }

        let Some(entry) = self.durable.read(key, ctx).await else {
            debug!(key, "cache miss");
            return Ok(None);
        };

        if !self.is_valid(&entry, ctx) {
            debug!(key, "durable entry failed validity check");
            return Ok(None);
        }

        if let Some(memory) = &self.memory {
            memory.put(key.to_string(), entry.clone());
        }
        Ok(Some(self.with_tag_merge(entry, ctx)))
    }

    /// Stores a new entry in both tiers, stamping the write time. A `None`
    /// value is the explicit delete marker and touches neither tier; staleness
    /// is derived on read, not enforced by removal.
    pub async fn set(
        &self,
        key: &str,
        value: Option<CachedValue>,
        ctx: &EntryContext,
    ) -> Result<(), CacheError> {
        let Some(mut value) = value else {
            debug!(key, "delete marker: nothing written");
            return Ok(());
        };

        // The caller's current tag list wins over whatever copy the payload
        // carried. Applied before either tier sees the entry, so a memory hit
        // never contradicts the durable source of truth.
        if let CachedValue::Fetch(payload) = &mut value
            && !ctx.tags.is_empty()
        {
            payload.tags = ctx.tags.clone();
        }

        let entry = CacheEntry {
            last_modified: epoch_ms(),
            value,
        };

        if let Some(memory) = &self.memory {
            memory.put(key.to_string(), entry.clone());
        }

        if !ctx.persist || !self.flush_to_disk {
            debug!(key, "durable write skipped (no-flush)");
            return Ok(());
        }

        self.durable.write(key, &entry.value, ctx).await
    }

    /// Records an invalidation for the given tags in the manifest. Stored
    /// entries are untouched; invalidation is detected lazily on the next
    /// read. Empty input is a no-op.
    pub fn revalidate_tag<I, S>(&self, tags: I, durations: Option<RevalidateDurations>)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tags: Vec<String> = tags.into_iter().map(Into::into).collect();
        if tags.is_empty() {
            return;
        }
        self.manifest.record_invalidation(&tags, durations);
    }

    /// Soft-invalidation check: true when any of the given tags was
    /// revalidated after the entry was produced. Such an entry may still be
    /// served while the caller refreshes it in the background.
    pub fn is_stale(&self, entry: &CacheEntry, tags: &[String]) -> bool {
        self.manifest.is_stale(tags, entry.last_modified)
    }

    /// Reconciles the entry's age with the manifest. Route and page entries
    /// derive their tags from the designated response header; fetch entries
    /// are judged against the caller's own hard and soft tags.
    fn is_valid(&self, entry: &CacheEntry, ctx: &EntryContext) -> bool {
        match &entry.value {
            CachedValue::Route(route) => {
                let tags = tags_from_headers(&route.headers, &self.tags_header);
                !self.manifest.is_expired(&tags, entry.last_modified)
            }
            CachedValue::Page(page) => {
                let tags = tags_from_headers(&page.headers, &self.tags_header);
                !self.manifest.is_expired(&tags, entry.last_modified)
            }
            CachedValue::Fetch(_) => {
                let mut tags = ctx.tags.clone();
                tags.extend(ctx.soft_tags.iter().cloned());
                if tags.iter().any(|tag| ctx.revalidated_tags.contains(tag)) {
                    // The caller itself just invalidated one of these tags;
                    // the stored data is definitely stale for it.
                    return false;
                }
                !self.manifest.is_expired(&tags, entry.last_modified)
            }
        }
    }

    fn with_tag_merge(&self, entry: CacheEntry, ctx: &EntryContext) -> CacheLookup {
        let pending_tag_merge = match (&entry.value, ctx.kind) {
            (CachedValue::Fetch(payload), CacheKind::Fetch) => {
                if ctx.tags.iter().all(|tag| payload.tags.contains(tag)) {
                    None
                } else {
                    let mut merged = payload.tags.clone();
                    for tag in &ctx.tags {
                        if !merged.contains(tag) {
                            merged.push(tag.clone());
                        }
                    }
                    Some(merged)
                }
            }
            _ => None,
        };
        CacheLookup {
            entry,
            pending_tag_merge,
        }
    }
}
