// src/core/manifest.rs

//! The tag manifest: process-wide bookkeeping of per-tag invalidation times.
//!
//! `revalidate_tag` never touches stored entries. It only records here the
//! moment a tag was invalidated, and every read consults the manifest lazily
//! to decide whether an entry produced at some earlier time may still be
//! served. The manifest is constructed explicitly and shared via `Arc` so
//! tests can run with isolated instances concurrently.

use dashmap::DashMap;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

/// Invalidation timestamps recorded for a single tag, in epoch milliseconds.
///
/// Entries are created lazily on the first invalidation of a tag and are never
/// deleted for the lifetime of the process.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TagEntry {
    /// Entries produced before this time are stale: safe to serve while a
    /// background refresh runs.
    pub stale: Option<u64>,
    /// Entries produced before this time must not be served once the
    /// timestamp itself has passed.
    pub expired: Option<u64>,
}

/// Optional windows passed alongside a revalidation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RevalidateDurations {
    /// Seconds until the invalidation takes hard effect. Absent means the
    /// invalidation is immediate.
    pub expire: Option<u64>,
}

/// Process-wide map from tag to its last-known invalidation times, shared by
/// every concurrent operation.
#[derive(Debug, Default)]
pub struct TagManifest {
    entries: DashMap<String, TagEntry>,
}

/// Current wall-clock time in epoch milliseconds.
pub(crate) fn epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

impl TagManifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks every tag stale as of now and records its hard-expiry cutoff.
    pub fn record_invalidation(&self, tags: &[String], durations: Option<RevalidateDurations>) {
        self.record_invalidation_at(tags, durations, epoch_ms());
    }

    /// Clock-injected form of [`TagManifest::record_invalidation`].
    ///
    /// The cutoff is plainly assigned: an untargeted call sets `expired = now`
    /// even when an earlier call had deferred it further out. Making content
    /// invalid sooner is always allowed.
    pub fn record_invalidation_at(
        &self,
        tags: &[String],
        durations: Option<RevalidateDurations>,
        now: u64,
    ) {
        for tag in tags {
            let mut entry = self.entries.entry(tag.clone()).or_default();
            entry.stale = Some(now);
            entry.expired = Some(match durations.and_then(|d| d.expire) {
                Some(expire) => now.saturating_add(expire.saturating_mul(1000)),
                None => now,
            });
            debug!(tag = %tag, stale = ?entry.stale, expired = ?entry.expired, "recorded tag invalidation");
        }
    }

    /// True when any tag carries a hard cutoff that has already taken effect
    /// and that postdates the entry.
    pub fn is_expired(&self, tags: &[String], produced_at: u64) -> bool {
        self.is_expired_at(tags, produced_at, epoch_ms())
    }

    /// Clock-injected form of [`TagManifest::is_expired`].
    ///
    /// The `expired > produced_at` guard keeps a passed cutoff from condemning
    /// future writes: an entry produced after the invalidation took effect is
    /// fresh relative to it.
    pub fn is_expired_at(&self, tags: &[String], produced_at: u64, now: u64) -> bool {
        tags.iter().any(|tag| {
            self.entries.get(tag).is_some_and(|entry| {
                entry
                    .expired
                    .is_some_and(|expired| expired <= now && expired > produced_at)
            })
        })
    }

    /// True when any tag was invalidated after the entry was produced.
    /// Staleness is never cleared, only superseded by a fresher write.
    pub fn is_stale(&self, tags: &[String], produced_at: u64) -> bool {
        tags.iter().any(|tag| {
            self.entries
                .get(tag)
                .is_some_and(|entry| entry.stale.unwrap_or(0) > produced_at)
        })
    }

    /// Snapshot of a single tag's recorded times, mainly for introspection.
    pub fn entry(&self, tag: &str) -> Option<TagEntry> {
        self.entries.get(tag).map(|e| *e)
    }
}
