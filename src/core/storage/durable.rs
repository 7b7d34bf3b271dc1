// src/core/storage/durable.rs

//! The durable tier: path-addressed reads and writes of full entry payloads
//! through an abstract file-access capability.
//!
//! Reads degrade to misses: a required file that is absent or unparseable
//! makes the whole read a miss, while optional sidecars (page metadata,
//! hydration payload, individual segments) degrade field-wise. Writes
//! propagate their errors.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use indexmap::IndexMap;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::core::engine::EntryContext;
use crate::core::errors::CacheError;
use crate::core::storage::entry::{
    CacheEntry, CacheKind, CachedValue, FetchPayload, PageDocument, PageMeta, RouteBytes, RouteMeta,
};
use crate::core::storage::paths;

/// File-access capability the durable tier reads and writes through.
///
/// The storage medium itself is a collaborator; the tier assumes only these
/// three primitives. `write_atomic` must commit all files or none, so a
/// reader in the same process never observes a partially written entry.
#[async_trait]
pub trait FileAccess: Send + Sync {
    async fn read(&self, path: &Path) -> std::io::Result<Bytes>;

    /// Modification time of `path` in epoch milliseconds.
    async fn mtime_ms(&self, path: &Path) -> std::io::Result<u64>;

    /// Stages every file, then commits them together.
    async fn write_atomic(&self, files: Vec<(PathBuf, Bytes)>) -> std::io::Result<()>;
}

/// Default `FileAccess` backed by `tokio::fs`: payloads are staged under
/// temporary names, fsynced, then renamed into place.
#[derive(Debug, Default)]
pub struct TokioFileAccess;

#[async_trait]
impl FileAccess for TokioFileAccess {
    async fn read(&self, path: &Path) -> std::io::Result<Bytes> {
        fs::read(path).await.map(Bytes::from)
    }

    async fn mtime_ms(&self, path: &Path) -> std::io::Result<u64> {
        let modified = fs::metadata(path).await?.modified()?;
        Ok(modified
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0))
    }

    async fn write_atomic(&self, files: Vec<(PathBuf, Bytes)>) -> std::io::Result<()> {
        let mut staged: Vec<(PathBuf, PathBuf)> = Vec::with_capacity(files.len());

        // Step 1: stage every payload under a temporary name.
        for (path, contents) in &files {
            match stage(path, contents).await {
                Ok(temp) => staged.push((temp, path.clone())),
                Err(e) => {
                    for (temp, _) in &staged {
                        let _ = fs::remove_file(temp).await;
                    }
                    return Err(e);
                }
            }
        }

        // Step 2: rename every staged file into place.
        for (temp, path) in staged {
            fs::rename(&temp, &path).await?;
        }
        Ok(())
    }
}

async fn stage(path: &Path, contents: &Bytes) -> std::io::Result<PathBuf> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    let temp = temp_name(path);
    let mut file = fs::File::create(&temp).await?;
    file.write_all(contents).await?;
    file.sync_all().await?;
    Ok(temp)
}

fn temp_name(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(format!(".{}.tmp", Uuid::new_v4()));
    PathBuf::from(name)
}

/// Second-tier cache: kind-addressed files under the storage root, read and
/// written through a [`FileAccess`] capability.
pub struct DurableTier {
    root: PathBuf,
    files: Arc<dyn FileAccess>,
}

impl DurableTier {
    pub(crate) fn new(root: PathBuf, files: Arc<dyn FileAccess>) -> Self {
        Self { root, files }
    }

    /// Reads and deserializes the entry for `key` according to the context's
    /// kind. Any failure on a required file is a miss, never an error.
    pub(crate) async fn read(&self, key: &str, ctx: &EntryContext) -> Option<CacheEntry> {
        match ctx.kind {
            CacheKind::Route => self.read_route(key).await,
            CacheKind::AppPage | CacheKind::Page => self.read_page(key, ctx).await,
            CacheKind::Fetch => self.read_fetch(key).await,
        }
    }

    async fn read_route(&self, key: &str) -> Option<CacheEntry> {
        let body_path = paths::body_path(&self.root, key);
        let body = self.required(key, &body_path).await?;
        let last_modified = self.required_mtime(key, &body_path).await?;

        let meta_bytes = self
            .required(key, &paths::meta_path(&self.root, CacheKind::Route, key))
            .await?;
        let meta: RouteMeta = match serde_json::from_slice(&meta_bytes) {
            Ok(meta) => meta,
            Err(e) => {
                debug!(key, error = %e, "route metadata unparseable; treating as miss");
                return None;
            }
        };

        Some(CacheEntry {
            last_modified,
            value: CachedValue::Route(RouteBytes {
                body,
                headers: meta.headers,
                status: meta.status,
            }),
        })
    }

    async fn read_page(&self, key: &str, ctx: &EntryContext) -> Option<CacheEntry> {
        let html_path = paths::html_path(&self.root, ctx.kind, key);
        let html = self.required(key, &html_path).await?;
        let last_modified = self.required_mtime(key, &html_path).await?;

        // The sidecar is optional: an unreadable or unparseable one degrades
        // to a bare document instead of failing the read.
        let meta_path = paths::meta_path(&self.root, ctx.kind, key);
        let meta = match self.files.read(&meta_path).await {
            Ok(bytes) => match serde_json::from_slice::<PageMeta>(&bytes) {
                Ok(meta) => meta,
                Err(e) => {
                    warn!(key, error = %e, "page metadata unparseable; serving bare document");
                    PageMeta::default()
                }
            },
            Err(e) => {
                debug!(key, error = %e, "page metadata missing; serving bare document");
                PageMeta::default()
            }
        };

        // Fallback renders carry no hydration payload.
        let data = if ctx.is_fallback {
            None
        } else {
            match self
                .files
                .read(&paths::data_path(&self.root, ctx.kind, key))
                .await
            {
                Ok(bytes) => Some(bytes),
                Err(e) => {
                    debug!(key, error = %e, "hydration payload missing; serving without it");
                    None
                }
            }
        };

        let segments = match &meta.segment_paths {
            None => None,
            Some(listed) => {
                let mut segments = IndexMap::new();
                for segment in listed {
                    match self
                        .files
                        .read(&paths::segment_path(&self.root, key, segment))
                        .await
                    {
                        Ok(bytes) => {
                            segments.insert(segment.clone(), bytes);
                        }
                        Err(e) => {
                            warn!(key, segment, error = %e, "segment read failed; dropped from entry");
                        }
                    }
                }
                Some(segments)
            }
        };

        Some(CacheEntry {
            last_modified,
            value: CachedValue::Page(PageDocument {
                html,
                data,
                postponed: meta.postponed,
                headers: meta.headers,
                status: meta.status,
                segments,
            }),
        })
    }

    async fn read_fetch(&self, key: &str) -> Option<CacheEntry> {
        let path = paths::fetch_path(&self.root, key);
        let bytes = self.required(key, &path).await?;
        let payload: FetchPayload = match serde_json::from_slice(&bytes) {
            Ok(payload) => payload,
            Err(e) => {
                debug!(key, error = %e, "fetch payload unparseable; treating as miss");
                return None;
            }
        };
        let last_modified = self.required_mtime(key, &path).await?;

        Some(CacheEntry {
            last_modified,
            value: CachedValue::Fetch(payload),
        })
    }

    async fn required(&self, key: &str, path: &Path) -> Option<Bytes> {
        match self.files.read(path).await {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                debug!(key, path = %path.display(), error = %e, "required file read failed; cache miss");
                None
            }
        }
    }

    async fn required_mtime(&self, key: &str, path: &Path) -> Option<u64> {
        match self.files.mtime_ms(path).await {
            Ok(mtime) => Some(mtime),
            Err(e) => {
                debug!(key, path = %path.display(), error = %e, "mtime lookup failed; cache miss");
                None
            }
        }
    }

    /// Serializes the value into its kind-specific file set and commits all
    /// of them through one atomic multi-file write.
    pub(crate) async fn write(
        &self,
        key: &str,
        value: &CachedValue,
        ctx: &EntryContext,
    ) -> Result<(), CacheError> {
        let files = match value {
            CachedValue::Route(route) => {
                let meta = RouteMeta {
                    headers: route.headers.clone(),
                    status: route.status,
                };
                vec![
                    (paths::body_path(&self.root, key), route.body.clone()),
                    (
                        paths::meta_path(&self.root, CacheKind::Route, key),
                        Bytes::from(serde_json::to_vec(&meta)?),
                    ),
                ]
            }
            CachedValue::Page(page) => self.page_files(key, page, ctx)?,
            CachedValue::Fetch(payload) => {
                vec![(
                    paths::fetch_path(&self.root, key),
                    Bytes::from(serde_json::to_vec(payload)?),
                )]
            }
        };

        self.files.write_atomic(files).await?;
        Ok(())
    }

    fn page_files(
        &self,
        key: &str,
        page: &PageDocument,
        ctx: &EntryContext,
    ) -> Result<Vec<(PathBuf, Bytes)>, CacheError> {
        let mut files = vec![(paths::html_path(&self.root, ctx.kind, key), page.html.clone())];

        if let Some(data) = &page.data {
            files.push((paths::data_path(&self.root, ctx.kind, key), data.clone()));
        }

        let segment_paths = match (&page.segments, ctx.partial_rendering) {
            (Some(segments), true) => {
                for (segment, bytes) in segments {
                    files.push((paths::segment_path(&self.root, key, segment), bytes.clone()));
                }
                Some(segments.keys().cloned().collect())
            }
            (Some(_), false) => {
                debug!(key, "segments not persisted: route does not render partially");
                None
            }
            (None, _) => None,
        };

        let meta = PageMeta {
            headers: page.headers.clone(),
            status: page.status,
            postponed: page.postponed.clone(),
            segment_paths,
        };
        files.push((
            paths::meta_path(&self.root, ctx.kind, key),
            Bytes::from(serde_json::to_vec(&meta)?),
        ));

        Ok(files)
    }
}
