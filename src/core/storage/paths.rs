// src/core/storage/paths.rs

//! Kind-specific durable path derivation, relative to the configured storage
//! root. Keys may contain `/`; a leading slash is stripped before joining.

use std::path::{Path, PathBuf};

use crate::core::storage::entry::CacheKind;

fn keyed(root: &Path, dir: &str, key: &str, ext: &str) -> PathBuf {
    let key = key.trim_start_matches('/');
    root.join(dir).join(format!("{key}{ext}"))
}

/// Route and app-page files live under `app/`; pages-directory documents
/// under `pages/`.
fn page_dir(kind: CacheKind) -> &'static str {
    match kind {
        CacheKind::Page => "pages",
        _ => "app",
    }
}

pub(crate) fn body_path(root: &Path, key: &str) -> PathBuf {
    keyed(root, "app", key, ".body")
}

pub(crate) fn meta_path(root: &Path, kind: CacheKind, key: &str) -> PathBuf {
    keyed(root, page_dir(kind), key, ".meta")
}

pub(crate) fn html_path(root: &Path, kind: CacheKind, key: &str) -> PathBuf {
    keyed(root, page_dir(kind), key, ".html")
}

/// Hydration payload: `.json` next to pages-directory documents, `.rsc` next
/// to app-directory documents.
pub(crate) fn data_path(root: &Path, kind: CacheKind, key: &str) -> PathBuf {
    match kind {
        CacheKind::Page => keyed(root, "pages", key, ".json"),
        _ => keyed(root, "app", key, ".rsc"),
    }
}

pub(crate) fn segment_path(root: &Path, key: &str, segment: &str) -> PathBuf {
    let key = key.trim_start_matches('/');
    let segment = segment.trim_start_matches('/');
    root.join("app")
        .join(format!("{key}.segments"))
        .join(format!("{segment}.segment"))
}

/// Fetch payloads live in a sibling of the storage root shared with other
/// build artifacts.
pub(crate) fn fetch_path(root: &Path, key: &str) -> PathBuf {
    root.join("..")
        .join("cache")
        .join("fetch-cache")
        .join(key.trim_start_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_paths_live_under_app() {
        let root = Path::new("/srv/out");
        assert_eq!(
            body_path(root, "/api/items"),
            PathBuf::from("/srv/out/app/api/items.body")
        );
        assert_eq!(
            meta_path(root, CacheKind::Route, "/api/items"),
            PathBuf::from("/srv/out/app/api/items.meta")
        );
    }

    #[test]
    fn test_page_kind_selects_directory_and_data_extension() {
        let root = Path::new("/srv/out");
        assert_eq!(
            html_path(root, CacheKind::Page, "blog/post"),
            PathBuf::from("/srv/out/pages/blog/post.html")
        );
        assert_eq!(
            data_path(root, CacheKind::Page, "blog/post"),
            PathBuf::from("/srv/out/pages/blog/post.json")
        );
        assert_eq!(
            html_path(root, CacheKind::AppPage, "blog/post"),
            PathBuf::from("/srv/out/app/blog/post.html")
        );
        assert_eq!(
            data_path(root, CacheKind::AppPage, "blog/post"),
            PathBuf::from("/srv/out/app/blog/post.rsc")
        );
    }

    #[test]
    fn test_segment_files_nest_under_the_key() {
        let root = Path::new("/srv/out");
        assert_eq!(
            segment_path(root, "/blog/post", "/feed/items"),
            PathBuf::from("/srv/out/app/blog/post.segments/feed/items.segment")
        );
    }

    #[test]
    fn test_fetch_entries_live_beside_the_root() {
        let root = Path::new("/srv/out");
        assert_eq!(
            fetch_path(root, "abc123"),
            PathBuf::from("/srv/out/../cache/fetch-cache/abc123")
        );
    }
}
