use rendercache::core::manifest::{RevalidateDurations, TagManifest};

fn tags(list: &[&str]) -> Vec<String> {
    list.iter().map(|t| t.to_string()).collect()
}

#[test]
fn test_untargeted_invalidation_expires_older_entries_immediately() {
    let manifest = TagManifest::new();
    let t0 = 1_000;
    let t1 = 2_000;

    manifest.record_invalidation_at(&tags(&["blog"]), None, t1);

    // Expired for any now >= t1.
    assert!(manifest.is_expired_at(&tags(&["blog"]), t0, t1));
    assert!(manifest.is_expired_at(&tags(&["blog"]), t0, t1 + 50_000));

    // An entry produced after the invalidation is fresh relative to it.
    let t2 = t1 + 1;
    assert!(!manifest.is_expired_at(&tags(&["blog"]), t2, t2 + 50_000));
}

#[test]
fn test_expire_window_defers_the_hard_cutoff() {
    let manifest = TagManifest::new();
    let t0 = 1_000;
    let t1 = 2_000;
    let expire_secs = 30;

    manifest.record_invalidation_at(
        &tags(&["blog"]),
        Some(RevalidateDurations {
            expire: Some(expire_secs),
        }),
        t1,
    );

    let cutoff = t1 + expire_secs * 1000;
    assert!(!manifest.is_expired_at(&tags(&["blog"]), t0, t1));
    assert!(!manifest.is_expired_at(&tags(&["blog"]), t0, cutoff - 1));
    assert!(manifest.is_expired_at(&tags(&["blog"]), t0, cutoff));
    assert!(manifest.is_expired_at(&tags(&["blog"]), t0, cutoff + 1));
}

#[test]
fn test_staleness_marks_older_entries_and_is_never_cleared() {
    let manifest = TagManifest::new();
    let t1 = 2_000;

    manifest.record_invalidation_at(&tags(&["blog"]), None, t1);

    assert!(manifest.is_stale(&tags(&["blog"]), t1 - 1));
    // Staleness persists indefinitely; only a fresher write escapes it.
    assert!(manifest.is_stale(&tags(&["blog"]), 0));
    assert!(!manifest.is_stale(&tags(&["blog"]), t1));
    assert!(!manifest.is_stale(&tags(&["blog"]), t1 + 1));
}

#[test]
fn test_empty_and_unknown_tags_never_invalidate() {
    let manifest = TagManifest::new();
    manifest.record_invalidation_at(&tags(&["blog"]), None, 2_000);

    assert!(!manifest.is_expired_at(&[], 0, u64::MAX));
    assert!(!manifest.is_stale(&[], 0));
    assert!(!manifest.is_expired_at(&tags(&["news"]), 0, u64::MAX));
    assert!(!manifest.is_stale(&tags(&["news"]), 0));
}

#[test]
fn test_repeated_invalidation_advances_timestamps_monotonically() {
    let manifest = TagManifest::new();

    manifest.record_invalidation_at(&tags(&["blog"]), None, 2_000);
    let first = manifest.entry("blog").unwrap();
    assert_eq!(first.stale, Some(2_000));
    assert_eq!(first.expired, Some(2_000));

    manifest.record_invalidation_at(&tags(&["blog"]), None, 3_000);
    let second = manifest.entry("blog").unwrap();
    assert_eq!(second.stale, Some(3_000));
    assert_eq!(second.expired, Some(3_000));
}

#[test]
fn test_untargeted_invalidation_may_pull_a_deferred_cutoff_earlier() {
    let manifest = TagManifest::new();

    manifest.record_invalidation_at(
        &tags(&["blog"]),
        Some(RevalidateDurations { expire: Some(3600) }),
        2_000,
    );
    assert_eq!(manifest.entry("blog").unwrap().expired, Some(3_602_000));

    // Making content invalid sooner is always allowed.
    manifest.record_invalidation_at(&tags(&["blog"]), None, 5_000);
    assert_eq!(manifest.entry("blog").unwrap().expired, Some(5_000));
}

#[test]
fn test_any_matching_tag_is_sufficient() {
    let manifest = TagManifest::new();
    manifest.record_invalidation_at(&tags(&["news"]), None, 2_000);

    assert!(manifest.is_expired_at(&tags(&["blog", "news"]), 1_000, 2_000));
    assert!(manifest.is_stale(&tags(&["blog", "news"]), 1_000));
}
