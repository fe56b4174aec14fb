//! Tests for snapshot caching and the freshness rule.

use reach_cache::{
    CacheClock, FileSystemMetricsCache, InMemoryMetricsCache, ManualClock, MetricsCache,
    MetricsCacheConfig,
};
use reach_core::{MetricsSnapshot, Platform};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn snapshot(followers: u64) -> MetricsSnapshot {
    MetricsSnapshot::builder()
        .platform(Platform::TikTok)
        .display_name("Creator One")
        .followers(followers)
        .build()
        .unwrap()
}

async fn assert_freshness_boundary(cache: &dyn MetricsCache, clock: &ManualClock) {
    let max_age = Duration::from_secs(3600);
    cache
        .put(Platform::TikTok, "creatorone", snapshot(10))
        .await
        .unwrap();

    // t - t0 == M is still fresh
    clock.advance(max_age);
    assert!(
        cache
            .get(Platform::TikTok, "creatorone", max_age)
            .await
            .unwrap()
            .is_some()
    );

    // t - t0 > M is a miss
    clock.advance(Duration::from_secs(1));
    assert!(
        cache
            .get(Platform::TikTok, "creatorone", max_age)
            .await
            .unwrap()
            .is_none()
    );

    // A larger max_age still accepts the same entry
    assert!(
        cache
            .get(Platform::TikTok, "creatorone", Duration::from_secs(7200))
            .await
            .unwrap()
            .is_some()
    );
}

#[tokio::test]
async fn test_memory_freshness_boundary() {
    let clock = Arc::new(ManualClock::default());
    let cache = InMemoryMetricsCache::with_clock(MetricsCacheConfig::default(), clock.clone());
    assert_freshness_boundary(&cache, &clock).await;
}

#[tokio::test]
async fn test_filesystem_freshness_boundary() {
    let dir = TempDir::new().unwrap();
    let clock = Arc::new(ManualClock::default());
    let cache = FileSystemMetricsCache::with_clock(dir.path(), clock.clone()).unwrap();
    assert_freshness_boundary(&cache, &clock).await;
}

#[tokio::test]
async fn test_put_replaces_whole_entry() {
    let clock = Arc::new(ManualClock::default());
    let cache = InMemoryMetricsCache::with_clock(MetricsCacheConfig::default(), clock.clone());

    let first = MetricsSnapshot::builder()
        .platform(Platform::TikTok)
        .followers(10u64)
        .bio("old bio")
        .build()
        .unwrap();
    cache.put(Platform::TikTok, "creatorone", first).await.unwrap();

    clock.advance(Duration::from_secs(30));
    cache
        .put(Platform::TikTok, "creatorone", snapshot(20))
        .await
        .unwrap();

    let entry = cache
        .get(Platform::TikTok, "creatorone", Duration::from_secs(10))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(entry.snapshot().followers(), 20);
    assert!(entry.snapshot().bio().is_empty());
    assert_eq!(entry.fetched_at(), clock.now());
}

#[tokio::test]
async fn test_platforms_do_not_share_keys() {
    let cache = InMemoryMetricsCache::default();
    cache
        .put(Platform::TikTok, "creatorone", snapshot(10))
        .await
        .unwrap();

    assert!(
        cache
            .get(Platform::YouTube, "creatorone", Duration::from_secs(60))
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn test_lru_eviction() {
    let config = MetricsCacheConfig::default().with_max_entries(2);
    let cache = InMemoryMetricsCache::new(config);
    let max_age = Duration::from_secs(60);

    cache.put(Platform::TikTok, "a", snapshot(1)).await.unwrap();
    cache.put(Platform::TikTok, "b", snapshot(2)).await.unwrap();

    // Touch "a" so "b" becomes least recently used
    cache.get(Platform::TikTok, "a", max_age).await.unwrap();
    cache.put(Platform::TikTok, "c", snapshot(3)).await.unwrap();

    assert_eq!(cache.len().await, 2);
    assert!(cache.get(Platform::TikTok, "a", max_age).await.unwrap().is_some());
    assert!(cache.get(Platform::TikTok, "b", max_age).await.unwrap().is_none());
    assert!(cache.get(Platform::TikTok, "c", max_age).await.unwrap().is_some());
}

#[tokio::test]
async fn test_disabled_cache_never_hits() {
    let config = MetricsCacheConfig::default().with_enabled(false);
    let cache = InMemoryMetricsCache::new(config);

    cache.put(Platform::TikTok, "a", snapshot(1)).await.unwrap();
    assert!(cache.is_empty().await);
    assert!(
        cache
            .get(Platform::TikTok, "a", Duration::from_secs(60))
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn test_filesystem_survives_reopen() {
    let dir = TempDir::new().unwrap();
    {
        let cache = FileSystemMetricsCache::new(dir.path()).unwrap();
        cache
            .put(Platform::TikTok, "creatorone", snapshot(42))
            .await
            .unwrap();
    }

    let reopened = FileSystemMetricsCache::new(dir.path()).unwrap();
    let entry = reopened
        .get(Platform::TikTok, "creatorone", Duration::from_secs(60))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(entry.snapshot().followers(), 42);
    assert_eq!(entry.key().canonical(), "creatorone");
}

#[tokio::test]
async fn test_filesystem_corrupt_entry_is_an_error() {
    let dir = TempDir::new().unwrap();
    let cache = FileSystemMetricsCache::new(dir.path()).unwrap();
    cache
        .put(Platform::TikTok, "creatorone", snapshot(1))
        .await
        .unwrap();

    let platform_dir = dir.path().join("tiktok");
    for shard in std::fs::read_dir(&platform_dir).unwrap() {
        for file in std::fs::read_dir(shard.unwrap().path()).unwrap() {
            std::fs::write(file.unwrap().path(), b"{not json").unwrap();
        }
    }

    assert!(
        cache
            .get(Platform::TikTok, "creatorone", Duration::from_secs(60))
            .await
            .is_err()
    );
}

#[tokio::test]
async fn test_filesystem_leaves_no_temp_files() {
    let dir = TempDir::new().unwrap();
    let cache = FileSystemMetricsCache::new(dir.path()).unwrap();
    for n in 0..5 {
        cache
            .put(Platform::TikTok, "creatorone", snapshot(n))
            .await
            .unwrap();
    }

    let platform_dir = dir.path().join("tiktok");
    let files: Vec<_> = std::fs::read_dir(&platform_dir)
        .unwrap()
        .flat_map(|shard| std::fs::read_dir(shard.unwrap().path()).unwrap())
        .map(|file| file.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    assert_eq!(files.len(), 1);
    assert!(files[0].ends_with(".json"));
}
