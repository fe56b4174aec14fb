//! End-to-end tests for the metrics orchestrator against a scripted upstream.

use async_trait::async_trait;
use reach::policies::BuiltinPolicy;
use reach::{
    CacheEntry, CacheError, CacheErrorKind, FetchOptions, FetchResult, FileSystemMetricsCache,
    InMemoryMetricsCache, MetricsCache, MetricsService, MetricsSnapshot, Platform, PlatformConfig,
    ReachConfig, ReachErrorKind, ReachResult, ScriptedReply, ScriptedTransport, YouTubeSettings,
};
use std::sync::Arc;
use std::time::Duration;

const CHANNEL_ID: &str = "UCabcdefghijklmnopqrstuv";

const TIKTOK_API_BODY: &str = r#"{"statusCode":0,"userInfo":{"user":{"nickname":"Creator One"},"stats":{"followerCount":1200,"followingCount":12,"heartCount":48000,"videoCount":31}}}"#;

const TIKTOK_PAGE: &str = r#"<html><head><script id="__UNIVERSAL_DATA_FOR_REHYDRATION__" type="application/json">{"__DEFAULT_SCOPE__":{"webapp.user-detail":{"statusCode":0,"userInfo":{"user":{"nickname":"Creator One"},"stats":{"followerCount":1300,"heartCount":50000,"videoCount":32}}}}}</script></head></html>"#;

const TIKTOK_PAGE_WITH_ITEMS: &str = r#"<html><head><script id="__UNIVERSAL_DATA_FOR_REHYDRATION__" type="application/json">{"__DEFAULT_SCOPE__":{"webapp.user-detail":{"statusCode":0,"userInfo":{"user":{"nickname":"Creator One"},"stats":{"followerCount":1300,"heartCount":50000,"videoCount":32}},"itemList":[{"id":"9","desc":"clip","createTime":1700000000,"stats":{"playCount":5000,"diggCount":400,"commentCount":20}}]}}}</script></head></html>"#;

fn channels_body(subscribers: u64) -> String {
    format!(
        r#"{{"items":[{{"id":"{}","snippet":{{"title":"Creator Two"}},"statistics":{{"subscriberCount":"{}","viewCount":"880000","videoCount":"120"}}}}]}}"#,
        CHANNEL_ID, subscribers
    )
}

struct Harness {
    service: MetricsService,
    transport: ScriptedTransport,
    cache: Arc<InMemoryMetricsCache>,
}

fn harness(transport: ScriptedTransport, config: ReachConfig) -> Harness {
    let cache = Arc::new(InMemoryMetricsCache::default());
    let service = MetricsService::builder()
        .config(config)
        .cache(cache.clone())
        .transport(Arc::new(transport.clone()))
        .max_retries(0)
        .build()
        .unwrap();
    Harness {
        service,
        transport,
        cache,
    }
}

fn config_with_key() -> ReachConfig {
    ReachConfig {
        youtube: YouTubeSettings {
            api_key: Some("test-key".to_string()),
        },
        ..ReachConfig::default()
    }
}

fn unthrottled_tiktok() -> ReachConfig {
    let mut config = ReachConfig::default();
    let mut tiktok: PlatformConfig = BuiltinPolicy::TikTok.into();
    tiktok.min_interval_secs = 0;
    config.platforms.insert("tiktok".to_string(), tiktok);
    config
}

fn hour() -> FetchOptions {
    FetchOptions::default().with_max_cache_age(Duration::from_secs(3600))
}

fn uncached() -> FetchOptions {
    FetchOptions::default().with_max_cache_age(Duration::ZERO)
}

#[tokio::test]
async fn cold_then_warm_fetch() {
    let h = harness(
        ScriptedTransport::new().route("/api/user/detail", [ScriptedReply::ok(TIKTOK_API_BODY)]),
        ReachConfig::default(),
    );

    let first = h
        .service
        .fetch_metrics(Platform::TikTok, "@CreatorOne", hour())
        .await
        .unwrap();
    let FetchResult::Success { snapshot, cached } = &first else {
        panic!("expected success, got {:?}", first);
    };
    assert!(!cached);
    assert_eq!(snapshot.followers(), 1200);
    assert_eq!(h.transport.request_count(), 1);
    assert_eq!(h.cache.len().await, 1);

    let second = h
        .service
        .fetch_metrics(Platform::TikTok, "@CreatorOne", hour())
        .await
        .unwrap();
    assert_eq!(
        second,
        FetchResult::Success {
            snapshot: snapshot.clone(),
            cached: true
        }
    );
    assert_eq!(h.transport.request_count(), 1);
    assert_eq!(h.service.upstream_calls(), 1);
}

#[tokio::test]
async fn equivalent_inputs_share_the_cache_entry() {
    let h = harness(
        ScriptedTransport::new().route("/api/user/detail", [ScriptedReply::ok(TIKTOK_API_BODY)]),
        ReachConfig::default(),
    );

    h.service
        .fetch_metrics(Platform::TikTok, "@CreatorOne", hour())
        .await
        .unwrap();
    let again = h
        .service
        .fetch_metrics(Platform::TikTok, "https://www.tiktok.com/@creatorone?lang=en", hour())
        .await
        .unwrap();

    assert!(matches!(again, FetchResult::Success { cached: true, .. }));
    assert_eq!(h.transport.request_count(), 1);
}

#[tokio::test]
async fn cache_hit_touches_neither_limiter_nor_quota() {
    let h = harness(
        ScriptedTransport::new().route("/api/user/detail", [ScriptedReply::ok(TIKTOK_API_BODY)]),
        ReachConfig::default(),
    );
    let seeded = MetricsSnapshot::builder()
        .platform(Platform::TikTok)
        .followers(5u64)
        .build()
        .unwrap();
    h.cache
        .put(Platform::TikTok, "creatorone", seeded.clone())
        .await
        .unwrap();

    let hit = h
        .service
        .fetch_metrics(Platform::TikTok, "creatorone", hour())
        .await
        .unwrap();
    assert_eq!(
        hit,
        FetchResult::Success {
            snapshot: seeded,
            cached: true
        }
    );
    assert_eq!(h.transport.request_count(), 0);
    assert_eq!(h.service.current_usage(Platform::TikTok).await, 0);

    // The limiter was never consulted, so a forced refresh is admitted
    let refresh = h
        .service
        .fetch_metrics(Platform::TikTok, "creatorone", uncached())
        .await
        .unwrap();
    assert!(matches!(refresh, FetchResult::Success { cached: false, .. }));
}

#[tokio::test]
async fn second_attempt_within_interval_is_rate_limited() {
    let h = harness(
        ScriptedTransport::new().route("/api/user/detail", [ScriptedReply::ok(TIKTOK_API_BODY)]),
        ReachConfig::default(),
    );

    let first = h
        .service
        .fetch_metrics(Platform::TikTok, "creatorone", uncached())
        .await
        .unwrap();
    assert!(first.is_success());

    let second = h
        .service
        .fetch_metrics(Platform::TikTok, "creatorone", uncached())
        .await
        .unwrap();
    let FetchResult::RateLimited { retry_after } = second else {
        panic!("expected rate limit, got {:?}", second);
    };
    assert!(retry_after > Duration::ZERO);
    assert!(retry_after <= Duration::from_secs(10));
    assert_eq!(h.transport.request_count(), 1);
}

#[tokio::test]
async fn format_change_never_poisons_the_cache() {
    let h = harness(
        ScriptedTransport::new()
            .route(
                "/youtube/v3/channels",
                [
                    ScriptedReply::ok(channels_body(5400)),
                    ScriptedReply::ok(r#"{"unexpected":true}"#),
                ],
            )
            .route("youtube.com/channel/", [ScriptedReply::ok("<html><body>redesigned</body></html>")]),
        config_with_key(),
    );

    let good = h
        .service
        .fetch_metrics(Platform::YouTube, CHANNEL_ID, hour())
        .await
        .unwrap();
    let good_snapshot = good.snapshot().unwrap().clone();
    assert_eq!(good_snapshot.followers(), 5400);

    let degraded = h
        .service
        .fetch_metrics(Platform::YouTube, CHANNEL_ID, uncached())
        .await
        .unwrap();
    let FetchResult::UpstreamFormatChanged { snapshot } = &degraded else {
        panic!("expected format change, got {:?}", degraded);
    };
    assert!(snapshot.is_empty());

    let entry = h
        .cache
        .get(Platform::YouTube, CHANNEL_ID, Duration::from_secs(3600))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(entry.snapshot(), &good_snapshot);
}

#[tokio::test]
async fn format_change_on_cold_cache_leaves_it_empty() {
    let h = harness(
        ScriptedTransport::new()
            .route("/api/user/detail", [ScriptedReply::ok("")])
            .route("tiktok.com/@", [ScriptedReply::ok("<html></html>")]),
        ReachConfig::default(),
    );

    let result = h
        .service
        .fetch_metrics(Platform::TikTok, "creatorone", hour())
        .await
        .unwrap();
    assert!(matches!(result, FetchResult::UpstreamFormatChanged { .. }));
    assert!(h.cache.is_empty().await);
}

#[tokio::test]
async fn chain_falls_through_to_page_scrape() {
    let h = harness(
        ScriptedTransport::new()
            .route("/api/user/detail", [ScriptedReply::status(404, "")])
            .route("tiktok.com/@", [ScriptedReply::ok(TIKTOK_PAGE)]),
        ReachConfig::default(),
    );

    let result = h
        .service
        .fetch_metrics(Platform::TikTok, "creatorone", hour())
        .await
        .unwrap();
    let FetchResult::Success { snapshot, cached } = result else {
        panic!("expected success, got {:?}", result);
    };
    assert!(!cached);
    assert_eq!(snapshot.followers(), 1300);
    assert_eq!(h.transport.request_count(), 2);
}

#[tokio::test]
async fn lookup_and_search_cost_101_units_even_when_not_found() {
    let h = harness(
        ScriptedTransport::new()
            .route("/youtube/v3/channels", [ScriptedReply::ok(r#"{"items":[]}"#)])
            .route("/youtube/v3/search", [ScriptedReply::ok(r#"{"items":[]}"#)]),
        config_with_key(),
    );

    let result = h
        .service
        .fetch_metrics(Platform::YouTube, "@nobodyhere", hour())
        .await
        .unwrap();

    assert_eq!(result, FetchResult::NotFound);
    assert_eq!(h.transport.request_count(), 2);
    assert_eq!(h.service.current_usage(Platform::YouTube).await, 101);
}

#[tokio::test]
async fn failed_fetch_is_still_charged() {
    let search = format!(r#"{{"items":[{{"id":{{"channelId":"{}"}}}}]}}"#, CHANNEL_ID);
    let h = harness(
        ScriptedTransport::new()
            .route("/youtube/v3/channels", [ScriptedReply::ok(r#"{"items":[]}"#), ScriptedReply::status(503, "")])
            .route("/youtube/v3/search", [ScriptedReply::ok(search)])
            .route("youtube.com/channel/", [ScriptedReply::status(503, "")]),
        config_with_key(),
    );

    let result = h
        .service
        .fetch_metrics(Platform::YouTube, "@creatortwo", hour())
        .await
        .unwrap();

    assert!(matches!(result, FetchResult::TransientError { .. }));
    // lookup (1) + search (100) + details (1) + page (0)
    assert_eq!(h.service.current_usage(Platform::YouTube).await, 102);
    assert!(h.cache.is_empty().await);
}

#[tokio::test]
async fn upstream_block_is_reported_as_rate_limited() {
    let h = harness(
        ScriptedTransport::new()
            .route(
                "/api/user/detail",
                [ScriptedReply::status(429, "").with_header("retry-after", "120")],
            )
            .route("tiktok.com/@", [ScriptedReply::ok(TIKTOK_PAGE)]),
        ReachConfig::default(),
    );

    let result = h
        .service
        .fetch_metrics(Platform::TikTok, "creatorone", hour())
        .await
        .unwrap();

    assert_eq!(
        result,
        FetchResult::RateLimited {
            retry_after: Duration::from_secs(120)
        }
    );
    assert_eq!(h.transport.request_count(), 1);
}

#[tokio::test]
async fn concurrent_identical_requests_share_one_fetch() {
    let transport = ScriptedTransport::new()
        .route("/api/user/detail", [ScriptedReply::ok(TIKTOK_API_BODY)])
        .with_latency(Duration::from_millis(200));
    let h = harness(transport, ReachConfig::default());

    let tasks: Vec<_> = (0..16)
        .map(|_| {
            let service = h.service.clone();
            tokio::spawn(async move {
                service
                    .fetch_metrics(Platform::TikTok, "@CreatorOne", hour())
                    .await
                    .unwrap()
            })
        })
        .collect();

    for task in tasks {
        let result = task.await.unwrap();
        assert!(result.is_success(), "got {:?}", result);
    }
    assert_eq!(h.transport.request_count(), 1);
}

#[tokio::test]
async fn deadline_abandons_the_fetch() {
    let h = harness(
        ScriptedTransport::new().route("/api/user/detail", [ScriptedReply::Hang]),
        ReachConfig::default(),
    );

    let started = std::time::Instant::now();
    let result = h
        .service
        .fetch_metrics(
            Platform::TikTok,
            "creatorone",
            hour().with_deadline(Duration::from_millis(100)),
        )
        .await
        .unwrap();

    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(matches!(result, FetchResult::TransientError { .. }));
    assert!(h.cache.is_empty().await);
}

#[tokio::test]
async fn empty_identifier_is_an_error() {
    let h = harness(ScriptedTransport::new(), ReachConfig::default());
    let err = h
        .service
        .fetch_metrics(Platform::TikTok, "  @ ", hour())
        .await
        .unwrap_err();
    assert!(matches!(err.kind(), ReachErrorKind::Identifier(_)));
    assert_eq!(h.transport.request_count(), 0);
}

#[tokio::test]
async fn quota_usage_reports_every_platform() {
    let h = harness(ScriptedTransport::new(), ReachConfig::default());
    let usage = h.service.quota_usage().await;
    let platforms: Vec<Platform> = usage.iter().map(|u| u.counter().platform()).collect();
    assert_eq!(platforms, vec![Platform::TikTok, Platform::YouTube]);
    assert_eq!(usage[1].budget(), Some(10_000));
}

/// Backend that is always down.
struct UnavailableCache;

#[async_trait]
impl MetricsCache for UnavailableCache {
    async fn get(
        &self,
        _platform: Platform,
        _canonical: &str,
        _max_age: Duration,
    ) -> ReachResult<Option<CacheEntry>> {
        Err(CacheError::new(CacheErrorKind::Unavailable("connection refused".to_string())).into())
    }

    async fn put(
        &self,
        _platform: Platform,
        _canonical: &str,
        _snapshot: MetricsSnapshot,
    ) -> ReachResult<()> {
        Err(CacheError::new(CacheErrorKind::Unavailable("connection refused".to_string())).into())
    }
}

#[tokio::test]
async fn unavailable_cache_does_not_fail_the_fetch() {
    let transport =
        ScriptedTransport::new().route("/api/user/detail", [ScriptedReply::ok(TIKTOK_API_BODY)]);
    let service = MetricsService::builder()
        .cache(Arc::new(UnavailableCache))
        .transport(Arc::new(transport.clone()))
        .max_retries(0)
        .build()
        .unwrap();

    let result = service
        .fetch_metrics(Platform::TikTok, "creatorone", hour())
        .await
        .unwrap();

    assert!(matches!(result, FetchResult::Success { cached: false, .. }));
    assert_eq!(transport.request_count(), 1);
}

#[tokio::test]
async fn filesystem_cache_survives_a_new_service() {
    let dir = tempfile::tempdir().unwrap();
    let transport =
        ScriptedTransport::new().route("/api/user/detail", [ScriptedReply::ok(TIKTOK_API_BODY)]);

    let build = || {
        MetricsService::builder()
            .cache(Arc::new(FileSystemMetricsCache::new(dir.path()).unwrap()))
            .transport(Arc::new(transport.clone()))
            .max_retries(0)
            .build()
            .unwrap()
    };

    let first = build()
        .fetch_metrics(Platform::TikTok, "creatorone", hour())
        .await
        .unwrap();
    assert!(matches!(first, FetchResult::Success { cached: false, .. }));

    let second = build()
        .fetch_metrics(Platform::TikTok, "@CreatorOne", hour())
        .await
        .unwrap();
    assert!(matches!(second, FetchResult::Success { cached: true, .. }));
    assert_eq!(transport.request_count(), 1);
}

#[tokio::test]
async fn plain_cache_entry_does_not_answer_extras_request() {
    let h = harness(
        ScriptedTransport::new()
            .route("/api/user/detail", [ScriptedReply::status(404, "")])
            .route("tiktok.com/@", [ScriptedReply::ok(TIKTOK_PAGE_WITH_ITEMS)]),
        unthrottled_tiktok(),
    );
    let with_extras = || hour().with_include_extras(true);

    let plain = h
        .service
        .fetch_metrics(Platform::TikTok, "creatorone", hour())
        .await
        .unwrap();
    assert!(plain.snapshot().unwrap().top_content().is_empty());
    assert_eq!(h.transport.request_count(), 2);

    let extras = h
        .service
        .fetch_metrics(Platform::TikTok, "creatorone", with_extras())
        .await
        .unwrap();
    let FetchResult::Success { snapshot, cached } = &extras else {
        panic!("expected success, got {:?}", extras);
    };
    assert!(!cached);
    assert_eq!(snapshot.top_content().len(), 1);
    assert_eq!(h.transport.request_count(), 4);

    // The richer entry now answers both kinds of request
    let again = h
        .service
        .fetch_metrics(Platform::TikTok, "creatorone", with_extras())
        .await
        .unwrap();
    assert_eq!(
        again,
        FetchResult::Success {
            snapshot: snapshot.clone(),
            cached: true
        }
    );
    let plain_again = h
        .service
        .fetch_metrics(Platform::TikTok, "creatorone", hour())
        .await
        .unwrap();
    assert!(matches!(plain_again, FetchResult::Success { cached: true, .. }));
    assert_eq!(h.transport.request_count(), 4);
}

#[tokio::test]
async fn challenge_page_is_rate_limited_not_format_changed() {
    let challenge = r#"<html><head><title>Verify to continue</title></head><body></body></html>"#;
    let h = harness(
        ScriptedTransport::new()
            .route("/api/user/detail", [ScriptedReply::ok(challenge)])
            .route("tiktok.com/@", [ScriptedReply::ok(TIKTOK_PAGE)]),
        ReachConfig::default(),
    );

    let result = h
        .service
        .fetch_metrics(Platform::TikTok, "creatorone", hour())
        .await
        .unwrap();

    assert_eq!(
        result,
        FetchResult::RateLimited {
            retry_after: Duration::from_secs(60)
        }
    );
    assert_eq!(h.transport.request_count(), 1);
    assert!(h.cache.is_empty().await);
}
