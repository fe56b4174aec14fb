//! Tests for per-identifier admission control.

use reach_core::Platform;
use reach_rate_limit::{Acquire, KeyedRateLimiter, policies::BuiltinPolicy};
use std::sync::Arc;
use std::time::Duration;

#[test]
fn test_second_attempt_within_interval_denied() {
    let limiter = KeyedRateLimiter::new([(Platform::TikTok, Duration::from_secs(10))]);

    assert_eq!(limiter.try_acquire(Platform::TikTok, "creatorone"), Acquire::Allowed);

    match limiter.try_acquire(Platform::TikTok, "creatorone") {
        Acquire::Denied { retry_after } => {
            assert!(retry_after > Duration::from_secs(9));
            assert!(retry_after <= Duration::from_secs(10));
        }
        Acquire::Allowed => panic!("second attempt should be denied"),
    }
}

#[test]
fn test_keys_are_independent() {
    let limiter = KeyedRateLimiter::new([(Platform::TikTok, Duration::from_secs(10))]);
    assert!(limiter.try_acquire(Platform::TikTok, "a").is_allowed());
    assert!(limiter.try_acquire(Platform::TikTok, "b").is_allowed());
    assert!(!limiter.try_acquire(Platform::TikTok, "a").is_allowed());
}

#[test]
fn test_zero_interval_never_throttles() {
    let limiter = KeyedRateLimiter::new([
        (Platform::TikTok, Duration::from_secs(10)),
        (Platform::YouTube, Duration::ZERO),
    ]);
    for _ in 0..100 {
        assert!(limiter.try_acquire(Platform::YouTube, "channel").is_allowed());
    }
}

#[test]
fn test_admitted_again_after_interval() {
    let limiter = KeyedRateLimiter::new([(Platform::TikTok, Duration::from_millis(50))]);
    assert!(limiter.try_acquire(Platform::TikTok, "creatorone").is_allowed());
    assert!(!limiter.try_acquire(Platform::TikTok, "creatorone").is_allowed());

    std::thread::sleep(Duration::from_millis(80));
    assert!(limiter.try_acquire(Platform::TikTok, "creatorone").is_allowed());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_acquire_admits_exactly_one() {
    let limiter = Arc::new(KeyedRateLimiter::new([(
        Platform::TikTok,
        Duration::from_secs(10),
    )]));
    let barrier = Arc::new(tokio::sync::Barrier::new(64));

    let handles: Vec<_> = (0..64)
        .map(|_| {
            let limiter = limiter.clone();
            let barrier = barrier.clone();
            tokio::spawn(async move {
                barrier.wait().await;
                limiter.try_acquire(Platform::TikTok, "creatorone")
            })
        })
        .collect();

    let mut allowed = 0;
    let mut denied = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Acquire::Allowed => allowed += 1,
            Acquire::Denied { .. } => denied += 1,
        }
    }

    assert_eq!(allowed, 1);
    assert_eq!(denied, 63);
}

#[test]
fn test_prune_drops_elapsed_tickets() {
    let limiter = KeyedRateLimiter::new([(Platform::TikTok, Duration::from_millis(20))]);
    for key in ["a", "b", "c"] {
        limiter.try_acquire(Platform::TikTok, key);
    }
    assert_eq!(limiter.len(), 3);

    std::thread::sleep(Duration::from_millis(50));
    assert_eq!(limiter.prune(), 0);
    assert!(limiter.is_empty());
}

#[test]
fn test_from_policies() {
    let tiktok = BuiltinPolicy::TikTok;
    let youtube = BuiltinPolicy::YouTube;
    let limiter = KeyedRateLimiter::from_policies([
        (Platform::TikTok, &tiktok),
        (Platform::YouTube, &youtube),
    ]);

    assert!(limiter.try_acquire(Platform::TikTok, "x").is_allowed());
    assert!(!limiter.try_acquire(Platform::TikTok, "x").is_allowed());
    assert!(limiter.try_acquire(Platform::YouTube, "x").is_allowed());
    assert!(limiter.try_acquire(Platform::YouTube, "x").is_allowed());
}
