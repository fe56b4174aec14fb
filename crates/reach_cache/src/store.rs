//! The cache contract consumed by the orchestrator.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reach_core::{MetricsSnapshot, Platform};
use reach_error::ReachResult;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Cache key: platform plus canonical identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, derive_getters::Getters)]
pub struct CacheKey {
    #[getter(copy)]
    platform: Platform,
    canonical: String,
}

impl CacheKey {
    /// Build a key.
    pub fn new(platform: Platform, canonical: impl Into<String>) -> Self {
        Self {
            platform,
            canonical: canonical.into(),
        }
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.platform, self.canonical)
    }
}

/// A stored snapshot and when it was fetched.
///
/// Entries are replaced wholesale, never edited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_getters::Getters)]
pub struct CacheEntry {
    key: CacheKey,
    snapshot: MetricsSnapshot,
    #[getter(copy)]
    fetched_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Create an entry stamped at `fetched_at`.
    pub fn new(key: CacheKey, snapshot: MetricsSnapshot, fetched_at: DateTime<Utc>) -> Self {
        Self {
            key,
            snapshot,
            fetched_at,
        }
    }

    /// Age of the entry at `now`. Entries stamped in the future are zero-aged.
    pub fn age_at(&self, now: DateTime<Utc>) -> Duration {
        now.signed_duration_since(self.fetched_at)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }

    /// Fresh iff its age does not exceed `max_age`.
    pub fn is_fresh_at(&self, now: DateTime<Utc>, max_age: Duration) -> bool {
        self.age_at(now) <= max_age
    }

    /// Take the snapshot out of the entry.
    pub fn into_snapshot(self) -> MetricsSnapshot {
        self.snapshot
    }
}

/// Snapshot store keyed by `(platform, canonical identifier)`.
///
/// Implementations must make individual `get` and `put` calls atomic; no
/// transactional guarantees beyond that are assumed.
#[async_trait]
pub trait MetricsCache: Send + Sync {
    /// Entry for a key if one exists and is no older than `max_age`.
    ///
    /// A present but stale entry is reported as `None`.
    async fn get(
        &self,
        platform: Platform,
        canonical: &str,
        max_age: Duration,
    ) -> ReachResult<Option<CacheEntry>>;

    /// Store a snapshot, replacing anything already held for the key.
    async fn put(
        &self,
        platform: Platform,
        canonical: &str,
        snapshot: MetricsSnapshot,
    ) -> ReachResult<()>;
}
