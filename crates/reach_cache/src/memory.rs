//! Bounded in-memory snapshot cache.

use crate::{CacheClock, CacheEntry, CacheKey, MetricsCache, SystemClock};
use async_trait::async_trait;
use derive_getters::Getters;
use reach_core::{MetricsSnapshot, Platform};
use reach_error::ReachResult;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Configuration for the in-memory cache.
#[derive(
    Debug, Clone, Serialize, Deserialize, Getters, derive_setters::Setters, derive_builder::Builder,
)]
#[setters(prefix = "with_")]
pub struct MetricsCacheConfig {
    /// Maximum number of entries before LRU eviction
    #[serde(default = "default_max_entries")]
    #[builder(default = "default_max_entries()")]
    max_entries: usize,

    /// Whether caching is enabled
    #[serde(default = "default_enabled")]
    #[builder(default = "default_enabled()")]
    enabled: bool,
}

fn default_max_entries() -> usize {
    10_000
}

fn default_enabled() -> bool {
    true
}

impl Default for MetricsCacheConfig {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
            enabled: default_enabled(),
        }
    }
}

#[derive(Debug, Default)]
struct State {
    entries: HashMap<CacheKey, CacheEntry>,
    access_order: VecDeque<CacheKey>,
}

impl State {
    fn touch(&mut self, key: &CacheKey) {
        if let Some(pos) = self.access_order.iter().position(|k| k == key) {
            self.access_order.remove(pos);
        }
        self.access_order.push_back(key.clone());
    }

    fn evict_lru(&mut self) {
        if let Some(key) = self.access_order.pop_front() {
            tracing::debug!(key = %key, "Evicting LRU entry");
            self.entries.remove(&key);
        }
    }
}

/// Process-local snapshot cache with LRU eviction.
///
/// Stale entries are left in place on read; they are superseded by the next
/// successful `put` or pushed out by eviction.
///
/// # Example
///
/// ```
/// use reach_cache::{InMemoryMetricsCache, MetricsCache};
/// use reach_core::{MetricsSnapshot, Platform};
/// use std::time::Duration;
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let cache = InMemoryMetricsCache::default();
/// let snapshot = MetricsSnapshot::empty(Platform::TikTok);
///
/// cache.put(Platform::TikTok, "creatorone", snapshot.clone()).await.unwrap();
///
/// let entry = cache
///     .get(Platform::TikTok, "creatorone", Duration::from_secs(60))
///     .await
///     .unwrap()
///     .unwrap();
/// assert_eq!(entry.snapshot(), &snapshot);
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct InMemoryMetricsCache {
    config: MetricsCacheConfig,
    state: Arc<Mutex<State>>,
    clock: Arc<dyn CacheClock>,
}

impl InMemoryMetricsCache {
    /// Create a cache using the system clock.
    pub fn new(config: MetricsCacheConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a cache with an explicit clock.
    pub fn with_clock(config: MetricsCacheConfig, clock: Arc<dyn CacheClock>) -> Self {
        tracing::debug!(
            max_entries = config.max_entries,
            enabled = config.enabled,
            "Creating InMemoryMetricsCache"
        );
        Self {
            config,
            state: Arc::new(Mutex::new(State::default())),
            clock,
        }
    }

    /// Number of entries held (fresh or stale).
    pub async fn len(&self) -> usize {
        self.state.lock().await.entries.len()
    }

    /// Whether no entries are held.
    pub async fn is_empty(&self) -> bool {
        self.state.lock().await.entries.is_empty()
    }

    /// Drop every entry.
    pub async fn clear(&self) {
        let mut state = self.state.lock().await;
        let count = state.entries.len();
        state.entries.clear();
        state.access_order.clear();
        tracing::info!(cleared = count, "Cleared cache");
    }
}

impl Default for InMemoryMetricsCache {
    fn default() -> Self {
        Self::new(MetricsCacheConfig::default())
    }
}

#[async_trait]
impl MetricsCache for InMemoryMetricsCache {
    #[tracing::instrument(skip(self), fields(platform = %platform))]
    async fn get(
        &self,
        platform: Platform,
        canonical: &str,
        max_age: Duration,
    ) -> ReachResult<Option<CacheEntry>> {
        if !self.config.enabled {
            tracing::debug!("Cache disabled, reporting miss");
            return Ok(None);
        }

        let key = CacheKey::new(platform, canonical);
        let now = self.clock.now();
        let mut state = self.state.lock().await;

        let Some(entry) = state.entries.get(&key).cloned() else {
            tracing::debug!("Cache miss");
            return Ok(None);
        };

        if !entry.is_fresh_at(now, max_age) {
            tracing::debug!(age = ?entry.age_at(now), ?max_age, "Cache entry stale");
            return Ok(None);
        }

        state.touch(&key);
        tracing::debug!(age = ?entry.age_at(now), "Cache hit");
        Ok(Some(entry))
    }

    #[tracing::instrument(skip(self, snapshot), fields(platform = %platform))]
    async fn put(
        &self,
        platform: Platform,
        canonical: &str,
        snapshot: MetricsSnapshot,
    ) -> ReachResult<()> {
        if !self.config.enabled {
            tracing::debug!("Cache disabled, skipping put");
            return Ok(());
        }

        let key = CacheKey::new(platform, canonical);
        let entry = CacheEntry::new(key.clone(), snapshot, self.clock.now());
        let mut state = self.state.lock().await;

        if state.entries.len() >= self.config.max_entries && !state.entries.contains_key(&key) {
            state.evict_lru();
        }

        state.touch(&key);
        state.entries.insert(key, entry);
        tracing::debug!(size = state.entries.len(), "Stored snapshot");
        Ok(())
    }
}
