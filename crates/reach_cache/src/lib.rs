//! Metrics snapshot caching with freshness checks.
//!
//! The [`MetricsCache`] trait is the contract the orchestrator consumes:
//! `get` applies the caller's `max_age` itself and reports stale entries
//! as a miss, and `put` always replaces the whole entry. Two backends are
//! provided: a bounded in-memory LRU and a JSON-file store.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod clock;
mod filesystem;
mod memory;
mod store;

pub use clock::{CacheClock, ManualClock, SystemClock};
pub use filesystem::FileSystemMetricsCache;
pub use memory::{InMemoryMetricsCache, MetricsCacheConfig, MetricsCacheConfigBuilder};
pub use store::{CacheEntry, CacheKey, MetricsCache};
