//! The orchestrator's input options and output envelope.

use crate::{MetricsSnapshot, Platform};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default freshness window for cached snapshots (one hour).
pub const DEFAULT_MAX_CACHE_AGE: Duration = Duration::from_secs(3600);

/// A platform's own addressable key for a profile.
///
/// For TikTok this is the canonical username; for YouTube it is the
/// `UC…` channel ID produced by the resolver.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, derive_getters::Getters,
)]
pub struct CanonicalPlatformId {
    /// Platform the ID belongs to
    #[getter(copy)]
    platform: Platform,
    /// Opaque platform ID
    id: String,
}

impl CanonicalPlatformId {
    /// Wrap an ID that the platform addresses directly.
    pub fn new(platform: Platform, id: impl Into<String>) -> Self {
        Self {
            platform,
            id: id.into(),
        }
    }
}

impl std::fmt::Display for CanonicalPlatformId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.platform, self.id)
    }
}

/// Per-call options for `fetch_metrics`.
///
/// # Examples
///
/// ```
/// use reach_core::FetchOptions;
/// use std::time::Duration;
///
/// let options = FetchOptions::default()
///     .with_max_cache_age(Duration::from_secs(600))
///     .with_include_extras(true);
///
/// assert_eq!(*options.max_cache_age(), Duration::from_secs(600));
/// assert!(options.deadline().is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, derive_getters::Getters, derive_setters::Setters)]
#[setters(prefix = "with_")]
pub struct FetchOptions {
    /// Oldest cached snapshot the caller will accept. Zero bypasses the cache read.
    max_cache_age: Duration,
    /// Also list recent content (may cost an extra upstream call)
    include_extras: bool,
    /// Upper bound on the whole call; expiry yields `TransientError`
    #[setters(strip_option)]
    deadline: Option<Duration>,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            max_cache_age: DEFAULT_MAX_CACHE_AGE,
            include_extras: false,
            deadline: None,
        }
    }
}

/// Outcome of a metrics fetch. Every caller must handle all variants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FetchResult {
    /// Metrics were obtained, either fresh or from the cache.
    Success {
        /// The metrics
        snapshot: MetricsSnapshot,
        /// Served from the cache without any upstream call
        cached: bool,
    },
    /// The profile does not exist on this platform.
    NotFound,
    /// Throttled, either locally or by the upstream.
    RateLimited {
        /// Earliest point at which a retry can succeed
        retry_after: Duration,
    },
    /// Every strategy answered but none in a recognizable shape.
    UpstreamFormatChanged {
        /// All-zero placeholder so rendering code keeps working
        snapshot: MetricsSnapshot,
    },
    /// Network failure, timeout or cancellation. Safe to retry.
    TransientError {
        /// Human-readable cause
        detail: String,
    },
}

impl FetchResult {
    /// Whether this is a `Success`.
    pub fn is_success(&self) -> bool {
        matches!(self, FetchResult::Success { .. })
    }

    /// Whether the caller may retry (possibly after a delay).
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FetchResult::RateLimited { .. } | FetchResult::TransientError { .. }
        )
    }

    /// Snapshot carried by this result, if any.
    pub fn snapshot(&self) -> Option<&MetricsSnapshot> {
        match self {
            FetchResult::Success { snapshot, .. }
            | FetchResult::UpstreamFormatChanged { snapshot } => Some(snapshot),
            _ => None,
        }
    }

    /// Short lowercase label, used in logs.
    pub fn label(&self) -> &'static str {
        match self {
            FetchResult::Success { cached: true, .. } => "success_cached",
            FetchResult::Success { cached: false, .. } => "success",
            FetchResult::NotFound => "not_found",
            FetchResult::RateLimited { .. } => "rate_limited",
            FetchResult::UpstreamFormatChanged { .. } => "upstream_format_changed",
            FetchResult::TransientError { .. } => "transient_error",
        }
    }
}
