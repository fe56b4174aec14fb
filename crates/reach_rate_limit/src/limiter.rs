//! Per-identifier admission control using governor.
//!
//! Each platform gets its own keyed GCRA limiter with a burst of one and a
//! replenishment period equal to the platform's minimum interval. A key's
//! state is updated with a compare-and-swap inside governor, so "is this
//! allowed" and "remember that it started now" happen as one step: under
//! any number of concurrent callers for the same key, at most one is
//! admitted per interval.

use crate::PlatformPolicy;
use governor::clock::{Clock, DefaultClock};
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use reach_core::Platform;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, instrument};

/// Result of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acquire {
    /// The attempt may start; its start time has been recorded.
    Allowed,
    /// Another attempt for this key started too recently.
    Denied {
        /// Wait before the key is admitted again
        retry_after: Duration,
    },
}

impl Acquire {
    /// Whether the attempt was admitted.
    pub fn is_allowed(&self) -> bool {
        matches!(self, Acquire::Allowed)
    }
}

/// Minimum-interval limiter keyed by `(platform, canonical identifier)`.
///
/// The ticket map is process-local and does not survive restarts.
///
/// # Example
///
/// ```
/// use reach_core::Platform;
/// use reach_rate_limit::{Acquire, KeyedRateLimiter};
/// use std::time::Duration;
///
/// let limiter = KeyedRateLimiter::new([(Platform::TikTok, Duration::from_secs(10))]);
///
/// assert_eq!(limiter.try_acquire(Platform::TikTok, "creatorone"), Acquire::Allowed);
/// assert!(!limiter.try_acquire(Platform::TikTok, "creatorone").is_allowed());
///
/// // Other keys and unthrottled platforms are unaffected.
/// assert!(limiter.try_acquire(Platform::TikTok, "someoneelse").is_allowed());
/// assert!(limiter.try_acquire(Platform::YouTube, "creatorone").is_allowed());
/// ```
pub struct KeyedRateLimiter {
    limiters: HashMap<Platform, DefaultKeyedRateLimiter<String>>,
    clock: DefaultClock,
}

impl KeyedRateLimiter {
    /// Build from `(platform, min_interval)` pairs.
    ///
    /// Platforms that are absent, or whose interval is zero, are never throttled.
    pub fn new(intervals: impl IntoIterator<Item = (Platform, Duration)>) -> Self {
        let limiters = intervals
            .into_iter()
            .filter_map(|(platform, interval)| {
                // with_period returns None for a zero interval
                let quota = Quota::with_period(interval)?;
                debug!(%platform, ?interval, "Creating keyed limiter");
                Some((platform, RateLimiter::keyed(quota)))
            })
            .collect();

        Self {
            limiters,
            clock: DefaultClock::default(),
        }
    }

    /// Build from each platform's policy.
    pub fn from_policies<'a, P>(policies: impl IntoIterator<Item = (Platform, &'a P)>) -> Self
    where
        P: PlatformPolicy + 'a,
    {
        Self::new(
            policies
                .into_iter()
                .map(|(platform, policy)| (platform, policy.min_interval())),
        )
    }

    /// Admit or deny an attempt for a key, recording the start on admission.
    ///
    /// Never blocks.
    #[instrument(skip(self), fields(platform = %platform))]
    pub fn try_acquire(&self, platform: Platform, canonical: &str) -> Acquire {
        let Some(limiter) = self.limiters.get(&platform) else {
            return Acquire::Allowed;
        };

        match limiter.check_key(&canonical.to_string()) {
            Ok(()) => {
                debug!("Admitted");
                Acquire::Allowed
            }
            Err(not_until) => {
                let retry_after = not_until.wait_time_from(self.clock.now());
                debug!(?retry_after, "Denied");
                Acquire::Denied { retry_after }
            }
        }
    }

    /// Drop tickets whose interval has fully elapsed.
    ///
    /// Returns the number of tickets still held.
    #[instrument(skip(self))]
    pub fn prune(&self) -> usize {
        self.limiters
            .iter()
            .map(|(platform, limiter)| {
                limiter.retain_recent();
                limiter.shrink_to_fit();
                let held = limiter.len();
                debug!(%platform, held, "Pruned limiter state");
                held
            })
            .sum()
    }

    /// Number of tickets currently held across all platforms.
    pub fn len(&self) -> usize {
        self.limiters.values().map(|limiter| limiter.len()).sum()
    }

    /// Whether no tickets are held.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for KeyedRateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyedRateLimiter")
            .field("platforms", &self.limiters.keys().collect::<Vec<_>>())
            .field("tickets", &self.len())
            .finish()
    }
}
