//! Quota unit accounting per platform.
//!
//! Usage is observability only: nothing here blocks a call. Every upstream
//! call is recorded once, at the moment it is issued, whatever its outcome.

use crate::PlatformPolicy;
use chrono::{DateTime, Utc};
use reach_core::{CallType, Platform};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

/// Units consumed by one platform in the current window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, derive_getters::Getters)]
pub struct QuotaCounter {
    /// Platform being metered
    #[getter(copy)]
    platform: Platform,
    /// Start of the current window
    #[getter(copy)]
    window_start: DateTime<Utc>,
    /// Units charged since `window_start`
    #[getter(copy)]
    units_consumed: u64,
    /// Calls issued since `window_start`, by call type
    calls: BTreeMap<CallType, u64>,
}

impl QuotaCounter {
    fn new(platform: Platform, window_start: DateTime<Utc>) -> Self {
        Self {
            platform,
            window_start,
            units_consumed: 0,
            calls: BTreeMap::new(),
        }
    }
}

/// Usage report for external monitoring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, derive_getters::Getters)]
pub struct QuotaUsage {
    /// Current counter
    counter: QuotaCounter,
    /// Documented budget for the window, if any
    #[getter(copy)]
    budget: Option<u64>,
    /// Cost table revision used for accounting
    cost_table_version: String,
}

/// Accumulates quota units per platform.
///
/// # Example
///
/// ```
/// use reach_core::{CallType, Platform};
/// use reach_rate_limit::{QuotaTracker, policies::BuiltinPolicy};
///
/// # tokio_test_block(async {
/// let tracker = QuotaTracker::new([(Platform::YouTube, BuiltinPolicy::YouTube)]);
///
/// tracker.record_usage(Platform::YouTube, CallType::Search).await;
/// tracker.record_usage(Platform::YouTube, CallType::ChannelDetails).await;
///
/// assert_eq!(tracker.current_usage(Platform::YouTube).await, 101);
/// assert_eq!(tracker.remaining_budget(Platform::YouTube).await, Some(9_899));
/// # });
/// # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
/// #     tokio::runtime::Runtime::new().unwrap().block_on(f)
/// # }
/// ```
#[derive(Clone)]
pub struct QuotaTracker {
    policies: Arc<HashMap<Platform, Box<dyn PlatformPolicy>>>,
    counters: Arc<RwLock<HashMap<Platform, QuotaCounter>>>,
}

impl QuotaTracker {
    /// Create a tracker from each platform's policy.
    pub fn new<P>(policies: impl IntoIterator<Item = (Platform, P)>) -> Self
    where
        P: PlatformPolicy + 'static,
    {
        let policies = policies
            .into_iter()
            .map(|(platform, policy)| (platform, Box::new(policy) as Box<dyn PlatformPolicy>))
            .collect();

        Self {
            policies: Arc::new(policies),
            counters: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Charge one call against the platform's quota. Returns the units charged.
    #[instrument(skip(self), fields(platform = %platform, call = %call))]
    pub async fn record_usage(&self, platform: Platform, call: CallType) -> u64 {
        self.record_usage_at(platform, call, Utc::now()).await
    }

    /// Charge one call at an explicit time.
    pub async fn record_usage_at(
        &self,
        platform: Platform,
        call: CallType,
        now: DateTime<Utc>,
    ) -> u64 {
        let Some(policy) = self.policies.get(&platform) else {
            warn!(%platform, "No quota policy for platform, usage not recorded");
            return 0;
        };
        let units = policy.unit_cost(call);
        let window = chrono::Duration::from_std(policy.quota_window())
            .unwrap_or(chrono::Duration::MAX);

        let mut counters = self.counters.write().await;
        let counter = counters
            .entry(platform)
            .or_insert_with(|| QuotaCounter::new(platform, now));

        if now.signed_duration_since(counter.window_start) >= window {
            debug!(
                previous_units = counter.units_consumed,
                "Quota window elapsed, resetting counter"
            );
            *counter = QuotaCounter::new(platform, now);
        }

        counter.units_consumed = counter.units_consumed.saturating_add(units);
        *counter.calls.entry(call).or_insert(0) += 1;

        debug!(units, total = counter.units_consumed, "Recorded quota usage");

        if let Some(budget) = policy.daily_budget()
            && counter.units_consumed > budget
        {
            warn!(
                total = counter.units_consumed,
                budget, "Quota usage exceeds documented budget"
            );
        }

        units
    }

    /// Units consumed in the current window.
    pub async fn current_usage(&self, platform: Platform) -> u64 {
        self.current_usage_at(platform, Utc::now()).await
    }

    /// Units consumed in the window containing `now`.
    pub async fn current_usage_at(&self, platform: Platform, now: DateTime<Utc>) -> u64 {
        let counters = self.counters.read().await;
        let Some(counter) = counters.get(&platform) else {
            return 0;
        };
        if self.window_elapsed(platform, counter, now) {
            0
        } else {
            counter.units_consumed
        }
    }

    /// Units left before the documented budget, if the platform has one.
    pub async fn remaining_budget(&self, platform: Platform) -> Option<u64> {
        let budget = self.policies.get(&platform)?.daily_budget()?;
        Some(budget.saturating_sub(self.current_usage(platform).await))
    }

    /// Usage for every metered platform, including ones with no calls yet.
    #[instrument(skip(self))]
    pub async fn snapshot(&self) -> Vec<QuotaUsage> {
        let now = Utc::now();
        let counters = self.counters.read().await;

        let mut usage: Vec<QuotaUsage> = self
            .policies
            .iter()
            .map(|(platform, policy)| {
                let counter = counters
                    .get(platform)
                    .filter(|counter| !self.window_elapsed(*platform, counter, now))
                    .cloned()
                    .unwrap_or_else(|| QuotaCounter::new(*platform, now));
                QuotaUsage {
                    counter,
                    budget: policy.daily_budget(),
                    cost_table_version: policy.cost_table_version().to_string(),
                }
            })
            .collect();
        usage.sort_by_key(|u| u.counter.platform);
        usage
    }

    fn window_elapsed(&self, platform: Platform, counter: &QuotaCounter, now: DateTime<Utc>) -> bool {
        self.policies
            .get(&platform)
            .and_then(|policy| chrono::Duration::from_std(policy.quota_window()).ok())
            .is_some_and(|window| now.signed_duration_since(counter.window_start) >= window)
    }
}

impl std::fmt::Debug for QuotaTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuotaTracker")
            .field("platforms", &self.policies.keys().collect::<Vec<_>>())
            .finish()
    }
}
