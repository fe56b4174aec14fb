//! Platform policy trait for admission and accounting limits.

use reach_core::CallType;
use std::time::Duration;

/// Limits and costs that govern calls to one platform.
///
/// # Example
///
/// ```
/// use reach_core::CallType;
/// use reach_rate_limit::PlatformPolicy;
/// use std::time::Duration;
///
/// struct Unmetered;
///
/// impl PlatformPolicy for Unmetered {
///     fn min_interval(&self) -> Duration { Duration::ZERO }
///     fn strategy_timeout(&self) -> Duration { Duration::from_secs(5) }
///     fn strategies(&self) -> Vec<String> { vec!["api".to_string()] }
///     fn unit_cost(&self, _call: CallType) -> u64 { 0 }
///     fn cost_table_version(&self) -> &str { "none" }
///     fn quota_window(&self) -> Duration { Duration::from_secs(86_400) }
///     fn daily_budget(&self) -> Option<u64> { None }
/// }
///
/// assert_eq!(Unmetered.unit_cost(CallType::Search), 0);
/// ```
pub trait PlatformPolicy: Send + Sync {
    /// Minimum spacing between fetch attempts for the same identifier.
    ///
    /// Zero disables wall-clock throttling for the platform.
    fn min_interval(&self) -> Duration;

    /// Bounded wait applied to every strategy invocation.
    fn strategy_timeout(&self) -> Duration;

    /// Strategy names in the order the chain tries them.
    fn strategies(&self) -> Vec<String>;

    /// Quota units charged for one call of the given type.
    fn unit_cost(&self, call: CallType) -> u64;

    /// Version label of the cost table, reported with usage snapshots.
    fn cost_table_version(&self) -> &str;

    /// Length of the accounting window before counters reset.
    fn quota_window(&self) -> Duration;

    /// Units available per window, if the platform documents a budget.
    fn daily_budget(&self) -> Option<u64>;
}
