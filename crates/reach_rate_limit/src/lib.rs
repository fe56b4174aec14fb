//! Admission control and quota accounting.
//!
//! This crate decides whether an upstream call may start and keeps score
//! of what the calls cost:
//!
//! - [`KeyedRateLimiter`] enforces a minimum interval per
//!   `(platform, canonical identifier)` pair using governor's GCRA state,
//!   which updates each key atomically.
//! - [`QuotaTracker`] accumulates quota units per platform inside a rolling
//!   window using a versioned [`CostTable`].
//! - [`BlockDetector`] recognizes explicit throttling from an upstream
//!   (HTTP 429, captcha walls, API quota errors).
//! - [`ReachConfig`] loads all of the above from layered TOML.
//!
//! ## Platform policies
//!
//! Each platform's limits are expressed through the [`PlatformPolicy`] trait.
//! Built-in defaults live in [`policies::BuiltinPolicy`]; loaded
//! [`PlatformConfig`] values implement the same trait.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod detector;
mod limiter;
mod policy;
pub mod policies;
mod quota;

pub use config::{CacheSettings, CostTable, PlatformConfig, QuotaSettings, ReachConfig, YouTubeSettings};
pub use detector::{BlockDetector, BlockReason, BlockSignal, DEFAULT_RETRY_AFTER};
pub use limiter::{Acquire, KeyedRateLimiter};
pub use policy::PlatformPolicy;
pub use quota::{QuotaCounter, QuotaTracker, QuotaUsage};
