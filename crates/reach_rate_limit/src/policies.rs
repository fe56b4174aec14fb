//! Built-in platform policies.
//!
//! These mirror the bundled `reach.toml` and are used whenever the loaded
//! configuration has no section for a platform.

use crate::PlatformPolicy;
use reach_core::{CallType, Platform};
use std::time::Duration;

/// Strategy names the TikTok integration understands.
pub const TIKTOK_STRATEGIES: &[&str] = &["api", "html"];

/// Strategy names the YouTube integration understands.
pub const YOUTUBE_STRATEGIES: &[&str] = &["data_api", "html"];

/// Default limits for each supported platform.
///
/// Based on YouTube Data API v3 quota costs as of 2024-06; TikTok exposes
/// no budget so each request counts as one unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::EnumIter)]
pub enum BuiltinPolicy {
    /// TikTok: 10 s between fetches of the same profile
    TikTok,
    /// YouTube: no spacing, 10 000 units per day
    YouTube,
}

impl BuiltinPolicy {
    /// Built-in policy for a platform.
    pub fn for_platform(platform: Platform) -> Self {
        match platform {
            Platform::TikTok => BuiltinPolicy::TikTok,
            Platform::YouTube => BuiltinPolicy::YouTube,
        }
    }

    /// Strategy names valid for this platform.
    pub fn known_strategies(&self) -> &'static [&'static str] {
        match self {
            BuiltinPolicy::TikTok => TIKTOK_STRATEGIES,
            BuiltinPolicy::YouTube => YOUTUBE_STRATEGIES,
        }
    }
}

impl PlatformPolicy for BuiltinPolicy {
    fn min_interval(&self) -> Duration {
        match self {
            BuiltinPolicy::TikTok => Duration::from_secs(10),
            BuiltinPolicy::YouTube => Duration::ZERO,
        }
    }

    fn strategy_timeout(&self) -> Duration {
        Duration::from_secs(10)
    }

    fn strategies(&self) -> Vec<String> {
        self.known_strategies()
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    fn unit_cost(&self, call: CallType) -> u64 {
        match (self, call) {
            (BuiltinPolicy::TikTok, CallType::ProfileDetail | CallType::ProfilePage) => 1,
            (BuiltinPolicy::TikTok, _) => 0,
            (BuiltinPolicy::YouTube, CallType::Search) => 100,
            (
                BuiltinPolicy::YouTube,
                CallType::ChannelLookup | CallType::ChannelDetails | CallType::PlaylistItems,
            ) => 1,
            (BuiltinPolicy::YouTube, _) => 0,
        }
    }

    fn cost_table_version(&self) -> &str {
        "2024-06"
    }

    fn quota_window(&self) -> Duration {
        Duration::from_secs(86_400)
    }

    fn daily_budget(&self) -> Option<u64> {
        match self {
            BuiltinPolicy::TikTok => None,
            BuiltinPolicy::YouTube => Some(10_000),
        }
    }
}
