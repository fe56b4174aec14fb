//! Configuration structures for admission control, quota and caching.
//!
//! The configuration system layers, later sources winning:
//! - Bundled defaults (include_str! from reach.toml)
//! - `~/.config/reach/reach.toml`
//! - `./reach.toml`
//! - `REACH__*` environment variables

use crate::PlatformPolicy;
use crate::policies::BuiltinPolicy;
use reach_core::{CallType, Platform};
use reach_error::{ConfigError, ReachError, ReachResult};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, instrument};

/// Versioned per-call-type quota costs for one platform.
///
/// ```toml
/// [platforms.youtube.costs]
/// version = "2024-06"
///
/// [platforms.youtube.costs.units]
/// channel_details = 1
/// search = 100
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, Default)]
pub struct CostTable {
    /// Label identifying this revision of the table
    #[serde(default)]
    pub version: String,

    /// Units per call, keyed by call type name
    #[serde(default)]
    pub units: HashMap<String, u64>,
}

impl CostTable {
    /// Units for a call type. Call types missing from the table cost nothing.
    pub fn cost(&self, call: CallType) -> u64 {
        self.units.get(call.as_str()).copied().unwrap_or(0)
    }
}

/// Quota window settings for one platform.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct QuotaSettings {
    /// Window length in seconds
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,

    /// Documented unit budget per window (observability only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daily_budget: Option<u64>,
}

fn default_window_secs() -> u64 {
    86_400
}

impl Default for QuotaSettings {
    fn default() -> Self {
        Self {
            window_secs: default_window_secs(),
            daily_budget: None,
        }
    }
}

/// Limits for one platform.
///
/// ```toml
/// [platforms.tiktok]
/// min_interval_secs = 10
/// strategy_timeout_secs = 10
/// strategies = ["api", "html"]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PlatformConfig {
    /// Minimum seconds between fetches of the same identifier
    #[serde(default)]
    pub min_interval_secs: u64,

    /// Bounded wait per strategy invocation
    #[serde(default = "default_strategy_timeout_secs")]
    pub strategy_timeout_secs: u64,

    /// Ordered strategy names
    #[serde(default)]
    pub strategies: Vec<String>,

    /// Quota window
    #[serde(default)]
    pub quota: QuotaSettings,

    /// Unit costs
    #[serde(default)]
    pub costs: CostTable,
}

fn default_strategy_timeout_secs() -> u64 {
    10
}

impl PlatformPolicy for PlatformConfig {
    fn min_interval(&self) -> Duration {
        Duration::from_secs(self.min_interval_secs)
    }

    fn strategy_timeout(&self) -> Duration {
        Duration::from_secs(self.strategy_timeout_secs)
    }

    fn strategies(&self) -> Vec<String> {
        self.strategies.clone()
    }

    fn unit_cost(&self, call: CallType) -> u64 {
        self.costs.cost(call)
    }

    fn cost_table_version(&self) -> &str {
        &self.costs.version
    }

    fn quota_window(&self) -> Duration {
        Duration::from_secs(self.quota.window_secs)
    }

    fn daily_budget(&self) -> Option<u64> {
        self.quota.daily_budget
    }
}

impl From<BuiltinPolicy> for PlatformConfig {
    fn from(policy: BuiltinPolicy) -> Self {
        use strum::IntoEnumIterator;

        let units = CallType::iter()
            .map(|call| (call.as_str().to_string(), policy.unit_cost(call)))
            .filter(|(_, units)| *units > 0)
            .collect();

        Self {
            min_interval_secs: policy.min_interval().as_secs(),
            strategy_timeout_secs: policy.strategy_timeout().as_secs(),
            strategies: policy.strategies(),
            quota: QuotaSettings {
                window_secs: policy.quota_window().as_secs(),
                daily_budget: policy.daily_budget(),
            },
            costs: CostTable {
                version: policy.cost_table_version().to_string(),
                units,
            },
        }
    }
}

/// Snapshot cache settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CacheSettings {
    /// Default freshness window in seconds
    #[serde(default = "default_max_age_secs")]
    pub default_max_age_secs: u64,

    /// Entry cap for bounded backends
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,

    /// Whether caching is enabled
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_max_age_secs() -> u64 {
    3600
}

fn default_max_entries() -> usize {
    10_000
}

fn default_enabled() -> bool {
    true
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            default_max_age_secs: default_max_age_secs(),
            max_entries: default_max_entries(),
            enabled: default_enabled(),
        }
    }
}

/// YouTube Data API credentials.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, Default)]
pub struct YouTubeSettings {
    /// Data API key. Without one the structured strategy is skipped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

/// Top-level reach configuration.
///
/// # Example
///
/// ```no_run
/// use reach_core::Platform;
/// use reach_rate_limit::{PlatformPolicy, ReachConfig};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = ReachConfig::load()?;
/// let tiktok = config.platform(Platform::TikTok);
/// println!("TikTok spacing: {:?}", tiktok.min_interval());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, Default)]
pub struct ReachConfig {
    /// Snapshot cache settings
    #[serde(default)]
    pub cache: CacheSettings,

    /// Per-platform limits, keyed by lowercase platform name
    #[serde(default)]
    pub platforms: HashMap<String, PlatformConfig>,

    /// YouTube credentials
    #[serde(default)]
    pub youtube: YouTubeSettings,
}

fn config_error(context: &str, e: impl std::fmt::Display) -> ReachError {
    ReachError::from(ConfigError::new(format!("{}: {}", context, e)))
}

impl ReachConfig {
    /// Load configuration from a specific file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<std::path::Path>) -> ReachResult<Self> {
        debug!("Loading configuration from file");

        let config: Self = Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()
            .map_err(|e| {
                config_error(
                    &format!("Failed to read configuration from {}", path.as_ref().display()),
                    e,
                )
            })?
            .try_deserialize()
            .map_err(|e| config_error("Failed to parse configuration", e))?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration with precedence: env > current dir > home dir > bundled default.
    ///
    /// User config files are optional and silently skipped if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if a present source fails to parse or the merged
    /// result fails [`validate`](Self::validate).
    #[instrument]
    pub fn load() -> ReachResult<Self> {
        debug!("Loading configuration with precedence: env > current dir > home dir > bundled defaults");

        const DEFAULT_CONFIG: &str = include_str!("../../../reach.toml");

        let mut builder =
            Config::builder().add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml));

        if let Some(home) = dirs::home_dir() {
            let home_config = home.join(".config/reach/reach.toml");
            builder = builder.add_source(File::from(home_config).required(false));
        }

        builder = builder
            .add_source(File::with_name("reach").required(false))
            .add_source(
                Environment::with_prefix("REACH")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );

        let config: Self = builder
            .build()
            .map_err(|e| config_error("Failed to build configuration", e))?
            .try_deserialize()
            .map_err(|e| config_error("Failed to parse configuration", e))?;

        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the service cannot run with.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown platform section, an empty or
    /// unknown strategy list, a zero strategy timeout or a zero quota window.
    pub fn validate(&self) -> ReachResult<()> {
        for (name, platform_config) in &self.platforms {
            let platform: Platform = name
                .parse()
                .map_err(|e: String| ReachError::from(ConfigError::new(e)))?;
            let known = BuiltinPolicy::for_platform(platform).known_strategies();

            if platform_config.strategies.is_empty() {
                return Err(ConfigError::new(format!(
                    "Platform {} has an empty strategy list",
                    platform
                ))
                .into());
            }
            if let Some(unknown) = platform_config
                .strategies
                .iter()
                .find(|s| !known.contains(&s.as_str()))
            {
                return Err(ConfigError::new(format!(
                    "Unknown strategy '{}' for platform {} (expected one of {:?})",
                    unknown, platform, known
                ))
                .into());
            }
            if platform_config.strategy_timeout_secs == 0 {
                return Err(ConfigError::new(format!(
                    "Platform {} has a zero strategy timeout",
                    platform
                ))
                .into());
            }
            if platform_config.quota.window_secs == 0 {
                return Err(ConfigError::new(format!(
                    "Platform {} has a zero quota window",
                    platform
                ))
                .into());
            }
        }
        Ok(())
    }

    /// Effective settings for a platform, falling back to built-in defaults.
    #[instrument(skip(self))]
    pub fn platform(&self, platform: Platform) -> PlatformConfig {
        match self.platforms.get(platform.as_str()) {
            Some(config) => config.clone(),
            None => {
                debug!(%platform, "No configuration section, using built-in policy");
                BuiltinPolicy::for_platform(platform).into()
            }
        }
    }

    /// Default freshness window for cached snapshots.
    pub fn default_max_cache_age(&self) -> Duration {
        Duration::from_secs(self.cache.default_max_age_secs)
    }

    /// YouTube Data API key, if configured and non-blank.
    pub fn youtube_api_key(&self) -> Option<&str> {
        self.youtube
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
    }
}
