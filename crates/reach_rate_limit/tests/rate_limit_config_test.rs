//! Tests for the layered configuration system.

use reach_core::{CallType, Platform};
use reach_rate_limit::{PlatformPolicy, ReachConfig, policies::BuiltinPolicy};
use std::io::Write;
use std::time::Duration;
use tempfile::Builder;

fn write_config(contents: &str) -> tempfile::NamedTempFile {
    let mut temp_file = Builder::new().suffix(".toml").tempfile().unwrap();
    write!(temp_file, "{}", contents).unwrap();
    temp_file
}

#[test]
fn test_load_bundled_defaults() {
    let config = ReachConfig::load().unwrap();

    let tiktok = config.platform(Platform::TikTok);
    assert_eq!(tiktok.min_interval(), Duration::from_secs(10));
    assert_eq!(tiktok.strategies(), vec!["api", "html"]);

    let youtube = config.platform(Platform::YouTube);
    assert_eq!(youtube.min_interval(), Duration::ZERO);
    assert_eq!(youtube.unit_cost(CallType::Search), 100);
    assert_eq!(youtube.unit_cost(CallType::ChannelDetails), 1);
    assert_eq!(youtube.daily_budget(), Some(10_000));
    assert_eq!(config.default_max_cache_age(), Duration::from_secs(3600));
}

#[test]
fn test_bundled_defaults_match_builtin_policies() {
    let config = ReachConfig::load().unwrap();
    for platform in [Platform::TikTok, Platform::YouTube] {
        let loaded = config.platform(platform);
        let builtin = BuiltinPolicy::for_platform(platform);
        assert_eq!(loaded.min_interval(), builtin.min_interval());
        assert_eq!(loaded.strategies(), builtin.strategies());
        assert_eq!(loaded.cost_table_version(), builtin.cost_table_version());
    }
}

#[test]
fn test_config_from_file() {
    let file = write_config(
        r#"
[cache]
default_max_age_secs = 120

[platforms.tiktok]
min_interval_secs = 30
strategy_timeout_secs = 4
strategies = ["html"]

[platforms.tiktok.costs]
version = "test"

[platforms.tiktok.costs.units]
profile_page = 2

[youtube]
api_key = "abc123"
"#,
    );

    let config = ReachConfig::from_file(file.path()).unwrap();
    let tiktok = config.platform(Platform::TikTok);
    assert_eq!(tiktok.min_interval(), Duration::from_secs(30));
    assert_eq!(tiktok.strategy_timeout(), Duration::from_secs(4));
    assert_eq!(tiktok.strategies(), vec!["html"]);
    assert_eq!(tiktok.unit_cost(CallType::ProfilePage), 2);
    assert_eq!(tiktok.unit_cost(CallType::ProfileDetail), 0);
    assert_eq!(tiktok.cost_table_version(), "test");
    assert_eq!(config.default_max_cache_age(), Duration::from_secs(120));
    assert_eq!(config.youtube_api_key(), Some("abc123"));
}

#[test]
fn test_missing_platform_falls_back_to_builtin() {
    let file = write_config("[cache]\ndefault_max_age_secs = 60\n");
    let config = ReachConfig::from_file(file.path()).unwrap();

    let youtube = config.platform(Platform::YouTube);
    assert_eq!(youtube.unit_cost(CallType::Search), 100);
    assert_eq!(youtube.strategies(), vec!["data_api", "html"]);
    assert!(config.youtube_api_key().is_none());
}

#[test]
fn test_unknown_strategy_rejected() {
    let file = write_config(
        r#"
[platforms.tiktok]
strategies = ["api", "rss"]
"#,
    );
    let err = ReachConfig::from_file(file.path()).unwrap_err();
    assert!(format!("{}", err).contains("Unknown strategy 'rss'"));
}

#[test]
fn test_empty_strategy_list_rejected() {
    let file = write_config("[platforms.youtube]\nstrategies = []\n");
    assert!(ReachConfig::from_file(file.path()).is_err());
}

#[test]
fn test_zero_timeout_rejected() {
    let file = write_config(
        r#"
[platforms.youtube]
strategies = ["html"]
strategy_timeout_secs = 0
"#,
    );
    let err = ReachConfig::from_file(file.path()).unwrap_err();
    assert!(format!("{}", err).contains("zero strategy timeout"));
}

#[test]
fn test_zero_quota_window_rejected() {
    let file = write_config(
        r#"
[platforms.youtube]
strategies = ["data_api", "html"]

[platforms.youtube.quota]
window_secs = 0
daily_budget = 10000
"#,
    );
    let err = ReachConfig::from_file(file.path()).unwrap_err();
    assert!(format!("{}", err).contains("zero quota window"));
}

#[test]
fn test_unknown_platform_rejected() {
    let file = write_config("[platforms.myspace]\nstrategies = [\"html\"]\n");
    assert!(ReachConfig::from_file(file.path()).is_err());
}

#[test]
fn test_blank_api_key_is_absent() {
    let file = write_config("[youtube]\napi_key = \"  \"\n");
    let config = ReachConfig::from_file(file.path()).unwrap();
    assert!(config.youtube_api_key().is_none());
}
