//! `reach config` handler.

use reach::{Platform, ReachConfig};
use strum::IntoEnumIterator;

/// Print the merged configuration as TOML, with built-in policies filled in.
pub fn show_config() -> Result<(), Box<dyn std::error::Error>> {
    let mut config = ReachConfig::load()?;

    for platform in Platform::iter() {
        let effective = config.platform(platform);
        config
            .platforms
            .insert(platform.as_str().to_string(), effective);
    }
    if config.youtube_api_key().is_some() {
        config.youtube.api_key = Some("<redacted>".to_string());
    }

    println!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}
