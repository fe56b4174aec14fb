//! Reach CLI binary.
//!
//! This binary provides command-line access to reach:
//! - Fetch creator metrics through the cache, limiter and strategy chain
//! - Normalize identifiers
//! - Inspect the effective configuration

use clap::Parser;
use reach::{TelemetryConfig, init_telemetry};

mod cli;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use cli::{Cli, Commands, FetchArgs, run_fetch, run_normalize, show_config};

    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let telemetry = TelemetryConfig::default()
        .with_log_level(if cli.verbose { "debug" } else { "warn" })
        .with_json_logs(cli.json_logs);
    init_telemetry(telemetry)?;

    match cli.command {
        Commands::Fetch {
            platform,
            handle,
            max_cache_age,
            extras,
            deadline,
            json,
        } => {
            run_fetch(FetchArgs {
                platform,
                handle,
                max_cache_age,
                extras,
                deadline,
                json,
            })
            .await?;
        }

        Commands::Normalize { platform, input } => {
            run_normalize(platform, &input)?;
        }

        Commands::Config => {
            show_config()?;
        }
    }

    Ok(())
}
