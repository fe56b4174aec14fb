//! `reach fetch` handler.

use reach::{
    FetchOptions, FetchResult, FileSystemMetricsCache, MetricsService, Platform, ReachConfig,
};
use std::sync::Arc;
use std::time::Duration;

/// Options for one fetch from the command line.
#[derive(Debug, Clone)]
pub struct FetchArgs {
    /// Platform to query
    pub platform: Platform,
    /// Raw handle
    pub handle: String,
    /// Cache age override in seconds
    pub max_cache_age: Option<u64>,
    /// List recent content
    pub extras: bool,
    /// Overall deadline in seconds
    pub deadline: Option<u64>,
    /// JSON output
    pub json: bool,
}

/// Fetch and print metrics for one creator.
#[tracing::instrument(skip(args), fields(platform = %args.platform, handle = %args.handle))]
pub async fn run_fetch(args: FetchArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = ReachConfig::load()?;

    let cache_dir = dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("reach");
    let cache = FileSystemMetricsCache::new(cache_dir)?;

    let max_cache_age = args
        .max_cache_age
        .map(Duration::from_secs)
        .unwrap_or_else(|| config.default_max_cache_age());

    let mut options = FetchOptions::default()
        .with_max_cache_age(max_cache_age)
        .with_include_extras(args.extras);
    if let Some(deadline) = args.deadline {
        options = options.with_deadline(Duration::from_secs(deadline));
    }

    let service = MetricsService::builder()
        .config(config)
        .cache(Arc::new(cache))
        .build()?;

    let result = service
        .fetch_metrics(args.platform, &args.handle, options)
        .await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_result(&result);
    }

    Ok(())
}

fn print_result(result: &FetchResult) {
    match result {
        FetchResult::Success { snapshot, cached } => {
            println!(
                "{} ({}){}",
                snapshot.display_name(),
                snapshot.platform(),
                if *cached { " [cached]" } else { "" }
            );
            if snapshot.verified() {
                println!("  verified");
            }
            println!("  followers:  {}", snapshot.followers());
            println!("  following:  {}", snapshot.following());
            println!("  likes:      {}", snapshot.likes());
            println!("  views:      {}", snapshot.views());
            println!("  content:    {}", snapshot.content_count());
            println!("  engagement: {:.2}%", snapshot.engagement_rate() * 100.0);
            for item in snapshot.top_content() {
                println!("  - {} ({} views) {}", item.title(), item.views(), item.url());
            }
        }
        FetchResult::NotFound => println!("No such profile"),
        FetchResult::RateLimited { retry_after } => {
            println!("Rate limited, try again in {}s", retry_after.as_secs().max(1))
        }
        FetchResult::UpstreamFormatChanged { .. } => {
            println!("Data temporarily unavailable (upstream format changed)")
        }
        FetchResult::TransientError { detail } => println!("Temporary failure: {}", detail),
    }
}
