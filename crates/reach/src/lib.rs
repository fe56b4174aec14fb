//! Reach - social platform metrics acquisition
//!
//! Given a creator's handle on TikTok or YouTube, reach produces a
//! normalized metrics snapshot while respecting each platform's limits,
//! tolerating upstream breakage, and avoiding redundant network calls.
//!
//! # Features
//!
//! - **Identifier normalization**: `@Handle`, profile URLs and channel IDs map to one cache key
//! - **Admission control**: minimum interval per `(platform, identifier)`, enforced atomically
//! - **Snapshot cache**: freshness checked on read, written only on genuine success
//! - **Quota accounting**: versioned per-call unit costs, rolling windows
//! - **Strategy chains**: structured API first, page scrape as fallback
//! - **Single-flight**: concurrent identical requests share one upstream fetch
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use reach::{FetchOptions, FetchResult, MetricsService, Platform, ReachConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let service = MetricsService::from_config(ReachConfig::load()?)?;
//!
//!     match service
//!         .fetch_metrics(Platform::TikTok, "@creatorone", FetchOptions::default())
//!         .await?
//!     {
//!         FetchResult::Success { snapshot, cached } => {
//!             println!("{} followers (cached: {})", snapshot.followers(), cached)
//!         }
//!         FetchResult::NotFound => println!("no such profile"),
//!         FetchResult::RateLimited { retry_after } => println!("try again in {:?}", retry_after),
//!         FetchResult::UpstreamFormatChanged { .. } => println!("data temporarily unavailable"),
//!         FetchResult::TransientError { detail } => println!("transient failure: {}", detail),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! Reach is organized as a workspace with focused crates:
//!
//! - `reach_error` - Error types
//! - `reach_core` - Platforms, identifiers, snapshots, the `FetchResult` envelope
//! - `reach_rate_limit` - Configuration, admission control, quota accounting
//! - `reach_cache` - Snapshot cache contract and backends
//! - `reach_social` - Transport, resolvers, strategies, TikTok and YouTube
//!
//! This crate (`reach`) adds the orchestrator and re-exports everything for convenience.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod service;
mod single_flight;

pub use service::{MetricsService, MetricsServiceBuilder};
pub use single_flight::{FlightRole, SingleFlight};

pub use reach_cache::*;
pub use reach_core::*;
pub use reach_error::*;
pub use reach_rate_limit::*;
pub use reach_social::*;
