//! CLI command definitions.

use clap::{Parser, Subcommand};
use reach_core::Platform;

/// Reach - social platform metrics with rate limiting and caching
#[derive(Parser, Debug)]
#[command(name = "reach")]
#[command(about = "Fetch TikTok and YouTube creator metrics politely", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch metrics for a creator
    Fetch {
        /// Platform (tiktok, youtube)
        platform: Platform,

        /// Handle, profile URL or channel ID
        handle: String,

        /// Oldest cached snapshot to accept, in seconds (0 bypasses the cache)
        #[arg(long)]
        max_cache_age: Option<u64>,

        /// Also list recent content
        #[arg(long)]
        extras: bool,

        /// Give up after this many seconds
        #[arg(long)]
        deadline: Option<u64>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the canonical form of an identifier
    Normalize {
        /// Platform (tiktok, youtube)
        platform: Platform,

        /// Handle, profile URL or channel ID
        input: String,
    },

    /// Print the effective configuration
    Config,
}
