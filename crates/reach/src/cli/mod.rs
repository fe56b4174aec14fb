//! Command-line interface module.
//!
//! This module provides the CLI structure and command handlers for the reach binary.

mod commands;
mod config;
mod fetch;
mod normalize;

pub use commands::{Cli, Commands};
pub use config::show_config;
pub use fetch::{FetchArgs, run_fetch};
pub use normalize::run_normalize;
