//! Error types for the reach social metrics service.
//!
//! This crate provides the foundation error types used throughout the reach workspace.
//!
//! # Error Hierarchy
//!
//! All errors follow the `ErrorKind` + wrapper struct pattern:
//! - `*ErrorKind` enum defines specific error conditions
//! - `*Error` struct wraps the kind with source location tracking
//! - All errors use `#[track_caller]` for automatic location capture
//!
//! Expected fetch outcomes (profile not found, throttled, upstream shape
//! changed) are *not* errors; they are variants of `reach_core::FetchResult`.
//! The types here cover genuine faults: bad input, bad configuration,
//! broken storage, and transport failures inside a strategy.
//!
//! # Examples
//!
//! ```
//! use reach_error::{IdentifierError, IdentifierErrorKind, ReachResult};
//!
//! fn handle_from(input: &str) -> ReachResult<String> {
//!     let handle = input.trim();
//!     if handle.is_empty() {
//!         return Err(IdentifierError::new(IdentifierErrorKind::Empty).into());
//!     }
//!     Ok(handle.to_lowercase())
//! }
//!
//! assert!(handle_from("  ").is_err());
//! assert_eq!(handle_from("CreatorOne").unwrap(), "creatorone");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod cache;
mod config;
mod error;
mod identifier;
mod platform;

pub use cache::{CacheError, CacheErrorKind};
pub use config::ConfigError;
pub use error::{ReachError, ReachErrorKind, ReachResult};
pub use identifier::{IdentifierError, IdentifierErrorKind};
pub use platform::{PlatformError, PlatformErrorKind, RetryableError};
