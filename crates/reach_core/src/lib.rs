//! Core data types for the reach social metrics service.
//!
//! This crate provides the vocabulary shared by every other reach crate:
//! platforms and their upstream call types, identifier normalization, the
//! metrics snapshot, and the `FetchResult` envelope returned to callers.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod identifier;
mod platform;
mod result;
mod snapshot;
mod telemetry;

pub use identifier::{NormalizedIdentifier, PlatformRules, normalize, rules_for};
pub use platform::{CallType, Platform};
pub use result::{CanonicalPlatformId, DEFAULT_MAX_CACHE_AGE, FetchOptions, FetchResult};
pub use snapshot::{MetricsSnapshot, MetricsSnapshotBuilder, TopContent, TopContentBuilder};
pub use telemetry::{TelemetryConfig, init_telemetry};
