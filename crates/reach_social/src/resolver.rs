//! Mapping a normalized handle to the ID a platform's endpoints address.

use crate::StrategyContext;
use async_trait::async_trait;
use reach_core::{CanonicalPlatformId, NormalizedIdentifier};
use std::time::Duration;

/// Result of a resolution attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveOutcome {
    /// The platform's own ID for the profile
    Resolved(CanonicalPlatformId),
    /// No profile matches the handle
    NotFound,
    /// The lookup origin is throttling us
    Blocked {
        /// Wait before retrying
        retry_after: Duration,
    },
    /// Lookup failed in a way that may clear on retry
    TransientError(String),
}

/// Resolves handles for one platform.
///
/// Lookups issued here go through the same metered client as strategies,
/// so they are charged to the platform's quota.
#[async_trait]
pub trait PlatformResolver: Send + Sync {
    /// Resolve a normalized identifier.
    async fn resolve(&self, id: &NormalizedIdentifier, ctx: &StrategyContext) -> ResolveOutcome;
}

/// Resolver for platforms that address profiles by handle.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityResolver;

#[async_trait]
impl PlatformResolver for IdentityResolver {
    async fn resolve(&self, id: &NormalizedIdentifier, _ctx: &StrategyContext) -> ResolveOutcome {
        ResolveOutcome::Resolved(CanonicalPlatformId::new(id.platform(), id.canonical()))
    }
}
