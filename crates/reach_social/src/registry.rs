//! Platform registry: which resolver and strategy chain serve each platform.

use crate::tiktok::{TikTokApiStrategy, TikTokHtmlStrategy};
use crate::youtube::{YouTubeDataApiStrategy, YouTubeHtmlStrategy, YouTubeResolver};
use crate::{FetchChain, FetchStrategy, IdentityResolver, PlatformResolver};
use reach_core::Platform;
use reach_rate_limit::{PlatformPolicy, ReachConfig};
use std::collections::HashMap;
use std::sync::Arc;
use strum::IntoEnumIterator;

/// Resolver and chain for one platform.
#[derive(Clone)]
pub struct PlatformIntegration {
    resolver: Arc<dyn PlatformResolver>,
    chain: FetchChain,
}

impl PlatformIntegration {
    /// Pair a resolver with a chain.
    pub fn new(resolver: Arc<dyn PlatformResolver>, chain: FetchChain) -> Self {
        Self { resolver, chain }
    }

    /// Handle resolver.
    pub fn resolver(&self) -> &Arc<dyn PlatformResolver> {
        &self.resolver
    }

    /// Strategy chain.
    pub fn chain(&self) -> &FetchChain {
        &self.chain
    }
}

impl std::fmt::Debug for PlatformIntegration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlatformIntegration")
            .field("chain", &self.chain)
            .finish()
    }
}

/// Registry of platform integrations.
///
/// # Example
///
/// ```
/// use reach_core::Platform;
/// use reach_rate_limit::ReachConfig;
/// use reach_social::PlatformRegistry;
///
/// let registry = PlatformRegistry::from_config(&ReachConfig::default());
/// let chain = registry.get(Platform::TikTok).unwrap().chain();
/// assert_eq!(chain.strategy_names(), vec!["api", "html"]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct PlatformRegistry {
    integrations: HashMap<Platform, PlatformIntegration>,
}

impl PlatformRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        tracing::debug!("Creating new PlatformRegistry");
        Self::default()
    }

    /// Register every supported platform, with strategies ordered as configured.
    pub fn from_config(config: &ReachConfig) -> Self {
        let mut registry = Self::new();
        let api_key = config.youtube_api_key().map(str::to_string);

        for platform in Platform::iter() {
            let policy = config.platform(platform);
            let strategies: Vec<Arc<dyn FetchStrategy>> = policy
                .strategies()
                .iter()
                .filter_map(|name| {
                    let strategy = strategy_by_name(platform, name, api_key.clone());
                    if strategy.is_none() {
                        tracing::warn!(%platform, strategy = %name, "Skipping unknown strategy");
                    }
                    strategy
                })
                .collect();

            let resolver: Arc<dyn PlatformResolver> = match platform {
                Platform::TikTok => Arc::new(IdentityResolver),
                Platform::YouTube => Arc::new(YouTubeResolver::new(api_key.clone())),
            };

            let chain = FetchChain::new(platform, strategies, policy.strategy_timeout());
            registry.register(platform, PlatformIntegration::new(resolver, chain));
        }

        registry
    }

    /// Register or replace the integration for a platform.
    pub fn register(&mut self, platform: Platform, integration: PlatformIntegration) -> &mut Self {
        tracing::info!(
            platform = %platform,
            strategies = ?integration.chain.strategy_names(),
            "Registering platform integration"
        );
        self.integrations.insert(platform, integration);
        self
    }

    /// Integration for a platform.
    pub fn get(&self, platform: Platform) -> Option<&PlatformIntegration> {
        self.integrations.get(&platform)
    }

    /// Whether a platform is registered.
    pub fn has_platform(&self, platform: Platform) -> bool {
        self.integrations.contains_key(&platform)
    }

    /// Registered platforms, sorted.
    pub fn platforms(&self) -> Vec<Platform> {
        let mut platforms: Vec<Platform> = self.integrations.keys().copied().collect();
        platforms.sort();
        platforms
    }
}

/// Strategy implementation for a configured name.
pub fn strategy_by_name(
    platform: Platform,
    name: &str,
    youtube_api_key: Option<String>,
) -> Option<Arc<dyn FetchStrategy>> {
    match (platform, name) {
        (Platform::TikTok, "api") => Some(Arc::new(TikTokApiStrategy)),
        (Platform::TikTok, "html") => Some(Arc::new(TikTokHtmlStrategy)),
        (Platform::YouTube, "data_api") => Some(Arc::new(YouTubeDataApiStrategy::new(youtube_api_key))),
        (Platform::YouTube, "html") => Some(Arc::new(YouTubeHtmlStrategy)),
        _ => None,
    }
}
