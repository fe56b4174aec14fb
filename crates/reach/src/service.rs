//! The metrics orchestrator.

use crate::single_flight::{FlightRole, SingleFlight};
use reach_cache::{InMemoryMetricsCache, MetricsCache, MetricsCacheConfig};
use reach_core::{FetchOptions, FetchResult, NormalizedIdentifier, Platform, normalize};
use reach_error::{IdentifierError, IdentifierErrorKind, ReachResult};
use reach_rate_limit::{
    Acquire, KeyedRateLimiter, PlatformPolicy, QuotaTracker, QuotaUsage, ReachConfig,
};
use reach_social::{
    ChainOutcome, HttpTransport, PlatformIntegration, PlatformRegistry, ReqwestTransport,
    ResolveOutcome, StrategyContext, UpstreamClient,
};
use std::sync::Arc;
use std::time::Duration;
use strum::IntoEnumIterator;
use tracing::{debug, info, instrument, warn};

/// Work shared by concurrent identical requests.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct FlightKey {
    platform: Platform,
    canonical: String,
    include_extras: bool,
}

struct Inner {
    registry: PlatformRegistry,
    limiter: KeyedRateLimiter,
    quota: QuotaTracker,
    cache: Arc<dyn MetricsCache>,
    client: UpstreamClient,
    flights: SingleFlight<FlightKey, FetchResult>,
}

/// Entry point for metrics acquisition.
///
/// Composes identifier normalization, the snapshot cache, per-identifier
/// admission control, handle resolution and the per-platform strategy
/// chain. Cheap to clone; clones share all state.
///
/// # Example
///
/// ```
/// use reach::{FetchOptions, FetchResult, MetricsService, Platform, ScriptedReply, ScriptedTransport};
/// use std::sync::Arc;
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let body = r#"{"statusCode":0,"userInfo":{"user":{"nickname":"Creator One"},"stats":{"followerCount":1200}}}"#;
/// let transport = ScriptedTransport::new().route("/api/user/detail", [ScriptedReply::ok(body)]);
///
/// let service = MetricsService::builder()
///     .transport(Arc::new(transport))
///     .build()
///     .unwrap();
///
/// let result = service
///     .fetch_metrics(Platform::TikTok, "@CreatorOne", FetchOptions::default())
///     .await
///     .unwrap();
/// assert!(matches!(result, FetchResult::Success { cached: false, .. }));
/// # });
/// ```
#[derive(Clone)]
pub struct MetricsService {
    inner: Arc<Inner>,
}

impl MetricsService {
    /// Start building a service.
    pub fn builder() -> MetricsServiceBuilder {
        MetricsServiceBuilder::default()
    }

    /// Build a service from configuration with the production transport.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be created.
    pub fn from_config(config: ReachConfig) -> ReachResult<Self> {
        Self::builder().config(config).build()
    }

    /// Fetch metrics for a creator.
    ///
    /// Every expected outcome, including not found, throttled and a changed
    /// upstream format, is returned as a [`FetchResult`] variant.
    ///
    /// # Errors
    ///
    /// Returns error if `raw` is empty after trimming or no integration is
    /// registered for `platform`.
    #[instrument(skip(self, options), fields(platform = %platform, raw = %raw))]
    pub async fn fetch_metrics(
        &self,
        platform: Platform,
        raw: &str,
        options: FetchOptions,
    ) -> ReachResult<FetchResult> {
        let id = normalize(platform, raw)?;
        let integration = self
            .inner
            .registry
            .get(platform)
            .cloned()
            .ok_or_else(|| IdentifierError::new(IdentifierErrorKind::Unsupported(platform.to_string())))?;

        let work = self.fetch_normalized(id, integration, options.clone());
        let result = match options.deadline() {
            Some(deadline) => match tokio::time::timeout(*deadline, work).await {
                Ok(result) => result,
                Err(_) => {
                    warn!(?deadline, "Deadline exceeded, abandoning fetch");
                    FetchResult::TransientError {
                        detail: format!("deadline of {:?} exceeded", deadline),
                    }
                }
            },
            None => work.await,
        };

        info!(result = result.label(), "Fetch finished");
        Ok(result)
    }

    async fn fetch_normalized(
        &self,
        id: NormalizedIdentifier,
        integration: PlatformIntegration,
        options: FetchOptions,
    ) -> FetchResult {
        let platform = id.platform();
        let max_age = *options.max_cache_age();

        if !max_age.is_zero() {
            match self.inner.cache.get(platform, id.canonical(), max_age).await {
                Ok(Some(entry)) if !entry.snapshot().satisfies(*options.include_extras()) => {
                    debug!(fetched_at = %entry.fetched_at(), "Cached snapshot lacks recent content");
                }
                Ok(Some(entry)) => {
                    debug!(fetched_at = %entry.fetched_at(), "Serving cached snapshot");
                    return FetchResult::Success {
                        snapshot: entry.into_snapshot(),
                        cached: true,
                    };
                }
                Ok(None) => {}
                Err(e) => warn!(error = %e, "Cache read failed, treating as miss"),
            }
        }

        let key = FlightKey {
            platform,
            canonical: id.canonical().to_string(),
            include_extras: *options.include_extras(),
        };
        let inner = Arc::clone(&self.inner);
        let include_extras = *options.include_extras();

        let (result, role) = self
            .inner
            .flights
            .run(key, move || async move {
                inner.acquire_and_fetch(id, integration, include_extras).await
            })
            .await;

        if role == FlightRole::Follower {
            debug!("Result shared from concurrent fetch");
        }
        result
    }

    /// Quota usage for every platform.
    pub async fn quota_usage(&self) -> Vec<QuotaUsage> {
        self.inner.quota.snapshot().await
    }

    /// Units consumed on a platform in the current window.
    pub async fn current_usage(&self, platform: Platform) -> u64 {
        self.inner.quota.current_usage(platform).await
    }

    /// Drop rate-limit tickets whose interval has elapsed. Returns tickets still held.
    pub fn prune_rate_limiter(&self) -> usize {
        self.inner.limiter.prune()
    }

    /// Platforms with a registered integration.
    pub fn platforms(&self) -> Vec<Platform> {
        self.inner.registry.platforms()
    }

    /// Upstream requests issued since construction.
    pub fn upstream_calls(&self) -> u64 {
        self.inner.client.calls_issued()
    }
}

impl std::fmt::Debug for MetricsService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsService")
            .field("registry", &self.inner.registry)
            .field("limiter", &self.inner.limiter)
            .field("flights", &self.inner.flights)
            .finish()
    }
}

impl Inner {
    /// Admission, resolution, the strategy chain and the cache write.
    #[instrument(skip(self, id, integration), fields(platform = %id.platform(), canonical = %id.canonical()))]
    async fn acquire_and_fetch(
        &self,
        id: NormalizedIdentifier,
        integration: PlatformIntegration,
        include_extras: bool,
    ) -> FetchResult {
        let platform = id.platform();

        if let Acquire::Denied { retry_after } = self.limiter.try_acquire(platform, id.canonical()) {
            info!(?retry_after, "Rate limited locally");
            return FetchResult::RateLimited { retry_after };
        }

        let ctx = StrategyContext::new(self.client.clone(), include_extras);
        let chain = integration.chain();

        let resolved = tokio::time::timeout(chain.timeout(), integration.resolver().resolve(&id, &ctx)).await;
        let canonical_id = match resolved {
            Ok(ResolveOutcome::Resolved(canonical_id)) => canonical_id,
            Ok(ResolveOutcome::NotFound) => return FetchResult::NotFound,
            Ok(ResolveOutcome::Blocked { retry_after }) => {
                return FetchResult::RateLimited { retry_after };
            }
            Ok(ResolveOutcome::TransientError(detail)) => {
                warn!(%detail, "Resolution failed");
                return FetchResult::TransientError { detail };
            }
            Err(_) => {
                return FetchResult::TransientError {
                    detail: format!("resolution timed out after {:?}", chain.timeout()),
                };
            }
        };
        debug!(resolved = %canonical_id, "Resolved");

        match chain.run(&canonical_id, &ctx).await {
            ChainOutcome::Succeeded { snapshot, strategy } => {
                let snapshot = snapshot.with_extras_included(include_extras);
                if let Err(e) = self.cache.put(platform, id.canonical(), snapshot.clone()).await {
                    warn!(error = %e, "Cache write failed");
                }
                debug!(strategy, "Fetched fresh snapshot");
                FetchResult::Success {
                    snapshot,
                    cached: false,
                }
            }
            other => other.into_fetch_result(platform),
        }
    }
}

/// Builder for [`MetricsService`].
///
/// Every part has a default: built-in configuration, an in-memory cache
/// sized from the configuration, and a reqwest transport.
#[derive(Default)]
pub struct MetricsServiceBuilder {
    config: Option<ReachConfig>,
    cache: Option<Arc<dyn MetricsCache>>,
    transport: Option<Arc<dyn HttpTransport>>,
    registry: Option<PlatformRegistry>,
    max_retries: Option<usize>,
}

impl MetricsServiceBuilder {
    /// Use this configuration.
    pub fn config(mut self, config: ReachConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Use this snapshot cache.
    pub fn cache(mut self, cache: Arc<dyn MetricsCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Send upstream requests through this transport.
    pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Use this registry instead of one derived from the configuration.
    pub fn registry(mut self, registry: PlatformRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Cap retries of transient upstream failures.
    pub fn max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    /// Assemble the service.
    ///
    /// # Errors
    ///
    /// Returns error if no transport was given and the HTTP client cannot be created.
    pub fn build(self) -> ReachResult<MetricsService> {
        let config = self.config.unwrap_or_default();
        let policies: Vec<(Platform, _)> = Platform::iter()
            .map(|platform| (platform, config.platform(platform)))
            .collect();

        let limiter = KeyedRateLimiter::from_policies(policies.iter().map(|(p, policy)| (*p, policy)));
        let quota = QuotaTracker::new(policies.clone());

        let transport = match self.transport {
            Some(transport) => transport,
            None => {
                let timeout = policies
                    .iter()
                    .map(|(_, policy)| policy.strategy_timeout())
                    .max()
                    .unwrap_or(Duration::from_secs(10));
                Arc::new(ReqwestTransport::new(timeout)?)
            }
        };

        let mut client = UpstreamClient::new(transport, quota.clone());
        if let Some(max_retries) = self.max_retries {
            client = client.with_max_retries(max_retries);
        }

        let cache = self.cache.unwrap_or_else(|| {
            let cache_config = MetricsCacheConfig::default()
                .with_max_entries(config.cache.max_entries)
                .with_enabled(config.cache.enabled);
            Arc::new(InMemoryMetricsCache::new(cache_config))
        });

        let registry = self
            .registry
            .unwrap_or_else(|| PlatformRegistry::from_config(&config));

        info!(platforms = ?registry.platforms(), "Metrics service ready");

        Ok(MetricsService {
            inner: Arc::new(Inner {
                registry,
                limiter,
                quota,
                cache,
                client,
                flights: SingleFlight::new(),
            }),
        })
    }
}
