//! Fetch strategies and the chain that runs them in order.

use crate::UpstreamClient;
use async_trait::async_trait;
use reach_core::{CanonicalPlatformId, FetchResult, MetricsSnapshot, Platform};
use reach_error::PlatformError;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

/// Bodies fetched by a strategy, not yet parsed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawPayload {
    /// Main profile document
    pub primary: String,
    /// Content listing, when extras were requested and available
    pub extras: Option<String>,
}

impl RawPayload {
    /// Payload with only a primary document.
    pub fn new(primary: impl Into<String>) -> Self {
        Self {
            primary: primary.into(),
            extras: None,
        }
    }

    /// Attach a content listing.
    pub fn with_extras(mut self, extras: impl Into<String>) -> Self {
        self.extras = Some(extras.into());
        self
    }
}

/// What one strategy attempt produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StrategyOutcome {
    /// Got a document worth parsing
    Success(RawPayload),
    /// This strategy could not find the profile
    NotFound,
    /// The origin is throttling us
    Blocked {
        /// Wait before retrying the origin
        retry_after: Duration,
    },
    /// 200 but not in the expected shape
    MalformedResponse {
        /// What was wrong
        detail: String,
    },
    /// Timeout, connection failure or unexpected status
    NetworkError {
        /// What happened
        detail: String,
    },
}

/// Per-run inputs shared by every strategy.
#[derive(Debug, Clone, derive_getters::Getters)]
pub struct StrategyContext {
    /// Metered upstream access
    client: UpstreamClient,
    /// List recent content as well
    #[getter(copy)]
    include_extras: bool,
}

impl StrategyContext {
    /// Context for one fetch.
    pub fn new(client: UpstreamClient, include_extras: bool) -> Self {
        Self {
            client,
            include_extras,
        }
    }
}

/// One way of acquiring a platform's metrics.
#[async_trait]
pub trait FetchStrategy: Send + Sync {
    /// Name used in configuration and logs.
    fn name(&self) -> &'static str;

    /// Fetch the raw documents.
    async fn fetch(&self, id: &CanonicalPlatformId, ctx: &StrategyContext) -> StrategyOutcome;

    /// Turn fetched documents into a snapshot.
    ///
    /// # Errors
    ///
    /// A `Parse` or `MissingField` error means the upstream shape changed.
    fn parse(&self, id: &CanonicalPlatformId, payload: &RawPayload)
    -> Result<MetricsSnapshot, PlatformError>;
}

/// Terminal state of a chain run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainOutcome {
    /// A strategy produced a snapshot
    Succeeded {
        /// Parsed metrics
        snapshot: MetricsSnapshot,
        /// Strategy that produced it
        strategy: &'static str,
    },
    /// The last strategy reported the profile missing
    NotFound,
    /// An origin signalled throttling
    Blocked {
        /// Wait before retrying
        retry_after: Duration,
    },
    /// The last strategy answered in an unrecognized shape
    FormatChanged {
        /// What was wrong
        detail: String,
    },
    /// The last strategy failed at the network level
    Transient {
        /// What happened
        detail: String,
    },
}

impl ChainOutcome {
    /// The caller-facing result. Degraded outcomes carry an empty snapshot.
    pub fn into_fetch_result(self, platform: Platform) -> FetchResult {
        match self {
            ChainOutcome::Succeeded { snapshot, .. } => FetchResult::Success {
                snapshot,
                cached: false,
            },
            ChainOutcome::NotFound => FetchResult::NotFound,
            ChainOutcome::Blocked { retry_after } => FetchResult::RateLimited { retry_after },
            ChainOutcome::FormatChanged { .. } => FetchResult::UpstreamFormatChanged {
                snapshot: MetricsSnapshot::empty(platform),
            },
            ChainOutcome::Transient { detail } => FetchResult::TransientError { detail },
        }
    }
}

/// Position of a chain run.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ChainState {
    NotStarted,
    TryingStrategy(usize),
    Succeeded(MetricsSnapshot, &'static str),
    Exhausted(ChainOutcome),
}

/// Ordered strategies for one platform.
///
/// Each strategy runs under the chain's timeout. `NotFound`, malformed
/// responses and network errors fall through to the next strategy; a block
/// stops the chain at once. When every strategy has failed, the last
/// strategy's outcome decides the result.
#[derive(Clone)]
pub struct FetchChain {
    platform: Platform,
    strategies: Vec<Arc<dyn FetchStrategy>>,
    timeout: Duration,
}

impl FetchChain {
    /// Chain over `strategies`, in order.
    pub fn new(platform: Platform, strategies: Vec<Arc<dyn FetchStrategy>>, timeout: Duration) -> Self {
        Self {
            platform,
            strategies,
            timeout,
        }
    }

    /// Platform this chain serves.
    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Strategy names, in order.
    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Per-strategy time limit.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run strategies until one succeeds or the chain is exhausted.
    #[instrument(skip(self, ctx), fields(platform = %self.platform, id = %id.id()))]
    pub async fn run(&self, id: &CanonicalPlatformId, ctx: &StrategyContext) -> ChainOutcome {
        let mut state = ChainState::NotStarted;

        loop {
            state = match state {
                ChainState::NotStarted if self.strategies.is_empty() => {
                    ChainState::Exhausted(ChainOutcome::NotFound)
                }
                ChainState::NotStarted => ChainState::TryingStrategy(0),
                ChainState::TryingStrategy(index) => self.step(index, id, ctx).await,
                ChainState::Succeeded(snapshot, strategy) => {
                    info!(strategy, "Fetch chain succeeded");
                    return ChainOutcome::Succeeded { snapshot, strategy };
                }
                ChainState::Exhausted(outcome) => {
                    match &outcome {
                        ChainOutcome::FormatChanged { detail } => {
                            error!(%detail, "Upstream format changed, returning empty snapshot")
                        }
                        other => debug!(outcome = ?other, "Fetch chain exhausted"),
                    }
                    return outcome;
                }
            };
        }
    }

    async fn step(&self, index: usize, id: &CanonicalPlatformId, ctx: &StrategyContext) -> ChainState {
        let strategy = &self.strategies[index];
        let name = strategy.name();
        let is_last = index + 1 == self.strategies.len();

        debug!(strategy = name, index, "Trying strategy");
        let outcome = match tokio::time::timeout(self.timeout, strategy.fetch(id, ctx)).await {
            Ok(outcome) => outcome,
            Err(_) => StrategyOutcome::NetworkError {
                detail: format!("{} timed out after {:?}", name, self.timeout),
            },
        };

        let terminal = match outcome {
            StrategyOutcome::Success(payload) => match strategy.parse(id, &payload) {
                Ok(snapshot) => return ChainState::Succeeded(snapshot, name),
                Err(e) => {
                    let detail = format!("{}: {}", name, e.kind);
                    warn!(strategy = name, %detail, "Could not parse upstream response");
                    ChainOutcome::FormatChanged { detail }
                }
            },
            StrategyOutcome::Blocked { retry_after } => {
                warn!(strategy = name, ?retry_after, "Blocked by upstream, stopping chain");
                return ChainState::Exhausted(ChainOutcome::Blocked { retry_after });
            }
            StrategyOutcome::NotFound => ChainOutcome::NotFound,
            StrategyOutcome::MalformedResponse { detail } => {
                warn!(strategy = name, %detail, "Malformed upstream response");
                ChainOutcome::FormatChanged { detail }
            }
            StrategyOutcome::NetworkError { detail } => {
                warn!(strategy = name, %detail, "Strategy failed");
                ChainOutcome::Transient { detail }
            }
        };

        if is_last {
            ChainState::Exhausted(terminal)
        } else {
            debug!(strategy = name, "Falling through to next strategy");
            ChainState::TryingStrategy(index + 1)
        }
    }
}

impl std::fmt::Debug for FetchChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchChain")
            .field("platform", &self.platform)
            .field("strategies", &self.strategy_names())
            .field("timeout", &self.timeout)
            .finish()
    }
}
