//! Metered, polite access to platform origins.
//!
//! Every request a resolver or strategy sends goes through `UpstreamClient`:
//! it charges the quota tracker once per attempt, stamps a rotating
//! User-Agent and a per-platform Referer, classifies explicit throttling,
//! and retries transient failures with jittered exponential backoff.

use crate::{HttpTransport, StrategyOutcome, UpstreamRequest, UpstreamResponse, UserAgentPool};
use reach_core::{CallType, Platform};
use reach_error::{PlatformError, RetryableError};
use reach_rate_limit::{BlockDetector, BlockSignal, QuotaTracker};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio_retry2::strategy::{ExponentialBackoff, jitter};
use tokio_retry2::{Retry, RetryError};
use tracing::{debug, instrument, warn};

/// Classified reply from an origin.
#[derive(Debug, Clone)]
pub enum UpstreamReply {
    /// 2xx
    Ok(UpstreamResponse),
    /// 404 or 410
    NotFound,
    /// The origin is throttling us
    Blocked(BlockSignal),
    /// Anything else, after retries
    Failed(PlatformError),
}

impl UpstreamReply {
    /// The response body on 2xx, otherwise the strategy outcome it implies.
    pub fn into_response(self) -> Result<UpstreamResponse, StrategyOutcome> {
        match self {
            UpstreamReply::Ok(response) => Ok(response),
            UpstreamReply::NotFound => Err(StrategyOutcome::NotFound),
            UpstreamReply::Blocked(signal) => Err(StrategyOutcome::Blocked {
                retry_after: signal.retry_after,
            }),
            UpstreamReply::Failed(e) if e.kind.is_malformed() => {
                Err(StrategyOutcome::MalformedResponse {
                    detail: e.kind.to_string(),
                })
            }
            UpstreamReply::Failed(e) => Err(StrategyOutcome::NetworkError {
                detail: e.kind.to_string(),
            }),
        }
    }
}

/// Referer sent with requests to each platform.
pub fn referer_for(platform: Platform) -> &'static str {
    match platform {
        Platform::TikTok => "https://www.tiktok.com/",
        Platform::YouTube => "https://www.youtube.com/",
    }
}

/// Shared client for every upstream call.
#[derive(Clone)]
pub struct UpstreamClient {
    transport: Arc<dyn HttpTransport>,
    quota: QuotaTracker,
    detector: BlockDetector,
    user_agents: Arc<UserAgentPool>,
    calls_issued: Arc<AtomicU64>,
    max_retries: Option<usize>,
}

impl UpstreamClient {
    /// Client over a transport, charging `quota`.
    pub fn new(transport: Arc<dyn HttpTransport>, quota: QuotaTracker) -> Self {
        Self {
            transport,
            quota,
            detector: BlockDetector::new(),
            user_agents: Arc::new(UserAgentPool::default()),
            calls_issued: Arc::new(AtomicU64::new(0)),
            max_retries: None,
        }
    }

    /// Use a different block detector.
    pub fn with_detector(mut self, detector: BlockDetector) -> Self {
        self.detector = detector;
        self
    }

    /// Use a different User-Agent pool.
    pub fn with_user_agents(mut self, user_agents: UserAgentPool) -> Self {
        self.user_agents = Arc::new(user_agents);
        self
    }

    /// Cap retries of transient failures, overriding the error's own strategy.
    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    /// Quota tracker this client charges.
    pub fn quota(&self) -> &QuotaTracker {
        &self.quota
    }

    /// Upstream requests issued since construction, retries included.
    pub fn calls_issued(&self) -> u64 {
        self.calls_issued.load(Ordering::Relaxed)
    }

    /// Issue a request, retrying transient failures.
    #[instrument(skip(self, request), fields(platform = %platform, call = %call, url = %request.url()))]
    pub async fn call(
        &self,
        platform: Platform,
        call: CallType,
        request: UpstreamRequest,
    ) -> UpstreamReply {
        let request = request
            .header("User-Agent", self.user_agents.next_agent())
            .header("Referer", referer_for(platform))
            .header("Accept-Language", "en-US,en;q=0.9");

        let first = self.attempt(platform, call, &request).await;
        let error = match first {
            Err(e) if e.is_retryable() => e,
            Err(e) => return UpstreamReply::Failed(e),
            Ok(reply) => return reply,
        };

        let (initial_ms, mut retries, max_delay_secs) = error.retry_strategy_params();
        if let Some(max_retries) = self.max_retries {
            retries = max_retries;
        }
        if retries == 0 {
            return UpstreamReply::Failed(error);
        }

        debug!(
            error = %error,
            initial_backoff_ms = initial_ms,
            max_retries = retries,
            "Transient upstream failure, retrying"
        );

        let strategy = ExponentialBackoff::from_millis(initial_ms)
            .factor(2)
            .max_delay(std::time::Duration::from_secs(max_delay_secs))
            .map(jitter)
            .take(retries);

        let result = Retry::spawn(strategy, || {
            let request = request.clone();
            async move {
                match self.attempt(platform, call, &request).await {
                    Ok(reply) => Ok(reply),
                    Err(e) if e.is_retryable() => {
                        warn!(error = %e, "Upstream attempt failed, will retry");
                        Err(RetryError::Transient {
                            err: e,
                            retry_after: None,
                        })
                    }
                    Err(e) => Err(RetryError::Permanent(e)),
                }
            }
        })
        .await;

        result.unwrap_or_else(UpstreamReply::Failed)
    }

    /// One attempt. `Err` means the attempt failed and may be retried.
    async fn attempt(
        &self,
        platform: Platform,
        call: CallType,
        request: &UpstreamRequest,
    ) -> Result<UpstreamReply, PlatformError> {
        self.quota.record_usage(platform, call).await;
        self.calls_issued.fetch_add(1, Ordering::Relaxed);

        let response = self.transport.get(request).await?;

        if let Some(signal) = self
            .detector
            .detect(response.status, &response.headers, &response.body)
        {
            warn!(reason = %signal.reason, retry_after = ?signal.retry_after, "Upstream is throttling");
            return Ok(UpstreamReply::Blocked(signal));
        }

        match response.status {
            200..=299 => Ok(UpstreamReply::Ok(response)),
            404 | 410 => Ok(UpstreamReply::NotFound),
            status => Err(PlatformError::new(reach_error::PlatformErrorKind::Http {
                status,
                message: excerpt(&response.body),
            })),
        }
    }
}

impl std::fmt::Debug for UpstreamClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamClient")
            .field("calls_issued", &self.calls_issued())
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

fn excerpt(body: &str) -> String {
    body.chars().take(200).collect()
}
