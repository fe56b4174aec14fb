//! Tests for the fetch chain state machine.

use async_trait::async_trait;
use reach_core::{CanonicalPlatformId, FetchResult, MetricsSnapshot, Platform};
use reach_error::{PlatformError, PlatformErrorKind};
use reach_rate_limit::{QuotaTracker, policies::BuiltinPolicy};
use reach_social::{
    ChainOutcome, FetchChain, FetchStrategy, RawPayload, ScriptedTransport, StrategyContext,
    StrategyOutcome, UpstreamClient,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Strategy returning a fixed outcome.
struct StubStrategy {
    name: &'static str,
    outcome: StrategyOutcome,
    delay: Duration,
    invocations: Arc<AtomicUsize>,
}

impl StubStrategy {
    fn new(name: &'static str, outcome: StrategyOutcome) -> Self {
        Self {
            name,
            outcome,
            delay: Duration::ZERO,
            invocations: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl FetchStrategy for StubStrategy {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn fetch(&self, _id: &CanonicalPlatformId, _ctx: &StrategyContext) -> StrategyOutcome {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.outcome.clone()
    }

    fn parse(
        &self,
        _id: &CanonicalPlatformId,
        payload: &RawPayload,
    ) -> Result<MetricsSnapshot, PlatformError> {
        let followers: u64 = payload.primary.parse().map_err(|_| {
            PlatformError::new(PlatformErrorKind::Parse("not a number".to_string()))
        })?;
        Ok(MetricsSnapshot::builder()
            .platform(Platform::TikTok)
            .followers(followers)
            .build()
            .unwrap())
    }
}

fn success(body: &str) -> StrategyOutcome {
    StrategyOutcome::Success(RawPayload::new(body))
}

fn ctx() -> StrategyContext {
    let quota = QuotaTracker::new([(Platform::TikTok, BuiltinPolicy::TikTok)]);
    StrategyContext::new(
        UpstreamClient::new(Arc::new(ScriptedTransport::new()), quota),
        false,
    )
}

fn id() -> CanonicalPlatformId {
    CanonicalPlatformId::new(Platform::TikTok, "creatorone")
}

fn chain(strategies: Vec<StubStrategy>) -> FetchChain {
    FetchChain::new(
        Platform::TikTok,
        strategies
            .into_iter()
            .map(|s| Arc::new(s) as Arc<dyn FetchStrategy>)
            .collect(),
        Duration::from_secs(10),
    )
}

#[tokio::test]
async fn not_found_falls_through_to_success() {
    let outcome = chain(vec![
        StubStrategy::new("a", StrategyOutcome::NotFound),
        StubStrategy::new("b", success("42")),
    ])
    .run(&id(), &ctx())
    .await;

    let ChainOutcome::Succeeded { snapshot, strategy } = outcome else {
        panic!("expected success, got {:?}", outcome);
    };
    assert_eq!(strategy, "b");
    assert_eq!(snapshot.followers(), 42);
}

#[tokio::test]
async fn first_success_stops_the_chain() {
    let second = StubStrategy::new("b", success("2"));
    let second_calls = second.invocations.clone();

    let outcome = chain(vec![StubStrategy::new("a", success("1")), second])
        .run(&id(), &ctx())
        .await;

    assert!(matches!(outcome, ChainOutcome::Succeeded { strategy: "a", .. }));
    assert_eq!(second_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn not_found_on_last_strategy_is_not_found() {
    let outcome = chain(vec![
        StubStrategy::new("a", StrategyOutcome::NotFound),
        StubStrategy::new("b", StrategyOutcome::NotFound),
    ])
    .run(&id(), &ctx())
    .await;
    assert_eq!(outcome, ChainOutcome::NotFound);
    assert_eq!(outcome.into_fetch_result(Platform::TikTok), FetchResult::NotFound);
}

#[tokio::test]
async fn blocked_never_falls_through() {
    let second = StubStrategy::new("b", success("2"));
    let second_calls = second.invocations.clone();

    let outcome = chain(vec![
        StubStrategy::new(
            "a",
            StrategyOutcome::Blocked {
                retry_after: Duration::from_secs(30),
            },
        ),
        second,
    ])
    .run(&id(), &ctx())
    .await;

    assert_eq!(
        outcome,
        ChainOutcome::Blocked {
            retry_after: Duration::from_secs(30)
        }
    );
    assert_eq!(second_calls.load(Ordering::SeqCst), 0);
    assert_eq!(
        outcome.into_fetch_result(Platform::TikTok),
        FetchResult::RateLimited {
            retry_after: Duration::from_secs(30)
        }
    );
}

#[tokio::test]
async fn malformed_falls_through_then_degrades() {
    let outcome = chain(vec![
        StubStrategy::new(
            "a",
            StrategyOutcome::MalformedResponse {
                detail: "shape".to_string(),
            },
        ),
        StubStrategy::new("b", success("not-a-number")),
    ])
    .run(&id(), &ctx())
    .await;

    assert!(matches!(outcome, ChainOutcome::FormatChanged { .. }));
    let result = outcome.into_fetch_result(Platform::TikTok);
    let FetchResult::UpstreamFormatChanged { snapshot } = result else {
        panic!("expected format change, got {:?}", result);
    };
    assert!(snapshot.is_empty());
    assert_eq!(snapshot.platform(), Platform::TikTok);
}

#[tokio::test]
async fn network_error_on_last_strategy_is_transient() {
    let outcome = chain(vec![
        StubStrategy::new("a", StrategyOutcome::NotFound),
        StubStrategy::new(
            "b",
            StrategyOutcome::NetworkError {
                detail: "connection reset".to_string(),
            },
        ),
    ])
    .run(&id(), &ctx())
    .await;

    assert_eq!(
        outcome,
        ChainOutcome::Transient {
            detail: "connection reset".to_string()
        }
    );
}

#[tokio::test]
async fn network_error_falls_through() {
    let outcome = chain(vec![
        StubStrategy::new(
            "a",
            StrategyOutcome::NetworkError {
                detail: "timeout".to_string(),
            },
        ),
        StubStrategy::new("b", success("7")),
    ])
    .run(&id(), &ctx())
    .await;
    assert!(matches!(outcome, ChainOutcome::Succeeded { strategy: "b", .. }));
}

#[tokio::test]
async fn hanging_strategy_is_cut_off_by_the_chain() {
    let chain = FetchChain::new(
        Platform::TikTok,
        vec![
            Arc::new(StubStrategy::new("slow", success("1")).delayed(Duration::from_secs(60)))
                as Arc<dyn FetchStrategy>,
            Arc::new(StubStrategy::new("fast", success("2"))),
        ],
        Duration::from_millis(50),
    );

    let started = std::time::Instant::now();
    let outcome = chain.run(&id(), &ctx()).await;

    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(matches!(outcome, ChainOutcome::Succeeded { strategy: "fast", .. }));
}

#[tokio::test]
async fn empty_chain_reports_not_found() {
    let outcome = chain(Vec::new()).run(&id(), &ctx()).await;
    assert_eq!(outcome, ChainOutcome::NotFound);
}
