//! Detection of explicit upstream throttling.
//!
//! A blocked response is different from this service's own limiter saying
//! no: the origin itself has refused us. Platforms signal it in different
//! ways, so detection looks at status, headers and body together.

use reqwest::header::{HeaderMap, RETRY_AFTER};
use std::time::Duration;
use tracing::{debug, instrument};

/// Wait suggested when the upstream gives no `Retry-After`.
pub const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(60);

/// Body markers of an interstitial challenge page.
const CHALLENGE_MARKERS: &[&str] = &["captcha", "verify you are human", "verifycenter"];

/// Markers of a challenge served with a success status. Ordinary profile
/// pages load captcha scripts too, so these are matched against the page
/// title and the challenge container rather than the whole body.
const INTERSTITIAL_TITLE_MARKERS: &[&str] = &["captcha", "verify", "security check"];
const INTERSTITIAL_CONTAINER: &str = "id=\"captcha-verify";

/// Google API error reasons that mean "stop calling for now".
const QUOTA_REASONS: &[&str] = &["quotaExceeded", "rateLimitExceeded", "userRateLimitExceeded"];

/// Why a response was classified as blocked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display)]
pub enum BlockReason {
    /// HTTP 429
    #[display("too many requests")]
    TooManyRequests,
    /// HTTP 403 with a challenge page
    #[display("challenge page")]
    Challenge,
    /// API reported quota or rate-limit exhaustion
    #[display("quota exceeded")]
    QuotaExceeded,
}

/// A detected upstream block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockSignal {
    /// What triggered the classification
    pub reason: BlockReason,
    /// Wait before retrying the same origin
    pub retry_after: Duration,
}

/// Classifies upstream responses as blocked or not.
///
/// # Example
///
/// ```
/// use reach_rate_limit::{BlockDetector, BlockReason};
/// use reqwest::header::{HeaderMap, HeaderValue, RETRY_AFTER};
/// use std::time::Duration;
///
/// let detector = BlockDetector::new();
/// let mut headers = HeaderMap::new();
/// headers.insert(RETRY_AFTER, HeaderValue::from_static("120"));
///
/// let signal = detector.detect(429, &headers, "").unwrap();
/// assert_eq!(signal.reason, BlockReason::TooManyRequests);
/// assert_eq!(signal.retry_after, Duration::from_secs(120));
///
/// assert!(detector.detect(200, &HeaderMap::new(), "{}").is_none());
/// ```
#[derive(Debug, Clone)]
pub struct BlockDetector {
    default_retry_after: Duration,
}

impl BlockDetector {
    /// Create a detector with the standard 60 s fallback wait.
    pub fn new() -> Self {
        Self {
            default_retry_after: DEFAULT_RETRY_AFTER,
        }
    }

    /// Use a different fallback wait when `Retry-After` is absent.
    pub fn with_default_retry_after(mut self, retry_after: Duration) -> Self {
        self.default_retry_after = retry_after;
        self
    }

    /// Classify a response. Returns `None` when the response is not a block.
    #[instrument(skip(self, headers, body), fields(body_len = body.len()))]
    pub fn detect(&self, status: u16, headers: &HeaderMap, body: &str) -> Option<BlockSignal> {
        let reason = match status {
            429 => Some(BlockReason::TooManyRequests),
            403 if has_quota_reason(body) => Some(BlockReason::QuotaExceeded),
            403 if has_challenge_marker(body) => Some(BlockReason::Challenge),
            200..=299 if is_interstitial(body) => Some(BlockReason::Challenge),
            _ => None,
        }?;

        let retry_after = parse_retry_after(headers).unwrap_or(self.default_retry_after);
        debug!(%reason, ?retry_after, "Upstream block detected");

        Some(BlockSignal {
            reason,
            retry_after,
        })
    }
}

impl Default for BlockDetector {
    fn default() -> Self {
        Self::new()
    }
}

/// `Retry-After` as delta-seconds. HTTP-date values are not interpreted.
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let secs: u64 = headers.get(RETRY_AFTER)?.to_str().ok()?.trim().parse().ok()?;
    Some(Duration::from_secs(secs))
}

fn has_challenge_marker(body: &str) -> bool {
    let lower = body.to_lowercase();
    CHALLENGE_MARKERS.iter().any(|marker| lower.contains(marker))
}

/// A 2xx HTML page that is a challenge instead of the requested content.
fn is_interstitial(body: &str) -> bool {
    let lower = body.to_lowercase();
    if lower.contains(INTERSTITIAL_CONTAINER) {
        return true;
    }
    page_title(&lower).is_some_and(|title| {
        INTERSTITIAL_TITLE_MARKERS
            .iter()
            .any(|marker| title.contains(marker))
    })
}

fn page_title(lower: &str) -> Option<&str> {
    let open = lower.find("<title")?;
    let start = open + lower[open..].find('>')? + 1;
    let end = start + lower[start..].find("</title>")?;
    Some(&lower[start..end])
}

/// Google APIs report `{"error": {"errors": [{"reason": "quotaExceeded"}]}}`.
fn has_quota_reason(body: &str) -> bool {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return false;
    };
    value["error"]["errors"]
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(|error| error["reason"].as_str())
        .any(|reason| QUOTA_REASONS.contains(&reason))
}
