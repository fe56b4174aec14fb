//! Errors raised inside a platform fetch strategy.
//!
//! A strategy converts these into a `StrategyOutcome` before the chain
//! sees them; they never escape `fetch_metrics`.

/// Trait for errors that can be retried.
///
/// # Examples
///
/// ```
/// use reach_error::{PlatformError, PlatformErrorKind, RetryableError};
///
/// let err = PlatformError::new(PlatformErrorKind::Http {
///     status: 503,
///     message: "Service unavailable".to_string(),
/// });
///
/// assert!(err.is_retryable());
/// let (backoff, retries, max_delay) = err.retry_strategy_params();
/// assert_eq!(backoff, 250);
/// assert_eq!(retries, 2);
/// assert_eq!(max_delay, 2);
/// ```
pub trait RetryableError {
    /// Returns true if this error should trigger a retry.
    ///
    /// Transient errors (5xx, dropped connections, timeouts) return true.
    /// Everything else (other 4xx, parse failures) returns false. A 429 only
    /// reaches this point when block detection did not already claim it.
    fn is_retryable(&self) -> bool;

    /// Get retry strategy parameters for this error.
    ///
    /// Returns `(initial_backoff_ms, max_retries, max_delay_secs)`.
    fn retry_strategy_params(&self) -> (u64, usize, u64) {
        (2000, 3, 30)
    }
}

/// Specific platform error conditions.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum PlatformErrorKind {
    /// Upstream answered with a non-success status.
    #[display("HTTP {}: {}", status, message)]
    Http {
        /// HTTP status code
        status: u16,
        /// Response excerpt or reason phrase
        message: String,
    },
    /// Connection could not be established or was dropped.
    #[display("Network error: {}", _0)]
    Network(String),
    /// The call did not finish within its time budget.
    #[display("Timed out after {}ms", _0)]
    Timeout(u64),
    /// Body could not be parsed into the expected shape.
    #[display("Failed to parse response: {}", _0)]
    Parse(String),
    /// Body parsed but a required field was absent.
    #[display("Missing field in response: {}", _0)]
    MissingField(String),
}

impl PlatformErrorKind {
    /// Whether the condition is likely to clear on its own.
    pub fn is_retryable(&self) -> bool {
        match self {
            PlatformErrorKind::Http { status, .. } => matches!(status, 408 | 429 | 500..=599),
            PlatformErrorKind::Network(_) | PlatformErrorKind::Timeout(_) => true,
            PlatformErrorKind::Parse(_) | PlatformErrorKind::MissingField(_) => false,
        }
    }

    /// Whether the upstream replied but in a shape we do not understand.
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            PlatformErrorKind::Parse(_) | PlatformErrorKind::MissingField(_)
        )
    }
}

/// Platform error with location tracking.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Platform Error: {} at line {} in {}", kind, line, file)]
pub struct PlatformError {
    /// The kind of error that occurred
    pub kind: PlatformErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl PlatformError {
    /// Create a new platform error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: PlatformErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}

impl RetryableError for PlatformError {
    fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }

    // Strategy calls run under a short per-attempt timeout
    fn retry_strategy_params(&self) -> (u64, usize, u64) {
        (250, 2, 2)
    }
}
