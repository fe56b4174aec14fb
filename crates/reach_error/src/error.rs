//! Top-level error wrapper types.

use crate::{CacheError, ConfigError, IdentifierError, PlatformError};

/// Every fault the reach crates can surface.
///
/// # Examples
///
/// ```
/// use reach_error::{PlatformError, PlatformErrorKind, ReachError, ReachErrorKind};
///
/// let platform_err = PlatformError::new(PlatformErrorKind::Network("connection reset".to_string()));
/// let err: ReachError = platform_err.into();
/// assert!(matches!(err.kind(), ReachErrorKind::Platform(_)));
/// assert!(format!("{}", err).contains("Network error"));
/// ```
#[derive(Debug, derive_more::From, derive_more::Display, derive_more::Error)]
pub enum ReachErrorKind {
    /// Configuration error
    #[from(ConfigError)]
    Config(ConfigError),
    /// Invalid or unsupported identifier
    #[from(IdentifierError)]
    Identifier(IdentifierError),
    /// Snapshot cache error
    #[from(CacheError)]
    Cache(CacheError),
    /// Platform strategy error
    #[from(PlatformError)]
    Platform(PlatformError),
}

/// Reach error with kind discrimination.
///
/// # Examples
///
/// ```
/// use reach_error::{ReachResult, ConfigError};
///
/// fn might_fail() -> ReachResult<()> {
///     Err(ConfigError::new("Missing field"))?
/// }
///
/// assert!(might_fail().is_err());
/// ```
#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("Reach Error: {}", _0)]
pub struct ReachError(Box<ReachErrorKind>);

impl ReachError {
    /// Create a new error from a kind.
    pub fn new(kind: ReachErrorKind) -> Self {
        Self(Box::new(kind))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &ReachErrorKind {
        &self.0
    }
}

// Generic From implementation for any type that converts to ReachErrorKind
impl<T> From<T> for ReachError
where
    T: Into<ReachErrorKind>,
{
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for reach operations.
pub type ReachResult<T> = std::result::Result<T, ReachError>;
