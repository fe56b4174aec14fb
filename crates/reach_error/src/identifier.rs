//! Identifier normalization errors.

/// Reasons a raw handle cannot be turned into a canonical identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum IdentifierErrorKind {
    /// Input was empty (or only whitespace / a bare `@`).
    #[display("Identifier is empty after trimming")]
    Empty,
    /// No integration is registered for the requested platform.
    #[display("Unsupported platform: {}", _0)]
    Unsupported(String),
}

/// Identifier error with location tracking.
///
/// # Examples
///
/// ```
/// use reach_error::{IdentifierError, IdentifierErrorKind};
///
/// let err = IdentifierError::new(IdentifierErrorKind::Empty);
/// assert!(format!("{}", err).contains("empty"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Identifier Error: {} at line {} in {}", kind, line, file)]
pub struct IdentifierError {
    /// The kind of error that occurred
    pub kind: IdentifierErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl IdentifierError {
    /// Create a new identifier error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: IdentifierErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
