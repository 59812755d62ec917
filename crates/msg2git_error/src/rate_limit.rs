//! Rate limiter error types.

/// Kinds of rate limiter errors.
#[derive(Debug, Clone, PartialEq, derive_more::Display)]
pub enum RateLimitErrorKind {
    /// Admission was rejected because the effective limit was reached.
    #[display("rate limit exceeded for class {class} (user {user})")]
    LimitExceeded {
        /// Limit class name
        class: String,
        /// User id
        user: i64,
    },
    /// The caller asked about a class the config does not define, or whose
    /// configured `requests` is zero. Treated as LimitExceeded to fail closed.
    #[display("unknown rate limit class: {0}")]
    UnknownLimitClass(String),
}

/// Rate limiter error with source location.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Rate Limit Error: {} at line {} in {}", kind, line, file)]
pub struct RateLimitError {
    /// The kind of error that occurred
    pub kind: RateLimitErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl RateLimitError {
    /// Create a new rate limit error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: RateLimitErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// True for both LimitExceeded and UnknownLimitClass — both fail the
    /// caller the same way.
    pub fn is_rate_limited(&self) -> bool {
        matches!(
            self.kind,
            RateLimitErrorKind::LimitExceeded { .. } | RateLimitErrorKind::UnknownLimitClass(_)
        )
    }
}
