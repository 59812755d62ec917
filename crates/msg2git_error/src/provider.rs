//! GitHub provider error types.

use crate::HttpError;

/// Kinds of provider errors.
#[derive(Debug, Clone, derive_more::Display, derive_more::From)]
pub enum ProviderErrorKind {
    /// 401/403 with an auth-failed signature ("authorization failed",
    /// "authentication failed", "Bad credentials"). No retries.
    #[display("GitHub authentication failed: {0}")]
    AuthFailed(String),
    /// 403 with "rate limit" in the body, or the client-side 4900 threshold.
    #[display("GitHub rate limit hit: {0}")]
    RateLimited(String),
    /// 404 on a `/repos/` path.
    #[display("repository not found or access revoked")]
    NotFound,
    /// Remote-reported or post-clone size exceeds the tier ceiling.
    #[display("repository size {size_kb}KB exceeds tier ceiling {limit_kb}KB")]
    SizeLimitExceeded {
        /// Observed size in KiB
        size_kb: u64,
        /// Tier ceiling in KiB
        limit_kb: u64,
    },
    /// 404 on asset upload after release discovery raced with another caller.
    #[display("asset upload raced a release discovery: {0}")]
    RaceOnAsset(String),
    /// 5xx or transport-level failure, not retried by the core.
    #[from]
    Unexpected(HttpError),
}

/// Provider error with source location.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Provider Error: {} at line {} in {}", kind, line, file)]
pub struct ProviderError {
    /// The kind of error that occurred
    pub kind: ProviderErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl ProviderError {
    /// Create a new provider error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: ProviderErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Transient GitHub failures (rate limited, 5xx/transport) are worth a
    /// retry; auth failures, not-found, and size limits are not.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind,
            ProviderErrorKind::RateLimited(_) | ProviderErrorKind::Unexpected(_)
        )
    }
}
