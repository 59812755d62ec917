//! Handler pipeline error types: the layered union of every error the
//! admission → submission → lock → provider chain can produce.

use crate::{LockError, PoolError, ProviderError, RateLimitError};

/// Kinds of pipeline errors, one per layer of `spec.md` §4.E.
#[derive(Debug, Clone, derive_more::Display, derive_more::From)]
pub enum PipelineErrorKind {
    /// Rate limiter rejected admission before any work was submitted.
    #[display("admission rejected: {0}")]
    #[from]
    RateLimited(RateLimitError),
    /// The worker pool refused the event (not started, draining, or full).
    #[display("submission rejected: {0}")]
    #[from]
    Pool(PoolError),
    /// File lock acquisition timed out or was cancelled.
    #[display("lock acquisition failed: {0}")]
    #[from]
    Lock(LockError),
    /// The provider call itself failed.
    #[display("provider call failed: {0}")]
    #[from]
    Provider(ProviderError),
    /// The external collaborator that resolves a user's provider/credentials
    /// failed (e.g. no linked repository, revoked token lookup failure).
    #[display("could not resolve a provider for this user: {0}")]
    ResolutionFailed(String),
}

/// Pipeline error with source location.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Pipeline Error: {} at line {} in {}", kind, line, file)]
pub struct PipelineError {
    /// The kind of error that occurred
    pub kind: PipelineErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl PipelineError {
    /// Create a new pipeline error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: PipelineErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}

impl<T> From<T> for PipelineError
where
    T: Into<PipelineErrorKind>,
{
    #[track_caller]
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}
