//! Top-level error wrapper aggregating every component's error family.

use crate::{ConfigError, HttpError, LockError, PipelineError, PoolError, ProviderError, RateLimitError};

/// The union of every error kind the core can produce.
#[derive(Debug, derive_more::From, derive_more::Display, derive_more::Error)]
pub enum Msg2GitErrorKind {
    /// Rate limiter admission error
    #[from(RateLimitError)]
    RateLimit(RateLimitError),
    /// File lock manager error
    #[from(LockError)]
    Lock(LockError),
    /// Worker pool lifecycle/backpressure error
    #[from(PoolError)]
    Pool(PoolError),
    /// GitHub provider error
    #[from(ProviderError)]
    Provider(ProviderError),
    /// Handler pipeline integration error
    #[from(PipelineError)]
    Pipeline(PipelineError),
    /// Configuration error
    #[from(ConfigError)]
    Config(ConfigError),
    /// Raw transport error not yet classified by a provider
    #[from(HttpError)]
    Http(HttpError),
}

/// Msg2Git error with kind discrimination.
#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("Msg2Git Error: {}", _0)]
pub struct Msg2GitError(Box<Msg2GitErrorKind>);

impl Msg2GitError {
    /// Create a new error from a kind.
    pub fn new(kind: Msg2GitErrorKind) -> Self {
        Self(Box::new(kind))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &Msg2GitErrorKind {
        &self.0
    }
}

// Generic From implementation for any type that converts to Msg2GitErrorKind.
impl<T> From<T> for Msg2GitError
where
    T: Into<Msg2GitErrorKind>,
{
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for Msg2Git core operations.
pub type Msg2GitResult<T> = std::result::Result<T, Msg2GitError>;
