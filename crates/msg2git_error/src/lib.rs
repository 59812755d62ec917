//! Error types for the Msg2Git concurrency core.
//!
//! Each module defines one error family with its own `*ErrorKind` enum and a
//! location-tracking wrapper struct. [`Msg2GitError`] aggregates all of them
//! behind a single type so call sites can `?`-propagate without manual
//! wrapping.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod http;
mod lock;
mod pipeline;
mod pool;
mod provider;
mod rate_limit;

pub use config::ConfigError;
pub use error::{Msg2GitError, Msg2GitErrorKind, Msg2GitResult};
pub use http::HttpError;
pub use lock::{LockError, LockErrorKind};
pub use pipeline::{PipelineError, PipelineErrorKind};
pub use pool::{PoolError, PoolErrorKind};
pub use provider::{ProviderError, ProviderErrorKind};
pub use rate_limit::{RateLimitError, RateLimitErrorKind};
