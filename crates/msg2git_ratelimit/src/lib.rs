//! Tiered, sliding-window rate limiter.
//!
//! Admits or rejects requests per `(user, class)` with tier multipliers and
//! a self-restarting background janitor. `consume` is the only admission
//! path callers may rely on; `check` may be stale by the time a caller acts
//! on it.

#![forbid(unsafe_code)]

mod limiter;
mod window;

pub use limiter::{RateLimiter, Stats};
pub use msg2git_config::LimitClass;
