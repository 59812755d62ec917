//! Layered configuration loading for the Msg2Git concurrency core.

#![forbid(unsafe_code)]

mod provider;
mod rate_limit;
mod settings;
mod worker_pool;

pub use provider::{ProviderKind, ProviderSettings};
pub use rate_limit::{ClassQuota, LimitClass, RateLimitSettings, TierMultiplier};
pub use settings::Settings;
pub use worker_pool::WorkerPoolSettings;
