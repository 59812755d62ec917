//! The collaborator that turns a user id into a ready-to-use provider.
//!
//! Looking up a user's linked repository, credentials, and billing tier is
//! SQL persistence — an external collaborator per `spec.md` §1 — so this
//! crate only defines the seam, not an implementation.

use async_trait::async_trait;
use msg2git_error::ProviderError;
use msg2git_provider::Provider;
use std::sync::Arc;

/// Resolves a `user_id` to the provider instance that should execute its
/// next operation. Implementations typically cache providers per user
/// (clone providers especially, since they own a working tree) and refresh
/// them when a user relinks their repository.
#[async_trait]
pub trait ProviderResolver: Send + Sync + 'static {
    /// Resolve (or build) the provider for `user_id`.
    async fn resolve(&self, user_id: i64) -> Result<Arc<dyn Provider>, ProviderError>;
}

/// A resolver that always returns the same provider, regardless of user.
/// Useful for tests and for single-tenant deployments.
pub struct StaticResolver {
    provider: Arc<dyn Provider>,
}

impl StaticResolver {
    /// Wrap `provider` as a resolver that ignores `user_id`.
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl ProviderResolver for StaticResolver {
    async fn resolve(&self, _user_id: i64) -> Result<Arc<dyn Provider>, ProviderError> {
        Ok(self.provider.clone())
    }
}
