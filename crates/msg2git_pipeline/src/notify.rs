//! User-facing notices. Per `spec.md` §7, every recoverable error produces
//! exactly one notice; fatal errors carry a remediation hint. Delivering
//! the notice (Telegram, etc.) is an external collaborator — this module
//! only defines the seam and the notice taxonomy.

use async_trait::async_trait;
use msg2git_error::{PipelineError, PipelineErrorKind, ProviderErrorKind};

/// A user-facing notice produced by the pipeline. Carries enough shape for
/// a collaborator to pick copy and, where relevant, a remediation action —
/// but no formatted text, since that's UI, out of this crate's scope.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    /// Rate limiter rejected admission; the event was queued for retry.
    RateLimited,
    /// The worker pool's ingress queue was full; the event was dropped.
    QueueFull,
    /// A file lock could not be acquired before the deadline.
    LockTimeout,
    /// GitHub rejected the stored credentials. Remediation: re-link token.
    AuthFailed,
    /// The repository is at or over its tier's size ceiling. Remediation:
    /// upgrade tier or shrink the repository.
    SizeLimitExceeded,
    /// The repository was not found, or access was revoked.
    RepoNotFound,
    /// A transient failure (GitHub rate limit, 5xx, transport) that may
    /// succeed if retried later.
    Transient(String),
    /// Nothing else applied; surfaced verbatim.
    Unexpected(String),
}

impl From<&PipelineError> for Notice {
    fn from(err: &PipelineError) -> Self {
        match &err.kind {
            PipelineErrorKind::RateLimited(_) => Notice::RateLimited,
            PipelineErrorKind::Pool(_) => Notice::QueueFull,
            PipelineErrorKind::Lock(_) => Notice::LockTimeout,
            PipelineErrorKind::Provider(provider_err) => match &provider_err.kind {
                ProviderErrorKind::AuthFailed(_) => Notice::AuthFailed,
                ProviderErrorKind::RateLimited(msg) => Notice::Transient(msg.clone()),
                ProviderErrorKind::NotFound => Notice::RepoNotFound,
                ProviderErrorKind::SizeLimitExceeded { .. } => Notice::SizeLimitExceeded,
                ProviderErrorKind::RaceOnAsset(msg) => Notice::Transient(msg.clone()),
                ProviderErrorKind::Unexpected(e) => Notice::Unexpected(e.to_string()),
            },
            PipelineErrorKind::ResolutionFailed(msg) => Notice::Unexpected(msg.clone()),
        }
    }
}

/// Delivers a [`Notice`] to a user. The pipeline calls this exactly once
/// per recoverable or fatal error; it never calls it for success.
#[async_trait]
pub trait UserNotifier: Send + Sync + 'static {
    /// Deliver `notice` to `user_id`.
    async fn notify(&self, user_id: i64, notice: Notice);
}

/// A notifier that drops every notice. Useful where the caller only cares
/// about the `Result` of a submission, not the delivery side effect.
#[derive(Debug, Default)]
pub struct SilentNotifier;

#[async_trait]
impl UserNotifier for SilentNotifier {
    async fn notify(&self, _user_id: i64, _notice: Notice) {}
}
