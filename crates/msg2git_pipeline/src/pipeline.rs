//! The handler pipeline: the thin, layered glue running lock acquisition
//! and provider dispatch for one already-admitted, already-submitted
//! event. Grounded in the reference security crate's `SecureExecutor` —
//! one struct composing the upstream components, one instrumented method
//! running them in strict order, short-circuiting on the first failure.

use crate::types::{GitMutation, MutationOp};
use async_trait::async_trait;
use msg2git_error::PipelineError;
use msg2git_filelock::FileLockManager;
use msg2git_provider::Provider;
use msg2git_workerpool::{Event, EventHandler};
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::notify::{Notice, UserNotifier};
use crate::resolver::ProviderResolver;

struct PipelineInner<R, N> {
    file_locks: FileLockManager,
    provider_resolver: R,
    notifier: N,
}

/// Runs step 3 of `spec.md` §4.E for one event: resolve the user's
/// provider, acquire whatever file lock(s) the operation needs (sorted,
/// multi-file, per `msg2git_filelock`'s deadlock-free protocol), then
/// dispatch to the matching `Provider` method. Cheap to clone — shared as
/// both the message and callback handler of one `WorkerPool`.
pub struct Pipeline<R, N> {
    inner: Arc<PipelineInner<R, N>>,
}

impl<R, N> Clone for Pipeline<R, N> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone() }
    }
}

impl<R, N> Pipeline<R, N>
where
    R: ProviderResolver,
    N: UserNotifier,
{
    /// Build a pipeline over a shared [`FileLockManager`], a
    /// [`ProviderResolver`], and a [`UserNotifier`].
    pub fn new(file_locks: FileLockManager, provider_resolver: R, notifier: N) -> Self {
        Self { inner: Arc::new(PipelineInner { file_locks, provider_resolver, notifier }) }
    }

    /// Resolve the provider, take whatever lock(s) `op` needs, and run it.
    #[instrument(skip(self, mutation), fields(repo_url = %mutation.repo_url, tier = mutation.tier))]
    async fn run(&self, user_id: i64, mutation: GitMutation) -> Result<(), PipelineError> {
        let GitMutation { repo_url, tier, op } = mutation;
        let provider = self.inner.provider_resolver.resolve(user_id).await?;
        provider.ensure(tier).await?;

        let filenames = op.lock_filenames();
        if filenames.is_empty() {
            Self::dispatch_locked(provider.as_ref(), tier, op).await
        } else if filenames.len() == 1 {
            let filename = filenames.into_iter().next().expect("checked len == 1");
            self.inner
                .file_locks
                .with_lock(user_id, &repo_url, &filename, true, |_handle| {
                    Self::dispatch_locked(provider.as_ref(), tier, op)
                })
                .await?
        } else {
            self.inner
                .file_locks
                .with_multi_lock(user_id, &repo_url, &filenames, |_handles| {
                    Self::dispatch_locked(provider.as_ref(), tier, op)
                })
                .await?
        }
    }

    /// Deliver a notice that originated outside `handle`/`report_error` —
    /// an admission-time rate-limit rejection or a submission-time queue
    /// rejection, both of which happen before an event ever reaches a
    /// worker. `Core` holds its own handle to the same pipeline for this.
    pub(crate) async fn notify(&self, user_id: i64, notice: Notice) {
        self.inner.notifier.notify(user_id, notice).await;
    }

    /// Run `op` against `provider`. Lives on the handle so the closures
    /// passed to `with_lock`/`with_multi_lock` don't have to capture `self`
    /// (they already borrow the resolved provider, which outlives them).
    async fn dispatch_locked(
        provider: &dyn Provider,
        tier: u8,
        op: MutationOp,
    ) -> Result<(), PipelineError> {
        match op {
            MutationOp::CommitFile { filename, content, message, author } => {
                provider.commit_file(&filename, &content, &message, author.as_ref(), tier).await?;
            }
            MutationOp::ReplaceFile { filename, content, message, author } => {
                provider.replace_file(&filename, &content, &message, author.as_ref(), tier).await?;
            }
            MutationOp::ReplaceMany { files, message, author } => {
                provider.replace_many(&files, &message, author.as_ref(), tier).await?;
            }
            MutationOp::CommitBinary { filename, bytes, message } => {
                provider.commit_binary(&filename, &bytes, &message).await?;
            }
            MutationOp::CreateIssue { title, body } => {
                provider.create(&title, &body).await?;
            }
            MutationOp::SyncStatuses { numbers } => {
                provider.sync_statuses(&numbers).await?;
            }
            MutationOp::AddComment { number, text } => {
                provider.add_comment(number, &text).await?;
            }
            MutationOp::CloseIssue { number } => {
                provider.close(number).await?;
            }
            MutationOp::UploadAsset { filename, bytes } => {
                provider.upload(&filename, &bytes).await?;
            }
        }
        debug!("provider dispatch complete");
        Ok(())
    }
}

#[async_trait]
impl<R, N> EventHandler for Pipeline<R, N>
where
    R: ProviderResolver,
    N: UserNotifier,
{
    type Payload = GitMutation;
    type Error = PipelineError;

    async fn handle(&self, event: Event<GitMutation>) -> Result<(), PipelineError> {
        self.run(event.user_id, event.payload).await
    }

    async fn report_error(&self, user_id: i64, err: PipelineError) {
        let notice = Notice::from(&err);
        self.inner.notifier.notify(user_id, notice).await;
    }
}
