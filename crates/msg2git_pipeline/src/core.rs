//! `Core` wires the four leaf components (A–D) together behind the entry
//! points an ingress adapter calls: `submit_message`/`submit_callback` run
//! admission (§4.E point 1) and submission (point 2); the `Pipeline`
//! registered as both fleets' handler runs lock acquisition and provider
//! dispatch (point 3) once a worker picks the event up.

use crate::deferred::{DeferredQueue, Fleet};
use crate::notify::{Notice, UserNotifier};
use crate::pipeline::Pipeline;
use crate::resolver::ProviderResolver;
use crate::types::{GitMutation, MutationOp};
use msg2git_config::{LimitClass, Settings};
use msg2git_error::PipelineError;
use msg2git_filelock::FileLockManager;
use msg2git_ratelimit::RateLimiter;
use msg2git_workerpool::{Event, WorkerPool};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, instrument, warn};

/// How often the deferred-retry loop wakes to check for due events.
const DEFERRED_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Snapshot across every component, safe to expose to metrics.
#[derive(Debug, Clone, Copy)]
pub struct CoreStats {
    /// Rate limiter snapshot.
    pub rate_limiter: msg2git_ratelimit::Stats,
    /// File lock manager snapshot.
    pub file_locks: msg2git_filelock::Stats,
    /// Worker pool snapshot.
    pub worker_pool: msg2git_workerpool::Stats,
    /// Events currently waiting in the deferred-retry queue.
    pub deferred: usize,
}

/// The assembled concurrency core: rate limiter, file lock manager, worker
/// pool, and the pipeline handler bridging the three. Cheap to clone
/// (every field is internally `Arc`-backed); share one instance across the
/// process.
pub struct Core<R, N>
where
    R: ProviderResolver,
    N: UserNotifier,
{
    rate_limiter: RateLimiter,
    file_locks: FileLockManager,
    pipeline: Pipeline<R, N>,
    pool: Arc<WorkerPool<Pipeline<R, N>, Pipeline<R, N>>>,
    deferred: DeferredQueue,
    retry_cancel: CancellationToken,
}

impl<R, N> Core<R, N>
where
    R: ProviderResolver,
    N: UserNotifier,
{
    /// Assemble every component from `settings`. Does not start worker
    /// fleets or janitors — call [`Core::start`] once the core is wired
    /// into its owner.
    pub fn new(settings: &Settings, provider_resolver: R, notifier: N) -> Self {
        let rate_limiter = RateLimiter::new(settings.rate_limit.clone());
        let file_locks = FileLockManager::new(
            Duration::from_secs(settings.provider.handle_ttl_secs),
            Duration::from_secs(settings.provider.lock_idle_reap_secs),
            Duration::from_secs(settings.provider.lock_janitor_interval_secs),
        );
        let pipeline = Pipeline::new(file_locks.clone(), provider_resolver, notifier);
        let pool = Arc::new(WorkerPool::new(
            settings.worker_pool,
            pipeline.clone(),
            pipeline.clone(),
        ));
        let deferred_retry_secs = settings
            .rate_limit
            .classes
            .get(LimitClass::Command.as_str())
            .map(|q| q.window_secs.max(1))
            .unwrap_or(1);

        Self {
            rate_limiter,
            file_locks,
            pipeline,
            pool,
            deferred: DeferredQueue::new(Duration::from_secs(deferred_retry_secs)),
            retry_cancel: CancellationToken::new(),
        }
    }

    /// Start the worker fleets, both janitors, and the deferred-retry loop.
    pub async fn start(self: &Arc<Self>) {
        self.pool.start().await;
        self.rate_limiter.spawn_janitor();
        self.file_locks.spawn_janitor();
        self.spawn_retry_loop();
    }

    /// Run admission then submission for a message event. On
    /// `LimitExceeded` the event is parked in the deferred-retry queue and
    /// `Err` carries the rejection; no provider work runs. On `QueueFull`
    /// the event is dropped; `Err` carries the rejection so the caller can
    /// notify the user (the pipeline's own `report_error` only fires for
    /// errors from an already-submitted event).
    #[instrument(skip(self, op, repo_url), fields(tier, user_id))]
    pub async fn submit_message(
        &self,
        user_id: i64,
        tier: u8,
        repo_url: impl Into<String>,
        op: MutationOp,
    ) -> Result<(), PipelineError> {
        self.admit_and_submit(user_id, tier, repo_url.into(), op, Fleet::Message).await
    }

    /// Same as [`Core::submit_message`] but routes to the callback fleet.
    #[instrument(skip(self, op, repo_url), fields(tier, user_id))]
    pub async fn submit_callback(
        &self,
        user_id: i64,
        tier: u8,
        repo_url: impl Into<String>,
        op: MutationOp,
    ) -> Result<(), PipelineError> {
        self.admit_and_submit(user_id, tier, repo_url.into(), op, Fleet::Callback).await
    }

    async fn admit_and_submit(
        &self,
        user_id: i64,
        tier: u8,
        repo_url: String,
        op: MutationOp,
        fleet: Fleet,
    ) -> Result<(), PipelineError> {
        let mutation = GitMutation { repo_url, tier, op };

        if let Err(rate_err) = self.rate_limiter.consume(user_id, LimitClass::Command, tier).await {
            debug!(user_id, "admission rejected, parking in deferred queue");
            self.deferred.push(user_id, tier, fleet, mutation).await;
            self.pipeline.notify(user_id, Notice::RateLimited).await;
            return Err(rate_err.into());
        }

        self.submit_to_fleet(user_id, fleet, mutation).await
    }

    async fn submit_to_fleet(
        &self,
        user_id: i64,
        fleet: Fleet,
        mutation: GitMutation,
    ) -> Result<(), PipelineError> {
        let event = Event::new(mutation, user_id);
        let result = match fleet {
            Fleet::Message => self.pool.submit_message(event).await,
            Fleet::Callback => self.pool.submit_callback(event).await,
        };
        if result.is_err() {
            self.pipeline.notify(user_id, Notice::QueueFull).await;
        }
        result.map_err(PipelineError::from)
    }

    /// Spawn the self-restarting loop that retries deferred events once
    /// their backoff has elapsed. Mirrors the janitor idiom used by the
    /// rate limiter and the lock manager: panics are caught and the loop
    /// restarts rather than silently dying.
    fn spawn_retry_loop(self: &Arc<Self>) {
        let core = Arc::clone(self);
        let cancel = self.retry_cancel.clone();
        tokio::spawn(async move {
            loop {
                let core = Arc::clone(&core);
                let cancel = cancel.clone();
                let handle = tokio::spawn(async move {
                    let mut ticker = tokio::time::interval(DEFERRED_POLL_INTERVAL);
                    loop {
                        tokio::select! {
                            _ = cancel.cancelled() => break,
                            _ = ticker.tick() => core.retry_due_events().await,
                        }
                    }
                });
                match handle.await {
                    Ok(()) => break,
                    Err(join_err) if join_err.is_panic() => {
                        error!("deferred-retry loop panicked, restarting");
                        continue;
                    }
                    Err(_) => break,
                }
            }
        });
    }

    async fn retry_due_events(&self) {
        for due in self.deferred.drain_due().await {
            match self.rate_limiter.consume(due.user_id, LimitClass::Command, due.tier).await {
                Ok(()) => {
                    if let Err(e) = self.submit_to_fleet(due.user_id, due.fleet, due.mutation).await {
                        warn!(user_id = due.user_id, error = %e, "deferred retry could not be resubmitted");
                    }
                }
                Err(_) => {
                    self.deferred.push(due.user_id, due.tier, due.fleet, due.mutation).await;
                }
            }
        }
    }

    /// Stop the worker fleets and the deferred-retry loop. Janitors are
    /// process-wide singletons per `spec.md` §9 and are not torn down.
    pub async fn stop(&self) -> Result<(), msg2git_error::PoolError> {
        self.retry_cancel.cancel();
        self.pool.stop().await
    }

    /// Point-in-time snapshot across every component.
    pub async fn stats(&self) -> CoreStats {
        CoreStats {
            rate_limiter: self.rate_limiter.stats().await,
            file_locks: self.file_locks.stats().await,
            worker_pool: self.pool.stats().await,
            deferred: self.deferred.len().await,
        }
    }
}
