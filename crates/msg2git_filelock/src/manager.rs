//! The file lock manager: one mutex per `(repo, path)` key, with bounded
//! waits, expiring handles, and idle-entry reaping.

use crate::entry::{ActiveHandle, HandleId, HeldGuard, LockEntry};
use crate::handle::Handle;
use crate::key::canonicalize;
use msg2git_error::{LockError, LockErrorKind};
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, instrument, warn};

/// Default deadline for a single-file `with_lock` call.
pub const DEFAULT_SINGLE_TIMEOUT: Duration = Duration::from_secs(30);
/// Default deadline for a `with_multi_lock` call spanning several files.
pub const DEFAULT_MULTI_TIMEOUT: Duration = Duration::from_secs(120);

/// Point-in-time snapshot of manager activity.
#[derive(Debug, Clone, Copy, Default)]
pub struct Stats {
    /// Distinct `(repo, path)` keys currently tracked.
    pub tracked_locks: usize,
    /// Keys with at least one live handle.
    pub held_locks: usize,
    /// Total live handles across all keys.
    pub active_handles: usize,
}

/// Manages one `tokio::sync::RwLock` per canonical `(repo, path)` key.
/// Cheap to clone (internally `Arc`-backed); share one instance across the
/// process.
#[derive(Clone)]
pub struct FileLockManager {
    table: Arc<RwLock<HashMap<String, Arc<LockEntry>>>>,
    handle_ttl: Duration,
    idle_reap: Duration,
    janitor_interval: Duration,
}

impl FileLockManager {
    /// Build a manager. Does not start the janitor; call
    /// [`FileLockManager::spawn_janitor`] once the manager is wired into its
    /// owner.
    pub fn new(handle_ttl: Duration, idle_reap: Duration, janitor_interval: Duration) -> Self {
        Self {
            table: Arc::new(RwLock::new(HashMap::new())),
            handle_ttl,
            idle_reap,
            janitor_interval,
        }
    }

    async fn get_or_create(&self, key: &str, now: Instant) -> Arc<LockEntry> {
        if let Some(existing) = self.table.read().await.get(key) {
            return Arc::clone(existing);
        }
        let mut table = self.table.write().await;
        // Double-checked: another writer may have created it first.
        table
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(LockEntry::new(now)))
            .clone()
    }

    /// Acquire the lock for `repo_url`/`filename`, waiting up to `deadline`
    /// or until `cancel` fires. `user_id` is carried for attribution only —
    /// it is not part of the lock key, so locks are shared across users
    /// operating on the same repo file.
    #[instrument(skip(self, cancel))]
    pub async fn acquire(
        &self,
        user_id: i64,
        repo_url: &str,
        filename: &str,
        exclusive: bool,
        cancel: CancellationToken,
        deadline: Duration,
    ) -> Result<Handle, LockError> {
        let key = canonicalize(repo_url, filename);
        let now = Instant::now();
        let entry = self.get_or_create(&key, now).await;
        entry.touch_and_incref(now).await;

        let rw = Arc::clone(&entry.rw);
        let acquire_fut = async move {
            if exclusive {
                HeldGuard::Exclusive(rw.write_owned().await)
            } else {
                HeldGuard::Shared(rw.read_owned().await)
            }
        };

        let guard = tokio::select! {
            biased;
            g = acquire_fut => g,
            _ = cancel.cancelled() => {
                entry.touch_and_decref(Instant::now()).await;
                return Err(LockError::new(LockErrorKind::AcquisitionCancelled { key }));
            }
            _ = tokio::time::sleep(deadline) => {
                entry.touch_and_decref(Instant::now()).await;
                return Err(LockError::new(LockErrorKind::AcquisitionTimeout {
                    key,
                    waited_ms: deadline.as_millis() as u64,
                }));
            }
        };

        let handle_id: HandleId = rand::random();
        let acquired_at = Instant::now();
        let expires_at = acquired_at + self.handle_ttl;
        entry.handles.lock().await.insert(
            handle_id,
            ActiveHandle {
                acquired_at,
                expires_at,
                exclusive,
                guard: Some(guard),
            },
        );

        debug!(key = %key, handle_id, exclusive, "lock acquired");
        Ok(Handle {
            manager: self.clone(),
            key,
            handle_id,
            user_id,
            released: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Remove `handle_id` from its entry, dropping its guard (which releases
    /// the underlying mutex) and decrementing the refcount. A no-op if the
    /// handle was already removed, whether by a prior `release()` or by the
    /// force-release janitor.
    pub(crate) async fn release_handle(&self, key: &str, handle_id: HandleId) {
        let Some(entry) = self.table.read().await.get(key).cloned() else {
            return;
        };
        if entry.handles.lock().await.remove(&handle_id).is_some() {
            entry.touch_and_decref(Instant::now()).await;
            debug!(key, handle_id, "lock released");
        }
    }

    /// Acquire the lock for one file, run `f`, then release — even if `f`
    /// panics the guard is still dropped, since it lives in the table, not
    /// on this stack frame.
    pub async fn with_lock<F, Fut, R>(
        &self,
        user_id: i64,
        repo_url: &str,
        filename: &str,
        exclusive: bool,
        f: F,
    ) -> Result<R, LockError>
    where
        F: FnOnce(&Handle) -> Fut,
        Fut: Future<Output = R>,
    {
        let handle = self
            .acquire(
                user_id,
                repo_url,
                filename,
                exclusive,
                CancellationToken::new(),
                DEFAULT_SINGLE_TIMEOUT,
            )
            .await?;
        let result = f(&handle).await;
        handle.release().await;
        Ok(result)
    }

    /// Acquire exclusive locks for several files in the same repo, always in
    /// sorted filename order, then run `f`. Locks are released in reverse
    /// acquisition order. Sorting the acquisition order across every caller
    /// is what makes multi-file locking deadlock-free: no two callers can
    /// ever hold a prefix of each other's lock lists and wait on the rest.
    pub async fn with_multi_lock<F, Fut, R>(
        &self,
        user_id: i64,
        repo_url: &str,
        filenames: &[String],
        f: F,
    ) -> Result<R, LockError>
    where
        F: FnOnce(&[Handle]) -> Fut,
        Fut: Future<Output = R>,
    {
        let mut sorted: Vec<String> = filenames.to_vec();
        sorted.sort();
        sorted.dedup();

        let mut handles = Vec::with_capacity(sorted.len());
        for filename in &sorted {
            match self
                .acquire(
                    user_id,
                    repo_url,
                    filename,
                    true,
                    CancellationToken::new(),
                    DEFAULT_MULTI_TIMEOUT,
                )
                .await
            {
                Ok(h) => handles.push(h),
                Err(e) => {
                    for h in handles.into_iter().rev() {
                        h.release().await;
                    }
                    return Err(e);
                }
            }
        }

        let result = f(&handles).await;
        for h in handles.into_iter().rev() {
            h.release().await;
        }
        Ok(result)
    }

    /// Force-release any handle past its expiry, and drop any key whose
    /// refcount has sat at or below zero for longer than the idle reap
    /// window.
    #[instrument(skip(self))]
    async fn sweep(&self) {
        let now = Instant::now();
        let table = self.table.read().await;
        let mut total_forced = 0usize;
        for (key, entry) in table.iter() {
            let mut handles = entry.handles.lock().await;
            let expired: Vec<HandleId> = handles
                .iter()
                .filter(|(_, h)| h.expires_at <= now)
                .map(|(id, _)| *id)
                .collect();
            let mut forced_here = 0usize;
            for id in expired {
                // Dropping the removed ActiveHandle drops its guard, which
                // releases the mutex — there is nothing else to unlock.
                if handles.remove(&id).is_some() {
                    forced_here += 1;
                    warn!(key = %key, handle_id = id, "force-released stalled lock handle");
                }
            }
            drop(handles);
            for _ in 0..forced_here {
                entry.touch_and_decref(now).await;
            }
            total_forced += forced_here;
        }
        if total_forced > 0 {
            debug!(count = total_forced, "janitor force-released stalled handles");
        }
        drop(table);

        let mut reapable = Vec::new();
        for (key, entry) in self.table.read().await.iter() {
            if entry.is_reapable(now, self.idle_reap).await {
                reapable.push(key.clone());
            }
        }
        if !reapable.is_empty() {
            let mut table = self.table.write().await;
            for key in &reapable {
                table.remove(key);
            }
            debug!(count = reapable.len(), "janitor reaped idle lock entries");
        }
    }

    /// Spawn the background janitor. It recovers from panics in `sweep` and
    /// restarts itself.
    pub fn spawn_janitor(&self) -> tokio::task::JoinHandle<()> {
        let manager = self.clone();
        let interval = manager.janitor_interval.max(Duration::from_millis(1));
        tokio::spawn(async move {
            loop {
                let manager = manager.clone();
                let handle = tokio::spawn(async move {
                    let mut ticker = tokio::time::interval(interval);
                    loop {
                        ticker.tick().await;
                        manager.sweep().await;
                    }
                });
                match handle.await {
                    Ok(()) => continue,
                    Err(join_err) if join_err.is_panic() => {
                        error!("file lock janitor panicked, restarting");
                        continue;
                    }
                    Err(_) => break,
                }
            }
        })
    }

    /// Point-in-time snapshot for diagnostics.
    pub async fn stats(&self) -> Stats {
        let table = self.table.read().await;
        let mut held_locks = 0usize;
        let mut active_handles = 0usize;
        for entry in table.values() {
            let count = entry.handles.lock().await.len();
            active_handles += count;
            if count > 0 {
                held_locks += 1;
            }
        }
        Stats {
            tracked_locks: table.len(),
            held_locks,
            active_handles,
        }
    }
}
