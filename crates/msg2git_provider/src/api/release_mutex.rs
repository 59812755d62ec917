//! Per-repo mutex guarding asset-release discovery/creation. Without this,
//! two concurrent uploads that both find "no releases yet" would each
//! create one, leaving a duplicate.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::{debug, error};

struct Entry {
    mutex: Arc<Mutex<()>>,
    refcount: StdMutex<i64>,
    last_used: StdMutex<Instant>,
}

/// Process-wide table of per-`owner/repo` release mutexes. Cheap to clone.
#[derive(Clone)]
pub struct ReleaseMutexTable {
    table: Arc<RwLock<HashMap<String, Arc<Entry>>>>,
    idle_reap: Duration,
}

impl ReleaseMutexTable {
    /// Build a table whose janitor reaps entries idle for longer than
    /// `idle_reap`.
    pub fn new(idle_reap: Duration) -> Self {
        Self { table: Arc::new(RwLock::new(HashMap::new())), idle_reap }
    }

    async fn get_or_create(&self, key: &str) -> Arc<Entry> {
        if let Some(existing) = self.table.read().await.get(key) {
            return Arc::clone(existing);
        }
        let mut table = self.table.write().await;
        table
            .entry(key.to_string())
            .or_insert_with(|| {
                Arc::new(Entry {
                    mutex: Arc::new(Mutex::new(())),
                    refcount: StdMutex::new(0),
                    last_used: StdMutex::new(Instant::now()),
                })
            })
            .clone()
    }

    /// Hold the mutex for `owner/repo` for the lifetime of the returned
    /// guard. The entry stays ineligible for reaping (refcount > 0) for as
    /// long as the guard is alive, so a concurrent janitor sweep can never
    /// drop the table slot out from under a held lock.
    pub async fn lock(&self, key: &str) -> ReleaseGuard {
        let entry = self.get_or_create(key).await;
        *entry.refcount.lock().unwrap() += 1;
        let guard = Arc::clone(&entry.mutex).lock_owned().await;
        ReleaseGuard { entry, guard: Some(guard) }
    }

    async fn sweep(&self) {
        let now = Instant::now();
        let mut reapable = Vec::new();
        for (key, entry) in self.table.read().await.iter() {
            let refcount = *entry.refcount.lock().unwrap();
            let last_used = *entry.last_used.lock().unwrap();
            if refcount <= 0 && now.saturating_duration_since(last_used) > self.idle_reap {
                reapable.push(key.clone());
            }
        }
        if reapable.is_empty() {
            return;
        }
        let mut table = self.table.write().await;
        for key in &reapable {
            table.remove(key);
        }
        debug!(count = reapable.len(), "release mutex janitor reaped idle entries");
    }

    /// Spawn the background janitor, restarting itself on panic.
    pub fn spawn_janitor(&self, interval: Duration) -> tokio::task::JoinHandle<()> {
        let table = self.clone();
        let interval = interval.max(Duration::from_secs(1));
        tokio::spawn(async move {
            loop {
                let table = table.clone();
                let handle = tokio::spawn(async move {
                    let mut ticker = tokio::time::interval(interval);
                    loop {
                        ticker.tick().await;
                        table.sweep().await;
                    }
                });
                match handle.await {
                    Ok(()) => continue,
                    Err(join_err) if join_err.is_panic() => {
                        error!("release mutex janitor panicked, restarting");
                        continue;
                    }
                    Err(_) => break,
                }
            }
        })
    }
}

/// Held lock on one repo's release-creation mutex. Dropping it releases the
/// mutex and marks the entry idle from this moment.
pub struct ReleaseGuard {
    entry: Arc<Entry>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for ReleaseGuard {
    fn drop(&mut self) {
        self.guard.take();
        *self.entry.refcount.lock().unwrap() -= 1;
        *self.entry.last_used.lock().unwrap() = Instant::now();
    }
}
