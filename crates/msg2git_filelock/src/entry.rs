//! The per-key lock entry: the shared/exclusive mutex, refcount, and the
//! table of currently-live handles.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};

pub(crate) type HandleId = u64;

/// The guard for a held lock, in whichever mode it was acquired. Owned
/// guards can be stored in the handle table and moved across tasks; dropping
/// one releases the lock exactly once, so — unlike a raw mutex that must be
/// explicitly unlocked — there is no way to double-unlock it.
pub(crate) enum HeldGuard {
    Shared(OwnedRwLockReadGuard<()>),
    Exclusive(OwnedRwLockWriteGuard<()>),
}

pub(crate) struct ActiveHandle {
    pub(crate) acquired_at: Instant,
    pub(crate) expires_at: Instant,
    pub(crate) exclusive: bool,
    pub(crate) guard: Option<HeldGuard>,
}

/// One `FileLock` value: the mutex being serialized, its reference count,
/// last-use timestamp, and the set of active handles registered against it.
pub(crate) struct LockEntry {
    pub(crate) rw: Arc<RwLock<()>>,
    pub(crate) refcount: Mutex<i64>,
    pub(crate) last_used: Mutex<Instant>,
    pub(crate) handles: Mutex<HashMap<HandleId, ActiveHandle>>,
}

impl LockEntry {
    pub(crate) fn new(now: Instant) -> Self {
        Self {
            rw: Arc::new(RwLock::new(())),
            refcount: Mutex::new(0),
            last_used: Mutex::new(now),
            handles: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) async fn touch_and_incref(&self, now: Instant) {
        *self.refcount.lock().await += 1;
        *self.last_used.lock().await = now;
    }

    pub(crate) async fn touch_and_decref(&self, now: Instant) {
        let mut refcount = self.refcount.lock().await;
        *refcount -= 1;
        *self.last_used.lock().await = now;
    }

    pub(crate) async fn is_reapable(&self, now: Instant, idle_reap: Duration) -> bool {
        let refcount = *self.refcount.lock().await;
        let last_used = *self.last_used.lock().await;
        refcount <= 0 && now.saturating_duration_since(last_used) > idle_reap
    }
}
