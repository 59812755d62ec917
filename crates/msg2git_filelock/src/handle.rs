//! The caller-facing token representing one live lock acquisition.

use crate::manager::FileLockManager;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A token for one live acquisition of a `FileLock`. `release()` is
/// idempotent: calling it twice is a no-op and does not affect other
/// holders.
pub struct Handle {
    pub(crate) manager: FileLockManager,
    pub(crate) key: String,
    pub(crate) handle_id: u64,
    pub(crate) user_id: i64,
    pub(crate) released: Arc<AtomicBool>,
}

impl Handle {
    /// The canonical `owner/repo:path` key this handle locks.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The user on whose behalf this handle was acquired.
    pub fn user_id(&self) -> i64 {
        self.user_id
    }

    /// Release the lock. Idempotent — a second call is a no-op.
    pub async fn release(&self) {
        if self.released.swap(true, Ordering::AcqRel) {
            return;
        }
        self.manager.release_handle(&self.key, self.handle_id).await;
    }
}
