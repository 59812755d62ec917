//! Worker pool configuration.

use serde::{Deserialize, Serialize};

/// Fleet sizes, queue capacities, and the global operation semaphore.
/// Field defaults mirror `spec.md` §4.D verbatim.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WorkerPoolSettings {
    /// Number of message-handling workers to spawn at `start()`.
    pub message_workers: usize,
    /// Number of callback-handling workers to spawn at `start()`.
    pub callback_workers: usize,
    /// Bounded capacity of the message ingress queue.
    pub message_queue: usize,
    /// Bounded capacity of the callback ingress queue.
    pub callback_queue: usize,
    /// Process-wide cap on concurrently executing handlers.
    pub max_concurrent_ops: usize,
    /// How long `stop()` waits for in-flight handlers before giving up.
    pub drain_timeout_secs: u64,
}

impl Default for WorkerPoolSettings {
    fn default() -> Self {
        Self {
            message_workers: 35,
            callback_workers: 30,
            message_queue: 200,
            callback_queue: 100,
            max_concurrent_ops: 20,
            drain_timeout_secs: 30,
        }
    }
}
