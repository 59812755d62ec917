//! The deferred-retry queue an event falls into when rate-limited at
//! admission. Per `spec.md` §4.E point 1, a `LimitExceeded` never runs
//! provider work; instead the event waits here and is retried once its
//! window has had a chance to slide.

use crate::types::GitMutation;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

/// One event waiting for its rate-limit window to clear, plus the fields
/// needed to retry admission and resubmission.
#[derive(Debug, Clone)]
pub struct Deferred {
    /// The user this event belongs to.
    pub user_id: i64,
    /// The user's billing tier, for effective-limit recomputation.
    pub tier: u8,
    /// The queue the event should rejoin: message or callback.
    pub fleet: Fleet,
    /// The operation itself.
    pub mutation: GitMutation,
    /// Not retried before this instant.
    pub retry_at: Instant,
}

/// Which ingress queue a deferred event should rejoin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fleet {
    /// Rejoins the message queue.
    Message,
    /// Rejoins the callback queue.
    Callback,
}

/// An unbounded, FIFO holding area for rate-limited events. Unbounded is
/// deliberate: admission already enforced the per-user cap, so this queue
/// only ever grows as fast as one user can be rejected, not as fast as the
/// whole ingress can produce events.
#[derive(Clone)]
pub struct DeferredQueue {
    items: Arc<Mutex<VecDeque<Deferred>>>,
    retry_after: Duration,
}

impl DeferredQueue {
    /// Build an empty queue. `retry_after` is how long a deferred event
    /// waits before the retry loop attempts it again.
    pub fn new(retry_after: Duration) -> Self {
        Self { items: Arc::new(Mutex::new(VecDeque::new())), retry_after }
    }

    /// Push a just-rejected event onto the queue.
    pub async fn push(&self, user_id: i64, tier: u8, fleet: Fleet, mutation: GitMutation) {
        let retry_at = Instant::now() + self.retry_after;
        self.items.lock().await.push_back(Deferred { user_id, tier, fleet, mutation, retry_at });
    }

    /// Pop every entry whose `retry_at` has passed, oldest first.
    pub async fn drain_due(&self) -> Vec<Deferred> {
        let now = Instant::now();
        let mut items = self.items.lock().await;
        let mut due = Vec::new();
        while let Some(front) = items.front() {
            if front.retry_at > now {
                break;
            }
            due.push(items.pop_front().expect("front just peeked"));
        }
        due
    }

    /// Number of events currently waiting.
    pub async fn len(&self) -> usize {
        self.items.lock().await.len()
    }

    /// Whether the queue currently holds no events.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl std::fmt::Debug for DeferredQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeferredQueue").field("retry_after", &self.retry_after).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MutationOp;

    fn mutation() -> GitMutation {
        GitMutation {
            repo_url: "https://github.com/octocat/hello-world".to_string(),
            tier: 0,
            op: MutationOp::CreateIssue { title: "t".to_string(), body: "b".to_string() },
        }
    }

    #[tokio::test]
    async fn nothing_due_before_the_delay_elapses() {
        let queue = DeferredQueue::new(Duration::from_millis(200));
        queue.push(1, 0, Fleet::Message, mutation()).await;
        assert!(queue.drain_due().await.is_empty());
        assert_eq!(queue.len().await, 1);
    }

    #[tokio::test]
    async fn due_after_the_delay_elapses() {
        let queue = DeferredQueue::new(Duration::from_millis(10));
        queue.push(1, 0, Fleet::Message, mutation()).await;
        tokio::time::sleep(Duration::from_millis(30)).await;
        let due = queue.drain_due().await;
        assert_eq!(due.len(), 1);
        assert!(queue.is_empty().await);
    }

    #[tokio::test]
    async fn drains_in_fifo_order() {
        let queue = DeferredQueue::new(Duration::from_millis(1));
        for i in 0..3 {
            queue.push(i, 0, Fleet::Message, mutation()).await;
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        let due = queue.drain_due().await;
        let ids: Vec<i64> = due.iter().map(|d| d.user_id).collect();
        assert_eq!(ids, vec![0, 1, 2]);
    }
}
