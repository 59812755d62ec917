//! Properties 8, 9, 10 — queue bound, semaphore bound, shutdown.

use async_trait::async_trait;
use msg2git_config::WorkerPoolSettings;
use msg2git_workerpool::{Event, EventHandler, PoolState, WorkerPool};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

struct SlowHandler {
    in_flight: Arc<AtomicUsize>,
    max_observed: Arc<AtomicUsize>,
    delay: Duration,
}

#[async_trait]
impl EventHandler for SlowHandler {
    type Payload = ();
    type Error = String;

    async fn handle(&self, _event: Event<()>) -> Result<(), String> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_observed.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }

    async fn report_error(&self, _user_id: i64, _err: String) {}
}

struct FailingHandler {
    reported: Arc<AtomicUsize>,
}

#[async_trait]
impl EventHandler for FailingHandler {
    type Payload = ();
    type Error = String;

    async fn handle(&self, _event: Event<()>) -> Result<(), String> {
        Err("boom".to_string())
    }

    async fn report_error(&self, _user_id: i64, _err: String) {
        self.reported.fetch_add(1, Ordering::SeqCst);
    }
}

fn tiny_settings() -> WorkerPoolSettings {
    WorkerPoolSettings {
        message_workers: 2,
        callback_workers: 1,
        message_queue: 3,
        callback_queue: 1,
        max_concurrent_ops: 1,
        drain_timeout_secs: 1,
    }
}

/// Property 8 — queue bound: once the message queue is full, submissions
/// return QueueFull rather than blocking or dropping silently.
#[tokio::test]
async fn property_queue_bound() {
    let pool = WorkerPool::new(
        tiny_settings(),
        FailingHandler { reported: Arc::new(AtomicUsize::new(0)) },
        FailingHandler { reported: Arc::new(AtomicUsize::new(0)) },
    );
    pool.start().await;

    // None of these submissions yield, so the spawned workers get no
    // chance to drain the queue before it's exhausted: exactly
    // message_queue (3) admit, the rest see QueueFull.
    let mut ok_count = 0;
    let mut queue_full_count = 0;
    for i in 0..8 {
        match pool.submit_message(Event::new((), i)).await {
            Ok(()) => ok_count += 1,
            Err(_) => queue_full_count += 1,
        }
    }
    assert_eq!(ok_count, 3);
    assert_eq!(queue_full_count, 5);

    pool.stop().await.unwrap();
}

/// Property 9 — semaphore bound: with `max_concurrent_ops=1`, only one
/// handler body executes at a time even with multiple workers racing for
/// the same queue.
#[tokio::test]
async fn property_semaphore_bound() {
    let in_flight = Arc::new(AtomicUsize::new(0));
    let max_observed = Arc::new(AtomicUsize::new(0));
    let pool = WorkerPool::new(
        tiny_settings(),
        SlowHandler { in_flight: in_flight.clone(), max_observed: max_observed.clone(), delay: Duration::from_millis(30) },
        FailingHandler { reported: Arc::new(AtomicUsize::new(0)) },
    );
    pool.start().await;

    for i in 0..3 {
        pool.submit_message(Event::new((), i)).await.unwrap();
    }
    tokio::time::sleep(Duration::from_millis(150)).await;

    assert_eq!(max_observed.load(Ordering::SeqCst), 1);
    pool.stop().await.unwrap();
}

/// Property 10 — shutdown: after `stop()` resolves, the pool reports
/// `Stopped` and further submissions are rejected.
#[tokio::test]
async fn property_shutdown_rejects_after_stop() {
    let reported = Arc::new(AtomicUsize::new(0));
    let pool = WorkerPool::new(
        tiny_settings(),
        FailingHandler { reported: reported.clone() },
        FailingHandler { reported: Arc::new(AtomicUsize::new(0)) },
    );
    pool.start().await;

    pool.submit_message(Event::new((), 1)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(reported.load(Ordering::SeqCst), 1);

    pool.stop().await.unwrap();
    assert_eq!(pool.state(), PoolState::Stopped);
    assert!(pool.submit_message(Event::new((), 2)).await.is_err());
}

/// Submitting before `start()` is rejected with `NotStarted`, not a panic
/// or a silently dropped event.
#[tokio::test]
async fn submit_before_start_is_rejected() {
    let pool = WorkerPool::new(
        tiny_settings(),
        FailingHandler { reported: Arc::new(AtomicUsize::new(0)) },
        FailingHandler { reported: Arc::new(AtomicUsize::new(0)) },
    );
    assert_eq!(pool.state(), PoolState::NotStarted);
    assert!(pool.submit_message(Event::new((), 1)).await.is_err());
}
