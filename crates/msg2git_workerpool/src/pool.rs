//! Fixed-size worker fleets pulling off bounded ingress queues, generalizing
//! the reference actor server's `Arc<RwLock<bool>>` running flag to a
//! four-state lifecycle and its task scheduler's spawn-loop idiom to a
//! semaphore-gated worker fleet.

use crate::event::Event;
use crate::handler::EventHandler;
use crate::state::PoolState;
use msg2git_config::WorkerPoolSettings;
use msg2git_error::{PoolError, PoolErrorKind};
use std::sync::{Arc, RwLock as StdRwLock};
use std::time::Duration;
use tokio::sync::{mpsc, Mutex, Semaphore};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, instrument, warn};

/// Queue depths and semaphore occupancy, safe to expose to metrics.
#[derive(Debug, Clone, Copy)]
pub struct Stats {
    /// Current lifecycle state.
    pub state: PoolState,
    /// Events currently queued for message workers.
    pub message_queue_len: usize,
    /// Bound configured for the message queue.
    pub message_queue_cap: usize,
    /// Events currently queued for callback workers.
    pub callback_queue_len: usize,
    /// Bound configured for the callback queue.
    pub callback_queue_cap: usize,
    /// Operation slots currently in use out of `max_concurrent_ops`.
    pub ops_in_flight: usize,
    /// `max_concurrent_ops` as configured.
    pub max_concurrent_ops: usize,
}

struct Queue<T> {
    tx: mpsc::Sender<T>,
    rx: Mutex<Option<mpsc::Receiver<T>>>,
    capacity: usize,
}

impl<T> Queue<T> {
    fn bounded(capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity);
        Self { tx, rx: Mutex::new(Some(rx)), capacity }
    }

    fn len(&self) -> usize {
        self.capacity - self.tx.capacity()
    }
}

/// Bounded ingress queues plus concurrency-capped worker fleets for message
/// and callback handlers. Workers are panic-safe but never auto-respawned:
/// fleet size is fixed at [`WorkerPool::start`].
pub struct WorkerPool<MH, CH>
where
    MH: EventHandler,
    CH: EventHandler,
{
    settings: WorkerPoolSettings,
    message_handler: Arc<MH>,
    callback_handler: Arc<CH>,
    message_queue: Arc<Queue<Event<MH::Payload>>>,
    callback_queue: Arc<Queue<Event<CH::Payload>>>,
    semaphore: Arc<Semaphore>,
    state: Arc<StdRwLock<PoolState>>,
    cancel: CancellationToken,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl<MH, CH> WorkerPool<MH, CH>
where
    MH: EventHandler,
    CH: EventHandler,
{
    /// Build a pool in `NotStarted` state. Call [`WorkerPool::start`] before
    /// submitting events.
    pub fn new(settings: WorkerPoolSettings, message_handler: MH, callback_handler: CH) -> Self {
        let message_queue = Arc::new(Queue::bounded(settings.message_queue));
        let callback_queue = Arc::new(Queue::bounded(settings.callback_queue));
        let semaphore = Arc::new(Semaphore::new(settings.max_concurrent_ops));
        Self {
            settings,
            message_handler: Arc::new(message_handler),
            callback_handler: Arc::new(callback_handler),
            message_queue,
            callback_queue,
            semaphore,
            state: Arc::new(StdRwLock::new(PoolState::NotStarted)),
            cancel: CancellationToken::new(),
            workers: Mutex::new(Vec::new()),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> PoolState {
        *self.state.read().unwrap()
    }

    /// Spawn the configured message and callback worker fleets and move to
    /// `Running`.
    #[instrument(skip(self))]
    pub async fn start(&self) {
        let message_rx = self.message_queue.rx.lock().await.take();
        let callback_rx = self.callback_queue.rx.lock().await.take();

        let mut workers = self.workers.lock().await;
        if let Some(rx) = message_rx {
            let rx = Arc::new(Mutex::new(rx));
            for id in 0..self.settings.message_workers {
                workers.push(self.spawn_worker("message", id, rx.clone(), self.message_handler.clone()));
            }
        }
        if let Some(rx) = callback_rx {
            let rx = Arc::new(Mutex::new(rx));
            for id in 0..self.settings.callback_workers {
                workers.push(self.spawn_worker("callback", id, rx.clone(), self.callback_handler.clone()));
            }
        }

        *self.state.write().unwrap() = PoolState::Running;
        debug!(
            message_workers = self.settings.message_workers,
            callback_workers = self.settings.callback_workers,
            "worker pool started"
        );
    }

    fn spawn_worker<H: EventHandler>(
        &self,
        fleet: &'static str,
        id: usize,
        rx: Arc<Mutex<mpsc::Receiver<Event<H::Payload>>>>,
        handler: Arc<H>,
    ) -> JoinHandle<()> {
        let semaphore = self.semaphore.clone();
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            loop {
                let event = tokio::select! {
                    _ = cancel.cancelled() => break,
                    event = async {
                        let mut rx = rx.lock().await;
                        rx.recv().await
                    } => match event {
                        Some(event) => event,
                        None => break,
                    },
                };

                let permit = tokio::select! {
                    _ = cancel.cancelled() => break,
                    permit = semaphore.clone().acquire_owned() => match permit {
                        Ok(permit) => permit,
                        Err(_) => break,
                    },
                };

                let user_id = event.user_id;
                match handler.handle(event).await {
                    Ok(()) => {}
                    Err(err) => {
                        warn!(fleet, worker = id, user_id, "handler returned an error, reporting to user");
                        handler.report_error(user_id, err).await;
                    }
                }
                drop(permit);
            }
            debug!(fleet, worker = id, "worker exited");
        })
    }

    /// Submit a message event. Non-blocking: returns immediately whether
    /// admitted, rejected, or dropped for a full queue.
    pub async fn submit_message(&self, event: Event<MH::Payload>) -> Result<(), PoolError> {
        self.submit(&self.message_queue, event).await
    }

    /// Submit a callback event. Non-blocking, same semantics as
    /// [`WorkerPool::submit_message`].
    pub async fn submit_callback(&self, event: Event<CH::Payload>) -> Result<(), PoolError> {
        self.submit(&self.callback_queue, event).await
    }

    async fn submit<T>(&self, queue: &Queue<T>, event: T) -> Result<(), PoolError> {
        match *self.state.read().unwrap() {
            PoolState::NotStarted => return Err(PoolError::new(PoolErrorKind::NotStarted)),
            PoolState::Draining | PoolState::Stopped => return Err(PoolError::new(PoolErrorKind::ShuttingDown)),
            PoolState::Running => {}
        }
        if self.cancel.is_cancelled() {
            return Err(PoolError::new(PoolErrorKind::ShuttingDown));
        }
        match queue.tx.try_send(event) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => Err(PoolError::new(PoolErrorKind::QueueFull)),
            Err(mpsc::error::TrySendError::Closed(_)) => Err(PoolError::new(PoolErrorKind::ShuttingDown)),
        }
    }

    /// Move to `Draining`, cancel all workers' queue waits, and wait up to
    /// `drain_timeout_secs` for the fleet to exit. Returns `Timeout` if
    /// workers are still running when the deadline passes; the pool is
    /// moved to `Stopped` either way.
    #[instrument(skip(self))]
    pub async fn stop(&self) -> Result<(), PoolError> {
        *self.state.write().unwrap() = PoolState::Draining;
        self.cancel.cancel();

        let handles: Vec<JoinHandle<()>> = std::mem::take(&mut *self.workers.lock().await);
        let drain = async {
            for handle in handles {
                if let Err(e) = handle.await {
                    if e.is_panic() {
                        error!(error = ?e, "worker panicked during shutdown");
                    }
                }
            }
        };

        let result = tokio::time::timeout(Duration::from_secs(self.settings.drain_timeout_secs), drain).await;
        *self.state.write().unwrap() = PoolState::Stopped;

        match result {
            Ok(()) => {
                debug!("worker pool drained cleanly");
                Ok(())
            }
            Err(_) => {
                error!("worker pool did not drain within the timeout");
                Err(PoolError::new(PoolErrorKind::Timeout))
            }
        }
    }

    /// Snapshot of queue depths, semaphore occupancy, and lifecycle state.
    pub async fn stats(&self) -> Stats {
        Stats {
            state: *self.state.read().unwrap(),
            message_queue_len: self.message_queue.len(),
            message_queue_cap: self.settings.message_queue,
            callback_queue_len: self.callback_queue.len(),
            callback_queue_cap: self.settings.callback_queue,
            ops_in_flight: self.settings.max_concurrent_ops - self.semaphore.available_permits(),
            max_concurrent_ops: self.settings.max_concurrent_ops,
        }
    }
}
