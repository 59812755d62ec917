//! Inbound work items.

use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// One inbound event: an opaque payload plus the fields every handler
/// needs regardless of payload type. Consumed exactly once by a worker.
#[derive(Debug)]
pub struct Event<T> {
    /// The handler-specific payload.
    pub payload: T,
    /// The user this event belongs to, for error reporting and logging.
    pub user_id: i64,
    /// When the event was submitted to the pool.
    pub arrived_at: Instant,
    /// Cancelled if the event should be abandoned before a worker picks it
    /// up (e.g. the caller's own request context expired).
    pub cancellation: CancellationToken,
}

impl<T> Event<T> {
    /// Wrap `payload` for `user_id`, starting an independent cancellation
    /// token.
    pub fn new(payload: T, user_id: i64) -> Self {
        Self { payload, user_id, arrived_at: Instant::now(), cancellation: CancellationToken::new() }
    }
}
