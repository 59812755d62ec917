//! The handler a worker fleet calls for every event it pulls off its queue.

use crate::event::Event;
use async_trait::async_trait;

/// Executes one event and, on failure, reports it back to the user. A
/// worker never propagates a handler error further than `report_error`.
#[async_trait]
pub trait EventHandler: Send + Sync + 'static {
    /// The event payload this handler consumes.
    type Payload: Send + 'static;
    /// The error a failed `handle` call produces.
    type Error: std::fmt::Display + Send + 'static;

    /// Run the event to completion.
    async fn handle(&self, event: Event<Self::Payload>) -> Result<(), Self::Error>;

    /// Called when `handle` returns an error, with the event's user and the
    /// error that occurred. Never allowed to fail the worker loop itself.
    async fn report_error(&self, user_id: i64, err: Self::Error);
}
