//! The pool's four-state lifecycle.

/// `NotStarted -> Running -> Draining -> Stopped`. Never moves backward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolState {
    /// No workers spawned yet; submissions are rejected.
    NotStarted,
    /// Workers are running and the queues accept new events.
    Running,
    /// `stop()` has been called; queues reject new events while in-flight
    /// work finishes.
    Draining,
    /// All workers have exited (or the drain timeout elapsed).
    Stopped,
}
