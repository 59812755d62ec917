//! Worker pool error types.

/// Kinds of worker pool errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum PoolErrorKind {
    /// `submit_*` was called before `start()`.
    #[display("worker pool has not been started")]
    NotStarted,
    /// `submit_*` was called after `stop()` began draining.
    #[display("worker pool is shutting down")]
    ShuttingDown,
    /// The bounded ingress queue was full; the event was dropped.
    #[display("worker pool queue is full")]
    QueueFull,
    /// `stop()` did not observe all workers exit within the drain timeout.
    #[display("worker pool did not stop within the timeout")]
    Timeout,
}

/// Worker pool error with source location.
#[derive(Debug, Clone, Copy, derive_more::Display, derive_more::Error)]
#[display("Worker Pool Error: {} at line {} in {}", kind, line, file)]
pub struct PoolError {
    /// The kind of error that occurred
    pub kind: PoolErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl PoolError {
    /// Create a new pool error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: PoolErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
