//! File lock manager error types.

/// Kinds of file lock errors.
#[derive(Debug, Clone, derive_more::Display)]
pub enum LockErrorKind {
    /// The caller's deadline elapsed while waiting for the mutex.
    #[display("timed out acquiring lock for {key} after {waited_ms}ms")]
    AcquisitionTimeout {
        /// Canonical `owner/repo:path` key
        key: String,
        /// How long the caller waited before giving up
        waited_ms: u64,
    },
    /// The caller's cancellation token fired while waiting for the mutex.
    #[display("lock acquisition for {key} was cancelled")]
    AcquisitionCancelled {
        /// Canonical `owner/repo:path` key
        key: String,
    },
}

/// File lock error with source location.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Lock Error: {} at line {} in {}", kind, line, file)]
pub struct LockError {
    /// The kind of error that occurred
    pub kind: LockErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl LockError {
    /// Create a new lock error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: LockErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
