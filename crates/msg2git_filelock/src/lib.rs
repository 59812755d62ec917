//! Per-`(repo, path)` file lock manager.
//!
//! Each canonical key gets its own `tokio::sync::RwLock`; readers share,
//! writers exclude. Handles expire on a TTL so a stalled holder cannot wedge
//! a file forever, and idle entries are reaped from the table. Releasing a
//! handle is a removal-plus-drop, so double release and force-release both
//! collapse to the same safe no-op.

#![forbid(unsafe_code)]

mod entry;
mod handle;
mod key;
mod manager;

pub use handle::Handle;
pub use key::{canonicalize, parse_owner_repo};
pub use manager::{FileLockManager, Stats, DEFAULT_MULTI_TIMEOUT, DEFAULT_SINGLE_TIMEOUT};
