//! Bounded ingress queues and fixed worker fleets for message and callback
//! handlers, with a process-wide semaphore capping concurrently executing
//! handlers independent of the per-user rate limiter.

#![forbid(unsafe_code)]

mod event;
mod handler;
mod pool;
mod state;

pub use event::Event;
pub use handler::EventHandler;
pub use pool::{Stats, WorkerPool};
pub use state::PoolState;
