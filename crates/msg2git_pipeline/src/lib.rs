//! The handler pipeline: thin glue tying the rate limiter, file lock
//! manager, worker pool, and GitHub provider layer into the single
//! entry point an ingress adapter calls per inbound event.
//!
//! [`Core`] owns one instance of every component and exposes
//! `submit_message`/`submit_callback` (admission + submission, §4.E points
//! 1–2). [`Pipeline`] is what actually runs inside a worker once an event
//! is dequeued (lock acquisition + provider dispatch, §4.E point 3) — it's
//! registered with the `WorkerPool` as both the message and callback
//! handler. Resolving a user's provider and delivering a user-facing
//! notice are external collaborators; [`ProviderResolver`] and
//! [`UserNotifier`] are the seams this crate defines for them.

#![forbid(unsafe_code)]

mod core;
mod deferred;
mod notify;
mod pipeline;
mod resolver;
mod types;

pub use crate::core::{Core, CoreStats};
pub use deferred::{Deferred, DeferredQueue, Fleet};
pub use notify::{Notice, SilentNotifier, UserNotifier};
pub use pipeline::Pipeline;
pub use resolver::{ProviderResolver, StaticResolver};
pub use types::{GitMutation, MutationOp};
