//! Repository provider: one interface, two backends.
//!
//! [`traits::Provider`] is implemented identically by [`api::ApiProvider`]
//! (GitHub REST/GraphQL) and [`clone::CloneProvider`] (a local working tree
//! driven by `git` subprocesses). [`factory::build_provider`] selects
//! between them per request, by config, never inferred from the caller.
//! [`noop::NoopProvider`] is a third, in-memory implementation used by
//! tests that exercise callers of `dyn Provider` without touching the
//! network or a filesystem.

#![forbid(unsafe_code)]

pub mod api;
pub mod clone;
pub mod factory;
pub mod noop;
pub mod retry;
pub mod traits;
pub mod types;

pub use factory::build_provider;
pub use noop::NoopProvider;
pub use retry::retry_transient;
pub use traits::{AssetOps, FileOps, IssueOps, Provider, Repository};
pub use types::{AuthorIdentity, Credentials, IssueStatus, IssueStatusMap, ProviderConfig, RepoInfo, SizeInfo};
