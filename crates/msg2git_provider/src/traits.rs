//! The Provider interface: four capability groups implemented identically
//! by the clone backend and the API backend. Callers hold a `dyn Provider`
//! and never know which one they have.

use crate::types::{AuthorIdentity, IssueStatus, IssueStatusMap, RepoInfo, SizeInfo};
use async_trait::async_trait;
use msg2git_error::ProviderError;
use std::collections::BTreeMap;

/// Repository-level lifecycle and sizing.
#[async_trait]
pub trait Repository: Send + Sync {
    /// Make the repository ready for operations (clone/open, or no-op for
    /// the API backend), rejecting it up front if it's over the tier
    /// ceiling.
    async fn ensure(&self, tier: u8) -> Result<(), ProviderError>;

    /// Whether `ensure` still has to do first-time setup work.
    fn needs_clone(&self) -> bool;

    /// `owner`, `repo`, and the branch operations target.
    fn info(&self) -> RepoInfo;

    /// Current size in bytes.
    async fn size_bytes(&self) -> Result<u64, ProviderError>;

    /// Size ceiling in bytes for the given tier.
    fn max_size(&self, tier: u8) -> u64;

    /// Current usage against the tier ceiling.
    async fn size_info(&self, tier: u8) -> Result<SizeInfo, ProviderError>;

    /// Whether usage has crossed the backend's near-capacity threshold, and
    /// the percentage observed.
    async fn near_capacity(&self, tier: u8) -> Result<(bool, f64), ProviderError>;

    /// The web URL for `filename` on the default branch.
    fn file_url(&self, filename: &str) -> String;
}

/// File contents: prepend, overwrite, multi-file replace, binary commit,
/// and read.
#[async_trait]
pub trait FileOps: Send + Sync {
    /// Prepend `content` to `filename` (creating it if absent).
    async fn commit_file(
        &self,
        filename: &str,
        content: &str,
        message: &str,
        author: Option<&AuthorIdentity>,
        tier: u8,
    ) -> Result<(), ProviderError>;

    /// Overwrite `filename` with `content` (creating it if absent).
    async fn replace_file(
        &self,
        filename: &str,
        content: &str,
        message: &str,
        author: Option<&AuthorIdentity>,
        tier: u8,
    ) -> Result<(), ProviderError>;

    /// Overwrite several files under one commit. The API backend issues
    /// sequential PUTs linearized by the caller's file locks; true
    /// multi-file atomicity via the Git Data API is out of scope.
    async fn replace_many(
        &self,
        files: &BTreeMap<String, String>,
        message: &str,
        author: Option<&AuthorIdentity>,
        tier: u8,
    ) -> Result<(), ProviderError>;

    /// Commit raw bytes to `filename`. Never prepends.
    async fn commit_binary(
        &self,
        filename: &str,
        bytes: &[u8],
        message: &str,
    ) -> Result<(), ProviderError>;

    /// Read `filename`'s current content, or `None` if it doesn't exist.
    async fn read_file(&self, filename: &str) -> Result<Option<String>, ProviderError>;
}

/// Issue creation, status sync, comments, and closing.
#[async_trait]
pub trait IssueOps: Send + Sync {
    /// Create an issue, returning its URL and number.
    async fn create(&self, title: &str, body: &str) -> Result<(String, u64), ProviderError>;

    /// Fetch one issue's status.
    async fn get_status(&self, number: u64) -> Result<IssueStatus, ProviderError>;

    /// Fetch statuses for several issues in one round trip where the
    /// backend supports it (mandatory for the API backend via GraphQL).
    async fn sync_statuses(&self, numbers: &[u64]) -> Result<IssueStatusMap, ProviderError>;

    /// Add a comment, returning its URL.
    async fn add_comment(&self, number: u64, text: &str) -> Result<String, ProviderError>;

    /// Close an issue.
    async fn close(&self, number: u64) -> Result<(), ProviderError>;
}

/// Binary asset upload via GitHub releases.
#[async_trait]
pub trait AssetOps: Send + Sync {
    /// Upload `bytes` as `filename`, returning the asset's download URL.
    async fn upload(&self, filename: &str, bytes: &[u8]) -> Result<String, ProviderError>;
}

/// The full provider surface. Blanket-implemented for anything satisfying
/// all four capability groups.
pub trait Provider: Repository + FileOps + IssueOps + AssetOps {}

impl<T: Repository + FileOps + IssueOps + AssetOps> Provider for T {}
