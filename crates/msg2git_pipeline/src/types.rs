//! The payload every inbound event carries: which repository, which tier,
//! and which provider operation to run once admitted and lock-guarded.

use msg2git_provider::AuthorIdentity;
use std::collections::BTreeMap;

/// One GitHub-mutating (or reading) operation a worker will run against a
/// resolved [`msg2git_provider::Provider`].
#[derive(Debug, Clone)]
pub enum MutationOp {
    /// Prepend semantics: `commit_file`.
    CommitFile {
        /// Path within the repository.
        filename: String,
        /// Content to prepend.
        content: String,
        /// Commit message.
        message: String,
        /// Per-request author, if the caller supplied one.
        author: Option<AuthorIdentity>,
    },
    /// Overwrite semantics: `replace_file`.
    ReplaceFile {
        /// Path within the repository.
        filename: String,
        /// New content.
        content: String,
        /// Commit message.
        message: String,
        /// Per-request author, if the caller supplied one.
        author: Option<AuthorIdentity>,
    },
    /// Overwrite several files under one commit. Filenames are taken from
    /// the map's keys; `with_multi_lock` sorts and dedups them before
    /// acquiring locks.
    ReplaceMany {
        /// `filename -> new content`.
        files: BTreeMap<String, String>,
        /// Commit message.
        message: String,
        /// Per-request author, if the caller supplied one.
        author: Option<AuthorIdentity>,
    },
    /// Commit raw bytes; never prepends.
    CommitBinary {
        /// Path within the repository.
        filename: String,
        /// Raw file contents.
        bytes: Vec<u8>,
        /// Commit message.
        message: String,
    },
    /// Create a new issue.
    CreateIssue {
        /// Issue title.
        title: String,
        /// Issue body.
        body: String,
    },
    /// Batch-fetch statuses for several issues.
    SyncStatuses {
        /// Issue numbers to fetch.
        numbers: Vec<u64>,
    },
    /// Add a comment to an existing issue.
    AddComment {
        /// Issue number.
        number: u64,
        /// Comment body.
        text: String,
    },
    /// Close an existing issue.
    CloseIssue {
        /// Issue number.
        number: u64,
    },
    /// Upload a binary asset via the release mechanism.
    UploadAsset {
        /// Asset filename.
        filename: String,
        /// Raw asset bytes.
        bytes: Vec<u8>,
    },
}

impl MutationOp {
    /// The filenames this operation needs exclusive locks on before it may
    /// run, in no particular order (the lock manager sorts them). Empty for
    /// operations that don't touch file content (issues, assets).
    pub fn lock_filenames(&self) -> Vec<String> {
        match self {
            MutationOp::CommitFile { filename, .. } | MutationOp::ReplaceFile { filename, .. } => {
                vec![filename.clone()]
            }
            MutationOp::ReplaceMany { files, .. } => files.keys().cloned().collect(),
            MutationOp::CommitBinary { filename, .. } => vec![filename.clone()],
            MutationOp::CreateIssue { .. }
            | MutationOp::SyncStatuses { .. }
            | MutationOp::AddComment { .. }
            | MutationOp::CloseIssue { .. }
            | MutationOp::UploadAsset { .. } => Vec::new(),
        }
    }
}

/// A fully addressed unit of work: which repo, at which tier, doing what.
/// This is the payload type carried by both the message and callback
/// queues — the two fleets are distinguished only by which ingress queue
/// routed the event, not by payload shape.
#[derive(Debug, Clone)]
pub struct GitMutation {
    /// Clone/API URL identifying the target repository.
    pub repo_url: String,
    /// Billing tier, governing size ceilings and rate-limit multipliers.
    pub tier: u8,
    /// The operation to run once lock(s) are held.
    pub op: MutationOp,
}
