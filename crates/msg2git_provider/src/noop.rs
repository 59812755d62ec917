//! No-op provider for tests that exercise the handler pipeline without
//! touching the network or a filesystem.

use crate::traits::{AssetOps, FileOps, IssueOps, Repository};
use crate::types::{AuthorIdentity, IssueStatus, IssueStatusMap, RepoInfo, SizeInfo};
use async_trait::async_trait;
use msg2git_error::ProviderError;
use std::collections::BTreeMap;
use tokio::sync::RwLock;
use tracing::debug;

/// Provider implementation that records calls in memory and never touches
/// the network or disk. Used by the handler pipeline's own test suite.
#[derive(Default)]
pub struct NoopProvider {
    files: RwLock<BTreeMap<String, String>>,
    next_issue: RwLock<u64>,
}

impl NoopProvider {
    /// Build an empty provider.
    pub fn new() -> Self {
        Self { files: RwLock::new(BTreeMap::new()), next_issue: RwLock::new(1) }
    }
}

#[async_trait]
impl Repository for NoopProvider {
    async fn ensure(&self, _tier: u8) -> Result<(), ProviderError> {
        debug!("NoopProvider: ensure() called (no action taken)");
        Ok(())
    }

    fn needs_clone(&self) -> bool {
        false
    }

    fn info(&self) -> RepoInfo {
        RepoInfo { owner: "noop".to_string(), repo: "noop".to_string(), default_branch: "main".to_string() }
    }

    async fn size_bytes(&self) -> Result<u64, ProviderError> {
        Ok(0)
    }

    fn max_size(&self, _tier: u8) -> u64 {
        u64::MAX
    }

    async fn size_info(&self, tier: u8) -> Result<SizeInfo, ProviderError> {
        Ok(SizeInfo { used_bytes: 0, max_bytes: self.max_size(tier) })
    }

    async fn near_capacity(&self, _tier: u8) -> Result<(bool, f64), ProviderError> {
        Ok((false, 0.0))
    }

    fn file_url(&self, filename: &str) -> String {
        format!("https://example.invalid/noop/noop/blob/main/{filename}")
    }
}

#[async_trait]
impl FileOps for NoopProvider {
    async fn commit_file(
        &self,
        filename: &str,
        content: &str,
        _message: &str,
        _author: Option<&AuthorIdentity>,
        _tier: u8,
    ) -> Result<(), ProviderError> {
        let mut files = self.files.write().await;
        let new_value = match files.get(filename) {
            Some(existing) => format!("{content}\n{existing}"),
            None => content.to_string(),
        };
        files.insert(filename.to_string(), new_value);
        Ok(())
    }

    async fn replace_file(
        &self,
        filename: &str,
        content: &str,
        _message: &str,
        _author: Option<&AuthorIdentity>,
        _tier: u8,
    ) -> Result<(), ProviderError> {
        self.files.write().await.insert(filename.to_string(), content.to_string());
        Ok(())
    }

    async fn replace_many(
        &self,
        files: &BTreeMap<String, String>,
        _message: &str,
        _author: Option<&AuthorIdentity>,
        _tier: u8,
    ) -> Result<(), ProviderError> {
        let mut table = self.files.write().await;
        for (filename, content) in files {
            table.insert(filename.clone(), content.clone());
        }
        Ok(())
    }

    async fn commit_binary(&self, filename: &str, bytes: &[u8], _message: &str) -> Result<(), ProviderError> {
        self.files.write().await.insert(filename.to_string(), String::from_utf8_lossy(bytes).to_string());
        Ok(())
    }

    async fn read_file(&self, filename: &str) -> Result<Option<String>, ProviderError> {
        Ok(self.files.read().await.get(filename).cloned())
    }
}

#[async_trait]
impl IssueOps for NoopProvider {
    async fn create(&self, _title: &str, _body: &str) -> Result<(String, u64), ProviderError> {
        let mut next = self.next_issue.write().await;
        let number = *next;
        *next += 1;
        Ok((format!("https://example.invalid/noop/noop/issues/{number}"), number))
    }

    async fn get_status(&self, number: u64) -> Result<IssueStatus, ProviderError> {
        Ok(IssueStatus {
            number,
            title: String::new(),
            state: "open".to_string(),
            url: format!("https://example.invalid/noop/noop/issues/{number}"),
        })
    }

    async fn sync_statuses(&self, numbers: &[u64]) -> Result<IssueStatusMap, ProviderError> {
        let mut out = IssueStatusMap::new();
        for number in numbers {
            out.insert(*number, self.get_status(*number).await?);
        }
        Ok(out)
    }

    async fn add_comment(&self, number: u64, _text: &str) -> Result<String, ProviderError> {
        Ok(format!("https://example.invalid/noop/noop/issues/{number}#comment"))
    }

    async fn close(&self, _number: u64) -> Result<(), ProviderError> {
        Ok(())
    }
}

#[async_trait]
impl AssetOps for NoopProvider {
    async fn upload(&self, filename: &str, _bytes: &[u8]) -> Result<String, ProviderError> {
        Ok(format!("https://example.invalid/noop/noop/releases/assets/{filename}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn prepend_then_read_matches_s6() {
        let provider = NoopProvider::new();
        provider.commit_file("n.md", "OLD", "msg", None, 0).await.unwrap();
        provider.commit_file("n.md", "NEW", "msg", None, 0).await.unwrap();
        assert_eq!(provider.read_file("n.md").await.unwrap().as_deref(), Some("NEW\nOLD"));
    }
}
