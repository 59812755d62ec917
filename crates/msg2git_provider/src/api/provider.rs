//! The HTTP-API provider: no working tree, every operation is one or more
//! authenticated calls to `api.github.com`.

use crate::api::client::ApiClient;
use crate::api::release_mutex::ReleaseMutexTable;
use crate::api::{assets, contents, issues};
use crate::traits::{AssetOps, FileOps, IssueOps, Repository};
use crate::types::{AuthorIdentity, IssueStatus, IssueStatusMap, ProviderConfig, RepoInfo, SizeInfo};
use async_trait::async_trait;
use msg2git_config::ProviderSettings;
use msg2git_error::{ProviderError, ProviderErrorKind};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock as StdRwLock};

/// GitHub's Contents/Issues/GraphQL API, fronting one user's repository.
pub struct ApiProvider {
    client: ApiClient,
    settings: Arc<ProviderSettings>,
    default_author: AuthorIdentity,
    releases: ReleaseMutexTable,
    /// Synchronously readable mirror of the last-resolved default branch,
    /// since `info()`/`file_url()` are sync trait methods but the branch
    /// itself comes from the (cached) async `repo_info` call.
    default_branch_cache: StdRwLock<Option<String>>,
}

impl ApiProvider {
    /// Build a provider for `config`, sharing `releases` (a process-wide
    /// table) and `settings` across every provider instance.
    pub fn new(config: &ProviderConfig, settings: Arc<ProviderSettings>, releases: ReleaseMutexTable) -> Result<Self, ProviderError> {
        let (owner, repo) = msg2git_filelock::parse_owner_repo(&config.repo_url).ok_or_else(|| {
            ProviderError::new(ProviderErrorKind::Unexpected(msg2git_error::HttpError::new(format!(
                "cannot parse owner/repo from {}",
                config.repo_url
            ))))
        })?;
        Ok(Self {
            client: ApiClient::new(
                owner,
                repo,
                config.credentials.token.clone(),
                settings.api_hourly_budget,
                settings.api_hourly_soft_stop,
                settings.repo_info_cache_secs,
            ),
            default_author: config.author_identity.clone(),
            settings,
            releases,
            default_branch_cache: StdRwLock::new(None),
        })
    }

    async fn default_branch(&self) -> Result<String, ProviderError> {
        let info = self.client.repo_info().await?;
        let branch = info["default_branch"].as_str().unwrap_or("main").to_string();
        *self.default_branch_cache.write().unwrap() = Some(branch.clone());
        Ok(branch)
    }

    /// Best-effort branch for sync callers (`info`/`file_url`): whatever
    /// the last `repo_info` fetch resolved, or `"main"` if none has
    /// happened yet in this provider's lifetime.
    fn cached_default_branch(&self) -> String {
        self.default_branch_cache.read().unwrap().clone().unwrap_or_else(|| "main".to_string())
    }

    fn author_or_default<'a>(&'a self, author: Option<&'a AuthorIdentity>) -> &'a AuthorIdentity {
        author.unwrap_or(&self.default_author)
    }
}

#[async_trait]
impl Repository for ApiProvider {
    async fn ensure(&self, tier: u8) -> Result<(), ProviderError> {
        let info = self.client.repo_info().await?;
        let size_kb = info["size"].as_u64().unwrap_or(0);
        let limit_kb = self.settings.size_limit_kb(tier);
        if let Some(branch) = info["default_branch"].as_str() {
            *self.default_branch_cache.write().unwrap() = Some(branch.to_string());
        }
        if size_kb > limit_kb {
            return Err(ProviderError::new(ProviderErrorKind::SizeLimitExceeded { size_kb, limit_kb }));
        }
        Ok(())
    }

    fn needs_clone(&self) -> bool {
        false
    }

    fn info(&self) -> RepoInfo {
        RepoInfo {
            owner: self.client.owner.clone(),
            repo: self.client.repo.clone(),
            default_branch: self.cached_default_branch(),
        }
    }

    async fn size_bytes(&self) -> Result<u64, ProviderError> {
        let info = self.client.repo_info().await?;
        Ok(info["size"].as_u64().unwrap_or(0) * 1024)
    }

    fn max_size(&self, tier: u8) -> u64 {
        self.settings.size_limit_kb(tier) * 1024
    }

    async fn size_info(&self, tier: u8) -> Result<SizeInfo, ProviderError> {
        Ok(SizeInfo { used_bytes: self.size_bytes().await?, max_bytes: self.max_size(tier) })
    }

    async fn near_capacity(&self, tier: u8) -> Result<(bool, f64), ProviderError> {
        let info = self.size_info(tier).await?;
        let percent = info.percent();
        Ok((percent >= self.settings.api_near_capacity_fraction, percent))
    }

    fn file_url(&self, filename: &str) -> String {
        format!(
            "https://github.com/{}/{}/blob/{}/{filename}",
            self.client.owner,
            self.client.repo,
            self.cached_default_branch()
        )
    }
}

#[async_trait]
impl FileOps for ApiProvider {
    async fn commit_file(
        &self,
        filename: &str,
        content: &str,
        message: &str,
        author: Option<&AuthorIdentity>,
        _tier: u8,
    ) -> Result<(), ProviderError> {
        let branch = self.default_branch().await?;
        contents::prepend(&self.client, filename, content, message, self.author_or_default(author), &branch).await
    }

    async fn replace_file(
        &self,
        filename: &str,
        content: &str,
        message: &str,
        author: Option<&AuthorIdentity>,
        _tier: u8,
    ) -> Result<(), ProviderError> {
        let branch = self.default_branch().await?;
        contents::replace(&self.client, filename, content, message, self.author_or_default(author), &branch).await
    }

    async fn replace_many(
        &self,
        files: &BTreeMap<String, String>,
        message: &str,
        author: Option<&AuthorIdentity>,
        _tier: u8,
    ) -> Result<(), ProviderError> {
        let branch = self.default_branch().await?;
        contents::replace_many(&self.client, files, message, self.author_or_default(author), &branch).await
    }

    async fn commit_binary(&self, filename: &str, bytes: &[u8], message: &str) -> Result<(), ProviderError> {
        let branch = self.default_branch().await?;
        contents::commit_binary(&self.client, filename, bytes, message, &self.default_author, &branch).await
    }

    async fn read_file(&self, filename: &str) -> Result<Option<String>, ProviderError> {
        contents::read_text(&self.client, filename).await
    }
}

#[async_trait]
impl IssueOps for ApiProvider {
    async fn create(&self, title: &str, body: &str) -> Result<(String, u64), ProviderError> {
        issues::create(&self.client, title, body).await
    }

    async fn get_status(&self, number: u64) -> Result<IssueStatus, ProviderError> {
        issues::get_status(&self.client, number).await
    }

    async fn sync_statuses(&self, numbers: &[u64]) -> Result<IssueStatusMap, ProviderError> {
        issues::sync_statuses(&self.client, numbers).await
    }

    async fn add_comment(&self, number: u64, text: &str) -> Result<String, ProviderError> {
        issues::add_comment(&self.client, number, text).await
    }

    async fn close(&self, number: u64) -> Result<(), ProviderError> {
        issues::close(&self.client, number).await
    }
}

#[async_trait]
impl AssetOps for ApiProvider {
    async fn upload(&self, filename: &str, bytes: &[u8]) -> Result<String, ProviderError> {
        assets::upload(&self.client, &self.releases, self.settings.max_assets_per_release, filename, bytes).await
    }
}
