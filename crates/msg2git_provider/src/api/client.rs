//! Low-level authenticated GitHub REST/GraphQL client, shared by the API
//! provider (for every operation) and the clone provider (for issues and
//! release assets, which git itself has no concept of).

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter as GovernorRateLimiter};
use msg2git_error::{ProviderError, ProviderErrorKind};
use serde_json::Value;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, instrument};

const BASE_URL: &str = "https://api.github.com";
const UPLOADS_BASE_URL: &str = "https://uploads.github.com";
const API_VERSION: &str = "2022-11-28";

/// Client-side GCRA limiter, one per [`ApiClient`]. Sized to the tighter of
/// `hourly_budget`/`hourly_soft_stop` so a misbehaving user's worker backs
/// off before GitHub's own secondary rate limit ever fires.
type HourlyBudget = GovernorRateLimiter<NotKeyed, InMemoryState, DefaultClock>;

fn hourly_budget_limiter(hourly_budget: u32, hourly_soft_stop: u32) -> HourlyBudget {
    let effective = hourly_budget.min(hourly_soft_stop).max(1);
    let per_request = Duration::from_secs(3600) / effective;
    let quota = Quota::with_period(per_request)
        .unwrap_or_else(|| Quota::with_period(Duration::from_secs(3600)).expect("3600s is nonzero"))
        .allow_burst(NonZeroU32::new(effective).expect("effective is clamped to >= 1"));
    GovernorRateLimiter::direct(quota)
}

struct RepoInfoCache {
    fetched_at: Instant,
    value: Value,
}

/// Authenticated client for one user's repository. Cheap to clone
/// (internally `Arc`-backed).
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    token: String,
    pub(crate) owner: String,
    pub(crate) repo: String,
    hourly_budget: u32,
    hourly_soft_stop: u32,
    budget: Arc<HourlyBudget>,
    repo_info_cache_secs: u64,
    repo_info: Arc<RwLock<Option<RepoInfoCache>>>,
}

impl ApiClient {
    /// Build a client for `owner/repo`, authenticated with `token`.
    pub fn new(owner: String, repo: String, token: String, hourly_budget: u32, hourly_soft_stop: u32, repo_info_cache_secs: u64) -> Self {
        Self {
            http: reqwest::Client::new(),
            token,
            owner,
            repo,
            hourly_budget,
            hourly_soft_stop,
            budget: Arc::new(hourly_budget_limiter(hourly_budget, hourly_soft_stop)),
            repo_info_cache_secs,
            repo_info: Arc::new(RwLock::new(None)),
        }
    }

    fn repo_path(&self, suffix: &str) -> String {
        format!("{BASE_URL}/repos/{}/{}{suffix}", self.owner, self.repo)
    }

    async fn admit(&self) -> Result<(), ProviderError> {
        self.budget.check().map_err(|_| {
            ProviderError::new(ProviderErrorKind::RateLimited(format!(
                "client-side hourly budget of {} reached",
                self.hourly_soft_stop.min(self.hourly_budget)
            )))
        })
    }

    fn classify_status(&self, status: reqwest::StatusCode, body: &str) -> ProviderError {
        let lower = body.to_ascii_lowercase();
        match status.as_u16() {
            401 | 403 if lower.contains("authorization failed") || lower.contains("authentication failed") || lower.contains("bad credentials") => {
                ProviderError::new(ProviderErrorKind::AuthFailed(body.to_string()))
            }
            403 if lower.contains("rate limit") => ProviderError::new(ProviderErrorKind::RateLimited(body.to_string())),
            404 => ProviderError::new(ProviderErrorKind::NotFound),
            _ => ProviderError::new(ProviderErrorKind::Unexpected(msg2git_error::HttpError::new(format!(
                "HTTP {status}: {body}"
            )))),
        }
    }

    /// Build and send one attempt; no retry of its own. Wrapped by
    /// [`ApiClient::send`] for every caller so transient failures (5xx,
    /// secondary rate limit) get the shared backoff in [`crate::retry`].
    async fn send_once(&self, method: reqwest::Method, url: &str, body: Option<&Value>) -> Result<Value, ProviderError> {
        self.admit().await?;
        let mut builder = self
            .http
            .request(method, url)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION);
        if let Some(body) = body {
            builder = builder.json(body);
        }
        let response = builder
            .send()
            .await
            .map_err(|e| ProviderError::new(ProviderErrorKind::Unexpected(msg2git_error::HttpError::new(e.to_string()))))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ProviderError::new(ProviderErrorKind::Unexpected(msg2git_error::HttpError::new(e.to_string()))))?;
        if !status.is_success() {
            return Err(self.classify_status(status, &text));
        }
        if text.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text)
            .map_err(|e| ProviderError::new(ProviderErrorKind::Unexpected(msg2git_error::HttpError::new(e.to_string()))))
    }

    /// Retries `send_once` through [`crate::retry::retry_transient`], so
    /// every caller (GET/PUT/POST/PATCH/GraphQL) gets the same transient
    /// backoff without re-wiring it at each call site.
    async fn send(&self, method: reqwest::Method, url: String, body: Option<Value>) -> Result<Value, ProviderError> {
        crate::retry::retry_transient(|| {
            let method = method.clone();
            let url = url.clone();
            let body = body.clone();
            async move { self.send_once(method, &url, body.as_ref()).await }
        })
        .await
    }

    /// `GET {path}` relative to `/repos/{owner}/{repo}`.
    #[instrument(skip(self))]
    pub async fn get(&self, path: &str) -> Result<Value, ProviderError> {
        self.send(reqwest::Method::GET, self.repo_path(path), None).await
    }

    /// `PUT {path}` with a JSON body.
    #[instrument(skip(self, body))]
    pub async fn put(&self, path: &str, body: &Value) -> Result<Value, ProviderError> {
        self.send(reqwest::Method::PUT, self.repo_path(path), Some(body.clone())).await
    }

    /// `POST {path}` with a JSON body.
    #[instrument(skip(self, body))]
    pub async fn post(&self, path: &str, body: &Value) -> Result<Value, ProviderError> {
        self.send(reqwest::Method::POST, self.repo_path(path), Some(body.clone())).await
    }

    /// `PATCH {path}` with a JSON body.
    #[instrument(skip(self, body))]
    pub async fn patch(&self, path: &str, body: &Value) -> Result<Value, ProviderError> {
        self.send(reqwest::Method::PATCH, self.repo_path(path), Some(body.clone())).await
    }

    /// `POST /graphql` with `{ "query": ... }`.
    #[instrument(skip(self))]
    pub async fn graphql(&self, query: &str) -> Result<Value, ProviderError> {
        self.send(
            reqwest::Method::POST,
            format!("{BASE_URL}/graphql"),
            Some(serde_json::json!({ "query": query })),
        )
        .await
    }

    /// `POST` raw bytes to the uploads host, used for release assets.
    /// Retries transient failures the same way [`ApiClient::send`] does;
    /// the asset-specific retry-once-on-race in `api::assets` sits above
    /// this and only fires on `NotFound`, which is not retryable here.
    #[instrument(skip(self, bytes))]
    pub async fn upload_asset(&self, release_id: u64, name: &str, bytes: Vec<u8>) -> Result<Value, ProviderError> {
        let url = format!(
            "{UPLOADS_BASE_URL}/repos/{}/{}/releases/{release_id}/assets?name={name}",
            self.owner, self.repo
        );
        crate::retry::retry_transient(|| {
            let url = url.clone();
            let bytes = bytes.clone();
            async move { self.send_asset_once(&url, bytes).await }
        })
        .await
    }

    async fn send_asset_once(&self, url: &str, bytes: Vec<u8>) -> Result<Value, ProviderError> {
        self.admit().await?;
        let response = self
            .http
            .post(url)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION)
            .header("Content-Type", "application/octet-stream")
            .body(bytes)
            .send()
            .await
            .map_err(|e| ProviderError::new(ProviderErrorKind::Unexpected(msg2git_error::HttpError::new(e.to_string()))))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ProviderError::new(ProviderErrorKind::Unexpected(msg2git_error::HttpError::new(e.to_string()))))?;
        if !status.is_success() {
            return Err(self.classify_status(status, &text));
        }
        serde_json::from_str(&text)
            .map_err(|e| ProviderError::new(ProviderErrorKind::Unexpected(msg2git_error::HttpError::new(e.to_string()))))
    }

    /// Repository metadata (`GET /repos/{o}/{r}`), cached for
    /// `repo_info_cache_secs` and invalidated by [`ApiClient::invalidate_repo_info`].
    pub async fn repo_info(&self) -> Result<Value, ProviderError> {
        if let Some(cached) = self.repo_info.read().await.as_ref() {
            if cached.fetched_at.elapsed() < Duration::from_secs(self.repo_info_cache_secs) {
                return Ok(cached.value.clone());
            }
        }
        let value = self.get("").await?;
        *self.repo_info.write().await = Some(RepoInfoCache { fetched_at: Instant::now(), value: value.clone() });
        debug!(owner = %self.owner, repo = %self.repo, "refreshed repo info cache");
        Ok(value)
    }

    /// Drop the cached repo info; called after any mutation.
    pub async fn invalidate_repo_info(&self) {
        *self.repo_info.write().await = None;
    }
}
