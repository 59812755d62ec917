//! GitHub provider configuration: which backend, size tiers, and the
//! timing constants shared by the lock manager and the asset-release
//! machinery.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Which Provider backend a factory should construct. Selected per request
/// by config, never inferred by callers (`spec.md` §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// Local-clone working-tree backend.
    Clone,
    /// HTTP-API backend.
    Api,
}

/// Settings shared by both provider backends plus the file lock manager's
/// timing constants, which are process-wide, not per-provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSettings {
    /// Base repository size ceiling in KiB for tier 0 (free). Higher tiers
    /// multiply this: ×2 (tier 1), ×4 (tier 2), ×10 (tier 3).
    pub base_size_limit_kb: u64,
    /// Near-capacity threshold for the API provider, as a fraction of the
    /// tier ceiling.
    pub api_near_capacity_fraction: f64,
    /// Near-capacity threshold for the clone provider (higher: it already
    /// holds the bytes locally).
    pub clone_near_capacity_fraction: f64,
    /// Root directory for clone-provider working trees.
    pub clone_datadir: PathBuf,
    /// Global cap on `clone_datadir` size, in bytes. Exceeding it evicts
    /// least-recently-accessed repo directories.
    pub clone_datadir_cap_bytes: u64,
    /// How long a repo-info API response is cached before re-fetching.
    pub repo_info_cache_secs: u64,
    /// GitHub's documented hourly REST budget.
    pub api_hourly_budget: u32,
    /// Stop issuing requests once this many have been made in the current
    /// hour, leaving headroom under `api_hourly_budget`.
    pub api_hourly_soft_stop: u32,
    /// Assets held per GitHub release before a new one is created.
    pub max_assets_per_release: u32,
    /// How long an `ActiveHandle` may be held before the lock janitor
    /// force-releases it.
    pub handle_ttl_secs: u64,
    /// How often the lock manager's force-release janitor runs.
    pub lock_janitor_interval_secs: u64,
    /// Idle threshold after which a refcount-zero `FileLock` is reaped.
    pub lock_idle_reap_secs: u64,
    /// Idle threshold after which a `ReleaseMutex` entry is reaped.
    pub release_mutex_idle_reap_secs: u64,
}

impl ProviderSettings {
    /// Tier size ceiling in KiB, following the ×1/×2/×4/×10 ladder. Unknown
    /// tiers fall back to the base (tier 0) ceiling.
    pub fn size_limit_kb(&self, tier: u8) -> u64 {
        let multiplier = match tier {
            0 => 1,
            1 => 2,
            2 => 4,
            3 => 10,
            _ => 1,
        };
        self.base_size_limit_kb * multiplier
    }
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            base_size_limit_kb: 1024,
            api_near_capacity_fraction: 0.80,
            clone_near_capacity_fraction: 0.97,
            clone_datadir: PathBuf::from("./data/repos"),
            clone_datadir_cap_bytes: 1024 * 1024 * 1024,
            repo_info_cache_secs: 300,
            api_hourly_budget: 5000,
            api_hourly_soft_stop: 4900,
            max_assets_per_release: 900,
            handle_ttl_secs: 300,
            lock_janitor_interval_secs: 60,
            lock_idle_reap_secs: 600,
            release_mutex_idle_reap_secs: 600,
        }
    }
}
