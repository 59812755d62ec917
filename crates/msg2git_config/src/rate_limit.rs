//! Rate limiter configuration: per-class quotas and premium multipliers.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A named rate-limit bucket. Matches `spec.md`'s `RateWindow` key space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitClass {
    /// Chat-level commands issued directly by a user.
    Command,
    /// REST calls made by the API provider.
    GithubRest,
    /// GraphQL calls made by the API provider (issue sync).
    GithubGraphql,
    /// Process-wide aggregate, used for `global_load()`.
    Global,
}

impl LimitClass {
    /// All known classes, in a stable order.
    pub const ALL: [LimitClass; 4] = [
        LimitClass::Command,
        LimitClass::GithubRest,
        LimitClass::GithubGraphql,
        LimitClass::Global,
    ];

    /// The config-file key for this class.
    pub fn as_str(&self) -> &'static str {
        match self {
            LimitClass::Command => "command",
            LimitClass::GithubRest => "github_rest",
            LimitClass::GithubGraphql => "github_graphql",
            LimitClass::Global => "global",
        }
    }
}

/// `(requests, window)` for one class.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ClassQuota {
    /// Base request budget before tier multipliers.
    pub requests: u32,
    /// Window length in seconds. A timestamp older than `now - window_secs`
    /// is purged.
    pub window_secs: u64,
}

/// One row of the premium-multiplier table. Expressed as an array of
/// tables in TOML rather than an integer-keyed map, since TOML table keys
/// are strings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TierMultiplier {
    /// Premium tier; 0 = free.
    pub tier: u8,
    /// Multiplier applied to every class's base `requests` for this tier.
    pub multiplier: f64,
}

/// Rate limiter settings: quotas per class, plus tier multipliers.
///
/// A class missing from `classes`, or present with `requests == 0`, is
/// treated by the limiter as "unknown class" — fail closed per
/// `spec.md` §4.A.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitSettings {
    /// Per-class `(requests, window)` quotas.
    pub classes: HashMap<String, ClassQuota>,
    /// Tier (0 = free) to multiplier. Unknown tier defaults to 1.0.
    #[serde(default, rename = "premium_multiplier")]
    pub premium_multipliers: Vec<TierMultiplier>,
    /// Saturation constant for `global_load()`: requests/minute that counts
    /// as fully loaded (clipped to 1.0 above this).
    pub global_saturation: u64,
    /// How often the background janitor sweeps expired windows.
    pub janitor_interval_secs: u64,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        let mut classes = HashMap::new();
        classes.insert(
            LimitClass::Command.as_str().to_string(),
            ClassQuota {
                requests: 30,
                window_secs: 60,
            },
        );
        classes.insert(
            LimitClass::GithubRest.as_str().to_string(),
            ClassQuota {
                requests: 500,
                window_secs: 3600,
            },
        );
        classes.insert(
            LimitClass::GithubGraphql.as_str().to_string(),
            ClassQuota {
                requests: 100,
                window_secs: 3600,
            },
        );
        classes.insert(
            LimitClass::Global.as_str().to_string(),
            ClassQuota {
                requests: 1000,
                window_secs: 60,
            },
        );

        let premium_multipliers = vec![
            TierMultiplier { tier: 0, multiplier: 1.0 },
            TierMultiplier { tier: 1, multiplier: 2.0 },
            TierMultiplier { tier: 2, multiplier: 4.0 },
            TierMultiplier { tier: 3, multiplier: 8.0 },
        ];

        Self {
            classes,
            premium_multipliers,
            global_saturation: 10_000,
            janitor_interval_secs: 300,
        }
    }
}

impl RateLimitSettings {
    /// Effective multiplier for a tier; unknown tiers default to 1.0, the
    /// safe, non-privileging choice.
    pub fn multiplier(&self, tier: u8) -> f64 {
        self.premium_multipliers
            .iter()
            .find(|row| row.tier == tier)
            .map(|row| row.multiplier)
            .unwrap_or(1.0)
    }

    /// The configured quota for a class, if any is defined and non-zero.
    pub fn quota(&self, class: LimitClass) -> Option<ClassQuota> {
        self.classes
            .get(class.as_str())
            .copied()
            .filter(|q| q.requests > 0)
    }
}
