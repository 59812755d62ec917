//! Aggregate settings and layered loading.

use crate::{ProviderSettings, RateLimitSettings, WorkerPoolSettings};
use config::{Config, File, FileFormat};
use msg2git_error::{ConfigError, Msg2GitResult};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

const BUNDLED_DEFAULT: &str = include_str!("../../../msg2git.toml");

/// Top-level settings for the concurrency core, loaded once at process
/// start and shared (behind an `Arc`) by every component.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Rate limiter quotas and multipliers.
    #[serde(default)]
    pub rate_limit: RateLimitSettings,
    /// Worker pool fleet sizes and queue capacities.
    #[serde(default)]
    pub worker_pool: WorkerPoolSettings,
    /// GitHub provider sizing and timing constants.
    #[serde(default)]
    pub provider: ProviderSettings,
}

impl Settings {
    /// Load settings with three-tier precedence: the bundled default, then
    /// an optional file in the user's config directory
    /// (`$XDG_CONFIG_HOME/msg2git/config.toml`), then an optional
    /// `./msg2git.toml` in the current directory. Later sources override
    /// earlier ones field-by-field.
    #[instrument]
    pub fn load() -> Msg2GitResult<Self> {
        let mut builder =
            Config::builder().add_source(File::from_str(BUNDLED_DEFAULT, FileFormat::Toml));

        if let Some(config_dir) = dirs::config_dir() {
            let user_path = config_dir.join("msg2git").join("config.toml");
            debug!(path = %user_path.display(), "checking for user config override");
            builder = builder.add_source(File::from(user_path).required(false));
        }

        builder = builder.add_source(File::with_name("msg2git").required(false));

        let config = builder
            .build()
            .map_err(|e| ConfigError::new(format!("failed to build config: {e}")))?;

        config
            .try_deserialize()
            .map_err(|e| ConfigError::new(format!("failed to deserialize config: {e}")).into())
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            rate_limit: RateLimitSettings::default(),
            worker_pool: WorkerPoolSettings::default(),
            provider: ProviderSettings::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_default_parses() {
        let settings: Settings = toml_from_bundled();
        assert!(settings.rate_limit.classes.contains_key("command"));
        assert_eq!(settings.worker_pool.message_workers, 35);
    }

    fn toml_from_bundled() -> Settings {
        let config = Config::builder()
            .add_source(File::from_str(BUNDLED_DEFAULT, FileFormat::Toml))
            .build()
            .expect("bundled default must parse");
        config.try_deserialize().expect("bundled default must deserialize")
    }
}
