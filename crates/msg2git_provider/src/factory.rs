//! Provider selection: a factory builds the backend `config.kind` names,
//! never inferred by callers (`ProviderKind` doc comment in
//! `msg2git_config`).

use crate::api::{ApiProvider, ReleaseMutexTable};
use crate::clone::CloneProvider;
use crate::traits::Provider;
use crate::types::ProviderConfig;
use msg2git_config::{ProviderKind, ProviderSettings};
use msg2git_error::ProviderError;
use std::sync::Arc;

/// Build the provider backend named by `kind`, sharing `releases` (the
/// release-mutex table) and `settings` across every provider the caller
/// constructs.
pub fn build_provider(
    kind: ProviderKind,
    config: &ProviderConfig,
    settings: Arc<ProviderSettings>,
    releases: ReleaseMutexTable,
) -> Result<Arc<dyn Provider>, ProviderError> {
    match kind {
        ProviderKind::Api => Ok(Arc::new(ApiProvider::new(config, settings, releases)?)),
        ProviderKind::Clone => Ok(Arc::new(CloneProvider::new(config, settings, releases)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AuthorIdentity, Credentials};
    use std::time::Duration;

    fn config() -> ProviderConfig {
        ProviderConfig {
            repo_url: "https://github.com/octocat/hello-world".to_string(),
            credentials: Credentials { username: "octocat".to_string(), token: "tok".to_string() },
            author_identity: AuthorIdentity::bot_default(),
            tier: 0,
        }
    }

    #[test]
    fn builds_api_and_clone_backends() {
        let settings = Arc::new(ProviderSettings::default());
        let releases = ReleaseMutexTable::new(Duration::from_secs(600));
        assert!(build_provider(ProviderKind::Api, &config(), settings.clone(), releases.clone()).is_ok());
        assert!(build_provider(ProviderKind::Clone, &config(), settings, releases).is_ok());
    }
}
