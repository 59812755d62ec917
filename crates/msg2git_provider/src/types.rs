//! Shared value types passed across the provider boundary.

use std::collections::HashMap;

/// `owner/repo` plus the branch operations target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoInfo {
    /// Repository owner (user or org).
    pub owner: String,
    /// Repository name.
    pub repo: String,
    /// Branch all operations read from and write to.
    pub default_branch: String,
}

/// Per-request commit author, parsed from the `"Name <email>"` form used
/// throughout the external interface. Falls back to a bot identity when a
/// caller doesn't supply one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorIdentity {
    /// Display name.
    pub name: String,
    /// Commit email.
    pub email: String,
}

impl AuthorIdentity {
    /// The identity used when no per-user author is configured.
    pub fn bot_default() -> Self {
        Self {
            name: "Msg2Git Bot".to_string(),
            email: "bot@msg2git.com".to_string(),
        }
    }

    /// Parse `"Name <email>"`. Falls back to [`Self::bot_default`] on any
    /// shape mismatch rather than failing the calling operation.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if let Some(open) = raw.find('<') {
            if let Some(close) = raw.rfind('>') {
                if close > open {
                    let name = raw[..open].trim().trim_matches('"').to_string();
                    let email = raw[open + 1..close].trim().to_string();
                    if !name.is_empty() && !email.is_empty() {
                        return Self { name, email };
                    }
                }
            }
        }
        Self::bot_default()
    }

    /// Render back to `"Name <email>"`, e.g. for commit trailers.
    pub fn display(&self) -> String {
        format!("{} <{}>", self.name, self.email)
    }
}

/// Credentials for one user's linked repository. Treated as an opaque
/// secret by everything above the provider layer.
#[derive(Clone)]
pub struct Credentials {
    /// GitHub username (used for basic-auth pushes by the clone provider).
    pub username: String,
    /// Personal access token.
    pub token: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Everything needed to stand up a provider for one user's repository.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Clone/API URL for the repository (`https://github.com/{owner}/{repo}`).
    pub repo_url: String,
    /// The user's GitHub credentials.
    pub credentials: Credentials,
    /// Default commit author when the caller doesn't supply one.
    pub author_identity: AuthorIdentity,
    /// Billing tier, governing size ceilings.
    pub tier: u8,
}

/// `used / max` as both a byte count and a percentage, shared by both
/// providers' `size_info`/`near_capacity`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizeInfo {
    /// Bytes currently used.
    pub used_bytes: u64,
    /// Byte ceiling for the caller's tier.
    pub max_bytes: u64,
}

impl SizeInfo {
    /// `used / max`, clamped to `[0.0, 1.0]` when `max` is zero-safe.
    pub fn percent(&self) -> f64 {
        if self.max_bytes == 0 {
            return 1.0;
        }
        (self.used_bytes as f64 / self.max_bytes as f64).min(1.0)
    }
}

/// Status of a tracked GitHub issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueStatus {
    /// Issue number.
    pub number: u64,
    /// Issue title.
    pub title: String,
    /// `"open"` or `"closed"`.
    pub state: String,
    /// Web URL.
    pub url: String,
}

/// `number -> status` map produced by a batched sync.
pub type IssueStatusMap = HashMap<u64, IssueStatus>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_author() {
        let a = AuthorIdentity::parse("Jane Doe <jane@example.com>");
        assert_eq!(a.name, "Jane Doe");
        assert_eq!(a.email, "jane@example.com");
    }

    #[test]
    fn falls_back_on_malformed_author() {
        let a = AuthorIdentity::parse("not an author string");
        assert_eq!(a, AuthorIdentity::bot_default());
    }

    #[test]
    fn falls_back_on_empty_angle_brackets() {
        let a = AuthorIdentity::parse("Name <>");
        assert_eq!(a, AuthorIdentity::bot_default());
    }

    #[test]
    fn size_info_percent_handles_zero_max() {
        let s = SizeInfo { used_bytes: 10, max_bytes: 0 };
        assert_eq!(s.percent(), 1.0);
    }
}
