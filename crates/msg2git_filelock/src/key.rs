//! Canonical key derivation for a `(repo, path)` pair.

/// Canonicalize `repo_url` + `filename` into the lock table key.
///
/// Parses `repo_url` into `owner/repo` (handling `https://host/owner/repo`,
/// `https://host/owner/repo.git`, and bare `owner/repo` forms) and returns
/// `"<owner>/<repo>:<filename>"`. If parsing fails, falls back to
/// `"<repo_url>:<filename>"` verbatim — deterministically, so concurrent
/// callers for the same unparsable URL still share one lock.
pub fn canonicalize(repo_url: &str, filename: &str) -> String {
    match parse_owner_repo(repo_url) {
        Some((owner, repo)) => format!("{owner}/{repo}:{filename}"),
        None => format!("{repo_url}:{filename}"),
    }
}

/// Best-effort `owner/repo` extraction from a GitHub repo URL.
pub fn parse_owner_repo(repo_url: &str) -> Option<(String, String)> {
    let trimmed = repo_url.trim().trim_end_matches('/');
    // Only a scheme implies a host segment to strip; a bare "owner/repo"
    // has no host and must keep both of its segments.
    let path = match trimmed.split_once("://") {
        Some((_, rest)) => rest.split_once('/').map(|(_, rest)| rest)?,
        None => trimmed,
    };
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if segments.len() < 2 {
        return None;
    }
    let owner = segments[segments.len() - 2];
    let repo = segments[segments.len() - 1].trim_end_matches(".git");
    if owner.is_empty() || repo.is_empty() {
        return None;
    }
    Some((owner.to_string(), repo.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_https_url() {
        assert_eq!(
            parse_owner_repo("https://github.com/alice/notes"),
            Some(("alice".to_string(), "notes".to_string()))
        );
    }

    #[test]
    fn parses_https_url_with_git_suffix() {
        assert_eq!(
            parse_owner_repo("https://github.com/alice/notes.git"),
            Some(("alice".to_string(), "notes".to_string()))
        );
    }

    #[test]
    fn parses_bare_owner_repo() {
        assert_eq!(
            parse_owner_repo("alice/notes"),
            Some(("alice".to_string(), "notes".to_string()))
        );
    }

    #[test]
    fn falls_back_deterministically_on_unparsable_url() {
        let a = canonicalize("not-a-url-at-all", "f.md");
        let b = canonicalize("not-a-url-at-all", "f.md");
        assert_eq!(a, b);
        assert_eq!(a, "not-a-url-at-all:f.md");
    }

    #[test]
    fn canonical_key_shape() {
        assert_eq!(
            canonicalize("https://github.com/alice/notes", "daily/today.md"),
            "alice/notes:daily/today.md"
        );
    }
}
