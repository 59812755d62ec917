//! Working-tree directory naming: `notes-repo-<slug>-<hash8>`.

use sha2::{Digest, Sha256};

/// Derive the working-tree directory name for a repo URL. `slug` is the
/// lowercased, `[a-z0-9-]`-only rendering of `owner-repo`; `hash8` is the
/// first 8 hex characters of the SHA-256 of the full URL, disambiguating
/// repos whose owner/name collide after slugification.
pub fn working_dir_name(repo_url: &str) -> String {
    let slug = slugify(repo_url);
    let hash8 = &content_hash(repo_url.as_bytes())[..8];
    format!("notes-repo-{slug}-{hash8}")
}

fn slugify(repo_url: &str) -> String {
    let (owner, repo) = msg2git_filelock::parse_owner_repo(repo_url)
        .unwrap_or_else(|| ("repo".to_string(), repo_url.to_string()));
    let raw = format!("{owner}-{repo}");
    let mut slug: String = raw
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
        .collect();
    while slug.contains("--") {
        slug = slug.replace("--", "-");
    }
    slug.trim_matches('-').to_string()
}

fn content_hash(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_url_produces_same_name() {
        assert_eq!(
            working_dir_name("https://github.com/alice/notes"),
            working_dir_name("https://github.com/alice/notes")
        );
    }

    #[test]
    fn different_urls_produce_different_names() {
        assert_ne!(
            working_dir_name("https://github.com/alice/notes"),
            working_dir_name("https://github.com/bob/notes")
        );
    }

    #[test]
    fn name_contains_readable_slug() {
        let name = working_dir_name("https://github.com/alice/notes");
        assert!(name.starts_with("notes-repo-alice-notes-"));
    }
}
