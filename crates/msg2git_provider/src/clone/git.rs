//! Thin async wrapper around the `git` binary, invoked as a subprocess —
//! the core never links a C git library.

use msg2git_error::{ProviderError, ProviderErrorKind};
use std::path::Path;
use tokio::process::Command;
use tracing::debug;

/// Run `git` with `args` against `repo_dir` (via `-C`, so callers don't need
/// the directory to exist yet only for `clone`). Returns stdout on success.
async fn run(repo_dir: &Path, args: &[&str]) -> Result<String, ProviderError> {
    let output = Command::new("git")
        .arg("-C")
        .arg(repo_dir)
        .args(args)
        .output()
        .await
        .map_err(|e| ProviderError::new(ProviderErrorKind::Unexpected(msg2git_error::HttpError::new(format!(
            "spawning git {args:?}: {e}"
        )))))?;

    if output.status.success() {
        return Ok(String::from_utf8_lossy(&output.stdout).trim().to_string());
    }

    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    debug!(args = ?args, stderr = %stderr, "git command failed");
    Err(classify(&stderr))
}

/// Same as [`run`], but for `clone`, which must run with the *parent*
/// directory as cwd since `repo_dir` doesn't exist yet.
async fn run_in(cwd: &Path, args: &[&str]) -> Result<String, ProviderError> {
    let output = Command::new("git")
        .current_dir(cwd)
        .args(args)
        .output()
        .await
        .map_err(|e| ProviderError::new(ProviderErrorKind::Unexpected(msg2git_error::HttpError::new(format!(
            "spawning git {args:?}: {e}"
        )))))?;

    if output.status.success() {
        return Ok(String::from_utf8_lossy(&output.stdout).trim().to_string());
    }

    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    debug!(args = ?args, stderr = %stderr, "git command failed");
    Err(classify(&stderr))
}

fn classify(stderr: &str) -> ProviderError {
    let lower = stderr.to_ascii_lowercase();
    if lower.contains("authorization failed")
        || lower.contains("authentication failed")
        || lower.contains("bad credentials")
    {
        return ProviderError::new(ProviderErrorKind::AuthFailed(stderr.to_string()));
    }
    if lower.contains("rate limit") {
        return ProviderError::new(ProviderErrorKind::RateLimited(stderr.to_string()));
    }
    if lower.contains("repository not found") || lower.contains("not found") {
        return ProviderError::new(ProviderErrorKind::NotFound);
    }
    ProviderError::new(ProviderErrorKind::Unexpected(msg2git_error::HttpError::new(stderr.to_string())))
}

/// Clone `authenticated_url` into `target_dir`'s parent, naming the new
/// directory `target_dir`'s final component.
pub async fn clone(authenticated_url: &str, target_dir: &Path) -> Result<(), ProviderError> {
    let parent = target_dir.parent().unwrap_or_else(|| Path::new("."));
    tokio::fs::create_dir_all(parent)
        .await
        .map_err(|e| ProviderError::new(ProviderErrorKind::Unexpected(msg2git_error::HttpError::new(e.to_string()))))?;
    let name = target_dir
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("repo");
    run_in(parent, &["clone", authenticated_url, name]).await?;
    Ok(())
}

/// Fetch the remote and hard-reset the current branch to it. The local
/// working copy never wins a conflict; this is deliberate so the bot can
/// run unattended without ever needing to resolve merges by hand.
pub async fn fetch_and_reset(repo_dir: &Path, branch: &str) -> Result<(), ProviderError> {
    run(repo_dir, &["fetch", "origin", branch]).await?;
    run(repo_dir, &["reset", "--hard", &format!("origin/{branch}")]).await?;
    Ok(())
}

/// Stage all changes and commit with the given author.
pub async fn commit_all(repo_dir: &Path, message: &str, author_display: &str) -> Result<(), ProviderError> {
    run(repo_dir, &["add", "-A"]).await?;
    run(
        repo_dir,
        &["commit", "--author", author_display, "-m", message, "--allow-empty"],
    )
    .await?;
    Ok(())
}

/// Push the current branch to `origin` using an already-authenticated
/// remote URL (credentials embedded by the caller).
pub async fn push(repo_dir: &Path, branch: &str) -> Result<(), ProviderError> {
    run(repo_dir, &["push", "origin", branch]).await?;
    Ok(())
}

/// The repository's current default branch, as reported by the remote
/// `HEAD` symbolic ref.
pub async fn default_branch(repo_dir: &Path) -> Result<String, ProviderError> {
    let out = run(repo_dir, &["symbolic-ref", "refs/remotes/origin/HEAD"]).await?;
    Ok(out.rsplit('/').next().unwrap_or("main").to_string())
}

/// Sum of file sizes tracked by the working tree (`.git` excluded), used
/// for the post-clone size re-check.
pub async fn tree_size_bytes(repo_dir: &Path) -> Result<u64, ProviderError> {
    let mut total = 0u64;
    let mut stack = vec![repo_dir.to_path_buf()];
    while let Some(dir) = stack.pop() {
        let mut entries = tokio::fs::read_dir(&dir)
            .await
            .map_err(|e| ProviderError::new(ProviderErrorKind::Unexpected(msg2git_error::HttpError::new(e.to_string()))))?;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| ProviderError::new(ProviderErrorKind::Unexpected(msg2git_error::HttpError::new(e.to_string()))))?
        {
            if entry.file_name() == ".git" {
                continue;
            }
            let metadata = entry
                .metadata()
                .await
                .map_err(|e| ProviderError::new(ProviderErrorKind::Unexpected(msg2git_error::HttpError::new(e.to_string()))))?;
            if metadata.is_dir() {
                stack.push(entry.path());
            } else {
                total += metadata.len();
            }
        }
    }
    Ok(total)
}
