//! File reads/writes via the GitHub Contents API.

use crate::api::client::ApiClient;
use crate::types::AuthorIdentity;
use base64::Engine;
use msg2git_error::{ProviderError, ProviderErrorKind};
use serde_json::json;
use std::collections::BTreeMap;

fn encode(content: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(content)
}

fn decode(content_b64: &str) -> Result<Vec<u8>, ProviderError> {
    // GitHub returns base64 content split across newlines.
    let stripped: String = content_b64.chars().filter(|c| !c.is_whitespace()).collect();
    base64::engine::general_purpose::STANDARD
        .decode(stripped)
        .map_err(|e| ProviderError::new(ProviderErrorKind::Unexpected(msg2git_error::HttpError::new(e.to_string()))))
}

/// Current content and blob SHA for `path`, or `None` if it doesn't exist.
pub async fn get_file(client: &ApiClient, path: &str) -> Result<Option<(Vec<u8>, String)>, ProviderError> {
    match client.get(&format!("/contents/{path}")).await {
        Ok(value) => {
            let content = value["content"].as_str().unwrap_or_default();
            let sha = value["sha"].as_str().unwrap_or_default().to_string();
            Ok(Some((decode(content)?, sha)))
        }
        Err(e) if matches!(e.kind, ProviderErrorKind::NotFound) => Ok(None),
        Err(e) => Err(e),
    }
}

/// `PUT /contents/{path}` with the given bytes, updating `path` if `sha` is
/// `Some` (an existing file) or creating it otherwise.
pub async fn put_file(
    client: &ApiClient,
    path: &str,
    content: &[u8],
    message: &str,
    author: &AuthorIdentity,
    default_branch: &str,
    sha: Option<&str>,
) -> Result<(), ProviderError> {
    let mut body = json!({
        "message": message,
        "content": encode(content),
        "branch": default_branch,
        "author": { "name": author.name, "email": author.email },
        "committer": { "name": author.name, "email": author.email },
    });
    if let Some(sha) = sha {
        body["sha"] = json!(sha);
    }
    client.put(&format!("/contents/{path}"), &body).await?;
    client.invalidate_repo_info().await;
    Ok(())
}

/// Prepend `new_content` to `path` (creating it if absent).
pub async fn prepend(
    client: &ApiClient,
    path: &str,
    new_content: &str,
    message: &str,
    author: &AuthorIdentity,
    default_branch: &str,
) -> Result<(), ProviderError> {
    let existing = get_file(client, path).await?;
    let (content, sha) = match existing {
        Some((bytes, sha)) => {
            let existing_text = String::from_utf8_lossy(&bytes).to_string();
            (format!("{new_content}\n{existing_text}"), Some(sha))
        }
        None => (new_content.to_string(), None),
    };
    put_file(client, path, content.as_bytes(), message, author, default_branch, sha.as_deref()).await
}

/// Overwrite `path` with `new_content` (creating it if absent).
pub async fn replace(
    client: &ApiClient,
    path: &str,
    new_content: &str,
    message: &str,
    author: &AuthorIdentity,
    default_branch: &str,
) -> Result<(), ProviderError> {
    let sha = get_file(client, path).await?.map(|(_, sha)| sha);
    put_file(client, path, new_content.as_bytes(), message, author, default_branch, sha.as_deref()).await
}

/// Overwrite several files with sequential PUTs under one commit message.
/// Each file is individually linearized against any other operation
/// touching it by the caller's file locks; true atomic multi-file commits
/// via the Git Data API are out of scope.
pub async fn replace_many(
    client: &ApiClient,
    files: &BTreeMap<String, String>,
    message: &str,
    author: &AuthorIdentity,
    default_branch: &str,
) -> Result<(), ProviderError> {
    for (path, content) in files {
        replace(client, path, content, message, author, default_branch).await?;
    }
    Ok(())
}

/// Commit raw bytes, overwriting whatever was at `path`. Never prepends.
pub async fn commit_binary(
    client: &ApiClient,
    path: &str,
    bytes: &[u8],
    message: &str,
    author: &AuthorIdentity,
    default_branch: &str,
) -> Result<(), ProviderError> {
    let sha = get_file(client, path).await?.map(|(_, sha)| sha);
    put_file(client, path, bytes, message, author, default_branch, sha.as_deref()).await
}

/// Read `path`'s content as text, or `None` if it doesn't exist.
pub async fn read_text(client: &ApiClient, path: &str) -> Result<Option<String>, ProviderError> {
    Ok(get_file(client, path).await?.map(|(bytes, _)| String::from_utf8_lossy(&bytes).to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_base64() {
        let content = b"hello world";
        let encoded = encode(content);
        let decoded = decode(&encoded).unwrap();
        assert_eq!(decoded, content);
    }

    #[test]
    fn decode_tolerates_embedded_newlines() {
        let encoded = "aGVs\nbG8=";
        assert_eq!(decode(encoded).unwrap(), b"hello");
    }
}
