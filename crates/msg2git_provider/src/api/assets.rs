//! Binary asset upload via GitHub releases, with per-repo serialization of
//! release discovery/creation and a single retry when upload races a
//! concurrent release deletion.

use crate::api::client::ApiClient;
use crate::api::release_mutex::ReleaseMutexTable;
use msg2git_error::{ProviderError, ProviderErrorKind};
use serde_json::json;

const TAG_PREFIX: &str = "assets";

/// Upload `bytes` as `filename` to a release dedicated to holding binary
/// assets, creating a new release once the current one holds
/// `max_assets_per_release` assets.
pub async fn upload(
    client: &ApiClient,
    releases: &ReleaseMutexTable,
    max_assets_per_release: u32,
    filename: &str,
    bytes: &[u8],
) -> Result<String, ProviderError> {
    let key = format!("{}/{}", client.owner, client.repo);

    let release_id = {
        let _guard = releases.lock(&key).await;
        discover_or_create_release(client, max_assets_per_release).await?
    };

    match client.upload_asset(release_id, filename, bytes.to_vec()).await {
        Ok(value) => Ok(download_url(&value)),
        Err(e) if matches!(e.kind, ProviderErrorKind::NotFound) => {
            // The release was deleted out from under us between discovery
            // and upload; retry exactly once with fresh discovery.
            let release_id = {
                let _guard = releases.lock(&key).await;
                discover_or_create_release(client, max_assets_per_release).await?
            };
            let value = client
                .upload_asset(release_id, filename, bytes.to_vec())
                .await
                .map_err(|e| ProviderError::new(ProviderErrorKind::RaceOnAsset(e.to_string())))?;
            Ok(download_url(&value))
        }
        Err(e) => Err(e),
    }
}

fn download_url(value: &serde_json::Value) -> String {
    value["browser_download_url"].as_str().unwrap_or_default().to_string()
}

async fn discover_or_create_release(client: &ApiClient, max_assets_per_release: u32) -> Result<u64, ProviderError> {
    let releases = client.get("/releases").await?;
    let releases = releases.as_array().cloned().unwrap_or_default();

    for release in &releases {
        let tag = release["tag_name"].as_str().unwrap_or_default();
        if !is_asset_tag(tag) {
            continue;
        }
        let Some(id) = release["id"].as_u64() else { continue };
        let assets = client.get(&format!("/releases/{id}/assets")).await?;
        let count = assets.as_array().map(|a| a.len()).unwrap_or(0) as u32;
        if count < max_assets_per_release {
            return Ok(id);
        }
    }

    let next_tag = next_tag(&releases);
    let created = client
        .post(
            "/releases",
            &json!({ "tag_name": next_tag, "name": next_tag, "prerelease": true }),
        )
        .await?;
    client.invalidate_repo_info().await;
    created["id"]
        .as_u64()
        .ok_or_else(|| ProviderError::new(ProviderErrorKind::Unexpected(msg2git_error::HttpError::new("release creation response missing id".to_string()))))
}

fn is_asset_tag(tag: &str) -> bool {
    tag == TAG_PREFIX || (tag.starts_with(TAG_PREFIX) && tag[TAG_PREFIX.len()..].chars().all(|c| c.is_ascii_digit()))
}

/// `assets`, `assets1`, `assets2`, … — the next number not already taken.
fn next_tag(releases: &[serde_json::Value]) -> String {
    let mut max_seen: Option<u32> = None;
    for release in releases {
        let tag = release["tag_name"].as_str().unwrap_or_default();
        if tag == TAG_PREFIX {
            max_seen = max_seen.max(Some(0));
        } else if let Some(suffix) = tag.strip_prefix(TAG_PREFIX) {
            if let Ok(n) = suffix.parse::<u32>() {
                max_seen = max_seen.max(Some(n));
            }
        }
    }
    match max_seen {
        None => TAG_PREFIX.to_string(),
        Some(n) => format!("{TAG_PREFIX}{}", n + 1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn first_release_has_bare_tag() {
        assert_eq!(next_tag(&[]), "assets");
    }

    #[test]
    fn numbers_increment_from_existing_tags() {
        let releases = vec![
            json!({ "tag_name": "assets" }),
            json!({ "tag_name": "assets1" }),
            json!({ "tag_name": "v1.0.0" }),
        ];
        assert_eq!(next_tag(&releases), "assets2");
    }

    #[test]
    fn recognizes_asset_tag_family() {
        assert!(is_asset_tag("assets"));
        assert!(is_asset_tag("assets12"));
        assert!(!is_asset_tag("assets-beta"));
        assert!(!is_asset_tag("v1.0.0"));
    }
}
