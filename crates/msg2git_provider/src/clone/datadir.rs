//! Global cap enforcement across every working tree under the clone
//! datadir: evict least-recently-accessed repos until total size is back
//! under the configured ceiling.

use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{info, warn};

struct Entry {
    path: PathBuf,
    size_bytes: u64,
    last_used: SystemTime,
}

async fn dir_size(path: &Path) -> u64 {
    let mut total = 0u64;
    let mut stack = vec![path.to_path_buf()];
    while let Some(dir) = stack.pop() {
        let Ok(mut entries) = tokio::fs::read_dir(&dir).await else {
            continue;
        };
        while let Ok(Some(entry)) = entries.next_entry().await {
            let Ok(metadata) = entry.metadata().await else {
                continue;
            };
            if metadata.is_dir() {
                stack.push(entry.path());
            } else {
                total += metadata.len();
            }
        }
    }
    total
}

/// Evict least-recently-accessed repo directories under `datadir` until the
/// combined size is at or below `cap_bytes`. `keep` is never evicted (the
/// working tree a caller is currently using).
pub async fn enforce_cap(datadir: &Path, cap_bytes: u64, keep: Option<&Path>) {
    let Ok(mut read) = tokio::fs::read_dir(datadir).await else {
        return;
    };

    let mut entries = Vec::new();
    while let Ok(Some(dir_entry)) = read.next_entry().await {
        let Ok(metadata) = dir_entry.metadata().await else {
            continue;
        };
        if !metadata.is_dir() {
            continue;
        }
        let path = dir_entry.path();
        let last_used = metadata.accessed().or_else(|_| metadata.modified()).unwrap_or(SystemTime::UNIX_EPOCH);
        let size_bytes = dir_size(&path).await;
        entries.push(Entry { path, size_bytes, last_used });
    }

    let mut total: u64 = entries.iter().map(|e| e.size_bytes).sum();
    if total <= cap_bytes {
        return;
    }

    entries.sort_by_key(|e| e.last_used);

    for entry in entries {
        if total <= cap_bytes {
            break;
        }
        if keep.is_some_and(|k| k == entry.path) {
            continue;
        }
        match tokio::fs::remove_dir_all(&entry.path).await {
            Ok(()) => {
                total = total.saturating_sub(entry.size_bytes);
                info!(path = %entry.path.display(), freed = entry.size_bytes, "evicted idle working tree");
            }
            Err(e) => {
                warn!(path = %entry.path.display(), error = %e, "failed to evict working tree");
            }
        }
    }
}
