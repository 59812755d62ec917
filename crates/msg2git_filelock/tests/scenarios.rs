//! End-to-end scenarios S3-S5 and the mutual-exclusion / deadlock-freedom /
//! force-release / idempotence properties.

use msg2git_filelock::FileLockManager;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

fn manager(handle_ttl: Duration, idle_reap: Duration, janitor_interval: Duration) -> FileLockManager {
    FileLockManager::new(handle_ttl, idle_reap, janitor_interval)
}

/// S3 — lock serialization: a second exclusive acquire on the same file
/// does not complete until the first holder releases.
#[tokio::test]
async fn s3_same_file_serializes() {
    let mgr = manager(Duration::from_secs(60), Duration::from_secs(600), Duration::from_secs(60));

    let first = mgr
        .acquire(1, "alice/notes", "daily.md", true, CancellationToken::new(), Duration::from_secs(5))
        .await
        .unwrap();

    let mgr2 = mgr.clone();
    let waiter = tokio::spawn(async move {
        let started = Instant::now();
        let second = mgr2
            .acquire(2, "alice/notes", "daily.md", true, CancellationToken::new(), Duration::from_secs(5))
            .await
            .unwrap();
        let waited = started.elapsed();
        second.release().await;
        waited
    });

    tokio::time::sleep(Duration::from_millis(200)).await;
    first.release().await;

    let waited = waiter.await.unwrap();
    assert!(waited >= Duration::from_millis(190), "waited only {waited:?}");
}

/// S4 — different files in the same repo never block each other.
#[tokio::test]
async fn s4_different_files_run_in_parallel() {
    let mgr = manager(Duration::from_secs(60), Duration::from_secs(600), Duration::from_secs(60));

    let started = Instant::now();
    let mgr_a = mgr.clone();
    let a = tokio::spawn(async move {
        let h = mgr_a
            .acquire(1, "alice/notes", "a.md", true, CancellationToken::new(), Duration::from_secs(5))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        h.release().await;
    });
    let mgr_b = mgr.clone();
    let b = tokio::spawn(async move {
        let h = mgr_b
            .acquire(2, "alice/notes", "b.md", true, CancellationToken::new(), Duration::from_secs(5))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        h.release().await;
    });
    a.await.unwrap();
    b.await.unwrap();

    assert!(started.elapsed() < Duration::from_millis(150), "files serialized unexpectedly");
}

/// S5 / property 6 — a stalled holder that never releases is force-released
/// by the janitor once its handle TTL elapses, so a later waiter eventually
/// makes progress.
#[tokio::test]
async fn s5_force_release_after_stall() {
    let mgr = manager(
        Duration::from_millis(100),
        Duration::from_secs(600),
        Duration::from_millis(50),
    );
    let janitor = mgr.spawn_janitor();

    // Acquire and deliberately never release — simulates a stalled caller.
    let _stalled = mgr
        .acquire(1, "alice/notes", "daily.md", true, CancellationToken::new(), Duration::from_secs(5))
        .await
        .unwrap();

    let waiter_start = Instant::now();
    let second = mgr
        .acquire(2, "alice/notes", "daily.md", true, CancellationToken::new(), Duration::from_secs(2))
        .await
        .unwrap();
    assert!(waiter_start.elapsed() >= Duration::from_millis(90));
    second.release().await;
    janitor.abort();
}

/// Property 4 — mutual exclusion: two exclusive holders on the same key
/// never observe overlapping critical sections.
#[tokio::test]
async fn property_mutual_exclusion() {
    let mgr = manager(Duration::from_secs(60), Duration::from_secs(600), Duration::from_secs(60));
    let inside = Arc::new(AtomicUsize::new(0));
    let violations = Arc::new(AtomicUsize::new(0));

    let mut tasks = Vec::new();
    for i in 0..8u64 {
        let mgr = mgr.clone();
        let inside = Arc::clone(&inside);
        let violations = Arc::clone(&violations);
        tasks.push(tokio::spawn(async move {
            let h = mgr
                .acquire(i as i64, "alice/notes", "daily.md", true, CancellationToken::new(), Duration::from_secs(5))
                .await
                .unwrap();
            if inside.fetch_add(1, Ordering::SeqCst) != 0 {
                violations.fetch_add(1, Ordering::SeqCst);
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
            inside.fetch_sub(1, Ordering::SeqCst);
            h.release().await;
        }));
    }
    for t in tasks {
        t.await.unwrap();
    }
    assert_eq!(violations.load(Ordering::SeqCst), 0);
}

/// Property 5 — deadlock freedom: two callers locking overlapping file sets
/// in opposite caller-supplied order both complete, because the manager
/// always acquires in sorted order internally.
#[tokio::test]
async fn property_multi_lock_is_deadlock_free() {
    let mgr = manager(Duration::from_secs(60), Duration::from_secs(600), Duration::from_secs(60));

    let mgr_a = mgr.clone();
    let a = tokio::spawn(async move {
        mgr_a
            .with_multi_lock(1, "alice/notes", &["b.md".to_string(), "a.md".to_string()], |_| async {
                tokio::time::sleep(Duration::from_millis(20)).await;
            })
            .await
            .unwrap();
    });
    let mgr_b = mgr.clone();
    let b = tokio::spawn(async move {
        mgr_b
            .with_multi_lock(2, "alice/notes", &["a.md".to_string(), "b.md".to_string()], |_| async {
                tokio::time::sleep(Duration::from_millis(20)).await;
            })
            .await
            .unwrap();
    });

    let result = tokio::time::timeout(Duration::from_secs(2), async {
        a.await.unwrap();
        b.await.unwrap();
    })
    .await;
    assert!(result.is_ok(), "multi-file locking deadlocked");
}

/// Property 7 — release idempotence: a second release is a harmless no-op
/// and does not affect other holders.
#[tokio::test]
async fn property_release_is_idempotent() {
    let mgr = manager(Duration::from_secs(60), Duration::from_secs(600), Duration::from_secs(60));

    let h = mgr
        .acquire(1, "alice/notes", "daily.md", true, CancellationToken::new(), Duration::from_secs(5))
        .await
        .unwrap();
    h.release().await;
    h.release().await;

    let stats = mgr.stats().await;
    assert_eq!(stats.active_handles, 0);

    // Someone else can still take the lock afterwards.
    let other = mgr
        .acquire(2, "alice/notes", "daily.md", true, CancellationToken::new(), Duration::from_secs(5))
        .await
        .unwrap();
    other.release().await;
}
