//! Per-`(class, user)` sliding-window rate limiter with tiered multipliers
//! and a self-restarting background janitor.

use crate::window::Window;
use msg2git_config::{LimitClass, RateLimitSettings};
use msg2git_error::{RateLimitError, RateLimitErrorKind};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, instrument};

type Key = (LimitClass, i64);

/// Snapshot of limiter activity, safe to expose to metrics (no PII beyond
/// opaque user ids already carried by the event).
#[derive(Debug, Clone, Copy, Default)]
pub struct Stats {
    /// Distinct `(class, user)` windows currently tracked.
    pub tracked_windows: usize,
    /// Total live timestamps across all windows.
    pub total_timestamps: usize,
}

/// The rate limiter. Cheap to clone (internally `Arc`-backed); share one
/// instance across the process.
#[derive(Clone)]
pub struct RateLimiter {
    settings: Arc<RateLimitSettings>,
    table: Arc<RwLock<HashMap<Key, Arc<Mutex<Window>>>>>,
}

impl RateLimiter {
    /// Build a limiter from settings. Does not start the janitor; call
    /// [`RateLimiter::spawn_janitor`] once the limiter is wired into its
    /// owner.
    pub fn new(settings: RateLimitSettings) -> Self {
        Self {
            settings: Arc::new(settings),
            table: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    fn effective_limit(&self, class: LimitClass, tier: u8) -> Result<usize, RateLimitError> {
        let quota = self.settings.quota(class).ok_or_else(|| {
            RateLimitError::new(RateLimitErrorKind::UnknownLimitClass(
                class.as_str().to_string(),
            ))
        })?;
        let multiplier = self.settings.multiplier(tier);
        Ok(((quota.requests as f64) * multiplier).floor() as usize)
    }

    fn window_for(&self, class: LimitClass) -> Duration {
        self.settings
            .quota(class)
            .map(|q| Duration::from_secs(q.window_secs))
            .unwrap_or_default()
    }

    async fn get_or_create(&self, key: Key) -> Arc<Mutex<Window>> {
        if let Some(existing) = self.table.read().await.get(&key) {
            return Arc::clone(existing);
        }
        let mut table = self.table.write().await;
        // Double-checked: another writer may have created it first.
        table
            .entry(key)
            .or_insert_with(|| Arc::new(Mutex::new(Window::new())))
            .clone()
    }

    /// Non-mutating admission check. `check`-then-`consume` by the caller is
    /// a race — `consume` is the only authoritative admission path.
    #[instrument(skip(self))]
    pub async fn check(&self, user: i64, class: LimitClass, tier: u8) -> Result<bool, RateLimitError> {
        let limit = self.effective_limit(class, tier)?;
        let window_dur = self.window_for(class);
        let key = (class, user);

        let Some(entry) = self.table.read().await.get(&key).cloned() else {
            return Ok(0 < limit);
        };
        let mut window = entry.lock().await;
        let now = Instant::now();
        window.purge(now, window_dur);
        Ok(window.len() < limit)
    }

    /// Atomically re-check under the window's lock and admit if possible.
    /// This is the only path callers may rely on for admission.
    #[instrument(skip(self))]
    pub async fn consume(&self, user: i64, class: LimitClass, tier: u8) -> Result<(), RateLimitError> {
        let limit = self.effective_limit(class, tier)?;
        let window_dur = self.window_for(class);
        let key = (class, user);

        let entry = self.get_or_create(key).await;
        let mut window = entry.lock().await;
        let now = Instant::now();
        window.purge(now, window_dur);

        if window.len() < limit {
            window.push(now);
            debug!(user, class = class.as_str(), usage = window.len(), limit, "admitted");
            Ok(())
        } else {
            debug!(user, class = class.as_str(), usage = window.len(), limit, "rejected");
            Err(RateLimitError::new(RateLimitErrorKind::LimitExceeded {
                class: class.as_str().to_string(),
                user,
            }))
        }
    }

    /// Count of live timestamps for `(user, class)`.
    #[instrument(skip(self))]
    pub async fn current_usage(&self, user: i64, class: LimitClass) -> usize {
        let window_dur = self.window_for(class);
        let key = (class, user);
        let Some(entry) = self.table.read().await.get(&key).cloned() else {
            return 0;
        };
        let mut window = entry.lock().await;
        window.purge(Instant::now(), window_dur);
        window.len()
    }

    /// `max(0, effective_limit - usage)`.
    #[instrument(skip(self))]
    pub async fn remaining(&self, user: i64, class: LimitClass, tier: u8) -> Result<usize, RateLimitError> {
        let limit = self.effective_limit(class, tier)?;
        let usage = self.current_usage(user, class).await;
        Ok(limit.saturating_sub(usage))
    }

    /// Remove all windows for `user` across every class.
    #[instrument(skip(self))]
    pub async fn reset_user(&self, user: i64) {
        let mut table = self.table.write().await;
        table.retain(|(_, u), _| *u != user);
        info!(user, "reset all rate windows");
    }

    /// Total requests seen across all windows within the last minute,
    /// divided by the configured saturation constant, clipped to 1.0.
    ///
    /// Read-only: counts each window's timestamps newer than `now - 1m`
    /// without purging, since purging with a 60s cutoff would destroy live
    /// timestamps of longer-window classes (e.g. `github_rest`'s 3600s
    /// window) that their own `consume` still needs.
    #[instrument(skip(self))]
    pub async fn global_load(&self) -> f64 {
        let now = Instant::now();
        let one_minute = Duration::from_secs(60);
        let table = self.table.read().await;
        let mut total = 0usize;
        for entry in table.values() {
            let window = entry.lock().await;
            total += window.count_since(now, one_minute);
        }
        let saturation = self.settings.global_saturation.max(1) as f64;
        (total as f64 / saturation).min(1.0)
    }

    /// Point-in-time snapshot for `stats()` exposure.
    pub async fn stats(&self) -> Stats {
        let table = self.table.read().await;
        let mut total_timestamps = 0usize;
        for entry in table.values() {
            total_timestamps += entry.lock().await.len();
        }
        Stats {
            tracked_windows: table.len(),
            total_timestamps,
        }
    }

    /// Sweep all windows, trimming entries older than twice the longest
    /// configured window, and drop any window left empty. Runs every
    /// `janitor_interval_secs`.
    #[instrument(skip(self))]
    async fn sweep(&self) {
        let max_window = LimitClass::ALL
            .iter()
            .filter_map(|c| self.settings.quota(*c))
            .map(|q| Duration::from_secs(q.window_secs))
            .max()
            .unwrap_or_default();
        let stale_after = max_window * 2;
        let now = Instant::now();

        let mut table = self.table.write().await;
        let mut removed = 0usize;
        table.retain(|_, entry| {
            // try_lock: the janitor never blocks behind an in-flight consume.
            if let Ok(mut window) = entry.try_lock() {
                window.purge(now, stale_after);
                if window.is_empty() {
                    removed += 1;
                    return false;
                }
            }
            true
        });
        if removed > 0 {
            debug!(removed, "janitor dropped empty windows");
        }
    }

    /// Spawn the background janitor. It recovers from panics in `sweep` and
    /// restarts itself, per `spec.md` §4.A.
    pub fn spawn_janitor(&self) -> tokio::task::JoinHandle<()> {
        let limiter = self.clone();
        let interval = Duration::from_secs(limiter.settings.janitor_interval_secs.max(1));
        tokio::spawn(async move {
            loop {
                let limiter = limiter.clone();
                let handle = tokio::spawn(async move {
                    let mut ticker = tokio::time::interval(interval);
                    loop {
                        ticker.tick().await;
                        limiter.sweep().await;
                    }
                });
                match handle.await {
                    Ok(()) => continue,
                    Err(join_err) if join_err.is_panic() => {
                        error!("rate limiter janitor panicked, restarting");
                        continue;
                    }
                    Err(_) => break,
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use msg2git_config::ClassQuota;

    fn settings_with(requests: u32, window_secs: u64) -> RateLimitSettings {
        let mut settings = RateLimitSettings::default();
        settings.classes.insert(
            LimitClass::Command.as_str().to_string(),
            ClassQuota { requests, window_secs },
        );
        settings
    }

    #[tokio::test]
    async fn unknown_class_is_rejected() {
        let limiter = RateLimiter::new(RateLimitSettings {
            classes: HashMap::new(),
            ..RateLimitSettings::default()
        });
        let err = limiter.consume(1, LimitClass::Command, 0).await.unwrap_err();
        assert!(matches!(err.kind, RateLimitErrorKind::UnknownLimitClass(_)));
    }

    #[tokio::test]
    async fn zero_requests_is_unknown_class() {
        let limiter = RateLimiter::new(settings_with(0, 60));
        let err = limiter.consume(1, LimitClass::Command, 0).await.unwrap_err();
        assert!(matches!(err.kind, RateLimitErrorKind::UnknownLimitClass(_)));
    }

    #[tokio::test]
    async fn admits_up_to_limit_then_rejects() {
        let limiter = RateLimiter::new(settings_with(5, 1));
        for _ in 0..5 {
            limiter.consume(1, LimitClass::Command, 0).await.unwrap();
        }
        let err = limiter.consume(1, LimitClass::Command, 0).await.unwrap_err();
        assert!(matches!(err.kind, RateLimitErrorKind::LimitExceeded { .. }));
    }

    #[tokio::test]
    async fn tier_multiplier_raises_effective_limit() {
        let mut settings = settings_with(5, 1);
        settings.premium_multipliers = vec![
            msg2git_config::TierMultiplier { tier: 0, multiplier: 1.0 },
            msg2git_config::TierMultiplier { tier: 2, multiplier: 4.0 },
        ];
        let limiter = RateLimiter::new(settings);
        for _ in 0..20 {
            limiter.consume(2, LimitClass::Command, 2).await.unwrap();
        }
        let err = limiter.consume(2, LimitClass::Command, 2).await.unwrap_err();
        assert!(matches!(err.kind, RateLimitErrorKind::LimitExceeded { .. }));
    }

    #[tokio::test]
    async fn window_slides_after_wait() {
        let limiter = RateLimiter::new(settings_with(1, 1));
        limiter.consume(1, LimitClass::Command, 0).await.unwrap();
        assert!(limiter.consume(1, LimitClass::Command, 0).await.is_err());

        tokio::time::sleep(Duration::from_millis(1100)).await;
        limiter.consume(1, LimitClass::Command, 0).await.unwrap();
    }

    #[tokio::test]
    async fn global_load_does_not_corrupt_long_window_classes() {
        let mut settings = RateLimitSettings::default();
        settings.classes.insert(
            LimitClass::GithubRest.as_str().to_string(),
            ClassQuota { requests: 2, window_secs: 3600 },
        );
        let limiter = RateLimiter::new(settings);
        limiter.consume(1, LimitClass::GithubRest, 0).await.unwrap();

        // A read-only global_load() call must not purge a 3600s window's
        // timestamps using a 60s cutoff.
        limiter.global_load().await;

        assert_eq!(limiter.current_usage(1, LimitClass::GithubRest).await, 1);
        limiter.consume(1, LimitClass::GithubRest, 0).await.unwrap();
        let err = limiter.consume(1, LimitClass::GithubRest, 0).await.unwrap_err();
        assert!(matches!(err.kind, RateLimitErrorKind::LimitExceeded { .. }));
    }

    #[tokio::test]
    async fn reset_user_clears_all_classes() {
        let limiter = RateLimiter::new(settings_with(1, 60));
        limiter.consume(1, LimitClass::Command, 0).await.unwrap();
        limiter.reset_user(1).await;
        limiter.consume(1, LimitClass::Command, 0).await.unwrap();
    }
}
