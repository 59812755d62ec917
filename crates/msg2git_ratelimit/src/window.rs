//! A single `(class, user)` sliding window of request timestamps.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Ordered timestamps for one `(class, user)` key, newest at the tail.
///
/// Invariant: timestamps are monotonically non-decreasing and, immediately
/// after any access, all lie within `window` of `now`.
#[derive(Debug)]
pub(crate) struct Window {
    timestamps: VecDeque<Instant>,
    pub(crate) last_touched: Instant,
}

impl Window {
    pub(crate) fn new() -> Self {
        Self {
            timestamps: VecDeque::new(),
            last_touched: Instant::now(),
        }
    }

    /// Purge entries older than `now - window`, using the ordered property:
    /// scan from the head for the first timestamp still inside the window,
    /// then drop everything before it.
    pub(crate) fn purge(&mut self, now: Instant, window: Duration) {
        while let Some(&front) = self.timestamps.front() {
            if now.saturating_duration_since(front) > window {
                self.timestamps.pop_front();
            } else {
                break;
            }
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub(crate) fn push(&mut self, at: Instant) {
        self.timestamps.push_back(at);
        self.last_touched = at;
    }

    /// Count timestamps within `since` of `now`, without purging — used by
    /// read-only metrics that must not mutate a window another class's
    /// `consume` still owns.
    pub(crate) fn count_since(&self, now: Instant, since: Duration) -> usize {
        self.timestamps
            .iter()
            .rev()
            .take_while(|&&t| now.saturating_duration_since(t) <= since)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn purge_drops_only_expired_prefix() {
        let mut window = Window::new();
        let base = Instant::now();
        window.push(base);
        window.push(base + Duration::from_millis(10));
        window.push(base + Duration::from_millis(900));

        window.purge(base + Duration::from_millis(950), Duration::from_millis(100));
        assert_eq!(window.len(), 1);
    }
}
