//! End-to-end scenarios S1/S2 and the admission-linearizability property.

use msg2git_config::{ClassQuota, LimitClass, RateLimitSettings, TierMultiplier};
use msg2git_ratelimit::RateLimiter;
use std::time::Duration;

fn command_only(requests: u32, window_secs: u64) -> RateLimitSettings {
    let mut settings = RateLimitSettings::default();
    settings.classes.insert(
        LimitClass::Command.as_str().to_string(),
        ClassQuota { requests, window_secs },
    );
    settings
}

/// S1 — Free-tier admission: limit 5/1s, tier 0. 10 concurrent consumes in
/// 50ms admit exactly 5; after 1.1s one more consume succeeds.
#[tokio::test]
async fn s1_free_tier_admission() {
    let limiter = RateLimiter::new(command_only(5, 1));

    let mut handles = Vec::new();
    for _ in 0..10 {
        let limiter = limiter.clone();
        handles.push(tokio::spawn(async move {
            limiter.consume(1, LimitClass::Command, 0).await.is_ok()
        }));
    }
    let mut admitted = 0;
    for h in handles {
        if h.await.unwrap() {
            admitted += 1;
        }
    }
    assert_eq!(admitted, 5);

    tokio::time::sleep(Duration::from_millis(1100)).await;
    assert!(limiter.consume(1, LimitClass::Command, 0).await.is_ok());
}

/// S2 — Tiered behavior: limit 5/1s, multipliers {0:1,1:2,2:4,3:8}. 20
/// concurrent consumes at tier 2 for user 2 all admit (effective limit 20);
/// the 21st is rejected.
#[tokio::test]
async fn s2_tiered_behavior() {
    let mut settings = command_only(5, 1);
    settings.premium_multipliers = vec![
        TierMultiplier { tier: 0, multiplier: 1.0 },
        TierMultiplier { tier: 1, multiplier: 2.0 },
        TierMultiplier { tier: 2, multiplier: 4.0 },
        TierMultiplier { tier: 3, multiplier: 8.0 },
    ];
    let limiter = RateLimiter::new(settings);

    let mut handles = Vec::new();
    for _ in 0..20 {
        let limiter = limiter.clone();
        handles.push(tokio::spawn(async move {
            limiter.consume(2, LimitClass::Command, 2).await.is_ok()
        }));
    }
    let mut admitted = 0;
    for h in handles {
        if h.await.unwrap() {
            admitted += 1;
        }
    }
    assert_eq!(admitted, 20);

    assert!(limiter.consume(2, LimitClass::Command, 2).await.is_err());
}

/// Property 1 — admission linearizability: among K concurrent consumes
/// completing within the window, exactly min(K, L) return ok.
#[tokio::test]
async fn admission_linearizability() {
    let limit = 7u32;
    let limiter = RateLimiter::new(command_only(limit, 5));

    let k = limit as usize * 10;
    let mut handles = Vec::new();
    for _ in 0..k {
        let limiter = limiter.clone();
        handles.push(tokio::spawn(async move {
            limiter.consume(9, LimitClass::Command, 0).await.is_ok()
        }));
    }
    let mut admitted = 0;
    for h in handles {
        if h.await.unwrap() {
            admitted += 1;
        }
    }
    assert_eq!(admitted, limit as usize);
}

/// Property 2 — tier monotonicity: admit rate at tier t+1 >= tier t.
#[tokio::test]
async fn tier_monotonicity() {
    let mut settings = command_only(3, 2);
    settings.premium_multipliers = vec![
        TierMultiplier { tier: 0, multiplier: 1.0 },
        TierMultiplier { tier: 1, multiplier: 2.0 },
    ];
    let limiter = RateLimiter::new(settings);

    let mut admitted_t0 = 0;
    for _ in 0..10 {
        if limiter.consume(10, LimitClass::Command, 0).await.is_ok() {
            admitted_t0 += 1;
        }
    }

    let mut admitted_t1 = 0;
    for _ in 0..10 {
        if limiter.consume(11, LimitClass::Command, 1).await.is_ok() {
            admitted_t1 += 1;
        }
    }

    assert!(admitted_t1 >= admitted_t0);
}
