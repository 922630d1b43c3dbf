//! End-to-end limiter scenarios against a running Redis
//!
//! These tests exercise the full hit/refresh cycle and therefore need a
//! Redis instance at `redis://localhost:6379`. They are ignored by default;
//! run them with `cargo test -- --ignored` when one is up. Every test uses
//! a process-unique endpoint so key namespaces never collide across runs.

use chrono::{DateTime, Utc};
use http::{HeaderMap, HeaderValue};
use riot_ratelimit::config::RedisConfig;
use riot_ratelimit::limits::{CooldownStore, PolicyStore};
use riot_ratelimit::{
    Decision, EntrySource, LimitType, LimiterError, RateLimiter, RedisPool, RoutingVal,
    StoreKey,
};

async fn pool() -> RedisPool {
    RedisPool::new(&RedisConfig::default())
        .await
        .expect("redis must be running at localhost:6379")
}

async fn limiter() -> RateLimiter {
    RateLimiter::new(pool().await, &Default::default())
}

fn unique_endpoint(tag: &str) -> String {
    format!("/lol/summoner/{}-{}", tag, std::process::id())
}

fn headers_from(pairs: &[(&str, &str)]) -> HeaderMap {
    let mut map = HeaderMap::new();
    for (name, value) in pairs {
        map.insert(
            http::header::HeaderName::from_bytes(name.as_bytes()).unwrap(),
            HeaderValue::from_str(value).unwrap(),
        );
    }
    map
}

fn parse_utc(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw).unwrap().with_timezone(&Utc)
}

#[tokio::test]
#[ignore = "requires a running Redis at localhost:6379"]
async fn bootstrap_then_allow_within_quota() {
    let limiter = limiter().await;
    let endpoint = unique_endpoint("bootstrap");

    let headers = headers_from(&[
        ("date", "Tue, 01 Apr 2025 18:15:26 GMT"),
        ("x-app-rate-limit", "100:120,20:1"),
        ("x-app-rate-limit-count", "20:120,2:1"),
        ("x-method-rate-limit", "50:10"),
        ("x-method-rate-limit-count", "20:10"),
    ]);
    let observed = limiter
        .refresh(&headers, RoutingVal::Euw1, &endpoint)
        .await
        .unwrap();
    assert_eq!(observed.len(), 3);

    let decision = limiter.hit(RoutingVal::Euw1, &endpoint).await.unwrap();
    let Decision::Allow(entries) = decision else {
        panic!("first hit after bootstrap must be allowed");
    };
    assert_eq!(entries.len(), 3);

    assert_eq!(entries[0].limit_type(), Some(LimitType::Application));
    assert_eq!(entries[0].window_sec(), Some(120));
    assert_eq!(entries[0].count_limit(), Some(100));
    assert_eq!(entries[0].count(), 1);

    assert_eq!(entries[1].window_sec(), Some(1));
    assert_eq!(entries[1].count_limit(), Some(20));
    assert_eq!(entries[1].count(), 1);

    assert_eq!(entries[2].limit_type(), Some(LimitType::Method));
    assert_eq!(entries[2].window_sec(), Some(10));
    assert_eq!(entries[2].count_limit(), Some(50));
    assert_eq!(entries[2].count(), 1);

    for entry in &entries {
        assert_eq!(entry.source(), EntrySource::Live);
    }
}

#[tokio::test]
#[ignore = "requires a running Redis at localhost:6379"]
async fn throttle_on_counter_breach() {
    let limiter = limiter().await;
    let endpoint = unique_endpoint("breach");

    let headers = headers_from(&[
        ("x-app-rate-limit", "100:120,2:1"),
        ("x-method-rate-limit", "50:10"),
    ]);
    limiter
        .refresh(&headers, RoutingVal::Euw1, &endpoint)
        .await
        .unwrap();

    assert!(limiter.hit(RoutingVal::Euw1, &endpoint).await.unwrap().is_allowed());
    assert!(limiter.hit(RoutingVal::Euw1, &endpoint).await.unwrap().is_allowed());

    let third = limiter.hit(RoutingVal::Euw1, &endpoint).await.unwrap();
    let Decision::Throttle(entries) = third else {
        panic!("third hit must breach the 2-per-second window");
    };
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].limit_type(), Some(LimitType::Application));
    assert_eq!(entries[0].window_sec(), Some(1));
    assert_eq!(entries[0].count_limit(), Some(2));
    assert_eq!(entries[0].count(), 2);
    assert_eq!(entries[0].source(), EntrySource::Live);
}

#[tokio::test]
#[ignore = "requires a running Redis at localhost:6379"]
async fn cooldown_installed_by_429() {
    let pool = pool().await;
    let limiter = RateLimiter::new(pool.clone(), &Default::default());
    let endpoint = unique_endpoint("cooldown-429");

    let headers = headers_from(&[
        ("date", "Wed, 02 Apr 2025 18:00:00 GMT"),
        ("retry-after", "120"),
        ("x-rate-limit-type", "application"),
    ]);
    let now = parse_utc("2025-04-02T18:00:01Z");

    // A plain 429 carries no limit headers, so the policy half of refresh
    // reports that as a structured error after the cooldown is written
    let result = limiter
        .refresh_at(&headers, RoutingVal::Jp1, &endpoint, now)
        .await;
    assert!(matches!(
        result,
        Err(LimiterError::RateLimitHeadersAbsent { .. })
    ));

    let decision = limiter.hit(RoutingVal::Jp1, &endpoint).await.unwrap();
    let Decision::Throttle(entries) = decision else {
        panic!("hit inside a cooldown must throttle");
    };
    assert_eq!(entries[0].source(), EntrySource::Cooldown);
    assert_eq!(entries[0].limit_type(), Some(LimitType::Application));
    let ttl = entries[0].ttl().unwrap();
    assert!((115..=120).contains(&ttl), "ttl {ttl} out of range");
    assert_eq!(entries[0].adjusted_ttl(), Some(119));

    // The key layout is an external contract (operator dashboards read it):
    // an application cooldown lives under the endpoint-less template with
    // the skew-adjusted TTL as both value and expiry
    let key = StoreKey::cooldown(RoutingVal::Jp1, &endpoint, LimitType::Application).encode();
    assert_eq!(key, "lol_api:v1:cooldown:jp1:application");
    assert_eq!(pool.get(&key).await.unwrap().as_deref(), Some("119"));
    let raw_ttl = pool.ttl(&key).await.unwrap();
    assert!((115..=119).contains(&raw_ttl), "raw ttl {raw_ttl} out of range");
}

#[tokio::test]
#[ignore = "requires a running Redis at localhost:6379"]
async fn longest_cooldown_dominates() {
    let pool = pool().await;
    let limiter = RateLimiter::new(pool.clone(), &Default::default());
    let endpoint = unique_endpoint("dominance");
    let now = parse_utc("2025-04-02T18:00:01Z");

    for (scope, retry_after) in [
        ("application", "120"),
        ("service", "240"),
        ("method", "60"),
    ] {
        let headers = headers_from(&[
            ("date", "Wed, 02 Apr 2025 18:00:00 GMT"),
            ("retry-after", retry_after),
            ("x-rate-limit-type", scope),
        ]);
        let _ = limiter
            .refresh_at(&headers, RoutingVal::Kr, &endpoint, now)
            .await;
    }

    let cooldowns = CooldownStore::new(pool);
    let status = cooldowns.status(RoutingVal::Kr, &endpoint).await.unwrap();
    let Decision::Throttle(entries) = status else {
        panic!("three live cooldowns must throttle");
    };
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].limit_type(), Some(LimitType::Service));
    let ttl = entries[0].ttl().unwrap();
    assert!((235..=240).contains(&ttl), "ttl {ttl} out of range");
    assert_eq!(entries[0].adjusted_ttl(), Some(239));
}

#[tokio::test]
#[ignore = "requires a running Redis at localhost:6379"]
async fn expired_cooldown_falls_through() {
    let limiter = limiter().await;
    let endpoint = unique_endpoint("expiry");

    let now = Utc::now();
    let headers = headers_from(&[
        ("date", now.to_rfc2822().replace("+0000", "GMT").as_str()),
        ("retry-after", "1"),
        ("x-rate-limit-type", "service"),
    ]);
    let _ = limiter
        .refresh_at(&headers, RoutingVal::Oc1, &endpoint, now)
        .await;

    assert!(!limiter.hit(RoutingVal::Oc1, &endpoint).await.unwrap().is_allowed());

    tokio::time::sleep(std::time::Duration::from_millis(1500)).await;

    // No policy was ever installed, so the post-cooldown hit is blind
    let decision = limiter.hit(RoutingVal::Oc1, &endpoint).await.unwrap();
    assert!(decision.is_allowed());
}

#[tokio::test]
#[ignore = "requires a running Redis at localhost:6379"]
async fn blind_request_when_policy_unknown() {
    let limiter = limiter().await;
    let endpoint = unique_endpoint("blind");

    let decision = limiter.hit(RoutingVal::Euw1, &endpoint).await.unwrap();
    let Decision::Allow(entries) = decision else {
        panic!("unknown policy must admit a blind request");
    };
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].source(), EntrySource::Policy);
    assert_eq!(entries[0].limit_type(), None);
    assert_eq!(entries[0].count(), 0);
}

#[tokio::test]
#[ignore = "requires a running Redis at localhost:6379"]
async fn refresh_is_idempotent() {
    let pool = pool().await;
    let limiter = RateLimiter::new(pool.clone(), &Default::default());
    let endpoint = unique_endpoint("idempotent");

    let headers = headers_from(&[
        ("x-app-rate-limit", "100:120"),
        ("x-method-rate-limit", "50:10"),
    ]);
    limiter
        .refresh(&headers, RoutingVal::Euw1, &endpoint)
        .await
        .unwrap();

    let policies = PolicyStore::new(pool);
    let first = policies.fetch(RoutingVal::Euw1, &endpoint).await.unwrap();

    limiter
        .refresh(&headers, RoutingVal::Euw1, &endpoint)
        .await
        .unwrap();
    let second = policies.fetch(RoutingVal::Euw1, &endpoint).await.unwrap();

    assert_eq!(first, second);
}

#[tokio::test]
#[ignore = "requires a running Redis at localhost:6379"]
async fn concurrent_hits_never_over_admit() {
    let limiter = limiter().await;
    let endpoint = unique_endpoint("concurrent");

    let headers = headers_from(&[
        ("x-app-rate-limit", "5:120"),
        ("x-method-rate-limit", "50:10"),
    ]);
    limiter
        .refresh(&headers, RoutingVal::Euw1, &endpoint)
        .await
        .unwrap();

    let mut tasks = Vec::new();
    for _ in 0..20 {
        let limiter = limiter.clone();
        let endpoint = endpoint.clone();
        tasks.push(tokio::spawn(async move {
            limiter.hit(RoutingVal::Euw1, &endpoint).await.unwrap()
        }));
    }

    let mut allowed = 0;
    for task in tasks {
        if task.await.unwrap().is_allowed() {
            allowed += 1;
        }
    }
    assert_eq!(allowed, 5, "the script must admit exactly the limit");
}
