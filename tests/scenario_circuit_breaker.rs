//! Seed scenario: consecutive backend failures trip the circuit breaker to
//! open, short-circuiting further calls without even attempting the
//! operation, until the recovery timeout elapses.

use std::time::Duration;

use readerforge_ratelimit::{CircuitBreakerConfig, KeyConfig, RateLimitError, RateLimiter};

fn config(failure_threshold: u32) -> KeyConfig {
    KeyConfig {
        burst_capacity: 100,
        requests_per_minute: 6000,
        queue_capacity: 16,
        queue_timeout: Duration::from_secs(1),
        breaker: CircuitBreakerConfig {
            failure_threshold,
            recovery_timeout: Duration::from_millis(50),
            half_open_max_calls: 1,
        },
    }
}

#[test]
fn consecutive_failures_trip_the_breaker_open() {
    let limiter = RateLimiter::new(8);
    let config = config(3);

    for _ in 0..3 {
        let result: Result<(), RateLimitError<&'static str>> =
            limiter.execute("flaky-backend", &config, || Err("boom"));
        assert!(matches!(result, Err(RateLimitError::Operation("boom"))));
    }

    let tripped: Result<(), RateLimitError<&'static str>> =
        limiter.execute("flaky-backend", &config, || Ok(()));
    assert!(
        matches!(tripped, Err(RateLimitError::CircuitOpen { .. })),
        "a call attempted while the breaker is open should never reach the operation"
    );
}

#[test]
fn breaker_recovers_after_the_timeout_elapses() {
    let limiter = RateLimiter::new(8);
    let config = config(1);

    let _: Result<(), RateLimitError<&'static str>> =
        limiter.execute("recovering-backend", &config, || Err("boom"));

    std::thread::sleep(Duration::from_millis(80));

    let recovered: Result<(), RateLimitError<&'static str>> =
        limiter.execute("recovering-backend", &config, || Ok(()));
    assert!(recovered.is_ok(), "a half-open trial call should be allowed through after recovery_timeout");
}
