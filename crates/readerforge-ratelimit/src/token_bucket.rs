use std::time::Instant;

/// Per-key token bucket, refilled continuously at `requests_per_minute / 60`
/// tokens per second up to `burst_capacity`.
pub struct TokenBucket {
    capacity: f64,
    tokens: f64,
    refill_per_sec: f64,
    last_refill: Instant,
}

impl TokenBucket {
    pub fn new(burst_capacity: u32, requests_per_minute: u32) -> Self {
        Self {
            capacity: f64::from(burst_capacity),
            tokens: f64::from(burst_capacity),
            refill_per_sec: f64::from(requests_per_minute) / 60.0,
            last_refill: Instant::now(),
        }
    }

    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_per_sec).min(self.capacity);
        self.last_refill = now;
    }

    /// Attempt to consume one token. Returns `true` on success.
    pub fn try_consume(&mut self) -> bool {
        self.refill();
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consumes_up_to_burst_capacity_then_rejects() {
        let mut bucket = TokenBucket::new(2, 60);
        assert!(bucket.try_consume());
        assert!(bucket.try_consume());
        assert!(!bucket.try_consume());
    }

    #[test]
    fn refills_over_time() {
        let mut bucket = TokenBucket::new(1, 60 * 60); // 60 tokens/sec
        assert!(bucket.try_consume());
        assert!(!bucket.try_consume());
        std::thread::sleep(std::time::Duration::from_millis(50));
        assert!(bucket.try_consume());
    }
}
