use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;

pub const MAX_FAILURES: u32 = 5;
pub const FAILURE_WINDOW: Duration = Duration::from_secs(15 * 60);
pub const LOCKOUT: Duration = Duration::from_secs(15 * 60);

/// Failed-login bookkeeping. The in-memory implementation is per process; a
/// multi-instance deployment plugs in a shared store behind the same trait.
#[async_trait]
pub trait LoginThrottle: Send + Sync {
    async fn is_locked(&self, key: &str) -> bool;
    async fn record_failure(&self, key: &str);
    async fn reset(&self, key: &str);
}

#[derive(Debug, Clone, Copy)]
struct Attempts {
    count: u32,
    first_failure: Instant,
    locked_until: Option<Instant>,
}

pub struct InMemoryLoginThrottle {
    entries: Mutex<HashMap<String, Attempts>>,
    max_failures: u32,
    window: Duration,
    lockout: Duration,
}

impl Default for InMemoryLoginThrottle {
    fn default() -> Self {
        Self::new(MAX_FAILURES, FAILURE_WINDOW, LOCKOUT)
    }
}

impl InMemoryLoginThrottle {
    pub fn new(max_failures: u32, window: Duration, lockout: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            max_failures,
            window,
            lockout,
        }
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, Attempts>> {
        // The map holds plain counters; a panic mid-update cannot leave it inconsistent.
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn is_locked_at(&self, key: &str, now: Instant) -> bool {
        self.entries()
            .get(key)
            .and_then(|a| a.locked_until)
            .map(|until| now < until)
            .unwrap_or(false)
    }

    pub fn record_failure_at(&self, key: &str, now: Instant) {
        let mut entries = self.entries();
        let attempts = entries.entry(key.to_string()).or_insert(Attempts {
            count: 0,
            first_failure: now,
            locked_until: None,
        });

        if now.duration_since(attempts.first_failure) > self.window {
            *attempts = Attempts {
                count: 0,
                first_failure: now,
                locked_until: None,
            };
        }

        attempts.count += 1;
        if attempts.count >= self.max_failures {
            attempts.locked_until = Some(now + self.lockout);
            tracing::warn!(key, failures = attempts.count, "login locked out");
        }
    }

    pub fn reset_key(&self, key: &str) {
        self.entries().remove(key);
    }
}

#[async_trait]
impl LoginThrottle for InMemoryLoginThrottle {
    async fn is_locked(&self, key: &str) -> bool {
        self.is_locked_at(key, Instant::now())
    }

    async fn record_failure(&self, key: &str) {
        self.record_failure_at(key, Instant::now())
    }

    async fn reset(&self, key: &str) {
        self.reset_key(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locks_after_threshold() {
        let throttle = InMemoryLoginThrottle::default();
        let now = Instant::now();

        for _ in 0..MAX_FAILURES - 1 {
            throttle.record_failure_at("email:a@example.com", now);
        }
        assert!(!throttle.is_locked_at("email:a@example.com", now));

        throttle.record_failure_at("email:a@example.com", now);
        assert!(throttle.is_locked_at("email:a@example.com", now));
        assert!(!throttle.is_locked_at("email:b@example.com", now));
    }

    #[test]
    fn test_lock_expires() {
        let throttle = InMemoryLoginThrottle::default();
        let now = Instant::now();
        for _ in 0..MAX_FAILURES {
            throttle.record_failure_at("ip:198.51.100.7", now);
        }
        assert!(throttle.is_locked_at("ip:198.51.100.7", now + LOCKOUT - Duration::from_secs(1)));
        assert!(!throttle.is_locked_at("ip:198.51.100.7", now + LOCKOUT));
    }

    #[test]
    fn test_failures_outside_window_start_over() {
        let throttle = InMemoryLoginThrottle::default();
        let start = Instant::now();
        for _ in 0..MAX_FAILURES - 1 {
            throttle.record_failure_at("k", start);
        }
        let later = start + FAILURE_WINDOW + Duration::from_secs(1);
        throttle.record_failure_at("k", later);
        assert!(!throttle.is_locked_at("k", later));
    }

    #[tokio::test]
    async fn test_reset_clears_lock() {
        let throttle = InMemoryLoginThrottle::default();
        for _ in 0..MAX_FAILURES {
            throttle.record_failure("k").await;
        }
        assert!(throttle.is_locked("k").await);
        throttle.reset("k").await;
        assert!(!throttle.is_locked("k").await);
    }
}
