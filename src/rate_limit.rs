//! In-memory fixed-window rate limiting
//!
//! Each key gets `points` requests per window. A key's window opens with its
//! first request and resets once `window` has elapsed. State lives in the
//! process; restarting the server clears it.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Outcome of consuming one point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed { remaining: u32 },
    Limited { retry_after: Duration },
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed { .. })
    }
}

#[derive(Debug, Clone, Copy)]
struct Window {
    opened: Instant,
    consumed: u32,
}

#[derive(Debug)]
struct Buckets {
    windows: HashMap<String, Window>,
    last_prune: Instant,
}

/// Named fixed-window limiter
#[derive(Debug)]
pub struct RateLimiter {
    name: &'static str,
    points: u32,
    window: Duration,
    buckets: Mutex<Buckets>,
}

impl RateLimiter {
    pub fn new(name: &'static str, points: u32, window: Duration) -> Self {
        Self {
            name,
            points,
            window,
            buckets: Mutex::new(Buckets {
                windows: HashMap::new(),
                last_prune: Instant::now(),
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn points(&self) -> u32 {
        self.points
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Consume one point for `key`
    pub fn check(&self, key: &str) -> Decision {
        self.check_at(key, Instant::now())
    }

    /// Consume one point for `key` at a given instant
    pub fn check_at(&self, key: &str, now: Instant) -> Decision {
        let mut buckets = self.buckets.lock().unwrap_or_else(PoisonError::into_inner);

        if now.saturating_duration_since(buckets.last_prune) >= self.window {
            let window = self.window;
            let before = buckets.windows.len();
            buckets
                .windows
                .retain(|_, w| now.saturating_duration_since(w.opened) < window);
            buckets.last_prune = now;
            debug!(
                "Rate limiter '{}' pruned {} expired keys",
                self.name,
                before - buckets.windows.len()
            );
        }

        let entry = buckets.windows.entry(key.to_string()).or_insert(Window {
            opened: now,
            consumed: 0,
        });

        if now.saturating_duration_since(entry.opened) >= self.window {
            *entry = Window {
                opened: now,
                consumed: 0,
            };
        }

        if entry.consumed >= self.points {
            let retry_after = self
                .window
                .saturating_sub(now.saturating_duration_since(entry.opened));
            warn!("Rate limiter '{}' rejected key {}", self.name, key);
            return Decision::Limited { retry_after };
        }

        entry.consumed += 1;
        Decision::Allowed {
            remaining: self.points - entry.consumed,
        }
    }

    /// Number of keys currently tracked
    pub fn tracked_keys(&self) -> usize {
        self.buckets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .windows
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allows_up_to_points() {
        let limiter = RateLimiter::new("test", 3, Duration::from_secs(60));
        let now = Instant::now();
        assert_eq!(limiter.name(), "test");
        assert_eq!(limiter.points(), 3);
        assert_eq!(limiter.window(), Duration::from_secs(60));

        assert_eq!(limiter.check_at("ip", now), Decision::Allowed { remaining: 2 });
        assert_eq!(limiter.check_at("ip", now), Decision::Allowed { remaining: 1 });
        assert_eq!(limiter.check_at("ip", now), Decision::Allowed { remaining: 0 });
        assert!(!limiter.check_at("ip", now).is_allowed());
    }

    #[test]
    fn test_keys_are_independent() {
        let limiter = RateLimiter::new("test", 1, Duration::from_secs(60));
        let now = Instant::now();

        assert!(limiter.check_at("a", now).is_allowed());
        assert!(!limiter.check_at("a", now).is_allowed());
        assert!(limiter.check_at("b", now).is_allowed());
    }

    #[test]
    fn test_window_resets() {
        let limiter = RateLimiter::new("test", 1, Duration::from_secs(60));
        let start = Instant::now();

        assert!(limiter.check_at("ip", start).is_allowed());

        match limiter.check_at("ip", start + Duration::from_secs(20)) {
            Decision::Limited { retry_after } => {
                assert_eq!(retry_after, Duration::from_secs(40))
            }
            other => panic!("expected limit, got {:?}", other),
        }

        assert!(limiter
            .check_at("ip", start + Duration::from_secs(60))
            .is_allowed());
    }

    #[test]
    fn test_expired_keys_are_pruned() {
        let limiter = RateLimiter::new("test", 5, Duration::from_secs(10));
        let start = Instant::now();

        for i in 0..50 {
            limiter.check_at(&format!("client-{}", i), start);
        }
        assert_eq!(limiter.tracked_keys(), 50);

        limiter.check_at("late", start + Duration::from_secs(30));
        assert_eq!(limiter.tracked_keys(), 1);
    }
}
