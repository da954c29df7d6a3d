//! Fixed-window, in-memory rate limiting
//!
//! One counter per caller key, reset when the window rolls over. Process
//! local: counts do not survive a restart. Injected through `AppState`.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Default window length
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);

/// Default request budget per window
pub const DEFAULT_MAX_REQUESTS: u32 = 20;

struct WindowState {
    window_start: Instant,
    count: u32,
}

/// Fixed-window counter keyed by caller identifier
pub struct RateLimiter {
    window: Duration,
    max_requests: u32,
    windows: Mutex<HashMap<String, WindowState>>,
}

impl RateLimiter {
    pub fn new(window: Duration, max_requests: u32) -> Self {
        Self {
            window,
            max_requests,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Record one request for `key`. Returns `false` when the caller has
    /// exhausted the current window's budget.
    pub fn check(&self, key: &str) -> bool {
        let mut windows = match self.windows.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let now = Instant::now();
        // Sweep lapsed windows so the map stays bounded by the number of
        // distinct callers within one window, not over the process lifetime.
        // This also handles rollover: a lapsed key re-enters at count 0.
        windows.retain(|_, state| now.duration_since(state.window_start) < self.window);

        let state = windows.entry(key.to_string()).or_insert(WindowState {
            window_start: now,
            count: 0,
        });

        if state.count >= self.max_requests {
            return false;
        }
        state.count += 1;
        true
    }

    /// Clear all counters (test lifecycle)
    pub fn reset(&self) {
        match self.windows.lock() {
            Ok(mut guard) => guard.clear(),
            Err(poisoned) => poisoned.into_inner().clear(),
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW, DEFAULT_MAX_REQUESTS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_budget_enforced_per_key() {
        let limiter = RateLimiter::new(Duration::from_secs(60), 3);
        assert!(limiter.check("a"));
        assert!(limiter.check("a"));
        assert!(limiter.check("a"));
        assert!(!limiter.check("a"));
        // Separate key gets its own window
        assert!(limiter.check("b"));
    }

    #[test]
    fn test_window_rollover_resets_count() {
        let limiter = RateLimiter::new(Duration::from_millis(10), 1);
        assert!(limiter.check("a"));
        assert!(!limiter.check("a"));
        std::thread::sleep(Duration::from_millis(15));
        assert!(limiter.check("a"));
    }

    #[test]
    fn test_lapsed_keys_evicted() {
        let limiter = RateLimiter::new(Duration::from_millis(10), 5);
        assert!(limiter.check("a"));
        assert!(limiter.check("b"));
        std::thread::sleep(Duration::from_millis(15));
        assert!(limiter.check("c"));

        let windows = limiter.windows.lock().unwrap();
        assert_eq!(windows.len(), 1);
        assert!(windows.contains_key("c"));
    }

    #[test]
    fn test_reset_clears_counters() {
        let limiter = RateLimiter::new(Duration::from_secs(60), 1);
        assert!(limiter.check("a"));
        assert!(!limiter.check("a"));
        limiter.reset();
        assert!(limiter.check("a"));
    }
}
