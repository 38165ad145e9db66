//! Minimum-interval throttle for telemetry-triggered refreshes.
//!
//! Telemetry arrives around twenty times a second; a burst of state
//! changes should cause at most one extra refresh per interval.

use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Lets one caller through per `min_interval`.
#[derive(Debug)]
pub struct BurstThrottle {
    min_interval: Duration,
    last: Mutex<Option<Instant>>,
}

impl BurstThrottle {
    /// Create a throttle that has never fired.
    pub const fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last: Mutex::new(None),
        }
    }

    /// Record an attempt at `now`; `true` if it may proceed.
    pub fn try_acquire(&self, now: Instant) -> bool {
        let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
        let allowed = last.is_none_or(|at| now.saturating_duration_since(at) >= self.min_interval);
        if allowed {
            *last = Some(now);
        }
        allowed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_one_per_interval() {
        let throttle = BurstThrottle::new(Duration::from_secs(2));
        let t0 = Instant::now();
        assert!(throttle.try_acquire(t0));
        assert!(!throttle.try_acquire(t0 + Duration::from_millis(500)));
        assert!(!throttle.try_acquire(t0 + Duration::from_millis(1999)));
        assert!(throttle.try_acquire(t0 + Duration::from_secs(2)));
        assert!(!throttle.try_acquire(t0 + Duration::from_millis(2100)));
    }

    #[test]
    fn zero_interval_never_throttles() {
        let throttle = BurstThrottle::new(Duration::ZERO);
        let t0 = Instant::now();
        assert!(throttle.try_acquire(t0));
        assert!(throttle.try_acquire(t0));
    }
}
