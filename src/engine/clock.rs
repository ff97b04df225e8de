//! Monotonic time sources
//!
//! Times are seconds as `f64`, the same unit the backend schedules in.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Source of the current engine time
pub trait Clock {
    /// Seconds since the clock's origin
    fn now(&self) -> f64;
}

/// Wall clock measured from creation
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// Externally driven clock; clones share the same time
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    bits: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Jump to `seconds`; time never moves backwards
    pub fn set(&self, seconds: f64) {
        if seconds > self.now() {
            self.bits.store(seconds.to_bits(), Ordering::SeqCst);
        }
    }

    pub fn advance(&self, seconds: f64) {
        self.set(self.now() + seconds.max(0.0));
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::SeqCst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_shared() {
        let clock = ManualClock::new();
        let handle = clock.clone();
        assert_eq!(clock.now(), 0.0);

        handle.advance(0.5);
        assert_eq!(clock.now(), 0.5);

        handle.set(2.0);
        assert_eq!(clock.now(), 2.0);
    }

    #[test]
    fn test_manual_clock_monotonic() {
        let clock = ManualClock::new();
        clock.set(3.0);
        clock.set(1.0);
        clock.advance(-1.0);
        assert_eq!(clock.now(), 3.0);
    }

    #[test]
    fn test_system_clock_advances() {
        let clock = SystemClock::new();
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }
}
