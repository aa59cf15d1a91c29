//! Escalating backoff for idle worker loops.

use std::hint::spin_loop;
use std::thread;
use std::time::Duration;

/// Spin, then yield, then park with a timeout.
///
/// Parking uses [`thread::park_timeout`], so an `unpark` from a submitter
/// wakes the worker before the timeout expires.
#[derive(Debug)]
pub struct Backoff {
    step: u32,
    park_timeout: Duration,
}

impl Backoff {
    const SPIN_LIMIT: u32 = 6;
    const YIELD_LIMIT: u32 = 10;

    pub fn new(park_timeout: Duration) -> Self {
        Self {
            step: 0,
            park_timeout,
        }
    }

    pub fn reset(&mut self) {
        self.step = 0;
    }

    /// Perform one step of backoff
    pub fn snooze(&mut self) {
        if self.step <= Self::SPIN_LIMIT {
            for _ in 0..(1 << self.step) {
                spin_loop();
            }
        } else if self.step <= Self::YIELD_LIMIT {
            thread::yield_now();
        } else {
            thread::park_timeout(self.park_timeout);
        }

        if self.step <= Self::YIELD_LIMIT {
            self.step += 1;
        }
    }

    #[cfg(test)]
    fn is_parking(&self) -> bool {
        self.step > Self::YIELD_LIMIT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_progression() {
        let mut backoff = Backoff::new(Duration::from_micros(10));

        assert!(!backoff.is_parking());

        for _ in 0..20 {
            backoff.snooze();
        }

        assert!(backoff.is_parking());
    }

    #[test]
    fn test_backoff_reset() {
        let mut backoff = Backoff::new(Duration::from_micros(10));

        for _ in 0..20 {
            backoff.snooze();
        }
        assert!(backoff.is_parking());

        backoff.reset();
        assert!(!backoff.is_parking());
    }
}
