//! Simulated work durations.

use crate::error::{Error, Result};
use rand::Rng;
use std::fmt;
use std::time::Duration;

/// Supplies the duration each simulated unit sleeps for.
pub trait DelayProvider: fmt::Debug + Send + Sync {
    fn next_delay(&self) -> Duration;
}

/// Uniformly random delay in `[lower_ms, upper_ms]`, both ends inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniformDelay {
    lower_ms: u64,
    upper_ms: u64,
}

impl UniformDelay {
    pub fn new(lower_ms: u64, upper_ms: u64) -> Result<Self> {
        if lower_ms > upper_ms {
            return Err(Error::config(format!(
                "delay range is empty: [{}, {}] ms",
                lower_ms, upper_ms
            )));
        }
        Ok(Self { lower_ms, upper_ms })
    }
}

impl DelayProvider for UniformDelay {
    fn next_delay(&self) -> Duration {
        let ms = rand::thread_rng().gen_range(self.lower_ms..=self.upper_ms);
        Duration::from_millis(ms)
    }
}

/// Always the same delay; handy for deterministic tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FixedDelay(pub Duration);

impl FixedDelay {
    pub fn from_millis(ms: u64) -> Self {
        FixedDelay(Duration::from_millis(ms))
    }
}

impl DelayProvider for FixedDelay {
    fn next_delay(&self) -> Duration {
        self.0
    }
}
