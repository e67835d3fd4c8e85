//! Sampled execution primitives for periodic controllers.
//!
//! Control loops run at a fixed sample period. This module provides the period
//! configuration and the deadline clock used by [`crate::periodic::PeriodicTask`].

use std::time::{Duration, Instant};

use cg_core::{Frequency, Time, as_hertz, as_seconds, ensure_positive};
use serde::{Deserialize, Serialize};

use crate::error::ControlResult;

/// Period used whenever a caller does not supply one (20 Hz).
pub const DEFAULT_PERIOD_S: f64 = 0.05;

/// Sample configuration for a controller or output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SampleConfig {
    /// Sample period in seconds.
    pub dt: f64,
}

impl SampleConfig {
    /// Create a new sample configuration.
    ///
    /// # Arguments
    ///
    /// * `dt` - Sample period in seconds (must be positive and finite)
    pub fn new(dt: f64) -> ControlResult<Self> {
        let dt = ensure_positive(dt, "sample period must be positive")?;
        Ok(Self { dt })
    }

    /// Create a sample configuration from a loop rate.
    pub fn from_frequency(freq: Frequency) -> ControlResult<Self> {
        let freq_hz = ensure_positive(as_hertz(freq), "frequency must be positive")?;
        Self::new(1.0 / freq_hz)
    }

    /// Create a sample configuration from a period.
    pub fn from_time(period: Time) -> ControlResult<Self> {
        Self::new(as_seconds(period))
    }

    /// Get the sample frequency in Hz.
    pub fn frequency(&self) -> f64 {
        1.0 / self.dt
    }

    pub fn as_duration(&self) -> Duration {
        Duration::from_secs_f64(self.dt)
    }
}

impl Default for SampleConfig {
    fn default() -> Self {
        Self {
            dt: DEFAULT_PERIOD_S,
        }
    }
}

/// Fixed-rate deadline tracker.
///
/// Deadlines advance by exactly one period so that jitter in one tick does not
/// accumulate into drift. When a tick finishes after its successor's deadline the
/// schedule is re-based on the current time: missed ticks are skipped, never
/// replayed in a burst.
#[derive(Debug, Clone)]
pub struct SampleClock {
    period: Duration,
    next_deadline: Instant,
    overruns: u64,
}

impl SampleClock {
    /// Create a clock whose first deadline is one period after `start`.
    pub fn new(period: Duration, start: Instant) -> Self {
        Self {
            period,
            next_deadline: start + period,
            overruns: 0,
        }
    }

    pub fn deadline(&self) -> Instant {
        self.next_deadline
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Number of times the schedule had to be re-based.
    pub fn overruns(&self) -> u64 {
        self.overruns
    }

    /// Move to the next deadline after a tick completed at `now`.
    ///
    /// Returns `true` if the tick overran and the schedule was re-based.
    pub fn advance(&mut self, now: Instant) -> bool {
        self.next_deadline += self.period;
        if self.next_deadline <= now {
            self.next_deadline = now + self.period;
            self.overruns += 1;
            true
        } else {
            false
        }
    }

    /// Restart the schedule from `now`.
    pub fn reset(&mut self, now: Instant) {
        self.next_deadline = now + self.period;
    }

    /// Time until the next deadline, zero if it already passed.
    pub fn time_until_sample(&self, now: Instant) -> Duration {
        self.next_deadline.saturating_duration_since(now)
    }
}
