//! Lightweight tick timing utilities.
//!
//! Periodic control tasks record how long each evaluation took so callers can
//! check that a loop comfortably fits inside its period.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Accumulating timer for tracking total time across multiple calls.
///
/// Lock-free, so it may be shared between a periodic task and the thread reading
/// the statistics.
#[derive(Debug)]
pub struct AccumulatingTimer {
    total_ns: AtomicU64,
    max_ns: AtomicU64,
    count: AtomicU64,
}

impl Default for AccumulatingTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl AccumulatingTimer {
    /// Create a new accumulating timer.
    pub const fn new() -> Self {
        Self {
            total_ns: AtomicU64::new(0),
            max_ns: AtomicU64::new(0),
            count: AtomicU64::new(0),
        }
    }

    /// Record a timing measurement.
    pub fn record(&self, elapsed: Duration) {
        let nanos = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
        self.total_ns.fetch_add(nanos, Ordering::Relaxed);
        self.max_ns.fetch_max(nanos, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    /// Get total time spent (in seconds).
    pub fn total_seconds(&self) -> f64 {
        self.total_ns.load(Ordering::Relaxed) as f64 / 1e9
    }

    /// Longest single measurement (in seconds).
    pub fn max_seconds(&self) -> f64 {
        self.max_ns.load(Ordering::Relaxed) as f64 / 1e9
    }

    /// Get number of calls.
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    /// Get average time per call (in seconds).
    pub fn average_seconds(&self) -> f64 {
        let count = self.count();
        if count > 0 {
            self.total_seconds() / count as f64
        } else {
            0.0
        }
    }

    /// Snapshot the current statistics.
    pub fn stats(&self) -> TickStats {
        TickStats {
            count: self.count(),
            average_s: self.average_seconds(),
            max_s: self.max_seconds(),
        }
    }

    /// Reset the timer.
    pub fn reset(&self) {
        self.total_ns.store(0, Ordering::Relaxed);
        self.max_ns.store(0, Ordering::Relaxed);
        self.count.store(0, Ordering::Relaxed);
    }
}

/// Point-in-time copy of an [`AccumulatingTimer`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TickStats {
    pub count: u64,
    pub average_s: f64,
    pub max_s: f64,
}
