//! Rolling throughput measurement.
//!
//! Time is read from a monotonic clock at nanosecond resolution but all
//! rate arithmetic runs in whole microseconds with a 128-bit intermediate,
//! so `bytes * 1_000_000` cannot overflow for any device size.

use crate::record::ThroughputSample;
use std::time::{Duration, Instant};

const MICROS_PER_SEC: u128 = 1_000_000;

/// Bytes per second for `bytes` moved in `elapsed_us` microseconds.
/// Returns 0 for an empty interval.
///
/// ```
/// use blkverify_core::throughput::bytes_per_second;
///
/// assert_eq!(bytes_per_second(4096, 2), 2_048_000_000);
/// assert_eq!(bytes_per_second(4096, 0), 0);
/// ```
#[must_use]
pub fn bytes_per_second(bytes: u64, elapsed_us: u64) -> u64 {
    if elapsed_us == 0 {
        return 0;
    }
    let rate = u128::from(bytes) * MICROS_PER_SEC / u128::from(elapsed_us);
    u64::try_from(rate).unwrap_or(u64::MAX)
}

/// Whole microseconds in `d`, saturating.
#[must_use]
pub fn micros(d: Duration) -> u64 {
    u64::try_from(d.as_micros()).unwrap_or(u64::MAX)
}

/// Tracks one phase: the window since the last sample and the phase total.
#[derive(Debug, Clone)]
pub struct ThroughputMeter {
    started: Instant,
    window_start: Instant,
    window_bytes: u64,
}

impl ThroughputMeter {
    /// Start measuring at `now`.
    #[must_use]
    pub fn new(now: Instant) -> Self {
        Self {
            started: now,
            window_start: now,
            window_bytes: 0,
        }
    }

    /// Close the current window at `now` if any whole microsecond has
    /// passed. `cumulative_bytes` is the phase total so far. An empty
    /// window returns `None` and stays open.
    pub fn sample(&mut self, now: Instant, cumulative_bytes: u64) -> Option<ThroughputSample> {
        let elapsed_us = micros(now.saturating_duration_since(self.window_start));
        if elapsed_us == 0 {
            return None;
        }
        let delta = cumulative_bytes.saturating_sub(self.window_bytes);
        self.window_start = now;
        self.window_bytes = cumulative_bytes;
        Some(ThroughputSample {
            cumulative_bytes,
            elapsed_us,
            bytes_per_sec: bytes_per_second(delta, elapsed_us),
        })
    }

    /// Microseconds from the start of the phase to `now`.
    #[must_use]
    pub fn total_us(&self, now: Instant) -> u64 {
        micros(now.saturating_duration_since(self.started))
    }
}
