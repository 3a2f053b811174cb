#![forbid(unsafe_code)]

//! Injectable monotonic clock for merge-window decisions.
//!
//! The engine never reads wall-clock time directly. Every coalescing decision
//! compares [`HistoryClock::now_mono`] against the timestamp of the previous
//! material edit, so tests can drive time by hand instead of sleeping.

use core::time::Duration;

use web_time::Instant;

/// Monotonic clock abstraction.
pub trait HistoryClock {
    /// Elapsed time since an unspecified epoch, never decreasing.
    fn now_mono(&self) -> Duration;
}

/// Default clock backed by [`web_time::Instant`] (works natively and on WASM).
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl HistoryClock for MonotonicClock {
    fn now_mono(&self) -> Duration {
        self.origin.elapsed()
    }
}
