#![forbid(unsafe_code)]

//! Hand-driven clock for merge-window tests.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use rewind_history::HistoryClock;

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<Duration>,
}

impl ManualClock {
    /// New clock at zero, ready to hand to [`SharedHistory::with_clock`].
    ///
    /// [`SharedHistory::with_clock`]: rewind_history::SharedHistory::with_clock
    #[must_use]
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }

    pub fn advance_ms(&self, ms: u64) {
        self.advance(Duration::from_millis(ms));
    }

    pub fn set(&self, now: Duration) {
        self.now.set(now);
    }
}

impl HistoryClock for ManualClock {
    fn now_mono(&self) -> Duration {
        self.now.get()
    }
}
