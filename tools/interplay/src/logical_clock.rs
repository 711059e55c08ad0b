//! Process-wide logical clock that totally orders recorded interactions.
//!
//! Every [`crate::recorder::Recorder`] draws its timestamps from a shared
//! [`LogicalClock`]. Recorders that should be merged chronologically must share
//! the same clock instance; [`shared_clock`] is the default they all use.

use std::sync::{Arc, OnceLock, RwLock};

/// A point in logical time. Issued values are unique and strictly increasing.
pub type Timestamp = u64;

#[derive(Debug, Default)]
pub struct LogicalClock {
    last: RwLock<Timestamp>,
}

impl LogicalClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advances the clock and returns the new timestamp.
    pub fn next(&self) -> Timestamp {
        let mut last = self.last.write().expect("logical clock lock");
        *last += 1;
        *last
    }

    /// Returns the last issued timestamp without advancing the clock.
    pub fn current(&self) -> Timestamp {
        *self.last.read().expect("logical clock lock")
    }

    /// Rewinds the clock to zero. Only safe while no recorder that uses this
    /// clock still holds entries that will be merged with future ones.
    pub fn reset(&self) {
        *self.last.write().expect("logical clock lock") = 0;
    }
}

static SHARED_CLOCK: OnceLock<Arc<LogicalClock>> = OnceLock::new();

/// The clock used by recorders created without an explicit clock.
pub fn shared_clock() -> Arc<LogicalClock> {
    Arc::clone(SHARED_CLOCK.get_or_init(|| Arc::new(LogicalClock::new())))
}
