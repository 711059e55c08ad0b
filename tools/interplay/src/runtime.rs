//! Wall-clock seam for polling verification.

use crate::errors::InterplayError;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

pub trait Clock: Send + Sync {
    fn now(&self) -> SystemTime;

    /// Blocks until `deadline`. Returns at once for a deadline in the past.
    fn sleep_until(&self, deadline: SystemTime) -> Result<(), InterplayError>;
}

/// Real time, blocking the calling thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProductionClock;

impl Clock for ProductionClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }

    fn sleep_until(&self, deadline: SystemTime) -> Result<(), InterplayError> {
        match deadline.duration_since(SystemTime::now()) {
            Ok(remaining) if !remaining.is_zero() => std::thread::sleep(remaining),
            _ => {}
        }
        Ok(())
    }
}

#[derive(Debug)]
struct FakeTime {
    now: SystemTime,
    sleeps: Vec<SystemTime>,
}

/// Deterministic clock for poll-loop tests. Sleeping jumps straight to the
/// deadline (never backwards) and every requested deadline is kept.
#[derive(Debug, Clone)]
pub struct FakeClock {
    state: Arc<Mutex<FakeTime>>,
}

impl FakeClock {
    pub fn new(now: SystemTime) -> Self {
        Self {
            state: Arc::new(Mutex::new(FakeTime {
                now,
                sleeps: Vec::new(),
            })),
        }
    }

    /// Moves time forward without recording a sleep, as if the verifier's own
    /// matching pass had taken `by`.
    pub fn advance(&self, by: Duration) {
        let mut state = self.state.lock().expect("fake clock lock");
        state.now += by;
    }

    pub fn sleeps(&self) -> Vec<SystemTime> {
        self.state.lock().expect("fake clock lock").sleeps.clone()
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new(SystemTime::UNIX_EPOCH)
    }
}

impl Clock for FakeClock {
    fn now(&self) -> SystemTime {
        self.state.lock().expect("fake clock lock").now
    }

    fn sleep_until(&self, deadline: SystemTime) -> Result<(), InterplayError> {
        let mut state = self.state.lock().expect("fake clock lock");
        state.sleeps.push(deadline);
        state.now = state.now.max(deadline);
        Ok(())
    }
}
