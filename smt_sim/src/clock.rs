//! Shared simulation clock.
//!
//! The axis reads the clock on every channel access; the sequencer advances
//! it through [`Pacer::pause`]. In virtual mode a pause adds the interval
//! without blocking, in wall mode it sleeps.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use smt_core::pacer::Pacer;

/// How simulated time advances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClockMode {
    /// Time only moves on pauses.
    #[default]
    Virtual,
    /// Time follows the host monotonic clock.
    Wall,
}

#[derive(Debug)]
enum ClockState {
    Virtual(Duration),
    Wall(Instant),
}

/// Cloneable handle to one clock. All clones observe the same time.
#[derive(Debug, Clone)]
pub struct SimClock {
    state: Arc<Mutex<ClockState>>,
}

impl SimClock {
    pub fn new(mode: ClockMode) -> Self {
        let state = match mode {
            ClockMode::Virtual => ClockState::Virtual(Duration::ZERO),
            ClockMode::Wall => ClockState::Wall(Instant::now()),
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn virtual_clock() -> Self {
        Self::new(ClockMode::Virtual)
    }

    pub fn wall() -> Self {
        Self::new(ClockMode::Wall)
    }

    pub fn mode(&self) -> ClockMode {
        match *self.state.lock() {
            ClockState::Virtual(_) => ClockMode::Virtual,
            ClockState::Wall(_) => ClockMode::Wall,
        }
    }

    /// Time since the clock was created.
    pub fn now(&self) -> Duration {
        match *self.state.lock() {
            ClockState::Virtual(now) => now,
            ClockState::Wall(origin) => origin.elapsed(),
        }
    }

    /// Advance virtual time. No effect on a wall clock.
    pub fn advance(&self, by: Duration) {
        if let ClockState::Virtual(now) = &mut *self.state.lock() {
            *now += by;
        }
    }
}

impl Default for SimClock {
    fn default() -> Self {
        Self::virtual_clock()
    }
}

impl Pacer for SimClock {
    fn pause(&mut self, interval: Duration) {
        match self.mode() {
            ClockMode::Virtual => self.advance(interval),
            ClockMode::Wall => thread::sleep(interval),
        }
    }
}
