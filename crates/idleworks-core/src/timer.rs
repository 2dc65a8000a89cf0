//! Countdown timers advanced once per simulation step.
//!
//! Every suspended loop in the engine (spawn interval, processing delay,
//! interaction interval, idle wait, broadcast tick) is a stored [`Countdown`]
//! plus the state that tells the owner what to do when it reads zero.

use crate::fixed::Ticks;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Countdown {
    remaining: Ticks,
}

impl Countdown {
    pub fn new(ticks: Ticks) -> Self {
        Self { remaining: ticks }
    }

    /// A countdown that reads expired immediately.
    pub fn expired_now() -> Self {
        Self { remaining: 0 }
    }

    /// Advance by one tick, saturating at zero. Returns whether the
    /// countdown is expired after the decrement.
    pub fn tick(&mut self) -> bool {
        self.remaining = self.remaining.saturating_sub(1);
        self.expired()
    }

    pub fn expired(&self) -> bool {
        self.remaining == 0
    }

    pub fn reset(&mut self, ticks: Ticks) {
        self.remaining = ticks;
    }

    pub fn remaining(&self) -> Ticks {
        self.remaining
    }
}
