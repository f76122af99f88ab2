//! Sabotage Lock
//!
//! A single global deadline that blocks task updates for every player.
//! The lock expires on its own; it is only ever read lazily.

use std::time::{Duration, Instant};

/// Shared sabotage window.
#[derive(Clone, Copy, Debug, Default)]
pub struct SabotageLock {
    deadline: Option<Instant>,
}

impl SabotageLock {
    /// Create an unlocked state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock tasks until `now + duration`. Restarts an active window.
    pub fn trigger(&mut self, now: Instant, duration: Duration) -> Instant {
        let deadline = now + duration;
        self.deadline = Some(deadline);
        deadline
    }

    /// Are tasks locked at `now`?
    pub fn is_locked(&self, now: Instant) -> bool {
        self.deadline.map(|deadline| now < deadline).unwrap_or(false)
    }

    /// Time left in the window, zero when unlocked.
    pub fn remaining(&self, now: Instant) -> Duration {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(now))
            .unwrap_or_default()
    }

    /// Forget the deadline.
    pub fn clear(&mut self) {
        self.deadline = None;
    }
}
