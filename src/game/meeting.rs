//! Meeting Countdown
//!
//! Emergency calls and body reports both open a meeting: a fixed countdown
//! after which voting starts. Every meeting gets a fresh [`RoundToken`]; timers
//! carry the token they were scheduled with and are ignored once it is stale.

use serde::{Serialize, Deserialize};

use crate::core::id::PlayerId;

/// Identifies one meeting (and the vote that follows it).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoundToken(pub u64);

impl RoundToken {
    /// The token after this one.
    pub fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

/// What opened the meeting.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MeetingCause {
    /// Someone pressed the emergency button.
    Emergency {
        /// Caller.
        caller: PlayerId,
    },
    /// Someone reported a body.
    Report {
        /// Reporter.
        reporter: PlayerId,
        /// Reported (now a ghost).
        reported: PlayerId,
    },
}

/// One step of the countdown.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Countdown {
    /// Broadcast this many seconds left, then wait a second.
    Remaining(u32),
    /// Countdown finished; open the vote.
    Elapsed,
}

/// Countdown bookkeeping for the current meeting.
#[derive(Clone, Debug, Default)]
pub struct MeetingClock {
    token: RoundToken,
    remaining: Option<u32>,
    cause: Option<MeetingCause>,
}

impl MeetingClock {
    /// Create an idle clock.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new meeting with a countdown of `seconds`.
    pub fn begin(&mut self, cause: MeetingCause, seconds: u32) -> RoundToken {
        self.token = self.token.next();
        self.remaining = Some(seconds);
        self.cause = Some(cause);
        self.token
    }

    /// Advance the countdown for `token`. `None` if the token is stale
    /// or the countdown already finished.
    pub fn tick(&mut self, token: RoundToken) -> Option<Countdown> {
        if token != self.token {
            return None;
        }
        let remaining = self.remaining?;
        if remaining == 0 {
            self.remaining = None;
            return Some(Countdown::Elapsed);
        }
        self.remaining = Some(remaining - 1);
        Some(Countdown::Remaining(remaining))
    }

    /// Token of the current (or last) meeting.
    pub fn token(&self) -> RoundToken {
        self.token
    }

    /// Is `token` the current meeting?
    pub fn is_current(&self, token: RoundToken) -> bool {
        token == self.token
    }

    /// What opened the current meeting.
    pub fn cause(&self) -> Option<MeetingCause> {
        self.cause
    }

    /// Make every outstanding timer stale.
    pub fn invalidate(&mut self) -> RoundToken {
        self.token = self.token.next();
        self.remaining = None;
        self.cause = None;
        self.token
    }
}
