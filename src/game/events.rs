//! Game Events
//!
//! Notices produced by session operations. The engine never talks to
//! connections itself; it returns a [`Transition`] and the network layer
//! delivers the notices and schedules any requested timer.

use std::time::Duration;
use serde::{Serialize, Deserialize};

use crate::core::id::{CharacterId, PlayerId};
use crate::game::meeting::RoundToken;
use crate::game::state::{PlayerSummary, Role};
use crate::game::tasks::TaskStatus;
use crate::game::vote::Ballots;
use crate::game::win::Winner;

/// Who receives a notice.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Audience {
    /// Every connected player.
    All,
    /// One player only.
    Player(PlayerId),
}

/// Player identity revealed after an ejection or at game end.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevealedPlayer {
    /// Player id.
    pub id: PlayerId,
    /// Display name.
    pub name: String,
    /// Sprite.
    pub character: Option<CharacterId>,
    /// Role.
    pub role: Option<Role>,
}

/// Game event data.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GameEvent {
    /// Roster changed.
    PlayersUpdate {
        players: Vec<PlayerSummary>,
        leader_id: Option<PlayerId>,
    },

    /// Private role and sprite for the round.
    RoleAssigned {
        role: Role,
        character: CharacterId,
    },

    /// Round started.
    GameStart,

    /// Private task list.
    TaskList {
        tasks: Vec<TaskStatus>,
    },

    /// Global task progress.
    GlobalProgress {
        percent: u8,
    },

    /// Tasks locked for everyone.
    SabotageStarted {
        duration: Duration,
    },

    /// Emergency meeting called.
    EmergencyFlash {
        caller_id: PlayerId,
        caller_name: String,
    },

    /// Meeting countdown.
    CountdownTick {
        seconds_left: u32,
    },

    /// Voting opened.
    VoteStarted {
        time_left: u32,
    },

    /// Ballots or remaining time changed.
    VoteUpdate {
        time_left: u32,
        ballots: Ballots,
    },

    /// A body was reported.
    ReportNotice {
        reporter_id: PlayerId,
        reported_id: PlayerId,
        name: String,
        character: Option<CharacterId>,
    },

    /// Vote resolved.
    EjectionResult {
        ejected: Option<RevealedPlayer>,
    },

    /// Round decided.
    GameEnd {
        winner: Winner,
        impostors: Vec<RevealedPlayer>,
        crewmates: Vec<RevealedPlayer>,
    },

    /// Round torn down, back to the lobby.
    GameReset,
}

/// A notice with its audience.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    /// Recipients.
    pub audience: Audience,
    /// Event data.
    pub event: GameEvent,
}

impl Notice {
    /// Notice for everyone.
    pub fn all(event: GameEvent) -> Self {
        Self { audience: Audience::All, event }
    }

    /// Notice for one player.
    pub fn to(player_id: PlayerId, event: GameEvent) -> Self {
        Self { audience: Audience::Player(player_id), event }
    }
}

/// Timer the network layer must run for the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerRequest {
    /// One-second meeting countdown ticks, then open the vote.
    MeetingCountdown(RoundToken),
    /// One-second vote updates until the window closes.
    VoteWindow(RoundToken),
}

/// Result of a session operation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Transition {
    /// Notices to deliver, in order.
    pub notices: Vec<Notice>,
    /// Timer to start, if any.
    pub timer: Option<TimerRequest>,
}

impl Transition {
    /// Empty transition.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an event for everyone.
    pub fn broadcast(&mut self, event: GameEvent) {
        self.notices.push(Notice::all(event));
    }

    /// Queue an event for one player.
    pub fn send_to(&mut self, player_id: PlayerId, event: GameEvent) {
        self.notices.push(Notice::to(player_id, event));
    }

    /// Append another transition's notices; its timer wins if set.
    pub fn extend(&mut self, other: Transition) {
        self.notices.extend(other.notices);
        if other.timer.is_some() {
            self.timer = other.timer;
        }
    }

    /// Events in order, ignoring audience.
    pub fn events(&self) -> impl Iterator<Item = &GameEvent> {
        self.notices.iter().map(|n| &n.event)
    }
}

/// One step of a timer loop.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TimerStep {
    /// Deliver these notices, sleep a second, step again.
    Continue(Transition),
    /// Deliver these notices (and start their timer); this loop is finished.
    Done(Transition),
    /// The round moved on; stop without doing anything.
    Stale,
}
