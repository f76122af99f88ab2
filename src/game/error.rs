//! Game Errors
//!
//! Rejections reported synchronously to the caller of a session operation.
//! None of them are retried.

use thiserror::Error;

use crate::game::state::Phase;

/// Why a session operation was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    /// Caller may not perform a privileged action.
    #[error("not authorized: {0}")]
    NotAuthorized(&'static str),

    /// Action attempted outside the phase it is valid in.
    #[error("cannot {action} during the {phase} phase")]
    InvalidPhase {
        /// What the caller tried to do.
        action: &'static str,
        /// Phase the session was in.
        phase: Phase,
    },

    /// Non-impostor tried to sabotage.
    #[error("only impostors can sabotage")]
    NotImpostor,

    /// Id is not in the roster (or not an alive player where one is required).
    #[error("unknown player")]
    UnknownPlayer,

    /// Voter is not an alive player.
    #[error("voter is not an alive player")]
    UnknownVoter,

    /// Tasks are locked by an active sabotage.
    #[error("tasks are locked by sabotage")]
    SabotageLocked,

    /// Roster is at capacity.
    #[error("lobby is full ({max} players)")]
    LobbyFull {
        /// Configured maximum.
        max: usize,
    },

    /// Malformed input.
    #[error("invalid request: {0}")]
    Validation(String),
}

impl GameError {
    /// Shorthand for an invalid-phase rejection.
    pub fn invalid_phase(action: &'static str, phase: Phase) -> Self {
        Self::InvalidPhase { action, phase }
    }

    /// Shorthand for a validation rejection.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}
