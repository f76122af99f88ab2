//! Game Rules
//!
//! Limits and timings for a session. Loaded once at startup.

use std::time::Duration;
use thiserror::Error;

use crate::core::catalog::{TaskCatalog, TaskKind};
use crate::game::roles::impostor_count;

/// Rule validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RulesError {
    /// A duration or count that must be positive was zero.
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
    /// Minimum above maximum.
    #[error("min_players ({min}) exceeds max_players ({max})")]
    MinAboveMax {
        /// Configured minimum.
        min: usize,
        /// Configured maximum.
        max: usize,
    },
    /// The catalog cannot give every player a full hand.
    #[error("task catalog has {available} {kind:?} tasks, a full lobby needs {needed}")]
    CatalogTooSmall {
        /// Kind that runs short.
        kind: TaskKind,
        /// Tasks needed by the largest deal.
        needed: usize,
        /// Tasks of that kind in the catalog.
        available: usize,
    },
}

/// Configuration for a game session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameRules {
    /// Maximum players in the lobby.
    pub max_players: usize,
    /// Minimum players to start a round.
    pub min_players: usize,
    /// Tasks each player draws at round start.
    pub tasks_per_player: usize,
    /// How long a sabotage locks tasks.
    pub sabotage_duration: Duration,
    /// Meeting countdown before voting (seconds, one broadcast per second).
    pub meeting_countdown_secs: u32,
    /// Voting window.
    pub vote_duration: Duration,
    /// Longest accepted display name (characters).
    pub max_name_len: usize,
}

impl Default for GameRules {
    fn default() -> Self {
        Self {
            max_players: 13,
            min_players: 4,
            tasks_per_player: 5,
            sabotage_duration: Duration::from_secs(60),
            meeting_countdown_secs: 10,
            vote_duration: Duration::from_secs(120),
            max_name_len: 24,
        }
    }
}

impl GameRules {
    /// Check the rules are playable.
    pub fn validate(&self) -> Result<(), RulesError> {
        if self.max_players == 0 {
            return Err(RulesError::Zero("max_players"));
        }
        if self.min_players == 0 {
            return Err(RulesError::Zero("min_players"));
        }
        if self.min_players > self.max_players {
            return Err(RulesError::MinAboveMax {
                min: self.min_players,
                max: self.max_players,
            });
        }
        if self.tasks_per_player == 0 {
            return Err(RulesError::Zero("tasks_per_player"));
        }
        if self.sabotage_duration.is_zero() {
            return Err(RulesError::Zero("sabotage_duration"));
        }
        if self.vote_duration.is_zero() {
            return Err(RulesError::Zero("vote_duration"));
        }
        if self.max_name_len == 0 {
            return Err(RulesError::Zero("max_name_len"));
        }
        Ok(())
    }

    /// Check the catalog can deal `tasks_per_player` exclusive tasks to every
    /// player at any lobby size the rules allow.
    pub fn check_catalog(&self, catalog: &TaskCatalog) -> Result<(), RulesError> {
        let mut needed_normal = 0;
        let mut needed_sabotage = 0;
        for players in self.min_players..=self.max_players {
            let impostors = impostor_count(players).min(players);
            needed_normal = needed_normal.max((players - impostors) * self.tasks_per_player);
            needed_sabotage = needed_sabotage.max(impostors * self.tasks_per_player);
        }

        for (kind, needed) in [(TaskKind::Normal, needed_normal), (TaskKind::Sabotage, needed_sabotage)] {
            let available = catalog.count_of(kind);
            if available < needed {
                return Err(RulesError::CatalogTooSmall { kind, needed, available });
            }
        }
        Ok(())
    }
}
