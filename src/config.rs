//! Configuration
//!
//! Everything is read from the environment once at startup. Unset variables
//! fall back to the defaults of [`ServerConfig`] and [`GameRules`].
//!
//! | Variable | Meaning |
//! |---|---|
//! | `SUS_BIND_ADDR` | Listen address, e.g. `0.0.0.0:8080` |
//! | `SUS_MAX_CONNECTIONS` | Concurrent WebSocket connections |
//! | `SUS_MAX_PLAYERS` | Lobby capacity |
//! | `SUS_MIN_PLAYERS` | Players needed to start |
//! | `SUS_TASKS_PER_PLAYER` | Tasks dealt per player |
//! | `SUS_SABOTAGE_SECS` | Sabotage lock length |
//! | `SUS_MEETING_COUNTDOWN_SECS` | Countdown before a vote |
//! | `SUS_VOTE_SECS` | Voting window |
//! | `SUS_TASK_CATALOG` | Path to a JSON task catalog |

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub use crate::game::rules::GameRules;
pub use crate::network::server::ServerConfig;

use crate::core::catalog::{CatalogError, TaskCatalog};
use crate::game::rules::RulesError;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A variable was set but could not be parsed.
    #[error("invalid value {value:?} for {key}")]
    InvalidValue {
        /// Variable name.
        key: &'static str,
        /// Raw value.
        value: String,
    },

    /// Values parsed but the rules are not playable.
    #[error("invalid game rules: {0}")]
    Rules(#[from] RulesError),

    /// The task catalog file could not be loaded.
    #[error("failed to load task catalog {}: {source}", path.display())]
    Catalog {
        /// Catalog file.
        path: PathBuf,
        /// Underlying error.
        source: CatalogError,
    },
}

/// Full application configuration.
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    /// Transport settings.
    pub server: ServerConfig,
    /// Game rules.
    pub rules: GameRules,
    /// Task catalog file; the built-in catalog is used when unset.
    pub task_catalog: Option<PathBuf>,
}

impl AppConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create config from any key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(addr) = parse(&lookup, "SUS_BIND_ADDR")? {
            config.server.bind_addr = addr;
        }
        if let Some(max) = parse(&lookup, "SUS_MAX_CONNECTIONS")? {
            config.server.max_connections = max;
        }

        let rules = &mut config.rules;
        if let Some(max) = parse(&lookup, "SUS_MAX_PLAYERS")? {
            rules.max_players = max;
        }
        if let Some(min) = parse(&lookup, "SUS_MIN_PLAYERS")? {
            rules.min_players = min;
        }
        if let Some(count) = parse(&lookup, "SUS_TASKS_PER_PLAYER")? {
            rules.tasks_per_player = count;
        }
        if let Some(secs) = parse(&lookup, "SUS_SABOTAGE_SECS")? {
            rules.sabotage_duration = Duration::from_secs(secs);
        }
        if let Some(secs) = parse(&lookup, "SUS_MEETING_COUNTDOWN_SECS")? {
            rules.meeting_countdown_secs = secs;
        }
        if let Some(secs) = parse(&lookup, "SUS_VOTE_SECS")? {
            rules.vote_duration = Duration::from_secs(secs);
        }
        rules.validate()?;

        config.task_catalog = lookup("SUS_TASK_CATALOG")
            .filter(|path| !path.trim().is_empty())
            .map(PathBuf::from);

        Ok(config)
    }

    /// Load the configured task catalog, or the built-in one, and check it
    /// can fill every hand under the rules.
    pub fn load_catalog(&self) -> Result<TaskCatalog, ConfigError> {
        let catalog = match &self.task_catalog {
            Some(path) => TaskCatalog::load(path).map_err(|source| ConfigError::Catalog {
                path: path.clone(),
                source,
            })?,
            None => TaskCatalog::default(),
        };
        self.rules.check_catalog(&catalog)?;
        Ok(catalog)
    }
}

fn parse<F, T>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { key, value: raw }),
    }
}
