//! Game Logic Module
//!
//! The session engine. Synchronous and free of I/O; time comes in as an
//! explicit `Instant` and randomness from an injected RNG.
//!
//! ## Module Structure
//!
//! - `state`: Phase, role, player and roster types
//! - `roles`: Impostor count and role/character dealing
//! - `tasks`: Per-player task lists and global progress
//! - `sabotage`: Shared task lock
//! - `meeting`: Emergency/report countdown and round tokens
//! - `vote`: Ballots and the ejection rule
//! - `win`: Winner evaluation
//! - `session`: The state machine tying it together
//! - `events`: Notices and timer requests returned to the transport

pub mod error;
pub mod events;
pub mod meeting;
pub mod roles;
pub mod rules;
pub mod sabotage;
pub mod session;
pub mod state;
pub mod tasks;
pub mod vote;
pub mod win;

// Re-export key types
pub use error::GameError;
pub use events::{Audience, GameEvent, Notice, TimerRequest, TimerStep, Transition};
pub use meeting::RoundToken;
pub use rules::GameRules;
pub use session::{GameSession, PlayerView, TaskUpdate};
pub use state::{Phase, Player, PlayerSummary, Role, Roster};
pub use win::Winner;
