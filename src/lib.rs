//! # Sus Game Server
//!
//! Authoritative session server for a social-deduction party game: players
//! join one shared lobby, get dealt secret roles and tasks, call meetings and
//! vote each other out until one side wins.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        SUS SERVER                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Shared primitives                         │
//! │  ├── id.rs       - Player, task and character identifiers    │
//! │  └── catalog.rs  - Task catalog (built-in or JSON file)      │
//! │                                                              │
//! │  game/           - Session engine (sync, no I/O)             │
//! │  ├── state.rs    - Phases, roles, roster                     │
//! │  ├── roles.rs    - Role and character dealing                │
//! │  ├── tasks.rs    - Task lists and global progress            │
//! │  ├── sabotage.rs - Task lock                                 │
//! │  ├── meeting.rs  - Meeting countdown and round tokens        │
//! │  ├── vote.rs     - Ballots and ejection                      │
//! │  ├── win.rs      - Winner evaluation                         │
//! │  └── session.rs  - The state machine                         │
//! │                                                              │
//! │  network/        - Transport (async)                         │
//! │  ├── server.rs   - WebSocket server and timers               │
//! │  ├── protocol.rs - Message types                             │
//! │  └── session.rs  - Engine plus connection registry           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Time and Randomness
//!
//! The engine never reads the clock. Operations that depend on time take an
//! `Instant`, and timers are requested from the transport as
//! [`game::TimerRequest`] values tagged with a round token. A timer whose
//! token has gone stale is a no-op, so late wakeups cannot leak into a later
//! meeting. Randomness comes from an injected RNG, which makes every test
//! reproducible from a seed.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod config;
pub mod core;
pub mod game;
pub mod network;

// Re-export commonly used types
pub use config::AppConfig;
pub use core::catalog::TaskCatalog;
pub use core::id::{CharacterId, PlayerId, TaskId};
pub use game::{GameError, GameRules, GameSession, Phase, Role, Winner};
pub use network::{GameServer, ServerConfig};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
