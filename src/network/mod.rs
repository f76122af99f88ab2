//! Network Layer
//!
//! WebSocket server for the lobby.
//! This layer owns time and connections; all game rules run through `game/`.

pub mod protocol;
pub mod session;
pub mod server;

pub use protocol::{BallotEntry, ClientMessage, ErrorCode, ServerError, ServerMessage};
pub use session::{ConnectionId, LobbySession};
pub use server::{ClientState, GameServer, GameServerError, ServerConfig, SharedLobby};
