//! Lobby Session
//!
//! Pairs the game engine with the live connections of its players. Both sit
//! behind one lock so a notice can never be delivered against a roster it was
//! not produced from.
//!
//! Delivery is best effort: a full or closed outbound channel marks that
//! connection stale and the operation carries on. Stale connections are reaped
//! by the server's cleanup loop.

use std::collections::{BTreeMap, BTreeSet};
use chrono::Utc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};

use crate::core::id::PlayerId;
use crate::game::error::GameError;
use crate::game::events::{Audience, Notice, Transition};
use crate::game::session::GameSession;
use crate::network::protocol::ServerMessage;

/// Identifies one WebSocket connection. A player that reconnects gets a new one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConnectionId(pub u64);

/// An attached connection.
#[derive(Debug)]
struct Connection {
    id: ConnectionId,
    sender: mpsc::Sender<ServerMessage>,
}

/// The engine plus its connection registry.
#[derive(Debug)]
pub struct LobbySession {
    engine: GameSession,
    connections: BTreeMap<PlayerId, Connection>,
    stale: BTreeSet<PlayerId>,
}

impl LobbySession {
    /// Wrap an engine with no connections.
    pub fn new(engine: GameSession) -> Self {
        Self {
            engine,
            connections: BTreeMap::new(),
            stale: BTreeSet::new(),
        }
    }

    /// The engine.
    pub fn engine(&self) -> &GameSession {
        &self.engine
    }

    /// The engine, mutably.
    pub fn engine_mut(&mut self) -> &mut GameSession {
        &mut self.engine
    }

    /// Number of attached connections.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Attach a connection to a player, replacing any previous one.
    pub fn attach(
        &mut self,
        player_id: PlayerId,
        connection: ConnectionId,
        sender: mpsc::Sender<ServerMessage>,
    ) -> Result<Transition, GameError> {
        let transition = self.engine.connection_established(player_id)?;
        let previous = self.connections.insert(player_id, Connection { id: connection, sender });
        if let Some(previous) = previous {
            if previous.id != connection {
                debug!("Player {} replaced connection {:?}", player_id.short(), previous.id);
            }
        }
        self.stale.remove(&player_id);
        Ok(transition)
    }

    /// Detach a connection. Ignored if the player has since attached a newer one.
    pub fn detach(&mut self, player_id: PlayerId, connection: ConnectionId) -> Option<Transition> {
        match self.connections.get(&player_id) {
            Some(current) if current.id == connection => {}
            _ => return None,
        }
        self.connections.remove(&player_id);
        self.stale.remove(&player_id);
        // Player may already have left the roster
        self.engine.connection_lost(player_id).ok()
    }

    /// Deliver notices. Never fails; unreachable connections are marked stale.
    pub fn dispatch(&mut self, notices: Vec<Notice>) {
        let now = Utc::now();
        for notice in notices {
            let message = ServerMessage::from_event(notice.event, now);
            match notice.audience {
                Audience::All => self.broadcast(message),
                Audience::Player(player_id) => self.send_to(player_id, message),
            }
        }
    }

    /// Send one message to every attached connection.
    pub fn broadcast(&mut self, message: ServerMessage) {
        let ids: Vec<PlayerId> = self.connections.keys().copied().collect();
        for player_id in ids {
            self.send_to(player_id, message.clone());
        }
    }

    /// Send one message to a player, if attached.
    pub fn send_to(&mut self, player_id: PlayerId, message: ServerMessage) {
        let Some(connection) = self.connections.get(&player_id) else {
            return;
        };
        match connection.sender.try_send(message) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                if self.stale.insert(player_id) {
                    warn!("Outbound queue full for player {}, marking stale", player_id.short());
                }
            }
            Err(TrySendError::Closed(_)) => {
                if self.stale.insert(player_id) {
                    debug!("Connection closed for player {}, marking stale", player_id.short());
                }
            }
        }
    }

    /// Players whose connection failed a send.
    pub fn stale(&self) -> &BTreeSet<PlayerId> {
        &self.stale
    }

    /// Drop every stale connection and mark those players disconnected.
    /// Returns the players affected.
    pub fn reap_stale(&mut self) -> Vec<PlayerId> {
        let reaped: Vec<PlayerId> = std::mem::take(&mut self.stale).into_iter().collect();
        let mut notices = Vec::new();

        for player_id in &reaped {
            self.connections.remove(player_id);
            if let Ok(transition) = self.engine.connection_lost(*player_id) {
                notices.extend(transition.notices);
            }
        }

        if !notices.is_empty() {
            self.dispatch(notices);
        }
        reaped
    }
}
