//! Game State Definitions
//!
//! Phase, role and roster types owned by the session.
//! Uses BTreeMap for deterministic iteration order; join order is tracked separately
//! because the first joiner leads the lobby.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use serde::{Serialize, Deserialize};

use crate::core::id::{CharacterId, PlayerId};

// =============================================================================
// PHASE
// =============================================================================

/// Session phase.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Nobody has joined yet.
    #[default]
    Welcome,
    /// Players gathering, waiting for the leader to start.
    Lobby,
    /// Round in progress: tasks, sabotage, reports.
    Game,
    /// Emergency meeting countdown before a vote.
    Emergency,
    /// Voting window open.
    Vote,
    /// Round finished, winner announced.
    Aftergame,
}

impl Phase {
    /// True while a round is running (roles assigned, not yet decided).
    pub fn round_active(self) -> bool {
        matches!(self, Phase::Game | Phase::Emergency | Phase::Vote)
    }

    /// Lowercase name used in messages.
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Welcome => "welcome",
            Phase::Lobby => "lobby",
            Phase::Game => "game",
            Phase::Emergency => "emergency",
            Phase::Vote => "vote",
            Phase::Aftergame => "aftergame",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// ROLE
// =============================================================================

/// Secret role assigned at round start.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Does tasks, wins by finishing them or ejecting every impostor.
    Crewmate,
    /// Fakes tasks, wins by surviving.
    Impostor,
}

// =============================================================================
// PLAYER
// =============================================================================

/// A player in the roster.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Player {
    /// Unique player ID
    pub id: PlayerId,

    /// Display name
    pub name: String,

    /// Sprite for the current round
    pub character: Option<CharacterId>,

    /// Role for the current round
    pub role: Option<Role>,

    /// Not a ghost
    pub alive: bool,

    /// Has a live connection. The connection itself belongs to the transport.
    pub connected: bool,
}

impl Player {
    /// Create a freshly joined player.
    pub fn new(id: PlayerId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            character: None,
            role: None,
            alive: true,
            connected: false,
        }
    }

    /// Is this player an impostor this round?
    pub fn is_impostor(&self) -> bool {
        self.role == Some(Role::Impostor)
    }

    /// Is this player a crewmate this round?
    pub fn is_crewmate(&self) -> bool {
        self.role == Some(Role::Crewmate)
    }

    /// Public view for roster broadcasts. Never includes the role.
    pub fn summary(&self) -> PlayerSummary {
        PlayerSummary {
            id: self.id,
            name: self.name.clone(),
            character: self.character.clone(),
            alive: self.alive,
            connected: self.connected,
        }
    }

    /// Drop everything assigned for a round.
    pub fn clear_round(&mut self) {
        self.character = None;
        self.role = None;
        self.alive = true;
    }
}

/// Roster entry as seen by every client.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSummary {
    /// Player id.
    pub id: PlayerId,
    /// Display name.
    pub name: String,
    /// Sprite, once a round has started.
    pub character: Option<CharacterId>,
    /// Not a ghost.
    pub alive: bool,
    /// Currently connected.
    pub connected: bool,
}

// =============================================================================
// ROSTER
// =============================================================================

/// Players keyed by id, remembering join order.
#[derive(Clone, Debug, Default)]
pub struct Roster {
    players: BTreeMap<PlayerId, Player>,
    order: Vec<PlayerId>,
}

impl Roster {
    /// Create an empty roster.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a player at the end of the join order.
    pub fn insert(&mut self, player: Player) {
        let id = player.id;
        if self.players.insert(id, player).is_none() {
            self.order.push(id);
        }
    }

    /// Remove a player entirely.
    pub fn remove(&mut self, id: &PlayerId) -> Option<Player> {
        let removed = self.players.remove(id)?;
        self.order.retain(|p| p != id);
        Some(removed)
    }

    /// Look up a player.
    pub fn get(&self, id: &PlayerId) -> Option<&Player> {
        self.players.get(id)
    }

    /// Look up a player mutably.
    pub fn get_mut(&mut self, id: &PlayerId) -> Option<&mut Player> {
        self.players.get_mut(id)
    }

    /// Is the id in the roster?
    pub fn contains(&self, id: &PlayerId) -> bool {
        self.players.contains_key(id)
    }

    /// Number of players.
    pub fn len(&self) -> usize {
        self.players.len()
    }

    /// True if nobody is in the roster.
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Player ids in join order.
    pub fn ids(&self) -> &[PlayerId] {
        &self.order
    }

    /// Players in join order.
    pub fn iter(&self) -> impl Iterator<Item = &Player> {
        self.order.iter().filter_map(|id| self.players.get(id))
    }

    /// Players mutably (id order).
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Player> {
        self.players.values_mut()
    }

    /// Lobby leader: first player in join order that is still connected.
    pub fn leader(&self) -> Option<PlayerId> {
        self.iter().find(|p| p.connected).map(|p| p.id)
    }

    /// Ids of alive players.
    pub fn alive_ids(&self) -> BTreeSet<PlayerId> {
        self.players.values().filter(|p| p.alive).map(|p| p.id).collect()
    }

    /// Number of alive players.
    pub fn alive_count(&self) -> usize {
        self.players.values().filter(|p| p.alive).count()
    }

    /// Number of alive impostors.
    pub fn impostors_alive(&self) -> usize {
        self.players.values().filter(|p| p.alive && p.is_impostor()).count()
    }

    /// Public summaries in join order.
    pub fn summaries(&self) -> Vec<PlayerSummary> {
        self.iter().map(Player::summary).collect()
    }
}
