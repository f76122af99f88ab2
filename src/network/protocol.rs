//! Protocol Messages
//!
//! Wire format for client-server communication over WebSocket.
//! Every frame is one JSON object tagged by `"type"`.

use std::time::Duration;
use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};

use crate::core::id::{CharacterId, PlayerId, TaskId};
use crate::game::error::GameError;
use crate::game::events::{GameEvent, RevealedPlayer};
use crate::game::session::PlayerView;
use crate::game::state::{PlayerSummary, Role};
use crate::game::tasks::TaskStatus;
use crate::game::vote::Ballots;
use crate::game::win::Winner;

// =============================================================================
// CLIENT -> SERVER MESSAGES
// =============================================================================

/// Messages sent from client to server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Join the lobby as a new player.
    Join { name: String },

    /// Re-attach this connection to an existing player.
    Auth { player_id: PlayerId },

    /// Leader starts the round.
    StartGame,

    /// Mark one of the caller's tasks.
    UpdateTask { task_id: TaskId, done: bool },

    /// Impostor locks all tasks.
    Sabotage,

    /// Press the emergency button.
    Emergency,

    /// Report a body.
    Report { reported_id: PlayerId },

    /// Cast a ballot; `null` skips.
    Vote { target_id: Option<PlayerId> },

    /// Leader ends the round.
    EndGame,

    /// Leave the lobby for good.
    Leave,

    /// Request the caller's full view (for reconnection).
    SyncRequest,

    /// Ping for latency measurement.
    Ping { timestamp: u64 },
}

// =============================================================================
// SERVER -> CLIENT MESSAGES
// =============================================================================

/// Messages sent from server to client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Join accepted. Keep the id to re-authenticate later.
    Joined { player_id: PlayerId, name: String },

    /// The recipient's own view of the session.
    SessionInfo(PlayerView),

    /// Roster changed.
    PlayersUpdate {
        players: Vec<PlayerSummary>,
        leader_id: Option<PlayerId>,
    },

    /// Private role and sprite.
    RoleAssigned { role: Role, character: CharacterId },

    /// Round started.
    GameStart,

    /// Private task list.
    TaskList { tasks: Vec<TaskStatus> },

    /// Global task progress.
    GlobalProgress { percent: u8 },

    /// Tasks locked until `ends_at`.
    SabotageStarted {
        ends_at: DateTime<Utc>,
        duration_secs: u64,
    },

    /// Emergency meeting called.
    EmergencyFlash { caller_id: PlayerId, caller_name: String },

    /// Meeting countdown.
    CountdownTick { seconds_left: u32 },

    /// Voting opened.
    VoteStarted { time_left: u32 },

    /// Ballots so far and time left.
    VoteUpdate { time_left: u32, ballots: Vec<BallotEntry> },

    /// A body was reported.
    ReportNotice {
        reporter_id: PlayerId,
        reported_id: PlayerId,
        name: String,
        character: Option<CharacterId>,
    },

    /// Vote resolved; `null` when nobody was ejected.
    EjectionResult { ejected: Option<RevealedPlayer> },

    /// Round decided.
    GameEnd {
        winner: Winner,
        impostors: Vec<RevealedPlayer>,
        crewmates: Vec<RevealedPlayer>,
    },

    /// Round torn down, back to the lobby.
    GameReset,

    /// Request rejected.
    Error(ServerError),

    /// Pong response.
    Pong { timestamp: u64, server_time: u64 },

    /// Server is shutting down.
    Shutdown { reason: String },
}

/// One ballot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BallotEntry {
    /// Who voted.
    pub voter_id: PlayerId,
    /// For whom; `None` is a skip.
    pub target_id: Option<PlayerId>,
}

fn ballot_entries(ballots: &Ballots) -> Vec<BallotEntry> {
    ballots
        .iter()
        .map(|(voter, target)| BallotEntry {
            voter_id: *voter,
            target_id: *target,
        })
        .collect()
}

impl ServerMessage {
    /// Wire form of a game event. `now` anchors wall-clock deadlines.
    pub fn from_event(event: GameEvent, now: DateTime<Utc>) -> Self {
        match event {
            GameEvent::PlayersUpdate { players, leader_id } => Self::PlayersUpdate { players, leader_id },
            GameEvent::RoleAssigned { role, character } => Self::RoleAssigned { role, character },
            GameEvent::GameStart => Self::GameStart,
            GameEvent::TaskList { tasks } => Self::TaskList { tasks },
            GameEvent::GlobalProgress { percent } => Self::GlobalProgress { percent },
            GameEvent::SabotageStarted { duration } => Self::SabotageStarted {
                ends_at: now + wall_duration(duration),
                duration_secs: duration.as_secs(),
            },
            GameEvent::EmergencyFlash { caller_id, caller_name } => {
                Self::EmergencyFlash { caller_id, caller_name }
            }
            GameEvent::CountdownTick { seconds_left } => Self::CountdownTick { seconds_left },
            GameEvent::VoteStarted { time_left } => Self::VoteStarted { time_left },
            GameEvent::VoteUpdate { time_left, ballots } => Self::VoteUpdate {
                time_left,
                ballots: ballot_entries(&ballots),
            },
            GameEvent::ReportNotice { reporter_id, reported_id, name, character } => {
                Self::ReportNotice { reporter_id, reported_id, name, character }
            }
            GameEvent::EjectionResult { ejected } => Self::EjectionResult { ejected },
            GameEvent::GameEnd { winner, impostors, crewmates } => {
                Self::GameEnd { winner, impostors, crewmates }
            }
            GameEvent::GameReset => Self::GameReset,
        }
    }

    /// Error reply.
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Error(ServerError {
            code,
            message: message.into(),
        })
    }
}

fn wall_duration(duration: Duration) -> chrono::Duration {
    let millis = i64::try_from(duration.as_millis()).unwrap_or(i64::MAX);
    chrono::Duration::milliseconds(millis)
}

/// Server error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerError {
    /// Error code.
    pub code: ErrorCode,
    /// Human-readable message.
    pub message: String,
}

/// Error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Caller may not do this.
    NotAuthorized,
    /// Wrong phase for this action.
    InvalidPhase,
    /// Only impostors can sabotage.
    NotImpostor,
    /// Unknown or non-alive player.
    UnknownPlayer,
    /// Voter is not an alive player.
    UnknownVoter,
    /// Tasks are locked.
    SabotageLocked,
    /// Lobby at capacity.
    LobbyFull,
    /// Malformed request.
    ValidationError,
    /// Connection has not joined or authenticated.
    NotJoined,
    /// Connection limit reached.
    ServerOverloaded,
    /// Internal error.
    InternalError,
}

impl From<&GameError> for ErrorCode {
    fn from(err: &GameError) -> Self {
        match err {
            GameError::NotAuthorized(_) => ErrorCode::NotAuthorized,
            GameError::InvalidPhase { .. } => ErrorCode::InvalidPhase,
            GameError::NotImpostor => ErrorCode::NotImpostor,
            GameError::UnknownPlayer => ErrorCode::UnknownPlayer,
            GameError::UnknownVoter => ErrorCode::UnknownVoter,
            GameError::SabotageLocked => ErrorCode::SabotageLocked,
            GameError::LobbyFull { .. } => ErrorCode::LobbyFull,
            GameError::Validation(_) => ErrorCode::ValidationError,
        }
    }
}

impl From<&GameError> for ServerError {
    fn from(err: &GameError) -> Self {
        Self {
            code: err.into(),
            message: err.to_string(),
        }
    }
}

// =============================================================================
// SERIALIZATION HELPERS
// =============================================================================

impl ClientMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

impl ServerMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use crate::game::meeting::MeetingCause;
    use crate::game::state::Phase;

    fn pid(n: u8) -> PlayerId {
        PlayerId::from_bytes([n; 16])
    }

    #[test]
    fn test_client_messages_parse_from_wire() {
        let msg = ClientMessage::from_json(r#"{"type":"join","name":"alice"}"#).unwrap();
        assert_eq!(msg, ClientMessage::Join { name: "alice".into() });

        let msg = ClientMessage::from_json(r#"{"type":"update_task","task_id":3,"done":true}"#).unwrap();
        assert_eq!(msg, ClientMessage::UpdateTask { task_id: TaskId(3), done: true });

        let msg = ClientMessage::from_json(r#"{"type":"vote","target_id":null}"#).unwrap();
        assert_eq!(msg, ClientMessage::Vote { target_id: None });

        let raw = format!(r#"{{"type":"report","reported_id":"{}"}}"#, pid(2));
        let msg = ClientMessage::from_json(&raw).unwrap();
        assert_eq!(msg, ClientMessage::Report { reported_id: pid(2) });

        assert_eq!(
            ClientMessage::from_json(r#"{"type":"start_game"}"#).unwrap(),
            ClientMessage::StartGame
        );
    }

    #[test]
    fn test_unknown_or_malformed_client_messages_fail() {
        assert!(ClientMessage::from_json(r#"{"type":"teleport"}"#).is_err());
        assert!(ClientMessage::from_json(r#"{"type":"vote","target_id":"nope"}"#).is_err());
        assert!(ClientMessage::from_json(r#"{"type":"join"}"#).is_err());
        assert!(ClientMessage::from_json("not json").is_err());
    }

    #[test]
    fn test_server_message_tags() {
        let json = ServerMessage::GlobalProgress { percent: 40 }.to_json().unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value, json!({"type": "global_progress", "percent": 40}));

        let json = ServerMessage::error(ErrorCode::SabotageLocked, "locked").to_json().unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["type"], "error");
        assert_eq!(value["code"], "sabotage_locked");
    }

    #[test]
    fn test_sabotage_deadline_is_wall_clock() {
        let now = Utc::now();
        let msg = ServerMessage::from_event(
            GameEvent::SabotageStarted { duration: Duration::from_secs(60) },
            now,
        );
        match msg {
            ServerMessage::SabotageStarted { ends_at, duration_secs } => {
                assert_eq!(duration_secs, 60);
                assert_eq!(ends_at - now, chrono::Duration::seconds(60));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_vote_update_lists_ballots() {
        let mut ballots = Ballots::new();
        ballots.insert(pid(1), Some(pid(2)));
        ballots.insert(pid(3), None);

        let msg = ServerMessage::from_event(GameEvent::VoteUpdate { time_left: 90, ballots }, Utc::now());
        let value: Value = serde_json::from_str(&msg.to_json().unwrap()).unwrap();

        assert_eq!(value["type"], "vote_update");
        assert_eq!(value["time_left"], 90);
        assert_eq!(value["ballots"][0]["voter_id"], pid(1).to_string());
        assert_eq!(value["ballots"][0]["target_id"], pid(2).to_string());
        assert_eq!(value["ballots"][1]["target_id"], Value::Null);
    }

    #[test]
    fn test_ejection_result_null_when_nobody_ejected() {
        let msg = ServerMessage::from_event(GameEvent::EjectionResult { ejected: None }, Utc::now());
        let value: Value = serde_json::from_str(&msg.to_json().unwrap()).unwrap();
        assert_eq!(value, json!({"type": "ejection_result", "ejected": null}));
    }

    #[test]
    fn test_session_info_roundtrip() {
        let view = PlayerView {
            player_id: pid(1),
            name: "alice".into(),
            phase: Phase::Vote,
            role: Some(Role::Impostor),
            character: Some(CharacterId::from_slot(3)),
            alive: true,
            tasks: vec![TaskStatus { id: TaskId(16), title: "Check the vents".into(), done: false }],
            global_progress: 20,
            sabotage_secs_left: 0,
            vote_time_left: Some(90),
            meeting: Some(MeetingCause::Report { reporter: pid(2), reported: pid(3) }),
            leader_id: Some(pid(1)),
            players: Vec::new(),
        };

        let json = ServerMessage::SessionInfo(view.clone()).to_json().unwrap();
        assert!(json.contains(r#""type":"session_info""#));
        assert!(json.contains(r#""meeting":{"kind":"report""#));
        assert_eq!(ServerMessage::from_json(&json).unwrap(), ServerMessage::SessionInfo(view));
    }

    #[test]
    fn test_game_errors_map_to_codes() {
        let cases = [
            (GameError::NotAuthorized("x"), ErrorCode::NotAuthorized),
            (GameError::invalid_phase("vote", Phase::Lobby), ErrorCode::InvalidPhase),
            (GameError::NotImpostor, ErrorCode::NotImpostor),
            (GameError::UnknownPlayer, ErrorCode::UnknownPlayer),
            (GameError::UnknownVoter, ErrorCode::UnknownVoter),
            (GameError::SabotageLocked, ErrorCode::SabotageLocked),
            (GameError::LobbyFull { max: 13 }, ErrorCode::LobbyFull),
            (GameError::validation("bad"), ErrorCode::ValidationError),
        ];
        for (err, code) in cases {
            let wire = ServerError::from(&err);
            assert_eq!(wire.code, code);
            assert_eq!(wire.message, err.to_string());
        }
    }
}
