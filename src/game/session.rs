//! Game Session
//!
//! The lobby state machine. Owns the phase and every piece of round state,
//! and is the only place phase transitions happen.
//!
//! All operations are synchronous and take the current instant explicitly;
//! they return the notices to deliver and, where needed, a timer for the
//! network layer to run. Timer entry points carry the [`RoundToken`] they were
//! scheduled with and do nothing once it is stale.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Serialize, Deserialize};

use crate::core::catalog::TaskCatalog;
use crate::core::id::{CharacterId, PlayerId, TaskId};
use crate::game::error::GameError;
use crate::game::events::{GameEvent, RevealedPlayer, TimerRequest, TimerStep, Transition};
use crate::game::meeting::{Countdown, MeetingCause, MeetingClock, RoundToken};
use crate::game::roles::assign_roles;
use crate::game::rules::GameRules;
use crate::game::sabotage::SabotageLock;
use crate::game::state::{Phase, Player, PlayerSummary, Role, Roster};
use crate::game::tasks::{TaskBoard, TaskPools, TaskStatus};
use crate::game::vote::{resolve_vote, VotingRound};
use crate::game::win::{end_game_threshold, evaluate_winner, Winner};

/// Outcome of a task update.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskUpdate {
    /// New global progress.
    Progress(u8),
    /// Progress reached 100 and the round ended.
    GameOver(Winner),
}

/// One player's view of the session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerView {
    /// Whose view this is.
    pub player_id: PlayerId,
    /// Display name.
    pub name: String,
    /// Session phase.
    pub phase: Phase,
    /// Own role, once dealt.
    pub role: Option<Role>,
    /// Own sprite, once dealt.
    pub character: Option<CharacterId>,
    /// Not a ghost.
    pub alive: bool,
    /// Own task list.
    pub tasks: Vec<TaskStatus>,
    /// Global task progress.
    pub global_progress: u8,
    /// Whole seconds until tasks unlock, zero when unlocked.
    pub sabotage_secs_left: u64,
    /// Seconds left in the current vote.
    pub vote_time_left: Option<u32>,
    /// Who opened the meeting, during the countdown and the vote.
    pub meeting: Option<MeetingCause>,
    /// Lobby leader.
    pub leader_id: Option<PlayerId>,
    /// Everyone, public fields only.
    pub players: Vec<PlayerSummary>,
}

/// The shared lobby.
#[derive(Debug)]
pub struct GameSession {
    rules: GameRules,
    catalog: Arc<TaskCatalog>,
    rng: StdRng,

    phase: Phase,
    roster: Roster,
    tasks: TaskBoard,
    sabotage: SabotageLock,
    meeting: MeetingClock,
    voting: Option<VotingRound>,
    ghosts: BTreeSet<PlayerId>,
    impostor_count: usize,
}

impl GameSession {
    /// Create an empty session in the welcome phase.
    pub fn new(rules: GameRules, catalog: Arc<TaskCatalog>) -> Self {
        Self::with_rng(rules, catalog, StdRng::from_entropy())
    }

    /// Create a session with a fixed RNG (deterministic deals).
    pub fn with_rng(rules: GameRules, catalog: Arc<TaskCatalog>, rng: StdRng) -> Self {
        let tasks = TaskBoard::new(rules.tasks_per_player);
        Self {
            rules,
            catalog,
            rng,
            phase: Phase::Welcome,
            roster: Roster::new(),
            tasks,
            sabotage: SabotageLock::new(),
            meeting: MeetingClock::new(),
            voting: None,
            ghosts: BTreeSet::new(),
            impostor_count: 0,
        }
    }

    // =========================================================================
    // ACCESSORS
    // =========================================================================

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Players.
    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    /// Rules in force.
    pub fn rules(&self) -> &GameRules {
        &self.rules
    }

    /// Task catalog.
    pub fn catalog(&self) -> &TaskCatalog {
        &self.catalog
    }

    /// Impostors dealt this round.
    pub fn impostor_count(&self) -> usize {
        self.impostor_count
    }

    /// Token of the current meeting.
    pub fn round(&self) -> RoundToken {
        self.meeting.token()
    }

    /// Ghosts this round.
    pub fn ghosts(&self) -> &BTreeSet<PlayerId> {
        &self.ghosts
    }

    /// The open vote, if any.
    pub fn voting(&self) -> Option<&VotingRound> {
        self.voting.as_ref()
    }

    /// Are tasks locked by sabotage at `now`?
    pub fn sabotage_locked(&self, now: Instant) -> bool {
        self.sabotage.is_locked(now)
    }

    /// Global task progress, recomputed.
    pub fn global_progress(&self) -> u8 {
        self.tasks.global_progress(&self.roster)
    }

    fn players_update(&self) -> GameEvent {
        GameEvent::PlayersUpdate {
            players: self.roster.summaries(),
            leader_id: self.roster.leader(),
        }
    }

    // =========================================================================
    // LOBBY
    // =========================================================================

    /// Add a player to the lobby.
    pub fn join_lobby(&mut self, name: &str) -> Result<(PlayerId, Transition), GameError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(GameError::validation("name must not be empty"));
        }
        if name.chars().count() > self.rules.max_name_len {
            return Err(GameError::validation(format!(
                "name must be at most {} characters",
                self.rules.max_name_len
            )));
        }
        if self.phase.round_active() {
            return Err(GameError::invalid_phase("join", self.phase));
        }
        if self.roster.len() >= self.rules.max_players {
            return Err(GameError::LobbyFull { max: self.rules.max_players });
        }

        let id = PlayerId::new_random();
        self.roster.insert(Player::new(id, name));
        if self.phase == Phase::Welcome {
            self.phase = Phase::Lobby;
        }

        let mut transition = Transition::new();
        transition.broadcast(self.players_update());
        Ok((id, transition))
    }

    /// A connection for this player was opened.
    pub fn connection_established(&mut self, player_id: PlayerId) -> Result<Transition, GameError> {
        self.set_connected(player_id, true)
    }

    /// The player's connection went away. The player stays in the roster.
    pub fn connection_lost(&mut self, player_id: PlayerId) -> Result<Transition, GameError> {
        self.set_connected(player_id, false)
    }

    fn set_connected(&mut self, player_id: PlayerId, connected: bool) -> Result<Transition, GameError> {
        let player = self.roster.get_mut(&player_id).ok_or(GameError::UnknownPlayer)?;
        player.connected = connected;

        let mut transition = Transition::new();
        transition.broadcast(self.players_update());
        Ok(transition)
    }

    /// Remove a player for good.
    pub fn leave_lobby(&mut self, player_id: PlayerId) -> Result<Transition, GameError> {
        if self.roster.remove(&player_id).is_none() {
            return Err(GameError::UnknownPlayer);
        }
        self.tasks.remove_player(&player_id);
        self.ghosts.remove(&player_id);
        if let Some(round) = self.voting.as_mut() {
            round.withdraw(&player_id);
        }

        let mut transition = Transition::new();
        if self.roster.is_empty() {
            self.reset_round();
            self.phase = Phase::Welcome;
            return Ok(transition);
        }

        transition.broadcast(self.players_update());
        if !self.phase.round_active() {
            return Ok(transition);
        }

        if let Some(winner) = self.round_decided() {
            transition.extend(self.finish_round(winner));
        } else if self.phase == Phase::Vote && self.all_alive_voted() {
            transition.extend(self.resolve_current_vote());
        } else {
            transition.broadcast(GameEvent::GlobalProgress { percent: self.global_progress() });
        }
        Ok(transition)
    }

    /// Leader starts a round: deal roles, characters and tasks.
    pub fn start_round(&mut self, caller: PlayerId) -> Result<Transition, GameError> {
        if self.roster.leader() != Some(caller) {
            return Err(GameError::NotAuthorized("only the lobby leader can start the game"));
        }
        if !matches!(self.phase, Phase::Lobby | Phase::Aftergame) {
            return Err(GameError::invalid_phase("start the game", self.phase));
        }
        if self.roster.len() < self.rules.min_players {
            return Err(GameError::validation(format!(
                "need at least {} players to start, have {}",
                self.rules.min_players,
                self.roster.len()
            )));
        }

        self.reset_round();

        let ids = self.roster.ids().to_vec();
        let dealt = assign_roles(&ids, &mut self.rng);
        let mut pools = TaskPools::shuffled(&self.catalog, &mut self.rng);

        let mut transition = Transition::new();
        for id in &ids {
            let Some(assignment) = dealt.get(id) else { continue };
            if let Some(player) = self.roster.get_mut(id) {
                player.role = Some(assignment.role);
                player.character = Some(assignment.character.clone());
                player.alive = true;
            }
            self.tasks.init_tasks(*id, assignment.role, &mut pools);

            transition.send_to(*id, GameEvent::RoleAssigned {
                role: assignment.role,
                character: assignment.character.clone(),
            });
            transition.send_to(*id, GameEvent::TaskList {
                tasks: self.tasks.tasks_of(id, &self.catalog),
            });
        }
        self.impostor_count = dealt.values().filter(|a| a.role == Role::Impostor).count();
        self.phase = Phase::Game;

        transition.broadcast(GameEvent::GameStart);
        transition.broadcast(self.players_update());
        transition.broadcast(GameEvent::GlobalProgress { percent: self.global_progress() });
        Ok(transition)
    }

    /// Leader tears the round down and returns everyone to the lobby.
    pub fn end_game(&mut self, caller: PlayerId) -> Result<Transition, GameError> {
        if !self.roster.contains(&caller) {
            return Err(GameError::UnknownPlayer);
        }
        if self.roster.leader() != Some(caller) {
            return Err(GameError::NotAuthorized("only the lobby leader can end the game"));
        }
        if matches!(self.phase, Phase::Welcome | Phase::Lobby) {
            return Err(GameError::invalid_phase("end the game", self.phase));
        }

        self.reset_round();
        self.phase = Phase::Lobby;

        let mut transition = Transition::new();
        transition.broadcast(GameEvent::GameReset);
        transition.broadcast(self.players_update());
        Ok(transition)
    }

    /// Clear every piece of round state, keeping the roster.
    fn reset_round(&mut self) {
        for player in self.roster.iter_mut() {
            player.clear_round();
        }
        self.tasks.clear();
        self.sabotage.clear();
        self.voting = None;
        self.ghosts.clear();
        self.impostor_count = 0;
        self.meeting.invalidate();
    }

    // =========================================================================
    // TASKS & SABOTAGE
    // =========================================================================

    /// Mark one of the player's tasks done or not done.
    pub fn mark_done(
        &mut self,
        player_id: PlayerId,
        task_id: TaskId,
        done: bool,
        now: Instant,
    ) -> Result<(TaskUpdate, Transition), GameError> {
        if self.phase != Phase::Game {
            return Err(GameError::invalid_phase("update tasks", self.phase));
        }
        if !self.roster.contains(&player_id) {
            return Err(GameError::UnknownPlayer);
        }
        if self.sabotage.is_locked(now) {
            return Err(GameError::SabotageLocked);
        }
        self.tasks.set(&player_id, task_id, done)?;

        let percent = self.global_progress();
        let mut transition = Transition::new();
        transition.send_to(player_id, GameEvent::TaskList {
            tasks: self.tasks.tasks_of(&player_id, &self.catalog),
        });
        transition.broadcast(GameEvent::GlobalProgress { percent });

        if percent >= 100 {
            transition.extend(self.finish_round(Winner::Crew));
            return Ok((TaskUpdate::GameOver(Winner::Crew), transition));
        }
        Ok((TaskUpdate::Progress(percent), transition))
    }

    /// An impostor locks every task for the sabotage window.
    pub fn start_sabotage(&mut self, player_id: PlayerId, now: Instant) -> Result<(Instant, Transition), GameError> {
        let player = self.roster.get(&player_id).ok_or(GameError::UnknownPlayer)?;
        if self.phase != Phase::Game {
            return Err(GameError::invalid_phase("sabotage", self.phase));
        }
        if !player.is_impostor() {
            return Err(GameError::NotImpostor);
        }

        let duration = self.rules.sabotage_duration;
        let deadline = self.sabotage.trigger(now, duration);

        let mut transition = Transition::new();
        transition.broadcast(GameEvent::SabotageStarted { duration });
        Ok((deadline, transition))
    }

    // =========================================================================
    // MEETINGS
    // =========================================================================

    /// An alive player presses the emergency button.
    pub fn call_emergency(&mut self, caller: PlayerId) -> Result<Transition, GameError> {
        if self.phase != Phase::Game {
            return Err(GameError::invalid_phase("call an emergency meeting", self.phase));
        }
        let player = self.roster.get(&caller).ok_or(GameError::UnknownPlayer)?;
        if !player.alive {
            return Err(GameError::NotAuthorized("ghosts cannot call meetings"));
        }
        let caller_name = player.name.clone();

        let mut transition = Transition::new();
        transition.broadcast(GameEvent::EmergencyFlash { caller_id: caller, caller_name });
        transition.timer = Some(self.open_meeting(MeetingCause::Emergency { caller }));
        Ok(transition)
    }

    /// An alive player reports another player's body.
    pub fn report_body(&mut self, reporter: PlayerId, reported: PlayerId) -> Result<Transition, GameError> {
        if self.phase != Phase::Game {
            return Err(GameError::invalid_phase("report", self.phase));
        }
        let reporter_alive = self.roster.get(&reporter).ok_or(GameError::UnknownPlayer)?.alive;
        let body = self.roster.get(&reported).ok_or(GameError::UnknownPlayer)?;
        if !reporter_alive {
            return Err(GameError::NotAuthorized("ghosts cannot report"));
        }
        if reporter == reported {
            return Err(GameError::validation("cannot report yourself"));
        }
        if !body.alive {
            return Err(GameError::UnknownPlayer);
        }
        let notice = GameEvent::ReportNotice {
            reporter_id: reporter,
            reported_id: reported,
            name: body.name.clone(),
            character: body.character.clone(),
        };

        self.make_ghost(reported);

        let mut transition = Transition::new();
        transition.broadcast(notice);
        transition.broadcast(self.players_update());

        if let Some(winner) = self.round_decided() {
            transition.extend(self.finish_round(winner));
            return Ok(transition);
        }
        transition.timer = Some(self.open_meeting(MeetingCause::Report { reporter, reported }));
        Ok(transition)
    }

    fn open_meeting(&mut self, cause: MeetingCause) -> TimerRequest {
        self.phase = Phase::Emergency;
        let token = self.meeting.begin(cause, self.rules.meeting_countdown_secs);
        TimerRequest::MeetingCountdown(token)
    }

    /// One second of meeting countdown. Opens the vote once it runs out.
    pub fn countdown_tick(&mut self, token: RoundToken, now: Instant) -> TimerStep {
        if self.phase != Phase::Emergency || !self.meeting.is_current(token) {
            return TimerStep::Stale;
        }
        match self.meeting.tick(token) {
            None => TimerStep::Stale,
            Some(Countdown::Remaining(seconds_left)) => {
                let mut transition = Transition::new();
                transition.broadcast(GameEvent::CountdownTick { seconds_left });
                TimerStep::Continue(transition)
            }
            Some(Countdown::Elapsed) => TimerStep::Done(self.open_vote(token, now)),
        }
    }

    fn open_vote(&mut self, token: RoundToken, now: Instant) -> Transition {
        let round = VotingRound::open(token, now, self.rules.vote_duration);
        let time_left = round.time_left(now);
        self.voting = Some(round);
        self.phase = Phase::Vote;

        let mut transition = Transition::new();
        transition.broadcast(GameEvent::VoteStarted { time_left });
        transition.timer = Some(TimerRequest::VoteWindow(token));
        transition
    }

    // =========================================================================
    // VOTING
    // =========================================================================

    /// Record a ballot. `None` skips. Resolves once every alive player voted.
    pub fn cast_vote(
        &mut self,
        voter: PlayerId,
        target: Option<PlayerId>,
        now: Instant,
    ) -> Result<Transition, GameError> {
        let phase = self.phase;
        if phase != Phase::Vote {
            return Err(GameError::invalid_phase("vote", phase));
        }
        let alive = self.roster.alive_ids();
        if !alive.contains(&voter) {
            return Err(GameError::UnknownVoter);
        }
        if let Some(target) = target {
            if !alive.contains(&target) {
                return Err(GameError::UnknownPlayer);
            }
        }
        let round = self.voting.as_mut().ok_or(GameError::invalid_phase("vote", phase))?;
        round.cast(voter, target);

        let mut transition = Transition::new();
        transition.broadcast(GameEvent::VoteUpdate {
            time_left: round.time_left(now),
            ballots: round.ballots().clone(),
        });

        if round.all_voted(&alive) {
            transition.extend(self.resolve_current_vote());
        }
        Ok(transition)
    }

    /// One second of the vote window. Resolves with the ballots in hand when it closes.
    pub fn vote_timer_tick(&mut self, token: RoundToken, now: Instant) -> TimerStep {
        if self.phase != Phase::Vote {
            return TimerStep::Stale;
        }
        let round = match self.voting.as_ref() {
            Some(round) if round.token() == token => round,
            _ => return TimerStep::Stale,
        };
        if round.expired(now) {
            return TimerStep::Done(self.resolve_current_vote());
        }

        let mut transition = Transition::new();
        transition.broadcast(GameEvent::VoteUpdate {
            time_left: round.time_left(now),
            ballots: round.ballots().clone(),
        });
        TimerStep::Continue(transition)
    }

    fn all_alive_voted(&self) -> bool {
        self.voting
            .as_ref()
            .map(|round| round.all_voted(&self.roster.alive_ids()))
            .unwrap_or(false)
    }

    /// Consume the open vote and apply the result.
    fn resolve_current_vote(&mut self) -> Transition {
        let mut transition = Transition::new();
        let Some(round) = self.voting.take() else {
            return transition;
        };

        let ejected = resolve_vote(round.ballots(), &self.roster.alive_ids());
        let revealed = ejected.and_then(|id| {
            self.make_ghost(id);
            self.roster.get(&id).map(reveal)
        });
        transition.broadcast(GameEvent::EjectionResult { ejected: revealed });
        transition.broadcast(self.players_update());

        match self.round_decided() {
            Some(winner) => transition.extend(self.finish_round(winner)),
            None => {
                self.phase = Phase::Game;
                transition.broadcast(GameEvent::GlobalProgress { percent: self.global_progress() });
            }
        }
        transition
    }

    // =========================================================================
    // ROUND END
    // =========================================================================

    fn make_ghost(&mut self, player_id: PlayerId) {
        if let Some(player) = self.roster.get_mut(&player_id) {
            player.alive = false;
            self.ghosts.insert(player_id);
        }
    }

    /// Winner if the round is over: all tasks done, no impostor left, or the
    /// alive count at the end-game threshold.
    fn round_decided(&self) -> Option<Winner> {
        let progress = self.global_progress();
        let impostors_alive = self.roster.impostors_alive();
        let at_threshold = self.roster.alive_count() <= end_game_threshold(self.impostor_count);

        if progress >= 100 || impostors_alive == 0 || at_threshold {
            Some(evaluate_winner(progress, impostors_alive))
        } else {
            None
        }
    }

    fn finish_round(&mut self, winner: Winner) -> Transition {
        self.phase = Phase::Aftergame;
        self.voting = None;
        self.sabotage.clear();
        self.meeting.invalidate();

        let (impostors, crewmates): (Vec<_>, Vec<_>) = self
            .roster
            .iter()
            .filter(|p| p.role.is_some())
            .map(reveal)
            .partition(|p| p.role == Some(Role::Impostor));

        let mut transition = Transition::new();
        transition.broadcast(GameEvent::GameEnd { winner, impostors, crewmates });
        transition
    }

    // =========================================================================
    // SNAPSHOT
    // =========================================================================

    /// The player's own view, sent on (re)connect.
    pub fn snapshot(&self, player_id: PlayerId, now: Instant) -> Result<PlayerView, GameError> {
        let player = self.roster.get(&player_id).ok_or(GameError::UnknownPlayer)?;
        let sabotage_left = self.sabotage.remaining(now);

        Ok(PlayerView {
            player_id,
            name: player.name.clone(),
            phase: self.phase,
            role: player.role,
            character: player.character.clone(),
            alive: player.alive,
            tasks: self.tasks.tasks_of(&player_id, &self.catalog),
            global_progress: self.global_progress(),
            sabotage_secs_left: sabotage_left.as_secs() + u64::from(sabotage_left.subsec_nanos() > 0),
            vote_time_left: self.voting.as_ref().map(|round| round.time_left(now)),
            meeting: match self.phase {
                Phase::Emergency | Phase::Vote => self.meeting.cause(),
                _ => None,
            },
            leader_id: self.roster.leader(),
            players: self.roster.summaries(),
        })
    }
}

fn reveal(player: &Player) -> RevealedPlayer {
    RevealedPlayer {
        id: player.id,
        name: player.name.clone(),
        character: player.character.clone(),
        role: player.role,
    }
}
