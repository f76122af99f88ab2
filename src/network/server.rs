//! WebSocket Game Server
//!
//! Async WebSocket server for the lobby.
//! Routes client messages into the engine, delivers its notices and drives
//! the meeting countdown and vote window timers.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc, RwLock};
use tokio::time::{interval, sleep, Instant};
use tokio_tungstenite::{accept_async, tungstenite::Message};
use futures_util::{SinkExt, StreamExt};
use tracing::{debug, error, info, instrument, warn};

use crate::core::id::PlayerId;
use crate::game::error::GameError;
use crate::game::events::{TimerRequest, TimerStep, Transition};
use crate::game::meeting::RoundToken;
use crate::game::session::GameSession;
use crate::network::protocol::{ClientMessage, ErrorCode, ServerError, ServerMessage};
use crate::network::session::{ConnectionId, LobbySession};

/// Shared handle to the lobby.
pub type SharedLobby = Arc<RwLock<LobbySession>>;

/// Interval between timer steps.
const TIMER_STEP: Duration = Duration::from_secs(1);

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address.
    pub bind_addr: SocketAddr,
    /// Maximum concurrent connections.
    pub max_connections: usize,
    /// Outbound queue length per connection.
    pub outbound_buffer: usize,
    /// How often stale connections are reaped.
    pub cleanup_interval: Duration,
    /// Server version string.
    pub version: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            max_connections: 256,
            outbound_buffer: 64,
            cleanup_interval: Duration::from_secs(5),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Game server errors.
#[derive(Debug, thiserror::Error)]
pub enum GameServerError {
    /// Failed to bind to address.
    #[error("Failed to bind: {0}")]
    BindFailed(#[from] std::io::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}

/// Per-connection state.
#[derive(Debug)]
pub struct ClientState {
    /// This connection.
    pub connection: ConnectionId,
    /// Player bound to it by join or auth.
    pub player_id: Option<PlayerId>,
}

impl ClientState {
    /// A fresh, unbound connection.
    pub fn new(connection: ConnectionId) -> Self {
        Self {
            connection,
            player_id: None,
        }
    }
}

enum TimerFlow {
    Continue,
    Finished,
}

/// The game server.
pub struct GameServer {
    /// Server configuration.
    config: ServerConfig,
    /// The lobby.
    lobby: SharedLobby,
    /// Open WebSocket connections.
    connections: Arc<AtomicUsize>,
    /// Connection id source.
    next_connection: Arc<AtomicU64>,
    /// Shutdown signal.
    shutdown_tx: broadcast::Sender<()>,
}

impl GameServer {
    /// Create a new game server around an engine.
    pub fn new(config: ServerConfig, engine: GameSession) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            config,
            lobby: Arc::new(RwLock::new(LobbySession::new(engine))),
            connections: Arc::new(AtomicUsize::new(0)),
            next_connection: Arc::new(AtomicU64::new(1)),
            shutdown_tx,
        }
    }

    /// Shared handle to the lobby.
    pub fn lobby(&self) -> SharedLobby {
        self.lobby.clone()
    }

    /// Run the server.
    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<(), GameServerError> {
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        info!("Game server v{} listening on {}", self.config.version, self.config.bind_addr);

        let cleanup_lobby = self.lobby.clone();
        let cleanup_interval = self.config.cleanup_interval;
        let cleanup_handle = tokio::spawn(async move {
            Self::run_cleanup_loop(cleanup_lobby, cleanup_interval).await;
        });

        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            if self.connections.load(Ordering::SeqCst) >= self.config.max_connections {
                                warn!("Connection limit reached, rejecting {}", addr);
                                continue;
                            }

                            info!("New connection from {}", addr);
                            self.handle_connection(stream, addr);
                        }
                        Err(e) => {
                            error!("Accept error: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        cleanup_handle.abort();

        Ok(())
    }

    /// Handle a new WebSocket connection.
    fn handle_connection(&self, stream: TcpStream, addr: SocketAddr) {
        let lobby = self.lobby.clone();
        let connections = self.connections.clone();
        let connection = ConnectionId(self.next_connection.fetch_add(1, Ordering::SeqCst));
        let buffer = self.config.outbound_buffer;
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        connections.fetch_add(1, Ordering::SeqCst);

        tokio::spawn(async move {
            let ws_stream = match accept_async(stream).await {
                Ok(ws) => ws,
                Err(e) => {
                    error!("WebSocket handshake failed for {}: {}", addr, e);
                    connections.fetch_sub(1, Ordering::SeqCst);
                    return;
                }
            };

            let (mut ws_sender, mut ws_receiver) = ws_stream.split();
            let (msg_tx, mut msg_rx) = mpsc::channel::<ServerMessage>(buffer);
            let mut client = ClientState::new(connection);

            // Spawn message sender task
            let sender_task = tokio::spawn(async move {
                while let Some(msg) = msg_rx.recv().await {
                    let text = match msg.to_json() {
                        Ok(t) => t,
                        Err(e) => {
                            error!("Failed to serialize message: {}", e);
                            continue;
                        }
                    };
                    if ws_sender.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
            });

            // Handle incoming messages
            loop {
                tokio::select! {
                    msg = ws_receiver.next() => {
                        match msg {
                            Some(Ok(Message::Text(text))) => {
                                let client_msg = match ClientMessage::from_json(&text) {
                                    Ok(m) => m,
                                    Err(e) => {
                                        debug!("Invalid message from {}: {}", addr, e);
                                        let _ = msg_tx.send(ServerMessage::error(
                                            ErrorCode::ValidationError,
                                            "Invalid message format",
                                        )).await;
                                        continue;
                                    }
                                };

                                Self::handle_client_message(&lobby, &mut client, client_msg, &msg_tx).await;
                            }
                            Some(Ok(Message::Close(_))) | None => {
                                debug!("Client {} disconnected", addr);
                                break;
                            }
                            Some(Err(e)) => {
                                warn!("WebSocket error for {}: {}", addr, e);
                                break;
                            }
                            _ => {}
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        let _ = msg_tx.send(ServerMessage::Shutdown {
                            reason: "Server shutting down".to_string(),
                        }).await;
                        break;
                    }
                }
            }

            // Cleanup
            sender_task.abort();

            if let Some(player_id) = client.player_id {
                let mut guard = lobby.write().await;
                if let Some(transition) = guard.detach(player_id, client.connection) {
                    guard.dispatch(transition.notices);
                }
            }
            connections.fetch_sub(1, Ordering::SeqCst);

            info!("Client {} cleaned up", addr);
        });
    }

    /// Handle a client message. Rejections go back to this connection only.
    pub async fn handle_client_message(
        lobby: &SharedLobby,
        client: &mut ClientState,
        msg: ClientMessage,
        sender: &mpsc::Sender<ServerMessage>,
    ) {
        let result = match msg {
            ClientMessage::Ping { timestamp } => {
                let _ = sender.send(ServerMessage::Pong {
                    timestamp,
                    server_time: SystemTime::now()
                        .duration_since(UNIX_EPOCH)
                        .unwrap_or_default()
                        .as_millis() as u64,
                }).await;
                return;
            }
            ClientMessage::Join { name } => Self::handle_join(lobby, client, &name, sender).await,
            ClientMessage::Auth { player_id } => Self::handle_auth(lobby, client, player_id, sender).await,
            other => match client.player_id {
                Some(player_id) => Self::handle_player_action(lobby, client, player_id, other).await,
                None => {
                    let _ = sender.send(ServerMessage::error(
                        ErrorCode::NotJoined,
                        "Join or authenticate first",
                    )).await;
                    return;
                }
            },
        };

        if let Err(err) = result {
            debug!("Rejected request from {:?}: {}", client.player_id.map(|id| id.short()), err);
            let _ = sender.send(ServerMessage::Error(ServerError::from(&err))).await;
        }
    }

    /// Join as a new player and bind this connection to them.
    async fn handle_join(
        lobby: &SharedLobby,
        client: &mut ClientState,
        name: &str,
        sender: &mpsc::Sender<ServerMessage>,
    ) -> Result<(), GameError> {
        if client.player_id.is_some() {
            return Err(GameError::validation("connection already joined"));
        }

        let mut guard = lobby.write().await;
        let (player_id, mut transition) = guard.engine_mut().join_lobby(name)?;
        transition.extend(guard.attach(player_id, client.connection, sender.clone())?);
        client.player_id = Some(player_id);

        let display_name = guard
            .engine()
            .roster()
            .get(&player_id)
            .map(|p| p.name.clone())
            .unwrap_or_default();
        guard.send_to(player_id, ServerMessage::Joined { player_id, name: display_name.clone() });
        let view = guard.engine().snapshot(player_id, Instant::now().into_std())?;
        guard.send_to(player_id, ServerMessage::SessionInfo(view));
        guard.dispatch(transition.notices);

        info!("Player {} joined as {:?}", player_id.short(), display_name);
        Ok(())
    }

    /// Re-attach this connection to an existing player.
    async fn handle_auth(
        lobby: &SharedLobby,
        client: &mut ClientState,
        player_id: PlayerId,
        sender: &mpsc::Sender<ServerMessage>,
    ) -> Result<(), GameError> {
        let mut guard = lobby.write().await;
        if !guard.engine().roster().contains(&player_id) {
            return Err(GameError::UnknownPlayer);
        }

        let mut transition = Transition::new();
        if let Some(previous) = client.player_id.filter(|id| *id != player_id) {
            if let Some(detached) = guard.detach(previous, client.connection) {
                transition.extend(detached);
            }
        }
        transition.extend(guard.attach(player_id, client.connection, sender.clone())?);
        client.player_id = Some(player_id);

        let view = guard.engine().snapshot(player_id, Instant::now().into_std())?;
        guard.send_to(player_id, ServerMessage::SessionInfo(view));
        guard.dispatch(transition.notices);

        debug!("Connection {:?} authenticated as {}", client.connection, player_id.short());
        Ok(())
    }

    /// Route an action from a bound connection into the engine.
    async fn handle_player_action(
        lobby: &SharedLobby,
        client: &mut ClientState,
        player_id: PlayerId,
        msg: ClientMessage,
    ) -> Result<(), GameError> {
        let mut guard = lobby.write().await;
        let now = Instant::now().into_std();

        let transition = match msg {
            ClientMessage::StartGame => {
                let transition = guard.engine_mut().start_round(player_id)?;
                info!("Round started by {} with {} players", player_id.short(), guard.engine().roster().len());
                transition
            }
            ClientMessage::UpdateTask { task_id, done } => {
                guard.engine_mut().mark_done(player_id, task_id, done, now)?.1
            }
            ClientMessage::Sabotage => {
                let (_, transition) = guard.engine_mut().start_sabotage(player_id, now)?;
                info!("Sabotage triggered by {}", player_id.short());
                transition
            }
            ClientMessage::Emergency => guard.engine_mut().call_emergency(player_id)?,
            ClientMessage::Report { reported_id } => guard.engine_mut().report_body(player_id, reported_id)?,
            ClientMessage::Vote { target_id } => guard.engine_mut().cast_vote(player_id, target_id, now)?,
            ClientMessage::EndGame => {
                let transition = guard.engine_mut().end_game(player_id)?;
                info!("Round ended by {}", player_id.short());
                transition
            }
            ClientMessage::Leave => {
                let transition = guard.engine_mut().leave_lobby(player_id)?;
                guard.detach(player_id, client.connection);
                client.player_id = None;
                info!("Player {} left", player_id.short());
                transition
            }
            ClientMessage::SyncRequest => {
                let view = guard.engine().snapshot(player_id, now)?;
                guard.send_to(player_id, ServerMessage::SessionInfo(view));
                Transition::new()
            }
            ClientMessage::Join { .. } | ClientMessage::Auth { .. } | ClientMessage::Ping { .. } => {
                Transition::new()
            }
        };

        let timer = transition.timer;
        guard.dispatch(transition.notices);
        drop(guard);

        if let Some(request) = timer {
            Self::spawn_timer(lobby.clone(), request);
        }
        Ok(())
    }

    /// Spawn the task that drives a timer request.
    pub fn spawn_timer(lobby: SharedLobby, request: TimerRequest) {
        tokio::spawn(async move {
            match request {
                TimerRequest::MeetingCountdown(token) => Self::run_meeting_countdown(lobby, token).await,
                TimerRequest::VoteWindow(token) => Self::run_vote_window(lobby, token).await,
            }
        });
    }

    /// Tick the meeting countdown once a second until voting opens.
    async fn run_meeting_countdown(lobby: SharedLobby, token: RoundToken) {
        debug!("Meeting countdown {:?} started", token);
        loop {
            match Self::step_timer(&lobby, TimerRequest::MeetingCountdown(token)).await {
                TimerFlow::Continue => sleep(TIMER_STEP).await,
                TimerFlow::Finished => return,
            }
        }
    }

    /// Tick the vote window once a second until it resolves.
    async fn run_vote_window(lobby: SharedLobby, token: RoundToken) {
        debug!("Vote window {:?} opened", token);
        loop {
            sleep(TIMER_STEP).await;
            if let TimerFlow::Finished = Self::step_timer(&lobby, TimerRequest::VoteWindow(token)).await {
                return;
            }
        }
    }

    async fn step_timer(lobby: &SharedLobby, request: TimerRequest) -> TimerFlow {
        let mut guard = lobby.write().await;
        let now = Instant::now().into_std();

        let step = match request {
            TimerRequest::MeetingCountdown(token) => guard.engine_mut().countdown_tick(token, now),
            TimerRequest::VoteWindow(token) => guard.engine_mut().vote_timer_tick(token, now),
        };

        match step {
            TimerStep::Continue(transition) => {
                guard.dispatch(transition.notices);
                TimerFlow::Continue
            }
            TimerStep::Done(transition) => {
                let next = transition.timer;
                guard.dispatch(transition.notices);
                drop(guard);
                if let Some(next) = next {
                    Self::spawn_timer(lobby.clone(), next);
                }
                TimerFlow::Finished
            }
            TimerStep::Stale => {
                debug!("Timer {:?} is stale", request);
                TimerFlow::Finished
            }
        }
    }

    /// Run cleanup loop.
    async fn run_cleanup_loop(lobby: SharedLobby, every: Duration) {
        let mut interval = interval(every);

        loop {
            interval.tick().await;

            let reaped = lobby.write().await.reap_stale();
            for player_id in reaped {
                info!("Dropped stale connection for player {}", player_id.short());
            }
        }
    }

    /// Shutdown the server.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Get open connection count.
    pub fn connection_count(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use crate::core::catalog::TaskCatalog;
    use crate::game::rules::GameRules;
    use crate::game::state::{Phase, Role};

    fn create_test_server() -> GameServer {
        let config = ServerConfig {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            ..Default::default()
        };
        let engine = GameSession::with_rng(
            GameRules::default(),
            Arc::new(TaskCatalog::default()),
            StdRng::seed_from_u64(11),
        );
        GameServer::new(config, engine)
    }

    struct TestClient {
        state: ClientState,
        tx: mpsc::Sender<ServerMessage>,
        rx: mpsc::Receiver<ServerMessage>,
    }

    impl TestClient {
        fn new(conn: u64) -> Self {
            let (tx, rx) = mpsc::channel(256);
            Self {
                state: ClientState::new(ConnectionId(conn)),
                tx,
                rx,
            }
        }

        async fn send(&mut self, lobby: &SharedLobby, msg: ClientMessage) {
            GameServer::handle_client_message(lobby, &mut self.state, msg, &self.tx).await;
        }

        fn drain(&mut self) -> Vec<ServerMessage> {
            let mut out = Vec::new();
            while let Ok(msg) = self.rx.try_recv() {
                out.push(msg);
            }
            out
        }

        fn last_error(&mut self) -> Option<ErrorCode> {
            self.drain().into_iter().rev().find_map(|m| match m {
                ServerMessage::Error(e) => Some(e.code),
                _ => None,
            })
        }
    }

    async fn joined_clients(lobby: &SharedLobby, n: u64) -> Vec<TestClient> {
        let mut clients = Vec::new();
        for i in 0..n {
            let mut client = TestClient::new(i + 1);
            client.send(lobby, ClientMessage::Join { name: format!("player{}", i) }).await;
            clients.push(client);
        }
        clients
    }

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.outbound_buffer, 64);
        assert!(config.max_connections > 0);
    }

    #[tokio::test]
    async fn test_server_creation() {
        let server = create_test_server();
        assert_eq!(server.connection_count(), 0);
        assert_eq!(server.lobby().read().await.engine().phase(), Phase::Welcome);
    }

    #[tokio::test]
    async fn test_server_shutdown() {
        let server = create_test_server();
        server.shutdown();
        // Should not panic
    }

    #[tokio::test]
    async fn test_join_replies_with_id_and_view() {
        let server = create_test_server();
        let lobby = server.lobby();
        let mut client = TestClient::new(1);

        client.send(&lobby, ClientMessage::Join { name: "  alice ".to_string() }).await;

        let msgs = client.drain();
        let player_id = client.state.player_id.unwrap();
        assert_eq!(msgs[0], ServerMessage::Joined { player_id, name: "alice".to_string() });
        assert!(matches!(&msgs[1], ServerMessage::SessionInfo(view) if view.player_id == player_id));
        assert!(msgs.iter().any(|m| matches!(m, ServerMessage::PlayersUpdate { .. })));
    }

    #[tokio::test]
    async fn test_actions_before_join_are_rejected() {
        let server = create_test_server();
        let lobby = server.lobby();
        let mut client = TestClient::new(1);

        client.send(&lobby, ClientMessage::StartGame).await;
        assert_eq!(client.last_error(), Some(ErrorCode::NotJoined));
    }

    #[tokio::test]
    async fn test_ping_pong() {
        let server = create_test_server();
        let lobby = server.lobby();
        let mut client = TestClient::new(1);

        client.send(&lobby, ClientMessage::Ping { timestamp: 42 }).await;
        assert!(matches!(client.drain()[..], [ServerMessage::Pong { timestamp: 42, .. }]));
    }

    #[tokio::test]
    async fn test_errors_go_only_to_caller() {
        let server = create_test_server();
        let lobby = server.lobby();
        let mut clients = joined_clients(&lobby, 4).await;
        for c in clients.iter_mut() {
            c.drain();
        }

        // Only the leader may start
        clients[1].send(&lobby, ClientMessage::StartGame).await;
        assert_eq!(clients[1].last_error(), Some(ErrorCode::NotAuthorized));
        assert!(clients[0].drain().is_empty());
        assert!(clients[2].drain().is_empty());
    }

    #[tokio::test]
    async fn test_start_deals_private_roles() {
        let server = create_test_server();
        let lobby = server.lobby();
        let mut clients = joined_clients(&lobby, 4).await;
        for c in clients.iter_mut() {
            c.drain();
        }

        clients[0].send(&lobby, ClientMessage::StartGame).await;

        let mut impostors = 0;
        for c in clients.iter_mut() {
            let msgs = c.drain();
            let roles: Vec<Role> = msgs
                .iter()
                .filter_map(|m| match m {
                    ServerMessage::RoleAssigned { role, .. } => Some(*role),
                    _ => None,
                })
                .collect();
            assert_eq!(roles.len(), 1);
            if roles[0] == Role::Impostor {
                impostors += 1;
            }
            assert!(msgs.contains(&ServerMessage::GameStart));
            assert!(msgs.iter().any(|m| matches!(m, ServerMessage::TaskList { .. })));
        }
        assert_eq!(impostors, 1);
        assert_eq!(lobby.read().await.engine().phase(), Phase::Game);
    }

    #[tokio::test]
    async fn test_auth_reattaches_player() {
        let server = create_test_server();
        let lobby = server.lobby();
        let mut first = TestClient::new(1);
        first.send(&lobby, ClientMessage::Join { name: "alice".to_string() }).await;
        let player_id = first.state.player_id.unwrap();

        // Old socket goes away
        {
            let mut guard = lobby.write().await;
            guard.detach(player_id, first.state.connection);
        }
        assert!(!lobby.read().await.engine().roster().get(&player_id).unwrap().connected);

        let mut second = TestClient::new(2);
        second.send(&lobby, ClientMessage::Auth { player_id }).await;

        assert_eq!(second.state.player_id, Some(player_id));
        assert!(second.drain().iter().any(|m| matches!(m, ServerMessage::SessionInfo(v) if v.player_id == player_id)));
        assert!(lobby.read().await.engine().roster().get(&player_id).unwrap().connected);
    }

    #[tokio::test]
    async fn test_auth_unknown_player() {
        let server = create_test_server();
        let lobby = server.lobby();
        let mut client = TestClient::new(1);

        client.send(&lobby, ClientMessage::Auth { player_id: PlayerId::new_random() }).await;
        assert_eq!(client.last_error(), Some(ErrorCode::UnknownPlayer));
        assert!(client.state.player_id.is_none());
    }

    #[tokio::test]
    async fn test_leave_unbinds_connection() {
        let server = create_test_server();
        let lobby = server.lobby();
        let mut clients = joined_clients(&lobby, 2).await;

        clients[1].send(&lobby, ClientMessage::Leave).await;
        assert!(clients[1].state.player_id.is_none());
        assert_eq!(lobby.read().await.engine().roster().len(), 1);
        assert_eq!(lobby.read().await.connection_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_emergency_runs_countdown_then_vote_window() {
        let server = create_test_server();
        let lobby = server.lobby();
        let mut clients = joined_clients(&lobby, 4).await;
        clients[0].send(&lobby, ClientMessage::StartGame).await;
        for c in clients.iter_mut() {
            c.drain();
        }

        clients[2].send(&lobby, ClientMessage::Emergency).await;
        assert_eq!(lobby.read().await.engine().phase(), Phase::Emergency);

        sleep(Duration::from_secs(11)).await;
        assert_eq!(lobby.read().await.engine().phase(), Phase::Vote);

        let msgs = clients[3].drain();
        let ticks = msgs.iter().filter(|m| matches!(m, ServerMessage::CountdownTick { .. })).count();
        assert_eq!(ticks, 10);
        assert!(msgs.iter().any(|m| matches!(m, ServerMessage::VoteStarted { .. })));

        // Nobody votes; window closes without an ejection
        sleep(Duration::from_secs(121)).await;
        assert_eq!(lobby.read().await.engine().phase(), Phase::Game);
        let msgs = clients[3].drain();
        assert!(msgs.contains(&ServerMessage::EjectionResult { ejected: None }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_vote_resolves_before_window_closes() {
        let server = create_test_server();
        let lobby = server.lobby();
        let mut clients = joined_clients(&lobby, 4).await;
        clients[0].send(&lobby, ClientMessage::StartGame).await;
        clients[1].send(&lobby, ClientMessage::Emergency).await;
        sleep(Duration::from_secs(11)).await;
        assert_eq!(lobby.read().await.engine().phase(), Phase::Vote);

        for c in clients.iter_mut() {
            c.send(&lobby, ClientMessage::Vote { target_id: None }).await;
        }
        assert_eq!(lobby.read().await.engine().phase(), Phase::Game);

        // The old window timer must not fire into the next round
        sleep(Duration::from_secs(130)).await;
        assert_eq!(lobby.read().await.engine().phase(), Phase::Game);
        let ejections = clients[0]
            .drain()
            .into_iter()
            .filter(|m| matches!(m, ServerMessage::EjectionResult { .. }))
            .count();
        assert_eq!(ejections, 1);
    }
}
