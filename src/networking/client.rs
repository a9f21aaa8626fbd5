//! Session client - the one place where UI input and server traffic meet
//!
//! [`SessionClient::run`] selects over UI commands and connection events and
//! feeds both, one at a time, into the [`MoveCoordinator`]. The effects it
//! gets back are executed immediately: sends go to the [`ConnectionManager`],
//! UI updates to the UI channel.
//!
//! Create and join requests made while offline are remembered and sent as
//! soon as the connection comes up. The current game keeps running until the
//! server confirms the request with a snapshot; a rejected request leaves it
//! untouched. Every (re)connection re-fetches the current game with
//! `get-game`.

use crate::core::identity::{IdentityKey, IdentityStore};
use crate::game::coordinator::MoveCoordinator;
use crate::game::events::{Effect, Gesture, Notice, UiUpdate};
use crate::game::types::PlayerColor;
use crate::networking::connection::{ConnectionManager, ConnectionState, ConnectionStatus, NetEvent};
use shared::protocol::{ClientEvent, CreateGame, GameDetails, JoinGame, ServerEvent};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Requests from the UI layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientCommand {
    Gesture(Gesture),
    CreateGame(PlayerColor),
    JoinGame(String),
    /// Continue the game stored in the identity store
    Resume,
    Shutdown,
}

/// Create/join request not yet confirmed by a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingRequest {
    Create(PlayerColor),
    Join(String),
}

pub struct SessionClient {
    coordinator: MoveCoordinator,
    connection: ConnectionManager,
    net_rx: mpsc::Receiver<NetEvent>,
    identity: Box<dyn IdentityStore>,
    ui_tx: mpsc::UnboundedSender<UiUpdate>,
    pending: Option<PendingRequest>,
    was_connected: bool,
    live: bool,
}

impl SessionClient {
    pub fn new(
        player_id: impl Into<String>,
        identity: Box<dyn IdentityStore>,
        connection: (ConnectionManager, mpsc::Receiver<NetEvent>),
        ui_tx: mpsc::UnboundedSender<UiUpdate>,
    ) -> Self {
        let (connection, net_rx) = connection;
        Self {
            coordinator: MoveCoordinator::new(player_id),
            connection,
            net_rx,
            identity,
            ui_tx,
            pending: None,
            was_connected: false,
            live: false,
        }
    }

    /// Process commands and connection events until the UI shuts down.
    pub async fn run(mut self, mut commands: mpsc::Receiver<ClientCommand>) {
        let mut net_open = true;
        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(ClientCommand::Shutdown) | None => break,
                    Some(command) => self.handle_command(command),
                },
                event = self.net_rx.recv(), if net_open => match event {
                    Some(event) => self.handle_net_event(event),
                    None => {
                        debug!("[NETWORK] Connection task finished");
                        net_open = false;
                    }
                },
            }
        }
        self.connection.shutdown().await;
        info!("[SESSION] Session client stopped");
    }

    pub fn handle_command(&mut self, command: ClientCommand) {
        match command {
            ClientCommand::Gesture(gesture) => {
                let effects = self.coordinator.handle_gesture(gesture);
                self.execute(effects);
            }
            ClientCommand::CreateGame(color) => {
                info!("[SESSION] Creating a game as {}", color);
                self.start_request(PendingRequest::Create(color));
            }
            ClientCommand::JoinGame(game_id) => {
                let game_id = game_id.trim().to_string();
                if game_id.is_empty() {
                    self.notify(Notice::transient("Enter a game id to join"));
                    return;
                }
                info!("[SESSION] Joining game {}", game_id);
                self.start_request(PendingRequest::Join(game_id));
            }
            ClientCommand::Resume => self.resume(),
            ClientCommand::Shutdown => {}
        }
    }

    fn start_request(&mut self, request: PendingRequest) {
        self.pending = Some(request);
        if self.connection.is_connected() {
            self.send_pending();
        } else {
            debug!("[SESSION] Offline, request queued until connected");
        }
    }

    fn resume(&mut self) {
        let Some(game_id) = self.identity.get(IdentityKey::GameId) else {
            self.notify(Notice::transient("No game to resume"));
            return;
        };
        info!("[SESSION] Resuming game {}", game_id);
        let local = self.coordinator.session().local_player_id().to_string();
        self.coordinator = MoveCoordinator::resuming(local, game_id);
        self.pending = None;
        if self.connection.is_connected() {
            self.resync();
        }
    }

    fn resync(&mut self) {
        if let Some(event) = self.coordinator.resync_request() {
            info!("[NETWORK] Sending {}", event.name());
            self.connection.send(event);
        }
    }

    fn send_pending(&mut self) {
        let local = self.coordinator.session().local_player_id().to_string();
        let event = match &self.pending {
            Some(PendingRequest::Create(color)) => ClientEvent::CreateGame(CreateGame {
                player_id: local,
                color: (*color).into(),
            }),
            Some(PendingRequest::Join(game_id)) => ClientEvent::JoinGame(JoinGame {
                game_id: game_id.clone(),
                player_id: local,
            }),
            None => return,
        };
        info!("[NETWORK] Sending {}", event.name());
        self.connection.send(event);
    }

    pub fn handle_net_event(&mut self, event: NetEvent) {
        match event {
            NetEvent::Status(state) => self.connection_changed(state),
            NetEvent::Event(event) => self.server_event(event),
        }
    }

    fn connection_changed(&mut self, state: ConnectionState) {
        self.emit(UiUpdate::Connection(state.clone()));
        let was_live = self.live;
        self.live = state.status == ConnectionStatus::Connected;
        match state.status {
            ConnectionStatus::Connected => {
                if self.was_connected {
                    self.notify(Notice::transient("Reconnected"));
                }
                self.was_connected = true;
                self.resync();
                self.send_pending();
            }
            ConnectionStatus::Disconnected => {
                // Refused attempts are reported by the connection state alone
                if let Some(reason) = state.last_error.filter(|_| was_live) {
                    self.notify(Notice::transient(format!("Connection lost ({}), reconnecting", reason)));
                }
            }
            ConnectionStatus::Exhausted => {
                error!("[NETWORK] Reconnection attempts exhausted");
                self.notify(Notice::fatal(
                    "Lost connection to the server. Reload required.",
                ));
            }
            ConnectionStatus::Connecting => {}
        }
    }

    fn server_event(&mut self, event: ServerEvent) {
        match event {
            ServerEvent::GameCreated(details) => self.snapshot(&details, true),
            ServerEvent::GameDetails(details) | ServerEvent::PlayerJoined(details) => {
                self.snapshot(&details, false)
            }
            ServerEvent::OpponentMadeMove(update) => {
                let effects = self.coordinator.apply_opponent_move(&update);
                self.execute(effects);
            }
            ServerEvent::JoinGameFailed(failure) => {
                warn!("[SESSION] Join failed: {}", failure.message());
                if matches!(self.pending, Some(PendingRequest::Join(_))) {
                    self.pending = None;
                }
                self.notify(Notice::transient(failure.message()));
            }
            ServerEvent::Ping => debug!("[NETWORK] Ping"),
        }
    }

    /// Does this snapshot answer the pending create or join?
    fn confirms_pending(&self, details: &GameDetails, created: bool) -> bool {
        match &self.pending {
            Some(PendingRequest::Join(game_id)) => *game_id == details.game_id,
            Some(PendingRequest::Create(_)) => {
                created && details.player1_id == self.coordinator.session().local_player_id()
            }
            None => false,
        }
    }

    fn snapshot(&mut self, details: &GameDetails, created: bool) {
        if self.confirms_pending(details, created) {
            self.pending = None;
            self.coordinator.begin_new_session();
            info!("[SESSION] In game {}", details.game_id);
        } else if self.coordinator.session().session_id().is_none() {
            // Nothing asked for this game
            debug!("[SESSION] Unrequested snapshot for {} ignored", details.game_id);
            return;
        }

        let effects = self.coordinator.apply_snapshot(details);
        if self.coordinator.session().session_id() == Some(details.game_id.as_str()) {
            if self.identity.get(IdentityKey::GameId).as_deref() != Some(details.game_id.as_str()) {
                if let Err(e) = self.identity.set(IdentityKey::GameId, &details.game_id) {
                    warn!("[IDENTITY] Could not store game id: {}", e);
                }
            }
        }
        self.execute(effects);
    }

    fn execute(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Send(event) => self.connection.send(event),
                Effect::Ui(update) => self.emit(update),
            }
        }
    }

    fn notify(&self, notice: Notice) {
        self.emit(UiUpdate::Notice(notice));
    }

    fn emit(&self, update: UiUpdate) {
        if self.ui_tx.send(update).is_err() {
            debug!("[SESSION] UI receiver gone");
        }
    }
}
