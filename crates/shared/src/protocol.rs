use serde::{Deserialize, Serialize};

/// Side a player is seated on, as spelled on the wire.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum WireColor {
    White,
    Black,
}

/// A move as exchanged with the server: UCI squares plus an optional
/// promotion letter and the FEN of the position the move produced.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MoveData {
    pub from: String,
    pub to: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promotion: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fen: Option<String>,
}

/// Full session snapshot. `fen` is absent until the first move is stored.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GameDetails {
    pub game_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fen: Option<String>,
    pub player1_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player2_id: Option<String>,
    /// Color chosen by `player1_id` when the game was created
    pub color: WireColor,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GameRef {
    pub game_id: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CreateGame {
    pub player_id: String,
    pub color: WireColor,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct JoinGame {
    pub game_id: String,
    pub player_id: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MakeMove {
    pub game_id: String,
    pub player_id: String,
    pub move_data: MoveData,
}

/// Incremental update relayed from the opponent. Servers send either the move
/// (optionally with the resulting FEN) or just the new position.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct OpponentMove {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub move_data: Option<MoveData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fen: Option<String>,
}

impl OpponentMove {
    /// Resulting position reported by the sender, wherever it was placed.
    pub fn reported_fen(&self) -> Option<&str> {
        self.move_data
            .as_ref()
            .and_then(|data| data.fen.as_deref())
            .or(self.fen.as_deref())
    }
}

/// Join rejection. Some servers send `{ "message": ... }`, others a bare string.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(untagged)]
pub enum JoinFailure {
    Message { message: String },
    Text(String),
}

impl JoinFailure {
    pub fn message(&self) -> &str {
        match self {
            JoinFailure::Message { message } => message,
            JoinFailure::Text(text) => text,
        }
    }
}

/// Client → Server
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientEvent {
    GetGame(GameRef),
    CreateGame(CreateGame),
    JoinGame(JoinGame),
    MakeMove(MakeMove),
}

/// Server → Client
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerEvent {
    GameDetails(GameDetails),
    GameCreated(GameDetails),
    PlayerJoined(GameDetails),
    OpponentMadeMove(OpponentMove),
    JoinGameFailed(JoinFailure),
    Ping,
}

impl ClientEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ClientEvent::GetGame(_) => "get-game",
            ClientEvent::CreateGame(_) => "create-game",
            ClientEvent::JoinGame(_) => "join-game",
            ClientEvent::MakeMove(_) => "make-move",
        }
    }

    /// Encode as one text frame
    pub fn to_frame(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl ServerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::GameDetails(_) => "game-details",
            ServerEvent::GameCreated(_) => "game-created",
            ServerEvent::PlayerJoined(_) => "player-joined",
            ServerEvent::OpponentMadeMove(_) => "opponent-made-move",
            ServerEvent::JoinGameFailed(_) => "join-game-failed",
            ServerEvent::Ping => "ping",
        }
    }

    /// Decode one text frame
    pub fn from_frame(frame: &str) -> serde_json::Result<Self> {
        serde_json::from_str(frame)
    }

    /// Snapshot carried by this event, if it is a full resynchronization.
    pub fn snapshot(&self) -> Option<&GameDetails> {
        match self {
            ServerEvent::GameDetails(details)
            | ServerEvent::GameCreated(details)
            | ServerEvent::PlayerJoined(details) => Some(details),
            _ => None,
        }
    }
}
