//! Messages flowing between the UI layer, the coordinator and the network.
//!
//! The UI sends [`Gesture`]s in and receives [`UiUpdate`]s back. The
//! coordinator answers every input with a list of [`Effect`]s that the
//! session client executes in order.

use crate::game::rules::{MoveKind, MoveOption};
use crate::game::terminal::TerminalOutcome;
use crate::game::types::{ChessMove, PlayerColor};
use crate::networking::connection::ConnectionState;
use shakmaty::{Role, Square};
use shared::protocol::ClientEvent;

/// Input from the rendering layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Gesture {
    SquareClicked(Square),
    DragStarted(Square),
    DraggedOver(Square),
    Dropped {
        from: Square,
        to: Square,
        promotion: Option<Role>,
    },
    PromotionChosen(Role),
    Cancel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Informational, disappears on its own
    Transient,
    /// Local state disagreed with the server and a resync was requested
    Desync,
    /// The session cannot continue without a restart
    Fatal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub severity: Severity,
    pub message: String,
}

impl Notice {
    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Transient,
            message: message.into(),
        }
    }

    pub fn desync(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Desync,
            message: message.into(),
        }
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Fatal,
            message: message.into(),
        }
    }
}

/// Output to the rendering layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiUpdate {
    /// Board must be redrawn from `fen`
    Board {
        fen: String,
        orientation: PlayerColor,
        side_to_move: PlayerColor,
        last_move: Option<(ChessMove, MoveKind)>,
    },
    /// Legal destinations of the selected square
    MoveOptions { from: Square, options: Vec<MoveOption> },
    SelectionCleared,
    /// Ask the player which piece to promote to
    PromotionRequested { from: Square, to: Square },
    /// King to highlight, `None` clears the highlight
    Check { king: Option<Square> },
    GameOver { outcome: TerminalOutcome, cause: String },
    Notice(Notice),
    Connection(ConnectionState),
}

/// Something the session client must do after the coordinator ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Send(ClientEvent),
    Ui(UiUpdate),
}

impl Effect {
    pub fn as_send(&self) -> Option<&ClientEvent> {
        match self {
            Effect::Send(event) => Some(event),
            Effect::Ui(_) => None,
        }
    }
}
