//! Session state - the local model of one two-player game
//!
//! Holds the identifiers of the game and both players, the local player's
//! orientation, the current position and the move history. Only the
//! [`MoveCoordinator`](crate::game::coordinator::MoveCoordinator) writes to it.
//!
//! # Invariant
//!
//! `position` is always `base` with exactly `history` applied in order. `base`
//! is the standard starting position, or the position delivered by the last
//! snapshot that replaced the state wholesale.

use crate::game::error::GameResult;
use crate::game::rules;
use crate::game::types::{ChessMove, PlayerColor, Position};
use shared::protocol::GameDetails;
use tracing::{debug, info};

/// Resolve the local player's color from the single color a session records.
///
/// The server stores the color picked by whoever created the game. That
/// player keeps it; anyone else plays the opposite side.
pub fn resolve_color(local_player_id: &str, player1_id: &str, stored: PlayerColor) -> PlayerColor {
    if local_player_id == player1_id {
        stored
    } else {
        stored.opposite()
    }
}

/// What a snapshot did to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotChange {
    /// Position and history were already what the snapshot describes
    Unchanged,
    /// Position was replaced and history restarted from it
    Replaced,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    session_id: Option<String>,
    local_player_id: String,
    player1_id: Option<String>,
    assigned_color: Option<PlayerColor>,
    remote_player_id: Option<String>,
    base: Option<Position>,
    position: Option<Position>,
    history: Vec<ChessMove>,
}

impl Session {
    pub fn new(local_player_id: impl Into<String>) -> Self {
        Self {
            session_id: None,
            local_player_id: local_player_id.into(),
            player1_id: None,
            assigned_color: None,
            remote_player_id: None,
            base: None,
            position: None,
            history: Vec::new(),
        }
    }

    /// Session that is known by id but has not received a snapshot yet.
    pub fn resuming(local_player_id: impl Into<String>, session_id: impl Into<String>) -> Self {
        let mut session = Self::new(local_player_id);
        session.session_id = Some(session_id.into());
        session
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn local_player_id(&self) -> &str {
        &self.local_player_id
    }

    pub fn player1_id(&self) -> Option<&str> {
        self.player1_id.as_deref()
    }

    pub fn assigned_color(&self) -> Option<PlayerColor> {
        self.assigned_color
    }

    pub fn remote_player_id(&self) -> Option<&str> {
        self.remote_player_id.as_deref()
    }

    pub fn position(&self) -> Option<&Position> {
        self.position.as_ref()
    }

    pub fn history(&self) -> &[ChessMove] {
        &self.history
    }

    pub fn last_move(&self) -> Option<&ChessMove> {
        self.history.last()
    }

    /// True when a position is known and the local player is to move.
    pub fn is_local_turn(&self) -> bool {
        match (&self.position, self.assigned_color) {
            (Some(position), Some(color)) => position.side_to_move() == color,
            _ => false,
        }
    }

    /// Apply a full snapshot. Calling this again with the same snapshot leaves
    /// the session untouched.
    pub fn apply_snapshot(&mut self, details: &GameDetails, position: Option<Position>) -> SnapshotChange {
        let stored = PlayerColor::from(details.color);
        self.session_id = Some(details.game_id.clone());
        self.player1_id = Some(details.player1_id.clone());
        self.assigned_color = Some(resolve_color(&self.local_player_id, &details.player1_id, stored));
        self.remote_player_id = if self.local_player_id == details.player1_id {
            details.player2_id.clone()
        } else {
            Some(details.player1_id.clone())
        };

        match position {
            None => {
                // No position stored yet: the game starts from scratch
                let initial = rules::initial_position();
                let change = if self.base.as_ref() == Some(&initial)
                    && self.position.as_ref() == Some(&initial)
                    && self.history.is_empty()
                {
                    SnapshotChange::Unchanged
                } else {
                    SnapshotChange::Replaced
                };
                self.base = Some(initial.clone());
                self.position = Some(initial);
                self.history.clear();
                info!("[SESSION] Game {} reset to the starting position", details.game_id);
                change
            }
            Some(position) if self.position.as_ref() == Some(&position) => {
                debug!("[SESSION] Snapshot for {} matches local position", details.game_id);
                SnapshotChange::Unchanged
            }
            Some(position) => {
                info!(
                    "[SESSION] Game {} resynchronized to {} (dropped {} local moves)",
                    details.game_id,
                    position.fen(),
                    self.history.len()
                );
                self.base = Some(position.clone());
                self.position = Some(position);
                self.history.clear();
                SnapshotChange::Replaced
            }
        }
    }

    /// Append a move and the position it produced.
    pub fn record_move(&mut self, mv: ChessMove, position: Position) {
        debug!("[SESSION] {} -> {}", mv, position.fen());
        self.history.push(mv);
        self.position = Some(position);
    }

    /// Recompute the position from `base` and `history`.
    pub fn replay(&self) -> GameResult<Option<Position>> {
        match &self.base {
            Some(base) => rules::replay(base, &self.history).map(Some),
            None => Ok(None),
        }
    }
}
