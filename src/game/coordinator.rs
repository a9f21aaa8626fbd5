//! Move coordinator - the single writer of the session
//!
//! Turns UI gestures into committed local moves and reconciles the session
//! with what the server reports. Every entry point returns the [`Effect`]s to
//! run, in order; nothing here performs I/O.
//!
//! # Local moves
//!
//! ```text
//! gesture → turn check → PendingMove → oracle apply → history → terminal check → make-move
//! ```
//!
//! Gestures are ignored unless a position is known, the local color is to
//! move, and the game is not over. Illegal targets revert the selection
//! without touching the network.
//!
//! # Remote updates
//!
//! Snapshots (`game-details`, `game-created`, `player-joined`) replace the
//! session wholesale. `opponent-made-move` is re-validated against the local
//! position; anything that does not line up produces a desync notice and a
//! `get-game` request so the next snapshot repairs the state.

use crate::game::error::GameError;
use crate::game::events::{Effect, Gesture, Notice, UiUpdate};
use crate::game::rules::{self, MoveKind};
use crate::game::selection::PendingMove;
use crate::game::session::{Session, SnapshotChange};
use crate::game::terminal::TerminalDetector;
use crate::game::types::{ChessMove, PlayerColor, Position};
use shakmaty::{Role, Square};
use shared::protocol::{ClientEvent, GameDetails, GameRef, MakeMove, OpponentMove};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone)]
pub struct MoveCoordinator {
    session: Session,
    pending: PendingMove,
    detector: TerminalDetector,
    last_move: Option<(ChessMove, MoveKind)>,
}

impl MoveCoordinator {
    pub fn new(local_player_id: impl Into<String>) -> Self {
        Self::with_session(Session::new(local_player_id))
    }

    /// Coordinator for a game joined in an earlier run. The position stays
    /// unknown until the server answers `get-game`.
    pub fn resuming(local_player_id: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self::with_session(Session::resuming(local_player_id, session_id))
    }

    fn with_session(session: Session) -> Self {
        Self {
            session,
            pending: PendingMove::Idle,
            detector: TerminalDetector::new(),
            last_move: None,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn pending(&self) -> &PendingMove {
        &self.pending
    }

    /// Drop the current session before creating or joining another game.
    pub fn begin_new_session(&mut self) {
        let local = self.session.local_player_id().to_string();
        info!("[SESSION] Starting a new session for {}", local);
        *self = Self::new(local);
    }

    /// True when a local gesture may start or complete a move.
    pub fn can_move(&self) -> bool {
        match self.session.position() {
            Some(position) => self.session.is_local_turn() && !rules::flags(position).game_over,
            None => false,
        }
    }

    pub fn handle_gesture(&mut self, gesture: Gesture) -> Vec<Effect> {
        match gesture {
            Gesture::SquareClicked(square) => self.square_clicked(square),
            Gesture::DragStarted(square) => self.drag_started(square),
            Gesture::DraggedOver(square) => self.dragged_over(square),
            Gesture::Dropped { from, to, promotion } => self.piece_dropped(from, to, promotion),
            Gesture::PromotionChosen(role) => self.promotion_chosen(role),
            Gesture::Cancel => self.cancel(),
        }
    }

    pub fn square_clicked(&mut self, square: Square) -> Vec<Effect> {
        if !self.can_move() {
            return Vec::new();
        }
        match &self.pending {
            PendingMove::AwaitingPromotion { .. } => Vec::new(),
            PendingMove::Idle => self.select(square),
            PendingMove::AwaitingSelection { from, .. } | PendingMove::AwaitingTarget { from, .. } => {
                let from = *from;
                match self.pending.option_for(square) {
                    Some(option) if option.promotion => self.request_promotion(from, square),
                    Some(_) => self.commit(ChessMove::new(from, square)),
                    None => self.select(square),
                }
            }
        }
    }

    pub fn drag_started(&mut self, square: Square) -> Vec<Effect> {
        if !self.can_move() || matches!(self.pending, PendingMove::AwaitingPromotion { .. }) {
            return Vec::new();
        }
        self.select(square)
    }

    pub fn dragged_over(&mut self, square: Square) -> Vec<Effect> {
        let (from, options) = match &self.pending {
            PendingMove::AwaitingSelection { from, options } | PendingMove::AwaitingTarget { from, options, .. } => {
                (*from, options.clone())
            }
            _ => return Vec::new(),
        };
        self.pending = if options.iter().any(|option| option.to == square) {
            PendingMove::AwaitingTarget {
                from,
                options,
                to: square,
            }
        } else {
            PendingMove::AwaitingSelection { from, options }
        };
        Vec::new()
    }

    pub fn piece_dropped(&mut self, from: Square, to: Square, promotion: Option<Role>) -> Vec<Effect> {
        if !self.can_move() {
            return Vec::new();
        }
        let Some(position) = self.session.position() else {
            return Vec::new();
        };
        let option = rules::legal_moves_from(position, from)
            .into_iter()
            .find(|option| option.to == to);

        match (option, promotion) {
            (None, _) => {
                debug!("[MOVE] Dropped {}{} is not legal, reverting", from, to);
                self.reset_selection()
            }
            (Some(option), None) if option.promotion => self.request_promotion(from, to),
            (Some(option), Some(role)) if option.promotion => {
                self.commit(ChessMove::new(from, to).with_promotion(role))
            }
            (Some(_), _) => self.commit(ChessMove::new(from, to)),
        }
    }

    pub fn promotion_chosen(&mut self, role: Role) -> Vec<Effect> {
        let PendingMove::AwaitingPromotion { from, to } = self.pending else {
            return Vec::new();
        };
        if !rules::PROMOTION_CHOICES.contains(&role) {
            debug!("[MOVE] {:?} is not a promotion piece", role);
            return Vec::new();
        }
        if !self.can_move() {
            return self.reset_selection();
        }
        self.commit(ChessMove::new(from, to).with_promotion(role))
    }

    pub fn cancel(&mut self) -> Vec<Effect> {
        self.reset_selection()
    }

    fn select(&mut self, square: Square) -> Vec<Effect> {
        let Some(position) = self.session.position() else {
            return Vec::new();
        };
        let options = rules::legal_moves_from(position, square);
        if options.is_empty() {
            return self.reset_selection();
        }
        self.pending = PendingMove::AwaitingSelection {
            from: square,
            options: options.clone(),
        };
        vec![Effect::Ui(UiUpdate::MoveOptions { from: square, options })]
    }

    fn request_promotion(&mut self, from: Square, to: Square) -> Vec<Effect> {
        debug!("[MOVE] {}{} needs a promotion piece", from, to);
        self.pending = PendingMove::AwaitingPromotion { from, to };
        vec![Effect::Ui(UiUpdate::PromotionRequested { from, to })]
    }

    fn reset_selection(&mut self) -> Vec<Effect> {
        if self.pending.is_idle() {
            return Vec::new();
        }
        self.pending.clear();
        vec![Effect::Ui(UiUpdate::SelectionCleared)]
    }

    fn commit(&mut self, mv: ChessMove) -> Vec<Effect> {
        let Some(position) = self.session.position() else {
            return self.reset_selection();
        };
        let applied = match rules::apply_move(position, &mv) {
            Ok(applied) => applied,
            Err(e) => {
                error!("[MOVE] Oracle refused a move it offered: {}", e);
                return self.reset_selection();
            }
        };

        info!("[MOVE] Local move {} ({:?})", applied.mv, applied.kind);
        self.session.record_move(applied.mv, applied.position.clone());
        self.last_move = Some((applied.mv, applied.kind));

        let mut effects = self.position_changed();
        match self.session.session_id() {
            Some(game_id) => effects.push(Effect::Send(ClientEvent::MakeMove(MakeMove {
                game_id: game_id.to_string(),
                player_id: self.session.local_player_id().to_string(),
                move_data: applied.mv.to_wire(&applied.position),
            }))),
            None => error!("[MOVE] Move committed without a game id, not sent"),
        }

        self.pending.clear();
        effects.push(Effect::Ui(UiUpdate::SelectionCleared));
        effects
    }

    /// Board, check highlight and game-over effects for the current position.
    fn position_changed(&mut self) -> Vec<Effect> {
        let Some(position) = self.session.position().cloned() else {
            return Vec::new();
        };
        let mut effects = vec![Effect::Ui(UiUpdate::Board {
            fen: position.fen().to_string(),
            orientation: self.session.assigned_color().unwrap_or(PlayerColor::White),
            side_to_move: position.side_to_move(),
            last_move: self.last_move,
        })];
        effects.extend(self.evaluate());
        effects
    }

    /// Re-run terminal detection on the current position.
    ///
    /// The check highlight is always reported; game over only the first time
    /// a terminal position is seen.
    pub fn evaluate(&mut self) -> Vec<Effect> {
        let Some(position) = self.session.position() else {
            return Vec::new();
        };
        let evaluation = self.detector.evaluate(position);
        let mut effects = vec![Effect::Ui(UiUpdate::Check {
            king: evaluation.check_square,
        })];
        if let Some(game_over) = evaluation.game_over {
            effects.push(Effect::Ui(UiUpdate::GameOver {
                outcome: game_over.outcome,
                cause: game_over.cause,
            }));
        }
        effects
    }

    /// `get-game` for the current session, if one is known.
    pub fn resync_request(&self) -> Option<ClientEvent> {
        self.session.session_id().map(|game_id| {
            ClientEvent::GetGame(GameRef {
                game_id: game_id.to_string(),
            })
        })
    }

    fn desync(&mut self, message: String) -> Vec<Effect> {
        let fault = GameError::Desync { message };
        warn!("[SESSION] {}", fault);
        let mut effects = self.reset_selection();
        effects.push(Effect::Ui(UiUpdate::Notice(Notice::desync(fault.to_string()))));
        if let Some(request) = self.resync_request() {
            effects.push(Effect::Send(request));
        }
        effects
    }

    /// True when `mv` is the move that produced the current position. A stray
    /// promotion letter on a quiet move still matches.
    fn is_last_move(&self, mv: &ChessMove) -> bool {
        self.session.last_move().is_some_and(|last| {
            last.from == mv.from
                && last.to == mv.to
                && (last.promotion.is_none() || last.promotion == mv.promotion)
        })
    }

    /// Apply a full snapshot from the server.
    pub fn apply_snapshot(&mut self, details: &GameDetails) -> Vec<Effect> {
        if let Some(current) = self.session.session_id() {
            if current != details.game_id {
                debug!(
                    "[SESSION] Ignoring snapshot for {} while in {}",
                    details.game_id, current
                );
                return Vec::new();
            }
        }

        let position = match details.fen.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(fen) => match Position::from_fen(fen) {
                Ok(position) => Some(position),
                Err(e) => {
                    // Asking again would return the same snapshot
                    warn!("[SESSION] Unusable snapshot for {}: {}", details.game_id, e);
                    return vec![Effect::Ui(UiUpdate::Notice(Notice::desync(format!(
                        "Server sent an unreadable position for game {}",
                        details.game_id
                    ))))];
                }
            },
        };

        match self.session.apply_snapshot(details, position) {
            SnapshotChange::Unchanged => Vec::new(),
            SnapshotChange::Replaced => {
                self.last_move = None;
                let mut effects = self.reset_selection();
                effects.extend(self.position_changed());
                effects
            }
        }
    }

    /// Apply an incremental update relayed from the opponent.
    pub fn apply_opponent_move(&mut self, update: &OpponentMove) -> Vec<Effect> {
        if update.sender_id.as_deref() == Some(self.session.local_player_id()) {
            debug!("[MOVE] Ignoring echo of our own move");
            return Vec::new();
        }

        let Some(current) = self.session.position().cloned() else {
            debug!("[MOVE] Opponent move before any snapshot, requesting game");
            return self.resync_request().map(Effect::Send).into_iter().collect();
        };

        let reported = match update.reported_fen().map(Position::from_fen) {
            None => None,
            Some(Ok(position)) => Some(position),
            Some(Err(e)) => return self.desync(format!("Opponent reported an unreadable position: {}", e)),
        };

        if reported.as_ref() == Some(&current) {
            debug!("[MOVE] Duplicate opponent update ignored");
            return Vec::new();
        }

        let Some(data) = &update.move_data else {
            return match reported {
                Some(_) => {
                    // Position-only update: fetch the snapshot instead of guessing
                    debug!("[MOVE] Opponent sent a bare position, requesting game");
                    self.resync_request().map(Effect::Send).into_iter().collect()
                }
                None => {
                    warn!("[MOVE] Empty opponent update ignored");
                    Vec::new()
                }
            };
        };

        let mv = match ChessMove::from_wire(data) {
            Ok(mv) => mv,
            Err(e) => return self.desync(format!("Opponent move unreadable: {}", e)),
        };

        if self.session.is_local_turn() {
            if reported.is_none() && self.is_last_move(&mv) {
                debug!("[MOVE] Repeated opponent move {} ignored", mv);
                return Vec::new();
            }
            return self.desync(format!("Opponent moved {} during our turn", mv));
        }

        let applied = match rules::apply_move(&current, &mv) {
            Ok(applied) => applied,
            Err(e) => return self.desync(format!("Opponent move rejected: {}", e)),
        };

        if let Some(reported) = &reported {
            if *reported != applied.position {
                return self.desync(format!(
                    "Opponent move {} gives {} but server reported {}",
                    mv,
                    applied.position.fen(),
                    reported.fen()
                ));
            }
        }

        info!("[MOVE] Opponent move {} ({:?})", applied.mv, applied.kind);
        self.session.record_move(applied.mv, applied.position);
        self.last_move = Some((applied.mv, applied.kind));
        let mut effects = self.reset_selection();
        effects.extend(self.position_changed());
        effects
    }
}
