//! Terminal state detection
//!
//! Classifies every position the session reaches and raises a game-over
//! notification when the game ends.
//!
//! # Outcomes
//!
//! ## Checkmate
//! - **Checkmate(White)**: Black is to move, in check, with no legal moves
//! - **Checkmate(Black)**: White is to move, in check, with no legal moves
//!
//! ## Draws
//! - **Draw**: fifty-move rule
//! - **Stalemate**: side to move has no legal moves but is NOT in check
//! - **InsufficientMaterial**: neither side can deliver mate (e.g. K vs K)
//!
//! When several flags hold at once the first in the order checkmate, draw,
//! stalemate, insufficient material wins.
//!
//! # Notification
//!
//! [`TerminalDetector`] remembers which terminal positions it has already
//! announced, so re-evaluating the same position (after a redundant snapshot
//! or a re-render) never produces a second game-over event.
//!
//! # Reference
//!
//! FIDE Laws of Chess: https://www.fide.com/FIDE/handbook/LawsOfChess.pdf
//! - Article 5: Checkmate, stalemate, draws
//! - Article 9.3: Fifty-move rule

use crate::game::rules::{self, PositionFlags};
use crate::game::types::{PlayerColor, Position};
use serde::Serialize;
use shakmaty::Square;
use std::collections::HashSet;
use tracing::info;

/// Classification of a position.
///
/// Exactly one variant applies at a time. `InProgress` is never announced
/// as game over.
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy, Serialize)]
pub enum TerminalOutcome {
    /// Game is still in progress
    #[default]
    InProgress,

    /// The given side delivered checkmate
    Checkmate(PlayerColor),

    /// Draw by rule (fifty-move rule), or game over with no specific cause
    Draw,

    /// Side to move has no legal moves and is not in check
    Stalemate,

    /// Neither side has enough material to mate
    InsufficientMaterial,
}

impl TerminalOutcome {
    /// Pick the outcome for `flags` in a position where `side_to_move` is
    /// to move.
    pub fn classify(flags: &PositionFlags, side_to_move: PlayerColor) -> Self {
        if !flags.game_over {
            TerminalOutcome::InProgress
        } else if flags.checkmate {
            // The mated side is the one to move
            TerminalOutcome::Checkmate(side_to_move.opposite())
        } else if flags.draw {
            TerminalOutcome::Draw
        } else if flags.stalemate {
            TerminalOutcome::Stalemate
        } else if flags.insufficient_material {
            TerminalOutcome::InsufficientMaterial
        } else {
            TerminalOutcome::Draw
        }
    }
}

/// Message shown when the game ends.
///
/// Empty when game over is asserted without any recognized cause.
pub fn cause(flags: &PositionFlags, side_to_move: PlayerColor) -> String {
    if !flags.game_over {
        return String::new();
    }
    if flags.checkmate {
        format!("{} won the game", side_to_move.opposite().name())
    } else if flags.draw {
        "Draw".to_string()
    } else if flags.stalemate {
        "Game Ended Stalemate".to_string()
    } else if flags.insufficient_material {
        "Game Ended Insufficient Material".to_string()
    } else {
        String::new()
    }
}

/// Game-over notification, raised once per terminal position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GameOver {
    pub outcome: TerminalOutcome,
    pub cause: String,
}

/// Result of evaluating one position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    pub flags: PositionFlags,
    pub outcome: TerminalOutcome,
    /// King square to highlight while the side to move is in check
    pub check_square: Option<Square>,
    /// Present only the first time a terminal position is seen
    pub game_over: Option<GameOver>,
}

/// Evaluates positions and de-duplicates game-over notifications.
#[derive(Debug, Default, Clone)]
pub struct TerminalDetector {
    announced: HashSet<String>,
}

impl TerminalDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn evaluate(&mut self, position: &Position) -> Evaluation {
        let flags = rules::flags(position);
        self.evaluate_flags(position, flags)
    }

    fn evaluate_flags(&mut self, position: &Position, flags: PositionFlags) -> Evaluation {
        let side_to_move = position.side_to_move();
        let outcome = TerminalOutcome::classify(&flags, side_to_move);
        let check_square = if flags.check {
            rules::king_square(position, side_to_move)
        } else {
            None
        };

        let game_over = if flags.game_over && self.announced.insert(position.fen().to_string()) {
            let cause = cause(&flags, side_to_move);
            info!("[GAME] ========== GAME OVER ==========");
            info!("[GAME] {:?} - {}", outcome, cause);
            Some(GameOver { outcome, cause })
        } else {
            None
        };

        Evaluation {
            flags,
            outcome,
            check_square,
            game_over,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::types::ChessMove;

    fn fools_mate() -> Position {
        let moves: Vec<ChessMove> = ["f2f3", "e7e5", "g2g4", "d8h4"]
            .iter()
            .map(|m| m.parse().unwrap())
            .collect();
        rules::replay(&rules::initial_position(), &moves).unwrap()
    }

    fn scholars_mate() -> Position {
        let moves: Vec<ChessMove> = ["e2e4", "e7e5", "f1c4", "b8c6", "d1h5", "g8f6", "h5f7"]
            .iter()
            .map(|m| m.parse().unwrap())
            .collect();
        rules::replay(&rules::initial_position(), &moves).unwrap()
    }

    #[test]
    fn test_default_is_in_progress() {
        //! Verifies TerminalOutcome defaults to InProgress
        let outcome = TerminalOutcome::default();
        assert_eq!(outcome, TerminalOutcome::InProgress);
    }

    #[test]
    fn test_start_position_is_in_progress() {
        let mut detector = TerminalDetector::new();
        let evaluation = detector.evaluate(&rules::initial_position());
        assert_eq!(evaluation.outcome, TerminalOutcome::InProgress);
        assert!(evaluation.game_over.is_none());
        assert!(evaluation.check_square.is_none());
    }

    #[test]
    fn test_checkmate_with_black_to_move() {
        //! Black is mated, so White is the winner
        let mut detector = TerminalDetector::new();
        let evaluation = detector.evaluate(&scholars_mate());
        assert_eq!(evaluation.outcome, TerminalOutcome::Checkmate(PlayerColor::White));
        assert_eq!(evaluation.check_square, Some(Square::E8));
        let game_over = evaluation.game_over.expect("First evaluation announces");
        assert_eq!(game_over.cause, "White won the game");
    }

    #[test]
    fn test_checkmate_with_white_to_move() {
        let mut detector = TerminalDetector::new();
        let evaluation = detector.evaluate(&fools_mate());
        assert_eq!(evaluation.outcome, TerminalOutcome::Checkmate(PlayerColor::Black));
        assert_eq!(
            evaluation.game_over.map(|g| g.cause).as_deref(),
            Some("Black won the game")
        );
    }

    #[test]
    fn test_notification_fires_once_per_position() {
        let mut detector = TerminalDetector::new();
        let position = scholars_mate();
        assert!(detector.evaluate(&position).game_over.is_some());
        for _ in 0..5 {
            let again = detector.evaluate(&position);
            assert!(again.game_over.is_none());
            assert_eq!(again.outcome, TerminalOutcome::Checkmate(PlayerColor::White));
        }
    }

    #[test]
    fn test_each_terminal_position_announced() {
        let mut detector = TerminalDetector::new();
        assert!(detector.evaluate(&fools_mate()).game_over.is_some());
        assert!(detector.evaluate(&scholars_mate()).game_over.is_some());
        assert!(detector.evaluate(&fools_mate()).game_over.is_none());
    }

    #[test]
    fn test_priority_order() {
        let all = PositionFlags {
            check: true,
            checkmate: true,
            stalemate: true,
            draw: true,
            insufficient_material: true,
            game_over: true,
        };
        assert_eq!(
            TerminalOutcome::classify(&all, PlayerColor::White),
            TerminalOutcome::Checkmate(PlayerColor::Black)
        );

        let no_mate = PositionFlags { checkmate: false, ..all };
        assert_eq!(TerminalOutcome::classify(&no_mate, PlayerColor::White), TerminalOutcome::Draw);
        assert_eq!(cause(&no_mate, PlayerColor::White), "Draw");

        let stalemate = PositionFlags { draw: false, ..no_mate };
        assert_eq!(cause(&stalemate, PlayerColor::White), "Game Ended Stalemate");

        let material = PositionFlags { stalemate: false, ..stalemate };
        assert_eq!(
            TerminalOutcome::classify(&material, PlayerColor::White),
            TerminalOutcome::InsufficientMaterial
        );
        assert_eq!(cause(&material, PlayerColor::White), "Game Ended Insufficient Material");
    }

    #[test]
    fn test_game_over_without_cause() {
        let flags = PositionFlags {
            game_over: true,
            ..PositionFlags::default()
        };
        assert_eq!(cause(&flags, PlayerColor::Black), "");
        assert_eq!(TerminalOutcome::classify(&flags, PlayerColor::Black), TerminalOutcome::Draw);
    }

    #[test]
    fn test_stalemate_position() {
        let position = Position::from_fen("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1").unwrap();
        let mut detector = TerminalDetector::new();
        let evaluation = detector.evaluate(&position);
        assert_eq!(evaluation.outcome, TerminalOutcome::Stalemate);
        assert_eq!(evaluation.game_over.map(|g| g.cause).as_deref(), Some("Game Ended Stalemate"));
    }

    #[test]
    fn test_check_highlight_follows_side_to_move() {
        // 1. e4 f5 2. Qh5+ : Black king on e8 is in check
        let moves: Vec<ChessMove> = ["e2e4", "f7f5", "d1h5"]
            .iter()
            .map(|m| m.parse().unwrap())
            .collect();
        let position = rules::replay(&rules::initial_position(), &moves).unwrap();
        let mut detector = TerminalDetector::new();
        let evaluation = detector.evaluate(&position);
        assert!(evaluation.flags.check);
        assert_eq!(evaluation.check_square, Some(Square::E8));
        assert_eq!(evaluation.outcome, TerminalOutcome::InProgress);
    }
}
