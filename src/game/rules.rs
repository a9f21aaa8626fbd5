//! Rules oracle adapter
//!
//! Pure, synchronous queries over an immutable [`Position`], backed by
//! `shakmaty`. Nothing here mutates its input: applying a move always yields a
//! fresh position.

use crate::game::error::{GameError, GameResult};
use crate::game::types::{ChessMove, PlayerColor, Position};
use serde::Serialize;
use shakmaty::{Color, File, Move, Position as _, Role, Square};

/// Derived flags for a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct PositionFlags {
    pub check: bool,
    pub checkmate: bool,
    pub stalemate: bool,
    /// Draw by rule other than stalemate or insufficient material
    pub draw: bool,
    pub insufficient_material: bool,
    pub game_over: bool,
}

/// How a move affected the board, for audio/visual feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MoveKind {
    Quiet,
    Capture,
    Castle,
    Promotion,
}

/// A legal destination for a selected piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveOption {
    pub to: Square,
    pub capture: bool,
    pub promotion: bool,
}

/// Result of applying a move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedMove {
    /// The move as played, promotion letter dropped for non-promotions
    pub mv: ChessMove,
    pub kind: MoveKind,
    pub position: Position,
}

/// Halfmove clock value at which the fifty-move rule ends the game
const FIFTY_MOVE_PLIES: u32 = 100;

/// Destination square the UI uses for a move. Castling moves are encoded
/// king-takes-rook internally; players drag the king two squares.
fn destination(m: &Move) -> Square {
    match *m {
        Move::Castle { king, rook } => {
            let file = if rook.file() > king.file() {
                File::G
            } else {
                File::C
            };
            Square::from_coords(file, king.rank())
        }
        _ => m.to(),
    }
}

fn move_kind(m: &Move) -> MoveKind {
    if m.is_castle() {
        MoveKind::Castle
    } else if m.is_promotion() {
        MoveKind::Promotion
    } else if m.is_capture() {
        MoveKind::Capture
    } else {
        MoveKind::Quiet
    }
}

pub fn initial_position() -> Position {
    Position::initial()
}

/// Legal destinations of the piece on `from` for the side to move. Empty when
/// the square is empty, holds an opponent piece, or the piece is stuck.
pub fn legal_moves_from(position: &Position, from: Square) -> Vec<MoveOption> {
    let mut options: Vec<MoveOption> = Vec::new();
    for m in position.chess().legal_moves().iter() {
        if m.from() != Some(from) {
            continue;
        }
        let to = destination(m);
        // Promotions to different pieces share one destination
        if options.iter().any(|option| option.to == to) {
            continue;
        }
        options.push(MoveOption {
            to,
            capture: m.is_capture(),
            promotion: m.is_promotion(),
        });
    }
    options
}

/// Find the legal engine move matching `mv`. A promotion piece is required
/// for promotions and ignored otherwise.
fn resolve(position: &Position, mv: &ChessMove) -> Option<Move> {
    position
        .chess()
        .legal_moves()
        .iter()
        .find(|m| {
            m.from() == Some(mv.from)
                && destination(m) == mv.to
                && (!m.is_promotion() || m.promotion() == mv.promotion)
        })
        .cloned()
}

/// Apply `mv` to `position`, returning the new position.
pub fn apply_move(position: &Position, mv: &ChessMove) -> GameResult<AppliedMove> {
    let engine_move = resolve(position, mv).ok_or_else(|| GameError::IllegalMove {
        mv: mv.to_string(),
        fen: position.fen().to_string(),
    })?;

    let next = position
        .chess()
        .clone()
        .play(engine_move.clone())
        .map_err(|e| GameError::OracleFault {
            message: format!("{} rejected in {}: {}", mv, position.fen(), e),
        })?;

    let played = ChessMove {
        from: mv.from,
        to: mv.to,
        promotion: engine_move.promotion(),
    };

    Ok(AppliedMove {
        mv: played,
        kind: move_kind(&engine_move),
        position: Position::from_chess(next),
    })
}

/// Replay `moves` from `start`, failing on the first illegal move.
pub fn replay<'a>(
    start: &Position,
    moves: impl IntoIterator<Item = &'a ChessMove>,
) -> GameResult<Position> {
    let mut position = start.clone();
    for mv in moves {
        position = apply_move(&position, mv)?.position;
    }
    Ok(position)
}

pub fn flags(position: &Position) -> PositionFlags {
    let chess = position.chess();
    let check = chess.is_check();
    let checkmate = chess.is_checkmate();
    let stalemate = chess.is_stalemate();
    let insufficient_material = chess.is_insufficient_material();
    let draw = !checkmate && chess.halfmoves() >= FIFTY_MOVE_PLIES;

    PositionFlags {
        check,
        checkmate,
        stalemate,
        draw,
        insufficient_material,
        game_over: checkmate || stalemate || insufficient_material || draw,
    }
}

/// Square of `color`'s king, if it is on the board.
pub fn king_square(position: &Position, color: PlayerColor) -> Option<Square> {
    position.chess().board().king_of(Color::from(color))
}

/// Pieces a pawn may promote to, in the order a picker shows them.
pub const PROMOTION_CHOICES: [Role; 4] = [Role::Queen, Role::Rook, Role::Bishop, Role::Knight];

#[cfg(test)]
mod tests {
    use super::*;

    fn mv(text: &str) -> ChessMove {
        text.parse().unwrap()
    }

    #[test]
    fn test_start_position_has_twenty_moves() {
        let position = initial_position();
        let total: usize = (0..64)
            .map(|i| legal_moves_from(&position, Square::new(i)).len())
            .sum();
        assert_eq!(total, 20);
    }

    #[test]
    fn test_knight_has_two_moves_from_start() {
        let options = legal_moves_from(&initial_position(), Square::B1);
        let targets: Vec<Square> = options.iter().map(|o| o.to).collect();
        assert_eq!(targets.len(), 2);
        assert!(targets.contains(&Square::A3));
        assert!(targets.contains(&Square::C3));
    }

    #[test]
    fn test_opponent_piece_has_no_options() {
        assert!(legal_moves_from(&initial_position(), Square::E7).is_empty());
        assert!(legal_moves_from(&initial_position(), Square::E4).is_empty());
    }

    #[test]
    fn test_apply_does_not_touch_input() {
        let start = initial_position();
        let applied = apply_move(&start, &mv("e2e4")).unwrap();
        assert_eq!(start, initial_position());
        assert_eq!(applied.position.side_to_move(), PlayerColor::Black);
        assert_eq!(applied.kind, MoveKind::Quiet);
    }

    #[test]
    fn test_illegal_move_is_rejected() {
        let result = apply_move(&initial_position(), &mv("e2e5"));
        assert!(matches!(result, Err(GameError::IllegalMove { .. })));
    }

    #[test]
    fn test_stray_promotion_letter_is_dropped() {
        // The reference web client always sends "q", even for quiet moves
        let applied = apply_move(&initial_position(), &mv("e2e4q")).unwrap();
        assert_eq!(applied.mv, mv("e2e4"));
    }

    #[test]
    fn test_promotion_requires_piece() {
        let position = Position::from_fen("8/P6k/8/8/8/8/8/K7 w - - 0 1").unwrap();
        let options = legal_moves_from(&position, Square::A7);
        assert!(options.iter().any(|o| o.to == Square::A8 && o.promotion));
        assert!(matches!(
            apply_move(&position, &mv("a7a8")),
            Err(GameError::IllegalMove { .. })
        ));

        let applied = apply_move(&position, &mv("a7a8n")).unwrap();
        assert_eq!(applied.kind, MoveKind::Promotion);
        assert_eq!(applied.mv.promotion, Some(Role::Knight));
    }

    #[test]
    fn test_castling_uses_king_destination() {
        let position =
            Position::from_fen("r3k2r/pppppppp/8/8/8/8/PPPPPPPP/R3K2R w KQkq - 0 1").unwrap();
        let options = legal_moves_from(&position, Square::E1);
        assert!(options.iter().any(|o| o.to == Square::G1));
        assert!(options.iter().any(|o| o.to == Square::C1));

        let applied = apply_move(&position, &mv("e1g1")).unwrap();
        assert_eq!(applied.kind, MoveKind::Castle);
        assert_eq!(king_square(&applied.position, PlayerColor::White), Some(Square::G1));
    }

    #[test]
    fn test_replay_matches_incremental_apply() {
        let moves = [mv("e2e4"), mv("e7e5"), mv("g1f3"), mv("b8c6")];
        let mut position = initial_position();
        for m in &moves {
            position = apply_move(&position, m).unwrap().position;
        }
        assert_eq!(replay(&initial_position(), &moves).unwrap(), position);
    }

    #[test]
    fn test_flags_fools_mate() {
        let position = replay(
            &initial_position(),
            &[mv("f2f3"), mv("e7e5"), mv("g2g4"), mv("d8h4")],
        )
        .unwrap();
        let flags = flags(&position);
        assert!(flags.check);
        assert!(flags.checkmate);
        assert!(flags.game_over);
        assert!(!flags.draw);
    }

    #[test]
    fn test_flags_stalemate() {
        let position = Position::from_fen("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1").unwrap();
        let flags = flags(&position);
        assert!(flags.stalemate);
        assert!(!flags.check);
        assert!(flags.game_over);
    }

    #[test]
    fn test_flags_insufficient_material() {
        let position = Position::from_fen("8/8/4k3/8/8/3K4/8/8 w - - 0 1").unwrap();
        let flags = flags(&position);
        assert!(flags.insufficient_material);
        assert!(flags.game_over);
    }

    #[test]
    fn test_flags_fifty_move_rule() {
        let position = Position::from_fen("8/8/4k3/8/8/3K4/8/R7 w - - 100 80").unwrap();
        let flags = flags(&position);
        assert!(flags.draw);
        assert!(flags.game_over);
        assert!(!flags.insufficient_material);
    }
}
