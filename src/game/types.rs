//! Value types shared by the session, the coordinator and the UI layer.
//!
//! Squares and piece roles come straight from `shakmaty`; this module adds the
//! pieces the game session needs on top: player colors that map to the wire
//! protocol, moves in UCI form, and canonical immutable positions.

use crate::game::error::{GameError, GameResult};
use serde::{Deserialize, Serialize};
use shakmaty::fen::Fen;
use shakmaty::{CastlingMode, Chess, Color, EnPassantMode, Position as _, Role, Square};
use shared::protocol::{MoveData, WireColor};
use std::fmt;
use std::str::FromStr;

/// Side a player sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerColor {
    White,
    Black,
}

impl PlayerColor {
    pub fn opposite(self) -> Self {
        match self {
            PlayerColor::White => PlayerColor::Black,
            PlayerColor::Black => PlayerColor::White,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PlayerColor::White => "White",
            PlayerColor::Black => "Black",
        }
    }
}

impl fmt::Display for PlayerColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<Color> for PlayerColor {
    fn from(color: Color) -> Self {
        match color {
            Color::White => PlayerColor::White,
            Color::Black => PlayerColor::Black,
        }
    }
}

impl From<PlayerColor> for Color {
    fn from(color: PlayerColor) -> Self {
        match color {
            PlayerColor::White => Color::White,
            PlayerColor::Black => Color::Black,
        }
    }
}

impl From<WireColor> for PlayerColor {
    fn from(color: WireColor) -> Self {
        match color {
            WireColor::White => PlayerColor::White,
            WireColor::Black => PlayerColor::Black,
        }
    }
}

impl From<PlayerColor> for WireColor {
    fn from(color: PlayerColor) -> Self {
        match color {
            PlayerColor::White => WireColor::White,
            PlayerColor::Black => WireColor::Black,
        }
    }
}

/// A move in from/to form. Only meaningful relative to a [`Position`].
///
/// Displays and parses as UCI long algebraic notation (`e2e4`, `e7e8q`).
/// Castling is written as the king's two-square step (`e1g1`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChessMove {
    pub from: Square,
    pub to: Square,
    pub promotion: Option<Role>,
}

impl ChessMove {
    pub fn new(from: Square, to: Square) -> Self {
        Self {
            from,
            to,
            promotion: None,
        }
    }

    pub fn with_promotion(mut self, role: Role) -> Self {
        self.promotion = Some(role);
        self
    }

    /// Build from wire data. The promotion letter is kept as sent; the rules
    /// oracle drops it again when the move turns out not to be a promotion.
    pub fn from_wire(data: &MoveData) -> GameResult<Self> {
        let text = format!(
            "{}{}{}",
            data.from,
            data.to,
            data.promotion.as_deref().unwrap_or("")
        );
        let from = parse_square(&data.from, &text)?;
        let to = parse_square(&data.to, &text)?;
        let promotion = match data.promotion.as_deref() {
            None | Some("") => None,
            Some(letter) => Some(parse_promotion(letter, &text)?),
        };
        Ok(Self { from, to, promotion })
    }

    /// Wire form of this move, carrying the resulting position.
    pub fn to_wire(&self, resulting: &Position) -> MoveData {
        MoveData {
            from: self.from.to_string(),
            to: self.to.to_string(),
            promotion: self.promotion.map(|role| role.char().to_string()),
            fen: Some(resulting.fen().to_string()),
        }
    }
}

impl fmt::Display for ChessMove {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.from, self.to)?;
        if let Some(role) = self.promotion {
            write!(f, "{}", role.char())?;
        }
        Ok(())
    }
}

impl FromStr for ChessMove {
    type Err = GameError;

    fn from_str(text: &str) -> GameResult<Self> {
        let malformed = |message: &str| GameError::MalformedMove {
            text: text.to_string(),
            message: message.to_string(),
        };
        if !text.is_ascii() || !(4..=5).contains(&text.len()) {
            return Err(malformed("expected 4 or 5 ASCII characters"));
        }
        let from = parse_square(&text[0..2], text)?;
        let to = parse_square(&text[2..4], text)?;
        let promotion = match text.get(4..) {
            Some(letter) if !letter.is_empty() => Some(parse_promotion(letter, text)?),
            _ => None,
        };
        Ok(Self { from, to, promotion })
    }
}

fn parse_square(square: &str, text: &str) -> GameResult<Square> {
    square.parse::<Square>().map_err(|_| GameError::MalformedMove {
        text: text.to_string(),
        message: format!("'{}' is not a square", square),
    })
}

/// Parse a promotion letter. Only knight, bishop, rook and queen qualify.
pub fn parse_promotion(letter: &str, text: &str) -> GameResult<Role> {
    let role = letter
        .chars()
        .next()
        .filter(|_| letter.chars().count() == 1)
        .and_then(|c| Role::from_char(c.to_ascii_lowercase()));
    match role {
        Some(role @ (Role::Knight | Role::Bishop | Role::Rook | Role::Queen)) => Ok(role),
        _ => Err(GameError::MalformedMove {
            text: text.to_string(),
            message: format!("'{}' is not a promotion piece", letter),
        }),
    }
}

/// Canonical, immutable chess position.
///
/// Two positions are equal exactly when their FEN strings are equal. FEN is
/// emitted with the en-passant square only when a capture is actually
/// possible, so equivalent positions reported by different rules engines
/// compare equal after they pass through [`Position::from_fen`].
#[derive(Debug, Clone)]
pub struct Position {
    fen: String,
    chess: Chess,
}

impl Position {
    pub fn initial() -> Self {
        Self::from_chess(Chess::default())
    }

    pub fn from_fen(fen: &str) -> GameResult<Self> {
        let invalid = |message: String| GameError::InvalidPosition {
            fen: fen.to_string(),
            message,
        };
        let parsed: Fen = fen.trim().parse().map_err(|e| invalid(format!("{}", e)))?;
        let chess: Chess = parsed
            .into_position(CastlingMode::Standard)
            .map_err(|e| invalid(format!("{}", e)))?;
        Ok(Self::from_chess(chess))
    }

    pub(crate) fn from_chess(chess: Chess) -> Self {
        let fen = Fen::from_position(&chess, EnPassantMode::Legal).to_string();
        Self { fen, chess }
    }

    pub fn fen(&self) -> &str {
        &self.fen
    }

    pub fn side_to_move(&self) -> PlayerColor {
        self.chess.turn().into()
    }

    pub(crate) fn chess(&self) -> &Chess {
        &self.chess
    }
}

impl PartialEq for Position {
    fn eq(&self, other: &Self) -> bool {
        self.fen == other.fen
    }
}

impl Eq for Position {}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.fen)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

    #[test]
    fn test_initial_position_fen() {
        let position = Position::initial();
        assert_eq!(position.fen(), START_FEN);
        assert_eq!(position.side_to_move(), PlayerColor::White);
    }

    #[test]
    fn test_positions_compare_by_fen() {
        let parsed = Position::from_fen(START_FEN).unwrap();
        assert_eq!(parsed, Position::initial());
    }

    #[test]
    fn test_unreachable_en_passant_square_is_canonicalized() {
        // After 1. e4 some engines report "e3" even though no capture exists.
        let with_ep = "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1";
        let without_ep = "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1";
        assert_eq!(
            Position::from_fen(with_ep).unwrap(),
            Position::from_fen(without_ep).unwrap()
        );
    }

    #[test]
    fn test_rejects_garbage_fen() {
        assert!(matches!(
            Position::from_fen("not a fen"),
            Err(GameError::InvalidPosition { .. })
        ));
    }

    #[test]
    fn test_move_text_roundtrip() {
        let mv: ChessMove = "e7e8q".parse().unwrap();
        assert_eq!(mv.from, Square::E7);
        assert_eq!(mv.to, Square::E8);
        assert_eq!(mv.promotion, Some(Role::Queen));
        assert_eq!(mv.to_string(), "e7e8q");
    }

    #[test]
    fn test_move_text_rejects_king_promotion() {
        assert!("e7e8k".parse::<ChessMove>().is_err());
        assert!("e7e9".parse::<ChessMove>().is_err());
        assert!("e2".parse::<ChessMove>().is_err());
    }

    #[test]
    fn test_move_from_wire_accepts_uppercase_promotion() {
        let data = MoveData {
            from: "a7".to_string(),
            to: "a8".to_string(),
            promotion: Some("N".to_string()),
            fen: None,
        };
        let mv = ChessMove::from_wire(&data).unwrap();
        assert_eq!(mv.promotion, Some(Role::Knight));
    }

    #[test]
    fn test_color_conversions() {
        assert_eq!(PlayerColor::from(WireColor::Black), PlayerColor::Black);
        assert_eq!(WireColor::from(PlayerColor::White), WireColor::White);
        assert_eq!(PlayerColor::White.opposite(), PlayerColor::Black);
        assert_eq!(Color::from(PlayerColor::Black), Color::Black);
    }
}
