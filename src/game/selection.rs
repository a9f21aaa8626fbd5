//! Pending local move - tracks a move while the player is still building it
//!
//! ```text
//! Idle → AwaitingSelection → AwaitingTarget → [AwaitingPromotion] → committed → Idle
//! ```
//!
//! Nothing here talks to the network or applies moves; the coordinator reads
//! the state and decides when a move is complete. Dropping back to `Idle` is
//! always safe.

use crate::game::rules::MoveOption;
use shakmaty::Square;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PendingMove {
    /// No piece selected
    #[default]
    Idle,

    /// A piece is selected and its legal destinations are known
    AwaitingSelection {
        from: Square,
        options: Vec<MoveOption>,
    },

    /// A legal destination is under the pointer while dragging
    AwaitingTarget {
        from: Square,
        options: Vec<MoveOption>,
        to: Square,
    },

    /// Move reaches the last rank; waiting for the promotion piece
    AwaitingPromotion { from: Square, to: Square },
}

impl PendingMove {
    pub fn is_idle(&self) -> bool {
        matches!(self, PendingMove::Idle)
    }

    pub fn from_square(&self) -> Option<Square> {
        match self {
            PendingMove::Idle => None,
            PendingMove::AwaitingSelection { from, .. }
            | PendingMove::AwaitingTarget { from, .. }
            | PendingMove::AwaitingPromotion { from, .. } => Some(*from),
        }
    }

    /// Legal destinations of the selected piece, empty when none is selected
    /// or a promotion is pending.
    pub fn options(&self) -> &[MoveOption] {
        match self {
            PendingMove::AwaitingSelection { options, .. }
            | PendingMove::AwaitingTarget { options, .. } => options,
            _ => &[],
        }
    }

    /// Option for `to`, if `to` is a legal destination of the selection.
    pub fn option_for(&self, to: Square) -> Option<MoveOption> {
        self.options().iter().copied().find(|option| option.to == to)
    }

    pub fn clear(&mut self) {
        *self = PendingMove::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selected() -> PendingMove {
        PendingMove::AwaitingSelection {
            from: Square::E2,
            options: vec![
                MoveOption {
                    to: Square::E3,
                    capture: false,
                    promotion: false,
                },
                MoveOption {
                    to: Square::E4,
                    capture: false,
                    promotion: false,
                },
            ],
        }
    }

    #[test]
    fn test_default_is_idle() {
        assert!(PendingMove::default().is_idle());
        assert!(PendingMove::default().options().is_empty());
    }

    #[test]
    fn test_option_lookup() {
        let pending = selected();
        assert_eq!(pending.from_square(), Some(Square::E2));
        assert!(pending.option_for(Square::E4).is_some());
        assert!(pending.option_for(Square::E5).is_none());
    }

    #[test]
    fn test_promotion_hides_options() {
        let pending = PendingMove::AwaitingPromotion {
            from: Square::A7,
            to: Square::A8,
        };
        assert!(pending.options().is_empty());
        assert_eq!(pending.from_square(), Some(Square::A7));
    }

    #[test]
    fn test_clear() {
        let mut pending = selected();
        pending.clear();
        assert!(pending.is_idle());
    }
}
