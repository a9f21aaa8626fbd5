//! Game session logic
//!
//! Everything that decides what the board looks like, with no I/O.
//!
//! # Module Organization
//!
//! - `types` - player colors, moves and canonical positions
//! - `rules` - rules oracle adapter over `shakmaty`
//! - `session` - identifiers, orientation, position and history of one game
//! - `selection` - pending local move state machine
//! - `terminal` - checkmate / draw detection and game-over notification
//! - `coordinator` - the only writer of the session; reconciles local and remote moves
//! - `events` - gestures in, UI updates and network sends out
//!
//! # Data Flow
//!
//! ```text
//! Gesture ──► MoveCoordinator ──► Session ──► TerminalDetector
//!                  │                                │
//!                  └──── Effect::Send / Effect::Ui ◄┘
//! ```

pub mod coordinator;
pub mod error;
pub mod events;
pub mod rules;
pub mod selection;
pub mod session;
pub mod terminal;
pub mod types;

pub use coordinator::MoveCoordinator;
pub use error::{GameError, GameResult};
pub use events::{Effect, Gesture, Notice, Severity, UiUpdate};
pub use session::Session;
pub use terminal::{TerminalDetector, TerminalOutcome};
pub use types::{ChessMove, PlayerColor, Position};
