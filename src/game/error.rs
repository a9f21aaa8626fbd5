//! Error types for game module
//!
//! Covers move parsing, rules-oracle rejections and reconciliation faults
//! between the local session and what the server reports.

/// Errors that can occur in game logic
#[derive(Debug, thiserror::Error)]
pub enum GameError {
    /// Move text could not be parsed
    #[error("Malformed move '{text}': {message}")]
    MalformedMove { text: String, message: String },

    /// Move is not legal in the position it was applied to
    #[error("Illegal move {mv} in position {fen}")]
    IllegalMove { mv: String, fen: String },

    /// FEN could not be parsed or describes an impossible position
    #[error("Invalid position '{fen}': {message}")]
    InvalidPosition { fen: String, message: String },

    /// A move that passed local legality checks was refused by the oracle
    #[error("Rules oracle rejected a pre-validated move: {message}")]
    OracleFault { message: String },

    /// Local state diverged from the state reported by the server
    #[error("Session desynchronized: {message}")]
    Desync { message: String },
}

/// Result type alias for game operations
pub type GameResult<T> = Result<T, GameError>;
