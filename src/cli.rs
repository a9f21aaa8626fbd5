//! Line-oriented terminal front end
//!
//! Parses one command per line into a [`ClientCommand`] and renders
//! [`UiUpdate`]s as text.
//!
//! ```text
//! create white | create black     start a new game
//! join <GAME_ID>                  join an existing game
//! resume                          continue the stored game
//! click e2                        select / move by clicking
//! drag e2 | over e4 | drop e2 e4 [q]
//! promote q                       answer a promotion prompt
//! cancel                          drop the current selection
//! quit
//! ```

use crate::game::events::{Gesture, Severity, UiUpdate};
use crate::game::terminal::TerminalOutcome;
use crate::game::types::{parse_promotion, PlayerColor};
use crate::networking::client::ClientCommand;
use crate::networking::connection::ConnectionStatus;
use shakmaty::{Role, Square};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum InputError {
    #[error("Unknown command '{0}'")]
    UnknownCommand(String),

    #[error("'{command}' expects {expected}")]
    MissingArgument { command: String, expected: &'static str },

    #[error("'{0}' is not a square")]
    BadSquare(String),

    #[error("'{0}' is not a promotion piece (q, r, b, n)")]
    BadPiece(String),

    #[error("'{0}' is not a color (white, black)")]
    BadColor(String),
}

pub fn parse_command(line: &str) -> Result<ClientCommand, InputError> {
    let mut words = line.split_whitespace();
    let Some(command) = words.next() else {
        return Err(InputError::UnknownCommand(String::new()));
    };
    let command = command.to_ascii_lowercase();
    let mut arg = |expected: &'static str| {
        words.next().ok_or_else(|| InputError::MissingArgument {
            command: command.clone(),
            expected,
        })
    };

    let parsed = match command.as_str() {
        "create" => ClientCommand::CreateGame(color(arg("a color")?)?),
        "join" => ClientCommand::JoinGame(arg("a game id")?.to_string()),
        "resume" => ClientCommand::Resume,
        "click" => ClientCommand::Gesture(Gesture::SquareClicked(square(arg("a square")?)?)),
        "drag" => ClientCommand::Gesture(Gesture::DragStarted(square(arg("a square")?)?)),
        "over" => ClientCommand::Gesture(Gesture::DraggedOver(square(arg("a square")?)?)),
        "drop" => {
            let from = square(arg("two squares")?)?;
            let to = square(arg("two squares")?)?;
            let promotion = match words.next() {
                Some(letter) => Some(piece(letter)?),
                None => None,
            };
            ClientCommand::Gesture(Gesture::Dropped { from, to, promotion })
        }
        "promote" => ClientCommand::Gesture(Gesture::PromotionChosen(piece(arg("a piece")?)?)),
        "cancel" => ClientCommand::Gesture(Gesture::Cancel),
        "quit" | "exit" => ClientCommand::Shutdown,
        _ => return Err(InputError::UnknownCommand(command)),
    };
    Ok(parsed)
}

fn square(text: &str) -> Result<Square, InputError> {
    text.to_ascii_lowercase()
        .parse()
        .map_err(|_| InputError::BadSquare(text.to_string()))
}

fn piece(text: &str) -> Result<Role, InputError> {
    parse_promotion(text, text).map_err(|_| InputError::BadPiece(text.to_string()))
}

fn color(text: &str) -> Result<PlayerColor, InputError> {
    match text.to_ascii_lowercase().as_str() {
        "white" | "w" => Ok(PlayerColor::White),
        "black" | "b" => Ok(PlayerColor::Black),
        _ => Err(InputError::BadColor(text.to_string())),
    }
}

/// Text shown for one UI update.
pub fn render(update: &UiUpdate) -> String {
    match update {
        UiUpdate::Board {
            fen,
            orientation,
            side_to_move,
            last_move,
        } => {
            let mut out = board_diagram(fen, *orientation);
            if let Some((mv, kind)) = last_move {
                out.push_str(&format!("last move: {} ({:?})\n", mv, kind));
            }
            out.push_str(&format!("{} to move, you play {}", side_to_move, orientation));
            out
        }
        UiUpdate::MoveOptions { from, options } => {
            let targets: Vec<String> = options
                .iter()
                .map(|option| {
                    if option.capture {
                        format!("x{}", option.to)
                    } else {
                        option.to.to_string()
                    }
                })
                .collect();
            format!("{}: {}", from, targets.join(" "))
        }
        UiUpdate::SelectionCleared => "selection cleared".to_string(),
        UiUpdate::PromotionRequested { from, to } => {
            format!("{}{} promotes: choose with 'promote q|r|b|n'", from, to)
        }
        UiUpdate::Check { king: Some(square) } => format!("check! king on {}", square),
        UiUpdate::Check { king: None } => String::new(),
        UiUpdate::GameOver { outcome, cause } => match (outcome, cause.is_empty()) {
            (TerminalOutcome::Checkmate(_), _) | (_, false) => format!("*** {} ***", cause),
            (_, true) => "*** Game over ***".to_string(),
        },
        UiUpdate::Notice(notice) => match notice.severity {
            Severity::Transient => format!("note: {}", notice.message),
            Severity::Desync => format!("resyncing: {}", notice.message),
            Severity::Fatal => format!("FATAL: {}", notice.message),
        },
        UiUpdate::Connection(state) => match state.status {
            ConnectionStatus::Connecting if state.retry_count > 0 => {
                format!("reconnecting (attempt {})", state.retry_count + 1)
            }
            ConnectionStatus::Connecting => "connecting".to_string(),
            ConnectionStatus::Connected => "connected".to_string(),
            ConnectionStatus::Disconnected => "disconnected".to_string(),
            ConnectionStatus::Exhausted => "disconnected (gave up)".to_string(),
        },
    }
}

/// ASCII board from the placement field of `fen`, drawn from `orientation`'s side.
fn board_diagram(fen: &str, orientation: PlayerColor) -> String {
    let placement = fen.split_whitespace().next().unwrap_or("");
    let mut rows: Vec<Vec<char>> = placement
        .split('/')
        .map(|rank| {
            let mut row = Vec::with_capacity(8);
            for c in rank.chars() {
                match c.to_digit(10) {
                    Some(empty) => row.extend(std::iter::repeat('.').take(empty as usize)),
                    None => row.push(c),
                }
            }
            row
        })
        .collect();

    let mut files: Vec<char> = ('a'..='h').collect();
    let mut ranks: Vec<char> = ('1'..='8').rev().collect();
    if orientation == PlayerColor::Black {
        rows.reverse();
        rows.iter_mut().for_each(|row| row.reverse());
        files.reverse();
        ranks.reverse();
    }

    let mut out = String::new();
    for (row, rank) in rows.iter().zip(ranks) {
        let cells: Vec<String> = row.iter().map(char::to_string).collect();
        out.push_str(&format!("{} {}\n", rank, cells.join(" ")));
    }
    let footer: Vec<String> = files.iter().map(char::to_string).collect();
    out.push_str(&format!("  {}\n", footer.join(" ")));
    out
}
