//! Game Flow Integration Tests
//!
//! Two coordinators play against each other through an in-process relay that
//! behaves like the game server:
//! - Move commit and relay
//! - Turn enforcement
//! - Snapshot handling
//! - Terminal detection on both sides

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shakmaty::Square;
use shared::protocol::{ClientEvent, GameDetails, OpponentMove, WireColor};
use xfchess_sync::game::rules;
use xfchess_sync::game::{Effect, MoveCoordinator, PlayerColor, Position, TerminalOutcome, UiUpdate};

const GAME_ID: &str = "Gm7Qx2";

/// White is "alice", who created the game; Black is "bob".
fn snapshot(fen: Option<&str>) -> GameDetails {
    GameDetails {
        game_id: GAME_ID.to_string(),
        fen: fen.map(str::to_string),
        player1_id: "alice".to_string(),
        player2_id: Some("bob".to_string()),
        color: WireColor::White,
    }
}

fn players() -> (MoveCoordinator, MoveCoordinator) {
    let mut white = MoveCoordinator::new("alice");
    let mut black = MoveCoordinator::new("bob");
    white.apply_snapshot(&snapshot(None));
    black.apply_snapshot(&snapshot(None));
    (white, black)
}

/// What the server relays to the other player for each make-move.
fn relay(effects: &[Effect]) -> Vec<OpponentMove> {
    effects
        .iter()
        .filter_map(|effect| match effect {
            Effect::Send(ClientEvent::MakeMove(make_move)) => Some(OpponentMove {
                sender_id: Some(make_move.player_id.clone()),
                move_data: Some(make_move.move_data.clone()),
                fen: None,
            }),
            _ => None,
        })
        .collect()
}

/// Click-click a move on `mover` and deliver it to `receiver`.
fn play(mover: &mut MoveCoordinator, receiver: &mut MoveCoordinator, from: Square, to: Square) -> (Vec<Effect>, Vec<Effect>) {
    mover.square_clicked(from);
    let sent = mover.square_clicked(to);
    let relayed = relay(&sent);
    assert_eq!(relayed.len(), 1, "{}{} should produce one make-move", from, to);
    let received = receiver.apply_opponent_move(&relayed[0]);
    (sent, received)
}

fn game_overs(effects: &[Effect]) -> Vec<(TerminalOutcome, String)> {
    effects
        .iter()
        .filter_map(|effect| match effect {
            Effect::Ui(UiUpdate::GameOver { outcome, cause }) => Some((*outcome, cause.clone())),
            _ => None,
        })
        .collect()
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn test_opening_move_reaches_opponent() {
    let (mut white, mut black) = players();

    white.square_clicked(Square::E2);
    let effects = white.square_clicked(Square::E4);

    let expected = "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1";
    assert_eq!(white.session().position().map(Position::fen), Some(expected));
    let ClientEvent::MakeMove(make_move) = effects.iter().find_map(Effect::as_send).expect("make-move sent") else {
        panic!("Expected make-move");
    };
    assert_eq!(make_move.game_id, GAME_ID);
    assert_eq!(make_move.player_id, "alice");
    assert_eq!((make_move.move_data.from.as_str(), make_move.move_data.to.as_str()), ("e2", "e4"));
    assert_eq!(make_move.move_data.fen.as_deref(), Some(expected));

    black.apply_opponent_move(&relay(&effects)[0]);
    assert_eq!(black.session().position(), white.session().position());
    assert!(black.session().is_local_turn());
    assert!(!white.session().is_local_turn());
}

#[test]
fn test_reply_move_returns_the_turn() {
    let (mut white, mut black) = players();
    play(&mut white, &mut black, Square::E2, Square::E4);
    let (sent, received) = play(&mut black, &mut white, Square::E7, Square::E5);

    let ClientEvent::MakeMove(make_move) = sent.iter().find_map(Effect::as_send).unwrap() else {
        panic!("Expected make-move");
    };
    assert_eq!(make_move.player_id, "bob");
    assert_eq!(
        make_move.move_data.fen.as_deref(),
        Some("rnbqkbnr/pppp1ppp/8/4p3/4P3/8/PPPP1PPP/RNBQKBNR w KQkq - 0 2")
    );
    assert_eq!(white.session().history().len(), 2);
    assert_eq!(white.session().position(), black.session().position());
    assert!(white.session().is_local_turn());

    // Nobody is in check after the reply
    assert!(received.contains(&Effect::Ui(UiUpdate::Check { king: None })));
    let position = white.session().position().expect("Position known");
    assert!(!rules::flags(position).check);
}

#[test]
fn test_checkmate_with_black_to_move() {
    //! Scholar's mate: Black is to move and mated, White wins.
    //! Both sides announce it exactly once.
    let (mut white, mut black) = players();
    let moves = [
        (Square::E2, Square::E4),
        (Square::E7, Square::E5),
        (Square::F1, Square::C4),
        (Square::B8, Square::C6),
        (Square::D1, Square::H5),
        (Square::G8, Square::F6),
    ];
    for (i, (from, to)) in moves.iter().enumerate() {
        let (sent, received) = if i % 2 == 0 {
            play(&mut white, &mut black, *from, *to)
        } else {
            play(&mut black, &mut white, *from, *to)
        };
        assert!(game_overs(&sent).is_empty());
        assert!(game_overs(&received).is_empty());
    }

    let (sent, received) = play(&mut white, &mut black, Square::H5, Square::F7);
    let expected = vec![(
        TerminalOutcome::Checkmate(PlayerColor::White),
        "White won the game".to_string(),
    )];
    assert_eq!(game_overs(&sent), expected);
    assert_eq!(game_overs(&received), expected);
    assert!(received.contains(&Effect::Ui(UiUpdate::Check { king: Some(Square::E8) })));

    // Re-evaluating or re-receiving the same position stays quiet
    assert!(game_overs(&black.evaluate()).is_empty());
    let fen = black.session().position().map(|p| p.fen().to_string());
    assert!(game_overs(&black.apply_snapshot(&snapshot(fen.as_deref()))).is_empty());

    // Nobody can move any more
    assert!(black.square_clicked(Square::E8).is_empty());
    assert!(white.square_clicked(Square::A2).is_empty());
}

#[test]
fn test_snapshot_without_position_resets_board() {
    let (mut white, mut black) = players();
    play(&mut white, &mut black, Square::D2, Square::D4);
    play(&mut black, &mut white, Square::D7, Square::D5);

    let effects = white.apply_snapshot(&snapshot(None));
    assert_eq!(white.session().position(), Some(&rules::initial_position()));
    assert!(white.session().history().is_empty());
    assert!(effects.iter().any(|e| matches!(e, Effect::Ui(UiUpdate::Board { .. }))));
    assert!(white.session().is_local_turn());
}

#[test]
fn test_resumed_player_rejoins_mid_game() {
    let (mut white, mut black) = players();
    play(&mut white, &mut black, Square::G1, Square::F3);
    let fen = white.session().position().map(|p| p.fen().to_string());

    // Bob restarts and only knows the game id
    let mut bob = MoveCoordinator::resuming("bob", GAME_ID);
    assert!(bob.square_clicked(Square::G8).is_empty());
    bob.apply_snapshot(&snapshot(fen.as_deref()));
    assert_eq!(bob.session().assigned_color(), Some(PlayerColor::Black));
    assert!(bob.session().is_local_turn());

    let (_, received) = play(&mut bob, &mut white, Square::G8, Square::F6);
    assert!(relay(&received).is_empty());
    assert_eq!(white.session().position(), bob.session().position());
}

// ============================================================================
// Properties
// ============================================================================

#[test]
fn test_history_always_replays_to_position() {
    //! Random legal games: after every move the history replayed from the
    //! base position gives exactly the current position on both sides.
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..10 {
        let (mut white, mut black) = players();
        for ply in 0..40 {
            let (mover, receiver) = if ply % 2 == 0 {
                (&mut white, &mut black)
            } else {
                (&mut black, &mut white)
            };
            let Some(position) = mover.session().position().cloned() else {
                panic!("Position known after snapshot");
            };
            if rules::flags(&position).game_over {
                break;
            }
            let moves: Vec<(Square, Square)> = (0..64u32)
                .map(Square::new)
                .flat_map(|from| {
                    rules::legal_moves_from(&position, from)
                        .into_iter()
                        .filter(|option| !option.promotion)
                        .map(move |option| (from, option.to))
                })
                .collect();
            if moves.is_empty() {
                break;
            }
            let (from, to) = moves[rng.random_range(0..moves.len())];
            play(mover, receiver, from, to);

            for side in [&white, &black] {
                let replayed = side.session().replay().expect("History is legal");
                assert_eq!(replayed.as_ref(), side.session().position());
            }
            assert_eq!(white.session().position(), black.session().position());
        }
    }
}

#[test]
fn test_gestures_off_turn_never_send() {
    let (mut white, mut black) = players();
    for square in [Square::E7, Square::E5, Square::G8, Square::F6] {
        let effects = black.square_clicked(square);
        assert!(effects.iter().all(|e| e.as_send().is_none()));
    }
    assert!(black.piece_dropped(Square::E7, Square::E5, None).is_empty());

    play(&mut white, &mut black, Square::E2, Square::E4);
    for square in [Square::D2, Square::D4] {
        assert!(white.square_clicked(square).is_empty());
    }
    assert_eq!(white.session().history().len(), 1);
}

#[test]
fn test_snapshot_is_idempotent() {
    let fen = "r1bqkbnr/pppp1ppp/2n5/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R w KQkq - 2 3";
    let mut coordinator = MoveCoordinator::new("alice");
    coordinator.apply_snapshot(&snapshot(Some(fen)));
    let once = coordinator.session().clone();

    assert!(coordinator.apply_snapshot(&snapshot(Some(fen))).is_empty());
    assert_eq!(coordinator.session(), &once);
}
