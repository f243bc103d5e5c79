// SPDX-License-Identifier: GPL-3.0-or-later

//! The "position" command and coordinate move notation.

use poscore::uci::{move_str, parse_position, to_move};
use poscore::{MoveList, Position, PositionError, UciError, START_FEN};

#[test]
fn every_legal_move_survives_text_round_trip() {
    for (fen, chess960) in [
        ("r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1", false),
        ("r3k2r/Pppp1ppp/1b3nbN/nP6/BBP1P3/q4N2/Pp1P2PP/R2Q1RK1 w kq - 0 1", false),
        ("r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1", true),
    ] {
        let pos = Position::from_fen_960(fen, chess960).unwrap();
        for &m in &MoveList::legal(&pos) {
            let text = move_str(m, chess960);
            assert_eq!(to_move(&pos, &text), Ok(m), "{text}");
        }
    }
}

#[test]
fn startpos_line_reaches_expected_fen() {
    let cmd = parse_position("startpos moves e2e4 c7c5 g1f3 d7d6 d2d4 c5d4 f3d4").unwrap();
    let (tree, last) = cmd.build_tree(false, 50).unwrap();
    assert_eq!(
        tree.fen(last),
        "rnbqkbnr/pp2pppp/3p4/8/3NP3/8/PPP2PPP/RNBQKB1R b KQkq - 0 4"
    );
    assert_eq!(tree.line(last).len(), 7);
    assert_eq!(tree.fen(tree.root()), START_FEN);
}

#[test]
fn fen_line_with_en_passant_and_castling() {
    let cmd = parse_position(
        "fen rnbqk2r/pppp1ppp/5n2/2b1p3/2B1P3/5N2/PPPP1PPP/RNBQK2R w KQkq - 4 4 moves e1g1 d7d5 e4d5",
    )
    .unwrap();
    let (tree, last) = cmd.build_tree(false, 50).unwrap();
    assert_eq!(
        tree.fen(last),
        "rnbqk2r/ppp2ppp/5n2/2bPp3/2B5/5N2/PPPP1PPP/RNBQ1RK1 b kq - 0 5"
    );
}

#[test]
fn en_passant_from_text() {
    let cmd = parse_position("startpos moves e2e4 a7a6 e4e5 d7d5 e5d6").unwrap();
    let (tree, last) = cmd.build_tree(false, 50).unwrap();
    assert_eq!(
        tree.fen(last),
        "rnbqkbnr/1pp1pppp/p2P4/8/8/8/PPPP1PPP/RNBQKBNR b KQkq - 0 3"
    );
}

#[test]
fn bad_commands_are_reported() {
    assert!(matches!(parse_position("start"), Err(UciError::BadPositionCommand(_))));

    let cmd = parse_position("fen 4k3/8/8/8/8/8/8/4K3 x - - 0 1").unwrap();
    assert!(matches!(
        cmd.build_tree(false, 50),
        Err(UciError::Position(PositionError::InvalidNotation { .. }))
    ));

    let cmd = parse_position("startpos moves e2e4 e7e5 e1g1").unwrap();
    assert_eq!(
        cmd.build_tree(false, 50).unwrap_err(),
        UciError::UnknownMove("e1g1".to_string())
    );

    let cmd = parse_position("startpos moves e2-e4").unwrap();
    assert_eq!(
        cmd.build_tree(false, 50).unwrap_err(),
        UciError::BadMoveText("e2-e4".to_string())
    );
}
