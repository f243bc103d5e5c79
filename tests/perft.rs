// SPDX-License-Identifier: GPL-3.0-or-later

//! Perft: exhaustive move-generation correctness suite.
//!
//! Leaf counts at fixed depths for the standard positions. A wrong count
//! means a bug in move generation, move application or legality filtering.
//!
//! Reference: <https://www.chessprogramming.org/Perft_Results>

use poscore::movegen::divide;
use poscore::{perft, MoveList, Position};

/// Perft that walks the tree through the public API and checks the position
/// self-consistency at every node.
fn checked_perft(pos: &Position, depth: u32) -> u64 {
    assert_eq!(pos.validate(), Ok(()), "{}", pos.fen());
    if depth == 0 {
        return 1;
    }
    let mut nodes = 0u64;
    for &m in &MoveList::legal(pos) {
        let child = Position::after(pos, m).unwrap();
        nodes += checked_perft(&child, depth - 1);
    }
    nodes
}

// =====================================================================
// Position 1: starting position
// =====================================================================

#[test]
fn perft_start_depth_1() {
    assert_eq!(perft(&Position::startpos(), 1), 20);
}

#[test]
fn perft_start_depth_2() {
    assert_eq!(perft(&Position::startpos(), 2), 400);
}

#[test]
fn perft_start_depth_3() {
    assert_eq!(perft(&Position::startpos(), 3), 8_902);
}

#[test]
fn perft_start_depth_4() {
    assert_eq!(perft(&Position::startpos(), 4), 197_281);
}

// =====================================================================
// Position 2: "Kiwipete" (castling, en passant, pins, promotions)
// =====================================================================

fn kiwipete() -> Position {
    Position::from_fen("r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1")
        .unwrap()
}

#[test]
fn perft_kiwipete_depth_1() {
    assert_eq!(perft(&kiwipete(), 1), 48);
}

#[test]
fn perft_kiwipete_depth_2() {
    assert_eq!(perft(&kiwipete(), 2), 2_039);
}

#[test]
fn perft_kiwipete_depth_3() {
    assert_eq!(perft(&kiwipete(), 3), 97_862);
}

#[test]
fn perft_kiwipete_checked_depth_2() {
    assert_eq!(checked_perft(&kiwipete(), 2), 2_039);
}

// =====================================================================
// Position 3: rook endgame with en passant discovered checks
// =====================================================================

fn position_3() -> Position {
    Position::from_fen("8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1").unwrap()
}

#[test]
fn perft_pos3_depth_1() {
    assert_eq!(perft(&position_3(), 1), 14);
}

#[test]
fn perft_pos3_depth_2() {
    assert_eq!(perft(&position_3(), 2), 191);
}

#[test]
fn perft_pos3_depth_3() {
    assert_eq!(perft(&position_3(), 3), 2_812);
}

#[test]
fn perft_pos3_depth_4() {
    assert_eq!(perft(&position_3(), 4), 43_238);
}

#[test]
fn perft_pos3_checked_depth_3() {
    assert_eq!(checked_perft(&position_3(), 3), 2_812);
}

// =====================================================================
// Position 4 and its mirror
// =====================================================================

fn position_4() -> Position {
    Position::from_fen("r3k2r/Pppp1ppp/1b3nbN/nP6/BBP1P3/q4N2/Pp1P2PP/R2Q1RK1 w kq - 0 1").unwrap()
}

fn position_4_mirrored() -> Position {
    Position::from_fen("r2q1rk1/pP1p2pp/Q4n2/bbp1p3/Np6/1B3NBn/pPPP1PPP/R3K2R b KQ - 0 1").unwrap()
}

#[test]
fn perft_pos4_depth_1() {
    assert_eq!(perft(&position_4(), 1), 6);
    assert_eq!(perft(&position_4_mirrored(), 1), 6);
}

#[test]
fn perft_pos4_depth_2() {
    assert_eq!(perft(&position_4(), 2), 264);
    assert_eq!(perft(&position_4_mirrored(), 2), 264);
}

#[test]
fn perft_pos4_depth_3() {
    assert_eq!(perft(&position_4(), 3), 9_467);
    assert_eq!(perft(&position_4_mirrored(), 3), 9_467);
}

// =====================================================================
// Position 5
// =====================================================================

fn position_5() -> Position {
    Position::from_fen("rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 1 8").unwrap()
}

#[test]
fn perft_pos5_depth_1() {
    assert_eq!(perft(&position_5(), 1), 44);
}

#[test]
fn perft_pos5_depth_2() {
    assert_eq!(perft(&position_5(), 2), 1_486);
}

#[test]
fn perft_pos5_depth_3() {
    assert_eq!(perft(&position_5(), 3), 62_379);
}

// =====================================================================
// Chess960
// =====================================================================

fn chess960_1() -> Position {
    Position::from_fen_960("bqnb1rkr/pp3ppp/3ppn2/2p5/5P2/P2P4/NPP1P1PP/BQ1BNRKR w HFhf - 2 9", true)
        .unwrap()
}

#[test]
fn perft_chess960_depth_1() {
    assert_eq!(perft(&chess960_1(), 1), 21);
}

#[test]
fn perft_chess960_depth_2() {
    assert_eq!(perft(&chess960_1(), 2), 528);
}

#[test]
fn perft_chess960_depth_3() {
    assert_eq!(checked_perft(&chess960_1(), 3), 12_189);
}

#[test]
fn divide_matches_perft() {
    let pos = kiwipete();
    let split = divide(&pos, 2);
    assert_eq!(split.len(), 48);
    assert_eq!(split.iter().map(|&(_, n)| n).sum::<u64>(), 2_039);
}
