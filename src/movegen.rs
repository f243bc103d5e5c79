// SPDX-License-Identifier: GPL-3.0-or-later

use crate::bitboard::{
    attacks_bb, between_bb, line_bb, lsb, more_than_one, pawn_attacks, rank_bb, Bitboard,
};
use crate::position::{castling_destinations, Position};
use crate::types::{
    direction::{pawn_push, Direction},
    relative_rank, CastlingSide, Color, Move, MoveType, PieceType, Square, MAX_MOVES, RANK_3,
    RANK_6, RANK_7,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GenType {
    Evasions,
    NonEvasions,
}

/// A fixed-capacity list of moves.
#[derive(Clone)]
pub struct MoveList {
    moves: [Move; MAX_MOVES],
    len: usize,
}

impl MoveList {
    fn new() -> MoveList {
        MoveList {
            moves: [Move::NONE; MAX_MOVES],
            len: 0,
        }
    }

    /// All legal moves of the side to move.
    pub fn legal(pos: &Position) -> MoveList {
        let mut list = MoveList::pseudo_legal(pos);

        let us = pos.side_to_move();
        let pinned = pos.pinned_pieces(us);
        let ksq = pos.square(us, PieceType::KING);

        let mut i = 0;
        while i < list.len {
            let m = list.moves[i];
            if (pinned & m.from() != 0 || m.from() == ksq || m.move_type() == MoveType::EnPassant)
                && !pos.legal(m)
            {
                list.len -= 1;
                list.moves[i] = list.moves[list.len];
            } else {
                i += 1;
            }
        }
        list
    }

    /// Pseudo-legal moves: evasions when in check, otherwise every move that
    /// obeys piece movement rules. Some of them may leave the king in check.
    pub fn pseudo_legal(pos: &Position) -> MoveList {
        let mut list = MoveList::new();
        if pos.in_check() {
            generate_evasions(pos, &mut list);
        } else {
            let target = !pos.pieces_c(pos.side_to_move());
            generate_all(pos, &mut list, pos.side_to_move(), target, GenType::NonEvasions);
        }
        list
    }

    #[inline]
    fn push(&mut self, m: Move) {
        debug_assert!(self.len < MAX_MOVES);
        self.moves[self.len] = m;
        self.len += 1;
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn contains(&self, m: Move) -> bool {
        self.as_slice().contains(&m)
    }

    pub fn as_slice(&self) -> &[Move] {
        &self.moves[..self.len]
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Move> {
        self.as_slice().iter()
    }
}

impl<'a> IntoIterator for &'a MoveList {
    type Item = &'a Move;
    type IntoIter = std::slice::Iter<'a, Move>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl std::fmt::Debug for MoveList {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_list().entries(self.as_slice()).finish()
    }
}

fn make_promotions(list: &mut MoveList, from: Square, to: Square) {
    for pt in [
        PieceType::QUEEN,
        PieceType::ROOK,
        PieceType::BISHOP,
        PieceType::KNIGHT,
    ] {
        list.push(Move::make_prom(from, to, pt));
    }
}

fn generate_pawn_moves(
    pos: &Position,
    list: &mut MoveList,
    us: Color,
    target: Bitboard,
    gen: GenType,
) {
    let them = !us;
    let rank7 = rank_bb(relative_rank(us, RANK_7));
    let rank3 = rank_bb(relative_rank(us, RANK_3));
    let up = pawn_push(us);
    let (up_right, up_left) = if us == Color::WHITE {
        (Direction::NORTH_EAST, Direction::NORTH_WEST)
    } else {
        (Direction::SOUTH_WEST, Direction::SOUTH_EAST)
    };

    let pawns = pos.pieces_cp(us, PieceType::PAWN);
    let pawns_on7 = pawns & rank7;
    let pawns_not_on7 = pawns & !rank7;

    let enemies = match gen {
        GenType::Evasions => pos.pieces_c(them) & target,
        GenType::NonEvasions => pos.pieces_c(them),
    };
    let empty_squares = !pos.pieces();

    // Single and double pawn pushes, no promotions
    let mut b1 = pawns_not_on7.shift(up) & empty_squares;
    let mut b2 = (b1 & rank3).shift(up) & empty_squares;

    if gen == GenType::Evasions {
        // Consider only blocking squares
        b1 &= target;
        b2 &= target;
    }

    for to in b1 {
        list.push(Move::make(to - up, to));
    }
    for to in b2 {
        list.push(Move::make(to - up - up, to));
    }

    // Promotions and underpromotions
    if pawns_on7 != 0 {
        let mut b3 = pawns_on7.shift(up) & empty_squares;
        if gen == GenType::Evasions {
            b3 &= target;
        }

        for to in pawns_on7.shift(up_right) & enemies {
            make_promotions(list, to - up_right, to);
        }
        for to in pawns_on7.shift(up_left) & enemies {
            make_promotions(list, to - up_left, to);
        }
        for to in b3 {
            make_promotions(list, to - up, to);
        }
    }

    // Standard and en passant captures
    for to in pawns_not_on7.shift(up_right) & enemies {
        list.push(Move::make(to - up_right, to));
    }
    for to in pawns_not_on7.shift(up_left) & enemies {
        list.push(Move::make(to - up_left, to));
    }

    let ep = pos.ep_square();
    if ep != Square::NONE {
        debug_assert!(ep.relative_rank(us) == RANK_6);

        // An en passant capture can be an evasion only if the checking piece
        // is the double pushed pawn and so is in the target. Otherwise this
        // is a discovered check and we are forced to do otherwise.
        if gen == GenType::Evasions && target & (ep - up) == 0 {
            return;
        }

        for from in pawns_not_on7 & pawn_attacks(them, ep) {
            list.push(Move::make_special(MoveType::EnPassant, from, ep));
        }
    }
}

fn generate_piece_moves(pos: &Position, list: &mut MoveList, us: Color, pt: PieceType, target: Bitboard) {
    for &from in pos.squares(us, pt) {
        for to in pos.attacks_from(pt, from) & target {
            list.push(Move::make(from, to));
        }
    }
}

fn generate_castling(pos: &Position, list: &mut MoveList, us: Color, cs: CastlingSide) {
    let cr = us | cs;
    if !pos.has_castling_right(cr) || pos.castling_impeded(cr) {
        return;
    }

    let kfrom = pos.square(us, PieceType::KING);
    let rfrom = pos.castling_rook_square(cr);
    let (kto, _) = castling_destinations(us, kfrom, rfrom);
    let enemies = pos.pieces_c(!us);

    debug_assert!(!pos.in_check());

    // Every square the king crosses, destination included, must be safe.
    let step = if kto > kfrom {
        Direction::WEST
    } else {
        Direction::EAST
    };
    let mut s = kto;
    while s != kfrom {
        if pos.attackers_to(s) & enemies != 0 {
            return;
        }
        s += step;
    }

    // In Chess960 the castling rook may have been shielding the king's
    // destination from an enemy rook or queen on the back rank.
    if attacks_bb(PieceType::ROOK, kto, pos.pieces() ^ rfrom)
        & pos.pieces_cpp(!us, PieceType::ROOK, PieceType::QUEEN)
        != 0
    {
        return;
    }

    list.push(Move::make_special(MoveType::Castling, kfrom, rfrom));
}

fn generate_all(pos: &Position, list: &mut MoveList, us: Color, target: Bitboard, gen: GenType) {
    generate_pawn_moves(pos, list, us, target, gen);
    for pt in [
        PieceType::KNIGHT,
        PieceType::BISHOP,
        PieceType::ROOK,
        PieceType::QUEEN,
    ] {
        generate_piece_moves(pos, list, us, pt, target);
    }

    if gen == GenType::NonEvasions {
        let ksq = pos.square(us, PieceType::KING);
        for to in pos.attacks_from(PieceType::KING, ksq) & target {
            list.push(Move::make(ksq, to));
        }

        if pos.can_castle(us) {
            generate_castling(pos, list, us, CastlingSide::King);
            generate_castling(pos, list, us, CastlingSide::Queen);
        }
    }
}

// generate_evasions() generates all pseudo-legal check evasions when the side
// to move is in check.
fn generate_evasions(pos: &Position, list: &mut MoveList) {
    debug_assert!(pos.in_check());

    let us = pos.side_to_move();
    let ksq = pos.square(us, PieceType::KING);
    let mut slider_attacks = Bitboard(0);
    let sliders = pos.checkers() & !pos.pieces_pp(PieceType::KNIGHT, PieceType::PAWN);

    // Find all the squares attacked by slider checkers. We will remove them
    // from the king evasions in order to skip known illegal moves, which
    // avoids any useless legality checks later on.
    for checksq in sliders {
        slider_attacks |= line_bb(checksq, ksq) ^ checksq;
    }

    // Generate evasions for king, capture and non capture moves
    for to in pos.attacks_from(PieceType::KING, ksq) & !pos.pieces_c(us) & !slider_attacks {
        list.push(Move::make(ksq, to));
    }

    // Double check, only a king move can save the day
    if more_than_one(pos.checkers()) {
        return;
    }

    // Generate blocking evasions or captures of the checking piece
    let checksq = lsb(pos.checkers());
    let target = between_bb(checksq, ksq) | checksq;

    generate_all(pos, list, us, target, GenType::Evasions);
}

/// Counts the leaf nodes of the legal move tree to the given depth.
pub fn perft(pos: &Position, depth: u32) -> u64 {
    if depth == 0 {
        return 1;
    }

    let moves = MoveList::legal(pos);
    if depth == 1 {
        return moves.len() as u64;
    }

    moves
        .iter()
        .map(|&m| {
            let mut child = pos.clone();
            child.do_move(m);
            perft(&child, depth - 1)
        })
        .sum()
}

/// Per-move breakdown of `perft` at the root.
pub fn divide(pos: &Position, depth: u32) -> Vec<(Move, u64)> {
    MoveList::legal(pos)
        .iter()
        .map(|&m| {
            let mut child = pos.clone();
            child.do_move(m);
            (m, perft(&child, depth.saturating_sub(1)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(fen: &str) -> Position {
        Position::from_fen(fen).unwrap()
    }

    fn legal_moves(p: &Position) -> Vec<Move> {
        MoveList::legal(p).as_slice().to_vec()
    }

    #[test]
    fn startpos_has_twenty_moves() {
        let p = Position::startpos();
        let moves = MoveList::legal(&p);
        assert_eq!(moves.len(), 20);
        assert!(moves.contains(Move::make(Square::G1, Square::F3)));
        assert!(moves.contains(Move::make(Square::E2, Square::E4)));
        assert!(!moves.contains(Move::make(Square::E1, Square::E2)));
    }

    #[test]
    fn every_generated_move_is_legal_and_pseudo_legal() {
        let p = pos("r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1");
        let moves = MoveList::legal(&p);
        assert_eq!(moves.len(), 48);
        for &m in &moves {
            assert!(p.pseudo_legal(m), "{m:?}");
            assert!(p.legal(m), "{m:?}");
        }
    }

    #[test]
    fn double_check_allows_only_king_moves() {
        // Rook on e8 and bishop on b4 both check the king on e1.
        let p = pos("4r1k1/8/8/8/1b6/8/8/4K1N1 w - - 0 1");
        assert!(more_than_one(p.checkers()));
        let moves = legal_moves(&p);
        assert!(!moves.is_empty());
        assert!(moves.iter().all(|m| m.from() == Square::E1));
        assert!(!moves.contains(&Move::make(Square::G1, Square::E2)));
    }

    #[test]
    fn single_check_can_be_blocked_or_captured() {
        let p = pos("4r1k1/8/8/8/8/8/3N4/R3K3 w - - 0 1");
        let moves = legal_moves(&p);
        assert!(moves.contains(&Move::make(Square::D2, Square::E4)));
        assert!(!moves.contains(&Move::make(Square::D2, Square::F3)));
        // The king may not retreat along the checking line.
        assert!(!moves.contains(&Move::make(Square::E1, Square::E2)));
        assert!(moves.contains(&Move::make(Square::E1, Square::D1)));
        // Castling out of check is never generated.
        assert!(moves.iter().all(|m| m.move_type() != MoveType::Castling));
    }

    #[test]
    fn en_passant_evasion_captures_the_checker() {
        // The pawn that just moved to d5 checks the king on e4.
        let p = pos("8/8/8/3pP3/4K3/8/8/7k w - d6 0 2");
        assert_eq!(p.checkers(), Square::D5.bb());
        let ep = Move::make_special(MoveType::EnPassant, Square::E5, Square::D6);
        assert!(legal_moves(&p).contains(&ep));
    }

    #[test]
    fn castling_requires_safe_path() {
        // The bishop on a6 covers f1, so only the queen side is available.
        let p = pos("4k3/8/b7/8/8/8/8/R3K2R w KQ - 0 1");
        let moves = legal_moves(&p);
        assert!(!moves.contains(&Move::make_special(MoveType::Castling, Square::E1, Square::H1)));
        assert!(moves.contains(&Move::make_special(MoveType::Castling, Square::E1, Square::A1)));

        // b1 may be attacked since the king never crosses it, c1 may not.
        let ooo = Move::make_special(MoveType::Castling, Square::E1, Square::A1);
        let p = pos("1r2k3/8/8/8/8/8/8/R3K2R w KQ - 0 1");
        assert!(legal_moves(&p).contains(&ooo));
        let p = pos("2r1k3/8/8/8/8/8/8/R3K2R w KQ - 0 1");
        assert!(!legal_moves(&p).contains(&ooo));
    }

    #[test]
    fn castling_requires_empty_path() {
        let p = pos("4k3/8/8/8/8/8/8/RN2K1NR w KQ - 0 1");
        assert!(legal_moves(&p).iter().all(|m| m.move_type() != MoveType::Castling));
    }

    #[test]
    fn chess960_rook_shield() {
        // King f1, rook b1, enemy rook a1. Castling queen side puts the king
        // on c1, which the a1 rook sees once b1 is vacated.
        let p = Position::from_fen_960("1k6/8/8/8/8/8/8/rR3K2 w B - 0 1", true).unwrap();
        assert!(!p.in_check());
        assert!(legal_moves(&p).iter().all(|m| m.move_type() != MoveType::Castling));
    }

    #[test]
    fn chess960_king_already_on_destination() {
        // King g1 and rook h1: castling king side moves only the rook.
        let mut p = Position::from_fen_960("6k1/8/8/8/8/8/8/6KR w H - 0 1", true).unwrap();
        let castle = Move::make_special(MoveType::Castling, Square::G1, Square::H1);
        assert!(legal_moves(&p).contains(&castle));
        p.apply(castle).unwrap();
        assert_eq!(p.fen(), "6k1/8/8/8/8/8/8/5RK1 b - - 1 1");
    }

    #[test]
    fn stalemate_has_no_moves() {
        let p = pos("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1");
        assert!(!p.in_check());
        assert!(MoveList::legal(&p).is_empty());
    }

    #[test]
    fn perft_small_depths() {
        let p = Position::startpos();
        assert_eq!(perft(&p, 0), 1);
        assert_eq!(perft(&p, 1), 20);
        assert_eq!(perft(&p, 2), 400);
        assert_eq!(perft(&p, 3), 8_902);
    }

    #[test]
    fn divide_sums_to_perft() {
        let p = pos("8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1");
        let split = divide(&p, 3);
        assert_eq!(split.len(), 14);
        assert_eq!(split.iter().map(|&(_, n)| n).sum::<u64>(), 2_812);
    }
}
