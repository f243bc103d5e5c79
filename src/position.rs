// SPDX-License-Identifier: GPL-3.0-or-later

use crate::bitboard::{
    aligned, attacks_bb, between_bb, lsb, more_than_one, pawn_attacks, popcount, pseudo_attacks,
    Bitboard, RANK1_BB, RANK8_BB,
};
use crate::error::{Inconsistency, PositionError};
use crate::movegen::MoveList;
use crate::types::{
    direction::pawn_push, key::Key, relative_rank, relative_square, CastlingRight, CastlingSide,
    Color, Move, MoveType, Piece, PieceType, Square, SquareList, RANK_2, RANK_6, RANK_8,
};
use crate::uci;

pub mod fen;

pub use fen::START_FEN;

pub mod zobrist {
    use once_cell::sync::Lazy;

    use crate::bitboard::Bitboard;
    use crate::misc::Prng;
    use crate::types::{key::Key, CastlingRight, File, Piece, Square};

    struct Keys {
        psq: [[Key; 64]; 16],
        enpassant: [Key; 8],
        castling: [Key; 16],
        side: Key,
    }

    static KEYS: Lazy<Keys> = Lazy::new(init);

    pub fn psq(pc: Piece, s: Square) -> Key {
        KEYS.psq[pc.0 as usize][s.0 as usize]
    }

    pub fn enpassant(f: File) -> Key {
        KEYS.enpassant[f as usize]
    }

    pub fn castling(cr: CastlingRight) -> Key {
        KEYS.castling[cr.0 as usize]
    }

    pub fn side() -> Key {
        KEYS.side
    }

    // init() fills the key tables from a fixed seed, so keys are identical
    // from run to run. A combination of castling rights hashes to the XOR of
    // the keys of its single rights.
    fn init() -> Keys {
        let mut rng = Prng::new(1_070_372);
        let mut keys = Keys {
            psq: [[Key(0); 64]; 16],
            enpassant: [Key(0); 8],
            castling: [Key(0); 16],
            side: Key(0),
        };

        for pc in Piece::ALL {
            for s in 0..64 {
                keys.psq[pc.0 as usize][s] = Key(rng.rand64());
            }
        }

        for f in 0..8 {
            keys.enpassant[f] = Key(rng.rand64());
        }

        for cr in 0..16u64 {
            for s in Bitboard(cr) {
                let k = keys.castling[1usize << s.0];
                keys.castling[cr as usize] ^= if k.0 != 0 { k } else { Key(rng.rand64()) };
            }
        }

        keys.side = Key(rng.rand64());
        keys
    }
}

/// A chess position. The board is held three times over: a square-indexed
/// ledger, occupancy bitboards by role and color, and per-piece square lists
/// with a reverse index. `put_piece`, `remove_piece` and `move_piece` are the
/// only writers and keep the three views in step.
///
/// Positions only move forward. To explore several continuations, clone the
/// position once per branch (see `Position::after`).
#[derive(Clone)]
pub struct Position {
    board: [Piece; 64],
    by_color_bb: [Bitboard; 2],
    by_type_bb: [Bitboard; 8],
    piece_count: [i32; 16],
    piece_list: [[Square; 16]; 16],
    index: [i32; 64],
    castling_rights_mask: [CastlingRight; 64],
    castling_rook_square: [Square; 16],
    castling_path: [Bitboard; 16],
    castling_rights: CastlingRight,
    ep_square: Square,
    rule50: i32,
    game_ply: i32,
    side_to_move: Color,
    chess960: bool,
    key: Key,
    captured_piece: Piece,
    checkers_bb: Bitboard,
    blockers_for_king: [Bitboard; 2],
    pinners_for_king: [Bitboard; 2],
    check_squares: [Bitboard; 8],
}

impl Position {
    fn empty() -> Position {
        Position {
            board: [Piece::NONE; 64],
            by_color_bb: [Bitboard(0); 2],
            by_type_bb: [Bitboard(0); 8],
            piece_count: [0; 16],
            piece_list: [[Square::NONE; 16]; 16],
            index: [0; 64],
            castling_rights_mask: [CastlingRight::NONE; 64],
            castling_rook_square: [Square::NONE; 16],
            castling_path: [Bitboard(0); 16],
            castling_rights: CastlingRight::NONE,
            ep_square: Square::NONE,
            rule50: 0,
            game_ply: 0,
            side_to_move: Color::WHITE,
            chess960: false,
            key: Key(0),
            captured_piece: Piece::NONE,
            checkers_bb: Bitboard(0),
            blockers_for_king: [Bitboard(0); 2],
            pinners_for_king: [Bitboard(0); 2],
            check_squares: [Bitboard(0); 8],
        }
    }

    /// The standard starting position.
    pub fn startpos() -> Position {
        Position::from_fen(START_FEN).expect("start position FEN is well formed")
    }

    /// Copies `pos` and plays `m` on the copy.
    pub fn after(pos: &Position, m: Move) -> Result<Position, PositionError> {
        let mut next = pos.clone();
        next.apply(m)?;
        Ok(next)
    }

    #[inline(always)]
    pub fn side_to_move(&self) -> Color {
        self.side_to_move
    }

    #[inline(always)]
    pub fn empty_square(&self, s: Square) -> bool {
        self.board[s.0 as usize] == Piece::NONE
    }

    #[inline(always)]
    pub fn piece_on(&self, s: Square) -> Piece {
        self.board[s.0 as usize]
    }

    #[inline(always)]
    pub fn moved_piece(&self, m: Move) -> Piece {
        self.board[m.from().0 as usize]
    }

    #[inline(always)]
    pub fn pieces(&self) -> Bitboard {
        self.by_type_bb[PieceType::ALL_PIECES.0 as usize]
    }

    #[inline(always)]
    pub fn pieces_p(&self, pt: PieceType) -> Bitboard {
        self.by_type_bb[pt.0 as usize]
    }

    #[inline(always)]
    pub fn pieces_pp(&self, pt1: PieceType, pt2: PieceType) -> Bitboard {
        self.pieces_p(pt1) | self.pieces_p(pt2)
    }

    #[inline(always)]
    pub fn pieces_c(&self, c: Color) -> Bitboard {
        self.by_color_bb[c.0 as usize]
    }

    #[inline(always)]
    pub fn pieces_cp(&self, c: Color, pt: PieceType) -> Bitboard {
        self.pieces_c(c) & self.pieces_p(pt)
    }

    #[inline(always)]
    pub fn pieces_cpp(&self, c: Color, pt1: PieceType, pt2: PieceType) -> Bitboard {
        self.pieces_c(c) & self.pieces_pp(pt1, pt2)
    }

    #[inline(always)]
    pub fn count(&self, c: Color, pt: PieceType) -> i32 {
        self.piece_count[Piece::make(c, pt).0 as usize]
    }

    // Number of pieces of color c, any role.
    #[inline(always)]
    pub fn count_all(&self, c: Color) -> i32 {
        self.piece_count[Piece::make(c, PieceType::ALL_PIECES).0 as usize]
    }

    #[inline(always)]
    pub fn squares(&self, c: Color, pt: PieceType) -> &[Square] {
        let pc = Piece::make(c, pt);
        &self.piece_list[pc.0 as usize][..self.piece_count[pc.0 as usize] as usize]
    }

    #[inline(always)]
    pub fn square_list(&self, c: Color, pt: PieceType) -> SquareList<'_> {
        SquareList::construct(&self.piece_list[Piece::make(c, pt).0 as usize])
    }

    #[inline(always)]
    pub fn square(&self, c: Color, pt: PieceType) -> Square {
        debug_assert!(self.count(c, pt) == 1);
        self.piece_list[Piece::make(c, pt).0 as usize][0]
    }

    #[inline(always)]
    pub fn ep_square(&self) -> Square {
        self.ep_square
    }

    #[inline(always)]
    pub fn has_castling_right(&self, cr: CastlingRight) -> bool {
        self.castling_rights & cr != 0
    }

    #[inline(always)]
    pub fn castling_rights(&self, c: Color) -> CastlingRight {
        self.castling_rights & CastlingRight::of(c)
    }

    #[inline(always)]
    pub fn can_castle(&self, c: Color) -> bool {
        self.castling_rights(c) != 0
    }

    #[inline(always)]
    pub fn castling_impeded(&self, cr: CastlingRight) -> bool {
        self.pieces() & self.castling_path[cr.0 as usize] != 0
    }

    #[inline(always)]
    pub fn castling_rook_square(&self, cr: CastlingRight) -> Square {
        self.castling_rook_square[cr.0 as usize]
    }

    #[inline(always)]
    pub fn castling_path(&self, cr: CastlingRight) -> Bitboard {
        self.castling_path[cr.0 as usize]
    }

    #[inline(always)]
    pub fn attacks_from_pawn(&self, s: Square, c: Color) -> Bitboard {
        pawn_attacks(c, s)
    }

    pub fn attacks_from(&self, pt: PieceType, s: Square) -> Bitboard {
        debug_assert!(pt != PieceType::PAWN);
        attacks_bb(pt, s, self.pieces())
    }

    // attackers_to_occ() computes a bitboard of all pieces, of both colors,
    // which attack a given square. Slider attacks use the occ bitboard to
    // indicate occupancy.
    #[inline(always)]
    pub fn attackers_to_occ(&self, s: Square, occ: Bitboard) -> Bitboard {
        (self.attacks_from_pawn(s, Color::BLACK) & self.pieces_cp(Color::WHITE, PieceType::PAWN))
            | (self.attacks_from_pawn(s, Color::WHITE)
                & self.pieces_cp(Color::BLACK, PieceType::PAWN))
            | (pseudo_attacks(PieceType::KNIGHT, s) & self.pieces_p(PieceType::KNIGHT))
            | (attacks_bb(PieceType::ROOK, s, occ)
                & self.pieces_pp(PieceType::ROOK, PieceType::QUEEN))
            | (attacks_bb(PieceType::BISHOP, s, occ)
                & self.pieces_pp(PieceType::BISHOP, PieceType::QUEEN))
            | (pseudo_attacks(PieceType::KING, s) & self.pieces_p(PieceType::KING))
    }

    #[inline(always)]
    pub fn attackers_to(&self, s: Square) -> Bitboard {
        self.attackers_to_occ(s, self.pieces())
    }

    #[inline(always)]
    pub fn checkers(&self) -> Bitboard {
        self.checkers_bb
    }

    #[inline(always)]
    pub fn in_check(&self) -> bool {
        self.checkers_bb != 0
    }

    #[inline(always)]
    pub fn blockers_for_king(&self, c: Color) -> Bitboard {
        self.blockers_for_king[c.0 as usize]
    }

    #[inline(always)]
    pub fn pinners_for_king(&self, c: Color) -> Bitboard {
        self.pinners_for_king[c.0 as usize]
    }

    // Own pieces pinned to the king of color c.
    #[inline(always)]
    pub fn pinned_pieces(&self, c: Color) -> Bitboard {
        self.blockers_for_king(c) & self.pieces_c(c)
    }

    #[inline(always)]
    pub fn check_squares(&self, pt: PieceType) -> Bitboard {
        self.check_squares[pt.0 as usize]
    }

    #[inline(always)]
    pub fn key(&self) -> Key {
        self.key
    }

    #[inline(always)]
    pub fn game_ply(&self) -> i32 {
        self.game_ply
    }

    #[inline(always)]
    pub fn fullmove_number(&self) -> i32 {
        1 + self.game_ply / 2
    }

    #[inline(always)]
    pub fn rule50_count(&self) -> i32 {
        self.rule50
    }

    #[inline(always)]
    pub fn is_chess960(&self) -> bool {
        self.chess960
    }

    #[inline(always)]
    pub fn captured_piece(&self) -> Piece {
        self.captured_piece
    }

    pub fn capture(&self, m: Move) -> bool {
        debug_assert!(m.is_ok());
        match m.move_type() {
            MoveType::Castling => false,
            MoveType::EnPassant => true,
            _ => !self.empty_square(m.to()),
        }
    }

    // set_castling_right() is a helper function used to set castling rights
    // given the corresponding color and the rook starting square.
    fn set_castling_right(&mut self, c: Color, rfrom: Square) {
        let kfrom = self.square(c, PieceType::KING);
        let cs = if kfrom < rfrom {
            CastlingSide::King
        } else {
            CastlingSide::Queen
        };
        let cr = c | cs;

        self.castling_rights |= cr;
        self.castling_rights_mask[kfrom.0 as usize] |= cr;
        self.castling_rights_mask[rfrom.0 as usize] |= cr;
        self.castling_rook_square[cr.0 as usize] = rfrom;

        let kto = relative_square(
            c,
            match cs {
                CastlingSide::King => Square::G1,
                CastlingSide::Queen => Square::C1,
            },
        );
        let rto = relative_square(
            c,
            match cs {
                CastlingSide::King => Square::F1,
                CastlingSide::Queen => Square::D1,
            },
        );

        let mut path = Bitboard(0);
        for (a, b) in [(rfrom, rto), (kfrom, kto)] {
            for s in std::cmp::min(a, b).0..=std::cmp::max(a, b).0 {
                let s = Square(s);
                if s != kfrom && s != rfrom {
                    path |= s;
                }
            }
        }
        self.castling_path[cr.0 as usize] = path;
    }

    // set_check_info() computes the pin state of both kings and the squares
    // from which each piece type of the side to move would check the
    // opposing king.
    fn set_check_info(&mut self) {
        for c in Color::BOTH {
            let (blockers, pinners) =
                self.slider_blockers(self.pieces_c(!c), self.square(c, PieceType::KING));
            self.blockers_for_king[c.0 as usize] = blockers;
            self.pinners_for_king[c.0 as usize] = pinners;
        }

        let ksq = self.square(!self.side_to_move, PieceType::KING);

        let bishop = self.attacks_from(PieceType::BISHOP, ksq);
        let rook = self.attacks_from(PieceType::ROOK, ksq);
        self.check_squares = [
            Bitboard(0),
            self.attacks_from_pawn(ksq, !self.side_to_move),
            pseudo_attacks(PieceType::KNIGHT, ksq),
            bishop,
            rook,
            bishop | rook,
            Bitboard(0),
            Bitboard(0),
        ];
    }

    // set_state() derives everything that is otherwise maintained
    // incrementally. It is used only when a new position is set up.
    fn set_state(&mut self) {
        self.key = self.compute_key();
        self.checkers_bb = self.attackers_to(self.square(self.side_to_move, PieceType::KING))
            & self.pieces_c(!self.side_to_move);
        self.set_check_info();
    }

    fn compute_key(&self) -> Key {
        let mut k = Key(0);

        for s in self.pieces() {
            k ^= zobrist::psq(self.piece_on(s), s);
        }

        if self.ep_square != Square::NONE {
            k ^= zobrist::enpassant(self.ep_square.file());
        }

        if self.side_to_move == Color::BLACK {
            k ^= zobrist::side();
        }

        k ^ zobrist::castling(self.castling_rights)
    }

    /// Returns the pieces (both colors) that block attacks on `s` from
    /// `sliders`, together with the sliders pinning a piece of the same color
    /// as the piece on `s`. A slider whose ray to `s` holds no piece at all,
    /// or more than one, contributes nothing.
    pub fn slider_blockers(&self, sliders: Bitboard, s: Square) -> (Bitboard, Bitboard) {
        let mut blockers = Bitboard(0);
        let mut pinners = Bitboard(0);

        // Snipers are sliders that attack 's' when a piece is removed
        let snipers = ((pseudo_attacks(PieceType::ROOK, s)
            & self.pieces_pp(PieceType::QUEEN, PieceType::ROOK))
            | (pseudo_attacks(PieceType::BISHOP, s)
                & self.pieces_pp(PieceType::QUEEN, PieceType::BISHOP)))
            & sliders;

        for sniper_sq in snipers {
            let b = between_bb(s, sniper_sq) & self.pieces();

            if b != 0 && !more_than_one(b) {
                blockers |= b;
                if b & self.pieces_c(self.piece_on(s).color()) != 0 {
                    pinners |= sniper_sq;
                }
            }
        }
        (blockers, pinners)
    }

    /// Tests whether a pseudo-legal move leaves the mover's king safe.
    pub fn legal(&self, m: Move) -> bool {
        debug_assert!(m.is_ok());

        let us = self.side_to_move;
        let from = m.from();
        let ksq = self.square(us, PieceType::KING);

        debug_assert!(self.moved_piece(m).color() == us);
        debug_assert!(self.piece_on(ksq) == Piece::make(us, PieceType::KING));

        // En passant captures are a tricky special case. Because they are
        // uncommon, we do it simply by testing whether the king is attacked
        // after the move is made.
        if m.move_type() == MoveType::EnPassant {
            let to = m.to();
            let capsq = to - pawn_push(us);
            let occupied = (self.pieces() ^ from ^ capsq) | to;

            debug_assert!(to == self.ep_square());
            debug_assert!(self.moved_piece(m) == Piece::make(us, PieceType::PAWN));
            debug_assert!(self.piece_on(capsq) == Piece::make(!us, PieceType::PAWN));
            debug_assert!(self.piece_on(to) == Piece::NONE);

            return attacks_bb(PieceType::ROOK, ksq, occupied)
                & self.pieces_cpp(!us, PieceType::QUEEN, PieceType::ROOK)
                == 0
                && attacks_bb(PieceType::BISHOP, ksq, occupied)
                    & self.pieces_cpp(!us, PieceType::QUEEN, PieceType::BISHOP)
                    == 0;
        }

        // If the moving piece is a king, check whether the destination
        // square is attacked by the opponent. The king is lifted from the
        // occupancy so it cannot shield its own destination from a slider.
        // Castling moves are checked for legality during move generation.
        if self.piece_on(from).piece_type() == PieceType::KING {
            return m.move_type() == MoveType::Castling
                || self.attackers_to_occ(m.to(), self.pieces() ^ from) & self.pieces_c(!us) == 0;
        }

        // A non-king move is legal if and only if it is not pinned or it
        // is moving along the ray towards or away from the king.
        self.pinned_pieces(us) & from == 0 || aligned(from, m.to(), ksq)
    }

    // pseudo_legal() takes a random move and tests whether the move is
    // pseudo legal. Moves arriving from outside (protocol text, callers of
    // apply()) go through here before legal().
    pub fn pseudo_legal(&self, m: Move) -> bool {
        if !m.is_ok() {
            return false;
        }

        let us = self.side_to_move();
        let from = m.from();
        let to = m.to();
        let pc = self.moved_piece(m);

        // Use a slower but simpler function for uncommon cases
        if m.move_type() != MoveType::Normal {
            return MoveList::legal(self).contains(m);
        }

        // It is not a promotion, so promotion piece must be empty
        if m.promotion_type() != PieceType::KNIGHT {
            return false;
        }

        // If the 'from' square is not occupied by a piece belonging to the
        // side to move, the move is obviously not legal.
        if pc == Piece::NONE || pc.color() != us {
            return false;
        }

        // The destination square cannot be occupied by a friendly piece
        if self.pieces_c(us) & to != 0 {
            return false;
        }

        // Handle the special case of a pawn move
        if pc.piece_type() == PieceType::PAWN {
            // We have already handled promotion moves, so destination
            // cannot be on the 8th/1st rank.
            if to.rank() == relative_rank(us, RANK_8) {
                return false;
            }

            if self.attacks_from_pawn(from, us) & self.pieces_c(!us) & to == 0
                && !((from + pawn_push(us) == to) && self.empty_square(to))
                && !(from + 2 * pawn_push(us) == to
                    && from.rank() == relative_rank(us, RANK_2)
                    && self.empty_square(to)
                    && self.empty_square(to - pawn_push(us)))
            {
                return false;
            }
        } else if self.attacks_from(pc.piece_type(), from) & to == 0 {
            return false;
        }

        // Evasions generator already takes care of avoiding certain kinds of
        // illegal moves and legal() relies on this. We therefore have to take
        // care that the same kind of moves are filtered out here.
        if self.checkers() != 0 {
            if pc.piece_type() != PieceType::KING {
                // Double check? In this case a king move is required
                if more_than_one(self.checkers()) {
                    return false;
                }

                // Our move must be a blocking evasion or a capture of the
                // checking piece
                if (between_bb(lsb(self.checkers()), self.square(us, PieceType::KING))
                    | self.checkers())
                    & to
                    == 0
                {
                    return false;
                }
            }
            // In case of king moves under check we have to remove king so as
            // to catch invalid moves like b1a1 when opposite queen is on c1.
            else if self.attackers_to_occ(to, self.pieces() ^ from) & self.pieces_c(!us) != 0 {
                return false;
            }
        }

        true
    }

    // gives_check() tests whether a pseudo-legal move gives a check
    pub fn gives_check(&self, m: Move) -> bool {
        debug_assert!(m.is_ok());
        debug_assert!(self.moved_piece(m).color() == self.side_to_move());

        let us = self.side_to_move();
        let from = m.from();
        let to = m.to();
        let ksq = self.square(!us, PieceType::KING);

        // Is there a direct check?
        if self.check_squares(self.piece_on(from).piece_type()) & to != 0 {
            return true;
        }

        // Is there a discovered check?
        if self.blockers_for_king(!us) & self.pieces_c(us) & from != 0 && !aligned(from, to, ksq)
        {
            return true;
        }

        match m.move_type() {
            MoveType::Normal => false,

            MoveType::Promotion => attacks_bb(m.promotion_type(), to, self.pieces() ^ from) & ksq != 0,

            // En passant capture with check? We have already handled the
            // case of direct checks and ordinary discovered check, so the
            // only case we need to handle is the unusual case of a
            // discovered check through the captured pawn.
            MoveType::EnPassant => {
                let capsq = Square::make(to.file(), from.rank());
                let b = (self.pieces() ^ from ^ capsq) | to;

                (attacks_bb(PieceType::ROOK, ksq, b)
                    & self.pieces_cpp(us, PieceType::QUEEN, PieceType::ROOK))
                    | (attacks_bb(PieceType::BISHOP, ksq, b)
                        & self.pieces_cpp(us, PieceType::QUEEN, PieceType::BISHOP))
                    != 0
            }

            MoveType::Castling => {
                let kfrom = from;
                let rfrom = to; // Castling is encoded as king captures rook
                let (kto, rto) = castling_destinations(us, kfrom, rfrom);

                pseudo_attacks(PieceType::ROOK, rto) & ksq != 0
                    && attacks_bb(PieceType::ROOK, rto, (self.pieces() ^ kfrom ^ rfrom) | rto | kto)
                        & ksq
                        != 0
            }
        }
    }

    /// Plays a move after verifying it, or leaves the position untouched and
    /// reports the move as illegal.
    pub fn apply(&mut self, m: Move) -> Result<(), PositionError> {
        if !self.pseudo_legal(m) || !self.legal(m) {
            return Err(PositionError::IllegalMove(format!(
                "{} in {}",
                uci::move_str(m, self.chess960),
                self.fen()
            )));
        }
        self.do_move(m);
        Ok(())
    }

    // do_move() makes a move. The move is assumed to be legal; pseudo-legal
    // moves should be filtered out before this function is called.
    pub(crate) fn do_move(&mut self, m: Move) {
        debug_assert!(m.is_ok());

        // Check info still describes the position before the move.
        let gives_check = self.gives_check(m);
        let mut k = self.key ^ zobrist::side();

        // Increment ply counters. The rule50 field will be reset to zero
        // later on in case of a capture or a pawn move.
        self.game_ply += 1;
        self.rule50 += 1;

        let us = self.side_to_move();
        let them = !us;
        let from = m.from();
        let mut to = m.to();
        let pc = self.piece_on(from);
        let mut captured = if m.move_type() == MoveType::EnPassant {
            Piece::make(them, PieceType::PAWN)
        } else {
            self.piece_on(to)
        };

        debug_assert!(pc.color() == us);
        debug_assert!(
            captured == Piece::NONE
                || captured.color()
                    == if m.move_type() != MoveType::Castling {
                        them
                    } else {
                        us
                    }
        );
        debug_assert!(captured.piece_type() != PieceType::KING);

        if m.move_type() == MoveType::Castling {
            debug_assert!(pc == Piece::make(us, PieceType::KING));
            debug_assert!(captured == Piece::make(us, PieceType::ROOK));

            let (kto, rfrom, rto) = self.do_castling(us, from, to);
            k ^= zobrist::psq(captured, rfrom) ^ zobrist::psq(captured, rto);
            to = kto;
            captured = Piece::NONE;
        }

        if captured != Piece::NONE {
            let mut capsq = to;

            if m.move_type() == MoveType::EnPassant {
                capsq -= pawn_push(us);

                debug_assert!(pc == Piece::make(us, PieceType::PAWN));
                debug_assert!(to == self.ep_square);
                debug_assert!(to.relative_rank(us) == RANK_6);
                debug_assert!(self.piece_on(to) == Piece::NONE);
                debug_assert!(self.piece_on(capsq) == Piece::make(them, PieceType::PAWN));
            }

            self.remove_piece(captured, capsq);
            k ^= zobrist::psq(captured, capsq);

            // Reset rule 50 counter
            self.rule50 = 0;
        }

        k ^= zobrist::psq(pc, from) ^ zobrist::psq(pc, to);

        // Reset en passant square
        if self.ep_square != Square::NONE {
            k ^= zobrist::enpassant(self.ep_square.file());
            self.ep_square = Square::NONE;
        }

        // Update castling rights if needed
        let cr = self.castling_rights_mask[from.0 as usize] | self.castling_rights_mask[to.0 as usize];
        if self.castling_rights != 0 && cr != 0 {
            k ^= zobrist::castling(self.castling_rights);
            self.castling_rights &= !cr;
            k ^= zobrist::castling(self.castling_rights);
        }

        // Move the piece. Castling has already moved both pieces.
        if m.move_type() != MoveType::Castling {
            self.move_piece(pc, from, to);
        }

        // If the moving piece is a pawn do some special extra work
        if pc.piece_type() == PieceType::PAWN {
            // Set en-passant square if the moved pawn can be captured
            if to.0 ^ from.0 == 16
                && self.attacks_from_pawn(to - pawn_push(us), us)
                    & self.pieces_cp(them, PieceType::PAWN)
                    != 0
            {
                self.ep_square = to - pawn_push(us);
                k ^= zobrist::enpassant(self.ep_square.file());
            } else if m.move_type() == MoveType::Promotion {
                let promotion = Piece::make(us, m.promotion_type());

                debug_assert!(to.relative_rank(us) == RANK_8);

                self.remove_piece(pc, to);
                self.put_piece(promotion, to);

                k ^= zobrist::psq(pc, to) ^ zobrist::psq(promotion, to);
            }

            // Reset rule 50 draw counter
            self.rule50 = 0;
        }

        self.captured_piece = captured;
        self.key = k;

        // Checkers of the side about to move, computed while "us" still
        // names the mover.
        self.checkers_bb = if gives_check {
            self.attackers_to(self.square(them, PieceType::KING)) & self.pieces_c(us)
        } else {
            Bitboard(0)
        };

        self.side_to_move = them;

        // Update king attacks used for fast check detection
        self.set_check_info();

        debug_assert!(self.is_ok());
    }

    // do_castling() relocates king and rook. Both are lifted before either
    // is dropped since in Chess960 the origin and destination squares can
    // overlap. Returns the king destination and the rook origin and
    // destination.
    fn do_castling(&mut self, us: Color, kfrom: Square, rfrom: Square) -> (Square, Square, Square) {
        let (kto, rto) = castling_destinations(us, kfrom, rfrom);
        let king = Piece::make(us, PieceType::KING);
        let rook = Piece::make(us, PieceType::ROOK);

        self.remove_piece(king, kfrom);
        self.remove_piece(rook, rfrom);
        self.put_piece(king, kto);
        self.put_piece(rook, rto);

        (kto, rfrom, rto)
    }

    /// Draw by the move rule: the halfmove clock has reached `halfmove_limit`
    /// and the side to move is not checkmated.
    pub fn is_draw(&self, halfmove_limit: u32) -> bool {
        self.rule50 >= halfmove_limit as i32
            && (self.checkers() == 0 || !MoveList::legal(self).is_empty())
    }

    fn put_piece(&mut self, pc: Piece, s: Square) {
        debug_assert!(self.empty_square(s));
        self.board[s.0 as usize] = pc;
        self.by_type_bb[PieceType::ALL_PIECES.0 as usize] |= s;
        self.by_type_bb[pc.piece_type().0 as usize] |= s;
        self.by_color_bb[pc.color().0 as usize] |= s;
        self.index[s.0 as usize] = self.piece_count[pc.0 as usize];
        self.piece_count[pc.0 as usize] += 1;
        self.piece_list[pc.0 as usize][self.index[s.0 as usize] as usize] = s;
        self.piece_count[Piece::make(pc.color(), PieceType::ALL_PIECES).0 as usize] += 1;
    }

    // remove_piece() is not a reversible operation: the last entry of the
    // piece list fills the freed slot, so removing a piece and putting it
    // back does not restore the previous list order.
    fn remove_piece(&mut self, pc: Piece, s: Square) {
        debug_assert!(self.board[s.0 as usize] == pc);
        self.board[s.0 as usize] = Piece::NONE;
        self.by_type_bb[PieceType::ALL_PIECES.0 as usize] ^= s;
        self.by_type_bb[pc.piece_type().0 as usize] ^= s;
        self.by_color_bb[pc.color().0 as usize] ^= s;
        self.piece_count[pc.0 as usize] -= 1;
        let last_square = self.piece_list[pc.0 as usize][self.piece_count[pc.0 as usize] as usize];
        self.index[last_square.0 as usize] = self.index[s.0 as usize];
        self.piece_list[pc.0 as usize][self.index[last_square.0 as usize] as usize] = last_square;
        self.piece_list[pc.0 as usize][self.piece_count[pc.0 as usize] as usize] = Square::NONE;
        self.piece_count[Piece::make(pc.color(), PieceType::ALL_PIECES).0 as usize] -= 1;
    }

    // index[from] is not updated and becomes stale. This works as long as
    // index[] is accessed just by known occupied squares.
    fn move_piece(&mut self, pc: Piece, from: Square, to: Square) {
        debug_assert!(self.board[from.0 as usize] == pc);
        debug_assert!(self.empty_square(to));
        let from_to_bb = from.bb() ^ to.bb();
        self.by_type_bb[PieceType::ALL_PIECES.0 as usize] ^= from_to_bb;
        self.by_type_bb[pc.piece_type().0 as usize] ^= from_to_bb;
        self.by_color_bb[pc.color().0 as usize] ^= from_to_bb;
        self.board[from.0 as usize] = Piece::NONE;
        self.board[to.0 as usize] = pc;
        self.index[to.0 as usize] = self.index[from.0 as usize];
        self.piece_list[pc.0 as usize][self.index[to.0 as usize] as usize] = to;
    }

    /// Cross-checks every redundant view of the position. Meant for tests
    /// and debug assertions, not for the hot path.
    pub fn validate(&self) -> Result<(), Inconsistency> {
        if self.count(Color::WHITE, PieceType::KING) != 1
            || self.count(Color::BLACK, PieceType::KING) != 1
        {
            return Err(Inconsistency::Kings);
        }

        if (self.side_to_move != Color::WHITE && self.side_to_move != Color::BLACK)
            || self.piece_on(self.square(Color::WHITE, PieceType::KING)) != Piece::W_KING
            || self.piece_on(self.square(Color::BLACK, PieceType::KING)) != Piece::B_KING
            || (self.ep_square != Square::NONE
                && self.ep_square.relative_rank(self.side_to_move) != RANK_6)
            || self.pieces_p(PieceType::PAWN) & (RANK1_BB | RANK8_BB) != 0
        {
            return Err(Inconsistency::Default);
        }

        if self.attackers_to(self.square(!self.side_to_move, PieceType::KING))
            & self.pieces_c(self.side_to_move)
            != 0
        {
            return Err(Inconsistency::Kings);
        }

        if self.pieces_c(Color::WHITE) & self.pieces_c(Color::BLACK) != 0
            || self.pieces_c(Color::WHITE) | self.pieces_c(Color::BLACK) != self.pieces()
        {
            return Err(Inconsistency::Bitboards);
        }

        let mut roles = Bitboard(0);
        for (i, &p1) in PieceType::ROLES.iter().enumerate() {
            for &p2 in &PieceType::ROLES[i + 1..] {
                if self.pieces_p(p1) & self.pieces_p(p2) != 0 {
                    return Err(Inconsistency::Bitboards);
                }
            }
            roles |= self.pieces_p(p1);
        }
        if roles != self.pieces() {
            return Err(Inconsistency::Bitboards);
        }

        for s in Square::all() {
            let pc = self.piece_on(s);
            let expected = if pc == Piece::NONE {
                Bitboard(0)
            } else {
                self.pieces_cp(pc.color(), pc.piece_type()) & s
            };
            if self.pieces() & s != expected {
                return Err(Inconsistency::Bitboards);
            }
        }

        if self.attackers_to(self.square(self.side_to_move, PieceType::KING))
            & self.pieces_c(!self.side_to_move)
            != self.checkers_bb
        {
            return Err(Inconsistency::Checkers);
        }

        if self.compute_key() != self.key {
            return Err(Inconsistency::Key);
        }

        for pc in Piece::ALL {
            let n = self.piece_count[pc.0 as usize];
            if n != popcount(self.pieces_cp(pc.color(), pc.piece_type())) as i32 {
                return Err(Inconsistency::Lists);
            }

            for i in 0..n {
                let s = self.piece_list[pc.0 as usize][i as usize];
                if self.board[s.0 as usize] != pc || self.index[s.0 as usize] != i {
                    return Err(Inconsistency::Lists);
                }
            }
        }

        for c in Color::BOTH {
            if self.count_all(c) != popcount(self.pieces_c(c)) as i32 {
                return Err(Inconsistency::Lists);
            }
        }

        for cr in CastlingRight::ALL {
            if !self.has_castling_right(cr) {
                continue;
            }

            let c = if cr & CastlingRight::of(Color::WHITE) != 0 {
                Color::WHITE
            } else {
                Color::BLACK
            };
            let rsq = self.castling_rook_square[cr.0 as usize];

            if !rsq.is_ok()
                || self.piece_on(rsq) != Piece::make(c, PieceType::ROOK)
                || self.castling_rights_mask[rsq.0 as usize] != cr
                || self.castling_rights_mask[self.square(c, PieceType::KING).0 as usize] & cr != cr
            {
                return Err(Inconsistency::Castling);
            }
        }

        Ok(())
    }

    pub fn is_ok(&self) -> bool {
        self.validate().is_ok()
    }
}

// Destination squares of king and rook for a castling move.
pub(crate) fn castling_destinations(us: Color, kfrom: Square, rfrom: Square) -> (Square, Square) {
    let king_side = rfrom > kfrom;
    (
        relative_square(us, if king_side { Square::G1 } else { Square::C1 }),
        relative_square(us, if king_side { Square::F1 } else { Square::D1 }),
    )
}

/// Two positions are equal when pieces, side to move, castling rights and en
/// passant square agree. Move counters are not compared.
impl PartialEq for Position {
    fn eq(&self, other: &Position) -> bool {
        self.key == other.key
            && self.board == other.board
            && self.side_to_move == other.side_to_move
            && self.castling_rights == other.castling_rights
            && self.ep_square == other.ep_square
    }
}

impl Eq for Position {}

impl std::fmt::Debug for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "Position({})", self.fen())
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        writeln!(f, "\n +---+---+---+---+---+---+---+---+")?;
        for r in (0..8).rev() {
            for file in 0..8 {
                write!(f, " | {}", self.piece_on(Square::make(file, r)).to_char())?;
            }
            writeln!(f, " | {}\n +---+---+---+---+---+---+---+---+", r + 1)?;
        }
        writeln!(f, "   a   b   c   d   e   f   g   h\n")?;
        writeln!(f, "Fen: {}", self.fen())?;
        writeln!(f, "Key: {}", self.key())?;
        write!(f, "Checkers: {}", self.checkers())
    }
}
