// SPDX-License-Identifier: GPL-3.0-or-later

use super::Position;
use crate::bitboard::pawn_attacks;
use crate::error::{FenField, PositionError};
use crate::types::{
    direction::pawn_push, relative_rank, CastlingRight, Color, Piece, PieceType, Square, FILE_A,
    FILE_H, RANK_1, RANK_6, RANK_8,
};

pub const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

impl Position {
    /// Decodes a standard FEN string.
    pub fn from_fen(fen: &str) -> Result<Position, PositionError> {
        Position::from_fen_960(fen, false)
    }

    /// Decodes a FEN string. Castling availability may use the files of the
    /// castling rooks (Shredder-FEN) as well as `KQkq`; with `chess960` set
    /// the encoder writes files back.
    ///
    /// Piece placement and side to move are required. Castling, en passant
    /// and the two clocks default to `-`, `-`, `0` and `1` when absent. An en
    /// passant square is kept only if a pawn of the side to move can actually
    /// capture there.
    pub fn from_fen_960(fen: &str, chess960: bool) -> Result<Position, PositionError> {
        let mut pos = Position::empty();
        let mut fields = fen.split_whitespace();

        // 1. Piece placement
        let board = fields
            .next()
            .ok_or_else(|| PositionError::notation(FenField::Board, "empty string"))?;
        pos.parse_board(board)?;

        for c in Color::BOTH {
            if pos.count(c, PieceType::KING) != 1 {
                return Err(PositionError::notation(
                    FenField::Board,
                    format!("{c} must have exactly one king"),
                ));
            }
        }

        // 2. Active color
        pos.side_to_move = match fields.next() {
            Some("w") => Color::WHITE,
            Some("b") => Color::BLACK,
            Some(other) => {
                return Err(PositionError::notation(
                    FenField::SideToMove,
                    format!("expected 'w' or 'b', found {other:?}"),
                ))
            }
            None => return Err(PositionError::notation(FenField::SideToMove, "missing")),
        };

        // 3. Castling availability
        if let Some(castling) = fields.next() {
            pos.parse_castling(castling)?;
        }

        // 4. En passant square
        if let Some(ep) = fields.next() {
            pos.parse_en_passant(ep)?;
        }

        // 5-6. Halfmove clock and fullmove number
        if let Some(rule50) = fields.next() {
            pos.rule50 = rule50.parse::<u16>().map_err(|_| {
                PositionError::notation(FenField::HalfmoveClock, format!("{rule50:?} is not a count"))
            })? as i32;
        }

        let mut fullmove = 1;
        if let Some(n) = fields.next() {
            fullmove = n.parse::<u16>().map_err(|_| {
                PositionError::notation(FenField::FullmoveNumber, format!("{n:?} is not a count"))
            })? as i32;
        }

        // Convert from fullmove starting from 1 to game_ply starting from 0,
        // handle also common incorrect FEN with fullmove = 0.
        pos.game_ply = std::cmp::max(2 * (fullmove - 1), 0)
            + if pos.side_to_move == Color::BLACK { 1 } else { 0 };

        pos.chess960 = chess960;
        pos.set_state();
        pos.validate()?;

        Ok(pos)
    }

    /// Replaces the position with the one described by `fen`. On error the
    /// position is left unchanged.
    pub fn set(&mut self, fen: &str, chess960: bool) -> Result<(), PositionError> {
        *self = Position::from_fen_960(fen, chess960)?;
        Ok(())
    }

    fn parse_board(&mut self, board: &str) -> Result<(), PositionError> {
        let ranks: Vec<&str> = board.split('/').collect();
        if ranks.len() != 8 {
            return Err(PositionError::notation(
                FenField::Board,
                format!("expected 8 ranks, found {}", ranks.len()),
            ));
        }

        for (i, text) in ranks.iter().enumerate() {
            let r = RANK_8 - i as u32;
            let mut f = FILE_A;

            for ch in text.chars() {
                if let Some(skip) = ch.to_digit(10) {
                    if skip == 0 || skip > 8 {
                        return Err(PositionError::notation(
                            FenField::Board,
                            format!("bad empty-square count '{ch}'"),
                        ));
                    }
                    f += skip;
                } else if let Some(pc) = Piece::from_char(ch) {
                    if f > FILE_H {
                        return Err(PositionError::notation(
                            FenField::Board,
                            format!("rank {} has more than 8 files", r + 1),
                        ));
                    }
                    if pc.piece_type() == PieceType::PAWN && (r == RANK_1 || r == RANK_8) {
                        return Err(PositionError::notation(
                            FenField::Board,
                            "pawn on the first or last rank",
                        ));
                    }
                    if self.piece_count[pc.0 as usize] >= 16 {
                        return Err(PositionError::notation(
                            FenField::Board,
                            format!("too many '{ch}'"),
                        ));
                    }
                    self.put_piece(pc, Square::make(f, r));
                    f += 1;
                } else {
                    return Err(PositionError::notation(
                        FenField::Board,
                        format!("unexpected character '{ch}'"),
                    ));
                }
            }

            if f != FILE_H + 1 {
                return Err(PositionError::notation(
                    FenField::Board,
                    format!("rank {} does not describe 8 files", r + 1),
                ));
            }
        }

        Ok(())
    }

    // Castling rights are given with 'K'/'Q' (outermost rook on that side of
    // the king) or with the rook's file letter for Chess960.
    fn parse_castling(&mut self, castling: &str) -> Result<(), PositionError> {
        if castling == "-" {
            return Ok(());
        }

        for token in castling.chars() {
            let c = if token.is_ascii_uppercase() {
                Color::WHITE
            } else {
                Color::BLACK
            };
            let rook = Piece::make(c, PieceType::ROOK);
            let ksq = self.square(c, PieceType::KING);

            if ksq.relative_rank(c) != RANK_1 {
                return Err(PositionError::notation(
                    FenField::Castling,
                    format!("'{token}' given but the {c} king is not on its back rank"),
                ));
            }

            let back_rank = relative_rank(c, RANK_1);
            let rsq = match token.to_ascii_uppercase() {
                'K' => (ksq.file() + 1..=FILE_H)
                    .rev()
                    .map(|f| Square::make(f, back_rank))
                    .find(|&s| self.piece_on(s) == rook),
                'Q' => (FILE_A..ksq.file())
                    .map(|f| Square::make(f, back_rank))
                    .find(|&s| self.piece_on(s) == rook),
                'A'..='H' => {
                    let s = Square::make(token.to_ascii_uppercase() as u32 - 'A' as u32, back_rank);
                    (self.piece_on(s) == rook && s != ksq).then_some(s)
                }
                _ => {
                    return Err(PositionError::notation(
                        FenField::Castling,
                        format!("unexpected character '{token}'"),
                    ))
                }
            };

            let rsq = rsq.ok_or_else(|| {
                PositionError::notation(FenField::Castling, format!("no rook for '{token}'"))
            })?;
            self.set_castling_right(c, rsq);
        }

        Ok(())
    }

    fn parse_en_passant(&mut self, ep: &str) -> Result<(), PositionError> {
        if ep == "-" {
            return Ok(());
        }

        let bytes = ep.as_bytes();
        if bytes.len() != 2
            || !(b'a'..=b'h').contains(&bytes[0])
            || !(b'1'..=b'8').contains(&bytes[1])
        {
            return Err(PositionError::notation(
                FenField::EnPassant,
                format!("{ep:?} is not a square"),
            ));
        }

        let us = self.side_to_move;
        let s = Square::make((bytes[0] - b'a') as u32, (bytes[1] - b'1') as u32);
        if s.relative_rank(us) != RANK_6 {
            return Err(PositionError::notation(
                FenField::EnPassant,
                format!("{ep} is not on the sixth rank of the side to move"),
            ));
        }

        // Keep the square only if a pawn can capture there: an enemy pawn
        // stands in front of it, the square and the one behind are empty, and
        // one of our pawns attacks it.
        if pawn_attacks(!us, s) & self.pieces_cp(us, PieceType::PAWN) != 0
            && self.piece_on(s - pawn_push(us)) == Piece::make(!us, PieceType::PAWN)
            && self.empty_square(s)
            && self.empty_square(s + pawn_push(us))
        {
            self.ep_square = s;
        }

        Ok(())
    }

    /// Encodes the position as FEN. With Chess960 enabled castling rights are
    /// written as rook files.
    pub fn fen(&self) -> String {
        let mut ss = String::new();

        for r in (RANK_1..=RANK_8).rev() {
            let mut f = FILE_A;
            while f <= FILE_H {
                let mut empty_cnt = 0;
                while f <= FILE_H && self.empty_square(Square::make(f, r)) {
                    empty_cnt += 1;
                    f += 1;
                }
                if empty_cnt > 0 {
                    ss.push_str(&empty_cnt.to_string());
                }
                if f <= FILE_H {
                    ss.push(self.piece_on(Square::make(f, r)).to_char());
                    f += 1;
                }
            }
            if r > RANK_1 {
                ss.push('/');
            }
        }

        ss.push(' ');
        ss.push(self.side_to_move.to_char());
        ss.push(' ');

        for (cr, letter) in [
            (CastlingRight::WHITE_OO, 'K'),
            (CastlingRight::WHITE_OOO, 'Q'),
            (CastlingRight::BLACK_OO, 'k'),
            (CastlingRight::BLACK_OOO, 'q'),
        ] {
            if self.has_castling_right(cr) {
                ss.push(if self.chess960 {
                    self.castling_file_char(cr)
                } else {
                    letter
                });
            }
        }

        if !self.can_castle(Color::WHITE) && !self.can_castle(Color::BLACK) {
            ss.push('-');
        }

        ss.push_str(&format!(
            " {} {} {}",
            self.ep_square,
            self.rule50,
            1 + self.game_ply / 2
        ));

        ss
    }

    fn castling_file_char(&self, cr: CastlingRight) -> char {
        let rsq = self.castling_rook_square(cr);
        let letter = char::from(b'A' + rsq.file() as u8);
        if cr & CastlingRight::of(Color::BLACK) != 0 {
            letter.to_ascii_lowercase()
        } else {
            letter
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Inconsistency;

    fn field_of(err: PositionError) -> FenField {
        match err {
            PositionError::InvalidNotation { field, .. } => field,
            other => panic!("expected a notation error, got {other:?}"),
        }
    }

    #[test]
    fn start_position_round_trip() {
        let pos = Position::from_fen(START_FEN).unwrap();
        assert_eq!(pos.fen(), START_FEN);
        assert_eq!(pos.side_to_move(), Color::WHITE);
        assert!(pos.has_castling_right(CastlingRight::WHITE_OO));
        assert_eq!(pos.castling_rook_square(CastlingRight::BLACK_OOO), Square::A8);
    }

    #[test]
    fn round_trips() {
        for fen in [
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
            "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
            "r2q1rk1/pP1p2pp/Q4n2/bbp1p3/Np6/1B3NBn/pPPP1PPP/R3K2R b KQ - 0 1",
            "rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 1 8",
            "4k3/8/8/8/8/8/8/4K2R w K - 99 150",
            "rnbqkbnr/ppp1p1pp/8/3pPp2/8/8/PPPP1PPP/RNBQKBNR w KQkq f6 0 3",
        ] {
            assert_eq!(Position::from_fen(fen).unwrap().fen(), fen);
        }
    }

    #[test]
    fn trailing_fields_default() {
        let pos = Position::from_fen("4k3/8/8/8/8/8/8/4K3 b").unwrap();
        assert_eq!(pos.fen(), "4k3/8/8/8/8/8/8/4K3 b - - 0 1");
        assert_eq!(pos.game_ply(), 1);
    }

    #[test]
    fn fullmove_zero_is_tolerated() {
        let pos = Position::from_fen("4k3/8/8/8/8/8/8/4K3 w - - 0 0").unwrap();
        assert_eq!(pos.fullmove_number(), 1);
    }

    #[test]
    fn uncapturable_en_passant_square_is_dropped() {
        let pos =
            Position::from_fen("rnbqkbnr/pppp1ppp/8/4p3/8/8/PPPPPPPP/RNBQKBNR w KQkq e6 0 2")
                .unwrap();
        assert_eq!(pos.ep_square(), Square::NONE);
        assert!(pos.fen().contains(" - 0 2"));
    }

    #[test]
    fn en_passant_must_be_on_sixth_rank() {
        let err = Position::from_fen("4k3/8/8/8/3pP3/8/8/4K3 w - e3 0 1").unwrap_err();
        assert_eq!(field_of(err), FenField::EnPassant);
        let err = Position::from_fen("4k3/8/8/8/8/8/8/4K3 w - z9 0 1").unwrap_err();
        assert_eq!(field_of(err), FenField::EnPassant);
    }

    #[test]
    fn rejects_malformed_board() {
        for fen in [
            "",
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP w KQkq - 0 1",
            "rnbqkbnr/pppppppp/9/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
            "rnbqkbnr/ppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNRR w KQkq - 0 1",
            "rnbqkbnr/pppppppp/8/8/4X3/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQQBNR w kq - 0 1",
            "P3k3/8/8/8/8/8/8/4K3 w - - 0 1",
        ] {
            assert_eq!(field_of(Position::from_fen(fen).unwrap_err()), FenField::Board, "{fen}");
        }
    }

    #[test]
    fn rejects_bad_side_and_clocks() {
        let err = Position::from_fen("4k3/8/8/8/8/8/8/4K3").unwrap_err();
        assert_eq!(field_of(err), FenField::SideToMove);
        let err = Position::from_fen("4k3/8/8/8/8/8/8/4K3 x").unwrap_err();
        assert_eq!(field_of(err), FenField::SideToMove);
        let err = Position::from_fen("4k3/8/8/8/8/8/8/4K3 w - - x 1").unwrap_err();
        assert_eq!(field_of(err), FenField::HalfmoveClock);
        let err = Position::from_fen("4k3/8/8/8/8/8/8/4K3 w - - 0 -3").unwrap_err();
        assert_eq!(field_of(err), FenField::FullmoveNumber);
    }

    #[test]
    fn rejects_castling_without_rook() {
        let err = Position::from_fen("4k3/8/8/8/8/8/8/4K3 w K - 0 1").unwrap_err();
        assert_eq!(field_of(err), FenField::Castling);
        let err = Position::from_fen("4k3/8/8/8/8/8/8/R3K3 w Kx - 0 1").unwrap_err();
        assert_eq!(field_of(err), FenField::Castling);
    }

    #[test]
    fn side_not_to_move_in_check_is_inconsistent() {
        assert!(Position::from_fen("4k3/8/8/8/8/8/8/4KR2 w - - 0 1").is_ok());
        let err = Position::from_fen("4k3/4R3/8/8/8/8/8/4K3 w - - 0 1").unwrap_err();
        assert_eq!(err, PositionError::Inconsistent(Inconsistency::Kings));
    }

    #[test]
    fn shredder_castling_letters() {
        let fen = "1r2k1r1/8/8/8/8/8/8/1R2K1R1 w GBgb - 0 1";
        let pos = Position::from_fen_960(fen, true).unwrap();
        assert_eq!(pos.castling_rook_square(CastlingRight::WHITE_OO), Square::G1);
        assert_eq!(pos.castling_rook_square(CastlingRight::WHITE_OOO), Square::B1);
        assert_eq!(pos.castling_rook_square(CastlingRight::BLACK_OOO), Square::B8);
        assert_eq!(pos.fen(), fen);

        // The same rights read from KQkq pick the outermost rooks.
        let pos = Position::from_fen_960("1r2k1r1/8/8/8/8/8/8/1R2K1R1 w KQkq - 0 1", true).unwrap();
        assert_eq!(pos.fen(), fen);
        let standard = Position::from_fen("1r2k1r1/8/8/8/8/8/8/1R2K1R1 w GBgb - 0 1").unwrap();
        assert_eq!(standard.fen(), "1r2k1r1/8/8/8/8/8/8/1R2K1R1 w KQkq - 0 1");
    }

    #[test]
    fn set_leaves_position_unchanged_on_error() {
        let mut pos = Position::startpos();
        assert!(pos.set("not a fen", false).is_err());
        assert_eq!(pos.fen(), START_FEN);
        pos.set("4k3/8/8/8/8/8/8/4K3 w - - 0 1", false).unwrap();
        assert_eq!(pos.count_all(Color::WHITE), 1);
    }
}
