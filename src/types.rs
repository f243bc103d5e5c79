// SPDX-License-Identifier: GPL-3.0-or-later

use direction::Direction;
pub mod direction;
pub mod key;

pub const MAX_MOVES: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color(pub u32);

impl Color {
    pub const WHITE: Color = Color(0);
    pub const BLACK: Color = Color(1);

    pub const BOTH: [Color; 2] = [Color::WHITE, Color::BLACK];

    pub fn to_char(self) -> char {
        match self {
            Color::WHITE => 'w',
            _ => 'b',
        }
    }
}

impl std::ops::Not for Color {
    type Output = Color;
    fn not(self) -> Self {
        Color(self.0 ^ 1)
    }
}

impl std::ops::BitXor<bool> for Color {
    type Output = Self;
    fn bitxor(self, rhs: bool) -> Self {
        Color(self.0 ^ u32::from(rhs))
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match *self {
            Color::WHITE => write!(f, "white"),
            _ => write!(f, "black"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastlingSide {
    King,
    Queen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CastlingRight(pub u32);

impl CastlingRight {
    pub const NONE: CastlingRight = CastlingRight(0);
    pub const WHITE_OO: CastlingRight = CastlingRight(1);
    pub const WHITE_OOO: CastlingRight = CastlingRight(2);
    pub const BLACK_OO: CastlingRight = CastlingRight(4);
    pub const BLACK_OOO: CastlingRight = CastlingRight(8);
    pub const ANY: CastlingRight = CastlingRight(15);

    pub const ALL: [CastlingRight; 4] = [
        CastlingRight::WHITE_OO,
        CastlingRight::WHITE_OOO,
        CastlingRight::BLACK_OO,
        CastlingRight::BLACK_OOO,
    ];

    pub fn make(c: Color, cs: CastlingSide) -> CastlingRight {
        c | cs
    }

    // Rights of a single color, both sides.
    pub fn of(c: Color) -> CastlingRight {
        CastlingRight(3 << (2 * c.0))
    }

    pub fn side(self) -> CastlingSide {
        debug_assert!(self.0.count_ones() == 1);
        if self.0 & 0b0101 != 0 {
            CastlingSide::King
        } else {
            CastlingSide::Queen
        }
    }
}

impl std::ops::BitOr<CastlingSide> for Color {
    type Output = CastlingRight;
    fn bitor(self, rhs: CastlingSide) -> CastlingRight {
        CastlingRight(1u32 << ((rhs as u32) + 2 * self.0))
    }
}

impl std::ops::BitAnd<CastlingRight> for CastlingRight {
    type Output = Self;
    fn bitand(self, rhs: Self) -> Self {
        CastlingRight(self.0 & rhs.0)
    }
}

impl std::ops::BitOr<CastlingRight> for CastlingRight {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        CastlingRight(self.0 | rhs.0)
    }
}

impl std::ops::BitAndAssign<CastlingRight> for CastlingRight {
    fn bitand_assign(&mut self, rhs: Self) {
        *self = *self & rhs;
    }
}

impl std::ops::BitOrAssign<CastlingRight> for CastlingRight {
    fn bitor_assign(&mut self, rhs: Self) {
        *self = *self | rhs;
    }
}

impl std::ops::Not for CastlingRight {
    type Output = CastlingRight;
    fn not(self) -> Self {
        CastlingRight(!self.0 & CastlingRight::ANY.0)
    }
}

impl std::cmp::PartialEq<u32> for CastlingRight {
    fn eq(&self, rhs: &u32) -> bool {
        debug_assert!(*rhs == 0);
        self.0 == *rhs
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PieceType(pub u32);

impl PieceType {
    pub const NONE: PieceType = PieceType(0);
    pub const ALL_PIECES: PieceType = PieceType(0);

    pub const PAWN: PieceType = PieceType(1);
    pub const KNIGHT: PieceType = PieceType(2);
    pub const BISHOP: PieceType = PieceType(3);
    pub const ROOK: PieceType = PieceType(4);
    pub const QUEEN: PieceType = PieceType(5);
    pub const KING: PieceType = PieceType(6);

    pub const ROLES: [PieceType; 6] = [
        PieceType::PAWN,
        PieceType::KNIGHT,
        PieceType::BISHOP,
        PieceType::ROOK,
        PieceType::QUEEN,
        PieceType::KING,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Piece(pub u32);

impl Piece {
    pub const NONE: Piece = Piece(0);

    pub const W_PAWN: Piece = Piece(1);
    pub const W_KNIGHT: Piece = Piece(2);
    pub const W_BISHOP: Piece = Piece(3);
    pub const W_ROOK: Piece = Piece(4);
    pub const W_QUEEN: Piece = Piece(5);
    pub const W_KING: Piece = Piece(6);

    pub const B_PAWN: Piece = Piece(9);
    pub const B_KNIGHT: Piece = Piece(10);
    pub const B_BISHOP: Piece = Piece(11);
    pub const B_ROOK: Piece = Piece(12);
    pub const B_QUEEN: Piece = Piece(13);
    pub const B_KING: Piece = Piece(14);

    pub const ALL: [Piece; 12] = [
        Piece::W_PAWN,
        Piece::W_KNIGHT,
        Piece::W_BISHOP,
        Piece::W_ROOK,
        Piece::W_QUEEN,
        Piece::W_KING,
        Piece::B_PAWN,
        Piece::B_KNIGHT,
        Piece::B_BISHOP,
        Piece::B_ROOK,
        Piece::B_QUEEN,
        Piece::B_KING,
    ];

    // Indexed by the piece value; blanks fill the unused codes.
    pub const TO_CHAR: &'static str = " PNBRQK  pnbrqk";

    pub fn piece_type(self) -> PieceType {
        PieceType(self.0 & 7)
    }

    pub fn color(self) -> Color {
        Color(self.0 >> 3)
    }

    pub fn make(c: Color, pt: PieceType) -> Piece {
        Piece((c.0 << 3) + pt.0)
    }

    pub fn to_char(self) -> char {
        Piece::TO_CHAR.as_bytes()[self.0 as usize] as char
    }

    pub fn from_char(ch: char) -> Option<Piece> {
        if ch == ' ' {
            return None;
        }
        Piece::TO_CHAR.find(ch).map(|idx| Piece(idx as u32))
    }
}

impl std::ops::Not for Piece {
    type Output = Self;
    fn not(self) -> Self {
        Piece(self.0 ^ 8)
    }
}

pub type File = u32;
pub type Rank = u32;

pub const FILE_A: File = 0;
pub const FILE_B: File = 1;
pub const FILE_C: File = 2;
pub const FILE_D: File = 3;
pub const FILE_E: File = 4;
pub const FILE_F: File = 5;
pub const FILE_G: File = 6;
pub const FILE_H: File = 7;

pub const RANK_1: Rank = 0;
pub const RANK_2: Rank = 1;
pub const RANK_3: Rank = 2;
pub const RANK_4: Rank = 3;
pub const RANK_5: Rank = 4;
pub const RANK_6: Rank = 5;
pub const RANK_7: Rank = 6;
pub const RANK_8: Rank = 7;

pub fn relative_rank(c: Color, r: Rank) -> Rank {
    r ^ (c.0 * 7)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Square(pub u32);

impl Square {
    pub const A1: Square = Square(0);
    pub const B1: Square = Square(1);
    pub const C1: Square = Square(2);
    pub const D1: Square = Square(3);
    pub const E1: Square = Square(4);
    pub const F1: Square = Square(5);
    pub const G1: Square = Square(6);
    pub const H1: Square = Square(7);
    pub const A2: Square = Square(8);
    pub const B2: Square = Square(9);
    pub const C2: Square = Square(10);
    pub const D2: Square = Square(11);
    pub const E2: Square = Square(12);
    pub const F2: Square = Square(13);
    pub const G2: Square = Square(14);
    pub const H2: Square = Square(15);
    pub const A3: Square = Square(16);
    pub const B3: Square = Square(17);
    pub const C3: Square = Square(18);
    pub const D3: Square = Square(19);
    pub const E3: Square = Square(20);
    pub const F3: Square = Square(21);
    pub const G3: Square = Square(22);
    pub const H3: Square = Square(23);
    pub const A4: Square = Square(24);
    pub const B4: Square = Square(25);
    pub const C4: Square = Square(26);
    pub const D4: Square = Square(27);
    pub const E4: Square = Square(28);
    pub const F4: Square = Square(29);
    pub const G4: Square = Square(30);
    pub const H4: Square = Square(31);
    pub const A5: Square = Square(32);
    pub const B5: Square = Square(33);
    pub const C5: Square = Square(34);
    pub const D5: Square = Square(35);
    pub const E5: Square = Square(36);
    pub const F5: Square = Square(37);
    pub const G5: Square = Square(38);
    pub const H5: Square = Square(39);
    pub const A6: Square = Square(40);
    pub const B6: Square = Square(41);
    pub const C6: Square = Square(42);
    pub const D6: Square = Square(43);
    pub const E6: Square = Square(44);
    pub const F6: Square = Square(45);
    pub const G6: Square = Square(46);
    pub const H6: Square = Square(47);
    pub const A7: Square = Square(48);
    pub const B7: Square = Square(49);
    pub const C7: Square = Square(50);
    pub const D7: Square = Square(51);
    pub const E7: Square = Square(52);
    pub const F7: Square = Square(53);
    pub const G7: Square = Square(54);
    pub const H7: Square = Square(55);
    pub const A8: Square = Square(56);
    pub const B8: Square = Square(57);
    pub const C8: Square = Square(58);
    pub const D8: Square = Square(59);
    pub const E8: Square = Square(60);
    pub const F8: Square = Square(61);
    pub const G8: Square = Square(62);
    pub const H8: Square = Square(63);

    pub const NONE: Square = Square(64);

    pub fn file(self) -> File {
        self.0 & 7
    }

    pub fn rank(self) -> Rank {
        self.0 >> 3
    }

    pub fn relative(self, c: Color) -> Self {
        Square(self.0 ^ (c.0 * 56))
    }

    pub fn relative_rank(self, c: Color) -> Rank {
        relative_rank(c, self.rank())
    }

    pub fn is_ok(self) -> bool {
        self >= Square::A1 && self <= Square::H8
    }

    pub fn make(f: File, r: Rank) -> Square {
        Square((r << 3) | f)
    }

    pub fn all() -> Squares {
        Squares {
            start: Square::A1,
            end: Square::NONE,
        }
    }
}

pub fn relative_square(c: Color, s: Square) -> Square {
    s.relative(c)
}

impl std::ops::Not for Square {
    type Output = Self;
    fn not(self) -> Self {
        Square(self.0 ^ Square::A8.0)
    }
}

impl std::fmt::Display for Square {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        if *self == Square::NONE {
            return write!(f, "-");
        }
        write!(
            f,
            "{}{}",
            char::from(b'a' + self.file() as u8),
            char::from(b'1' + self.rank() as u8)
        )
    }
}

#[derive(Clone, Copy)]
pub struct Squares {
    pub start: Square,
    pub end: Square,
}

impl IntoIterator for Squares {
    type Item = Square;
    type IntoIter = SquaresIntoIterator;

    fn into_iter(self) -> Self::IntoIter {
        SquaresIntoIterator {
            current: self.start,
            end: self.end,
        }
    }
}

pub struct SquaresIntoIterator {
    current: Square,
    end: Square,
}

impl Iterator for SquaresIntoIterator {
    type Item = Square;

    fn next(&mut self) -> Option<Self::Item> {
        let s = self.current;
        if s == self.end {
            return None;
        }
        self.current += Direction::EAST;
        Some(s)
    }
}

pub struct SquareList<'a> {
    list: &'a [Square],
    idx: usize,
}

impl<'a> SquareList<'a> {
    pub fn construct(list: &'a [Square]) -> SquareList<'a> {
        SquareList { list, idx: 0 }
    }
}

impl Iterator for SquareList<'_> {
    type Item = Square;
    fn next(&mut self) -> Option<Self::Item> {
        match self.list.get(self.idx) {
            Some(&s) if s != Square::NONE => {
                self.idx += 1;
                Some(s)
            }
            _ => None,
        }
    }
}

/// The four move categories. Castling is encoded as "king captures own rook"
/// so the destination of a castling move is the rook's origin square.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveType {
    Normal,
    Promotion,
    EnPassant,
    Castling,
}

impl MoveType {
    fn bits(self) -> u32 {
        (self as u32) << 14
    }
}

/// A move packed into 16 bits: destination (0-5), origin (6-11), promotion
/// role minus knight (12-13), category (14-15).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Move(pub u32);

impl Move {
    pub const NONE: Move = Move(0);

    pub fn from(self) -> Square {
        Square((self.0 >> 6) & 0x3f)
    }

    pub fn to(self) -> Square {
        Square(self.0 & 0x3f)
    }

    pub fn move_type(self) -> MoveType {
        match (self.0 >> 14) & 3 {
            0 => MoveType::Normal,
            1 => MoveType::Promotion,
            2 => MoveType::EnPassant,
            _ => MoveType::Castling,
        }
    }

    pub fn promotion_type(self) -> PieceType {
        PieceType(((self.0 >> 12) & 3) + PieceType::KNIGHT.0)
    }

    pub fn is_ok(self) -> bool {
        self.from() != self.to()
    }

    pub fn make(from: Square, to: Square) -> Move {
        Move((from.0 << 6) + to.0)
    }

    pub fn make_prom(from: Square, to: Square, pt: PieceType) -> Move {
        debug_assert!(pt >= PieceType::KNIGHT && pt <= PieceType::QUEEN);
        Move(MoveType::Promotion.bits() + ((pt.0 - PieceType::KNIGHT.0) << 12) + (from.0 << 6) + to.0)
    }

    pub fn make_special(mt: MoveType, from: Square, to: Square) -> Move {
        Move(mt.bits() + (from.0 << 6) + to.0)
    }
}
