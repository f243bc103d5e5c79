// SPDX-License-Identifier: GPL-3.0-or-later

use once_cell::sync::Lazy;

use crate::misc::Prng;
use crate::types::{direction::Direction, Color, File, PieceType, Rank, Square};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Bitboard(pub u64);

pub fn popcount(bb: Bitboard) -> u32 {
    bb.0.count_ones()
}

pub const ALL_SQUARES: Bitboard = Bitboard(!0u64);

pub const FILEA_BB: Bitboard = Bitboard(0x0101_0101_0101_0101);
pub const FILEH_BB: Bitboard = Bitboard(0x8080_8080_8080_8080);

pub const RANK1_BB: Bitboard = Bitboard(0xff);
pub const RANK8_BB: Bitboard = Bitboard(0xff00_0000_0000_0000);

impl std::convert::From<Square> for Bitboard {
    fn from(s: Square) -> Self {
        debug_assert!(s.is_ok());
        Bitboard(1u64 << s.0)
    }
}

impl Square {
    pub fn bb(self) -> Bitboard {
        Bitboard::from(self)
    }

    pub fn file_bb(self) -> Bitboard {
        file_bb(self.file())
    }

    pub fn rank_bb(self) -> Bitboard {
        rank_bb(self.rank())
    }
}

impl std::ops::BitOr<Bitboard> for Bitboard {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Bitboard(self.0 | rhs.0)
    }
}

impl std::ops::BitOr<Square> for Bitboard {
    type Output = Bitboard;
    fn bitor(self, rhs: Square) -> Self {
        self | Bitboard::from(rhs)
    }
}

impl std::ops::BitAnd<Bitboard> for Bitboard {
    type Output = Self;
    fn bitand(self, rhs: Self) -> Self {
        Bitboard(self.0 & rhs.0)
    }
}

impl std::ops::BitAnd<Square> for Bitboard {
    type Output = Bitboard;
    fn bitand(self, rhs: Square) -> Self {
        self & Bitboard::from(rhs)
    }
}

impl std::ops::BitXor<Bitboard> for Bitboard {
    type Output = Self;
    fn bitxor(self, rhs: Self) -> Self {
        Bitboard(self.0 ^ rhs.0)
    }
}

impl std::ops::BitXor<Square> for Bitboard {
    type Output = Bitboard;
    fn bitxor(self, rhs: Square) -> Self {
        self ^ Bitboard::from(rhs)
    }
}

impl std::ops::Not for Bitboard {
    type Output = Bitboard;
    fn not(self) -> Self {
        Bitboard(!self.0)
    }
}

impl std::ops::Shl<i32> for Bitboard {
    type Output = Bitboard;
    fn shl(self, rhs: i32) -> Self {
        Bitboard(self.0 << rhs)
    }
}

impl std::ops::Shr<i32> for Bitboard {
    type Output = Bitboard;
    fn shr(self, rhs: i32) -> Self {
        Bitboard(self.0 >> rhs)
    }
}

impl<RHS> std::ops::BitOrAssign<RHS> for Bitboard
where
    Bitboard: std::ops::BitOr<RHS, Output = Bitboard>,
{
    fn bitor_assign(&mut self, rhs: RHS) {
        *self = *self | rhs;
    }
}

impl<RHS> std::ops::BitAndAssign<RHS> for Bitboard
where
    Bitboard: std::ops::BitAnd<RHS, Output = Bitboard>,
{
    fn bitand_assign(&mut self, rhs: RHS) {
        *self = *self & rhs;
    }
}

impl<RHS> std::ops::BitXorAssign<RHS> for Bitboard
where
    Bitboard: std::ops::BitXor<RHS, Output = Bitboard>,
{
    fn bitxor_assign(&mut self, rhs: RHS) {
        *self = *self ^ rhs;
    }
}

impl std::cmp::PartialEq<u64> for Bitboard {
    fn eq(&self, rhs: &u64) -> bool {
        debug_assert!(*rhs == 0);
        self.0 == *rhs
    }
}

impl std::fmt::Display for Bitboard {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> Result<(), std::fmt::Error> {
        for s in *self {
            write!(f, "{s} ")?;
        }
        Ok(())
    }
}

pub fn more_than_one(b: Bitboard) -> bool {
    (b.0 & u64::wrapping_sub(b.0, 1)) != 0
}

pub fn lsb(b: Bitboard) -> Square {
    debug_assert!(b != 0);
    Square(u64::trailing_zeros(b.0))
}

pub fn msb(b: Bitboard) -> Square {
    debug_assert!(b != 0);
    Square(63 ^ u64::leading_zeros(b.0))
}

pub fn pop_lsb(b: &mut Bitboard) -> Square {
    let s = lsb(*b);
    b.0 &= u64::wrapping_sub(b.0, 1);
    s
}

impl IntoIterator for Bitboard {
    type Item = Square;
    type IntoIter = BitboardIntoIter;

    fn into_iter(self) -> Self::IntoIter {
        BitboardIntoIter(self)
    }
}

pub struct BitboardIntoIter(Bitboard);

impl Iterator for BitboardIntoIter {
    type Item = Square;

    fn next(&mut self) -> Option<Self::Item> {
        if self.0 != 0 {
            Some(pop_lsb(&mut self.0))
        } else {
            None
        }
    }
}

// file_bb() and rank_bb() return a bitboard representing all the squares on
// the given file or rank.

pub fn file_bb(f: File) -> Bitboard {
    FILEA_BB << f as i32
}

pub fn rank_bb(r: Rank) -> Bitboard {
    RANK1_BB << (8 * r) as i32
}

// bitboard!(A1, A2, ...) creates a bitboard with squares A1, A2, ...

#[macro_export]
macro_rules! bitboard {
    () => { $crate::bitboard::Bitboard(0) };
    ($sq:ident) => { $crate::bitboard!() | $crate::types::Square::$sq };
    ($sq:ident, $($sqs:ident),+) => { $crate::bitboard!($($sqs),*) | $crate::types::Square::$sq };
}

// shift() moves a bitboard one step along direction D. Mainly for pawns.

impl Bitboard {
    pub fn shift(self, d: Direction) -> Bitboard {
        match d {
            Direction::NORTH => self << 8,
            Direction::SOUTH => self >> 8,
            Direction::EAST => (self & !FILEH_BB) << 1,
            Direction::WEST => (self & !FILEA_BB) >> 1,
            Direction::NORTH_EAST => (self & !FILEH_BB) << 9,
            Direction::SOUTH_EAST => (self & !FILEH_BB) >> 7,
            Direction::NORTH_WEST => (self & !FILEA_BB) << 7,
            Direction::SOUTH_WEST => (self & !FILEA_BB) >> 9,
            _ => Bitboard(0),
        }
    }
}

pub trait Distance {
    fn distance(x: Self, y: Self) -> u32;
}

impl Distance for u32 {
    fn distance(x: Self, y: Self) -> u32 {
        x.abs_diff(y)
    }
}

impl Distance for Square {
    fn distance(x: Self, y: Self) -> u32 {
        std::cmp::max(
            File::distance(x.file(), y.file()),
            Rank::distance(x.rank(), y.rank()),
        )
    }
}

struct Geometry {
    between: [[Bitboard; 64]; 64],
    line: [[Bitboard; 64]; 64],
    pseudo_attacks: [[Bitboard; 64]; 8],
    pawn_attacks: [[Bitboard; 64]; 2],
}

static GEOMETRY: Lazy<Box<Geometry>> = Lazy::new(init_geometry);

struct Magic {
    mask: Bitboard,
    magic: u64,
    shift: u32,
    offset: usize,
}

impl Magic {
    // Compute the attack's index using the 'magic bitboards' approach
    fn index(&self, occupied: Bitboard) -> usize {
        (u64::wrapping_mul((occupied & self.mask).0, self.magic) >> self.shift) as usize
    }
}

struct Magics {
    entries: Vec<Magic>,
    attacks: Vec<Bitboard>,
}

impl Magics {
    fn attacks(&self, s: Square, occupied: Bitboard) -> Bitboard {
        let m = &self.entries[s.0 as usize];
        self.attacks[m.offset + m.index(occupied)]
    }
}

const ROOK_DIRECTIONS: [Direction; 4] = [
    Direction::NORTH,
    Direction::EAST,
    Direction::SOUTH,
    Direction::WEST,
];

const BISHOP_DIRECTIONS: [Direction; 4] = [
    Direction::NORTH_EAST,
    Direction::SOUTH_EAST,
    Direction::SOUTH_WEST,
    Direction::NORTH_WEST,
];

static ROOK_MAGICS: Lazy<Magics> = Lazy::new(|| init_magics(ROOK_DIRECTIONS));
static BISHOP_MAGICS: Lazy<Magics> = Lazy::new(|| init_magics(BISHOP_DIRECTIONS));

// between_bb() returns a bitboard representing all the squares between the
// two given ones. For instance, between_bb(Square::C4, Square::F7) returns
// a bitboard with the bits for squares d5 and e6 set. If s1 and s2 are not
// on the same rank, file or diagonal, an empty bitboard is returned.

pub fn between_bb(s1: Square, s2: Square) -> Bitboard {
    GEOMETRY.between[s1.0 as usize][s2.0 as usize]
}

// line_bb() returns the full edge-to-edge line through both squares, or an
// empty bitboard if they are not aligned.

pub fn line_bb(s1: Square, s2: Square) -> Bitboard {
    GEOMETRY.line[s1.0 as usize][s2.0 as usize]
}

// aligned() returns true if the squares s1, s2 and s3 are aligned either on
// a straight or on a diagonal line.

pub fn aligned(s1: Square, s2: Square, s3: Square) -> bool {
    line_bb(s1, s2) & s3 != 0
}

pub fn pseudo_attacks(pt: PieceType, s: Square) -> Bitboard {
    GEOMETRY.pseudo_attacks[pt.0 as usize][s.0 as usize]
}

pub fn pawn_attacks(c: Color, s: Square) -> Bitboard {
    GEOMETRY.pawn_attacks[c.0 as usize][s.0 as usize]
}

// attacks_bb() returns a bitboard representing all the squares attacked by
// a piece of type pt placed on 's'. Sliders stop at the first occupied square
// on each ray, which is included in the result.

pub fn attacks_bb(pt: PieceType, s: Square, occupied: Bitboard) -> Bitboard {
    debug_assert!(pt != PieceType::PAWN);
    match pt {
        PieceType::BISHOP => BISHOP_MAGICS.attacks(s, occupied),
        PieceType::ROOK => ROOK_MAGICS.attacks(s, occupied),
        PieceType::QUEEN => BISHOP_MAGICS.attacks(s, occupied) | ROOK_MAGICS.attacks(s, occupied),
        _ => pseudo_attacks(pt, s),
    }
}

// init() forces construction of every lookup table. Calling it is optional;
// the tables are built on first use otherwise.
pub fn init() {
    Lazy::force(&ROOK_MAGICS);
    Lazy::force(&BISHOP_MAGICS);
    Lazy::force(&GEOMETRY);
}

fn init_geometry() -> Box<Geometry> {
    let mut g = Box::new(Geometry {
        between: [[Bitboard(0); 64]; 64],
        line: [[Bitboard(0); 64]; 64],
        pseudo_attacks: [[Bitboard(0); 64]; 8],
        pawn_attacks: [[Bitboard(0); 64]; 2],
    });

    for &color in &Color::BOTH {
        for &piece_type in &[PieceType::PAWN, PieceType::KNIGHT, PieceType::KING] {
            for square in Square::all() {
                let steps: &[i32] = match piece_type {
                    PieceType::PAWN => &[7, 9],
                    PieceType::KNIGHT => &[6, 10, 15, 17],
                    _ => &[1, 7, 8, 9],
                };

                for &step in steps {
                    let direction = if color == Color::WHITE {
                        Direction(step)
                    } else {
                        Direction(-step)
                    };

                    let to_square = square + direction;

                    if to_square.is_ok() && Square::distance(square, to_square) < 3 {
                        if piece_type == PieceType::PAWN {
                            g.pawn_attacks[color.0 as usize][square.0 as usize] |= to_square;
                        } else {
                            g.pseudo_attacks[piece_type.0 as usize][square.0 as usize] |=
                                to_square;
                        }
                    }
                }
            }
        }
    }

    for s1 in Square::all() {
        let bishop_attacks = sliding_attack(BISHOP_DIRECTIONS, s1, Bitboard(0));
        let rook_attacks = sliding_attack(ROOK_DIRECTIONS, s1, Bitboard(0));

        g.pseudo_attacks[PieceType::BISHOP.0 as usize][s1.0 as usize] = bishop_attacks;
        g.pseudo_attacks[PieceType::ROOK.0 as usize][s1.0 as usize] = rook_attacks;
        g.pseudo_attacks[PieceType::QUEEN.0 as usize][s1.0 as usize] =
            bishop_attacks | rook_attacks;

        for dirs in [BISHOP_DIRECTIONS, ROOK_DIRECTIONS] {
            let s1_attacks = sliding_attack(dirs, s1, Bitboard(0));

            for s2 in s1_attacks {
                let s2_attacks = sliding_attack(dirs, s2, Bitboard(0));

                g.line[s1.0 as usize][s2.0 as usize] = (s1_attacks & s2_attacks) | s1 | s2;
                g.between[s1.0 as usize][s2.0 as usize] =
                    sliding_attack(dirs, s1, s2.bb()) & sliding_attack(dirs, s2, s1.bb());
            }
        }
    }

    g
}

fn sliding_attack(directions: [Direction; 4], sq: Square, occupied: Bitboard) -> Bitboard {
    let mut attack = Bitboard(0);
    for d in &directions {
        let mut s = sq + *d;
        while s.is_ok() && Square::distance(s, s - *d) == 1 {
            attack |= s;
            if occupied & s != 0 {
                break;
            }
            s += *d;
        }
    }
    attack
}

// init_magics() computes all rook and bishop attacks at startup. Magic
// bitboards are used to look up attacks of sliding pieces. As a reference see
// chessprogramming.org/Magic_Bitboards. In particular, here we use the so
// called "fancy" approach. Magics are found by trial with a seeded PRNG, one
// seed per rank, so the result is deterministic.
fn init_magics(dirs: [Direction; 4]) -> Magics {
    const SEEDS: [u64; 8] = [728, 10316, 55013, 32803, 12281, 15100, 16645, 255];

    let mut entries = Vec::with_capacity(64);
    let mut attacks: Vec<Bitboard> = Vec::new();
    let mut occupancy = vec![Bitboard(0); 4096];
    let mut reference = vec![Bitboard(0); 4096];
    let mut epoch = vec![0u32; 4096];
    let mut cnt = 0u32;

    for s in Square::all() {
        // Board edges are not considered in the relevant occupancies
        let edges = ((RANK1_BB | RANK8_BB) & !s.rank_bb()) | ((FILEA_BB | FILEH_BB) & !s.file_bb());

        let mask = sliding_attack(dirs, s, Bitboard(0)) & !edges;
        let shift = 64 - popcount(mask);
        let offset = attacks.len();

        // Use Carry-Rippler trick to enumerate all subsets of mask and store
        // the corresponding sliding attack bitboard in reference[].
        let mut size = 0;
        let mut b = Bitboard(0);
        loop {
            occupancy[size] = b;
            reference[size] = sliding_attack(dirs, s, b);
            size += 1;
            b = Bitboard(u64::wrapping_sub(b.0, mask.0)) & mask;
            if b == 0 {
                break;
            }
        }

        attacks.resize(offset + size, Bitboard(0));

        let mut rng = Prng::new(SEEDS[s.rank() as usize]);
        let mut entry = Magic {
            mask,
            magic: 0,
            shift,
            offset,
        };

        // Find a magic for square 's' picking up an (almost) random number
        // until we find the one that passes the verification test. The epoch
        // counter avoids clearing the slice between attempts.
        loop {
            entry.magic = loop {
                let candidate = rng.sparse_rand64();
                if (u64::wrapping_mul(candidate, mask.0) >> 56).count_ones() >= 6 {
                    break candidate;
                }
            };

            cnt += 1;
            let mut i = 0;
            while i < size {
                let idx = entry.index(occupancy[i]);
                if epoch[idx] < cnt {
                    epoch[idx] = cnt;
                    attacks[offset + idx] = reference[i];
                } else if attacks[offset + idx] != reference[i] {
                    break;
                }
                i += 1;
            }
            if i == size {
                break;
            }
        }

        entries.push(entry);
    }

    Magics { entries, attacks }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_popcount_and_lsb() {
        let b = bitboard!(A1, C3, H8);
        assert_eq!(popcount(b), 3);
        assert_eq!(lsb(b), Square::A1);
        assert_eq!(msb(b), Square::H8);
        assert!(more_than_one(b));
        assert!(!more_than_one(Square::E4.bb()));
    }

    #[test]
    fn test_iteration_order() {
        let squares: Vec<Square> = bitboard!(H8, A1, E4).into_iter().collect();
        assert_eq!(squares, vec![Square::A1, Square::E4, Square::H8]);
    }

    #[test]
    fn test_shift_does_not_wrap() {
        assert_eq!(Square::H4.bb().shift(Direction::EAST), Bitboard(0));
        assert_eq!(Square::A4.bb().shift(Direction::WEST), Bitboard(0));
        assert_eq!(Square::H4.bb().shift(Direction::NORTH_EAST), Bitboard(0));
        assert_eq!(Square::E4.bb().shift(Direction::NORTH), Square::E5.bb());
    }

    #[test]
    fn test_pawn_attacks() {
        assert_eq!(pawn_attacks(Color::WHITE, Square::E4), bitboard!(D5, F5));
        assert_eq!(pawn_attacks(Color::BLACK, Square::E4), bitboard!(D3, F3));
        assert_eq!(pawn_attacks(Color::WHITE, Square::A2), bitboard!(B3));
        assert_eq!(pawn_attacks(Color::BLACK, Square::H7), bitboard!(G6));
    }

    #[test]
    fn test_stepping_attacks_ignore_occupancy() {
        assert_eq!(popcount(attacks_bb(PieceType::KNIGHT, Square::A1, ALL_SQUARES)), 2);
        assert_eq!(popcount(attacks_bb(PieceType::KNIGHT, Square::D4, ALL_SQUARES)), 8);
        assert_eq!(popcount(attacks_bb(PieceType::KING, Square::H8, ALL_SQUARES)), 3);
        assert_eq!(popcount(attacks_bb(PieceType::KING, Square::E4, Bitboard(0))), 8);
    }

    #[test]
    fn test_rook_stops_at_first_blocker() {
        let occ = bitboard!(A4, D6, D2);
        let a = attacks_bb(PieceType::ROOK, Square::D4, occ);
        assert_eq!(
            a,
            bitboard!(D5, D6, D3, D2, C4, B4, A4, E4, F4, G4, H4)
        );
    }

    #[test]
    fn test_bishop_stops_at_first_blocker() {
        let occ = bitboard!(F6, B2);
        let a = attacks_bb(PieceType::BISHOP, Square::D4, occ);
        assert_eq!(a, bitboard!(E5, F6, C3, B2, C5, B6, A7, E3, F2, G1));
    }

    #[test]
    fn test_magic_lookup_matches_ray_scan() {
        let mut rng = Prng::new(1_070_372);
        for _ in 0..2000 {
            let occ = Bitboard(rng.rand64() & rng.rand64());
            let s = Square((rng.rand64() % 64) as u32);
            assert_eq!(
                attacks_bb(PieceType::ROOK, s, occ),
                sliding_attack(ROOK_DIRECTIONS, s, occ)
            );
            assert_eq!(
                attacks_bb(PieceType::BISHOP, s, occ),
                sliding_attack(BISHOP_DIRECTIONS, s, occ)
            );
        }
    }

    #[test]
    fn test_queen_is_rook_plus_bishop() {
        let occ = bitboard!(C3, E6, G4);
        assert_eq!(
            attacks_bb(PieceType::QUEEN, Square::E4, occ),
            attacks_bb(PieceType::ROOK, Square::E4, occ) | attacks_bb(PieceType::BISHOP, Square::E4, occ)
        );
    }

    #[test]
    fn test_between_and_line() {
        assert_eq!(between_bb(Square::C4, Square::F7), bitboard!(D5, E6));
        assert_eq!(between_bb(Square::A1, Square::A4), bitboard!(A2, A3));
        assert_eq!(between_bb(Square::A1, Square::B3), Bitboard(0));
        assert_eq!(between_bb(Square::E4, Square::E5), Bitboard(0));
        assert_eq!(line_bb(Square::A1, Square::C3), DIAG_A1H8);
        assert_eq!(line_bb(Square::A1, Square::B3), Bitboard(0));
        assert!(aligned(Square::E1, Square::E4, Square::E8));
        assert!(!aligned(Square::E1, Square::E4, Square::D8));
    }

    const DIAG_A1H8: Bitboard = Bitboard(0x8040_2010_0804_0201);

    #[test]
    fn test_distance() {
        assert_eq!(Square::distance(Square::A1, Square::H8), 7);
        assert_eq!(Square::distance(Square::E4, Square::F6), 2);
        assert_eq!(Square::distance(Square::E4, Square::E4), 0);
    }
}
