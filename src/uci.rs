// SPDX-License-Identifier: GPL-3.0-or-later

use crate::bitboard::Distance;
use crate::error::UciError;
use crate::movegen::MoveList;
use crate::position::{Position, START_FEN};
use crate::tree::{NodeId, Tree};
use crate::types::{relative_square, Color, Move, MoveType, Piece, Square, RANK_1};

/// Square in coordinate notation ("e4").
pub fn square(s: Square) -> String {
    s.to_string()
}

// move_str() converts a Move to a string in coordinate notation (g1f3, a7a8q).
// The only special case is castling, where we print in the e1g1 notation in
// normal chess mode, and in e1h1 notation in chess960 mode. Internally all
// castling moves are always encoded as 'king captures rook'. When the king
// would travel less than two files, e1g1 style text could be read as a plain
// king step, so king-takes-rook is printed in that case too.
pub fn move_str(m: Move, chess960: bool) -> String {
    if m == Move::NONE {
        return "0000".to_string();
    }

    let from = m.from();
    let mut to = m.to();

    if m.move_type() == MoveType::Castling && !chess960 {
        let us = if from.rank() == RANK_1 {
            Color::WHITE
        } else {
            Color::BLACK
        };
        let kto = relative_square(us, if to > from { Square::G1 } else { Square::C1 });
        if Square::distance(from, kto) == 2 {
            to = kto;
        }
    }

    let mut s = format!("{from}{to}");
    if m.move_type() == MoveType::Promotion {
        s.push(Piece::make(Color::BLACK, m.promotion_type()).to_char());
    }
    s
}

// to_move() converts a string representing a move in coordinate notation
// (g1f3, a7a8q) to the corresponding legal Move, if any.
pub fn to_move(pos: &Position, text: &str) -> Result<Move, UciError> {
    let bytes = text.as_bytes();
    let well_formed = (bytes.len() == 4 || bytes.len() == 5)
        && (b'a'..=b'h').contains(&bytes[0])
        && (b'1'..=b'8').contains(&bytes[1])
        && (b'a'..=b'h').contains(&bytes[2])
        && (b'1'..=b'8').contains(&bytes[3])
        && (bytes.len() == 4 || b"nbrqNBRQ".contains(&bytes[4]));

    if !well_formed {
        return Err(UciError::BadMoveText(text.to_string()));
    }

    // Promotion letters may arrive in upper case
    let text = text.to_ascii_lowercase();

    MoveList::legal(pos)
        .iter()
        .copied()
        .find(|&m| move_str(m, pos.is_chess960()) == text)
        .ok_or(UciError::UnknownMove(text))
}

/// A parsed `position` command: the starting FEN and the moves played from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionCommand {
    pub fen: String,
    pub moves: Vec<String>,
}

impl PositionCommand {
    /// Decodes the starting FEN and plays the moves, recording every
    /// position along the way in a fresh tree. Returns the tree and the node
    /// of the final position.
    pub fn build_tree(&self, chess960: bool, halfmove_limit: u32) -> Result<(Tree, NodeId), UciError> {
        let root = Position::from_fen_960(&self.fen, chess960)?;
        let mut tree = Tree::with_halfmove_limit(root, halfmove_limit);
        let mut current = tree.root();

        for text in &self.moves {
            let m = to_move(tree.position(current), text)?;
            current = tree.add_child(current, m)?;
        }

        Ok((tree, current))
    }
}

// parse_position() reads the arguments of the "position" command:
//   startpos [moves m1 m2 ...]
//   fen <fen> [moves m1 m2 ...]
pub fn parse_position(args: &str) -> Result<PositionCommand, UciError> {
    let mut tokens = args.split_whitespace();

    let fen = match tokens.next() {
        Some("startpos") => {
            match tokens.next() {
                None | Some("moves") => {}
                Some(other) => return Err(UciError::BadPositionCommand(other.to_string())),
            }
            START_FEN.to_string()
        }
        Some("fen") => {
            let mut fields = Vec::new();
            for token in tokens.by_ref() {
                if token == "moves" {
                    break;
                }
                fields.push(token);
            }
            if fields.is_empty() {
                return Err(UciError::BadPositionCommand("fen".to_string()));
            }
            fields.join(" ")
        }
        Some(other) => return Err(UciError::BadPositionCommand(other.to_string())),
        None => return Err(UciError::BadPositionCommand(String::new())),
    };

    Ok(PositionCommand {
        fen,
        moves: tokens.map(str::to_string).collect(),
    })
}

/// Parses the depth argument of `perft` / `go perft`.
pub fn parse_depth(arg: Option<&str>) -> Result<u32, UciError> {
    let arg = arg.ok_or_else(|| UciError::BadDepth(String::new()))?;
    arg.parse::<u32>()
        .ok()
        .filter(|&d| d > 0 && d <= 16)
        .ok_or_else(|| UciError::BadDepth(arg.to_string()))
}
