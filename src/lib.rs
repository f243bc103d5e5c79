// SPDX-License-Identifier: GPL-3.0-or-later

//! Chess position core: a redundantly indexed board with incremental move
//! application, check and pin analysis, legality testing and FEN I/O, plus a
//! move generator, a move tree and a minimal protocol front end.

pub mod bitboard;
pub mod config;
pub mod error;
pub mod misc;
pub mod movegen;
pub mod position;
pub mod tree;
pub mod types;
pub mod uci;

pub use config::Config;
pub use error::{FenField, Inconsistency, PositionError, UciError};
pub use movegen::{perft, MoveList};
pub use position::{Position, START_FEN};
pub use tree::{Node, NodeId, Tree};
pub use types::{Color, Move, MoveType, Piece, PieceType, Square};
