// SPDX-License-Identifier: GPL-3.0-or-later

use std::fmt;

/// The six space-separated FEN fields, used to report where decoding failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FenField {
    Board,
    SideToMove,
    Castling,
    EnPassant,
    HalfmoveClock,
    FullmoveNumber,
}

impl fmt::Display for FenField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FenField::Board => "piece placement",
            FenField::SideToMove => "side to move",
            FenField::Castling => "castling availability",
            FenField::EnPassant => "en passant square",
            FenField::HalfmoveClock => "halfmove clock",
            FenField::FullmoveNumber => "fullmove number",
        };
        f.write_str(name)
    }
}

/// A failed step of `Position::validate()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Inconsistency {
    #[error("side to move, king squares or en passant square are invalid")]
    Default,
    #[error("wrong number of kings or the side not to move is in check")]
    Kings,
    #[error("occupancy bitboards disagree with each other or with the board")]
    Bitboards,
    #[error("incrementally maintained checkers differ from a full recomputation")]
    Checkers,
    #[error("incrementally maintained hash key differs from a full recomputation")]
    Key,
    #[error("piece lists or their reverse index disagree with the board")]
    Lists,
    #[error("castling rights do not match king and rook placement")]
    Castling,
}

/// Domain errors of the position core.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PositionError {
    #[error("invalid FEN ({field}): {reason}")]
    InvalidNotation { field: FenField, reason: String },

    #[error("illegal move: {0}")]
    IllegalMove(String),

    #[error("inconsistent position: {0}")]
    Inconsistent(#[from] Inconsistency),
}

impl PositionError {
    pub fn notation(field: FenField, reason: impl Into<String>) -> Self {
        PositionError::InvalidNotation {
            field,
            reason: reason.into(),
        }
    }
}

/// Errors raised while interpreting protocol commands.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UciError {
    #[error("expected 'startpos' or 'fen' after 'position', found {0:?}")]
    BadPositionCommand(String),

    #[error("malformed move text: {0:?}")]
    BadMoveText(String),

    #[error("move {0} is not legal in this position")]
    UnknownMove(String),

    #[error("invalid depth: {0:?}")]
    BadDepth(String),

    #[error(transparent)]
    Position(#[from] PositionError),

    #[error("cannot write response: {0}")]
    Output(String),
}

impl From<std::io::Error> for UciError {
    fn from(e: std::io::Error) -> Self {
        UciError::Output(e.to_string())
    }
}
