//! Core types shared by the engine modules

pub use tideval_base::types::{
    CastlingRightsParseError, ColorParseError, CoordParseError, CastlingRights, CastlingSide, Cell,
    Color, Coord, File, Piece, Rank,
};

use std::fmt;

/// Index of a live piece on the [`Board`](crate::board::Board)
///
/// Slots are reused: after a capture or a promotion, a new piece may get the id of a
/// piece that left the board.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PieceId(pub(crate) u8);

impl PieceId {
    /// Maximum number of pieces on the board at once
    pub const COUNT: usize = 32;

    pub const fn from_index(val: usize) -> PieceId {
        assert!(val < Self::COUNT, "piece id must be less than 32");
        PieceId(val as u8)
    }

    pub const fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for PieceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        write!(f, "PieceId({})", self.0)
    }
}

impl fmt::Display for PieceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        write!(f, "#{}", self.0)
    }
}
