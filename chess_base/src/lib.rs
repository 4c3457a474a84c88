//! # Board primitives for tideval
//!
//! This is an auxiliary crate for `tideval`, which contains squares, pieces, bitboards and
//! board geometry. Normally you don't want to use this crate directly, `tideval` re-exports
//! everything needed.

pub mod bitboard;
pub mod geometry;
pub mod types;

pub use bitboard::Bitboard;
pub use geometry::Dir;
pub use types::{CastlingRights, CastlingSide, Cell, Color, Coord, File, Piece, Rank};
