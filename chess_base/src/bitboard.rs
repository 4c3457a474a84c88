//! Compact sets of squares

use crate::types::Coord;
use derive_more::{BitAnd, BitAndAssign, BitOr, BitOrAssign, Not};
use std::fmt;
use std::iter::{FromIterator, IntoIterator};

/// Set of squares, one bit per [`Coord`] index
///
/// Used for predecessor sets, first moves on shortest paths and the squares from which a piece
/// gives check.
///
/// # Example
///
/// ```
/// # use tideval_base::{Bitboard, Coord};
/// # use std::str::FromStr;
/// #
/// let e4 = Coord::from_str("e4").unwrap();
/// let d5 = Coord::from_str("d5").unwrap();
/// let set: Bitboard = [e4, d5].into_iter().collect();
/// assert_eq!(set.len(), 2);
/// assert_eq!(set.first(), Some(d5));
/// assert!(set.without(e4).has(d5));
/// ```
#[derive(
    Default, Copy, Clone, PartialEq, Eq, Hash, BitAnd, BitAndAssign, BitOr, BitOrAssign, Not,
)]
pub struct Bitboard(u64);

impl Bitboard {
    pub const EMPTY: Bitboard = Bitboard(0);
    pub const FULL: Bitboard = Bitboard(u64::MAX);

    pub const fn from_coord(coord: Coord) -> Bitboard {
        Bitboard(1_u64 << coord.index())
    }

    #[must_use]
    pub const fn with(self, coord: Coord) -> Bitboard {
        Bitboard(self.0 | (1_u64 << coord.index()))
    }

    #[must_use]
    pub const fn without(self, coord: Coord) -> Bitboard {
        Bitboard(self.0 & !(1_u64 << coord.index()))
    }

    pub fn set(&mut self, coord: Coord) {
        *self = self.with(coord);
    }

    pub fn unset(&mut self, coord: Coord) {
        *self = self.without(coord);
    }

    pub const fn has(&self, coord: Coord) -> bool {
        ((self.0 >> coord.index()) & 1) != 0
    }

    /// Number of squares in the set
    pub const fn len(&self) -> u32 {
        self.0.count_ones()
    }

    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Square with the lowest index, i.e. the one nearest to a8
    pub fn first(&self) -> Option<Coord> {
        match self.0 {
            0 => None,
            v => Some(Coord::from_index(v.trailing_zeros() as usize)),
        }
    }

    /// Returns the set of all squares for which `pred` holds
    pub fn collect(mut pred: impl FnMut(Coord) -> bool) -> Bitboard {
        Coord::iter().filter(|&c| pred(c)).collect()
    }
}

impl FromIterator<Coord> for Bitboard {
    fn from_iter<I: IntoIterator<Item = Coord>>(iter: I) -> Bitboard {
        iter.into_iter().fold(Bitboard::EMPTY, Bitboard::with)
    }
}

impl fmt::Debug for Bitboard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.into_iter()).finish()
    }
}

/// Shows the set as a diagram with rank 8 on top, `x` for members and `.` for the rest
impl fmt::Display for Bitboard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, c) in Coord::iter().enumerate() {
            if i > 0 && i % 8 == 0 {
                writeln!(f)?;
            }
            write!(f, "{}", if self.has(c) { 'x' } else { '.' })?;
        }
        Ok(())
    }
}

pub struct Iter(u64);

impl Iterator for Iter {
    type Item = Coord;

    fn next(&mut self) -> Option<Coord> {
        if self.0 == 0 {
            return None;
        }
        let bit = self.0.trailing_zeros();
        self.0 &= self.0.wrapping_sub(1_u64);
        Some(Coord::from_index(bit as usize))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.0.count_ones() as usize;
        (n, Some(n))
    }
}

impl IntoIterator for Bitboard {
    type Item = Coord;
    type IntoIter = Iter;

    fn into_iter(self) -> Iter {
        Iter(self.0)
    }
}
