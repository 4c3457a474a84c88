//! Directions, rays and special ranks

use crate::types::{Color, Coord, Rank};

/// Unit step on the board, expressed as file and rank index deltas
///
/// Rank indices grow towards the first rank, so White pawns move with `rank == -1`.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub struct Dir {
    pub file: i8,
    pub rank: i8,
}

impl Dir {
    pub const fn new(file: i8, rank: i8) -> Dir {
        Dir { file, rank }
    }

    pub const fn inv(self) -> Dir {
        Dir::new(-self.file, -self.rank)
    }

    pub const fn is_straight(self) -> bool {
        (self.file == 0) != (self.rank == 0)
    }

    pub const fn is_diagonal(self) -> bool {
        self.file != 0 && self.file.abs() == self.rank.abs()
    }

    pub fn is_on_same_axis(self, other: Dir) -> bool {
        self == other || self == other.inv()
    }

    /// Index of this direction in [`ROYAL_DIRS`], if it is one of them
    pub fn royal_index(self) -> Option<usize> {
        ROYAL_DIRS.iter().position(|&d| d == self)
    }

    pub fn step(self, from: Coord) -> Option<Coord> {
        from.try_shift(self.file as isize, self.rank as isize)
    }
}

pub const ROOK_DIRS: [Dir; 4] = [
    Dir::new(0, -1),
    Dir::new(1, 0),
    Dir::new(0, 1),
    Dir::new(-1, 0),
];

pub const BISHOP_DIRS: [Dir; 4] = [
    Dir::new(1, -1),
    Dir::new(1, 1),
    Dir::new(-1, 1),
    Dir::new(-1, -1),
];

/// All eight queen/king directions, straight ones first
pub const ROYAL_DIRS: [Dir; 8] = [
    ROOK_DIRS[0],
    ROOK_DIRS[1],
    ROOK_DIRS[2],
    ROOK_DIRS[3],
    BISHOP_DIRS[0],
    BISHOP_DIRS[1],
    BISHOP_DIRS[2],
    BISHOP_DIRS[3],
];

pub const KNIGHT_JUMPS: [Dir; 8] = [
    Dir::new(1, -2),
    Dir::new(2, -1),
    Dir::new(2, 1),
    Dir::new(1, 2),
    Dir::new(-1, 2),
    Dir::new(-2, 1),
    Dir::new(-2, -1),
    Dir::new(-1, -2),
];

/// Returns the unit queen-line direction from `from` to `to`
///
/// Returns `None` if the squares are equal or not on a common rank, file or diagonal.
pub fn direction(from: Coord, to: Coord) -> Option<Dir> {
    let df = to.file().index() as i8 - from.file().index() as i8;
    let dr = to.rank().index() as i8 - from.rank().index() as i8;
    if (df, dr) == (0, 0) {
        return None;
    }
    if df == 0 || dr == 0 || df.abs() == dr.abs() {
        return Some(Dir::new(df.signum(), dr.signum()));
    }
    None
}

/// Iterates over the squares strictly between `from` and `to`
///
/// Yields nothing if the squares are not on a common queen line.
pub fn between(from: Coord, to: Coord) -> impl Iterator<Item = Coord> {
    let dir = direction(from, to);
    let mut cur = from;
    std::iter::from_fn(move || {
        let next = dir?.step(cur)?;
        if next == to {
            return None;
        }
        cur = next;
        Some(next)
    })
}

/// Returns `true` if `pos` lies strictly between `from` and `to` on a queen line
pub fn is_between(pos: Coord, from: Coord, to: Coord) -> bool {
    match (direction(from, pos), direction(pos, to)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

pub const fn pawn_forward(c: Color) -> Dir {
    match c {
        Color::White => Dir::new(0, -1),
        Color::Black => Dir::new(0, 1),
    }
}

pub const fn pawn_captures(c: Color) -> [Dir; 2] {
    match c {
        Color::White => [Dir::new(-1, -1), Dir::new(1, -1)],
        Color::Black => [Dir::new(-1, 1), Dir::new(1, 1)],
    }
}

pub const fn castling_rank(c: Color) -> Rank {
    match c {
        Color::White => Rank::R1,
        Color::Black => Rank::R8,
    }
}

pub const fn pawn_base_rank(c: Color) -> Rank {
    match c {
        Color::White => Rank::R2,
        Color::Black => Rank::R7,
    }
}

pub const fn promotion_rank(c: Color) -> Rank {
    match c {
        Color::White => Rank::R8,
        Color::Black => Rank::R1,
    }
}

pub const fn enpassant_src_rank(c: Color) -> Rank {
    match c {
        Color::White => Rank::R5,
        Color::Black => Rank::R4,
    }
}

pub const fn enpassant_dst_rank(c: Color) -> Rank {
    match c {
        Color::White => Rank::R6,
        Color::Black => Rank::R3,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn c(s: &str) -> Coord {
        Coord::from_str(s).unwrap()
    }

    #[test]
    fn test_direction() {
        assert_eq!(direction(c("a1"), c("a8")), Some(Dir::new(0, -1)));
        assert_eq!(direction(c("h8"), c("a1")), Some(Dir::new(-1, 1)));
        assert_eq!(direction(c("b1"), c("c3")), None);
        assert_eq!(direction(c("e4"), c("e4")), None);
    }

    #[test]
    fn test_between() {
        assert_eq!(
            between(c("a1"), c("d4")).collect::<Vec<_>>(),
            vec![c("b2"), c("c3")]
        );
        assert_eq!(between(c("a1"), c("a2")).count(), 0);
        assert_eq!(between(c("a1"), c("b3")).count(), 0);
        assert!(is_between(c("e2"), c("e1"), c("e8")));
        assert!(!is_between(c("e1"), c("e1"), c("e8")));
        assert!(!is_between(c("f2"), c("e1"), c("e8")));
    }

    #[test]
    fn test_axis() {
        assert!(Dir::new(0, 1).is_on_same_axis(Dir::new(0, -1)));
        assert!(!Dir::new(0, 1).is_on_same_axis(Dir::new(1, 1)));
        assert_eq!(Dir::new(-1, -1).royal_index(), Some(7));
        assert_eq!(KNIGHT_JUMPS[0].royal_index(), None);
    }
}
