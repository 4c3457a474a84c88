//! Geometric attack and pin detection
//!
//! These functions work on plain cells and do not use the distance data, so they can check
//! positions that are one move ahead of the board.

use crate::types::{Cell, Color, Coord, Piece};
use tideval_base::geometry::{self, Dir, BISHOP_DIRS, KNIGHT_JUMPS, ROOK_DIRS, ROYAL_DIRS};

fn first_occupied(cells: &[Cell; 64], from: Coord, dir: Dir) -> Option<(Coord, Cell)> {
    let mut cur = from;
    while let Some(next) = dir.step(cur) {
        let cell = cells[next.index()];
        if cell.is_occupied() {
            return Some((next, cell));
        }
        cur = next;
    }
    None
}

fn slides_along(piece: Piece, dir: Dir) -> bool {
    match piece {
        Piece::Queen => true,
        Piece::Rook => dir.is_straight(),
        Piece::Bishop => dir.is_diagonal(),
        _ => false,
    }
}

/// Returns `true` if a piece of color `color` attacks `coord`
pub fn is_cell_attacked(cells: &[Cell; 64], coord: Coord, color: Color) -> bool {
    let has = |c: Option<Coord>, piece: Piece| {
        c.map_or(false, |c| cells[c.index()] == Cell::from_parts(color, piece))
    };

    if geometry::pawn_captures(color)
        .iter()
        .any(|d| has(d.inv().step(coord), Piece::Pawn))
    {
        return true;
    }
    if KNIGHT_JUMPS.iter().any(|d| has(d.step(coord), Piece::Knight)) {
        return true;
    }
    if ROYAL_DIRS.iter().any(|d| has(d.step(coord), Piece::King)) {
        return true;
    }
    for dir in ROOK_DIRS.iter().chain(BISHOP_DIRS.iter()) {
        if let Some((_, cell)) = first_occupied(cells, coord, *dir) {
            if cell.color() == Some(color)
                && cell.piece().map_or(false, |p| slides_along(p, *dir))
            {
                return true;
            }
        }
    }
    false
}

/// Squares of all the pieces of color `color` attacking `coord`
pub fn cell_attackers(cells: &[Cell; 64], coord: Coord, color: Color) -> Vec<Coord> {
    let mut res = Vec::new();
    let mut check = |c: Option<Coord>, piece: Piece| {
        if let Some(c) = c {
            if cells[c.index()] == Cell::from_parts(color, piece) {
                res.push(c);
            }
        }
    };
    for d in geometry::pawn_captures(color) {
        check(d.inv().step(coord), Piece::Pawn);
    }
    for d in KNIGHT_JUMPS {
        check(d.step(coord), Piece::Knight);
    }
    for d in ROYAL_DIRS {
        check(d.step(coord), Piece::King);
    }
    for dir in ROYAL_DIRS {
        if let Some((c, cell)) = first_occupied(cells, coord, dir) {
            if cell.color() == Some(color) && cell.piece().map_or(false, |p| slides_along(p, dir)) {
                res.push(c);
            }
        }
    }
    res
}

/// Returns the axis along which the piece on `sq` is pinned to the king on `king`
///
/// The returned direction points from the king towards the piece.
pub fn pin_direction(cells: &[Cell; 64], sq: Coord, king: Coord) -> Option<Dir> {
    let color = cells[sq.index()].color()?;
    let dir = geometry::direction(king, sq)?;
    if geometry::between(king, sq).any(|c| cells[c.index()].is_occupied()) {
        return None;
    }
    let (_, cell) = first_occupied(cells, sq, dir)?;
    if cell.color() == Some(color.inv()) && cell.piece().map_or(false, |p| slides_along(p, dir)) {
        return Some(dir);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raw::RawBoard;
    use std::str::FromStr;

    fn c(s: &str) -> Coord {
        Coord::from_str(s).unwrap()
    }

    #[test]
    fn test_attacks() {
        let raw = RawBoard::from_fen("4k3/8/8/3p4/8/2N5/8/R3K3 w - - 0 1").unwrap();
        assert!(is_cell_attacked(&raw.cells, c("d5"), Color::White));
        assert!(is_cell_attacked(&raw.cells, c("a8"), Color::White));
        assert!(is_cell_attacked(&raw.cells, c("e4"), Color::Black));
        assert!(is_cell_attacked(&raw.cells, c("c4"), Color::Black));
        assert!(!is_cell_attacked(&raw.cells, c("d4"), Color::Black));
        assert!(!is_cell_attacked(&raw.cells, c("e8"), Color::White));
        assert_eq!(cell_attackers(&raw.cells, c("d1"), Color::White).len(), 3);
    }

    #[test]
    fn test_pin() {
        let raw = RawBoard::from_fen("4r1k1/8/8/8/8/8/4N3/4K3 w - - 0 1").unwrap();
        assert_eq!(
            pin_direction(&raw.cells, c("e2"), c("e1")),
            Some(Dir::new(0, -1))
        );
        let raw = RawBoard::from_fen("4r1k1/8/8/8/4p3/8/4N3/4K3 w - - 0 1").unwrap();
        assert_eq!(pin_direction(&raw.cells, c("e2"), c("e1")), None);
    }
}
