//! Propagation nodes
//!
//! One [`Node`] exists for every pair of live piece and square. It stores the conditional
//! distance from the piece to the square, the topology of the piece movement around the square
//! and everything the evaluation attaches to this pair.

use crate::chances::{ChanceLedger, ForkTracker};
use crate::distance::{ConditionalDistance, INFINITE};
use crate::eval::NOT_EVALUATED;
use crate::types::{Color, Coord, Piece, PieceId};
use tideval_base::geometry::{self, Dir, BISHOP_DIRS, KNIGHT_JUMPS, ROOK_DIRS, ROYAL_DIRS};
use tideval_base::Bitboard;

use arrayvec::ArrayVec;

/// Movement shape of a piece
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Shape {
    /// Rook, bishop or queen
    Sliding,
    /// King or knight
    OneHop,
    Pawn,
}

impl Shape {
    pub const fn of(piece: Piece) -> Shape {
        match piece {
            Piece::Bishop | Piece::Rook | Piece::Queen => Shape::Sliding,
            Piece::King | Piece::Knight => Shape::OneHop,
            Piece::Pawn => Shape::Pawn,
        }
    }
}

/// Kind of an edge in the distance graph
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum LinkKind {
    /// One step along a ray, the index is into [`ROYAL_DIRS`]
    Slide(u8),
    Hop,
    Push,
    DoublePush,
    Capture,
}

/// Directed edge of the distance graph
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Link {
    pub sq: Coord,
    pub kind: LinkKind,
}

pub(crate) type Links = ArrayVec<Link, 8>;

fn dirs_of(piece: Piece) -> &'static [Dir] {
    match piece {
        Piece::Rook => &ROOK_DIRS,
        Piece::Bishop => &BISHOP_DIRS,
        Piece::Queen | Piece::King => &ROYAL_DIRS,
        Piece::Knight => &KNIGHT_JUMPS,
        Piece::Pawn => &[],
    }
}

/// Returns the outgoing edges of `sq` for a piece of kind `piece` and color `color`
pub fn out_links(piece: Piece, color: Color, sq: Coord) -> Links {
    let mut res = Links::new();
    match Shape::of(piece) {
        Shape::Sliding => {
            for &d in dirs_of(piece) {
                if let (Some(to), Some(idx)) = (d.step(sq), d.royal_index()) {
                    res.push(Link {
                        sq: to,
                        kind: LinkKind::Slide(idx as u8),
                    });
                }
            }
        }
        Shape::OneHop => {
            for &d in dirs_of(piece) {
                if let Some(to) = d.step(sq) {
                    res.push(Link {
                        sq: to,
                        kind: LinkKind::Hop,
                    });
                }
            }
        }
        Shape::Pawn => {
            if sq.rank() == geometry::promotion_rank(color) {
                return res;
            }
            let fwd = geometry::pawn_forward(color);
            if let Some(one) = fwd.step(sq) {
                res.push(Link {
                    sq: one,
                    kind: LinkKind::Push,
                });
                if sq.rank() == geometry::pawn_base_rank(color) {
                    if let Some(two) = fwd.step(one) {
                        res.push(Link {
                            sq: two,
                            kind: LinkKind::DoublePush,
                        });
                    }
                }
            }
            for d in geometry::pawn_captures(color) {
                if let Some(to) = d.step(sq) {
                    res.push(Link {
                        sq: to,
                        kind: LinkKind::Capture,
                    });
                }
            }
        }
    }
    res
}

/// Returns `true` if a pawn of `color` on `from` could ever get to `to`
pub fn pawn_can_theoretically_reach(color: Color, from: Coord, to: Coord) -> bool {
    let from_progress = from.rank().progress(color) as isize;
    let to_progress = to.rank().progress(color) as isize;
    let forward = to_progress - from_progress;
    let files = (to.file().index() as isize - from.file().index() as isize).abs();
    forward > 0 && files <= forward
}

/// The unit of the distance graph: one piece on one square
#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) pid: PieceId,
    pub(crate) sq: Coord,
    pub(crate) color: Color,
    pub(crate) piece: Piece,
    pub(crate) shape: Shape,
    pub(crate) links: Links,
    pub(crate) back: Links,
    pub(crate) raw: ConditionalDistance,
    /// Arrival distance per direction, only used by sliding pieces
    pub(crate) slide: [ConditionalDistance; 8],
    pub(crate) paths_dirty: bool,
    pub(crate) preds: Bitboard,
    pub(crate) first_moves: Bitboard,
    pub(crate) rel_eval: i32,
    pub(crate) clash_contrib: i32,
    pub(crate) killable: bool,
    pub(crate) price_to_kill: i32,
    pub(crate) last_change: u64,
    pub(crate) chances: ChanceLedger,
    pub(crate) future: ChanceLedger,
    pub(crate) fork: ForkTracker,
}

impl Node {
    pub(crate) fn new(pid: PieceId, sq: Coord, color: Color, piece: Piece) -> Node {
        Node {
            pid,
            sq,
            color,
            piece,
            shape: Shape::of(piece),
            links: out_links(piece, color, sq),
            back: Links::new(),
            raw: ConditionalDistance::infinite(),
            slide: Default::default(),
            paths_dirty: true,
            preds: Bitboard::EMPTY,
            first_moves: Bitboard::EMPTY,
            rel_eval: NOT_EVALUATED,
            clash_contrib: 0,
            killable: false,
            price_to_kill: 0,
            last_change: 0,
            chances: ChanceLedger::new(color),
            future: ChanceLedger::new(color),
            fork: ForkTracker::new(color),
        }
    }

    pub fn pid(&self) -> PieceId {
        self.pid
    }

    pub fn sq(&self) -> Coord {
        self.sq
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn piece(&self) -> Piece {
        self.piece
    }

    /// Distance ignoring a same-colored occupant of this square
    pub fn raw_distance(&self) -> &ConditionalDistance {
        &self.raw
    }

    /// Evaluation (board perspective) of this piece going to this square, or [`NOT_EVALUATED`]
    pub fn rel_eval(&self) -> i32 {
        self.rel_eval
    }

    pub fn clash_contrib(&self) -> i32 {
        self.clash_contrib
    }

    pub fn is_killable(&self) -> bool {
        self.killable
    }

    pub fn price_to_kill(&self) -> i32 {
        self.price_to_kill
    }

    /// Value of the board clock when the raw distance last changed
    pub fn last_change(&self) -> u64 {
        self.last_change
    }

    /// Consolidated chances of this node
    pub fn chances(&self) -> &ChanceLedger {
        &self.chances
    }

    pub fn forking_chance(&self) -> i32 {
        self.fork.forking_chance()
    }

    /// Value this node offers along `kind`, i.e. the distance the edge starts from
    pub(crate) fn value_along(&self, kind: LinkKind) -> &ConditionalDistance {
        match kind {
            LinkKind::Slide(k) => &self.slide[k as usize],
            _ => &self.raw,
        }
    }

    pub(crate) fn reset_distance(&mut self, clock: u64) {
        self.raw = ConditionalDistance::infinite();
        for s in self.slide.iter_mut() {
            *s = ConditionalDistance::infinite();
        }
        self.paths_dirty = true;
        self.last_change = clock;
    }

    /// Clears everything except the topology
    pub(crate) fn reset_all(&mut self, clock: u64) {
        self.reset_distance(clock);
        self.rel_eval = NOT_EVALUATED;
        self.clash_contrib = 0;
        self.killable = false;
        self.price_to_kill = 0;
        self.reset_chances();
    }

    pub(crate) fn reset_chances(&mut self) {
        self.chances.clear();
        self.future.clear();
        self.fork = ForkTracker::new(self.color);
    }

    pub(crate) fn set_origin(&mut self, clock: u64) {
        self.reset_distance(clock);
        self.raw = ConditionalDistance::zero();
    }

    /// Number of opponent moves the path to here relies on
    pub fn opponent_help_needed(&self) -> u32 {
        self.raw.count_help_needed_from(self.color.inv())
    }

    /// Future horizon at which a benefit on this square is realized
    pub fn std_future_level(&self) -> usize {
        if self.raw.is_infinite() {
            return INFINITE as usize;
        }
        (self.raw.dist() + self.opponent_help_needed()).saturating_sub(1) as usize
    }

    /// One more than the horizon at which this piece attacks or defends from here
    pub fn attacking_future_level_plus_one(&self) -> usize {
        if self.raw.is_infinite() {
            return INFINITE as usize;
        }
        (self.raw.dist() + self.opponent_help_needed()).max(1) as usize
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
    fn test_links() {
        assert_eq!(out_links(Piece::Knight, Color::White, c("a1")).len(), 2);
        assert_eq!(out_links(Piece::Queen, Color::Black, c("d4")).len(), 8);
        assert_eq!(out_links(Piece::Rook, Color::Black, c("h8")).len(), 2);

        let pawn = out_links(Piece::Pawn, Color::White, c("e2"));
        assert!(pawn.contains(&Link {
            sq: c("e4"),
            kind: LinkKind::DoublePush
        }));
        assert!(pawn.contains(&Link {
            sq: c("d3"),
            kind: LinkKind::Capture
        }));
        assert_eq!(pawn.len(), 4);
        assert_eq!(out_links(Piece::Pawn, Color::Black, c("a7")).len(), 3);
        assert!(out_links(Piece::Pawn, Color::Black, c("a1")).is_empty());
    }

    #[test]
    fn test_pawn_reach() {
        assert!(pawn_can_theoretically_reach(Color::White, c("e2"), c("e4")));
        assert!(pawn_can_theoretically_reach(Color::White, c("e2"), c("g4")));
        assert!(!pawn_can_theoretically_reach(Color::White, c("e2"), c("h4")));
        assert!(!pawn_can_theoretically_reach(Color::White, c("e2"), c("e2")));
        assert!(pawn_can_theoretically_reach(Color::Black, c("d7"), c("c6")));
        assert!(!pawn_can_theoretically_reach(Color::Black, c("d7"), c("d8")));
    }

    #[test]
    fn test_future_levels() {
        let mut node = Node::new(PieceId::from_index(0), c("e4"), Color::White, Piece::Knight);
        node.raw = ConditionalDistance::with_hops(3);
        assert_eq!(node.std_future_level(), 2);
        assert_eq!(node.attacking_future_level_plus_one(), 3);
        node.raw = ConditionalDistance::zero();
        assert_eq!(node.std_future_level(), 0);
        assert_eq!(node.attacking_future_level_plus_one(), 1);
    }
}
