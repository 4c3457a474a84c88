//! Live pieces and their work queues

use crate::chances::ChanceLedger;
use crate::eval::{MAX_HOPS_LIMIT, NOT_EVALUATED};
use crate::moves::{EvaluatedMove, Move};
use crate::node::Node;
use crate::types::{Color, Coord, Piece, PieceId};
use tideval_base::Dir;

use arrayvec::ArrayVec;
use log::warn;

use std::collections::VecDeque;

/// Deferred step of the distance calculation
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub(crate) enum Task {
    /// Offer the node's distance to its neighbours
    Propagate(Coord),
    /// The node's suggestion got worse: reset everything derived from it, then propagate again
    PropagateReset(Coord),
    /// Pull a fresh distance from the incoming edges, then propagate it
    Recalc(Coord),
}

/// Work queue ordered by hop level
///
/// A task stored at level `L` is only run once the board-wide calculation has reached level
/// `L`, so all the updates of one level are finished for every piece before the next level
/// starts.
#[derive(Debug, Clone)]
pub(crate) struct WorkQueue {
    levels: Vec<VecDeque<Task>>,
}

impl WorkQueue {
    const LEVELS: usize = MAX_HOPS_LIMIT + 2;

    pub fn new() -> WorkQueue {
        WorkQueue {
            levels: vec![VecDeque::new(); Self::LEVELS],
        }
    }

    /// Queues `task` at `level`
    ///
    /// Levels past the last bucket are stored in the last bucket and reported.
    pub fn push(&mut self, level: u32, task: Task) {
        let idx = level as usize;
        if idx >= Self::LEVELS {
            warn!("queue level {} out of range for {:?}", level, task);
        }
        self.levels[idx.min(Self::LEVELS - 1)].push_back(task);
    }

    /// Pops the first task of the lowest non-empty level not above `limit`
    pub fn pop_up_to(&mut self, limit: u32) -> Option<Task> {
        let limit = (limit as usize).min(Self::LEVELS - 1);
        self.levels[..=limit]
            .iter_mut()
            .find(|q| !q.is_empty())
            .and_then(|q| q.pop_front())
    }

    pub fn has_pending_up_to(&self, limit: u32) -> bool {
        let limit = (limit as usize).min(Self::LEVELS - 1);
        self.levels[..=limit].iter().any(|q| !q.is_empty())
    }

    pub fn len(&self) -> usize {
        self.levels.iter().map(|q| q.len()).sum()
    }

    pub fn clear(&mut self) {
        for q in self.levels.iter_mut() {
            q.clear();
        }
    }
}

pub(crate) type MoveList = ArrayVec<Move, 32>;

/// A piece on the board together with its 64 propagation nodes
#[derive(Debug, Clone)]
pub struct LivePiece {
    pub(crate) id: PieceId,
    pub(crate) color: Color,
    pub(crate) piece: Piece,
    pub(crate) sq: Coord,
    pub(crate) alive: bool,
    pub(crate) nodes: Vec<Node>,
    pub(crate) queue: WorkQueue,
    /// Number of squares reachable unconditionally in exactly `i + 1` hops
    pub(crate) mobility: [u32; MAX_HOPS_LIMIT],
    pub(crate) legal_moves: MoveList,
    pub(crate) move_evals: Vec<EvaluatedMove>,
    pub(crate) best_moves: Vec<EvaluatedMove>,
    /// Benefits (or warnings) for moving away, keyed by the move target
    pub(crate) move_away: ChanceLedger,
    /// Moves that give check, by target square
    pub(crate) checking: tideval_base::Bitboard,
    pub(crate) best_rel_eval: Option<i32>,
    pub(crate) stay_eval: i32,
    /// Axis of the pin to the own king, if pinned
    pub(crate) pin: Option<Dir>,
}

impl LivePiece {
    pub(crate) fn new(id: PieceId, color: Color, piece: Piece, sq: Coord) -> LivePiece {
        let mut nodes: Vec<Node> = Coord::iter()
            .map(|c| Node::new(id, c, color, piece))
            .collect();
        for from in Coord::iter() {
            let links = nodes[from.index()].links.clone();
            for link in links {
                let mut back = link;
                back.sq = from;
                nodes[link.sq.index()].back.push(back);
            }
        }
        LivePiece {
            id,
            color,
            piece,
            sq,
            alive: true,
            nodes,
            queue: WorkQueue::new(),
            mobility: [0; MAX_HOPS_LIMIT],
            legal_moves: MoveList::new(),
            move_evals: Vec::new(),
            best_moves: Vec::new(),
            move_away: ChanceLedger::new(color),
            checking: tideval_base::Bitboard::EMPTY,
            best_rel_eval: None,
            stay_eval: 0,
            pin: None,
        }
    }

    pub fn id(&self) -> PieceId {
        self.id
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn piece(&self) -> Piece {
        self.piece
    }

    pub fn sq(&self) -> Coord {
        self.sq
    }

    /// Signed base value of the piece
    pub fn value(&self) -> i32 {
        self.color.sign() * self.piece.value()
    }

    pub fn node(&self, sq: Coord) -> &Node {
        &self.nodes[sq.index()]
    }

    pub(crate) fn node_mut(&mut self, sq: Coord) -> &mut Node {
        &mut self.nodes[sq.index()]
    }

    /// Mobility per hop count, starting with one hop
    pub fn mobility(&self) -> &[u32] {
        &self.mobility
    }

    pub fn legal_moves(&self) -> &[Move] {
        &self.legal_moves
    }

    /// Best moves of this piece, best first
    pub fn best_moves(&self) -> &[EvaluatedMove] {
        &self.best_moves
    }

    /// Clash result if the piece stays where it is
    pub fn stay_eval(&self) -> i32 {
        self.stay_eval
    }

    pub fn can_move(&self) -> bool {
        !self.legal_moves.is_empty()
    }

    pub(crate) fn clear_move_data(&mut self) {
        self.mobility = [0; MAX_HOPS_LIMIT];
        self.legal_moves.clear();
        self.move_evals.clear();
        self.best_moves.clear();
        self.move_away.clear();
        self.checking = tideval_base::Bitboard::EMPTY;
        self.best_rel_eval = None;
    }

    /// Forgets all distances and puts the piece on `sq` with an empty queue
    pub(crate) fn reseat(&mut self, sq: Coord, clock: u64) {
        self.sq = sq;
        self.queue.clear();
        for node in self.nodes.iter_mut() {
            node.reset_all(clock);
        }
        self.nodes[sq.index()].set_origin(clock);
        self.stay_eval = NOT_EVALUATED;
    }

    pub(crate) fn kill(&mut self, clock: u64) {
        self.alive = false;
        self.queue.clear();
        for node in self.nodes.iter_mut() {
            node.reset_all(clock);
        }
        self.clear_move_data();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_queue_order() {
        let e4 = Coord::from_str("e4").unwrap();
        let d4 = Coord::from_str("d4").unwrap();
        let mut q = WorkQueue::new();
        q.push(3, Task::Propagate(e4));
        q.push(1, Task::Recalc(d4));
        q.push(1, Task::Propagate(d4));
        assert_eq!(q.len(), 3);
        assert!(!q.has_pending_up_to(0));
        assert_eq!(q.pop_up_to(2), Some(Task::Recalc(d4)));
        assert_eq!(q.pop_up_to(2), Some(Task::Propagate(d4)));
        assert_eq!(q.pop_up_to(2), None);
        assert!(q.has_pending_up_to(3));
        assert_eq!(q.pop_up_to(100), Some(Task::Propagate(e4)));
    }

    #[test]
    fn test_queue_overflow_level() {
        let _ = env_logger::builder().is_test(true).try_init();
        let e4 = Coord::from_str("e4").unwrap();
        let mut q = WorkQueue::new();
        q.push(u32::MAX, Task::Recalc(e4));
        assert_eq!(q.len(), 1);
        assert!(!q.has_pending_up_to(MAX_HOPS_LIMIT as u32));
        assert!(q.has_pending_up_to(MAX_HOPS_LIMIT as u32 + 1));
        assert_eq!(q.pop_up_to(u32::MAX), Some(Task::Recalc(e4)));
        assert_eq!(q.len(), 0);
    }

    #[test]
    fn test_back_links() {
        let a1 = Coord::from_str("a1").unwrap();
        let rook = LivePiece::new(PieceId::from_index(3), Color::White, Piece::Rook, a1);
        let b1 = Coord::from_str("b1").unwrap();
        // reachable from a1, c1 and b2
        assert_eq!(rook.node(b1).back.len(), 3);
        assert!(rook.node(b1).back.iter().any(|l| l.sq == a1));
    }
}
