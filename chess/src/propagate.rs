//! Distance propagation
//!
//! Every piece owns a graph of 64 nodes. Distances flow along the outgoing links of a node
//! whenever its value drops, and are pulled again along the incoming links after a reset. All
//! the work goes through the leveled queue of the piece, so the board can advance all pieces
//! one hop level at a time.

use crate::board::Board;
use crate::distance::{Condition, ConditionalDistance};
use crate::eval::{self, EVAL_TENTH, NOT_EVALUATED};
use crate::node::{self, Link, LinkKind, Shape};
use crate::piece::Task;
use crate::types::{Color, Coord, Piece, PieceId};
use tideval_base::geometry::{self, ROYAL_DIRS};
use tideval_base::Bitboard;

use log::{trace, warn};

impl Board {
    /// Color of the piece on `sq`, unless it is piece `pid` itself
    fn other_color_at(&self, pid: PieceId, sq: Coord) -> Option<Color> {
        match self.occupant[sq.index()] {
            Some(occ) if occ != pid => Some(self.lp(occ).color),
            _ => None,
        }
    }

    /// Distance of `pid` to `sq` including the clearing of a same-colored occupant
    pub(crate) fn derived_distance(&self, pid: PieceId, sq: Coord) -> ConditionalDistance {
        let p = self.lp(pid);
        let node = p.node(sq);
        let mut d = node.raw.clone();
        if d.is_infinite() {
            return d;
        }
        if d.dist() > 0 && self.other_color_at(pid, sq) == Some(p.color) {
            d.inc(self.penalties[sq.index()].max(1));
            d.add_condition(Condition::vacate(sq, p.color));
        }
        if node.rel_eval != NOT_EVALUATED && !eval::is_ok_for(node.rel_eval, p.color, -EVAL_TENTH) {
            d.mark_unsafe(sq);
        }
        d.capped(self.config.max_hops)
    }

    /// Distance offered from `sq` to a neighbour that is one hop further
    pub(crate) fn suggestion(&self, pid: PieceId, sq: Coord) -> ConditionalDistance {
        let raw = &self.lp(pid).node(sq).raw;
        if raw.is_infinite() {
            return ConditionalDistance::infinite();
        }
        if raw.dist() == 0 {
            return ConditionalDistance::with_hops(1);
        }
        let mut d = self.derived_distance(pid, sq);
        d.inc(1);
        d
    }

    /// Distance of `pid` to `link.sq` when arriving from `from`
    pub(crate) fn candidate(&self, pid: PieceId, from: Coord, link: Link) -> ConditionalDistance {
        let p = self.lp(pid);
        let to = link.sq;
        if to == p.sq
            || (p.piece == Piece::Pawn && !node::pawn_can_theoretically_reach(p.color, p.sq, to))
        {
            return ConditionalDistance::infinite();
        }
        let color = p.color;
        let mut d = self.suggestion(pid, from);
        match link.kind {
            LinkKind::Slide(k) => {
                let mut cont = p.node(from).slide[k as usize].clone();
                if !cont.is_infinite() {
                    match self.other_color_at(pid, from) {
                        Some(c) if c == color => {
                            cont.inc(self.penalties[from.index()].max(1));
                            cont.add_condition(Condition::vacate(from, c));
                        }
                        Some(c) => cont.add_condition(Condition::vacate(from, c)),
                        None => {}
                    }
                    if cont.is_smaller_than(&d) {
                        d = cont;
                    }
                }
            }
            LinkKind::Hop => {}
            LinkKind::Push | LinkKind::DoublePush => {
                if let Some(c) = self.other_color_at(pid, to) {
                    d.add_condition(Condition::vacate(to, c));
                }
                if link.kind == LinkKind::DoublePush {
                    if let Some(mid) = geometry::pawn_forward(color).step(from) {
                        if let Some(c) = self.other_color_at(pid, mid) {
                            d.add_condition(Condition::vacate(mid, c));
                        }
                    }
                }
            }
            LinkKind::Capture => {
                if self.other_color_at(pid, to) != Some(color.inv()) {
                    d.add_condition(Condition::arrive(to, color.inv()));
                }
            }
        }
        d.capped(self.config.max_hops)
    }

    /// Lowers the distance of `pid` to `to` along an edge of kind `kind`
    ///
    /// Returns `true` if the node changed.
    fn reduce(&mut self, pid: PieceId, to: Coord, kind: LinkKind, cand: &ConditionalDistance) -> bool {
        let clock = self.clock;
        let p = self.lp_mut(pid);
        if to == p.sq || cand.is_infinite() {
            return false;
        }
        let node = p.node_mut(to);
        let changed = match kind {
            LinkKind::Slide(k) => {
                let changed = node.slide[k as usize].reduce_if_smaller(cand);
                if changed {
                    node.raw.reduce_if_smaller(cand);
                }
                changed
            }
            _ => node.raw.reduce_if_smaller(cand),
        };
        if changed {
            node.paths_dirty = true;
            node.last_change = clock;
            let links = node.links.clone();
            for link in links {
                p.node_mut(link.sq).paths_dirty = true;
            }
        }
        changed
    }

    fn offer(&mut self, pid: PieceId, to: Coord, kind: LinkKind, cand: ConditionalDistance) {
        if self.reduce(pid, to, kind, &cand) {
            trace!("{} -> {}: {}", pid, to, cand);
            self.lp_mut(pid)
                .queue
                .push(cand.dist(), Task::Propagate(to));
        }
    }

    fn propagate(&mut self, pid: PieceId, sq: Coord) {
        let node = self.lp(pid).node(sq);
        if node.raw.is_infinite() {
            return;
        }
        for link in node.links.clone() {
            let cand = self.candidate(pid, sq, link);
            self.offer(pid, link.sq, link.kind, cand);
        }
    }

    fn recalc(&mut self, pid: PieceId, sq: Coord) {
        let p = self.lp(pid);
        if sq != p.sq {
            for back in p.node(sq).back.clone() {
                let cand = self.candidate(pid, back.sq, Link { sq, kind: back.kind });
                self.reduce(pid, sq, back.kind, &cand);
            }
        }
        let raw = &self.lp(pid).node(sq).raw;
        if !raw.is_infinite() {
            let level = raw.dist();
            self.lp_mut(pid).queue.push(level, Task::Propagate(sq));
        }
    }

    /// Resets every node whose distance may have been derived from `start`
    ///
    /// Returns the squares that were reset. `start` itself is only reset if `include_start`
    /// is set.
    pub(crate) fn flood_reset(&mut self, pid: PieceId, start: Coord, include_start: bool) -> Vec<Coord> {
        let clock = self.clock;
        let p = self.lp_mut(pid);
        let origin = p.sq;
        let mut res = Vec::new();
        let start_old = p.node(start).raw.dist();
        if p.node(start).raw.is_infinite() || start == origin {
            return res;
        }
        let mut visited = Bitboard::from_coord(start);
        if include_start {
            p.node_mut(start).reset_distance(clock);
            res.push(start);
        }
        let mut stack = vec![(start, start_old)];
        while let Some((cur, old)) = stack.pop() {
            for link in p.node(cur).links.clone() {
                let nb = link.sq;
                if nb == origin || visited.has(nb) {
                    continue;
                }
                let min = match link.kind {
                    LinkKind::Slide(_) => old,
                    _ => old.saturating_add(1),
                };
                let value = p.node(nb).value_along(link.kind);
                if value.is_infinite() || value.dist() < min {
                    continue;
                }
                let nb_old = p.node(nb).raw.dist();
                p.node_mut(nb).reset_distance(clock);
                visited.set(nb);
                res.push(nb);
                stack.push((nb, nb_old));
            }
        }
        res
    }

    fn run_task(&mut self, pid: PieceId, task: Task) {
        match task {
            Task::Propagate(sq) => self.propagate(pid, sq),
            Task::Recalc(sq) => self.recalc(pid, sq),
            Task::PropagateReset(sq) => {
                let raw = &self.lp(pid).node(sq).raw;
                if raw.is_infinite() {
                    return;
                }
                let level = raw.dist();
                let reset = self.flood_reset(pid, sq, false);
                let p = self.lp_mut(pid);
                for r in reset {
                    p.queue.push(level, Task::Recalc(r));
                }
                p.queue.push(level, Task::Propagate(sq));
            }
        }
    }

    /// Runs the queued tasks of piece `pid` up to hop level `limit`
    ///
    /// Returns the number of tasks run.
    pub(crate) fn continue_distance_calc(&mut self, pid: PieceId, limit: u32) -> usize {
        let mut count = 0;
        while let Some(task) = self.lp_mut(pid).queue.pop_up_to(limit) {
            self.run_task(pid, task);
            count += 1;
        }
        count
    }

    /// Invalidates the distances of piece `pid` that depend on the changed squares of a move
    ///
    /// The square nearer to the piece is handled first. The work itself is queued, so it runs
    /// inside the level loop.
    pub(crate) fn update_due_to_move(&mut self, pid: PieceId, from: Coord, to: Coord, changed: &[Coord]) {
        let p = self.lp(pid);
        let origin = p.sq;
        let color = p.color;
        let is_pawn = p.piece == Piece::Pawn;
        let mut order: Vec<Coord> = changed.iter().copied().filter(|&sq| sq != origin).collect();
        order.sort_by_key(|&sq| {
            let unavoidable = sq == from && geometry::is_between(from, origin, to);
            (p.node(sq).raw.dist(), !unavoidable)
        });

        for sq in order {
            let mut reset = self.flood_reset(pid, sq, true);
            if is_pawn && sq.rank().progress(color) == 2 {
                if let Some(beyond) = geometry::pawn_forward(color).step(sq) {
                    reset.extend(self.flood_reset(pid, beyond, true));
                    reset.push(beyond);
                }
            }
            reset.push(sq);
            let p = self.lp_mut(pid);
            for r in reset {
                p.queue.push(0, Task::Recalc(r));
            }
        }
    }

    /// Predecessors of `sq` on the shortest paths of piece `pid`
    fn compute_predecessors(&self, pid: PieceId, sq: Coord) -> Bitboard {
        let p = self.lp(pid);
        let node = p.node(sq);
        let target = node.raw.dist();
        if node.raw.is_infinite() || target == 0 {
            return Bitboard::EMPTY;
        }
        let mut preds = Bitboard::EMPTY;
        match node.shape {
            Shape::Sliding => {
                for (k, dir) in ROYAL_DIRS.iter().enumerate() {
                    if node.slide[k].is_infinite() || node.slide[k].dist() != target {
                        continue;
                    }
                    let mut acc = 0;
                    let mut cur = sq;
                    while let Some(m) = dir.inv().step(cur) {
                        let sug = self.suggestion(pid, m);
                        if !sug.is_infinite() && sug.dist() + acc == target {
                            preds.set(m);
                        }
                        if m == p.sq {
                            break;
                        }
                        if self.other_color_at(pid, m) == Some(p.color) {
                            acc += self.penalties[m.index()].max(1);
                        }
                        if acc >= target {
                            break;
                        }
                        cur = m;
                    }
                }
            }
            Shape::OneHop | Shape::Pawn => {
                for back in &node.back {
                    let cand = self.candidate(pid, back.sq, Link { sq, kind: back.kind });
                    if !cand.is_infinite() && cand.dist() == target {
                        preds.set(back.sq);
                    }
                }
            }
        }
        preds
    }

    fn is_reasonable_pred(&self, pid: PieceId, sq: Coord) -> bool {
        let d = self.derived_distance(pid, sq);
        d.is_unconditional() && !d.has_no_go()
    }

    /// Predecessors on shortest paths without conditions and unsafe squares, or all the
    /// predecessors if there are no such ones
    pub(crate) fn reasonable_preds(&self, pid: PieceId, sq: Coord) -> Bitboard {
        let preds = self.lp(pid).node(sq).preds;
        let good = Bitboard::collect(|c| preds.has(c) && self.is_reasonable_pred(pid, c));
        if good.is_empty() {
            preds
        } else {
            good
        }
    }

    /// Recomputes the predecessors of dirty nodes and the first moves of all nodes
    pub(crate) fn refresh_paths(&mut self) {
        self.stale_vacate_conditions();
        for pid in self.live_ids() {
            for sq in Coord::iter() {
                if self.lp(pid).node(sq).paths_dirty {
                    let preds = self.compute_predecessors(pid, sq);
                    let node = self.lp_mut(pid).node_mut(sq);
                    node.preds = preds;
                    node.paths_dirty = false;
                }
            }

            let mut order: Vec<Coord> = Coord::iter()
                .filter(|&sq| !self.lp(pid).node(sq).raw.is_infinite())
                .collect();
            order.sort_by_key(|&sq| self.lp(pid).node(sq).raw.dist());
            for sq in order {
                let dist = self.lp(pid).node(sq).raw.dist();
                let first_moves = match dist {
                    0 => Bitboard::EMPTY,
                    1 => Bitboard::from_coord(sq),
                    _ => {
                        let mut fm = Bitboard::EMPTY;
                        for pred in self.reasonable_preds(pid, sq) {
                            fm |= self.lp(pid).node(pred).first_moves;
                        }
                        fm
                    }
                };
                self.lp_mut(pid).node_mut(sq).first_moves = first_moves;
            }
        }
    }

    /// Reports settled distances that wait for an empty square to be vacated
    ///
    /// Returns the number of such distances.
    pub(crate) fn stale_vacate_conditions(&self) -> usize {
        let mut count = 0;
        for p in self.pieces() {
            for sq in Coord::iter() {
                let raw = &p.node(sq).raw;
                if raw.is_infinite() || raw.dist() > self.config.max_hops {
                    continue;
                }
                for cond in raw.conditions() {
                    let Some(from) = cond.from else {
                        continue;
                    };
                    if self.occupant[from.index()].is_none() {
                        warn!(
                            "{} to {}: condition {} names an empty square",
                            p.id, sq, cond
                        );
                        count += 1;
                    }
                }
            }
        }
        count
    }

    /// Predecessors of piece `pid` on `sq`, as computed after the last move
    pub fn predecessors(&self, sq: Coord, pid: PieceId) -> Vec<Coord> {
        match self.piece(pid) {
            Some(p) => p.node(sq).preds.into_iter().collect(),
            None => Vec::new(),
        }
    }

    /// First moves of piece `pid` on reasonable shortest paths to `sq`
    pub fn first_moves_to(&self, sq: Coord, pid: PieceId) -> Vec<Coord> {
        match self.piece(pid) {
            Some(p) => p.node(sq).first_moves.into_iter().collect(),
            None => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::board::Board;
    use crate::config::Config;
    use crate::distance::Condition;
    use crate::raw::RawBoard;
    use crate::types::{Color, Coord};
    use std::str::FromStr;

    fn c(s: &str) -> Coord {
        Coord::from_str(s).unwrap()
    }

    #[test]
    fn test_knight_distances() {
        let board = Board::from_fen("4k3/8/8/8/8/8/8/N3K3 w - - 0 1").unwrap();
        let knight = board.piece_at(c("a1")).unwrap();
        assert_eq!(board.distance_to(c("b3"), knight).dist(), 1);
        assert_eq!(board.distance_to(c("c2"), knight).dist(), 1);
        assert_eq!(board.distance_to(c("a2"), knight).dist(), 3);
        assert_eq!(board.distance_to(c("b2"), knight).dist(), 4);
        assert_eq!(board.distance_to(c("a1"), knight).dist(), 0);
        let mut preds = board.predecessors(c("d4"), knight);
        preds.sort_by_key(|c| c.index());
        assert_eq!(preds, vec![c("b3"), c("c2")]);
        let mut fm = board.first_moves_to(c("d4"), knight);
        fm.sort_by_key(|c| c.index());
        assert_eq!(fm, vec![c("b3"), c("c2")]);
    }

    #[test]
    fn test_stale_vacate_condition() {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut board = Board::initial();
        for mv in ["e2e4", "e7e5", "f1c4", "b8c6"] {
            board.apply_uci(mv).unwrap();
        }
        assert_eq!(board.stale_vacate_conditions(), 0);

        let rook = board.piece_at(c("h1")).unwrap();
        let node = board.lp_mut(rook).node_mut(c("h3"));
        assert!(!node.raw.is_infinite());
        node.raw.add_condition(Condition::vacate(c("e2"), Color::White));
        assert_eq!(board.stale_vacate_conditions(), 1);
    }

    #[test]
    fn test_blocked_slider() {
        let raw = RawBoard::from_fen("4k3/8/8/8/8/8/P7/R3K3 w - - 0 1").unwrap();
        let board = Board::with_config(raw, Config::default()).unwrap();
        let rook = board.piece_at(c("a1")).unwrap();
        let a2 = board.distance_to(c("a2"), rook);
        assert!(a2.dist() > 1);
        let a3 = board.raw_distance_to(c("a3"), rook);
        assert_eq!(a3.dist(), 2);
        assert_eq!(a3.nr_of_conditions(), 1);
        assert_eq!(a3.conditions()[0].from, Some(c("a2")));
        assert_eq!(board.distance_to(c("d1"), rook).dist(), 1);
        assert!(board.distance_to(c("e1"), rook).dist() >= 2);
    }

    #[test]
    fn test_pawn_distances() {
        let board = Board::from_fen("4k3/8/8/8/8/3p4/4P3/4K3 w - - 0 1").unwrap();
        let pawn = board.piece_at(c("e2")).unwrap();
        assert_eq!(board.distance_to(c("e4"), pawn).dist(), 1);
        assert_eq!(board.distance_to(c("e8"), pawn).dist(), 5);
        let d3 = board.distance_to(c("d3"), pawn);
        assert_eq!(d3.dist(), 1);
        assert!(d3.is_unconditional());
        let f3 = board.distance_to(c("f3"), pawn);
        assert_eq!(f3.dist(), 1);
        assert!(!f3.is_unconditional());
        assert!(board.distance_to(c("e1"), pawn).is_infinite());
        assert!(board.distance_to(c("a4"), pawn).is_infinite());
    }
}
