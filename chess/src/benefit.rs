//! Chances
//!
//! Benefits are attached to the nodes where they become realizable. From there they are
//! reflected onto the opponent pieces that can counter or block them, and finally
//! consolidated backwards along the shortest paths until they reach the first moves.

use crate::board::Board;
use crate::eval::{self, EVAL_HALF_PAWN, EVAL_TENTH, NOT_EVALUATED};
use crate::legal;
use crate::types::{CastlingSide, Cell, Color, Coord, Piece, PieceId};
use tideval_base::geometry;
use tideval_base::Bitboard;

use log::trace;

/// Shifts a signed benefit right, rounding towards zero
fn shr(val: i32, n: u32) -> i32 {
    if n >= 31 {
        return 0;
    }
    match val >= 0 {
        true => val >> n,
        false => -((-val) >> n),
    }
}

impl Board {
    /// Records `benefit` on the node of `pid` at `sq`, without any side effects
    pub(crate) fn add_raw_chance(
        &mut self,
        pid: PieceId,
        sq: Coord,
        benefit: i32,
        fl: usize,
        target: Coord,
    ) {
        if benefit == 0 {
            return;
        }
        self.lp_mut(pid).node_mut(sq).chances.add(benefit, fl, target);
    }

    /// Adds `benefit` for moving piece `pid` to `sq`, and gives the opponent pieces chances
    /// to counter it
    ///
    /// Opponent pieces that can come to defend `sq` in time get a part of the benefit as a
    /// counter chance. Opponent pieces that can step into the way of the first move get a
    /// blocking chance.
    pub(crate) fn add_chance(
        &mut self,
        pid: PieceId,
        sq: Coord,
        benefit: i32,
        fl: usize,
        target: Coord,
    ) {
        self.add_raw_chance(pid, sq, benefit, fl, target);
        let (color, origin, piece) = {
            let p = self.lp(pid);
            (p.color, p.sq, p.piece)
        };
        if !eval::is_ok_for(benefit, color, 0) || benefit == 0 {
            return;
        }
        let node = self.lp(pid).node(sq);
        if node.raw.is_infinite() {
            return;
        }
        let in_fl = match fl {
            0 => node.std_future_level(),
            _ => node.attacking_future_level_plus_one(),
        };
        let my_dist = node.raw.dist();
        let first_moves = node.first_moves;
        let conds = node.raw.conditions().to_vec();

        let mut counter = shr(-benefit, 1);
        if node.raw.count_help_needed_from_except(color.inv(), origin) > 0 {
            counter = shr(counter, 3);
        }
        if in_fl <= 1 && conds.len() == 1 {
            if let Some(blocker) = conds[0].from.and_then(|f| self.occupant[f.index()]) {
                if self.lp(blocker).color == color.inv() {
                    self.add_move_away_chance_to_all_moves(blocker, shr(benefit, 1), target);
                }
            }
        }

        if self.occupant[sq.index()].is_none() {
            self.add_counter_chances(pid, sq, counter, in_fl, my_dist, piece, target);
        }

        if in_fl <= 4 {
            let mut blocking = shr(-benefit, 2);
            if in_fl >= 3 {
                blocking = shr(blocking, in_fl as u32 - 1);
            }
            for fm in first_moves {
                let n = self.add_benefit_to_blockers(origin, fm, fl, blocking, target);
                trace!("{} blockers between {} and {}", n, origin, fm);
            }
        }
    }

    /// Gives the opponents of `pid` chances to cover the empty square `sq` in time
    #[allow(clippy::too_many_arguments)]
    fn add_counter_chances(
        &mut self,
        pid: PieceId,
        sq: Coord,
        counter: i32,
        in_fl: usize,
        my_dist: u32,
        piece: Piece,
        target: Coord,
    ) {
        let color = self.lp(pid).color;
        let max = self.config.max_hops as usize;
        let mut my_attacks = self.squares[sq.index()].attacks[color.index()];
        if self.cover_or_attack_distance(pid, sq) == 1 {
            my_attacks = my_attacks.saturating_sub(1);
        }
        let opp_defends = self.squares[sq.index()].attacks[color.inv().index()];

        for oid in self.live_ids() {
            let o = self.lp(oid);
            if o.color == color || self.cover_or_attack_distance(oid, sq) <= 1 {
                continue;
            }
            if o.node(sq).raw.is_infinite() {
                continue;
            }
            let last_conditional = !o.node(sq).raw.is_unconditional();
            let is_king = o.piece == Piece::King;
            let mut lmos: Vec<(Coord, i32)> = Vec::new();
            for lmo in self.reasonable_preds(oid, sq) {
                if o.piece == Piece::Pawn && lmo.file() == sq.file() {
                    continue;
                }
                let lmo_node = o.node(lmo);
                let lmo_dist = lmo_node.raw.dist();
                let defend_fl = lmo_node.std_future_level();
                if defend_fl > max + 1
                    || (my_dist as usize) + 3 < lmo_dist as usize
                    || defend_fl > in_fl + 1
                {
                    continue;
                }
                let mut c = counter;
                if opp_defends >= my_attacks {
                    c = shr(c, 2);
                }
                if last_conditional {
                    c = shr(c, 2);
                }
                if my_dist < lmo_dist {
                    c = shr(c, 1);
                }
                let d = self.derived_distance(oid, lmo);
                match d.no_go() {
                    Some(ng) if ng == lmo => c = shr(c, 2),
                    Some(_) => c = shr(c, 1),
                    None => {}
                }
                if is_king {
                    if lmo_dist > 1 || piece == Piece::Queen {
                        continue;
                    }
                    c = shr(c, 1);
                }
                let final_fl = in_fl as i64 - 1 - defend_fl as i64;
                if final_fl < 0 {
                    c /= 3 + final_fl.unsigned_abs() as i32;
                } else if final_fl > 0 {
                    c = shr(c, final_fl as u32);
                }
                lmos.push((lmo, c));
            }
            for (lmo, c) in lmos {
                let defend_fl = self.lp(oid).node(lmo).std_future_level();
                let final_fl = in_fl.saturating_sub(1).max(defend_fl);
                trace!("counter {} for {} on {} against {}", c, oid, lmo, target);
                self.add_raw_chance(oid, lmo, c, final_fl, target);
                let immediate = shr(c, 3) / (1 + final_fl.saturating_sub(defend_fl) as i32);
                self.add_raw_chance(oid, lmo, immediate, defend_fl, target);
            }
        }
    }

    /// Returns `true` if `bid` can reasonably step onto `pos` to block a line
    fn is_reasonable_blocker(&self, bid: PieceId, pos: Coord) -> bool {
        let b = self.lp(bid);
        if b.piece == Piece::King || pos == b.sq {
            return false;
        }
        let d = self.derived_distance(bid, pos);
        if d.is_infinite() || d.dist() == 0 || d.dist() > 2 {
            return false;
        }
        if !d.is_unconditional() || d.has_no_go() {
            return false;
        }
        match b.pin {
            Some(pin) => geometry::direction(b.sq, pos).map_or(false, |dir| dir.is_on_same_axis(pin)),
            None => true,
        }
    }

    /// Gives opponent pieces chances to step into the way from `from` to `to`
    ///
    /// Blocking is possible on the squares between both, on `to` itself and by capturing
    /// the piece on `from`. Returns the number of opponent pieces that can block in time.
    pub(crate) fn add_benefit_to_blockers(
        &mut self,
        from: Coord,
        to: Coord,
        fl: usize,
        benefit: i32,
        target: Coord,
    ) -> usize {
        let Some(mover) = self.occupant[from.index()] else {
            return 0;
        };
        let color = self.lp(mover).color;
        let mut positions = vec![from];
        positions.extend(geometry::between(from, to));
        positions.push(to);
        let mut count = 0;
        for bid in self.live_ids() {
            if self.lp(bid).color == color {
                continue;
            }
            let mut blocks = false;
            for &pos in &positions {
                if !self.is_reasonable_blocker(bid, pos) {
                    continue;
                }
                let d = self.lp(bid).node(pos).raw.dist();
                let val = shr(benefit, d - 1);
                self.add_raw_chance(bid, pos, val, fl + d as usize - 1, target);
                blocks = true;
            }
            if blocks {
                count += 1;
            }
        }
        count
    }

    /// Adds `benefit` to the move-away ledger of `pid`, for every move it has
    pub(crate) fn add_move_away_chance_to_all_moves(&mut self, pid: PieceId, benefit: i32, target: Coord) {
        self.add_move_away_chance_to_all_moves_unless_between(pid, benefit, target, None);
    }

    /// Same as [`Board::add_move_away_chance_to_all_moves()`], but skips moves that stay on
    /// the line between the two squares in `keep_between`
    pub(crate) fn add_move_away_chance_to_all_moves_unless_between(
        &mut self,
        pid: PieceId,
        benefit: i32,
        target: Coord,
        keep_between: Option<(Coord, Coord)>,
    ) {
        if benefit == 0 {
            return;
        }
        let p = self.lp_mut(pid);
        let targets: Vec<Coord> = p
            .legal_moves
            .iter()
            .map(|m| m.to)
            .filter(|&to| match keep_between {
                Some((a, b)) => !geometry::is_between(to, a, b),
                None => true,
            })
            .collect();
        for to in targets {
            p.move_away.add(benefit, 0, to);
        }
        trace!("move away {} for {} due to {}", benefit, pid, target);
    }

    /// Adds the immediate gains of all the moves and the material gains further ahead
    pub(crate) fn add_direct_chances(&mut self) {
        for pid in self.live_ids() {
            let (color, piece, moves) = {
                let p = self.lp(pid);
                (p.color, p.piece, p.legal_moves.clone())
            };
            for mv in &moves {
                let rel = self.lp(pid).node(mv.to).rel_eval;
                if rel == NOT_EVALUATED {
                    continue;
                }
                let mut benefit = rel;
                if piece == Piece::Pawn && mv.to.rank() == geometry::promotion_rank(color) {
                    benefit += color.sign() * (Piece::Queen.value() - Piece::Pawn.value());
                }
                self.add_chance(pid, mv.to, benefit, 0, mv.to);
            }
            for sq in Coord::iter() {
                let node = self.lp(pid).node(sq);
                if node.raw.is_infinite() || node.raw.dist() <= 1 || node.rel_eval == NOT_EVALUATED {
                    continue;
                }
                let Some(victim) = self.occupant[sq.index()] else {
                    continue;
                };
                let v = self.lp(victim);
                if v.color == color || v.piece == Piece::King {
                    continue;
                }
                let rel = node.rel_eval;
                if !eval::is_better_for(rel, color.sign() * EVAL_TENTH, color) {
                    continue;
                }
                let fl = node.std_future_level();
                self.add_chance(pid, sq, rel, fl, sq);
            }
        }
    }

    /// Marks the moves giving check and adds a small bonus for them
    pub(crate) fn check_checking_options(&mut self) {
        for pid in self.live_ids() {
            let (color, moves) = {
                let p = self.lp(pid);
                (p.color, p.legal_moves.clone())
            };
            let king = self.king_pos(color.inv());
            let mut checking = Bitboard::EMPTY;
            for mv in &moves {
                let mut cells = self.r.cells;
                cells[mv.to.index()] = cells[mv.from.index()];
                cells[mv.from.index()] = Cell::EMPTY;
                if legal::is_cell_attacked(&cells, king, color) {
                    checking.set(mv.to);
                }
            }
            for to in checking {
                self.add_raw_chance(pid, to, color.sign() * 2 * EVAL_TENTH, 0, king);
            }
            self.lp_mut(pid).checking = checking;
        }
    }

    /// Rewards attacking opponent pieces that have no safe square to go to
    pub(crate) fn check_being_trapped_options(&mut self) {
        let ids = self.live_ids();
        for &tid in &ids {
            let t = self.lp(tid);
            if matches!(t.piece, Piece::King | Piece::Pawn) {
                continue;
            }
            let t_color = t.color;
            let t_sq = t.sq;
            let safe_moves = t
                .legal_moves
                .iter()
                .filter(|m| eval::is_ok_for(t.node(m.to).rel_eval, t_color, -EVAL_TENTH))
                .count();
            if safe_moves > 0 {
                continue;
            }
            let benefit = shr(-t.value(), 1);
            for &aid in &ids {
                let a = self.lp(aid);
                if a.color == t_color || a.node(t_sq).raw.is_infinite() || a.node(t_sq).raw.dist() < 2 {
                    continue;
                }
                let spots: Vec<Coord> = a
                    .node(t_sq)
                    .preds
                    .into_iter()
                    .filter(|&m| {
                        let d = self.derived_distance(aid, m);
                        d.dist() == 1 && d.is_unconditional() && !d.has_no_go()
                    })
                    .collect();
                for m in spots {
                    trace!("{} traps piece on {} via {}", aid, t_sq, m);
                    self.add_raw_chance(aid, m, benefit, 1, t_sq);
                }
            }
        }
    }

    /// Encourages own pieces standing between king and rook to clear the way for castling
    pub(crate) fn add_castling_chances(&mut self) {
        for color in [Color::White, Color::Black] {
            let king = self.king_pos(color);
            for side in [CastlingSide::King, CastlingSide::Queen] {
                if !self.r.castling.has(color, side) {
                    continue;
                }
                let rook = Coord::from_parts(side.rook_files().0, king.rank());
                let blockers: Vec<PieceId> = geometry::between(king, rook)
                    .filter_map(|sq| self.occupant[sq.index()])
                    .filter(|&b| self.lp(b).color == color)
                    .collect();
                for b in blockers {
                    self.add_move_away_chance_to_all_moves_unless_between(
                        b,
                        color.sign() * 2 * EVAL_TENTH,
                        king,
                        Some((king, rook)),
                    );
                }
            }
        }
    }

    /// Moves the chances of every piece backwards along its shortest paths, so each first
    /// move knows what it leads to
    pub(crate) fn consolidate_all_chances(&mut self) {
        for pid in self.live_ids() {
            let color = self.lp(pid).color;
            let mut order: Vec<Coord> = Coord::iter()
                .filter(|&sq| {
                    let raw = &self.lp(pid).node(sq).raw;
                    !raw.is_infinite() && raw.dist() >= 1
                })
                .collect();
            order.sort_by_key(|&sq| std::cmp::Reverse(self.lp(pid).node(sq).raw.dist()));

            for sq in order {
                let nogo = self.derived_distance(pid, sq).has_no_go();
                let node = self.lp_mut(pid).node_mut(sq);
                let future = node.future.clone();
                node.chances.aggregate_in(&future);

                let fork = node.fork.forking_chance();
                if fork.abs() > EVAL_HALF_PAWN {
                    let mut f = fork;
                    if node.killable {
                        f = eval::min_for(f, f + node.price_to_kill, color);
                    }
                    if nogo {
                        f = shr(f, 3);
                    }
                    f = shr(f, node.opponent_help_needed());
                    if eval::is_ok_for(f, color, -EVAL_HALF_PAWN) {
                        let fl = node.std_future_level();
                        node.chances.add(f, fl, sq);
                    }
                }

                let ledger = node.chances.clone();
                let total = ledger.aggregated();
                for pred in self.reasonable_preds(pid, sq) {
                    let pn = self.lp_mut(pid).node_mut(pred);
                    if pn.raw.is_infinite() || pn.raw.dist() < 1 {
                        continue;
                    }
                    pn.future.aggregate_in(&ledger);
                    let at = pn.std_future_level() + 1;
                    pn.fork.offer(total.at(at));
                }
            }
        }
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
    fn test_shr() {
        assert_eq!(shr(100, 1), 50);
        assert_eq!(shr(-100, 2), -25);
        assert_eq!(shr(-3, 1), -1);
        assert_eq!(shr(7, 40), 0);
    }

    #[test]
    fn test_direct_capture_chance() {
        let board = Board::from_fen("4k3/8/8/3r4/8/2N5/8/4K3 w - - 0 1").unwrap();
        let knight = board.piece_at(c("c3")).unwrap();
        let ledger = board.chances_at(c("d5"), knight).unwrap();
        assert_eq!(board.rel_eval(c("d5"), knight), Some(500));
        assert!(ledger.get(c("d5")).unwrap().at(0) >= 500);
        assert!(ledger.aggregated().at(0) >= 500);
    }

    #[test]
    fn test_checking_moves() {
        let board = Board::from_fen("4k3/8/8/8/8/8/8/R3K3 w - - 0 1").unwrap();
        let rook = board.piece_at(c("a1")).unwrap();
        let checking = board.piece(rook).unwrap().checking;
        assert!(checking.has(c("a8")));
        assert!(!checking.has(c("a7")));
        assert_eq!(checking.len(), 1);
    }

    #[test]
    fn test_trapped_piece() {
        let board = Board::from_fen("n3k3/2P5/1P6/P7/8/8/8/4K3 w - - 0 1").unwrap();
        let knight = board.piece_at(c("a8")).unwrap();
        let moves = board.piece(knight).unwrap().legal_moves();
        assert_eq!(moves.len(), 2);
        for m in moves {
            let rel = board.rel_eval(m.to, knight).unwrap();
            assert!(!eval::is_ok_for(rel, Color::Black, -EVAL_TENTH));
        }
        let pawn = board.piece_at(c("b6")).unwrap();
        let ledger = board.chances_at(c("b7"), pawn).unwrap();
        assert!(ledger.get(c("a8")).unwrap().at(1) >= 160);
    }
}
