//! Move collection and per-piece move evaluation
//!
//! Moves are not generated from scratch. A move of a piece is any square at unconditional
//! distance 1, plus the special moves that the distance graph does not model (castling and
//! en passant). The candidates are then checked against king safety on a copy of the cells.

use crate::board::Board;
use crate::eval::{self, Evaluation, EVAL_TENTH, HORIZONS, NOT_EVALUATED, PAWN_VALUE};
use crate::legal;
use crate::moves::{EvaluatedMove, Move, PromotePiece};
use crate::node::{LinkKind, Shape};
use crate::types::{CastlingSide, Cell, Color, Coord, File, Piece, PieceId};
use tideval_base::geometry;
use tideval_base::Bitboard;

use log::trace;

impl Board {
    /// Number of hops a same-colored piece loses when the piece `pid` must clear its square
    ///
    /// A piece that can step away at once costs one hop, a blocked piece costs two.
    pub(crate) fn moving_away_penalty(&self, pid: PieceId) -> u32 {
        let p = self.lp(pid);
        let free = |sq: Coord| self.color_at(sq) != Some(p.color);
        let can_move = match p.piece {
            Piece::Pawn => p.node(p.sq).links.iter().any(|l| match l.kind {
                LinkKind::Push => self.color_at(l.sq).is_none(),
                LinkKind::Capture => {
                    self.color_at(l.sq) == Some(p.color.inv()) || self.r.ep_dest() == Some(l.sq)
                }
                _ => false,
            }),
            _ => p.node(p.sq).links.iter().any(|l| free(l.sq)),
        };
        match can_move {
            true => 1,
            false => 2,
        }
    }

    fn castling_side_of(&self, pid: PieceId, to: Coord) -> Option<CastlingSide> {
        let p = self.lp(pid);
        let rank = geometry::castling_rank(p.color);
        if p.piece != Piece::King || p.sq != Coord::from_parts(File::E, rank) || to.rank() != rank {
            return None;
        }
        match to.file() {
            File::G => Some(CastlingSide::King),
            File::C => Some(CastlingSide::Queen),
            _ => None,
        }
    }

    fn can_castle(&self, color: Color, side: CastlingSide) -> bool {
        if !self.r.castling.has(color, side) {
            return false;
        }
        let rank = geometry::castling_rank(color);
        let king = Coord::from_parts(File::E, rank);
        let rook = Coord::from_parts(side.rook_files().0, rank);
        if self.r.get(rook) != Cell::from_parts(color, Piece::Rook) {
            return false;
        }
        if geometry::between(king, rook).any(|sq| self.r.get(sq).is_occupied()) {
            return false;
        }
        let pass = Coord::from_parts(side.rook_files().1, rank);
        !legal::is_cell_attacked(&self.r.cells, king, color.inv())
            && !legal::is_cell_attacked(&self.r.cells, pass, color.inv())
    }

    /// Returns `true` if `pid` can move to `to` ignoring the safety of its own king
    pub(crate) fn is_basically_legal_move_to(&self, pid: PieceId, to: Coord) -> bool {
        let p = self.lp(pid);
        if to == p.sq || self.color_at(to) == Some(p.color) {
            return false;
        }
        if let Some(side) = self.castling_side_of(pid, to) {
            return self.can_castle(p.color, side);
        }
        if p.piece == Piece::Pawn && p.color == self.r.side && self.r.ep_dest() == Some(to) {
            let is_capture = p
                .node(p.sq)
                .links
                .iter()
                .any(|l| l.sq == to && l.kind == LinkKind::Capture);
            if is_capture {
                return true;
            }
        }
        let d = self.derived_distance(pid, to);
        d.dist_is_normal() && d.dist() == 1 && d.is_unconditional()
    }

    /// Returns `true` if moving `pid` to `to` does not leave its own king attacked
    pub(crate) fn is_legal_move_to(&self, pid: PieceId, to: Coord) -> bool {
        let p = self.lp(pid);
        let mut cells = self.r.cells;
        if p.piece == Piece::Pawn && p.sq.file() != to.file() && cells[to.index()].is_empty() {
            cells[Coord::from_parts(to.file(), p.sq.rank()).index()] = Cell::EMPTY;
        }
        cells[to.index()] = cells[p.sq.index()];
        cells[p.sq.index()] = Cell::EMPTY;
        let king = match p.piece {
            Piece::King => to,
            _ => self.king_pos(p.color),
        };
        !legal::is_cell_attacked(&cells, king, p.color.inv())
    }

    /// Collects the legal moves of all pieces of both colors
    pub(crate) fn collect_moves(&mut self) {
        for pid in self.live_ids() {
            let (color, piece, from) = {
                let p = self.lp(pid);
                (p.color, p.piece, p.sq)
            };
            let mut targets: Vec<Coord> = Coord::iter()
                .filter(|&sq| {
                    let raw = &self.lp(pid).node(sq).raw;
                    raw.dist_is_normal() && raw.dist() == 1
                })
                .collect();
            if piece == Piece::King {
                let rank = geometry::castling_rank(color);
                targets.push(Coord::from_parts(File::G, rank));
                targets.push(Coord::from_parts(File::C, rank));
            }
            if piece == Piece::Pawn {
                if let Some(ep) = self.r.ep_dest() {
                    if !targets.contains(&ep) {
                        targets.push(ep);
                    }
                }
            }
            let promotes = |to: Coord| {
                piece == Piece::Pawn && to.rank() == geometry::promotion_rank(color)
            };
            let mut moves = Vec::new();
            for to in targets {
                if !self.is_basically_legal_move_to(pid, to) || !self.is_legal_move_to(pid, to) {
                    continue;
                }
                moves.push(match promotes(to) {
                    true => Move::with_promote(from, to, PromotePiece::Queen),
                    false => Move::new(from, to),
                });
            }
            let p = self.lp_mut(pid);
            p.legal_moves.clear();
            for mv in moves {
                if p.legal_moves.try_push(mv).is_err() {
                    log::warn!("move list of piece {} is full", pid);
                    break;
                }
            }
        }
    }

    /// Counts the squares each piece reaches unconditionally per hop count, and remembers the
    /// best relative evaluation among its legal moves
    pub(crate) fn update_mobility(&mut self) {
        let max = self.config.max_hops;
        for pid in self.live_ids() {
            let mut mobility = [0; eval::MAX_HOPS_LIMIT];
            for sq in Coord::iter() {
                let d = self.derived_distance(pid, sq);
                if d.dist_is_normal() && d.dist() >= 1 && d.dist() <= max && d.is_unconditional() {
                    mobility[d.dist() as usize - 1] += 1;
                }
            }
            let p = self.lp(pid);
            let color = p.color;
            let best = p
                .legal_moves
                .iter()
                .map(|m| p.node(m.to).rel_eval)
                .filter(|&e| e != NOT_EVALUATED)
                .reduce(|a, b| eval::max_for(a, b, color));
            let p = self.lp_mut(pid);
            p.mobility = mobility;
            p.best_rel_eval = best;
        }
    }

    /// Returns `true` if the piece `pid` is not lost by standing on its current square
    pub fn is_a_safe_place_to_stay(&self, pid: PieceId) -> bool {
        match self.piece(pid) {
            Some(p) => p.stay_eval == NOT_EVALUATED || eval::is_ok_for(p.stay_eval, p.color, -EVAL_TENTH),
            None => false,
        }
    }

    /// Squares on the reasonable shortest paths of `pid` to `sq`, excluding its own square
    pub fn all_pos_on_way_to(&self, pid: PieceId, sq: Coord) -> Bitboard {
        let mut res = Bitboard::EMPTY;
        let Some(p) = self.piece(pid) else {
            return res;
        };
        if p.node(sq).raw.is_infinite() {
            return res;
        }
        let mut stack = vec![sq];
        while let Some(cur) = stack.pop() {
            if cur == p.sq || res.has(cur) {
                continue;
            }
            res.set(cur);
            stack.extend(self.reasonable_preds(pid, cur));
        }
        res
    }

    /// Evaluates every legal move from the chances of its target, discounts the chances the
    /// move gives up, and keeps the best moves of each piece
    pub(crate) fn evaluate_moves(&mut self) {
        for pid in self.live_ids() {
            let evals: Vec<EvaluatedMove> = {
                let p = self.lp(pid);
                p.legal_moves
                    .iter()
                    .map(|&mv| EvaluatedMove::new(mv, p.node(mv.to).chances.aggregated()))
                    .collect()
            };
            let mapped = self.map_lost_chances(pid, evals);
            let best = self.select_best_moves(pid, &mapped);
            let p = self.lp_mut(pid);
            p.move_evals = mapped;
            p.best_moves = best;
        }
    }

    /// Subtracts from every move the best of the chances that only the other moves keep
    ///
    /// Moves of a slider along the same axis do not exclude each other. If the home square is
    /// safe, the lost chances are only delayed by one move.
    fn map_lost_chances(&self, pid: PieceId, moves: Vec<EvaluatedMove>) -> Vec<EvaluatedMove> {
        let p = self.lp(pid);
        let color = p.color;
        let safe_back = self.is_a_safe_place_to_stay(pid);
        let mut res = Vec::with_capacity(moves.len());
        for (i, m) in moves.iter().enumerate() {
            let axis = geometry::direction(p.sq, m.to());
            let mut omax = Evaluation::ZERO;
            for (j, o) in moves.iter().enumerate() {
                if i == j {
                    continue;
                }
                if Shape::of(p.piece) == Shape::Sliding {
                    let o_axis = geometry::direction(p.sq, o.to());
                    if let (Some(a), Some(b)) = (axis, o_axis) {
                        if a.is_on_same_axis(b) {
                            continue;
                        }
                    }
                }
                omax = omax.max_for(&o.eval, color);
                let contrib = p.node(o.to()).clash_contrib;
                omax[0] = eval::max_for(omax[0], contrib, color);
            }
            let away = p.move_away.get(m.to()).copied().unwrap_or_default();
            let mut mapped = m.eval;
            for h in 0..HORIZONS {
                let mut v = mapped[h] - omax[h];
                if h > 0 && safe_back {
                    v += omax[h - 1];
                }
                mapped[h] = v + away[h];
            }
            res.push(EvaluatedMove::new(m.mv, mapped));
        }
        res
    }

    /// Correction for a capture: the beaten piece can no longer make its own best move
    fn beaten_piece_correction(&self, pid: PieceId, to: Coord) -> i32 {
        let Some(beaten) = self.occupant[to.index()] else {
            return 0;
        };
        let b = self.lp(beaten);
        if b.color == self.lp(pid).color {
            return 0;
        }
        match b.best_rel_eval {
            Some(best) if eval::is_better_for(best, 0, b.color) => {
                -(best - b.node(self.lp(pid).sq).clash_contrib)
            }
            _ => 0,
        }
    }

    /// Returns `true` if `a` should be ranked above `b` for `color`
    ///
    /// The first horizons must differ by more than a pawn to decide alone. Otherwise a quarter
    /// of this threshold is tried, and finally the lexicographic comparison with a tolerance.
    pub(crate) fn is_better_move(a: &Evaluation, b: &Evaluation, color: Color) -> bool {
        let mut threshold = PAWN_VALUE;
        while threshold > EVAL_TENTH {
            if a.is_better_than(b, color, threshold) {
                return true;
            }
            if b.is_better_than(a, color, threshold) {
                return false;
            }
            threshold /= 4;
        }
        a.is_better_than(b, color, EVAL_TENTH)
    }

    fn select_best_moves(&self, pid: PieceId, moves: &[EvaluatedMove]) -> Vec<EvaluatedMove> {
        let color = self.lp(pid).color;
        let mut ranked: Vec<EvaluatedMove> = Vec::with_capacity(moves.len());
        for m in moves {
            let mut m = *m;
            m.eval[0] += self.beaten_piece_correction(pid, m.to());
            let pos = ranked
                .iter()
                .position(|r| Self::is_better_move(&m.eval, &r.eval, color))
                .unwrap_or(ranked.len());
            ranked.insert(pos, m);
        }
        ranked.truncate(self.config.best_moves_per_piece);
        for m in &ranked {
            trace!("best move candidate of {}: {}", pid, m);
        }
        ranked
    }
}
