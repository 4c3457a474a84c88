//! Global move ranking with opponent reply correction

use crate::board::Board;
use crate::eval::{self, Evaluation};
use crate::legal;
use crate::moves::EvaluatedMove;
use crate::types::{Cell, Color, Coord, PieceId};
use tideval_base::geometry;

use log::{debug, trace};

/// Ranked move together with the piece making it
#[derive(Debug, Copy, Clone)]
struct Candidate {
    pid: PieceId,
    em: EvaluatedMove,
}

fn insert_ranked(list: &mut Vec<Candidate>, cand: Candidate, color: Color) {
    let pos = list
        .iter()
        .position(|r| Board::is_better_move(&cand.em.eval, &r.em.eval, color))
        .unwrap_or(list.len());
    list.insert(pos, cand);
}

fn halved(e: &Evaluation) -> Evaluation {
    e.map(|v| v / 2)
}

impl Board {
    fn gather_best_moves(&self, color: Color) -> Vec<Candidate> {
        let mut list = Vec::new();
        for p in self.pieces().filter(|p| p.color == color) {
            for em in &p.best_moves {
                insert_ranked(&mut list, Candidate { pid: p.id, em: *em }, color);
            }
        }
        list.truncate(self.config.best_move_list_len);
        list
    }

    /// Returns `true` if the piece making `mv` attacks `sq` once the move is made
    fn covers_after_move(&self, mv: &Candidate, sq: Coord) -> bool {
        let mut cells = self.r.cells;
        let from = mv.em.from();
        let to = mv.em.to();
        cells[to.index()] = cells[from.index()];
        cells[from.index()] = Cell::EMPTY;
        let color = self.lp(mv.pid).color;
        legal::cell_attackers(&cells, sq, color).contains(&to)
    }

    /// Evaluation of the best opponent reply that survives `mv`, seen from the opponent
    fn best_surviving_reply(&self, mv: &Candidate, replies: &[Candidate]) -> Option<Evaluation> {
        let opp = self.lp(mv.pid).color.inv();
        let captured = self.occupant[mv.em.to().index()];
        let mut surviving: Vec<(Evaluation, bool)> = Vec::new();
        for reply in replies {
            if Some(reply.pid) == captured {
                continue;
            }
            let (rf, rt) = (reply.em.from(), reply.em.to());
            if geometry::is_between(mv.em.to(), rf, rt) || rt == mv.em.from() {
                continue;
            }
            let mut r = reply.em.eval;
            if self.covers_after_move(mv, rt) {
                r = halved(&r);
            }
            let left_behind = self.lp(mv.pid).node(rt).clash_contrib;
            r[0] -= left_behind;
            let checks = self.lp(reply.pid).checking.has(rt);
            let pos = surviving
                .iter()
                .position(|(e, _)| Board::is_better_move(&r, e, opp))
                .unwrap_or(surviving.len());
            surviving.insert(pos, (r, checks));
        }
        let (mut best, checks) = *surviving.first()?;
        if checks {
            if let Some((next, _)) = surviving.get(1) {
                best += &halved(next);
            }
        }
        Some(best)
    }

    /// Ranks the best moves of both sides, correcting each by the best reply of the opponent
    pub(crate) fn rank_moves(&mut self) {
        let lists = [
            self.gather_best_moves(Color::White),
            self.gather_best_moves(Color::Black),
        ];
        for color in [Color::White, Color::Black] {
            let replies = &lists[color.inv().index()];
            let mut ranked = Vec::with_capacity(lists[color.index()].len());
            for cand in &lists[color.index()] {
                let mut corrected = cand.em;
                match self.best_surviving_reply(cand, replies) {
                    Some(reply) => corrected.eval += &reply,
                    None => {
                        if self.lp(cand.pid).checking.has(cand.em.to()) {
                            corrected.eval[0] += eval::checkmate_of(color.inv()) >> 2;
                        } else {
                            corrected.eval = halved(&corrected.eval);
                        }
                    }
                }
                trace!("{} corrected from {} to {}", cand.em.mv, cand.em.eval, corrected.eval);
                insert_ranked(
                    &mut ranked,
                    Candidate {
                        pid: cand.pid,
                        em: corrected,
                    },
                    color,
                );
            }
            debug!("{} ranked moves for {:?}", ranked.len(), color);
            self.ranked[color.index()] = ranked.into_iter().map(|c| c.em).collect();
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
    fn test_ranked_lengths() {
        let board = Board::initial();
        let white = board.evaluated_moves(Color::White);
        assert!(!white.is_empty());
        assert!(white.len() <= board.config().best_move_list_len);
        assert_eq!(board.best_move(), Some(white[0].mv));
    }

    #[test]
    fn test_takes_hanging_queen() {
        let board = Board::from_fen("4k3/8/8/3q4/8/8/3R4/4K3 w - - 0 1").unwrap();
        let best = board.best_move().unwrap();
        assert_eq!(best.from, c("d2"));
        assert_eq!(best.to, c("d5"));
        assert!(board.best_move_evaluation().unwrap().at(0) > 0);
    }

    #[test]
    fn test_halved() {
        let e = Evaluation::filled(9);
        assert_eq!(halved(&e).at(0), 4);
        assert_eq!(halved(&Evaluation::filled(-9)).at(3), -4);
    }
}
