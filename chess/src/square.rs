//! Squares and clash evaluation
//!
//! A clash is the exchange of pieces on one square. Its result is computed with a swap list:
//! both sides capture with their cheapest attacker first, and either side may stop when
//! continuing would lose material.

use crate::board::Board;
use crate::distance::INFINITE;
use crate::eval::{self, EVAL_TENTH, NOT_EVALUATED};
use crate::legal;
use crate::node::LinkKind;
use crate::piece::Task;
use crate::types::{Color, Coord, Piece, PieceId};
use tideval_base::geometry::{self, ROYAL_DIRS};

/// Per-square attack and clash data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Square {
    sq: Coord,
    pub(crate) attacks: [u32; 2],
    pub(crate) future_covers: [u32; 2],
    pub(crate) blocks_check: [bool; 2],
    pub(crate) clash_eval: i32,
    pub(crate) future_clash: i32,
}

impl Square {
    pub(crate) fn new(sq: Coord) -> Square {
        Square {
            sq,
            attacks: [0; 2],
            future_covers: [0; 2],
            blocks_check: [false; 2],
            clash_eval: 0,
            future_clash: 0,
        }
    }

    pub fn sq(&self) -> Coord {
        self.sq
    }

    /// Number of pieces of color `c` attacking or covering this square directly
    pub fn direct_attacks(&self, c: Color) -> u32 {
        self.attacks[c.index()]
    }

    /// Number of pieces of color `c` that can cover this square after one more move
    pub fn future_covers(&self, c: Color) -> u32 {
        self.future_covers[c.index()]
    }

    /// Returns `true` if moving here stops the check against the king of color `c`
    pub fn blocks_check_for(&self, c: Color) -> bool {
        self.blocks_check[c.index()]
    }

    /// Result of the exchange on the occupant of this square, `0` if empty
    pub fn clash_eval(&self) -> i32 {
        self.clash_eval
    }

    pub fn future_clash_eval(&self) -> i32 {
        self.future_clash
    }
}

/// Result of an exchange on one square, in board perspective
///
/// `victim` is the signed value of the piece on the square, `first` is the side that captures
/// first and `attackers` holds the unsigned values of the attackers of each color, cheapest
/// first. A king only captures if nothing can recapture.
///
/// # Example
///
/// ```
/// # use tideval::square::exchange;
/// # use tideval::Color;
/// #
/// // black rook defended by a pawn, attacked by a white knight and bishop
/// let attackers = [vec![320, 330], vec![100]];
/// assert_eq!(exchange(-500, Color::White, &attackers), 500 + 100 - 320);
/// // undefended pawn
/// assert_eq!(exchange(-100, Color::White, &[vec![900], vec![]]), 100);
/// ```
pub fn exchange(victim: i32, first: Color, attackers: &[Vec<i32>; 2]) -> i32 {
    let mut totals = vec![0];
    let mut idx = [0_usize; 2];
    let mut on_square = victim;
    let mut total = 0;
    let mut side = first;
    loop {
        let Some(&val) = attackers[side.index()].get(idx[side.index()]) else {
            break;
        };
        let others_left = idx[side.inv().index()] < attackers[side.inv().index()].len();
        if val >= Piece::King.value() && others_left {
            break;
        }
        idx[side.index()] += 1;
        total -= on_square;
        totals.push(total);
        on_square = side.sign() * val;
        side = side.inv();
    }
    let n = totals.len() - 1;
    if n == 0 {
        return 0;
    }
    let mut v = totals[n];
    for i in (1..n).rev() {
        let capturer = if (i + 1) % 2 == 1 { first } else { first.inv() };
        v = eval::max_for(totals[i], v, capturer);
    }
    eval::max_for(0, v, first)
}

type Attackers = [Vec<(i32, PieceId)>; 2];

fn values_without(att: &Attackers, skip: Option<PieceId>) -> [Vec<i32>; 2] {
    let pick = |v: &Vec<(i32, PieceId)>| {
        v.iter()
            .filter(|(_, pid)| Some(*pid) != skip)
            .map(|(val, _)| *val)
            .collect()
    };
    [pick(&att[0]), pick(&att[1])]
}

impl Board {
    /// Distance in which piece `pid` attacks or covers `sq`, or [`INFINITE`]
    ///
    /// Straight pawn moves never cover. A conditional single hop covers only at distance 2,
    /// as does a king for its own square. A piece pinned to its own king needs two extra hops
    /// for squares off the pin axis.
    pub fn cover_or_attack_distance(&self, pid: PieceId, sq: Coord) -> u32 {
        let Some(p) = self.piece(pid) else {
            return INFINITE;
        };
        if sq == p.sq {
            return if p.piece == Piece::King { 2 } else { INFINITE };
        }
        let node = p.node(sq);
        let mut dist = match p.piece {
            Piece::Pawn => node
                .back
                .iter()
                .filter(|b| b.kind == LinkKind::Capture)
                .map(|b| &p.node(b.sq).raw)
                .filter(|raw| !raw.is_infinite())
                .map(|raw| raw.dist() + 1)
                .min()
                .unwrap_or(INFINITE),
            _ => {
                if node.raw.is_infinite() {
                    INFINITE
                } else if node.raw.dist() == 1 && !node.raw.is_unconditional() {
                    2
                } else {
                    node.raw.dist()
                }
            }
        };
        if dist == INFINITE {
            return INFINITE;
        }
        if let Some(pin) = p.pin {
            let on_axis = geometry::direction(p.sq, sq).map_or(false, |d| d.is_on_same_axis(pin));
            if !on_axis {
                dist += 2;
            }
        }
        if dist > self.config.max_hops {
            return INFINITE;
        }
        dist
    }

    fn update_pins(&mut self) {
        let kings = [self.king_pos(Color::White), self.king_pos(Color::Black)];
        for pid in self.live_ids() {
            let p = self.lp(pid);
            let pin = match p.piece {
                Piece::King => None,
                _ => legal::pin_direction(&self.r.cells, p.sq, kings[p.color.index()]),
            };
            self.lp_mut(pid).pin = pin;
        }
    }

    fn attackers_of(&self, ids: &[PieceId], sq: Coord, max_dist: u32) -> Attackers {
        let mut att: Attackers = [Vec::new(), Vec::new()];
        for &pid in ids {
            let d = self.cover_or_attack_distance(pid, sq);
            if d <= max_dist {
                let p = self.lp(pid);
                att[p.color.index()].push((p.piece.value(), pid));
            }
        }
        att[0].sort_by_key(|(v, _)| *v);
        att[1].sort_by_key(|(v, _)| *v);
        att
    }

    /// Stores a new relative evaluation and requeues propagation if safety flipped
    ///
    /// Changes of at most 2 centipawns are ignored.
    pub(crate) fn set_rel_eval(&mut self, pid: PieceId, sq: Coord, rel: i32, queue: bool) {
        let p = self.lp_mut(pid);
        let color = p.color;
        let origin = p.sq;
        let node = p.node_mut(sq);
        let old = node.rel_eval;
        if old != NOT_EVALUATED && (rel - old).abs() <= 2 {
            return;
        }
        let old_ok = old == NOT_EVALUATED || eval::is_ok_for(old, color, -EVAL_TENTH);
        let new_ok = eval::is_ok_for(rel, color, -EVAL_TENTH);
        node.rel_eval = rel;
        node.killable = !new_ok;
        node.price_to_kill = if new_ok { 0 } else { rel };
        if queue && old_ok != new_ok && !node.raw.is_infinite() && sq != origin {
            let level = node.raw.dist();
            let task = match new_ok {
                true => Task::Propagate(sq),
                false => Task::PropagateReset(sq),
            };
            p.queue.push(level, task);
        }
    }

    /// Recomputes attack counts, clash results, clash contributions and the relative
    /// evaluations of all nodes
    ///
    /// With `queue` set, nodes whose safety flipped requeue their propagation.
    pub(crate) fn update_clash_result_and_rel_evals(&mut self, queue: bool) {
        self.update_pins();
        let ids = self.live_ids();
        for sq in Coord::iter() {
            let att = self.attackers_of(&ids, sq, 1);
            let future = self.attackers_of(&ids, sq, 2);
            let square = &mut self.squares[sq.index()];
            square.attacks = [att[0].len() as u32, att[1].len() as u32];
            square.future_covers = [
                (future[0].len() - att[0].len()) as u32,
                (future[1].len() - att[1].len()) as u32,
            ];

            let occupant = self.occupant[sq.index()];
            let stay = occupant.map(|o| {
                let p = self.lp(o);
                exchange(p.value(), p.color.inv(), &values_without(&att, None))
            });
            self.squares[sq.index()].clash_eval = stay.unwrap_or(0);
            if let (Some(o), Some(stay)) = (occupant, stay) {
                self.lp_mut(o).stay_eval = stay;
            }

            for &pid in &ids {
                let contrib = match (occupant, stay) {
                    (Some(o), Some(stay)) if att.iter().flatten().any(|(_, a)| *a == pid) => {
                        let p = self.lp(o);
                        let without =
                            exchange(p.value(), p.color.inv(), &values_without(&att, Some(pid)));
                        stay - without
                    }
                    _ => 0,
                };
                self.lp_mut(pid).node_mut(sq).clash_contrib = contrib;

                let p = self.lp(pid);
                if p.node(sq).raw.is_infinite() {
                    continue;
                }
                let capture_gain = match occupant {
                    Some(o) if self.lp(o).color != p.color => -self.lp(o).value(),
                    _ => 0,
                };
                let rel = capture_gain
                    + exchange(p.value(), p.color.inv(), &values_without(&att, Some(pid)));
                self.set_rel_eval(pid, sq, rel, queue);
            }
        }
    }

    /// Marks the squares where a move stops a check: the checker's square and the squares
    /// between a sliding checker and the king
    pub(crate) fn mark_check_blocking_squares(&mut self) {
        for square in self.squares.iter_mut() {
            square.blocks_check = [false; 2];
        }
        for c in [Color::White, Color::Black] {
            let king = self.king_pos(c);
            for checker in legal::cell_attackers(&self.r.cells, king, c.inv()) {
                self.squares[checker.index()].blocks_check[c.index()] = true;
                for b in geometry::between(checker, king) {
                    self.squares[b.index()].blocks_check[c.index()] = true;
                }
            }
        }
    }

    /// Counts the direct attacks of the opponent on the squares around each king
    pub(crate) fn count_king_area_attacks(&mut self) {
        for c in [Color::White, Color::Black] {
            let king = self.king_pos(c);
            let area = ROYAL_DIRS
                .iter()
                .filter_map(|d| d.step(king))
                .chain(std::iter::once(king));
            self.king_attacks[c.index()] = area
                .map(|sq| self.squares[sq.index()].attacks[c.inv().index()])
                .sum();
        }
    }

    /// Evaluates the clashes that arise when the pieces one move away join in, and gives
    /// chances to attackers whose approach wins material
    pub(crate) fn calc_future_clashes(&mut self) {
        let ids = self.live_ids();
        for sq in Coord::iter() {
            let Some(o) = self.occupant[sq.index()] else {
                self.squares[sq.index()].future_clash = 0;
                continue;
            };
            let (victim_color, victim_value, victim_piece) = {
                let p = self.lp(o);
                (p.color, p.value(), p.piece)
            };
            let future = self.attackers_of(&ids, sq, 2);
            let fc = exchange(victim_value, victim_color.inv(), &values_without(&future, None));
            self.squares[sq.index()].future_clash = fc;
            if victim_piece == Piece::King {
                continue;
            }
            let stay = self.squares[sq.index()].clash_eval;
            let attacker = victim_color.inv();
            for &pid in &ids {
                if self.lp(pid).color != attacker || self.cover_or_attack_distance(pid, sq) != 2 {
                    continue;
                }
                let without =
                    exchange(victim_value, attacker, &values_without(&future, Some(pid)));
                let gain = fc - without;
                if fc == stay || !eval::is_better_for(gain, attacker.sign() * EVAL_TENTH, attacker) {
                    continue;
                }
                let p = self.lp(pid);
                let spots: Vec<Coord> = p
                    .node(sq)
                    .preds
                    .into_iter()
                    .filter(|&m| {
                        let pn = p.node(m);
                        pn.raw.dist() == 1
                            && pn.raw.is_unconditional()
                            && !self.derived_distance(pid, m).has_no_go()
                    })
                    .collect();
                for m in spots {
                    self.add_chance(pid, m, gain >> 1, 1, sq);
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
    fn test_exchange() {
        assert_eq!(exchange(-100, Color::White, &[vec![], vec![]]), 0);
        // knight takes defended pawn: loses the knight
        assert_eq!(exchange(-100, Color::White, &[vec![320], vec![100]]), 0);
        // queen takes rook defended by bishop, white may stop
        assert_eq!(exchange(-500, Color::White, &[vec![900], vec![330]]), 0);
        // two attackers against one defender
        assert_eq!(
            exchange(-320, Color::White, &[vec![100, 500], vec![330]]),
            320
        );
        // black wins a bishop for a knight and stops
        assert_eq!(
            exchange(330, Color::Black, &[vec![100, 100], vec![320, 500]]),
            -10
        );
        // king cannot capture a defended piece
        assert_eq!(exchange(-100, Color::White, &[vec![2000], vec![330]]), 0);
        assert_eq!(exchange(-100, Color::White, &[vec![2000], vec![]]), 100);
    }

    #[test]
    fn test_clash_on_board() {
        let board = Board::from_fen("4k3/8/8/3p4/8/2N5/8/4K3 w - - 0 1").unwrap();
        let d5 = board.square(c("d5"));
        assert_eq!(d5.direct_attacks(Color::White), 1);
        assert_eq!(d5.direct_attacks(Color::Black), 0);
        assert_eq!(d5.clash_eval(), 100);
        let knight = board.piece_at(c("c3")).unwrap();
        assert_eq!(board.rel_eval(c("d5"), knight), Some(100));
        assert_eq!(board.cover_or_attack_distance(knight, c("d5")), 1);
    }

    #[test]
    fn test_future_clash_chances() {
        let board = Board::from_fen("7k/8/8/3n4/8/8/8/K4B2 w - - 0 1").unwrap();
        let d5 = board.square(c("d5"));
        assert_eq!(d5.clash_eval(), 0);
        assert_eq!(d5.future_clash_eval(), 320);
        let bishop = board.piece_at(c("f1")).unwrap();
        assert_eq!(board.cover_or_attack_distance(bishop, c("d5")), 2);
        for spot in ["c4", "g2"] {
            let chances = board.chances_at(c(spot), bishop).unwrap();
            assert!(chances.get(c("d5")).is_some(), "{}", spot);
        }
    }

    #[test]
    fn test_king_area_attacks() {
        let board = Board::from_fen("4k3/8/8/8/8/8/8/3RK3 w - - 0 1").unwrap();
        assert_eq!(board.king_area_attacks(Color::Black), 2);
        assert_eq!(board.king_area_attacks(Color::White), 0);
    }

    #[test]
    fn test_pinned_cover() {
        let board = Board::from_fen("4r1k1/8/8/8/8/8/4N3/4K3 w - - 0 1").unwrap();
        let knight = board.piece_at(c("e2")).unwrap();
        assert_eq!(board.cover_or_attack_distance(knight, c("c3")), 3);
        assert_eq!(board.square(c("c3")).direct_attacks(Color::White), 0);
    }
}
