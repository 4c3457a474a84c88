//! Static position evaluation at increasing levels of insight

use crate::board::Board;
use crate::eval;
use crate::types::{Color, Coord};

/// Number of insight levels understood by [`Board::position_evaluation()`]
pub const INSIGHT_LEVELS: u32 = 11;

const CP_PER_MOBILITY_SQUARE: i32 = 4;
const CP_PER_ATTACK: i32 = 4;

impl Board {
    /// Evaluates the position in centipawns, positive values favour White
    ///
    /// Level 0 is only the side to move (`+1` or `-1`, or the result of a finished game).
    /// Level 1 is the material sum. All the higher levels add one more term to the material:
    /// basic mobility (2), best clashes (3), weighted mobility (4), attacks on the opponent
    /// side (5), attacks around the opponent king (6), defence around the own king (7), a mix
    /// of the terms 3 to 7 (8) and the evaluation of the best move (9 and 10). Levels beyond
    /// the last one are treated as the last one.
    ///
    /// # Example
    ///
    /// ```
    /// # use tideval::board::Board;
    /// #
    /// let board = Board::initial();
    /// assert_eq!(board.position_evaluation(0), 1);
    /// assert_eq!(board.position_evaluation(1), 0);
    /// ```
    pub fn position_evaluation(&self, level: u32) -> i32 {
        let level = level.min(INSIGHT_LEVELS - 1);
        if level == 0 {
            return self.game_state_evaluation();
        }
        let material = self.material_sum();
        let term = match level {
            1 => 0,
            2 => self.basic_mobility(),
            3 => self.max_clashes(),
            4 => self.weighted_mobility(),
            5 => self.opponent_side_attack(),
            6 => self.opponent_king_area_attack(),
            7 => self.own_king_area_defence(),
            8 => self.mixed_terms(),
            9 => self.best_move_term(),
            _ => self.best_move_term() + self.best_move_outlook(),
        };
        material + term
    }

    fn game_state_evaluation(&self) -> i32 {
        let side = self.side();
        if self.legal_move_count(side) == 0 && self.is_check(side) {
            return eval::checkmate_of(side);
        }
        if self.is_game_over() {
            return 0;
        }
        side.sign()
    }

    fn material_sum(&self) -> i32 {
        self.pieces().map(|p| p.value()).sum()
    }

    fn basic_mobility(&self) -> i32 {
        let mut per_hop = [0_i32; 3];
        for p in self.pieces() {
            for (sum, &m) in per_hop.iter_mut().zip(p.mobility().iter()) {
                *sum += p.color().sign() * m as i32 * CP_PER_MOBILITY_SQUARE;
            }
        }
        let mut res = per_hop[0];
        for (i, &v) in per_hop.iter().enumerate().skip(1) {
            res += v >> (i + 1);
        }
        res * 9 / 10
    }

    fn weighted_mobility(&self) -> i32 {
        self.pieces()
            .map(|p| {
                let m: i32 = p
                    .mobility()
                    .iter()
                    .take(3)
                    .enumerate()
                    .map(|(i, &m)| (m as i32) >> i)
                    .sum();
                p.color().sign() * m * CP_PER_MOBILITY_SQUARE
            })
            .sum()
    }

    /// The side to move wins its best clash or prevents the opponent's one
    fn max_clashes(&self) -> i32 {
        let mut white_best: Option<i32> = None;
        let mut black_best: Option<i32> = None;
        for p in self.pieces() {
            let clash = self.square(p.sq()).clash_eval();
            match p.color() {
                Color::White => black_best = Some(black_best.map_or(clash, |b| b.min(clash))),
                Color::Black => white_best = Some(white_best.map_or(clash, |w| w.max(clash))),
            }
        }
        let w = white_best.unwrap_or(0);
        let b = black_best.unwrap_or(0);
        match self.side() {
            Color::White if w > -b => w + b / 2,
            Color::White => w / 4,
            Color::Black if w < -b => w / 2 + b,
            Color::Black => b / 4,
        }
    }

    fn attacks_value(&self, sq: Coord, c: Color) -> i32 {
        self.square(sq).direct_attacks(c) as i32 * CP_PER_ATTACK
    }

    fn opponent_side_attack(&self) -> i32 {
        let mut sum = 0;
        for sq in Coord::iter() {
            let progress = sq.rank().progress(Color::White);
            if progress >= 5 {
                let weight = if progress >= 6 { 2 } else { 1 };
                sum += self.attacks_value(sq, Color::White) * weight;
            }
            if progress <= 2 {
                let weight = if progress <= 1 { 2 } else { 1 };
                sum -= self.attacks_value(sq, Color::Black) * weight;
            }
        }
        sum
    }

    fn king_zones(&self, attacker: Color, defender: Color) -> [i32; 4] {
        let king = self.king_pos(defender);
        let mut sum = [0; 4];
        for sq in Coord::iter() {
            let d = sq.king_distance(king);
            if d < 4 {
                sum[d] += self.attacks_value(sq, attacker);
            }
        }
        sum
    }

    fn opponent_king_area_attack(&self) -> i32 {
        let w = self.king_zones(Color::White, Color::Black);
        let b = self.king_zones(Color::Black, Color::White);
        (w[1] - b[1]) * 2 + (w[2] - b[2]) + (w[3] - b[3]) / 3
    }

    fn own_king_area_defence(&self) -> i32 {
        let w = self.king_zones(Color::White, Color::White);
        let b = self.king_zones(Color::Black, Color::Black);
        (w[1] - b[1]) + (w[2] - b[2]) + (w[3] - b[3]) / 4
    }

    fn mixed_terms(&self) -> i32 {
        self.max_clashes() * 6 / 5
            + self.weighted_mobility()
            + self.opponent_side_attack()
            + self.opponent_king_area_attack()
            + self.own_king_area_defence()
    }

    fn best_move_term(&self) -> i32 {
        self.best_move_evaluation().map_or(0, |e| e.at(0) / 10)
    }

    fn best_move_outlook(&self) -> i32 {
        self.best_move_evaluation().map_or(0, |e| e.at(1) / 32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symmetric_start() {
        let board = Board::initial();
        assert_eq!(board.position_evaluation(1), 0);
        assert_eq!(board.position_evaluation(2), 0);
        assert_eq!(board.position_evaluation(4), 0);
        assert_eq!(board.position_evaluation(5), 0);
        assert_eq!(board.position_evaluation(6), 0);
        assert_eq!(board.position_evaluation(7), 0);
    }

    #[test]
    fn test_material() {
        let board = Board::from_fen("4k3/8/8/8/8/8/8/Q3K3 b - - 0 1").unwrap();
        assert_eq!(board.position_evaluation(0), -1);
        assert_eq!(board.position_evaluation(1), 900);
        assert!(board.position_evaluation(2) > 900);
        assert_eq!(
            board.position_evaluation(100),
            board.position_evaluation(INSIGHT_LEVELS - 1)
        );
    }

    #[test]
    fn test_checkmate() {
        let mut board = Board::initial();
        for mv in ["f2f3", "e7e5", "g2g4", "d8h4"] {
            board.apply_uci(mv).unwrap();
        }
        assert_eq!(board.position_evaluation(0), eval::checkmate_of(Color::White));
    }
}
