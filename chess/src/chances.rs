//! Chance ledgers
//!
//! A chance is an estimated benefit a piece could obtain, tagged with the future horizon at
//! which it becomes realizable and with the target square it is about. Ledgers merge by
//! target: two ways of achieving the same thing are alternatives (the better one counts),
//! while benefits on different targets are independent and add up.

use crate::eval::{self, Evaluation};
use crate::types::{Color, Coord};

/// Chances of one side, keyed by target square
///
/// # Example
///
/// ```
/// # use tideval::chances::ChanceLedger;
/// # use tideval::{Color, Coord};
/// # use std::str::FromStr;
/// #
/// let e5 = Coord::from_str("e5").unwrap();
/// let d5 = Coord::from_str("d5").unwrap();
///
/// let mut a = ChanceLedger::new(Color::White);
/// a.add(300, 1, e5);
/// let mut b = ChanceLedger::new(Color::White);
/// b.add(200, 1, e5);
/// b.add(100, 1, d5);
///
/// a.aggregate_in(&b);
/// assert_eq!(a.aggregated().at(1), 300 + 100);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChanceLedger {
    color: Color,
    entries: Vec<(Coord, Evaluation)>,
}

impl ChanceLedger {
    pub fn new(color: Color) -> ChanceLedger {
        ChanceLedger {
            color,
            entries: Vec::new(),
        }
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.entries.iter().all(|(_, e)| e.is_zero())
    }

    fn entry_mut(&mut self, target: Coord) -> &mut Evaluation {
        let pos = match self.entries.iter().position(|(t, _)| *t == target) {
            Some(pos) => pos,
            None => {
                self.entries.push((target, Evaluation::ZERO));
                self.entries.len() - 1
            }
        };
        &mut self.entries[pos].1
    }

    /// Adds a benefit to the evaluation of `target`
    ///
    /// Parts added to the same target and horizon through this function accumulate, as they
    /// describe one single way of achieving the benefit.
    pub fn add(&mut self, benefit: i32, horizon: usize, target: Coord) {
        if benefit == 0 {
            return;
        }
        self.entry_mut(target).add_at(benefit, horizon);
    }

    pub fn get(&self, target: Coord) -> Option<&Evaluation> {
        self.entries
            .iter()
            .find(|(t, _)| *t == target)
            .map(|(_, e)| e)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Coord, &Evaluation)> + '_ {
        self.entries.iter().map(|(t, e)| (*t, e))
    }

    /// Merges another ledger into this one
    ///
    /// For targets present in both, the better value per horizon (in the perspective of this
    /// ledger's color) is kept. Targets only present in `other` are copied.
    pub fn aggregate_in(&mut self, other: &ChanceLedger) {
        let color = self.color;
        for (target, eval) in &other.entries {
            match self.entries.iter_mut().find(|(t, _)| t == target) {
                Some((_, mine)) => *mine = mine.max_for(eval, color),
                None => self.entries.push((*target, *eval)),
            }
        }
    }

    /// Sum over all targets
    pub fn aggregated(&self) -> Evaluation {
        let mut res = Evaluation::ZERO;
        for (_, eval) in &self.entries {
            res += eval;
        }
        res
    }

    /// Returns the ledger restricted to the given target
    pub fn filter_target(&self, target: Coord) -> ChanceLedger {
        ChanceLedger {
            color: self.color,
            entries: self
                .entries
                .iter()
                .filter(|(t, _)| *t == target)
                .cloned()
                .collect(),
        }
    }
}

/// Tracks the two best independent future benefits offered at one horizon
///
/// An opponent can parry only one of two simultaneous threats, so the second best one is
/// what a fork is worth in addition.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ForkTracker {
    color: Color,
    best: i32,
    second: i32,
}

impl ForkTracker {
    pub fn new(color: Color) -> ForkTracker {
        ForkTracker {
            color,
            best: 0,
            second: 0,
        }
    }

    pub fn offer(&mut self, benefit: i32) {
        let color = self.color;
        if !eval::is_better_for(benefit, 0, color) {
            return;
        }
        if eval::is_better_for(benefit, self.best, color) {
            self.second = eval::max_for(self.second, self.best, color);
            self.best = benefit;
        } else if eval::is_better_for(benefit, self.second, color) {
            self.second = benefit;
        }
    }

    /// Forking chance: the second best of the offered benefits, or `0`
    pub fn forking_chance(&self) -> i32 {
        self.second
    }
}
