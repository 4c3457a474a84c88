//! Conditional distances
//!
//! A [`ConditionalDistance`] tells in how many hops a piece can reach a square, and which
//! preconditions must hold for this to be possible.

use crate::types::{Color, Coord};

use std::cmp::Ordering;
use std::fmt;

/// Hop count of an unreachable square
pub const INFINITE: u32 = u32::MAX;

/// Precondition for a path to be real
///
/// `from` names a square whose occupant must move away, `to` names a square some piece must
/// move onto, and `side` tells which side has to make that move. At least one of `from` and
/// `to` is set.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Condition {
    pub from: Option<Coord>,
    pub to: Option<Coord>,
    pub side: Color,
}

impl Condition {
    /// Occupant of `sq` of color `side` must vacate it
    pub const fn vacate(sq: Coord, side: Color) -> Condition {
        Condition {
            from: Some(sq),
            to: None,
            side,
        }
    }

    /// Some piece of color `side` must come to `sq`
    pub const fn arrive(sq: Coord, side: Color) -> Condition {
        Condition {
            from: None,
            to: Some(sq),
            side,
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        match self.from {
            Some(c) => write!(f, "{}", c)?,
            None => write!(f, "?")?,
        }
        write!(f, "-")?;
        match self.to {
            Some(c) => write!(f, "{}", c)?,
            None => write!(f, "?")?,
        }
        write!(f, "{}", self.side)
    }
}

/// Hop count with preconditions and an optional unsafe marker
///
/// Distances are ordered primarily by hop count, then by number of conditions, then by the
/// presence of the unsafe marker (see [`ConditionalDistance::cmp_dist()`]).
///
/// # Example
///
/// ```
/// # use tideval::distance::{Condition, ConditionalDistance};
/// # use tideval::{Color, Coord};
/// # use std::str::FromStr;
/// #
/// let a2 = Coord::from_str("a2").unwrap();
/// let mut d = ConditionalDistance::with_hops(3);
/// let mut via_pawn = ConditionalDistance::with_hops(2);
/// via_pawn.add_condition(Condition::vacate(a2, Color::White));
///
/// assert!(d.reduce_if_smaller(&via_pawn));
/// assert_eq!(d.dist(), 2);
/// assert!(!d.is_unconditional());
///
/// // same hop count without conditions is still closer
/// assert!(d.reduce_if_smaller(&ConditionalDistance::with_hops(2)));
/// assert!(d.is_unconditional());
/// ```
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ConditionalDistance {
    hops: u32,
    conds: Vec<Condition>,
    no_go: Option<Coord>,
}

impl ConditionalDistance {
    /// Returns an unreachable distance
    pub fn infinite() -> ConditionalDistance {
        ConditionalDistance {
            hops: INFINITE,
            conds: Vec::new(),
            no_go: None,
        }
    }

    pub fn zero() -> ConditionalDistance {
        Self::with_hops(0)
    }

    pub fn with_hops(hops: u32) -> ConditionalDistance {
        ConditionalDistance {
            hops,
            conds: Vec::new(),
            no_go: None,
        }
    }

    #[inline]
    pub fn dist(&self) -> u32 {
        self.hops
    }

    #[inline]
    pub fn is_infinite(&self) -> bool {
        self.hops == INFINITE
    }

    /// Returns `true` if the distance is finite
    #[inline]
    pub fn dist_is_normal(&self) -> bool {
        self.hops != INFINITE
    }

    #[inline]
    pub fn is_unconditional(&self) -> bool {
        self.conds.is_empty()
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conds
    }

    pub fn nr_of_conditions(&self) -> usize {
        self.conds.len()
    }

    pub fn no_go(&self) -> Option<Coord> {
        self.no_go
    }

    pub fn has_no_go(&self) -> bool {
        self.no_go.is_some()
    }

    /// Returns `true` if any condition requires a move by `side`
    pub fn needs_help_from(&self, side: Color) -> bool {
        self.conds.iter().any(|c| c.side == side)
    }

    /// Counts the conditions requiring a move by `side`, except a vacating move from `except`
    pub fn count_help_needed_from_except(&self, side: Color, except: Coord) -> u32 {
        self.conds
            .iter()
            .filter(|c| c.side == side && c.from != Some(except))
            .count() as u32
    }

    /// Counts the conditions requiring a move by `side`
    pub fn count_help_needed_from(&self, side: Color) -> u32 {
        self.conds.iter().filter(|c| c.side == side).count() as u32
    }

    /// Adds `n` hops
    ///
    /// An infinite distance stays infinite.
    pub fn inc(&mut self, n: u32) {
        if self.hops != INFINITE {
            self.hops = self.hops.saturating_add(n).min(INFINITE);
        }
    }

    /// Appends a precondition
    ///
    /// Conditions that are already present are not duplicated. Adding a condition to an
    /// infinite distance does nothing.
    pub fn add_condition(&mut self, cond: Condition) {
        if self.hops == INFINITE || self.conds.contains(&cond) {
            return;
        }
        self.conds.push(cond);
    }

    /// Marks the path as landing on a tactically unsound square
    ///
    /// Only one square is kept: a later marking replaces an earlier one.
    pub fn mark_unsafe(&mut self, sq: Coord) {
        if self.hops != INFINITE {
            self.no_go = Some(sq);
        }
    }

    /// Compares by hop count, then number of conditions, then the unsafe marker
    pub fn cmp_dist(&self, other: &ConditionalDistance) -> Ordering {
        self.hops
            .cmp(&other.hops)
            .then(self.conds.len().cmp(&other.conds.len()))
            .then(self.no_go.is_some().cmp(&other.no_go.is_some()))
    }

    pub fn is_smaller_than(&self, other: &ConditionalDistance) -> bool {
        self.cmp_dist(other) == Ordering::Less
    }

    /// Replaces this distance by `other` if `other` is strictly smaller
    ///
    /// Returns `true` if the value changed. Never increases the stored distance.
    pub fn reduce_if_smaller(&mut self, other: &ConditionalDistance) -> bool {
        if other.is_smaller_than(self) {
            *self = other.clone();
            return true;
        }
        false
    }

    /// Returns a copy of this distance, capped to `max_hops`
    ///
    /// Distances beyond the horizon become infinite.
    pub fn capped(mut self, max_hops: u32) -> ConditionalDistance {
        if self.hops != INFINITE && self.hops > max_hops {
            self = Self::infinite();
        }
        self
    }
}

impl Default for ConditionalDistance {
    fn default() -> Self {
        Self::infinite()
    }
}

impl fmt::Debug for ConditionalDistance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        write!(f, "ConditionalDistance({})", self)
    }
}

impl fmt::Display for ConditionalDistance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        if self.is_infinite() {
            return write!(f, "X");
        }
        write!(f, "{}", self.hops)?;
        for c in &self.conds {
            write!(f, "&({})", c)?;
        }
        if let Some(sq) = self.no_go {
            write!(f, "!{}", sq)?;
        }
        Ok(())
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
    fn test_order() {
        let two = ConditionalDistance::with_hops(2);
        let mut two_cond = ConditionalDistance::with_hops(2);
        two_cond.add_condition(Condition::vacate(c("a2"), Color::White));
        let three = ConditionalDistance::with_hops(3);

        assert!(two.is_smaller_than(&two_cond));
        assert!(two_cond.is_smaller_than(&three));
        assert!(three.is_smaller_than(&ConditionalDistance::infinite()));
        assert!(!two.is_smaller_than(&two));

        let mut unsafe_two = two.clone();
        unsafe_two.mark_unsafe(c("e4"));
        assert!(two.is_smaller_than(&unsafe_two));
        assert!(unsafe_two.is_smaller_than(&two_cond));
    }

    #[test]
    fn test_monotonic() {
        let mut d = ConditionalDistance::infinite();
        let candidates = [5, 3, 4, 3, 7, 1, 2];
        let mut last = INFINITE;
        for hops in candidates {
            d.reduce_if_smaller(&ConditionalDistance::with_hops(hops));
            assert!(d.dist() <= last);
            last = d.dist();
        }
        assert_eq!(d.dist(), 1);
        assert!(!d.reduce_if_smaller(&ConditionalDistance::with_hops(1)));
        assert!(!d.reduce_if_smaller(&ConditionalDistance::with_hops(1)));
    }

    #[test]
    fn test_conditions() {
        let mut d = ConditionalDistance::with_hops(2);
        assert!(d.is_unconditional());
        d.add_condition(Condition::vacate(c("d2"), Color::White));
        d.add_condition(Condition::arrive(c("e5"), Color::Black));
        d.add_condition(Condition::vacate(c("d2"), Color::White));
        assert_eq!(d.nr_of_conditions(), 2);
        assert!(d.needs_help_from(Color::Black));
        assert!(d.needs_help_from(Color::White));
        assert_eq!(d.count_help_needed_from_except(Color::White, c("d2")), 0);
        assert_eq!(d.count_help_needed_from(Color::Black), 1);

        for sq in ["a3", "b3", "c3", "d3", "e3", "f3"] {
            d.add_condition(Condition::vacate(c(sq), Color::Black));
        }
        assert_eq!(d.dist(), 2);
        assert_eq!(d.nr_of_conditions(), 8);
        assert_eq!(d.count_help_needed_from(Color::Black), 7);
        assert_eq!(d.conditions()[0], Condition::vacate(c("d2"), Color::White));

        let mut inf = ConditionalDistance::infinite();
        inf.add_condition(Condition::vacate(c("a3"), Color::Black));
        assert!(inf.is_unconditional());
    }

    #[test]
    fn test_many_conditions_still_order() {
        let mut long_chain = ConditionalDistance::with_hops(4);
        for sq in ["b2", "c3", "d4", "e5", "f6"] {
            long_chain.add_condition(Condition::vacate(c(sq), Color::White));
        }
        let mut short_chain = ConditionalDistance::with_hops(4);
        short_chain.add_condition(Condition::vacate(c("d5"), Color::White));
        assert!(!long_chain.is_infinite());
        assert!(short_chain.is_smaller_than(&long_chain));
        assert!(long_chain.is_smaller_than(&ConditionalDistance::with_hops(5)));
        assert_eq!(long_chain.to_string(), "4&(b2-?w)&(c3-?w)&(d4-?w)&(e5-?w)&(f6-?w)");
    }

    #[test]
    fn test_inc_and_cap() {
        let mut d = ConditionalDistance::with_hops(5);
        d.inc(2);
        assert_eq!(d.dist(), 7);
        assert!(d.clone().capped(6).is_infinite());
        assert_eq!(d.capped(7).dist(), 7);

        let mut inf = ConditionalDistance::infinite();
        inf.inc(3);
        inf.mark_unsafe(c("a1"));
        assert!(inf.is_infinite());
        assert!(!inf.has_no_go());
        assert_eq!(inf.to_string(), "X");
    }
}
