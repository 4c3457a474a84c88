//! Evaluation values and per-horizon evaluation vectors
//!
//! All evaluations are in centipawns and in board perspective: positive values are good for
//! White, negative values are good for Black.

use crate::types::Color;

use std::fmt;
use std::ops::{AddAssign, Index, IndexMut, SubAssign};

/// Largest horizon (in hops) the engine can be configured with
pub const MAX_HOPS_LIMIT: usize = 8;

/// Number of slots in an [`Evaluation`]
pub const HORIZONS: usize = MAX_HOPS_LIMIT + 1;

/// Marker for a relative evaluation that was not computed yet
pub const NOT_EVALUATED: i32 = i32::MIN / 4;

pub const EVAL_TENTH: i32 = 10;
pub const EVAL_HALF_PAWN: i32 = 50;
pub const PAWN_VALUE: i32 = 100;

/// Magnitude of a checkmate evaluation
pub const CHECKMATE: i32 = 100_000;

/// Evaluation of `color` being checkmated, in board perspective
pub const fn checkmate_of(color: Color) -> i32 {
    -color.sign() * CHECKMATE
}

pub fn is_checkmate_eval(eval: i32) -> bool {
    eval.abs() >= CHECKMATE - 1000
}

/// Returns `true` if `eval` is at least `min` in the perspective of `color`
///
/// For example, `is_ok_for(-30, Color::White, -EVAL_TENTH)` is `false`, while
/// `is_ok_for(-30, Color::Black, -EVAL_TENTH)` is `true`.
pub const fn is_ok_for(eval: i32, color: Color, min: i32) -> bool {
    match color {
        Color::White => eval >= min,
        Color::Black => eval <= -min,
    }
}

/// Same as [`is_ok_for()`] with a tolerance of [`EVAL_TENTH`]
pub const fn is_ok_for_default(eval: i32, color: Color) -> bool {
    is_ok_for(eval, color, -EVAL_TENTH)
}

pub const fn is_better_for(a: i32, b: i32, color: Color) -> bool {
    match color {
        Color::White => a > b,
        Color::Black => a < b,
    }
}

pub const fn max_for(a: i32, b: i32, color: Color) -> i32 {
    if is_better_for(b, a, color) {
        b
    } else {
        a
    }
}

pub const fn min_for(a: i32, b: i32, color: Color) -> i32 {
    if is_better_for(b, a, color) {
        a
    } else {
        b
    }
}

/// Evaluation per future horizon
///
/// Slot `i` holds the benefit realizable after `i` further plies of the side the evaluation
/// belongs to.
#[derive(Default, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Evaluation([i32; HORIZONS]);

impl Evaluation {
    pub const ZERO: Evaluation = Evaluation([0; HORIZONS]);

    pub const fn filled(val: i32) -> Evaluation {
        Evaluation([val; HORIZONS])
    }

    pub fn at(&self, horizon: usize) -> i32 {
        self.0.get(horizon).copied().unwrap_or(0)
    }

    pub fn add_at(&mut self, val: i32, horizon: usize) {
        if let Some(slot) = self.0.get_mut(horizon) {
            *slot = slot.saturating_add(val);
        }
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|&v| v == 0)
    }

    pub fn as_slice(&self) -> &[i32] {
        &self.0
    }

    /// Element-wise maximum in the perspective of `color`
    pub fn max_for(&self, other: &Evaluation, color: Color) -> Evaluation {
        let mut res = *self;
        for (r, &o) in res.0.iter_mut().zip(other.0.iter()) {
            *r = max_for(*r, o, color);
        }
        res
    }

    /// Applies `f` to every slot
    pub fn map(&self, mut f: impl FnMut(i32) -> i32) -> Evaluation {
        let mut res = *self;
        for v in res.0.iter_mut() {
            *v = f(*v);
        }
        res
    }

    /// Lexicographic comparison across horizons in the perspective of `color`
    ///
    /// Returns `true` if `self` is better than `other` by more than `threshold` at the first
    /// horizon where they differ by more than [`EVAL_TENTH`]. Near-equal early horizons are
    /// decided by the later ones.
    pub fn is_better_than(&self, other: &Evaluation, color: Color, threshold: i32) -> bool {
        let sign = color.sign();
        for (&a, &b) in self.0.iter().zip(other.0.iter()) {
            let delta = sign * (a - b);
            if delta > threshold {
                return true;
            }
            if delta < -EVAL_TENTH {
                return false;
            }
        }
        false
    }
}

impl Index<usize> for Evaluation {
    type Output = i32;

    fn index(&self, idx: usize) -> &i32 {
        &self.0[idx]
    }
}

impl IndexMut<usize> for Evaluation {
    fn index_mut(&mut self, idx: usize) -> &mut i32 {
        &mut self.0[idx]
    }
}

impl AddAssign<&Evaluation> for Evaluation {
    fn add_assign(&mut self, rhs: &Evaluation) {
        for (a, &b) in self.0.iter_mut().zip(rhs.0.iter()) {
            *a = a.saturating_add(b);
        }
    }
}

impl SubAssign<&Evaluation> for Evaluation {
    fn sub_assign(&mut self, rhs: &Evaluation) {
        for (a, &b) in self.0.iter_mut().zip(rhs.0.iter()) {
            *a = a.saturating_sub(b);
        }
    }
}

impl fmt::Debug for Evaluation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        write!(f, "Evaluation{:?}", self.0)
    }
}

impl fmt::Display for Evaluation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        write!(f, "[")?;
        for (i, v) in self.0.iter().enumerate() {
            if i != 0 {
                write!(f, " ")?;
            }
            write!(f, "{}", v)?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ok_for() {
        assert!(is_ok_for(0, Color::White, -EVAL_TENTH));
        assert!(is_ok_for(-5, Color::White, -EVAL_TENTH));
        assert!(!is_ok_for(-30, Color::White, -EVAL_TENTH));
        assert!(is_ok_for(-30, Color::Black, -EVAL_TENTH));
        assert!(!is_ok_for(30, Color::Black, -EVAL_TENTH));
        assert_eq!(max_for(3, -7, Color::Black), -7);
        assert_eq!(min_for(3, -7, Color::Black), 3);
        assert_eq!(checkmate_of(Color::White), -CHECKMATE);
    }

    #[test]
    fn test_lexicographic() {
        let mut a = Evaluation::ZERO;
        let mut b = Evaluation::ZERO;
        a[0] = 105;
        b[0] = 100;
        a[1] = 300;
        assert!(a.is_better_than(&b, Color::White, 100));
        assert!(!b.is_better_than(&a, Color::White, 100));
        assert!(b.is_better_than(&a, Color::Black, 100));

        let mut c = Evaluation::ZERO;
        c[0] = 60;
        c[1] = 1000;
        assert!(!c.is_better_than(&b, Color::White, 100));
    }

    #[test]
    fn test_arith() {
        let mut a = Evaluation::filled(5);
        let b = Evaluation::filled(2);
        a -= &b;
        assert_eq!(a.at(3), 3);
        a += &b;
        a.add_at(10, 1);
        assert_eq!(a.as_slice()[..3], [5, 15, 5]);
        assert_eq!(a.at(HORIZONS + 3), 0);
    }
}
