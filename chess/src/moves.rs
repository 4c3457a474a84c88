//! Moves and evaluated moves

use crate::eval::Evaluation;
use crate::types::{Coord, CoordParseError, Piece};

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Error parsing a [`Move`] from its UCI text form
#[derive(Debug, Clone, Error, Eq, PartialEq)]
pub enum MoveParseError {
    /// Bad string length
    #[error("bad string length")]
    BadLength,
    /// Bad source square
    #[error("bad source: {0}")]
    BadSrc(CoordParseError),
    /// Bad destination square
    #[error("bad destination: {0}")]
    BadDst(CoordParseError),
    /// Bad promote character
    #[error("bad promote char {0:?}")]
    BadPromote(char),
}

/// Piece a pawn may promote to
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum PromotePiece {
    Knight,
    Bishop,
    Rook,
    Queen,
}

impl PromotePiece {
    pub fn as_char(&self) -> char {
        Piece::from(*self).as_char()
    }

    /// Parses the lowercase promotion letter used in UCI moves
    pub fn from_char(c: char) -> Option<PromotePiece> {
        [
            PromotePiece::Knight,
            PromotePiece::Bishop,
            PromotePiece::Rook,
            PromotePiece::Queen,
        ]
        .into_iter()
        .find(|p| p.as_char() == c)
    }
}

impl From<PromotePiece> for Piece {
    fn from(p: PromotePiece) -> Self {
        match p {
            PromotePiece::Knight => Piece::Knight,
            PromotePiece::Bishop => Piece::Bishop,
            PromotePiece::Rook => Piece::Rook,
            PromotePiece::Queen => Piece::Queen,
        }
    }
}

/// Move given by source square, destination square and optional promotion
///
/// Castling is written as the king's move (e.g. `e1g1`), en passant as the pawn's move to
/// the empty destination square.
///
/// # Example
///
/// ```
/// # use tideval::moves::{Move, PromotePiece};
/// # use std::str::FromStr;
/// #
/// let mv = Move::from_str("e7e8q").unwrap();
/// assert_eq!(mv.promote, Some(PromotePiece::Queen));
/// assert_eq!(mv.to_string(), "e7e8q");
/// ```
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Move {
    pub from: Coord,
    pub to: Coord,
    pub promote: Option<PromotePiece>,
}

impl Move {
    pub const fn new(from: Coord, to: Coord) -> Move {
        Move {
            from,
            to,
            promote: None,
        }
    }

    pub const fn with_promote(from: Coord, to: Coord, promote: PromotePiece) -> Move {
        Move {
            from,
            to,
            promote: Some(promote),
        }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.from, self.to)?;
        if let Some(p) = self.promote {
            write!(f, "{}", p.as_char())?;
        }
        Ok(())
    }
}

impl FromStr for Move {
    type Err = MoveParseError;

    fn from_str(s: &str) -> Result<Move, Self::Err> {
        if !s.is_ascii() {
            return Err(MoveParseError::BadLength);
        }
        let (squares, promote) = match s.len() {
            4 => (s, None),
            5 => {
                let ch = s[4..].chars().next().unwrap_or_default();
                let p = PromotePiece::from_char(ch).ok_or(MoveParseError::BadPromote(ch))?;
                (&s[..4], Some(p))
            }
            _ => return Err(MoveParseError::BadLength),
        };
        let (src, dst) = squares.split_at(2);
        Ok(Move {
            from: src.parse().map_err(MoveParseError::BadSrc)?,
            to: dst.parse().map_err(MoveParseError::BadDst)?,
            promote,
        })
    }
}

/// Candidate move together with its per-horizon evaluation
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct EvaluatedMove {
    pub mv: Move,
    pub eval: Evaluation,
}

impl EvaluatedMove {
    pub fn new(mv: Move, eval: Evaluation) -> EvaluatedMove {
        EvaluatedMove { mv, eval }
    }

    pub fn from(&self) -> Coord {
        self.mv.from
    }

    pub fn to(&self) -> Coord {
        self.mv.to
    }
}

impl fmt::Display for EvaluatedMove {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.mv, self.eval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        let e2 = Coord::from_str("e2").unwrap();
        let e4 = Coord::from_str("e4").unwrap();
        assert_eq!(Move::from_str("e2e4"), Ok(Move::new(e2, e4)));
        assert_eq!(Move::new(e2, e4).to_string(), "e2e4");
        assert_eq!(Move::from_str("e2e"), Err(MoveParseError::BadLength));
        assert_eq!(Move::from_str("e2e4qq"), Err(MoveParseError::BadLength));
        assert_eq!(
            Move::from_str("e7e8k"),
            Err(MoveParseError::BadPromote('k'))
        );
        assert!(matches!(
            Move::from_str("z2e4"),
            Err(MoveParseError::BadSrc(_))
        ));
        assert!(matches!(
            Move::from_str("e2e9"),
            Err(MoveParseError::BadDst(_))
        ));
    }

    #[test]
    fn test_promote_piece() {
        assert_eq!(PromotePiece::from_char('r'), Some(PromotePiece::Rook));
        assert_eq!(PromotePiece::from_char('k'), None);
        assert_eq!(PromotePiece::from_char('Q'), None);
        assert_eq!(PromotePiece::Knight.as_char(), 'n');
        assert_eq!(Piece::from(PromotePiece::Bishop), Piece::Bishop);
    }
}
