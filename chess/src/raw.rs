//! Unvalidated position and its FEN form

use crate::types::{
    CastlingRights, CastlingRightsParseError, CastlingSide, Cell, Color, ColorParseError, Coord,
    CoordParseError, File, Piece, Rank,
};
use tideval_base::geometry;

use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

use thiserror::Error;

/// Structural problem of a position
#[derive(Debug, Clone, Error, Eq, PartialEq)]
pub enum ValidateError {
    /// En passant square is on a wrong rank
    #[error("invalid enpassant position {0}")]
    InvalidEnpassant(Coord),
    /// More than 16 pieces of one color
    #[error("too many pieces of color {0:?}")]
    TooManyPieces(Color),
    #[error("no king of color {0:?}")]
    NoKing(Color),
    #[error("more than one king of color {0:?}")]
    TooManyKings(Color),
    /// Pawn on the first or the eighth rank
    #[error("invalid pawn position {0}")]
    InvalidPawn(Coord),
    /// The side that just moved left its king in check
    #[error("opponent's king is attacked")]
    OpponentKingAttacked,
}

/// Error parsing the piece placement part of FEN
#[derive(Debug, Clone, Error, Eq, PartialEq)]
pub enum CellsParseError {
    #[error("too many items in rank {0}")]
    RankOverflow(Rank),
    #[error("not enough items in rank {0}")]
    RankUnderflow(Rank),
    #[error("too many ranks")]
    Overflow,
    #[error("not enough ranks")]
    Underflow,
    #[error("unexpected char {0:?}")]
    UnexpectedChar(char),
}

/// Error parsing [`RawBoard`] from FEN
#[derive(Debug, Clone, Error, Eq, PartialEq)]
pub enum RawFenParseError {
    #[error("non-ASCII data in FEN")]
    NonAscii,
    #[error("board not specified")]
    NoBoard,
    #[error("bad board: {0}")]
    Board(#[from] CellsParseError),
    #[error("no move side")]
    NoMoveSide,
    #[error("bad move side: {0}")]
    MoveSide(#[from] ColorParseError),
    #[error("no castling rights")]
    NoCastling,
    #[error("bad castling rights: {0}")]
    Castling(#[from] CastlingRightsParseError),
    #[error("no enpassant")]
    NoEnpassant,
    #[error("bad enpassant: {0}")]
    Enpassant(#[from] CoordParseError),
    #[error("invalid enpassant rank {0}")]
    InvalidEnpassantRank(Rank),
    #[error("bad move counter: {0}")]
    MoveCounter(ParseIntError),
    #[error("bad move number: {0}")]
    MoveNumber(ParseIntError),
    #[error("extra data in FEN")]
    ExtraData,
}

/// Error creating a [`Board`](crate::board::Board) from FEN
#[derive(Debug, Clone, Error, Eq, PartialEq)]
pub enum FenParseError {
    #[error("cannot parse fen: {0}")]
    Fen(#[from] RawFenParseError),
    #[error("invalid position: {0}")]
    Valid(#[from] ValidateError),
}

const BACK_RANK: [Piece; 8] = [
    Piece::Rook,
    Piece::Knight,
    Piece::Bishop,
    Piece::Queen,
    Piece::King,
    Piece::Bishop,
    Piece::Knight,
    Piece::Rook,
];

/// Piece placement and game flags of a position
///
/// The engine only consumes the placement and the flags. A raw board is not validated: use
/// [`RawBoard::validate()`] or build a [`Board`](crate::board::Board) from it.
///
/// # Example
///
/// ```
/// # use tideval::raw::RawBoard;
/// # use tideval::{Cell, Color, File, Piece, Rank};
/// #
/// let mut raw = RawBoard::empty();
/// raw.put2(File::B, Rank::R2, Cell::from_parts(Color::White, Piece::King));
/// raw.put2(File::D, Rank::R5, Cell::from_parts(Color::Black, Piece::King));
/// raw.move_number = 42;
/// assert_eq!(raw.as_fen(), "8/8/8/3k4/8/8/1K6/8 w - - 0 42");
/// ```
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct RawBoard {
    /// Cells indexed by [`Coord::index()`]
    pub cells: [Cell; 64],
    /// Side to move
    pub side: Color,
    pub castling: CastlingRights,
    /// Square of the pawn that can be captured en passant
    pub ep_source: Option<Coord>,
    /// Half-moves since the last capture or pawn move
    pub move_counter: u16,
    /// Full move number, incremented after each move of Black
    pub move_number: u16,
}

impl RawBoard {
    pub const fn empty() -> RawBoard {
        RawBoard {
            cells: [Cell::EMPTY; 64],
            side: Color::White,
            castling: CastlingRights::EMPTY,
            ep_source: None,
            move_counter: 0,
            move_number: 1,
        }
    }

    pub fn initial() -> RawBoard {
        let mut res = RawBoard::empty();
        res.castling = CastlingRights::FULL;
        for color in [Color::White, Color::Black] {
            let back = geometry::castling_rank(color);
            let pawns = geometry::pawn_base_rank(color);
            for (file, piece) in File::iter().zip(BACK_RANK) {
                res.put2(file, back, Cell::from_parts(color, piece));
                res.put2(file, pawns, Cell::from_parts(color, Piece::Pawn));
            }
        }
        res
    }

    pub fn from_fen(fen: &str) -> Result<RawBoard, RawFenParseError> {
        RawBoard::from_str(fen)
    }

    #[inline]
    pub fn get(&self, c: Coord) -> Cell {
        self.cells[c.index()]
    }

    #[inline]
    pub fn get2(&self, file: File, rank: Rank) -> Cell {
        self.get(Coord::from_parts(file, rank))
    }

    #[inline]
    pub fn put(&mut self, c: Coord, cell: Cell) {
        self.cells[c.index()] = cell;
    }

    #[inline]
    pub fn put2(&mut self, file: File, rank: Rank, cell: Cell) {
        self.put(Coord::from_parts(file, rank), cell);
    }

    /// Returns the square a pawn lands on when capturing en passant
    pub fn ep_dest(&self) -> Option<Coord> {
        self.ep_source
            .map(|p| Coord::from_parts(p.file(), geometry::enpassant_dst_rank(self.side)))
    }

    pub fn as_fen(&self) -> String {
        self.to_string()
    }

    /// Finds the king of color `c`
    pub fn king_pos(&self, c: Color) -> Option<Coord> {
        let king = Cell::from_parts(c, Piece::King);
        Coord::iter().find(|&sq| self.get(sq) == king)
    }

    /// Checks the structure of the position and drops flags that cannot apply
    ///
    /// Castling rights without king and rook on their home squares are removed, as is an en
    /// passant square without a pawn to capture or with an occupied passing square. Whether the
    /// opponent's king is attacked is checked by the [`Board`](crate::board::Board).
    pub fn validate(&mut self) -> Result<(), ValidateError> {
        self.drop_stale_enpassant()?;
        self.drop_stale_castling();
        self.check_piece_counts()?;
        self.check_pawn_ranks()
    }

    fn drop_stale_enpassant(&mut self) -> Result<(), ValidateError> {
        let Some(p) = self.ep_source else {
            return Ok(());
        };
        if p.rank() != geometry::enpassant_src_rank(self.side) {
            return Err(ValidateError::InvalidEnpassant(p));
        }
        let victim = Cell::from_parts(self.side.inv(), Piece::Pawn);
        let passed = Coord::from_parts(p.file(), geometry::enpassant_dst_rank(self.side));
        if self.get(p) != victim || self.get(passed).is_occupied() {
            self.ep_source = None;
        }
        Ok(())
    }

    fn drop_stale_castling(&mut self) {
        for color in [Color::White, Color::Black] {
            let rank = geometry::castling_rank(color);
            let king_home = self.get2(File::E, rank) == Cell::from_parts(color, Piece::King);
            for side in [CastlingSide::Queen, CastlingSide::King] {
                let rook = self.get2(side.rook_files().0, rank);
                if !king_home || rook != Cell::from_parts(color, Piece::Rook) {
                    self.castling.unset(color, side);
                }
            }
        }
    }

    fn check_piece_counts(&self) -> Result<(), ValidateError> {
        for color in [Color::White, Color::Black] {
            let mut pieces = 0;
            let mut kings = 0;
            for cell in self.cells.iter().filter(|c| c.color() == Some(color)) {
                pieces += 1;
                if cell.piece() == Some(Piece::King) {
                    kings += 1;
                }
            }
            if pieces > 16 {
                return Err(ValidateError::TooManyPieces(color));
            }
            match kings {
                0 => return Err(ValidateError::NoKing(color)),
                1 => {}
                _ => return Err(ValidateError::TooManyKings(color)),
            }
        }
        Ok(())
    }

    fn check_pawn_ranks(&self) -> Result<(), ValidateError> {
        let misplaced = Coord::iter().find(|&sq| {
            matches!(sq.rank(), Rank::R1 | Rank::R8) && self.get(sq).piece() == Some(Piece::Pawn)
        });
        match misplaced {
            Some(sq) => Err(ValidateError::InvalidPawn(sq)),
            None => Ok(()),
        }
    }

    fn write_placement(&self, out: &mut impl fmt::Write) -> fmt::Result {
        for rank in Rank::iter() {
            if rank != Rank::R8 {
                out.write_char('/')?;
            }
            let mut gap = 0;
            for file in File::iter() {
                let cell = self.get2(file, rank);
                if cell.is_empty() {
                    gap += 1;
                    continue;
                }
                if gap > 0 {
                    write!(out, "{}", gap)?;
                    gap = 0;
                }
                out.write_char(cell.as_char())?;
            }
            if gap > 0 {
                write!(out, "{}", gap)?;
            }
        }
        Ok(())
    }
}

impl Default for RawBoard {
    fn default() -> RawBoard {
        RawBoard::empty()
    }
}

fn parse_rank(row: &str, rank: Rank, cells: &mut [Cell; 64]) -> Result<(), CellsParseError> {
    let mut file = 0;
    for ch in row.chars() {
        let width = match ch {
            '1'..='8' => ch as usize - '0' as usize,
            _ => 1,
        };
        if file + width > 8 {
            return Err(CellsParseError::RankOverflow(rank));
        }
        if width == 1 && !ch.is_ascii_digit() {
            let cell = Cell::from_char(ch)
                .filter(|c| c.is_occupied())
                .ok_or(CellsParseError::UnexpectedChar(ch))?;
            cells[Coord::from_parts(File::from_index(file), rank).index()] = cell;
        } else if !('1'..='8').contains(&ch) {
            return Err(CellsParseError::UnexpectedChar(ch));
        }
        file += width;
    }
    if file < 8 {
        return Err(CellsParseError::RankUnderflow(rank));
    }
    Ok(())
}

fn parse_cells(s: &str) -> Result<[Cell; 64], CellsParseError> {
    let mut cells = [Cell::EMPTY; 64];
    let mut rows = s.split('/');
    for rank in Rank::iter() {
        let row = rows.next().ok_or(CellsParseError::Underflow)?;
        parse_rank(row, rank, &mut cells)?;
    }
    match rows.next() {
        Some(_) => Err(CellsParseError::Overflow),
        None => Ok(cells),
    }
}

fn parse_ep_source(s: &str, side: Color) -> Result<Option<Coord>, RawFenParseError> {
    if s == "-" {
        return Ok(None);
    }
    let dest = Coord::from_str(s)?;
    if dest.rank() != geometry::enpassant_dst_rank(side) {
        return Err(RawFenParseError::InvalidEnpassantRank(dest.rank()));
    }
    let src = Coord::from_parts(dest.file(), geometry::enpassant_src_rank(side));
    Ok(Some(src))
}

fn parse_counter(
    s: Option<&str>,
    default: u16,
    err: fn(ParseIntError) -> RawFenParseError,
) -> Result<u16, RawFenParseError> {
    s.map_or(Ok(default), |s| s.parse().map_err(err))
}

impl FromStr for RawBoard {
    type Err = RawFenParseError;

    fn from_str(s: &str) -> Result<RawBoard, Self::Err> {
        type Error = RawFenParseError;

        if !s.is_ascii() {
            return Err(Error::NonAscii);
        }
        let mut parts = s.split_ascii_whitespace();

        let cells = parse_cells(parts.next().ok_or(Error::NoBoard)?)?;
        let side: Color = parts.next().ok_or(Error::NoMoveSide)?.parse()?;
        let castling: CastlingRights = parts.next().ok_or(Error::NoCastling)?.parse()?;
        let ep_source = parse_ep_source(parts.next().ok_or(Error::NoEnpassant)?, side)?;
        let move_counter = parse_counter(parts.next(), 0, Error::MoveCounter)?;
        let move_number = parse_counter(parts.next(), 1, Error::MoveNumber)?;
        if parts.next().is_some() {
            return Err(Error::ExtraData);
        }

        Ok(RawBoard {
            cells,
            side,
            castling,
            ep_source,
            move_counter,
            move_number,
        })
    }
}

impl fmt::Display for RawBoard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_placement(f)?;
        let ep = match self.ep_dest() {
            Some(p) => p.to_string(),
            None => "-".to_string(),
        };
        write!(
            f,
            " {} {} {} {} {}",
            self.side, self.castling, ep, self.move_counter, self.move_number
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const START: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

    fn c(s: &str) -> Coord {
        Coord::from_str(s).unwrap()
    }

    #[test]
    fn test_initial() {
        assert_eq!(RawBoard::initial().as_fen(), START);
        assert_eq!(RawBoard::from_fen(START), Ok(RawBoard::initial()));
        let mut raw = RawBoard::initial();
        assert_eq!(raw.validate(), Ok(()));
        assert_eq!(raw.king_pos(Color::White), Some(c("e1")));
        assert_eq!(raw.king_pos(Color::Black), Some(c("e8")));
    }

    #[test]
    fn test_stale_flags() {
        let fen = "rnbqkb1r/ppp2ppp/5n2/3pp3/4P3/5N2/PPPP1PPP/RNBQKB1R w KQkq d6 0 4";
        let mut raw = RawBoard::from_fen(fen).unwrap();
        assert_eq!(raw.ep_source, Some(c("d5")));
        assert_eq!(raw.ep_dest(), Some(c("d6")));
        assert_eq!(raw.as_fen(), fen);
        raw.validate().unwrap();
        assert_eq!(raw.ep_source, Some(c("d5")));

        let mut raw = RawBoard::from_fen("4k2r/8/8/8/3p4/8/8/R3K1R1 b KQkq e3 0 1").unwrap();
        raw.validate().unwrap();
        let mut expected = CastlingRights::EMPTY;
        expected.set(Color::White, CastlingSide::Queen);
        expected.set(Color::Black, CastlingSide::King);
        assert_eq!(raw.castling, expected);
        assert_eq!(raw.ep_source, None);
        assert_eq!(raw.as_fen(), "4k2r/8/8/8/3p4/8/8/R3K1R1 b Qk - 0 1");
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            RawBoard::from_fen("4k3/8/8/8/8/8/8/4K3"),
            Err(RawFenParseError::NoMoveSide)
        );
        assert_eq!(
            RawBoard::from_fen("4k3/8/8/8/8/8/8/4K3 b -"),
            Err(RawFenParseError::NoEnpassant)
        );
        let raw = RawBoard::from_fen("4k3/8/8/8/8/8/8/4K3 b - - 17").unwrap();
        assert_eq!(raw.move_counter, 17);
        assert_eq!(raw.move_number, 1);
        assert_eq!(
            RawBoard::from_fen("4k3/8/8/8/8/8/8/4K3 w - - 0 1 x"),
            Err(RawFenParseError::ExtraData)
        );
        assert_eq!(
            RawBoard::from_fen("4k3/8/9/8/8/8/8/4K3 w - -"),
            Err(RawFenParseError::Board(CellsParseError::UnexpectedChar('9')))
        );
        assert_eq!(
            RawBoard::from_fen("4k3/8/8/8/8/8/4K3 w - -"),
            Err(RawFenParseError::Board(CellsParseError::Underflow))
        );
        assert_eq!(
            RawBoard::from_fen("4k3/8/8/8/8/8/8/8/4K3 w - -"),
            Err(RawFenParseError::Board(CellsParseError::Overflow))
        );
        assert_eq!(
            RawBoard::from_fen("4k4/8/8/8/8/8/8/4K3 w - -"),
            Err(RawFenParseError::Board(CellsParseError::RankOverflow(Rank::R8)))
        );
        assert_eq!(
            RawBoard::from_fen("4k3/8/8/8/8/8/7/4K3 w - -"),
            Err(RawFenParseError::Board(CellsParseError::RankUnderflow(Rank::R2)))
        );
        assert_eq!(
            RawBoard::from_fen("4k3/8/8/8/8/8/8/4K3 w - e4"),
            Err(RawFenParseError::InvalidEnpassantRank(Rank::R4))
        );
    }

    #[test]
    fn test_validate() {
        let mut raw = RawBoard::from_fen("8/8/8/8/8/8/8/4K3 w - - 0 1").unwrap();
        assert_eq!(raw.validate(), Err(ValidateError::NoKing(Color::Black)));

        let mut raw = RawBoard::from_fen("k3k3/8/8/8/8/8/8/4K3 w - - 0 1").unwrap();
        assert_eq!(
            raw.validate(),
            Err(ValidateError::TooManyKings(Color::Black))
        );

        let mut raw = RawBoard::from_fen("k6p/8/8/8/8/8/8/4K3 w - - 0 1").unwrap();
        assert_eq!(raw.validate(), Err(ValidateError::InvalidPawn(c("h8"))));
    }
}
