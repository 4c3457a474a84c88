use std::fmt::{self, Display};
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum CoordParseError {
    #[error("unexpected file char {0:?}")]
    UnexpectedFileChar(char),
    #[error("unexpected rank char {0:?}")]
    UnexpectedRankChar(char),
    #[error("invalid string length")]
    BadLength,
}

#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum ColorParseError {
    #[error("unexpected color char {0:?}")]
    UnexpectedChar(char),
    #[error("invalid string length")]
    BadLength,
}

#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum CastlingRightsParseError {
    #[error("unexpected char {0:?}")]
    UnexpectedChar(char),
    #[error("duplicate char {0:?}")]
    DuplicateChar(char),
    #[error("unexpected empty string")]
    EmptyString,
}

/// Board file, `a` to `h`
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Hash)]
#[repr(u8)]
pub enum File {
    A,
    B,
    C,
    D,
    E,
    F,
    G,
    H,
}

impl File {
    pub const ALL: [File; 8] = [
        File::A,
        File::B,
        File::C,
        File::D,
        File::E,
        File::F,
        File::G,
        File::H,
    ];

    pub const fn index(&self) -> usize {
        *self as usize
    }

    /// Panics if `val` is not below 8
    pub const fn from_index(val: usize) -> File {
        Self::ALL[val]
    }

    pub fn iter() -> impl Iterator<Item = File> {
        Self::ALL.into_iter()
    }

    pub fn from_char(c: char) -> Option<File> {
        let idx = (c as u32).checked_sub('a' as u32)? as usize;
        Self::ALL.get(idx).copied()
    }

    pub fn as_char(&self) -> char {
        (b'a' + *self as u8) as char
    }
}

impl Display for File {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// Board rank
///
/// Ranks are indexed from the top of the board: index 0 is the eighth rank (the home rank of
/// Black), index 7 is the first rank.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Hash)]
#[repr(u8)]
pub enum Rank {
    R8,
    R7,
    R6,
    R5,
    R4,
    R3,
    R2,
    R1,
}

impl Rank {
    pub const ALL: [Rank; 8] = [
        Rank::R8,
        Rank::R7,
        Rank::R6,
        Rank::R5,
        Rank::R4,
        Rank::R3,
        Rank::R2,
        Rank::R1,
    ];

    pub const fn index(&self) -> usize {
        *self as usize
    }

    /// Panics if `val` is not below 8
    pub const fn from_index(val: usize) -> Rank {
        Self::ALL[val]
    }

    pub fn iter() -> impl Iterator<Item = Rank> {
        Self::ALL.into_iter()
    }

    pub fn from_char(c: char) -> Option<Rank> {
        let idx = ('8' as u32).checked_sub(c as u32)? as usize;
        match c {
            '1'..='8' => Some(Self::ALL[idx]),
            _ => None,
        }
    }

    pub fn as_char(&self) -> char {
        (b'8' - *self as u8) as char
    }

    /// Returns how many ranks `color` has advanced from its own back rank
    ///
    /// The back rank itself is `0`, the opponent's back rank is `7`.
    pub const fn progress(&self, color: Color) -> usize {
        match color {
            Color::White => 7 - self.index(),
            Color::Black => self.index(),
        }
    }
}

impl Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// Square on the board
///
/// The index is `rank.index() * 8 + file.index()`, so `a8` is `0` and `h1` is `63`.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Coord(u8);

impl Coord {
    pub const COUNT: usize = 64;

    /// Panics if `val` is not below 64
    pub const fn from_index(val: usize) -> Coord {
        assert!(val < Self::COUNT, "square index out of range");
        Coord(val as u8)
    }

    pub const fn from_parts(file: File, rank: Rank) -> Coord {
        Coord((rank as u8) * 8 + file as u8)
    }

    pub const fn file(&self) -> File {
        File::ALL[(self.0 % 8) as usize]
    }

    pub const fn rank(&self) -> Rank {
        Rank::ALL[(self.0 / 8) as usize]
    }

    pub const fn index(&self) -> usize {
        self.0 as usize
    }

    /// Shifts the square by the given file and rank index deltas
    ///
    /// A positive `delta_rank` moves towards the first rank, as ranks are indexed from the top.
    /// Returns `None` if the result leaves the board.
    pub fn try_shift(self, delta_file: isize, delta_rank: isize) -> Option<Coord> {
        let file = self.file().index().checked_add_signed(delta_file)?;
        let rank = self.rank().index().checked_add_signed(delta_rank)?;
        if file >= 8 || rank >= 8 {
            return None;
        }
        Some(Coord::from_parts(File::ALL[file], Rank::ALL[rank]))
    }

    /// Number of king moves between two squares on an empty board
    pub fn king_distance(self, other: Coord) -> usize {
        let df = self.file().index().abs_diff(other.file().index());
        let dr = self.rank().index().abs_diff(other.rank().index());
        df.max(dr)
    }

    /// Returns `true` if both squares have the same color
    pub const fn same_shade(self, other: Coord) -> bool {
        (self.0 / 8 + self.0 % 8) % 2 == (other.0 / 8 + other.0 % 8) % 2
    }

    pub fn iter() -> impl Iterator<Item = Coord> {
        (0..Self::COUNT as u8).map(Coord)
    }
}

impl fmt::Debug for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Coord({})", self)
    }
}

impl Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.file(), self.rank())
    }
}

impl FromStr for Coord {
    type Err = CoordParseError;

    fn from_str(s: &str) -> Result<Coord, Self::Err> {
        let mut chars = s.chars();
        let (Some(file_ch), Some(rank_ch), None) = (chars.next(), chars.next(), chars.next())
        else {
            return Err(CoordParseError::BadLength);
        };
        let file = File::from_char(file_ch).ok_or(CoordParseError::UnexpectedFileChar(file_ch))?;
        let rank = Rank::from_char(rank_ch).ok_or(CoordParseError::UnexpectedRankChar(rank_ch))?;
        Ok(Coord::from_parts(file, rank))
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Color {
    White,
    Black,
}

impl Color {
    #[must_use]
    pub const fn inv(&self) -> Color {
        match *self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }

    pub const fn index(&self) -> usize {
        *self as usize
    }

    /// Returns `1` for White and `-1` for Black
    ///
    /// All evaluations are kept in board perspective (positive values favour White), so
    /// multiplying by the sign turns them into the perspective of this color.
    pub const fn sign(&self) -> i32 {
        match *self {
            Color::White => 1,
            Color::Black => -1,
        }
    }

    pub fn as_char(&self) -> char {
        match *self {
            Color::White => 'w',
            Color::Black => 'b',
        }
    }

    pub fn from_char(c: char) -> Option<Color> {
        match c {
            'w' => Some(Color::White),
            'b' => Some(Color::Black),
            _ => None,
        }
    }
}

impl Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

impl FromStr for Color {
    type Err = ColorParseError;

    fn from_str(s: &str) -> Result<Color, Self::Err> {
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(ch), None) => Color::from_char(ch).ok_or(ColorParseError::UnexpectedChar(ch)),
            _ => Err(ColorParseError::BadLength),
        }
    }
}

/// Kind of a chess piece
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Piece {
    Pawn,
    Knight,
    Bishop,
    Rook,
    Queen,
    King,
}

impl Piece {
    pub const ALL: [Piece; 6] = [
        Piece::Pawn,
        Piece::Knight,
        Piece::Bishop,
        Piece::Rook,
        Piece::Queen,
        Piece::King,
    ];

    /// Base material value in centipawns
    pub const fn value(&self) -> i32 {
        match *self {
            Piece::Pawn => 100,
            Piece::Knight => 320,
            Piece::Bishop => 330,
            Piece::Rook => 500,
            Piece::Queen => 900,
            Piece::King => 2000,
        }
    }

    /// Lowercase letter of the piece as used in FEN
    pub fn as_char(&self) -> char {
        b"pnbrqk"[*self as usize] as char
    }

    /// Parses a FEN letter, ignoring the case
    pub fn from_char(c: char) -> Option<Piece> {
        let lower = c.to_ascii_lowercase();
        Self::ALL.into_iter().find(|p| p.as_char() == lower)
    }
}

/// Contents of a square: empty or a piece of some color
///
/// Bits 0 to 2 hold the piece kind plus one, bit 3 is set for Black.
#[derive(Default, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Cell(u8);

impl Cell {
    pub const EMPTY: Cell = Cell(0);

    const BLACK_BIT: u8 = 8;

    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub const fn is_occupied(&self) -> bool {
        self.0 != 0
    }

    pub const fn from_parts(c: Color, p: Piece) -> Cell {
        let kind = p as u8 + 1;
        match c {
            Color::White => Cell(kind),
            Color::Black => Cell(kind | Self::BLACK_BIT),
        }
    }

    pub const fn color(&self) -> Option<Color> {
        match (self.0, self.0 & Self::BLACK_BIT) {
            (0, _) => None,
            (_, 0) => Some(Color::White),
            _ => Some(Color::Black),
        }
    }

    pub const fn piece(&self) -> Option<Piece> {
        match self.0 & 7 {
            0 => None,
            k => Some(Piece::ALL[(k - 1) as usize]),
        }
    }

    /// Signed base value of the piece in this cell (positive for White, `0` if empty)
    pub fn value(&self) -> i32 {
        match (self.color(), self.piece()) {
            (Some(c), Some(p)) => c.sign() * p.value(),
            _ => 0,
        }
    }

    /// FEN letter of the piece, uppercase for White, or `.` for an empty square
    pub fn as_char(&self) -> char {
        match (self.color(), self.piece()) {
            (Some(Color::White), Some(p)) => p.as_char().to_ascii_uppercase(),
            (Some(Color::Black), Some(p)) => p.as_char(),
            _ => '.',
        }
    }

    pub fn from_char(c: char) -> Option<Cell> {
        if c == '.' {
            return Some(Cell::EMPTY);
        }
        let color = match c.is_ascii_uppercase() {
            true => Color::White,
            false => Color::Black,
        };
        Piece::from_char(c).map(|p| Cell::from_parts(color, p))
    }
}

impl fmt::Debug for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cell({})", self.as_char())
    }
}

impl Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CastlingSide {
    Queen,
    King,
}

impl CastlingSide {
    /// Files the rook moves from and to when castling to this side
    pub const fn rook_files(&self) -> (File, File) {
        match *self {
            CastlingSide::Queen => (File::A, File::D),
            CastlingSide::King => (File::H, File::F),
        }
    }
}

/// Castling rights of both sides, one bit per color and side
#[derive(Default, Copy, Clone, PartialEq, Eq, Hash)]
pub struct CastlingRights(u8);

impl CastlingRights {
    pub const EMPTY: CastlingRights = CastlingRights(0);
    pub const FULL: CastlingRights = CastlingRights(0b1111);

    const LETTERS: [(Color, CastlingSide, char); 4] = [
        (Color::White, CastlingSide::King, 'K'),
        (Color::White, CastlingSide::Queen, 'Q'),
        (Color::Black, CastlingSide::King, 'k'),
        (Color::Black, CastlingSide::Queen, 'q'),
    ];

    const fn bit(c: Color, s: CastlingSide) -> u8 {
        1 << (c as u8 * 2 + s as u8)
    }

    pub const fn has(&self, c: Color, s: CastlingSide) -> bool {
        self.0 & Self::bit(c, s) != 0
    }

    pub fn set(&mut self, c: Color, s: CastlingSide) {
        self.0 |= Self::bit(c, s);
    }

    pub fn unset(&mut self, c: Color, s: CastlingSide) {
        self.0 &= !Self::bit(c, s);
    }

    pub fn unset_color(&mut self, c: Color) {
        self.unset(c, CastlingSide::King);
        self.unset(c, CastlingSide::Queen);
    }
}

impl fmt::Debug for CastlingRights {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CastlingRights({})", self)
    }
}

impl Display for CastlingRights {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::EMPTY {
            return write!(f, "-");
        }
        for (color, side, ch) in Self::LETTERS {
            if self.has(color, side) {
                write!(f, "{}", ch)?;
            }
        }
        Ok(())
    }
}

impl FromStr for CastlingRights {
    type Err = CastlingRightsParseError;

    fn from_str(s: &str) -> Result<CastlingRights, Self::Err> {
        if s == "-" {
            return Ok(CastlingRights::EMPTY);
        }
        if s.is_empty() {
            return Err(CastlingRightsParseError::EmptyString);
        }
        let mut res = CastlingRights::EMPTY;
        for ch in s.chars() {
            let (color, side, _) = Self::LETTERS
                .into_iter()
                .find(|&(_, _, l)| l == ch)
                .ok_or(CastlingRightsParseError::UnexpectedChar(ch))?;
            if res.has(color, side) {
                return Err(CastlingRightsParseError::DuplicateChar(ch));
            }
            res.set(color, side);
        }
        Ok(res)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(s: &str) -> Coord {
        Coord::from_str(s).unwrap()
    }

    #[test]
    fn test_coord() {
        let from_parts: Vec<_> = Rank::iter()
            .flat_map(|rank| File::iter().map(move |file| Coord::from_parts(file, rank)))
            .collect();
        assert_eq!(from_parts, Coord::iter().collect::<Vec<_>>());
        for sq in Coord::iter() {
            assert_eq!(Coord::from_parts(sq.file(), sq.rank()), sq);
            assert_eq!(c(&sq.to_string()), sq);
        }
        assert_eq!(c("a8").index(), 0);
        assert_eq!(c("a1").index(), 56);
        assert_eq!(c("h1").index(), 63);
        assert_eq!(Coord::from_str("i1"), Err(CoordParseError::UnexpectedFileChar('i')));
        assert_eq!(Coord::from_str("a9"), Err(CoordParseError::UnexpectedRankChar('9')));
        assert_eq!(Coord::from_str("a10"), Err(CoordParseError::BadLength));
    }

    #[test]
    fn test_coord_shift() {
        let e4 = c("e4");
        assert_eq!(e4.try_shift(0, -1), Some(c("e5")));
        assert_eq!(e4.try_shift(1, 1), Some(c("f3")));
        assert_eq!(c("h1").try_shift(1, 0), None);
        assert_eq!(c("a8").try_shift(0, -1), None);
        assert_eq!(c("a8").try_shift(-1, 0), None);
        assert_eq!(e4.king_distance(c("g8")), 4);
        assert!(c("a1").same_shade(c("h8")));
        assert!(!c("a1").same_shade(c("a2")));
    }

    #[test]
    fn test_rank_progress() {
        assert_eq!(Rank::R2.progress(Color::White), 1);
        assert_eq!(Rank::R2.progress(Color::Black), 6);
        assert_eq!(Rank::R8.progress(Color::Black), 0);
        assert_eq!(Rank::from_char('0'), None);
        assert_eq!(Rank::from_char('9'), None);
    }

    #[test]
    fn test_cell() {
        assert_eq!(Cell::EMPTY.color(), None);
        assert_eq!(Cell::EMPTY.piece(), None);
        assert_eq!(Cell::EMPTY.as_char(), '.');
        for color in [Color::White, Color::Black] {
            for piece in Piece::ALL {
                let cell = Cell::from_parts(color, piece);
                assert_eq!(cell.color(), Some(color));
                assert_eq!(cell.piece(), Some(piece));
                assert_eq!(Cell::from_char(cell.as_char()), Some(cell));
            }
        }
        assert_eq!(Cell::from_char('N').map(|c| c.value()), Some(320));
        assert_eq!(Cell::from_char('q').map(|c| c.value()), Some(-900));
        assert_eq!(Cell::from_char('x'), None);
    }

    #[test]
    fn test_castling() {
        assert_eq!(CastlingRights::EMPTY.to_string(), "-");
        assert_eq!(CastlingRights::FULL.to_string(), "KQkq");
        assert_eq!(CastlingRights::from_str("KQkq"), Ok(CastlingRights::FULL));

        let mut rights = CastlingRights::FULL;
        rights.unset_color(Color::White);
        rights.unset(Color::Black, CastlingSide::King);
        assert_eq!(rights.to_string(), "q");
        assert_eq!(
            CastlingRights::from_str("KK"),
            Err(CastlingRightsParseError::DuplicateChar('K'))
        );
        assert_eq!(
            CastlingRights::from_str(""),
            Err(CastlingRightsParseError::EmptyString)
        );
    }
}
