//! Board and the evaluation loop

use crate::config::{Config, ConfigError};
use crate::distance::ConditionalDistance;
use crate::chances::ChanceLedger;
use crate::eval::Evaluation;
use crate::legal;
use crate::moves::{EvaluatedMove, Move, MoveParseError, PromotePiece};
use crate::piece::{LivePiece, Task};
use crate::raw::{FenParseError, RawBoard, ValidateError};
use crate::square::Square;
use crate::types::{CastlingSide, Cell, Color, Coord, File, Piece, PieceId};
use tideval_base::geometry;

use log::{debug, trace, warn};

use std::fmt::{self, Display};
use std::str::FromStr;

use thiserror::Error;

/// Error creating a [`Board`] with a custom configuration
#[derive(Debug, Clone, Error, Eq, PartialEq)]
pub enum CreateError {
    #[error("bad config: {0}")]
    Config(#[from] ConfigError),
    #[error("invalid position: {0}")]
    Valid(#[from] ValidateError),
}

/// Reason why [`Board::apply_move()`] rejected a move
#[derive(Debug, Clone, Error, Eq, PartialEq)]
pub enum MoveError {
    /// Source square is empty
    #[error("no piece on {0}")]
    NoPiece(Coord),
    /// Piece on the source square belongs to the side not to move
    #[error("piece on {0} does not belong to the side to move")]
    WrongSide(Coord),
    /// Destination holds a piece of the moving side
    #[error("cannot capture own piece on {0}")]
    OwnCapture(Coord),
    /// The piece cannot get to the destination in one move
    #[error("piece on {from} cannot move to {to}")]
    Unreachable { from: Coord, to: Coord },
    /// The move leaves the own king in check
    #[error("move {from}{to} leaves the king in check")]
    KingInCheck { from: Coord, to: Coord },
    /// Promotion given for a move that does not promote
    #[error("move {from}{to} cannot promote")]
    BadPromotion { from: Coord, to: Coord },
    #[error("cannot parse move: {0}")]
    Parse(#[from] MoveParseError),
}

/// Position with the full distance and chance data of all its pieces
///
/// A board is created from a [`RawBoard`] (or directly from FEN) and then kept up to date
/// incrementally with [`Board::apply_move()`]. After construction and after each move, the
/// board runs the level loop up to the configured horizon, so all the queries are answered
/// from precomputed data.
///
/// # Example
///
/// ```
/// # use tideval::board::Board;
/// # use tideval::{Color, Coord};
/// # use std::str::FromStr;
/// #
/// let mut board = Board::initial();
/// let e2 = Coord::from_str("e2").unwrap();
/// let e4 = Coord::from_str("e4").unwrap();
/// board.apply_move(e2, e4, None).unwrap();
/// assert_eq!(board.side(), Color::Black);
/// assert!(board.best_move().is_some());
/// ```
#[derive(Debug, Clone)]
pub struct Board {
    pub(crate) config: Config,
    pub(crate) r: RawBoard,
    pub(crate) pieces: Vec<LivePiece>,
    pub(crate) occupant: [Option<PieceId>; 64],
    pub(crate) squares: Vec<Square>,
    pub(crate) kings: [PieceId; 2],
    pub(crate) clock: u64,
    /// Extra hops an own piece needs to clear each square
    pub(crate) penalties: [u32; 64],
    /// Direct attacks of the opponent on the area around the king of each color
    pub(crate) king_attacks: [u32; 2],
    pub(crate) ranked: [Vec<EvaluatedMove>; 2],
}

impl Board {
    /// Returns a board with the initial position
    pub fn initial() -> Board {
        Board::build(RawBoard::initial(), Config::default())
    }

    /// Parses a board from FEN with the default configuration
    pub fn from_fen(fen: &str) -> Result<Board, FenParseError> {
        Board::from_str(fen)
    }

    /// Creates a board from `raw` with the default configuration
    pub fn from_raw(raw: RawBoard) -> Result<Board, ValidateError> {
        Ok(Board::build(Self::validated(raw)?, Config::default()))
    }

    /// Creates a board from `raw` with a custom configuration
    pub fn with_config(raw: RawBoard, config: Config) -> Result<Board, CreateError> {
        config.validate()?;
        Ok(Board::build(Self::validated(raw)?, config))
    }

    fn validated(mut raw: RawBoard) -> Result<RawBoard, ValidateError> {
        raw.validate()?;
        let side = raw.side;
        let king = raw
            .king_pos(side.inv())
            .ok_or(ValidateError::NoKing(side.inv()))?;
        if legal::is_cell_attacked(&raw.cells, king, side) {
            return Err(ValidateError::OpponentKingAttacked);
        }
        Ok(raw)
    }

    fn build(raw: RawBoard, config: Config) -> Board {
        let mut board = Board {
            config,
            r: raw,
            pieces: Vec::with_capacity(PieceId::COUNT),
            occupant: [None; 64],
            squares: Coord::iter().map(Square::new).collect(),
            kings: [PieceId::from_index(0); 2],
            clock: 0,
            penalties: [0; 64],
            king_attacks: [0; 2],
            ranked: [Vec::new(), Vec::new()],
        };
        for sq in Coord::iter() {
            let cell = raw.get(sq);
            if let (Some(color), Some(piece)) = (cell.color(), cell.piece()) {
                let id = PieceId::from_index(board.pieces.len());
                let mut p = LivePiece::new(id, color, piece, sq);
                p.reseat(sq, 0);
                p.queue.push(0, Task::Propagate(sq));
                board.pieces.push(p);
                board.occupant[sq.index()] = Some(id);
                if piece == Piece::King {
                    board.kings[color.index()] = id;
                }
            }
        }
        board.penalties = board.compute_penalties();
        board.evaluate();
        board
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns a view over the raw board
    #[inline]
    pub fn raw(&self) -> &RawBoard {
        &self.r
    }

    #[inline]
    pub fn get(&self, c: Coord) -> Cell {
        self.r.get(c)
    }

    #[inline]
    pub fn side(&self) -> Color {
        self.r.side
    }

    pub fn as_fen(&self) -> String {
        self.r.as_fen()
    }

    /// Logical clock, advanced by every applied move
    pub fn clock(&self) -> u64 {
        self.clock
    }

    pub fn king_pos(&self, c: Color) -> Coord {
        self.pieces[self.kings[c.index()].index()].sq
    }

    pub fn piece_at(&self, sq: Coord) -> Option<PieceId> {
        self.occupant[sq.index()]
    }

    pub fn piece(&self, pid: PieceId) -> Option<&LivePiece> {
        self.pieces.get(pid.index()).filter(|p| p.alive)
    }

    /// Iterates over all the pieces on the board
    pub fn pieces(&self) -> impl Iterator<Item = &LivePiece> + '_ {
        self.pieces.iter().filter(|p| p.alive)
    }

    pub fn square(&self, sq: Coord) -> &Square {
        &self.squares[sq.index()]
    }

    pub(crate) fn live_ids(&self) -> Vec<PieceId> {
        self.pieces().map(|p| p.id).collect()
    }

    pub(crate) fn lp(&self, pid: PieceId) -> &LivePiece {
        &self.pieces[pid.index()]
    }

    pub(crate) fn lp_mut(&mut self, pid: PieceId) -> &mut LivePiece {
        &mut self.pieces[pid.index()]
    }

    pub(crate) fn color_at(&self, sq: Coord) -> Option<Color> {
        self.r.get(sq).color()
    }

    /// Distance of piece `pid` to `sq`, taking a same-colored occupant of `sq` into account
    ///
    /// Returns an infinite distance for captured pieces.
    pub fn distance_to(&self, sq: Coord, pid: PieceId) -> ConditionalDistance {
        match self.piece(pid) {
            Some(_) => self.derived_distance(pid, sq),
            None => ConditionalDistance::infinite(),
        }
    }

    /// Distance of piece `pid` to `sq`, ignoring a same-colored occupant of `sq`
    pub fn raw_distance_to(&self, sq: Coord, pid: PieceId) -> ConditionalDistance {
        match self.piece(pid) {
            Some(p) => p.node(sq).raw.clone(),
            None => ConditionalDistance::infinite(),
        }
    }

    /// Returns `true` if some piece still has queued distance updates at or below `level`
    pub fn has_pending_updates_up_to(&self, level: u32) -> bool {
        self.pieces().any(|p| p.queue.has_pending_up_to(level))
    }

    /// Consolidated chances of piece `pid` on `sq`
    pub fn chances_at(&self, sq: Coord, pid: PieceId) -> Option<&ChanceLedger> {
        self.piece(pid).map(|p| &p.node(sq).chances)
    }

    /// Forking chance of piece `pid` on `sq`, or `0`
    pub fn fork_chance(&self, sq: Coord, pid: PieceId) -> i32 {
        self.piece(pid).map_or(0, |p| p.node(sq).forking_chance())
    }

    /// Relative evaluation of piece `pid` going to `sq`
    pub fn rel_eval(&self, sq: Coord, pid: PieceId) -> Option<i32> {
        self.piece(pid)
            .map(|p| p.node(sq).rel_eval)
            .filter(|&e| e != crate::eval::NOT_EVALUATED)
    }

    /// Returns `true` if the king of color `c` is attacked
    pub fn is_check(&self, c: Color) -> bool {
        legal::is_cell_attacked(&self.r.cells, self.king_pos(c), c.inv())
    }

    /// Number of legal moves of color `c`
    pub fn legal_move_count(&self, c: Color) -> usize {
        self.pieces()
            .filter(|p| p.color == c)
            .map(|p| p.legal_moves.len())
            .sum()
    }

    /// Returns all legal moves of color `c`
    pub fn legal_moves(&self, c: Color) -> Vec<Move> {
        self.pieces()
            .filter(|p| p.color == c)
            .flat_map(|p| p.legal_moves.iter().copied())
            .collect()
    }

    /// Returns `true` if the side to move has no legal moves, if only kings are left or if the
    /// fifty-move rule applies
    pub fn is_game_over(&self) -> bool {
        self.legal_move_count(self.r.side) == 0
            || self.pieces().all(|p| p.piece == Piece::King)
            || self.r.move_counter >= 100
    }

    /// Number of direct attacks on the squares around the king of color `c`
    pub fn king_area_attacks(&self, c: Color) -> u32 {
        self.king_attacks[c.index()]
    }

    /// Ranked moves of color `c`, best first
    pub fn evaluated_moves(&self, c: Color) -> &[EvaluatedMove] {
        &self.ranked[c.index()]
    }

    /// Best move for the side to move
    pub fn best_move(&self) -> Option<Move> {
        self.ranked[self.r.side.index()].first().map(|em| em.mv)
    }

    /// Per-horizon evaluation of [`Board::best_move()`]
    pub fn best_move_evaluation(&self) -> Option<Evaluation> {
        self.ranked[self.r.side.index()].first().map(|em| em.eval)
    }

    fn compute_penalties(&self) -> [u32; 64] {
        let mut res = [0; 64];
        for p in self.pieces() {
            res[p.sq.index()] = self.moving_away_penalty(p.id);
        }
        res
    }

    /// Parses a move in UCI notation and applies it
    pub fn apply_uci(&mut self, s: &str) -> Result<(), MoveError> {
        let mv = Move::from_str(s)?;
        self.apply_move(mv.from, mv.to, mv.promote)
    }

    /// Applies a move and recalculates the board
    ///
    /// A pawn reaching the last rank promotes to `promote`, which defaults to a queen. A rejected
    /// move leaves the board untouched.
    pub fn apply_move(
        &mut self,
        from: Coord,
        to: Coord,
        promote: Option<PromotePiece>,
    ) -> Result<(), MoveError> {
        let pid = self.occupant[from.index()].ok_or(MoveError::NoPiece(from))?;
        let (color, piece) = {
            let p = self.lp(pid);
            (p.color, p.piece)
        };
        if color != self.r.side {
            return Err(MoveError::WrongSide(from));
        }
        if self.color_at(to) == Some(color) {
            return Err(MoveError::OwnCapture(to));
        }
        let promotes = piece == Piece::Pawn && to.rank() == geometry::promotion_rank(color);
        if promote.is_some() && !promotes {
            return Err(MoveError::BadPromotion { from, to });
        }
        if !self.is_basically_legal_move_to(pid, to) {
            return Err(MoveError::Unreachable { from, to });
        }
        if !self.is_legal_move_to(pid, to) {
            return Err(MoveError::KingInCheck { from, to });
        }
        let promote = match promotes {
            true => Some(Piece::from(promote.unwrap_or(PromotePiece::Queen))),
            false => None,
        };
        self.do_move(pid, from, to, promote);
        Ok(())
    }

    fn take_off(&mut self, sq: Coord) {
        if let Some(victim) = self.occupant[sq.index()].take() {
            trace!("{} captured on {}", self.lp(victim).piece.as_char(), sq);
            let clock = self.clock;
            self.lp_mut(victim).kill(clock);
        }
        self.r.put(sq, Cell::EMPTY);
    }

    fn relocate(&mut self, pid: PieceId, from: Coord, to: Coord) {
        let cell = self.r.get(from);
        self.r.put(from, Cell::EMPTY);
        self.r.put(to, cell);
        self.occupant[from.index()] = None;
        self.occupant[to.index()] = Some(pid);
        self.lp_mut(pid).sq = to;
    }

    fn do_move(&mut self, pid: PieceId, from: Coord, to: Coord, promote: Option<Piece>) {
        self.clock += 1;
        let clock = self.clock;
        let color = self.r.side;
        let piece = self.lp(pid).piece;
        let mut changed = vec![from, to];
        let mut movers = vec![pid];

        let mut capture = self.occupant[to.index()].is_some();
        if capture {
            self.take_off(to);
        } else if piece == Piece::Pawn && from.file() != to.file() {
            let victim = Coord::from_parts(to.file(), from.rank());
            self.take_off(victim);
            changed.push(victim);
            capture = true;
        }
        self.relocate(pid, from, to);

        if piece == Piece::King && from.file().index().abs_diff(to.file().index()) == 2 {
            let side = match to.file() {
                File::G => CastlingSide::King,
                _ => CastlingSide::Queen,
            };
            let (rook_src, rook_dst) = side.rook_files();
            let rook_from = Coord::from_parts(rook_src, from.rank());
            let rook_to = Coord::from_parts(rook_dst, from.rank());
            match self.occupant[rook_from.index()] {
                Some(rook) => {
                    self.relocate(rook, rook_from, rook_to);
                    movers.push(rook);
                    changed.push(rook_from);
                    changed.push(rook_to);
                }
                None => warn!("castling without a rook on {}", rook_from),
            }
        }

        if piece == Piece::King {
            self.r.castling.unset_color(color);
        }
        for c in [Color::White, Color::Black] {
            let rank = geometry::castling_rank(c);
            for side in [CastlingSide::Queen, CastlingSide::King] {
                let corner = Coord::from_parts(side.rook_files().0, rank);
                if from == corner || to == corner {
                    self.r.castling.unset(c, side);
                }
            }
        }

        let double_step = piece == Piece::Pawn
            && from.rank().index().abs_diff(to.rank().index()) == 2;
        self.r.ep_source = if double_step { Some(to) } else { None };
        if piece == Piece::Pawn || capture {
            self.r.move_counter = 0;
        } else {
            self.r.move_counter += 1;
        }
        if color == Color::Black {
            self.r.move_number += 1;
        }
        self.r.side = color.inv();

        if let Some(promoted) = promote {
            self.pieces[pid.index()] = LivePiece::new(pid, color, promoted, to);
            self.r.put(to, Cell::from_parts(color, promoted));
        }

        for &m in &movers {
            let p = self.lp_mut(m);
            let sq = p.sq;
            p.reseat(sq, clock);
            p.queue.push(0, Task::Propagate(sq));
        }

        let old_penalties = self.penalties;
        self.penalties = self.compute_penalties();
        for sq in Coord::iter() {
            if old_penalties[sq.index()] != self.penalties[sq.index()] && !changed.contains(&sq) {
                changed.push(sq);
            }
        }

        for other in self.live_ids() {
            if !movers.contains(&other) {
                self.update_due_to_move(other, from, to, &changed);
            }
        }

        debug!(
            "applied {}{} at clock {}, {} squares changed",
            from,
            to,
            clock,
            changed.len()
        );
        self.evaluate();
    }

    /// Runs the level loop and all the evaluation steps after it
    pub(crate) fn evaluate(&mut self) {
        let max = self.config.max_hops;
        for p in self.pieces.iter_mut().filter(|p| p.alive) {
            p.clear_move_data();
        }
        for level in 1..=max {
            self.drain_all(level);
            self.update_clash_result_and_rel_evals(true);
            if level == max.min(2) {
                self.mark_check_blocking_squares();
                self.collect_moves();
            }
            if level == max.min(3) {
                self.prepare_moves();
            }
        }
        self.drain_all(max);
        self.update_clash_result_and_rel_evals(false);
        self.refresh_paths();
        self.update_mobility();
        self.count_king_area_attacks();
        self.calc_future_clashes();
        self.add_direct_chances();
        self.check_checking_options();
        self.check_being_trapped_options();
        self.add_castling_chances();
        self.consolidate_all_chances();
        self.evaluate_moves();
        self.rank_moves();

        if let Some(best) = self.ranked[self.r.side.index()].first() {
            debug!("best move for {:?}: {}", self.r.side, best);
        }
    }

    fn drain_all(&mut self, level: u32) {
        let mut count = 0;
        for pid in self.live_ids() {
            count += self.continue_distance_calc(pid, level);
        }
        trace!("level {}: {} tasks run", level, count);
    }

    fn prepare_moves(&mut self) {
        for p in self.pieces.iter_mut().filter(|p| p.alive) {
            for node in p.nodes.iter_mut() {
                node.reset_chances();
            }
            p.move_away.clear();
        }
    }
}

impl FromStr for Board {
    type Err = FenParseError;

    fn from_str(s: &str) -> Result<Board, Self::Err> {
        Ok(Board::from_raw(RawBoard::from_str(s)?)?)
    }
}

impl Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        self.r.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(s: &str) -> Coord {
        Coord::from_str(s).unwrap()
    }

    #[test]
    fn test_initial() {
        const INI_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";
        let board = Board::initial();
        assert_eq!(board.to_string(), INI_FEN);
        assert_eq!(board.pieces().count(), 32);
        assert_eq!(board.legal_move_count(Color::White), 20);
        assert_eq!(board.legal_move_count(Color::Black), 20);
        assert!(!board.is_check(Color::White));
        assert!(!board.is_game_over());
        assert_eq!(board.king_pos(Color::Black), c("e8"));
    }

    #[test]
    fn test_bad_positions() {
        assert_eq!(
            Board::from_fen("4k3/8/8/8/8/8/8/4K2r b - - 0 1").err(),
            Some(FenParseError::Valid(ValidateError::OpponentKingAttacked)),
        );
        assert!(Board::from_fen("8/8/8/8/8/8/8/4K3 w - - 0 1").is_err());
        assert!(matches!(
            Board::with_config(RawBoard::initial(), Config::default().with_max_hops(0)),
            Err(CreateError::Config(_))
        ));
    }

    #[test]
    fn test_rejected_moves() {
        let mut board = Board::initial();
        let before = board.as_fen();
        assert_eq!(
            board.apply_move(c("e3"), c("e4"), None),
            Err(MoveError::NoPiece(c("e3")))
        );
        assert_eq!(
            board.apply_move(c("e7"), c("e5"), None),
            Err(MoveError::WrongSide(c("e7")))
        );
        assert_eq!(
            board.apply_move(c("a1"), c("a2"), None),
            Err(MoveError::OwnCapture(c("a2")))
        );
        assert_eq!(
            board.apply_move(c("e2"), c("e5"), None),
            Err(MoveError::Unreachable {
                from: c("e2"),
                to: c("e5")
            })
        );
        assert_eq!(
            board.apply_move(c("g1"), c("f3"), Some(PromotePiece::Queen)),
            Err(MoveError::BadPromotion {
                from: c("g1"),
                to: c("f3")
            })
        );
        assert!(board.apply_uci("e2e9").is_err());
        assert_eq!(board.as_fen(), before);
        assert_eq!(board.clock(), 0);
    }

    #[test]
    fn test_pinned_piece() {
        let mut board = Board::from_fen("4r1k1/8/8/8/8/8/4N3/4K3 w - - 0 1").unwrap();
        assert_eq!(
            board.apply_move(c("e2"), c("c3"), None),
            Err(MoveError::KingInCheck {
                from: c("e2"),
                to: c("c3")
            })
        );
        assert_eq!(board.legal_move_count(Color::White), 4);
    }

    #[test]
    fn test_special_moves() {
        let mut board =
            Board::from_fen("r3k2r/pppp1ppp/8/4P3/8/8/PPP2PPP/R3K2R b KQkq - 0 1").unwrap();
        board.apply_uci("d7d5").unwrap();
        assert_eq!(board.raw().ep_source, Some(c("d5")));
        board.apply_uci("e5d6").unwrap();
        assert_eq!(board.get(c("d5")), Cell::EMPTY);
        assert_eq!(board.piece_at(c("d6")).map(|p| board.lp(p).piece), Some(Piece::Pawn));

        board.apply_uci("e8c8").unwrap();
        assert_eq!(
            board.get(c("d8")),
            Cell::from_parts(Color::Black, Piece::Rook)
        );
        assert!(!board.raw().castling.has(Color::Black, CastlingSide::King));
        board.apply_uci("e1g1").unwrap();
        assert_eq!(
            board.get(c("f1")),
            Cell::from_parts(Color::White, Piece::Rook)
        );
        assert_eq!(board.raw().move_number, 3);
        assert_eq!(board.raw().move_counter, 2);
    }

    #[test]
    fn test_promotion() {
        let mut board = Board::from_fen("8/1P4k1/8/8/8/8/8/4K3 w - - 0 1").unwrap();
        let pawn = board.piece_at(c("b7")).unwrap();
        board.apply_move(c("b7"), c("b8"), Some(PromotePiece::Knight)).unwrap();
        assert_eq!(board.piece_at(c("b8")), Some(pawn));
        assert_eq!(board.lp(pawn).piece, Piece::Knight);
        assert_eq!(board.distance_to(c("c6"), pawn).dist(), 1);

        let mut board = Board::from_fen("8/1P4k1/8/8/8/8/8/4K3 w - - 0 1").unwrap();
        board.apply_uci("b7b8").unwrap();
        assert_eq!(
            board.get(c("b8")),
            Cell::from_parts(Color::White, Piece::Queen)
        );
    }

    #[test]
    fn test_mate() {
        let mut board = Board::initial();
        for mv in ["f2f3", "e7e5", "g2g4", "d8h4"] {
            board.apply_uci(mv).unwrap();
        }
        assert!(board.is_check(Color::White));
        assert_eq!(board.legal_move_count(Color::White), 0);
        assert!(board.is_game_over());
        assert_eq!(board.best_move(), None);
    }
}
