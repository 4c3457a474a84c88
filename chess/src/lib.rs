//! # Tideval
//!
//! Chess position evaluation by conditional distances.
//!
//! For every piece and every square, the engine keeps the number of moves the piece needs to get
//! there, together with the conditions that must hold on the way (e.g. "the pawn on e2 moves
//! away first"). Distances are kept up to date incrementally after each move, one hop level at a
//! time for all pieces at once. On top of them, every square gets an exchange evaluation, and
//! every piece collects the chances it can realize within a few moves. The chances finally rank
//! the candidate moves.
//!
//! # Example
//!
//! ```
//! use tideval::{board::Board, Color};
//!
//! let mut board = Board::initial();
//! board.apply_uci("e2e4").unwrap();
//! board.apply_uci("e7e5").unwrap();
//! assert_eq!(board.side(), Color::White);
//! let best = board.best_move().unwrap();
//! println!("best move: {}", best);
//! ```

pub mod board;
pub mod chances;
pub mod config;
pub mod distance;
pub mod eval;
pub mod evaluate;
pub mod legal;
pub mod moves;
pub mod node;
pub mod piece;
pub mod raw;
pub mod square;
pub mod types;

mod benefit;
mod movegen;
mod propagate;
mod ranking;

pub use board::Board;
pub use config::Config;
pub use types::{CastlingRights, CastlingSide, Cell, Color, Coord, File, Piece, PieceId, Rank};
