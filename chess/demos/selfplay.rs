// Plays a short game of the engine against itself, printing the evaluation after each move

use tideval::{board::Board, Color, Config};
use tideval::raw::RawBoard;
use std::env;

fn main() {
    env_logger::init();

    let plies: usize = env::args()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or(20);
    let config = Config::default().with_max_hops(5);
    let mut board = match Board::with_config(RawBoard::initial(), config) {
        Ok(b) => b,
        Err(e) => {
            eprintln!("cannot create board: {}", e);
            return;
        }
    };

    for _ in 0..plies {
        if board.is_game_over() {
            println!("Game over");
            break;
        }
        let Some(mv) = board.best_move() else {
            println!("No move found");
            break;
        };
        let side = match board.side() {
            Color::White => "White",
            Color::Black => "Black",
        };
        let eval = board.best_move_evaluation().unwrap_or_default();
        println!("{:>3}. {} plays {} (expects {})", board.raw().move_number, side, mv, eval);
        if let Err(e) = board.apply_move(mv.from, mv.to, mv.promote) {
            eprintln!("engine move {} rejected: {}", mv, e);
            break;
        }
        println!(
            "     material {}, position {}",
            board.position_evaluation(1),
            board.position_evaluation(8)
        );
    }
    println!("{}", board.as_fen());
}
