use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::str::FromStr;
use tideval::raw::RawBoard;
use tideval::{Board, Color, Config, Coord, PieceId};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn c(s: &str) -> Coord {
    Coord::from_str(s).unwrap()
}

fn board_with_hops(fen: &str, max_hops: u32) -> Board {
    let raw = RawBoard::from_fen(fen).unwrap();
    Board::with_config(raw, Config::default().with_max_hops(max_hops)).unwrap()
}

fn assert_same_raw_distances(a: &Board, b: &Board) {
    for sq in Coord::iter() {
        let (Some(pa), Some(pb)) = (a.piece_at(sq), b.piece_at(sq)) else {
            assert_eq!(a.piece_at(sq).is_some(), b.piece_at(sq).is_some(), "occupant of {}", sq);
            continue;
        };
        for target in Coord::iter() {
            let da = a.raw_distance_to(target, pa);
            let db = b.raw_distance_to(target, pb);
            assert_eq!(
                (da.dist(), da.nr_of_conditions()),
                (db.dist(), db.nr_of_conditions()),
                "piece on {} to {}: {} vs {}",
                sq,
                target,
                da,
                db
            );
        }
    }
}

fn white_ids(board: &Board) -> Vec<PieceId> {
    board
        .pieces()
        .filter(|p| p.color() == Color::White)
        .map(|p| p.id())
        .collect()
}

#[test]
fn test_opening_moves_at_one_hop() {
    init_logger();
    let board = board_with_hops("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1", 1);
    assert!(!board.has_pending_updates_up_to(1));
    let moves = board.legal_moves(Color::White);
    assert_eq!(moves.len(), 20);
    for mv in &moves {
        let pid = board.piece_at(mv.from).unwrap();
        let d = board.distance_to(mv.to, pid);
        assert_eq!(d.dist(), 1, "{}", mv);
        assert!(d.is_unconditional(), "{}", mv);
    }

    let mut direct = 0;
    for pid in white_ids(&board) {
        for sq in Coord::iter() {
            let d = board.distance_to(sq, pid);
            if d.dist() == 1 && d.is_unconditional() {
                direct += 1;
            }
        }
    }
    assert_eq!(direct, 20);
}

#[test]
fn test_rook_behind_own_pawn() {
    init_logger();
    let board = Board::from_fen("4k3/8/8/8/8/8/P7/R3K3 w - - 0 1").unwrap();
    let rook = board.piece_at(c("a1")).unwrap();
    for target in ["a3", "a5", "a8"] {
        let d = board.raw_distance_to(c(target), rook);
        assert_eq!(d.dist(), 2, "{}", target);
        assert_eq!(d.nr_of_conditions(), 1, "{}", target);
        assert_eq!(d.conditions()[0].from, Some(c("a2")));
        assert_eq!(d.conditions()[0].side, Color::White);
    }
}

#[test]
fn test_knight_fork() {
    init_logger();
    let board = Board::from_fen("7k/8/5r2/8/1r6/2N5/8/7K w - - 0 1").unwrap();
    let knight = board.piece_at(c("c3")).unwrap();
    let d5 = board.distance_to(c("d5"), knight);
    assert_eq!(d5.dist(), 1);
    assert!(d5.is_unconditional());
    assert_eq!(board.fork_chance(c("d5"), knight), 500);
}

#[test]
fn test_knight_fork_takes_second_best() {
    init_logger();
    let board = Board::from_fen("7k/8/5r2/8/1q6/2N5/8/7K w - - 0 1").unwrap();
    let knight = board.piece_at(c("c3")).unwrap();
    assert_eq!(board.fork_chance(c("d5"), knight), 500);
}

#[test]
fn test_round_trip_restores_distances() {
    init_logger();
    let initial = Board::initial();
    let mut board = Board::initial();
    for mv in ["g1f3", "g8f6", "f3g1", "f6g8"] {
        board.apply_uci(mv).unwrap();
        assert!(!board.has_pending_updates_up_to(board.config().max_hops));
    }
    assert_same_raw_distances(&board, &initial);
}

#[test]
fn test_random_playout_matches_fresh_board() {
    init_logger();
    let config = Config::default();
    for seed in 0..10 {
        let mut rng = StdRng::seed_from_u64(20240917 + seed);
        let mut board = Board::with_config(RawBoard::initial(), config).unwrap();
        for ply in 1..=30 {
            let moves = board.legal_moves(board.side());
            let Some(mv) = moves.choose(&mut rng) else {
                break;
            };
            board.apply_move(mv.from, mv.to, mv.promote).unwrap();
            assert!(!board.has_pending_updates_up_to(config.max_hops));
            if ply % 10 != 0 {
                continue;
            }
            let raw = RawBoard::from_fen(&board.as_fen()).unwrap();
            let fresh = Board::with_config(raw, config).unwrap();
            assert_same_raw_distances(&board, &fresh);
            assert_eq!(
                board.legal_move_count(board.side()),
                fresh.legal_move_count(fresh.side())
            );
        }
    }
}

#[test]
fn test_long_conditional_path() {
    init_logger();
    let fen = "rnbqkb1r/1ppp1ppp/4p3/p2P4/5BP1/6n1/PPPQPP1P/RN2KBNR w KQkq - 5 6";
    let board = board_with_hops(fen, 4);
    let rook = board.piece_at(c("a8")).unwrap();
    let g2 = board.raw_distance_to(c("g2"), rook);
    assert_eq!(g2.dist(), 4, "{}", g2);
    assert!(!g2.is_unconditional(), "{}", g2);
}

#[test]
fn test_predecessors_are_nearer() {
    init_logger();
    let board = Board::from_fen(
        "r1b1k2r/2qnbppp/p2ppn2/1p4B1/3NPPP1/2N2Q2/PPP4P/2KR1B1R w kq - 0 11",
    )
    .unwrap();
    for p in board.pieces() {
        for sq in Coord::iter() {
            let d = board.raw_distance_to(sq, p.id());
            if d.is_infinite() || d.dist() == 0 {
                continue;
            }
            let preds = board.predecessors(sq, p.id());
            assert!(!preds.is_empty(), "{} on {} to {}", p.piece().as_char(), p.sq(), sq);
            for pred in preds {
                let pd = board.raw_distance_to(pred, p.id());
                assert!(pd.dist() < d.dist(), "{} on {}: {} before {}", p.piece().as_char(), p.sq(), pred, sq);
            }
        }
    }
}

#[test]
fn test_rejected_move_keeps_board() {
    init_logger();
    let mut board = Board::initial();
    let before = board.as_fen();
    assert!(board.apply_uci("e2e5").is_err());
    assert!(board.apply_uci("e7e5").is_err());
    assert_eq!(board.as_fen(), before);
    assert_eq!(board.side(), Color::White);
}
