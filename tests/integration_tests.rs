//! Integration tests for gomoku-mcts
//!
//! These exercise the public API end to end: board rules, playouts, the
//! search, the background orchestrator and the live game.

use std::thread;
use std::time::{Duration, Instant};

use fastrand::Rng;
use gomoku_mcts::board::{Board, GameStatus, Move, Stone};
use gomoku_mcts::config::EngineConfig;
use gomoku_mcts::game::{FirstMover, Game};
use gomoku_mcts::mcts::{search_move, tree_search};
use gomoku_mcts::playout::{Outcome, Playout, PlayoutPolicy};
use gomoku_mcts::tree::SearchTree;
use gomoku_mcts::worker::{AsyncSearch, SearchPoll, SearchState};

// =============================================================================
// Helper functions
// =============================================================================

/// Full 15x15 board with no five anywhere, except (0, 0) left empty.
/// Black is to move and (0, 0) is the last cell.
fn nearly_full_board() -> Board {
    let ids: Vec<Vec<u8>> = (0..15)
        .map(|r| {
            (0..15)
                .map(|c| match (r, c) {
                    (0, 0) => 0,
                    _ if (2 * r + c) % 4 < 2 => 1,
                    _ => 2,
                })
                .collect()
        })
        .collect();
    Board::from_ids(&ids).unwrap()
}

fn wait_for_move(search: &mut AsyncSearch<PlayoutPolicy>) -> Move {
    let deadline = Instant::now() + Duration::from_secs(30);
    loop {
        if let SearchPoll::Move(mv) = search.poll_result() {
            return mv;
        }
        assert!(Instant::now() < deadline, "search never finished");
        thread::sleep(Duration::from_millis(1));
    }
}

fn small_config() -> EngineConfig {
    EngineConfig {
        board_size: 9,
        iterations: 200,
        fallback_iterations: 20,
        policy: PlayoutPolicy::Uniform,
        seed: Some(77),
    }
}

// =============================================================================
// Terminal detection
// =============================================================================

#[test]
fn test_horizontal_five_from_center() {
    let mut board = Board::new(15);
    for col in 7..11 {
        board.place(Move::new(7, col), Stone::Black).unwrap();
        board.place(Move::new(0, col), Stone::White).unwrap();
    }
    assert_eq!(board.check_game_end(Move::new(7, 10)), GameStatus::Ongoing);

    board.place(Move::new(7, 11), Stone::Black).unwrap();
    assert_eq!(
        board.check_game_end(Move::new(7, 11)),
        GameStatus::Win(Stone::Black)
    );
    assert_eq!(board.is_game_end(Stone::Black), GameStatus::Win(Stone::Black));
    assert_eq!(board.is_game_end(Stone::White), GameStatus::Ongoing);
}

#[test]
fn test_last_cell_without_five_is_draw() {
    let mut board = nearly_full_board();
    assert!(!board.is_decided());
    assert_eq!(board.stone_count(), 224);

    board.place(Move::new(0, 0), Stone::Black).unwrap();
    assert!(board.is_full());
    assert_eq!(board.check_game_end(Move::new(0, 0)), GameStatus::Draw);
    assert_eq!(board.is_game_end(Stone::Black), GameStatus::Draw);
}

#[test]
fn test_anchored_and_full_scan_agree_in_random_games() {
    let mut rng = Rng::with_seed(2024);
    for _ in 0..30 {
        let mut board = Board::new(9);
        let mut stone = Stone::Black;
        loop {
            let empty: Vec<Move> = board.empty_cells().collect();
            let mv = empty[rng.usize(..empty.len())];
            board.place(mv, stone).unwrap();

            let anchored = board.check_game_end(mv);
            assert_eq!(anchored, board.is_game_end(stone), "at {mv}\n{board}");
            if anchored.is_terminal() {
                break;
            }
            stone = stone.opponent();
        }
    }
}

// =============================================================================
// Playouts
// =============================================================================

#[test]
fn test_playouts_terminate_on_every_board_size() {
    let mut rng = Rng::with_seed(9);
    for size in [5, 9, 15, 19] {
        let mut board = Board::new(size);
        board.place(board.center(), Stone::Black).unwrap();
        for policy in [PlayoutPolicy::Uniform, PlayoutPolicy::near()] {
            for _ in 0..10 {
                let outcome = policy.rollout(&board, Stone::White, &mut rng);
                assert!(matches!(
                    outcome,
                    Outcome::Win | Outcome::Loss | Outcome::Draw
                ));
            }
        }
    }
}

#[test]
fn test_last_cell_playout_is_draw() {
    let board = nearly_full_board();
    let mut rng = Rng::with_seed(1);
    for policy in [PlayoutPolicy::Uniform, PlayoutPolicy::near()] {
        assert_eq!(policy.rollout(&board, Stone::Black, &mut rng), Outcome::Draw);
    }
}

// =============================================================================
// Tree search
// =============================================================================

#[test]
fn test_root_children_account_for_whole_budget() {
    let mut board = Board::new(9);
    board.place(Move::new(4, 4), Stone::Black).unwrap();
    let mut tree = SearchTree::new(board, Stone::White);
    let mut rng = Rng::with_seed(3);
    let mv = tree_search(&mut tree, 1000, &PlayoutPolicy::Uniform, &mut rng).unwrap();

    let root = tree.get(tree.root());
    assert_eq!(root.children().count(), 80);
    let visits: u32 = root.children().map(|c| tree.get(c).total_rounds).sum();
    assert_eq!(visits, 1000);
    assert_ne!(mv, Move::new(4, 4));

    let per_depth = tree.nodes_per_depth();
    assert_eq!(per_depth[0], 1);
    assert_eq!(per_depth[1], 80);
    assert_eq!(per_depth.iter().sum::<usize>(), tree.node_count());
    assert_eq!(per_depth.len(), tree.depth());
}

#[test]
fn test_only_move_is_found() {
    let mut board = nearly_full_board();
    board.remove(Move::new(14, 14));
    let mut rng = Rng::with_seed(5);
    // Two empty cells left.
    let mv = search_move(&board, Stone::White, 50, &PlayoutPolicy::Uniform, &mut rng).unwrap();
    assert!(mv == Move::new(0, 0) || mv == Move::new(14, 14));
}

#[test]
fn test_blocks_four() {
    let mut board = Board::new(7);
    for col in 1..5 {
        board.place(Move::new(3, col), Stone::White).unwrap();
    }
    for mv in [(3, 0), (0, 6), (6, 6), (6, 0)] {
        board.place(Move::new(mv.0, mv.1), Stone::Black).unwrap();
    }

    let mut rng = Rng::with_seed(12);
    let mv = search_move(&board, Stone::Black, 10_000, &PlayoutPolicy::Uniform, &mut rng)
        .unwrap();
    assert_eq!(mv, Move::new(3, 5));
}

// =============================================================================
// Orchestrator and live game
// =============================================================================

#[test]
fn test_orchestrator_round_trip() {
    let mut search = AsyncSearch::from_config(&small_config());
    let mut board = Board::new(9);
    board.place(Move::new(4, 4), Stone::Black).unwrap();

    assert_eq!(search.state(), SearchState::Idle);
    search.request_search(&board, Stone::White).unwrap();
    let mv = wait_for_move(&mut search);
    board.place(mv, Stone::White).unwrap();
    assert_eq!(search.poll_result(), SearchPoll::NotReady);

    search.request_search(&board, Stone::Black).unwrap();
    let mv = wait_for_move(&mut search);
    assert!(board.place(mv, Stone::Black).is_ok());
}

#[test]
fn test_full_game_reaches_an_end() {
    let mut game = Game::new(&small_config(), FirstMover::Ai).unwrap();
    let mut rng = Rng::with_seed(8);
    let deadline = Instant::now() + Duration::from_secs(120);

    while !game.status().is_terminal() {
        assert!(Instant::now() < deadline, "game did not finish");
        if game.is_players_turn() {
            let empty: Vec<Move> = game.board().empty_cells().collect();
            let mv = empty[rng.usize(..empty.len())];
            game.play(mv).unwrap();
        } else {
            game.tick();
            thread::sleep(Duration::from_millis(1));
        }
    }

    let history = game.history();
    assert_eq!(history.len(), game.board().stone_count());
    assert_eq!(game.board().get(history[0].row, history[0].col), Some(Stone::Black));
    assert_eq!(history[0], Move::new(4, 4));
}
