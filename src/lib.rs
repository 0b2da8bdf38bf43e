//! gomoku-mcts: a Gomoku engine built on Monte Carlo Tree Search.
//!
//! The engine picks moves with UCT-guided tree search and random playouts.
//! Searches run on a background worker so an interactive loop can keep
//! drawing frames while the engine thinks.
//!
//! ## Modules
//!
//! - [`constants`] - Board limits and engine parameters
//! - [`error`] - Error types
//! - [`config`] - Engine configuration and validation
//! - [`board`] - Board state, move placement and five-in-a-row detection
//! - [`playout`] - Random game simulation for position evaluation
//! - [`tree`] - Arena search tree and UCT bookkeeping
//! - [`mcts`] - Monte Carlo Tree Search
//! - [`worker`] - Background search with a non-blocking poll
//! - [`game`] - Live game state for the interactive thread
//! - [`console`] - Text front end
//!
//! ## Example
//!
//! ```
//! use fastrand::Rng;
//! use gomoku_mcts::board::{Board, Move, Stone};
//! use gomoku_mcts::mcts::search_move;
//! use gomoku_mcts::playout::PlayoutPolicy;
//!
//! let mut board = Board::new(9);
//! board.place(Move::new(4, 4), Stone::Black).unwrap();
//!
//! let mut rng = Rng::with_seed(1);
//! let mv = search_move(&board, Stone::White, 200, &PlayoutPolicy::Uniform, &mut rng).unwrap();
//! assert!(board.get(mv.row, mv.col).is_none());
//! ```

pub mod board;
pub mod config;
pub mod console;
pub mod constants;
pub mod error;
pub mod game;
pub mod mcts;
pub mod playout;
pub mod tree;
pub mod worker;
