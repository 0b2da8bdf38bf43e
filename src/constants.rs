//! Constants for board geometry, search parameters and the frame loop.
//!
//! The board size itself is chosen at startup (see [`crate::config`]); the
//! values here are defaults and hard limits.

// =============================================================================
// Board Geometry
// =============================================================================

/// Default board size (NxN). Standard Gomoku is played on 15x15.
pub const DEFAULT_BOARD_SIZE: usize = 15;

/// Smallest board on which a five can fit.
pub const MIN_BOARD_SIZE: usize = WIN_LENGTH;

/// Largest supported board.
pub const MAX_BOARD_SIZE: usize = 25;

/// Number of identical stones in a line needed to win.
pub const WIN_LENGTH: usize = 5;

/// Line directions checked by terminal detection: row, column and both diagonals.
pub const DIRECTIONS: [(isize, isize); 4] = [(1, 0), (0, 1), (1, 1), (1, -1)];

// =============================================================================
// Stone Ids
// =============================================================================

/// Empty cell in the `{0, 1, 2}` grid encoding.
pub const EMPTY_ID: u8 = 0;

/// Stone of the first player.
pub const BLACK_ID: u8 = 1;

/// Stone of the second player.
pub const WHITE_ID: u8 = 2;

// =============================================================================
// MCTS Parameters
// =============================================================================

/// UCT exploration constant, sqrt(2).
pub const UCT_C: f64 = std::f64::consts::SQRT_2;

/// Default number of iterations per AI move.
pub const DEFAULT_ITERATIONS: usize = 20_000;

/// Default budget for the synchronous fallback when the worker fails.
pub const DEFAULT_FALLBACK_ITERATIONS: usize = 2_000;

/// Progress is logged every time this fraction of the budget completes.
pub const REPORT_FRACTION: usize = 10;

// =============================================================================
// Playout Parameters
// =============================================================================

/// Default Chebyshev radius for the near-placement playout.
pub const DEFAULT_NEAR_DISTANCE: usize = 2;

// =============================================================================
// Interactive Loop
// =============================================================================

/// Frames per second of the console loop.
pub const FRAMES_PER_SECOND: u64 = 60;

/// Name given to the background search thread.
pub const WORKER_THREAD_NAME: &str = "mcts-search-worker";
