//! Error types shared across the engine.

use thiserror::Error;

/// Why a stone could not be placed. The board is left unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoveError {
    #[error("illegal move: ({row}, {col}) is off the {size}x{size} board")]
    OutOfRange { row: usize, col: usize, size: usize },
    #[error("illegal move: ({row}, {col}) is not empty")]
    Occupied { row: usize, col: usize },
    #[error("not your turn: the engine is thinking")]
    NotPlayersTurn,
    #[error("the game is over")]
    GameOver,
}

/// Failures at the search boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SearchError {
    #[error("iteration budget must be at least 1")]
    InsufficientBudget,
    #[error("search requested on a board that is already decided")]
    TerminalBoard,
    #[error("a search is already outstanding")]
    AlreadyRunning,
    #[error("search worker failed: {0}")]
    WorkerFailure(String),
}

/// Rejected engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("board size {0} is too small, need at least {1}")]
    BoardTooSmall(usize, usize),
    #[error("board size {0} is too large, at most {1} is supported")]
    BoardTooLarge(usize, usize),
    #[error("iteration budget must be positive")]
    ZeroIterations,
    #[error("fallback budget {fallback} must be between 1 and the main budget {budget}")]
    FallbackExceedsBudget { fallback: usize, budget: usize },
    #[error("near-placement distance must be positive")]
    ZeroNearDistance,
}

/// A `{0, 1, 2}` grid that does not describe a board.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GridError {
    #[error("grid is not square: row {row} has {len} cells, expected {size}")]
    NotSquare { row: usize, len: usize, size: usize },
    #[error("cell ({row}, {col}) holds {value}, expected 0, 1 or 2")]
    InvalidCell { row: usize, col: usize, value: u8 },
}
