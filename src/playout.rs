//! Monte Carlo playouts (random game simulation).
//!
//! A playout fills the remaining empty cells with alternating stones until
//! one side makes five or the board is full, then reports the result from the
//! perspective of the side that moved first in the playout.
//!
//! Two move orderings are provided:
//! - [`PlayoutPolicy::Uniform`]: every empty cell is equally likely at each step.
//! - [`PlayoutPolicy::NearPlacementBiased`]: cells close to existing stones are
//!   played first, which makes playouts look more like real Gomoku.

use fastrand::Rng;

use crate::board::{Board, GameStatus, Move, Stone};
use crate::constants::DEFAULT_NEAR_DISTANCE;

/// Result of a playout, relative to the side that moved first.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Win,
    Loss,
    Draw,
}

impl Outcome {
    /// Outcome for `mover` given a finished game status.
    pub fn for_mover(status: GameStatus, mover: Stone) -> Option<Self> {
        match status {
            GameStatus::Ongoing => None,
            GameStatus::Draw => Some(Outcome::Draw),
            GameStatus::Win(s) if s == mover => Some(Outcome::Win),
            GameStatus::Win(_) => Some(Outcome::Loss),
        }
    }

    /// The same result seen from the other side.
    pub fn flip(self) -> Self {
        match self {
            Outcome::Win => Outcome::Loss,
            Outcome::Loss => Outcome::Win,
            Outcome::Draw => Outcome::Draw,
        }
    }
}

/// A rollout strategy. Implementations must terminate within the number of
/// empty cells on `board` and must not depend on anything but their inputs.
pub trait Playout {
    fn rollout(&self, board: &Board, mover: Stone, rng: &mut Rng) -> Outcome;
}

/// Selects which playout the engine uses.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum PlayoutPolicy {
    #[default]
    Uniform,
    NearPlacementBiased { distance: usize },
}

impl PlayoutPolicy {
    pub fn near() -> Self {
        PlayoutPolicy::NearPlacementBiased {
            distance: DEFAULT_NEAR_DISTANCE,
        }
    }
}

impl Playout for PlayoutPolicy {
    fn rollout(&self, board: &Board, mover: Stone, rng: &mut Rng) -> Outcome {
        match *self {
            PlayoutPolicy::Uniform => uniform_playout(board, mover, rng),
            PlayoutPolicy::NearPlacementBiased { distance } => {
                near_placement_playout(board, mover, distance, rng)
            }
        }
    }
}

/// Play all empty cells in a random order, alternating stones from `mover`.
///
/// The shuffle is done incrementally so a playout that ends early only pays
/// for the cells it actually placed.
pub fn uniform_playout(board: &Board, mover: Stone, rng: &mut Rng) -> Outcome {
    let mut board = board.clone();
    let mut empty: Vec<Move> = board.empty_cells().collect();
    let mut stone = mover;

    for step in 0..empty.len() {
        let j = rng.usize(step..empty.len());
        empty.swap(step, j);
        let mv = empty[step];
        board.put(mv, stone);
        if let Some(outcome) = Outcome::for_mover(board.check_game_end(mv), mover) {
            return outcome;
        }
        stone = stone.opponent();
    }

    Outcome::Draw
}

/// Like [`uniform_playout`], but each step prefers empty cells within
/// Chebyshev `distance` of a stone already on the board.
pub fn near_placement_playout(
    board: &Board,
    mover: Stone,
    distance: usize,
    rng: &mut Rng,
) -> Outcome {
    let mut board = board.clone();
    let mut sampler = NearSampler::new(&board, distance);
    let mut stone = mover;

    while let Some(mv) = sampler.next(rng) {
        board.put(mv, stone);
        sampler.occupy(&board, mv);
        if let Some(outcome) = Outcome::for_mover(board.check_game_end(mv), mover) {
            return outcome;
        }
        stone = stone.opponent();
    }

    Outcome::Draw
}

/// Set of cell indices with O(1) insert, remove and uniform pick.
struct CellSet {
    items: Vec<usize>,
    slot: Vec<Option<usize>>,
}

impl CellSet {
    fn new(cells: usize) -> Self {
        Self {
            items: Vec::with_capacity(cells),
            slot: vec![None; cells],
        }
    }

    fn insert(&mut self, i: usize) {
        if self.slot[i].is_none() {
            self.slot[i] = Some(self.items.len());
            self.items.push(i);
        }
    }

    fn remove(&mut self, i: usize) {
        if let Some(pos) = self.slot[i].take() {
            self.items.swap_remove(pos);
            if let Some(&moved) = self.items.get(pos) {
                self.slot[moved] = Some(pos);
            }
        }
    }

    fn pick(&self, rng: &mut Rng) -> Option<usize> {
        if self.items.is_empty() {
            None
        } else {
            Some(self.items[rng.usize(..self.items.len())])
        }
    }

    fn len(&self) -> usize {
        self.items.len()
    }

    fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Move source for the near-placement playout.
///
/// `near` is always a subset of `empty`.
struct NearSampler {
    size: usize,
    distance: usize,
    empty: CellSet,
    near: CellSet,
}

impl NearSampler {
    fn new(board: &Board, distance: usize) -> Self {
        let size = board.size();
        let mut sampler = Self {
            size,
            distance,
            empty: CellSet::new(size * size),
            near: CellSet::new(size * size),
        };
        for mv in board.empty_cells() {
            sampler.empty.insert(mv.row * size + mv.col);
        }
        for row in 0..size {
            for col in 0..size {
                if board.get(row, col).is_some() {
                    sampler.mark_around(board, Move::new(row, col));
                }
            }
        }
        sampler
    }

    fn next(&mut self, rng: &mut Rng) -> Option<Move> {
        let pool = if self.near.is_empty() {
            &self.empty
        } else {
            &self.near
        };
        pool.pick(rng).map(|i| Move::new(i / self.size, i % self.size))
    }

    /// Record that `mv` now holds a stone.
    fn occupy(&mut self, board: &Board, mv: Move) {
        let i = mv.row * self.size + mv.col;
        self.empty.remove(i);
        self.near.remove(i);
        self.mark_around(board, mv);
    }

    fn mark_around(&mut self, board: &Board, at: Move) {
        let d = self.distance;
        let rows = at.row.saturating_sub(d)..=(at.row + d).min(self.size - 1);
        for row in rows {
            let cols = at.col.saturating_sub(d)..=(at.col + d).min(self.size - 1);
            for col in cols {
                if board.get(row, col).is_none() {
                    self.near.insert(row * self.size + col);
                }
            }
        }
    }
}
