//! Gomoku board: a square grid of stones plus game-end detection.
//!
//! Cells hold `Option<Stone>`; the external `{0, 1, 2}` grid encoding is
//! converted at the edges with [`Board::from_ids`] and [`Board::to_ids`].

use std::fmt;

use crate::constants::{BLACK_ID, DIRECTIONS, EMPTY_ID, WHITE_ID, WIN_LENGTH};
use crate::error::{GridError, MoveError};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Stone {
    Black = BLACK_ID,
    White = WHITE_ID,
}

impl Stone {
    /// The other side (1 <-> 2).
    #[inline]
    pub fn opponent(self) -> Self {
        match self {
            Stone::Black => Stone::White,
            Stone::White => Stone::Black,
        }
    }

    #[inline]
    pub fn id(self) -> u8 {
        self as u8
    }

    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            BLACK_ID => Some(Stone::Black),
            WHITE_ID => Some(Stone::White),
            _ => None,
        }
    }
}

/// Zero-based row/column on the board.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Move {
    pub row: usize,
    pub col: usize,
}

impl Move {
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum GameStatus {
    Ongoing,
    Win(Stone),
    Draw,
}

impl GameStatus {
    #[inline]
    pub fn is_terminal(self) -> bool {
        !matches!(self, GameStatus::Ongoing)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Board {
    size: usize,
    cells: Vec<Option<Stone>>,
    stones: usize,
}

impl Board {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            cells: vec![None; size * size],
            stones: 0,
        }
    }

    /// Build a board from rows of stone ids (0 = empty, 1, 2).
    pub fn from_ids<R: AsRef<[u8]>>(rows: &[R]) -> Result<Self, GridError> {
        let size = rows.len();
        let mut board = Board::new(size);
        for (row, cells) in rows.iter().enumerate() {
            let cells = cells.as_ref();
            if cells.len() != size {
                return Err(GridError::NotSquare {
                    row,
                    len: cells.len(),
                    size,
                });
            }
            for (col, &value) in cells.iter().enumerate() {
                if value == EMPTY_ID {
                    continue;
                }
                let stone =
                    Stone::from_id(value).ok_or(GridError::InvalidCell { row, col, value })?;
                board.put(Move::new(row, col), stone);
            }
        }
        Ok(board)
    }

    pub fn to_ids(&self) -> Vec<Vec<u8>> {
        (0..self.size)
            .map(|row| (0..self.size).map(|col| self.cell_id(row, col)).collect())
            .collect()
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    fn idx(&self, row: usize, col: usize) -> usize {
        row * self.size + col
    }

    #[inline]
    pub fn in_bounds(&self, row: usize, col: usize) -> bool {
        row < self.size && col < self.size
    }

    /// Stone at (row, col); `None` for empty or off-board cells.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> Option<Stone> {
        if !self.in_bounds(row, col) {
            return None;
        }
        self.cells[self.idx(row, col)]
    }

    pub fn cell_id(&self, row: usize, col: usize) -> u8 {
        self.get(row, col).map_or(EMPTY_ID, Stone::id)
    }

    #[inline]
    pub fn stone_count(&self) -> usize {
        self.stones
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.stones == self.cells.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.stones == 0
    }

    pub fn center(&self) -> Move {
        Move::new(self.size / 2, self.size / 2)
    }

    /// All empty cells in row-major order.
    pub fn empty_cells(&self) -> impl Iterator<Item = Move> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, c)| c.is_none())
            .map(|(i, _)| Move::new(i / self.size, i % self.size))
    }

    /// Check that `mv` targets an empty cell on the board.
    pub fn check_move(&self, mv: Move) -> Result<(), MoveError> {
        if !self.in_bounds(mv.row, mv.col) {
            return Err(MoveError::OutOfRange {
                row: mv.row,
                col: mv.col,
                size: self.size,
            });
        }
        if self.get(mv.row, mv.col).is_some() {
            return Err(MoveError::Occupied {
                row: mv.row,
                col: mv.col,
            });
        }
        Ok(())
    }

    /// Place a stone, rejecting occupied and off-board cells.
    pub fn place(&mut self, mv: Move, stone: Stone) -> Result<(), MoveError> {
        self.check_move(mv)?;
        self.put(mv, stone);
        Ok(())
    }

    /// Place without validation. Callers guarantee `mv` is an empty on-board cell.
    #[inline]
    pub(crate) fn put(&mut self, mv: Move, stone: Stone) {
        let i = self.idx(mv.row, mv.col);
        debug_assert!(self.cells[i].is_none(), "put on occupied cell {mv}");
        self.cells[i] = Some(stone);
        self.stones += 1;
    }

    /// Clear a cell. Returns the stone that was there.
    pub fn remove(&mut self, mv: Move) -> Option<Stone> {
        if !self.in_bounds(mv.row, mv.col) {
            return None;
        }
        let i = self.idx(mv.row, mv.col);
        let old = self.cells[i].take();
        if old.is_some() {
            self.stones -= 1;
        }
        old
    }

    /// Cell `k` steps from `from` along `(dr, dc)`, if it is on the board.
    #[inline]
    fn offset(&self, from: Move, dr: isize, dc: isize, k: isize) -> Option<Move> {
        let row = from.row as isize + dr * k;
        let col = from.col as isize + dc * k;
        if row < 0 || col < 0 || row >= self.size as isize || col >= self.size as isize {
            return None;
        }
        Some(Move::new(row as usize, col as usize))
    }

    /// Length of the run of `stone` through `at` along one direction,
    /// looking at most `WIN_LENGTH - 1` cells each way.
    fn run_through(&self, at: Move, stone: Stone, (dr, dc): (isize, isize)) -> usize {
        let mut count = 1;
        for sign in [1, -1] {
            for k in 1..WIN_LENGTH as isize {
                match self.offset(at, dr * sign, dc * sign, k) {
                    Some(m) if self.get(m.row, m.col) == Some(stone) => count += 1,
                    _ => break,
                }
            }
        }
        count
    }

    /// Game-end detection anchored at the most recently placed stone.
    ///
    /// Only a line through `last` can have just become five, so the scan is
    /// limited to the four directions through that cell.
    pub fn check_game_end(&self, last: Move) -> GameStatus {
        if let Some(stone) = self.get(last.row, last.col) {
            if DIRECTIONS
                .iter()
                .any(|&dir| self.run_through(last, stone, dir) >= WIN_LENGTH)
            {
                return GameStatus::Win(stone);
            }
        }
        if self.is_full() {
            GameStatus::Draw
        } else {
            GameStatus::Ongoing
        }
    }

    /// Full-board game-end detection for `stone`: scans every row, column
    /// and both diagonal families for a run of five.
    pub fn is_game_end(&self, stone: Stone) -> GameStatus {
        for &(dr, dc) in &DIRECTIONS {
            for row in 0..self.size {
                for col in 0..self.size {
                    let start = Move::new(row, col);
                    // Walk each line once, from the cell whose predecessor is off-board.
                    if self.offset(start, dr, dc, -1).is_some() {
                        continue;
                    }
                    let mut count = 0;
                    let mut k = 0;
                    while let Some(m) = self.offset(start, dr, dc, k) {
                        if self.get(m.row, m.col) == Some(stone) {
                            count += 1;
                            if count >= WIN_LENGTH {
                                return GameStatus::Win(stone);
                            }
                        } else {
                            count = 0;
                        }
                        k += 1;
                    }
                }
            }
        }
        if self.is_full() {
            GameStatus::Draw
        } else {
            GameStatus::Ongoing
        }
    }

    /// Whether either side already has five anywhere, or the board is full.
    pub fn is_decided(&self) -> bool {
        self.is_full()
            || [Stone::Black, Stone::White]
                .iter()
                .any(|&s| self.is_game_end(s).is_terminal())
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "   ")?;
        for col in 0..self.size {
            write!(f, "{col:>3}")?;
        }
        writeln!(f)?;
        for row in 0..self.size {
            write!(f, "{row:>3}")?;
            for col in 0..self.size {
                let ch = match self.get(row, col) {
                    Some(Stone::Black) => 'X',
                    Some(Stone::White) => 'O',
                    None => '.',
                };
                write!(f, "{ch:>3}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
