//! Live game state owned by the interactive thread.
//!
//! [`Game`] holds the only mutable board. The human's moves are applied by
//! [`Game::play`]; the engine's moves arrive through [`Game::tick`], which
//! the frame loop calls once per frame.

use tracing::{debug, info, warn};

use crate::board::{Board, GameStatus, Move, Stone};
use crate::config::EngineConfig;
use crate::error::{ConfigError, MoveError};
use crate::playout::PlayoutPolicy;
use crate::worker::{AsyncSearch, SearchPoll, SearchState};

/// Who places the first stone of a game.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum FirstMover {
    #[default]
    Player,
    Ai,
}

impl FirstMover {
    fn index(self) -> u8 {
        match self {
            FirstMover::Player => 0,
            FirstMover::Ai => 1,
        }
    }
}

pub struct Game {
    board: Board,
    who_first: FirstMover,
    next_who_first: FirstMover,
    players_turn: bool,
    history: Vec<Move>,
    status: GameStatus,
    ai: AsyncSearch<PlayoutPolicy>,
}

impl Game {
    /// Start a game. If the engine moves first its search is requested at once.
    pub fn new(config: &EngineConfig, first: FirstMover) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut game = Self {
            board: Board::new(config.board_size),
            who_first: first,
            next_who_first: first,
            players_turn: true,
            history: Vec::new(),
            status: GameStatus::Ongoing,
            ai: AsyncSearch::from_config(config),
        };
        game.new_game();
        Ok(game)
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Placed moves, oldest first.
    pub fn history(&self) -> &[Move] {
        &self.history
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    pub fn is_players_turn(&self) -> bool {
        self.players_turn
    }

    pub fn who_first(&self) -> FirstMover {
        self.who_first
    }

    pub fn next_who_first(&self) -> FirstMover {
        self.next_who_first
    }

    pub fn search_state(&self) -> SearchState {
        self.ai.state()
    }

    pub fn player_stone(&self) -> Stone {
        stone_of(1 + self.who_first.index())
    }

    pub fn ai_stone(&self) -> Stone {
        stone_of(2 - self.who_first.index())
    }

    /// Choose who moves first in the next game.
    pub fn set_next_first(&mut self, first: FirstMover) {
        self.next_who_first = first;
    }

    /// Clear the board and start over with the pending first-mover choice.
    pub fn new_game(&mut self) {
        self.ai.discard();
        self.board = Board::new(self.board.size());
        self.history.clear();
        self.status = GameStatus::Ongoing;
        self.who_first = self.next_who_first;
        self.players_turn = self.who_first == FirstMover::Player;
        info!(first = ?self.who_first, size = self.board.size(), "new game");
        if !self.players_turn {
            self.request_ai();
        }
    }

    /// Place the human's stone and hand the turn to the engine.
    pub fn play(&mut self, mv: Move) -> Result<GameStatus, MoveError> {
        if self.status.is_terminal() {
            return Err(MoveError::GameOver);
        }
        if !self.players_turn {
            return Err(MoveError::NotPlayersTurn);
        }
        let stone = self.player_stone();
        self.board.place(mv, stone)?;
        self.record(mv, stone);
        if !self.status.is_terminal() {
            self.players_turn = false;
            self.request_ai();
        }
        Ok(self.status)
    }

    /// Poll the engine once. Returns the engine's move when one was applied.
    pub fn tick(&mut self) -> Option<Move> {
        let SearchPoll::Move(mv) = self.ai.poll_result() else {
            return None;
        };
        if self.players_turn || self.status.is_terminal() {
            debug!(%mv, "ignoring engine move outside its turn");
            return None;
        }
        let stone = self.ai_stone();
        if let Err(err) = self.board.place(mv, stone) {
            warn!(%err, "engine produced an illegal move, searching again");
            self.request_ai();
            return None;
        }
        self.record(mv, stone);
        self.players_turn = true;
        Some(mv)
    }

    /// Take back up to the last two placements so it is the human's turn
    /// again. Refused while the engine is thinking.
    pub fn withdraw(&mut self) -> Result<usize, MoveError> {
        if self.ai.is_running() {
            return Err(MoveError::NotPlayersTurn);
        }
        self.ai.discard();

        let mut removed = 0;
        while removed < 2 {
            let Some(mv) = self.history.pop() else {
                break;
            };
            self.board.remove(mv);
            removed += 1;
            if self.stone_to_move() == self.player_stone() {
                break;
            }
        }

        self.status = GameStatus::Ongoing;
        self.players_turn = self.stone_to_move() == self.player_stone();
        debug!(removed, remaining = self.history.len(), "moves withdrawn");
        if !self.players_turn {
            self.request_ai();
        }
        Ok(removed)
    }

    fn stone_to_move(&self) -> Stone {
        if self.history.len() % 2 == 0 {
            Stone::Black
        } else {
            Stone::White
        }
    }

    fn record(&mut self, mv: Move, stone: Stone) {
        self.history.push(mv);
        self.status = self.board.check_game_end(mv);
        debug!(%mv, stone = stone.id(), status = ?self.status, "stone placed");
        if self.status.is_terminal() {
            info!(status = ?self.status, moves = self.history.len(), "game over");
        }
    }

    fn request_ai(&mut self) {
        if let Err(err) = self.ai.request_search(&self.board, self.ai_stone()) {
            warn!(%err, "engine search not started");
        }
    }
}

fn stone_of(id: u8) -> Stone {
    if id == 1 { Stone::Black } else { Stone::White }
}
