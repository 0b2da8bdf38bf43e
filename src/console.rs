//! Text console for playing against the engine.
//!
//! Lines are read on a separate thread and handed to a fixed-cadence frame
//! loop. Each frame drains pending input, polls the game once and sleeps out
//! the rest of the frame, so a running search never stalls the console.
//!
//! ## Commands
//!
//! - `<row> <col>` or `place <row> <col>` - Place your stone
//! - `new` - Start a new game
//! - `undo` - Take back your last move and the engine's reply
//! - `first player|ai` - Choose who moves first in the next game
//! - `history` - List the moves of the current game
//! - `show` - Print the board
//! - `help` - List commands
//! - `quit` - Exit
//!
//! Responses start with `=` on success and `?` on failure.

use std::io::{self, BufRead, Write};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};

use crate::board::{GameStatus, Move};
use crate::constants::FRAMES_PER_SECOND;
use crate::game::{FirstMover, Game};

const KNOWN_COMMANDS: &[&str] = &["first", "help", "history", "new", "place", "quit", "show", "undo"];

pub struct Console {
    game: Game,
}

impl Console {
    pub fn new(game: Game) -> Self {
        Self { game }
    }

    pub fn game(&self) -> &Game {
        &self.game
    }

    /// Run the console on stdin and stdout until `quit` or end of input.
    pub fn run(&mut self) -> Result<()> {
        let (tx, rx) = mpsc::channel();
        thread::Builder::new()
            .name("console-input".to_string())
            .spawn(move || {
                for line in io::stdin().lock().lines() {
                    let Ok(line) = line else { break };
                    if tx.send(line).is_err() {
                        break;
                    }
                }
            })
            .context("failed to start the input thread")?;

        let stdout = io::stdout();
        let mut out = stdout.lock();
        writeln!(out, "{}", self.game.board())?;
        if self.game.is_players_turn() {
            writeln!(out, "Your move. Type `help` for commands.")?;
        } else {
            writeln!(out, "The engine moves first.")?;
        }
        out.flush()?;
        self.run_frames(&rx, &mut out)
    }

    /// The frame loop. Returns when `quit` is read or the input closes.
    pub fn run_frames<W: Write>(&mut self, input: &Receiver<String>, out: &mut W) -> Result<()> {
        let frame = Duration::from_micros(1_000_000 / FRAMES_PER_SECOND);
        loop {
            let start = Instant::now();

            loop {
                match input.try_recv() {
                    Ok(line) => {
                        let Some((response, quit)) = self.respond(&line) else {
                            continue;
                        };
                        writeln!(out, "{response}\n")?;
                        out.flush()?;
                        if quit {
                            return Ok(());
                        }
                    }
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => return Ok(()),
                }
            }

            if let Some(mv) = self.game.tick() {
                writeln!(out, "Engine plays {mv}\n{}", self.game.board())?;
                if let Some(result) = self.describe_status() {
                    writeln!(out, "{result}")?;
                }
                out.flush()?;
            }

            thread::sleep(frame.saturating_sub(start.elapsed()));
        }
    }

    /// Format the response to one input line. Blank lines and `#` comments
    /// get no response. The flag is set when the line was `quit`.
    pub fn respond(&mut self, line: &str) -> Option<(String, bool)> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return None;
        }
        let parts: Vec<&str> = line.split_whitespace().collect();

        // A bare coordinate pair is shorthand for `place`.
        let (command, args) = if parts[0].parse::<usize>().is_ok() {
            ("place".to_string(), &parts[..])
        } else {
            (parts[0].to_lowercase(), &parts[1..])
        };

        let (success, message) = self.execute(&command, args);
        let prefix = if success { '=' } else { '?' };
        Some((format!("{prefix} {message}"), command == "quit"))
    }

    /// Execute a command and return (success, response).
    fn execute(&mut self, command: &str, args: &[&str]) -> (bool, String) {
        match command {
            "quit" => (true, String::new()),

            "help" => (true, KNOWN_COMMANDS.join(" ")),

            "show" => {
                let mut text = self.game.board().to_string();
                if let Some(result) = self.describe_status() {
                    text.push_str(&result);
                }
                (true, text)
            }

            "history" => {
                let moves: Vec<String> = self.game.history().iter().map(Move::to_string).collect();
                (true, moves.join(" "))
            }

            "new" => {
                self.game.new_game();
                (true, format!("new game\n{}", self.game.board()))
            }

            "first" => {
                let first = match args.first().map(|s| s.to_lowercase()) {
                    Some(s) if s == "player" => FirstMover::Player,
                    Some(s) if s == "ai" => FirstMover::Ai,
                    Some(_) => return (false, "expected `player` or `ai`".to_string()),
                    None => return (false, "missing argument".to_string()),
                };
                self.game.set_next_first(first);
                (true, format!("{first:?} moves first from the next game"))
            }

            "undo" => match self.game.withdraw() {
                Ok(removed) => (
                    true,
                    format!("withdrew {removed} move(s)\n{}", self.game.board()),
                ),
                Err(err) => (false, err.to_string()),
            },

            "place" => {
                if args.len() < 2 {
                    return (false, "missing arguments".to_string());
                }
                let (Ok(row), Ok(col)) = (args[0].parse::<usize>(), args[1].parse::<usize>())
                else {
                    return (false, "invalid coordinate".to_string());
                };
                match self.game.play(Move::new(row, col)) {
                    Ok(_) => {
                        let mut text = self.game.board().to_string();
                        match self.describe_status() {
                            Some(result) => text.push_str(&result),
                            None => text.push_str("engine is thinking..."),
                        }
                        (true, text)
                    }
                    Err(err) => (false, err.to_string()),
                }
            }

            _ => (false, format!("unknown command: {command}")),
        }
    }

    fn describe_status(&self) -> Option<String> {
        match self.game.status() {
            GameStatus::Ongoing => None,
            GameStatus::Draw => Some("Draw.".to_string()),
            GameStatus::Win(stone) if stone == self.game.player_stone() => {
                Some("You win!".to_string())
            }
            GameStatus::Win(_) => Some("The engine wins.".to_string()),
        }
    }
}
