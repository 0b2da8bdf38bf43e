//! gomoku-mcts: play Gomoku against a Monte Carlo Tree Search engine.
//!
//! ## Usage
//!
//! - `gomoku-mcts` - Play in the console
//! - `gomoku-mcts play --ai-first` - Let the engine open
//! - `gomoku-mcts bench` - Time one search and print tree statistics
//!
//! Set `RUST_LOG=debug` to see search progress on stderr.

use std::time::Instant;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use gomoku_mcts::board::{Board, Stone};
use gomoku_mcts::config::EngineConfig;
use gomoku_mcts::console::Console;
use gomoku_mcts::constants::{
    DEFAULT_BOARD_SIZE, DEFAULT_FALLBACK_ITERATIONS, DEFAULT_ITERATIONS, DEFAULT_NEAR_DISTANCE,
};
use gomoku_mcts::game::{FirstMover, Game};
use gomoku_mcts::mcts::tree_search;
use gomoku_mcts::playout::PlayoutPolicy;
use gomoku_mcts::tree::SearchTree;

/// Gomoku against a Monte Carlo Tree Search engine
#[derive(Parser)]
#[command(name = "gomoku-mcts")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Board size (NxN)
    #[arg(long, global = true, default_value_t = DEFAULT_BOARD_SIZE)]
    size: usize,

    /// Search iterations per engine move
    #[arg(long, global = true, default_value_t = DEFAULT_ITERATIONS)]
    iterations: usize,

    /// Iterations for the synchronous search used if the worker fails
    #[arg(long, global = true, default_value_t = DEFAULT_FALLBACK_ITERATIONS)]
    fallback_iterations: usize,

    /// Playout move ordering
    #[arg(long, global = true, value_enum, default_value_t = PolicyArg::Uniform)]
    policy: PolicyArg,

    /// Radius for the near-placement playout
    #[arg(long, global = true, default_value_t = DEFAULT_NEAR_DISTANCE)]
    near_distance: usize,

    /// Seed for reproducible searches
    #[arg(long, global = true)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum PolicyArg {
    Uniform,
    Near,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a game in the console
    Play {
        /// Let the engine place the first stone
        #[arg(long)]
        ai_first: bool,
    },
    /// Run one search from an opening position and report timing
    Bench,
}

impl Cli {
    fn engine_config(&self) -> EngineConfig {
        let policy = match self.policy {
            PolicyArg::Uniform => PlayoutPolicy::Uniform,
            PolicyArg::Near => PlayoutPolicy::NearPlacementBiased {
                distance: self.near_distance,
            },
        };
        EngineConfig {
            board_size: self.size,
            iterations: self.iterations,
            fallback_iterations: self.fallback_iterations,
            policy,
            seed: self.seed,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.engine_config();
    config.validate()?;

    match cli.command {
        Some(Commands::Bench) => run_bench(&config),
        Some(Commands::Play { ai_first }) => run_play(&config, ai_first),
        None => run_play(&config, false),
    }
}

fn run_play(config: &EngineConfig, ai_first: bool) -> Result<()> {
    let first = if ai_first {
        FirstMover::Ai
    } else {
        FirstMover::Player
    };
    let game = Game::new(config, first)?;
    Console::new(game).run()
}

fn run_bench(config: &EngineConfig) -> Result<()> {
    let mut board = Board::new(config.board_size);
    board.place(board.center(), Stone::Black)?;
    println!("{board}");

    let mut tree = SearchTree::new(board, Stone::White);
    let mut rng = config.rng();
    println!("Running {} iterations...", config.iterations);
    let start = Instant::now();
    let mv = tree_search(&mut tree, config.iterations, &config.policy, &mut rng)?;
    let elapsed = start.elapsed();

    println!("Best move: {mv}");
    println!("Time: {:.2?}", elapsed);
    println!("Nodes: {}", tree.node_count());
    println!("Depth: {}", tree.depth());
    println!("Nodes per depth: {:?}", tree.nodes_per_depth());
    Ok(())
}
