//! Monte Carlo Tree Search (MCTS) with UCT selection.
//!
//! Each iteration runs four phases over a [`SearchTree`]:
//! - Selection: descend by highest cached UCT score to a node without children
//! - Expansion: add one child per empty cell, in random order
//! - Simulation: play the first new child out with a [`Playout`]
//! - Back-propagation: credit the result to every node up to the root
//!
//! A leaf whose move already ended the game skips expansion and simulation
//! and back-propagates that result directly. After the budget is spent the
//! most-visited root child is returned.

use fastrand::Rng;
use tracing::{debug, info};

use crate::board::{Board, GameStatus, Move, Stone};
use crate::constants::REPORT_FRACTION;
use crate::error::SearchError;
use crate::playout::{Outcome, Playout};
use crate::tree::{NodeId, SearchTree};

/// Choose a move for `to_move` on `board`.
///
/// Builds a fresh tree for this call only. An empty board is answered with
/// the centre cell without searching.
pub fn search_move<P: Playout>(
    board: &Board,
    to_move: Stone,
    budget: usize,
    playout: &P,
    rng: &mut Rng,
) -> Result<Move, SearchError> {
    if budget == 0 {
        return Err(SearchError::InsufficientBudget);
    }
    if board.is_decided() {
        return Err(SearchError::TerminalBoard);
    }
    if board.is_empty() {
        return Ok(board.center());
    }
    let mut tree = SearchTree::new(board.clone(), to_move);
    tree_search(&mut tree, budget, playout, rng)
}

/// Run `budget` iterations on `tree` and return the most-visited root move.
pub fn tree_search<P: Playout>(
    tree: &mut SearchTree,
    budget: usize,
    playout: &P,
    rng: &mut Rng,
) -> Result<Move, SearchError> {
    if budget == 0 {
        return Err(SearchError::InsufficientBudget);
    }
    if tree.root_board().is_decided() {
        return Err(SearchError::TerminalBoard);
    }

    let to_move = tree.get(tree.root()).mover().opponent();
    debug!(
        budget,
        stone = to_move.id(),
        empty = tree.root_board().size().pow(2) - tree.root_board().stone_count(),
        "search started"
    );

    let report_every = (budget / REPORT_FRACTION).max(1);
    for i in 1..=budget {
        run_iteration(tree, playout, rng);
        if i % report_every == 0 {
            debug!(done = i, budget, "search progress {}%", i * 100 / budget);
        }
    }

    dump_children(tree);
    let best = best_child(tree).ok_or(SearchError::TerminalBoard)?;
    let node = tree.get(best);
    let mv = tree.move_of(best).ok_or(SearchError::TerminalBoard)?;
    info!(
        %mv,
        wins = node.win_rounds,
        visits = node.total_rounds,
        win_ratio = format_args!("{:.3}", node.win_ratio()),
        nodes = tree.node_count(),
        "search finished"
    );
    Ok(mv)
}

/// One select/expand/simulate/back-propagate pass.
fn run_iteration<P: Playout>(tree: &mut SearchTree, playout: &P, rng: &mut Rng) {
    let leaf = tree.select_leaf();

    if let Some(status) = terminal_status(tree, leaf) {
        tree.back_propagate(leaf, winner(status));
        return;
    }

    let Some(child) = tree.expand(leaf, rng) else {
        // No empty cell left: nothing to play, score it as a draw.
        tree.back_propagate(leaf, None);
        return;
    };

    if let Some(status) = terminal_status(tree, child) {
        tree.back_propagate(child, winner(status));
        return;
    }

    let child_mover = tree.get(child).mover();
    let rollout_mover = child_mover.opponent();
    let outcome = playout.rollout(tree.visit(child), rollout_mover, rng);
    let winner = match outcome {
        Outcome::Win => Some(rollout_mover),
        Outcome::Loss => Some(child_mover),
        Outcome::Draw => None,
    };
    tree.back_propagate(child, winner);
}

/// Game status after the move that produced `id`, if that move ended the game.
/// The root is never terminal here; that is checked before searching.
fn terminal_status(tree: &mut SearchTree, id: NodeId) -> Option<GameStatus> {
    let mv = tree.move_of(id)?;
    let status = tree.visit(id).check_game_end(mv);
    status.is_terminal().then_some(status)
}

fn winner(status: GameStatus) -> Option<Stone> {
    match status {
        GameStatus::Win(stone) => Some(stone),
        GameStatus::Draw | GameStatus::Ongoing => None,
    }
}

/// Most-visited root child; ties go to the first in child order.
fn best_child(tree: &SearchTree) -> Option<NodeId> {
    let mut best: Option<(NodeId, u32)> = None;
    for child in tree.get(tree.root()).children() {
        let visits = tree.get(child).total_rounds;
        match best {
            Some((_, v)) if visits <= v => {}
            _ => best = Some((child, visits)),
        }
    }
    best.map(|(id, _)| id)
}

/// Log statistics for every root child at debug level.
pub fn dump_children(tree: &SearchTree) {
    for child in tree.get(tree.root()).children() {
        let node = tree.get(child);
        if let Some(mv) = tree.move_of(child) {
            debug!(
                "move {} v={} w={} wr={:.3}",
                mv,
                node.total_rounds,
                node.win_rounds,
                node.win_ratio()
            );
        }
    }
}
