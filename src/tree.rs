//! MCTS tree structure with arena allocation.
//!
//! Nodes live in one `Vec` and refer to each other by [`NodeId`]. A node's
//! children are allocated together on expansion, so they occupy a contiguous
//! block of the arena and the node only records where that block starts.

use fastrand::Rng;

use crate::board::{Board, Move, Stone};
use crate::constants::UCT_C;

/// Index into the node arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub u32);

impl NodeId {
    pub const NONE: NodeId = NodeId(u32::MAX);

    pub fn is_none(self) -> bool {
        self == Self::NONE
    }

    pub fn is_some(self) -> bool {
        !self.is_none()
    }

    #[inline]
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Cell index used for the root, which was reached by no move.
const NO_CELL: u32 = u32::MAX;

/// A node in the search tree: one board state reached from the root.
#[derive(Debug, Clone)]
pub struct SearchNode {
    /// Private board snapshot, taken the first time the node is visited.
    /// Always `None` for the root, whose board is held by the tree.
    state: Option<Box<Board>>,
    /// Parent node (NONE for root)
    parent: NodeId,
    /// Cell of the move that produced this state (NO_CELL for root)
    cell: u32,
    /// First child in the arena; children are `first_child..first_child + child_count`
    first_child: u32,
    child_count: u32,
    expanded: bool,
    /// Side that made the move leading here
    mover: Stone,
    /// Accumulated win credit for `mover` (draws count one half)
    pub win_rounds: f64,
    /// Number of back-propagations through this node
    pub total_rounds: u32,
    /// Cached UCT score, refreshed after every statistics update
    pub score: f64,
}

impl SearchNode {
    fn new(parent: NodeId, cell: u32, mover: Stone) -> Self {
        Self {
            state: None,
            parent,
            cell,
            first_child: 0,
            child_count: 0,
            expanded: false,
            mover,
            win_rounds: 0.0,
            total_rounds: 0,
            score: f64::INFINITY,
        }
    }

    #[inline]
    pub fn mover(&self) -> Stone {
        self.mover
    }

    #[inline]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent.is_some().then_some(self.parent)
    }

    /// Whether children have been generated. An expanded node of a
    /// non-terminal state always has at least one child.
    #[inline]
    pub fn is_expanded(&self) -> bool {
        self.expanded
    }

    pub fn children(&self) -> impl Iterator<Item = NodeId> + use<> {
        (self.first_child..self.first_child + self.child_count).map(NodeId)
    }

    /// Observed win rate, or 0 if never visited.
    pub fn win_ratio(&self) -> f64 {
        if self.total_rounds == 0 {
            0.0
        } else {
            self.win_rounds / self.total_rounds as f64
        }
    }
}

/// UCT score: `w/n + C * sqrt(ln(N) / n)`, infinite for unvisited nodes.
pub fn uct_score(win_rounds: f64, total_rounds: u32, parent_total_rounds: u32) -> f64 {
    if total_rounds == 0 {
        return f64::INFINITY;
    }
    let n = total_rounds as f64;
    let parent = parent_total_rounds.max(1) as f64;
    win_rounds / n + UCT_C * (parent.ln() / n).sqrt()
}

/// Search tree for one AI turn. Discarded once the move is chosen.
#[derive(Debug)]
pub struct SearchTree {
    nodes: Vec<SearchNode>,
    root_board: Board,
    size: usize,
}

impl SearchTree {
    /// Create a tree whose root is `board` with `to_move` about to play.
    ///
    /// The root's mover is the opponent of `to_move`, since the root stands
    /// for the last move already on the board.
    pub fn new(board: Board, to_move: Stone) -> Self {
        let size = board.size();
        let root = SearchNode::new(NodeId::NONE, NO_CELL, to_move.opponent());
        Self {
            nodes: vec![root],
            root_board: board,
            size,
        }
    }

    #[inline]
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    #[inline]
    pub fn get(&self, id: NodeId) -> &SearchNode {
        &self.nodes[id.index()]
    }

    #[inline]
    fn get_mut(&mut self, id: NodeId) -> &mut SearchNode {
        &mut self.nodes[id.index()]
    }

    /// Board at the root.
    #[inline]
    pub fn root_board(&self) -> &Board {
        &self.root_board
    }

    /// Board of a node, if it has been visited.
    pub fn board(&self, id: NodeId) -> Option<&Board> {
        if id == self.root() {
            return Some(&self.root_board);
        }
        self.get(id).state.as_deref()
    }

    /// Move that produced a node, `None` at the root.
    pub fn move_of(&self, id: NodeId) -> Option<Move> {
        let cell = self.get(id).cell;
        (cell != NO_CELL).then(|| {
            let cell = cell as usize;
            Move::new(cell / self.size, cell % self.size)
        })
    }

    /// Board of a node, taking its snapshot (and any missing ancestor's)
    /// on first visit.
    pub fn visit(&mut self, id: NodeId) -> &Board {
        if id == self.root() {
            return &self.root_board;
        }
        let i = id.index();
        if self.nodes[i].state.is_none() {
            let (parent, mover) = (self.nodes[i].parent, self.nodes[i].mover);
            let mut board = self.visit(parent).clone();
            if let Some(mv) = self.move_of(id) {
                board.put(mv, mover);
            }
            self.nodes[i].state = Some(Box::new(board));
        }
        self.nodes[i].state.as_deref().unwrap_or(&self.root_board)
    }

    /// Generate one child per empty cell of a visited node, in random order.
    ///
    /// Each child is the opponent of the node's mover playing there. Returns
    /// the first child, or `None` if the board has no empty cell.
    pub fn expand(&mut self, id: NodeId, rng: &mut Rng) -> Option<NodeId> {
        if self.get(id).expanded {
            return self.get(id).children().next();
        }
        let size = self.size;
        let mut cells: Vec<u32> = self
            .visit(id)
            .empty_cells()
            .map(|mv| (mv.row * size + mv.col) as u32)
            .collect();
        rng.shuffle(&mut cells);

        let mover = self.get(id).mover.opponent();
        let first = self.nodes.len() as u32;
        self.nodes.reserve(cells.len());
        for cell in &cells {
            self.nodes.push(SearchNode::new(id, *cell, mover));
        }

        let node = self.get_mut(id);
        node.expanded = true;
        node.first_child = first;
        node.child_count = cells.len() as u32;
        node.children().next()
    }

    /// Child with the highest cached score; ties go to the first in child order.
    pub fn select_child(&self, id: NodeId) -> Option<NodeId> {
        let mut best: Option<(NodeId, f64)> = None;
        for child in self.get(id).children() {
            let score = self.get(child).score;
            match best {
                Some((_, s)) if score <= s => {}
                _ => best = Some((child, score)),
            }
        }
        best.map(|(id, _)| id)
    }

    /// Descend from the root to the first node without children.
    pub fn select_leaf(&self) -> NodeId {
        let mut node = self.root();
        while self.get(node).expanded {
            match self.select_child(node) {
                Some(child) => node = child,
                None => break,
            }
        }
        node
    }

    /// Credit one finished game to every node from `leaf` up to the root.
    ///
    /// Nodes whose mover is `winner` get a full win, the other side gets
    /// nothing, and a draw (`None`) gives everyone one half. Scores are
    /// refreshed after all counters on the path are updated.
    pub fn back_propagate(&mut self, leaf: NodeId, winner: Option<Stone>) {
        let mut path = Vec::new();
        let mut current = leaf;
        while current.is_some() {
            let node = self.get_mut(current);
            node.win_rounds += match winner {
                None => 0.5,
                Some(w) if w == node.mover => 1.0,
                Some(_) => 0.0,
            };
            node.total_rounds += 1;
            path.push(current);
            current = node.parent;
        }
        for id in path {
            self.refresh_score(id);
        }
    }

    fn refresh_score(&mut self, id: NodeId) {
        let node = self.get(id);
        let parent_total = match node.parent() {
            Some(p) => self.get(p).total_rounds,
            None => 1,
        };
        let score = uct_score(node.win_rounds, node.total_rounds, parent_total);
        self.get_mut(id).score = score;
    }

    /// Number of nodes in the tree.
    #[inline]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of levels; a lone root has depth 1.
    pub fn depth(&self) -> usize {
        self.nodes_per_depth().len()
    }

    /// Node count at each depth, root first.
    pub fn nodes_per_depth(&self) -> Vec<usize> {
        let mut counts = Vec::new();
        let mut stack = vec![(self.root(), 0usize)];
        while let Some((id, depth)) = stack.pop() {
            if depth == counts.len() {
                counts.push(0);
            }
            counts[depth] += 1;
            stack.extend(self.get(id).children().map(|c| (c, depth + 1)));
        }
        counts
    }
}
