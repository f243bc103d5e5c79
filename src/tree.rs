// SPDX-License-Identifier: GPL-3.0-or-later

use tracing::{debug, trace};

use crate::config::{Config, DEFAULT_HALFMOVE_LIMIT};
use crate::error::PositionError;
use crate::movegen::MoveList;
use crate::position::Position;
use crate::types::{Color, Move};

/// Handle of a node inside a `Tree`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// A position in the game tree together with the move that produced it and
/// a score slot for whoever walks the tree.
#[derive(Debug, Clone)]
pub struct Node {
    pub position: Position,
    pub evaluation: f32,
    last_move: Move,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    expanded: bool,
}

impl Node {
    fn new(position: Position, last_move: Move, parent: Option<NodeId>) -> Node {
        Node {
            position,
            evaluation: 0.0,
            last_move,
            parent,
            children: Vec::new(),
            expanded: false,
        }
    }

    /// The move leading here, `Move::NONE` at the root.
    pub fn last_move(&self) -> Move {
        self.last_move
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// Arena of positions linked by moves. Every child holds its own copy of the
/// position, so branches never share mutable state.
#[derive(Debug, Clone)]
pub struct Tree {
    nodes: Vec<Node>,
    halfmove_limit: u32,
}

impl Tree {
    pub fn new(root: Position) -> Tree {
        Tree::with_halfmove_limit(root, DEFAULT_HALFMOVE_LIMIT)
    }

    pub fn with_config(root: Position, config: &Config) -> Tree {
        Tree::with_halfmove_limit(root, config.halfmove_limit)
    }

    pub fn with_halfmove_limit(root: Position, halfmove_limit: u32) -> Tree {
        Tree {
            nodes: vec![Node::new(root, Move::NONE, None)],
            halfmove_limit,
        }
    }

    pub fn from_fen(fen: &str) -> Result<Tree, PositionError> {
        Ok(Tree::new(Position::from_fen(fen)?))
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn halfmove_limit(&self) -> u32 {
        self.halfmove_limit
    }

    /// Panics if `id` does not belong to this tree (see `get`).
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    /// The node behind `id`, or `None` for an id from before the last
    /// `set_fen` that points past the current arena.
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    pub fn position(&self, id: NodeId) -> &Position {
        &self.nodes[id.0].position
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    pub fn fen(&self, id: NodeId) -> String {
        self.position(id).fen()
    }

    /// Replaces the whole tree with a single root decoded from `fen`. The
    /// tree is untouched if decoding fails. On success every previously
    /// handed out `NodeId` other than `root()` is invalidated.
    pub fn set_fen(&mut self, fen: &str, chess960: bool) -> Result<(), PositionError> {
        let root = Position::from_fen_960(fen, chess960)?;
        self.nodes.clear();
        self.nodes.push(Node::new(root, Move::NONE, None));
        Ok(())
    }

    pub fn whose_turn(&self, id: NodeId) -> Color {
        self.position(id).side_to_move()
    }

    // Fullmove number of the node's position.
    pub fn what_turn(&self, id: NodeId) -> i32 {
        self.position(id).fullmove_number()
    }

    /// Plays `m` from the position at `parent` and links the result as a new
    /// child. Returns the existing child if `m` was already played there.
    pub fn add_child(&mut self, parent: NodeId, m: Move) -> Result<NodeId, PositionError> {
        if let Some(&child) = self.nodes[parent.0]
            .children
            .iter()
            .find(|&&c| self.nodes[c.0].last_move == m)
        {
            return Ok(child);
        }

        let position = Position::after(self.position(parent), m)?;
        Ok(self.link(parent, position, m))
    }

    fn link(&mut self, parent: NodeId, position: Position, m: Move) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node::new(position, m, Some(parent)));
        self.nodes[parent.0].children.push(id);
        id
    }

    /// Generates and plays every legal move from `id`, once. Later calls
    /// return the same children.
    pub fn expand(&mut self, id: NodeId) -> &[NodeId] {
        if !self.nodes[id.0].expanded {
            let moves = MoveList::legal(self.position(id));
            for &m in &moves {
                if self.nodes[id.0].children.iter().any(|&c| self.nodes[c.0].last_move == m) {
                    continue;
                }
                let mut position = self.position(id).clone();
                position.do_move(m);
                self.link(id, position, m);
            }
            self.nodes[id.0].expanded = true;

            debug!(
                fen = %self.fen(id),
                children = self.nodes[id.0].children.len(),
                "expanded node"
            );
        }
        &self.nodes[id.0].children
    }

    // The n-th ancestor of a node, if the line is that long.
    fn ancestor(&self, id: NodeId, n: usize) -> Option<NodeId> {
        (0..n).try_fold(id, |cur, _| self.parent(cur))
    }

    /// Draw by the move rule, or the position repeats the one four plies
    /// up the line. Four plies is the shortest distance at which a position
    /// can recur.
    pub fn is_draw(&self, id: NodeId) -> bool {
        let pos = self.position(id);
        if pos.is_draw(self.halfmove_limit) {
            trace!(fen = %pos.fen(), "draw by the move rule");
            return true;
        }

        // A capture or pawn move in between rules the repetition out.
        if pos.rule50_count() < 4 {
            return false;
        }

        match self.ancestor(id, 4) {
            Some(earlier) if self.position(earlier) == pos => {
                trace!(fen = %pos.fen(), "position repeats");
                true
            }
            _ => false,
        }
    }

    /// No legal moves and in check.
    pub fn is_checkmate(&self, id: NodeId) -> bool {
        let pos = self.position(id);
        pos.in_check() && MoveList::legal(pos).is_empty()
    }

    /// No legal moves and not in check.
    pub fn is_stalemate(&self, id: NodeId) -> bool {
        let pos = self.position(id);
        !pos.in_check() && MoveList::legal(pos).is_empty()
    }

    /// Moves from the root down to `id`.
    pub fn line(&self, id: NodeId) -> Vec<Move> {
        let mut moves = Vec::new();
        let mut cur = id;
        while let Some(parent) = self.parent(cur) {
            moves.push(self.nodes[cur.0].last_move);
            cur = parent;
        }
        moves.reverse();
        moves
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Square;

    #[test]
    fn expand_plays_every_legal_move() {
        let mut tree = Tree::new(Position::startpos());
        let root = tree.root();
        let children = tree.expand(root).to_vec();
        assert_eq!(children.len(), 20);
        for &c in &children {
            assert_eq!(tree.parent(c), Some(root));
            assert_eq!(tree.whose_turn(c), Color::BLACK);
            assert!(tree.position(c).is_ok());
        }
        // A second expansion adds nothing.
        assert_eq!(tree.expand(root).len(), 20);
        assert_eq!(tree.len(), 21);
    }

    #[test]
    fn add_child_reuses_existing_node() {
        let mut tree = Tree::new(Position::startpos());
        let m = Move::make(Square::E2, Square::E4);
        let a = tree.add_child(tree.root(), m).unwrap();
        let b = tree.add_child(tree.root(), m).unwrap();
        assert_eq!(a, b);
        assert_eq!(tree.len(), 2);
        assert_eq!(tree.node(a).last_move(), m);

        // Expanding afterwards keeps the single e2e4 child.
        assert_eq!(tree.expand(tree.root()).len(), 20);
        assert_eq!(tree.len(), 21);
    }

    #[test]
    fn add_child_rejects_illegal_moves() {
        let mut tree = Tree::new(Position::startpos());
        let err = tree.add_child(tree.root(), Move::make(Square::E2, Square::E5));
        assert!(matches!(err, Err(PositionError::IllegalMove(_))));
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn repetition_four_plies_back_is_a_draw() {
        let mut tree = Tree::new(Position::startpos());
        let mut cur = tree.root();
        for (from, to) in [
            (Square::G1, Square::F3),
            (Square::G8, Square::F6),
            (Square::F3, Square::G1),
        ] {
            cur = tree.add_child(cur, Move::make(from, to)).unwrap();
            assert!(!tree.is_draw(cur));
        }
        cur = tree.add_child(cur, Move::make(Square::F6, Square::G8)).unwrap();
        assert!(tree.is_draw(cur));
        assert_eq!(tree.line(cur).len(), 4);
        assert_eq!(tree.what_turn(cur), 3);
    }

    #[test]
    fn move_rule_draw_uses_configured_limit() {
        let pos = Position::from_fen("4k3/8/8/8/8/8/8/R3K3 w - - 9 40").unwrap();
        let mut tree = Tree::with_halfmove_limit(pos, 10);
        let root = tree.root();
        assert!(!tree.is_draw(root));
        let child = tree.add_child(root, Move::make(Square::A1, Square::A2)).unwrap();
        assert!(tree.is_draw(child));
    }

    #[test]
    fn checkmate_and_stalemate() {
        let tree = Tree::from_fen("R3k3/8/4K3/8/8/8/8/8 b - - 0 1").unwrap();
        assert!(tree.is_checkmate(tree.root()));
        assert!(!tree.is_stalemate(tree.root()));

        let tree = Tree::from_fen("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1").unwrap();
        assert!(tree.is_stalemate(tree.root()));
        assert!(!tree.is_checkmate(tree.root()));
    }

    #[test]
    fn set_fen_resets_the_tree() {
        let mut tree = Tree::new(Position::startpos());
        let root = tree.root();
        tree.expand(root);
        assert!(tree.set_fen("bad", false).is_err());
        assert_eq!(tree.len(), 21);
        tree.set_fen("4k3/8/8/8/8/8/8/4K3 w - - 0 1", false).unwrap();
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.fen(tree.root()), "4k3/8/8/8/8/8/8/4K3 w - - 0 1");
        assert!(tree.children(tree.root()).is_empty());
    }

    #[test]
    fn stale_ids_are_detected_after_set_fen() {
        let mut tree = Tree::new(Position::startpos());
        let root = tree.root();
        let child = tree.expand(root)[0];
        assert!(tree.get(child).is_some());

        tree.set_fen("4k3/8/8/8/8/8/8/4K3 w - - 0 1", false).unwrap();
        assert!(tree.get(child).is_none());
        assert_eq!(tree.get(root).map(|n| n.last_move()), Some(Move::NONE));
    }
}
