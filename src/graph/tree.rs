//! "What happens next / what happened before" breakdowns around one state.
//!
//! A tree is a trie of the paths leading out of (or into) every occurrence of
//! a root state. Unlike a [`TransitionGraph`](super::TransitionGraph), equal
//! states at different positions stay separate nodes, and each edge weight
//! counts the paths that run through it.

use crate::graph::Transition;
use crate::state::{Sequence, State};
use petgraph::Direction;
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;

#[derive(Debug, Clone)]
pub struct TransitionTree {
    /// Edges point forward in time for both directions
    pub graph: DiGraph<State, Transition>,
    pub root: NodeIndex,
    /// `Outgoing` for successor trees, `Incoming` for predecessor trees
    pub direction: Direction,
    /// Number of times the root occurs in the folded sequences
    pub occurrences: u32,
}

impl TransitionTree {
    fn new(root: &State, direction: Direction) -> Self {
        let mut graph = DiGraph::new();
        let root = graph.add_node(root.clone());
        Self {
            graph,
            root,
            direction,
            occurrences: 0,
        }
    }

    /// Paths of up to `depth` states following each occurrence of `root`
    pub fn outgoing(states: &[State], seqs: &[Sequence], root: &State, depth: usize) -> Self {
        Self::build(states, seqs, root, depth, Direction::Outgoing)
    }

    /// Paths of up to `depth` states preceding each occurrence of `root`
    pub fn incoming(states: &[State], seqs: &[Sequence], root: &State, depth: usize) -> Self {
        Self::build(states, seqs, root, depth, Direction::Incoming)
    }

    fn build(
        states: &[State],
        seqs: &[Sequence],
        root: &State,
        depth: usize,
        direction: Direction,
    ) -> Self {
        let mut tree = Self::new(root, direction);
        for seq in seqs {
            let path: Vec<&State> = seq.states(states).collect();
            for (pos, state) in path.iter().enumerate() {
                if *state != root {
                    continue;
                }
                tree.occurrences += 1;
                let branch: Vec<&State> = match direction {
                    Direction::Outgoing => path[pos + 1..].iter().take(depth).copied().collect(),
                    Direction::Incoming => path[..pos].iter().rev().take(depth).copied().collect(),
                };
                tree.insert(&branch);
            }
        }
        tree
    }

    fn insert(&mut self, branch: &[&State]) {
        let mut current = self.root;
        for &state in branch {
            current = match self.child(current, state) {
                Some((child, edge)) => {
                    self.graph[edge].record();
                    child
                }
                None => {
                    let child = self.graph.add_node(state.clone());
                    let (from, to) = match self.direction {
                        Direction::Outgoing => (current, child),
                        Direction::Incoming => (child, current),
                    };
                    self.graph.add_edge(from, to, Transition::observed());
                    child
                }
            };
        }
    }

    fn child(&self, parent: NodeIndex, state: &State) -> Option<(NodeIndex, EdgeIndex)> {
        self.graph
            .edges_directed(parent, self.direction)
            .map(|edge| {
                let other = match self.direction {
                    Direction::Outgoing => edge.target(),
                    Direction::Incoming => edge.source(),
                };
                (other, edge.id())
            })
            .find(|&(other, _)| self.graph[other] == *state)
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Children of `node` away from the root, heaviest first
    pub fn children(&self, node: NodeIndex) -> Vec<(NodeIndex, u32)> {
        let mut children: Vec<(NodeIndex, u32)> = self
            .graph
            .edges_directed(node, self.direction)
            .map(|edge| {
                let other = match self.direction {
                    Direction::Outgoing => edge.target(),
                    Direction::Incoming => edge.source(),
                };
                (other, edge.weight().weight)
            })
            .collect();
        children.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        children
    }

    /// Longest path from the root, in edges
    pub fn depth(&self) -> usize {
        fn walk(tree: &TransitionTree, node: NodeIndex) -> usize {
            tree.children(node)
                .into_iter()
                .map(|(child, _)| 1 + walk(tree, child))
                .max()
                .unwrap_or(0)
        }
        walk(self, self.root)
    }
}
