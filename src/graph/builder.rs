use crate::graph::{NodeClass, Transition};
use crate::state::{Range, Sequence, State};
use petgraph::Direction;
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::unionfind::UnionFind;
use petgraph::visit::EdgeRef;
use std::collections::HashMap;

/// A directed graph of the states a fighter moves through.
///
/// Every distinct [`State`] is stored once: folding many matched sequences
/// onto the graph collapses repeated situations onto the same node, and
/// repeated moves between them onto the same edge with a growing weight.
#[derive(Debug, Clone, Default)]
pub struct TransitionGraph {
    /// Nodes are distinct states, edges carry observation counts.
    pub graph: DiGraph<State, Transition>,

    /// Lookup from a state to its node, one entry per node
    pub state_index: HashMap<State, NodeIndex>,
}

impl TransitionGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Node for `state`, inserting it on first sight
    pub fn add_state(&mut self, state: &State) -> NodeIndex {
        if let Some(&idx) = self.state_index.get(state) {
            return idx;
        }
        let idx = self.graph.add_node(state.clone());
        self.state_index.insert(state.clone(), idx);
        idx
    }

    /// Record one observation of `from -> to`
    pub fn add_transition(&mut self, from: NodeIndex, to: NodeIndex) -> EdgeIndex {
        match self.graph.find_edge(from, to) {
            Some(edge) => {
                self.graph[edge].record();
                edge
            }
            None => self.graph.add_edge(from, to, Transition::observed()),
        }
    }

    /// Fold one sequence of state indices onto the graph
    pub fn add_sequence(&mut self, states: &[State], seq: &Sequence) {
        let mut prev: Option<NodeIndex> = None;
        for state in seq.states(states) {
            let node = self.add_state(state);
            if let Some(prev) = prev {
                self.add_transition(prev, node);
            }
            prev = Some(node);
        }
    }

    pub fn from_sequences(states: &[State], seqs: &[Sequence]) -> Self {
        let mut graph = Self::new();
        for seq in seqs {
            graph.add_sequence(states, seq);
        }
        graph
    }

    pub fn from_ranges(states: &[State], ranges: &[Range]) -> Self {
        let mut graph = Self::new();
        for &range in ranges {
            graph.add_sequence(states, &Sequence::from_range(range));
        }
        graph
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn node(&self, state: &State) -> Option<NodeIndex> {
        self.state_index.get(state).copied()
    }

    /// Observation count of `from -> to`, if that move was ever seen
    pub fn weight(&self, from: &State, to: &State) -> Option<u32> {
        let edge = self.graph.find_edge(self.node(from)?, self.node(to)?)?;
        Some(self.graph[edge].weight)
    }

    pub fn max_weight(&self) -> u32 {
        self.graph
            .edge_weights()
            .map(|t| t.weight)
            .max()
            .unwrap_or(0)
    }

    pub fn all_states(&self) -> Vec<&State> {
        self.graph.node_weights().collect()
    }

    pub fn classify(&self, node: NodeIndex) -> NodeClass {
        NodeClass::from_degree(
            self.graph.edges_directed(node, Direction::Incoming).count(),
            self.graph.edges_directed(node, Direction::Outgoing).count(),
        )
    }

    /// States nothing leads into
    pub fn find_initial_states(&self) -> Vec<&State> {
        self.graph
            .node_indices()
            .filter(|&idx| self.graph.edges_directed(idx, Direction::Incoming).count() == 0)
            .map(|idx| &self.graph[idx])
            .collect()
    }

    /// States nothing leads out of
    pub fn find_terminal_states(&self) -> Vec<&State> {
        self.graph
            .node_indices()
            .filter(|&idx| self.graph.edges_directed(idx, Direction::Outgoing).count() == 0)
            .map(|idx| &self.graph[idx])
            .collect()
    }

    /// Moves out of `state` with their weights, heaviest first
    pub fn outgoing_transitions(&self, state: &State) -> Vec<(&State, u32)> {
        self.neighbours(state, Direction::Outgoing)
    }

    /// Moves into `state` with their weights, heaviest first
    pub fn incoming_transitions(&self, state: &State) -> Vec<(&State, u32)> {
        self.neighbours(state, Direction::Incoming)
    }

    fn neighbours(&self, state: &State, direction: Direction) -> Vec<(&State, u32)> {
        let Some(node) = self.node(state) else {
            return Vec::new();
        };
        let mut result: Vec<(&State, u32)> = self
            .graph
            .edges_directed(node, direction)
            .map(|edge| {
                let other = match direction {
                    Direction::Outgoing => edge.target(),
                    Direction::Incoming => edge.source(),
                };
                (&self.graph[other], edge.weight().weight)
            })
            .collect();
        result.sort_by(|a, b| b.1.cmp(&a.1));
        result
    }

    /// Split the graph into its connected components.
    ///
    /// Edge direction is ignored. Each island is a graph of its own with
    /// renumbered indices and the original weights. Islands come in the order
    /// of their first node, and nodes and edges keep their relative order.
    pub fn islands(&self) -> Vec<TransitionGraph> {
        let mut components = UnionFind::<usize>::new(self.graph.node_count());
        for edge in self.graph.edge_references() {
            components.union(edge.source().index(), edge.target().index());
        }

        let mut island_of: HashMap<usize, usize> = HashMap::new();
        let mut islands: Vec<TransitionGraph> = Vec::new();
        let mut local: Vec<NodeIndex> = Vec::with_capacity(self.graph.node_count());
        for node in self.graph.node_indices() {
            let root = components.find(node.index());
            let island = *island_of.entry(root).or_insert_with(|| {
                islands.push(TransitionGraph::new());
                islands.len() - 1
            });
            local.push(islands[island].add_state(&self.graph[node]));
        }

        for edge in self.graph.edge_references() {
            let root = components.find(edge.source().index());
            let island = &mut islands[island_of[&root]];
            island.graph.add_edge(
                local[edge.source().index()],
                local[edge.target().index()],
                *edge.weight(),
            );
        }
        islands
    }

    pub fn stats(&self) -> GraphStats {
        GraphStats {
            total_states: self.graph.node_count(),
            total_transitions: self.graph.edge_count(),
            total_weight: self.graph.edge_weights().map(|t| u64::from(t.weight)).sum(),
            max_weight: self.max_weight(),
            initial_states: self.find_initial_states().len(),
            terminal_states: self.find_terminal_states().len(),
            islands: self.islands().len(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GraphStats {
    pub total_states: usize,
    pub total_transitions: usize,
    pub total_weight: u64,
    pub max_weight: u32,
    pub initial_states: usize,
    pub terminal_states: usize,
    pub islands: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{Motion, StateFlags};
    use std::collections::HashSet;

    fn state(motion: u64) -> State {
        State::new(Motion::new(motion), 0, 0, StateFlags::empty())
    }

    /// States A, B, C, D, E at indices 0..5
    fn table() -> Vec<State> {
        (1..=5).map(state).collect()
    }

    fn seq(idxs: &[usize]) -> Sequence {
        Sequence::new(idxs.to_vec())
    }

    #[test]
    fn test_empty_graph() {
        let graph = TransitionGraph::new();
        assert!(graph.is_empty());
        assert_eq!(graph.edge_count(), 0);
        assert!(graph.islands().is_empty());
        assert_eq!(graph.stats(), GraphStats::default());
    }

    #[test]
    fn test_weights_count_observations() {
        let states = table();
        let graph = TransitionGraph::from_sequences(
            &states,
            &[seq(&[0, 1]), seq(&[0, 1]), seq(&[0, 2])],
        );
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 2);
        assert_eq!(graph.weight(&states[0], &states[1]), Some(2));
        assert_eq!(graph.weight(&states[0], &states[2]), Some(1));
        assert_eq!(graph.weight(&states[1], &states[0]), None);
        assert_eq!(graph.max_weight(), 2);
    }

    #[test]
    fn test_equal_states_share_a_node() {
        // two table entries with the same value map onto one node
        let states = vec![state(1), state(2), state(1), state(2)];
        let graph = TransitionGraph::from_sequences(&states, &[seq(&[0, 1]), seq(&[2, 3])]);
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.weight(&states[0], &states[1]), Some(2));
    }

    #[test]
    fn test_from_ranges_matches_from_sequences() {
        let states = table();
        let ranges = [Range::new(0, 3), Range::new(1, 3)];
        let by_range = TransitionGraph::from_ranges(&states, &ranges);
        let by_seq = TransitionGraph::from_sequences(&states, &[seq(&[0, 1, 2]), seq(&[1, 2])]);
        assert_eq!(by_range.stats(), by_seq.stats());
        assert_eq!(by_range.weight(&states[1], &states[2]), Some(2));
    }

    #[test]
    fn test_single_state_sequence_adds_node() {
        let states = table();
        let graph = TransitionGraph::from_sequences(&states, &[seq(&[4])]);
        assert_eq!(graph.node_count(), 1);
        assert_eq!(graph.classify(NodeIndex::new(0)), NodeClass::Isolated);
    }

    #[test]
    fn test_initial_and_terminal_states() {
        let states = table();
        let graph = TransitionGraph::from_sequences(&states, &[seq(&[0, 1, 2]), seq(&[3, 1])]);
        let initial: HashSet<_> = graph.find_initial_states().into_iter().cloned().collect();
        assert_eq!(initial, HashSet::from([states[0].clone(), states[3].clone()]));
        let terminal = graph.find_terminal_states();
        assert_eq!(terminal, vec![&states[2]]);
        let b = graph.node(&states[1]).unwrap();
        assert_eq!(graph.classify(b), NodeClass::Active);
    }

    #[test]
    fn test_neighbours_sorted_by_weight() {
        let states = table();
        let graph = TransitionGraph::from_sequences(
            &states,
            &[seq(&[0, 1]), seq(&[0, 2]), seq(&[0, 2]), seq(&[3, 0])],
        );
        let out = graph.outgoing_transitions(&states[0]);
        assert_eq!(out, vec![(&states[2], 2), (&states[1], 1)]);
        let inc = graph.incoming_transitions(&states[0]);
        assert_eq!(inc, vec![(&states[3], 1)]);
        assert!(graph.outgoing_transitions(&states[4]).is_empty());
    }

    #[test]
    fn test_islands_partition_graph() {
        let states = table();
        let graph = TransitionGraph::from_sequences(
            &states,
            &[seq(&[0, 1]), seq(&[0, 1]), seq(&[2, 3]), seq(&[4])],
        );
        let islands = graph.islands();
        assert_eq!(islands.len(), 3);

        // every node lands in exactly one island
        let mut seen = HashSet::new();
        for island in &islands {
            for state in island.all_states() {
                assert!(seen.insert(state.clone()));
            }
        }
        assert_eq!(seen.len(), graph.node_count());

        // edges stay inside their island with their weights
        let total_edges: usize = islands.iter().map(TransitionGraph::edge_count).sum();
        assert_eq!(total_edges, graph.edge_count());
        assert_eq!(islands[0].weight(&states[0], &states[1]), Some(2));
        assert_eq!(islands[1].weight(&states[2], &states[3]), Some(1));
        assert_eq!(islands[2].node_count(), 1);
    }

    #[test]
    fn test_islands_ignore_direction() {
        let states = table();
        // A -> B and C -> B form one component
        let graph = TransitionGraph::from_sequences(&states, &[seq(&[0, 1]), seq(&[2, 1])]);
        let islands = graph.islands();
        assert_eq!(islands.len(), 1);
        assert_eq!(islands[0].node_count(), 3);
        assert_eq!(islands[0].edge_count(), 2);
    }

    #[test]
    fn test_graph_stats() {
        let states = table();
        let graph = TransitionGraph::from_sequences(
            &states,
            &[seq(&[0, 1, 2]), seq(&[0, 1]), seq(&[3, 4])],
        );
        let stats = graph.stats();
        assert_eq!(stats.total_states, 5);
        assert_eq!(stats.total_transitions, 3);
        assert_eq!(stats.total_weight, 4);
        assert_eq!(stats.max_weight, 2);
        assert_eq!(stats.initial_states, 2);
        assert_eq!(stats.terminal_states, 2);
        assert_eq!(stats.islands, 2);
    }
}
