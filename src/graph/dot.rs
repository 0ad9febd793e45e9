//! Graphviz export

use crate::Result;
use crate::graph::{NodeClass, Transition, TransitionGraph, TransitionTree, weight_intensity};
use crate::state::State;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

fn escape(label: &str) -> String {
    label.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Render any state graph; `fill` picks the node color
fn render(
    name: &str,
    graph: &DiGraph<State, Transition>,
    label: &dyn Fn(&State) -> String,
    fill: &dyn Fn(NodeIndex) -> &'static str,
) -> String {
    let max_weight = graph.edge_weights().map(|t| t.weight).max().unwrap_or(0);

    let mut dot = format!("digraph {} {{\n", name);
    dot.push_str("  rankdir=LR;\n");
    dot.push_str("  node [shape=box, style=filled];\n\n");

    for node in graph.node_indices() {
        let _ = writeln!(
            dot,
            "  n{} [label=\"{}\", fillcolor=\"{}\"];",
            node.index(),
            escape(&label(&graph[node])),
            fill(node)
        );
    }

    dot.push('\n');

    for edge in graph.edge_references() {
        let weight = edge.weight().weight;
        // Hue runs from blue for rare moves to red for the most common one
        let hue = 0.66 * (1.0 - weight_intensity(weight, max_weight));
        let _ = writeln!(
            dot,
            "  n{} -> n{} [label=\"{}\", color=\"{:.3} 1.000 0.900\"];",
            edge.source().index(),
            edge.target().index(),
            edge.weight().display_label(),
            hue
        );
    }

    dot.push_str("}\n");
    dot
}

fn write_timestamped(dir: &Path, dot: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let filename = format!("{}.graph.dot", chrono::Utc::now().format("%Y%m%d%H%M%S"));
    let path = dir.join(filename);
    std::fs::write(&path, dot)?;
    tracing::info!("Graph exported to {}", path.display());
    Ok(path)
}

impl TransitionGraph {
    /// Graphviz text, nodes colored by their place in the flow
    pub fn to_dot(&self, label: impl Fn(&State) -> String) -> String {
        render("TransitionGraph", &self.graph, &label, &|node: NodeIndex| {
            self.classify(node).color()
        })
    }

    /// Write `<timestamp>.graph.dot` into `dir`
    pub fn export_dot(&self, dir: &Path, label: impl Fn(&State) -> String) -> Result<PathBuf> {
        write_timestamped(dir, &self.to_dot(label))
    }
}

impl TransitionTree {
    pub fn to_dot(&self, label: impl Fn(&State) -> String) -> String {
        let root = self.root;
        let direction = self.direction;
        let graph = &self.graph;
        render("TransitionTree", &self.graph, &label, &move |node: NodeIndex| {
            if node == root {
                NodeClass::Initial.color()
            } else if graph.edges_directed(node, direction).next().is_none() {
                NodeClass::Terminal.color()
            } else {
                NodeClass::Active.color()
            }
        })
    }

    pub fn export_dot(&self, dir: &Path, label: impl Fn(&State) -> String) -> Result<PathBuf> {
        write_timestamped(dir, &self.to_dot(label))
    }
}
