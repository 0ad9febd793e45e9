//! Edge and node payloads of a transition graph

use serde::{Deserialize, Serialize};

/// An observed move from one state to the next
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    /// Number of times the move was seen
    pub weight: u32,
}

impl Transition {
    /// A transition seen once
    pub fn observed() -> Self {
        Self { weight: 1 }
    }

    pub fn with_weight(weight: u32) -> Self {
        Self { weight }
    }

    /// Count one more observation
    pub fn record(&mut self) {
        self.weight = self.weight.saturating_add(1);
    }

    pub fn display_label(&self) -> String {
        self.weight.to_string()
    }
}

impl Default for Transition {
    fn default() -> Self {
        Self::observed()
    }
}

/// Position of a node in the flow of the graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum NodeClass {
    /// Only outgoing edges
    Initial,
    /// Both incoming and outgoing edges
    Active,
    /// Only incoming edges
    Terminal,
    /// No edges at all
    #[default]
    Isolated,
}

impl NodeClass {
    pub fn from_degree(incoming: usize, outgoing: usize) -> Self {
        match (incoming > 0, outgoing > 0) {
            (false, true) => NodeClass::Initial,
            (true, true) => NodeClass::Active,
            (true, false) => NodeClass::Terminal,
            (false, false) => NodeClass::Isolated,
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            NodeClass::Initial => "lightblue",
            NodeClass::Active => "lightyellow",
            NodeClass::Terminal => "lightgreen",
            NodeClass::Isolated => "gray",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            NodeClass::Initial => "Initial",
            NodeClass::Active => "Active",
            NodeClass::Terminal => "Terminal",
            NodeClass::Isolated => "Isolated",
        }
    }
}
