//! Sequences of states and ranges into them

use super::State;
use serde::{Deserialize, Serialize};

/// Half-open `[start, end)` range of state indices
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Range {
    pub start: usize,
    pub end: usize,
}

impl Range {
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end, "range start {} past end {}", start, end);
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// An empty range means "no match"
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn contains(&self, idx: usize) -> bool {
        self.start <= idx && idx < self.end
    }

    pub fn indices(&self) -> std::ops::Range<usize> {
        self.start..self.end
    }
}

/// Ordered state indices forming one matched path.
///
/// Unlike [`Range`], indices need not be contiguous: merging collapses runs
/// into one representative.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Sequence {
    pub idxs: Vec<usize>,
}

impl Sequence {
    pub fn new(idxs: Vec<usize>) -> Self {
        Self { idxs }
    }

    pub fn from_range(range: Range) -> Self {
        Self {
            idxs: range.indices().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.idxs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.idxs.is_empty()
    }

    /// Resolve indices against a state table
    pub fn states<'a>(&'a self, states: &'a [State]) -> impl Iterator<Item = &'a State> + 'a {
        self.idxs.iter().map(move |&idx| &states[idx])
    }
}

/// Append-only per-fighter list of states.
///
/// Consecutive frames describing the same action are stored once: pushing a
/// state with the same motion, status and hit status as the last stored state
/// OR-s its flags into that state instead of appending.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StateSequence {
    states: Vec<State>,
    /// States before this index belong to earlier sessions and never absorb
    /// new frames
    #[serde(default)]
    segment_start: usize,
}

impl StateSequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if a new state was appended.
    pub fn push(&mut self, state: State) -> bool {
        if self.states.len() > self.segment_start
            && let Some(last) = self.states.last_mut()
            && last.same_action(&state)
        {
            last.flags |= state.flags;
            return false;
        }
        self.states.push(state);
        true
    }

    /// Begin a new session; returns the index its first state will get.
    pub fn start_segment(&mut self) -> usize {
        self.segment_start = self.states.len();
        self.segment_start
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn states(&self) -> &[State] {
        &self.states
    }

    pub fn full_range(&self) -> Range {
        Range::new(0, self.states.len())
    }

    pub fn clear(&mut self) {
        self.states.clear();
        self.segment_start = 0;
    }
}
