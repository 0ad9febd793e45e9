//! Compiled query representation.
//!
//! A [`CompiledQuery`] is a list of matchers linked by successor indices.
//! Matcher 0 is the start matcher: it never tests a state and only holds the
//! initial transitions.

use super::ast::Qualifiers;
use crate::state::{FighterId, Motion, State, Status};

/// Index of the start matcher
pub const START: usize = 0;

/// Single-state test
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    Any,
    Motion(Motion),
    Status(Status),
    AnyOf(Vec<Predicate>),
    Not(Box<Predicate>),
}

impl Predicate {
    pub fn matches(&self, state: &State) -> bool {
        match self {
            Predicate::Any => true,
            Predicate::Motion(motion) => state.motion == *motion,
            Predicate::Status(status) => state.status == *status,
            Predicate::AnyOf(preds) => preds.iter().any(|p| p.matches(state)),
            Predicate::Not(pred) => !pred.matches(state),
        }
    }
}

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct MatcherFlags: u8 {
        /// Reaching this matcher completes the pattern
        const ACCEPT = 0b01;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Matcher {
    pub predicate: Predicate,
    pub qualifiers: Qualifiers,
    pub flags: MatcherFlags,
    /// Successor matcher indices, ascending
    pub next: Vec<usize>,
}

impl Matcher {
    pub fn new(predicate: Predicate) -> Self {
        Self {
            predicate,
            qualifiers: Qualifiers::empty(),
            flags: MatcherFlags::empty(),
            next: Vec::new(),
        }
    }

    pub fn is_accept(&self) -> bool {
        self.flags.contains(MatcherFlags::ACCEPT)
    }
}

/// Motions that identify jumps, resolved from canonical names at compile time
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JumpMotions {
    pub full_hop: Vec<Motion>,
    pub short_hop: Vec<Motion>,
    pub double_jump: Vec<Motion>,
}

/// Query automaton bound to one fighter's labels
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledQuery {
    pub(crate) fighter: FighterId,
    pub(crate) matchers: Vec<Matcher>,
    /// Parallel to `matchers`: motions reported as one logical step
    pub(crate) merge_motions: Vec<Vec<Motion>>,
    pub(crate) jumps: JumpMotions,
}

impl CompiledQuery {
    pub fn fighter(&self) -> FighterId {
        self.fighter
    }

    pub fn matchers(&self) -> &[Matcher] {
        &self.matchers
    }

    pub fn start(&self) -> &Matcher {
        &self.matchers[START]
    }

    /// Motion aliases declared for a matcher; empty when there are none
    pub fn merge_motions(&self, matcher: usize) -> &[Motion] {
        self.merge_motions
            .get(matcher)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Whether two motions were declared equivalent by the query
    pub fn are_equivalent(&self, a: Motion, b: Motion) -> bool {
        self.merge_motions
            .iter()
            .any(|group| group.contains(&a) && group.contains(&b))
    }

    pub fn jumps(&self) -> &JumpMotions {
        &self.jumps
    }
}
