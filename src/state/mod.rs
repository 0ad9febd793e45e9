//! State model - fighter snapshots and the sequences they form

pub mod sequence;
pub mod snapshot;

// Re-export key types
pub use sequence::{Range, Sequence, StateSequence};
pub use snapshot::{FighterId, HitStatus, Motion, Position, State, StateFlags, Status};
