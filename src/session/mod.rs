//! Session model - replay sessions, query slots and cached results

pub mod event;
pub mod model;

// Re-export key types
pub use event::{Listener, SessionEvent, SubscriptionId};
pub use model::{
    Fighter, QueryResults, QueryState, SequenceSearchModel, Session, SessionResults,
};
