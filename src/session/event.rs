//! Change notifications emitted by the session model

use serde::Serialize;
use std::fmt;

/// Something observable changed in a [`SequenceSearchModel`](super::SequenceSearchModel).
///
/// Events are delivered after the operation that caused them has finished.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    /// A replay session was started
    NewSession { index: usize },
    /// Frames were appended to the active session
    DataAdded,
    /// All sessions, fighters and query results were dropped
    DataCleared,
    QueryAdded { index: usize },
    QueryRemoved { index: usize },
    QueryCompiled {
        index: usize,
        success: bool,
        error: Option<String>,
    },
    QueryApplied {
        index: usize,
        success: bool,
        error: Option<String>,
    },
}

/// Handle returned by `subscribe`, used to unsubscribe later
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub(crate) u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

pub type Listener = Box<dyn FnMut(&SessionEvent)>;

/// Ordered list of listeners
#[derive(Default)]
pub(crate) struct Subscribers {
    listeners: Vec<(SubscriptionId, Listener)>,
    next_id: u64,
}

impl Subscribers {
    pub(crate) fn subscribe(&mut self, listener: Listener) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, listener));
        id
    }

    /// Returns `false` if the id was not subscribed.
    pub(crate) fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sub, _)| *sub != id);
        self.listeners.len() != before
    }

    pub(crate) fn len(&self) -> usize {
        self.listeners.len()
    }

    pub(crate) fn notify(&mut self, event: &SessionEvent) {
        for (_, listener) in &mut self.listeners {
            listener(event);
        }
    }
}

impl fmt::Debug for Subscribers {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Subscribers")
            .field("count", &self.listeners.len())
            .field("next_id", &self.next_id)
            .finish()
    }
}
