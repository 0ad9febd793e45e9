//! Session model - owns replay data, query slots and their results
//!
//! Frames arrive one at a time and are folded into per-fighter state
//! sequences. Queries are compiled and applied on request only; new data
//! never triggers recomputation by itself.

use super::event::{SessionEvent, SubscriptionId, Subscribers};
use crate::config::SearchConfig;
use crate::data_source::{FighterFrame, FighterInfo, SessionMetadata};
use crate::graph::{TransitionGraph, TransitionTree};
use crate::labels::LabelDictionary;
use crate::query::compiler::needs_jump_motions;
use crate::query::{self, CompiledQuery, NormalizedSequences, OverlappingMatch};
use crate::state::{FighterId, Range, Sequence, State, StateSequence};
use crate::{Error, Result};
use tracing::{debug, info, warn};

/// A character/player pair accumulated across sessions
#[derive(Debug, Clone)]
pub struct Fighter {
    pub info: FighterInfo,
    pub states: StateSequence,
}

impl Fighter {
    fn is(&self, info: &FighterInfo) -> bool {
        self.info.fighter_id == info.fighter_id && self.info.player_tag == info.player_tag
    }
}

/// One loaded replay
#[derive(Debug, Clone)]
pub struct Session {
    pub metadata: SessionMetadata,
    /// Fighter index for every slot
    pub fighters: Vec<usize>,
    /// States each slot contributed to its fighter's sequence
    pub ranges: Vec<Range>,
}

impl Session {
    /// Range of `fighter`'s states recorded in this session
    pub fn range_of(&self, fighter: usize) -> Option<Range> {
        self.fighters
            .iter()
            .position(|&f| f == fighter)
            .map(|slot| self.ranges[slot])
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum QueryState {
    /// No query text
    #[default]
    Empty,
    /// Needs a compile; an earlier automaton may still be kept
    Dirty,
    /// Automaton ready; results, if any, are stale
    Compiled,
    /// Results reflect the current automaton
    Applied,
}

impl QueryState {
    pub fn name(self) -> &'static str {
        match self {
            QueryState::Empty => "empty",
            QueryState::Dirty => "dirty",
            QueryState::Compiled => "compiled",
            QueryState::Applied => "applied",
        }
    }
}

/// Everything one query produced over a set of ranges
#[derive(Debug, Clone, Default)]
pub struct QueryResults {
    pub matches: Vec<Range>,
    pub merged: Vec<Sequence>,
    pub normalized: NormalizedSequences,
    pub graph: TransitionGraph,
}

impl QueryResults {
    fn compute(
        query: &CompiledQuery,
        dict: &LabelDictionary,
        layer: Option<&str>,
        states: &[State],
        matches: Vec<Range>,
    ) -> Self {
        let merged = query::merge_motions(query, states, &matches);
        let normalized =
            query::normalize_motions(dict, query.fighter(), layer, states, &merged);
        let graph = TransitionGraph::from_sequences(&normalized.states, &normalized.sequences);
        Self {
            matches,
            merged,
            normalized,
            graph,
        }
    }
}

/// Results restricted to one session
#[derive(Debug, Clone)]
pub struct SessionResults {
    pub session: usize,
    pub results: QueryResults,
}

#[derive(Debug, Default)]
struct QuerySlot {
    text: String,
    state: QueryState,
    compiled: Option<CompiledQuery>,
    /// Fighter the automaton was compiled for
    fighter: Option<usize>,
    error: Option<String>,
    results: Option<QueryResults>,
    session_results: Vec<SessionResults>,
}

impl QuerySlot {
    fn with_text(text: &str) -> Self {
        let mut slot = Self::default();
        slot.set_text(text);
        slot
    }

    fn set_text(&mut self, text: &str) {
        self.text = text.to_string();
        self.state = if text.trim().is_empty() {
            QueryState::Empty
        } else {
            QueryState::Dirty
        };
        self.compiled = None;
        self.fighter = None;
        self.error = None;
        self.results = None;
        self.session_results.clear();
    }
}

/// Replay sessions, per-fighter state sequences and query slots
#[derive(Debug)]
pub struct SequenceSearchModel {
    dict: LabelDictionary,
    settings: SearchConfig,
    fighters: Vec<Fighter>,
    sessions: Vec<Session>,
    queries: Vec<QuerySlot>,
    current_fighter: usize,
    subscribers: Subscribers,
}

impl SequenceSearchModel {
    pub fn new(dict: LabelDictionary, settings: SearchConfig) -> Self {
        Self {
            dict,
            settings,
            fighters: Vec::new(),
            sessions: Vec::new(),
            queries: Vec::new(),
            current_fighter: 0,
            subscribers: Subscribers::default(),
        }
    }

    pub fn dictionary(&self) -> &LabelDictionary {
        &self.dict
    }

    pub fn settings(&self) -> &SearchConfig {
        &self.settings
    }

    /// Replace the label dictionary; every compiled query must be recompiled
    pub fn set_dictionary(&mut self, dict: LabelDictionary) {
        self.dict = dict;
        for slot in &mut self.queries {
            if slot.compiled.take().is_some() {
                slot.state = QueryState::Dirty;
                slot.fighter = None;
            }
        }
    }

    // Events

    pub fn subscribe(&mut self, listener: impl FnMut(&SessionEvent) + 'static) -> SubscriptionId {
        self.subscribers.subscribe(Box::new(listener))
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscribers.unsubscribe(id)
    }

    fn emit(&mut self, event: SessionEvent) {
        self.subscribers.notify(&event);
    }

    // Replay data

    /// Open a new session and map its slots onto known fighters.
    ///
    /// A slot reuses the fighter with the same character and player tag, so
    /// data from the same matchup accumulates over many replays.
    pub fn start_new_session(&mut self, metadata: SessionMetadata) -> usize {
        let mut slots: Vec<usize> = Vec::with_capacity(metadata.fighters.len());
        let mut ranges: Vec<Range> = Vec::with_capacity(metadata.fighters.len());

        for info in &metadata.fighters {
            let known = self
                .fighters
                .iter()
                .enumerate()
                .position(|(idx, f)| f.is(info) && !slots.contains(&idx));
            let idx = match known {
                Some(idx) => idx,
                None => {
                    let mut info = info.clone();
                    if info.name.is_empty()
                        && let Some(name) = self.dict.fighter_name(info.fighter_id)
                    {
                        info.name = name.to_string();
                    }
                    debug!("New fighter {} ({})", info.player_tag, info.fighter_id);
                    self.fighters.push(Fighter {
                        info,
                        states: StateSequence::new(),
                    });
                    self.fighters.len() - 1
                }
            };
            let start = self.fighters[idx].states.start_segment();
            slots.push(idx);
            ranges.push(Range::new(start, start));
        }

        self.sessions.push(Session {
            metadata,
            fighters: slots,
            ranges,
        });
        let index = self.sessions.len() - 1;
        info!(
            "Started session {} with {} fighter(s)",
            index,
            self.sessions[index].fighters.len()
        );
        self.mark_results_stale();
        self.emit(SessionEvent::NewSession { index });
        index
    }

    /// Append one frame of the active session, one entry per slot
    pub fn add_frame(&mut self, frames: &[FighterFrame]) -> Result<()> {
        let Some(session) = self.sessions.last_mut() else {
            return Err(Error::no_replay_data());
        };
        if frames.len() != session.fighters.len() {
            return Err(Error::data(format!(
                "Expected {} fighter frames, got {}",
                session.fighters.len(),
                frames.len()
            )));
        }

        for (slot, frame) in frames.iter().enumerate() {
            let opponents: Vec<&FighterFrame> = frames
                .iter()
                .enumerate()
                .filter(|&(other, _)| other != slot)
                .map(|(_, f)| f)
                .collect();
            let fighter = &mut self.fighters[session.fighters[slot]];
            fighter.states.push(frame.to_state(&opponents));
            session.ranges[slot].end = fighter.states.len();
        }

        self.mark_results_stale();
        self.emit(SessionEvent::DataAdded);
        Ok(())
    }

    /// Applied results no longer cover all data; they stay readable until
    /// the next apply
    fn mark_results_stale(&mut self) {
        for slot in &mut self.queries {
            if slot.state == QueryState::Applied {
                slot.state = QueryState::Compiled;
            }
        }
    }

    /// Drop all sessions, fighters and query results
    pub fn clear_all(&mut self) {
        self.fighters.clear();
        self.sessions.clear();
        self.current_fighter = 0;
        for slot in &mut self.queries {
            *slot = QuerySlot::default();
        }
        info!("Cleared all replay data");
        self.emit(SessionEvent::DataCleared);
    }

    pub fn fighters(&self) -> &[Fighter] {
        &self.fighters
    }

    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    /// Fighter new queries are compiled for
    pub fn current_fighter(&self) -> Option<usize> {
        (self.current_fighter < self.fighters.len()).then_some(self.current_fighter)
    }

    pub fn set_current_fighter(&mut self, fighter: usize) -> bool {
        if fighter >= self.fighters.len() {
            return false;
        }
        self.current_fighter = fighter;
        true
    }

    /// Select the first fighter playing `fighter_id`
    pub fn select_fighter_id(&mut self, fighter_id: FighterId) -> bool {
        match self
            .fighters
            .iter()
            .position(|f| f.info.fighter_id == fighter_id)
        {
            Some(idx) => self.set_current_fighter(idx),
            None => false,
        }
    }

    /// Human-readable label for a state of `fighter`
    pub fn display_label(&self, fighter: usize, state: &State) -> String {
        let fighter_id = self
            .fighters
            .get(fighter)
            .map(|f| f.info.fighter_id)
            .unwrap_or_default();
        self.dict.motion_to_display_string(
            fighter_id,
            state.motion,
            self.settings.label_layer.as_deref(),
        )
    }

    // Query slots

    pub fn query_count(&self) -> usize {
        self.queries.len()
    }

    pub fn add_query(&mut self, text: &str) -> usize {
        self.queries.push(QuerySlot::with_text(text));
        let index = self.queries.len() - 1;
        self.emit(SessionEvent::QueryAdded { index });
        index
    }

    pub fn remove_query(&mut self, index: usize) -> bool {
        if index >= self.queries.len() {
            return false;
        }
        self.queries.remove(index);
        self.emit(SessionEvent::QueryRemoved { index });
        true
    }

    /// Change the text of a query. Unchanged text keeps the current state.
    pub fn set_query(&mut self, index: usize, text: &str) -> bool {
        let Some(slot) = self.queries.get_mut(index) else {
            return false;
        };
        if slot.text != text {
            slot.set_text(text);
        }
        true
    }

    pub fn query_text(&self, index: usize) -> Option<&str> {
        self.queries.get(index).map(|q| q.text.as_str())
    }

    pub fn query_state(&self, index: usize) -> Option<QueryState> {
        self.queries.get(index).map(|q| q.state)
    }

    /// Message of the last failed compile or apply
    pub fn query_error(&self, index: usize) -> Option<&str> {
        self.queries.get(index).and_then(|q| q.error.as_deref())
    }

    pub fn compiled_query(&self, index: usize) -> Option<&CompiledQuery> {
        self.queries.get(index).and_then(|q| q.compiled.as_ref())
    }

    /// Fighter the query was compiled for
    pub fn query_fighter(&self, index: usize) -> Option<usize> {
        self.queries.get(index).and_then(|q| q.fighter)
    }

    pub fn results(&self, index: usize) -> Option<&QueryResults> {
        self.queries.get(index).and_then(|q| q.results.as_ref())
    }

    pub fn session_results(&self, index: usize) -> &[SessionResults] {
        self.queries
            .get(index)
            .map(|q| q.session_results.as_slice())
            .unwrap_or(&[])
    }

    fn try_compile(&self, index: usize) -> Result<(CompiledQuery, usize)> {
        let slot = &self.queries[index];
        if slot.state == QueryState::Empty {
            return Err(Error::data("Query is empty"));
        }
        let fighter = self.current_fighter().ok_or_else(Error::no_replay_data)?;
        let ast = query::parse(&slot.text)?;
        let compiled = query::compile(&ast, &self.dict, self.fighters[fighter].info.fighter_id)?;
        Ok((compiled, fighter))
    }

    /// Compile a query for the current fighter
    pub fn compile_query(&mut self, index: usize) -> bool {
        if index >= self.queries.len() {
            return false;
        }
        let outcome = self.try_compile(index);
        let slot = &mut self.queries[index];
        let error = match outcome {
            Ok((compiled, fighter)) => {
                debug!(
                    "Compiled query {} into {} matchers",
                    index,
                    compiled.matchers().len()
                );
                let jumps = compiled.jumps();
                let no_jumps = jumps.full_hop.is_empty()
                    && jumps.short_hop.is_empty()
                    && jumps.double_jump.is_empty();
                if no_jumps
                    && compiled
                        .matchers()
                        .iter()
                        .any(|m| needs_jump_motions(m.qualifiers))
                {
                    warn!(
                        "Query {} uses jump qualifiers but no jump motions are named",
                        index
                    );
                }
                slot.compiled = Some(compiled);
                slot.fighter = Some(fighter);
                slot.state = QueryState::Compiled;
                slot.error = None;
                None
            }
            Err(err) => {
                warn!("Failed to compile query {}: {}", index, err);
                if slot.state != QueryState::Empty {
                    slot.state = QueryState::Dirty;
                }
                slot.error = Some(err.to_string());
                slot.error.clone()
            }
        };
        let success = error.is_none();
        self.emit(SessionEvent::QueryCompiled {
            index,
            success,
            error,
        });
        success
    }

    fn try_apply(&self, index: usize) -> Result<(QueryResults, Vec<SessionResults>)> {
        let slot = &self.queries[index];
        let (Some(compiled), Some(fighter)) = (&slot.compiled, slot.fighter) else {
            return Err(Error::data("Query has not been compiled"));
        };
        let Some(owner) = self.fighters.get(fighter) else {
            return Err(Error::no_replay_data());
        };
        let states = owner.states.states();
        let layer = self.settings.label_layer.as_deref();

        let mut all_matches = Vec::new();
        let mut per_session = Vec::new();
        for (session, data) in self.sessions.iter().enumerate() {
            let Some(range) = data.range_of(fighter) else {
                continue;
            };
            let matches = compiled.apply(states, range);
            all_matches.extend_from_slice(&matches);
            per_session.push(SessionResults {
                session,
                results: QueryResults::compute(compiled, &self.dict, layer, states, matches),
            });
        }

        let results = QueryResults::compute(compiled, &self.dict, layer, states, all_matches);
        Ok((results, per_session))
    }

    /// Run a compiled query over every session of its fighter
    pub fn apply_query(&mut self, index: usize) -> bool {
        if index >= self.queries.len() {
            return false;
        }
        let outcome = self.try_apply(index);
        let slot = &mut self.queries[index];
        let error = match outcome {
            Ok((results, per_session)) => {
                info!(
                    "Query {} matched {} time(s) in {} session(s)",
                    index,
                    results.matches.len(),
                    per_session.len()
                );
                slot.results = Some(results);
                slot.session_results = per_session;
                slot.state = QueryState::Applied;
                slot.error = None;
                None
            }
            Err(err) => {
                warn!("Failed to apply query {}: {}", index, err);
                slot.error = Some(err.to_string());
                slot.error.clone()
            }
        };
        let success = error.is_none();
        self.emit(SessionEvent::QueryApplied {
            index,
            success,
            error,
        });
        success
    }

    /// Compile every non-empty query; returns `true` if all succeeded
    pub fn compile_all(&mut self) -> bool {
        let mut ok = true;
        for index in 0..self.queries.len() {
            if self.queries[index].state != QueryState::Empty {
                ok &= self.compile_query(index);
            }
        }
        ok
    }

    /// Apply every compiled query; returns `true` if all succeeded.
    ///
    /// Slots left dirty by a failed compile count as failures but keep their
    /// compile error.
    pub fn apply_all(&mut self) -> bool {
        let mut ok = true;
        for index in 0..self.queries.len() {
            match self.queries[index].state {
                QueryState::Empty => {}
                QueryState::Dirty => ok = false,
                QueryState::Compiled | QueryState::Applied => ok &= self.apply_query(index),
            }
        }
        ok
    }

    /// What tends to follow `root` in the normalized matches of a query
    pub fn outgoing_tree(&self, index: usize, root: &State) -> Option<TransitionTree> {
        let results = self.results(index)?;
        Some(TransitionTree::outgoing(
            &results.normalized.states,
            &results.normalized.sequences,
            root,
            self.settings.outgoing_tree_size,
        ))
    }

    /// What tends to precede `root` in the normalized matches of a query
    pub fn incoming_tree(&self, index: usize, root: &State) -> Option<TransitionTree> {
        let results = self.results(index)?;
        Some(TransitionTree::incoming(
            &results.normalized.states,
            &results.normalized.sequences,
            root,
            self.settings.incoming_tree_size,
        ))
    }

    /// Pair matches of two compiled queries bound to different fighters of
    /// one session whose frame windows intersect
    pub fn find_overlapping(
        &self,
        own_query: usize,
        opponent_query: usize,
        session: usize,
    ) -> Result<Vec<OverlappingMatch>> {
        let compiled = |index: usize| {
            let slot = self
                .queries
                .get(index)
                .ok_or_else(|| Error::data(format!("No query at index {}", index)))?;
            match (&slot.compiled, slot.fighter) {
                (Some(compiled), Some(fighter)) => Ok((compiled, fighter)),
                _ => Err(Error::data(format!("Query {} has not been compiled", index))),
            }
        };
        let (own, own_fighter) = compiled(own_query)?;
        let (opponent, opponent_fighter) = compiled(opponent_query)?;
        let data = self
            .sessions
            .get(session)
            .ok_or_else(|| Error::data(format!("No session at index {}", session)))?;
        let range = |fighter: usize| {
            data.range_of(fighter).ok_or_else(|| {
                Error::data(format!("Fighter {} is not in session {}", fighter, session))
            })
        };

        Ok(query::find_all_overlapping(
            own,
            self.fighters[own_fighter].states.states(),
            range(own_fighter)?,
            opponent,
            self.fighters[opponent_fighter].states.states(),
            range(opponent_fighter)?,
        ))
    }
}
