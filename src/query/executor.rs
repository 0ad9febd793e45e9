//! Query execution over state sequences.
//!
//! The walk is greedy: from each start position it follows the lowest-index
//! successor that matches the next state and never revisits a choice. A walk
//! succeeds when it stops on an accepting matcher, either because the range
//! is exhausted or because no successor matches.

use super::ast::Qualifiers;
use super::matcher::{CompiledQuery, JumpMotions, START};
use crate::labels::LabelDictionary;
use crate::state::{FighterId, Range, Sequence, State};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

impl CompiledQuery {
    /// Find every start position in `range` from which the pattern matches.
    ///
    /// Returned ranges are never empty and lie within `range`. Matches from
    /// neighbouring start positions may overlap.
    pub fn apply(&self, states: &[State], range: Range) -> Vec<Range> {
        let range = Range::new(range.start.min(states.len()), range.end.min(states.len()));
        range
            .indices()
            .filter_map(|start| self.walk(states, range, start).map(|end| Range::new(start, end)))
            .collect()
    }

    fn walk(&self, states: &[State], range: Range, start: usize) -> Option<usize> {
        let mut current = START;
        let mut pos = start;
        loop {
            let matcher = &self.matchers[current];
            let next = if pos < range.end {
                matcher
                    .next
                    .iter()
                    .copied()
                    .find(|&idx| self.matches_at(idx, states, range, pos))
            } else {
                None
            };
            match next {
                Some(idx) => {
                    current = idx;
                    pos += 1;
                }
                None => return (current != START && matcher.is_accept()).then_some(pos),
            }
        }
    }

    fn matches_at(&self, matcher: usize, states: &[State], range: Range, pos: usize) -> bool {
        let matcher = &self.matchers[matcher];
        if !matcher.predicate.matches(&states[pos]) {
            return false;
        }
        matcher.qualifiers.is_empty()
            || matcher
                .qualifiers
                .intersects(classify(states, range, pos, &self.jumps))
    }
}

/// Context bits observed for the state at `pos`.
///
/// Neighbours outside `range` belong to other sessions and are ignored.
pub fn classify(states: &[State], range: Range, pos: usize, jumps: &JumpMotions) -> Qualifiers {
    let state = &states[pos];
    let prev = (pos > range.start).then(|| &states[pos - 1]);
    let prev2 = (pos > range.start + 1).then(|| &states[pos - 2]);
    let next = (pos + 1 < range.end).then(|| &states[pos + 1]);

    let mut q = Qualifiers::empty();
    let flags = state.flags;
    if flags.is_hit() {
        q |= Qualifiers::HIT;
    }
    if flags.opponent_in_shieldlag() {
        q |= Qualifiers::ON_SHIELD;
    }
    if !flags.is_hit() && !flags.opponent_in_shieldlag() {
        q |= Qualifiers::WHIFF;
    }
    if flags.is_damaged() {
        q |= Qualifiers::DAMAGED;
    }
    if prev.is_some_and(|p| p.flags.in_shieldlag()) {
        q |= Qualifiers::OUT_OF_SHIELD;
    }
    if let Some(next) = next {
        if next.position.y > state.position.y {
            q |= Qualifiers::RISING;
        } else if next.position.y < state.position.y {
            q |= Qualifiers::FALLING;
        }
    }
    if let Some(prev) = prev {
        let hop = |s: &State| {
            jumps.full_hop.contains(&s.motion) || jumps.short_hop.contains(&s.motion)
        };
        if jumps.full_hop.contains(&prev.motion) {
            q |= Qualifiers::FULL_HOP;
        }
        if jumps.short_hop.contains(&prev.motion) {
            q |= Qualifiers::SHORT_HOP;
        }
        if jumps.double_jump.contains(&prev.motion) {
            q |= Qualifiers::DOUBLE_JUMP;
            if prev2.is_some_and(hop) {
                q |= Qualifiers::IMMEDIATE_DOUBLE_JUMP;
            }
        }
    }
    q
}

/// A match of one fighter's pattern that overlaps in time with a match of
/// the opponent's pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlappingMatch {
    pub own: Range,
    pub opponent: Range,
}

/// Frame window `[first, end)` covered by a range
fn frame_window(states: &[State], range: Range) -> (u32, u32) {
    let begin = states[range.start].frame;
    let end = match states.get(range.end) {
        Some(state) => state.frame,
        None => states[range.end - 1].frame.saturating_add(1),
    };
    (begin, end.max(begin.saturating_add(1)))
}

/// Run two queries over two parallel sequences and pair up matches whose
/// frame windows intersect.
pub fn find_all_overlapping(
    own_query: &CompiledQuery,
    own_states: &[State],
    own_range: Range,
    opponent_query: &CompiledQuery,
    opponent_states: &[State],
    opponent_range: Range,
) -> Vec<OverlappingMatch> {
    let own_matches = own_query.apply(own_states, own_range);
    let opponent_matches = opponent_query.apply(opponent_states, opponent_range);

    let mut result = Vec::new();
    for own in own_matches {
        let (own_begin, own_end) = frame_window(own_states, own);
        for &opponent in &opponent_matches {
            let (opp_begin, opp_end) = frame_window(opponent_states, opponent);
            // Matches are ordered by start, so frames only grow from here
            if opp_begin >= own_end {
                break;
            }
            if own_begin < opp_end {
                result.push(OverlappingMatch { own, opponent });
            }
        }
    }
    result
}

/// Collapse runs of states the query declared equivalent.
///
/// Each run is reported by the index of its first state.
pub fn merge_motions(query: &CompiledQuery, states: &[State], matches: &[Range]) -> Vec<Sequence> {
    matches
        .iter()
        .map(|range| {
            let mut idxs = Vec::with_capacity(range.len());
            for idx in range.indices() {
                if idx > range.start
                    && query.are_equivalent(states[idx - 1].motion, states[idx].motion)
                {
                    continue;
                }
                idxs.push(idx);
            }
            Sequence::new(idxs)
        })
        .collect()
}

/// Sequences rewritten against their own deduplicated state table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedSequences {
    pub states: Vec<State>,
    pub sequences: Vec<Sequence>,
}

/// Canonicalize sequences independently of any query.
///
/// Motions sharing a user label collapse onto one representative, hitlag and
/// hitstun flags are folded, and consecutive states that become equal are
/// merged.
pub fn normalize_motions(
    dict: &LabelDictionary,
    fighter: FighterId,
    layer: Option<&str>,
    states: &[State],
    sequences: &[Sequence],
) -> NormalizedSequences {
    let mut table: Vec<State> = Vec::new();
    let mut index: HashMap<State, usize> = HashMap::new();

    let sequences = sequences
        .iter()
        .map(|seq| {
            let mut idxs: Vec<usize> = Vec::with_capacity(seq.len());
            for state in seq.states(states) {
                let motion = dict.representative_motion(fighter, state.motion, layer);
                let normalized = state.normalized(motion);
                let idx = *index.entry(normalized.clone()).or_insert_with(|| {
                    table.push(normalized);
                    table.len() - 1
                });
                if idxs.last() != Some(&idx) {
                    idxs.push(idx);
                }
            }
            Sequence::new(idxs)
        })
        .collect();

    NormalizedSequences {
        states: table,
        sequences,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{compile, parse};
    use crate::state::{Motion, Position, StateFlags, StateSequence};

    const FIGHTER: FighterId = 8;
    const NAIR: u64 = 0x10;
    const UTILT: u64 = 0x20;
    const GRAB: u64 = 0x30;
    const JAB1: u64 = 0x41;
    const JAB2: u64 = 0x42;
    const SHIELD: u64 = 0x60;
    const JUMP: u64 = 0x50;
    const JUMP_MINI: u64 = 0x51;
    const JUMP_AERIAL: u64 = 0x52;

    fn dictionary() -> LabelDictionary {
        let mut dict = LabelDictionary::new();
        dict.add_fighter(FIGHTER, "pikachu");
        dict.add_canonical("jump_f", Motion::new(JUMP));
        dict.add_canonical("jump_f_mini", Motion::new(JUMP_MINI));
        dict.add_canonical("jump_aerial_f", Motion::new(JUMP_AERIAL));
        for (motion, label) in [
            (NAIR, "nair"),
            (UTILT, "utilt"),
            (GRAB, "grab"),
            (JAB1, "jab"),
            (JAB2, "jab"),
            (SHIELD, "shield"),
        ] {
            dict.add_user_label(FIGHTER, Motion::new(motion), label, "user");
        }
        dict
    }

    fn query(text: &str) -> CompiledQuery {
        compile(&parse(text).unwrap(), &dictionary(), FIGHTER).unwrap()
    }

    fn state(motion: u64) -> State {
        State::new(Motion::new(motion), 0, 0, StateFlags::empty())
    }

    fn flagged(motion: u64, flags: StateFlags) -> State {
        State::new(Motion::new(motion), 0, 0, flags)
    }

    fn ingest(states: impl IntoIterator<Item = State>) -> Vec<State> {
        let mut seq = StateSequence::new();
        for s in states {
            seq.push(s);
        }
        seq.states().to_vec()
    }

    fn run(text: &str, states: &[State]) -> Vec<Range> {
        query(text).apply(states, Range::new(0, states.len()))
    }

    #[test]
    fn test_consecutive_duplicates_collapse_before_matching() {
        let states = ingest([state(NAIR), state(NAIR), state(UTILT), state(GRAB)]);
        assert_eq!(states.len(), 3);
        assert_eq!(run("nair -> utilt", &states), vec![Range::new(0, 2)]);
    }

    #[test]
    fn test_wildcard_match() {
        let states = ingest([state(NAIR), state(UTILT), state(GRAB)]);
        assert_eq!(run("nair -> . -> grab", &states), vec![Range::new(0, 3)]);
        assert_eq!(run(".2", &states), vec![Range::new(0, 2), Range::new(1, 3)]);
    }

    #[test]
    fn test_no_match() {
        let states = ingest([state(NAIR), state(UTILT), state(GRAB)]);
        assert!(run("grab -> nair", &states).is_empty());
        assert!(run("nair -> grab", &states).is_empty());
    }

    #[test]
    fn test_overlapping_matches_are_all_reported() {
        let states = ingest([state(JAB1), state(JAB2), state(JAB1), state(GRAB)]);
        assert_eq!(
            run("jab+ -> grab", &states),
            vec![Range::new(0, 4), Range::new(1, 4), Range::new(2, 4)]
        );
    }

    #[test]
    fn test_greedy_walk_does_not_backtrack() {
        // `jab+` swallows every jab, so the trailing `jab` never gets one
        let states = ingest([state(JAB1), state(JAB2), state(GRAB)]);
        assert!(run("jab+ -> jab", &states).is_empty());
        // bounded repetition with a tail is fine when the tail differs
        assert_eq!(run("jab{1,3} -> grab", &states), vec![Range::new(0, 3), Range::new(1, 3)]);
    }

    #[test]
    fn test_accepting_on_optional_tail() {
        let states = ingest([state(NAIR), state(GRAB), state(NAIR), state(UTILT)]);
        assert_eq!(
            run("nair -> utilt?", &states),
            vec![Range::new(0, 1), Range::new(2, 4)]
        );
    }

    #[test]
    fn test_match_at_end_of_range() {
        let states = ingest([state(UTILT), state(NAIR)]);
        assert_eq!(run("nair", &states), vec![Range::new(1, 2)]);
    }

    #[test]
    fn test_apply_respects_sub_range() {
        let states = ingest([state(NAIR), state(UTILT), state(NAIR), state(UTILT)]);
        let q = query("nair -> utilt");
        assert_eq!(q.apply(&states, Range::new(1, 4)), vec![Range::new(2, 4)]);
        // a match may not run past the end of the range
        assert!(q.apply(&states, Range::new(0, 1)).is_empty());
        // out-of-bounds ranges are clamped
        assert_eq!(q.apply(&states, Range::new(2, 10)), vec![Range::new(2, 4)]);
        assert!(q.apply(&states, Range::new(3, 3)).is_empty());
    }

    #[test]
    fn test_ranges_are_valid() {
        let states = ingest([state(JAB1), state(NAIR), state(JAB2), state(UTILT), state(GRAB)]);
        for text in ["jab", "jab+", ".", ".2 -> grab?", "!nair", "(jab | nair)+"] {
            for r in run(text, &states) {
                assert!(r.start < r.end, "{}: {:?}", text, r);
                assert!(r.end <= states.len());
            }
        }
    }

    #[test]
    fn test_inversion_matches_other_states() {
        let states = ingest([state(NAIR), state(UTILT), state(GRAB)]);
        assert_eq!(
            run("!nair -> grab", &states),
            vec![Range::new(1, 3)]
        );
    }

    #[test]
    fn test_hit_whiff_and_shield_qualifiers() {
        let states = ingest([
            flagged(NAIR, StateFlags::OPPONENT_IN_HITLAG),
            state(UTILT),
            flagged(NAIR, StateFlags::OPPONENT_IN_SHIELDLAG),
            state(GRAB),
            state(NAIR),
        ]);
        assert_eq!(run("nair:hit", &states), vec![Range::new(0, 1)]);
        assert_eq!(run("nair:os", &states), vec![Range::new(2, 3)]);
        assert_eq!(run("nair:whiff", &states), vec![Range::new(4, 5)]);
        // qualifier bits intersect
        assert_eq!(
            run("nair:hit:os", &states),
            vec![Range::new(0, 1), Range::new(2, 3)]
        );
    }

    #[test]
    fn test_out_of_shield_and_damage_qualifiers() {
        let states = ingest([
            flagged(SHIELD, StateFlags::IN_SHIELDLAG),
            state(GRAB),
            flagged(UTILT, StateFlags::IN_HITSTUN),
            state(GRAB),
        ]);
        assert_eq!(run("grab:oos", &states), vec![Range::new(1, 2)]);
        assert_eq!(run("utilt:dmg", &states), vec![Range::new(2, 3)]);
    }

    #[test]
    fn test_rising_and_falling() {
        let at = |motion, y| state(motion).with_position(Position::new(0.0, y));
        let states = ingest([at(NAIR, 0.0), at(UTILT, 10.0), at(NAIR, 20.0), at(GRAB, 5.0)]);
        assert_eq!(run("nair:rising", &states), vec![Range::new(0, 1)]);
        assert_eq!(run("nair:falling", &states), vec![Range::new(2, 3)]);
    }

    #[test]
    fn test_jump_qualifiers() {
        let states = ingest([
            state(JUMP),
            state(NAIR),
            state(JUMP_MINI),
            state(JUMP_AERIAL),
            state(NAIR),
            state(UTILT),
            state(JUMP_AERIAL),
            state(NAIR),
        ]);
        assert_eq!(run("nair:fh", &states), vec![Range::new(1, 2)]);
        assert_eq!(run("nair:dj", &states), vec![Range::new(4, 5), Range::new(7, 8)]);
        assert_eq!(run("nair:idj", &states), vec![Range::new(4, 5)]);
        assert!(run("nair:sh", &states).is_empty());
    }

    #[test]
    fn test_find_all_overlapping() {
        let own = ingest([
            state(NAIR).with_frame(0),
            state(UTILT).with_frame(10),
            state(GRAB).with_frame(20),
            state(NAIR).with_frame(40),
        ]);
        let opponent = ingest([
            state(SHIELD).with_frame(0),
            state(JAB1).with_frame(15),
            state(GRAB).with_frame(18),
            state(JAB1).with_frame(60),
        ]);
        let own_q = query("utilt");
        let opp_q = query("jab");
        let pairs = find_all_overlapping(
            &own_q,
            &own,
            Range::new(0, own.len()),
            &opp_q,
            &opponent,
            Range::new(0, opponent.len()),
        );
        // utilt covers frames 10..20, jab covers 15..18; the second jab is at 60
        assert_eq!(
            pairs,
            vec![OverlappingMatch {
                own: Range::new(1, 2),
                opponent: Range::new(1, 2),
            }]
        );
    }

    #[test]
    fn test_frame_window_at_last_frame() {
        let own = ingest([
            state(NAIR).with_frame(u32::MAX - 1),
            state(UTILT).with_frame(u32::MAX),
        ]);
        assert_eq!(frame_window(&own, Range::new(0, 1)), (u32::MAX - 1, u32::MAX));
        assert_eq!(frame_window(&own, Range::new(1, 2)), (u32::MAX, u32::MAX));

        let opponent = ingest([state(SHIELD).with_frame(0), state(JAB1).with_frame(u32::MAX - 1)]);
        let pairs = find_all_overlapping(
            &query("nair"),
            &own,
            Range::new(0, own.len()),
            &query("jab"),
            &opponent,
            Range::new(0, opponent.len()),
        );
        assert_eq!(
            pairs,
            vec![OverlappingMatch {
                own: Range::new(0, 1),
                opponent: Range::new(1, 2),
            }]
        );
    }

    #[test]
    fn test_merge_motions_collapses_declared_equivalents() {
        let states = ingest([state(JAB1), state(JAB2), state(JAB1), state(GRAB)]);
        let q = query("jab+ -> grab");
        let matches = q.apply(&states, Range::new(0, states.len()));
        let merged = merge_motions(&q, &states, &matches);
        assert_eq!(merged[0], Sequence::new(vec![0, 3]));
        assert_eq!(merged[1], Sequence::new(vec![1, 3]));
        assert_eq!(merged[2], Sequence::new(vec![2, 3]));
    }

    #[test]
    fn test_merge_motions_without_groups_is_identity() {
        let states = ingest([state(NAIR), state(UTILT), state(GRAB)]);
        let q = query("nair -> utilt -> grab");
        let merged = merge_motions(&q, &states, &[Range::new(0, 3)]);
        assert_eq!(merged, vec![Sequence::new(vec![0, 1, 2])]);
    }

    #[test]
    fn test_normalize_motions() {
        let states = ingest([
            flagged(NAIR, StateFlags::OPPONENT_IN_HITLAG),
            state(JAB1),
            state(JAB2),
            state(GRAB),
            flagged(NAIR, StateFlags::OPPONENT_IN_HITSTUN),
            state(JAB2),
        ]);
        let seqs = vec![Sequence::new(vec![0, 1, 2, 3]), Sequence::new(vec![4, 5])];
        let normalized = normalize_motions(&dictionary(), FIGHTER, None, &states, &seqs);

        // both nairs fold onto one hit state, both jabs onto the first jab
        assert_eq!(normalized.states.len(), 3);
        assert_eq!(normalized.sequences[0], Sequence::new(vec![0, 1, 2]));
        assert_eq!(normalized.sequences[1], Sequence::new(vec![0, 1]));
        assert_eq!(normalized.states[1].motion, Motion::new(JAB1));
    }
}
