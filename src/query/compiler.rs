//! Query compiler - binds a syntax tree to a fighter's labels.
//!
//! Each sub-expression compiles to a fragment: the matchers a match can
//! enter through (`first`), the matchers it can leave from (`last`) and
//! whether it may match nothing at all. Sequencing links every exit of the
//! left fragment to every entry of the right one; a nullable fragment lets
//! its neighbours link past it.

use super::ast::{Ast, Qualifiers};
use super::matcher::{CompiledQuery, JumpMotions, Matcher, MatcherFlags, Predicate, START};
use crate::error::CompileError;
use crate::labels::LabelDictionary;
use crate::state::{FighterId, Motion, Status};

/// Upper bound on automaton size after repetitions are unrolled
pub const MAX_MATCHERS: usize = 4096;

const FULL_HOP_MOTIONS: &[&str] = &["jump_f", "jump_b"];
const SHORT_HOP_MOTIONS: &[&str] = &["jump_f_mini", "jump_b_mini"];
const DOUBLE_JUMP_MOTIONS: &[&str] = &["jump_aerial_f", "jump_aerial_b"];

/// Compile a query for one fighter
pub fn compile(
    ast: &Ast,
    dict: &LabelDictionary,
    fighter: FighterId,
) -> Result<CompiledQuery, CompileError> {
    let mut compiler = Compiler {
        dict,
        fighter,
        matchers: vec![Matcher::new(Predicate::Any)],
        merge_motions: vec![Vec::new()],
    };

    let fragment = compiler.compile_node(ast)?;
    compiler.matchers[START].next = fragment.first;
    for idx in fragment.last {
        compiler.matchers[idx].flags |= MatcherFlags::ACCEPT;
    }
    for matcher in &mut compiler.matchers {
        matcher.next.sort_unstable();
        matcher.next.dedup();
    }

    let jumps = JumpMotions {
        full_hop: compiler.resolve_canonical(FULL_HOP_MOTIONS),
        short_hop: compiler.resolve_canonical(SHORT_HOP_MOTIONS),
        double_jump: compiler.resolve_canonical(DOUBLE_JUMP_MOTIONS),
    };

    Ok(CompiledQuery {
        fighter,
        matchers: compiler.matchers,
        merge_motions: compiler.merge_motions,
        jumps,
    })
}

enum Resolved {
    Motions(Vec<Motion>),
    Status(Status),
}

#[derive(Debug, Clone, Default)]
struct Fragment {
    first: Vec<usize>,
    last: Vec<usize>,
    nullable: bool,
}

impl Fragment {
    /// Matches nothing; the identity for `concat`
    fn empty() -> Self {
        Self {
            nullable: true,
            ..Self::default()
        }
    }

    fn optional(mut self) -> Self {
        self.nullable = true;
        self
    }
}

struct Compiler<'a> {
    dict: &'a LabelDictionary,
    fighter: FighterId,
    matchers: Vec<Matcher>,
    merge_motions: Vec<Vec<Motion>>,
}

impl Compiler<'_> {
    fn push(&mut self, predicate: Predicate) -> Result<usize, CompileError> {
        if self.matchers.len() >= MAX_MATCHERS {
            return Err(CompileError::TooManyMatchers(self.matchers.len() + 1));
        }
        self.matchers.push(Matcher::new(predicate));
        self.merge_motions.push(Vec::new());
        Ok(self.matchers.len() - 1)
    }

    fn resolve_canonical(&self, names: &[&str]) -> Vec<Motion> {
        names
            .iter()
            .filter_map(|name| self.dict.resolve_canonical_label(name))
            .collect()
    }

    /// User alias, canonical motion name, hex hash, then status name
    fn resolve(&self, label: &str) -> Result<Resolved, CompileError> {
        let motions = self.dict.resolve_user_label(self.fighter, label);
        if !motions.is_empty() {
            return Ok(Resolved::Motions(motions));
        }
        if let Some(motion) = self.dict.resolve_canonical_label(label) {
            return Ok(Resolved::Motions(vec![motion]));
        }
        if let Some(motion) = Motion::parse_hex(label) {
            return Ok(Resolved::Motions(vec![motion]));
        }
        if let Some(status) = self.dict.resolve_status(self.fighter, label) {
            return Ok(Resolved::Status(status));
        }
        Err(CompileError::UnknownLabel(label.to_string()))
    }

    fn link(&mut self, from: &[usize], to: &[usize]) {
        for &idx in from {
            self.matchers[idx].next.extend_from_slice(to);
        }
    }

    fn concat(&mut self, left: Fragment, right: Fragment) -> Fragment {
        self.link(&left.last, &right.first);

        let mut first = left.first;
        if left.nullable {
            first.extend_from_slice(&right.first);
        }
        let mut last = right.last;
        if right.nullable {
            last.extend_from_slice(&left.last);
        }
        Fragment {
            first,
            last,
            nullable: left.nullable && right.nullable,
        }
    }

    fn compile_node(&mut self, ast: &Ast) -> Result<Fragment, CompileError> {
        match ast {
            Ast::Label(text) => self.compile_label(text),
            Ast::Wildcard(count) => {
                let mut fragment = Fragment::empty();
                for _ in 0..*count {
                    let idx = self.push(Predicate::Any)?;
                    let single = Fragment {
                        first: vec![idx],
                        last: vec![idx],
                        nullable: false,
                    };
                    fragment = self.concat(fragment, single);
                }
                Ok(fragment)
            }
            Ast::Sequence(items) => {
                let mut fragment = Fragment::empty();
                for item in items {
                    let next = self.compile_node(item)?;
                    fragment = self.concat(fragment, next);
                }
                Ok(fragment)
            }
            Ast::Union(items) => self.compile_union(items),
            Ast::Repetition { body, min, max } => self.compile_repetition(body, *min, *max),
            Ast::Inversion(body) => {
                let predicate = self.inverted_predicate(body)?;
                let idx = self.push(Predicate::Not(Box::new(predicate)))?;
                Ok(Fragment {
                    first: vec![idx],
                    last: vec![idx],
                    nullable: false,
                })
            }
            Ast::Qualifier { body, qualifiers } => {
                let begin = self.matchers.len();
                let fragment = self.compile_node(body)?;
                for matcher in &mut self.matchers[begin..] {
                    matcher.qualifiers |= *qualifiers;
                }
                Ok(fragment)
            }
        }
    }

    fn compile_label(&mut self, text: &str) -> Result<Fragment, CompileError> {
        let mut created = Vec::new();
        match self.resolve(text)? {
            Resolved::Motions(motions) => {
                for &motion in &motions {
                    created.push(self.push(Predicate::Motion(motion))?);
                }
                if motions.len() > 1 {
                    for &idx in &created {
                        self.merge_motions[idx] = motions.clone();
                    }
                }
            }
            Resolved::Status(status) => created.push(self.push(Predicate::Status(status))?),
        }
        Ok(Fragment {
            first: created.clone(),
            last: created,
            nullable: false,
        })
    }

    fn compile_union(&mut self, items: &[Ast]) -> Result<Fragment, CompileError> {
        let begin = self.matchers.len();
        let mut fragment = Fragment::default();
        for item in items {
            let alt = self.compile_node(item)?;
            fragment.first.extend(alt.first);
            fragment.last.extend(alt.last);
            fragment.nullable |= alt.nullable;
        }

        // A union of plain labels reports as one logical step
        if items.iter().all(|item| matches!(item, Ast::Label(_))) {
            let mut group: Vec<Motion> = Vec::new();
            for matcher in &self.matchers[begin..] {
                if let Predicate::Motion(motion) = matcher.predicate
                    && !group.contains(&motion)
                {
                    group.push(motion);
                }
            }
            if group.len() > 1 {
                for idx in begin..self.matchers.len() {
                    self.merge_motions[idx] = group.clone();
                }
            }
        }
        Ok(fragment)
    }

    fn compile_repetition(
        &mut self,
        body: &Ast,
        min: u32,
        max: Option<u32>,
    ) -> Result<Fragment, CompileError> {
        let mut fragment = Fragment::empty();
        match max {
            Some(max) => {
                for _ in 0..min {
                    let copy = self.compile_node(body)?;
                    fragment = self.concat(fragment, copy);
                }
                for _ in min..max {
                    let copy = self.compile_node(body)?.optional();
                    fragment = self.concat(fragment, copy);
                }
            }
            None => {
                for _ in 1..min.max(1) {
                    let copy = self.compile_node(body)?;
                    fragment = self.concat(fragment, copy);
                }
                // The last copy loops back onto itself
                let mut copy = self.compile_node(body)?;
                self.link(&copy.last, &copy.first);
                if min == 0 {
                    copy = copy.optional();
                }
                fragment = self.concat(fragment, copy);
            }
        }
        Ok(fragment)
    }

    fn inverted_predicate(&self, ast: &Ast) -> Result<Predicate, CompileError> {
        match ast {
            Ast::Label(text) => Ok(match self.resolve(text)? {
                Resolved::Motions(motions) if motions.len() == 1 => Predicate::Motion(motions[0]),
                Resolved::Motions(motions) => {
                    Predicate::AnyOf(motions.into_iter().map(Predicate::Motion).collect())
                }
                Resolved::Status(status) => Predicate::Status(status),
            }),
            Ast::Union(items) => Ok(Predicate::AnyOf(
                items
                    .iter()
                    .map(|item| self.inverted_predicate(item))
                    .collect::<Result<_, _>>()?,
            )),
            Ast::Inversion(body) => Ok(Predicate::Not(Box::new(self.inverted_predicate(body)?))),
            Ast::Wildcard(_) => Err(CompileError::InvertedWildcard),
            Ast::Qualifier { .. } => Err(CompileError::InvertedQualifier),
            Ast::Sequence(_) | Ast::Repetition { .. } => Err(CompileError::InvertedSequence),
        }
    }
}

/// Qualifier bits that need jump motions to ever match
pub fn needs_jump_motions(qualifiers: Qualifiers) -> bool {
    qualifiers.intersects(
        Qualifiers::FULL_HOP
            | Qualifiers::SHORT_HOP
            | Qualifiers::DOUBLE_JUMP
            | Qualifiers::IMMEDIATE_DOUBLE_JUMP,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::parse;

    const FIGHTER: FighterId = 8;

    fn dictionary() -> LabelDictionary {
        let mut dict = LabelDictionary::new();
        dict.add_fighter(FIGHTER, "pikachu");
        for (name, hash) in [
            ("attack_air_n", 0x10),
            ("attack_hi3", 0x20),
            ("catch", 0x30),
            ("attack_11", 0x41),
            ("attack_12", 0x42),
            ("jump_f", 0x50),
            ("jump_f_mini", 0x51),
            ("jump_aerial_f", 0x52),
        ] {
            dict.add_canonical(name, Motion::new(hash));
        }
        dict.add_user_label(FIGHTER, Motion::new(0x10), "nair", "user");
        dict.add_user_label(FIGHTER, Motion::new(0x20), "utilt", "user");
        dict.add_user_label(FIGHTER, Motion::new(0x30), "grab", "user");
        dict.add_user_label(FIGHTER, Motion::new(0x41), "jab", "user");
        dict.add_user_label(FIGHTER, Motion::new(0x42), "jab", "user");
        dict.add_status("guard", 0x1b);
        dict
    }

    fn compile_str(query: &str) -> Result<CompiledQuery, CompileError> {
        compile(&parse(query).unwrap(), &dictionary(), FIGHTER)
    }

    fn predicate(query: &CompiledQuery, idx: usize) -> &Predicate {
        &query.matchers()[idx].predicate
    }

    #[test]
    fn test_compile_sequence_chain() {
        let q = compile_str("nair -> utilt").unwrap();
        assert_eq!(q.matchers().len(), 3);
        assert_eq!(q.start().next, vec![1]);
        assert_eq!(q.matchers()[1].next, vec![2]);
        assert!(q.matchers()[2].next.is_empty());
        assert!(q.matchers()[2].is_accept());
        assert!(!q.matchers()[1].is_accept());
        assert_eq!(predicate(&q, 1), &Predicate::Motion(Motion::new(0x10)));
    }

    #[test]
    fn test_label_resolution_order() {
        // user label, canonical name, raw hash, status name
        let q = compile_str("nair -> attack_hi3 -> 0x77 -> guard").unwrap();
        assert_eq!(predicate(&q, 1), &Predicate::Motion(Motion::new(0x10)));
        assert_eq!(predicate(&q, 2), &Predicate::Motion(Motion::new(0x20)));
        assert_eq!(predicate(&q, 3), &Predicate::Motion(Motion::new(0x77)));
        assert_eq!(predicate(&q, 4), &Predicate::Status(0x1b));
    }

    #[test]
    fn test_unknown_label_is_named() {
        let err = compile_str("nair -> totally_bogus_move").unwrap_err();
        assert_eq!(err, CompileError::UnknownLabel("totally_bogus_move".to_string()));
    }

    #[test]
    fn test_multi_motion_label_becomes_merge_group() {
        let q = compile_str("jab -> grab").unwrap();
        // start, jab (2 motions), grab
        assert_eq!(q.matchers().len(), 4);
        assert_eq!(q.start().next, vec![1, 2]);
        assert_eq!(q.matchers()[1].next, vec![3]);
        assert_eq!(q.matchers()[2].next, vec![3]);
        let group = vec![Motion::new(0x41), Motion::new(0x42)];
        assert_eq!(q.merge_motions(1), group.as_slice());
        assert_eq!(q.merge_motions(2), group.as_slice());
        assert!(q.merge_motions(3).is_empty());
    }

    #[test]
    fn test_union_shares_successors_and_records_group() {
        let q = compile_str("(nair | utilt) -> grab").unwrap();
        assert_eq!(q.start().next, vec![1, 2]);
        assert_eq!(q.matchers()[1].next, vec![3]);
        assert_eq!(q.matchers()[2].next, vec![3]);
        assert!(q.are_equivalent(Motion::new(0x10), Motion::new(0x20)));
    }

    #[test]
    fn test_union_of_sequences_has_no_merge_group() {
        let q = compile_str("(nair -> utilt) | grab").unwrap();
        assert!(q.merge_motions.iter().all(Vec::is_empty));
        assert!(q.matchers()[2].is_accept());
        assert!(q.matchers()[3].is_accept());
        assert!(!q.matchers()[1].is_accept());
    }

    #[test]
    fn test_bounded_repetition_unrolls() {
        // nair{1,3} -> grab: nair1 required, nair2 and nair3 optional
        let q = compile_str("nair{1,3} -> grab").unwrap();
        assert_eq!(q.matchers().len(), 5);
        assert_eq!(q.start().next, vec![1]);
        assert_eq!(q.matchers()[1].next, vec![2, 3, 4]);
        assert_eq!(q.matchers()[2].next, vec![3, 4]);
        assert_eq!(q.matchers()[3].next, vec![4]);
        assert!(q.matchers()[4].is_accept());
    }

    #[test]
    fn test_optional_at_end_makes_previous_accepting() {
        let q = compile_str("nair -> utilt?").unwrap();
        assert!(q.matchers()[1].is_accept());
        assert!(q.matchers()[2].is_accept());
        assert_eq!(q.matchers()[1].next, vec![2]);
    }

    #[test]
    fn test_unbounded_repetition_loops() {
        let q = compile_str("jab+ -> grab").unwrap();
        // both jab matchers loop to themselves and each other, then grab
        assert_eq!(q.matchers()[1].next, vec![1, 2, 3]);
        assert_eq!(q.matchers()[2].next, vec![1, 2, 3]);

        let q = compile_str("nair{2,} -> grab").unwrap();
        assert_eq!(q.matchers()[1].next, vec![2]);
        assert_eq!(q.matchers()[2].next, vec![2, 3]);
    }

    #[test]
    fn test_wildcard_count() {
        let q = compile_str("nair -> .3 -> grab").unwrap();
        assert_eq!(q.matchers().len(), 6);
        for idx in 2..5 {
            assert_eq!(predicate(&q, idx), &Predicate::Any);
        }
    }

    #[test]
    fn test_qualifiers_apply_to_whole_subexpression() {
        let q = compile_str("nair -> (utilt -> grab):hit").unwrap();
        assert!(q.matchers()[1].qualifiers.is_empty());
        assert_eq!(q.matchers()[2].qualifiers, Qualifiers::HIT);
        assert_eq!(q.matchers()[3].qualifiers, Qualifiers::HIT);
    }

    #[test]
    fn test_inversion() {
        let q = compile_str("!(nair | jab)").unwrap();
        assert_eq!(q.matchers().len(), 2);
        assert_eq!(
            predicate(&q, 1),
            &Predicate::Not(Box::new(Predicate::AnyOf(vec![
                Predicate::Motion(Motion::new(0x10)),
                Predicate::AnyOf(vec![
                    Predicate::Motion(Motion::new(0x41)),
                    Predicate::Motion(Motion::new(0x42)),
                ]),
            ])))
        );
    }

    #[test]
    fn test_invalid_inversions() {
        assert_eq!(compile_str("!(nair -> grab)"), Err(CompileError::InvertedSequence));
        assert_eq!(compile_str("!(nair+)"), Err(CompileError::InvertedSequence));
        assert_eq!(compile_str("!."), Err(CompileError::InvertedWildcard));
        assert_eq!(compile_str("!(nair:hit)"), Err(CompileError::InvertedQualifier));
    }

    #[test]
    fn test_matcher_limit() {
        let err = compile_str("(nair{64}){64}{2}").unwrap_err();
        assert!(matches!(err, CompileError::TooManyMatchers(_)));
    }

    #[test]
    fn test_jump_motions_resolved() {
        let q = compile_str("nair:fh").unwrap();
        assert_eq!(q.jumps().full_hop, vec![Motion::new(0x50)]);
        assert_eq!(q.jumps().short_hop, vec![Motion::new(0x51)]);
        assert_eq!(q.jumps().double_jump, vec![Motion::new(0x52)]);
        assert!(needs_jump_motions(q.matchers()[1].qualifiers));
    }

    #[test]
    fn test_compile_is_per_fighter() {
        let ast = parse("nair").unwrap();
        let err = compile(&ast, &dictionary(), 99).unwrap_err();
        assert_eq!(err, CompileError::UnknownLabel("nair".to_string()));
    }
}
