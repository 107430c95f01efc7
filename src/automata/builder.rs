//! Subset construction: pattern trees → raw DFA tables.
//!
//! No intermediate NFA is built. DFA states are sets of *positions*
//! (McNaughton-Yamada style): the start state of a start condition is the
//! ε-closure of the union of its patterns' `firstpos`, and the successor of
//! state `T` on byte `c` is the ε-closure of the union of `followpos(p)`
//! over the positions `p ∈ T` whose node matches `c`.
//!
//! ε-closure here means: add `followpos(q)` for every trailing-context
//! boundary position `q` in the set. Every state stored in the registry is
//! already closed, so structural `ValueSet` equality identifies states.

use std::collections::HashMap;

use crate::ast::{calc_attrs, Node, PatternNo, PosKind, Position};
use crate::valset::{ValueSet, MAX_VALUE};

use super::{BuildError, Dfa, NO_TRANSITION, SYMB_COUNT};

/// A pattern admitted to the builder: its start-condition set and its
/// augmented tree `Cat(body, Term(n))`.
struct Pattern {
    sc: ValueSet,
    tree: Node,
}

/// Accumulates patterns, then runs subset construction.
#[derive(Default)]
pub struct DfaBuilder {
    patterns: Vec<Pattern>,
}

impl DfaBuilder {
    pub fn new() -> Self {
        DfaBuilder { patterns: Vec::new() }
    }

    /// Number of patterns admitted so far.
    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }

    /// Admit a pattern. Pattern numbers are assigned in admission order,
    /// starting at 1; the tree is augmented with a terminator node.
    pub fn add_pattern(&mut self, tree: Node, sc: ValueSet) -> Result<PatternNo, BuildError> {
        let n_pat = self.patterns.len() as u32 + 1;
        if n_pat > MAX_VALUE {
            return Err(BuildError::TooManyPatterns);
        }
        let tree = Node::cat(tree, Node::term(n_pat));
        self.patterns.push(Pattern { sc, tree });
        Ok(n_pat)
    }

    /// Run subset construction over all admitted patterns.
    pub fn build(mut self, sc_count: u32, case_insensitive: bool) -> Result<Dfa, BuildError> {
        if self.patterns.is_empty() {
            return Err(BuildError::EmptySpecification);
        }

        // Scatter positions and compute the tree attributes. The root
        // firstpos of each augmented tree seeds the start states.
        let mut positions: Vec<Position> = Vec::new();
        let mut pat_firstpos: Vec<ValueSet> = Vec::with_capacity(self.patterns.len());
        for pat in &mut self.patterns {
            let attrs = calc_attrs(&mut pat.tree, &mut positions)?;
            pat_firstpos.push(attrs.firstpos);
        }

        let mut trail_cont_patterns = ValueSet::new();
        let mut nl_anchored_patterns = ValueSet::new();
        let mut anchored = vec![false; self.patterns.len()];
        for (i, pat) in self.patterns.iter().enumerate() {
            let n_pat = i as u32 + 1;
            let body = match &pat.tree {
                Node::Cat(body, _) => body.as_ref(),
                _ => unreachable!("patterns are augmented as Cat(body, Term)"),
            };
            let (inner, is_anchored) = body.strip_anchor();
            anchored[i] = is_anchored;
            if is_anchored {
                nl_anchored_patterns.add(n_pat);
            }
            if matches!(inner, Node::TrailCont { .. }) {
                trail_cont_patterns.add(n_pat);
            }
        }

        // With anchored patterns every start condition gets a pair of start
        // states: index 2*sc is the not-at-line-start entry, 2*sc + 1 the
        // at-line-start entry. Without anchoring the index is sc itself.
        let bol_factor: u32 = if nl_anchored_patterns.is_empty() { 1 } else { 2 };
        let start_state_count = sc_count * bol_factor;

        let size_hint = 100 * sc_count as usize;
        let mut states: Vec<ValueSet> = Vec::with_capacity(size_hint);
        let mut dtran: Vec<[i32; SYMB_COUNT]> = Vec::with_capacity(size_hint);
        let mut pending: Vec<usize> = Vec::with_capacity(size_hint);
        let mut registry: HashMap<ValueSet, i32> = HashMap::with_capacity(size_hint);

        fn add_state(
            set: ValueSet,
            states: &mut Vec<ValueSet>,
            dtran: &mut Vec<[i32; SYMB_COUNT]>,
            registry: &mut HashMap<ValueSet, i32>,
        ) -> i32 {
            let idx = states.len() as i32;
            registry.insert(set.clone(), idx);
            states.push(set);
            dtran.push([NO_TRANSITION; SYMB_COUNT]);
            idx
        }

        // Seed the start states.
        for sc in 0..sc_count {
            for bol in 0..bol_factor {
                let mut seed = ValueSet::new();
                for (i, pat) in self.patterns.iter().enumerate() {
                    if pat.sc.contains(sc) && (!anchored[i] || bol == 1) {
                        seed |= &pat_firstpos[i];
                    }
                }
                let closed = eps_closure(&seed, &positions);
                let idx = add_state(closed, &mut states, &mut dtran, &mut registry);
                pending.push(idx as usize);
            }
        }

        // Expand until no unprocessed state remains.
        while let Some(t_idx) = pending.pop() {
            let t = states[t_idx].clone();

            for symb in 0..SYMB_COUNT as u32 {
                let symb = symb as u8;
                if case_insensitive && symb.is_ascii_lowercase() {
                    continue;
                }

                let mut u = ValueSet::new();
                for p in &t {
                    let position = &positions[p as usize];
                    if node_matches(&position.kind, symb, case_insensitive) {
                        u |= &position.followpos;
                    }
                }
                if u.is_empty() {
                    continue;
                }

                let closed = eps_closure(&u, &positions);
                let target = match registry.get(&closed) {
                    Some(&idx) => idx,
                    None => {
                        let idx = add_state(closed, &mut states, &mut dtran, &mut registry);
                        pending.push(idx as usize);
                        idx
                    },
                };
                dtran[t_idx][symb as usize] = target;
            }

            if case_insensitive {
                for symb in b'a'..=b'z' {
                    dtran[t_idx][symb as usize] = dtran[t_idx][symb.to_ascii_uppercase() as usize];
                }
            }
        }

        // Per-state accept and lls attributes. Positions are scanned in
        // ascending index order, so the first terminator found belongs to
        // the lowest-numbered (earliest-declared) pattern.
        let mut accept: Vec<i32> = Vec::with_capacity(states.len());
        let mut lls: Vec<ValueSet> = Vec::with_capacity(states.len());
        for t in &states {
            accept.push(state_accept(t, &positions));
            lls.push(state_lls(t, &positions));
        }

        let mut symb2meta = [0u8; SYMB_COUNT];
        for (symb, meta) in symb2meta.iter_mut().enumerate() {
            *meta = symb as u8;
        }

        Ok(Dfa {
            dtran,
            accept,
            lls,
            sc_count,
            start_state_count,
            pattern_count: self.patterns.len() as u32,
            position_count: positions.len() as u32,
            case_insensitive,
            meta_count: SYMB_COUNT as u32,
            symb2meta,
            trail_cont_patterns,
            nl_anchored_patterns,
        })
    }
}

/// ε-closure of a position set: add `followpos` of every trailing-context
/// boundary position in the set.
fn eps_closure(t: &ValueSet, positions: &[Position]) -> ValueSet {
    let mut closure = t.clone();
    for p in t {
        if matches!(positions[p as usize].kind, PosKind::TrailCont) {
            closure |= &positions[p as usize].followpos;
        }
    }
    closure
}

/// Whether a positional node matches an input byte, with optional case
/// folding. Folding happens here, not in the AST: an uppercase input byte
/// also matches a node written in lowercase.
fn node_matches(kind: &PosKind, symb: u8, case_insensitive: bool) -> bool {
    match kind {
        PosKind::Symb(s) => {
            *s == symb || (case_insensitive && *s == symb.to_ascii_lowercase())
        },
        PosKind::SymbSet(set) => {
            set.contains(symb as u32)
                || (case_insensitive && set.contains(symb.to_ascii_lowercase() as u32))
        },
        PosKind::TrailCont | PosKind::Term(_) => false,
    }
}

/// Accepted pattern number of a state: the first terminator position in
/// ascending order, or 0 for a non-accepting state.
fn state_accept(t: &ValueSet, positions: &[Position]) -> i32 {
    for p in t {
        if let PosKind::Term(n_pat) = positions[p as usize].kind {
            return n_pat as i32;
        }
    }
    0
}

/// Pattern numbers whose trailing-context boundary has been crossed in this
/// state. A boundary position is always immediately followed (in position
/// index order) by its pattern's terminator, which carries the number.
fn state_lls(t: &ValueSet, positions: &[Position]) -> ValueSet {
    let mut patterns = ValueSet::new();
    for p in t {
        if matches!(positions[p as usize].kind, PosKind::TrailCont) {
            if let Some(next) = positions.get(p as usize + 1) {
                if let PosKind::Term(n_pat) = next.kind {
                    patterns.add(n_pat);
                }
            }
        }
    }
    patterns
}
