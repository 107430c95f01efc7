//! Row-displacement compression of the transition matrix.
//!
//! Each state's row is expressed as a delta against a *default* row, either
//! an earlier state's row or the implicit all-failed row, and only the
//! differing cells are stored in a shared `next`/`check` arena at offset
//! `base[state]`. The runtime lookup is:
//!
//! ```text
//! loop {
//!     if check[base[state] + meta] == state { take next[base[state] + meta] }
//!     else { state = def[state] }            // -1 terminates: no transition
//! }
//! ```
//!
//! Default selection is greedy: the candidate minimizing
//! `COUNT_WEIGHT * |diffs| + SEG_SIZE_WEIGHT * span(diffs)` wins, earliest
//! candidate on ties. Bases are packed first-fit from `first_free`, sliding
//! the delta segment over the arena holes.

use super::{Dfa, COUNT_WEIGHT, NO_TRANSITION, SEG_SIZE_WEIGHT};

/// The four-array compressed form of the transition matrix.
#[derive(Debug, Clone)]
pub struct CompressedTables {
    /// Default state per state; -1 is the implicit all-failed row.
    pub def: Vec<i32>,
    /// Offset of each state's row in the arena.
    pub base: Vec<i32>,
    /// Transition targets.
    pub next: Vec<i32>,
    /// Owning state per arena cell.
    pub check: Vec<i32>,
}

impl CompressedTables {
    /// Walk the default chain exactly like the emitted driver does.
    /// Returns the transition target or `NO_TRANSITION`.
    pub fn lookup(&self, state: i32, meta: u8) -> i32 {
        let mut state = state;
        while state >= 0 {
            let l = (self.base[state as usize] + meta as i32) as usize;
            if self.check[l] == state {
                return self.next[l];
            }
            state = self.def[state as usize];
        }
        NO_TRANSITION
    }
}

/// Compress the (meta-reduced) transition matrix.
pub fn compress(dfa: &Dfa) -> CompressedTables {
    let state_count = dfa.state_count();
    let width = dfa.meta_count as usize;

    let mut def = vec![NO_TRANSITION; state_count];
    let mut base = vec![0i32; state_count];
    let mut next: Vec<i32> = Vec::new();
    let mut check: Vec<i32> = Vec::new();

    let mut difs: Vec<usize> = Vec::with_capacity(width);
    let mut first_free = 0usize;

    for state in 0..state_count {
        let row = &dfa.dtran[state];

        // Baseline: delta against the all-failed row.
        difs.clear();
        difs.extend((0..width).filter(|&m| row[m] != NO_TRANSITION));
        let mut sim_state = NO_TRANSITION;
        let mut best_weight = delta_weight(&difs);

        if !difs.is_empty() {
            for state2 in 0..state {
                let other = &dfa.dtran[state2];
                let mut count = 0u32;
                let mut first_dif = 0usize;
                let mut seg_size = 0u32;
                for m in 0..width {
                    if row[m] != other[m] {
                        if count == 0 {
                            first_dif = m;
                        }
                        seg_size = (m - first_dif + 1) as u32;
                        count += 1;
                    }
                }
                let weight = COUNT_WEIGHT * count + SEG_SIZE_WEIGHT * seg_size;
                if weight < best_weight {
                    best_weight = weight;
                    sim_state = state2 as i32;
                }
            }
        }

        if sim_state != NO_TRANSITION {
            let other = &dfa.dtran[sim_state as usize];
            difs.clear();
            difs.extend((0..width).filter(|&m| row[m] != other[m]));
        }
        def[state] = sim_state;

        // First-fit base: the delta segment slides right from
        // max(0, first_free - difs[0]) until every cell it needs is free.
        // Cells beyond the current arena length count as free.
        let mut b = first_free;
        if let Some(&d0) = difs.first() {
            b = first_free.saturating_sub(d0);
            while !difs.iter().all(|&m| {
                let l = b + m;
                l >= check.len() || check[l] == NO_TRANSITION
            }) {
                b += 1;
            }
        }
        base[state] = b as i32;

        // Grow the arena so the whole logical row fits; the final fill
        // below relies on every (state, meta) slot existing.
        let upper = b + width;
        if upper > next.len() {
            next.resize(upper, 0);
            check.resize(upper, NO_TRANSITION);
        }
        for &m in &difs {
            next[b + m] = row[m];
            check[b + m] = state as i32;
        }
        while first_free < check.len() && check[first_free] != NO_TRANSITION {
            first_free += 1;
        }
    }

    // Final fill: claim every still-unowned cell of each state's window so
    // queried cells never hold the -1 sentinel.
    for state in 0..state_count {
        for m in 0..width {
            let l = base[state] as usize + m;
            if check[l] == NO_TRANSITION {
                next[l] = dfa.dtran[state][m];
                check[l] = state as i32;
            }
        }
    }

    CompressedTables { def, base, next, check }
}

/// Weight of a delta vector: cell count plus covered segment size.
fn delta_weight(difs: &[usize]) -> u32 {
    match (difs.first(), difs.last()) {
        (Some(&first), Some(&last)) => {
            COUNT_WEIGHT * difs.len() as u32 + SEG_SIZE_WEIGHT * (last - first + 1) as u32
        },
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Node;
    use crate::automata::builder::DfaBuilder;
    use crate::automata::meta::reduce;
    use crate::automata::optimize::optimize;
    use crate::valset::ValueSet;

    fn all_sc() -> ValueSet {
        let mut sc = ValueSet::new();
        sc.add(0);
        sc
    }

    fn literal(text: &[u8]) -> Node {
        let mut iter = text.iter();
        let mut node = Node::symb(*iter.next().expect("non-empty literal"));
        for &b in iter {
            node = Node::cat(node, Node::symb(b));
        }
        node
    }

    fn pipeline(patterns: Vec<Node>) -> Dfa {
        let mut builder = DfaBuilder::new();
        for tree in patterns {
            builder.add_pattern(tree, all_sc()).unwrap();
        }
        let mut dfa = builder.build(1, false).unwrap();
        optimize(&mut dfa);
        reduce(&mut dfa);
        dfa
    }

    /// Exhaustive check of the lookup contract against the flat matrix.
    fn assert_lookup_matches(dfa: &Dfa, tables: &CompressedTables) {
        for state in 0..dfa.state_count() {
            for meta in 0..dfa.meta_count {
                assert_eq!(
                    tables.lookup(state as i32, meta as u8),
                    dfa.dtran[state][meta as usize],
                    "state {} meta {} must compress losslessly",
                    state,
                    meta
                );
            }
        }
    }

    #[test]
    fn test_single_literal_compresses() {
        let dfa = pipeline(vec![literal(b"a")]);
        let tables = compress(&dfa);
        assert!(!tables.next.is_empty());
        assert_eq!(tables.def.len(), dfa.state_count());
        assert_eq!(tables.base.len(), dfa.state_count());
        assert_lookup_matches(&dfa, &tables);
    }

    #[test]
    fn test_lookup_matches_matrix() {
        let dfa = pipeline(vec![
            literal(b"if"),
            literal(b"else"),
            literal(b"while"),
            Node::plus(Node::symb_set(ValueSet::from_range(b'a' as u32, b'z' as u32))),
            Node::plus(Node::symb_set(ValueSet::from_range(b'0' as u32, b'9' as u32))),
        ]);
        let tables = compress(&dfa);
        assert_lookup_matches(&dfa, &tables);
    }

    #[test]
    fn test_similar_rows_share_a_default() {
        // Keyword chains produce near-identical rows (identifier
        // continuation), so at least one state should delta off another.
        let dfa = pipeline(vec![
            literal(b"for"),
            literal(b"fog"),
            Node::plus(Node::symb_set(ValueSet::from_range(b'a' as u32, b'z' as u32))),
        ]);
        let tables = compress(&dfa);
        assert!(
            tables.def.iter().any(|&d| d != NO_TRANSITION),
            "expected at least one state to use another's row as default"
        );
        assert_lookup_matches(&dfa, &tables);
    }

    #[test]
    fn test_queried_cells_are_claimed() {
        let dfa = pipeline(vec![literal(b"ab"), literal(b"cd")]);
        let tables = compress(&dfa);
        for state in 0..dfa.state_count() {
            for meta in 0..dfa.meta_count as usize {
                let l = tables.base[state] as usize + meta;
                assert_ne!(tables.check[l], NO_TRANSITION);
            }
        }
    }

    #[test]
    fn test_deterministic() {
        let build = || {
            let dfa = pipeline(vec![literal(b"ab"), Node::star(Node::symb(b'x'))]);
            compress(&dfa)
        };
        let a = build();
        let b = build();
        assert_eq!(a.def, b.def);
        assert_eq!(a.base, b.base);
        assert_eq!(a.next, b.next);
        assert_eq!(a.check, b.check);
    }
}
