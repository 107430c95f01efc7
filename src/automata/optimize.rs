//! DFA state minimization: partition refinement plus dead-state pruning.
//!
//! The initial partition separates what must never be merged:
//!
//! 1. every start state is a singleton group (start-state identity survives),
//! 2. every state with a non-empty `lls` set is a singleton group, unless no
//!    accepting state is reachable from it (then it folds into group 0),
//! 3. remaining accepting states are grouped by accepted pattern number,
//! 4. everything else starts in group 0.
//!
//! Refinement then splits groups until, for every symbol column, all states
//! of a group transition into the same group. Groups from which no accepting
//! group is reachable are dropped (start groups excepted), their `lls` sets
//! merged into the group representative, and the surviving representatives
//! are compacted to dense indices in place.
//!
//! Works on byte columns when run before meta reduction and on meta columns
//! after it; only `Dfa::meta_count` decides the width.

use std::collections::BTreeMap;

use super::{Dfa, NO_TRANSITION};

/// Minimize the DFA in place. Never fails; a degenerate input is a no-op.
pub fn optimize(dfa: &mut Dfa) {
    let state_count = dfa.state_count();
    if state_count == 0 {
        return;
    }
    let width = dfa.meta_count as usize;
    let start_count = dfa.start_state_count as usize;

    let mut group_count = start_count + dfa.pattern_count as usize;
    let mut state_group: Vec<i32> = vec![0; state_count];
    let mut state_used: Vec<bool> = vec![false; state_count];
    let mut group_main_state: Vec<i32> = vec![-1; group_count];

    // Initial classification.
    for state in 0..state_count {
        let mut group_no = 0usize;
        if !dfa.lls[state].is_empty() {
            if can_reach_accepting(dfa, state, width) {
                group_no = group_count;
                group_main_state.push(-1);
                group_count += 1;
            } else if state < start_count {
                group_no = state;
            }
        } else if state < start_count {
            group_no = state;
        } else if dfa.accept[state] > 0 {
            group_no = start_count + dfa.accept[state] as usize - 1;
        }
        if group_main_state[group_no] == -1 {
            group_main_state[group_no] = state as i32;
            state_used[state] = true;
        }
        state_group[state] = group_no as i32;
    }

    // Refinement: split until stable. Each column pass reads a snapshot of
    // the assignment so splits within the pass are order-independent; the
    // per-group target maps are BTreeMaps so new group numbering is
    // deterministic.
    loop {
        let mut change = false;
        for symb in 0..width {
            let old_state_group = state_group.clone();
            let mut group_trans: Vec<BTreeMap<i32, i32>> = vec![BTreeMap::new(); group_count];
            for state in 0..state_count {
                let group = old_state_group[state];
                let target = dfa.dtran[state][symb];
                let new_group = if target != NO_TRANSITION {
                    old_state_group[target as usize]
                } else {
                    -1
                };
                let map = &mut group_trans[group as usize];
                let first_in_group = map.is_empty();
                if let Some(&assigned) = map.get(&new_group) {
                    state_group[state] = assigned;
                } else if first_in_group {
                    // First state seen in this source group keeps the index.
                    map.insert(new_group, group);
                } else {
                    // A new distinct target: split off a fresh group.
                    let fresh = group_count as i32;
                    map.insert(new_group, fresh);
                    state_group[state] = fresh;
                    group_count += 1;
                    group_main_state.push(state as i32);
                    state_used[state] = true;
                    change = true;
                }
            }
        }
        if !change {
            break;
        }
    }

    // Dead-group pruning: a group is dead when no reachable group (itself
    // included) contains an accepting state. Start groups are never dropped.
    let mut group_live = vec![false; group_count];
    for state in 0..state_count {
        if dfa.accept[state] > 0 {
            group_live[state_group[state] as usize] = true;
        }
    }
    let mut is_start_group = vec![false; group_count];
    for state in 0..start_count {
        is_start_group[state_group[state] as usize] = true;
    }
    loop {
        let mut change = false;
        for group in 0..group_count {
            if group_live[group] || group_main_state[group] == -1 {
                continue;
            }
            let main = group_main_state[group] as usize;
            for symb in 0..width {
                let target = dfa.dtran[main][symb];
                if target != NO_TRANSITION && group_live[state_group[target as usize] as usize] {
                    group_live[group] = true;
                    change = true;
                    break;
                }
            }
        }
        if !change {
            break;
        }
    }
    for state in 0..state_count {
        let group = state_group[state] as usize;
        if state_used[state] && !is_start_group[group] && !group_live[group] {
            state_used[state] = false;
        }
    }

    // Compaction: assign dense indices to surviving representatives and
    // rewrite the tables in place. A representative never has a larger index
    // than any state it absorbs, so rows and attribute slots can be reused
    // without clobbering unread data.
    let mut new_state_count = 0usize;
    let mut new_indices: Vec<i32> = vec![-1; state_count];
    for (state, slot) in new_indices.iter_mut().enumerate() {
        if state_used[state] {
            *slot = new_state_count as i32;
            new_state_count += 1;
        }
    }
    for state in 0..state_count {
        let new_idx = new_indices[state];
        if new_idx != -1 {
            for symb in 0..width {
                let mut tran = dfa.dtran[state][symb];
                if tran != NO_TRANSITION {
                    let main = group_main_state[state_group[tran as usize] as usize];
                    tran = new_indices[main as usize];
                }
                dfa.dtran[new_idx as usize][symb] = tran;
            }
            dfa.accept[new_idx as usize] = dfa.accept[state];
            let lls = dfa.lls[state].clone();
            dfa.lls[new_idx as usize] = lls;
        } else {
            // Deleted state: its lls folds into the group representative.
            let main = group_main_state[state_group[state] as usize];
            let main_new = new_indices[main as usize];
            if main_new != -1 {
                let lls = dfa.lls[state].clone();
                dfa.lls[main_new as usize] |= &lls;
            }
        }
    }
    dfa.dtran.truncate(new_state_count);
    dfa.accept.truncate(new_state_count);
    dfa.lls.truncate(new_state_count);
}

/// Depth-first search for an accepting state reachable from `state` through
/// at least one transition.
fn can_reach_accepting(dfa: &Dfa, state: usize, width: usize) -> bool {
    let state_count = dfa.state_count();
    let mut marked = vec![false; state_count];
    let mut stack = vec![state];
    while let Some(current) = stack.pop() {
        marked[current] = true;
        for symb in 0..width {
            let target = dfa.dtran[current][symb];
            if target != NO_TRANSITION {
                if dfa.accept[target as usize] > 0 {
                    return true;
                }
                if !marked[target as usize] {
                    stack.push(target as usize);
                }
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Node;
    use crate::automata::builder::DfaBuilder;
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

    fn walk(dfa: &Dfa, input: &[u8], start: i32) -> i32 {
        let mut state = start;
        for &b in input {
            state = dfa.dtran[state as usize][b as usize];
            if state == NO_TRANSITION {
                break;
            }
        }
        state
    }

    fn accept_of(dfa: &Dfa, input: &[u8]) -> i32 {
        let state = walk(dfa, input, 0);
        if state == NO_TRANSITION {
            -1
        } else {
            dfa.accept[state as usize]
        }
    }

    #[test]
    fn test_merges_equivalent_states() {
        // ab|cb: the states after 'a' and after 'c' behave identically and
        // must collapse into one.
        let mut builder = DfaBuilder::new();
        builder
            .add_pattern(Node::or(literal(b"ab"), literal(b"cb")), all_sc())
            .unwrap();
        let dfa = builder.build(1, false).unwrap();
        let before = dfa.state_count();

        let mut dfa = dfa;
        optimize(&mut dfa);

        assert!(dfa.state_count() < before);
        assert_eq!(accept_of(&dfa, b"ab"), 1);
        assert_eq!(accept_of(&dfa, b"cb"), 1);
        assert_eq!(accept_of(&dfa, b"a"), 0);
        assert_eq!(accept_of(&dfa, b"x"), -1);
    }

    #[test]
    fn test_keeps_distinct_accept_values_apart() {
        let mut builder = DfaBuilder::new();
        builder.add_pattern(literal(b"ab"), all_sc()).unwrap();
        builder.add_pattern(literal(b"cb"), all_sc()).unwrap();
        let mut dfa = builder.build(1, false).unwrap();
        optimize(&mut dfa);

        assert_eq!(accept_of(&dfa, b"ab"), 1);
        assert_eq!(accept_of(&dfa, b"cb"), 2);
    }

    #[test]
    fn test_start_state_identity_survives() {
        let mut sc_a = ValueSet::new();
        sc_a.add(0);
        let mut sc_b = ValueSet::new();
        sc_b.add(1);

        let mut builder = DfaBuilder::new();
        builder.add_pattern(literal(b"foo"), sc_a).unwrap();
        builder.add_pattern(literal(b"foo"), sc_b).unwrap();
        let mut dfa = builder.build(2, false).unwrap();
        optimize(&mut dfa);

        // Start states must remain at indices 0 and 1 even though both
        // recognize the same text.
        let from_a = walk(&dfa, b"foo", 0);
        let from_b = walk(&dfa, b"foo", 1);
        assert_eq!(dfa.accept[from_a as usize], 1);
        assert_eq!(dfa.accept[from_b as usize], 2);
    }

    #[test]
    fn test_prunes_unreachable_accept_state() {
        // Hand-craft a DFA with a state from which no accepting state is
        // reachable: 0 -a-> 1(accept), 0 -b-> 2, 2 -b-> 2 (dead loop).
        let mut builder = DfaBuilder::new();
        builder.add_pattern(literal(b"a"), all_sc()).unwrap();
        let mut dfa = builder.build(1, false).unwrap();

        let mut dead_row = [NO_TRANSITION; crate::automata::SYMB_COUNT];
        dead_row[b'b' as usize] = 2;
        dfa.dtran.push(dead_row);
        dfa.dtran[0][b'b' as usize] = 2;
        dfa.accept.push(0);
        dfa.lls.push(ValueSet::new());

        let before = dfa.state_count();
        optimize(&mut dfa);
        assert!(dfa.state_count() < before);
        assert_eq!(dfa.dtran[0][b'b' as usize], NO_TRANSITION);
        assert_eq!(accept_of(&dfa, b"a"), 1);
    }

    #[test]
    fn test_trailing_context_state_survives() {
        // The boundary state of a/b carries a non-empty lls set and must
        // keep its own identity through minimization.
        let mut builder = DfaBuilder::new();
        builder
            .add_pattern(Node::trail_cont(Node::symb(b'a'), Node::symb(b'b')), all_sc())
            .unwrap();
        let mut dfa = builder.build(1, false).unwrap();
        optimize(&mut dfa);

        let after_a = walk(&dfa, b"a", 0);
        assert_ne!(after_a, NO_TRANSITION);
        assert!(dfa.lls[after_a as usize].contains(1));
        assert_eq!(accept_of(&dfa, b"ab"), 1);
    }

    #[test]
    fn test_idempotent() {
        let mut builder = DfaBuilder::new();
        builder
            .add_pattern(Node::or(literal(b"ab"), literal(b"cb")), all_sc())
            .unwrap();
        builder.add_pattern(Node::plus(Node::symb(b'x')), all_sc()).unwrap();
        let mut dfa = builder.build(1, false).unwrap();

        optimize(&mut dfa);
        let after_first = dfa.state_count();
        optimize(&mut dfa);
        assert_eq!(dfa.state_count(), after_first);
    }
}
