//! Meta-symbol reduction: collapse byte columns with identical behavior.
//!
//! Scans bytes in ascending order. A byte whose column is `NO_TRANSITION` in
//! every state joins the designated dead class, meta 0. A live byte either
//! aliases an earlier byte with an identical column (in case-insensitive
//! mode a lowercase letter aliases its uppercase twin directly) or founds a
//! fresh class, numbered from 1 in representative-byte order.
//!
//! Afterwards each `dtran` row is compacted in place: column `m` holds the
//! old column of class `m`'s representative byte, column 0 stays dead, and
//! the logical row width drops from 256 to `meta_count`. All downstream
//! code indexes rows through `symb2meta`.

use super::{Dfa, NO_TRANSITION, SYMB_COUNT};

/// The dead class index.
pub const DEAD_META: u8 = 0;

/// Rewrite `dfa` to meta-indexed columns, filling `symb2meta` and
/// `meta_count`.
pub fn reduce(dfa: &mut Dfa) {
    let state_count = dfa.state_count();
    let mut symb2meta = [DEAD_META; SYMB_COUNT];
    let mut meta_reps: Vec<u8> = Vec::new();

    for symb in 0..SYMB_COUNT {
        let dead = (0..state_count).all(|s| dfa.dtran[s][symb] == NO_TRANSITION);
        if dead {
            symb2meta[symb] = DEAD_META;
            continue;
        }
        let symb_u8 = symb as u8;
        if dfa.case_insensitive && symb_u8.is_ascii_lowercase() {
            // Lowercase columns were copied from uppercase by the builder.
            symb2meta[symb] = symb2meta[symb_u8.to_ascii_uppercase() as usize];
            continue;
        }
        let alias = meta_reps.iter().position(|&rep| {
            (0..state_count).all(|s| dfa.dtran[s][symb] == dfa.dtran[s][rep as usize])
        });
        match alias {
            Some(meta) => symb2meta[symb] = meta as u8 + 1,
            None => {
                meta_reps.push(symb_u8);
                symb2meta[symb] = meta_reps.len() as u8;
            },
        }
    }

    let meta_count = meta_reps.len() as u32 + 1;
    for row in &mut dfa.dtran {
        let old = *row;
        row[DEAD_META as usize] = NO_TRANSITION;
        for (i, &rep) in meta_reps.iter().enumerate() {
            row[i + 1] = old[rep as usize];
        }
        for cell in row.iter_mut().skip(meta_count as usize) {
            *cell = NO_TRANSITION;
        }
    }

    dfa.symb2meta = symb2meta;
    dfa.meta_count = meta_count;
}
