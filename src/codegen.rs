//! C text emission: the definitions header and the analyzer module.
//!
//! The analyzer module carries the tables selected by the compression level
//! plus the fixed `lex()` driver loop:
//!
//! - level 0: one flat 256-wide `Dtran`, no meta table;
//! - level 1: `symb2meta` plus a flat `meta_count`-wide `Dtran`;
//! - level 2: `symb2meta` plus the `def`/`base`/`next`/`check` arrays.
//!
//! When any accepted pattern has a trailing context, `accept` values are
//! packed as `(pattern << 1) | trail_flag` and the CSR `lls_idx`/`lls_list`
//! arrays are emitted so the driver can unwind to the context boundary.

use std::io::{self, Write};

use crate::automata::compress::CompressedTables;
use crate::automata::Dfa;
use crate::spec::SpecFile;

/// Emission parameters for the analyzer module.
pub struct EngineInfo {
    pub compress_level: u8,
    pub has_trailing_context: bool,
    pub has_left_nl_anchoring: bool,
    /// C cell type for state-valued arrays (`int`, or `int8_t` when the
    /// state count permits and the caller asked for it).
    pub state_type: &'static str,
}

const LENGTH_LIMIT: usize = 120;

/// Write comma-separated values, wrapped at the length limit.
fn output_data<W: Write>(out: &mut W, values: &[i64], ntab: usize) -> io::Result<()> {
    let Some((first, rest)) = values.split_first() else {
        return Ok(());
    };
    let tab = " ".repeat(ntab);
    let mut line = format!("{}{}", tab, first);
    for value in rest {
        let sval = value.to_string();
        if line.len() + sval.len() + 3 > LENGTH_LIMIT {
            writeln!(out, "{},", line)?;
            line = format!("{}{}", tab, sval);
        } else {
            line.push_str(", ");
            line.push_str(&sval);
        }
    }
    writeln!(out, "{}", line)
}

/// Write one C array definition. An empty value list still produces a
/// one-element array so the emitted module always compiles.
fn output_array<W: Write>(
    out: &mut W,
    cell_type: &str,
    name: &str,
    values: &[i64],
) -> io::Result<()> {
    if values.is_empty() {
        writeln!(out, "\nstatic {} {}[1] = {{ 0 }};", cell_type, name)
    } else {
        writeln!(out, "\nstatic {} {}[{}] = {{", cell_type, name, values.len())?;
        output_data(out, values, 4)?;
        writeln!(out, "}};")
    }
}

/// Emit the definitions header: driver flags, result codes, one `pat_`
/// constant per pattern in declaration order, and the `sc_` constants.
pub fn write_defs_header<W: Write>(out: &mut W, spec: &SpecFile) -> io::Result<()> {
    writeln!(out, "/* relex autogenerated definition file - do not edit! */")?;
    writeln!(out, "/* clang-format off */")?;

    writeln!(out, "\nenum {{")?;
    writeln!(out, "    flag_has_more = 1,")?;
    writeln!(out, "    flag_at_beg_of_line = 2")?;
    writeln!(out, "}};")?;

    writeln!(out, "\nenum {{")?;
    writeln!(out, "    err_end_of_input = -1,")?;
    writeln!(out, "    predef_pat_default = 0,")?;
    for pat in &spec.patterns {
        writeln!(out, "    pat_{},", pat.id)?;
    }
    writeln!(out, "    total_pattern_count")?;
    writeln!(out, "}};")?;

    writeln!(out, "\nenum {{")?;
    let last = spec.start_conditions.len() - 1;
    for (i, sc) in spec.start_conditions.iter().enumerate() {
        let init = if i == 0 { " = 0" } else { "" };
        let sep = if i == last { "" } else { "," };
        writeln!(out, "    sc_{}{}{}", sc, init, sep)?;
    }
    writeln!(out, "}};")
}

/// Emit the analyzer module: tables per compression level, the `accept`
/// array (packed when trailing context is present), the `lls` arrays, and
/// the driver.
pub fn write_analyzer<W: Write>(
    out: &mut W,
    dfa: &Dfa,
    compressed: Option<&CompressedTables>,
    info: &EngineInfo,
) -> io::Result<()> {
    writeln!(out, "/* relex autogenerated analyzer file - do not edit! */")?;
    writeln!(out, "/* clang-format off */")?;

    let meta_count = dfa.meta_count as usize;
    if info.compress_level > 0 {
        let symb2meta: Vec<i64> = dfa.symb2meta.iter().map(|&m| m as i64).collect();
        output_array(out, "uint8_t", "symb2meta", &symb2meta)?;

        if info.compress_level == 1 {
            let flat: Vec<i64> = dfa
                .dtran
                .iter()
                .flat_map(|row| row[..meta_count].iter().map(|&t| t as i64))
                .collect();
            writeln!(out, "\nenum {{ dtran_width = {} }};", meta_count)?;
            output_array(out, info.state_type, "Dtran", &flat)?;
        } else {
            let tables = compressed.expect("level 2 emission requires compressed tables");
            output_array(out, info.state_type, "def", &to_i64(&tables.def))?;
            output_array(out, "int", "base", &to_i64(&tables.base))?;
            output_array(out, info.state_type, "next", &to_i64(&tables.next))?;
            output_array(out, info.state_type, "check", &to_i64(&tables.check))?;
        }
    } else {
        // No meta table: expand each row back to the full byte alphabet.
        let flat: Vec<i64> = dfa
            .dtran
            .iter()
            .flat_map(|row| {
                dfa.symb2meta
                    .iter()
                    .map(move |&meta| row[meta as usize] as i64)
            })
            .collect();
        output_array(out, info.state_type, "Dtran", &flat)?;
    }

    let accept: Vec<i64> = dfa
        .accept
        .iter()
        .map(|&n_pat| {
            if info.has_trailing_context && n_pat > 0 {
                let trail = dfa.pattern_has_trailing_context(n_pat as u32) as i64;
                ((n_pat as i64) << 1) | trail
            } else {
                n_pat as i64
            }
        })
        .collect();
    output_array(out, "int", "accept", &accept)?;

    if info.has_trailing_context {
        let mut lls_idx: Vec<i64> = Vec::with_capacity(dfa.lls.len() + 1);
        let mut lls_list: Vec<i64> = Vec::new();
        lls_idx.push(0);
        for pat_set in &dfa.lls {
            lls_list.extend(pat_set.iter().map(|n_pat| n_pat as i64));
            lls_idx.push(lls_list.len() as i64);
        }
        output_array(out, "int", "lls_idx", &lls_idx)?;
        output_array(out, "int", "lls_list", &lls_list)?;
    }

    write_lex_engine(out, info)
}

fn to_i64(values: &[i32]) -> Vec<i64> {
    values.iter().map(|&v| v as i64).collect()
}

/// Emit the driver loop, parameterised by compression level, trailing
/// context and left newline anchoring.
fn write_lex_engine<W: Write>(out: &mut W, info: &EngineInfo) -> io::Result<()> {
    let initial_state = if info.has_left_nl_anchoring {
        "(*(sptr - 1) << 1) + ((flags & flag_at_beg_of_line) ? 1 : 0)"
    } else {
        "*(sptr - 1)"
    };

    writeln!(out)?;
    writeln!(
        out,
        "static int lex(const char* first, const char* last, {0}** p_sptr, size_t* p_llen, int flags) {{",
        info.state_type
    )?;
    writeln!(out, "    {0}* sptr = *p_sptr;", info.state_type)?;
    writeln!(out, "    {0}* sptr0 = sptr - *p_llen;", info.state_type)?;
    writeln!(out, "    {0} state = {1};", info.state_type, initial_state)?;
    writeln!(out, "    while (first != last) {{ /* Analyze till transition is impossible */")?;

    let step: &[&str] = match info.compress_level {
        0 => &["        state = Dtran[256 * state + (unsigned char)*first];"],
        1 => &["        state = Dtran[dtran_width * state + symb2meta[(unsigned char)*first]];"],
        _ => &[
            "        uint8_t meta = symb2meta[(unsigned char)*first];",
            "        do {",
            "            int l = base[state] + meta;",
            "            if (check[l] == state) {",
            "                state = next[l];",
            "                break;",
            "            }",
            "            state = def[state];",
            "        } while (state >= 0);",
        ],
    };
    for line in step {
        writeln!(out, "{}", line)?;
    }

    for line in [
        "        if (state < 0) { goto unroll; }",
        "        *sptr++ = state, ++first;",
        "    }",
        "    if ((flags & flag_has_more) || sptr == sptr0) {",
        "        *p_sptr = sptr;",
        "        *p_llen = (size_t)(sptr - sptr0);",
        "        return err_end_of_input;",
        "    }",
        "unroll:",
        "    *p_sptr = sptr0;",
        "    while (sptr != sptr0) { /* Unroll down to last accepting state */",
    ] {
        writeln!(out, "{}", line)?;
    }

    let unwind: &[&str] = if info.has_trailing_context {
        &[
            "        int n_pat = accept[(state = *(sptr - 1))];",
            "        if (n_pat > 0) {",
            "            enum { trailing_context_flag = 1, flag_count = 1 };",
            "            int i;",
            "            if (!(n_pat & trailing_context_flag)) {",
            "                *p_llen = (size_t)(sptr - sptr0);",
            "                return n_pat >> flag_count;",
            "            }",
            "            n_pat >>= flag_count;",
            "            do {",
            "                for (i = lls_idx[state]; i < lls_idx[state + 1]; ++i) {",
            "                    if (lls_list[i] == n_pat) {",
            "                        *p_llen = (size_t)(sptr - sptr0);",
            "                        return n_pat;",
            "                    }",
            "                }",
            "                state = *(--sptr - 1);",
            "            } while (sptr != sptr0);",
        ]
    } else {
        &[
            "        int n_pat = accept[*(sptr - 1)];",
            "        if (n_pat > 0) {",
        ]
    };
    for line in unwind {
        writeln!(out, "{}", line)?;
    }

    for line in [
        "            *p_llen = (size_t)(sptr - sptr0);",
        "            return n_pat;",
        "        }",
        "        --sptr;",
        "    }",
        "    *p_llen = 1; /* Accept at least one symbol as default pattern */",
        "    return predef_pat_default;",
        "}",
    ] {
        writeln!(out, "{}", line)?;
    }
    Ok(())
}
