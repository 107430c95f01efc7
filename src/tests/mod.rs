//! End-to-end pipeline tests: spec text in, table semantics out.
//!
//! `driver` reimplements the emitted C `lex()` loop over the in-memory
//! tables so the scenario tests can exercise longest-match tokenization,
//! trailing-context rollback and start conditions without compiling the
//! generated C.
