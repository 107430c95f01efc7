//! # relex: regular-expression lexical analyzer generator
//!
//! Reads a specification file of named regex patterns (optionally grouped by
//! start conditions) and emits a pair of C text artifacts, a definitions
//! header and an analyzer module, that implement a compressed DFA driven by
//! a small fixed `lex()` loop with longest-match semantics, trailing-context
//! support and optional left newline anchoring.
//!
//! ## Pipeline
//!
//! ```text
//! spec file ──→ [spec + regex parsers] ──→ pattern trees
//!                                              │
//!                                              ▼
//!   ┌────────────────────────────────────────────────────────────┐
//!   │ automata pipeline:                                         │
//!   │   positions/followpos → subset construction → minimize     │
//!   │   → meta-symbol reduction → row-displacement compression   │
//!   └────────────────────────────────────────────────────────────┘
//!                                              │
//!                                              ▼
//!               [codegen] ──→ lex_defs.h + lex_analyzer.inl
//! ```
//!
//! The library surface mirrors the stages: `spec`/`regex` parse, `automata`
//! builds and shrinks the tables, `codegen` renders the artifacts.

pub mod ast;
pub mod automata;
pub mod codegen;
pub mod diag;
pub mod regex;
pub mod spec;
pub mod valset;

#[cfg(test)]
mod tests;

pub use valset::ValueSet;
