//! Regex syntax trees and the classical attribute engine.
//!
//! A pattern is a binary tree of `Node`s. The positional variants (`Symb`,
//! `SymbSet`, `TrailCont`, `Term`) each receive a unique *position* index
//! during the attribute walk; every other variant is a pure operator.
//!
//! `calc_attrs` performs the single bottom-up walk that computes the
//! Aho-Sethi-Ullman attributes (`nullable`, `firstpos`, `lastpos`) and
//! mutates the `followpos` side table as it goes:
//!
//! - `Cat(l, r)`: every position in `lastpos(l)` is followed by `firstpos(r)`
//! - `Star(l)` / `Plus(l)`: every position in `lastpos(l)` is followed by
//!   `firstpos(l)`
//! - `TrailCont(l, r)` with own position `q`: every position in `lastpos(l)`
//!   is followed by `q`, and `q` is followed by `firstpos(r)`
//!
//! The tree shape itself stays read-only apart from the position indices
//! stamped into positional variants; `followpos` lives in the side table
//! `Vec<Position>`, not in the nodes.

use crate::automata::BuildError;
use crate::valset::{ValueSet, MAX_VALUE};

/// 1-based pattern number, as seen by `Term` nodes and the `accept` table.
pub type PatternNo = u32;

/// Position index value before the attribute walk has stamped a real one.
pub const UNASSIGNED: u32 = u32::MAX;

/// A node of a regex syntax tree.
#[derive(Debug, Clone)]
pub enum Node {
    /// Alternation `l | r`.
    Or(Box<Node>, Box<Node>),
    /// Concatenation `l r`.
    Cat(Box<Node>, Box<Node>),
    /// Zero or more repetitions `l*`.
    Star(Box<Node>),
    /// One or more repetitions `l+`.
    Plus(Box<Node>),
    /// Zero or one occurrence `l?`.
    Question(Box<Node>),
    /// A single input byte.
    Symb { symb: u8, pos: u32 },
    /// A set of input bytes (character class).
    SymbSet { set: ValueSet, pos: u32 },
    /// The empty string.
    Empty,
    /// Trailing context `l/r`: recognize `l` only when followed by `r`;
    /// `r` is not consumed. The node owns the boundary position.
    TrailCont { left: Box<Node>, right: Box<Node>, pos: u32 },
    /// Augmented pattern terminator carrying the pattern number.
    Term { pattern_no: PatternNo, pos: u32 },
    /// Left newline anchor `^l`: the pattern participates only in the
    /// at-line-start start states.
    NlAnchor(Box<Node>),
}

impl Node {
    pub fn or(l: Node, r: Node) -> Node {
        Node::Or(Box::new(l), Box::new(r))
    }

    pub fn cat(l: Node, r: Node) -> Node {
        Node::Cat(Box::new(l), Box::new(r))
    }

    pub fn star(l: Node) -> Node {
        Node::Star(Box::new(l))
    }

    pub fn plus(l: Node) -> Node {
        Node::Plus(Box::new(l))
    }

    pub fn question(l: Node) -> Node {
        Node::Question(Box::new(l))
    }

    pub fn symb(symb: u8) -> Node {
        Node::Symb { symb, pos: UNASSIGNED }
    }

    pub fn symb_set(set: ValueSet) -> Node {
        Node::SymbSet { set, pos: UNASSIGNED }
    }

    pub fn trail_cont(left: Node, right: Node) -> Node {
        Node::TrailCont { left: Box::new(left), right: Box::new(right), pos: UNASSIGNED }
    }

    pub fn term(pattern_no: PatternNo) -> Node {
        Node::Term { pattern_no, pos: UNASSIGNED }
    }

    pub fn nl_anchor(l: Node) -> Node {
        Node::NlAnchor(Box::new(l))
    }

    /// Strip a leading `NlAnchor` wrapper, reporting whether one was present.
    pub fn strip_anchor(&self) -> (&Node, bool) {
        match self {
            Node::NlAnchor(inner) => (inner, true),
            other => (other, false),
        }
    }
}

/// What a position stands for, captured once by the attribute walk so that
/// later stages never have to consult the trees again.
#[derive(Debug, Clone)]
pub enum PosKind {
    /// Matches exactly one byte.
    Symb(u8),
    /// Matches any byte of the set.
    SymbSet(ValueSet),
    /// Trailing-context boundary marker (matches no input byte).
    TrailCont,
    /// Pattern terminator (matches no input byte).
    Term(PatternNo),
}

/// Side-table entry for one position: its kind plus its `followpos` set.
#[derive(Debug, Clone)]
pub struct Position {
    pub kind: PosKind,
    pub followpos: ValueSet,
}

/// Attributes computed per node by the walk.
#[derive(Debug, Clone)]
pub struct Attrs {
    pub nullable: bool,
    pub firstpos: ValueSet,
    pub lastpos: ValueSet,
}

impl Attrs {
    fn leaf(pos: u32) -> Attrs {
        let mut set = ValueSet::new();
        set.add(pos);
        Attrs { nullable: false, firstpos: set.clone(), lastpos: set }
    }
}

/// Allocate the next position index, appending its side-table entry.
///
/// Fails with `TooManyPositions` once the dense index range `0..=MAX_VALUE`
/// is exhausted.
fn alloc_position(positions: &mut Vec<Position>, kind: PosKind) -> Result<u32, BuildError> {
    let pos = positions.len() as u32;
    if pos > MAX_VALUE {
        return Err(BuildError::TooManyPositions);
    }
    positions.push(Position { kind, followpos: ValueSet::new() });
    Ok(pos)
}

/// Walk a pattern tree bottom-up: assign positions, compute
/// `nullable`/`firstpos`/`lastpos`, and accumulate `followpos` into the
/// side table. Returns the root attributes.
pub fn calc_attrs(node: &mut Node, positions: &mut Vec<Position>) -> Result<Attrs, BuildError> {
    match node {
        Node::Empty => Ok(Attrs {
            nullable: true,
            firstpos: ValueSet::new(),
            lastpos: ValueSet::new(),
        }),

        Node::Symb { symb, pos } => {
            *pos = alloc_position(positions, PosKind::Symb(*symb))?;
            Ok(Attrs::leaf(*pos))
        },

        Node::SymbSet { set, pos } => {
            *pos = alloc_position(positions, PosKind::SymbSet(set.clone()))?;
            Ok(Attrs::leaf(*pos))
        },

        Node::Term { pattern_no, pos } => {
            *pos = alloc_position(positions, PosKind::Term(*pattern_no))?;
            Ok(Attrs::leaf(*pos))
        },

        Node::Or(l, r) => {
            let la = calc_attrs(l, positions)?;
            let ra = calc_attrs(r, positions)?;
            Ok(Attrs {
                nullable: la.nullable || ra.nullable,
                firstpos: &la.firstpos | &ra.firstpos,
                lastpos: &la.lastpos | &ra.lastpos,
            })
        },

        Node::Cat(l, r) => {
            let la = calc_attrs(l, positions)?;
            let ra = calc_attrs(r, positions)?;
            for p in &la.lastpos {
                positions[p as usize].followpos |= &ra.firstpos;
            }
            let mut firstpos = la.firstpos.clone();
            if la.nullable {
                firstpos |= &ra.firstpos;
            }
            let mut lastpos = ra.lastpos.clone();
            if ra.nullable {
                lastpos |= &la.lastpos;
            }
            Ok(Attrs { nullable: la.nullable && ra.nullable, firstpos, lastpos })
        },

        Node::Star(l) => {
            let la = calc_attrs(l, positions)?;
            for p in &la.lastpos {
                positions[p as usize].followpos |= &la.firstpos;
            }
            Ok(Attrs { nullable: true, firstpos: la.firstpos, lastpos: la.lastpos })
        },

        Node::Plus(l) => {
            let la = calc_attrs(l, positions)?;
            for p in &la.lastpos {
                positions[p as usize].followpos |= &la.firstpos;
            }
            Ok(Attrs { nullable: la.nullable, firstpos: la.firstpos, lastpos: la.lastpos })
        },

        Node::Question(l) => {
            let la = calc_attrs(l, positions)?;
            Ok(Attrs { nullable: true, firstpos: la.firstpos, lastpos: la.lastpos })
        },

        Node::NlAnchor(l) => calc_attrs(l, positions),

        Node::TrailCont { left, right, pos } => {
            let la = calc_attrs(left, positions)?;
            let ra = calc_attrs(right, positions)?;
            let q = alloc_position(positions, PosKind::TrailCont)?;
            *pos = q;

            for p in &la.lastpos {
                positions[p as usize].followpos.add(q);
            }
            positions[q as usize].followpos |= &ra.firstpos;

            let mut firstpos = la.firstpos;
            if la.nullable {
                firstpos.add(q);
            }
            let mut lastpos = ra.lastpos;
            if ra.nullable {
                lastpos.add(q);
            }
            Ok(Attrs { nullable: false, firstpos, lastpos })
        },
    }
}
