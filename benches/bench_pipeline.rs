//! Pipeline stage benchmarks.
//!
//! Benchmarks each stage of the table-construction pipeline independently:
//! 1. Specification parsing (spec + regex parsers)
//! 2. Subset construction
//! 3. State minimization
//! 4. Meta-symbol reduction
//! 5. Row-displacement compression
//! 6. Full pipeline

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};

use relex::automata::builder::DfaBuilder;
use relex::automata::compress::compress;
use relex::automata::meta::reduce;
use relex::automata::optimize::optimize;
use relex::automata::Dfa;
use relex::spec;

/// A C-flavored token set: keywords, identifiers, literals, operators.
const C_LIKE_SPEC: &str = "\
d [0-9]
h [0-9a-fA-F]
w [a-zA-Z_]
%%
kw_if if
kw_else else
kw_while while
kw_for for
kw_return return
kw_struct struct
id {w}({w}|{d})*
dec {d}+
hex 0[xX]{h}+
flt {d}+\\.{d}*([eE][-+]?{d}+)?
str \\\"[^\\\"\\n]*\\\"
arrow ->
shl \"<<\"
shr >>
le \"<=\"
ge >=
eq ==
ne !=
ws [ \\t\\n]+
comment \\/\\/[^\\n]*
%%
";

fn build_dfa() -> Dfa {
    let parsed = spec::parse(C_LIKE_SPEC).expect("bench spec must parse");
    let mut builder = DfaBuilder::new();
    for pat in parsed.patterns {
        builder.add_pattern(pat.tree, pat.sc).expect("bench pattern must be admitted");
    }
    builder
        .build(parsed.start_conditions.len() as u32, false)
        .expect("bench build must succeed")
}

fn bench_parse(c: &mut Criterion) {
    c.bench_function("pipeline/parse_spec", |b| {
        b.iter(|| spec::parse(C_LIKE_SPEC).unwrap());
    });
}

fn bench_subset_construction(c: &mut Criterion) {
    c.bench_function("pipeline/subset_construction", |b| {
        b.iter(build_dfa);
    });
}

fn bench_optimize(c: &mut Criterion) {
    let dfa = build_dfa();
    c.bench_function("pipeline/optimize", |b| {
        b.iter_batched(|| dfa.clone(), |mut dfa| optimize(&mut dfa), BatchSize::SmallInput);
    });
}

fn bench_meta_reduce(c: &mut Criterion) {
    let mut dfa = build_dfa();
    optimize(&mut dfa);
    c.bench_function("pipeline/meta_reduce", |b| {
        b.iter_batched(|| dfa.clone(), |mut dfa| reduce(&mut dfa), BatchSize::SmallInput);
    });
}

fn bench_compress(c: &mut Criterion) {
    let mut dfa = build_dfa();
    optimize(&mut dfa);
    reduce(&mut dfa);
    c.bench_function("pipeline/compress", |b| {
        b.iter(|| compress(&dfa));
    });
}

fn bench_full_pipeline(c: &mut Criterion) {
    c.bench_function("pipeline/full", |b| {
        b.iter(|| {
            let mut dfa = build_dfa();
            optimize(&mut dfa);
            reduce(&mut dfa);
            compress(&dfa)
        });
    });
}

criterion_group!(
    benches,
    bench_parse,
    bench_subset_construction,
    bench_optimize,
    bench_meta_reduce,
    bench_compress,
    bench_full_pipeline
);
criterion_main!(benches);
