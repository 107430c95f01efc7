use std::fs;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::Parser;

use relex::automata::builder::DfaBuilder;
use relex::automata::compress::compress;
use relex::automata::meta::reduce;
use relex::automata::optimize::optimize;
use relex::codegen::{write_analyzer, write_defs_header, EngineInfo};
use relex::{diag, spec};

/// A tool for regular-expression based lexical analyzer generation
#[derive(Parser, Debug)]
#[command(name = "relex", version)]
struct Args {
    /// Input specification file
    #[arg(value_name = "file")]
    file: PathBuf,

    /// Place the output analyzer into <file>
    #[arg(short = 'o', long = "outfile", value_name = "file", default_value = "lex_analyzer.inl")]
    outfile: PathBuf,

    /// Place the output definitions into <file>
    #[arg(long = "header-file", value_name = "file", default_value = "lex_defs.h")]
    header_file: PathBuf,

    /// Build case insensitive analyzer
    #[arg(long = "no-case")]
    no_case: bool,

    /// Compression level: 0 - plain 256-wide table, no meta table;
    /// 1 - meta-reduced table; 2 - row-displacement compression
    #[arg(long = "compress", value_name = "n", default_value_t = 2)]
    compress: u8,

    /// Use int8_t instead of int for states if state count is < 128
    #[arg(long = "use-int8-if-possible")]
    use_int8_if_possible: bool,

    /// Optimization level: 0 - do not optimize analyzer states;
    /// 1 - default analyzer optimization
    #[arg(short = 'O', value_name = "n", default_value_t = 1)]
    optimization: u8,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let file_name = args.file.display().to_string();

    let text = fs::read_to_string(&args.file)
        .with_context(|| format!("could not open input file `{}`", file_name))?;
    let spec = spec::parse(&text).map_err(|e| anyhow!("{}: {}", file_name, e))?;

    let mut builder = DfaBuilder::new();
    for pat in &spec.patterns {
        builder.add_pattern(pat.tree.clone(), pat.sc.clone())?;
    }

    diag::stage(&file_name, "building analyzer...");
    diag::detail(spec.summary());
    let mut dfa = builder.build(spec.sc_count(), args.no_case)?;

    let state_size = |dfa: &relex::automata::Dfa| {
        if args.use_int8_if_possible && dfa.state_count() < 128 {
            ("int8_t", 1usize)
        } else {
            ("int", 4usize)
        }
    };
    let (mut state_type, mut state_sz) = state_size(&dfa);

    diag::detail(format!("pattern count: {}", dfa.pattern_count));
    diag::detail(format!("start state count: {}", dfa.start_state_count));
    diag::detail(format!("position count: {}", dfa.position_count));
    diag::detail(format!("state count: {}", dfa.state_count()));
    diag::detail(format!(
        "transition table size: {} bytes",
        dfa.transition_table_size(state_sz)
    ));
    diag::done(&file_name);

    if args.optimization > 0 {
        diag::stage(&file_name, "optimizing states...");
        optimize(&mut dfa);
        (state_type, state_sz) = state_size(&dfa);
        diag::detail(format!("new state count: {}", dfa.state_count()));
        diag::detail(format!(
            "transition table size: {} bytes",
            dfa.transition_table_size(state_sz)
        ));
        diag::done(&file_name);
    }

    reduce(&mut dfa);
    diag::detail(format!("meta symbol count: {}", dfa.meta_count));
    diag::detail(format!(
        "meta-reduced transition table size: {} bytes",
        dfa.transition_table_size(state_sz)
    ));

    let mut header = Vec::new();
    write_defs_header(&mut header, &spec)?;
    fs::write(&args.header_file, &header).with_context(|| {
        format!("could not open output file `{}`", args.header_file.display())
    })?;

    let compress_level = args.compress.min(2);
    let compressed = if compress_level == 2 {
        diag::stage(&file_name, "compressing tables...");
        let tables = compress(&dfa);
        diag::detail(format!(
            "total compressed transition table size: {} bytes",
            (tables.def.len() + tables.next.len() + tables.check.len()) * state_sz
                + tables.base.len() * 4
                + dfa.symb2meta.len()
        ));
        diag::done(&file_name);
        Some(tables)
    } else {
        None
    };

    let info = EngineInfo {
        compress_level,
        has_trailing_context: dfa.has_trailing_context(),
        has_left_nl_anchoring: dfa.has_left_nl_anchoring(),
        state_type,
    };
    let mut analyzer = Vec::new();
    write_analyzer(&mut analyzer, &dfa, compressed.as_ref(), &info)?;
    fs::write(&args.outfile, &analyzer)
        .with_context(|| format!("could not open output file `{}`", args.outfile.display()))?;

    Ok(())
}
