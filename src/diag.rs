//! Colored console diagnostics for the pipeline stages.
//!
//! Purely observational: stage banners and the per-stage counters. Errors
//! are not printed here, they bubble up to the binary as `Result`s.

use std::fmt::Display;

use colored::Colorize;

/// Announce a pipeline stage, prefixed with the input file name.
pub fn stage(file: &str, msg: &str) {
    println!("{}: {}", file, msg.blue().bold());
}

/// One indented counter line, e.g. ` - state count: 17`.
pub fn detail(msg: impl Display) {
    println!(" - {}", msg);
}

/// Close a stage banner.
pub fn done(file: &str) {
    println!("{}: {}", file, "done".green().bold());
}
