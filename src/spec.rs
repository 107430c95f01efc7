//! Specification-file parser.
//!
//! The input is line oriented, two sections separated by `%%`:
//!
//! ```text
//! # definitions section
//! %start string          declare a start condition
//! %option name "value"   free-form option
//! digit  [0-9]           named regular definition, referenced as {digit}
//! %%
//! # patterns section
//! num    {digit}+
//! str    <string> [^"]+  restricted to the listed start conditions
//! %%
//! ```
//!
//! Start condition `initial` (index 0) is implicit. A pattern without a
//! `<...>` list joins every start condition. Blank lines and `#` comments
//! are skipped; anything left on a line after a regex is an error.

use std::collections::BTreeMap;
use std::fmt;

use crate::ast::Node;
use crate::regex::parse_regex;
use crate::valset::ValueSet;

/// Parse error located by source line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecError {
    pub line: u32,
    pub message: String,
}

impl fmt::Display for SpecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

impl std::error::Error for SpecError {}

/// One parsed pattern: its identifier, start-condition set and tree.
#[derive(Debug)]
pub struct SpecPattern {
    pub id: String,
    pub sc: ValueSet,
    pub tree: Node,
}

/// A fully parsed specification file.
#[derive(Debug)]
pub struct SpecFile {
    pub options: BTreeMap<String, String>,
    /// Start condition names; index 0 is always `initial`.
    pub start_conditions: Vec<String>,
    pub patterns: Vec<SpecPattern>,
}

impl SpecFile {
    pub fn sc_count(&self) -> u32 {
        self.start_conditions.len() as u32
    }

    /// One-line summary for diagnostics.
    pub fn summary(&self) -> String {
        use itertools::Itertools;
        format!(
            "{} patterns, start conditions: {}",
            self.patterns.len(),
            self.start_conditions.iter().join(", ")
        )
    }
}

/// Parse a specification file.
pub fn parse(text: &str) -> Result<SpecFile, SpecError> {
    let mut options = BTreeMap::new();
    let mut start_conditions = vec!["initial".to_string()];
    let mut definitions: BTreeMap<String, Node> = BTreeMap::new();
    let mut patterns: Vec<SpecPattern> = Vec::new();

    let err = |line: usize, message: String| SpecError { line: line as u32 + 1, message };

    let mut in_patterns = false;
    for (line_no, raw_line) in text.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if line == "%%" {
            if in_patterns {
                break; // everything after the second separator is ignored
            }
            in_patterns = true;
            continue;
        }

        if !in_patterns {
            if let Some(rest) = directive(line, "%start") {
                let name = rest.trim();
                if !is_ident(name) {
                    return Err(err(line_no, format!("invalid start condition name `{}`", name)));
                }
                if start_conditions.iter().any(|sc| sc == name) {
                    return Err(err(line_no, "start condition is already defined".into()));
                }
                start_conditions.push(name.to_string());
            } else if let Some(rest) = directive(line, "%option") {
                let (name, value) = parse_option(rest.trim())
                    .ok_or_else(|| err(line_no, "malformed %option line".into()))?;
                options.insert(name, value);
            } else if line.starts_with('%') {
                return Err(err(line_no, "unknown % directive".into()));
            } else {
                let (name, rest) = split_ident(line)
                    .ok_or_else(|| err(line_no, "expected an identifier".into()))?;
                if definitions.contains_key(name) {
                    return Err(err(line_no, "regular expression is already defined".into()));
                }
                let tree = parse_line_regex(raw_line.trim_end(), rest, &definitions, line_no)?;
                definitions.insert(name.to_string(), tree);
            }
        } else {
            let (name, mut rest) = split_ident(line)
                .ok_or_else(|| err(line_no, "expected an identifier".into()))?;
            if patterns.iter().any(|pat| pat.id == name) {
                return Err(err(line_no, "pattern is already defined".into()));
            }

            let mut sc = ValueSet::new();
            if let Some(list) = rest.strip_prefix('<') {
                let Some(end) = list.find('>') else {
                    return Err(err(line_no, "unterminated start condition list".into()));
                };
                for sc_name in list[..end].split_whitespace() {
                    let Some(idx) = start_conditions.iter().position(|s| s == sc_name) else {
                        return Err(err(line_no, "undefined start condition".into()));
                    };
                    sc.add(idx as u32);
                }
                if sc.is_empty() {
                    return Err(err(line_no, "empty start condition list".into()));
                }
                rest = list[end + 1..].trim_start();
            } else {
                sc.add_range(0, start_conditions.len() as u32 - 1);
            }

            let tree = parse_line_regex(raw_line.trim_end(), rest, &definitions, line_no)?;
            patterns.push(SpecPattern { id: name.to_string(), sc, tree });
        }
    }

    Ok(SpecFile { options, start_conditions, patterns })
}

/// Parse the regex part of a line and check that nothing but whitespace or a
/// comment trails it. Errors are reported with a line-relative column.
fn parse_line_regex(
    raw_line: &str,
    regex: &str,
    definitions: &BTreeMap<String, Node>,
    line_no: usize,
) -> Result<Node, SpecError> {
    let column_of = |offset: usize| raw_line.len() - regex.len() + offset + 1;
    let (tree, consumed) = parse_regex(regex, definitions).map_err(|e| SpecError {
        line: line_no as u32 + 1,
        message: format!("column {}: {}", column_of(e.pos), e.message),
    })?;
    let rest = regex[consumed..].trim();
    if !(rest.is_empty() || rest.starts_with('#')) {
        return Err(SpecError {
            line: line_no as u32 + 1,
            message: format!("column {}: unexpected trailing text", column_of(consumed)),
        });
    }
    Ok(tree)
}

/// Match a `%` directive followed by whitespace, returning its argument.
fn directive<'a>(line: &'a str, name: &str) -> Option<&'a str> {
    line.strip_prefix(name).filter(|rest| rest.starts_with(char::is_whitespace))
}

/// Split a leading identifier off a line. Returns the identifier and the
/// rest with leading whitespace removed.
fn split_ident(line: &str) -> Option<(&str, &str)> {
    let end = line
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(line.len());
    let (name, rest) = line.split_at(end);
    if !is_ident(name) {
        return None;
    }
    Some((name, rest.trim_start()))
}

fn is_ident(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// `name "value"` of an `%option` line.
fn parse_option(rest: &str) -> Option<(String, String)> {
    let (name, rest) = split_ident(rest)?;
    let rest = rest.strip_prefix('"')?;
    let end = rest.find('"')?;
    if !rest[end + 1..].trim().is_empty() {
        return None;
    }
    Some((name.to_string(), rest[..end].to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SMALL_SPEC: &str = r#"
# a small lexer
%start string
digit  [0-9]
alpha  [a-zA-Z_]

%%
num     {digit}+
id      {alpha}({alpha}|{digit})*
str_seq <string> [^"]+
%%
"#;

    #[test]
    fn test_parses_small_spec() {
        let spec = parse(SMALL_SPEC).unwrap();
        assert_eq!(spec.start_conditions, vec!["initial", "string"]);
        assert_eq!(spec.patterns.len(), 3);
        assert_eq!(spec.patterns[0].id, "num");

        // Unrestricted patterns join every start condition.
        assert!(spec.patterns[0].sc.contains(0));
        assert!(spec.patterns[0].sc.contains(1));
        // Restricted patterns only the listed ones.
        assert!(!spec.patterns[2].sc.contains(0));
        assert!(spec.patterns[2].sc.contains(1));
    }

    #[test]
    fn test_options() {
        let spec = parse("%option tab_size \"4\"\n%%\nx x\n").unwrap();
        assert_eq!(spec.options.get("tab_size").map(String::as_str), Some("4"));
    }

    #[test]
    fn test_zero_patterns_is_not_a_parse_error() {
        // Emptiness is the builder's precondition, not a syntax error.
        let spec = parse("%%\n%%\n").unwrap();
        assert!(spec.patterns.is_empty());
    }

    #[test]
    fn test_duplicate_start_condition() {
        let e = parse("%start a\n%start a\n%%\nx x\n").unwrap_err();
        assert!(e.message.contains("already defined"));
        assert_eq!(e.line, 2);
    }

    #[test]
    fn test_duplicate_definition() {
        let e = parse("d [0-9]\nd [0-9]\n%%\nx x\n").unwrap_err();
        assert!(e.message.contains("already defined"));
    }

    #[test]
    fn test_duplicate_pattern() {
        let e = parse("%%\nx a\nx b\n").unwrap_err();
        assert!(e.message.contains("already defined"));
    }

    #[test]
    fn test_undefined_start_condition() {
        let e = parse("%%\nx <nope> a\n").unwrap_err();
        assert!(e.message.contains("undefined start condition"));
    }

    #[test]
    fn test_regex_error_is_located() {
        let e = parse("%%\nbad (a\n").unwrap_err();
        assert_eq!(e.line, 2);
        assert!(e.message.contains("column"));
    }

    #[test]
    fn test_trailing_text_rejected() {
        let e = parse("%%\nx a b\n").unwrap_err();
        assert!(e.message.contains("trailing text"));
    }

    #[test]
    fn test_trailing_comment_allowed() {
        let spec = parse("%%\nx abc # matches abc\n").unwrap();
        assert_eq!(spec.patterns.len(), 1);
    }

    #[test]
    fn test_text_after_second_separator_ignored() {
        let spec = parse("%%\nx a\n%%\nwhatever )( here\n").unwrap();
        assert_eq!(spec.patterns.len(), 1);
    }

    #[test]
    fn test_definitions_can_reference_definitions() {
        let spec = parse("d [0-9]\nnum {d}+\n%%\nval {num}(\\.{num})?\n").unwrap();
        assert_eq!(spec.patterns.len(), 1);
    }
}
