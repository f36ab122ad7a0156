//! Human-readable errors for the CLI.

use crate::error::CompileError;
use crate::source::SourceFile;
use colored::Colorize;
use itertools::Itertools;
use std::fmt;

/// A 1-based line/column pair pointing at a single source byte.
#[derive(PartialEq, Eq, Clone, Copy, Default)]
pub struct Location {
    pub line: usize,
    pub col: usize,
}

impl Location {
    pub fn new(line: usize, col: usize) -> Self {
        Location { line, col }
    }
}

impl fmt::Debug for Location {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[{}, {}]", self.line, self.col)
    }
}

/// Render `err` the way the CLI prints it. Bracket errors quote the
/// offending source line with a caret under the column when `source`
/// is available; everything else is a single line.
pub fn render(err: &CompileError, source: Option<&SourceFile>) -> String {
    let code = err.kind().code();

    match (err.location(), source) {
        (Some(at), Some(source)) => {
            let header = format!("{}{}: ", source.name(), at);
            let mut out = format!(
                "{}{}{}\n",
                header.bold(),
                code.bold().red(),
                format!(": {}", err).bold()
            );

            let line_text = source.line(at.line).unwrap_or_default();
            let gutter = at.line.to_string();
            let pad = " ".repeat(gutter.len());
            let caret = std::iter::repeat(' ')
                .take(at.col.saturating_sub(1))
                .chain(std::iter::once('^'))
                .collect::<String>();

            out.push_str(
                &[
                    format!("   {} | {}", gutter, line_text),
                    format!("   {} | {}", pad, caret),
                ]
                .iter()
                .join("\n"),
            );
            out.push('\n');
            out
        }
        _ => format!(
            "{}{}{}\n",
            "bfc: ".bold(),
            code.bold().red(),
            format!(": {}", err).bold()
        ),
    }
}

/// Print a rendered error to stderr.
pub fn report(err: &CompileError, source: Option<&SourceFile>) {
    eprint!("{}", render(err, source));
}

#[cfg(test)]
fn plain() {
    colored::control::set_override(false);
}

#[test]
fn render_bracket_error_with_caret() {
    plain();
    let source = SourceFile::from_bytes("dir/prog.bf", b"++\n+]-\n".to_vec());
    let err = CompileError::ExtraClosingBracket {
        at: Location::new(2, 2),
    };

    assert_eq!(
        render(&err, Some(&source)),
        "prog.bf[2, 2]: ERROR_MISMATCHED_BRACKET: Found an extra ']' at line 2.\n   2 | +]-\n     |  ^\n"
    );
}

#[test]
fn render_caret_pads_wide_line_numbers() {
    plain();
    let mut text = "\n".repeat(11);
    text.push('[');
    let source = SourceFile::from_bytes("deep.bf", text.into_bytes());
    let err = CompileError::UnterminatedLoop {
        at: Location::new(12, 1),
    };

    let rendered = render(&err, Some(&source));
    let lines = rendered.lines().collect::<Vec<_>>();
    assert_eq!(lines[1], "   12 | [");
    assert_eq!(lines[2], "      | ^");
}

#[test]
fn render_plain_error() {
    plain();
    let err = CompileError::Internal("i386 generation not supported yet!".to_owned());

    assert_eq!(
        render(&err, None),
        "bfc: ERROR_INTERNAL: i386 generation not supported yet!\n"
    );
}

#[test]
fn render_bracket_error_without_source() {
    plain();
    let err = CompileError::UnterminatedLoop {
        at: Location::new(1, 1),
    };

    assert_eq!(
        render(&err, None),
        "bfc: ERROR_MISSING_BRACKET: Missing a closing bracket ']' for opening bracket '[' at line 1.\n"
    );
}
