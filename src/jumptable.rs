//! Bracket matching. Certifies that a token stream is well nested
//! before the IR builder runs, and pins down the first bad bracket.

use crate::error::CompileError;
use crate::lexer::{Token, TokenKind};
use tracing::debug;

#[cfg(test)]
use crate::cli::Options;
#[cfg(test)]
use crate::diagnostics::Location;
#[cfg(test)]
use crate::lexer::lex;
#[cfg(test)]
use pretty_assertions::assert_eq;

/// For every bracket token, the index of its partner.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MatchTable {
    partners: Vec<Option<usize>>,
}

impl MatchTable {
    /// The partner of the bracket at token index `index`, or `None` for
    /// non-bracket tokens and out of range indices.
    pub fn partner(&self, index: usize) -> Option<usize> {
        self.partners.get(index).copied().flatten()
    }

    pub fn len(&self) -> usize {
        self.partners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.partners.is_empty()
    }

    /// `(open, close)` index pairs, ordered by the opening bracket.
    pub fn pairs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.partners
            .iter()
            .enumerate()
            .filter_map(|(i, p)| p.filter(|&j| j > i).map(|j| (i, j)))
    }
}

/// Match every `[` with its `]`.
///
/// The first unmatched `]` is reported. If brackets remain open at the
/// end, the innermost one is reported.
pub fn validate(tokens: &[Token]) -> Result<MatchTable, CompileError> {
    let mut partners = vec![None; tokens.len()];
    let mut open = Vec::new();

    for (index, token) in tokens.iter().enumerate() {
        match token.kind {
            TokenKind::LoopStart => open.push(index),
            TokenKind::LoopEnd => {
                let start = open.pop().ok_or(CompileError::ExtraClosingBracket {
                    at: token.location(),
                })?;
                partners[start] = Some(index);
                partners[index] = Some(start);
            }
            _ => {}
        }
    }

    if let Some(&innermost) = open.last() {
        return Err(CompileError::UnterminatedLoop {
            at: tokens[innermost].location(),
        });
    }

    let table = MatchTable { partners };
    debug!(loops = table.pairs().count(), "brackets balanced");
    Ok(table)
}

#[cfg(test)]
fn validate_str(source: &str) -> Result<MatchTable, CompileError> {
    validate(&lex(source.as_bytes(), Options::empty()).unwrap())
}

#[test]
fn validate_empty() {
    let table = validate_str("").unwrap();
    assert!(table.is_empty());
    assert_eq!(table.partner(0), None);
}

#[test]
fn validate_nested() {
    let table = validate_str("+[[-]>]").unwrap();
    assert_eq!(table.pairs().collect::<Vec<_>>(), vec![(1, 6), (2, 4)]);
    assert_eq!(table.partner(0), None);
    assert_eq!(table.partner(6), Some(1));
    assert_eq!(table.partner(4), Some(2));
}

#[test]
fn validate_lone_open() {
    match validate_str("[") {
        Err(CompileError::UnterminatedLoop { at }) => assert_eq!(at, Location::new(1, 1)),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn validate_lone_close() {
    match validate_str("]") {
        Err(CompileError::ExtraClosingBracket { at }) => assert_eq!(at, Location::new(1, 1)),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn validate_reports_first_extra_close() {
    match validate_str("[]\n ]]") {
        Err(CompileError::ExtraClosingBracket { at }) => assert_eq!(at, Location::new(2, 2)),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn validate_reports_innermost_open() {
    match validate_str("[\n[[]\n") {
        Err(CompileError::UnterminatedLoop { at }) => assert_eq!(at, Location::new(2, 1)),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn validate_close_before_open() {
    assert!(validate_str("][").is_err());
    assert!(validate_str("[][").is_err());
}
