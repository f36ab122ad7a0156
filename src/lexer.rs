//! Turns raw source bytes into a stream of located tokens.
//!
//! Only the eight BF commands produce tokens. Everything else is
//! inert, and with comments enabled a `;` hides the rest of its line.

use crate::cli::Options;
use crate::diagnostics::Location;
use crate::error::CompileError;
use tracing::debug;

#[cfg(test)]
use pretty_assertions::assert_eq;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Increment,
    Decrement,
    MoveRight,
    MoveLeft,
    LoopStart,
    LoopEnd,
    Output,
    Input,
}

impl TokenKind {
    pub fn from_byte(byte: u8) -> Option<TokenKind> {
        match byte {
            b'+' => Some(TokenKind::Increment),
            b'-' => Some(TokenKind::Decrement),
            b'>' => Some(TokenKind::MoveRight),
            b'<' => Some(TokenKind::MoveLeft),
            b'[' => Some(TokenKind::LoopStart),
            b']' => Some(TokenKind::LoopEnd),
            b'.' => Some(TokenKind::Output),
            b',' => Some(TokenKind::Input),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
    pub col: usize,
}

impl Token {
    pub fn new(kind: TokenKind, line: usize, col: usize) -> Self {
        Token { kind, line, col }
    }

    pub fn location(&self) -> Location {
        Location::new(self.line, self.col)
    }
}

/// Scan `source` into tokens, in source order.
///
/// An empty or command-free source yields an empty stream. The only
/// failure is being unable to reserve the token buffer.
pub fn lex(source: &[u8], options: Options) -> Result<Vec<Token>, CompileError> {
    let comments = !options.contains(Options::NO_COMMENTS);

    // Never more tokens than bytes.
    let mut tokens = Vec::new();
    tokens.try_reserve_exact(source.len())?;

    let mut line = 1;
    let mut col = 1;
    let mut in_comment = false;

    for &byte in source {
        if byte == b'\n' {
            line += 1;
            col = 1;
            in_comment = false;
            continue;
        }

        if byte == b';' && comments {
            in_comment = true;
        } else if !in_comment {
            if let Some(kind) = TokenKind::from_byte(byte) {
                tokens.push(Token::new(kind, line, col));
            }
        }

        col += 1;
    }

    tokens.shrink_to_fit();
    debug!(bytes = source.len(), tokens = tokens.len(), "lexed source");

    Ok(tokens)
}

#[cfg(test)]
fn kinds(source: &str) -> Vec<TokenKind> {
    lex(source.as_bytes(), Options::empty())
        .unwrap()
        .into_iter()
        .map(|t| t.kind)
        .collect()
}

#[test]
fn lex_all_commands() {
    use self::TokenKind::*;
    assert_eq!(
        kinds("+-><[].,"),
        vec![Increment, Decrement, MoveRight, MoveLeft, LoopStart, LoopEnd, Output, Input]
    );
}

#[test]
fn lex_empty_source() {
    assert_eq!(lex(b"", Options::empty()).unwrap(), vec![]);
    assert_eq!(lex(b"hello world\n\n", Options::empty()).unwrap(), vec![]);
}

#[test]
fn lex_tracks_lines_and_columns() {
    let tokens = lex(b"a+\n  -\n\n>", Options::empty()).unwrap();
    assert_eq!(
        tokens,
        vec![
            Token::new(TokenKind::Increment, 1, 2),
            Token::new(TokenKind::Decrement, 2, 3),
            Token::new(TokenKind::MoveRight, 4, 1),
        ]
    );
}

#[test]
fn lex_line_comment() {
    let tokens = lex(b"+; ignore +-[\n-", Options::empty()).unwrap();
    assert_eq!(
        tokens,
        vec![
            Token::new(TokenKind::Increment, 1, 1),
            Token::new(TokenKind::Decrement, 2, 1),
        ]
    );
}

#[test]
fn lex_comment_still_advances_column() {
    let tokens = lex(b";+\n", Options::empty()).unwrap();
    assert_eq!(tokens, vec![]);

    let tokens = lex(b"+;;+\n+", Options::empty()).unwrap();
    assert_eq!(tokens.len(), 2);
    assert_eq!(tokens[1].location(), Location::new(2, 1));
}

#[test]
fn lex_comments_disabled() {
    let tokens = lex(b"; +", Options::NO_COMMENTS).unwrap();
    assert_eq!(tokens, vec![Token::new(TokenKind::Increment, 1, 3)]);
}
