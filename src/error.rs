//! The single error type threaded through every compilation stage.

use crate::diagnostics::Location;
use std::collections::TryReserveError;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompileError {
    /// Malformed command line.
    #[error("{0}")]
    Args(String),
    #[error("{message}")]
    Io {
        message: String,
        #[source]
        source: Option<io::Error>,
    },
    #[error("Memory allocation failure!")]
    Alloc(#[from] TryReserveError),
    /// A `]` with no open `[` before it.
    #[error("Found an extra ']' at line {}.", .at.line)]
    ExtraClosingBracket { at: Location },
    /// The innermost `[` left open at the end of the source.
    #[error("Missing a closing bracket ']' for opening bracket '[' at line {}.", .at.line)]
    UnterminatedLoop { at: Location },
    /// Unsupported or unknown target, or a broken internal invariant.
    #[error("{0}")]
    Internal(String),
}

/// The category of a `CompileError`, without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Args,
    Io,
    Alloc,
    ExtraClosingBracket,
    UnterminatedLoop,
    Internal,
}

impl ErrorKind {
    /// Stable code printed in diagnostics.
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::Args => "ERROR_ARGS",
            ErrorKind::Io => "ERROR_IO",
            ErrorKind::Alloc => "ERROR_ALLOC",
            ErrorKind::ExtraClosingBracket => "ERROR_MISMATCHED_BRACKET",
            ErrorKind::UnterminatedLoop => "ERROR_MISSING_BRACKET",
            ErrorKind::Internal => "ERROR_INTERNAL",
        }
    }
}

impl CompileError {
    pub fn io(message: impl Into<String>, source: io::Error) -> Self {
        CompileError::Io {
            message: message.into(),
            source: Some(source),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            CompileError::Args(_) => ErrorKind::Args,
            CompileError::Io { .. } => ErrorKind::Io,
            CompileError::Alloc(_) => ErrorKind::Alloc,
            CompileError::ExtraClosingBracket { .. } => ErrorKind::ExtraClosingBracket,
            CompileError::UnterminatedLoop { .. } => ErrorKind::UnterminatedLoop,
            CompileError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Where in the source the error points, for bracket errors only.
    pub fn location(&self) -> Option<Location> {
        match *self {
            CompileError::ExtraClosingBracket { at } | CompileError::UnterminatedLoop { at } => {
                Some(at)
            }
            _ => None,
        }
    }
}

#[test]
fn bracket_errors_carry_location() {
    let err = CompileError::UnterminatedLoop {
        at: Location::new(3, 7),
    };
    assert_eq!(err.kind(), ErrorKind::UnterminatedLoop);
    assert_eq!(err.location(), Some(Location::new(3, 7)));
    assert_eq!(
        err.to_string(),
        "Missing a closing bracket ']' for opening bracket '[' at line 3."
    );
}

#[test]
fn other_errors_have_no_location() {
    let err = CompileError::Args("Unknown argument: '-z'".to_owned());
    assert_eq!(err.kind().code(), "ERROR_ARGS");
    assert_eq!(err.location(), None);
}

#[test]
fn reserve_failure_is_an_alloc_error() {
    let mut huge: Vec<u64> = Vec::new();
    let err: CompileError = huge.try_reserve_exact(usize::MAX).unwrap_err().into();
    assert_eq!(err.kind(), ErrorKind::Alloc);
    assert_eq!(err.to_string(), "Memory allocation failure!");
}
