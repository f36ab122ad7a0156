#![warn(trivial_numeric_casts)]

//! bfc compiles BF source into assembly. The pipeline is a lexer, a
//! bracket validator, a builder for a tree IR of nested blocks, a
//! peephole optimizer and one backend per target architecture.

pub use bfir::{build, Block, Instruction};
pub use codegen::{backend_for, codegen, Arch, AssemblyProgram, Backend};
pub use diagnostics::Location;
pub use driver::{compile, run};
pub use error::{CompileError, ErrorKind};
pub use jumptable::{validate, MatchTable};
pub use lexer::{lex, Token, TokenKind};
pub use peephole::optimize;
pub use source::SourceFile;

pub mod bfir;
pub mod cli;
pub mod codegen;
pub mod diagnostics;
pub mod driver;
mod error;
pub mod jumptable;
pub mod lexer;
pub mod peephole;
pub mod source;

#[cfg(test)]
mod peephole_tests;
#[cfg(test)]
mod soundness_tests;
