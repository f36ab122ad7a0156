//! Command line arguments and the option flags derived from them.

use crate::error::CompileError;
use bitflags::bitflags;
use clap::error::ErrorKind as ClapErrorKind;
use clap::Parser;
use std::ffi::OsString;
use std::path::PathBuf;

#[cfg(test)]
use crate::error::ErrorKind;
#[cfg(test)]
use pretty_assertions::assert_eq;

bitflags! {
    /// Switches that change how a program is compiled.
    #[derive(Default)]
    pub struct Options: u8 {
        /// Treat `;` as an ordinary inert byte instead of a line comment.
        const NO_COMMENTS = 0b0000_0001;
        /// Stop once assembly has been generated.
        const COMPILE_ONLY = 0b0000_0010;
    }
}

#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(
    name = "bfc",
    about = "OVERVIEW: bfc Brainfuck compiler",
    override_usage = "bfc [options] <file.bf>",
    disable_version_flag = true
)]
pub struct Args {
    /// Source file to compile
    #[arg(value_name = "file.bf")]
    pub input: PathBuf,

    /// Write output to <file>
    #[arg(short = 'o', value_name = "file")]
    pub outputs: Vec<PathBuf>,

    /// Only run compilation steps
    #[arg(short = 'S')]
    pub compile_only: bool,

    /// Do not treat text after ';' as a comment (for compatibility)
    #[arg(long = "fno-comments")]
    pub no_comments: bool,
}

impl Args {
    pub fn options(&self) -> Options {
        let mut options = Options::empty();
        options.set(Options::NO_COMMENTS, self.no_comments);
        options.set(Options::COMPILE_ONLY, self.compile_only);
        options
    }
}

/// What the user asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    /// `-h` / `--help`: the rendered usage text.
    Help(String),
    Compile(Args),
}

/// Parse a full argument list, program name first.
///
/// Help is recognised before anything else is validated, so `bfc -h`
/// works without an input path.
pub fn parse_args<I, T>(args: I) -> Result<Invocation, CompileError>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    match Args::try_parse_from(args) {
        Ok(args) => Ok(Invocation::Compile(args)),
        Err(e) if e.kind() == ClapErrorKind::DisplayHelp => Ok(Invocation::Help(e.to_string())),
        Err(e) => {
            let rendered = e.to_string();
            let message = rendered
                .lines()
                .next()
                .unwrap_or_default()
                .trim_start_matches("error: ")
                .to_owned();
            Err(CompileError::Args(message))
        }
    }
}

#[cfg(test)]
fn compile_args(args: &[&str]) -> Args {
    match parse_args(args.iter().copied()) {
        Ok(Invocation::Compile(args)) => args,
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn input_only() {
    let args = compile_args(&["bfc", "hello.bf"]);
    assert_eq!(args.input, PathBuf::from("hello.bf"));
    assert!(args.outputs.is_empty());
    assert_eq!(args.options(), Options::empty());
}

#[test]
fn all_flags() {
    let args = compile_args(&["bfc", "-o", "a.s", "--fno-comments", "x.bf", "-S", "-o", "b.s"]);
    assert_eq!(args.input, PathBuf::from("x.bf"));
    assert_eq!(
        args.outputs,
        vec![PathBuf::from("a.s"), PathBuf::from("b.s")]
    );
    assert_eq!(args.options(), Options::NO_COMMENTS | Options::COMPILE_ONLY);
}

#[test]
fn help_wins() {
    for flag in ["-h", "--help"] {
        match parse_args(["bfc", flag]) {
            Ok(Invocation::Help(text)) => assert!(text.contains("--fno-comments")),
            other => panic!("unexpected {:?}", other),
        }
    }
}

#[test]
fn unknown_flag_is_named() {
    let err = parse_args(["bfc", "-z", "x.bf"]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Args);
    assert!(err.to_string().contains("-z"), "{}", err);
}

#[test]
fn missing_input() {
    let err = parse_args(["bfc"]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Args);
}

#[test]
fn duplicate_input() {
    let err = parse_args(["bfc", "a.bf", "b.bf"]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Args);
    assert!(err.to_string().contains("b.bf"), "{}", err);
}

#[test]
fn output_needs_a_value() {
    let err = parse_args(["bfc", "a.bf", "-o"]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Args);
}
