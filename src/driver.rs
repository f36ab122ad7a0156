//! Runs the stages in order for one source file.

use crate::bfir;
use crate::cli::{self, Args, Invocation, Options};
use crate::codegen::{self, Arch, AssemblyProgram};
use crate::diagnostics;
use crate::error::CompileError;
use crate::jumptable;
use crate::lexer;
use crate::peephole;
use crate::source::SourceFile;
use std::ffi::OsString;
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::{debug, info_span, warn};

#[cfg(test)]
use crate::error::ErrorKind;
#[cfg(test)]
use pretty_assertions::assert_eq;

/// Compile `source` down to assembly for `arch`, stopping at the first
/// error.
pub fn compile(source: &[u8], options: Options, arch: Arch) -> Result<AssemblyProgram, CompileError> {
    let root = {
        let tokens = lexer::lex(source, options)?;
        // Only the diagnostics need the table; the builder finds the
        // nesting on its own.
        jumptable::validate(&tokens)?;
        bfir::build(&tokens)?
    };

    let root = peephole::optimize(root);
    debug!("optimized IR:\n{}", root);

    codegen::codegen(&root, arch)
}

/// Run the compiler as a command, returning the process exit status.
pub fn run<I, T>(args: I) -> i32
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let args = match cli::parse_args(args) {
        Ok(Invocation::Help(usage)) => {
            print!("{}", usage);
            return 0;
        }
        Ok(Invocation::Compile(args)) => args,
        Err(e) => {
            diagnostics::report(&e, None);
            return 1;
        }
    };

    let source = match SourceFile::open(&args.input) {
        Ok(source) => source,
        Err(e) => {
            diagnostics::report(&e, None);
            return 1;
        }
    };

    match compile_file(&source, &args) {
        Ok(()) => 0,
        Err(e) => {
            diagnostics::report(&e, Some(&source));
            1
        }
    }
}

fn compile_file(source: &SourceFile, args: &Args) -> Result<(), CompileError> {
    let _span = info_span!("compile", file = %source.path().display()).entered();

    let options = args.options();
    let program = compile(source.bytes(), options, Arch::host()?)?;

    write_outputs(&program, &args.outputs, options, &mut io::stdout().lock())
}

/// Write the assembly to every path in `outputs`. With no paths it goes
/// to `stdout` under `-S`, and is otherwise discarded.
fn write_outputs<W: Write>(
    program: &AssemblyProgram,
    outputs: &[PathBuf],
    options: Options,
    stdout: &mut W,
) -> Result<(), CompileError> {
    if !outputs.is_empty() {
        for output in outputs {
            fs::write(output, program.text()).map_err(|e| {
                CompileError::io(
                    format!("Unable to write to file '{}'!", output.display()),
                    e,
                )
            })?;
            debug!(output = %output.display(), "wrote assembly");
        }
    } else if options.contains(Options::COMPILE_ONLY) {
        stdout
            .write_all(program.text().as_bytes())
            .and_then(|()| stdout.flush())
            .map_err(|e| CompileError::io("Unable to write to stdout!", e))?;
    } else {
        warn!("no output file given, assembly discarded");
    }

    Ok(())
}

#[test]
fn empty_source_compiles() {
    let program = compile(b"", Options::empty(), Arch::X86_64).unwrap();
    assert_eq!(program.op_count(), 0);
}

#[test]
fn transfer_loop_compiles() {
    let program = compile(b"++++[->+<]", Options::empty(), Arch::Aarch64).unwrap();
    // Add(4), Loop, and four ops in the body.
    assert_eq!(program.op_count(), 6);
    assert_eq!(program.label_count(), 2);
}

#[test]
fn bracket_errors_stop_the_pipeline() {
    let err = compile(b"+\n[[]", Options::empty(), Arch::X86_64).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnterminatedLoop);
    assert_eq!(err.location().map(|l| (l.line, l.col)), Some((2, 1)));

    // Validation runs before the backend is picked.
    let err = compile(b"]", Options::empty(), Arch::I386).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ExtraClosingBracket);
}

#[test]
fn comments_can_hide_brackets() {
    assert!(compile(b"+ ; ]\n", Options::empty(), Arch::X86_64).is_ok());
    let err = compile(b"+ ; ]\n", Options::NO_COMMENTS, Arch::X86_64).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ExtraClosingBracket);
}

#[test]
fn unsupported_arch() {
    let err = compile(b"+", Options::empty(), Arch::Arm32).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Internal);
}

#[cfg(test)]
fn scratch_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("bfc-driver-{}-{}", std::process::id(), name))
}

#[test]
fn outputs_go_to_every_path() {
    let program = compile(b"+.", Options::empty(), Arch::X86_64).unwrap();
    let outputs = vec![scratch_path("a.s"), scratch_path("b.s")];
    let mut stdout: Vec<u8> = vec![];

    write_outputs(&program, &outputs, Options::COMPILE_ONLY, &mut stdout).unwrap();

    for output in &outputs {
        assert_eq!(fs::read_to_string(output).unwrap(), program.text());
        fs::remove_file(output).unwrap();
    }
    assert!(stdout.is_empty());
}

#[test]
fn compile_only_without_outputs_writes_stdout() {
    let program = compile(b"+.", Options::COMPILE_ONLY, Arch::X86_64).unwrap();
    let mut stdout: Vec<u8> = vec![];

    write_outputs(&program, &[], Options::COMPILE_ONLY, &mut stdout).unwrap();

    assert_eq!(String::from_utf8(stdout).unwrap(), program.text());
}

#[test]
fn no_outputs_discards_assembly() {
    let program = compile(b"+.", Options::empty(), Arch::X86_64).unwrap();
    let mut stdout: Vec<u8> = vec![];

    write_outputs(&program, &[], Options::empty(), &mut stdout).unwrap();

    assert!(stdout.is_empty());
}

#[test]
fn unwritable_output_is_an_io_error() {
    let program = compile(b"", Options::empty(), Arch::X86_64).unwrap();
    let missing_dir = scratch_path("missing").join("out.s");
    let mut stdout: Vec<u8> = vec![];

    let err = write_outputs(&program, &[missing_dir], Options::empty(), &mut stdout).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Io);
    assert!(err.to_string().contains("out.s"), "{}", err);
}
