//! Lowering of the optimized IR tree into target assembly.
//!
//! Each target architecture implements [`Backend`]; the walk over the
//! tree and the loop/label scheme are shared.

mod aarch64;
mod x86_64;

use crate::bfir::{Block, Instruction};
use crate::error::CompileError;
use std::fmt;
use std::fmt::Write;
use std::slice;
use tracing::debug;

#[cfg(test)]
use crate::bfir::Instruction::*;
#[cfg(test)]
use pretty_assertions::assert_eq;

/// Number of cells in the zero-initialised tape.
pub const TAPE_SIZE: usize = 30_000;

const INITIAL_CAPACITY: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arch {
    X86_64,
    I386,
    Aarch64,
    Arm32,
}

impl Arch {
    /// The architecture this compiler was built for.
    pub fn host() -> Result<Arch, CompileError> {
        if cfg!(target_arch = "x86_64") {
            Ok(Arch::X86_64)
        } else if cfg!(target_arch = "x86") {
            Ok(Arch::I386)
        } else if cfg!(target_arch = "aarch64") {
            Ok(Arch::Aarch64)
        } else if cfg!(target_arch = "arm") {
            Ok(Arch::Arm32)
        } else {
            Err(CompileError::Internal("Unknown architecture!".to_owned()))
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Arch::X86_64 => "x86_64",
            Arch::I386 => "i386",
            Arch::Aarch64 => "aarch64",
            Arch::Arm32 => "arm32",
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Generated assembly for one program.
#[derive(Debug, Clone)]
pub struct AssemblyProgram {
    arch: Arch,
    text: String,
    next_label: usize,
    op_count: usize,
}

impl AssemblyProgram {
    pub fn new(arch: Arch) -> Result<Self, CompileError> {
        let mut text = String::new();
        text.try_reserve(INITIAL_CAPACITY)?;
        Ok(AssemblyProgram {
            arch,
            text,
            next_label: 0,
            op_count: 0,
        })
    }

    pub fn arch(&self) -> Arch {
        self.arch
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn into_text(self) -> String {
        self.text
    }

    /// How many labels have been handed out so far.
    pub fn label_count(&self) -> usize {
        self.next_label
    }

    /// How many IR instructions were lowered, loops included.
    pub fn op_count(&self) -> usize {
        self.op_count
    }

    /// A label no other call on this program returns.
    pub fn fresh_label(&mut self) -> String {
        let label = format!(".Lbf{}", self.next_label);
        self.next_label += 1;
        label
    }

    /// Append one line of assembly.
    pub fn line(&mut self, line: impl fmt::Display) {
        // Writing into a String cannot fail.
        let _ = writeln!(self.text, "{}", line);
    }

    /// Append an indented instruction.
    pub fn instr(&mut self, instr: impl fmt::Display) {
        let _ = writeln!(self.text, "    {}", instr);
    }
}

/// The operations a target must provide to lower the IR.
pub trait Backend {
    fn emit_header(&self, program: &mut AssemblyProgram);
    fn emit_data_section(&self, program: &mut AssemblyProgram);
    /// The entry symbol, including setup of the tape pointer.
    fn emit_symbol(&self, program: &mut AssemblyProgram);
    /// Exit the process successfully.
    fn emit_end(&self, program: &mut AssemblyProgram);

    fn emit_op_add(&self, program: &mut AssemblyProgram, imm: isize);
    fn emit_op_move(&self, program: &mut AssemblyProgram, imm: isize);
    fn emit_op_get(&self, program: &mut AssemblyProgram);
    fn emit_op_put(&self, program: &mut AssemblyProgram);
    fn emit_op_set(&self, program: &mut AssemblyProgram, imm: isize);

    /// Jump to `label` when the current cell is zero.
    fn emit_loop_test_zero(&self, program: &mut AssemblyProgram, label: &str);
    /// Jump to `label` when the current cell is not zero.
    fn emit_loop_test_nonzero(&self, program: &mut AssemblyProgram, label: &str);

    fn emit_label(&self, program: &mut AssemblyProgram, label: &str) {
        program.line(format_args!("{}:", label));
    }
}

/// The backend for `arch`, if there is one.
pub fn backend_for(arch: Arch) -> Result<&'static dyn Backend, CompileError> {
    match arch {
        Arch::X86_64 => Ok(&x86_64::X86_64),
        Arch::Aarch64 => Ok(&aarch64::Aarch64),
        Arch::I386 | Arch::Arm32 => Err(CompileError::Internal(format!(
            "{} generation not supported yet!",
            arch
        ))),
    }
}

/// Cells are bytes, so every add is modulo 256.
pub(crate) fn wrap_cell(imm: isize) -> u8 {
    imm.rem_euclid(256) as u8
}

/// Lower `root` to a complete assembly program for `arch`.
pub fn codegen(root: &Block, arch: Arch) -> Result<AssemblyProgram, CompileError> {
    let backend = backend_for(arch)?;
    let mut program = AssemblyProgram::new(arch)?;

    backend.emit_header(&mut program);
    backend.emit_data_section(&mut program);
    backend.emit_symbol(&mut program);
    emit_block(backend, &mut program, root);
    backend.emit_end(&mut program);

    debug!(
        %arch,
        ops = program.op_count(),
        labels = program.label_count(),
        bytes = program.text().len(),
        "generated assembly"
    );
    Ok(program)
}

/// An open loop: the rest of its body and the labels to close it with.
struct OpenLoop<'a> {
    remaining: slice::Iter<'a, Instruction>,
    labels: Option<(String, String)>,
}

fn emit_block(backend: &dyn Backend, program: &mut AssemblyProgram, root: &Block) {
    let mut stack = vec![OpenLoop {
        remaining: root.instructions().iter(),
        labels: None,
    }];

    while let Some(open) = stack.last_mut() {
        let instr = match open.remaining.next() {
            Some(instr) => instr,
            None => {
                if let Some((start, end)) = open.labels.take() {
                    backend.emit_loop_test_nonzero(program, &start);
                    backend.emit_label(program, &end);
                }
                stack.pop();
                continue;
            }
        };

        program.op_count += 1;
        match *instr {
            Instruction::Add(imm) => backend.emit_op_add(program, imm),
            Instruction::Move(imm) => backend.emit_op_move(program, imm),
            Instruction::Get => backend.emit_op_get(program),
            Instruction::Put => backend.emit_op_put(program),
            Instruction::Set(imm) => backend.emit_op_set(program, imm),
            Instruction::Loop(ref body) => {
                let start = program.fresh_label();
                let end = program.fresh_label();

                backend.emit_loop_test_zero(program, &end);
                backend.emit_label(program, &start);
                stack.push(OpenLoop {
                    remaining: body.instructions().iter(),
                    labels: Some((start, end)),
                });
            }
        }
    }
}

#[test]
fn unsupported_targets_fail_fast() {
    for arch in [Arch::I386, Arch::Arm32] {
        let err = codegen(&Block::new(), arch).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Internal);
        assert_eq!(
            err.to_string(),
            format!("{} generation not supported yet!", arch)
        );
    }
}

#[test]
fn empty_program_lowers_no_ops() {
    let program = codegen(&Block::new(), Arch::X86_64).unwrap();
    assert_eq!(program.op_count(), 0);
    assert_eq!(program.label_count(), 0);
    assert!(program.text().contains("_start:"));
}

#[test]
fn labels_are_unique_per_loop() {
    let root = Block::from(vec![
        Loop(Block::from(vec![Loop(Block::new())])),
        Loop(Block::new()),
    ]);
    let program = codegen(&root, Arch::Aarch64).unwrap();
    assert_eq!(program.label_count(), 6);
    for n in 0..6 {
        let definition = format!(".Lbf{}:\n", n);
        assert_eq!(program.text().matches(&definition).count(), 1);
    }
}

#[test]
fn loop_shape() {
    let root = Block::from(vec![Loop(Block::from(vec![Add(-1)]))]);
    let program = codegen(&root, Arch::X86_64).unwrap();
    let text = program.text();

    let test_zero = text.find("je .Lbf1").unwrap();
    let start = text.find(".Lbf0:").unwrap();
    let body = text.find("sub byte ptr [rbx], 1").unwrap();
    let back_edge = text.find("jne .Lbf0").unwrap();
    let end = text.find(".Lbf1:").unwrap();
    assert!(test_zero < start && start < body && body < back_edge && back_edge < end);
    assert_eq!(program.op_count(), 2);
}

#[test]
fn cells_wrap() {
    assert_eq!(wrap_cell(1), 1);
    assert_eq!(wrap_cell(-1), 255);
    assert_eq!(wrap_cell(256), 0);
    assert_eq!(wrap_cell(-257), 255);
}

#[test]
fn deep_nesting_lowers_without_recursion() {
    let depth = 20_000;
    let mut root = Block::new();
    for _ in 0..depth {
        root = Block::from(vec![Loop(root)]);
    }
    let program = codegen(&root, Arch::X86_64).unwrap();
    assert_eq!(program.label_count(), depth * 2);
}
