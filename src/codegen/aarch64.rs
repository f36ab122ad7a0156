//! 64-bit ARM, GNU assembler, Linux system calls.
//!
//! `x19` is the cell pointer (callee-saved, so it survives `svc`), `w9`
//! and `x9` are scratch.

use super::{wrap_cell, AssemblyProgram, Backend, TAPE_SIZE};

#[cfg(test)]
use crate::bfir::Block;
#[cfg(test)]
use crate::bfir::Instruction::*;
#[cfg(test)]
use crate::codegen::{codegen, Arch};
#[cfg(test)]
use pretty_assertions::assert_eq;

const SYS_READ: u32 = 63;
const SYS_WRITE: u32 = 64;
const SYS_EXIT: u32 = 93;

/// Largest immediate an `add`/`sub` can encode without a shift.
const MAX_ADD_IMM: isize = 4095;

pub struct Aarch64;

impl Aarch64 {
    fn syscall_on_cell(&self, program: &mut AssemblyProgram, number: u32, fd: u32) {
        program.instr(format_args!("mov x0, #{}", fd));
        program.instr("mov x1, x19");
        program.instr("mov x2, #1");
        program.instr(format_args!("mov x8, #{}", number));
        program.instr("svc #0");
    }
}

impl Backend for Aarch64 {
    fn emit_header(&self, program: &mut AssemblyProgram) {
        program.line("// bfc output for aarch64-linux");
        // Keep the stack non-executable when linked.
        program.instr(".section .note.GNU-stack,\"\",%progbits");
    }

    fn emit_data_section(&self, program: &mut AssemblyProgram) {
        program.instr(".bss");
        program.instr(".balign 16");
        program.line("tape:");
        program.instr(format_args!(".zero {}", TAPE_SIZE));
    }

    fn emit_symbol(&self, program: &mut AssemblyProgram) {
        program.instr(".text");
        program.instr(".globl _start");
        program.line("_start:");
        program.instr("adrp x19, tape");
        program.instr("add x19, x19, :lo12:tape");
    }

    fn emit_end(&self, program: &mut AssemblyProgram) {
        program.instr("mov x0, #0");
        program.instr(format_args!("mov x8, #{}", SYS_EXIT));
        program.instr("svc #0");
        // Literal pool for any `ldr xN, =imm` above.
        program.instr(".ltorg");
    }

    fn emit_op_add(&self, program: &mut AssemblyProgram, imm: isize) {
        let n = wrap_cell(imm);
        if n == 0 {
            return;
        }
        program.instr("ldrb w9, [x19]");
        program.instr(format_args!("add w9, w9, #{}", n));
        program.instr("strb w9, [x19]");
    }

    fn emit_op_move(&self, program: &mut AssemblyProgram, imm: isize) {
        if (0..=MAX_ADD_IMM).contains(&imm) {
            program.instr(format_args!("add x19, x19, #{}", imm));
        } else if (-MAX_ADD_IMM..0).contains(&imm) {
            program.instr(format_args!("sub x19, x19, #{}", -imm));
        } else {
            program.instr(format_args!("ldr x9, ={}", imm));
            program.instr("add x19, x19, x9");
        }
    }

    fn emit_op_get(&self, program: &mut AssemblyProgram) {
        self.syscall_on_cell(program, SYS_READ, 0);
    }

    fn emit_op_put(&self, program: &mut AssemblyProgram) {
        self.syscall_on_cell(program, SYS_WRITE, 1);
    }

    fn emit_op_set(&self, program: &mut AssemblyProgram, imm: isize) {
        program.instr(format_args!("mov w9, #{}", wrap_cell(imm)));
        program.instr("strb w9, [x19]");
    }

    fn emit_loop_test_zero(&self, program: &mut AssemblyProgram, label: &str) {
        program.instr("ldrb w9, [x19]");
        program.instr(format_args!("cbz w9, {}", label));
    }

    fn emit_loop_test_nonzero(&self, program: &mut AssemblyProgram, label: &str) {
        program.instr("ldrb w9, [x19]");
        program.instr(format_args!("cbnz w9, {}", label));
    }
}

/// The lines between the prologue and the exit sequence.
#[cfg(test)]
fn lower(root: Block) -> Vec<String> {
    let text = codegen(&root, Arch::Aarch64).unwrap().into_text();
    let mut lines: Vec<String> = text
        .lines()
        .skip_while(|l| !l.contains(":lo12:tape"))
        .skip(1)
        .take_while(|l| !l.contains("mov x8, #93"))
        .map(|l| l.trim().to_owned())
        .collect();
    // `mov x0, #0`, the exit status.
    assert_eq!(lines.pop().as_deref(), Some("mov x0, #0"));
    lines
}

#[test]
fn lowers_adds_modulo_256() {
    assert_eq!(
        lower(Block::from(vec![Add(-1), Add(512)])),
        vec!["ldrb w9, [x19]", "add w9, w9, #255", "strb w9, [x19]"]
    );
}

#[test]
fn lowers_moves() {
    assert_eq!(
        lower(Block::from(vec![Move(4), Move(-4095), Move(5000)])),
        vec![
            "add x19, x19, #4",
            "sub x19, x19, #4095",
            "ldr x9, =5000",
            "add x19, x19, x9",
        ]
    );
}

#[test]
fn lowers_loop() {
    let root = Block::from(vec![Loop(Block::from(vec![Set(0), Put]))]);
    assert_eq!(
        lower(root),
        vec![
            "ldrb w9, [x19]",
            "cbz w9, .Lbf1",
            ".Lbf0:",
            "mov w9, #0",
            "strb w9, [x19]",
            "mov x0, #1",
            "mov x1, x19",
            "mov x2, #1",
            "mov x8, #64",
            "svc #0",
            "ldrb w9, [x19]",
            "cbnz w9, .Lbf0",
            ".Lbf1:",
        ]
    );
}

#[test]
fn lowers_nothing_for_empty_program() {
    assert!(lower(Block::new()).is_empty());
    assert!(lower(Block::from(vec![Add(256)])).is_empty());
}

#[test]
fn marks_stack_non_executable() {
    let text = codegen(&Block::new(), Arch::Aarch64).unwrap().into_text();
    let mut lines = text.lines().map(str::trim);
    assert_eq!(lines.next(), Some("// bfc output for aarch64-linux"));
    assert_eq!(lines.next(), Some(".section .note.GNU-stack,\"\",%progbits"));
}
