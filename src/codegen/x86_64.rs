//! 64-bit x86, GNU assembler in Intel syntax, Linux system calls.
//!
//! `rbx` holds the address of the current cell for the whole program.

use super::{wrap_cell, AssemblyProgram, Backend, TAPE_SIZE};

#[cfg(test)]
use crate::bfir::Block;
#[cfg(test)]
use crate::bfir::Instruction::*;
#[cfg(test)]
use crate::codegen::{codegen, Arch};
#[cfg(test)]
use pretty_assertions::assert_eq;

const SYS_READ: u32 = 0;
const SYS_WRITE: u32 = 1;
const SYS_EXIT: u32 = 60;

pub struct X86_64;

impl X86_64 {
    fn syscall_on_cell(&self, program: &mut AssemblyProgram, number: u32, fd: u32) {
        program.instr(format_args!("mov eax, {}", number));
        program.instr(format_args!("mov edi, {}", fd));
        program.instr("mov rsi, rbx");
        program.instr("mov edx, 1");
        program.instr("syscall");
    }
}

impl Backend for X86_64 {
    fn emit_header(&self, program: &mut AssemblyProgram) {
        program.instr(".intel_syntax noprefix");
        // Keep the stack non-executable when linked.
        program.instr(".section .note.GNU-stack,\"\",@progbits");
    }

    fn emit_data_section(&self, program: &mut AssemblyProgram) {
        program.instr(".bss");
        program.instr(".p2align 4");
        program.line("tape:");
        program.instr(format_args!(".zero {}", TAPE_SIZE));
    }

    fn emit_symbol(&self, program: &mut AssemblyProgram) {
        program.instr(".text");
        program.instr(".globl _start");
        program.line("_start:");
        program.instr("lea rbx, [rip + tape]");
    }

    fn emit_end(&self, program: &mut AssemblyProgram) {
        program.instr(format_args!("mov eax, {}", SYS_EXIT));
        program.instr("xor edi, edi");
        program.instr("syscall");
    }

    fn emit_op_add(&self, program: &mut AssemblyProgram, imm: isize) {
        match wrap_cell(imm) {
            0 => {}
            n if n <= 128 => program.instr(format_args!("add byte ptr [rbx], {}", n)),
            n => program.instr(format_args!("sub byte ptr [rbx], {}", 256 - u32::from(n))),
        }
    }

    fn emit_op_move(&self, program: &mut AssemblyProgram, imm: isize) {
        if i32::try_from(imm).is_ok() {
            program.instr(format_args!("add rbx, {}", imm));
        } else {
            program.instr(format_args!("movabs rax, {}", imm));
            program.instr("add rbx, rax");
        }
    }

    fn emit_op_get(&self, program: &mut AssemblyProgram) {
        self.syscall_on_cell(program, SYS_READ, 0);
    }

    fn emit_op_put(&self, program: &mut AssemblyProgram) {
        self.syscall_on_cell(program, SYS_WRITE, 1);
    }

    fn emit_op_set(&self, program: &mut AssemblyProgram, imm: isize) {
        program.instr(format_args!("mov byte ptr [rbx], {}", wrap_cell(imm)));
    }

    fn emit_loop_test_zero(&self, program: &mut AssemblyProgram, label: &str) {
        program.instr("cmp byte ptr [rbx], 0");
        program.instr(format_args!("je {}", label));
    }

    fn emit_loop_test_nonzero(&self, program: &mut AssemblyProgram, label: &str) {
        program.instr("cmp byte ptr [rbx], 0");
        program.instr(format_args!("jne {}", label));
    }
}

#[cfg(test)]
fn body_of(root: Block) -> String {
    let text = codegen(&root, Arch::X86_64).unwrap().into_text();
    let start = text.find("lea rbx, [rip + tape]\n").unwrap() + "lea rbx, [rip + tape]\n".len();
    let end = text.rfind("    mov eax, 60\n").unwrap();
    text[start..end].to_owned()
}

#[test]
fn lowers_straight_line_code() {
    let root = Block::from(vec![Add(3), Move(-2), Add(-3), Set(0), Add(300)]);
    assert_eq!(
        body_of(root),
        "    add byte ptr [rbx], 3\n\
         \x20   add rbx, -2\n\
         \x20   sub byte ptr [rbx], 3\n\
         \x20   mov byte ptr [rbx], 0\n\
         \x20   add byte ptr [rbx], 44\n"
    );
}

#[test]
fn lowers_io() {
    let root = Block::from(vec![Get, Put]);
    assert_eq!(
        body_of(root),
        "    mov eax, 0\n    mov edi, 0\n    mov rsi, rbx\n    mov edx, 1\n    syscall\n\
         \x20   mov eax, 1\n    mov edi, 1\n    mov rsi, rbx\n    mov edx, 1\n    syscall\n"
    );
}

#[test]
#[cfg(target_pointer_width = "64")]
fn lowers_large_moves() {
    let root = Block::from(vec![Move(1 << 40)]);
    assert_eq!(
        body_of(root),
        "    movabs rax, 1099511627776\n    add rbx, rax\n"
    );
}

#[test]
fn frames_the_program() {
    let text = codegen(&Block::new(), Arch::X86_64).unwrap().into_text();
    assert_eq!(
        text,
        "    .intel_syntax noprefix\n\
         \x20   .section .note.GNU-stack,\"\",@progbits\n\
         \x20   .bss\n\
         \x20   .p2align 4\n\
         tape:\n\
         \x20   .zero 30000\n\
         \x20   .text\n\
         \x20   .globl _start\n\
         _start:\n\
         \x20   lea rbx, [rip + tape]\n\
         \x20   mov eax, 60\n\
         \x20   xor edi, edi\n\
         \x20   syscall\n"
    );
}
