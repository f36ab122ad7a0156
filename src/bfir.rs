//! bfir defines the tree-shaped IR for BF. The root block is the
//! whole program and every loop owns the block that forms its body.
//!
//! It also provides the builder that turns a validated token stream
//! into that tree.

use self::Instruction::*;
use crate::error::CompileError;
use crate::lexer::{Token, TokenKind};
use std::fmt;
use std::mem;
use tracing::debug;

#[cfg(test)]
use crate::cli::Options;
#[cfg(test)]
use crate::lexer::lex;
#[cfg(test)]
use pretty_assertions::assert_eq;

/// `Instruction` represents a single node in the IR tree.
///
/// `PartialEq`, `Clone` and `Debug` are written by hand so that none of
/// them recurse once per loop level.
pub enum Instruction {
    /// Add `delta` to the current cell.
    Add(isize),
    /// Move the tape pointer by `delta` cells.
    Move(isize),
    Put,
    Get,
    /// Store a constant in the current cell. Never produced by the
    /// builder or the run folder; reserved for idiom recognition such
    /// as turning `[-]` into `Set(0)`.
    Set(isize),
    Loop(Block),
}

/// An ordered run of instructions: a loop body or the whole program.
#[derive(Default)]
pub struct Block {
    instrs: Vec<Instruction>,
}

impl Block {
    pub fn new() -> Self {
        Block { instrs: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Block {
            instrs: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, instr: Instruction) {
        self.instrs.push(instr);
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instrs
    }

    pub fn len(&self) -> usize {
        self.instrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instrs.is_empty()
    }

    /// Take the instructions out, leaving this block empty.
    pub fn take_instructions(&mut self) -> Vec<Instruction> {
        mem::take(&mut self.instrs)
    }

    /// Maximum loop nesting. A block without loops has depth 0.
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut pending = vec![(self, 0)];

        while let Some((block, depth)) = pending.pop() {
            deepest = deepest.max(depth);
            for instr in &block.instrs {
                if let Loop(body) = instr {
                    pending.push((body, depth + 1));
                }
            }
        }

        deepest
    }

    /// Number of non-loop instructions in the whole tree.
    pub fn instruction_count(&self) -> usize {
        let mut count = 0;
        let mut pending = vec![self];

        while let Some(block) = pending.pop() {
            for instr in &block.instrs {
                match instr {
                    Loop(body) => pending.push(body),
                    _ => count += 1,
                }
            }
        }

        count
    }

    /// Number of loops in the whole tree.
    pub fn loop_count(&self) -> usize {
        let mut count = 0;
        let mut pending = vec![self];

        while let Some(block) = pending.pop() {
            for instr in &block.instrs {
                if let Loop(body) = instr {
                    count += 1;
                    pending.push(body);
                }
            }
        }

        count
    }
}

impl From<Vec<Instruction>> for Block {
    fn from(instrs: Vec<Instruction>) -> Self {
        Block { instrs }
    }
}

// Deeply nested programs would otherwise drop one native stack frame
// per loop level.
impl Drop for Block {
    fn drop(&mut self) {
        let mut pending = vec![mem::take(&mut self.instrs)];

        while let Some(mut instrs) = pending.pop() {
            for instr in instrs.drain(..) {
                if let Loop(mut body) = instr {
                    pending.push(body.take_instructions());
                }
            }
        }
    }
}

impl Instruction {
    /// Compare two instructions without looking inside loop bodies.
    fn eq_shallow(&self, other: &Instruction) -> bool {
        match (self, other) {
            (Add(a), Add(b)) | (Move(a), Move(b)) | (Set(a), Set(b)) => a == b,
            (Put, Put) | (Get, Get) | (Loop(_), Loop(_)) => true,
            _ => false,
        }
    }
}

impl PartialEq for Instruction {
    fn eq(&self, other: &Instruction) -> bool {
        match (self, other) {
            (Loop(a), Loop(b)) => a == b,
            _ => self.eq_shallow(other),
        }
    }
}

impl Eq for Instruction {}

impl PartialEq for Block {
    fn eq(&self, other: &Block) -> bool {
        let mut pending = vec![(&self.instrs, &other.instrs)];

        while let Some((left, right)) = pending.pop() {
            if left.len() != right.len() {
                return false;
            }
            for (a, b) in left.iter().zip(right) {
                if !a.eq_shallow(b) {
                    return false;
                }
                if let (Loop(a), Loop(b)) = (a, b) {
                    pending.push((&a.instrs, &b.instrs));
                }
            }
        }

        true
    }
}

impl Eq for Block {}

impl Clone for Instruction {
    fn clone(&self) -> Self {
        match *self {
            Add(delta) => Add(delta),
            Move(delta) => Move(delta),
            Put => Put,
            Get => Get,
            Set(value) => Set(value),
            Loop(ref body) => Loop(body.clone()),
        }
    }
}

impl Clone for Block {
    fn clone(&self) -> Self {
        // (instructions left to copy, copies so far) for every open loop.
        let mut stack = vec![(self.instrs.iter(), Vec::with_capacity(self.len()))];
        let mut cloned = Block::new();

        while let Some((remaining, copied)) = stack.last_mut() {
            match remaining.next() {
                Some(Loop(body)) => stack.push((body.instrs.iter(), Vec::with_capacity(body.len()))),
                Some(instr) => copied.push(instr.clone()),
                None => {
                    let finished = Block::from(mem::take(copied));
                    stack.pop();
                    match stack.last_mut() {
                        Some((_, parent)) => parent.push(Loop(finished)),
                        None => cloned = finished,
                    }
                }
            }
        }

        cloned
    }
}

fn fmt_with_indent(instrs: &[Instruction], f: &mut fmt::Formatter) -> fmt::Result {
    // (remaining instructions, indent) for every open loop.
    let mut stack = vec![(instrs.iter(), 0)];

    while let Some((iter, indent)) = stack.last_mut() {
        let indent = *indent;
        match iter.next() {
            Some(Loop(body)) => {
                writeln!(f, "{:width$}Loop", "", width = indent * 2)?;
                stack.push((body.instrs.iter(), indent + 1));
            }
            Some(instr) => {
                write!(f, "{:width$}", "", width = indent * 2)?;
                fmt_leaf(instr, f)?;
                writeln!(f)?;
            }
            None => {
                stack.pop();
            }
        }
    }

    Ok(())
}

fn fmt_leaf(instr: &Instruction, f: &mut fmt::Formatter) -> fmt::Result {
    match *instr {
        Add(delta) => write!(f, "Add({})", delta),
        Move(delta) => write!(f, "Move({})", delta),
        Put => f.write_str("Put"),
        Get => f.write_str("Get"),
        Set(value) => write!(f, "Set({})", value),
        Loop(_) => f.write_str("Loop"),
    }
}

impl fmt::Debug for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Loop(_) => fmt_with_indent(std::slice::from_ref(self), f),
            leaf => fmt_leaf(leaf, f),
        }
    }
}

impl fmt::Debug for Block {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Block")?;
        fmt_with_indent(&self.instrs, f)
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt_with_indent(std::slice::from_ref(self), f)
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt_with_indent(&self.instrs, f)
    }
}

/// Given a bracket-balanced token stream, build the IR tree and return
/// its root block. Run `jumptable::validate` first: unbalanced input is
/// reported as an internal error rather than a located one.
pub fn build(tokens: &[Token]) -> Result<Block, CompileError> {
    // Open blocks, the root at the bottom and the innermost loop body on top.
    let mut stack = vec![Block::new()];

    for token in tokens {
        let current = stack.last_mut().ok_or_else(unbalanced)?;

        match token.kind {
            TokenKind::Increment => current.push(Add(1)),
            TokenKind::Decrement => current.push(Add(-1)),
            TokenKind::MoveLeft => current.push(Move(-1)),
            TokenKind::MoveRight => current.push(Move(1)),
            TokenKind::Input => current.push(Get),
            TokenKind::Output => current.push(Put),
            TokenKind::LoopStart => stack.push(Block::new()),
            TokenKind::LoopEnd => {
                let body = stack.pop().ok_or_else(unbalanced)?;
                stack.last_mut().ok_or_else(unbalanced)?.push(Loop(body));
            }
        }
    }

    if stack.len() != 1 {
        return Err(unbalanced());
    }
    let root = stack.pop().ok_or_else(unbalanced)?;

    debug!(
        instructions = root.instruction_count(),
        depth = root.depth(),
        "built IR"
    );
    Ok(root)
}

fn unbalanced() -> CompileError {
    CompileError::Internal("IR builder given unbalanced brackets".to_owned())
}

#[cfg(test)]
fn build_str(source: &str) -> Result<Block, CompileError> {
    build(&lex(source.as_bytes(), Options::empty()).unwrap())
}

#[test]
fn build_increment() {
    assert_eq!(build_str("+").unwrap(), Block::from(vec![Add(1)]));
    assert_eq!(build_str("++").unwrap(), Block::from(vec![Add(1), Add(1)]));
}

#[test]
fn build_decrement() {
    assert_eq!(build_str("-").unwrap(), Block::from(vec![Add(-1)]));
}

#[test]
fn build_pointer_moves() {
    assert_eq!(build_str("><").unwrap(), Block::from(vec![Move(1), Move(-1)]));
}

#[test]
fn build_read_write() {
    assert_eq!(build_str(",.").unwrap(), Block::from(vec![Get, Put]));
}

#[test]
fn build_empty() {
    let root = build_str("").unwrap();
    assert!(root.is_empty());
    assert_eq!(root.depth(), 0);
}

#[test]
fn build_empty_loop() {
    assert_eq!(
        build_str("[]").unwrap(),
        Block::from(vec![Loop(Block::new())])
    );
}

#[test]
fn build_complex_loop() {
    let expected = Block::from(vec![
        Put,
        Loop(Block::from(vec![Get, Add(1)])),
        Add(-1),
    ]);
    assert_eq!(build_str(".[,+]-").unwrap(), expected);
}

#[test]
fn build_transfer_loop() {
    let expected = Block::from(vec![
        Add(1),
        Add(1),
        Add(1),
        Add(1),
        Loop(Block::from(vec![Add(-1), Move(1), Add(1), Move(-1)])),
    ]);
    assert_eq!(build_str("++++[->+<]").unwrap(), expected);
}

#[test]
fn build_nested_depth() {
    let root = build_str("[[+][[-]]]+").unwrap();
    assert_eq!(root.depth(), 3);
    assert_eq!(root.loop_count(), 4);
    assert_eq!(root.instruction_count(), 3);
}

#[test]
fn build_unbalanced_is_internal_error() {
    use crate::error::ErrorKind;
    assert_eq!(build_str("]").unwrap_err().kind(), ErrorKind::Internal);
    assert_eq!(build_str("[").unwrap_err().kind(), ErrorKind::Internal);
}

#[test]
fn build_and_drop_deep_nesting() {
    let depth = 100_000;
    let source = "[".repeat(depth) + &"]".repeat(depth);
    let root = build_str(&source).unwrap();
    assert_eq!(root.depth(), depth);
    drop(root);
}

#[test]
fn compare_and_clone_deep_nesting() {
    let depth = 200_000;
    let nested = |inner: &str| "[".repeat(depth) + inner + &"]".repeat(depth);

    let left = build_str(&nested("+")).unwrap();
    let right = build_str(&nested("+")).unwrap();
    assert!(left == right);

    let copy = left.clone();
    assert_eq!(copy.depth(), depth);
    assert!(copy == left);

    let different = build_str(&nested("-")).unwrap();
    assert!(different != left);
}

#[test]
fn compare_looks_inside_loops() {
    let a = Block::from(vec![Loop(Block::from(vec![Add(1)])), Put]);
    let b = Block::from(vec![Loop(Block::from(vec![Add(2)])), Put]);
    let c = Block::from(vec![Loop(Block::from(vec![Add(1)]))]);
    assert!(a != b);
    assert!(a != c);
    assert!(a == a.clone());
    assert!(Move(1) != Add(1));
    assert!(Set(0) == Set(0));
}

#[test]
fn debug_is_the_indented_tree() {
    let root = build_str("+[-]").unwrap();
    assert_eq!(format!("{:?}", root), "Block\nAdd(1)\nLoop\n  Add(-1)\n");
    assert_eq!(format!("{:?}", Move(-3)), "Move(-3)");
}

#[test]
fn display_indents_loop_bodies() {
    let root = build_str("+[>[.]]").unwrap();
    assert_eq!(
        root.to_string(),
        "Add(1)\nLoop\n  Move(1)\n  Loop\n    Put\n"
    );
}
