//! Optimisations that replace parts of the IR tree with equivalent
//! instructions that are cheaper to execute.
//!
//! The only rewrite is run folding: a maximal run of `Add`s (or of
//! `Move`s) becomes a single instruction carrying the summed delta, and
//! a run that sums to zero disappears. `Get`, `Put`, `Set` and `Loop`
//! end a run and are never reordered.

use crate::bfir::Block;
use crate::bfir::Instruction::{self, *};
use std::mem;
use std::vec;
use tracing::{debug, Level};

/// A block whose loop bodies are still being folded.
struct Frame {
    remaining: vec::IntoIter<Instruction>,
    folded: Vec<Instruction>,
}

impl Frame {
    fn new(mut block: Block) -> Self {
        let instrs = block.take_instructions();
        Frame {
            folded: Vec::with_capacity(instrs.len()),
            remaining: instrs.into_iter(),
        }
    }
}

/// Fold every run in `root`, innermost loop bodies first.
///
/// Walks the tree with an explicit stack, so nesting depth does not
/// consume native stack. The result is a fixed point: optimising it
/// again changes nothing.
pub fn optimize(root: Block) -> Block {
    let before = tracing::enabled!(Level::DEBUG).then(|| root.instruction_count());
    let mut stack = vec![Frame::new(root)];
    let mut optimized = Block::new();

    while let Some(frame) = stack.last_mut() {
        match frame.remaining.next() {
            Some(Loop(body)) => stack.push(Frame::new(body)),
            Some(instr) => fold_into(&mut frame.folded, instr),
            None => {
                let finished = Block::from(mem::take(&mut frame.folded));
                stack.pop();
                match stack.last_mut() {
                    Some(parent) => parent.folded.push(Loop(finished)),
                    None => optimized = finished,
                }
            }
        }
    }

    if let Some(before) = before {
        debug!(
            before,
            after = optimized.instruction_count(),
            "folded runs"
        );
    }
    optimized
}

/// Append `instr` to `folded`, merging it into the previous instruction
/// when both are the same delta kind.
///
/// A merged delta of zero removes the instruction, which lets the runs
/// either side of a cancelled run meet: `+><+` folds to `Add(2)`.
///
/// Cells are bytes, so `Add` deltas wrap. `Move` deltas that would
/// overflow are left as separate instructions.
fn fold_into(folded: &mut Vec<Instruction>, instr: Instruction) {
    let merged = match (folded.last_mut(), &instr) {
        (Some(Add(prev)), Add(delta)) => {
            *prev = prev.wrapping_add(*delta);
            Some(*prev)
        }
        (Some(Move(prev)), Move(delta)) => prev.checked_add(*delta).map(|sum| {
            *prev = sum;
            sum
        }),
        _ => None,
    };

    match merged {
        Some(0) => {
            folded.pop();
        }
        Some(_) => {}
        None => match instr {
            Add(0) | Move(0) => {}
            instr => folded.push(instr),
        },
    }
}
