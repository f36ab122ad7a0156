//! Properties that must hold across stages for any input.

use crate::bfir::Instruction::*;
use crate::bfir::{build, Block};
use crate::cli::Options;
use crate::jumptable::validate;
use crate::lexer::{lex, TokenKind};
use crate::peephole::optimize;
use quickcheck::{quickcheck, Arbitrary, Gen};

/// Source text with balanced brackets, sprinkled with inert bytes.
#[derive(Clone, Debug)]
struct BalancedProgram(String);

impl Arbitrary for BalancedProgram {
    fn arbitrary<G: Gen>(g: &mut G) -> Self {
        let choices: Vec<u8> = Arbitrary::arbitrary(g);
        let mut source = String::new();
        let mut depth = 0;

        for choice in choices {
            let c = match choice % 13 {
                0 => '+',
                1 => '-',
                2 => '>',
                3 => '<',
                4 => '.',
                5 => ',',
                6 | 7 => {
                    depth += 1;
                    '['
                }
                8 | 9 if depth > 0 => {
                    depth -= 1;
                    ']'
                }
                8 | 9 => '+',
                10 => '\n',
                11 => 'x',
                _ => ' ',
            };
            source.push(c);
        }
        source.extend(std::iter::repeat(']').take(depth));

        BalancedProgram(source)
    }
}

fn ir(source: &str) -> Block {
    build(&lex(source.as_bytes(), Options::empty()).unwrap()).unwrap()
}

fn max_nesting(source: &str) -> usize {
    let mut depth = 0;
    let mut deepest = 0;
    for c in source.chars() {
        match c {
            '[' => {
                depth += 1;
                deepest = deepest.max(depth);
            }
            ']' => depth -= 1,
            _ => {}
        }
    }
    deepest
}

/// Per block in pre-order: summed cell delta, summed pointer delta and
/// the I/O sequence. Folding must leave all three unchanged.
fn block_effects(root: &Block) -> Vec<(isize, isize, String)> {
    let mut effects = vec![];
    let mut pending = vec![root];

    while let Some(block) = pending.pop() {
        let mut cell = 0;
        let mut pointer = 0;
        let mut io = String::new();
        let mut bodies = vec![];

        for instr in block.instructions() {
            match instr {
                Add(delta) => cell += delta,
                Move(delta) => pointer += delta,
                Get => io.push(','),
                Put => io.push('.'),
                Set(_) => io.push('='),
                Loop(body) => {
                    io.push('[');
                    bodies.push(body);
                }
            }
        }

        effects.push((cell, pointer, io));
        pending.extend(bodies.into_iter().rev());
    }

    effects
}

fn is_folded(root: &Block) -> bool {
    let mut pending = vec![root];

    while let Some(block) = pending.pop() {
        let instrs = block.instructions();
        for instr in instrs {
            match instr {
                Add(0) | Move(0) => return false,
                Loop(body) => pending.push(body),
                _ => {}
            }
        }
        for pair in instrs.windows(2) {
            if let [Add(_), Add(_)] | [Move(_), Move(_)] = pair {
                return false;
            }
        }
    }

    true
}

#[test]
fn lexer_positions_point_at_commands() {
    fn prop(source: Vec<u8>) -> bool {
        let tokens = lex(&source, Options::NO_COMMENTS).unwrap();
        let lines = source.split(|&b| b == b'\n').collect::<Vec<_>>();

        let commands = source
            .iter()
            .filter(|&&b| TokenKind::from_byte(b).is_some())
            .count();

        tokens.len() == commands
            && tokens.iter().all(|t| {
                let byte = lines[t.line - 1][t.col - 1];
                TokenKind::from_byte(byte) == Some(t.kind)
            })
    }
    quickcheck(prop as fn(Vec<u8>) -> bool);
}

#[test]
fn match_table_is_an_involution() {
    fn prop(program: BalancedProgram) -> bool {
        let tokens = lex(program.0.as_bytes(), Options::empty()).unwrap();
        let table = validate(&tokens).unwrap();

        tokens.iter().enumerate().all(|(i, token)| match token.kind {
            TokenKind::LoopStart | TokenKind::LoopEnd => table
                .partner(i)
                .map_or(false, |j| table.partner(j) == Some(i) && tokens[j].kind != token.kind),
            _ => table.partner(i).is_none(),
        })
    }
    quickcheck(prop as fn(BalancedProgram) -> bool);
}

#[test]
fn tree_mirrors_source() {
    fn prop(program: BalancedProgram) -> bool {
        let root = ir(&program.0);
        let commands = program
            .0
            .chars()
            .filter(|c| "+-<>.,".contains(*c))
            .count();

        root.depth() == max_nesting(&program.0)
            && root.instruction_count() == commands
            && root.loop_count() == program.0.matches('[').count()
    }
    quickcheck(prop as fn(BalancedProgram) -> bool);
}

#[test]
fn optimize_is_idempotent() {
    fn prop(program: BalancedProgram) -> bool {
        let once = optimize(ir(&program.0));
        let twice = optimize(once.clone());
        once == twice
    }
    quickcheck(prop as fn(BalancedProgram) -> bool);
}

#[test]
fn optimize_preserves_block_effects() {
    fn prop(program: BalancedProgram) -> bool {
        let root = ir(&program.0);
        let expected = block_effects(&root);
        let optimized = optimize(root);

        block_effects(&optimized) == expected && is_folded(&optimized)
    }
    quickcheck(prop as fn(BalancedProgram) -> bool);
}

#[test]
fn optimize_never_grows() {
    fn prop(program: BalancedProgram) -> bool {
        let root = ir(&program.0);
        let before = root.instruction_count();
        let depth = root.depth();
        let optimized = optimize(root);
        optimized.instruction_count() <= before && optimized.depth() == depth
    }
    quickcheck(prop as fn(BalancedProgram) -> bool);
}
