use crate::bfir::Instruction::*;
use crate::bfir::{build, Block};
use crate::cli::Options;
use crate::lexer::lex;
use crate::peephole::optimize;
use pretty_assertions::assert_eq;

fn optimize_str(source: &str) -> Block {
    let tokens = lex(source.as_bytes(), Options::empty()).unwrap();
    optimize(build(&tokens).unwrap())
}

#[test]
fn combine_increments() {
    assert_eq!(optimize_str("+++"), Block::from(vec![Add(3)]));
}

#[test]
fn combine_mixed_increments() {
    assert_eq!(optimize_str("+-+"), Block::from(vec![Add(1)]));
    assert_eq!(optimize_str("---+"), Block::from(vec![Add(-2)]));
}

#[test]
fn combine_pointer_moves() {
    assert_eq!(optimize_str(">>><"), Block::from(vec![Move(2)]));
}

#[test]
fn cancelled_moves_vanish() {
    assert_eq!(optimize_str("><"), Block::new());
    assert_eq!(optimize_str("<><>><"), Block::new());
}

#[test]
fn cancelled_increments_vanish() {
    assert_eq!(optimize_str(".+-."), Block::from(vec![Put, Put]));
}

#[test]
fn runs_either_side_of_a_cancelled_run_meet() {
    assert_eq!(optimize_str("+><+"), Block::from(vec![Add(2)]));
    assert_eq!(optimize_str("+><-"), Block::new());
}

#[test]
fn add_does_not_extend_move_run() {
    assert_eq!(
        optimize_str("++>>+"),
        Block::from(vec![Add(2), Move(2), Add(1)])
    );
}

#[test]
fn io_ends_a_run() {
    assert_eq!(
        optimize_str("+.+,+"),
        Block::from(vec![Add(1), Put, Add(1), Get, Add(1)])
    );
}

#[test]
fn loop_ends_a_run() {
    assert_eq!(
        optimize_str("+[]+"),
        Block::from(vec![Add(1), Loop(Block::new()), Add(1)])
    );
}

#[test]
fn optimize_empty() {
    assert_eq!(optimize(Block::new()), Block::new());
}

#[test]
fn optimize_transfer_loop() {
    let expected = Block::from(vec![
        Add(4),
        Loop(Block::from(vec![Add(-1), Move(1), Add(1), Move(-1)])),
    ]);
    assert_eq!(optimize_str("++++[->+<]"), expected);
}

#[test]
fn optimize_nested_loop_bodies() {
    let expected = Block::from(vec![Loop(Block::from(vec![
        Move(3),
        Loop(Block::from(vec![Add(-2)])),
        Move(-3),
    ]))]);
    assert_eq!(optimize_str("[>>>[--]<<<]"), expected);
}

#[test]
fn loop_emptied_by_folding_is_kept() {
    assert_eq!(
        optimize_str("[+-]"),
        Block::from(vec![Loop(Block::new())])
    );
}

#[test]
fn set_is_passed_through() {
    let block = Block::from(vec![Set(0), Set(0), Add(1), Set(5)]);
    assert_eq!(
        optimize(block),
        Block::from(vec![Set(0), Set(0), Add(1), Set(5)])
    );
}

#[test]
fn optimize_deep_nesting() {
    let depth = 50_000;
    let source = "[+".repeat(depth) + &"]".repeat(depth);
    let optimized = optimize_str(&source);
    assert_eq!(optimized.depth(), depth);
    assert_eq!(optimized.instruction_count(), depth);
}

#[test]
fn should_be_idempotent() {
    let source = "+><+[->>+<<]>>[-<+>]<<,.[[-]+>-<]";
    let once = optimize_str(source);
    let twice = optimize(once.clone());
    assert_eq!(once, twice);
}

#[test]
fn increments_wrap_on_overflow() {
    let once = optimize(Block::from(vec![Add(isize::MAX), Add(1)]));
    assert_eq!(once, Block::from(vec![Add(isize::MIN)]));
    assert_eq!(optimize(once.clone()), once);
}

#[test]
fn overflowing_moves_stay_apart() {
    let once = optimize(Block::from(vec![Move(isize::MAX), Move(1)]));
    assert_eq!(once, Block::from(vec![Move(isize::MAX), Move(1)]));
    assert_eq!(optimize(once.clone()), once);

    let cancelled = optimize(Block::from(vec![Move(isize::MAX), Move(1), Move(-1)]));
    assert_eq!(cancelled, Block::from(vec![Move(isize::MAX)]));
}
