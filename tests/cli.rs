use bfc::cli::{parse_args, Invocation};
use bfc::{compile, lex, optimize, run, validate, Arch, Block, ErrorKind, Instruction, TokenKind};
use std::env;
use std::fs;
use std::path::PathBuf;

fn scratch_path(name: &str) -> PathBuf {
    env::temp_dir().join(format!("bfc-cli-{}-{}", std::process::id(), name))
}

#[test]
fn unknown_flag_fails_before_touching_files() {
    let missing = scratch_path("never-created.bf");
    let args = ["bfc".into(), "-z".into(), missing.clone().into_os_string()];

    let err = parse_args(args.clone()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Args);
    assert!(err.to_string().contains("-z"));

    assert_eq!(run(args), 1);
    assert!(!missing.exists());
}

#[test]
fn help_exits_zero_without_input() {
    assert!(matches!(parse_args(["bfc", "--help"]), Ok(Invocation::Help(_))));
    assert_eq!(run(["bfc", "-h", "/does/not/exist.bf"]), 0);
}

#[test]
fn missing_file_is_an_error() {
    assert_eq!(run(["bfc", "/does/not/exist.bf"]), 1);
}

#[test]
fn empty_program_end_to_end() {
    let tokens = lex(b"", Default::default()).unwrap();
    assert!(tokens.is_empty());
    assert!(validate(&tokens).unwrap().is_empty());

    let root = optimize(bfc::build(&tokens).unwrap());
    assert_eq!(root, Block::new());

    let program = compile(b"", Default::default(), Arch::X86_64).unwrap();
    assert_eq!(program.op_count(), 0);
}

#[test]
fn transfer_loop_end_to_end() {
    use Instruction::*;
    use TokenKind::*;

    let source = b"++++[->+<]";
    let tokens = lex(source, Default::default()).unwrap();
    assert_eq!(
        tokens.iter().map(|t| t.kind).collect::<Vec<_>>(),
        vec![
            Increment, Increment, Increment, Increment, LoopStart, Decrement, MoveRight,
            Increment, MoveLeft, LoopEnd
        ]
    );

    let table = validate(&tokens).unwrap();
    assert_eq!(table.partner(4), Some(9));
    assert_eq!(table.partner(9), Some(4));

    let body = || Block::from(vec![Add(-1), Move(1), Add(1), Move(-1)]);
    let root = bfc::build(&tokens).unwrap();
    assert_eq!(
        root,
        Block::from(vec![Add(1), Add(1), Add(1), Add(1), Loop(body())])
    );
    assert_eq!(optimize(root), Block::from(vec![Add(4), Loop(body())]));
}

#[test]
fn writes_assembly_to_every_output() {
    let host = match Arch::host() {
        Ok(arch) if bfc::backend_for(arch).is_ok() => arch,
        _ => return,
    };

    let input = scratch_path("hello.bf");
    let first = scratch_path("first.s");
    let second = scratch_path("second.s");
    fs::write(&input, "; greet\n++++++++[>++++++++<-]>+.\n").unwrap();

    let status = run([
        "bfc".into(),
        input.clone().into_os_string(),
        "-o".into(),
        first.clone().into_os_string(),
        "-o".into(),
        second.clone().into_os_string(),
    ]);
    assert_eq!(status, 0);

    let expected = compile(&fs::read(&input).unwrap(), Default::default(), host)
        .unwrap()
        .into_text();
    assert_eq!(fs::read_to_string(&first).unwrap(), expected);
    assert_eq!(fs::read_to_string(&second).unwrap(), expected);

    for path in [input, first, second] {
        let _ = fs::remove_file(path);
    }
}

#[test]
fn bracket_error_exit_status() {
    let input = scratch_path("unbalanced.bf");
    fs::write(&input, "+\n[[]\n").unwrap();

    let status = run(["bfc".into(), input.clone().into_os_string()]);
    assert_eq!(status, 1);

    let _ = fs::remove_file(input);
}
