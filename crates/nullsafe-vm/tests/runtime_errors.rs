use bumpalo::Bump;
use nullsafe_parser::{parse, DiagnosticKind, SourceUnit};
use nullsafe_vm::vm::engine::{ExecError, VmError, VM};

#[test]
fn test_unlowered_trees_are_refused() {
    let arena = Bump::new();
    for source in ["x = a ?? b\n", "x = a?.b\n", "x = a?[0]\n", "x ??= 1\n"] {
        let module = parse(SourceUnit::new("test.py", source), &arena).expect("parse");
        let mut vm = VM::new();
        vm.define("a", nullsafe_vm::core::value::Val::None);
        let err = vm.run(&module).unwrap_err();
        assert!(matches!(err, VmError::Unlowered(_)), "{source:?}: {err}");
    }
}

#[test]
fn test_syntax_errors_carry_positions() {
    let mut vm = VM::new();
    match vm.run_source("bad.py", "x = 1\ny = 2 ??\n") {
        Err(ExecError::Compile(diagnostic)) => {
            assert_eq!(diagnostic.kind, DiagnosticKind::Syntax);
            assert_eq!((diagnostic.line, diagnostic.column), (2, 9));
            assert_eq!(
                diagnostic.to_string(),
                "bad.py:2:9: syntax error: expected an expression after '??', found newline"
            );
        }
        other => panic!("expected a syntax error, got {other:?}"),
    }
}

#[test]
fn test_runtime_errors() {
    let cases: &[(&str, fn(&VmError) -> bool)] = &[
        ("x = 1 // 0\n", |e| matches!(e, VmError::ZeroDivision)),
        ("x = undefined\n", |e| matches!(e, VmError::UnboundName(_))),
        ("x = [1][5]\n", |e| matches!(e, VmError::Index(_))),
        ("x = None + 1\n", |e| matches!(e, VmError::Type(_))),
        ("x = 1\nx()\n", |e| matches!(e, VmError::Type(_))),
        ("assert None ?? False, 'nope'\n", |e| {
            matches!(e, VmError::Assertion(Some(message)) if message == "nope")
        }),
    ];
    for (source, check) in cases {
        let mut vm = VM::new();
        match vm.run_source("test.py", source) {
            Err(ExecError::Runtime(err)) => assert!(check(&err), "{source:?}: {err}"),
            other => panic!("{source:?}: expected a runtime error, got {other:?}"),
        }
    }
}

#[test]
fn test_assertion_display() {
    assert_eq!(
        VmError::Assertion(Some("nope".to_string())).to_string(),
        "AssertionError: nope"
    );
    assert_eq!(VmError::Assertion(None).to_string(), "AssertionError");
}

#[test]
fn test_print_output_is_buffered() {
    let mut vm = VM::new();
    vm.run_source("test.py", "x = None\nprint(x ?? 'default', len([1, 2]))\n")
        .expect("run");
    assert_eq!(vm.take_output(), "default 2\n");
    assert_eq!(vm.take_output(), "");
}

#[test]
fn test_loops_and_branches() {
    let mut vm = VM::new();
    vm.run_source(
        "test.py",
        "i = 0\ntotal = None\nwhile i < 4:\n    total ??= 0\n    total += i\n    i += 1\nif total == 6: ok = True\nelse: ok = False\n",
    )
    .expect("run");
    assert_eq!(
        vm.get("ok").cloned(),
        Some(nullsafe_vm::core::value::Val::Bool(true))
    );
}
