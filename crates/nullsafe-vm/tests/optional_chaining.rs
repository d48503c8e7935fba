use nullsafe_vm::core::value::Val;
use nullsafe_vm::vm::engine::{ExecError, VmError, VM};
use std::cell::Cell;
use std::rc::Rc;

fn run_code(vm: &mut VM, source: &str) {
    if let Err(err) = vm.run_source("test.py", source) {
        panic!("Execution failed: {err}");
    }
}

fn global(vm: &VM, name: &str) -> Val {
    vm.get(name).cloned().expect("global not set")
}

fn counting(vm: &mut VM, name: &str) -> Rc<Cell<usize>> {
    let count = Rc::new(Cell::new(0));
    let calls = Rc::clone(&count);
    vm.define_native(name, move |_, args| {
        calls.set(calls.get() + 1);
        Ok(args.into_iter().next().unwrap_or(Val::None))
    });
    count
}

#[test]
fn test_none_short_circuits() {
    let mut vm = VM::new();
    run_code(&mut vm, "a = None?.foo\nb = None?[0]\nc = None?.foo.bar[1](2)\n");
    assert_eq!(global(&vm, "a"), Val::None);
    assert_eq!(global(&vm, "b"), Val::None);
    assert_eq!(global(&vm, "c"), Val::None);
}

#[test]
fn test_skipped_trailers_are_not_evaluated() {
    let mut vm = VM::new();
    let calls = counting(&mut vm, "side_effect");
    run_code(
        &mut vm,
        r#"
x = None
a = x?[side_effect(0)]
b = x?.f(side_effect(1))
c = x?.y[side_effect(2)]
"#,
    );
    assert_eq!(calls.get(), 0);
    assert_eq!(global(&vm, "a"), Val::None);
}

#[test]
fn test_present_values_pass_through() {
    let mut vm = VM::new();
    let calls = counting(&mut vm, "side_effect");
    run_code(
        &mut vm,
        r#"
o = object()
o.items = [10, 20]
o.next = None
a = o?.items?[1]
b = o?.next?.items[0]
c = o.items?[side_effect(0)]
"#,
    );
    assert_eq!(global(&vm, "a"), Val::int(20));
    assert_eq!(global(&vm, "b"), Val::None);
    assert_eq!(global(&vm, "c"), Val::int(10));
    assert_eq!(calls.get(), 1);
}

#[test]
fn test_base_is_evaluated_once() {
    let mut vm = VM::new();
    let calls = counting(&mut vm, "get");
    run_code(&mut vm, "o = object()\no.a = 1\nx = get(o)?.a\ny = get(None)?.a\n");
    assert_eq!(global(&vm, "x"), Val::int(1));
    assert_eq!(global(&vm, "y"), Val::None);
    assert_eq!(calls.get(), 2);
}

#[test]
fn test_only_none_is_guarded() {
    let mut vm = VM::new();
    let err = vm.run_source("test.py", "o = object()\nx = o?.missing\n").unwrap_err();
    assert!(matches!(
        err,
        ExecError::Runtime(VmError::UnknownAttribute { .. })
    ));

    let err = vm.run_source("test.py", "x = 0?.real\n").unwrap_err();
    assert!(matches!(
        err,
        ExecError::Runtime(VmError::UnknownAttribute { type_name: "int", .. })
    ));
}

#[test]
fn test_parentheses_end_the_short_circuit() {
    let mut vm = VM::new();
    let err = vm.run_source("test.py", "x = (None?.a).b\n").unwrap_err();
    assert!(matches!(
        err,
        ExecError::Runtime(VmError::UnknownAttribute { type_name: "NoneType", .. })
    ));
}

#[test]
fn test_complex() {
    let mut vm = VM::new();
    run_code(&mut vm, "x = None?.foo?[0]?.foo ?? None ?? True ?? False\n");
    assert_eq!(global(&vm, "x"), Val::Bool(true));
}

#[test]
fn test_multiline_subscript() {
    let mut vm = VM::new();
    run_code(&mut vm, "l = [1, 2]\nx = l?[\n    1\n]\n");
    assert_eq!(global(&vm, "x"), Val::int(2));
}
