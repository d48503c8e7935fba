use bumpalo::Bump;
use nullsafe_parser::{DiagnosticKind, SourceUnit, compile};

fn error(code: &str) -> nullsafe_parser::Diagnostic {
    let arena = Bump::new();
    compile(SourceUnit::new("test.py", code), &arena).expect_err("should fail")
}

#[test]
fn test_missing_right_operand() {
    let err = error("a = b ??\n");
    assert_eq!(err.kind, DiagnosticKind::Syntax);
    assert_eq!((err.line, err.column), (1, 9));
    assert_eq!(err.message, "expected an expression after '??', found newline");
}

#[test]
fn test_optional_trailer_without_base() {
    let err = error("x = 1\n?.a\n");
    assert_eq!((err.line, err.column), (2, 1));
    assert_eq!(err.message, "'?.' needs an expression on its left");
}

#[test]
fn test_invalid_coalesce_assign_targets() {
    assert_eq!(error("f() ??= 1\n").message, "cannot assign to function call with '??='");
    assert_eq!(error("a?.b ??= 1\n").message, "cannot assign to optional chain with '??='");
    assert_eq!(error("a?[0] ??= 1\n").message, "cannot assign to optional chain with '??='");
    assert_eq!(error("None ??= 1\n").message, "cannot assign to literal with '??='");
}

#[test]
fn test_coalesce_assign_is_a_statement() {
    let err = error("x = (y ??= 1)\n");
    assert_eq!(err.kind, DiagnosticKind::Syntax);
}

#[test]
fn test_lexical_errors() {
    let err = error("a = x?[1\n");
    assert_eq!(err.kind, DiagnosticKind::Lexical);
    assert_eq!(err.message, "'?[' was never closed");
    assert_eq!((err.line, err.column), (1, 6));

    let err = error("a = ?\n");
    assert_eq!(err.kind, DiagnosticKind::Lexical);
    assert_eq!(err.message, "unexpected character '?'");
}

#[test]
fn test_display() {
    let err = error("ok = 1\nx ??\n");
    assert_eq!(
        err.to_string(),
        "test.py:2:5: syntax error: expected an expression after '??', found newline"
    );
}
