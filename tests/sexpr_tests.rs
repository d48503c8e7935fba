use bumpalo::Bump;
use nullsafe_parser::ast::sexpr::{SExprFormatter, expr_to_sexpr};
use nullsafe_parser::ast::visitor::Visitor;
use nullsafe_parser::lexer::{Lexer, symbols};
use nullsafe_parser::parser::Parser;

fn parse_expr(code: &str) -> String {
    symbols::install();
    let arena = Bump::new();
    let lexer = Lexer::new(code);
    let mut parser = Parser::new(lexer, &arena);
    let expr = parser.parse_standalone_expression().expect("parse");
    expr_to_sexpr(expr)
}

#[test]
fn test_sexpr_coalesce_precedence() {
    assert_eq!(parse_expr("2 + None ?? 2"), "(+ 2 (?? None 2))");
    assert_eq!(parse_expr("2 + None ?? -2"), "(+ 2 (?? None (- 2)))");
    assert_eq!(parse_expr("2 * None ?? 4"), "(* 2 (?? None 4))");
    assert_eq!(parse_expr("2 ** None ?? 4"), "(** 2 (?? None 4))");
    assert_eq!(parse_expr("2 ** None ?? 4 + 16"), "(+ (** 2 (?? None 4)) 16)");
    assert_eq!(parse_expr("2 ** None ?? 3 ** 4"), "(** 2 (?? None (** 3 4)))");
}

#[test]
fn test_sexpr_coalesce_right_operand_is_a_term() {
    assert_eq!(parse_expr("a ?? b * c"), "(?? a (* b c))");
    assert_eq!(parse_expr("a ?? b + c"), "(+ (?? a b) c)");
    assert_eq!(parse_expr("a ?? b ?? c"), "(?? a b c)");
}

#[test]
fn test_sexpr_unary_applies_to_coalesce() {
    assert_eq!(parse_expr("-a ?? b"), "(- (?? a b))");
    assert_eq!(parse_expr("not a ?? b"), "(not (?? a b))");
    assert_eq!(parse_expr("a or b ?? c"), "(or a (?? b c))");
}

#[test]
fn test_sexpr_optional_trailers() {
    assert_eq!(
        parse_expr("a?.b.c?[d](e)"),
        "(chain a (?. b) (. c) (?index d) (call e))"
    );
    assert_eq!(parse_expr("(a?.b).c"), "(chain (chain a (?. b)) (. c))");
    assert_eq!(parse_expr("x if a ?? b else c"), "(if (?? a b) x c)");
}

#[test]
fn test_sexpr_statements() {
    symbols::install();
    let code = "x ??= y?.z\nif a ?? b:\n    pass\nelif c:\n    d += 1\nwhile e: f()\n";
    let arena = Bump::new();
    let lexer = Lexer::new(code);
    let mut parser = Parser::new(lexer, &arena);
    let module = parser.parse_module().expect("parse");

    let mut formatter = SExprFormatter::new();
    formatter.visit_module(&module);
    let output = formatter.finish();

    assert_eq!(
        output,
        "(module\n  (coalesce-assign x (chain y (?. z)))\n  (if (?? a b)\n    (then\n      (pass))\n    (else\n      (if c\n        (then\n          (aug-assign + d 1)))))\n  (while e\n    (body\n      (expr (chain f (call))))))"
    );
}
