use bumpalo::Bump;
use nullsafe_parser::Span;
use nullsafe_parser::ast::visitor::{Visitor, walk_expr, walk_stmt, walk_trailer};
use nullsafe_parser::ast::{Expr, ExprId, Stmt, StmtId, Trailer};
use nullsafe_parser::lexer::{Lexer, symbols};
use nullsafe_parser::parser::Parser;

/// Collects every null-aware construct in a module.
#[derive(Default)]
struct NullAwareUses {
    coalesce: Vec<Span>,
    assignments: Vec<Span>,
    optional: Vec<Span>,
}

impl<'ast> Visitor<'ast> for NullAwareUses {
    fn visit_stmt(&mut self, stmt: StmtId<'ast>) {
        if let Stmt::CoalesceAssign { span, .. } = stmt {
            self.assignments.push(*span);
        }
        walk_stmt(self, stmt);
    }

    fn visit_expr(&mut self, expr: ExprId<'ast>) {
        if let Expr::Coalesce { span, .. } = expr {
            self.coalesce.push(*span);
        }
        walk_expr(self, expr);
    }

    fn visit_trailer(&mut self, trailer: &'ast Trailer<'ast>) {
        if trailer.is_conditional() {
            self.optional.push(trailer.span());
        }
        walk_trailer(self, trailer);
    }
}

#[test]
fn visitor_finds_null_aware_operators() {
    symbols::install();
    let code = "x ??= a ?? b\nif c?.d:\n    e = [f?[g ?? h]]\n";

    let arena = Bump::new();
    let lexer = Lexer::new(code);
    let mut parser = Parser::new(lexer, &arena);
    let module = parser.parse_module().expect("parse");

    let mut visitor = NullAwareUses::default();
    visitor.visit_module(&module);

    let text = |span: &Span| span.as_str(code).to_string();
    assert_eq!(visitor.assignments.iter().map(text).collect::<Vec<_>>(), ["x ??= a ?? b"]);
    assert_eq!(visitor.coalesce.iter().map(text).collect::<Vec<_>>(), ["a ?? b", "g ?? h"]);
    assert_eq!(visitor.optional.iter().map(text).collect::<Vec<_>>(), ["?.d", "?[g ?? h]"]);
}
