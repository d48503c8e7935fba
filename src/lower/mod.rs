//! Rewrites the null-aware constructs into the host's primitive nodes.
//!
//! After lowering, a tree contains no `Coalesce` node, no conditional
//! trailer and no `CoalesceAssign` statement. What replaces them is built
//! from `Conditional`, `Bind`/`Temp`, unconditional `Chain`s, `is`/`is not`
//! tests against `None`, `If` and `Assign`:
//!
//! ```text
//! a() ?? b                 $0 if ($0 := a()) is not None else b
//! x?.a.b?[i]               None if x is None else (None if ($0 := x.a.b) is None else $0[i])
//! obj()[idx()] ??= v       $0 = obj(); $1 = idx(); if $0[$1] is None: $0[$1] = v
//! ```
//!
//! Every operand is evaluated at most once and only when it is reached.

mod assign;
mod chain;

use bumpalo::Bump;
use tracing::debug;

use crate::ast::visitor::{Visitor, walk_expr, walk_stmt};
use crate::ast::{BinaryOp, Expr, ExprId, Module, Stmt, StmtId, TempId, Trailer};
use crate::span::Span;

pub struct Lowerer<'ast> {
    arena: &'ast Bump,
    next_temp: TempId,
    allocated: u32,
}

impl<'ast> Lowerer<'ast> {
    /// A lowerer whose temporaries start at `$0`.
    pub fn new(arena: &'ast Bump) -> Self {
        Self {
            arena,
            next_temp: 0,
            allocated: 0,
        }
    }

    /// A lowerer whose temporaries do not collide with any already in
    /// `module`.
    pub fn for_module(arena: &'ast Bump, module: &Module<'ast>) -> Self {
        let mut scan = TempScan::default();
        for stmt in module.statements {
            scan.visit_stmt(stmt);
        }
        Self {
            arena,
            next_temp: scan.next,
            allocated: 0,
        }
    }

    /// Number of temporaries introduced so far.
    pub fn temps_allocated(&self) -> u32 {
        self.allocated
    }

    fn fresh(&mut self) -> TempId {
        let id = self.next_temp;
        self.next_temp += 1;
        self.allocated += 1;
        id
    }

    fn alloc(&self, expr: Expr<'ast>) -> ExprId<'ast> {
        self.arena.alloc(expr)
    }

    fn alloc_stmt(&self, stmt: Stmt<'ast>) -> StmtId<'ast> {
        self.arena.alloc(stmt)
    }

    fn temp(&self, id: TempId, span: Span) -> ExprId<'ast> {
        self.alloc(Expr::Temp { id, span })
    }

    /// `value is None` (or `is not None`).
    fn none_test(&self, value: ExprId<'ast>, op: BinaryOp, span: Span) -> ExprId<'ast> {
        let none = self.alloc(Expr::None { span });
        self.alloc(Expr::Binary {
            left: value,
            op,
            right: none,
            span,
        })
    }

    /// Splits an already lowered value into the expression that evaluates
    /// it and an expression that reads the result again. Trivial values are
    /// simply repeated.
    fn capture(&mut self, value: ExprId<'ast>) -> (ExprId<'ast>, ExprId<'ast>) {
        if value.is_trivial() {
            return (value, value);
        }
        let span = value.span();
        let temp = self.fresh();
        let bind = self.alloc(Expr::Bind { temp, value, span });
        (bind, self.temp(temp, span))
    }

    pub fn lower_module(&mut self, module: &Module<'ast>) -> Module<'ast> {
        let statements = self.lower_block(module.statements);
        Module {
            statements,
            span: module.span,
        }
    }

    fn lower_block(&mut self, stmts: &'ast [StmtId<'ast>]) -> &'ast [StmtId<'ast>] {
        let mut out = Vec::with_capacity(stmts.len());
        for stmt in stmts {
            self.lower_stmt(stmt, &mut out);
        }
        self.arena.alloc_slice_copy(&out)
    }

    /// Lowers one statement. A `??=` may expand to several.
    pub fn lower_stmt(&mut self, stmt: StmtId<'ast>, out: &mut Vec<StmtId<'ast>>) {
        let lowered = match stmt {
            Stmt::Expression { expr, span } => Stmt::Expression {
                expr: self.lower_expr(expr),
                span: *span,
            },
            Stmt::Assign { target, value, span } => Stmt::Assign {
                target: self.lower_expr(target),
                value: self.lower_expr(value),
                span: *span,
            },
            Stmt::AugAssign {
                target,
                op,
                value,
                span,
            } => Stmt::AugAssign {
                target: self.lower_expr(target),
                op: *op,
                value: self.lower_expr(value),
                span: *span,
            },
            Stmt::CoalesceAssign { target, value, span } => {
                self.lower_coalesce_assign(target, value, *span, out);
                return;
            }
            Stmt::If {
                test,
                body,
                orelse,
                span,
            } => Stmt::If {
                test: self.lower_expr(test),
                body: self.lower_block(body),
                orelse: self.lower_block(orelse),
                span: *span,
            },
            Stmt::While { test, body, span } => Stmt::While {
                test: self.lower_expr(test),
                body: self.lower_block(body),
                span: *span,
            },
            Stmt::Assert {
                test,
                message,
                span,
            } => Stmt::Assert {
                test: self.lower_expr(test),
                message: message.map(|message| self.lower_expr(message)),
                span: *span,
            },
            Stmt::Pass { .. } => {
                out.push(stmt);
                return;
            }
        };
        out.push(self.alloc_stmt(lowered));
    }

    pub fn lower_expr(&mut self, expr: ExprId<'ast>) -> ExprId<'ast> {
        match expr {
            Expr::Name { .. }
            | Expr::Temp { .. }
            | Expr::None { .. }
            | Expr::Bool { .. }
            | Expr::Integer { .. }
            | Expr::Float { .. }
            | Expr::String { .. } => expr,
            Expr::List { items, span } => {
                let items = self.lower_exprs(items);
                self.alloc(Expr::List { items, span: *span })
            }
            Expr::Dict { entries, span } => {
                let entries: Vec<_> = entries
                    .iter()
                    .map(|(key, value)| (self.lower_expr(key), self.lower_expr(value)))
                    .collect();
                let entries = self.arena.alloc_slice_copy(&entries);
                self.alloc(Expr::Dict {
                    entries,
                    span: *span,
                })
            }
            Expr::Chain {
                base,
                trailers,
                span,
            } => {
                let base = self.lower_expr(base);
                self.lower_chain(base, trailers, *span)
            }
            Expr::Binary {
                left,
                op,
                right,
                span,
            } => {
                let left = self.lower_expr(left);
                let right = self.lower_expr(right);
                self.alloc(Expr::Binary {
                    left,
                    op: *op,
                    right,
                    span: *span,
                })
            }
            Expr::Unary { op, operand, span } => {
                let operand = self.lower_expr(operand);
                self.alloc(Expr::Unary {
                    op: *op,
                    operand,
                    span: *span,
                })
            }
            Expr::Power {
                base,
                exponent,
                span,
            } => {
                let base = self.lower_expr(base);
                let exponent = self.lower_expr(exponent);
                self.alloc(Expr::Power {
                    base,
                    exponent,
                    span: *span,
                })
            }
            Expr::Coalesce { first, rest, span } => self.lower_coalesce(first, rest, *span),
            Expr::Conditional {
                test,
                then,
                orelse,
                span,
            } => {
                let test = self.lower_expr(test);
                let then = self.lower_expr(then);
                let orelse = self.lower_expr(orelse);
                self.alloc(Expr::Conditional {
                    test,
                    then,
                    orelse,
                    span: *span,
                })
            }
            Expr::Bind { temp, value, span } => {
                let value = self.lower_expr(value);
                self.alloc(Expr::Bind {
                    temp: *temp,
                    value,
                    span: *span,
                })
            }
        }
    }

    fn lower_exprs(&mut self, exprs: &'ast [ExprId<'ast>]) -> &'ast [ExprId<'ast>] {
        let lowered: Vec<_> = exprs.iter().map(|expr| self.lower_expr(expr)).collect();
        self.arena.alloc_slice_copy(&lowered)
    }

    /// `a ?? b ?? c` becomes nested conditionals, innermost on the right.
    /// Every operand but the last is tested against `None`; the last is
    /// the fallback.
    fn lower_coalesce(
        &mut self,
        first: ExprId<'ast>,
        rest: &'ast [ExprId<'ast>],
        span: Span,
    ) -> ExprId<'ast> {
        let Some((last, middle)) = rest.split_last() else {
            return self.lower_expr(first);
        };

        // Lower left to right so temporaries are numbered in source order.
        let mut tested = Vec::with_capacity(rest.len());
        for operand in std::iter::once(&first).chain(middle) {
            let value = self.lower_expr(operand);
            tested.push(self.capture(value));
        }

        let mut acc = self.lower_expr(last);
        for (evaluate, reuse) in tested.into_iter().rev() {
            let test = self.none_test(evaluate, BinaryOp::IsNot, evaluate.span());
            acc = self.alloc(Expr::Conditional {
                test,
                then: reuse,
                orelse: acc,
                span: evaluate.span().to(span),
            });
        }
        acc
    }

    fn lower_trailer(&mut self, trailer: Trailer<'ast>) -> Trailer<'ast> {
        match trailer {
            Trailer::Attribute { .. } | Trailer::OptionalAttribute { .. } => trailer,
            Trailer::Index { index, span } => Trailer::Index {
                index: self.lower_expr(index),
                span,
            },
            Trailer::OptionalIndex { index, span } => Trailer::OptionalIndex {
                index: self.lower_expr(index),
                span,
            },
            Trailer::Call { args, span } => Trailer::Call {
                args: self.lower_exprs(args),
                span,
            },
        }
    }
}

/// Finds the first temporary id not used anywhere in a tree.
#[derive(Default)]
struct TempScan {
    next: TempId,
}

impl<'ast> Visitor<'ast> for TempScan {
    fn visit_expr(&mut self, expr: ExprId<'ast>) {
        match expr {
            Expr::Temp { id, .. } | Expr::Bind { temp: id, .. } => {
                self.next = self.next.max(id + 1);
            }
            _ => {}
        }
        walk_expr(self, expr);
    }
}

/// Finds any node that only exists before lowering.
#[derive(Default)]
struct ExtensionScan {
    found: bool,
}

impl<'ast> Visitor<'ast> for ExtensionScan {
    fn visit_stmt(&mut self, stmt: StmtId<'ast>) {
        if matches!(stmt, Stmt::CoalesceAssign { .. }) {
            self.found = true;
        }
        walk_stmt(self, stmt);
    }

    fn visit_expr(&mut self, expr: ExprId<'ast>) {
        if expr.is_extension() {
            self.found = true;
        }
        walk_expr(self, expr);
    }
}

/// Lowers a whole module into `arena`.
pub fn lower_module<'ast>(arena: &'ast Bump, module: &Module<'ast>) -> Module<'ast> {
    let mut lowerer = Lowerer::for_module(arena, module);
    let lowered = lowerer.lower_module(module);
    debug!(
        statements = lowered.statements.len(),
        temporaries = lowerer.temps_allocated(),
        "lowered module"
    );
    lowered
}

/// Whether `module` still contains `??`, `??=`, `?.` or `?[`.
pub fn has_extensions(module: &Module<'_>) -> bool {
    let mut scan = ExtensionScan::default();
    for stmt in module.statements {
        scan.visit_stmt(stmt);
    }
    scan.found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::sexpr::{expr_to_sexpr, module_to_sexpr};
    use crate::lexer::{Lexer, symbols};
    use crate::parser::Parser;

    fn lower_source(source: &str) -> String {
        symbols::install();
        let arena = Bump::new();
        let mut parser = Parser::new(Lexer::new(source), &arena);
        let module = parser.parse_module().expect("parse");
        let lowered = lower_module(&arena, &module);
        assert!(!has_extensions(&lowered));
        module_to_sexpr(&lowered)
    }

    fn lower_expression(source: &str) -> String {
        symbols::install();
        let arena = Bump::new();
        let mut parser = Parser::new(Lexer::new(source), &arena);
        let expr = parser.parse_standalone_expression().expect("parse");
        let mut lowerer = Lowerer::new(&arena);
        expr_to_sexpr(lowerer.lower_expr(expr))
    }

    #[test]
    fn trivial_operands_are_tested_in_place() {
        assert_eq!(
            lower_expression("a ?? b"),
            "(if (is-not a None) a b)"
        );
    }

    #[test]
    fn calls_are_bound_to_a_temporary() {
        assert_eq!(
            lower_expression("f() ?? g() ?? c"),
            "(if (is-not (:= $0 (chain f (call))) None) $0 \
             (if (is-not (:= $1 (chain g (call))) None) $1 c))"
        );
    }

    #[test]
    fn optional_chain_skips_the_rest() {
        assert_eq!(
            lower_expression("x?.a.b?[i]"),
            "(if (is x None) None \
             (if (is (:= $0 (chain x (. a) (. b))) None) None (chain $0 (index i))))"
        );
    }

    #[test]
    fn trailers_before_the_first_marker_stay_unconditional() {
        assert_eq!(
            lower_expression("f(x).y?.z"),
            "(if (is (:= $0 (chain f (call x) (. y))) None) None (chain $0 (. z)))"
        );
    }

    #[test]
    fn coalesce_inside_an_index() {
        assert_eq!(
            lower_expression("l[None ?? 0]"),
            "(chain l (index (if (is-not None None) None 0)))"
        );
    }

    #[test]
    fn coalesce_assign_to_a_name() {
        assert_eq!(
            lower_source("x ??= 1\n"),
            "(module\n  (if (is x None)\n    (then\n      (assign x 1))))"
        );
    }

    #[test]
    fn coalesce_assign_evaluates_the_target_once() {
        assert_eq!(
            lower_source("obj()[idx()] ??= v\n"),
            "(module\n  \
             (assign $0 (chain obj (call)))\n  \
             (assign $1 (chain idx (call)))\n  \
             (if (is (chain $0 (index $1)) None)\n    \
             (then\n      \
             (assign (chain $0 (index $1)) v))))"
        );
    }

    #[test]
    fn coalesce_assign_to_an_attribute_of_a_name() {
        assert_eq!(
            lower_source("o.a ??= 2\n"),
            "(module\n  (if (is (chain o (. a)) None)\n    (then\n      (assign (chain o (. a)) 2))))"
        );
    }

    #[test]
    fn nested_blocks_are_lowered() {
        let out = lower_source("if a ?? b:\n    x ??= c?.d\nelse:\n    pass\n");
        assert!(out.contains("(if (if (is-not a None) a b)"));
        assert!(out.contains("(assign x (if (is c None) None (chain c (. d))))"));
        assert!(out.contains("(else\n      (pass))"));
    }

    #[test]
    fn lowering_is_idempotent() {
        symbols::install();
        let arena = Bump::new();
        let source = "y = f() ?? g()?.h[k()]?.m\nobj()[i] ??= a ?? b\n";
        let mut parser = Parser::new(Lexer::new(source), &arena);
        let module = parser.parse_module().expect("parse");
        let once = lower_module(&arena, &module);
        let twice = lower_module(&arena, &once);
        assert_eq!(once, twice);
        assert_eq!(module_to_sexpr(&once), module_to_sexpr(&twice));
    }

    #[test]
    fn fresh_temporaries_avoid_existing_ones() {
        symbols::install();
        let arena = Bump::new();
        let mut parser = Parser::new(Lexer::new("f() ?? 1\n"), &arena);
        let module = parser.parse_module().expect("parse");
        let once = lower_module(&arena, &module);

        // Splice a new extension node next to the lowered statement.
        let mut parser = Parser::new(Lexer::new("g() ?? 2\n"), &arena);
        let extra = parser.parse_module().expect("parse");
        let statements = arena.alloc_slice_copy(&[once.statements[0], extra.statements[0]]);
        let mixed = Module {
            statements,
            span: once.span,
        };
        let lowered = module_to_sexpr(&lower_module(&arena, &mixed));
        assert!(lowered.contains("(:= $0 (chain f (call)))"));
        assert!(lowered.contains("(:= $1 (chain g (call)))"));
    }

    #[test]
    fn modules_without_extensions_are_unchanged() {
        symbols::install();
        let arena = Bump::new();
        let source = "x = a.b[c](d) + 1\nwhile x:\n    x -= 1\n";
        let mut parser = Parser::new(Lexer::new(source), &arena);
        let module = parser.parse_module().expect("parse");
        assert!(!has_extensions(&module));
        assert_eq!(lower_module(&arena, &module), module);
    }
}
