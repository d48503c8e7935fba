use crate::ast::{BinaryOp, Expr, ExprId, Stmt, StmtId, Trailer};
use crate::span::Span;

use super::Lowerer;

impl<'ast> Lowerer<'ast> {
    /// `target ??= value` becomes `if target is None: target = value`, with
    /// the target's object and index hoisted into temporaries first when
    /// evaluating them could have effects.
    pub(super) fn lower_coalesce_assign(
        &mut self,
        target: ExprId<'ast>,
        value: ExprId<'ast>,
        span: Span,
        out: &mut Vec<StmtId<'ast>>,
    ) {
        let place = match target {
            Expr::Chain {
                base,
                trailers,
                span: target_span,
            } if !trailers.iter().any(Trailer::is_conditional) => match trailers.split_last() {
                Some((last @ (Trailer::Attribute { .. } | Trailer::Index { .. }), init)) => {
                    self.stable_place(base, init, *last, *target_span, out)
                }
                _ => self.lower_expr(target),
            },
            _ => self.lower_expr(target),
        };
        let value = self.lower_expr(value);

        let test = self.none_test(place, BinaryOp::Is, place.span());
        let assign = self.alloc_stmt(Stmt::Assign {
            target: place,
            value,
            span,
        });
        let body = self.arena.alloc_slice_copy(&[assign]);
        out.push(self.alloc_stmt(Stmt::If {
            test,
            body,
            orelse: &[],
            span,
        }));
    }

    /// The place `base init.. last`, addressed through temporaries so the
    /// test and the store see the same object and index.
    fn stable_place(
        &mut self,
        base: ExprId<'ast>,
        init: &[Trailer<'ast>],
        last: Trailer<'ast>,
        span: Span,
        out: &mut Vec<StmtId<'ast>>,
    ) -> ExprId<'ast> {
        let base = self.lower_expr(base);
        let object_span = init
            .last()
            .map_or(base.span(), |trailer| base.span().to(trailer.span()));
        let object = self.plain_chain(base, init, object_span);
        let object = self.hoist(object, out);

        let last = match last {
            Trailer::Index { index, span } => {
                let index = self.lower_expr(index);
                Trailer::Index {
                    index: self.hoist(index, out),
                    span,
                }
            }
            other => other,
        };
        let trailers = self.arena.alloc_slice_copy(&[last]);
        self.alloc(Expr::Chain {
            base: object,
            trailers,
            span,
        })
    }

    /// Emits `$n = value` unless `value` is trivial, and returns what to read
    /// back.
    fn hoist(&mut self, value: ExprId<'ast>, out: &mut Vec<StmtId<'ast>>) -> ExprId<'ast> {
        if value.is_trivial() {
            return value;
        }
        let span = value.span();
        let temp = self.fresh();
        let temp = self.temp(temp, span);
        out.push(self.alloc_stmt(Stmt::Assign {
            target: temp,
            value,
            span,
        }));
        temp
    }
}
