use crate::ast::{BinaryOp, Expr, ExprId, Trailer};
use crate::span::Span;

use super::Lowerer;

impl<'ast> Lowerer<'ast> {
    /// Lowers `base` followed by `trailers`. `base` must already be lowered;
    /// the trailers are not.
    ///
    /// Each conditional trailer splits the chain: everything before it is
    /// evaluated once and tested, and the remainder (with the marker made
    /// unconditional) only runs on a non-null value.
    pub(super) fn lower_chain(
        &mut self,
        base: ExprId<'ast>,
        trailers: &[Trailer<'ast>],
        span: Span,
    ) -> ExprId<'ast> {
        let Some(marker) = trailers.iter().position(Trailer::is_conditional) else {
            return self.plain_chain(base, trailers, span);
        };

        let head_trailers = &trailers[..marker];
        let head_span = head_trailers
            .last()
            .map_or(base.span(), |last| base.span().to(last.span()));
        let head = self.plain_chain(base, head_trailers, head_span);
        let (evaluate, reuse) = self.capture(head);
        let test = self.none_test(evaluate, BinaryOp::Is, head_span);

        let mut rest = Vec::with_capacity(trailers.len() - marker);
        rest.push(trailers[marker].unconditional());
        rest.extend_from_slice(&trailers[marker + 1..]);
        let orelse = self.lower_chain(reuse, &rest, span);

        let then = self.alloc(Expr::None { span });
        self.alloc(Expr::Conditional {
            test,
            then,
            orelse,
            span,
        })
    }

    /// A chain with no conditional trailers left.
    pub(super) fn plain_chain(
        &mut self,
        base: ExprId<'ast>,
        trailers: &[Trailer<'ast>],
        span: Span,
    ) -> ExprId<'ast> {
        if trailers.is_empty() {
            return base;
        }
        let lowered: Vec<_> = trailers
            .iter()
            .map(|trailer| self.lower_trailer(*trailer))
            .collect();
        let trailers = self.arena.alloc_slice_copy(&lowered);
        self.alloc(Expr::Chain {
            base,
            trailers,
            span,
        })
    }
}
