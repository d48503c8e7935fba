use crate::ast::{Expr, ExprId, Trailer, UnaryOp};
use crate::lexer::token::TokenKind;
use crate::lexer::unescape;
use crate::parser::precedence::{InfixOp, Precedence, infix_rule};
use crate::parser::{PResult, Parser};
use crate::span::Span;

fn starts_expression(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Name
            | TokenKind::Integer
            | TokenKind::Float
            | TokenKind::String
            | TokenKind::None
            | TokenKind::True
            | TokenKind::False
            | TokenKind::OpenParen
            | TokenKind::OpenBracket
            | TokenKind::OpenBrace
            | TokenKind::Plus
            | TokenKind::Minus
            | TokenKind::Tilde
            | TokenKind::Not
    )
}

impl<'src, 'ast> Parser<'src, 'ast> {
    /// `or_test ['if' or_test 'else' expression]`
    pub(super) fn parse_expression(&mut self) -> PResult<ExprId<'ast>> {
        let then = self.parse_binary(Precedence::Lowest)?;
        if !self.at(TokenKind::If) {
            return Ok(then);
        }
        self.bump()?;
        let test = self.parse_binary(Precedence::Lowest)?;
        self.expect(TokenKind::Else)?;
        let orelse = self.parse_expression()?;
        let span = then.span().to(orelse.span());
        Ok(self.alloc(Expr::Conditional { test, then, orelse, span }))
    }

    /// Precedence climbing over the infix table. Only operators at or above
    /// `min` are consumed.
    pub(super) fn parse_binary(&mut self, min: Precedence) -> PResult<ExprId<'ast>> {
        let mut left = self.parse_prefix()?;

        while let Some(rule) = infix_rule(self.current_token.kind, self.next_token.kind) {
            if rule.precedence < min {
                break;
            }
            let operator = self.current_token;
            for _ in 0..rule.width {
                self.bump()?;
            }
            if !starts_expression(self.current_token.kind) {
                return Err(self.error(
                    self.current_token.span,
                    format!(
                        "expected an expression after {}, found {}",
                        operator.kind.describe(),
                        self.current_token.kind.describe()
                    ),
                ));
            }
            let right = self.parse_binary(rule.rhs)?;
            let span = left.span().to(right.span());
            left = match rule.op {
                InfixOp::Binary(op) => self.alloc(Expr::Binary { left, op, right, span }),
                InfixOp::Power => self.alloc(Expr::Power {
                    base: left,
                    exponent: right,
                    span,
                }),
                InfixOp::Coalesce => self.coalesce(left, right, span),
            };
        }

        Ok(left)
    }

    /// Join two operands of `??`, keeping the chain flat and left to right.
    fn coalesce(&self, left: ExprId<'ast>, right: ExprId<'ast>, span: Span) -> ExprId<'ast> {
        let mut operands = std::vec::Vec::new();
        for side in [left, right] {
            match side {
                Expr::Coalesce { first, rest, .. } => {
                    operands.push(*first);
                    operands.extend_from_slice(rest);
                }
                other => operands.push(other),
            }
        }
        let (first, rest) = (operands[0], &operands[1..]);
        self.arena.alloc(Expr::Coalesce {
            first,
            rest: self.arena.alloc_slice_copy(rest),
            span,
        })
    }

    fn parse_prefix(&mut self) -> PResult<ExprId<'ast>> {
        let start = self.current_token.span;
        let (op, operand_level) = match self.current_token.kind {
            TokenKind::Not => (UnaryOp::Not, Precedence::Not),
            TokenKind::Plus => (UnaryOp::Plus, Precedence::Factor),
            TokenKind::Minus => (UnaryOp::Minus, Precedence::Factor),
            TokenKind::Tilde => (UnaryOp::BitNot, Precedence::Factor),
            _ => return self.parse_postfix(),
        };
        self.bump()?;
        let operand = self.parse_binary(operand_level)?;
        let span = start.to(operand.span());
        Ok(self.alloc(Expr::Unary { op, operand, span }))
    }

    /// An atom followed by its trailers.
    fn parse_postfix(&mut self) -> PResult<ExprId<'ast>> {
        let base = self.parse_atom()?;
        let mut trailers = std::vec::Vec::new();

        loop {
            let start = self.current_token.span;
            let trailer = match self.current_token.kind {
                TokenKind::Dot | TokenKind::QuestionDot => {
                    let optional = self.at(TokenKind::QuestionDot);
                    self.bump()?;
                    let token = self.expect(TokenKind::Name)?;
                    let name = self.arena.alloc_str(self.text(token));
                    let span = start.to(token.span);
                    if optional {
                        Trailer::OptionalAttribute { name, span }
                    } else {
                        Trailer::Attribute { name, span }
                    }
                }
                TokenKind::OpenBracket | TokenKind::QuestionBracket => {
                    let optional = self.at(TokenKind::QuestionBracket);
                    self.bump()?;
                    let index = self.parse_expression()?;
                    let close = self.expect(TokenKind::CloseBracket)?;
                    let span = start.to(close.span);
                    if optional {
                        Trailer::OptionalIndex { index, span }
                    } else {
                        Trailer::Index { index, span }
                    }
                }
                TokenKind::OpenParen => {
                    self.bump()?;
                    let args = self.parse_comma_list(TokenKind::CloseParen)?;
                    let close = self.expect(TokenKind::CloseParen)?;
                    Trailer::Call {
                        args: self.arena.alloc_slice_copy(&args),
                        span: start.to(close.span),
                    }
                }
                _ => break,
            };
            trailers.push(trailer);
        }

        match trailers.last() {
            None => Ok(base),
            Some(last) => {
                let span = base.span().to(last.span());
                Ok(self.alloc(Expr::Chain {
                    base,
                    trailers: self.arena.alloc_slice_copy(&trailers),
                    span,
                }))
            }
        }
    }

    /// Expressions separated by commas up to (not including) `close`. A
    /// trailing comma is allowed.
    fn parse_comma_list(&mut self, close: TokenKind) -> PResult<std::vec::Vec<ExprId<'ast>>> {
        let mut items = std::vec::Vec::new();
        while !self.at(close) {
            items.push(self.parse_expression()?);
            if self.at(TokenKind::Comma) {
                self.bump()?;
            } else {
                break;
            }
        }
        Ok(items)
    }

    fn parse_atom(&mut self) -> PResult<ExprId<'ast>> {
        let token = self.current_token;
        let span = token.span;
        let expr = match token.kind {
            TokenKind::Name => {
                self.bump()?;
                Expr::Name {
                    name: self.arena.alloc_str(self.text(token)),
                    span,
                }
            }
            TokenKind::Integer => {
                self.bump()?;
                let digits = self.text(token).replace('_', "");
                Expr::Integer {
                    value: self.arena.alloc_str(&digits),
                    span,
                }
            }
            TokenKind::Float => {
                self.bump()?;
                let value = self
                    .text(token)
                    .replace('_', "")
                    .parse::<f64>()
                    .map_err(|_| self.error(span, "invalid float literal"))?;
                Expr::Float { value, span }
            }
            TokenKind::String => {
                // Adjacent literals concatenate.
                let mut value = String::new();
                let mut end = span;
                while self.at(TokenKind::String) {
                    end = self.current_token.span;
                    value.push_str(&unescape(self.text(self.current_token)));
                    self.bump()?;
                }
                Expr::String {
                    value: self.arena.alloc_str(&value),
                    span: span.to(end),
                }
            }
            TokenKind::None => {
                self.bump()?;
                Expr::None { span }
            }
            TokenKind::True | TokenKind::False => {
                self.bump()?;
                Expr::Bool {
                    value: token.kind == TokenKind::True,
                    span,
                }
            }
            TokenKind::OpenParen => {
                self.bump()?;
                if self.at(TokenKind::CloseParen) {
                    return Err(self.error(self.current_token.span, "empty parentheses are not an expression"));
                }
                let inner = self.parse_expression()?;
                self.expect(TokenKind::CloseParen)?;
                return Ok(inner);
            }
            TokenKind::OpenBracket => {
                self.bump()?;
                let items = self.parse_comma_list(TokenKind::CloseBracket)?;
                let close = self.expect(TokenKind::CloseBracket)?;
                Expr::List {
                    items: self.arena.alloc_slice_copy(&items),
                    span: span.to(close.span),
                }
            }
            TokenKind::OpenBrace => {
                self.bump()?;
                let mut entries = std::vec::Vec::new();
                while !self.at(TokenKind::CloseBrace) {
                    let key = self.parse_expression()?;
                    self.expect(TokenKind::Colon)?;
                    let value = self.parse_expression()?;
                    entries.push((key, value));
                    if self.at(TokenKind::Comma) {
                        self.bump()?;
                    } else {
                        break;
                    }
                }
                let close = self.expect(TokenKind::CloseBrace)?;
                Expr::Dict {
                    entries: self.arena.alloc_slice_copy(&entries),
                    span: span.to(close.span),
                }
            }
            TokenKind::QuestionDot | TokenKind::QuestionBracket | TokenKind::Coalesce => {
                return Err(self.error(
                    span,
                    format!("{} needs an expression on its left", token.kind.describe()),
                ));
            }
            TokenKind::Indent | TokenKind::Dedent => return Err(self.unexpected()),
            kind => {
                return Err(self.error(
                    span,
                    format!("expected an expression, found {}", kind.describe()),
                ));
            }
        };
        Ok(self.alloc(expr))
    }
}
