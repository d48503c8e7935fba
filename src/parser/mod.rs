mod expr;
pub mod precedence;

use bumpalo::Bump;
use tracing::trace;

use crate::ast::{BinaryOp, ErrorKind, Expr, ExprId, Module, ParseError, Stmt, StmtId, Trailer};
use crate::lexer::Lexer;
use crate::lexer::token::{Token, TokenKind};
use crate::span::Span;
use precedence::assign_op;

pub type PResult<T> = Result<T, ParseError>;

enum AssignKind {
    Plain,
    Coalesce,
    Augmented(BinaryOp),
}

/// Single-pass, fail-fast parser. The first unexpected token ends the parse
/// with an error; there is no recovery.
pub struct Parser<'src, 'ast> {
    lexer: Lexer<'src>,
    source: &'src str,
    arena: &'ast Bump,
    current_token: Token,
    next_token: Token,
    primed: bool,
}

impl<'src, 'ast> Parser<'src, 'ast> {
    pub fn new(lexer: Lexer<'src>, arena: &'ast Bump) -> Self {
        let source = lexer.source();
        let eof = Token {
            kind: TokenKind::Eof,
            span: Span::new(source.len(), source.len()),
        };
        Self {
            lexer,
            source,
            arena,
            current_token: eof,
            next_token: eof,
            primed: false,
        }
    }

    fn prime(&mut self) -> PResult<()> {
        if !self.primed {
            self.primed = true;
            self.bump()?;
            self.bump()?;
        }
        Ok(())
    }

    fn bump(&mut self) -> PResult<()> {
        self.current_token = self.next_token;
        self.next_token = match self.lexer.next() {
            Some(token) => token?,
            None => Token {
                kind: TokenKind::Eof,
                span: Span::new(self.source.len(), self.source.len()),
            },
        };
        Ok(())
    }

    fn alloc(&self, expr: Expr<'ast>) -> ExprId<'ast> {
        self.arena.alloc(expr)
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.current_token.kind == kind
    }

    fn text(&self, token: Token) -> &'src str {
        token.span.as_str(self.source)
    }

    fn error(&self, span: Span, message: impl Into<String>) -> ParseError {
        ParseError {
            kind: ErrorKind::Syntax,
            span,
            message: message.into(),
        }
    }

    fn unexpected(&self) -> ParseError {
        let token = self.current_token;
        let message = match token.kind {
            TokenKind::Indent => "unexpected indent".to_string(),
            TokenKind::Dedent => "unindent does not match any outer block".to_string(),
            kind => format!("invalid syntax: unexpected {}", kind.describe()),
        };
        self.error(token.span, message)
    }

    fn expect(&mut self, kind: TokenKind) -> PResult<Token> {
        if self.at(kind) {
            let token = self.current_token;
            self.bump()?;
            Ok(token)
        } else {
            Err(self.error(
                self.current_token.span,
                format!(
                    "expected {}, found {}",
                    kind.describe(),
                    self.current_token.kind.describe()
                ),
            ))
        }
    }

    pub fn parse_module(&mut self) -> PResult<Module<'ast>> {
        self.prime()?;
        let mut statements = std::vec::Vec::new();
        while !self.at(TokenKind::Eof) {
            if self.at(TokenKind::Newline) {
                self.bump()?;
                continue;
            }
            self.parse_stmt(&mut statements)?;
        }
        trace!(statements = statements.len(), "parsed module");

        let span = match (statements.first(), statements.last()) {
            (Some(first), Some(last)) => first.span().to(last.span()),
            _ => Span::default(),
        };
        Ok(Module {
            statements: self.arena.alloc_slice_copy(&statements),
            span,
        })
    }

    /// Parse a single expression spanning the whole input.
    pub fn parse_standalone_expression(&mut self) -> PResult<ExprId<'ast>> {
        self.prime()?;
        let expr = self.parse_expression()?;
        while self.at(TokenKind::Newline) {
            self.bump()?;
        }
        if !self.at(TokenKind::Eof) {
            return Err(self.unexpected());
        }
        Ok(expr)
    }

    fn parse_stmt(&mut self, out: &mut Vec<StmtId<'ast>>) -> PResult<()> {
        match self.current_token.kind {
            TokenKind::If => {
                let stmt = self.parse_if()?;
                out.push(stmt);
                Ok(())
            }
            TokenKind::While => {
                let stmt = self.parse_while()?;
                out.push(stmt);
                Ok(())
            }
            _ => self.parse_simple_line(out),
        }
    }

    /// `simple (';' simple)* [';'] NEWLINE`
    fn parse_simple_line(&mut self, out: &mut Vec<StmtId<'ast>>) -> PResult<()> {
        loop {
            out.push(self.parse_simple_stmt()?);
            match self.current_token.kind {
                TokenKind::SemiColon => {
                    self.bump()?;
                    if matches!(self.current_token.kind, TokenKind::Newline | TokenKind::Eof) {
                        break;
                    }
                }
                TokenKind::Newline | TokenKind::Eof => break,
                _ => return Err(self.unexpected()),
            }
        }
        if self.at(TokenKind::Newline) {
            self.bump()?;
        }
        Ok(())
    }

    fn parse_simple_stmt(&mut self) -> PResult<StmtId<'ast>> {
        let start = self.current_token.span;
        match self.current_token.kind {
            TokenKind::Pass => {
                self.bump()?;
                return Ok(self.arena.alloc(Stmt::Pass { span: start }));
            }
            TokenKind::Assert => {
                self.bump()?;
                let test = self.parse_expression()?;
                let message = if self.at(TokenKind::Comma) {
                    self.bump()?;
                    Some(self.parse_expression()?)
                } else {
                    None
                };
                let end = message.unwrap_or(test).span();
                return Ok(self.arena.alloc(Stmt::Assert {
                    test,
                    message,
                    span: start.to(end),
                }));
            }
            _ => {}
        }

        let expr = self.parse_expression()?;
        let kind = self.current_token.kind;
        let assign = match kind {
            TokenKind::Eq => Some(AssignKind::Plain),
            TokenKind::CoalesceEq => Some(AssignKind::Coalesce),
            other => assign_op(other).map(AssignKind::Augmented),
        };
        let Some(assign) = assign else {
            return Ok(self.arena.alloc(Stmt::Expression {
                expr,
                span: expr.span(),
            }));
        };

        self.check_assign_target(expr, kind)?;
        self.bump()?;
        let value = self.parse_expression()?;
        if self.at(TokenKind::Eq) {
            return Err(self.error(
                self.current_token.span,
                "chained assignment is not supported",
            ));
        }
        let span = expr.span().to(value.span());
        let stmt = match assign {
            AssignKind::Plain => Stmt::Assign { target: expr, value, span },
            AssignKind::Coalesce => Stmt::CoalesceAssign { target: expr, value, span },
            AssignKind::Augmented(op) => Stmt::AugAssign { target: expr, op, value, span },
        };
        Ok(self.arena.alloc(stmt))
    }

    /// Names and attribute/index chains are assignable; chains containing a
    /// conditional trailer are not.
    fn check_assign_target(&self, target: ExprId<'ast>, op: TokenKind) -> PResult<()> {
        let what = match target {
            Expr::Name { .. } => return Ok(()),
            Expr::Chain { trailers, .. } => {
                if trailers.iter().any(Trailer::is_conditional) {
                    "optional chain"
                } else {
                    match trailers.last() {
                        Some(Trailer::Attribute { .. }) | Some(Trailer::Index { .. }) => {
                            return Ok(());
                        }
                        _ => "function call",
                    }
                }
            }
            Expr::None { .. }
            | Expr::Bool { .. }
            | Expr::Integer { .. }
            | Expr::Float { .. }
            | Expr::String { .. } => "literal",
            Expr::Coalesce { .. } => "coalesce expression",
            Expr::Conditional { .. } => "conditional expression",
            _ => "expression",
        };
        Err(self.error(
            target.span(),
            format!("cannot assign to {what} with {}", op.describe()),
        ))
    }

    /// `':' (NEWLINE INDENT stmt+ DEDENT | simple_line)`
    fn parse_suite(&mut self) -> PResult<&'ast [StmtId<'ast>]> {
        self.expect(TokenKind::Colon)?;
        let mut body = std::vec::Vec::new();
        if self.at(TokenKind::Newline) {
            self.bump()?;
            if !self.at(TokenKind::Indent) {
                return Err(self.error(
                    self.current_token.span,
                    "expected an indented block",
                ));
            }
            self.bump()?;
            while !self.at(TokenKind::Dedent) && !self.at(TokenKind::Eof) {
                self.parse_stmt(&mut body)?;
            }
            if self.at(TokenKind::Dedent) {
                self.bump()?;
            }
        } else {
            self.parse_simple_line(&mut body)?;
        }
        Ok(self.arena.alloc_slice_copy(&body))
    }

    fn block_span(start: Span, body: &[StmtId<'ast>]) -> Span {
        body.last().map_or(start, |last| start.to(last.span()))
    }

    /// `if`/`elif` chain; `elif` becomes a nested `If` in `orelse`.
    fn parse_if(&mut self) -> PResult<StmtId<'ast>> {
        let start = self.current_token.span;
        self.bump()?; // `if` or `elif`
        let test = self.parse_expression()?;
        let body = self.parse_suite()?;

        let orelse: &'ast [StmtId<'ast>] = match self.current_token.kind {
            TokenKind::Elif => {
                let nested = self.parse_if()?;
                &*self.arena.alloc_slice_copy(&[nested])
            }
            TokenKind::Else => {
                self.bump()?;
                self.parse_suite()?
            }
            _ => &[],
        };

        let span = Self::block_span(start, if orelse.is_empty() { body } else { orelse });
        Ok(self.arena.alloc(Stmt::If { test, body, orelse, span }))
    }

    fn parse_while(&mut self) -> PResult<StmtId<'ast>> {
        let start = self.current_token.span;
        self.bump()?;
        let test = self.parse_expression()?;
        let body = self.parse_suite()?;
        let span = Self::block_span(start, body);
        Ok(self.arena.alloc(Stmt::While { test, body, span }))
    }
}
