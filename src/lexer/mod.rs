pub mod symbols;
pub mod token;

use std::collections::VecDeque;

use memchr::memchr2;
use thiserror::Error;

use crate::span::Span;
use symbols::SymbolTable;
use token::{Token, TokenKind};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct LexError {
    pub span: Span,
    pub message: String,
}

impl LexError {
    fn new(span: Span, message: impl Into<String>) -> Self {
        Self { span, message: message.into() }
    }
}

pub struct Lexer<'src> {
    input: &'src str,
    cursor: usize,
    table: &'static SymbolTable,
    /// Expected closer and opener span for every open bracket.
    brackets: Vec<(TokenKind, Span)>,
    indents: Vec<usize>,
    pending: VecDeque<Token>,
    at_line_start: bool,
    last_kind: Option<TokenKind>,
    done: bool,
}

impl<'src> Lexer<'src> {
    /// Lexer over the currently active symbol table: the null-aware one once
    /// [`symbols::install`] has run, the host table before.
    pub fn new(input: &'src str) -> Self {
        Self::with_table(input, symbols::active())
    }

    pub fn with_table(input: &'src str, table: &'static SymbolTable) -> Self {
        Self {
            input,
            cursor: 0,
            table,
            brackets: Vec::new(),
            indents: vec![0],
            pending: VecDeque::new(),
            at_line_start: true,
            last_kind: None,
            done: false,
        }
    }

    pub fn source(&self) -> &'src str {
        self.input
    }

    pub fn input_slice(&self, span: Span) -> &'src str {
        span.as_str(self.input)
    }

    fn peek(&self) -> Option<char> {
        self.input[self.cursor..].chars().next()
    }

    fn peek_at(&self, n: usize) -> Option<char> {
        self.input[self.cursor..].chars().nth(n)
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek() {
            self.cursor += c.len_utf8();
        }
    }

    fn token(&self, kind: TokenKind, start: usize) -> Token {
        Token { kind, span: Span::new(start, self.cursor) }
    }

    fn skip_comment(&mut self) {
        let rest = &self.input.as_bytes()[self.cursor..];
        self.cursor += memchr2(b'\n', b'\r', rest).unwrap_or(rest.len());
    }

    /// Consume a line break at the cursor, if any.
    fn eat_newline(&mut self) -> bool {
        match self.peek() {
            Some('\n') => {
                self.advance();
                true
            }
            Some('\r') => {
                self.advance();
                if self.peek() == Some('\n') {
                    self.advance();
                }
                true
            }
            _ => false,
        }
    }

    /// Measure the indentation of a fresh logical line and queue INDENT or
    /// DEDENT tokens. Blank and comment-only lines are skipped entirely.
    fn handle_indentation(&mut self) -> Result<(), LexError> {
        loop {
            let line_start = self.cursor;
            let mut width = 0;
            while let Some(c) = self.peek() {
                match c {
                    ' ' => width += 1,
                    '\t' => width = (width / 8 + 1) * 8,
                    '\x0c' => width = 0,
                    _ => break,
                }
                self.advance();
            }

            match self.peek() {
                None => return Ok(()),
                Some('#') => {
                    self.skip_comment();
                    if !self.eat_newline() {
                        return Ok(());
                    }
                    continue;
                }
                Some('\n') | Some('\r') => {
                    self.eat_newline();
                    continue;
                }
                _ => {}
            }

            let current = self.indents.last().copied().unwrap_or(0);
            let here = Span::new(line_start, self.cursor);
            if width > current {
                self.indents.push(width);
                self.pending.push_back(Token { kind: TokenKind::Indent, span: here });
            } else if width < current {
                while self.indents.last().is_some_and(|&w| w > width) {
                    self.indents.pop();
                    self.pending.push_back(Token { kind: TokenKind::Dedent, span: here });
                }
                if self.indents.last() != Some(&width) {
                    return Err(LexError::new(
                        here,
                        "unindent does not match any outer indentation level",
                    ));
                }
            }
            return Ok(());
        }
    }

    fn finish(&mut self) -> Result<(), LexError> {
        if let Some((_, opener)) = self.brackets.last() {
            return Err(LexError::new(
                *opener,
                format!("'{}' was never closed", opener.as_str(self.input)),
            ));
        }
        let end = Span::new(self.cursor, self.cursor);
        if !matches!(
            self.last_kind,
            None | Some(TokenKind::Newline) | Some(TokenKind::Indent) | Some(TokenKind::Dedent)
        ) {
            self.pending.push_back(Token { kind: TokenKind::Newline, span: end });
        }
        while self.indents.len() > 1 {
            self.indents.pop();
            self.pending.push_back(Token { kind: TokenKind::Dedent, span: end });
        }
        self.pending.push_back(Token { kind: TokenKind::Eof, span: end });
        self.done = true;
        Ok(())
    }

    fn read_name(&mut self, start: usize) -> Token {
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' {
                self.advance();
            } else {
                break;
            }
        }
        let text = &self.input[start..self.cursor];
        self.token(TokenKind::keyword(text).unwrap_or(TokenKind::Name), start)
    }

    fn read_digits(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() || (c == '_' && self.peek_at(1).is_some_and(|n| n.is_ascii_digit())) {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn read_number(&mut self, start: usize) -> Result<Token, LexError> {
        let mut is_float = false;
        self.read_digits();
        if self.peek() == Some('.') {
            is_float = true;
            self.advance();
            self.read_digits();
        }
        if matches!(self.peek(), Some('e') | Some('E')) {
            let signed = matches!(self.peek_at(1), Some('+') | Some('-'));
            let digit_at = if signed { 2 } else { 1 };
            if self.peek_at(digit_at).is_some_and(|c| c.is_ascii_digit()) {
                is_float = true;
                self.advance();
                if signed {
                    self.advance();
                }
                self.read_digits();
            }
        }
        if self.peek().is_some_and(|c| c.is_alphanumeric() || c == '_') {
            self.advance();
            return Err(LexError::new(
                Span::new(start, self.cursor),
                "invalid decimal literal",
            ));
        }
        Ok(self.token(if is_float { TokenKind::Float } else { TokenKind::Integer }, start))
    }

    fn read_string(&mut self, start: usize, quote: char) -> Result<Token, LexError> {
        self.advance(); // opening quote
        while let Some(c) = self.peek() {
            match c {
                c if c == quote => {
                    self.advance();
                    return Ok(self.token(TokenKind::String, start));
                }
                '\\' => {
                    self.advance();
                    if self.peek().is_some() {
                        self.advance();
                    }
                }
                '\n' | '\r' => break,
                _ => self.advance(),
            }
        }
        Err(LexError::new(
            Span::new(start, self.cursor),
            "unterminated string literal",
        ))
    }

    fn read_symbol(&mut self, start: usize) -> Result<Token, LexError> {
        let Some((kind, len)) = self.table.match_symbol(&self.input[start..]) else {
            self.advance();
            let span = Span::new(start, self.cursor);
            return Err(LexError::new(
                span,
                format!("unexpected character '{}'", span.as_str(self.input)),
            ));
        };
        self.cursor += len;
        let token = self.token(kind, start);

        if let Some(closer) = self.table.closer_for(kind) {
            self.brackets.push((closer, token.span));
        } else if self.table.is_closer(kind) {
            match self.brackets.pop() {
                None => {
                    return Err(LexError::new(
                        token.span,
                        format!("unmatched {}", kind.describe()),
                    ));
                }
                Some((expected, opener)) if expected != kind => {
                    return Err(LexError::new(
                        token.span,
                        format!(
                            "closing {} does not match opening '{}'",
                            kind.describe(),
                            opener.as_str(self.input)
                        ),
                    ));
                }
                Some(_) => {}
            }
        }
        Ok(token)
    }

    fn lex_token(&mut self) -> Result<Option<Token>, LexError> {
        loop {
            if self.at_line_start && self.brackets.is_empty() {
                self.at_line_start = false;
                self.handle_indentation()?;
                if !self.pending.is_empty() {
                    return Ok(None);
                }
            }

            while matches!(self.peek(), Some(' ') | Some('\t') | Some('\x0c')) {
                self.advance();
            }

            let start = self.cursor;
            let Some(c) = self.peek() else {
                self.finish()?;
                return Ok(None);
            };

            match c {
                '#' => self.skip_comment(),
                '\\' => {
                    self.advance();
                    if !self.eat_newline() {
                        return Err(LexError::new(
                            Span::new(start, self.cursor),
                            "unexpected character after line continuation character",
                        ));
                    }
                }
                '\n' | '\r' => {
                    self.eat_newline();
                    if self.brackets.is_empty() {
                        self.at_line_start = true;
                        return Ok(Some(Token {
                            kind: TokenKind::Newline,
                            span: Span::new(start, self.cursor),
                        }));
                    }
                }
                c if c.is_alphabetic() || c == '_' => return Ok(Some(self.read_name(start))),
                c if c.is_ascii_digit() => return self.read_number(start).map(Some),
                '.' if self.peek_at(1).is_some_and(|n| n.is_ascii_digit()) => {
                    return self.read_number(start).map(Some);
                }
                '\'' | '"' => return self.read_string(start, c).map(Some),
                _ => return self.read_symbol(start).map(Some),
            }
        }
    }
}

impl<'src> Iterator for Lexer<'src> {
    type Item = Result<Token, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(token) = self.pending.pop_front() {
                self.last_kind = Some(token.kind);
                return Some(Ok(token));
            }
            if self.done {
                return None;
            }
            match self.lex_token() {
                Ok(Some(token)) => {
                    self.last_kind = Some(token.kind);
                    return Some(Ok(token));
                }
                Ok(None) => continue,
                Err(err) => {
                    self.done = true;
                    self.pending.clear();
                    return Some(Err(err));
                }
            }
        }
    }
}

/// Decode the escapes of a string token, quotes included in `raw`.
pub fn unescape(raw: &str) -> String {
    let body = &raw[1..raw.len() - 1];
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some('\\') => out.push('\\'),
            Some('\'') => out.push('\''),
            Some('"') => out.push('"'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        Lexer::with_table(src, symbols::install())
            .map(|t| t.expect("lex error").kind)
            .collect()
    }

    fn lex_error(src: &str) -> LexError {
        Lexer::with_table(src, symbols::install())
            .find_map(Result::err)
            .expect("expected a lex error")
    }

    #[test]
    fn coalesce_tokens_are_atomic() {
        use TokenKind::*;
        assert_eq!(
            kinds("a ?? b ??= c?.d?[e]"),
            vec![
                Name, Coalesce, Name, CoalesceEq, Name, QuestionDot, Name, QuestionBracket, Name,
                CloseBracket, Newline, Eof
            ]
        );
    }

    #[test]
    fn coalesce_eq_is_never_split() {
        use TokenKind::*;
        assert_eq!(kinds("x??=1"), vec![Name, CoalesceEq, Integer, Newline, Eof]);
        assert_eq!(kinds("x?? =1"), vec![Name, Coalesce, Eq, Integer, Newline, Eof]);
    }

    #[test]
    fn lone_question_mark_is_an_error() {
        let err = lex_error("a ? b");
        assert_eq!(err.message, "unexpected character '?'");
        assert_eq!(err.span, Span::new(2, 3));
    }

    #[test]
    fn host_table_rejects_extension_symbols() {
        let err = Lexer::with_table("a ?? b", SymbolTable::host())
            .find_map(Result::err)
            .unwrap();
        assert_eq!(err.span, Span::new(2, 3));
    }

    #[test]
    fn question_bracket_continues_lines() {
        use TokenKind::*;
        let src = "x = a?[\n    1\n]\ny = 2\n";
        assert_eq!(
            kinds(src),
            vec![
                Name, Eq, Name, QuestionBracket, Integer, CloseBracket, Newline, Name, Eq,
                Integer, Newline, Eof
            ]
        );
    }

    #[test]
    fn indentation_produces_blocks() {
        use TokenKind::*;
        let src = "if x:\n    y = 1\n\n    # note\n    z\nw\n";
        assert_eq!(
            kinds(src),
            vec![
                If, Name, Colon, Newline, Indent, Name, Eq, Integer, Newline, Name, Newline,
                Dedent, Name, Newline, Eof
            ]
        );
    }

    #[test]
    fn dedents_are_flushed_at_eof() {
        use TokenKind::*;
        assert_eq!(
            kinds("while a:\n  if b:\n    c"),
            vec![
                While, Name, Colon, Newline, Indent, If, Name, Colon, Newline, Indent, Name,
                Newline, Dedent, Dedent, Eof
            ]
        );
    }

    #[test]
    fn inconsistent_dedent_is_reported() {
        let err = lex_error("if a:\n    b\n  c\n");
        assert_eq!(err.message, "unindent does not match any outer indentation level");
    }

    #[test]
    fn mismatched_brackets_are_reported() {
        assert_eq!(lex_error("a?[1)").message, "closing ')' does not match opening '?['");
        assert_eq!(lex_error("a)").message, "unmatched ')'");
        assert_eq!(lex_error("f(a?[1]").message, "'(' was never closed");
    }

    #[test]
    fn numbers_and_strings() {
        use TokenKind::*;
        assert_eq!(
            kinds("1 2.5 .5 1e3 1_000 'a\\'b' \"c\""),
            vec![Integer, Float, Float, Float, Integer, String, String, Newline, Eof]
        );
        assert_eq!(lex_error("'abc").message, "unterminated string literal");
        assert_eq!(lex_error("12abc").message, "invalid decimal literal");
    }

    #[test]
    fn backslash_joins_lines() {
        use TokenKind::*;
        assert_eq!(kinds("a = 1 + \\\n  2\n"), vec![Name, Eq, Integer, Plus, Integer, Newline, Eof]);
    }

    #[test]
    fn unescape_handles_common_escapes() {
        assert_eq!(unescape(r#"'a\nb\\c\'d'"#), "a\nb\\c'd");
        assert_eq!(unescape(r#""\q""#), "\\q");
    }
}
