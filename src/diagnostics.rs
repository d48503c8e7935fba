use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::ast::{ErrorKind, ParseError};
use crate::line_index::LineIndex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticKind {
    Lexical,
    Syntax,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DiagnosticKind::Lexical => "lexical",
            DiagnosticKind::Syntax => "syntax",
        })
    }
}

impl From<ErrorKind> for DiagnosticKind {
    fn from(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::Lexical => DiagnosticKind::Lexical,
            ErrorKind::Syntax => DiagnosticKind::Syntax,
        }
    }
}

/// A positioned error for one source unit. Lines and columns are 1-based;
/// columns count characters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("{file}:{line}:{column}: {kind} error: {message}")]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub file: String,
    pub line: u32,
    pub column: u32,
    pub message: String,
}

impl Diagnostic {
    pub fn from_parse_error(file: &str, text: &str, err: &ParseError) -> Self {
        let index = LineIndex::new(text);
        let (line, column) = index.line_col(text, err.span.start);
        Self {
            kind: err.kind.into(),
            file: file.to_string(),
            line,
            column,
            message: err.message.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::Span;

    #[test]
    fn display_format() {
        let err = ParseError {
            kind: ErrorKind::Syntax,
            span: Span::new(6, 8),
            message: "invalid syntax: unexpected '??='".to_string(),
        };
        let diagnostic = Diagnostic::from_parse_error("demo.py", "x = 1\nf() ??= 2\n", &err);
        assert_eq!(diagnostic.line, 2);
        assert_eq!(diagnostic.column, 1);
        assert_eq!(
            diagnostic.to_string(),
            "demo.py:2:1: syntax error: invalid syntax: unexpected '??='"
        );
    }

    #[test]
    fn serializes_kind_in_lowercase() {
        let diagnostic = Diagnostic {
            kind: DiagnosticKind::Lexical,
            file: "a.py".to_string(),
            line: 1,
            column: 3,
            message: "unexpected character '$'".to_string(),
        };
        let json = serde_json::to_value(&diagnostic).unwrap();
        assert_eq!(json["kind"], "lexical");
        assert_eq!(json["column"], 3);
    }
}
