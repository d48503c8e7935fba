pub mod ast;
pub mod compile;
pub mod diagnostics;
pub mod lexer;
pub mod line_index;
pub mod lower;
pub mod parser;
pub mod router;
pub mod span;

pub use compile::{SourceUnit, compile, parse};
pub use diagnostics::{Diagnostic, DiagnosticKind};
pub use span::Span;
