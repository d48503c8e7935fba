//! The front end as one call: install the symbols, lex, parse, lower.

use bumpalo::Bump;
use tracing::{debug, debug_span};

use crate::ast::Module;
use crate::diagnostics::Diagnostic;
use crate::lexer::{Lexer, symbols};
use crate::lower::lower_module;
use crate::parser::Parser;

/// One compilation unit: its display name and UTF-8 text.
#[derive(Debug, Clone, Copy)]
pub struct SourceUnit<'a> {
    pub name: &'a str,
    pub text: &'a str,
}

impl<'a> SourceUnit<'a> {
    pub fn new(name: &'a str, text: &'a str) -> Self {
        Self { name, text }
    }
}

/// Parses `unit` without lowering. The result may contain `??`, `??=`,
/// `?.` and `?[` nodes.
pub fn parse<'ast>(unit: SourceUnit<'_>, arena: &'ast Bump) -> Result<Module<'ast>, Diagnostic> {
    symbols::install();
    let _span = debug_span!("parse", file = unit.name).entered();
    let mut parser = Parser::new(Lexer::new(unit.text), arena);
    let module = parser
        .parse_module()
        .map_err(|err| Diagnostic::from_parse_error(unit.name, unit.text, &err))?;
    debug!(statements = module.statements.len(), "parsed");
    Ok(module)
}

/// Parses and lowers `unit`. The result contains host constructs only.
pub fn compile<'ast>(unit: SourceUnit<'_>, arena: &'ast Bump) -> Result<Module<'ast>, Diagnostic> {
    let module = parse(unit, arena)?;
    let _span = debug_span!("lower", file = unit.name).entered();
    Ok(lower_module(arena, &module))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::sexpr::module_to_sexpr;
    use crate::diagnostics::DiagnosticKind;
    use crate::lower::has_extensions;

    #[test]
    fn compile_lowers_everything() {
        let arena = Bump::new();
        let module = compile(SourceUnit::new("t.py", "x = a?.b ?? c\n"), &arena).unwrap();
        assert!(!has_extensions(&module));
        assert_eq!(
            module_to_sexpr(&module),
            "(module\n  (assign x (if (is-not (:= $0 (if (is a None) None (chain a (. b)))) None) $0 c)))"
        );
    }

    #[test]
    fn parse_keeps_extension_nodes() {
        let arena = Bump::new();
        let module = parse(SourceUnit::new("t.py", "x ??= y?[0]\n"), &arena).unwrap();
        assert!(has_extensions(&module));
        assert_eq!(
            module_to_sexpr(&module),
            "(module\n  (coalesce-assign x (chain y (?index 0))))"
        );
    }

    #[test]
    fn errors_carry_file_and_position() {
        let arena = Bump::new();
        let err = compile(SourceUnit::new("bad.py", "x = 1\ny = 2 ??\n"), &arena).unwrap_err();
        assert_eq!(err.kind, DiagnosticKind::Syntax);
        assert_eq!(err.file, "bad.py");
        assert_eq!(err.line, 2);
        assert_eq!(err.column, 9);
        assert!(err.message.contains("'??'"));
    }

    #[test]
    fn lexical_errors_are_reported_as_such() {
        let arena = Bump::new();
        let err = compile(SourceUnit::new("bad.py", "x = $\n"), &arena).unwrap_err();
        assert_eq!(err.kind, DiagnosticKind::Lexical);
        assert_eq!((err.line, err.column), (1, 5));
    }
}
