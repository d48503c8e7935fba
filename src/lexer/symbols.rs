//! Punctuation table consulted by the lexer.
//!
//! The host table knows the ordinary operators and brackets. The null-aware
//! symbols live in a second table layered over the host one; it is built
//! exactly once per process by [`install`] and is never mutated or torn down
//! afterwards. Lexers only ever read a table.

use std::sync::OnceLock;

use tracing::debug;

use super::token::TokenKind;

const HOST_SYMBOLS: &[(&str, TokenKind)] = &[
    ("(", TokenKind::OpenParen),
    (")", TokenKind::CloseParen),
    ("[", TokenKind::OpenBracket),
    ("]", TokenKind::CloseBracket),
    ("{", TokenKind::OpenBrace),
    ("}", TokenKind::CloseBrace),
    (",", TokenKind::Comma),
    (":", TokenKind::Colon),
    (";", TokenKind::SemiColon),
    (".", TokenKind::Dot),
    ("+", TokenKind::Plus),
    ("-", TokenKind::Minus),
    ("*", TokenKind::Asterisk),
    ("/", TokenKind::Slash),
    ("//", TokenKind::DoubleSlash),
    ("%", TokenKind::Percent),
    ("**", TokenKind::Pow),
    ("~", TokenKind::Tilde),
    ("&", TokenKind::Ampersand),
    ("|", TokenKind::Pipe),
    ("^", TokenKind::Caret),
    ("<<", TokenKind::Sl),
    (">>", TokenKind::Sr),
    ("=", TokenKind::Eq),
    ("+=", TokenKind::PlusEq),
    ("-=", TokenKind::MinusEq),
    ("*=", TokenKind::MulEq),
    ("/=", TokenKind::DivEq),
    ("//=", TokenKind::FloorDivEq),
    ("%=", TokenKind::ModEq),
    ("**=", TokenKind::PowEq),
    ("==", TokenKind::EqEq),
    ("!=", TokenKind::BangEq),
    ("<", TokenKind::Lt),
    ("<=", TokenKind::LtEq),
    (">", TokenKind::Gt),
    (">=", TokenKind::GtEq),
];

const HOST_BRACKETS: &[(TokenKind, TokenKind)] = &[
    (TokenKind::OpenParen, TokenKind::CloseParen),
    (TokenKind::OpenBracket, TokenKind::CloseBracket),
    (TokenKind::OpenBrace, TokenKind::CloseBrace),
];

const EXTENSION_SYMBOLS: &[(&str, TokenKind)] = &[
    ("??", TokenKind::Coalesce),
    ("??=", TokenKind::CoalesceEq),
    ("?.", TokenKind::QuestionDot),
    ("?[", TokenKind::QuestionBracket),
];

// `?[` opens a bracket that is closed by an ordinary `]`.
const EXTENSION_BRACKETS: &[(TokenKind, TokenKind)] =
    &[(TokenKind::QuestionBracket, TokenKind::CloseBracket)];

#[derive(Debug, Clone)]
pub struct SymbolTable {
    /// Longest spelling first, so a linear scan is a greedy longest match.
    symbols: Vec<(&'static str, TokenKind)>,
    brackets: Vec<(TokenKind, TokenKind)>,
}

static HOST: OnceLock<SymbolTable> = OnceLock::new();
static EXTENDED: OnceLock<SymbolTable> = OnceLock::new();

impl SymbolTable {
    fn from_parts(
        symbols: impl IntoIterator<Item = (&'static str, TokenKind)>,
        brackets: impl IntoIterator<Item = (TokenKind, TokenKind)>,
    ) -> Self {
        let mut symbols: Vec<_> = symbols.into_iter().collect();
        symbols.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then(a.0.cmp(b.0)));
        Self {
            symbols,
            brackets: brackets.into_iter().collect(),
        }
    }

    /// The table of the unextended host language.
    pub fn host() -> &'static SymbolTable {
        HOST.get_or_init(|| {
            SymbolTable::from_parts(HOST_SYMBOLS.iter().copied(), HOST_BRACKETS.iter().copied())
        })
    }

    /// A new table holding everything in `self` plus the given entries.
    pub fn layered(
        &self,
        symbols: &[(&'static str, TokenKind)],
        brackets: &[(TokenKind, TokenKind)],
    ) -> SymbolTable {
        SymbolTable::from_parts(
            self.symbols.iter().chain(symbols).copied(),
            self.brackets.iter().chain(brackets).copied(),
        )
    }

    /// Longest symbol that prefixes `rest`, with its byte length.
    pub fn match_symbol(&self, rest: &str) -> Option<(TokenKind, usize)> {
        self.symbols
            .iter()
            .find(|(spelling, _)| rest.starts_with(spelling))
            .map(|(spelling, kind)| (*kind, spelling.len()))
    }

    /// The closing bracket expected for `opener`, if it opens a bracket.
    pub fn closer_for(&self, opener: TokenKind) -> Option<TokenKind> {
        self.brackets
            .iter()
            .find(|(open, _)| *open == opener)
            .map(|(_, close)| *close)
    }

    pub fn is_closer(&self, kind: TokenKind) -> bool {
        self.brackets.iter().any(|(_, close)| *close == kind)
    }

    pub fn contains(&self, kind: TokenKind) -> bool {
        self.symbols.iter().any(|(_, k)| *k == kind)
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

/// Install the null-aware symbols. Idempotent and safe to race: every caller
/// gets the same table, and the host table is left untouched.
pub fn install() -> &'static SymbolTable {
    EXTENDED.get_or_init(|| {
        let table = SymbolTable::host().layered(EXTENSION_SYMBOLS, EXTENSION_BRACKETS);
        debug!(symbols = table.len(), "installed null-aware symbol table");
        table
    })
}

pub fn is_installed() -> bool {
    EXTENDED.get().is_some()
}

/// The extended table once installed, the host table before that.
pub fn active() -> &'static SymbolTable {
    EXTENDED.get().unwrap_or_else(SymbolTable::host)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn longest_match_wins() {
        let table = install();
        assert_eq!(table.match_symbol("??= 1"), Some((TokenKind::CoalesceEq, 3)));
        assert_eq!(table.match_symbol("?? 1"), Some((TokenKind::Coalesce, 2)));
        assert_eq!(table.match_symbol("**=2"), Some((TokenKind::PowEq, 3)));
        assert_eq!(table.match_symbol("//x"), Some((TokenKind::DoubleSlash, 2)));
    }

    #[test]
    fn host_table_is_not_extended() {
        install();
        let host = SymbolTable::host();
        assert!(!host.contains(TokenKind::Coalesce));
        assert_eq!(host.match_symbol("?."), None);
        assert_eq!(host.closer_for(TokenKind::QuestionBracket), None);
    }

    #[test]
    fn question_bracket_is_an_opener() {
        let table = install();
        assert_eq!(
            table.closer_for(TokenKind::QuestionBracket),
            Some(TokenKind::CloseBracket)
        );
        assert!(table.is_closer(TokenKind::CloseBracket));
        assert!(!table.is_closer(TokenKind::QuestionBracket));
    }

    #[test]
    fn install_is_idempotent_across_threads() {
        let tables: Vec<usize> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| install() as *const SymbolTable as usize))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert!(tables.windows(2).all(|w| w[0] == w[1]));
        assert!(is_installed());
        assert!(std::ptr::eq(active(), install()));
    }
}
