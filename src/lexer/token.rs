use serde::Serialize;

use crate::span::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq, Copy, Hash, Serialize)]
pub enum TokenKind {
    // Keywords
    None, True, False,
    And, Or, Not, Is, In,
    If, Elif, Else, While, Assert, Pass,

    // Identifiers & Literals
    Name,
    Integer,
    Float,
    String,

    // Layout
    Newline,
    Indent,
    Dedent,

    // Brackets
    OpenParen, CloseParen,
    OpenBracket, CloseBracket,
    OpenBrace, CloseBrace,

    // Symbols
    Comma, Colon, SemiColon, Dot,
    Plus, Minus, Asterisk, Slash,
    DoubleSlash, // //
    Percent,
    Pow, // **
    Tilde, // ~
    Ampersand, Pipe, Caret,
    Sl, // <<
    Sr, // >>

    Eq, // =
    PlusEq, MinusEq, MulEq, DivEq, FloorDivEq, ModEq, PowEq,

    EqEq, // ==
    BangEq, // !=
    Lt, // <
    LtEq, // <=
    Gt, // >
    GtEq, // >=

    // Null-aware extension
    Coalesce, // ??
    CoalesceEq, // ??=
    QuestionDot, // ?.
    QuestionBracket, // ?[

    Eof,
}

impl TokenKind {
    pub fn keyword(text: &str) -> Option<TokenKind> {
        Some(match text {
            "None" => TokenKind::None,
            "True" => TokenKind::True,
            "False" => TokenKind::False,
            "and" => TokenKind::And,
            "or" => TokenKind::Or,
            "not" => TokenKind::Not,
            "is" => TokenKind::Is,
            "in" => TokenKind::In,
            "if" => TokenKind::If,
            "elif" => TokenKind::Elif,
            "else" => TokenKind::Else,
            "while" => TokenKind::While,
            "assert" => TokenKind::Assert,
            "pass" => TokenKind::Pass,
            _ => return None,
        })
    }

    pub fn is_extension(self) -> bool {
        matches!(
            self,
            TokenKind::Coalesce
                | TokenKind::CoalesceEq
                | TokenKind::QuestionDot
                | TokenKind::QuestionBracket
        )
    }

    /// Human readable name used in diagnostics.
    pub fn describe(self) -> &'static str {
        match self {
            TokenKind::None => "'None'",
            TokenKind::True => "'True'",
            TokenKind::False => "'False'",
            TokenKind::And => "'and'",
            TokenKind::Or => "'or'",
            TokenKind::Not => "'not'",
            TokenKind::Is => "'is'",
            TokenKind::In => "'in'",
            TokenKind::If => "'if'",
            TokenKind::Elif => "'elif'",
            TokenKind::Else => "'else'",
            TokenKind::While => "'while'",
            TokenKind::Assert => "'assert'",
            TokenKind::Pass => "'pass'",
            TokenKind::Name => "name",
            TokenKind::Integer => "integer",
            TokenKind::Float => "float",
            TokenKind::String => "string",
            TokenKind::Newline => "newline",
            TokenKind::Indent => "indent",
            TokenKind::Dedent => "dedent",
            TokenKind::OpenParen => "'('",
            TokenKind::CloseParen => "')'",
            TokenKind::OpenBracket => "'['",
            TokenKind::CloseBracket => "']'",
            TokenKind::OpenBrace => "'{'",
            TokenKind::CloseBrace => "'}'",
            TokenKind::Comma => "','",
            TokenKind::Colon => "':'",
            TokenKind::SemiColon => "';'",
            TokenKind::Dot => "'.'",
            TokenKind::Plus => "'+'",
            TokenKind::Minus => "'-'",
            TokenKind::Asterisk => "'*'",
            TokenKind::Slash => "'/'",
            TokenKind::DoubleSlash => "'//'",
            TokenKind::Percent => "'%'",
            TokenKind::Pow => "'**'",
            TokenKind::Tilde => "'~'",
            TokenKind::Ampersand => "'&'",
            TokenKind::Pipe => "'|'",
            TokenKind::Caret => "'^'",
            TokenKind::Sl => "'<<'",
            TokenKind::Sr => "'>>'",
            TokenKind::Eq => "'='",
            TokenKind::PlusEq => "'+='",
            TokenKind::MinusEq => "'-='",
            TokenKind::MulEq => "'*='",
            TokenKind::DivEq => "'/='",
            TokenKind::FloorDivEq => "'//='",
            TokenKind::ModEq => "'%='",
            TokenKind::PowEq => "'**='",
            TokenKind::EqEq => "'=='",
            TokenKind::BangEq => "'!='",
            TokenKind::Lt => "'<'",
            TokenKind::LtEq => "'<='",
            TokenKind::Gt => "'>'",
            TokenKind::GtEq => "'>='",
            TokenKind::Coalesce => "'??'",
            TokenKind::CoalesceEq => "'??='",
            TokenKind::QuestionDot => "'?.'",
            TokenKind::QuestionBracket => "'?['",
            TokenKind::Eof => "end of input",
        }
    }
}
