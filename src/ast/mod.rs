pub mod sexpr;
pub mod visitor;

use crate::span::Span;

pub type ExprId<'ast> = &'ast Expr<'ast>;
pub type StmtId<'ast> = &'ast Stmt<'ast>;

/// Identifier of a compiler-introduced temporary, unique within its module.
pub type TempId = u32;

#[derive(Debug, PartialEq)]
pub struct Module<'ast> {
    pub statements: &'ast [StmtId<'ast>],
    pub span: Span,
}

#[derive(Debug, PartialEq)]
pub enum Stmt<'ast> {
    Expression {
        expr: ExprId<'ast>,
        span: Span,
    },
    Assign {
        target: ExprId<'ast>,
        value: ExprId<'ast>,
        span: Span,
    },
    AugAssign {
        target: ExprId<'ast>,
        op: BinaryOp,
        value: ExprId<'ast>,
        span: Span,
    },
    /// `target ??= value`
    CoalesceAssign {
        target: ExprId<'ast>,
        value: ExprId<'ast>,
        span: Span,
    },
    If {
        test: ExprId<'ast>,
        body: &'ast [StmtId<'ast>],
        orelse: &'ast [StmtId<'ast>], // `elif` nests another If here
        span: Span,
    },
    While {
        test: ExprId<'ast>,
        body: &'ast [StmtId<'ast>],
        span: Span,
    },
    Assert {
        test: ExprId<'ast>,
        message: Option<ExprId<'ast>>,
        span: Span,
    },
    Pass {
        span: Span,
    },
}

#[derive(Debug, PartialEq)]
pub enum Expr<'ast> {
    Name {
        name: &'ast str,
        span: Span,
    },
    Temp {
        id: TempId,
        span: Span,
    },
    None {
        span: Span,
    },
    Bool {
        value: bool,
        span: Span,
    },
    Integer {
        value: &'ast str, // digits only, underscores removed
        span: Span,
    },
    Float {
        value: f64,
        span: Span,
    },
    String {
        value: &'ast str,
        span: Span,
    },
    List {
        items: &'ast [ExprId<'ast>],
        span: Span,
    },
    Dict {
        entries: &'ast [(ExprId<'ast>, ExprId<'ast>)],
        span: Span,
    },
    Chain {
        base: ExprId<'ast>,
        trailers: &'ast [Trailer<'ast>],
        span: Span,
    },
    Binary {
        left: ExprId<'ast>,
        op: BinaryOp,
        right: ExprId<'ast>,
        span: Span,
    },
    Unary {
        op: UnaryOp,
        operand: ExprId<'ast>,
        span: Span,
    },
    Power {
        base: ExprId<'ast>,
        exponent: ExprId<'ast>,
        span: Span,
    },
    /// `first ?? rest[0] ?? rest[1] ...`; `rest` is never empty.
    Coalesce {
        first: ExprId<'ast>,
        rest: &'ast [ExprId<'ast>],
        span: Span,
    },
    /// `then if test else orelse`
    Conditional {
        test: ExprId<'ast>,
        then: ExprId<'ast>,
        orelse: ExprId<'ast>,
        span: Span,
    },
    /// Evaluate `value`, store it in the temporary and yield it.
    Bind {
        temp: TempId,
        value: ExprId<'ast>,
        span: Span,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Trailer<'ast> {
    Attribute {
        name: &'ast str,
        span: Span,
    },
    Index {
        index: ExprId<'ast>,
        span: Span,
    },
    Call {
        args: &'ast [ExprId<'ast>],
        span: Span,
    },
    /// `?.name`
    OptionalAttribute {
        name: &'ast str,
        span: Span,
    },
    /// `?[index]`
    OptionalIndex {
        index: ExprId<'ast>,
        span: Span,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,
    Minus,
    Not,
    BitNot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Plus,
    Minus,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow, // only as an augmented assignment operator
    ShiftLeft,
    ShiftRight,
    BitAnd,
    BitOr,
    BitXor,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Is,
    IsNot,
    In,
    NotIn,
    And,
    Or,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Plus => "+",
            BinaryOp::Minus => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::FloorDiv => "//",
            BinaryOp::Mod => "%",
            BinaryOp::Pow => "**",
            BinaryOp::ShiftLeft => "<<",
            BinaryOp::ShiftRight => ">>",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::Eq => "==",
            BinaryOp::NotEq => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::LtEq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::GtEq => ">=",
            BinaryOp::Is => "is",
            BinaryOp::IsNot => "is-not",
            BinaryOp::In => "in",
            BinaryOp::NotIn => "not-in",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
        }
    }
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Plus => "+",
            UnaryOp::Minus => "-",
            UnaryOp::Not => "not",
            UnaryOp::BitNot => "~",
        }
    }
}

impl<'ast> Expr<'ast> {
    pub fn span(&self) -> Span {
        match self {
            Expr::Name { span, .. } => *span,
            Expr::Temp { span, .. } => *span,
            Expr::None { span } => *span,
            Expr::Bool { span, .. } => *span,
            Expr::Integer { span, .. } => *span,
            Expr::Float { span, .. } => *span,
            Expr::String { span, .. } => *span,
            Expr::List { span, .. } => *span,
            Expr::Dict { span, .. } => *span,
            Expr::Chain { span, .. } => *span,
            Expr::Binary { span, .. } => *span,
            Expr::Unary { span, .. } => *span,
            Expr::Power { span, .. } => *span,
            Expr::Coalesce { span, .. } => *span,
            Expr::Conditional { span, .. } => *span,
            Expr::Bind { span, .. } => *span,
        }
    }

    /// Evaluating this expression twice is indistinguishable from evaluating
    /// it once.
    pub fn is_trivial(&self) -> bool {
        matches!(
            self,
            Expr::Name { .. }
                | Expr::Temp { .. }
                | Expr::None { .. }
                | Expr::Bool { .. }
                | Expr::Integer { .. }
                | Expr::Float { .. }
                | Expr::String { .. }
        )
    }

    /// Whether this node only exists before lowering.
    pub fn is_extension(&self) -> bool {
        match self {
            Expr::Coalesce { .. } => true,
            Expr::Chain { trailers, .. } => trailers.iter().any(Trailer::is_conditional),
            _ => false,
        }
    }
}

impl<'ast> Trailer<'ast> {
    pub fn span(&self) -> Span {
        match self {
            Trailer::Attribute { span, .. } => *span,
            Trailer::Index { span, .. } => *span,
            Trailer::Call { span, .. } => *span,
            Trailer::OptionalAttribute { span, .. } => *span,
            Trailer::OptionalIndex { span, .. } => *span,
        }
    }

    pub fn is_conditional(&self) -> bool {
        matches!(
            self,
            Trailer::OptionalAttribute { .. } | Trailer::OptionalIndex { .. }
        )
    }

    /// The unconditional form of this trailer.
    pub fn unconditional(self) -> Trailer<'ast> {
        match self {
            Trailer::OptionalAttribute { name, span } => Trailer::Attribute { name, span },
            Trailer::OptionalIndex { index, span } => Trailer::Index { index, span },
            other => other,
        }
    }
}

impl<'ast> Stmt<'ast> {
    pub fn span(&self) -> Span {
        match self {
            Stmt::Expression { span, .. } => *span,
            Stmt::Assign { span, .. } => *span,
            Stmt::AugAssign { span, .. } => *span,
            Stmt::CoalesceAssign { span, .. } => *span,
            Stmt::If { span, .. } => *span,
            Stmt::While { span, .. } => *span,
            Stmt::Assert { span, .. } => *span,
            Stmt::Pass { span } => *span,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Lexical,
    Syntax,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ParseError {
    pub kind: ErrorKind,
    pub span: Span,
    pub message: String,
}

impl From<crate::lexer::LexError> for ParseError {
    fn from(err: crate::lexer::LexError) -> Self {
        ParseError {
            kind: ErrorKind::Lexical,
            span: err.span,
            message: err.message,
        }
    }
}
