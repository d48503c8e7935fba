//! The operator precedence table.
//!
//! Every infix operator the expression parser understands is listed in
//! [`infix_rule`]. Levels are ordered loosest first, so `a < b` means `a`
//! binds more loosely than `b`.
//!
//! The coalesce operator sits between the unary prefix operators and `**`:
//! its left operand is a power expression, and its right operand is parsed at
//! term level, so it may absorb `*` and `**` but stops before `+`.

use crate::ast::BinaryOp;
use crate::lexer::token::TokenKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
    Lowest,
    Or,
    And,
    Not,
    Comparison,
    BitOr,
    BitXor,
    BitAnd,
    Shift,
    Arith,
    Term,
    /// Unary `+ - ~`. Also the operand level of `**`'s exponent.
    Factor,
    Coalesce,
    Power,
}

impl Precedence {
    /// The next tighter level.
    pub fn tighter(self) -> Precedence {
        match self {
            Precedence::Lowest => Precedence::Or,
            Precedence::Or => Precedence::And,
            Precedence::And => Precedence::Not,
            Precedence::Not => Precedence::Comparison,
            Precedence::Comparison => Precedence::BitOr,
            Precedence::BitOr => Precedence::BitXor,
            Precedence::BitXor => Precedence::BitAnd,
            Precedence::BitAnd => Precedence::Shift,
            Precedence::Shift => Precedence::Arith,
            Precedence::Arith => Precedence::Term,
            Precedence::Term => Precedence::Factor,
            Precedence::Factor => Precedence::Coalesce,
            Precedence::Coalesce => Precedence::Power,
            Precedence::Power => Precedence::Power,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfixOp {
    Binary(BinaryOp),
    Power,
    Coalesce,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InfixRule {
    pub op: InfixOp,
    /// Level of the operator itself.
    pub precedence: Precedence,
    /// Minimum level of the right operand.
    pub rhs: Precedence,
    /// Operand width in tokens: `is not` and `not in` take two.
    pub width: usize,
}

impl InfixRule {
    fn left(op: BinaryOp, precedence: Precedence) -> Self {
        Self {
            op: InfixOp::Binary(op),
            precedence,
            rhs: precedence.tighter(),
            width: 1,
        }
    }
}

/// Infix rule for the operator starting at `current`. `next` is needed to
/// recognise `not in` and `is not`.
pub fn infix_rule(current: TokenKind, next: TokenKind) -> Option<InfixRule> {
    use Precedence as P;
    Some(match current {
        TokenKind::Or => InfixRule::left(BinaryOp::Or, P::Or),
        TokenKind::And => InfixRule::left(BinaryOp::And, P::And),
        TokenKind::EqEq => InfixRule::left(BinaryOp::Eq, P::Comparison),
        TokenKind::BangEq => InfixRule::left(BinaryOp::NotEq, P::Comparison),
        TokenKind::Lt => InfixRule::left(BinaryOp::Lt, P::Comparison),
        TokenKind::LtEq => InfixRule::left(BinaryOp::LtEq, P::Comparison),
        TokenKind::Gt => InfixRule::left(BinaryOp::Gt, P::Comparison),
        TokenKind::GtEq => InfixRule::left(BinaryOp::GtEq, P::Comparison),
        TokenKind::In => InfixRule::left(BinaryOp::In, P::Comparison),
        TokenKind::Is if next == TokenKind::Not => InfixRule {
            width: 2,
            ..InfixRule::left(BinaryOp::IsNot, P::Comparison)
        },
        TokenKind::Is => InfixRule::left(BinaryOp::Is, P::Comparison),
        TokenKind::Not if next == TokenKind::In => InfixRule {
            width: 2,
            ..InfixRule::left(BinaryOp::NotIn, P::Comparison)
        },
        TokenKind::Pipe => InfixRule::left(BinaryOp::BitOr, P::BitOr),
        TokenKind::Caret => InfixRule::left(BinaryOp::BitXor, P::BitXor),
        TokenKind::Ampersand => InfixRule::left(BinaryOp::BitAnd, P::BitAnd),
        TokenKind::Sl => InfixRule::left(BinaryOp::ShiftLeft, P::Shift),
        TokenKind::Sr => InfixRule::left(BinaryOp::ShiftRight, P::Shift),
        TokenKind::Plus => InfixRule::left(BinaryOp::Plus, P::Arith),
        TokenKind::Minus => InfixRule::left(BinaryOp::Minus, P::Arith),
        TokenKind::Asterisk => InfixRule::left(BinaryOp::Mul, P::Term),
        TokenKind::Slash => InfixRule::left(BinaryOp::Div, P::Term),
        TokenKind::DoubleSlash => InfixRule::left(BinaryOp::FloorDiv, P::Term),
        TokenKind::Percent => InfixRule::left(BinaryOp::Mod, P::Term),
        TokenKind::Coalesce => InfixRule {
            op: InfixOp::Coalesce,
            precedence: P::Coalesce,
            rhs: P::Term,
            width: 1,
        },
        // Right-associative: the exponent is a whole factor.
        TokenKind::Pow => InfixRule {
            op: InfixOp::Power,
            precedence: P::Power,
            rhs: P::Factor,
            width: 1,
        },
        _ => return None,
    })
}

/// Augmented assignment operators.
pub fn assign_op(kind: TokenKind) -> Option<BinaryOp> {
    Some(match kind {
        TokenKind::PlusEq => BinaryOp::Plus,
        TokenKind::MinusEq => BinaryOp::Minus,
        TokenKind::MulEq => BinaryOp::Mul,
        TokenKind::DivEq => BinaryOp::Div,
        TokenKind::FloorDivEq => BinaryOp::FloorDiv,
        TokenKind::ModEq => BinaryOp::Mod,
        TokenKind::PowEq => BinaryOp::Pow,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(kind: TokenKind) -> InfixRule {
        infix_rule(kind, TokenKind::Name).expect("operator")
    }

    #[test]
    fn coalesce_sits_between_factor_and_power() {
        let coalesce = rule(TokenKind::Coalesce);
        assert!(coalesce.precedence > Precedence::Factor);
        assert!(coalesce.precedence < rule(TokenKind::Pow).precedence);
        assert!(coalesce.precedence > rule(TokenKind::Asterisk).precedence);
        assert!(coalesce.precedence > rule(TokenKind::Plus).precedence);
    }

    #[test]
    fn coalesce_right_operand_is_a_term() {
        let coalesce = rule(TokenKind::Coalesce);
        assert_eq!(coalesce.rhs, Precedence::Term);
        // `*` and `**` are reachable from a term parse, `+` is not.
        assert!(rule(TokenKind::Asterisk).precedence >= coalesce.rhs);
        assert!(rule(TokenKind::Pow).precedence >= coalesce.rhs);
        assert!(rule(TokenKind::Plus).precedence < coalesce.rhs);
    }

    #[test]
    fn power_exponent_is_a_factor() {
        let pow = rule(TokenKind::Pow);
        assert_eq!(pow.rhs, Precedence::Factor);
        // A coalesce can occupy the exponent slot.
        assert!(rule(TokenKind::Coalesce).precedence >= pow.rhs);
    }

    #[test]
    fn two_token_comparisons() {
        let is_not = infix_rule(TokenKind::Is, TokenKind::Not).unwrap();
        assert_eq!(is_not.op, InfixOp::Binary(BinaryOp::IsNot));
        assert_eq!(is_not.width, 2);
        let not_in = infix_rule(TokenKind::Not, TokenKind::In).unwrap();
        assert_eq!(not_in.op, InfixOp::Binary(BinaryOp::NotIn));
        assert_eq!(infix_rule(TokenKind::Not, TokenKind::Name), None);
    }

    #[test]
    fn left_associative_operators_bind_their_rhs_tighter() {
        for kind in [TokenKind::Plus, TokenKind::Asterisk, TokenKind::Or, TokenKind::Lt] {
            let r = rule(kind);
            assert_eq!(r.rhs, r.precedence.tighter());
        }
    }
}
