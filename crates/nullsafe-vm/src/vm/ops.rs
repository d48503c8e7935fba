//! Arithmetic, bitwise and comparison operators.

use std::cmp::Ordering;
use std::rc::Rc;

use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::{Signed, ToPrimitive, Zero};

use nullsafe_parser::ast::{BinaryOp, UnaryOp};

use crate::core::value::{DictKey, Val};
use crate::vm::engine::VmError;

fn unsupported(op: &str, left: &Val, right: &Val) -> VmError {
    VmError::Type(format!(
        "unsupported operand type(s) for {op}: '{}' and '{}'",
        left.type_name(),
        right.type_name()
    ))
}

/// Both operands as integers, or both as floats when either is a float.
enum Pair {
    Int(BigInt, BigInt),
    Float(f64, f64),
}

fn numeric(left: &Val, right: &Val) -> Option<Pair> {
    if let (Some(a), Some(b)) = (left.as_int(), right.as_int()) {
        return Some(Pair::Int(a, b));
    }
    match (left.as_float(), right.as_float()) {
        (Some(a), Some(b)) => Some(Pair::Float(a, b)),
        _ => None,
    }
}

fn repeat_count(count: &Val) -> Option<usize> {
    count.as_int().map(|n| n.to_usize().unwrap_or(0))
}

/// Every binary operator except `and` and `or`, which short-circuit in the
/// engine.
pub fn binary(op: BinaryOp, left: &Val, right: &Val) -> Result<Val, VmError> {
    match op {
        BinaryOp::Plus => add(left, right),
        BinaryOp::Minus => arith(op, left, right, |a, b| a - b, |a, b| a - b),
        BinaryOp::Mul => mul(left, right),
        BinaryOp::Div => div(left, right),
        BinaryOp::FloorDiv => floor_div(left, right),
        BinaryOp::Mod => modulo(left, right),
        BinaryOp::Pow => pow(left, right),
        BinaryOp::ShiftLeft | BinaryOp::ShiftRight => shift(op, left, right),
        BinaryOp::BitAnd => bitwise(op, left, right, |a, b| a & b),
        BinaryOp::BitOr => bitwise(op, left, right, |a, b| a | b),
        BinaryOp::BitXor => bitwise(op, left, right, |a, b| a ^ b),
        BinaryOp::Eq => Ok(Val::Bool(left == right)),
        BinaryOp::NotEq => Ok(Val::Bool(left != right)),
        BinaryOp::Lt => compare(op, left, right).map(|o| Val::Bool(o == Ordering::Less)),
        BinaryOp::LtEq => compare(op, left, right).map(|o| Val::Bool(o != Ordering::Greater)),
        BinaryOp::Gt => compare(op, left, right).map(|o| Val::Bool(o == Ordering::Greater)),
        BinaryOp::GtEq => compare(op, left, right).map(|o| Val::Bool(o != Ordering::Less)),
        BinaryOp::Is => Ok(Val::Bool(left.is_identical(right))),
        BinaryOp::IsNot => Ok(Val::Bool(!left.is_identical(right))),
        BinaryOp::In => contains(right, left).map(Val::Bool),
        BinaryOp::NotIn => contains(right, left).map(|found| Val::Bool(!found)),
        BinaryOp::And | BinaryOp::Or => Err(VmError::Type(format!(
            "'{}' cannot be applied eagerly",
            op.symbol()
        ))),
    }
}

fn arith(
    op: BinaryOp,
    left: &Val,
    right: &Val,
    int: impl Fn(BigInt, BigInt) -> BigInt,
    float: impl Fn(f64, f64) -> f64,
) -> Result<Val, VmError> {
    match numeric(left, right) {
        Some(Pair::Int(a, b)) => Ok(Val::Int(int(a, b))),
        Some(Pair::Float(a, b)) => Ok(Val::Float(float(a, b))),
        None => Err(unsupported(op.symbol(), left, right)),
    }
}

fn add(left: &Val, right: &Val) -> Result<Val, VmError> {
    match (left, right) {
        (Val::Str(a), Val::Str(b)) => Ok(Val::Str(Rc::from(format!("{a}{b}")))),
        (Val::List(a), Val::List(b)) => {
            let mut items = a.borrow().clone();
            items.extend(b.borrow().iter().cloned());
            Ok(Val::list(items))
        }
        _ => arith(BinaryOp::Plus, left, right, |a, b| a + b, |a, b| a + b),
    }
}

fn mul(left: &Val, right: &Val) -> Result<Val, VmError> {
    match (left, right) {
        (Val::Str(s), count) | (count, Val::Str(s)) if count.as_int().is_some() => {
            let n = repeat_count(count).unwrap_or(0);
            Ok(Val::Str(Rc::from(s.repeat(n))))
        }
        (Val::List(items), count) | (count, Val::List(items)) if count.as_int().is_some() => {
            let n = repeat_count(count).unwrap_or(0);
            let items = items.borrow();
            let mut out = Vec::with_capacity(items.len() * n);
            for _ in 0..n {
                out.extend(items.iter().cloned());
            }
            Ok(Val::list(out))
        }
        _ => arith(BinaryOp::Mul, left, right, |a, b| a * b, |a, b| a * b),
    }
}

fn div(left: &Val, right: &Val) -> Result<Val, VmError> {
    let (Some(a), Some(b)) = (left.as_float(), right.as_float()) else {
        return Err(unsupported("/", left, right));
    };
    if b == 0.0 {
        return Err(VmError::ZeroDivision);
    }
    Ok(Val::Float(a / b))
}

fn floor_div(left: &Val, right: &Val) -> Result<Val, VmError> {
    if is_zero(right) && numeric(left, right).is_some() {
        return Err(VmError::ZeroDivision);
    }
    match numeric(left, right) {
        Some(Pair::Int(a, b)) => Ok(Val::Int(a.div_floor(&b))),
        Some(Pair::Float(a, b)) => Ok(Val::Float((a / b).floor())),
        None => Err(unsupported("//", left, right)),
    }
}

fn modulo(left: &Val, right: &Val) -> Result<Val, VmError> {
    if is_zero(right) && numeric(left, right).is_some() {
        return Err(VmError::ZeroDivision);
    }
    match numeric(left, right) {
        Some(Pair::Int(a, b)) => Ok(Val::Int(a.mod_floor(&b))),
        Some(Pair::Float(a, b)) => Ok(Val::Float(a - b * (a / b).floor())),
        None => Err(unsupported("%", left, right)),
    }
}

fn pow(left: &Val, right: &Val) -> Result<Val, VmError> {
    match numeric(left, right) {
        Some(Pair::Int(base, exp)) if !exp.is_negative() => {
            let Some(exp) = exp.to_u32() else {
                return Err(VmError::Type("exponent too large".to_string()));
            };
            Ok(Val::Int(base.pow(exp)))
        }
        Some(Pair::Int(base, exp)) => {
            let base = base.to_f64().unwrap_or(f64::INFINITY);
            if base == 0.0 {
                return Err(VmError::ZeroDivision);
            }
            Ok(Val::Float(base.powf(exp.to_f64().unwrap_or(f64::NEG_INFINITY))))
        }
        Some(Pair::Float(base, exp)) => {
            if base == 0.0 && exp < 0.0 {
                return Err(VmError::ZeroDivision);
            }
            Ok(Val::Float(base.powf(exp)))
        }
        None => Err(unsupported("**", left, right)),
    }
}

fn shift(op: BinaryOp, left: &Val, right: &Val) -> Result<Val, VmError> {
    let (Some(a), Some(b)) = (left.as_int(), right.as_int()) else {
        return Err(unsupported(op.symbol(), left, right));
    };
    if b.is_negative() {
        return Err(VmError::Value("negative shift count".to_string()));
    }
    let Some(count) = b.to_usize() else {
        return Err(VmError::Value("shift count too large".to_string()));
    };
    Ok(Val::Int(match op {
        BinaryOp::ShiftLeft => a << count,
        _ => a >> count,
    }))
}

fn bitwise(
    op: BinaryOp,
    left: &Val,
    right: &Val,
    apply: impl Fn(&BigInt, &BigInt) -> BigInt,
) -> Result<Val, VmError> {
    match (left, right) {
        (Val::Bool(a), Val::Bool(b)) => {
            let result = apply(&BigInt::from(*a as u8), &BigInt::from(*b as u8));
            Ok(Val::Bool(!result.is_zero()))
        }
        _ => match (left.as_int(), right.as_int()) {
            (Some(a), Some(b)) => Ok(Val::Int(apply(&a, &b))),
            _ => Err(unsupported(op.symbol(), left, right)),
        },
    }
}

fn is_zero(val: &Val) -> bool {
    val.as_float() == Some(0.0)
}

pub fn compare(op: BinaryOp, left: &Val, right: &Val) -> Result<Ordering, VmError> {
    let unordered = || {
        VmError::Type(format!(
            "'{}' not supported between instances of '{}' and '{}'",
            op.symbol(),
            left.type_name(),
            right.type_name()
        ))
    };
    match (left, right) {
        (Val::Str(a), Val::Str(b)) => Ok(a.cmp(b)),
        (Val::List(a), Val::List(b)) => {
            let (a, b) = (a.borrow(), b.borrow());
            for (x, y) in a.iter().zip(b.iter()) {
                if x != y {
                    return compare(op, x, y);
                }
            }
            Ok(a.len().cmp(&b.len()))
        }
        _ => match numeric(left, right) {
            Some(Pair::Int(a, b)) => Ok(a.cmp(&b)),
            Some(Pair::Float(a, b)) => a.partial_cmp(&b).ok_or_else(unordered),
            None => Err(unordered()),
        },
    }
}

/// `needle in haystack`
pub fn contains(haystack: &Val, needle: &Val) -> Result<bool, VmError> {
    match haystack {
        Val::Str(s) => match needle {
            Val::Str(sub) => Ok(s.contains(&**sub)),
            other => Err(VmError::Type(format!(
                "'in <string>' requires string as left operand, not {}",
                other.type_name()
            ))),
        },
        Val::List(items) => Ok(items.borrow().iter().any(|item| item == needle)),
        Val::Dict(entries) => Ok(entries.borrow().contains_key(&DictKey::from_val(needle)?)),
        other => Err(VmError::Type(format!(
            "argument of type '{}' is not iterable",
            other.type_name()
        ))),
    }
}

pub fn unary(op: UnaryOp, operand: &Val) -> Result<Val, VmError> {
    let bad = || {
        VmError::Type(format!(
            "bad operand type for unary {}: '{}'",
            op.symbol(),
            operand.type_name()
        ))
    };
    match op {
        UnaryOp::Not => Ok(Val::Bool(!operand.truthy())),
        UnaryOp::Plus | UnaryOp::Minus => {
            let negate = op == UnaryOp::Minus;
            match operand {
                Val::Float(f) => Ok(Val::Float(if negate { -f } else { *f })),
                _ => {
                    let i = operand.as_int().ok_or_else(bad)?;
                    Ok(Val::Int(if negate { -i } else { i }))
                }
            }
        }
        UnaryOp::BitNot => {
            let i = operand.as_int().ok_or_else(bad)?;
            Ok(Val::Int(-i - 1))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(i: i64) -> Val {
        Val::int(i)
    }

    #[test]
    fn floor_division_and_modulo_round_down() {
        assert_eq!(binary(BinaryOp::FloorDiv, &int(-7), &int(2)).unwrap(), int(-4));
        assert_eq!(binary(BinaryOp::Mod, &int(-7), &int(2)).unwrap(), int(1));
        assert_eq!(binary(BinaryOp::Mod, &Val::Float(-7.5), &int(2)).unwrap(), Val::Float(0.5));
    }

    #[test]
    fn big_powers() {
        let result = binary(BinaryOp::Pow, &int(2), &int(81)).unwrap();
        assert_eq!(result.to_string(), "2417851639229258349412352");
        assert_eq!(binary(BinaryOp::Pow, &int(2), &int(-1)).unwrap(), Val::Float(0.5));
    }

    #[test]
    fn division_by_zero() {
        for op in [BinaryOp::Div, BinaryOp::FloorDiv, BinaryOp::Mod] {
            assert!(matches!(binary(op, &int(1), &int(0)), Err(VmError::ZeroDivision)));
        }
    }

    #[test]
    fn mixed_operands() {
        assert_eq!(binary(BinaryOp::Plus, &int(1), &Val::Float(0.5)).unwrap(), Val::Float(1.5));
        assert_eq!(binary(BinaryOp::Mul, &Val::str("ab"), &int(2)).unwrap(), Val::str("abab"));
        assert!(binary(BinaryOp::Plus, &Val::None, &int(1)).is_err());
        assert!(binary(BinaryOp::Lt, &Val::None, &int(1)).is_err());
    }

    #[test]
    fn membership() {
        let list = Val::list(vec![int(1), Val::None]);
        assert!(contains(&list, &Val::None).unwrap());
        assert!(contains(&Val::str("hello"), &Val::str("ell")).unwrap());
        assert!(contains(&int(1), &int(1)).is_err());
    }

    #[test]
    fn unary_operators() {
        assert_eq!(unary(UnaryOp::Minus, &int(2)).unwrap(), int(-2));
        assert_eq!(unary(UnaryOp::BitNot, &int(5)).unwrap(), int(-6));
        assert_eq!(unary(UnaryOp::Not, &Val::None).unwrap(), Val::Bool(true));
        assert!(unary(UnaryOp::Minus, &Val::None).is_err());
    }
}
