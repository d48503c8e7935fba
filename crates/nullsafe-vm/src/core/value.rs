use indexmap::IndexMap;
use num_bigint::BigInt;
use num_traits::{FromPrimitive, ToPrimitive, Zero};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::vm::engine::{VmError, VM};

pub type NativeFn = dyn Fn(&mut VM, Vec<Val>) -> Result<Val, VmError>;

/// A host function callable from scripts.
pub struct Native {
    pub name: Rc<str>,
    pub func: Box<NativeFn>,
}

impl fmt::Debug for Native {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<built-in function {}>", self.name)
    }
}

pub type ListData = Rc<RefCell<Vec<Val>>>;
pub type DictData = Rc<RefCell<IndexMap<DictKey, Val>>>;
/// Attribute table of a plain object.
pub type ObjectData = Rc<RefCell<IndexMap<Rc<str>, Val>>>;

/// Runtime value. Containers and objects are shared by reference, like the
/// host language; everything else is immutable.
#[derive(Debug, Clone)]
pub enum Val {
    None,
    Bool(bool),
    Int(BigInt),
    Float(f64),
    Str(Rc<str>),
    List(ListData),
    Dict(DictData),
    Object(ObjectData),
    Native(Rc<Native>),
}

/// Hashable projection of a value. `True`, `1` and `1.0` are the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DictKey {
    None,
    Int(BigInt),
    Float(u64),
    Str(Rc<str>),
}

impl DictKey {
    pub fn from_val(val: &Val) -> Result<DictKey, VmError> {
        Ok(match val {
            Val::None => DictKey::None,
            Val::Bool(b) => DictKey::Int(BigInt::from(*b as u8)),
            Val::Int(i) => DictKey::Int(i.clone()),
            Val::Float(f) if f.is_finite() && f.fract() == 0.0 => match BigInt::from_f64(*f) {
                Some(i) => DictKey::Int(i),
                None => DictKey::Float(f.to_bits()),
            },
            Val::Float(f) => DictKey::Float(f.to_bits()),
            Val::Str(s) => DictKey::Str(s.clone()),
            other => {
                return Err(VmError::Type(format!(
                    "unhashable type: '{}'",
                    other.type_name()
                )))
            }
        })
    }

    pub fn to_val(&self) -> Val {
        match self {
            DictKey::None => Val::None,
            DictKey::Int(i) => Val::Int(i.clone()),
            DictKey::Float(bits) => Val::Float(f64::from_bits(*bits)),
            DictKey::Str(s) => Val::Str(s.clone()),
        }
    }
}

impl Val {
    pub fn int(i: i64) -> Val {
        Val::Int(BigInt::from(i))
    }

    pub fn str(s: &str) -> Val {
        Val::Str(Rc::from(s))
    }

    pub fn list(items: Vec<Val>) -> Val {
        Val::List(Rc::new(RefCell::new(items)))
    }

    pub fn dict(entries: IndexMap<DictKey, Val>) -> Val {
        Val::Dict(Rc::new(RefCell::new(entries)))
    }

    pub fn object() -> Val {
        Val::Object(Rc::new(RefCell::new(IndexMap::new())))
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Val::None)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Val::None => "NoneType",
            Val::Bool(_) => "bool",
            Val::Int(_) => "int",
            Val::Float(_) => "float",
            Val::Str(_) => "str",
            Val::List(_) => "list",
            Val::Dict(_) => "dict",
            Val::Object(_) => "object",
            Val::Native(_) => "builtin_function_or_method",
        }
    }

    pub fn truthy(&self) -> bool {
        match self {
            Val::None => false,
            Val::Bool(b) => *b,
            Val::Int(i) => !i.is_zero(),
            Val::Float(f) => *f != 0.0,
            Val::Str(s) => !s.is_empty(),
            Val::List(items) => !items.borrow().is_empty(),
            Val::Dict(entries) => !entries.borrow().is_empty(),
            Val::Object(_) | Val::Native(_) => true,
        }
    }

    /// Identity. Immutable scalars compare by value, shared values by
    /// address.
    pub fn is_identical(&self, other: &Val) -> bool {
        match (self, other) {
            (Val::None, Val::None) => true,
            (Val::Bool(a), Val::Bool(b)) => a == b,
            (Val::Int(a), Val::Int(b)) => a == b,
            (Val::Float(a), Val::Float(b)) => a.to_bits() == b.to_bits(),
            (Val::Str(a), Val::Str(b)) => a == b,
            (Val::List(a), Val::List(b)) => Rc::ptr_eq(a, b),
            (Val::Dict(a), Val::Dict(b)) => Rc::ptr_eq(a, b),
            (Val::Object(a), Val::Object(b)) => Rc::ptr_eq(a, b),
            (Val::Native(a), Val::Native(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Numeric view: `bool` and `int` are integers.
    pub fn as_int(&self) -> Option<BigInt> {
        match self {
            Val::Bool(b) => Some(BigInt::from(*b as u8)),
            Val::Int(i) => Some(i.clone()),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Val::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Val::Int(i) => Some(i.to_f64().unwrap_or(f64::INFINITY)),
            Val::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn repr(&self) -> String {
        match self {
            Val::Str(s) => {
                let mut out = String::with_capacity(s.len() + 2);
                out.push('\'');
                for c in s.chars() {
                    match c {
                        '\\' => out.push_str("\\\\"),
                        '\'' => out.push_str("\\'"),
                        '\n' => out.push_str("\\n"),
                        '\t' => out.push_str("\\t"),
                        c => out.push(c),
                    }
                }
                out.push('\'');
                out
            }
            other => other.to_string(),
        }
    }
}

impl PartialEq for Val {
    fn eq(&self, other: &Val) -> bool {
        match (self, other) {
            (Val::None, Val::None) => true,
            (Val::Str(a), Val::Str(b)) => a == b,
            (Val::List(a), Val::List(b)) => Rc::ptr_eq(a, b) || *a.borrow() == *b.borrow(),
            (Val::Dict(a), Val::Dict(b)) => Rc::ptr_eq(a, b) || *a.borrow() == *b.borrow(),
            (Val::Object(a), Val::Object(b)) => Rc::ptr_eq(a, b),
            (Val::Native(a), Val::Native(b)) => Rc::ptr_eq(a, b),
            (Val::Float(_), _) | (_, Val::Float(_)) => match (self.as_float(), other.as_float()) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
            _ => match (self.as_int(), other.as_int()) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
        }
    }
}

impl fmt::Display for Val {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Val::None => f.write_str("None"),
            Val::Bool(true) => f.write_str("True"),
            Val::Bool(false) => f.write_str("False"),
            Val::Int(i) => write!(f, "{i}"),
            Val::Float(x) => write!(f, "{x:?}"),
            Val::Str(s) => f.write_str(s),
            Val::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.borrow().iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    f.write_str(&item.repr())?;
                }
                f.write_str("]")
            }
            Val::Dict(entries) => {
                f.write_str("{")?;
                for (i, (key, value)) in entries.borrow().iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", key.to_val().repr(), value.repr())?;
                }
                f.write_str("}")
            }
            Val::Object(_) => f.write_str("<object>"),
            Val::Native(native) => write!(f, "{native:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_keys_collapse() {
        let one = DictKey::from_val(&Val::int(1)).unwrap();
        assert_eq!(DictKey::from_val(&Val::Bool(true)).unwrap(), one);
        assert_eq!(DictKey::from_val(&Val::Float(1.0)).unwrap(), one);
        assert!(DictKey::from_val(&Val::list(vec![])).is_err());
    }

    #[test]
    fn cross_type_equality() {
        assert_eq!(Val::int(2), Val::Float(2.0));
        assert_eq!(Val::Bool(true), Val::int(1));
        assert_ne!(Val::None, Val::Bool(false));
        assert_ne!(Val::str("1"), Val::int(1));
    }

    #[test]
    fn identity_of_shared_values() {
        let a = Val::list(vec![Val::int(1)]);
        let b = Val::list(vec![Val::int(1)]);
        assert!(a.is_identical(&a.clone()));
        assert!(!a.is_identical(&b));
        assert_eq!(a, b);
        assert!(Val::None.is_identical(&Val::None));
        assert!(!Val::None.is_identical(&Val::Bool(false)));
    }

    #[test]
    fn display() {
        let list = Val::list(vec![Val::None, Val::str("a"), Val::Float(1.0)]);
        assert_eq!(list.to_string(), "[None, 'a', 1.0]");
        assert_eq!(Val::str("a").to_string(), "a");
    }
}
