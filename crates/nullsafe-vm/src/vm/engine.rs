use std::collections::HashMap;
use std::rc::Rc;

use bumpalo::Bump;
use indexmap::IndexMap;
use num_bigint::BigInt;
use num_traits::{Signed, ToPrimitive};
use thiserror::Error;
use tracing::{debug, trace};

use nullsafe_parser::ast::{BinaryOp, Expr, Module, Stmt, TempId, Trailer};
use nullsafe_parser::{compile, Diagnostic, SourceUnit};

use crate::builtins;
use crate::core::value::{DictKey, Native, Val};
use crate::vm::ops;

#[derive(Debug, Error)]
pub enum VmError {
    #[error("NameError: name '{0}' is not defined")]
    UnboundName(String),
    #[error("temporary ${0} read before it was bound")]
    UnboundTemp(TempId),
    #[error("AttributeError: '{type_name}' object has no attribute '{attr}'")]
    UnknownAttribute {
        type_name: &'static str,
        attr: String,
    },
    #[error("TypeError: {0}")]
    Type(String),
    #[error("ValueError: {0}")]
    Value(String),
    #[error("IndexError: {0}")]
    Index(String),
    #[error("KeyError: {0}")]
    Key(String),
    #[error("ZeroDivisionError: division by zero")]
    ZeroDivision,
    #[error("AssertionError{}", assertion_suffix(.0))]
    Assertion(Option<String>),
    /// `??`, `??=`, `?.` or `?[` survived to execution.
    #[error("{0} reached the back end without being lowered")]
    Unlowered(&'static str),
}

fn assertion_suffix(message: &Option<String>) -> String {
    message
        .as_ref()
        .map(|message| format!(": {message}"))
        .unwrap_or_default()
}

/// Failure of [`VM::run_source`]: either the front end rejected the source
/// or execution failed.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error(transparent)]
    Compile(#[from] Diagnostic),
    #[error(transparent)]
    Runtime(#[from] VmError),
}

/// The last step of an assignment target: which slot of the object.
enum Place {
    Attribute(Rc<str>),
    Index(Val),
}

/// Tree-walking interpreter for lowered modules.
pub struct VM {
    pub globals: IndexMap<String, Val>,
    temps: HashMap<TempId, Val>,
    output: String,
}

impl Default for VM {
    fn default() -> Self {
        Self::new()
    }
}

impl VM {
    pub fn new() -> Self {
        let mut vm = Self {
            globals: IndexMap::new(),
            temps: HashMap::new(),
            output: String::new(),
        };
        builtins::register(&mut vm);
        vm
    }

    pub fn define(&mut self, name: &str, value: Val) {
        self.globals.insert(name.to_string(), value);
    }

    pub fn define_native(
        &mut self,
        name: &str,
        func: impl Fn(&mut VM, Vec<Val>) -> Result<Val, VmError> + 'static,
    ) {
        let native = Native {
            name: Rc::from(name),
            func: Box::new(func),
        };
        self.define(name, Val::Native(Rc::new(native)));
    }

    pub fn get(&self, name: &str) -> Option<&Val> {
        self.globals.get(name)
    }

    pub fn write(&mut self, text: &str) {
        self.output.push_str(text);
    }

    /// Everything `print` produced since the last call.
    pub fn take_output(&mut self) -> String {
        std::mem::take(&mut self.output)
    }

    /// Compiles `text` with the null-aware front end and runs it.
    pub fn run_source(&mut self, name: &str, text: &str) -> Result<Val, ExecError> {
        let arena = Bump::new();
        let module = compile(SourceUnit::new(name, text), &arena)?;
        Ok(self.run(&module)?)
    }

    /// Runs a lowered module. Returns the value of the final statement if it
    /// is an expression, `None` otherwise.
    pub fn run(&mut self, module: &Module<'_>) -> Result<Val, VmError> {
        debug!(statements = module.statements.len(), "run module");
        // Temporary ids are only unique within one unit.
        self.temps.clear();
        let mut last = Val::None;
        for stmt in module.statements {
            last = self.exec(stmt)?;
        }
        Ok(last)
    }

    fn exec_block(&mut self, stmts: &[&Stmt<'_>]) -> Result<(), VmError> {
        for stmt in stmts {
            self.exec(stmt)?;
        }
        Ok(())
    }

    fn exec(&mut self, stmt: &Stmt<'_>) -> Result<Val, VmError> {
        match stmt {
            Stmt::Expression { expr, .. } => return self.eval(expr),
            Stmt::Assign { target, value, .. } => {
                let value = self.eval(value)?;
                self.assign(target, value)?;
            }
            Stmt::AugAssign {
                target, op, value, ..
            } => self.aug_assign(target, *op, value)?,
            Stmt::CoalesceAssign { .. } => return Err(VmError::Unlowered("'??=' statement")),
            Stmt::If {
                test, body, orelse, ..
            } => {
                if self.eval(test)?.truthy() {
                    self.exec_block(body)?;
                } else {
                    self.exec_block(orelse)?;
                }
            }
            Stmt::While { test, body, .. } => {
                while self.eval(test)?.truthy() {
                    self.exec_block(body)?;
                }
            }
            Stmt::Assert { test, message, .. } => {
                if !self.eval(test)?.truthy() {
                    let message = match message {
                        Some(message) => Some(self.eval(message)?.to_string()),
                        None => None,
                    };
                    return Err(VmError::Assertion(message));
                }
            }
            Stmt::Pass { .. } => {}
        }
        Ok(Val::None)
    }

    fn assign(&mut self, target: &Expr<'_>, value: Val) -> Result<(), VmError> {
        match target {
            Expr::Name { name, .. } => {
                self.globals.insert(name.to_string(), value);
                Ok(())
            }
            Expr::Temp { id, .. } => {
                self.temps.insert(*id, value);
                Ok(())
            }
            Expr::Chain { base, trailers, .. } => {
                let (object, place) = self.resolve_place(base, trailers)?;
                store(&object, place, value)
            }
            _ => Err(VmError::Type("cannot assign to expression".to_string())),
        }
    }

    /// Object and index are evaluated once; the load and the store share them.
    fn aug_assign(
        &mut self,
        target: &Expr<'_>,
        op: BinaryOp,
        value: &Expr<'_>,
    ) -> Result<(), VmError> {
        match target {
            Expr::Chain { base, trailers, .. } => {
                let (object, place) = self.resolve_place(base, trailers)?;
                let current = load(&object, &place)?;
                let value = self.eval(value)?;
                let result = ops::binary(op, &current, &value)?;
                store(&object, place, result)
            }
            _ => {
                let current = self.eval(target)?;
                let value = self.eval(value)?;
                let result = ops::binary(op, &current, &value)?;
                self.assign(target, result)
            }
        }
    }

    fn resolve_place(
        &mut self,
        base: &Expr<'_>,
        trailers: &[Trailer<'_>],
    ) -> Result<(Val, Place), VmError> {
        let Some((last, init)) = trailers.split_last() else {
            return Err(VmError::Type("cannot assign to expression".to_string()));
        };
        let object = self.eval_chain(base, init)?;
        let place = match last {
            Trailer::Attribute { name, .. } => Place::Attribute(Rc::from(*name)),
            Trailer::Index { index, .. } => Place::Index(self.eval(index)?),
            Trailer::Call { .. } => {
                return Err(VmError::Type("cannot assign to function call".to_string()))
            }
            Trailer::OptionalAttribute { .. } | Trailer::OptionalIndex { .. } => {
                return Err(VmError::Unlowered("optional chain"))
            }
        };
        Ok((object, place))
    }

    pub fn eval(&mut self, expr: &Expr<'_>) -> Result<Val, VmError> {
        match expr {
            Expr::Name { name, .. } => self
                .globals
                .get(*name)
                .cloned()
                .ok_or_else(|| VmError::UnboundName(name.to_string())),
            Expr::Temp { id, .. } => self.temps.get(id).cloned().ok_or(VmError::UnboundTemp(*id)),
            Expr::None { .. } => Ok(Val::None),
            Expr::Bool { value, .. } => Ok(Val::Bool(*value)),
            Expr::Integer { value, .. } => value
                .parse::<BigInt>()
                .map(Val::Int)
                .map_err(|_| VmError::Value(format!("invalid integer literal '{value}'"))),
            Expr::Float { value, .. } => Ok(Val::Float(*value)),
            Expr::String { value, .. } => Ok(Val::str(value)),
            Expr::List { items, .. } => {
                let mut values = Vec::with_capacity(items.len());
                for item in *items {
                    values.push(self.eval(item)?);
                }
                Ok(Val::list(values))
            }
            Expr::Dict { entries, .. } => {
                let mut map = IndexMap::with_capacity(entries.len());
                for (key, value) in *entries {
                    let key = DictKey::from_val(&self.eval(key)?)?;
                    let value = self.eval(value)?;
                    map.insert(key, value);
                }
                Ok(Val::dict(map))
            }
            Expr::Chain { base, trailers, .. } => self.eval_chain(base, trailers),
            Expr::Binary {
                left,
                op: BinaryOp::And,
                right,
                ..
            } => {
                let left = self.eval(left)?;
                if left.truthy() {
                    self.eval(right)
                } else {
                    Ok(left)
                }
            }
            Expr::Binary {
                left,
                op: BinaryOp::Or,
                right,
                ..
            } => {
                let left = self.eval(left)?;
                if left.truthy() {
                    Ok(left)
                } else {
                    self.eval(right)
                }
            }
            Expr::Binary {
                left, op, right, ..
            } => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                ops::binary(*op, &left, &right)
            }
            Expr::Unary { op, operand, .. } => {
                let operand = self.eval(operand)?;
                ops::unary(*op, &operand)
            }
            Expr::Power { base, exponent, .. } => {
                let base = self.eval(base)?;
                let exponent = self.eval(exponent)?;
                ops::binary(BinaryOp::Pow, &base, &exponent)
            }
            Expr::Coalesce { .. } => Err(VmError::Unlowered("'??' expression")),
            Expr::Conditional {
                test, then, orelse, ..
            } => {
                if self.eval(test)?.truthy() {
                    self.eval(then)
                } else {
                    self.eval(orelse)
                }
            }
            Expr::Bind { temp, value, .. } => {
                let value = self.eval(value)?;
                self.temps.insert(*temp, value.clone());
                Ok(value)
            }
        }
    }

    fn eval_chain(&mut self, base: &Expr<'_>, trailers: &[Trailer<'_>]) -> Result<Val, VmError> {
        let mut value = self.eval(base)?;
        for trailer in trailers {
            value = match trailer {
                Trailer::Attribute { name, .. } => get_attr(&value, name)?,
                Trailer::Index { index, .. } => {
                    let index = self.eval(index)?;
                    get_item(&value, &index)?
                }
                Trailer::Call { args, .. } => {
                    let mut values = Vec::with_capacity(args.len());
                    for arg in *args {
                        values.push(self.eval(arg)?);
                    }
                    self.call(&value, values)?
                }
                Trailer::OptionalAttribute { .. } | Trailer::OptionalIndex { .. } => {
                    return Err(VmError::Unlowered("optional chain"))
                }
            };
        }
        Ok(value)
    }

    pub fn call(&mut self, callee: &Val, args: Vec<Val>) -> Result<Val, VmError> {
        match callee {
            Val::Native(native) => {
                let native = Rc::clone(native);
                trace!(name = %native.name, args = args.len(), "call native");
                (native.func)(self, args)
            }
            other => Err(VmError::Type(format!(
                "'{}' object is not callable",
                other.type_name()
            ))),
        }
    }
}

fn load(object: &Val, place: &Place) -> Result<Val, VmError> {
    match place {
        Place::Attribute(name) => get_attr(object, name),
        Place::Index(index) => get_item(object, index),
    }
}

fn store(object: &Val, place: Place, value: Val) -> Result<(), VmError> {
    match place {
        Place::Attribute(name) => set_attr(object, name, value),
        Place::Index(index) => set_item(object, &index, value),
    }
}

pub fn get_attr(object: &Val, name: &str) -> Result<Val, VmError> {
    if let Val::Object(attrs) = object {
        if let Some(value) = attrs.borrow().get(name) {
            return Ok(value.clone());
        }
    }
    Err(VmError::UnknownAttribute {
        type_name: object.type_name(),
        attr: name.to_string(),
    })
}

fn set_attr(object: &Val, name: Rc<str>, value: Val) -> Result<(), VmError> {
    match object {
        Val::Object(attrs) => {
            attrs.borrow_mut().insert(name, value);
            Ok(())
        }
        other => Err(VmError::UnknownAttribute {
            type_name: other.type_name(),
            attr: name.to_string(),
        }),
    }
}

/// Resolves a possibly negative sequence index.
fn sequence_index(kind: &str, index: &Val, len: usize) -> Result<usize, VmError> {
    let Some(i) = index.as_int() else {
        return Err(VmError::Type(format!(
            "{kind} indices must be integers, not {}",
            index.type_name()
        )));
    };
    let resolved = if i.is_negative() { i + len } else { i };
    resolved
        .to_usize()
        .filter(|&i| i < len)
        .ok_or_else(|| VmError::Index(format!("{kind} index out of range")))
}

pub fn get_item(object: &Val, index: &Val) -> Result<Val, VmError> {
    match object {
        Val::List(items) => {
            let items = items.borrow();
            let i = sequence_index("list", index, items.len())?;
            Ok(items[i].clone())
        }
        Val::Str(s) => {
            let chars: Vec<char> = s.chars().collect();
            let i = sequence_index("string", index, chars.len())?;
            Ok(Val::str(&chars[i].to_string()))
        }
        Val::Dict(entries) => {
            let key = DictKey::from_val(index)?;
            entries
                .borrow()
                .get(&key)
                .cloned()
                .ok_or_else(|| VmError::Key(index.repr()))
        }
        other => Err(VmError::Type(format!(
            "'{}' object is not subscriptable",
            other.type_name()
        ))),
    }
}

fn set_item(object: &Val, index: &Val, value: Val) -> Result<(), VmError> {
    match object {
        Val::List(items) => {
            let mut items = items.borrow_mut();
            let i = sequence_index("list", index, items.len())?;
            items[i] = value;
            Ok(())
        }
        Val::Dict(entries) => {
            let key = DictKey::from_val(index)?;
            entries.borrow_mut().insert(key, value);
            Ok(())
        }
        other => Err(VmError::Type(format!(
            "'{}' object does not support item assignment",
            other.type_name()
        ))),
    }
}
