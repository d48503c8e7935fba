use crate::core::value::Val;
use crate::vm::engine::{VmError, VM};

fn arity(name: &str, args: &[Val], expected: usize) -> Result<(), VmError> {
    if args.len() == expected {
        return Ok(());
    }
    Err(VmError::Type(format!(
        "{name}() takes exactly {expected} argument{} ({} given)",
        if expected == 1 { "" } else { "s" },
        args.len()
    )))
}

pub fn print(vm: &mut VM, args: Vec<Val>) -> Result<Val, VmError> {
    let line = args
        .iter()
        .map(|arg| arg.to_string())
        .collect::<Vec<_>>()
        .join(" ");
    vm.write(&line);
    vm.write("\n");
    Ok(Val::None)
}

pub fn len(_vm: &mut VM, args: Vec<Val>) -> Result<Val, VmError> {
    arity("len", &args, 1)?;
    let n = match &args[0] {
        Val::Str(s) => s.chars().count(),
        Val::List(items) => items.borrow().len(),
        Val::Dict(entries) => entries.borrow().len(),
        other => {
            return Err(VmError::Type(format!(
                "object of type '{}' has no len()",
                other.type_name()
            )))
        }
    };
    Ok(Val::int(n as i64))
}

/// A fresh object with no attributes.
pub fn object(_vm: &mut VM, args: Vec<Val>) -> Result<Val, VmError> {
    arity("object", &args, 0)?;
    Ok(Val::object())
}

pub fn str(_vm: &mut VM, args: Vec<Val>) -> Result<Val, VmError> {
    arity("str", &args, 1)?;
    Ok(Val::str(&args[0].to_string()))
}

pub fn repr(_vm: &mut VM, args: Vec<Val>) -> Result<Val, VmError> {
    arity("repr", &args, 1)?;
    Ok(Val::str(&args[0].repr()))
}
