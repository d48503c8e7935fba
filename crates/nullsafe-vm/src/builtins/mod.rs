pub mod stdlib;

use crate::vm::engine::VM;

/// Installs the builtin functions as globals.
pub fn register(vm: &mut VM) {
    vm.define_native("print", stdlib::print);
    vm.define_native("len", stdlib::len);
    vm.define_native("object", stdlib::object);
    vm.define_native("str", stdlib::str);
    vm.define_native("repr", stdlib::repr);
}
