pub mod builtins;
pub mod core;
pub mod vm;
