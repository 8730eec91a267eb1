//! Stack-based integer virtual machine and its assembler.
//!
//! A textual listing is loaded in two passes into a [`program::Program`], then
//! executed by [`vm::VM`] against a value stack of signed 64-bit integers, a
//! flat variable store and a line-oriented console.
//!
//! # Architecture
//!
//! - **Stack**: unbounded LIFO of `i64`; binary operators pop `op2` then `op1`
//! - **Variables**: one global namespace, created on first `STORE`
//! - **Control flow**: absolute jumps by instruction index; `CALL` pushes the
//!   return address onto the same stack as data
//! - **Faults**: any runtime error halts the VM with a located [`errors::Fault`]
//!
//! # Modules
//!
//! - [`assembler`]: Listing parser, label resolution and diagnostics
//! - [`console`]: Console trait behind `PRINT` and `READ`
//! - [`errors`]: Load and runtime error types
//! - [`isa`]: Instruction set definition and opcode mappings
//! - [`operand`]: Instruction operand values
//! - [`program`]: Loaded program representation
//! - [`vm`]: Execution engine

pub mod assembler;
pub mod console;
pub mod errors;
pub mod isa;
#[cfg(test)]
mod isa_static_check;
pub mod operand;
pub mod program;
pub mod vm;
