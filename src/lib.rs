//! Stack VM library.
//!
//! Provides the assembler, the execution engine, configuration and logging used
//! by the `stackvm` binary.

pub mod config;
pub mod utils;
pub mod virtual_machine;
