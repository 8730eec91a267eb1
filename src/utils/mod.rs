//! Shared helpers used by the assembler, the VM and the command-line front end.

pub mod log;
