use crate::virtual_machine::isa::Opcode;
use crate::virtual_machine::program::Instruction;
use thiserror::Error;

/// Errors raised while assembling a listing into a [`Program`](super::program::Program).
///
/// Any of these aborts loading; no partial program is produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    /// A label line with nothing in front of the colon.
    #[error("line {line}: empty label name")]
    EmptyLabel { line: usize },
    /// Label defined more than once.
    #[error("line {line}: duplicate label '{label}'")]
    DuplicateLabel { line: usize, label: String },
    /// Jump or call target naming a label that was never defined.
    #[error("line {line}: undefined label '{label}'")]
    UndefinedLabel { line: usize, label: String },
    /// Malformed instruction line.
    #[error("line {line}: {kind}")]
    ParseError { line: usize, kind: ParseErrorKind },
    /// Listing could not be read.
    #[error("cannot read {path}: {message}")]
    Io { path: String, message: String },
}

impl LoadError {
    /// 1-based source line the error points at, if any.
    pub fn line(&self) -> Option<usize> {
        match self {
            LoadError::EmptyLabel { line }
            | LoadError::DuplicateLabel { line, .. }
            | LoadError::UndefinedLabel { line, .. }
            | LoadError::ParseError { line, .. } => Some(*line),
            LoadError::Io { .. } => None,
        }
    }
}

/// Reason an instruction line failed to parse.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseErrorKind {
    /// Mnemonic not in the instruction set.
    #[error("unknown opcode '{name}'")]
    UnknownOpcode { name: String },
    /// Wrong number of operands.
    #[error("{opcode} expects {expected} operand(s), got {actual}")]
    ArityMismatch {
        opcode: Opcode,
        expected: usize,
        actual: usize,
    },
    /// Operand present but of the wrong shape.
    #[error("{opcode} expects {expected} as operand {index}, got '{actual}'")]
    TypeMismatch {
        opcode: Opcode,
        index: usize,
        expected: &'static str,
        actual: String,
    },
}

/// Faults raised while executing a single instruction.
///
/// Every variant is terminal for the run; the VM halts and reports a [`Fault`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VMError {
    /// Not enough values on the stack for the instruction.
    #[error("{instruction} needs {needed} value(s) on the stack, found {available}")]
    StackUnderflow {
        instruction: &'static str,
        needed: usize,
        available: usize,
    },
    /// `DIV` or `MOD` with a zero divisor.
    #[error("division by zero")]
    DivideByZero,
    /// `LOAD` of a name that was never stored.
    #[error("variable '{name}' not initialized")]
    UndefinedVariable { name: String },
    /// Jump or call target outside the program.
    #[error("{instruction} to invalid address {target} (program length {len})")]
    InvalidAddress {
        instruction: &'static str,
        target: i64,
        len: usize,
    },
    /// `RET` popped a value that is not a valid address.
    #[error("invalid return address {address} on stack (program length {len})")]
    InvalidReturnAddress { address: i64, len: usize },
    /// `READ` got a line that is not a signed integer.
    #[error("READ expects an integer input, received '{input}'")]
    InvalidInput { input: String },
    /// `READ` found the input exhausted.
    #[error("no input for READ")]
    EndOfInput,
    /// Instruction the engine cannot decode.
    #[error("unknown or undecodable instruction '{instruction}'")]
    UnknownOpcode { instruction: String },
    /// Result does not fit in a 64-bit signed integer.
    #[error("integer overflow in {instruction}")]
    Overflow { instruction: &'static str },
    /// Console read or write failed.
    #[error("console error: {message}")]
    Io { message: String },
}

impl VMError {
    /// Short fault class name used in diagnostics.
    pub const fn name(&self) -> &'static str {
        match self {
            VMError::StackUnderflow { .. } => "StackUnderflow",
            VMError::DivideByZero => "DivideByZero",
            VMError::UndefinedVariable { .. } => "UndefinedVariable",
            VMError::InvalidAddress { .. } => "InvalidAddress",
            VMError::InvalidReturnAddress { .. } => "InvalidReturnAddress",
            VMError::InvalidInput { .. } => "InvalidInput",
            VMError::EndOfInput => "EndOfInput",
            VMError::UnknownOpcode { .. } => "UnknownOpcode",
            VMError::Overflow { .. } => "Overflow",
            VMError::Io { .. } => "Io",
        }
    }
}

/// A runtime fault together with the instruction that raised it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "runtime error at instruction index {index} (line {}): {instruction} - {}: {kind}",
    .instruction.line,
    .kind.name()
)]
pub struct Fault {
    /// Index of the faulting instruction in the program.
    pub index: usize,
    /// The faulting instruction, including opcode, operands and source line.
    pub instruction: Instruction,
    /// What went wrong.
    pub kind: VMError,
}

impl Fault {
    /// 1-based source line of the faulting instruction.
    pub fn line(&self) -> usize {
        self.instruction.line
    }

    /// Opcode of the faulting instruction.
    pub fn opcode(&self) -> Opcode {
        self.instruction.opcode
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::virtual_machine::operand::Operand;

    #[test]
    fn load_error_line() {
        assert_eq!(LoadError::EmptyLabel { line: 4 }.line(), Some(4));
        let io = LoadError::Io {
            path: "x.asm".into(),
            message: "missing".into(),
        };
        assert_eq!(io.line(), None);
    }

    #[test]
    fn parse_error_message_names_opcode_and_counts() {
        let err = LoadError::ParseError {
            line: 7,
            kind: ParseErrorKind::ArityMismatch {
                opcode: Opcode::Push,
                expected: 1,
                actual: 0,
            },
        };
        assert_eq!(err.to_string(), "line 7: PUSH expects 1 operand(s), got 0");
    }

    #[test]
    fn fault_message_includes_location_and_instruction() {
        let fault = Fault {
            index: 2,
            instruction: Instruction {
                opcode: Opcode::Store,
                operands: vec![Operand::Identifier("x".into())],
                line: 5,
            },
            kind: VMError::StackUnderflow {
                instruction: "STORE",
                needed: 1,
                available: 0,
            },
        };
        assert_eq!(
            fault.to_string(),
            "runtime error at instruction index 2 (line 5): STORE x - StackUnderflow: \
             STORE needs 1 value(s) on the stack, found 0"
        );
        assert_eq!(fault.line(), 5);
        assert_eq!(fault.opcode(), Opcode::Store);
    }
}
