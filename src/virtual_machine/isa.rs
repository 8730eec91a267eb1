//! Instruction Set Architecture (ISA) definitions.
//!
//! The [`for_each_instruction!`](crate::for_each_instruction) macro holds the
//! canonical instruction list and invokes a callback macro for code generation,
//! so the opcode enum, the assembler's signature table and the VM's dispatch
//! table never drift apart.
//!
//! This module generates:
//! - The [`Opcode`] enum with mnemonic mappings
//! - The per-opcode operand signature ([`Opcode::operand_kinds`])
//!
//! # Operand kinds
//!
//! - `Int`: signed integer literal (e.g. `42`, `-7`)
//! - `Addr`: jump target, either an instruction index or a label name
//! - `Name`: variable name, kept verbatim even if it looks numeric

use std::fmt;

/// Invokes a callback macro with the complete instruction definition list.
#[macro_export]
macro_rules! for_each_instruction {
    ($callback:ident) => {
        $callback! {
            // =========================
            // Stack
            // =========================
            /// PUSH n ; push integer literal n
            Push = "PUSH" => [value: Int],
            /// POP ; discard the top value
            Pop = "POP" => [],
            // =========================
            // Integer arithmetic
            // =========================
            /// ADD ; push op1 + op2
            Add = "ADD" => [],
            /// SUB ; push op1 - op2
            Sub = "SUB" => [],
            /// MUL ; push op1 * op2
            Mul = "MUL" => [],
            /// DIV ; push floor(op1 / op2), fault on zero divisor
            Div = "DIV" => [],
            /// MOD ; push op1 mod op2 (sign follows divisor), fault on zero divisor
            Mod = "MOD" => [],
            /// NEG ; push -top
            Neg = "NEG" => [],
            // =========================
            // Variables
            // =========================
            /// STORE name ; pop into variable name
            Store = "STORE" => [name: Name],
            /// LOAD name ; push variable name
            Load = "LOAD" => [name: Name],
            // =========================
            // Control flow
            // =========================
            /// JMP target ; pc = target
            Jmp = "JMP" => [target: Addr],
            /// JZ target ; pop, jump if zero
            Jz = "JZ" => [target: Addr],
            /// JNZ target ; pop, jump if non-zero
            Jnz = "JNZ" => [target: Addr],
            /// CALL target ; push pc + 1, pc = target
            Call = "CALL" => [target: Addr],
            /// RET ; pop return address into pc
            Ret = "RET" => [],
            /// HALT ; stop execution
            Halt = "HALT" => [],
            // =========================
            // Comparison
            // =========================
            /// EQ ; push op1 == op2
            Eq = "EQ" => [],
            /// NEQ ; push op1 != op2
            Neq = "NEQ" => [],
            /// LT ; push op1 < op2
            Lt = "LT" => [],
            /// GT ; push op1 > op2
            Gt = "GT" => [],
            /// LE ; push op1 <= op2
            Le = "LE" => [],
            /// GE ; push op1 >= op2
            Ge = "GE" => [],
            // =========================
            // Console I/O
            // =========================
            /// PRINT ; write the top value without popping it
            Print = "PRINT" => [],
            /// READ ; read one integer line and push it
            Read = "READ" => [],
        }
    };
}

/// Shape of an instruction operand as written in source.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum OperandKind {
    /// Signed integer literal.
    Int,
    /// Instruction index or label name.
    Addr,
    /// Variable name.
    Name,
}

impl OperandKind {
    /// Human-readable description used in parse errors.
    pub const fn describe(&self) -> &'static str {
        match self {
            OperandKind::Int => "an integer literal",
            OperandKind::Addr => "a label or instruction index",
            OperandKind::Name => "a variable name",
        }
    }
}

#[macro_export]
macro_rules! define_instructions {
    (
        $(
            $(#[$doc:meta])*
            $name:ident = $mnemonic:literal => [
                $( $field:ident : $kind:ident ),* $(,)?
            ]
        ),* $(,)?
    ) => {
        #[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
        pub enum Opcode {
            $(
                $(#[$doc])*
                $name,
            )*
        }

        impl Opcode {
            /// Every opcode, in definition order.
            pub const ALL: &'static [Opcode] = &[ $( Opcode::$name ),* ];

            /// Returns the assembly mnemonic for this opcode.
            pub const fn mnemonic(&self) -> &'static str {
                match self {
                    $( Opcode::$name => $mnemonic, )*
                }
            }

            /// Looks up an opcode by its upper-case mnemonic.
            pub fn from_mnemonic(name: &str) -> Option<Opcode> {
                match name {
                    $( $mnemonic => Some(Opcode::$name), )*
                    _ => None,
                }
            }

            /// Operand signature expected by the assembler.
            pub const fn operand_kinds(&self) -> &'static [OperandKind] {
                match self {
                    $( Opcode::$name => &[ $( OperandKind::$kind ),* ], )*
                }
            }

            /// Number of operands this opcode takes.
            pub const fn arity(&self) -> usize {
                self.operand_kinds().len()
            }
        }
    };
}

for_each_instruction!(define_instructions);

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mnemonic_round_trips_for_every_opcode() {
        for op in Opcode::ALL {
            assert_eq!(Opcode::from_mnemonic(op.mnemonic()), Some(*op));
        }
    }

    #[test]
    fn from_mnemonic_is_case_sensitive() {
        assert_eq!(Opcode::from_mnemonic("push"), None);
        assert_eq!(Opcode::from_mnemonic("NOPE"), None);
    }

    #[test]
    fn operand_signatures() {
        assert_eq!(Opcode::Push.operand_kinds(), &[OperandKind::Int]);
        assert_eq!(Opcode::Store.operand_kinds(), &[OperandKind::Name]);
        assert_eq!(Opcode::Call.operand_kinds(), &[OperandKind::Addr]);
        assert_eq!(Opcode::Ret.arity(), 0);
        assert_eq!(Opcode::ALL.len(), 24);
    }
}
