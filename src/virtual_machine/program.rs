//! Loaded program representation.
//!
//! A [`Program`] is the assembler's output: the executable instruction
//! sequence plus the label table that was used to resolve jump targets. It is
//! immutable once built.

use crate::virtual_machine::isa::Opcode;
use crate::virtual_machine::operand::Operand;
use std::collections::HashMap;
use std::fmt;
use std::fmt::Write;

/// One executable instruction.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Instruction {
    pub opcode: Opcode,
    pub operands: Vec<Operand>,
    /// 1-based line in the source listing.
    pub line: usize,
}

impl Instruction {
    pub fn new(opcode: Opcode, operands: Vec<Operand>, line: usize) -> Self {
        Self {
            opcode,
            operands,
            line,
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.opcode.mnemonic())?;
        for operand in &self.operands {
            write!(f, " {operand}")?;
        }
        Ok(())
    }
}

/// Assembled program: instructions indexed `0..len` and the label table.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Program {
    instructions: Vec<Instruction>,
    labels: HashMap<String, usize>,
}

impl Program {
    pub fn new(instructions: Vec<Instruction>, labels: HashMap<String, usize>) -> Self {
        Self {
            instructions,
            labels,
        }
    }

    /// Number of executable instructions.
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Instruction> {
        self.instructions.get(index)
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn labels(&self) -> &HashMap<String, usize> {
        &self.labels
    }

    /// Instruction index a label points at.
    pub fn label(&self, name: &str) -> Option<usize> {
        self.labels.get(name).copied()
    }

    /// Renders the resolved program as a human-readable listing.
    ///
    /// Labels are printed above the instruction they point at; labels pointing
    /// one past the last instruction are printed at the end.
    pub fn listing(&self) -> String {
        let mut by_index: Vec<(&str, usize)> = self
            .labels
            .iter()
            .map(|(name, idx)| (name.as_str(), *idx))
            .collect();
        by_index.sort_by(|a, b| a.1.cmp(&b.1).then(a.0.cmp(b.0)));

        let mut out = String::new();
        let mut labels = by_index.into_iter().peekable();
        for (idx, instr) in self.instructions.iter().enumerate() {
            while let Some((name, _)) = labels.next_if(|(_, at)| *at <= idx) {
                let _ = writeln!(out, "{name}:");
            }
            let _ = writeln!(out, "{:>5}  {:<20} # line {}", idx, instr.to_string(), instr.line);
        }
        for (name, _) in labels {
            let _ = writeln!(out, "{name}:");
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Program {
        let instructions = vec![
            Instruction::new(Opcode::Push, vec![Operand::Literal(1)], 2),
            Instruction::new(Opcode::Jmp, vec![Operand::Literal(2)], 3),
        ];
        let labels = HashMap::from([("start".to_string(), 0), ("end".to_string(), 2)]);
        Program::new(instructions, labels)
    }

    #[test]
    fn instruction_display() {
        let instr = Instruction::new(Opcode::Store, vec![Operand::Identifier("x".into())], 1);
        assert_eq!(instr.to_string(), "STORE x");
        assert_eq!(Instruction::new(Opcode::Add, vec![], 1).to_string(), "ADD");
    }

    #[test]
    fn label_lookup() {
        let program = sample();
        assert_eq!(program.len(), 2);
        assert_eq!(program.label("start"), Some(0));
        assert_eq!(program.label("end"), Some(2));
        assert_eq!(program.label("missing"), None);
    }

    #[test]
    fn listing_places_labels() {
        let listing = sample().listing();
        let lines: Vec<&str> = listing.lines().collect();
        assert_eq!(lines[0], "start:");
        assert!(lines[1].contains("PUSH 1"));
        assert!(lines[2].contains("JMP 2"));
        assert_eq!(lines[3], "end:");
    }
}
