//! Instruction operands.
//!
//! Operand typing is decided once by the assembler. Jump and call targets are
//! resolved to [`Operand::Literal`] indices before the VM ever sees them; variable
//! names stay [`Operand::Identifier`] even when they look numeric.

use std::fmt;

/// Tagged operand value attached to an instruction.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum Operand {
    /// Integer literal or resolved instruction index.
    Literal(i64),
    /// Variable name.
    Identifier(String),
}

impl Operand {
    /// Returns the integer payload, if this is a literal.
    pub fn as_literal(&self) -> Option<i64> {
        match self {
            Operand::Literal(v) => Some(*v),
            Operand::Identifier(_) => None,
        }
    }

    /// Returns the name, if this is an identifier.
    pub fn as_identifier(&self) -> Option<&str> {
        match self {
            Operand::Identifier(name) => Some(name),
            Operand::Literal(_) => None,
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Literal(v) => write!(f, "{v}"),
            Operand::Identifier(name) => f.write_str(name),
        }
    }
}

/// Parses a signed decimal literal (`42`, `-7`, `+3`).
pub(crate) fn parse_literal(tok: &str) -> Option<i64> {
    tok.parse::<i64>().ok()
}

/// True for an optional sign followed by one or more ASCII digits.
///
/// Matches tokens that are meant as numbers even when they overflow `i64`.
pub(crate) fn looks_numeric(tok: &str) -> bool {
    let digits = tok.strip_prefix(['+', '-']).unwrap_or(tok);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn looks_numeric_ignores_range() {
        assert!(looks_numeric("99999999999999999999"));
        assert!(looks_numeric("-12"));
        assert!(looks_numeric("+0"));
        assert!(!looks_numeric("-"));
        assert!(!looks_numeric("loop1"));
        assert!(!looks_numeric("1e3"));
    }

    #[test]
    fn parse_literal_accepts_signs() {
        assert_eq!(parse_literal("42"), Some(42));
        assert_eq!(parse_literal("-7"), Some(-7));
        assert_eq!(parse_literal("+3"), Some(3));
    }

    #[test]
    fn parse_literal_rejects_identifiers() {
        assert_eq!(parse_literal("loop"), None);
        assert_eq!(parse_literal("12abc"), None);
        assert_eq!(parse_literal(""), None);
    }

    #[test]
    fn accessors_match_tag() {
        assert_eq!(Operand::Literal(5).as_literal(), Some(5));
        assert_eq!(Operand::Literal(5).as_identifier(), None);
        let name = Operand::Identifier("x".into());
        assert_eq!(name.as_identifier(), Some("x"));
        assert_eq!(name.as_literal(), None);
    }

    #[test]
    fn display() {
        assert_eq!(Operand::Literal(-3).to_string(), "-3");
        assert_eq!(Operand::Identifier("total".into()).to_string(), "total");
    }
}
