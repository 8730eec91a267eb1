use crate::virtual_machine::errors::VMError;

/// Value stack of signed integers.
///
/// Every accessor checks depth before touching the stack, so a failing
/// instruction leaves it exactly as it found it.
#[derive(Debug, Default)]
pub(super) struct Stack {
    values: Vec<i64>,
}

impl Stack {
    pub(super) fn new() -> Self {
        Self { values: Vec::new() }
    }

    pub(super) fn len(&self) -> usize {
        self.values.len()
    }

    pub(super) fn as_slice(&self) -> &[i64] {
        &self.values
    }

    pub(super) fn push(&mut self, value: i64) {
        self.values.push(value);
    }

    /// Fails with [`VMError::StackUnderflow`] unless at least `needed` values are present.
    pub(super) fn require(&self, instr: &'static str, needed: usize) -> Result<(), VMError> {
        if self.values.len() < needed {
            return Err(VMError::StackUnderflow {
                instruction: instr,
                needed,
                available: self.values.len(),
            });
        }
        Ok(())
    }

    /// Returns the top value without removing it.
    pub(super) fn peek(&self, instr: &'static str) -> Result<i64, VMError> {
        self.require(instr, 1)?;
        Ok(self.values[self.values.len() - 1])
    }

    pub(super) fn pop(&mut self, instr: &'static str) -> Result<i64, VMError> {
        self.require(instr, 1)?;
        Ok(self.values.pop().unwrap_or_default())
    }

    /// Returns `(op1, op2)` where `op2` is the top value, without removing them.
    pub(super) fn peek_pair(&self, instr: &'static str) -> Result<(i64, i64), VMError> {
        self.require(instr, 2)?;
        let n = self.values.len();
        Ok((self.values[n - 2], self.values[n - 1]))
    }

    /// Replaces the top `count` values with `value`.
    ///
    /// Callers must have checked depth with [`require`](Self::require) or a peek.
    pub(super) fn replace_top(&mut self, count: usize, value: i64) {
        let keep = self.values.len().saturating_sub(count);
        self.values.truncate(keep);
        self.values.push(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn underflow_reports_depth() {
        let mut stack = Stack::new();
        stack.push(1);
        assert_eq!(
            stack.peek_pair("ADD"),
            Err(VMError::StackUnderflow {
                instruction: "ADD",
                needed: 2,
                available: 1
            })
        );
        assert_eq!(stack.as_slice(), &[1]);
    }

    #[test]
    fn peek_pair_orders_operands() {
        let mut stack = Stack::new();
        stack.push(10);
        stack.push(3);
        assert_eq!(stack.peek_pair("SUB"), Ok((10, 3)));
        stack.replace_top(2, 7);
        assert_eq!(stack.as_slice(), &[7]);
    }

    #[test]
    fn pop_and_peek() {
        let mut stack = Stack::new();
        assert!(stack.pop("POP").is_err());
        stack.push(4);
        assert_eq!(stack.peek("PRINT"), Ok(4));
        assert_eq!(stack.len(), 1);
        assert_eq!(stack.pop("POP"), Ok(4));
        assert_eq!(stack.len(), 0);
    }
}
