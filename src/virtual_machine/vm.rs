//! Stack-machine execution engine.
//!
//! The VM runs a loaded [`Program`] against a value stack of `i64`s, a global
//! variable store and a program counter. It fetches `program[pc]`, dispatches on
//! the opcode and advances the PC by one unless the instruction redirected it.
//!
//! Every instruction handler returns `Result<Flow, VMError>`. The run loop is
//! the only place faults are handled: it halts the machine, reports a [`Fault`]
//! and returns. Handlers validate all preconditions before mutating the stack,
//! so a faulting instruction has no effect.
//!
//! Arithmetic is checked: a result outside `i64` raises [`VMError::Overflow`]
//! rather than wrapping.

mod stack;
mod variables;

use crate::virtual_machine::console::Console;
use crate::virtual_machine::errors::{Fault, LoadError, VMError};
use crate::virtual_machine::isa::Opcode;
use crate::virtual_machine::operand::Operand;
use crate::virtual_machine::program::{Instruction, Program};
use crate::{debug, error};
use stack::Stack;
use variables::Variables;

/// What the run loop does after an instruction.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Flow {
    /// Advance to `pc + 1`.
    Next,
    /// Continue at the given index.
    Jump(usize),
    /// Stop dispatching.
    Halt,
}

/// How a call to [`VM::run`] ended.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Outcome {
    /// The PC reached the end of the program.
    Completed,
    /// `HALT` executed, or the VM was already halted.
    Halted,
    /// A runtime fault stopped execution.
    Faulted(Fault),
}

impl Outcome {
    pub fn fault(&self) -> Option<&Fault> {
        match self {
            Outcome::Faulted(fault) => Some(fault),
            _ => None,
        }
    }
}

fn undecodable(instr: &Instruction) -> VMError {
    VMError::UnknownOpcode {
        instruction: instr.to_string(),
    }
}

fn io_error(err: std::io::Error) -> VMError {
    VMError::Io {
        message: err.to_string(),
    }
}

/// Floor division. `None` on overflow (`i64::MIN / -1`).
fn floor_div(a: i64, b: i64) -> Option<i64> {
    let q = a.checked_div(b)?;
    if a % b != 0 && ((a < 0) != (b < 0)) {
        q.checked_sub(1)
    } else {
        Some(q)
    }
}

/// Remainder matching [`floor_div`]: the sign follows the divisor.
fn floor_mod(a: i64, b: i64) -> i64 {
    if b == -1 {
        return 0;
    }
    let r = a % b;
    if r != 0 && ((r < 0) != (b < 0)) { r + b } else { r }
}

macro_rules! exec_vm {
    // Entry point
    (
        machine = $m:ident,
        console = $console:ident,
        instr = $instr:ident,
        { $( $variant:ident => $handler:ident $args:tt ),* $(,)? }
    ) => {{
        match $instr.opcode {
            $(
                Opcode::$variant => {
                    let instr_name = Opcode::$variant.mnemonic();
                    exec_vm!(@call $m, $console, $instr, instr_name, $handler, $args)
                }
            ),*
        }
    }};

    // Handler with console access (semicolon separator)
    (@call $m:ident, $console:ident, $instr:ident, $instr_name:expr, $handler:ident,
        (console; $( $field:ident : $kind:ident ),* $(,)? )
    ) => {{
        let mut operands = $instr.operands.iter();
        $( let $field = exec_vm!(@read $instr, operands, $kind)?; )*
        if operands.next().is_some() {
            return Err(undecodable($instr));
        }
        $m.$handler($instr_name, $console, $( $field ),*)
    }};

    // Handler without console access
    (@call $m:ident, $console:ident, $instr:ident, $instr_name:expr, $handler:ident,
        ( $( $field:ident : $kind:ident ),* $(,)? )
    ) => {{
        let mut operands = $instr.operands.iter();
        $( let $field = exec_vm!(@read $instr, operands, $kind)?; )*
        if operands.next().is_some() {
            return Err(undecodable($instr));
        }
        $m.$handler($instr_name, $( $field ),*)
    }};

    // Decode an integer literal
    (@read $instr:ident, $it:ident, Int) => {{
        match $it.next() {
            Some(Operand::Literal(v)) => Ok::<i64, VMError>(*v),
            _ => Err(undecodable($instr)),
        }
    }};

    // Decode a resolved jump target
    (@read $instr:ident, $it:ident, Addr) => {{
        exec_vm!(@read $instr, $it, Int)
    }};

    // Decode a variable name
    (@read $instr:ident, $it:ident, Name) => {{
        match $it.next() {
            Some(Operand::Identifier(name)) => Ok::<&str, VMError>(name.as_str()),
            _ => Err(undecodable($instr)),
        }
    }};
}

/// Mutable machine state owned by one [`VM`].
struct Machine {
    /// Index of the next instruction.
    pc: usize,
    stack: Stack,
    variables: Variables,
    halted: bool,
    /// Length of the program being run, for address checks.
    program_len: usize,
}

/// Stack-based virtual machine.
///
/// Owns the loaded program and all execution state; nothing is shared between
/// instances.
pub struct VM {
    program: Program,
    machine: Machine,
    /// Log every dispatched instruction at debug level.
    trace: bool,
}

impl VM {
    /// Creates a VM ready to run `program` from index 0.
    pub fn new(program: Program) -> Self {
        let program_len = program.len();
        Self {
            program,
            machine: Machine {
                pc: 0,
                stack: Stack::new(),
                variables: Variables::new(),
                halted: false,
                program_len,
            },
            trace: false,
        }
    }

    /// Creates a VM from the loader's result.
    ///
    /// A failed load yields a VM that is already halted, so [`run`](Self::run)
    /// dispatches nothing.
    pub fn from_load(result: Result<Program, LoadError>) -> Self {
        match result {
            Ok(program) => Self::new(program),
            Err(_) => {
                let mut vm = Self::new(Program::default());
                vm.machine.halted = true;
                vm
            }
        }
    }

    pub fn with_trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn pc(&self) -> usize {
        self.machine.pc
    }

    pub fn is_halted(&self) -> bool {
        self.machine.halted
    }

    /// Stack contents, bottom first.
    pub fn stack(&self) -> &[i64] {
        self.machine.stack.as_slice()
    }

    pub fn variable(&self, name: &str) -> Option<i64> {
        self.machine.variables.get(name).ok()
    }

    /// All variable bindings sorted by name.
    pub fn variables(&self) -> Vec<(&str, i64)> {
        self.machine.variables.sorted()
    }

    /// Runs until `HALT`, the end of the program, or a fault.
    ///
    /// Output already written before a fault stays written. A halted VM
    /// returns [`Outcome::Halted`] immediately.
    pub fn run<C: Console>(&mut self, console: &mut C) -> Outcome {
        if self.machine.halted {
            return Outcome::Halted;
        }

        while self.machine.pc < self.program.len() {
            let index = self.machine.pc;
            let instruction = &self.program.instructions()[index];
            if self.trace {
                debug!(
                    "[{index:>4}] line {:<4} {:<16} depth={} stack={:?}",
                    instruction.line,
                    instruction.to_string(),
                    self.machine.stack.len(),
                    self.machine.stack.as_slice()
                );
            }

            match self.machine.exec(instruction, console) {
                Ok(Flow::Next) => self.machine.pc += 1,
                Ok(Flow::Jump(target)) => self.machine.pc = target,
                Ok(Flow::Halt) => {
                    self.machine.halted = true;
                    return Outcome::Halted;
                }
                Err(kind) => {
                    self.machine.halted = true;
                    let fault = Fault {
                        index,
                        instruction: instruction.clone(),
                        kind,
                    };
                    error!("{fault}");
                    return Outcome::Faulted(fault);
                }
            }
        }
        Outcome::Completed
    }
}

impl Machine {
    /// Executes a single instruction.
    fn exec<C: Console>(
        &mut self,
        instruction: &Instruction,
        console: &mut C,
    ) -> Result<Flow, VMError> {
        exec_vm! {
            machine = self,
            console = console,
            instr = instruction,
            {
                // Stack
                Push => op_push(value: Int),
                Pop => op_pop(),
                // Integer arithmetic
                Add => op_add(),
                Sub => op_sub(),
                Mul => op_mul(),
                Div => op_div(),
                Mod => op_mod(),
                Neg => op_neg(),
                // Variables
                Store => op_store(name: Name),
                Load => op_load(name: Name),
                // Control flow
                Jmp => op_jmp(target: Addr),
                Jz => op_jz(target: Addr),
                Jnz => op_jnz(target: Addr),
                Call => op_call(target: Addr),
                Ret => op_ret(),
                Halt => op_halt(),
                // Comparison
                Eq => op_eq(),
                Neq => op_neq(),
                Lt => op_lt(),
                Gt => op_gt(),
                Le => op_le(),
                Ge => op_ge(),
                // Console I/O
                Print => op_print(console;),
                Read => op_read(console;),
            }
        }
    }

    /// Pops `op2` then `op1`, pushes `f(op1, op2)`. Leaves the stack untouched if `f` fails.
    fn binary(
        &mut self,
        instr: &'static str,
        f: impl FnOnce(i64, i64) -> Result<i64, VMError>,
    ) -> Result<Flow, VMError> {
        let (op1, op2) = self.stack.peek_pair(instr)?;
        let result = f(op1, op2)?;
        self.stack.replace_top(2, result);
        Ok(Flow::Next)
    }

    fn compare(&mut self, instr: &'static str, f: fn(i64, i64) -> bool) -> Result<Flow, VMError> {
        self.binary(instr, |a, b| Ok(f(a, b) as i64))
    }

    /// Validates a jump target; the program length itself is a legal target.
    fn jump_target(&self, instr: &'static str, target: i64) -> Result<usize, VMError> {
        usize::try_from(target)
            .ok()
            .filter(|t| *t <= self.program_len)
            .ok_or(VMError::InvalidAddress {
                instruction: instr,
                target,
                len: self.program_len,
            })
    }

    /// Pops a condition and jumps to `target` if `taken(condition)`.
    fn branch_if(
        &mut self,
        instr: &'static str,
        target: i64,
        taken: fn(i64) -> bool,
    ) -> Result<Flow, VMError> {
        let condition = self.stack.peek(instr)?;
        let flow = if taken(condition) {
            Flow::Jump(self.jump_target(instr, target)?)
        } else {
            Flow::Next
        };
        self.stack.pop(instr)?;
        Ok(flow)
    }

    fn op_push(&mut self, _instr: &'static str, value: i64) -> Result<Flow, VMError> {
        self.stack.push(value);
        Ok(Flow::Next)
    }

    fn op_pop(&mut self, instr: &'static str) -> Result<Flow, VMError> {
        self.stack.pop(instr)?;
        Ok(Flow::Next)
    }

    fn op_add(&mut self, instr: &'static str) -> Result<Flow, VMError> {
        self.binary(instr, |a, b| {
            a.checked_add(b)
                .ok_or(VMError::Overflow { instruction: instr })
        })
    }

    fn op_sub(&mut self, instr: &'static str) -> Result<Flow, VMError> {
        self.binary(instr, |a, b| {
            a.checked_sub(b)
                .ok_or(VMError::Overflow { instruction: instr })
        })
    }

    fn op_mul(&mut self, instr: &'static str) -> Result<Flow, VMError> {
        self.binary(instr, |a, b| {
            a.checked_mul(b)
                .ok_or(VMError::Overflow { instruction: instr })
        })
    }

    fn op_div(&mut self, instr: &'static str) -> Result<Flow, VMError> {
        self.binary(instr, |a, b| {
            if b == 0 {
                return Err(VMError::DivideByZero);
            }
            floor_div(a, b).ok_or(VMError::Overflow { instruction: instr })
        })
    }

    fn op_mod(&mut self, instr: &'static str) -> Result<Flow, VMError> {
        self.binary(instr, |a, b| {
            if b == 0 {
                return Err(VMError::DivideByZero);
            }
            Ok(floor_mod(a, b))
        })
    }

    fn op_neg(&mut self, instr: &'static str) -> Result<Flow, VMError> {
        let v = self.stack.peek(instr)?;
        let negated = v
            .checked_neg()
            .ok_or(VMError::Overflow { instruction: instr })?;
        self.stack.replace_top(1, negated);
        Ok(Flow::Next)
    }

    fn op_store(&mut self, instr: &'static str, name: &str) -> Result<Flow, VMError> {
        let value = self.stack.pop(instr)?;
        self.variables.set(name, value);
        Ok(Flow::Next)
    }

    fn op_load(&mut self, _instr: &'static str, name: &str) -> Result<Flow, VMError> {
        let value = self.variables.get(name)?;
        self.stack.push(value);
        Ok(Flow::Next)
    }

    fn op_jmp(&mut self, instr: &'static str, target: i64) -> Result<Flow, VMError> {
        Ok(Flow::Jump(self.jump_target(instr, target)?))
    }

    fn op_jz(&mut self, instr: &'static str, target: i64) -> Result<Flow, VMError> {
        self.branch_if(instr, target, |v| v == 0)
    }

    fn op_jnz(&mut self, instr: &'static str, target: i64) -> Result<Flow, VMError> {
        self.branch_if(instr, target, |v| v != 0)
    }

    fn op_call(&mut self, instr: &'static str, target: i64) -> Result<Flow, VMError> {
        // a call must land on an executable instruction
        let dest = usize::try_from(target)
            .ok()
            .filter(|t| *t < self.program_len)
            .ok_or(VMError::InvalidAddress {
                instruction: instr,
                target,
                len: self.program_len,
            })?;
        self.stack.push(self.pc as i64 + 1);
        Ok(Flow::Jump(dest))
    }

    fn op_ret(&mut self, instr: &'static str) -> Result<Flow, VMError> {
        let address = self.stack.peek(instr)?;
        let dest = usize::try_from(address)
            .ok()
            .filter(|t| *t <= self.program_len)
            .ok_or(VMError::InvalidReturnAddress {
                address,
                len: self.program_len,
            })?;
        self.stack.pop(instr)?;
        Ok(Flow::Jump(dest))
    }

    fn op_halt(&mut self, _instr: &'static str) -> Result<Flow, VMError> {
        Ok(Flow::Halt)
    }

    fn op_eq(&mut self, instr: &'static str) -> Result<Flow, VMError> {
        self.compare(instr, |a, b| a == b)
    }

    fn op_neq(&mut self, instr: &'static str) -> Result<Flow, VMError> {
        self.compare(instr, |a, b| a != b)
    }

    fn op_lt(&mut self, instr: &'static str) -> Result<Flow, VMError> {
        self.compare(instr, |a, b| a < b)
    }

    fn op_gt(&mut self, instr: &'static str) -> Result<Flow, VMError> {
        self.compare(instr, |a, b| a > b)
    }

    fn op_le(&mut self, instr: &'static str) -> Result<Flow, VMError> {
        self.compare(instr, |a, b| a <= b)
    }

    fn op_ge(&mut self, instr: &'static str) -> Result<Flow, VMError> {
        self.compare(instr, |a, b| a >= b)
    }

    // TODO: add a popping PRINTP variant once listings need print-and-discard
    // without a separate POP.
    fn op_print<C: Console>(&mut self, instr: &'static str, console: &mut C) -> Result<Flow, VMError> {
        let value = self.stack.peek(instr)?;
        console.write_value(value).map_err(io_error)?;
        Ok(Flow::Next)
    }

    fn op_read<C: Console>(&mut self, _instr: &'static str, console: &mut C) -> Result<Flow, VMError> {
        let line = console
            .read_line()
            .map_err(io_error)?
            .ok_or(VMError::EndOfInput)?;
        let value = line
            .trim()
            .parse::<i64>()
            .map_err(|_| VMError::InvalidInput { input: line.clone() })?;
        self.stack.push(value);
        Ok(Flow::Next)
    }
}
