//! Assembly listing parser and loader.
//!
//! Converts a human-readable listing into a resolved [`Program`].
//!
//! # Syntax
//!
//! ```text
//! label:                # a label names the next instruction
//! OPCODE operand ...    # optional comment
//! ```
//!
//! - One instruction or label per line
//! - Opcodes are case-insensitive and canonicalized to upper case
//! - Operands are whitespace-separated
//! - `#` starts a comment running to the end of the line
//! - Blank and comment-only lines are ignored
//!
//! Loading runs two passes. Pass 1 records label positions and collects
//! instruction lines; labels take no instruction slot. Pass 2 parses each
//! instruction against its operand signature and resolves label references
//! to instruction indices.

use crate::{debug, error};
use crate::virtual_machine::errors::{LoadError, ParseErrorKind};
use crate::virtual_machine::isa::{Opcode, OperandKind};
use crate::virtual_machine::operand::{Operand, looks_numeric, parse_literal};
use crate::virtual_machine::program::{Instruction, Program};
use std::collections::HashMap;
use std::fmt::Write;
use std::fs;
use std::path::Path;

const COMMENT_CHAR: char = '#';
const LABEL_SUFFIX: char = ':';

/// Formats a compiler-style diagnostic for load failures.
fn render_assembly_diagnostic(file: &str, source: &str, line: usize, message: &str) -> String {
    let mut diag = String::new();
    let _ = writeln!(diag, "error: {message}");

    let Some(raw_line) = source.lines().nth(line.saturating_sub(1)) else {
        let _ = write!(diag, " --> {file}:{line}");
        return diag;
    };
    let line_text = raw_line.trim_end_matches('\r');
    let column = line_text.len() - line_text.trim_start().len() + 1;
    let _ = writeln!(diag, " --> {file}:{line}:{column}");
    let _ = writeln!(diag, "  |");
    let _ = writeln!(diag, "{:>4} | {}", line, line_text);
    let _ = write!(diag, "  | {}^", " ".repeat(column - 1));
    diag
}

/// One-line diagnostic: source name, line and cause.
pub fn summarize_load_error(file: &str, err: &LoadError) -> String {
    match err {
        LoadError::Io { .. } => err.to_string(),
        _ => format!("{file}: {err}"),
    }
}

/// Renders a [`LoadError`] against the listing it came from, with a caret
/// under the offending line.
pub fn render_load_error(file: &str, source: &str, err: &LoadError) -> String {
    match err.line() {
        Some(line) => render_assembly_diagnostic(file, source, line, &err.to_string()),
        None => format!("error: {err}"),
    }
}

/// Label table built during pass 1.
#[derive(Debug, Default)]
struct AsmContext {
    labels: HashMap<String, usize>,
}

impl AsmContext {
    /// Registers a label at the given instruction index.
    fn define_label(&mut self, name: &str, index: usize, line: usize) -> Result<(), LoadError> {
        if name.is_empty() {
            return Err(LoadError::EmptyLabel { line });
        }
        if self.labels.contains_key(name) {
            return Err(LoadError::DuplicateLabel {
                line,
                label: name.to_string(),
            });
        }
        self.labels.insert(name.to_string(), index);
        Ok(())
    }

    /// Resolves a label to its instruction index.
    fn resolve_label(&self, name: &str, line: usize) -> Result<usize, LoadError> {
        self.labels
            .get(name)
            .copied()
            .ok_or_else(|| LoadError::UndefinedLabel {
                line,
                label: name.to_string(),
            })
    }
}

/// An instruction line collected by pass 1.
#[derive(Debug)]
struct PendingLine<'a> {
    line: usize,
    tokens: Vec<&'a str>,
}

/// Strips a trailing comment and surrounding whitespace.
fn strip_comment(line: &str) -> &str {
    line.split(COMMENT_CHAR).next().unwrap_or("").trim()
}

/// Returns the label name if the (comment-stripped) line declares a label.
fn label_decl(text: &str) -> Option<&str> {
    text.strip_suffix(LABEL_SUFFIX).map(str::trim)
}

/// Parses a single operand token against its expected kind.
fn parse_operand(
    ctx: &AsmContext,
    opcode: Opcode,
    index: usize,
    kind: OperandKind,
    tok: &str,
    line: usize,
) -> Result<Operand, LoadError> {
    let mismatch = || LoadError::ParseError {
        line,
        kind: ParseErrorKind::TypeMismatch {
            opcode,
            index,
            expected: kind.describe(),
            actual: tok.to_string(),
        },
    };
    match kind {
        OperandKind::Int => parse_literal(tok).map(Operand::Literal).ok_or_else(mismatch),
        OperandKind::Addr => match parse_literal(tok) {
            Some(target) => Ok(Operand::Literal(target)),
            // a number too large for i64 is not a label name
            None if looks_numeric(tok) => Err(mismatch()),
            None => {
                let target = ctx.resolve_label(tok, line)?;
                Ok(Operand::Literal(target as i64))
            }
        },
        OperandKind::Name => Ok(Operand::Identifier(tok.to_string())),
    }
}

/// Parses one instruction line into an [`Instruction`].
fn parse_instruction(ctx: &AsmContext, pending: &PendingLine) -> Result<Instruction, LoadError> {
    let line = pending.line;
    let Some((head, args)) = pending.tokens.split_first() else {
        return Err(LoadError::ParseError {
            line,
            kind: ParseErrorKind::UnknownOpcode {
                name: String::new(),
            },
        });
    };

    let name = head.to_ascii_uppercase();
    let opcode = Opcode::from_mnemonic(&name).ok_or(LoadError::ParseError {
        line,
        kind: ParseErrorKind::UnknownOpcode { name },
    })?;

    let kinds = opcode.operand_kinds();
    if args.len() != kinds.len() {
        return Err(LoadError::ParseError {
            line,
            kind: ParseErrorKind::ArityMismatch {
                opcode,
                expected: kinds.len(),
                actual: args.len(),
            },
        });
    }

    let operands = kinds
        .iter()
        .zip(args)
        .enumerate()
        .map(|(index, (kind, tok))| parse_operand(ctx, opcode, index, *kind, tok, line))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Instruction::new(opcode, operands, line))
}

/// Assembles a listing into a resolved [`Program`].
///
/// Any error aborts loading; nothing from a failed load is runnable.
pub fn assemble_source(source: &str) -> Result<Program, LoadError> {
    let mut ctx = AsmContext::default();

    // Pass 1: label discovery
    let mut pending = Vec::new();
    for (line_no, raw) in source.lines().enumerate() {
        let line = line_no + 1;
        let text = strip_comment(raw);
        if text.is_empty() {
            continue;
        }
        match label_decl(text) {
            Some(name) => ctx.define_label(name, pending.len(), line)?,
            None => pending.push(PendingLine {
                line,
                tokens: text.split_whitespace().collect(),
            }),
        }
    }

    // Pass 2: instruction parsing with label resolution
    let instructions = pending
        .iter()
        .map(|p| parse_instruction(&ctx, p))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Program::new(instructions, ctx.labels))
}

/// Assembles a listing and logs a one-line diagnostic on failure.
///
/// The source excerpt with a caret is logged as well at debug level.
pub fn assemble_source_with_name(source: &str, source_name: &str) -> Result<Program, LoadError> {
    let result = assemble_source(source);
    if let Err(err) = &result {
        error!("{}", summarize_load_error(source_name, err));
        debug!("{}", render_load_error(source_name, source, err));
    }
    result
}

/// Convenience: assemble directly from a file path.
pub fn assemble_file<P: AsRef<Path>>(path: P) -> Result<Program, LoadError> {
    let path_ref = path.as_ref();
    let source = fs::read_to_string(path_ref).map_err(|e| LoadError::Io {
        path: path_ref.display().to_string(),
        message: e.to_string(),
    })?;
    assemble_source_with_name(&source, &path_ref.display().to_string())
}
