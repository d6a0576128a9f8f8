use std::fmt::Display;

use crate::vm::chunk::{Chunk, IndexWidth};
use crate::vm::errors::ChunkError;
use crate::vm::opcode::{Op, Shape};
use crate::vm::value::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum AsmErrorKind {
    UnknownMnemonic(String),
    MissingOperand(Op),
    UnexpectedOperand(Op),
    BadOperand { op: Op, text: String },
    Chunk(ChunkError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct AsmError {
    pub line: u32,
    pub kind: AsmErrorKind,
}

impl AsmError {
    pub fn exit_code(&self) -> i32 {
        65
    }
}

impl Display for AsmError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[line {}] ", self.line)?;
        match &self.kind {
            AsmErrorKind::UnknownMnemonic(name) => write!(f, "unknown mnemonic '{}'", name),
            AsmErrorKind::MissingOperand(op) => write!(f, "{} expects an operand", op),
            AsmErrorKind::UnexpectedOperand(op) => write!(f, "{} takes no operand", op),
            AsmErrorKind::BadOperand { op, text } => write!(f, "'{}' is not a valid operand for {}", text, op),
            AsmErrorKind::Chunk(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for AsmError {}

/// Builds a chunk from text assembly, one instruction per line:
///
/// ```text
/// ; comments run to the end of the line
/// constant 1.5
/// define_global "answer"
/// jump_if_false 4
/// OP_RETURN
/// ```
///
/// Each instruction is tagged with the number of the line it was written on.
pub struct Assembler {
    chunk: Chunk,
}

impl Assembler {
    pub fn new(index_width: IndexWidth) -> Assembler {
        Assembler { chunk: Chunk::with_index_width(index_width) }
    }

    pub fn chunk(&self) -> &Chunk {
        &self.chunk
    }

    pub fn finish(self) -> Chunk {
        self.chunk
    }

    /// Assembles one line. Returns the offset of the emitted instruction, or `None` for
    /// blank and comment-only lines. On error no code is appended.
    pub fn assemble_line(&mut self, text: &str, line: u32) -> Result<Option<usize>, AsmError> {
        let text = match text.match_indices(';').find(|(idx, _)| !in_string(text, *idx)) {
            Some((idx, _)) => &text[..idx],
            None => text,
        }
        .trim();
        if text.is_empty() {
            return Ok(None);
        }

        let (name, operand) = match text.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, Some(rest.trim())),
            None => (text, None),
        };
        let err = |kind| AsmError { line, kind };
        let op = Op::from_mnemonic(name).ok_or_else(|| err(AsmErrorKind::UnknownMnemonic(name.to_string())))?;
        let offset = self.chunk.len();

        let written = match (op.shape(), operand) {
            (Shape::Simple, None) => self.chunk.write_op(op, line),
            (Shape::Simple, Some(_)) => return Err(err(AsmErrorKind::UnexpectedOperand(op))),
            (_, None) => return Err(err(AsmErrorKind::MissingOperand(op))),
            (Shape::Byte, Some(text)) => {
                let byte = text.parse::<u8>().map_err(|_| bad_operand(line, op, text))?;
                self.chunk.write_op_byte(op, byte, line)
            }
            // Both widths load a constant; the chunk picks the encoding from the index
            (Shape::Constant | Shape::ConstantLong, Some(text)) if matches!(op, Op::Constant | Op::ConstantLong) => {
                let value = parse_literal(text).ok_or_else(|| bad_operand(line, op, text))?;
                self.chunk.write_constant(value, line).map(|_| ())
            }
            (_, Some(text)) if op.shape() == Shape::Constant => {
                let name = parse_literal(text).unwrap_or_else(|| Value::from(text));
                self.write_global(op, name, line)
            }
            (_, Some(text)) => {
                let distance = text.parse::<usize>().map_err(|_| bad_operand(line, op, text))?;
                self.chunk.write_jump(op, distance, line)
            }
        };
        written.map_err(|e| err(AsmErrorKind::Chunk(e)))?;

        Ok(Some(offset))
    }

    // Global names are always one byte indexes, so the pool must have room below 256
    fn write_global(&mut self, op: Op, name: Value, line: u32) -> Result<(), ChunkError> {
        let next = self.chunk.constants().len();
        let byte = u8::try_from(next).map_err(|_| ChunkError::OperandOverflow { value: next, limit: 1 << 8 })?;
        self.chunk.append_constant(name)?;
        self.chunk.write_op_byte(op, byte, line)
    }
}

/// Assembles a whole listing.
pub fn assemble(source: &str, index_width: IndexWidth) -> Result<Chunk, AsmError> {
    let mut assembler = Assembler::new(index_width);
    for (idx, text) in source.lines().enumerate() {
        assembler.assemble_line(text, idx as u32 + 1)?;
    }
    Ok(assembler.finish())
}

fn bad_operand(line: u32, op: Op, text: &str) -> AsmError {
    AsmError { line, kind: AsmErrorKind::BadOperand { op, text: text.to_string() } }
}

fn in_string(text: &str, idx: usize) -> bool {
    text[..idx].matches('"').count() % 2 == 1
}

fn parse_literal(text: &str) -> Option<Value> {
    match text {
        "nil" => Some(Value::Nil),
        "true" => Some(Value::Bool(true)),
        "false" => Some(Value::Bool(false)),
        _ => {
            if let Some(s) = text.strip_prefix('"').and_then(|s| s.strip_suffix('"')) {
                return Some(Value::from(s));
            }
            text.parse::<f64>().ok().map(Value::Number)
        }
    }
}
