use std::fmt::Display;

use crate::vm::opcode::{Op, Shape};

/// Failures while appending to a chunk.
#[derive(Debug, Clone, PartialEq)]
pub enum ChunkError {
    /// The operand does not fit the encoding's width (pool index or jump distance).
    OperandOverflow { value: usize, limit: usize },
    /// The opcode was written with an operand its shape does not carry.
    OperandMismatch { op: Op, shape: Shape },
    /// A constant instruction names a pool entry that has not been appended.
    ConstantIndexOutOfRange { index: usize, pool_size: usize },
    /// A loop start lies past the end of the code written so far.
    LoopTargetOutOfRange { target: usize, len: usize },
}

impl Display for ChunkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChunkError::OperandOverflow { value, limit } => {
                write!(f, "operand {} does not fit the encoding (limit {})", value, limit)
            }
            ChunkError::OperandMismatch { op, shape } => {
                write!(f, "{} has {:?} shape and cannot take this operand", op, shape)
            }
            ChunkError::ConstantIndexOutOfRange { index, pool_size } => {
                write!(f, "constant index {} out of range (pool holds {})", index, pool_size)
            }
            ChunkError::LoopTargetOutOfRange { target, len } => {
                write!(f, "loop start {} is past the end of the chunk ({} bytes)", target, len)
            }
        }
    }
}

impl std::error::Error for ChunkError {}

/// Failures while decoding the instruction at `offset`.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodeError {
    UnknownOpcode { offset: usize, byte: u8 },
    TruncatedInstruction { offset: usize, needed: usize, available: usize },
    ConstantIndexOutOfRange { offset: usize, index: usize, pool_size: usize },
    JumpOutOfRange { offset: usize, distance: u16 },
}

impl DecodeError {
    pub fn offset(&self) -> usize {
        match self {
            DecodeError::UnknownOpcode { offset, .. }
            | DecodeError::TruncatedInstruction { offset, .. }
            | DecodeError::ConstantIndexOutOfRange { offset, .. }
            | DecodeError::JumpOutOfRange { offset, .. } => *offset,
        }
    }
}

impl Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodeError::UnknownOpcode { offset, byte } => {
                write!(f, "{:04}: unknown opcode 0x{:02x}", offset, byte)
            }
            DecodeError::TruncatedInstruction { offset, needed, available } => write!(
                f,
                "{:04}: instruction needs {} bytes but only {} remain",
                offset, needed, available
            ),
            DecodeError::ConstantIndexOutOfRange { offset, index, pool_size } => write!(
                f,
                "{:04}: constant index {} out of range (pool holds {})",
                offset, index, pool_size
            ),
            DecodeError::JumpOutOfRange { offset, distance } => {
                write!(f, "{:04}: jump distance {} lands before the start of the chunk", offset, distance)
            }
        }
    }
}

impl std::error::Error for DecodeError {}

#[derive(Debug)]
pub enum DisassembleError {
    Decode(DecodeError),
    Io(std::io::Error),
}

impl DisassembleError {
    pub fn exit_code(&self) -> i32 {
        match self {
            DisassembleError::Decode(_) => 65,
            DisassembleError::Io(_) => 74,
        }
    }
}

impl Display for DisassembleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DisassembleError::Decode(e) => write!(f, "decode error at {}", e),
            DisassembleError::Io(e) => write!(f, "failed to write disassembly: {}", e),
        }
    }
}

impl std::error::Error for DisassembleError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DisassembleError::Decode(e) => Some(e),
            DisassembleError::Io(e) => Some(e),
        }
    }
}

impl From<DecodeError> for DisassembleError {
    fn from(e: DecodeError) -> Self {
        DisassembleError::Decode(e)
    }
}

impl From<std::io::Error> for DisassembleError {
    fn from(e: std::io::Error) -> Self {
        DisassembleError::Io(e)
    }
}
