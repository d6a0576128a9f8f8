use crate::vm::errors::ChunkError;
use crate::vm::lines::LineRuns;
use crate::vm::opcode::{Op, Shape};
use crate::vm::value::Value;
use crate::log_debug;

/// Width of the constant pool index carried by constant instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum IndexWidth {
    /// One byte indexes, OP_CONSTANT only.
    #[default]
    Byte,
    /// OP_CONSTANT for the first 256 entries, OP_CONSTANT_LONG (three bytes) past that.
    Wide,
}

impl IndexWidth {
    /// Largest pool size this width can address.
    pub fn pool_limit(&self) -> usize {
        match self {
            IndexWidth::Byte => 1 << 8,
            IndexWidth::Wide => 1 << 24,
        }
    }
}

/// Append-only bytecode, its source lines and its constant pool.
///
/// Nothing is rewritten once appended, which is what keeps the line runs valid.
#[derive(Debug, Clone)]
pub struct Chunk<V = Value> {
    code: Vec<u8>,
    lines: LineRuns,
    constants: Vec<V>,
    index_width: IndexWidth,
}

impl<V> Default for Chunk<V> {
    fn default() -> Self {
        Chunk::with_index_width(IndexWidth::default())
    }
}

impl<V> Chunk<V> {
    pub fn new() -> Chunk<V> {
        Chunk::default()
    }

    pub fn with_index_width(index_width: IndexWidth) -> Chunk<V> {
        Chunk { code: vec![], lines: LineRuns::new(), constants: vec![], index_width }
    }

    pub fn append_byte(&mut self, byte: u8, line: u32) {
        self.code.push(byte);
        self.lines.push(line);
    }

    /// Adds `value` to the pool and returns the index instructions should embed.
    pub fn append_constant(&mut self, value: V) -> Result<usize, ChunkError> {
        let limit = self.index_width.pool_limit();
        if self.constants.len() >= limit {
            log_debug!("Constant pool full", pool_size = self.constants.len(), limit = limit);
            return Err(ChunkError::OperandOverflow { value: self.constants.len(), limit });
        }
        self.constants.push(value);
        Ok(self.constants.len() - 1)
    }

    /// Writes an opcode that takes no operand.
    pub fn write_op(&mut self, op: Op, line: u32) -> Result<(), ChunkError> {
        if op.shape() != Shape::Simple {
            return Err(ChunkError::OperandMismatch { op, shape: op.shape() });
        }
        self.append_byte(op.bytecode(), line);
        Ok(())
    }

    /// Writes an opcode with a single byte operand: a slot, an argument count or a pool index.
    pub fn write_op_byte(&mut self, op: Op, operand: u8, line: u32) -> Result<(), ChunkError> {
        match op.shape() {
            Shape::Byte => {}
            Shape::Constant if (operand as usize) < self.constants.len() => {}
            Shape::Constant => {
                return Err(ChunkError::ConstantIndexOutOfRange {
                    index: operand as usize,
                    pool_size: self.constants.len(),
                });
            }
            shape => return Err(ChunkError::OperandMismatch { op, shape }),
        }
        self.append_byte(op.bytecode(), line);
        self.append_byte(operand, line);
        Ok(())
    }

    /// Adds `value` to the pool and emits the instruction that loads it.
    pub fn write_constant(&mut self, value: V, line: u32) -> Result<usize, ChunkError> {
        let idx = self.append_constant(value)?;
        match u8::try_from(idx) {
            Ok(byte) => {
                self.append_byte(Op::Constant.bytecode(), line);
                self.append_byte(byte, line);
            }
            Err(_) => {
                self.append_byte(Op::ConstantLong.bytecode(), line);
                let [_, hi, mid, lo] = (idx as u32).to_be_bytes();
                self.append_byte(hi, line);
                self.append_byte(mid, line);
                self.append_byte(lo, line);
            }
        }
        Ok(idx)
    }

    /// Writes a jump whose distance is already known.
    pub fn write_jump(&mut self, op: Op, distance: usize, line: u32) -> Result<(), ChunkError> {
        if !op.shape().is_jump() {
            return Err(ChunkError::OperandMismatch { op, shape: op.shape() });
        }
        let distance = u16::try_from(distance).map_err(|_| {
            log_debug!("Jump too far", op = op.mnemonic(), distance = distance);
            ChunkError::OperandOverflow { value: distance, limit: u16::MAX as usize }
        })?;
        self.append_byte(op.bytecode(), line);
        for byte in distance.to_be_bytes() {
            self.append_byte(byte, line);
        }
        Ok(())
    }

    /// Writes an OP_LOOP that lands on `loop_start`, an offset already in the chunk.
    pub fn write_loop(&mut self, loop_start: usize, line: u32) -> Result<(), ChunkError> {
        if loop_start > self.code.len() {
            return Err(ChunkError::LoopTargetOutOfRange { target: loop_start, len: self.code.len() });
        }
        let after = self.code.len() + Op::Loop.shape().len();
        self.write_jump(Op::Loop, after - loop_start, line)
    }

    pub fn line_at(&self, offset: usize) -> Option<u32> {
        if offset >= self.code.len() {
            return None;
        }
        self.lines.line_at(offset)
    }

    pub fn byte_at(&self, offset: usize) -> Option<u8> {
        self.code.get(offset).copied()
    }

    pub fn constant(&self, idx: usize) -> Option<&V> {
        self.constants.get(idx)
    }

    pub fn constants(&self) -> &[V] {
        &self.constants
    }

    pub fn code(&self) -> &[u8] {
        &self.code
    }

    pub fn lines(&self) -> &LineRuns {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }
}
