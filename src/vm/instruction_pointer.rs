use crate::vm::chunk::Chunk;
use crate::vm::errors::DecodeError;
use crate::vm::opcode::Op;

/// A read cursor over one chunk. The interpreter loop and the disassembler both walk
/// code through this, so every operand read is bounds checked in one place.
pub struct IP<'a, V> {
    chunk: &'a Chunk<V>,
    ip: usize,
    // Start of the instruction currently being read, used for error reporting
    start: usize,
    op: Option<Op>,
}

impl<'a, V> IP<'a, V> {
    pub fn new(chunk: &'a Chunk<V>) -> IP<'a, V> {
        IP::at(chunk, 0)
    }

    pub fn at(chunk: &'a Chunk<V>, offset: usize) -> IP<'a, V> {
        IP { chunk, ip: offset, start: offset, op: None }
    }

    pub fn offset(&self) -> usize {
        self.ip
    }

    pub fn is_at_end(&self) -> bool {
        self.ip >= self.chunk.len()
    }

    /// Reads the opcode starting the next instruction.
    pub fn next_op(&mut self) -> Result<Op, DecodeError> {
        self.start = self.ip;
        self.op = None;
        let byte = self
            .chunk
            .byte_at(self.ip)
            .ok_or(DecodeError::TruncatedInstruction { offset: self.ip, needed: 1, available: 0 })?;
        let op = Op::try_from(byte).map_err(|byte| DecodeError::UnknownOpcode { offset: self.ip, byte })?;
        self.ip += 1;
        self.op = Some(op);
        Ok(op)
    }

    pub fn read_byte(&mut self) -> Result<u8, DecodeError> {
        let [byte] = self.read::<1>()?;
        Ok(byte)
    }

    pub fn read_u16(&mut self) -> Result<u16, DecodeError> {
        Ok(u16::from_be_bytes(self.read::<2>()?))
    }

    pub fn read_u24(&mut self) -> Result<u32, DecodeError> {
        let [hi, mid, lo] = self.read::<3>()?;
        Ok(u32::from_be_bytes([0, hi, mid, lo]))
    }

    pub fn jump(&mut self, distance: u16) {
        self.ip += distance as usize;
    }

    pub fn jump_back(&mut self, distance: u16) -> Result<(), DecodeError> {
        self.ip = self
            .ip
            .checked_sub(distance as usize)
            .ok_or(DecodeError::JumpOutOfRange { offset: self.start, distance })?;
        Ok(())
    }

    // Reads N operand bytes, all or nothing
    fn read<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let code = self.chunk.code();
        match code.get(self.ip..self.ip + N) {
            Some(bytes) => {
                let mut out = [0u8; N];
                out.copy_from_slice(bytes);
                self.ip += N;
                Ok(out)
            }
            None => Err(DecodeError::TruncatedInstruction {
                offset: self.start,
                needed: self.op.map_or(self.ip - self.start + N, |op| op.shape().len()),
                available: code.len().saturating_sub(self.start),
            }),
        }
    }
}
