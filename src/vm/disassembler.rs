use std::fmt::Display;
use std::io::Write;

use crate::vm::chunk::Chunk;
use crate::vm::errors::{DecodeError, DisassembleError};
use crate::vm::instruction_pointer::IP;
use crate::vm::opcode::{Op, Shape};
use crate::log_debug;

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    None,
    Byte(u8),
    /// Pool index plus the constant's printable form.
    Constant { index: usize, text: String },
    /// Encoded distance plus the absolute offset it lands on.
    Jump { distance: u16, target: usize },
}

/// One decoded instruction.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    pub offset: usize,
    pub op: Op,
    pub operand: Operand,
}

impl Instruction {
    pub fn len(&self) -> usize {
        self.op.shape().len()
    }

    pub fn next_offset(&self) -> usize {
        self.offset + self.len()
    }
}

impl Display for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = self.op.mnemonic();
        match &self.operand {
            Operand::None => write!(f, "{}", name),
            Operand::Byte(b) => write!(f, "{:<16} {:>4}", name, b),
            Operand::Constant { index, text } => write!(f, "{:<16} {:>4} '{}'", name, index, text),
            Operand::Jump { distance, target } => write!(f, "{:<16} {:>4} -> {}", name, distance, target),
        }
    }
}

/// Decodes the instruction starting at `offset`.
///
/// This is the only place that knows how long an instruction is: the shape of the opcode
/// decides how many operand bytes are read, and nothing is read past the end of the chunk.
pub fn decode<V: Display>(chunk: &Chunk<V>, offset: usize) -> Result<Instruction, DecodeError> {
    let mut ip = IP::at(chunk, offset);
    let op = ip.next_op()?;
    let operand = match op.shape() {
        Shape::Simple => Operand::None,
        Shape::Byte => Operand::Byte(ip.read_byte()?),
        Shape::Constant => constant_operand(chunk, offset, ip.read_byte()? as usize)?,
        Shape::ConstantLong => constant_operand(chunk, offset, ip.read_u24()? as usize)?,
        Shape::JumpForward => {
            let distance = ip.read_u16()?;
            ip.jump(distance);
            Operand::Jump { distance, target: ip.offset() }
        }
        Shape::JumpBackward => {
            let distance = ip.read_u16()?;
            ip.jump_back(distance)?;
            Operand::Jump { distance, target: ip.offset() }
        }
    };

    #[cfg(feature = "trace-decode")]
    log_debug!("Decoded instruction", offset = offset, op = op.mnemonic());

    Ok(Instruction { offset, op, operand })
}

fn constant_operand<V: Display>(chunk: &Chunk<V>, offset: usize, index: usize) -> Result<Operand, DecodeError> {
    let value = chunk.constant(index).ok_or(DecodeError::ConstantIndexOutOfRange {
        offset,
        index,
        pool_size: chunk.constants().len(),
    })?;
    Ok(Operand::Constant { index, text: value.to_string() })
}

/// Decodes one instruction into its text and the offset of the instruction after it.
pub fn decode_instruction<V: Display>(chunk: &Chunk<V>, offset: usize) -> Result<(String, usize), DecodeError> {
    let instruction = decode(chunk, offset)?;
    Ok((instruction.to_string(), instruction.next_offset()))
}

/// Linear walk over a chunk. Yields at most one error, then stops: once a length is
/// unknown every following offset would be wrong.
pub struct Instructions<'a, V> {
    chunk: &'a Chunk<V>,
    offset: usize,
    failed: bool,
}

pub fn instructions<V: Display>(chunk: &Chunk<V>) -> Instructions<'_, V> {
    Instructions { chunk, offset: 0, failed: false }
}

impl<V: Display> Iterator for Instructions<'_, V> {
    type Item = Result<Instruction, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.offset >= self.chunk.len() {
            return None;
        }
        match decode(self.chunk, self.offset) {
            Ok(instruction) => {
                self.offset = instruction.next_offset();
                Some(Ok(instruction))
            }
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

/// Writes the `== name ==` header then one line per instruction.
///
/// Returns the number of instructions written. Lines written before a decode failure
/// stay in `out`.
pub fn write_disassembly<V: Display, W: Write>(
    chunk: &Chunk<V>,
    name: &str,
    out: &mut W,
) -> Result<usize, DisassembleError> {
    writeln!(out, "== {} ==", name)?;
    let mut previous_line = None;
    let mut written = 0;
    for instruction in instructions(chunk) {
        let instruction = instruction.inspect_err(|e| {
            log_debug!("Disassembly aborted", chunk = name, offset = e.offset(), error = e.to_string().as_str());
        })?;
        let line = chunk.line_at(instruction.offset);
        writeln!(out, "{}", format_line(&instruction, line, previous_line))?;
        previous_line = line;
        written += 1;
    }
    Ok(written)
}

/// Disassembles a whole chunk into lines, header first.
pub fn disassemble_chunk<V: Display>(chunk: &Chunk<V>, name: &str) -> Result<Vec<String>, DecodeError> {
    let mut lines = vec![format!("== {} ==", name)];
    let mut previous_line = None;
    for instruction in instructions(chunk) {
        let instruction = instruction?;
        let line = chunk.line_at(instruction.offset);
        lines.push(format_line(&instruction, line, previous_line));
        previous_line = line;
    }
    Ok(lines)
}

fn format_line(instruction: &Instruction, line: Option<u32>, previous_line: Option<u32>) -> String {
    match line {
        Some(line) if previous_line != Some(line) => {
            format!("{:04} {:>4} {}", instruction.offset, line, instruction)
        }
        _ => format!("{:04}    | {}", instruction.offset, instruction),
    }
}

impl<V: Display> Chunk<V> {
    pub fn disassemble(&self, name: &str) -> Result<String, DecodeError> {
        Ok(disassemble_chunk(self, name)?.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::chunk::IndexWidth;
    use crate::vm::value::Value;

    fn sample() -> Chunk {
        let mut chunk = Chunk::new();
        chunk.write_op(Op::Nil, 1).unwrap();
        chunk.write_constant(Value::from(1.5), 1).unwrap();
        chunk.write_op(Op::Return, 2).unwrap();
        chunk
    }

    #[test]
    fn test_three_instruction_listing() {
        let chunk = sample();
        let lines = disassemble_chunk(&chunk, "test").unwrap();
        assert_eq!(
            lines,
            vec![
                "== test ==".to_string(),
                "0000    1 OP_NIL".to_string(),
                "0001    | OP_CONSTANT         0 '1.5'".to_string(),
                "0003    2 OP_RETURN".to_string(),
            ]
        );
        assert_eq!(decode(&chunk, 3).unwrap().next_offset(), chunk.len());
    }

    #[test]
    fn test_decode_instruction_returns_next_offset() {
        let chunk = sample();
        assert_eq!(decode_instruction(&chunk, 0), Ok(("OP_NIL".to_string(), 1)));
        assert_eq!(decode_instruction(&chunk, 1), Ok(("OP_CONSTANT         0 '1.5'".to_string(), 3)));
        assert_eq!(decode_instruction(&chunk, 3), Ok(("OP_RETURN".to_string(), 4)));
    }

    #[test]
    fn test_walk_visits_every_instruction_once() {
        let mut chunk: Chunk = Chunk::with_index_width(IndexWidth::Wide);
        let mut starts = vec![];
        for i in 0..300i64 {
            starts.push(chunk.len());
            chunk.write_constant(Value::from(i), (i / 10 + 1) as u32).unwrap();
            starts.push(chunk.len());
            chunk.write_op_byte(Op::SetLocal, (i % 256) as u8, (i / 10 + 1) as u32).unwrap();
            starts.push(chunk.len());
            chunk.write_jump(Op::JumpIfFalse, 1, (i / 10 + 1) as u32).unwrap();
            starts.push(chunk.len());
            chunk.write_op(Op::Pop, (i / 10 + 1) as u32).unwrap();
        }

        let mut offset = 0;
        let mut visited = vec![];
        while offset < chunk.len() {
            visited.push(offset);
            offset = decode_instruction(&chunk, offset).unwrap().1;
        }
        assert_eq!(offset, chunk.len());
        assert_eq!(visited, starts);
        assert_eq!(instructions(&chunk).count(), starts.len());
    }

    #[test]
    fn test_constant_round_trip() {
        let mut chunk: Chunk = Chunk::new();
        chunk.write_constant(Value::from("hello world"), 1).unwrap();
        let instruction = decode(&chunk, 0).unwrap();
        assert_eq!(instruction.operand, Operand::Constant { index: 0, text: "hello world".to_string() });
    }

    #[test]
    fn test_long_constant_listing() {
        let mut chunk: Chunk = Chunk::with_index_width(IndexWidth::Wide);
        for i in 0..256i64 {
            chunk.append_constant(Value::from(i)).unwrap();
        }
        chunk.write_constant(Value::from(true), 7).unwrap();
        assert_eq!(decode_instruction(&chunk, 0), Ok(("OP_CONSTANT_LONG  256 'true'".to_string(), 4)));
    }

    #[test]
    fn test_jump_targets() {
        let mut chunk: Chunk = Chunk::new();
        chunk.write_jump(Op::JumpIfFalse, 4, 1).unwrap();
        chunk.write_op(Op::Pop, 1).unwrap();
        chunk.write_loop(0, 2).unwrap();

        assert_eq!(
            decode(&chunk, 0).unwrap().operand,
            Operand::Jump { distance: 4, target: 7 }
        );
        assert_eq!(
            decode(&chunk, 4).unwrap().operand,
            Operand::Jump { distance: 7, target: 0 }
        );
        assert_eq!(decode_instruction(&chunk, 4).unwrap().0, "OP_LOOP             7 -> 0");
    }

    #[test]
    fn test_byte_operand_text() {
        let mut chunk: Chunk = Chunk::new();
        chunk.write_op_byte(Op::Call, 3, 1).unwrap();
        assert_eq!(decode_instruction(&chunk, 0).unwrap().0, "OP_CALL             3");
    }

    #[test]
    fn test_truncated_at_last_byte() {
        let mut chunk: Chunk = Chunk::new();
        chunk.write_op(Op::Nil, 1).unwrap();
        chunk.append_byte(Op::Jump.bytecode(), 1);
        assert_eq!(
            decode(&chunk, chunk.len() - 1),
            Err(DecodeError::TruncatedInstruction { offset: 1, needed: 3, available: 1 })
        );
    }

    #[test]
    fn test_constant_index_one_past_the_pool() {
        let mut chunk: Chunk = Chunk::new();
        chunk.append_constant(Value::from(1.0)).unwrap();
        chunk.append_byte(Op::Constant.bytecode(), 1);
        chunk.append_byte(1, 1);
        assert_eq!(
            decode(&chunk, 0),
            Err(DecodeError::ConstantIndexOutOfRange { offset: 0, index: 1, pool_size: 1 })
        );
    }

    #[test]
    fn test_loop_before_start_of_chunk() {
        let mut chunk: Chunk = Chunk::new();
        chunk.write_jump(Op::Loop, 9, 1).unwrap();
        assert_eq!(decode(&chunk, 0), Err(DecodeError::JumpOutOfRange { offset: 0, distance: 9 }));
    }

    #[test]
    fn test_unknown_opcode_aborts_walk() {
        let mut chunk: Chunk = Chunk::new();
        chunk.write_op(Op::Nil, 1).unwrap();
        chunk.append_byte(0xfe, 1);
        chunk.write_op(Op::Return, 1).unwrap();

        let walked: Vec<_> = instructions(&chunk).collect();
        assert_eq!(walked.len(), 2);
        assert_eq!(walked[1], Err(DecodeError::UnknownOpcode { offset: 1, byte: 0xfe }));
        assert_eq!(
            disassemble_chunk(&chunk, "bad"),
            Err(DecodeError::UnknownOpcode { offset: 1, byte: 0xfe })
        );
    }

    #[test]
    fn test_write_disassembly_keeps_lines_before_failure() {
        let mut chunk: Chunk = Chunk::new();
        chunk.write_op(Op::True, 1).unwrap();
        chunk.write_op(Op::Print, 2).unwrap();
        chunk.append_byte(0xfe, 3);

        let mut out = Vec::new();
        let res = write_disassembly(&chunk, "partial", &mut out);
        assert!(matches!(res, Err(DisassembleError::Decode(DecodeError::UnknownOpcode { offset: 2, .. }))));
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "== partial ==\n0000    1 OP_TRUE\n0001    2 OP_PRINT\n");
    }

    #[test]
    fn test_write_disassembly_counts_instructions() {
        let chunk = sample();
        let mut out = Vec::new();
        assert_eq!(write_disassembly(&chunk, "test", &mut out).unwrap(), 3);
        assert_eq!(String::from_utf8(out).unwrap(), chunk.disassemble("test").unwrap() + "\n");
    }

    #[test]
    fn test_parallel_passes_agree() {
        let mut chunk: Chunk = Chunk::new();
        for i in 0..50i64 {
            chunk.write_constant(Value::from(i), i as u32 + 1).unwrap();
            chunk.write_op(Op::Print, i as u32 + 1).unwrap();
        }
        let expected = disassemble_chunk(&chunk, "shared").unwrap();
        std::thread::scope(|s| {
            let handles: Vec<_> = (0..4).map(|_| s.spawn(|| disassemble_chunk(&chunk, "shared").unwrap())).collect();
            for handle in handles {
                assert_eq!(handle.join().unwrap(), expected);
            }
        });
    }

    #[test]
    fn test_empty_chunk_prints_only_header() {
        let chunk: Chunk = Chunk::new();
        assert_eq!(disassemble_chunk(&chunk, "empty").unwrap(), vec!["== empty ==".to_string()]);
    }
}
