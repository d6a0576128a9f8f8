pub mod asm;
pub mod logging;
pub mod shell;
pub mod vm;

pub use vm::chunk::{Chunk, IndexWidth};
pub use vm::disassembler::{decode_instruction, disassemble_chunk, write_disassembly};
pub use vm::opcode::Op;
pub use vm::value::Value;
