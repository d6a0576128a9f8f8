pub mod chunk;
pub mod disassembler;
pub mod errors;
pub mod instruction_pointer;
pub mod lines;
pub mod opcode;
pub mod value;
