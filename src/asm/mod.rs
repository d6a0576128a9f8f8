pub mod assembler;

pub use crate::asm::assembler::{assemble, Assembler};
