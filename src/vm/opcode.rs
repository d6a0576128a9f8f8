use std::fmt::Display;

/// How many bytes follow an opcode and what they mean.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// Opcode only.
    Simple,
    /// One raw byte: a local slot or an argument count.
    Byte,
    /// One byte indexing the constant pool.
    Constant,
    /// Three byte (big endian) constant pool index.
    ConstantLong,
    /// Two byte (big endian) distance added to the offset after the instruction.
    JumpForward,
    /// Two byte (big endian) distance subtracted from the offset after the instruction.
    JumpBackward,
}

impl Shape {
    /// Total encoded length of an instruction with this shape, opcode included.
    pub fn len(&self) -> usize {
        match self {
            Shape::Simple => 1,
            Shape::Byte | Shape::Constant => 2,
            Shape::JumpForward | Shape::JumpBackward => 3,
            Shape::ConstantLong => 4,
        }
    }

    pub fn is_jump(&self) -> bool {
        matches!(self, Shape::JumpForward | Shape::JumpBackward)
    }

    pub fn references_constant(&self) -> bool {
        matches!(self, Shape::Constant | Shape::ConstantLong)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Op {
    // Literals
    Constant = 0x00,
    ConstantLong = 0x01,
    Nil = 0x02,
    True = 0x03,
    False = 0x04,

    // Stack and variables
    Pop = 0x05,
    GetLocal = 0x06,
    SetLocal = 0x07,
    DefineGlobal = 0x08,
    GetGlobal = 0x09,
    SetGlobal = 0x0A,

    // Comparison
    Equal = 0x0B,
    Greater = 0x0C,
    Less = 0x0D,

    // Arithmetic
    Add = 0x0E,
    Subtract = 0x0F,
    Multiply = 0x10,
    Divide = 0x11,

    // Boolean
    Not = 0x12,
    Negate = 0x13,

    // IO
    Print = 0x14,

    // Control
    Jump = 0x15,
    JumpIfFalse = 0x16,
    Loop = 0x17,
    Call = 0x18,
    Return = 0x19,
}

impl Op {
    pub const ALL: [Op; 26] = [
        Op::Constant, Op::ConstantLong, Op::Nil, Op::True, Op::False,
        Op::Pop, Op::GetLocal, Op::SetLocal, Op::DefineGlobal, Op::GetGlobal, Op::SetGlobal,
        Op::Equal, Op::Greater, Op::Less,
        Op::Add, Op::Subtract, Op::Multiply, Op::Divide,
        Op::Not, Op::Negate,
        Op::Print,
        Op::Jump, Op::JumpIfFalse, Op::Loop, Op::Call, Op::Return,
    ];

    pub fn bytecode(&self) -> u8 {
        *self as u8
    }

    /// The one operand shape this opcode is encoded with.
    pub fn shape(&self) -> Shape {
        match self {
            Op::Constant | Op::DefineGlobal | Op::GetGlobal | Op::SetGlobal => Shape::Constant,
            Op::ConstantLong => Shape::ConstantLong,
            Op::GetLocal | Op::SetLocal | Op::Call => Shape::Byte,
            Op::Jump | Op::JumpIfFalse => Shape::JumpForward,
            Op::Loop => Shape::JumpBackward,
            Op::Nil | Op::True | Op::False | Op::Pop
            | Op::Equal | Op::Greater | Op::Less
            | Op::Add | Op::Subtract | Op::Multiply | Op::Divide
            | Op::Not | Op::Negate | Op::Print | Op::Return => Shape::Simple,
        }
    }

    pub fn mnemonic(&self) -> &'static str {
        match self {
            Op::Constant => "OP_CONSTANT",
            Op::ConstantLong => "OP_CONSTANT_LONG",
            Op::Nil => "OP_NIL",
            Op::True => "OP_TRUE",
            Op::False => "OP_FALSE",
            Op::Pop => "OP_POP",
            Op::GetLocal => "OP_GET_LOCAL",
            Op::SetLocal => "OP_SET_LOCAL",
            Op::DefineGlobal => "OP_DEFINE_GLOBAL",
            Op::GetGlobal => "OP_GET_GLOBAL",
            Op::SetGlobal => "OP_SET_GLOBAL",
            Op::Equal => "OP_EQUAL",
            Op::Greater => "OP_GREATER",
            Op::Less => "OP_LESS",
            Op::Add => "OP_ADD",
            Op::Subtract => "OP_SUBTRACT",
            Op::Multiply => "OP_MULTIPLY",
            Op::Divide => "OP_DIVIDE",
            Op::Not => "OP_NOT",
            Op::Negate => "OP_NEGATE",
            Op::Print => "OP_PRINT",
            Op::Jump => "OP_JUMP",
            Op::JumpIfFalse => "OP_JUMP_IF_FALSE",
            Op::Loop => "OP_LOOP",
            Op::Call => "OP_CALL",
            Op::Return => "OP_RETURN",
        }
    }

    /// Looks up an opcode by mnemonic, with or without the `OP_` prefix, ignoring case.
    pub fn from_mnemonic(name: &str) -> Option<Op> {
        let upper = name.to_ascii_uppercase();
        let bare = upper.strip_prefix("OP_").unwrap_or(&upper);
        Op::ALL.iter().copied().find(|op| &op.mnemonic()[3..] == bare)
    }
}

impl TryFrom<u8> for Op {
    type Error = u8;

    /// Used for disassembling, maps a raw byte back onto its opcode
    fn try_from(byte: u8) -> Result<Op, u8> {
        let op = match byte {
            0x00 => Op::Constant,
            0x01 => Op::ConstantLong,
            0x02 => Op::Nil,
            0x03 => Op::True,
            0x04 => Op::False,
            0x05 => Op::Pop,
            0x06 => Op::GetLocal,
            0x07 => Op::SetLocal,
            0x08 => Op::DefineGlobal,
            0x09 => Op::GetGlobal,
            0x0A => Op::SetGlobal,
            0x0B => Op::Equal,
            0x0C => Op::Greater,
            0x0D => Op::Less,
            0x0E => Op::Add,
            0x0F => Op::Subtract,
            0x10 => Op::Multiply,
            0x11 => Op::Divide,
            0x12 => Op::Not,
            0x13 => Op::Negate,
            0x14 => Op::Print,
            0x15 => Op::Jump,
            0x16 => Op::JumpIfFalse,
            0x17 => Op::Loop,
            0x18 => Op::Call,
            0x19 => Op::Return,
            _ => return Err(byte),
        };
        Ok(op)
    }
}

impl From<Op> for u8 {
    fn from(op: Op) -> u8 {
        op.bytecode()
    }
}

impl Display for Op {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.mnemonic())
    }
}
