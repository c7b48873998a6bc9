//! Combinational arithmetic/logic unit.
//!
//! Fourteen operations over two 32-bit operands. Arithmetic wraps modulo
//! 2^32, shifts use the low five bits of `b`, and comparisons produce 0 or 1.

use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("invalid ALU control code: {0}")]
pub struct InvalidAluOp(pub u8);

/// ALU control codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum AluOp {
    Add = 0,
    Sub = 1,
    And = 2,
    Or = 3,
    Xor = 4,
    Sll = 5,
    Srl = 6,
    Sra = 7,
    Eq = 8,
    Ne = 9,
    Lt = 10,
    Ge = 11,
    Ltu = 12,
    Geu = 13,
}

impl AluOp {
    pub const ALL: [AluOp; 14] = [
        AluOp::Add,
        AluOp::Sub,
        AluOp::And,
        AluOp::Or,
        AluOp::Xor,
        AluOp::Sll,
        AluOp::Srl,
        AluOp::Sra,
        AluOp::Eq,
        AluOp::Ne,
        AluOp::Lt,
        AluOp::Ge,
        AluOp::Ltu,
        AluOp::Geu,
    ];

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn is_comparison(self) -> bool {
        self.code() >= AluOp::Eq.code()
    }
}

impl TryFrom<u8> for AluOp {
    type Error = InvalidAluOp;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        AluOp::ALL
            .get(code as usize)
            .copied()
            .ok_or(InvalidAluOp(code))
    }
}

const SHAMT_MASK: u32 = 0x1f;

pub fn execute(op: AluOp, a: u32, b: u32) -> u32 {
    let shamt = b & SHAMT_MASK;
    match op {
        AluOp::Add => a.wrapping_add(b),
        AluOp::Sub => a.wrapping_sub(b),
        AluOp::And => a & b,
        AluOp::Or => a | b,
        AluOp::Xor => a ^ b,
        AluOp::Sll => a << shamt,
        AluOp::Srl => a >> shamt,
        AluOp::Sra => ((a as i32) >> shamt) as u32,
        AluOp::Eq => (a == b) as u32,
        AluOp::Ne => (a != b) as u32,
        AluOp::Lt => ((a as i32) < (b as i32)) as u32,
        AluOp::Ge => ((a as i32) >= (b as i32)) as u32,
        AluOp::Ltu => (a < b) as u32,
        AluOp::Geu => (a >= b) as u32,
    }
}
