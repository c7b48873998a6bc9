use std::fmt;

use crate::bits::{field, sign_extend};
use crate::mem::AccessWidth;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    Unimplemented { inst: u32 },
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::Unimplemented { inst } => {
                write!(f, "unimplemented instruction: 0x{:08x}", inst)
            }
        }
    }
}

impl std::error::Error for DecodeError {}

pub mod opcodes {
    pub const LUI: u32 = 0b011_0111;
    pub const AUIPC: u32 = 0b001_0111;
    pub const JAL: u32 = 0b110_1111;
    pub const JALR: u32 = 0b110_0111;
    pub const BRANCH: u32 = 0b110_0011;
    pub const LOAD: u32 = 0b000_0011;
    pub const STORE: u32 = 0b010_0011;
    pub const OP_IMM: u32 = 0b001_0011;
    pub const OP: u32 = 0b011_0011;
    pub const MISC_MEM: u32 = 0b000_1111;
}

/// Instruction class, one per RV32I base opcode this core executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstrClass {
    Lui,
    Auipc,
    Jal,
    Jalr,
    Branch,
    Load,
    Store,
    OpImm,
    Op,
    Fence,
}

/// Fields of one decoded instruction word.
///
/// `imm` is already sign-extended to 32 bits for every format. `rd` is 0 for
/// classes that have no destination register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decoded {
    pub raw: u32,
    pub class: InstrClass,
    pub rd: u8,
    pub rs1: u8,
    pub rs2: u8,
    pub funct3: u8,
    pub funct7: u8,
    pub imm: u32,
    pub access: Option<AccessWidth>,
}

impl Decoded {
    pub fn writes_rd(&self) -> bool {
        self.rd != 0
    }
}

/// Raw `rs1`/`rs2` fields of an instruction word, valid or not.
///
/// The register file is addressed with these a cycle before the word is
/// executed, which happens before anyone knows whether it decodes.
pub fn rs_fields(inst: u32) -> (u8, u8) {
    (field(inst, 19, 15) as u8, field(inst, 24, 20) as u8)
}

fn imm_i(inst: u32) -> u32 {
    sign_extend(inst >> 20, 12)
}

fn imm_s(inst: u32) -> u32 {
    let imm11_5 = field(inst, 31, 25);
    let imm4_0 = field(inst, 11, 7);
    sign_extend((imm11_5 << 5) | imm4_0, 12)
}

fn imm_b(inst: u32) -> u32 {
    let imm12 = field(inst, 31, 31);
    let imm11 = field(inst, 7, 7);
    let imm10_5 = field(inst, 30, 25);
    let imm4_1 = field(inst, 11, 8);
    sign_extend(
        (imm12 << 12) | (imm11 << 11) | (imm10_5 << 5) | (imm4_1 << 1),
        13,
    )
}

fn imm_u(inst: u32) -> u32 {
    inst & 0xffff_f000
}

fn imm_j(inst: u32) -> u32 {
    let imm20 = field(inst, 31, 31);
    let imm19_12 = field(inst, 19, 12);
    let imm11 = field(inst, 20, 20);
    let imm10_1 = field(inst, 30, 21);
    sign_extend(
        (imm20 << 20) | (imm19_12 << 12) | (imm11 << 11) | (imm10_1 << 1),
        21,
    )
}

pub fn decode(inst: u32) -> Result<Decoded, DecodeError> {
    let opcode = field(inst, 6, 0);
    let rd = field(inst, 11, 7) as u8;
    let funct3 = field(inst, 14, 12) as u8;
    let (rs1, rs2) = rs_fields(inst);
    let funct7 = field(inst, 31, 25) as u8;

    let unimplemented = DecodeError::Unimplemented { inst };
    let mut d = Decoded {
        raw: inst,
        class: InstrClass::Op,
        rd,
        rs1,
        rs2,
        funct3,
        funct7,
        imm: 0,
        access: None,
    };

    match opcode {
        // r type
        opcodes::OP => match (funct3, funct7) {
            (_, 0x00) | (0x0, 0x20) | (0x5, 0x20) => Ok(d),
            _ => Err(unimplemented),
        },
        // i type arithmetic
        opcodes::OP_IMM => {
            d.class = InstrClass::OpImm;
            d.imm = imm_i(inst);
            match (funct3, funct7) {
                (0x1, 0x00) | (0x5, 0x00) | (0x5, 0x20) => Ok(d),
                (0x1, _) | (0x5, _) => Err(unimplemented),
                _ => Ok(d),
            }
        }
        opcodes::LOAD => {
            d.class = InstrClass::Load;
            d.imm = imm_i(inst);
            d.access = Some(match funct3 {
                0x0 | 0x4 => AccessWidth::Byte,
                0x1 | 0x5 => AccessWidth::Halfword,
                0x2 => AccessWidth::Word,
                _ => return Err(unimplemented),
            });
            Ok(d)
        }
        // s type
        opcodes::STORE => {
            d.class = InstrClass::Store;
            d.rd = 0;
            d.imm = imm_s(inst);
            d.access = Some(match funct3 {
                0x0 => AccessWidth::Byte,
                0x1 => AccessWidth::Halfword,
                0x2 => AccessWidth::Word,
                _ => return Err(unimplemented),
            });
            Ok(d)
        }
        // b type
        opcodes::BRANCH => {
            d.class = InstrClass::Branch;
            d.rd = 0;
            d.imm = imm_b(inst);
            match funct3 {
                0x2 | 0x3 => Err(unimplemented),
                _ => Ok(d),
            }
        }
        // u type
        opcodes::LUI => {
            d.class = InstrClass::Lui;
            d.imm = imm_u(inst);
            Ok(d)
        }
        opcodes::AUIPC => {
            d.class = InstrClass::Auipc;
            d.imm = imm_u(inst);
            Ok(d)
        }
        // j type
        opcodes::JAL => {
            d.class = InstrClass::Jal;
            d.imm = imm_j(inst);
            Ok(d)
        }
        opcodes::JALR if funct3 == 0 => {
            d.class = InstrClass::Jalr;
            d.imm = imm_i(inst);
            Ok(d)
        }
        opcodes::MISC_MEM if funct3 == 0 => {
            d.class = InstrClass::Fence;
            d.rd = 0;
            Ok(d)
        }
        _ => Err(unimplemented),
    }
}
