use super::alu::{self, AluOp};
use super::decode::{Decoded, InstrClass};
use super::fault::Fault;
use crate::mem::{ReadRequest, WriteRequest};

/// Memory request an instruction needs before it can commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemOp {
    Read(ReadRequest),
    Write(WriteRequest),
}

/// Combinational result of executing one decoded instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Execution {
    /// Address of the following instruction once this one completes.
    pub target: u32,
    /// Value for `rd`, when the instruction produces one without memory.
    pub writeback: Option<u32>,
    pub mem: Option<MemOp>,
}

/// ALU control code for OP and OP-IMM from funct3/funct7.
pub fn alu_op_for(d: &Decoded) -> AluOp {
    let alt = d.funct7 & 0x20 != 0;
    match d.funct3 {
        0x0 if alt && d.class == InstrClass::Op => AluOp::Sub,
        0x0 => AluOp::Add,
        0x1 => AluOp::Sll,
        0x2 => AluOp::Lt,
        0x3 => AluOp::Ltu,
        0x4 => AluOp::Xor,
        0x5 if alt => AluOp::Sra,
        0x5 => AluOp::Srl,
        0x6 => AluOp::Or,
        _ => AluOp::And,
    }
}

/// ALU comparison for a branch funct3. The decoder rejects 2 and 3.
pub fn branch_op(funct3: u8) -> AluOp {
    match funct3 {
        0x0 => AluOp::Eq,
        0x1 => AluOp::Ne,
        0x4 => AluOp::Lt,
        0x5 => AluOp::Ge,
        0x6 => AluOp::Ltu,
        _ => AluOp::Geu,
    }
}

fn jump_target(pc: u32, target: u32) -> Result<u32, Fault> {
    if target & 3 != 0 {
        return Err(Fault::MisalignedTarget { pc, target });
    }
    Ok(target)
}

pub fn execute(d: &Decoded, pc: u32, rs1: u32, rs2: u32) -> Result<Execution, Fault> {
    let link = pc.wrapping_add(4);
    let mut ex = Execution {
        target: link,
        writeback: None,
        mem: None,
    };

    match d.class {
        InstrClass::Lui => ex.writeback = Some(d.imm),
        InstrClass::Auipc => ex.writeback = Some(alu::execute(AluOp::Add, pc, d.imm)),
        InstrClass::Op => ex.writeback = Some(alu::execute(alu_op_for(d), rs1, rs2)),
        InstrClass::OpImm => ex.writeback = Some(alu::execute(alu_op_for(d), rs1, d.imm)),
        InstrClass::Branch => {
            if alu::execute(branch_op(d.funct3), rs1, rs2) != 0 {
                ex.target = jump_target(pc, pc.wrapping_add(d.imm))?;
            }
        }
        InstrClass::Jal => {
            ex.target = jump_target(pc, pc.wrapping_add(d.imm))?;
            ex.writeback = Some(link);
        }
        InstrClass::Jalr => {
            ex.target = jump_target(pc, rs1.wrapping_add(d.imm) & !1)?;
            ex.writeback = Some(link);
        }
        InstrClass::Load => {
            if let Some(width) = d.access {
                ex.mem = Some(MemOp::Read(ReadRequest {
                    addr: rs1.wrapping_add(d.imm),
                    width,
                    signed: d.funct3 & 0x4 == 0,
                }));
            }
        }
        InstrClass::Store => {
            if let Some(width) = d.access {
                ex.mem = Some(MemOp::Write(WriteRequest {
                    addr: rs1.wrapping_add(d.imm),
                    width,
                    data: rs2,
                }));
            }
        }
        InstrClass::Fence => {}
    }

    if !d.writes_rd() {
        ex.writeback = None;
    }
    Ok(ex)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::decode::decode;
    use crate::mem::AccessWidth;

    const PC: u32 = 0x1_0000;

    fn run(inst: u32, rs1: u32, rs2: u32) -> Result<Execution, Fault> {
        execute(&decode(inst).unwrap(), PC, rs1, rs2)
    }

    #[test]
    fn alu_codes_from_funct_fields() {
        // sub x1, x2, x3
        assert_eq!(alu_op_for(&decode(0x4031_00b3).unwrap()), AluOp::Sub);
        // addi x1, x2, -1024 has bit 30 set in the immediate, still an add
        assert_eq!(alu_op_for(&decode(0xc001_0093).unwrap()), AluOp::Add);
        // srai x1, x2, 4
        assert_eq!(alu_op_for(&decode(0x4041_5093).unwrap()), AluOp::Sra);
        // sltiu x1, x2, 1
        assert_eq!(alu_op_for(&decode(0x0011_3093).unwrap()), AluOp::Ltu);
    }

    #[test]
    fn upper_immediates() {
        // lui x1, 0xabcde
        assert_eq!(run(0xabcd_e0b7, 0, 0).unwrap().writeback, Some(0xabcd_e000));
        // auipc x1, 0xabcde
        let ex = run(0xabcd_e097, 0, 0).unwrap();
        assert_eq!(ex.writeback, Some(0xabce_e000));
        assert_eq!(ex.target, PC + 4);
    }

    #[test]
    fn srai_masks_shift_amount() {
        // srai x1, x2, 4
        let ex = run(0x4041_5093, 0xaaaa_aaaa, 0).unwrap();
        assert_eq!(ex.writeback, Some(0xfaaa_aaaa));
    }

    #[test]
    fn branches_pick_target() {
        // beq x1, x2, 0x10
        assert_eq!(run(0x0020_8863, 0x10, 0x11).unwrap().target, PC + 4);
        assert_eq!(run(0x0020_8863, 0x10, 0x10).unwrap().target, PC + 0x10);
        // bltu x1, x2, 0x10 compares unsigned
        assert_eq!(run(0x0020_e863, 1, 0xffff_ffff).unwrap().target, PC + 0x10);
        // blt x1, x2, 0x10 compares signed
        assert_eq!(run(0x0020_c863, 1, 0xffff_ffff).unwrap().target, PC + 4);
        assert_eq!(run(0x0020_8863, 0, 0).unwrap().writeback, None);
    }

    #[test]
    fn jumps_link_and_target() {
        // jal x1, 0x10
        let ex = run(0x0100_00ef, 0, 0).unwrap();
        assert_eq!((ex.target, ex.writeback), (PC + 0x10, Some(PC + 4)));
        // jalr x1, 3(x2) clears bit 0 of the sum
        let ex = run(0x0031_00e7, 0x2_0001, 0).unwrap();
        assert_eq!((ex.target, ex.writeback), (0x2_0004, Some(PC + 4)));
        // jal x0, 0x10 discards the link
        assert_eq!(run(0x0100_006f, 0, 0).unwrap().writeback, None);
    }

    #[test]
    fn misaligned_target_is_a_fault() {
        // jalr x0, 2(x1)
        assert_eq!(
            run(0x0020_8067, 0x2_0000, 0),
            Err(Fault::MisalignedTarget {
                pc: PC,
                target: 0x2_0002
            })
        );
        // a branch that is not taken never checks its target
        // bne x0, x0, 2
        assert!(run(0x0000_1163, 0, 0).is_ok());
    }

    #[test]
    fn memory_requests() {
        // lw x1, 4(x2)
        let ex = run(0x0041_2083, 0x2_0000, 0).unwrap();
        assert_eq!(
            ex.mem,
            Some(MemOp::Read(ReadRequest {
                addr: 0x2_0004,
                width: AccessWidth::Word,
                signed: true
            }))
        );
        assert_eq!(ex.writeback, None);
        // lbu x1, -1(x2)
        let ex = run(0xfff1_4083, 0x2_0000, 0).unwrap();
        assert_eq!(
            ex.mem,
            Some(MemOp::Read(ReadRequest {
                addr: 0x1_ffff,
                width: AccessWidth::Byte,
                signed: false
            }))
        );
        // sh x3, 2(x2)
        let ex = run(0x0031_1123, 0x2_0000, 0xdead_beef).unwrap();
        assert_eq!(
            ex.mem,
            Some(MemOp::Write(WriteRequest {
                addr: 0x2_0002,
                width: AccessWidth::Halfword,
                data: 0xdead_beef
            }))
        );
    }
}
