//! Instruction encoders and core helpers shared by the integration tests.
#![allow(dead_code)]

use rv32_core::cpu::{ControlUnit, RESET_HOLD_TICKS};
use rv32_core::{ControlState, CoreConfig};

const OP: u32 = 0b011_0011;
const OP_IMM: u32 = 0b001_0011;
const LOAD: u32 = 0b000_0011;
const STORE: u32 = 0b010_0011;
const BRANCH: u32 = 0b110_0011;

fn r_type(funct7: u32, rs2: u32, rs1: u32, funct3: u32, rd: u32, opcode: u32) -> u32 {
    (funct7 & 0x7f) << 25
        | (rs2 & 0x1f) << 20
        | (rs1 & 0x1f) << 15
        | (funct3 & 0x7) << 12
        | (rd & 0x1f) << 7
        | opcode
}

fn i_type(imm: i32, rs1: u32, funct3: u32, rd: u32, opcode: u32) -> u32 {
    ((imm as u32) & 0xfff) << 20 | (rs1 & 0x1f) << 15 | (funct3 & 0x7) << 12 | (rd & 0x1f) << 7 | opcode
}

fn s_type(imm: i32, rs2: u32, rs1: u32, funct3: u32) -> u32 {
    let v = imm as u32;
    ((v >> 5) & 0x7f) << 25
        | (rs2 & 0x1f) << 20
        | (rs1 & 0x1f) << 15
        | (funct3 & 0x7) << 12
        | (v & 0x1f) << 7
        | STORE
}

fn b_type(imm: i32, rs2: u32, rs1: u32, funct3: u32) -> u32 {
    let v = imm as u32;
    ((v >> 12) & 1) << 31
        | ((v >> 5) & 0x3f) << 25
        | (rs2 & 0x1f) << 20
        | (rs1 & 0x1f) << 15
        | (funct3 & 0x7) << 12
        | ((v >> 1) & 0xf) << 8
        | ((v >> 11) & 1) << 7
        | BRANCH
}

pub fn lui(rd: u32, imm20: u32) -> u32 {
    (imm20 & 0xf_ffff) << 12 | (rd & 0x1f) << 7 | 0b011_0111
}

pub fn auipc(rd: u32, imm20: u32) -> u32 {
    (imm20 & 0xf_ffff) << 12 | (rd & 0x1f) << 7 | 0b001_0111
}

pub fn jal(rd: u32, imm: i32) -> u32 {
    let v = imm as u32;
    ((v >> 20) & 1) << 31
        | ((v >> 1) & 0x3ff) << 21
        | ((v >> 11) & 1) << 20
        | ((v >> 12) & 0xff) << 12
        | (rd & 0x1f) << 7
        | 0b110_1111
}

pub fn jalr(rd: u32, rs1: u32, imm: i32) -> u32 {
    i_type(imm, rs1, 0, rd, 0b110_0111)
}

pub fn addi(rd: u32, rs1: u32, imm: i32) -> u32 {
    i_type(imm, rs1, 0, rd, OP_IMM)
}

pub fn slti(rd: u32, rs1: u32, imm: i32) -> u32 {
    i_type(imm, rs1, 2, rd, OP_IMM)
}

pub fn srai(rd: u32, rs1: u32, shamt: u32) -> u32 {
    i_type((0x400 | (shamt & 0x1f)) as i32, rs1, 5, rd, OP_IMM)
}

pub fn add(rd: u32, rs1: u32, rs2: u32) -> u32 {
    r_type(0, rs2, rs1, 0, rd, OP)
}

pub fn sub(rd: u32, rs1: u32, rs2: u32) -> u32 {
    r_type(0x20, rs2, rs1, 0, rd, OP)
}

pub fn sltu(rd: u32, rs1: u32, rs2: u32) -> u32 {
    r_type(0, rs2, rs1, 3, rd, OP)
}

pub fn lb(rd: u32, rs1: u32, imm: i32) -> u32 {
    i_type(imm, rs1, 0, rd, LOAD)
}

pub fn lh(rd: u32, rs1: u32, imm: i32) -> u32 {
    i_type(imm, rs1, 1, rd, LOAD)
}

pub fn lw(rd: u32, rs1: u32, imm: i32) -> u32 {
    i_type(imm, rs1, 2, rd, LOAD)
}

pub fn lbu(rd: u32, rs1: u32, imm: i32) -> u32 {
    i_type(imm, rs1, 4, rd, LOAD)
}

pub fn lhu(rd: u32, rs1: u32, imm: i32) -> u32 {
    i_type(imm, rs1, 5, rd, LOAD)
}

pub fn sb(rs2: u32, rs1: u32, imm: i32) -> u32 {
    s_type(imm, rs2, rs1, 0)
}

pub fn sh(rs2: u32, rs1: u32, imm: i32) -> u32 {
    s_type(imm, rs2, rs1, 1)
}

pub fn sw(rs2: u32, rs1: u32, imm: i32) -> u32 {
    s_type(imm, rs2, rs1, 2)
}

pub fn beq(rs1: u32, rs2: u32, imm: i32) -> u32 {
    b_type(imm, rs2, rs1, 0)
}

pub fn bne(rs1: u32, rs2: u32, imm: i32) -> u32 {
    b_type(imm, rs2, rs1, 1)
}

pub fn blt(rs1: u32, rs2: u32, imm: i32) -> u32 {
    b_type(imm, rs2, rs1, 4)
}

pub fn bgeu(rs1: u32, rs2: u32, imm: i32) -> u32 {
    b_type(imm, rs2, rs1, 7)
}

pub fn nop() -> u32 {
    addi(0, 0, 0)
}

pub fn image(program: &[u32]) -> Vec<u8> {
    program.iter().flat_map(|w| w.to_le_bytes()).collect()
}

/// A reset core with `program` at the reset vector.
pub fn core_with(program: &[u32]) -> ControlUnit {
    let mut core = ControlUnit::new(CoreConfig::default()).expect("default config");
    core.load_instruction_image(&image(program), 0)
        .expect("program fits");
    core
}

/// Ticks through the RESET cycles that follow `reset()`.
pub fn leave_reset_hold(core: &mut ControlUnit) {
    for _ in 0..RESET_HOLD_TICKS {
        assert_eq!(core.tick().unwrap().state, ControlState::Reset);
    }
}

/// Ticks through reset and into the first EXEC cycle.
pub fn enter_exec(core: &mut ControlUnit) {
    leave_reset_hold(core);
    assert_eq!(core.tick().unwrap().state, ControlState::Exec);
}

/// Ticks until `n` more instructions have retired.
pub fn retire(core: &mut ControlUnit, n: u64) {
    let target = core.inspect().retired() + n;
    let mut budget = 64 * n + 16;
    while core.inspect().retired() < target {
        core.tick().expect("no fault");
        budget -= 1;
        assert!(budget > 0, "core stalled");
    }
}

/// Prints the NUL-terminated string at the start of the data store through
/// the console at 0x30000, polling the transmit status before each byte,
/// then spins at `PUTS_DONE`.
pub fn puts_program() -> Vec<u32> {
    vec![
        lui(10, 0x30),     // console
        lui(13, 0x20),     // string
        lbu(11, 13, 0),    // next: c = *s
        beq(11, 0, 24),    // c == 0 -> done
        lbu(12, 10, 1),    // poll: tx ready?
        beq(12, 0, -4),
        sb(11, 10, 1),
        addi(13, 13, 1),
        jal(0, -24),       // -> next
        jal(0, 0),         // done
    ]
}

pub const PUTS_DONE: u32 = 0x1_0024;

/// Ticks until the PC reaches `pc`.
pub fn run_to(core: &mut ControlUnit, pc: u32, mut budget: u32) {
    while core.inspect().pc() != pc {
        core.tick().expect("no fault");
        budget -= 1;
        assert!(budget > 0, "pc 0x{pc:08x} not reached");
    }
}
