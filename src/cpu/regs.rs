use tracing::trace;

pub const NUM_REGS: usize = 32;

/// Write port inputs sampled on the clock edge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WritePort {
    pub rd: u8,
    pub data: u32,
    pub enable: bool,
}

impl WritePort {
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn write(rd: u8, data: u32) -> Self {
        Self {
            rd,
            data,
            enable: true,
        }
    }
}

/// General-purpose register file with registered read ports.
///
/// `read_ports` returns what was latched on the previous edge for the
/// indices presented then; a write landing on that same edge is included.
#[derive(Debug, Clone, Default)]
pub struct RegisterFile {
    regs: [u32; NUM_REGS],
    rs1_data: u32,
    rs2_data: u32,
}

impl RegisterFile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn read_ports(&self) -> (u32, u32) {
        (self.rs1_data, self.rs2_data)
    }

    /// One clock edge: apply the write and latch both read ports.
    pub fn tick(&mut self, rs1_idx: u8, rs2_idx: u8, write: WritePort) {
        let rs1_idx = rs1_idx as usize & (NUM_REGS - 1);
        let rs2_idx = rs2_idx as usize & (NUM_REGS - 1);
        let rd = write.rd as usize & (NUM_REGS - 1);

        if write.enable && rd != 0 {
            trace!(rd, data = %format_args!("0x{:08x}", write.data), "register write");
            self.regs[rd] = write.data;
        }
        self.present(rs1_idx as u8, rs2_idx as u8);
    }

    /// Re-reads both ports for new indices outside a clock edge.
    pub fn present(&mut self, rs1_idx: u8, rs2_idx: u8) {
        self.rs1_data = self.get(rs1_idx);
        self.rs2_data = self.get(rs2_idx);
    }

    pub fn get(&self, idx: u8) -> u32 {
        self.regs[idx as usize & (NUM_REGS - 1)]
    }

    /// Direct poke of a register's contents, bypassing the write port.
    /// Does not touch the read latches. Writes to x0 are dropped.
    pub fn set(&mut self, idx: u8, value: u32) {
        let idx = idx as usize & (NUM_REGS - 1);
        if idx != 0 {
            self.regs[idx] = value;
        }
    }

    pub fn snapshot(&self) -> [u32; NUM_REGS] {
        self.regs
    }
}
