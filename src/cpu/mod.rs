pub mod alu;
pub mod decode;
pub mod exec;
pub mod fault;
pub mod regs;

pub use fault::{Fault, Stage};

use tracing::debug;

use self::decode::{Decoded, decode, rs_fields};
use self::exec::MemOp;
use self::fault::{InStage, WithPc};
use self::regs::{NUM_REGS, RegisterFile, WritePort};
use crate::config::{ConfigError, CoreConfig};
use crate::mem::{
    BackingStore, Console, MemError, MemState, MemoryController, ReadRequest, WriteRequest,
};

/// Ticks spent in RESET after `reset()` before the first EXEC cycle.
pub const RESET_HOLD_TICKS: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlState {
    Reset,
    Exec,
}

/// Signals observable at the end of a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickOutputs {
    pub pc: u32,
    pub pc_next: u32,
    pub state: ControlState,
}

/// A load or store that has been issued to the memory controller and is
/// waiting for it. Holds the decoded instruction until the access resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PendingOp {
    Load(Decoded),
    Store(Decoded),
}

impl PendingOp {
    fn instr(&self) -> &Decoded {
        match self {
            PendingOp::Load(d) | PendingOp::Store(d) => d,
        }
    }
}

/// Every value one tick commits, computed from the state at the start of
/// the tick.
#[derive(Debug, Clone, Copy)]
struct Plan {
    state: ControlState,
    reset_hold: u8,
    pc_next: u32,
    advance: bool,
    reg_write: WritePort,
    rs_next: (u8, u8),
    mem_read: Option<ReadRequest>,
    mem_write: Option<WriteRequest>,
    pending: Option<PendingOp>,
}

impl Plan {
    fn hold(state: ControlState, pc: u32, rs_next: (u8, u8)) -> Self {
        Self {
            state,
            reset_hold: 0,
            pc_next: pc,
            advance: false,
            reg_write: WritePort::idle(),
            rs_next,
            mem_read: None,
            mem_write: None,
            pending: None,
        }
    }
}

/// The core: control state machine plus the register file, instruction
/// store and data memory controller it drives.
#[derive(Debug, Clone)]
pub struct ControlUnit {
    config: CoreConfig,
    state: ControlState,
    /// RESET ticks still to go before EXEC.
    reset_hold: u8,
    pc: u32,
    pc_next: u32,
    pending: Option<PendingOp>,
    regs: RegisterFile,
    imem: BackingStore,
    dmem: MemoryController,
    cycles: u64,
    retired: u64,
}

impl ControlUnit {
    pub fn new(config: CoreConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut cu = Self {
            config,
            state: ControlState::Reset,
            reset_hold: RESET_HOLD_TICKS,
            pc: config.reset_vector,
            pc_next: config.reset_vector,
            pending: None,
            regs: RegisterFile::new(),
            imem: BackingStore::new(config.imem_base, config.imem_bytes),
            dmem: {
                let store = BackingStore::new(config.dmem_base, config.dmem_bytes);
                match config.console_base {
                    Some(base) => MemoryController::with_console(store, base),
                    None => MemoryController::new(store),
                }
            },
            cycles: 0,
            retired: 0,
        };
        cu.reset();
        Ok(cu)
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    /// Asserts reset. Registers and counters clear; memory contents stay.
    pub fn reset(&mut self) {
        self.state = ControlState::Reset;
        self.reset_hold = RESET_HOLD_TICKS;
        self.pc = self.config.reset_vector;
        self.pc_next = self.config.reset_vector;
        self.pending = None;
        self.regs.reset();
        self.dmem.reset();
        self.cycles = 0;
        self.retired = 0;
    }

    /// Copies `bytes` into the instruction store. In EXEC the read ports
    /// are re-presented for the word now at the PC, so a replaced current
    /// instruction sees its own operands.
    pub fn load_instruction_image(&mut self, bytes: &[u8], offset: u32) -> Result<(), MemError> {
        self.imem.load_image(bytes, offset)?;
        if self.state == ControlState::Exec && self.pending.is_none() {
            let (rs1, rs2) = self.indices_at(self.pc);
            self.regs.present(rs1, rs2);
        }
        self.settle();
        Ok(())
    }

    pub fn load_data_image(&mut self, bytes: &[u8], offset: u32) -> Result<(), MemError> {
        self.dmem.store_mut().load_image(bytes, offset)?;
        self.settle();
        Ok(())
    }

    /// Pokes a register's contents directly, as a test bench would. The
    /// value reaches the read ports on the next tick that presents `idx`.
    pub fn set_register(&mut self, idx: u8, value: u32) {
        self.regs.set(idx, value);
    }

    /// Host side of the console block: queue input, drain output.
    pub fn console_mut(&mut self) -> &mut Console {
        self.dmem.console_mut()
    }

    pub fn inspect(&self) -> CoreView<'_> {
        CoreView { cu: self }
    }

    pub fn outputs(&self) -> TickOutputs {
        TickOutputs {
            pc: self.pc,
            pc_next: self.pc_next,
            state: self.state,
        }
    }

    /// Advances the core by one clock cycle.
    ///
    /// All next-state values are computed from the current state first and
    /// only then committed, so a fault leaves the core untouched.
    pub fn tick(&mut self) -> Result<TickOutputs, Fault> {
        let plan = self.plan()?;
        let pc = self.pc;

        let stage = if plan.mem_write.is_some() {
            Stage::Store
        } else {
            Stage::Load
        };
        let accepted = self
            .dmem
            .tick(plan.mem_read, plan.mem_write)
            .in_stage(stage, pc)?;
        if plan.mem_write.is_some() && !accepted {
            debug!(pc = %format_args!("0x{:08x}", pc), "store not accepted, retrying");
        }

        let (rs1, rs2) = plan.rs_next;
        self.regs.tick(rs1, rs2, plan.reg_write);

        if plan.state != self.state {
            debug!(from = ?self.state, to = ?plan.state, "control state change");
        }
        self.state = plan.state;
        self.reset_hold = plan.reset_hold;
        self.pending = plan.pending;
        if plan.advance {
            debug!(
                pc = %format_args!("0x{:08x}", pc),
                next = %format_args!("0x{:08x}", plan.pc_next),
                "retired"
            );
            self.pc = plan.pc_next;
            self.retired += 1;
        }
        self.cycles += 1;
        self.settle();

        Ok(self.outputs())
    }

    /// Recomputes the combinational `pc_next` for the current cycle.
    fn settle(&mut self) {
        self.pc_next = self.plan().map(|p| p.pc_next).unwrap_or(self.pc);
    }

    /// Register indices of the word at `pc`, presented a cycle early. An
    /// unreadable word presents x0; the fetch itself reports the error.
    fn indices_at(&self, pc: u32) -> (u8, u8) {
        self.imem.read_word(pc).map(rs_fields).unwrap_or((0, 0))
    }

    fn plan(&self) -> Result<Plan, Fault> {
        match self.state {
            ControlState::Reset => {
                let next = if self.reset_hold > 0 {
                    ControlState::Reset
                } else {
                    ControlState::Exec
                };
                let mut plan = Plan::hold(next, self.pc, self.indices_at(self.pc));
                plan.reset_hold = self.reset_hold.saturating_sub(1);
                Ok(plan)
            }
            ControlState::Exec => self.plan_exec(),
        }
    }

    fn plan_exec(&self) -> Result<Plan, Fault> {
        let pc = self.pc;
        let instr = match &self.pending {
            Some(op) => *op.instr(),
            None => {
                let word = self.imem.read_word(pc).in_stage(Stage::Fetch, pc)?;
                decode(word).with_pc(pc)?
            }
        };
        let (rs1, rs2) = self.regs.read_ports();
        let ex = exec::execute(&instr, pc, rs1, rs2)?;

        let mut plan = Plan::hold(ControlState::Exec, pc, (instr.rs1, instr.rs2));
        let complete = |plan: &mut Plan, writeback: Option<u32>| {
            plan.pc_next = ex.target;
            plan.advance = true;
            plan.rs_next = self.indices_at(ex.target);
            if let Some(value) = writeback.filter(|_| instr.writes_rd()) {
                plan.reg_write = WritePort::write(instr.rd, value);
            }
        };

        match (ex.mem, self.pending) {
            (None, _) => complete(&mut plan, ex.writeback),
            (Some(MemOp::Read(req)), None) => {
                if self.dmem.ready() {
                    self.dmem
                        .validate(Some(&req), None)
                        .in_stage(Stage::Load, pc)?;
                    plan.mem_read = Some(req);
                    plan.pending = Some(PendingOp::Load(instr));
                }
            }
            // The read was latched on the previous edge.
            (Some(MemOp::Read(_)), Some(_)) => complete(&mut plan, Some(self.dmem.read_data())),
            (Some(MemOp::Write(req)), None) => {
                if self.dmem.ready() {
                    self.dmem
                        .validate(None, Some(&req))
                        .in_stage(Stage::Store, pc)?;
                    plan.mem_write = Some(req);
                    plan.pending = Some(PendingOp::Store(instr));
                }
            }
            (Some(MemOp::Write(_)), Some(op)) => {
                if self.dmem.ready() {
                    complete(&mut plan, None);
                } else {
                    plan.pending = Some(op);
                }
            }
        }
        Ok(plan)
    }
}

/// Read-only view of a core's architectural and control state.
#[derive(Debug, Clone, Copy)]
pub struct CoreView<'a> {
    cu: &'a ControlUnit,
}

impl CoreView<'_> {
    pub fn pc(&self) -> u32 {
        self.cu.pc
    }

    pub fn pc_next(&self) -> u32 {
        self.cu.pc_next
    }

    pub fn state(&self) -> ControlState {
        self.cu.state
    }

    pub fn register(&self, idx: u8) -> u32 {
        self.cu.regs.get(idx)
    }

    pub fn registers(&self) -> [u32; NUM_REGS] {
        self.cu.regs.snapshot()
    }

    pub fn instruction_word(&self, addr: u32) -> Result<u32, MemError> {
        self.cu.imem.read_word(addr)
    }

    pub fn data_word(&self, addr: u32) -> Result<u32, MemError> {
        self.cu.dmem.store().read_word(addr)
    }

    pub fn mem_state(&self) -> MemState {
        self.cu.dmem.state()
    }

    pub fn console(&self) -> &Console {
        self.cu.dmem.console()
    }

    /// True while a load or store is waiting on the memory controller.
    pub fn memory_pending(&self) -> bool {
        self.cu.pending.is_some()
    }

    pub fn cycles(&self) -> u64 {
        self.cu.cycles
    }

    pub fn retired(&self) -> u64 {
        self.cu.retired
    }
}
