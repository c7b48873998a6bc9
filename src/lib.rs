//! Cycle-level model of a small RV32I core.
//!
//! [`cpu::ControlUnit`] owns the register file, the instruction store and the
//! data memory controller and advances them together one [`tick`] at a time.
//!
//! [`tick`]: cpu::ControlUnit::tick

pub mod bits;
pub mod config;
pub mod cpu;
pub mod debug;
pub mod elf;
pub mod mem;

pub use config::CoreConfig;
pub use cpu::{ControlState, ControlUnit, CoreView, Fault, TickOutputs};
