//! Byte-wide console registers mapped into the data address space.
//!
//! The block is four bytes at its base:
//!
//! | offset | read                      | write        |
//! |--------|---------------------------|--------------|
//! | 0      | 0                         | ignored      |
//! | 1      | 1 when a byte can be sent | byte to send |
//! | 2      | 1 when a byte is waiting  | ignored      |
//! | 3      | next received byte (pops) | ignored      |
//!
//! The host side pushes received bytes with [`Console::push_input`] and
//! drains sent ones with [`Console::take_output`].

use std::collections::VecDeque;

pub const CONSOLE_BYTES: u32 = 4;

pub const REG_TX: u32 = 1;
pub const REG_RX_READY: u32 = 2;
pub const REG_RX_BYTE: u32 = 3;

#[derive(Debug, Clone, Default)]
pub struct Console {
    rx_queue: VecDeque<u8>,
    tx_buffer: Vec<u8>,
}

impl Console {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_input(&mut self, bytes: &[u8]) {
        self.rx_queue.extend(bytes);
    }

    pub fn pending_input(&self) -> usize {
        self.rx_queue.len()
    }

    /// Bytes sent since the last call.
    pub fn take_output(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.tx_buffer)
    }

    pub fn output(&self) -> &[u8] {
        &self.tx_buffer
    }

    /// Register read. Reading `REG_RX_BYTE` consumes the byte.
    pub fn read(&mut self, offset: u32) -> u8 {
        match offset {
            REG_TX => 1,
            REG_RX_READY => !self.rx_queue.is_empty() as u8,
            REG_RX_BYTE => self.rx_queue.pop_front().unwrap_or(0),
            _ => 0,
        }
    }

    pub fn write(&mut self, offset: u32, byte: u8) {
        if offset == REG_TX {
            self.tx_buffer.push(byte);
        }
    }
}
