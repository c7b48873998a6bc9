pub mod console;
pub mod controller;

pub use console::Console;
pub use controller::{MemState, MemoryController, ReadRequest, WriteRequest};

use std::fmt;

use thiserror::Error;

/// Granularity of a data memory access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessWidth {
    Byte,
    Halfword,
    Word,
}

impl AccessWidth {
    pub fn bytes(self) -> u32 {
        match self {
            AccessWidth::Byte => 1,
            AccessWidth::Halfword => 2,
            AccessWidth::Word => 4,
        }
    }

    pub fn bits(self) -> u32 {
        self.bytes() * 8
    }

    pub fn is_aligned(self, addr: u32) -> bool {
        addr & (self.bytes() - 1) == 0
    }
}

impl fmt::Display for AccessWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AccessWidth::Byte => "byte",
            AccessWidth::Halfword => "halfword",
            AccessWidth::Word => "word",
        };
        f.write_str(s)
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemError {
    #[error("address out of range: 0x{0:08x}")]
    OutOfRange(u32),

    #[error("misaligned {width} access at 0x{addr:08x}")]
    Misaligned { addr: u32, width: AccessWidth },

    #[error("{width} access to byte-wide device register at 0x{addr:08x}")]
    DeviceWidth { addr: u32, width: AccessWidth },
}

/// Word-addressable storage covering `[base, base + 4 * len)`.
///
/// Addresses are byte addresses; the low two bits are ignored when a word is
/// located, so any address inside a word selects that word.
#[derive(Debug, Clone)]
pub struct BackingStore {
    words: Vec<u32>,
    base: u32,
}

impl BackingStore {
    pub fn new(base: u32, bytes: u32) -> Self {
        Self {
            words: vec![0; (bytes / 4) as usize],
            base,
        }
    }

    pub fn base(&self) -> u32 {
        self.base
    }

    pub fn size_bytes(&self) -> u32 {
        (self.words.len() * 4) as u32
    }

    /// One past the last byte address, computed in 64 bits so a store ending
    /// at the top of the address space does not wrap.
    pub fn end_addr(&self) -> u64 {
        self.base as u64 + self.size_bytes() as u64
    }

    pub fn contains(&self, addr: u32) -> bool {
        addr >= self.base && (addr as u64) < self.end_addr()
    }

    fn word_index(&self, addr: u32) -> Result<usize, MemError> {
        let off = addr.checked_sub(self.base).ok_or(MemError::OutOfRange(addr))?;
        let idx = (off >> 2) as usize;
        if idx >= self.words.len() {
            return Err(MemError::OutOfRange(addr));
        }
        Ok(idx)
    }

    pub fn read_word(&self, addr: u32) -> Result<u32, MemError> {
        let idx = self.word_index(addr)?;
        Ok(self.words[idx])
    }

    pub fn write_word(&mut self, addr: u32, value: u32) -> Result<(), MemError> {
        let idx = self.word_index(addr)?;
        self.words[idx] = value;
        Ok(())
    }

    /// Copies `bytes` into the store starting `offset` bytes past its base,
    /// little-endian. Partial words at either end keep their other bytes.
    pub fn load_image(&mut self, bytes: &[u8], offset: u32) -> Result<(), MemError> {
        let start = self.base as u64 + offset as u64;
        let end = start + bytes.len() as u64;
        if end > self.end_addr() {
            return Err(MemError::OutOfRange(end.min(u32::MAX as u64) as u32));
        }
        for (i, &b) in bytes.iter().enumerate() {
            let addr = (start + i as u64) as u32;
            let idx = self.word_index(addr)?;
            let shift = (addr & 3) * 8;
            let word = &mut self.words[idx];
            *word = (*word & !(0xff << shift)) | ((b as u32) << shift);
        }
        Ok(())
    }
}
