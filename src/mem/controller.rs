//! Byte/halfword/word access controller in front of a [`BackingStore`].
//!
//! Reads are registered: a request presented on one edge produces its
//! (extended) value through [`MemoryController::read_data`] on the next
//! cycle. Writes use a two-edge handshake: the edge that accepts a write moves
//! the controller to `WritePending`, the following edge merges the selected
//! lanes into the addressed word, commits it and returns to `Ready`.
//!
//! An optional [`Console`] block sits beside the store. Byte accesses that
//! hit it go to the device registers instead, with the same timing.

use tracing::{debug, trace};

use super::console::{CONSOLE_BYTES, Console};
use super::{AccessWidth, BackingStore, MemError};
use crate::bits::{sign_extend, zero_extend};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemState {
    Reset,
    Ready,
    WritePending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadRequest {
    pub addr: u32,
    pub width: AccessWidth,
    pub signed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteRequest {
    pub addr: u32,
    pub width: AccessWidth,
    pub data: u32,
}

/// A write accepted on the previous edge, waiting to be committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingWrite {
    addr: u32,
    mask: u32,
    bits: u32,
}

/// Byte-enable mask and shifted data for `width` at `addr`.
fn lane(addr: u32, width: AccessWidth, data: u32) -> (u32, u32) {
    let shift = (addr & 3) * 8;
    let mask = match width {
        AccessWidth::Byte => 0x0000_00ff,
        AccessWidth::Halfword => 0x0000_ffff,
        AccessWidth::Word => 0xffff_ffff,
    } << shift;
    (mask, (data << shift) & mask)
}

/// Extracts and extends the lane selected by `addr` from a fetched word.
pub fn extract(word: u32, addr: u32, width: AccessWidth, signed: bool) -> u32 {
    let raw = word >> ((addr & 3) * 8);
    match width {
        AccessWidth::Word => word,
        _ if signed => sign_extend(raw, width.bits()),
        _ => zero_extend(raw, width.bits()),
    }
}

#[derive(Debug, Clone)]
pub struct MemoryController {
    state: MemState,
    store: BackingStore,
    read_data: u32,
    pending: Option<PendingWrite>,
    console_base: Option<u32>,
    console: Console,
}

impl MemoryController {
    pub fn new(store: BackingStore) -> Self {
        Self {
            state: MemState::Reset,
            store,
            read_data: 0,
            pending: None,
            console_base: None,
            console: Console::new(),
        }
    }

    /// A controller that also decodes a console block at `base`.
    pub fn with_console(store: BackingStore, base: u32) -> Self {
        Self {
            console_base: Some(base),
            ..Self::new(store)
        }
    }

    /// Returns to `Reset`, dropping any uncommitted write. Store contents
    /// are kept.
    pub fn reset(&mut self) {
        self.state = MemState::Reset;
        self.read_data = 0;
        self.pending = None;
    }

    pub fn state(&self) -> MemState {
        self.state
    }

    pub fn ready(&self) -> bool {
        self.state == MemState::Ready
    }

    pub fn read_data(&self) -> u32 {
        self.read_data
    }

    pub fn store(&self) -> &BackingStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut BackingStore {
        &mut self.store
    }

    pub fn console(&self) -> &Console {
        &self.console
    }

    pub fn console_mut(&mut self) -> &mut Console {
        &mut self.console
    }

    /// Register offset of `addr` inside the console block, if it hits it.
    fn console_offset(&self, addr: u32) -> Option<u32> {
        let off = addr.wrapping_sub(self.console_base?);
        (off < CONSOLE_BYTES).then_some(off)
    }

    fn check(&self, addr: u32, width: AccessWidth) -> Result<(), MemError> {
        if !width.is_aligned(addr) {
            return Err(MemError::Misaligned { addr, width });
        }
        if self.console_offset(addr).is_some() {
            if width != AccessWidth::Byte {
                return Err(MemError::DeviceWidth { addr, width });
            }
            return Ok(());
        }
        self.store.read_word(addr).map(|_| ())
    }

    /// Validates the requests this controller would act on in its current
    /// state, without changing anything.
    pub fn validate(
        &self,
        read: Option<&ReadRequest>,
        write: Option<&WriteRequest>,
    ) -> Result<(), MemError> {
        if self.state != MemState::Ready {
            return Ok(());
        }
        if let Some(r) = read {
            self.check(r.addr, r.width)?;
        }
        if let Some(w) = write {
            self.check(w.addr, w.width)?;
        }
        Ok(())
    }

    /// Advances one clock edge. Returns whether `write` was accepted.
    ///
    /// Requests are validated before any state changes, so an error leaves
    /// the controller exactly as it was.
    pub fn tick(
        &mut self,
        read: Option<ReadRequest>,
        write: Option<WriteRequest>,
    ) -> Result<bool, MemError> {
        self.validate(read.as_ref(), write.as_ref())?;

        match self.state {
            MemState::Reset => {
                self.state = MemState::Ready;
                Ok(false)
            }
            MemState::Ready => {
                if let Some(r) = read {
                    self.read_data = match self.console_offset(r.addr) {
                        Some(off) => {
                            let byte = self.console.read(off) as u32;
                            extract(byte, 0, AccessWidth::Byte, r.signed)
                        }
                        None => {
                            let word = self.store.read_word(r.addr)?;
                            extract(word, r.addr, r.width, r.signed)
                        }
                    };
                    trace!(
                        addr = %format_args!("0x{:08x}", r.addr),
                        width = %r.width,
                        data = %format_args!("0x{:08x}", self.read_data),
                        "memory read"
                    );
                }
                match write {
                    Some(w) => {
                        let (mask, bits) = lane(w.addr, w.width, w.data);
                        debug!(
                            addr = %format_args!("0x{:08x}", w.addr),
                            width = %w.width,
                            "write accepted"
                        );
                        self.pending = Some(PendingWrite {
                            addr: w.addr,
                            mask,
                            bits,
                        });
                        self.state = MemState::WritePending;
                        Ok(true)
                    }
                    None => Ok(false),
                }
            }
            MemState::WritePending => {
                if let Some(p) = self.pending.take() {
                    match self.console_offset(p.addr) {
                        Some(off) => {
                            let byte = (p.bits >> ((p.addr & 3) * 8)) as u8;
                            debug!(offset = off, byte, "console write");
                            self.console.write(off, byte);
                        }
                        None => {
                            let old = self.store.read_word(p.addr)?;
                            let word = (old & !p.mask) | p.bits;
                            self.store.write_word(p.addr, word)?;
                            debug!(
                                addr = %format_args!("0x{:08x}", p.addr & !3),
                                word = %format_args!("0x{:08x}", word),
                                "write committed"
                            );
                        }
                    }
                }
                self.state = MemState::Ready;
                Ok(false)
            }
        }
    }
}
