use thiserror::Error;

use crate::mem::console::CONSOLE_BYTES;

pub const RESET_VECTOR: u32 = 0x0001_0000;
pub const DATA_BASE: u32 = 0x0002_0000;
pub const DEFAULT_STORE_BYTES: u32 = 64 * 1024;
pub const CONSOLE_BASE: u32 = 0x0003_0000;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} base 0x{base:08x} is not word aligned")]
    UnalignedBase { name: &'static str, base: u32 },

    #[error("{name} size {bytes} must be a nonzero multiple of 4")]
    BadSize { name: &'static str, bytes: u32 },

    #[error("{name} [0x{base:08x}, +0x{bytes:x}) runs past the end of the address space")]
    Overflow {
        name: &'static str,
        base: u32,
        bytes: u32,
    },

    #[error("{0} and {1} overlap")]
    Overlap(&'static str, &'static str),

    #[error("reset vector 0x{0:08x} is not a word inside the instruction store")]
    ResetVector(u32),
}

/// Reset vector and memory map of a core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoreConfig {
    pub reset_vector: u32,
    pub imem_base: u32,
    pub imem_bytes: u32,
    pub dmem_base: u32,
    pub dmem_bytes: u32,
    /// Base of the four-byte console block, or `None` to leave it unmapped.
    pub console_base: Option<u32>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            reset_vector: RESET_VECTOR,
            imem_base: RESET_VECTOR,
            imem_bytes: DEFAULT_STORE_BYTES,
            dmem_base: DATA_BASE,
            dmem_bytes: DEFAULT_STORE_BYTES,
            console_base: Some(CONSOLE_BASE),
        }
    }
}

fn check_region(name: &'static str, base: u32, bytes: u32) -> Result<u64, ConfigError> {
    if base & 3 != 0 {
        return Err(ConfigError::UnalignedBase { name, base });
    }
    if bytes == 0 || bytes & 3 != 0 {
        return Err(ConfigError::BadSize { name, bytes });
    }
    let end = base as u64 + bytes as u64;
    if end > 1 << 32 {
        return Err(ConfigError::Overflow { name, base, bytes });
    }
    Ok(end)
}

impl CoreConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut regions = vec![
            (
                "instruction store",
                self.imem_base,
                check_region("instruction store", self.imem_base, self.imem_bytes)?,
            ),
            (
                "data store",
                self.dmem_base,
                check_region("data store", self.dmem_base, self.dmem_bytes)?,
            ),
        ];
        if let Some(base) = self.console_base {
            regions.push(("console", base, check_region("console", base, CONSOLE_BYTES)?));
        }

        for (i, &(a, a_base, a_end)) in regions.iter().enumerate() {
            for &(b, b_base, b_end) in &regions[i + 1..] {
                if (a_base as u64) < b_end && (b_base as u64) < a_end {
                    return Err(ConfigError::Overlap(a, b));
                }
            }
        }

        let imem_end = regions[0].2;

        let rv = self.reset_vector;
        if rv & 3 != 0 || rv < self.imem_base || rv as u64 >= imem_end {
            return Err(ConfigError::ResetVector(rv));
        }
        Ok(())
    }
}
