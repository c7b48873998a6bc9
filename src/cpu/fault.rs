use std::fmt;

use thiserror::Error;

use super::decode::DecodeError;
use crate::mem::MemError;

/// Which memory access an error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Fetch,
    Load,
    Store,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Fetch => "fetch",
            Stage::Load => "load",
            Stage::Store => "store",
        };
        f.write_str(s)
    }
}

/// Conditions the core cannot execute past.
///
/// The core has no trap machinery: a fault is returned from `tick()` with no
/// state committed, and the same fault comes back on every later tick until
/// the caller resets or repairs the state.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    #[error("unimplemented instruction at pc=0x{pc:08x} inst=0x{inst:08x}")]
    Unimplemented { pc: u32, inst: u32 },

    #[error("{stage} error at pc=0x{pc:08x}: {err}")]
    Mem { stage: Stage, pc: u32, err: MemError },

    #[error("misaligned jump target at pc=0x{pc:08x}: target=0x{target:08x}")]
    MisalignedTarget { pc: u32, target: u32 },
}

impl Fault {
    pub fn pc(&self) -> u32 {
        match self {
            Fault::Unimplemented { pc, .. } => *pc,
            Fault::Mem { pc, .. } => *pc,
            Fault::MisalignedTarget { pc, .. } => *pc,
        }
    }
}

/// Adds PC context to decoder errors.
pub trait WithPc<T> {
    fn with_pc(self, pc: u32) -> Result<T, Fault>;
}

impl<T> WithPc<T> for Result<T, DecodeError> {
    fn with_pc(self, pc: u32) -> Result<T, Fault> {
        self.map_err(|err| match err {
            DecodeError::Unimplemented { inst } => Fault::Unimplemented { pc, inst },
        })
    }
}

/// Adds stage and PC context to memory errors.
pub trait InStage<T> {
    fn in_stage(self, stage: Stage, pc: u32) -> Result<T, Fault>;
}

impl<T> InStage<T> for Result<T, MemError> {
    fn in_stage(self, stage: Stage, pc: u32) -> Result<T, Fault> {
        self.map_err(|err| Fault::Mem { stage, pc, err })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mem::AccessWidth;

    #[test]
    fn context_is_attached() {
        let r: Result<(), DecodeError> = Err(DecodeError::Unimplemented { inst: 0x73 });
        assert_eq!(
            r.with_pc(0x1_0000),
            Err(Fault::Unimplemented {
                pc: 0x1_0000,
                inst: 0x73
            })
        );

        let r: Result<(), MemError> = Err(MemError::OutOfRange(0x4_0000));
        let fault = r.in_stage(Stage::Load, 0x1_0008).unwrap_err();
        assert_eq!(fault.pc(), 0x1_0008);
        assert_eq!(
            fault.to_string(),
            "load error at pc=0x00010008: address out of range: 0x00040000"
        );
    }

    #[test]
    fn misaligned_message_names_width() {
        let fault = Fault::Mem {
            stage: Stage::Store,
            pc: 0x1_0000,
            err: MemError::Misaligned {
                addr: 0x2_0001,
                width: AccessWidth::Halfword,
            },
        };
        assert_eq!(
            fault.to_string(),
            "store error at pc=0x00010000: misaligned halfword access at 0x00020001"
        );
    }
}
