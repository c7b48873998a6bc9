use crate::cpu::ControlUnit;
use goblin::elf::{
    Elf,
    header::{self, ELFCLASS32, ELFDATA2LSB, EM_RISCV, ET_EXEC},
    program_header::PT_LOAD,
};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// Which store a segment lands in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Instruction,
    Data,
}

/// Copies the `PT_LOAD` segments of an RV32 ELF executable into the core's
/// instruction and data stores, zero-filling bss. Returns the entry point.
///
/// Each segment must lie entirely inside one of the two stores. The core
/// always starts at its reset vector; an entry point elsewhere is only
/// reported.
pub fn load_elf(bytes: &[u8], core: &mut ControlUnit) -> Result<u32, Box<dyn std::error::Error>> {
    let elf = Elf::parse(bytes)?;

    // Basic sanity checks so we fail fast on bad inputs
    if elf.header.e_ident[header::EI_CLASS] != ELFCLASS32 {
        return Err("expected 32-bit ELF".into());
    }
    if elf.header.e_ident[header::EI_DATA] != ELFDATA2LSB {
        return Err("expected little-endian ELF".into());
    }
    if elf.header.e_machine != EM_RISCV {
        return Err("expected RISC-V ELF".into());
    }
    if elf.header.e_type != ET_EXEC {
        return Err("unsupported ELF type (want ET_EXEC)".into());
    }

    let cfg = *core.config();
    let regions = [
        (Target::Instruction, cfg.imem_base, cfg.imem_bytes),
        (Target::Data, cfg.dmem_base, cfg.dmem_bytes),
    ];

    for ph in &elf.program_headers {
        if ph.p_type != PT_LOAD || ph.p_memsz == 0 {
            continue;
        }
        let file_off = ph.p_offset as usize;
        let file_sz = ph.p_filesz as usize;
        let vaddr = ph.p_vaddr;

        let end = file_off
            .checked_add(file_sz)
            .ok_or("program header file range overflow")?;
        if end > bytes.len() {
            return Err(
                format!("segment outside file: off=0x{file_off:x} size=0x{file_sz:x}").into(),
            );
        }
        if ph.p_memsz < ph.p_filesz {
            return Err(
                format!("p_memsz smaller than p_filesz for segment at off=0x{file_off:x}").into(),
            );
        }

        let seg_end = vaddr
            .checked_add(ph.p_memsz)
            .ok_or("segment virtual range overflow")?;
        let (target, base) = regions
            .iter()
            .find(|(_, base, size)| {
                vaddr >= *base as u64 && seg_end <= *base as u64 + *size as u64
            })
            .map(|(target, base, _)| (*target, *base))
            .ok_or_else(|| {
                format!("segment [0x{vaddr:x},0x{seg_end:x}) is not inside the instruction or data store")
            })?;

        let offset = (vaddr - base as u64) as u32;
        let mut image = bytes[file_off..end].to_vec();
        // Zero-fill bss (p_memsz may be larger than p_filesz)
        image.resize(ph.p_memsz as usize, 0);

        debug!(
            ?target,
            vaddr = %format_args!("0x{vaddr:08x}"),
            len = image.len(),
            "loading segment"
        );
        match target {
            Target::Instruction => core.load_instruction_image(&image, offset)?,
            Target::Data => core.load_data_image(&image, offset)?,
        }
    }

    let entry = elf.entry as u32;
    if entry != cfg.reset_vector {
        warn!(
            "ELF entry 0x{:08x} differs from reset vector 0x{:08x}; execution starts at the reset vector",
            entry, cfg.reset_vector
        );
    }
    Ok(entry)
}

pub fn load_elf_file(
    path: impl AsRef<Path>,
    core: &mut ControlUnit,
) -> Result<u32, Box<dyn std::error::Error>> {
    let bytes = fs::read(path)?;
    load_elf(&bytes, core)
}
