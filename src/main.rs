use std::io::{self, Read, Write};
use std::sync::mpsc::{Receiver, channel};
use std::thread;

use clap::Parser;
use rv32_core::config::{CONSOLE_BASE, CoreConfig, DATA_BASE, DEFAULT_STORE_BYTES, RESET_VECTOR};
use rv32_core::cpu::ControlUnit;
use tracing_subscriber::EnvFilter;

fn parse_u32(s: &str) -> Result<u32, String> {
    let r = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(&hex.replace('_', ""), 16),
        None => s.replace('_', "").parse(),
    };
    r.map_err(|e| format!("invalid number {s:?}: {e}"))
}

#[derive(Parser, Debug)]
#[command(version, about = "Cycle-level RV32I core model")]
struct Args {
    /// RV32 ELF executable to load into the instruction and data stores
    #[arg(long, conflicts_with = "image")]
    elf: Option<String>,

    /// Flat binary loaded at the start of the instruction store
    #[arg(long, required_unless_present = "elf")]
    image: Option<String>,

    /// Flat binary loaded at the start of the data store
    #[arg(long)]
    data: Option<String>,

    /// Instruction store base address, also the reset vector
    #[arg(long, value_parser = parse_u32, default_value_t = RESET_VECTOR)]
    imem_base: u32,

    /// Instruction store size in bytes
    #[arg(long, value_parser = parse_u32, default_value_t = DEFAULT_STORE_BYTES)]
    imem_bytes: u32,

    /// Data store base address
    #[arg(long, value_parser = parse_u32, default_value_t = DATA_BASE)]
    dmem_base: u32,

    /// Data store size in bytes
    #[arg(long, value_parser = parse_u32, default_value_t = DEFAULT_STORE_BYTES)]
    dmem_bytes: u32,

    /// Console register block base address
    #[arg(long, value_parser = parse_u32, default_value_t = CONSOLE_BASE)]
    console_base: u32,

    /// Leave the console block unmapped
    #[arg(long, default_value_t = false)]
    no_console: bool,

    /// Stop after N clock ticks (0 = no limit). A run also ends when the
    /// program retires a jump to itself, or on a fault.
    #[arg(long, default_value_t = 10_000)]
    ticks: u64,

    /// Enable per-tick trace
    #[arg(long, default_value_t = false)]
    trace: bool,
}

/// Forwards stdin to the console a byte at a time from a background thread.
fn spawn_stdin_reader() -> Receiver<u8> {
    let (tx, rx) = channel();
    thread::spawn(move || {
        let mut buffer = [0u8; 1];
        let mut handle = io::stdin().lock();
        while handle.read_exact(&mut buffer).is_ok() {
            if tx.send(buffer[0]).is_err() {
                break;
            }
        }
    });
    rx
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let default_level = if args.trace { "trace" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = CoreConfig {
        reset_vector: args.imem_base,
        imem_base: args.imem_base,
        imem_bytes: args.imem_bytes,
        dmem_base: args.dmem_base,
        dmem_bytes: args.dmem_bytes,
        console_base: (!args.no_console).then_some(args.console_base),
    };
    let mut core = ControlUnit::new(config)?;

    if let Some(path) = &args.elf {
        let entry = rv32_core::elf::load_elf_file(path, &mut core)?;
        tracing::info!("loaded ELF {path}, entry 0x{entry:08x}");
    }
    if let Some(path) = &args.image {
        core.load_instruction_image(&std::fs::read(path)?, 0)?;
    }
    if let Some(path) = &args.data {
        core.load_data_image(&std::fs::read(path)?, 0)?;
    }
    core.reset();

    let input = config.console_base.map(|_| spawn_stdin_reader());
    let mut stdout = io::stdout();

    let mut fault = None;
    while args.ticks == 0 || core.inspect().cycles() < args.ticks {
        if args.trace {
            rv32_core::debug::trace(&core.inspect());
        }
        if let Some(rx) = &input {
            let bytes: Vec<u8> = rx.try_iter().collect();
            core.console_mut().push_input(&bytes);
        }

        let (pc, retired) = (core.inspect().pc(), core.inspect().retired());
        if let Err(e) = core.tick() {
            fault = Some(e);
            break;
        }

        let out = core.console_mut().take_output();
        if !out.is_empty() {
            stdout.write_all(&out)?;
            stdout.flush()?;
        }

        let view = core.inspect();
        if view.retired() > retired && view.pc() == pc {
            tracing::info!("idle loop at 0x{pc:08x}, stopping");
            break;
        }
    }

    let view = core.inspect();
    println!(
        "pc=0x{:08x} cycles={} retired={}",
        view.pc(),
        view.cycles(),
        view.retired()
    );
    for (i, value) in view.registers().iter().enumerate() {
        if *value != 0 {
            println!("x{i} = 0x{value:08x}");
        }
    }

    if let Some(e) = fault {
        eprintln!("CPU fault: {e}");
        std::process::exit(1);
    }
    Ok(())
}
