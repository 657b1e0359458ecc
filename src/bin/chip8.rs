use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use clap_num::maybe_hex;

use chip8_vm::{Chip8, Chip8Runner, DEFAULT_MAX_STEPS, DISPLAY_X, DISPLAY_Y, RunConfig, disassemble};

/// Headless CHIP-8 interpreter and disassembler.
///
/// Set RUST_LOG=trace to log every executed instruction.
#[derive(Parser, Debug)]
#[command(about)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a ROM until it halts, then print the machine state and display
    #[command(visible_alias = "r")]
    Run {
        /// Path to the CHIP-8 ROM file
        rom_path: PathBuf,

        /// Maximum number of instructions to execute
        #[arg(long, default_value_t = DEFAULT_MAX_STEPS, value_parser = maybe_hex::<u64>)]
        max_steps: u64,

        /// Seed for the RND instruction
        #[arg(long)]
        seed: Option<u64>,

        /// Stop before executing the instruction at this address (repeatable)
        #[arg(long = "break", value_parser = maybe_hex::<u16>)]
        breakpoints: Vec<u16>,
    },

    /// Print a disassembly listing of a ROM
    #[command(visible_alias = "d")]
    Disasm {
        /// Path to the CHIP-8 ROM file
        rom_path: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    match args.command {
        Command::Run {
            rom_path,
            max_steps,
            seed,
            breakpoints,
        } => run(&rom_path, RunConfig { max_steps, seed }, &breakpoints),
        Command::Disasm { rom_path } => {
            let rom = read_rom(&rom_path)?;
            print!("{}", disassemble(&rom));
            Ok(())
        }
    }
}

fn read_rom(path: &Path) -> anyhow::Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("Failed to read ROM file {}", path.display()))
}

fn run(rom_path: &Path, config: RunConfig, breakpoints: &[u16]) -> anyhow::Result<()> {
    let rom = read_rom(rom_path)?;

    let mut runner =
        Chip8Runner::from_rom(&rom, config).context("Failed to load ROM into CHIP-8 memory")?;
    for &addr in breakpoints {
        runner.add_breakpoint(addr);
    }

    let report = runner.run().context("Chip8 Execution error")?;
    println!("{} after {} instructions", report.outcome, report.steps);
    print_state(runner.chip8_ref());

    Ok(())
}

fn print_state(chip8: &Chip8) {
    println!(
        "PC={:04X} I={:04X} DT={:02X} ST={:02X}",
        chip8.pc(),
        chip8.i(),
        chip8.delay_timer(),
        chip8.sound_timer()
    );

    let registers: Vec<String> = chip8
        .v()
        .iter()
        .enumerate()
        .map(|(idx, value)| format!("V{idx:X}={value:02X}"))
        .collect();
    println!("{}", registers.join(" "));
    println!("stack: {:04X?}", chip8.stack().as_slice());

    let display = chip8.display();
    for y in 0..DISPLAY_Y {
        let line: String = (0..DISPLAY_X)
            .map(|x| if display.pixel(x, y) { '#' } else { '.' })
            .collect();
        println!("{line}");
    }
}
