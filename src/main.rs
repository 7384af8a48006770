use std::fs;
use std::path::{Path, PathBuf};

use clap::{ArgAction, Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr};
use log::LevelFilter;
use simple_logger::SimpleLogger;

use hopper::display::render;
use hopper::pacing::Pacing;
use hopper::{assemble, Processor, StdMem};

/// Assembler and emulator for the Hopper 8-bit computer.
#[derive(Parser)]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Log more, repeat for even more
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// Assemble a `.hop` source file into a flat binary
    Assemble {
        /// Source file to assemble
        source: PathBuf,
        /// Destination, defaults to `<source>.bin`
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Load a binary into memory and run it step by step
    Run {
        /// Binary to run
        binary: PathBuf,
        /// Clock rate in steps per second. Without it every step waits for enter
        #[arg(long)]
        hz: Option<f64>,
        /// Keep previous snapshots on screen
        #[arg(long)]
        no_clear: bool,
    },
}

fn main() -> Result<()> {
    color_eyre::install()?; // rust error handling
    let args = Args::parse();

    let level = match args.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    SimpleLogger::new()
        .with_level(level)
        .init()
        .wrap_err("Failed to set up logging")?; // logging

    match args.command {
        Command::Assemble { source, output } => assemble_file(&source, output),
        Command::Run {
            binary,
            hz,
            no_clear,
        } => run_file(&binary, Pacing::from_hz(hz)?, !no_clear),
    }
}

fn assemble_file(source: &Path, output: Option<PathBuf>) -> Result<()> {
    let contents = fs::read_to_string(source)
        .wrap_err_with(|| format!("Failed to read `{}`", source.display()))?;

    println!("Assembling ...");
    let assembly = assemble(&contents);
    if !assembly.is_clean() {
        println!(
            "{} diagnostics, {} lines could not be parsed",
            assembly.diagnostics.len(),
            assembly.failed_lines()
        );
    }

    let output = output.unwrap_or_else(|| {
        let mut name = source.as_os_str().to_owned();
        name.push(".bin");
        name.into()
    });
    fs::write(&output, &assembly.bytes)
        .wrap_err_with(|| format!("Failed to write `{}`", output.display()))?;
    println!("Done! Wrote {} bytes to `{}`", assembly.bytes.len(), output.display());

    Ok(())
}

fn run_file(binary: &Path, pacing: Pacing, clear: bool) -> Result<()> {
    let mut mem = StdMem::from_file(binary)
        .wrap_err_with(|| format!("Failed to read `{}`", binary.display()))?;
    let mut cpu = Processor::default();

    let show = |cpu: &Processor, mem: &StdMem| {
        if clear {
            print!("\x1B[2J\x1B[1;1H");
        }
        println!("{}", render(cpu, mem));
    };

    while !cpu.halted {
        show(&cpu, &mem);
        pacing.wait()?;
        cpu.execute(&mut mem)
            .wrap_err_with(|| format!("Execution stopped after {} steps", cpu.steps))?;
    }
    show(&cpu, &mem);

    Ok(())
}
