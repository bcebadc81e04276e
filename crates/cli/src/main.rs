//! dtemu command-line front end.
//!
//! This binary assembles a machine from a JSON configuration and runs a guest image. It performs:
//! 1. **Raw run:** Load a flat binary at a physical address and start every CPU there.
//! 2. **ELF run:** Load the image's segments and start every CPU at its entry point.
//! 3. **Reporting:** Print escalated diagnostics and the statistics report on exit.
//!
//! Log verbosity follows `RUST_LOG` (default `info`); `--trace` enables per-instruction logs.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::{fs, io};

use clap::{Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use dtemu_core::common::SimError;
use dtemu_core::config::ArchKind;
use dtemu_core::sim::loader;
use dtemu_core::{Arch, Config, I960, Liveness, Machine, Mips, RunState, Scheduler};

#[derive(Parser, Debug)]
#[command(
    name = "dtemu",
    author,
    version,
    about = "Dynamic-translation emulator for MIPS and i960 guests",
    long_about = "Run a guest image on a dyntrans CPU core.\n\nExamples:\n  dtemu run --elf kernel.elf\n  dtemu run -f boot.bin --load-addr 0x1000 --arch i960\n  dtemu run --elf test.elf --config machine.json --max-rounds 100000 --stats summary"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a guest image until every CPU stops or the round limit is hit.
    Run(RunArgs),
    /// Parse and validate a configuration file, then print it.
    Check {
        /// JSON configuration file.
        config: PathBuf,
    },
}

#[derive(clap::Args, Debug)]
struct RunArgs {
    /// Flat binary to load at `--load-addr`.
    #[arg(short, long, conflicts_with = "elf")]
    file: Option<PathBuf>,

    /// ELF image; segments load at their physical address, CPUs start at the entry point.
    #[arg(long)]
    elf: Option<PathBuf>,

    /// JSON configuration file (defaults apply when absent).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Guest architecture, overriding the configuration.
    #[arg(long, value_parser = parse_arch)]
    arch: Option<ArchKind>,

    /// Physical load address (and start PC) for `--file`.
    #[arg(long, value_parser = parse_u64, default_value = "0")]
    load_addr: u64,

    /// Stop after this many scheduling rounds.
    #[arg(long)]
    max_rounds: Option<u64>,

    /// Breakpoint address; may be repeated.
    #[arg(long = "break", value_parser = parse_u64)]
    breakpoints: Vec<u64>,

    /// Log every decoded instruction.
    #[arg(long)]
    trace: bool,

    /// Statistics sections to print (summary, cpu, translation, mmu); empty for all.
    #[arg(long, num_args = 0.., value_delimiter = ',')]
    stats: Option<Vec<String>>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging();

    let result = match cli.command {
        Commands::Run(args) => cmd_run(&args),
        Commands::Check { config } => cmd_check(&config),
    };
    match result {
        Ok(code) => code,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<Config, SimError> {
    match path {
        Some(p) => Ok(Config::from_json(&fs::read_to_string(p)?)?),
        None => Ok(Config::default()),
    }
}

fn cmd_check(path: &Path) -> Result<ExitCode, SimError> {
    let config = load_config(Some(path))?;
    println!("{config:#?}");
    Ok(ExitCode::SUCCESS)
}

fn cmd_run(args: &RunArgs) -> Result<ExitCode, SimError> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(arch) = args.arch {
        config.general.arch = arch;
    }
    config.general.trace |= args.trace;

    match config.general.arch {
        ArchKind::Mips => run::<Mips>(&config, args),
        ArchKind::I960 => run::<I960>(&config, args),
    }
}

/// Builds the machine, loads the image and drives the scheduler.
fn run<A: Arch>(config: &Config, args: &RunArgs) -> Result<ExitCode, SimError> {
    let mut machine = Machine::<A>::new(config)?;
    let start = if let Some(path) = &args.elf {
        info!(image = %path.display(), "loading elf");
        Some(loader::load_elf_file::<A>(&mut machine.bus, path)?)
    } else if let Some(path) = &args.file {
        info!(image = %path.display(), "loading raw image");
        loader::load_raw_file(&mut machine.bus, path, args.load_addr)?;
        Some(args.load_addr)
    } else {
        warn!("no image given; starting from the reset vector");
        None
    };
    if let Some(pc) = start {
        for cpu in &mut machine.cpus {
            cpu.set_pc(pc);
        }
    }
    machine.set_breakpoints(&args.breakpoints);

    let mut sched = Scheduler::new(config);
    let live = sched.run_until_idle(&mut machine, args.max_rounds);
    match live {
        Liveness::Idle => info!(rounds = machine.stats.rounds, "all cpus stopped"),
        Liveness::Running => info!(rounds = machine.stats.rounds, "round limit reached"),
        Liveness::Break => info!(rounds = machine.stats.rounds, "stopped at debugger break"),
    }

    let diagnostics = sched.take_diagnostics();
    for d in &diagnostics {
        eprintln!("[!] {d}");
    }
    if let Some(sections) = &args.stats {
        print!("{}", machine.stats_report(sections));
    }

    let dead = machine.cpus.iter().any(|c| c.state == RunState::Dead);
    Ok(if dead {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn parse_u64(s: &str) -> Result<u64, String> {
    let s = s.replace('_', "");
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("invalid address '{s}': {e}"))
}

fn parse_arch(s: &str) -> Result<ArchKind, String> {
    match s.to_ascii_lowercase().as_str() {
        "mips" | "mipsel" => Ok(ArchKind::Mips),
        "i960" | "80960" => Ok(ArchKind::I960),
        other => Err(format!("unknown architecture '{other}' (expected mips or i960)")),
    }
}
