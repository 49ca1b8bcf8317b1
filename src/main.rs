//! LMC Emulator - CLI Entry Point
//!
//! Commands:
//! - `lmc-emu run <program>` - Run an assembly (`.lmc`) or image (`.img`) file
//! - `lmc-emu asm <source>` - Assemble to a memory image
//! - `lmc-emu disasm <image>` - Disassemble a memory image

use std::fmt::Display;
use std::path::{Path, PathBuf};
use clap::{Args, Parser, Subcommand};
use lmc::asm::{assemble, disassemble, load_image, save_image};
use lmc::io::{ConsolePort, DEFAULT_PROMPT};
use lmc::log::{self, Level};
use lmc::{debug, error, info, warn};
use lmc::{Architecture, Binary, Config, Decimal, Machine, Word};

#[derive(Parser)]
#[command(name = "lmc-emu")]
#[command(version)]
#[command(about = "An assembler and emulator for the Little Man Computer")]
struct Cli {
    /// Only print warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a program until it halts
    Run {
        /// Path to the assembly or image file to execute
        program: PathBuf,
        /// Stop after this many instructions
        #[arg(short, long)]
        max_cycles: Option<u64>,
        /// Log every executed instruction
        #[arg(short, long)]
        trace: bool,
        /// Print the final machine state as JSON
        #[arg(long)]
        dump_state: bool,
        /// Input prompt
        #[arg(long, default_value = DEFAULT_PROMPT)]
        prompt: String,
        #[command(flatten)]
        machine: MachineArgs,
    },
    /// Assemble source to a memory image
    Asm {
        /// Path to the source file
        source: PathBuf,
        /// Output image file (default: source with an `.img` extension)
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[command(flatten)]
        machine: MachineArgs,
    },
    /// Disassemble a memory image to readable text
    Disasm {
        /// Path to the image file
        image: PathBuf,
        /// Read the image as a binary-machine image
        #[arg(long)]
        binary: bool,
    },
}

/// Options shared by `run` and `asm`.
#[derive(Args)]
struct MachineArgs {
    /// JSON config file; the flags below override it
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Wrap out-of-range addresses instead of failing
    #[arg(long)]
    wrap_memory: bool,
    /// Store out-of-range values as they are
    #[arg(long)]
    no_wrap_values: bool,
    /// Disable non-standard instructions (OTC)
    #[arg(long)]
    no_extensions: bool,
    /// Append a HLT after the last source line
    #[arg(long)]
    append_halt: bool,
    /// Use the wide binary machine (65536 words of 32 bits)
    #[arg(long)]
    binary: bool,
}

impl MachineArgs {
    fn config(&self) -> Config {
        let mut config = match &self.config {
            Some(path) => or_exit(Config::load(path), "Failed to load config"),
            None => Config::default(),
        };

        config.wrap_memory |= self.wrap_memory;
        config.append_trailing_halt |= self.append_halt;
        if self.no_wrap_values {
            config.wrap_values = false;
        }
        if self.no_extensions {
            config.extensions = false;
        }
        config
    }
}

fn main() {
    let cli = Cli::parse();

    if cli.quiet {
        log::set_min_level(Level::Warn);
    }

    match cli.command {
        Some(Commands::Run { program, max_cycles, trace, dump_state, prompt, machine }) => {
            if trace {
                log::set_min_level(Level::Debug);
            }
            let options = RunOptions { max_cycles, dump_state, prompt };
            let config = machine.config();
            if machine.binary {
                run_program::<Binary>(&program, config, &options);
            } else {
                run_program::<Decimal>(&program, config, &options);
            }
        }
        Some(Commands::Asm { source, output, machine }) => {
            let config = machine.config();
            if machine.binary {
                assemble_file::<Binary>(&source, output, &config);
            } else {
                assemble_file::<Decimal>(&source, output, &config);
            }
        }
        Some(Commands::Disasm { image, binary }) => {
            if binary {
                disassemble_file::<Binary>(&image);
            } else {
                disassemble_file::<Decimal>(&image);
            }
        }
        None => {
            println!("LMC Emulator v{}", env!("CARGO_PKG_VERSION"));
            println!("A Little Man Computer assembler and emulator");
            println!();
            println!("Use --help for available commands");
        }
    }
}

struct RunOptions {
    max_cycles: Option<u64>,
    dump_state: bool,
    prompt: String,
}

/// Print `context` and the error, then exit with status 1.
fn or_exit<T, E: Display>(result: Result<T, E>, context: &str) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            error!("{}: {}", context, e);
            std::process::exit(1);
        }
    }
}

/// Load an image file, or assemble anything else.
fn load_program<A: Architecture>(path: &Path, config: &Config) -> Vec<Word> {
    if path.extension().is_some_and(|ext| ext == "img") {
        let image = or_exit(load_image(path), "Failed to load image");
        info!("Loaded {} words from {}", image.len(), path.display());
        return image;
    }

    let source = or_exit(std::fs::read_to_string(path), "Failed to read file");
    let program = or_exit(assemble::<A>(&source, config), "Assembly error");
    info!("Assembled {} words from {}", program.image.len(), path.display());
    program.image
}

fn run_program<A: Architecture>(path: &Path, config: Config, options: &RunOptions) {
    let image = load_program::<A>(path, &config);
    if image.is_empty() {
        warn!("Program is empty; memory is all HLT");
    }

    let port = ConsolePort::stdio().with_prompt(options.prompt.as_str());
    let mut machine = or_exit(Machine::<_, A>::load(&image, config, port), "Failed to load program");

    let limit = options.max_cycles.unwrap_or(u64::MAX);
    let mut result = Ok(());
    while machine.is_running() && machine.cycles() < limit {
        let ip = machine.registers().ip;
        match machine.step() {
            Ok(instr) => {
                debug!("{:03}: {:<8} ACC={}", ip, instr.to_string(), machine.acc());
            }
            Err(e) => {
                result = Err((ip, e));
                break;
            }
        }
    }

    // Finish a character line so log output starts on its own line
    if machine.port().is_line_mode() {
        println!();
    }

    if options.dump_state {
        let snapshot = machine.snapshot();
        println!("{}", or_exit(serde_json::to_string_pretty(&snapshot), "Failed to dump state"));
    }

    if let Err((ip, e)) = result {
        error!("Runtime error at IP={:03} after {} cycles: {}", ip, machine.cycles(), e);
        std::process::exit(1);
    }

    if machine.is_halted() {
        info!("Halted after {} cycles", machine.cycles());
    } else {
        warn!("Stopped after {} cycles without halting. Use --max-cycles to increase the limit.", machine.cycles());
    }
}

fn assemble_file<A: Architecture>(source_path: &Path, output: Option<PathBuf>, config: &Config) {
    let out_path = output.unwrap_or_else(|| source_path.with_extension("img"));

    info!("Assembling: {} -> {}", source_path.display(), out_path.display());

    let source = or_exit(std::fs::read_to_string(source_path), "Failed to read file");
    let program = or_exit(assemble::<A>(&source, config), "Assembly error");

    info!("Assembled {} words, {} labels", program.image.len(), program.labels.len());

    or_exit(save_image::<A, _>(&out_path, &program.image), "Failed to save image");

    info!("Saved to {}", out_path.display());
}

fn disassemble_file<A: Architecture>(image_path: &Path) {
    let image = or_exit(load_image(image_path), "Failed to load image");
    if image.len() > A::MEMORY_SIZE {
        warn!("Image has {} words but the {} machine only has {}", image.len(), A::NAME, A::MEMORY_SIZE);
    }

    print!("{}", disassemble::<A>(&image));
}
