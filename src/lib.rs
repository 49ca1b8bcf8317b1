//! # LMC Emulator
//!
//! An assembler and emulator for the Little Man Computer.
//!
//! The Little Man Computer is a teaching model of a von Neumann machine:
//! one accumulator, a hundred three-digit decimal memory cells and ten
//! opcodes. A wide binary variant with 65 536 cells of 32-bit words is
//! available through the same API.
//!
//! ```
//! use lmc::{Config, Machine, io::BufferPort};
//!
//! let source = "INP\nADD one\nOUT\nHLT\none DAT 1";
//! let mut machine = Machine::from_source(source, Config::default(), BufferPort::new([4]))?;
//! machine.run()?;
//! assert_eq!(machine.port().output(), "5\n");
//! # Ok::<(), lmc::LmcError>(())
//! ```

pub mod cpu;
pub mod asm;
pub mod io;
pub mod config;
pub mod log;

use thiserror::Error;

// Re-export commonly used types
pub use cpu::{
    Architecture, Binary, CodeOrData, CpuError, CpuState, Decimal, Instruction, Machine,
    Memory, MemoryError, Registers, Word,
};
pub use asm::{assemble, disassemble, AssemblerError, ImageError, Program, load_image, save_image};
pub use io::{BufferPort, ConsolePort, IoError, IoPort};
pub use config::{Config, ConfigError};

/// Any error the crate can produce.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LmcError {
    #[error(transparent)]
    Assembler(#[from] AssemblerError),

    #[error(transparent)]
    Memory(#[from] MemoryError),

    #[error(transparent)]
    Cpu(#[from] CpuError),

    #[error(transparent)]
    Io(#[from] IoError),

    #[error(transparent)]
    Image(#[from] ImageError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
