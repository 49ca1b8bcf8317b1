//! CPU emulation for the Little Man Computer.
//!
//! This module implements the whole machine:
//! - word layouts for the decimal (100 cells) and binary (65 536 cells) variants
//! - 3 registers: ACC (accumulator), IP (instruction pointer), CIR (current instruction)
//! - the ten-opcode instruction set and its I/O sub-dispatch

pub mod word;
pub mod memory;
pub mod registers;
pub mod decode;
pub mod execute;

pub use word::{Architecture, Binary, Decimal, Word};
pub use memory::{Memory, MemoryError};
pub use registers::Registers;
pub use decode::{decode, encode, CodeOrData, Extension, Instruction, IoOp, Opcode};
pub use execute::{Access, CpuError, CpuState, Machine, Snapshot};
