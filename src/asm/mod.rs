//! Assembler and disassembler for LMC programs.
//!
//! This module provides:
//! - A two-pass assembler (text → instruction/data list → memory image)
//! - A best-effort disassembler (memory image → readable text)
//! - Text memory-image files

pub mod assembler;
pub mod disasm;
pub mod image;

pub use assembler::{assemble, Assembler, AssemblerError, Mnemonic, Program};
pub use disasm::{decode_best_effort, disassemble, disassemble_word, memory_to_items};
pub use image::{format_image, load_image, parse_image, save_image, ImageError};
