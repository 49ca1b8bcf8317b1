//! Text memory-image files.
//!
//! The format is plain text:
//! - One word per line, as a signed decimal integer
//! - `//` starts a comment, to the end of the line
//! - Blank lines are ignored
//!
//! Line order is address order; the image is zero-padded when loaded into
//! a machine.

use std::io::Write;
use std::path::Path;
use crate::asm::disasm::disassemble_word;
use crate::asm::assembler::COMMENT;
use crate::cpu::word::{Architecture, Word};
use thiserror::Error;

/// Parse an image from text.
pub fn parse_image(text: &str) -> Result<Vec<Word>, ImageError> {
    let mut image = Vec::new();

    for (line_num, line) in text.lines().enumerate() {
        let code = match line.find(COMMENT) {
            Some(idx) => &line[..idx],
            None => line,
        };
        let code = code.trim();
        if code.is_empty() {
            continue;
        }

        let word = code.parse::<Word>().map_err(|_| ImageError::Parse {
            line: line_num + 1,
            message: format!("`{}` is not a word", code),
        })?;
        image.push(word);
    }

    Ok(image)
}

/// Format an image as text, with a disassembly comment on every line.
pub fn format_image<A: Architecture>(image: &[Word]) -> String {
    let mut text = format!("// LMC memory image ({} machine)\n", A::NAME);
    text.push_str(&format!("// {} words\n\n", image.len()));

    for (addr, &word) in image.iter().enumerate() {
        let line = format!("{:<11} // {:03}: {}\n", word, addr, disassemble_word::<A>(word));
        text.push_str(&line);
    }

    text
}

/// Load an image file from disk.
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<Vec<Word>, ImageError> {
    let text = std::fs::read_to_string(path.as_ref())
        .map_err(|e| ImageError::Io(e.to_string()))?;
    parse_image(&text)
}

/// Save an image file to disk.
pub fn save_image<A: Architecture, P: AsRef<Path>>(path: P, image: &[Word]) -> Result<(), ImageError> {
    let mut file = std::fs::File::create(path.as_ref())
        .map_err(|e| ImageError::Io(e.to_string()))?;

    file.write_all(format_image::<A>(image).as_bytes())
        .map_err(|e| ImageError::Io(e.to_string()))?;

    Ok(())
}

/// Errors that can occur while reading or writing images.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImageError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("parse error on line {line}: {message}")]
    Parse { line: usize, message: String },
}
