//! Two-pass assembler for LMC programs.
//!
//! Syntax:
//! ```text
//! // Comment
//!         INP             // read a number
//!         STA x           // store it at label x
//! loop    LDA x           // a label is the first word on a line
//! done:   HLT             // an optional trailing colon is dropped
//! x       DAT             // data word, 0 unless a value is given
//! one     DAT 1
//! ```
//!
//! Every line is `[label] [mnemonic [operand]]`. Mnemonics are
//! case-sensitive. A line holding a single unknown word is a label for the
//! next instruction, so a misspelled mnemonic on its own line silently
//! turns into a label.

use std::collections::HashMap;
use std::fmt;
use crate::config::Config;
use crate::cpu::decode::{CodeOrData, Extension, Instruction, IoOp};
use crate::cpu::word::{Architecture, Word};
use thiserror::Error;

/// Marker that starts a line comment.
pub const COMMENT: &str = "//";

/// Assemble `source` for architecture `A`.
pub fn assemble<A: Architecture>(source: &str, config: &Config) -> Result<Program, AssemblerError> {
    Assembler::new(source, config).assemble::<A>()
}

/// An assembled program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    /// Instructions and data words in declaration order.
    pub items: Vec<CodeOrData>,
    /// Label table (label -> index into `items`).
    pub labels: HashMap<String, usize>,
    /// The initial memory image, `items` encoded.
    pub image: Vec<Word>,
}

/// Assembly mnemonics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mnemonic {
    Hlt,
    Add,
    Sub,
    Sta,
    Lda,
    Bra,
    Brz,
    Brp,
    Inp,
    Out,
    Otc,
    Dat,
}

impl Mnemonic {
    /// Look up a mnemonic. `STO` is an alias of `STA`.
    pub fn parse(token: &str) -> Option<Self> {
        let mnemonic = match token {
            "HLT" => Mnemonic::Hlt,
            "ADD" => Mnemonic::Add,
            "SUB" => Mnemonic::Sub,
            "STA" | "STO" => Mnemonic::Sta,
            "LDA" => Mnemonic::Lda,
            "BRA" => Mnemonic::Bra,
            "BRZ" => Mnemonic::Brz,
            "BRP" => Mnemonic::Brp,
            "INP" => Mnemonic::Inp,
            "OUT" => Mnemonic::Out,
            "OTC" => Mnemonic::Otc,
            "DAT" => Mnemonic::Dat,
            _ => return None,
        };
        Some(mnemonic)
    }

    pub fn is_valid(token: &str) -> bool {
        Self::parse(token).is_some()
    }

    /// Whether the mnemonic is meaningless without an operand.
    pub fn requires_operand(self) -> bool {
        matches!(
            self,
            Mnemonic::Add
                | Mnemonic::Sub
                | Mnemonic::Sta
                | Mnemonic::Lda
                | Mnemonic::Bra
                | Mnemonic::Brz
                | Mnemonic::Brp
        )
    }

    /// Extension the mnemonic depends on, if any.
    pub fn extension(self) -> Option<Extension> {
        match self {
            Mnemonic::Otc => Some(Extension::OutputChar),
            _ => None,
        }
    }

    /// Build the instruction for `operand`.
    ///
    /// I/O mnemonics carry their own operand and ignore the given one.
    /// Returns `None` for `DAT`, which is not an instruction.
    fn instruction(self, operand: u32) -> Option<Instruction> {
        let instr = match self {
            Mnemonic::Hlt => Instruction::Hlt(operand),
            Mnemonic::Add => Instruction::Add(operand),
            Mnemonic::Sub => Instruction::Sub(operand),
            Mnemonic::Sta => Instruction::Sta(operand),
            Mnemonic::Lda => Instruction::Lda(operand),
            Mnemonic::Bra => Instruction::Bra(operand),
            Mnemonic::Brz => Instruction::Brz(operand),
            Mnemonic::Brp => Instruction::Brp(operand),
            Mnemonic::Inp => Instruction::Io(IoOp::Input),
            Mnemonic::Out => Instruction::Io(IoOp::Output),
            Mnemonic::Otc => Instruction::Io(IoOp::OutputChar),
            Mnemonic::Dat => return None,
        };
        Some(instr)
    }

    fn is_io(self) -> bool {
        matches!(self, Mnemonic::Inp | Mnemonic::Out | Mnemonic::Otc)
    }
}

impl fmt::Display for Mnemonic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Mnemonic::Hlt => "HLT",
            Mnemonic::Add => "ADD",
            Mnemonic::Sub => "SUB",
            Mnemonic::Sta => "STA",
            Mnemonic::Lda => "LDA",
            Mnemonic::Bra => "BRA",
            Mnemonic::Brz => "BRZ",
            Mnemonic::Brp => "BRP",
            Mnemonic::Inp => "INP",
            Mnemonic::Out => "OUT",
            Mnemonic::Otc => "OTC",
            Mnemonic::Dat => "DAT",
        };
        f.write_str(name)
    }
}

/// An operand as written in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    Number(i64),
    /// A label reference, replaced by a number in pass 2.
    Label(String),
}

impl Operand {
    fn parse(token: &str) -> Self {
        match token.parse::<i64>() {
            Ok(value) => Operand::Number(value),
            Err(_) => Operand::Label(token.to_string()),
        }
    }
}

/// One instruction or data line after pass 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLine {
    /// 1-based source line.
    pub line: usize,
    pub mnemonic: Mnemonic,
    pub operand: Option<Operand>,
    /// Labels bound to this entry.
    pub labels: Vec<String>,
}

/// The assembler state.
///
/// [`assemble`](Self::assemble) runs every stage; the stages are public
/// so tools can stop after any of them.
#[derive(Debug, Clone)]
pub struct Assembler<'a> {
    source: &'a str,
    config: Config,
    /// Pass 1 output.
    parsed: Vec<ParsedLine>,
    /// Symbol table (label -> entry index).
    labels: HashMap<String, usize>,
    /// Labels waiting for the next entry, with the line they were seen on.
    queued: Vec<(String, usize)>,
}

impl<'a> Assembler<'a> {
    pub fn new(source: &'a str, config: &Config) -> Self {
        Self {
            source,
            config: *config,
            parsed: Vec::new(),
            labels: HashMap::new(),
            queued: Vec::new(),
        }
    }

    /// Run all stages and build the memory image.
    pub fn assemble<A: Architecture>(mut self) -> Result<Program, AssemblerError> {
        // Pass 1: split lines, collect labels
        self.parse_file()?;

        // Pass 2: replace label references with addresses
        self.resolve_labels()?;

        let items = self.generate_instructions::<A>()?;
        let image: Vec<Word> = items.iter().map(|item| item.encode::<A>()).collect();
        if image.len() > A::MEMORY_SIZE {
            return Err(AssemblerError::ProgramTooLarge {
                size: image.len(),
                capacity: A::MEMORY_SIZE,
            });
        }

        Ok(Program {
            items,
            labels: self.labels,
            image,
        })
    }

    /// Pass 1: parse every line and bind labels to entry indices.
    pub fn parse_file(&mut self) -> Result<(), AssemblerError> {
        let source = self.source;
        for (line_num, line) in source.lines().enumerate() {
            self.parse_line(line, line_num + 1)?;
        }
        self.finish_parse_file(source.lines().count())
    }

    fn parse_line(&mut self, line: &str, line_num: usize) -> Result<(), AssemblerError> {
        // Remove comment
        let code = match line.find(COMMENT) {
            Some(idx) => &line[..idx],
            None => line,
        };
        let words: Vec<&str> = code.split_whitespace().collect();

        match *words.as_slice() {
            [] => Ok(()),
            [label, opcode, operand] => self.parse_entry(Some(label), Some(opcode), Some(operand), line_num),
            [opcode, operand] if Mnemonic::is_valid(opcode) => {
                self.parse_entry(None, Some(opcode), Some(operand), line_num)
            }
            [label, opcode] if Mnemonic::is_valid(opcode) => {
                self.parse_entry(Some(label), Some(opcode), None, line_num)
            }
            [a, b] => Err(AssemblerError::UnknownOpcode {
                line: line_num,
                detail: format!("none of `{}`, `{}` is a valid opcode", a, b),
            }),
            [opcode] if Mnemonic::is_valid(opcode) => self.parse_entry(None, Some(opcode), None, line_num),
            [label] => self.parse_entry(Some(label), None, None, line_num),
            _ => Err(AssemblerError::Syntax {
                line: line_num,
                message: "expected `[label] [opcode [operand]]`, space-separated".into(),
            }),
        }
    }

    fn parse_entry(
        &mut self,
        label: Option<&str>,
        opcode: Option<&str>,
        operand: Option<&str>,
        line_num: usize,
    ) -> Result<(), AssemblerError> {
        if let Some(label) = label {
            self.queue_label(label, line_num)?;
        }

        let Some(opcode) = opcode else {
            return Ok(());
        };
        let mnemonic = Mnemonic::parse(opcode).ok_or_else(|| AssemblerError::UnknownOpcode {
            line: line_num,
            detail: format!("`{}` is not a valid opcode", opcode),
        })?;

        self.add_entry(ParsedLine {
            line: line_num,
            mnemonic,
            operand: operand.map(Operand::parse),
            labels: Vec::new(),
        })
    }

    fn queue_label(&mut self, label: &str, line_num: usize) -> Result<(), AssemblerError> {
        let label = label.strip_suffix(':').unwrap_or(label);
        if label.is_empty() {
            return Err(AssemblerError::Syntax {
                line: line_num,
                message: "empty label".into(),
            });
        }
        if self.labels.contains_key(label) || self.queued.iter().any(|(queued, _)| queued == label) {
            return Err(AssemblerError::DuplicateLabel {
                line: line_num,
                label: label.to_string(),
            });
        }
        self.queued.push((label.to_string(), line_num));
        Ok(())
    }

    /// Append an entry and attach every queued label to it.
    fn add_entry(&mut self, mut entry: ParsedLine) -> Result<(), AssemblerError> {
        let index = self.parsed.len();
        entry.labels = self.bind_queued(index)?;
        self.parsed.push(entry);
        Ok(())
    }

    fn bind_queued(&mut self, index: usize) -> Result<Vec<String>, AssemblerError> {
        let mut bound = Vec::with_capacity(self.queued.len());
        for (label, line) in self.queued.drain(..) {
            if self.labels.contains_key(&label) {
                return Err(AssemblerError::DuplicateLabel { line, label });
            }
            self.labels.insert(label.clone(), index);
            bound.push(label);
        }
        Ok(bound)
    }

    fn finish_parse_file(&mut self, line_count: usize) -> Result<(), AssemblerError> {
        if self.config.append_trailing_halt {
            // Takes any labels still queued
            self.add_entry(ParsedLine {
                line: line_count + 1,
                mnemonic: Mnemonic::Hlt,
                operand: Some(Operand::Number(0)),
                labels: Vec::new(),
            })
        } else {
            // Leftover labels point one past the last entry
            let index = self.parsed.len();
            self.bind_queued(index).map(|_| ())
        }
    }

    /// Pass 2: replace every label operand with the address it names.
    pub fn resolve_labels(&mut self) -> Result<(), AssemblerError> {
        for entry in &mut self.parsed {
            if let Some(Operand::Label(label)) = &entry.operand {
                let addr = self.labels.get(label).ok_or_else(|| AssemblerError::UnknownLabel {
                    line: entry.line,
                    label: label.clone(),
                })?;
                entry.operand = Some(Operand::Number(*addr as i64));
            }
        }
        Ok(())
    }

    /// Turn resolved entries into instructions and data words.
    pub fn generate_instructions<A: Architecture>(&self) -> Result<Vec<CodeOrData>, AssemblerError> {
        self.parsed.iter().map(|entry| self.generate::<A>(entry)).collect()
    }

    fn generate<A: Architecture>(&self, entry: &ParsedLine) -> Result<CodeOrData, AssemblerError> {
        let line = entry.line;
        let operand = match &entry.operand {
            None => None,
            Some(Operand::Number(value)) => Some(*value),
            Some(Operand::Label(label)) => {
                return Err(AssemblerError::UnknownLabel { line, label: label.clone() });
            }
        };

        if entry.mnemonic == Mnemonic::Dat {
            return Ok(CodeOrData::Data(operand.unwrap_or(0)));
        }

        if let Some(extension) = entry.mnemonic.extension() {
            if !self.config.extensions {
                return Err(AssemblerError::ExtensionDisabled { line, extension });
            }
        }

        let operand = match operand {
            None if entry.mnemonic.requires_operand() => {
                return Err(AssemblerError::MissingOperand { line, mnemonic: entry.mnemonic });
            }
            None => 0,
            Some(_) if entry.mnemonic.is_io() => 0,
            Some(value) => u32::try_from(value)
                .ok()
                .filter(|&operand| operand < A::OPERAND_LIMIT)
                .ok_or(AssemblerError::OperandOutOfRange {
                    line,
                    operand: value,
                    limit: A::OPERAND_LIMIT,
                })?,
        };

        entry
            .mnemonic
            .instruction(operand)
            .map(CodeOrData::Code)
            .ok_or_else(|| AssemblerError::Syntax {
                line,
                message: format!("`{}` is not an instruction", entry.mnemonic),
            })
    }

    /// Entries produced by pass 1.
    pub fn parsed(&self) -> &[ParsedLine] {
        &self.parsed
    }

    /// The label table built by pass 1.
    pub fn labels(&self) -> &HashMap<String, usize> {
        &self.labels
    }
}

/// Errors that can occur during assembly.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssemblerError {
    #[error("syntax error on line {line}: {message}")]
    Syntax { line: usize, message: String },

    #[error("unknown opcode on line {line}: {detail}")]
    UnknownOpcode { line: usize, detail: String },

    #[error("label `{label}` on line {line} is used more than once")]
    DuplicateLabel { line: usize, label: String },

    #[error("undefined label on line {line}: `{label}`")]
    UnknownLabel { line: usize, label: String },

    #[error("{mnemonic} on line {line} requires an operand")]
    MissingOperand { line: usize, mnemonic: Mnemonic },

    #[error("line {line} uses {extension}, which is not enabled (hint: set `{flag}` to enable it)", flag = .extension.flag())]
    ExtensionDisabled { line: usize, extension: Extension },

    #[error("operand out of range on line {line}: {operand} (expected 0..{limit})")]
    OperandOutOfRange { line: usize, operand: i64, limit: u32 },

    #[error("program of {size} words doesn't fit in the {capacity}-word memory")]
    ProgramTooLarge { size: usize, capacity: usize },
}

impl AssemblerError {
    /// Source line the error refers to, if any.
    pub fn line(&self) -> Option<usize> {
        match self {
            AssemblerError::Syntax { line, .. }
            | AssemblerError::UnknownOpcode { line, .. }
            | AssemblerError::DuplicateLabel { line, .. }
            | AssemblerError::UnknownLabel { line, .. }
            | AssemblerError::MissingOperand { line, .. }
            | AssemblerError::ExtensionDisabled { line, .. }
            | AssemblerError::OperandOutOfRange { line, .. } => Some(*line),
            AssemblerError::ProgramTooLarge { .. } => None,
        }
    }
}
