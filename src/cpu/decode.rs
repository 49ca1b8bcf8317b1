//! Instruction decoder for the Little Man Computer.
//!
//! Every word splits into an opcode and an operand (see
//! [`Architecture::split`]). The opcode selects an entry in a fixed
//! dispatch table which builds the typed [`Instruction`]. Decoding never
//! fails: opcodes without an entry come back as [`Instruction::Invalid`]
//! and it is up to the executor to reject them.

use std::fmt;
use serde::{Serialize, Deserialize};
use crate::cpu::word::{Architecture, Word};

/// Opcode values.
///
/// Opcode 4 is unused on the real machine and has no dispatch entry.
#[derive(Debug, Clone, Copy)]
pub struct Opcode;

impl Opcode {
    pub const HLT: i64 = 0;
    pub const ADD: i64 = 1;
    pub const SUB: i64 = 2;
    pub const STA: i64 = 3;
    pub const LDA: i64 = 5;
    pub const BRA: i64 = 6;
    pub const BRZ: i64 = 7;
    pub const BRP: i64 = 8;
    pub const IO: i64 = 9;
}

/// Non-standard behaviour that has to be switched on explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Extension {
    /// `OTC` (922): print the accumulator as a character.
    OutputChar,
}

impl Extension {
    /// Mnemonic of the gated instruction.
    pub fn mnemonic(self) -> &'static str {
        match self {
            Extension::OutputChar => "OTC",
        }
    }

    /// Decimal encoding of the gated instruction.
    pub fn code(self) -> Word {
        match self {
            Extension::OutputChar => 922,
        }
    }

    /// Configuration flag that enables it.
    pub fn flag(self) -> &'static str {
        match self {
            Extension::OutputChar => "extensions",
        }
    }
}

impl fmt::Display for Extension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "the non-standard {} instruction (code {})", self.mnemonic(), self.code())
    }
}

/// The I/O family (opcode 9), selected by operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IoOp {
    /// `INP` (901): read a number into the accumulator.
    Input,
    /// `OUT` (902): print the accumulator as a number.
    Output,
    /// `OTC` (922): print the accumulator as a character.
    OutputChar,
    /// Any other operand. Executing it is an error.
    Invalid(u32),
}

impl IoOp {
    pub const INPUT: u32 = 1;
    pub const OUTPUT: u32 = 2;
    pub const OUTPUT_CHAR: u32 = 22;

    /// Operands with a meaning, in ascending order.
    pub const CANONICAL: [u32; 3] = [Self::INPUT, Self::OUTPUT, Self::OUTPUT_CHAR];

    /// Sub-dispatch on the operand.
    pub fn from_operand(operand: u32) -> Self {
        match operand {
            Self::INPUT => IoOp::Input,
            Self::OUTPUT => IoOp::Output,
            Self::OUTPUT_CHAR => IoOp::OutputChar,
            other => IoOp::Invalid(other),
        }
    }

    pub fn operand(self) -> u32 {
        match self {
            IoOp::Input => Self::INPUT,
            IoOp::Output => Self::OUTPUT,
            IoOp::OutputChar => Self::OUTPUT_CHAR,
            IoOp::Invalid(operand) => operand,
        }
    }

    pub fn is_valid(self) -> bool {
        !matches!(self, IoOp::Invalid(_))
    }

    /// The extension this operation depends on, if any.
    pub fn extension(self) -> Option<Extension> {
        match self {
            IoOp::OutputChar => Some(Extension::OutputChar),
            _ => None,
        }
    }
}

/// Decoded LMC instruction.
///
/// Memory instructions carry the address they operate on; `Hlt` keeps its
/// (ignored) operand so that every word round-trips through decode/encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Instruction {
    // ==================== Control ====================

    /// Halt execution. The operand has no effect.
    Hlt(u32),

    // ==================== Arithmetic ====================

    /// ACC := ACC + [addr]
    Add(u32),

    /// ACC := ACC - [addr]
    Sub(u32),

    // ==================== Data Transfer ====================

    /// [addr] := ACC
    Sta(u32),

    /// ACC := [addr]
    Lda(u32),

    // ==================== Branches ====================

    /// IP := addr
    Bra(u32),

    /// If ACC = 0 then IP := addr
    Brz(u32),

    /// If ACC >= 0 then IP := addr. Zero counts as positive.
    Brp(u32),

    // ==================== I/O ====================

    /// Input/output family, sub-dispatched by operand.
    Io(IoOp),

    /// A word whose opcode has no dispatch entry (4xx, negative numbers, ...).
    Invalid { opcode: i64, operand: u32 },
}

type Decoder = fn(u32) -> Instruction;

fn decode_io(operand: u32) -> Instruction {
    Instruction::Io(IoOp::from_operand(operand))
}

/// Opcode-indexed decoders. Adding an opcode means adding a variant and an
/// entry here; nothing registers itself at runtime.
static DISPATCH: [Option<Decoder>; 10] = [
    Some(Instruction::Hlt as Decoder),
    Some(Instruction::Add as Decoder),
    Some(Instruction::Sub as Decoder),
    Some(Instruction::Sta as Decoder),
    None,
    Some(Instruction::Lda as Decoder),
    Some(Instruction::Bra as Decoder),
    Some(Instruction::Brz as Decoder),
    Some(Instruction::Brp as Decoder),
    Some(decode_io as Decoder),
];

/// Decode a word into an instruction.
pub fn decode<A: Architecture>(word: Word) -> Instruction {
    let (opcode, operand) = A::split(word);
    let decoder = usize::try_from(opcode)
        .ok()
        .and_then(|index| DISPATCH.get(index))
        .copied()
        .flatten();

    match decoder {
        Some(decoder) => decoder(operand),
        None => Instruction::Invalid { opcode, operand },
    }
}

/// Encode an instruction back to a word.
pub fn encode<A: Architecture>(instr: &Instruction) -> Word {
    A::compose(instr.opcode(), instr.operand())
}

impl Instruction {
    pub fn opcode(&self) -> i64 {
        match self {
            Instruction::Hlt(_) => Opcode::HLT,
            Instruction::Add(_) => Opcode::ADD,
            Instruction::Sub(_) => Opcode::SUB,
            Instruction::Sta(_) => Opcode::STA,
            Instruction::Lda(_) => Opcode::LDA,
            Instruction::Bra(_) => Opcode::BRA,
            Instruction::Brz(_) => Opcode::BRZ,
            Instruction::Brp(_) => Opcode::BRP,
            Instruction::Io(_) => Opcode::IO,
            Instruction::Invalid { opcode, .. } => *opcode,
        }
    }

    pub fn operand(&self) -> u32 {
        match self {
            Instruction::Hlt(operand)
            | Instruction::Add(operand)
            | Instruction::Sub(operand)
            | Instruction::Sta(operand)
            | Instruction::Lda(operand)
            | Instruction::Bra(operand)
            | Instruction::Brz(operand)
            | Instruction::Brp(operand) => *operand,
            Instruction::Io(op) => op.operand(),
            Instruction::Invalid { operand, .. } => *operand,
        }
    }

    /// Encode for architecture `A`.
    pub fn encode<A: Architecture>(&self) -> Word {
        encode::<A>(self)
    }

    /// Whether the machine can execute this at all.
    pub fn is_valid(&self) -> bool {
        match self {
            Instruction::Io(op) => op.is_valid(),
            Instruction::Invalid { .. } => false,
            _ => true,
        }
    }

    /// Operands that make a meaningful instance of this family.
    ///
    /// `None` when every operand is meaningful. Halt is only canonical as
    /// `000`; any other 0xx is far more likely to be a small number.
    pub fn canonical_operands(&self) -> Option<&'static [u32]> {
        match self {
            Instruction::Hlt(_) => Some(&[0]),
            Instruction::Io(_) => Some(&IoOp::CANONICAL),
            _ => None,
        }
    }

    /// Valid, and encoded in one of its canonical forms.
    pub fn is_canonical(&self) -> bool {
        self.is_valid()
            && self
                .canonical_operands()
                .map_or(true, |operands| operands.contains(&self.operand()))
    }

    /// Extension that must be enabled to execute this instruction.
    pub fn extension(&self) -> Option<Extension> {
        match self {
            Instruction::Io(op) => op.extension(),
            _ => None,
        }
    }

    /// Assembly mnemonic, or `None` for words no mnemonic produces.
    pub fn mnemonic(&self) -> Option<&'static str> {
        let name = match self {
            Instruction::Hlt(_) => "HLT",
            Instruction::Add(_) => "ADD",
            Instruction::Sub(_) => "SUB",
            Instruction::Sta(_) => "STA",
            Instruction::Lda(_) => "LDA",
            Instruction::Bra(_) => "BRA",
            Instruction::Brz(_) => "BRZ",
            Instruction::Brp(_) => "BRP",
            Instruction::Io(IoOp::Input) => "INP",
            Instruction::Io(IoOp::Output) => "OUT",
            Instruction::Io(IoOp::OutputChar) => "OTC",
            Instruction::Io(IoOp::Invalid(_)) | Instruction::Invalid { .. } => return None,
        };
        Some(name)
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.mnemonic(), self) {
            (Some(name), Instruction::Hlt(0) | Instruction::Io(_)) => write!(f, "{}", name),
            (Some(name), _) => write!(f, "{} {}", name, self.operand()),
            (None, _) => write!(f, "??? {}:{}", self.opcode(), self.operand()),
        }
    }
}

/// One memory cell as the assembler or disassembler sees it.
///
/// Memory itself cannot tell the two apart; this type keeps the
/// distinction explicit wherever it is known (or guessed).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CodeOrData {
    Code(Instruction),
    Data(Word),
}

impl CodeOrData {
    /// The word stored in memory.
    pub fn encode<A: Architecture>(&self) -> Word {
        match self {
            CodeOrData::Code(instr) => instr.encode::<A>(),
            CodeOrData::Data(value) => *value,
        }
    }
}

impl From<Instruction> for CodeOrData {
    fn from(instr: Instruction) -> Self {
        CodeOrData::Code(instr)
    }
}

impl fmt::Display for CodeOrData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodeOrData::Code(instr) => write!(f, "{}", instr),
            CodeOrData::Data(value) => write!(f, "DAT {}", value),
        }
    }
}
