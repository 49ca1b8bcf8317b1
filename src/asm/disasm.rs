//! Best-effort disassembler for LMC memory images.
//!
//! Memory does not record which cells are code and which are data, so
//! everything here is a guess. The guess is good for programs whose data
//! values stay below 100, and nothing more is promised: use it for
//! listings and debugging, never to reconstruct a program exactly.

use crate::cpu::decode::{decode, CodeOrData};
use crate::cpu::word::{Architecture, Word};

/// Guess whether `word` was written as an instruction or as data.
///
/// Words that do not decode to a valid instruction are data. Valid
/// instructions whose family has canonical forms (`HLT` is only `000`,
/// I/O only `901`, `902`, `922`) are data unless they are in one of those
/// forms, so a cell holding `7` reads as `DAT 7` rather than `HLT 7`.
pub fn decode_best_effort<A: Architecture>(word: Word) -> CodeOrData {
    let instr = decode::<A>(word);
    if instr.is_canonical() {
        CodeOrData::Code(instr)
    } else {
        CodeOrData::Data(word)
    }
}

/// Guess the instruction/data list a memory image was assembled from.
pub fn memory_to_items<A: Architecture>(memory: &[Word]) -> Vec<CodeOrData> {
    memory.iter().map(|&word| decode_best_effort::<A>(word)).collect()
}

/// Disassemble a single word to text.
pub fn disassemble_word<A: Architecture>(word: Word) -> String {
    decode_best_effort::<A>(word).to_string()
}

/// Disassemble a memory image into an assembly listing.
///
/// Trailing zero cells are left out. Every line carries its address and
/// raw word as a comment, so the listing assembles back to the same image
/// as long as no guess was wrong.
pub fn disassemble<A: Architecture>(memory: &[Word]) -> String {
    let used = memory.iter().rposition(|&word| word != 0).map_or(0, |last| last + 1);

    let mut output = String::new();
    output.push_str(&format!("// LMC disassembly ({} machine)\n", A::NAME));
    output.push_str("// best effort: code and data may be confused\n\n");

    for (addr, &word) in memory[..used].iter().enumerate() {
        let text = disassemble_word::<A>(word);
        output.push_str(&format!("    {:<12} // {:03}: {}\n", text, addr, word));
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asm::assemble;
    use crate::config::Config;
    use crate::cpu::decode::{Instruction, IoOp};
    use crate::cpu::word::{Binary, Decimal};

    #[test]
    fn test_canonical_words_are_code() {
        assert_eq!(decode_best_effort::<Decimal>(0), CodeOrData::Code(Instruction::Hlt(0)));
        assert_eq!(
            decode_best_effort::<Decimal>(922),
            CodeOrData::Code(Instruction::Io(IoOp::OutputChar))
        );
        assert_eq!(decode_best_effort::<Decimal>(512), CodeOrData::Code(Instruction::Lda(12)));
    }

    #[test]
    fn test_small_numbers_are_data() {
        assert_eq!(decode_best_effort::<Decimal>(7), CodeOrData::Data(7));
        assert_eq!(decode_best_effort::<Decimal>(950), CodeOrData::Data(950));
        assert_eq!(decode_best_effort::<Decimal>(404), CodeOrData::Data(404));
        assert_eq!(decode_best_effort::<Decimal>(-3), CodeOrData::Data(-3));
    }

    #[test]
    fn test_guess_can_be_wrong() {
        // `DAT 105` is indistinguishable from `ADD 5`
        assert_eq!(decode_best_effort::<Decimal>(105), CodeOrData::Code(Instruction::Add(5)));
    }

    #[test]
    fn test_memory_to_items() {
        let program = assemble::<Decimal>("INP\nADD one\nOUT\nHLT\none DAT 1", &Config::default())
            .unwrap();
        assert_eq!(memory_to_items::<Decimal>(&program.image), program.items);
    }

    #[test]
    fn test_disassemble_listing() {
        let listing = disassemble::<Decimal>(&[901, 902, 0, 42, 0, 0]);
        let lines: Vec<&str> = listing.lines().filter(|line| !line.starts_with("//")).collect();
        assert_eq!(lines.iter().filter(|line| !line.is_empty()).count(), 4);
        assert!(listing.contains("INP"));
        assert!(listing.contains("DAT 42"));
        assert!(listing.contains("// 003: 42"));
    }

    #[test]
    fn test_listing_reassembles() {
        let image = vec![901, 308, 901, 208, 705, 902, 0, 0, 0];
        let listing = disassemble::<Decimal>(&image);
        let program = assemble::<Decimal>(&listing, &Config::default()).unwrap();
        assert_eq!(program.image, image[..6].to_vec());
    }

    #[test]
    fn test_binary_disassembly() {
        let word = (1 << 27) + 70_000;
        assert_eq!(disassemble_word::<Binary>(word), "ADD 70000");
        assert_eq!(disassemble_word::<Binary>(123), "DAT 123");
    }
}
