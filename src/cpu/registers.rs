//! LMC CPU registers.
//!
//! The LMC has three registers:
//! - ACC: the accumulator (the only arithmetic register)
//! - IP: the instruction pointer, index of the next word to fetch
//! - CIR: the current instruction register, the word fetched last

use crate::cpu::word::Word;
use serde::{Serialize, Deserialize};

/// The LMC register file.
///
/// Fields are stored raw; value normalization happens in the machine that
/// owns them.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registers {
    /// ACC: accumulator
    pub acc: Word,

    /// IP: instruction pointer (may point one past the end until the next fetch)
    pub ip: usize,

    /// CIR: last fetched word, `None` before the first fetch
    pub cir: Option<Word>,
}

impl Registers {
    /// Create a new register file with all values zeroed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset all registers to zero.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Increment the instruction pointer by 1.
    /// Returns the old value.
    pub fn advance_ip(&mut self) -> usize {
        let old = self.ip;
        self.ip = self.ip.saturating_add(1);
        old
    }

    /// Set the instruction pointer to an absolute address.
    pub fn jump(&mut self, addr: usize) {
        self.ip = addr;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_ip() {
        let mut regs = Registers::new();
        regs.ip = 10;

        let old = regs.advance_ip();
        assert_eq!(old, 10);
        assert_eq!(regs.ip, 11);
    }

    #[test]
    fn test_reset() {
        let mut regs = Registers { acc: 5, ip: 7, cir: Some(901) };
        regs.reset();
        assert_eq!(regs, Registers::new());
    }
}
