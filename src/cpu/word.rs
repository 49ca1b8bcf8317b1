//! Machine words and the architectures that give them meaning.
//!
//! A [`Word`] carries no tag: the same value is an instruction or a plain
//! number depending on who reads it. An [`Architecture`] fixes everything
//! else about the machine:
//! - the number of memory cells
//! - the symmetric value range of a cell and of the accumulator
//! - how an opcode and an operand are packed into one word

/// A memory cell, accumulator value or encoded instruction.
///
/// Wide enough to hold any value of either architecture plus the
/// unwrapped results of arithmetic when value wrapping is turned off.
pub type Word = i64;

/// A fixed machine layout.
///
/// Everything here is a compile-time constant: a machine never changes its
/// memory size or value range at runtime.
pub trait Architecture {
    /// Human readable name, used in snapshots and CLI output.
    const NAME: &'static str;

    /// Number of memory cells.
    const MEMORY_SIZE: usize;

    /// Smallest storable value.
    const MIN_VALUE: Word;

    /// Largest storable value.
    const MAX_VALUE: Word;

    /// Exclusive upper bound of the operand field.
    const OPERAND_LIMIT: u32;

    /// Period of the wraparound applied to out-of-range values.
    const WRAP_MODULUS: i128;

    /// Pack an opcode and operand into a word.
    fn compose(opcode: i64, operand: u32) -> Word;

    /// Split a word into `(opcode, operand)`. Inverse of [`compose`](Self::compose).
    fn split(word: Word) -> (i64, u32);

    /// Whether `value` lies inside `MIN_VALUE..=MAX_VALUE`.
    #[inline]
    fn in_range(value: Word) -> bool {
        (Self::MIN_VALUE..=Self::MAX_VALUE).contains(&value)
    }

    /// Bring `value` back into the value range.
    ///
    /// In-range values are returned unchanged. Anything else is reduced
    /// modulo [`WRAP_MODULUS`](Self::WRAP_MODULUS) into the range. The
    /// result is always in range, which makes the operation idempotent.
    fn wrap_value(value: Word) -> Word {
        if Self::in_range(value) {
            return value;
        }
        let min = i128::from(Self::MIN_VALUE);
        let wrapped = (i128::from(value) - min).rem_euclid(Self::WRAP_MODULUS) + min;
        // The result lies between MIN_VALUE and MAX_VALUE, both of which are Words.
        wrapped as Word
    }
}

/// The classic three-digit decimal machine.
///
/// 100 cells holding -999..=999; an instruction is `opcode * 100 + operand`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Decimal;

impl Architecture for Decimal {
    const NAME: &'static str = "decimal";
    const MEMORY_SIZE: usize = 100;
    const MIN_VALUE: Word = -999;
    const MAX_VALUE: Word = 999;
    const OPERAND_LIMIT: u32 = 100;
    // 1000 -> -998, -1000 -> 998
    const WRAP_MODULUS: i128 = 1998;

    #[inline]
    fn compose(opcode: i64, operand: u32) -> Word {
        opcode * 100 + Word::from(operand)
    }

    #[inline]
    fn split(word: Word) -> (i64, u32) {
        // rem_euclid(100) is always in 0..100
        (word.div_euclid(100), word.rem_euclid(100) as u32)
    }
}

/// The wide binary machine.
///
/// 65 536 cells holding 32-bit signed values; an instruction keeps its
/// opcode in the bits above bit 27 and its operand in the 27 bits below.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Binary;

impl Binary {
    /// Position of the opcode field.
    pub const OPCODE_SHIFT: u32 = 27;

    /// Mask selecting the operand field.
    pub const OPERAND_MASK: Word = (1 << Self::OPCODE_SHIFT) - 1;
}

impl Architecture for Binary {
    const NAME: &'static str = "binary";
    const MEMORY_SIZE: usize = 1 << 16;
    const MIN_VALUE: Word = i32::MIN as Word;
    const MAX_VALUE: Word = i32::MAX as Word;
    const OPERAND_LIMIT: u32 = 1 << Binary::OPCODE_SHIFT;
    // Two's complement: i32::MAX + 1 -> i32::MIN
    const WRAP_MODULUS: i128 = 1 << 32;

    #[inline]
    fn compose(opcode: i64, operand: u32) -> Word {
        (opcode << Self::OPCODE_SHIFT) + Word::from(operand)
    }

    #[inline]
    fn split(word: Word) -> (i64, u32) {
        // The mask keeps 27 bits, which always fit in a u32
        (word >> Self::OPCODE_SHIFT, (word & Self::OPERAND_MASK) as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_decimal_wrap_edges() {
        assert_eq!(Decimal::wrap_value(1000), -998);
        assert_eq!(Decimal::wrap_value(-1000), 998);
        assert_eq!(Decimal::wrap_value(999), 999);
        assert_eq!(Decimal::wrap_value(-999), -999);
        assert_eq!(Decimal::wrap_value(0), 0);
    }

    #[test]
    fn test_decimal_wrap_far_out_of_range() {
        assert_eq!(Decimal::wrap_value(1998), 0);
        assert_eq!(Decimal::wrap_value(i64::MAX), Decimal::wrap_value(i64::MAX));
        assert!(Decimal::in_range(Decimal::wrap_value(i64::MIN)));
    }

    #[test]
    fn test_binary_wrap_is_twos_complement() {
        let max = Word::from(i32::MAX);
        let min = Word::from(i32::MIN);
        assert_eq!(Binary::wrap_value(max + 1), min);
        assert_eq!(Binary::wrap_value(min - 1), max);
        assert_eq!(Binary::wrap_value(2 * max), -2);
        assert_eq!(Binary::wrap_value(max), max);
        assert_eq!(Binary::wrap_value(min), min);
    }

    #[test]
    fn test_decimal_split() {
        assert_eq!(Decimal::split(901), (9, 1));
        assert_eq!(Decimal::split(0), (0, 0));
        // Negative numbers land on a negative opcode, never on a real one
        assert_eq!(Decimal::split(-5), (-1, 95));
        assert_eq!(Decimal::compose(-1, 95), -5);
    }

    #[test]
    fn test_binary_split() {
        let word = Binary::compose(9, 22);
        assert_eq!(word, 9 * (1 << 27) + 22);
        assert_eq!(Binary::split(word), (9, 22));
        assert_eq!(Binary::split(-1).0, -1);
    }

    proptest! {
        #[test]
        fn prop_decimal_wrap_idempotent(value in any::<i64>()) {
            let once = Decimal::wrap_value(value);
            prop_assert!(Decimal::in_range(once));
            prop_assert_eq!(Decimal::wrap_value(once), once);
        }

        #[test]
        fn prop_binary_wrap_idempotent(value in any::<i64>()) {
            let once = Binary::wrap_value(value);
            prop_assert!(Binary::in_range(once));
            prop_assert_eq!(Binary::wrap_value(once), once);
        }

        #[test]
        fn prop_binary_wrap_matches_i32_cast(value in any::<i64>()) {
            prop_assert_eq!(Binary::wrap_value(value), Word::from(value as i32));
        }

        #[test]
        fn prop_decimal_split_inverts_compose(word in -99_999i64..99_999) {
            let (opcode, operand) = Decimal::split(word);
            prop_assert_eq!(Decimal::compose(opcode, operand), word);
        }

        #[test]
        fn prop_binary_split_inverts_compose(word in any::<i32>()) {
            let word = Word::from(word);
            let (opcode, operand) = Binary::split(word);
            prop_assert_eq!(Binary::compose(opcode, operand), word);
        }
    }
}
