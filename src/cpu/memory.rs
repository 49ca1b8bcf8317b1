//! LMC memory subsystem.
//!
//! A fixed number of word cells, indexed from 0. The size is set when the
//! memory is built and never changes afterwards.

use crate::cpu::word::Word;
use serde::{Serialize, Deserialize};
use thiserror::Error;

/// Fixed-length word memory.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Memory {
    cells: Vec<Word>,
}

impl Memory {
    /// Create a memory of `size` zeroed cells.
    pub fn new(size: usize) -> Self {
        Self {
            cells: vec![0; size],
        }
    }

    /// Create a memory of `size` cells holding `image` followed by zeros.
    pub fn with_image(image: &[Word], size: usize) -> Result<Self, MemoryError> {
        let mut mem = Self::new(size);
        mem.load_image(image)?;
        Ok(mem)
    }

    /// Number of cells.
    #[inline]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Read a cell by index.
    ///
    /// # Panics
    /// Panics if index is out of range. Callers normalize addresses first.
    #[inline]
    pub fn read(&self, index: usize) -> Word {
        assert!(index < self.len(), "Memory index {} out of range (0-{})", index, self.len() - 1);
        self.cells[index]
    }

    /// Write a cell by index.
    ///
    /// # Panics
    /// Panics if index is out of range. Callers normalize addresses first.
    #[inline]
    pub fn write(&mut self, index: usize, value: Word) {
        assert!(index < self.len(), "Memory index {} out of range (0-{})", index, self.len() - 1);
        self.cells[index] = value;
    }

    /// All cells in address order.
    pub fn cells(&self) -> &[Word] {
        &self.cells
    }

    /// Replace the contents with `image`, zero-filling the remainder.
    pub fn load_image(&mut self, image: &[Word]) -> Result<(), MemoryError> {
        if image.len() > self.len() {
            return Err(MemoryError::ImageTooLarge {
                size: image.len(),
                capacity: self.len(),
            });
        }

        self.cells[..image.len()].copy_from_slice(image);
        self.cells[image.len()..].fill(0);
        Ok(())
    }

    /// Dump memory contents (for debugging).
    pub fn dump(&self, start: usize, count: usize) -> Vec<(usize, Word)> {
        let end = start.saturating_add(count).min(self.len());
        (start.min(end)..end)
            .map(|i| (i, self.cells[i]))
            .collect()
    }
}

impl std::fmt::Debug for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Only count non-zero cells
        let non_zero = self.cells.iter().filter(|&&cell| cell != 0).count();

        f.debug_struct("Memory")
            .field("non_zero_cells", &non_zero)
            .field("total_cells", &self.len())
            .finish()
    }
}

/// Errors that can occur while setting up memory.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryError {
    /// The initial image has more words than the machine has cells.
    #[error("memory image of {size} words doesn't fit in the {capacity}-word memory")]
    ImageTooLarge { size: usize, capacity: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_read_write() {
        let mut mem = Memory::new(100);
        mem.write(10, 42);
        assert_eq!(mem.read(10), 42);
        assert_eq!(mem.len(), 100);
    }

    #[test]
    fn test_image_is_zero_padded() {
        let mem = Memory::with_image(&[901, 902, 0], 100).unwrap();
        assert_eq!(mem.read(0), 901);
        assert_eq!(mem.read(1), 902);
        assert!(mem.cells()[2..].iter().all(|&cell| cell == 0));
        assert_eq!(mem.len(), 100);
    }

    #[test]
    fn test_image_too_large() {
        let image = vec![1; 101];
        assert_eq!(
            Memory::with_image(&image, 100),
            Err(MemoryError::ImageTooLarge { size: 101, capacity: 100 })
        );
    }

    #[test]
    fn test_image_exact_fit() {
        let image = vec![7; 100];
        let mem = Memory::with_image(&image, 100).unwrap();
        assert_eq!(mem.read(99), 7);
    }

    #[test]
    fn test_reload_clears_tail() {
        let mut mem = Memory::with_image(&[1, 2, 3], 10).unwrap();
        mem.load_image(&[9]).unwrap();
        assert_eq!(mem.dump(0, 3), vec![(0, 9), (1, 0), (2, 0)]);
    }

    #[test]
    #[should_panic]
    fn test_read_out_of_range_panics() {
        Memory::new(100).read(100);
    }
}
