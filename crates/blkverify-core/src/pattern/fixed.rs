//! Fixed repeating word.
//!
//! The buffer is filled only on the first `fill` after `init_fresh`,
//! `set_seed` or `reset`; later fills leave it untouched. This saves a pass
//! over every chunk but means the caller must not modify the buffer between
//! fills of the same phase. The engine satisfies this: the pattern buffer is
//! only ever read by the device write and by the verify compare.

use super::PatternGenerator;
use crate::word::Word;
use crate::Result;

/// Fills buffers with one repeated value.
#[derive(Debug, Clone)]
pub struct FixedWord<W: Word> {
    value: W,
    filled: bool,
}

impl<W: Word> FixedWord<W> {
    /// Generator for `value`.
    #[must_use]
    pub fn new(value: W) -> Self {
        Self {
            value,
            filled: false,
        }
    }

    /// The repeated value.
    #[must_use]
    pub fn value(&self) -> W {
        self.value
    }

    /// Whether the next `fill` will be skipped.
    #[must_use]
    pub fn is_filled(&self) -> bool {
        self.filled
    }
}

impl<W: Word> PatternGenerator for FixedWord<W> {
    type Word = W;

    fn init_fresh(&mut self) -> Result<()> {
        self.filled = false;
        Ok(())
    }

    /// Replaces the repeated value. Zero is a valid fill.
    fn set_seed(&mut self, seed: u64) -> Result<()> {
        self.value = W::from_u64_lossy(seed);
        self.filled = false;
        Ok(())
    }

    fn reset(&mut self) -> Result<()> {
        self.filled = false;
        Ok(())
    }

    fn fill(&mut self, buf: &mut [W]) {
        if !self.filled {
            buf.fill(self.value);
            self.filled = true;
        }
    }

    fn seed(&self) -> u64 {
        self.value.to_u64()
    }

    fn describe(&self) -> String {
        format!("Sequence {:0width$x}", self.value, width = W::BYTES * 2)
    }
}
