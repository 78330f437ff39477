//! Xorshift64 and Xorshift64* (Marsaglia shift-mix, 13/7/17 triple).

use super::{entropy_seed, PatternGenerator};
use crate::{Error, Result};

const STAR_MULTIPLIER: u64 = 0x2545_f491_4f6c_dd1d;

/// Xorshift64 generator, optionally with multiplicative output scrambling.
#[derive(Debug, Clone)]
pub struct Xorshift64 {
    seed: u64,
    state: u64,
    scrambled: bool,
}

impl Xorshift64 {
    /// Unseeded generator. `scrambled` selects Xorshift64*.
    #[must_use]
    pub const fn new(scrambled: bool) -> Self {
        Self {
            seed: 0,
            state: 0,
            scrambled,
        }
    }

    /// Next output word.
    #[inline]
    pub fn next_word(&mut self) -> u64 {
        let mut v = self.state;
        v ^= v << 13;
        v ^= v >> 7;
        v ^= v << 17;
        self.state = v;
        if self.scrambled {
            v.wrapping_mul(STAR_MULTIPLIER)
        } else {
            v
        }
    }
}

impl PatternGenerator for Xorshift64 {
    type Word = u64;

    fn init_fresh(&mut self) -> Result<()> {
        let seed = entropy_seed()?;
        self.set_seed(seed)
    }

    fn set_seed(&mut self, seed: u64) -> Result<()> {
        if seed == 0 {
            return Err(Error::ZeroSeed);
        }
        self.seed = seed;
        self.state = seed;
        Ok(())
    }

    fn reset(&mut self) -> Result<()> {
        self.set_seed(self.seed)
    }

    fn fill(&mut self, buf: &mut [u64]) {
        for w in buf {
            *w = self.next_word();
        }
    }

    fn seed(&self) -> u64 {
        self.seed
    }

    fn describe(&self) -> String {
        let name = if self.scrambled { "Xorshift64*" } else { "Xorshift64" };
        format!("Random {:016x} ({name})", self.seed)
    }
}
