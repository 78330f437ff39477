//! Deterministic pattern generators.
//!
//! A generator turns a seed into an endless word stream. The write phase
//! consumes it once; after [`PatternGenerator::reset`] the read phase
//! consumes the identical stream again to know what the device should hold.
//!
//! # Example
//!
//! ```
//! use blkverify_core::pattern::{Algorithm, Generator, PatternGenerator};
//!
//! let mut gen = Generator::random(Algorithm::ChaCha20);
//! gen.set_seed(0x1234).unwrap();
//!
//! let mut first = [0u64; 32];
//! gen.fill(&mut first);
//! gen.reset().unwrap();
//!
//! let mut again = [0u64; 32];
//! gen.fill(&mut again);
//! assert_eq!(first, again);
//! ```

mod chacha;
mod fixed;
mod xorshift;

pub use chacha::{ChaCha, ChaCha12, ChaCha20, ChaCha8, Keystream};
pub use fixed::FixedWord;
pub use xorshift::Xorshift64;

use crate::word::Word;
use crate::{Error, Result};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::Serialize;

/// Capability shared by all pattern generators.
pub trait PatternGenerator {
    /// Word type produced.
    type Word: Word;

    /// Pick a new non-zero seed from the OS entropy source and start over.
    ///
    /// # Errors
    ///
    /// [`Error::Entropy`] if the entropy source fails.
    fn init_fresh(&mut self) -> Result<()>;

    /// Start over from `seed`.
    ///
    /// # Errors
    ///
    /// [`Error::ZeroSeed`] if the generator cannot run from this seed.
    fn set_seed(&mut self, seed: u64) -> Result<()>;

    /// Rewind to the state right after the last `set_seed`/`init_fresh`.
    /// The seed is unchanged.
    ///
    /// # Errors
    ///
    /// [`Error::ZeroSeed`] if the generator was never seeded.
    fn reset(&mut self) -> Result<()>;

    /// Fill `buf` with the next `buf.len()` words.
    fn fill(&mut self, buf: &mut [Self::Word]);

    /// Current seed.
    fn seed(&self) -> u64;

    /// Human-readable job name, e.g. `Random 00000000deadbeef (ChaCha20)`.
    fn describe(&self) -> String;
}

/// Pseudo-random algorithm choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Algorithm {
    /// Xorshift64 shift-mix.
    Xorshift64,
    /// Xorshift64 with multiplicative output scrambling.
    Xorshift64Star,
    /// ChaCha keystream, 8 rounds.
    ChaCha8,
    /// ChaCha keystream, 12 rounds.
    ChaCha12,
    /// ChaCha keystream, 20 rounds.
    #[default]
    ChaCha20,
}

impl Algorithm {
    /// Display name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Xorshift64 => "Xorshift64",
            Self::Xorshift64Star => "Xorshift64*",
            Self::ChaCha8 => "ChaCha8",
            Self::ChaCha12 => "ChaCha12",
            Self::ChaCha20 => "ChaCha20",
        }
    }

    /// Every algorithm.
    #[must_use]
    pub const fn all() -> &'static [Algorithm] {
        &[
            Self::Xorshift64,
            Self::Xorshift64Star,
            Self::ChaCha8,
            Self::ChaCha12,
            Self::ChaCha20,
        ]
    }
}

impl std::fmt::Display for Algorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Any generator a job can run with.
#[derive(Debug, Clone)]
pub enum Generator {
    /// Xorshift64 or Xorshift64*.
    Xorshift(Xorshift64),
    /// 8-round keystream.
    ChaCha8(ChaCha8),
    /// 12-round keystream.
    ChaCha12(ChaCha12),
    /// 20-round keystream.
    ChaCha20(ChaCha20),
    /// One repeated word.
    Fixed(FixedWord<u64>),
}

impl Generator {
    /// An unseeded pseudo-random generator.
    #[must_use]
    pub fn random(algorithm: Algorithm) -> Self {
        match algorithm {
            Algorithm::Xorshift64 => Self::Xorshift(Xorshift64::new(false)),
            Algorithm::Xorshift64Star => Self::Xorshift(Xorshift64::new(true)),
            Algorithm::ChaCha8 => Self::ChaCha8(ChaCha::new()),
            Algorithm::ChaCha12 => Self::ChaCha12(ChaCha::new()),
            Algorithm::ChaCha20 => Self::ChaCha20(ChaCha::new()),
        }
    }

    /// A fixed-word generator.
    #[must_use]
    pub fn fixed(value: u64) -> Self {
        Self::Fixed(FixedWord::new(value))
    }

    fn inner(&self) -> &dyn PatternGenerator<Word = u64> {
        match self {
            Self::Xorshift(g) => g,
            Self::ChaCha8(g) => g,
            Self::ChaCha12(g) => g,
            Self::ChaCha20(g) => g,
            Self::Fixed(g) => g,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn PatternGenerator<Word = u64> {
        match self {
            Self::Xorshift(g) => g,
            Self::ChaCha8(g) => g,
            Self::ChaCha12(g) => g,
            Self::ChaCha20(g) => g,
            Self::Fixed(g) => g,
        }
    }
}

impl PatternGenerator for Generator {
    type Word = u64;

    fn init_fresh(&mut self) -> Result<()> {
        self.inner_mut().init_fresh()
    }

    fn set_seed(&mut self, seed: u64) -> Result<()> {
        self.inner_mut().set_seed(seed)
    }

    fn reset(&mut self) -> Result<()> {
        self.inner_mut().reset()
    }

    fn fill(&mut self, buf: &mut [u64]) {
        self.inner_mut().fill(buf);
    }

    fn seed(&self) -> u64 {
        self.inner().seed()
    }

    fn describe(&self) -> String {
        self.inner().describe()
    }
}

/// A non-zero seed from the OS entropy source.
///
/// # Errors
///
/// [`Error::Entropy`] if the entropy source fails.
pub fn entropy_seed() -> Result<u64> {
    loop {
        let mut bytes = [0u8; 8];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| Error::Entropy(e.to_string()))?;
        let seed = u64::from_ne_bytes(bytes);
        if seed != 0 {
            return Ok(seed);
        }
    }
}
