//! ChaCha keystream generator.
//!
//! The keystream comes from `rand_chacha` with the usual ChaCha layout: the
//! "expand 32-byte k" constant, a fixed 256-bit key, a 64-bit block counter
//! (words 12-13) and the seed as the stream id (words 14-15). The key is
//! public; the cipher is only used to stretch the seed into a well-mixed
//! stream.

use super::{entropy_seed, PatternGenerator};
use crate::{Error, Result};
use rand::{RngCore, SeedableRng};
use rand_chacha::{ChaCha12Rng, ChaCha20Rng, ChaCha8Rng};
use std::fmt;

const KEY: [u32; 8] = [
    0x618e_5212,
    0xc306_369f,
    0xb2a2_a253,
    0xa221_b269,
    0xb198_2d1d,
    0x32e1_fb58,
    0x83af_9d17,
    0x5fc5_f171,
];

fn key_bytes() -> [u8; 32] {
    let mut out = [0u8; 32];
    for (dst, word) in out.chunks_exact_mut(4).zip(KEY) {
        dst.copy_from_slice(&word.to_le_bytes());
    }
    out
}

/// A ChaCha keystream with a fixed round count.
pub trait Keystream: RngCore + SeedableRng<Seed = [u8; 32]> + Clone + fmt::Debug {
    /// Double rounds times two.
    const ROUNDS: usize;

    /// Select the stream (words 14-15).
    fn set_stream(&mut self, stream: u64);

    /// Current stream.
    fn get_stream(&self) -> u64;

    /// Seek to a 32-bit word position in the stream.
    fn set_word_pos(&mut self, pos: u128);

    /// Current 32-bit word position.
    fn get_word_pos(&self) -> u128;
}

macro_rules! keystream {
    ($rng:ty, $rounds:expr) => {
        impl Keystream for $rng {
            const ROUNDS: usize = $rounds;

            fn set_stream(&mut self, stream: u64) {
                <$rng>::set_stream(self, stream);
            }

            fn get_stream(&self) -> u64 {
                <$rng>::get_stream(self)
            }

            fn set_word_pos(&mut self, pos: u128) {
                <$rng>::set_word_pos(self, pos);
            }

            fn get_word_pos(&self) -> u128 {
                <$rng>::get_word_pos(self)
            }
        }
    };
}

keystream!(ChaCha8Rng, 8);
keystream!(ChaCha12Rng, 12);
keystream!(ChaCha20Rng, 20);

/// ChaCha pattern generator over keystream `R`.
#[derive(Debug, Clone)]
pub struct ChaCha<R: Keystream> {
    seed: u64,
    rng: R,
}

/// 8-round variant.
pub type ChaCha8 = ChaCha<ChaCha8Rng>;
/// 12-round variant.
pub type ChaCha12 = ChaCha<ChaCha12Rng>;
/// 20-round variant.
pub type ChaCha20 = ChaCha<ChaCha20Rng>;

impl<R: Keystream> ChaCha<R> {
    /// Unseeded generator.
    #[must_use]
    pub fn new() -> Self {
        Self {
            seed: 0,
            rng: R::from_seed(key_bytes()),
        }
    }

    /// Next output word: two keystream words, low word first.
    #[inline]
    pub fn next_word(&mut self) -> u64 {
        self.rng.next_u64()
    }
}

impl<R: Keystream> Default for ChaCha<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Keystream> PatternGenerator for ChaCha<R> {
    type Word = u64;

    fn init_fresh(&mut self) -> Result<()> {
        let seed = entropy_seed()?;
        self.set_seed(seed)
    }

    fn set_seed(&mut self, seed: u64) -> Result<()> {
        if seed == 0 {
            return Err(Error::ZeroSeed);
        }
        self.rng.set_stream(seed);
        self.rng.set_word_pos(0);
        self.seed = seed;
        Ok(())
    }

    fn reset(&mut self) -> Result<()> {
        self.set_seed(self.seed)
    }

    fn fill(&mut self, buf: &mut [u64]) {
        for w in buf {
            *w = self.rng.next_u64();
        }
    }

    fn seed(&self) -> u64 {
        self.seed
    }

    fn describe(&self) -> String {
        format!("Random {:016x} (ChaCha{})", self.seed, R::ROUNDS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEED: u64 = 0x0123_4567_89ab_cdef;

    fn first_16<R: Keystream>() -> [u64; 16] {
        let mut g = ChaCha::<R>::new();
        g.set_seed(SEED).unwrap();
        let mut out = [0u64; 16];
        g.fill(&mut out);
        out
    }

    #[test]
    fn test_key_bytes_little_endian() {
        let key = key_bytes();
        assert_eq!(key[..4], [0x12, 0x52, 0x8e, 0x61]);
        assert_eq!(key[28..], [0x71, 0xf1, 0xc5, 0x5f]);
    }

    #[test]
    fn test_rfc8439_block_function() {
        // RFC 8439 section 2.3.2: key 00..1f, counter 1, nonce 09000000:4a000000:0.
        let mut key = [0u8; 32];
        for (i, b) in key.iter_mut().enumerate() {
            *b = i as u8;
        }
        let mut rng = ChaCha20Rng::from_seed(key);
        rng.set_stream(0x4a00_0000);
        rng.set_word_pos(((0x0900_0000_u128 << 32) | 1) << 4);
        assert_eq!(rng.next_u32(), 0xe4e7_f110);
        for _ in 1..15 {
            rng.next_u32();
        }
        assert_eq!(rng.next_u32(), 0x4e3c_50a2);
    }

    #[test]
    fn test_reference_vector_chacha20() {
        let out = first_16::<ChaCha20Rng>();
        assert_eq!(out[0], 0xfa1a_2dab_8d6e_d49e);
        assert_eq!(out[1], 0xe1da_b07e_5909_e822);
        assert_eq!(out[7], 0x92a7_eef3_e71a_8873);
        assert_eq!(out[8], 0x3ae5_a911_9a60_2eef);
        assert_eq!(out[15], 0x31e0_1e96_56e4_f688);
    }

    #[test]
    fn test_reference_vector_chacha8() {
        let out = first_16::<ChaCha8Rng>();
        assert_eq!(out[0], 0x7f89_3f2c_12a2_d80a);
        assert_eq!(out[15], 0x68f2_d2a2_7de9_8a59);
    }

    #[test]
    fn test_reset_mid_block_restarts_stream() {
        let mut g = ChaCha12::new();
        g.set_seed(SEED).unwrap();
        let mut a = [0u64; 3];
        g.fill(&mut a);
        g.reset().unwrap();
        let mut b = [0u64; 3];
        g.fill(&mut b);
        assert_eq!(a, b);
        assert_eq!(a[0], 0x07a8_1d66_ff31_f800);
    }

    #[test]
    fn test_word_position_advances_two_per_output() {
        let mut g = ChaCha8::new();
        g.set_seed(SEED).unwrap();
        let mut out = [0u64; 17];
        g.fill(&mut out);
        assert_eq!(g.rng.get_word_pos(), 34);
    }

    #[test]
    fn test_seed_is_stream_id() {
        let mut g = ChaCha20::new();
        g.set_seed(SEED).unwrap();
        assert_eq!(g.rng.get_stream(), SEED);
        assert_eq!(g.describe(), "Random 0123456789abcdef (ChaCha20)");
    }

    #[test]
    fn test_zero_seed_rejected() {
        let mut g = ChaCha20::new();
        assert!(matches!(g.set_seed(0), Err(Error::ZeroSeed)));
        assert!(matches!(g.reset(), Err(Error::ZeroSeed)));
    }
}
