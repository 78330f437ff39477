//! Pattern word types.
//!
//! The engine compares device contents one word at a time. Random
//! generators emit `u64`; fixed fills may use any [`Word`].

use std::fmt;

/// A fixed-width unsigned word that pattern buffers are made of.
pub trait Word: Copy + Eq + Default + fmt::Debug + fmt::LowerHex + Send + 'static {
    /// Width in bytes.
    const BYTES: usize;

    /// Sentinel stored at word `index` of the read buffer before every read,
    /// so that words the read never touched do not look like valid zeros.
    fn poison(index: usize) -> Self;

    /// Widen to `u64` for error records.
    fn to_u64(self) -> u64;

    /// Narrow from `u64`, keeping the low bits.
    fn from_u64_lossy(v: u64) -> Self;
}

impl Word for u64 {
    const BYTES: usize = 8;

    #[inline]
    fn poison(index: usize) -> Self {
        (index as u64 & 0x000f_ffff_ffff_ffff) | (0xbad << 52)
    }

    #[inline]
    fn to_u64(self) -> u64 {
        self
    }

    #[inline]
    fn from_u64_lossy(v: u64) -> Self {
        v
    }
}

impl Word for u32 {
    const BYTES: usize = 4;

    #[inline]
    #[allow(clippy::cast_possible_truncation)]
    fn poison(index: usize) -> Self {
        (index as u32 & 0x000f_ffff) | (0xbad << 20)
    }

    #[inline]
    fn to_u64(self) -> u64 {
        u64::from(self)
    }

    #[inline]
    #[allow(clippy::cast_possible_truncation)]
    fn from_u64_lossy(v: u64) -> Self {
        v as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poison_u64_tagged() {
        assert_eq!(u64::poison(0), 0xbad0_0000_0000_0000);
        assert_eq!(u64::poison(7), 0xbad0_0000_0000_0007);
    }

    #[test]
    fn test_poison_u32_tagged() {
        assert_eq!(u32::poison(0x12), 0xbad0_0012);
    }

    #[test]
    fn test_from_u64_lossy_keeps_low_bits() {
        assert_eq!(u32::from_u64_lossy(0x1122_3344_5566_7788), 0x5566_7788);
        assert_eq!(u64::from_u64_lossy(0x1122_3344_5566_7788), 0x1122_3344_5566_7788);
    }

    #[test]
    fn test_byte_widths() {
        assert_eq!(<u64 as Word>::BYTES, std::mem::size_of::<u64>());
        assert_eq!(<u32 as Word>::BYTES, std::mem::size_of::<u32>());
    }
}
