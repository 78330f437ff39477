//! In-memory block device with fault injection.
//!
//! Behaves like a Linux block device at its boundaries: writes starting at
//! or past the end fail with `ENOSPC`, reads there return 0, and transfers
//! straddling the end are short.

use super::BlockIo;
use nix::errno::Errno;
use std::collections::{HashMap, HashSet};

/// Simulated finite block device.
#[derive(Debug, Clone)]
pub struct MemDevice {
    data: Vec<u8>,
    block_size: u64,
    write_faults: HashMap<u64, Errno>,
    read_faults: HashMap<u64, Errno>,
    skipped_reads: HashSet<u64>,
    corruptions: Vec<(u64, u64)>,
    /// Successful and failed write calls.
    pub writes: u64,
    /// Successful and failed read calls.
    pub reads: u64,
    /// `drop_cache` calls.
    pub cache_drops: u64,
    /// `flush` calls.
    pub flushes: u64,
}

impl MemDevice {
    /// A zero-filled device of `size` bytes with the given block size.
    ///
    /// # Panics
    ///
    /// Panics if `block_size` is zero.
    #[must_use]
    pub fn new(size: usize, block_size: u64) -> Self {
        assert!(block_size > 0, "block size must be non-zero");
        Self {
            data: vec![0; size],
            block_size,
            write_faults: HashMap::new(),
            read_faults: HashMap::new(),
            skipped_reads: HashSet::new(),
            corruptions: Vec::new(),
            writes: 0,
            reads: 0,
            cache_drops: 0,
            flushes: 0,
        }
    }

    /// Device size in bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Raw contents.
    #[must_use]
    pub fn contents(&self) -> &[u8] {
        &self.data
    }

    /// Fail every write that starts at `block` with `errno`.
    pub fn fail_write_at(&mut self, block: u64, errno: Errno) -> &mut Self {
        self.write_faults.insert(block, errno);
        self
    }

    /// Fail every read that starts at `block` with `errno`.
    pub fn fail_read_at(&mut self, block: u64, errno: Errno) -> &mut Self {
        self.read_faults.insert(block, errno);
        self
    }

    /// Report every read that starts at `block` as complete without
    /// touching the caller's buffer.
    pub fn skip_read_at(&mut self, block: u64) -> &mut Self {
        self.skipped_reads.insert(block);
        self
    }

    /// XOR the 8 bytes at `byte_offset` with `mask` in the data returned by
    /// any read covering them. Stored contents are not modified.
    pub fn corrupt_read(&mut self, byte_offset: u64, mask: u64) -> &mut Self {
        self.corruptions.push((byte_offset, mask));
        self
    }

    fn span(&self, block: u64, len: usize) -> Option<(usize, usize)> {
        let start = usize::try_from(block.checked_mul(self.block_size)?).ok()?;
        if start >= self.data.len() {
            return None;
        }
        let end = start.saturating_add(len).min(self.data.len());
        Some((start, end))
    }
}

impl BlockIo for MemDevice {
    fn block_size(&self) -> u64 {
        self.block_size
    }

    fn write_blocks(&mut self, block: u64, buf: &[u8]) -> nix::Result<usize> {
        self.writes += 1;
        if let Some(&errno) = self.write_faults.get(&block) {
            return Err(errno);
        }
        let (start, end) = self.span(block, buf.len()).ok_or(Errno::ENOSPC)?;
        let n = end - start;
        self.data[start..end].copy_from_slice(&buf[..n]);
        Ok(n)
    }

    fn read_blocks(&mut self, block: u64, buf: &mut [u8]) -> nix::Result<usize> {
        self.reads += 1;
        if let Some(&errno) = self.read_faults.get(&block) {
            return Err(errno);
        }
        let Some((start, end)) = self.span(block, buf.len()) else {
            return Ok(0);
        };
        let n = end - start;
        if self.skipped_reads.contains(&block) {
            return Ok(n);
        }
        buf[..n].copy_from_slice(&self.data[start..end]);

        for &(offset, mask) in &self.corruptions {
            let Ok(offset) = usize::try_from(offset) else {
                continue;
            };
            if offset >= start && offset + 8 <= end {
                let at = offset - start;
                let mut word = [0u8; 8];
                word.copy_from_slice(&buf[at..at + 8]);
                let flipped = u64::from_ne_bytes(word) ^ mask;
                buf[at..at + 8].copy_from_slice(&flipped.to_ne_bytes());
            }
        }
        Ok(n)
    }

    fn drop_cache(&mut self) {
        self.cache_drops += 1;
    }

    fn flush(&mut self) {
        self.flushes += 1;
    }
}
