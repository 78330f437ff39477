//! Block device access.
//!
//! [`BlockIo`] is the seam between the engine and the storage under test:
//! [`RawDevice`] talks to a real block device, [`MemDevice`] simulates one
//! in memory with fault injection.

mod mem;
mod raw;

pub use mem::MemDevice;
pub use raw::RawDevice;

use std::path::PathBuf;

/// How to open a device. Immutable once the device is open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceConfig {
    /// Device path, e.g. `/dev/sdb`.
    pub path: PathBuf,
    /// Open with `O_SYNC | O_RSYNC`.
    pub sync_io: bool,
    /// Open with `O_DIRECT`.
    pub direct_io: bool,
}

impl DeviceConfig {
    /// Synchronous direct I/O on `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            sync_io: true,
            direct_io: true,
        }
    }

    /// Set synchronous I/O.
    #[must_use]
    pub fn sync_io(mut self, enabled: bool) -> Self {
        self.sync_io = enabled;
        self
    }

    /// Set direct I/O.
    #[must_use]
    pub fn direct_io(mut self, enabled: bool) -> Self {
        self.direct_io = enabled;
        self
    }
}

/// Block-indexed positioned I/O.
///
/// Addresses are block indices; the byte offset is always
/// `block * block_size()`. Transfers are not retried: a result smaller than
/// the buffer is a short transfer and an `Err` carries the OS error code.
pub trait BlockIo {
    /// Physical block size in bytes, always non-zero.
    fn block_size(&self) -> u64;

    /// Write `buf` starting at block `block`.
    ///
    /// # Errors
    ///
    /// Returns the OS error code of a failed transfer.
    fn write_blocks(&mut self, block: u64, buf: &[u8]) -> nix::Result<usize>;

    /// Read into `buf` starting at block `block`.
    ///
    /// # Errors
    ///
    /// Returns the OS error code of a failed transfer.
    fn read_blocks(&mut self, block: u64, buf: &mut [u8]) -> nix::Result<usize>;

    /// Hint that cached pages of this device may be discarded. Best effort.
    fn drop_cache(&mut self);

    /// Flush written data to stable storage. Best effort.
    fn flush(&mut self);
}
