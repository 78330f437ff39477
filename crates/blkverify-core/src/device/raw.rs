//! Raw block device backed by a file descriptor.

use super::{BlockIo, DeviceConfig};
use crate::{Error, Result};
use nix::errno::Errno;
use nix::fcntl::{posix_fadvise, PosixFadviseAdvice};
use nix::sys::uio::{pread, pwrite};
use std::fs::{File, OpenOptions};
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::AsRawFd;
use std::path::Path;
use tracing::{debug, info};

// BLKPBSZGET = _IO(0x12, 123): physical block size as unsigned int.
nix::ioctl_read_bad!(blkpbszget, 0x127b, libc::c_uint);

/// An open raw block device.
///
/// Construction only succeeds once the physical block size is known, so an
/// existing `RawDevice` is always usable.
#[derive(Debug)]
pub struct RawDevice {
    file: File,
    config: DeviceConfig,
    block_size: u64,
}

impl RawDevice {
    /// Open the device described by `config` and query its physical block
    /// size.
    ///
    /// # Errors
    ///
    /// [`Error::Open`] if the device cannot be opened,
    /// [`Error::BlockSizeQuery`] if the block size query fails and
    /// [`Error::ZeroBlockSize`] if it reports zero.
    pub fn open(config: &DeviceConfig) -> Result<Self> {
        let mut flags = libc::O_NOCTTY;
        if config.sync_io {
            flags |= libc::O_SYNC | libc::O_RSYNC;
        }
        if config.direct_io {
            flags |= libc::O_DIRECT;
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(flags)
            .open(&config.path)
            .map_err(|source| Error::Open {
                path: config.path.clone(),
                source,
            })?;

        let block_size = Self::physical_block_size(&file, &config.path)?;

        info!(
            path = %config.path.display(),
            block_size,
            sync_io = config.sync_io,
            direct_io = config.direct_io,
            "Device opened"
        );

        Ok(Self {
            file,
            config: config.clone(),
            block_size,
        })
    }

    fn physical_block_size(file: &File, path: &Path) -> Result<u64> {
        let mut size: libc::c_uint = 0;

        // SAFETY: the fd is open for the duration of the call and `size` is
        // a valid c_uint the kernel writes into.
        unsafe { blkpbszget(file.as_raw_fd(), &mut size) }.map_err(|errno| Error::BlockSizeQuery {
            path: path.to_path_buf(),
            errno,
        })?;

        if size == 0 {
            return Err(Error::ZeroBlockSize {
                path: path.to_path_buf(),
            });
        }
        Ok(u64::from(size))
    }

    /// The configuration the device was opened with.
    #[must_use]
    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    /// Handle is valid and the block size is known. Holds for every
    /// constructed `RawDevice`.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.file.as_raw_fd() >= 0 && self.block_size > 0
    }

    fn offset(&self, block: u64) -> nix::Result<libc::off_t> {
        block
            .checked_mul(self.block_size)
            .and_then(|off| libc::off_t::try_from(off).ok())
            .ok_or(Errno::EINVAL)
    }
}

impl BlockIo for RawDevice {
    fn block_size(&self) -> u64 {
        self.block_size
    }

    fn write_blocks(&mut self, block: u64, buf: &[u8]) -> nix::Result<usize> {
        let offset = self.offset(block)?;
        pwrite(&self.file, buf, offset)
    }

    fn read_blocks(&mut self, block: u64, buf: &mut [u8]) -> nix::Result<usize> {
        let offset = self.offset(block)?;
        pread(&self.file, buf, offset)
    }

    fn drop_cache(&mut self) {
        if let Err(e) = posix_fadvise(self.file.as_raw_fd(), 0, 0, PosixFadviseAdvice::POSIX_FADV_DONTNEED) {
            debug!(error = %e, "posix_fadvise(DONTNEED) ignored");
        }
    }

    fn flush(&mut self) {
        if let Err(e) = self.file.sync_all() {
            debug!(error = %e, "fsync ignored");
        }
    }
}
