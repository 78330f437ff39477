//! Error types for blkverify-core.

use nix::errno::Errno;
use std::path::PathBuf;
use thiserror::Error;

/// Fatal errors. Anything recoverable (I/O failures during a phase, verify
/// mismatches) is reported as an [`ErrorRecord`](crate::ErrorRecord) instead.
#[derive(Debug, Error)]
pub enum Error {
    /// The device could not be opened.
    #[error("failed to open {}: {source}", path.display())]
    Open {
        /// Device path.
        path: PathBuf,
        /// Underlying OS error.
        source: std::io::Error,
    },

    /// The physical block size query failed.
    #[error("physical block size query failed on {}: {errno}", path.display())]
    BlockSizeQuery {
        /// Device path.
        path: PathBuf,
        /// Error returned by the query.
        errno: Errno,
    },

    /// The device reported a physical block size of zero.
    #[error("device {} reported a zero physical block size", path.display())]
    ZeroBlockSize {
        /// Device path.
        path: PathBuf,
    },

    /// An aligned chunk buffer could not be allocated.
    #[error("could not allocate {bytes} bytes aligned to {align}")]
    Alloc {
        /// Requested size in bytes.
        bytes: usize,
        /// Requested alignment.
        align: usize,
    },

    /// A pseudo-random generator was seeded with zero.
    #[error("generator seed must be non-zero")]
    ZeroSeed,

    /// The OS entropy source failed.
    #[error("entropy source failed: {0}")]
    Entropy(String),

    /// Engine or device configuration is invalid.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A job descriptor could not be turned into a job.
    #[error("invalid job spec: {0}")]
    InvalidJobSpec(String),

    /// Writing to a record sink failed.
    #[error("record sink error: {0}")]
    Sink(#[from] std::io::Error),
}

/// Result type for blkverify operations.
pub type Result<T> = std::result::Result<T, Error>;
