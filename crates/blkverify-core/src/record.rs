//! Records emitted by a job and the sinks that receive them.

use serde::Serialize;
use std::fmt;
use std::io;

/// Engine phase a record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Phase {
    /// Pattern written to the device.
    Write,
    /// Device contents read back.
    Read,
    /// Read-back data compared to the regenerated pattern.
    Verify,
}

impl Phase {
    /// One-letter tag used in the error log.
    #[must_use]
    pub const fn tag(self) -> char {
        match self {
            Self::Write => 'W',
            Self::Read => 'R',
            Self::Verify => 'V',
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// A recorded, non-fatal failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorRecord {
    /// A transfer failed with an error other than end-of-device.
    Io {
        /// [`Phase::Write`] or [`Phase::Read`].
        phase: Phase,
        /// Device byte offset of the chunk.
        byte_offset: u64,
        /// Transfer return value.
        ret: i64,
        /// OS error code.
        errno: i32,
    },
    /// A word read back differs from the pattern.
    Mismatch {
        /// Device byte offset of the chunk.
        byte_offset: u64,
        /// Byte offset of the word inside the chunk.
        word_offset: u64,
        /// Pattern value.
        expected: u64,
        /// Value read from the device.
        actual: u64,
    },
}

impl ErrorRecord {
    /// Phase the record belongs to.
    #[must_use]
    pub const fn phase(&self) -> Phase {
        match self {
            Self::Io { phase, .. } => *phase,
            Self::Mismatch { .. } => Phase::Verify,
        }
    }

    /// Device byte offset of the chunk.
    #[must_use]
    pub const fn byte_offset(&self) -> u64 {
        match self {
            Self::Io { byte_offset, .. } | Self::Mismatch { byte_offset, .. } => *byte_offset,
        }
    }

    /// Tab-separated error log line, without the newline.
    ///
    /// ```
    /// use blkverify_core::{ErrorRecord, Phase};
    ///
    /// let rec = ErrorRecord::Io { phase: Phase::Write, byte_offset: 0x1000, ret: -1, errno: 5 };
    /// assert_eq!(rec.to_tsv(), "W\t0000000000001000\t-0000001\t5");
    /// ```
    #[must_use]
    pub fn to_tsv(&self) -> String {
        match *self {
            Self::Io {
                phase,
                byte_offset,
                ret,
                errno,
            } => format!("{phase}\t{byte_offset:016x}\t{ret:+08}\t{errno}"),
            Self::Mismatch {
                byte_offset,
                word_offset,
                expected,
                actual,
            } => format!("V\t{byte_offset:016x}\t{word_offset:08x}\t{actual:016x}\t{expected:016x}"),
        }
    }
}

/// One throughput measurement window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ThroughputSample {
    /// Bytes transferred since the phase started.
    pub cumulative_bytes: u64,
    /// Length of the window in microseconds.
    pub elapsed_us: u64,
    /// Bytes per second over the window.
    pub bytes_per_sec: u64,
}

impl ThroughputSample {
    /// Tab-separated speed log line, without the newline.
    #[must_use]
    pub fn to_tsv(&self) -> String {
        format!("{}\t{}", self.cumulative_bytes, self.bytes_per_sec)
    }
}

/// Receiver for everything a job reports.
pub trait RecordSink {
    /// A job named `name` is starting.
    ///
    /// # Errors
    ///
    /// Any I/O error from the underlying log.
    fn job_started(&mut self, name: &str) -> io::Result<()>;

    /// A throughput window closed in `phase`.
    ///
    /// # Errors
    ///
    /// Any I/O error from the underlying log.
    fn throughput(&mut self, phase: Phase, sample: &ThroughputSample) -> io::Result<()>;

    /// A failure was recorded.
    ///
    /// # Errors
    ///
    /// Any I/O error from the underlying log.
    fn error(&mut self, record: &ErrorRecord) -> io::Result<()>;
}

impl<S: RecordSink + ?Sized> RecordSink for &mut S {
    fn job_started(&mut self, name: &str) -> io::Result<()> {
        (**self).job_started(name)
    }

    fn throughput(&mut self, phase: Phase, sample: &ThroughputSample) -> io::Result<()> {
        (**self).throughput(phase, sample)
    }

    fn error(&mut self, record: &ErrorRecord) -> io::Result<()> {
        (**self).error(record)
    }
}

/// Both sinks receive every record, first `.0` then `.1`.
impl<A: RecordSink, B: RecordSink> RecordSink for (A, B) {
    fn job_started(&mut self, name: &str) -> io::Result<()> {
        self.0.job_started(name)?;
        self.1.job_started(name)
    }

    fn throughput(&mut self, phase: Phase, sample: &ThroughputSample) -> io::Result<()> {
        self.0.throughput(phase, sample)?;
        self.1.throughput(phase, sample)
    }

    fn error(&mut self, record: &ErrorRecord) -> io::Result<()> {
        self.0.error(record)?;
        self.1.error(record)
    }
}

/// Sink that keeps everything in memory.
#[derive(Debug, Clone, Default)]
pub struct RecordLog {
    /// Job names in start order.
    pub jobs: Vec<String>,
    /// Throughput samples with their phase.
    pub samples: Vec<(Phase, ThroughputSample)>,
    /// Error records in emission order.
    pub errors: Vec<ErrorRecord>,
}

impl RecordLog {
    /// Empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Errors recorded in `phase`.
    pub fn errors_in(&self, phase: Phase) -> impl Iterator<Item = &ErrorRecord> + '_ {
        self.errors.iter().filter(move |r| r.phase() == phase)
    }

    /// Samples recorded in `phase`.
    pub fn samples_in(&self, phase: Phase) -> impl Iterator<Item = &ThroughputSample> + '_ {
        self.samples
            .iter()
            .filter(move |(p, _)| *p == phase)
            .map(|(_, s)| s)
    }
}

impl RecordSink for RecordLog {
    fn job_started(&mut self, name: &str) -> io::Result<()> {
        self.jobs.push(name.to_string());
        Ok(())
    }

    fn throughput(&mut self, phase: Phase, sample: &ThroughputSample) -> io::Result<()> {
        self.samples.push((phase, *sample));
        Ok(())
    }

    fn error(&mut self, record: &ErrorRecord) -> io::Result<()> {
        self.errors.push(*record);
        Ok(())
    }
}
