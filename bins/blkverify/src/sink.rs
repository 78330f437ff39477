//! Record sinks: append-only TSV log files and the console progress line.

use crate::cli::format_si;
use blkverify_core::{ErrorRecord, Phase, RecordSink, ThroughputSample};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

/// Write throughput log.
pub const WRITE_SPEED_LOG: &str = "dt_writespeed.tsv";
/// Read throughput log.
pub const READ_SPEED_LOG: &str = "dt_readspeed.tsv";
/// Error log.
pub const ERROR_LOG: &str = "dt_errors.tsv";

/// One append-only log. A `# <job>` header precedes the first line each
/// job writes, so jobs that never touch a log leave no trace in it.
struct LogFile<W: Write> {
    out: W,
    header_for: Option<u64>,
}

impl<W: Write> LogFile<W> {
    fn new(out: W) -> Self {
        Self {
            out,
            header_for: None,
        }
    }

    fn line(&mut self, job: u64, name: &str, line: &str) -> io::Result<()> {
        if self.header_for != Some(job) {
            write!(self.out, "\n# {name}\n")?;
            self.header_for = Some(job);
        }
        writeln!(self.out, "{line}")?;
        self.out.flush()
    }
}

/// The three `dt_*.tsv` logs.
pub struct TsvSink<W: Write = File> {
    write_speed: LogFile<W>,
    read_speed: LogFile<W>,
    errors: LogFile<W>,
    job: u64,
    name: String,
}

impl TsvSink<File> {
    /// Open (appending, creating if needed) the logs in `dir`.
    pub fn open(dir: &Path) -> io::Result<Self> {
        let append = |name: &str| OpenOptions::new().create(true).append(true).open(dir.join(name));
        Ok(Self::new(
            append(WRITE_SPEED_LOG)?,
            append(READ_SPEED_LOG)?,
            append(ERROR_LOG)?,
        ))
    }
}

impl<W: Write> TsvSink<W> {
    pub fn new(write_speed: W, read_speed: W, errors: W) -> Self {
        Self {
            write_speed: LogFile::new(write_speed),
            read_speed: LogFile::new(read_speed),
            errors: LogFile::new(errors),
            job: 0,
            name: String::new(),
        }
    }
}

impl<W: Write> RecordSink for TsvSink<W> {
    fn job_started(&mut self, name: &str) -> io::Result<()> {
        self.job += 1;
        self.name = name.to_string();
        Ok(())
    }

    fn throughput(&mut self, phase: Phase, sample: &ThroughputSample) -> io::Result<()> {
        let log = match phase {
            Phase::Write => &mut self.write_speed,
            Phase::Read | Phase::Verify => &mut self.read_speed,
        };
        log.line(self.job, &self.name, &sample.to_tsv())
    }

    fn error(&mut self, record: &ErrorRecord) -> io::Result<()> {
        self.errors.line(self.job, &self.name, &record.to_tsv())
    }
}

/// Rewrites one progress line per phase: `W  123M  456M/s`.
pub struct ConsoleSink<W: Write> {
    out: W,
    pending: Option<Phase>,
}

impl ConsoleSink<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> ConsoleSink<W> {
    pub fn new(out: W) -> Self {
        Self { out, pending: None }
    }

    /// End the current progress line, if any.
    pub fn finish_line(&mut self) -> io::Result<()> {
        if self.pending.take().is_some() {
            writeln!(self.out)?;
            self.out.flush()?;
        }
        Ok(())
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out
    }
}

#[allow(clippy::cast_precision_loss)]
impl<W: Write> RecordSink for ConsoleSink<W> {
    fn job_started(&mut self, _name: &str) -> io::Result<()> {
        self.finish_line()
    }

    fn throughput(&mut self, phase: Phase, sample: &ThroughputSample) -> io::Result<()> {
        if self.pending.is_some_and(|p| p != phase) {
            self.finish_line()?;
        }
        write!(
            self.out,
            "\r{} {} {}/s        ",
            phase.tag(),
            format_si(sample.cumulative_bytes as f64, true),
            format_si(sample.bytes_per_sec as f64, true)
        )?;
        self.out.flush()?;
        self.pending = Some(phase);
        Ok(())
    }

    fn error(&mut self, _record: &ErrorRecord) -> io::Result<()> {
        // Failures reach the console through tracing.
        Ok(())
    }
}
