//! The write/read/verify engine.
//!
//! One job runs `Write -> Barrier -> Read`, skipping whichever phase is
//! disabled. Both phases walk the device chunk by chunk from block 0 until
//! the device reports end-of-device; failed transfers and mismatched words
//! are recorded and the walk goes on.

use crate::buffer::ChunkBuffer;
use crate::device::BlockIo;
use crate::pattern::PatternGenerator;
use crate::record::{ErrorRecord, Phase, RecordSink};
use crate::throughput::{bytes_per_second, ThroughputMeter};
use crate::word::Word;
use crate::{Error, Result};
use nix::errno::Errno;
use serde::Serialize;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Mismatches per chunk that are logged individually before the rest of
/// that chunk is only recorded.
pub const CONSOLE_MISMATCHES_PER_CHUNK: u64 = 16;

/// How the generator is prepared when the job starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Seeding {
    /// Draw a new seed (random) or re-arm the fill (fixed).
    Fresh,
    /// Replay from the seed already configured.
    Replay,
}

/// Engine settings, fixed for a whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EngineConfig {
    /// Run the write phase.
    pub do_write: bool,
    /// Run the read/verify phase.
    pub do_read: bool,
    /// Physical blocks per chunk.
    pub blocks_per_chunk: u64,
    /// Chunks between throughput samples.
    pub chunks_per_print: u64,
}

impl EngineConfig {
    /// Default physical blocks per chunk.
    pub const DEFAULT_BLOCKS_PER_CHUNK: u64 = 8;
    /// Default chunks between throughput samples.
    pub const DEFAULT_CHUNKS_PER_PRINT: u64 = 1024;

    /// Validated configuration.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidConfig`] if both phases are disabled or either count
    /// is zero.
    pub fn new(
        do_write: bool,
        do_read: bool,
        blocks_per_chunk: u64,
        chunks_per_print: u64,
    ) -> Result<Self> {
        if !do_write && !do_read {
            return Err(Error::InvalidConfig("no phase enabled".to_string()));
        }
        if blocks_per_chunk == 0 {
            return Err(Error::InvalidConfig("blocks per chunk must be positive".to_string()));
        }
        if chunks_per_print == 0 {
            return Err(Error::InvalidConfig("chunks per print must be positive".to_string()));
        }
        Ok(Self {
            do_write,
            do_read,
            blocks_per_chunk,
            chunks_per_print,
        })
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            do_write: true,
            do_read: true,
            blocks_per_chunk: Self::DEFAULT_BLOCKS_PER_CHUNK,
            chunks_per_print: Self::DEFAULT_CHUNKS_PER_PRINT,
        }
    }
}

/// Aggregate timing of one phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PhaseReport {
    /// Wall time of the phase in microseconds.
    pub elapsed_us: u64,
    /// Approximate device size divided by the phase time.
    pub bytes_per_sec: u64,
}

/// Outcome of one job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobReport {
    /// Job name, as given by the generator.
    pub name: String,
    /// Seed the job ran with.
    pub seed: u64,
    /// Bytes per chunk.
    pub chunk_bytes: u64,
    /// Index of the chunk at which the last phase hit end-of-device.
    pub last_chunk: u64,
    /// `last_chunk * chunk_bytes`, the approximate device size.
    pub device_bytes: u64,
    /// Write phase timing, if it ran.
    pub write: Option<PhaseReport>,
    /// Read phase timing, if it ran.
    pub read: Option<PhaseReport>,
    /// Failed writes.
    pub write_errors: u64,
    /// Failed reads.
    pub read_errors: u64,
    /// Mismatched words.
    pub verify_errors: u64,
}

impl JobReport {
    /// Sum of all recorded failures.
    #[must_use]
    pub fn total_errors(&self) -> u64 {
        self.write_errors + self.read_errors + self.verify_errors
    }
}

enum Transfer {
    Done(usize),
    EndOfDevice,
    Failed(Errno),
}

fn classify(ret: nix::Result<usize>) -> Transfer {
    match ret {
        Ok(0) | Err(Errno::ENOSPC | Errno::EINVAL) => Transfer::EndOfDevice,
        Ok(n) => Transfer::Done(n),
        Err(errno) => Transfer::Failed(errno),
    }
}

struct PhaseOutcome {
    last_chunk: u64,
    elapsed_us: u64,
    failed: u64,
    mismatched: u64,
}

/// Chunk geometry shared by both phases.
#[derive(Clone, Copy)]
struct Geometry {
    blocks_per_chunk: u64,
    chunk_bytes: u64,
    chunks_per_print: u64,
}

impl Geometry {
    fn block(&self, chunk: u64) -> u64 {
        chunk.saturating_mul(self.blocks_per_chunk)
    }

    fn offset(&self, chunk: u64) -> u64 {
        chunk.saturating_mul(self.chunk_bytes)
    }

    fn sample_due(&self, chunk: u64) -> bool {
        chunk % self.chunks_per_print == 0
    }
}

/// Runs jobs against a device.
#[derive(Debug, Clone, Default)]
pub struct TestEngine {
    config: EngineConfig,
}

impl TestEngine {
    /// Engine with the given configuration.
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// Current configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run one job to completion.
    ///
    /// # Errors
    ///
    /// Fatal conditions only: chunk geometry that does not fit in memory,
    /// buffer allocation failure, a generator that cannot be seeded, or a
    /// sink that fails to record. Transfer failures and mismatches are
    /// counted in the report.
    pub fn run_job<W, D, G, S>(
        &self,
        device: &mut D,
        generator: &mut G,
        seeding: Seeding,
        sink: &mut S,
    ) -> Result<JobReport>
    where
        W: Word,
        D: BlockIo + ?Sized,
        G: PatternGenerator<Word = W> + ?Sized,
        S: RecordSink + ?Sized,
    {
        let block_size = device.block_size();
        let chunk_bytes = block_size
            .checked_mul(self.config.blocks_per_chunk)
            .ok_or_else(|| Error::InvalidConfig("chunk size overflows".to_string()))?;
        let len = usize::try_from(chunk_bytes)
            .map_err(|_| Error::InvalidConfig(format!("chunk of {chunk_bytes} bytes")))?;
        let align = usize::try_from(block_size)
            .map_err(|_| Error::InvalidConfig(format!("block size {block_size}")))?;

        let mut expected = ChunkBuffer::<W>::new(len, align)?;
        let mut actual = ChunkBuffer::<W>::new(len, align)?;

        match seeding {
            Seeding::Fresh => generator.init_fresh()?,
            Seeding::Replay => generator.reset()?,
        }

        let geometry = Geometry {
            blocks_per_chunk: self.config.blocks_per_chunk,
            chunk_bytes,
            chunks_per_print: self.config.chunks_per_print,
        };
        let name = generator.describe();
        info!(job = %name, chunk_bytes, "Job starting");
        sink.job_started(&name)?;

        let mut report = JobReport {
            name,
            seed: generator.seed(),
            chunk_bytes,
            last_chunk: 0,
            device_bytes: 0,
            write: None,
            read: None,
            write_errors: 0,
            read_errors: 0,
            verify_errors: 0,
        };

        let mut write_us = None;
        if self.config.do_write {
            let out = write_phase(geometry, device, generator, &mut expected, sink)?;
            report.last_chunk = out.last_chunk;
            report.write_errors = out.failed;
            write_us = Some(out.elapsed_us);
        }

        debug!("Barrier: dropping cache");
        device.drop_cache();
        debug!("Barrier: flushing");
        device.flush();
        generator.reset()?;

        let mut read_us = None;
        if self.config.do_read {
            let out = read_phase(geometry, device, generator, &mut expected, &mut actual, sink)?;
            report.last_chunk = out.last_chunk;
            report.read_errors = out.failed;
            report.verify_errors = out.mismatched;
            read_us = Some(out.elapsed_us);
        }

        let device_bytes = report.last_chunk.saturating_mul(chunk_bytes);
        report.device_bytes = device_bytes;
        let phase = |us: u64| PhaseReport {
            elapsed_us: us,
            bytes_per_sec: bytes_per_second(device_bytes, us),
        };
        report.write = write_us.map(phase);
        report.read = read_us.map(phase);

        info!(
            job = %report.name,
            device_bytes = report.device_bytes,
            write_errors = report.write_errors,
            read_errors = report.read_errors,
            verify_errors = report.verify_errors,
            "Job finished"
        );
        Ok(report)
    }
}

fn write_phase<W, D, G, S>(
    geometry: Geometry,
    device: &mut D,
    generator: &mut G,
    pattern: &mut ChunkBuffer<W>,
    sink: &mut S,
) -> Result<PhaseOutcome>
where
    W: Word,
    D: BlockIo + ?Sized,
    G: PatternGenerator<Word = W> + ?Sized,
    S: RecordSink + ?Sized,
{
    let mut meter = ThroughputMeter::new(Instant::now());
    let mut done = 0u64;
    let mut failed = 0u64;
    let mut chunk = 0u64;

    loop {
        generator.fill(pattern.words_mut());
        let ret = device.write_blocks(geometry.block(chunk), pattern.as_bytes());

        let end = match classify(ret) {
            Transfer::Done(n) => {
                done += n as u64;
                false
            }
            Transfer::EndOfDevice => true,
            Transfer::Failed(errno) => {
                record_io(Phase::Write, geometry.offset(chunk), errno, sink)?;
                failed += 1;
                false
            }
        };

        if end || geometry.sample_due(chunk) {
            emit_sample(&mut meter, Phase::Write, done, sink)?;
        }
        if end {
            break;
        }
        chunk += 1;
    }

    Ok(PhaseOutcome {
        last_chunk: chunk,
        elapsed_us: meter.total_us(Instant::now()),
        failed,
        mismatched: 0,
    })
}

fn read_phase<W, D, G, S>(
    geometry: Geometry,
    device: &mut D,
    generator: &mut G,
    expected: &mut ChunkBuffer<W>,
    actual: &mut ChunkBuffer<W>,
    sink: &mut S,
) -> Result<PhaseOutcome>
where
    W: Word,
    D: BlockIo + ?Sized,
    G: PatternGenerator<Word = W> + ?Sized,
    S: RecordSink + ?Sized,
{
    let mut meter = ThroughputMeter::new(Instant::now());
    let mut done = 0u64;
    let mut failed = 0u64;
    let mut mismatched = 0u64;
    let mut chunk = 0u64;

    loop {
        generator.fill(expected.words_mut());
        actual.poison();
        let ret = device.read_blocks(geometry.block(chunk), actual.as_bytes_mut());

        let end = match classify(ret) {
            Transfer::Done(n) => {
                done += n as u64;
                let words = (n / W::BYTES).min(expected.len());
                mismatched += verify_chunk(
                    geometry.offset(chunk),
                    &expected.words()[..words],
                    &actual.words()[..words],
                    sink,
                )?;
                false
            }
            Transfer::EndOfDevice => true,
            Transfer::Failed(errno) => {
                record_io(Phase::Read, geometry.offset(chunk), errno, sink)?;
                failed += 1;
                false
            }
        };

        if end || geometry.sample_due(chunk) {
            emit_sample(&mut meter, Phase::Read, done, sink)?;
        }
        if end {
            break;
        }
        chunk += 1;
    }

    Ok(PhaseOutcome {
        last_chunk: chunk,
        elapsed_us: meter.total_us(Instant::now()),
        failed,
        mismatched,
    })
}

/// Compare one chunk word by word, recording every mismatch. Returns the
/// number of mismatched words.
fn verify_chunk<W, S>(byte_offset: u64, expected: &[W], actual: &[W], sink: &mut S) -> Result<u64>
where
    W: Word,
    S: RecordSink + ?Sized,
{
    let mut count = 0u64;
    for (j, (&want, &got)) in expected.iter().zip(actual).enumerate() {
        if want == got {
            continue;
        }
        let word_offset = (j * W::BYTES) as u64;
        if count < CONSOLE_MISMATCHES_PER_CHUNK {
            warn!(
                offset = format_args!("{byte_offset:016x}+{word_offset:08x}"),
                actual = format_args!("{got:016x}"),
                expected = format_args!("{want:016x}"),
                "Verify mismatch"
            );
        } else if count == CONSOLE_MISMATCHES_PER_CHUNK {
            warn!("Suppressing further verification errors in this chunk");
        }
        sink.error(&ErrorRecord::Mismatch {
            byte_offset,
            word_offset,
            expected: want.to_u64(),
            actual: got.to_u64(),
        })?;
        count += 1;
    }
    Ok(count)
}

fn record_io<S: RecordSink + ?Sized>(
    phase: Phase,
    byte_offset: u64,
    errno: Errno,
    sink: &mut S,
) -> Result<()> {
    error!(%phase, offset = format_args!("{byte_offset:016x}"), error = %errno, "Transfer failed");
    sink.error(&ErrorRecord::Io {
        phase,
        byte_offset,
        ret: -1,
        errno: errno as i32,
    })?;
    Ok(())
}

fn emit_sample<S: RecordSink + ?Sized>(
    meter: &mut ThroughputMeter,
    phase: Phase,
    done: u64,
    sink: &mut S,
) -> Result<()> {
    if let Some(sample) = meter.sample(Instant::now(), done) {
        debug!(%phase, bytes = sample.cumulative_bytes, rate = sample.bytes_per_sec, "Throughput");
        sink.throughput(phase, &sample)?;
    }
    Ok(())
}
