//! The test run: open the device and logs, then run every job in order.

use super::{format_si, Cli};
use crate::sink::{ConsoleSink, TsvSink};
use anyhow::{Context, Result};
use blkverify_core::{
    parse_tokens, Algorithm, BlockIo, JobReport, JobSpec, RawDevice, RecordSink, TestEngine,
};
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

pub fn run(args: Cli) -> Result<()> {
    let engine = TestEngine::new(args.engine_config()?);
    let device_config = args.device_config();

    tracing::info!(
        device = %args.device.display(),
        sync_io = device_config.sync_io,
        direct_io = device_config.direct_io,
        write = engine.config().do_write,
        read = engine.config().do_read,
        rng = %args.rng.to_core(),
        "Starting blkverify"
    );

    let parsed = parse_tokens(&args.patterns)?;

    let mut device = RawDevice::open(&device_config)
        .with_context(|| format!("Could not open device {}", args.device.display()))?;

    println!("{}", chunk_size_line(device.block_size(), engine.config().blocks_per_chunk));

    let mut logs = TsvSink::open(&args.log_dir)
        .with_context(|| format!("Could not open logs in {}", args.log_dir.display()))?;
    let mut console = ConsoleSink::stdout();

    let reports = run_jobs(
        &engine,
        &mut device,
        &parsed.jobs,
        args.rng.to_core(),
        &mut logs,
        &mut console,
        &mut io::stdout(),
    )?;

    if let Some(path) = &args.summary_json {
        write_summary(&reports, path)?;
        tracing::info!(path = %path.display(), "Summary written");
    }

    Ok(())
}

/// Run `jobs` in order on one device, printing each summary to `out`.
pub fn run_jobs<D, S, C, O>(
    engine: &TestEngine,
    device: &mut D,
    jobs: &[JobSpec],
    algorithm: Algorithm,
    logs: &mut S,
    console: &mut ConsoleSink<C>,
    out: &mut O,
) -> Result<Vec<JobReport>>
where
    D: BlockIo + ?Sized,
    S: RecordSink,
    C: Write,
    O: Write,
{
    let mut reports = Vec::with_capacity(jobs.len());
    for spec in jobs {
        let mut job = spec.instantiate(algorithm)?;
        let mut sinks = (&mut *logs, &mut *console);
        let report = engine.run_job(&mut *device, &mut job.generator, job.seeding, &mut sinks)?;
        console.finish_line()?;
        write!(out, "{}", summary_text(&report))?;
        out.flush()?;
        reports.push(report);
    }
    Ok(reports)
}

fn chunk_size_line(block_size: u64, blocks_per_chunk: u64) -> String {
    #[allow(clippy::cast_precision_loss)]
    let bytes = block_size.saturating_mul(blocks_per_chunk) as f64;
    format!(
        "Chunk size: {block_size} * {blocks_per_chunk} = {}iB",
        format_si(bytes, false)
    )
}

/// Human-readable job summary, e.g.
///
/// ```text
/// Random 00000000deadbeef (ChaCha20) done:
/// 931G @ W 120M/s, R 140M/s
/// ```
#[allow(clippy::cast_precision_loss)]
fn summary_text(report: &JobReport) -> String {
    let mut rates = Vec::new();
    if let Some(w) = &report.write {
        rates.push(format!("W {}/s", format_si(w.bytes_per_sec as f64, false)));
    }
    if let Some(r) = &report.read {
        rates.push(format!("R {}/s", format_si(r.bytes_per_sec as f64, false)));
    }

    let mut s = format!(
        "{} done:\n{} @ {}\n",
        report.name,
        format_si(report.device_bytes as f64, false),
        rates.join(", ")
    );
    if report.total_errors() > 0 {
        s.push_str(&format!(
            "Errors: W {}, R {}, V {}\n",
            report.write_errors, report.read_errors, report.verify_errors
        ));
    }
    s
}

fn write_summary(reports: &[JobReport], path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(reports)?;
    let mut file =
        File::create(path).with_context(|| format!("Could not create {}", path.display()))?;
    writeln!(file, "{json}")?;
    Ok(())
}
