//! CLI module for blkverify
//!
//! Option letters follow the classic `dt`-style tester: `-a` and `-i` relax
//! the I/O mode, `-r`/`-w` pick phases, `-v`/`-b` size the work units.

pub mod run;

use blkverify_core::{DeviceConfig, EngineConfig};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// blkverify - raw block device write/read/verify stress tester
#[derive(Parser, Debug)]
#[command(name = "blkverify")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Use asynchronous I/O (drop O_SYNC)
    #[arg(short = 'a', long)]
    pub async_io: bool,

    /// Use indirect I/O through the page cache (drop O_DIRECT)
    #[arg(short = 'i', long)]
    pub indirect: bool,

    /// Enable read testing
    #[arg(short = 'r', long)]
    pub read: bool,

    /// Enable write testing
    #[arg(short = 'w', long)]
    pub write: bool,

    /// Sample throughput every N chunks
    #[arg(
        short = 'v',
        long,
        default_value_t = EngineConfig::DEFAULT_CHUNKS_PER_PRINT,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub chunks_per_print: u64,

    /// Physical blocks per chunk
    #[arg(
        short = 'b',
        long,
        default_value_t = EngineConfig::DEFAULT_BLOCKS_PER_CHUNK,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub blocks_per_chunk: u64,

    /// Pseudo-random algorithm for random jobs
    #[arg(long, value_enum, default_value = "chacha20")]
    pub rng: RngChoice,

    /// Directory for dt_writespeed.tsv, dt_readspeed.tsv and dt_errors.tsv
    #[arg(long, default_value = ".")]
    pub log_dir: PathBuf,

    /// Write per-job summaries as JSON
    #[arg(long)]
    pub summary_json: Option<PathBuf>,

    /// Block device to test
    pub device: PathBuf,

    /// Job patterns: r, <rSEED>, a hex digit, or <HEX>
    pub patterns: Vec<String>,
}

impl Cli {
    /// Device open mode.
    pub fn device_config(&self) -> DeviceConfig {
        DeviceConfig::new(&self.device)
            .sync_io(!self.async_io)
            .direct_io(!self.indirect)
    }

    /// Engine settings; neither `-r` nor `-w` means both.
    pub fn engine_config(&self) -> blkverify_core::Result<EngineConfig> {
        let (write, read) = if self.write || self.read {
            (self.write, self.read)
        } else {
            (true, true)
        };
        EngineConfig::new(write, read, self.blocks_per_chunk, self.chunks_per_print)
    }
}

#[derive(Clone, Copy, Debug, ValueEnum, Default, PartialEq, Eq)]
pub enum RngChoice {
    /// Xorshift64 - fastest
    Xorshift64,
    /// Xorshift64* - scrambled output
    Xorshift64Star,
    /// ChaCha, 8 rounds
    Chacha8,
    /// ChaCha, 12 rounds
    Chacha12,
    /// ChaCha, 20 rounds (default)
    #[default]
    Chacha20,
}

impl RngChoice {
    pub fn to_core(self) -> blkverify_core::Algorithm {
        match self {
            RngChoice::Xorshift64 => blkverify_core::Algorithm::Xorshift64,
            RngChoice::Xorshift64Star => blkverify_core::Algorithm::Xorshift64Star,
            RngChoice::Chacha8 => blkverify_core::Algorithm::ChaCha8,
            RngChoice::Chacha12 => blkverify_core::Algorithm::ChaCha12,
            RngChoice::Chacha20 => blkverify_core::Algorithm::ChaCha20,
        }
    }
}

/// Format a quantity in 1024-based units, e.g. `4096`, `10K`, `3072M`.
///
/// Values are divided by 1024 while above 9999. With `align` the number is
/// padded to four columns and always followed by a unit column (a space
/// for plain values), so progress lines do not jitter.
pub fn format_si(value: f64, align: bool) -> String {
    const UNITS: &[u8] = b" KMGTPEZY";

    let mut v = value;
    let mut i = 0;
    while i + 1 < UNITS.len() && v > 9999.0 {
        v /= 1024.0;
        i += 1;
    }

    let mut s = if align {
        format!("{v:4.0}")
    } else {
        format!("{v:.0}")
    };
    if i > 0 || align {
        s.push(char::from(UNITS[i]));
    }
    s
}
