//! blkverify - raw block device write/read/verify stress tester
//!
//! Writes deterministic patterns across a whole device, reads them back and
//! reports every mismatch, failed transfer and the throughput of each pass.
//!
//! # Usage
//!
//! ```bash
//! # Default jobs (one random pattern, then all zeros), sync + direct I/O
//! blkverify /dev/sdX
//!
//! # Verify only, replaying a known seed, 64 blocks per chunk
//! blkverify -r -b 64 /dev/sdX '<r1a2b3c4d>'
//!
//! # Buffered I/O, Xorshift64* patterns, fixed 0xff.. and 0x00ff.. passes
//! blkverify -a -i --rng xorshift64-star /dev/sdX r 'f<00ff>'
//! ```

mod cli;
mod sink;

use clap::Parser;
use cli::Cli;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    cli::run::run(cli)
}
