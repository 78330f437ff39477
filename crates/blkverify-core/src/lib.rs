//! Raw block device write/read/verify stress testing.
//!
//! A job writes a deterministic word stream across a whole device, drops
//! the page cache, regenerates the same stream and compares it with what
//! the device returns. Failed transfers and mismatched words are recorded
//! and counted; throughput is sampled as the job goes.
//!
//! # Example
//!
//! ```
//! use blkverify_core::{
//!     Algorithm, EngineConfig, Generator, MemDevice, PatternGenerator, RecordLog, Seeding,
//!     TestEngine,
//! };
//!
//! let mut device = MemDevice::new(64 * 1024, 512);
//! let mut gen = Generator::random(Algorithm::ChaCha20);
//! gen.set_seed(0xdead_beef).unwrap();
//!
//! let engine = TestEngine::new(EngineConfig::default());
//! let mut log = RecordLog::new();
//! let report = engine.run_job(&mut device, &mut gen, Seeding::Replay, &mut log).unwrap();
//!
//! assert_eq!(report.total_errors(), 0);
//! assert_eq!(report.device_bytes, 64 * 1024);
//! ```

#![deny(missing_docs)]
#![deny(clippy::panic)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

mod buffer;
pub mod device;
mod engine;
mod error;
pub mod jobspec;
pub mod pattern;
mod record;
pub mod throughput;
mod word;

pub use buffer::ChunkBuffer;
pub use device::{BlockIo, DeviceConfig, MemDevice, RawDevice};
pub use engine::{
    EngineConfig, JobReport, PhaseReport, Seeding, TestEngine, CONSOLE_MISMATCHES_PER_CHUNK,
};
pub use error::{Error, Result};
pub use jobspec::{parse_tokens, Job, JobSpec, ParsedJobs};
pub use pattern::{Algorithm, Generator, PatternGenerator};
pub use record::{ErrorRecord, Phase, RecordLog, RecordSink, ThroughputSample};
pub use word::Word;
