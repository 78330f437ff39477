//! # blkverify
//!
//! Raw block device write/read/verify stress tester.
//!
//! Everything lives in `blkverify-core` and is re-exported here; the
//! `blkverify` binary is built from `bins/blkverify`.
//!
//! ```
//! use blkverify::{parse_tokens, JobSpec};
//!
//! let parsed = parse_tokens(["<r1234>", "a"]).unwrap();
//! assert_eq!(
//!     parsed.jobs,
//!     vec![JobSpec::Random { seed: Some(0x1234) }, JobSpec::Fixed { value: 0xaaaa_aaaa_aaaa_aaaa }]
//! );
//! ```

pub use blkverify_core::*;
