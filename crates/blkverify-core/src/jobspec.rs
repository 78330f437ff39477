//! Job descriptor parsing.
//!
//! Each command-line token is scanned character by character:
//!
//! | Input         | Job                                                    |
//! |---------------|--------------------------------------------------------|
//! | `r`, `R`      | random, fresh seed from the OS                         |
//! | `<r1234>`     | random, seed `0x1234`                                  |
//! | `a`           | fixed word `0xaaaaaaaaaaaaaaaa`                        |
//! | `<deadbeef>`  | fixed word `0xdeadbeefdeadbeef` (nibbles repeat)       |
//!
//! So `"r0f"` is three jobs and `"<r1><00ff>"` is two. Invalid hex digits
//! are diagnosed and read as nibble 0; the remaining jobs still run.

use crate::engine::Seeding;
use crate::pattern::{Algorithm, Generator, PatternGenerator};
use crate::{Error, Result};
use serde::Serialize;
use tracing::warn;

/// Number of nibbles in a pattern word.
const NIBBLES: usize = 16;

/// One parsed job descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum JobSpec {
    /// Pseudo-random pattern.
    Random {
        /// Explicit seed, or `None` for a fresh one.
        seed: Option<u64>,
    },
    /// One repeated 64-bit word.
    Fixed {
        /// The word.
        value: u64,
    },
}

/// A job ready to run: its generator and how to seed it.
#[derive(Debug, Clone)]
pub struct Job {
    /// Pattern source.
    pub generator: Generator,
    /// Fresh seed or replay of the configured one.
    pub seeding: Seeding,
}

impl JobSpec {
    /// Build the generator for this job. Random jobs use `algorithm`.
    ///
    /// # Errors
    ///
    /// [`Error::ZeroSeed`] for an explicit seed of zero.
    pub fn instantiate(&self, algorithm: Algorithm) -> Result<Job> {
        match *self {
            Self::Random { seed: None } => Ok(Job {
                generator: Generator::random(algorithm),
                seeding: Seeding::Fresh,
            }),
            Self::Random { seed: Some(seed) } => {
                let mut generator = Generator::random(algorithm);
                generator.set_seed(seed)?;
                Ok(Job {
                    generator,
                    seeding: Seeding::Replay,
                })
            }
            Self::Fixed { value } => Ok(Job {
                generator: Generator::fixed(value),
                seeding: Seeding::Fresh,
            }),
        }
    }
}

/// Jobs run when no descriptor is given: one random, then all zeros.
#[must_use]
pub fn default_jobs() -> Vec<JobSpec> {
    vec![JobSpec::Random { seed: None }, JobSpec::Fixed { value: 0 }]
}

/// Parse result: the jobs plus any non-fatal diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedJobs {
    /// Jobs in order.
    pub jobs: Vec<JobSpec>,
    /// Problems that were reported but did not stop parsing.
    pub diagnostics: Vec<String>,
}

impl ParsedJobs {
    fn diagnose(&mut self, message: String) {
        warn!("{message}");
        self.diagnostics.push(message);
    }
}

/// Parse every token. An empty token list yields [`default_jobs`].
///
/// # Errors
///
/// [`Error::InvalidJobSpec`] if a bracketed random seed is not hexadecimal.
pub fn parse_tokens<I, S>(tokens: I) -> Result<ParsedJobs>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut parsed = ParsedJobs::default();
    let mut any = false;
    for token in tokens {
        any = true;
        parse_token(token.as_ref(), &mut parsed)?;
    }
    if !any {
        parsed.jobs = default_jobs();
    }
    Ok(parsed)
}

/// Parse one token, appending its jobs to `out`.
///
/// # Errors
///
/// [`Error::InvalidJobSpec`] if a bracketed random seed is not hexadecimal.
pub fn parse_token(token: &str, out: &mut ParsedJobs) -> Result<()> {
    let mut bracket: Option<usize> = None;

    for (i, c) in token.char_indices() {
        match c {
            '<' => bracket = Some(i + 1),
            '>' => match bracket.take() {
                Some(start) => {
                    let content = &token[start..i];
                    let job = bracket_job(content, out)?;
                    out.jobs.push(job);
                }
                None => out.diagnose(format!("Unmatched '>' in {token:?}")),
            },
            _ if bracket.is_some() => {}
            'r' | 'R' => out.jobs.push(JobSpec::Random { seed: None }),
            _ => {
                let mut buf = [0u8; 4];
                let value = parse_pattern(c.encode_utf8(&mut buf), out);
                out.jobs.push(JobSpec::Fixed { value });
            }
        }
    }

    if let Some(start) = bracket {
        out.diagnose(format!("Unclosed '<' in {token:?}, ignoring {:?}", &token[start..]));
    }
    Ok(())
}

fn bracket_job(content: &str, out: &mut ParsedJobs) -> Result<JobSpec> {
    if let Some(seed) = content.strip_prefix(['r', 'R']) {
        let digits = seed
            .strip_prefix("0x")
            .or_else(|| seed.strip_prefix("0X"))
            .unwrap_or(seed);
        let seed = u64::from_str_radix(digits, 16)
            .map_err(|e| Error::InvalidJobSpec(format!("bad random seed {seed:?}: {e}")))?;
        return Ok(JobSpec::Random { seed: Some(seed) });
    }
    Ok(JobSpec::Fixed {
        value: parse_pattern(content, out),
    })
}

/// Build a 64-bit word from hex digits, most significant nibble first,
/// repeating the digits cyclically to fill all 16 nibbles. Digits past the
/// 16th are validated but unused. Invalid digits count as 0.
fn parse_pattern(digits: &str, out: &mut ParsedJobs) -> u64 {
    let chars: Vec<char> = digits.chars().collect();

    for &c in &chars {
        if !c.is_ascii_hexdigit() {
            out.diagnose(format!("Invalid character in sequence: {c:?}"));
        }
    }
    if chars.is_empty() {
        out.diagnose("Empty sequence, using 0".to_string());
        return 0;
    }

    (0..NIBBLES).fold(0u64, |acc, i| {
        let nib = chars[i % chars.len()].to_digit(16).unwrap_or(0);
        acc | (u64::from(nib) << (60 - 4 * i))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> ParsedJobs {
        parse_tokens([s]).unwrap()
    }

    fn fixed(s: &str) -> u64 {
        match parse(s).jobs.as_slice() {
            [JobSpec::Fixed { value }] => *value,
            other => panic!("expected one fixed job, got {other:?}"),
        }
    }

    #[test]
    fn test_bracketed_pattern_repeats() {
        assert_eq!(fixed("<deadbeef>"), 0xdead_beef_dead_beef);
    }

    #[test]
    fn test_single_digit() {
        assert_eq!(fixed("a"), 0xaaaa_aaaa_aaaa_aaaa);
        assert_eq!(fixed("F"), u64::MAX);
        assert_eq!(fixed("0"), 0);
    }

    #[test]
    fn test_random_with_seed() {
        assert_eq!(parse("<r1234>").jobs, vec![JobSpec::Random { seed: Some(0x1234) }]);
        assert_eq!(parse("<R0xABC>").jobs, vec![JobSpec::Random { seed: Some(0xabc) }]);
    }

    #[test]
    fn test_bare_random() {
        assert_eq!(
            parse("rR").jobs,
            vec![JobSpec::Random { seed: None }, JobSpec::Random { seed: None }]
        );
    }

    #[test]
    fn test_boundary_lengths() {
        let empty = parse("<>");
        assert_eq!(empty.jobs, vec![JobSpec::Fixed { value: 0 }]);
        assert_eq!(empty.diagnostics.len(), 1);

        assert_eq!(fixed("<7>"), 0x7777_7777_7777_7777);
        assert_eq!(fixed("<abc>"), 0xabca_bcab_cabc_abca);
        assert_eq!(fixed("<0123456789abcdef>"), 0x0123_4567_89ab_cdef);
        assert_eq!(fixed("<0123456789abcdef99>"), 0x0123_4567_89ab_cdef);
    }

    #[test]
    fn test_invalid_hex_is_diagnosed_not_fatal() {
        let parsed = parse("<1g>");
        assert_eq!(parsed.jobs, vec![JobSpec::Fixed { value: 0x1010_1010_1010_1010 }]);
        assert_eq!(parsed.diagnostics.len(), 1);
        assert!(parsed.diagnostics[0].contains("'g'"));
    }

    #[test]
    fn test_over_long_pattern_still_validates_tail() {
        let parsed = parse("<0123456789abcdefZ>");
        assert_eq!(parsed.diagnostics.len(), 1);
    }

    #[test]
    fn test_unmatched_close_ignored() {
        let parsed = parse(">1");
        assert_eq!(parsed.jobs, vec![JobSpec::Fixed { value: 0x1111_1111_1111_1111 }]);
        assert!(parsed.diagnostics[0].contains("Unmatched"));
    }

    #[test]
    fn test_unclosed_bracket_dropped() {
        let parsed = parse("1<ff");
        assert_eq!(parsed.jobs.len(), 1);
        assert!(parsed.diagnostics[0].contains("Unclosed"));
    }

    #[test]
    fn test_nested_open_restarts_bracket() {
        assert_eq!(fixed("<12<34>"), 0x3434_3434_3434_3434);
    }

    #[test]
    fn test_mixed_token() {
        let parsed = parse("r<r10>f<00ff>");
        assert_eq!(
            parsed.jobs,
            vec![
                JobSpec::Random { seed: None },
                JobSpec::Random { seed: Some(0x10) },
                JobSpec::Fixed { value: u64::MAX },
                JobSpec::Fixed { value: 0x00ff_00ff_00ff_00ff },
            ]
        );
    }

    #[test]
    fn test_bad_seed_is_error() {
        assert!(matches!(parse_tokens(["<rxyz>"]), Err(Error::InvalidJobSpec(_))));
        assert!(matches!(parse_tokens(["<r>"]), Err(Error::InvalidJobSpec(_))));
    }

    #[test]
    fn test_zero_seed_rejected_on_instantiate() {
        let spec = parse("<r0>").jobs[0];
        assert!(matches!(spec.instantiate(Algorithm::ChaCha20), Err(Error::ZeroSeed)));
    }

    #[test]
    fn test_no_tokens_gives_defaults() {
        let parsed = parse_tokens(Vec::<String>::new()).unwrap();
        assert_eq!(parsed.jobs, default_jobs());
    }

    #[test]
    fn test_instantiate_seeding() {
        let job = JobSpec::Random { seed: Some(5) }.instantiate(Algorithm::Xorshift64).unwrap();
        assert_eq!(job.seeding, Seeding::Replay);
        assert_eq!(job.generator.seed(), 5);

        let job = JobSpec::Random { seed: None }.instantiate(Algorithm::Xorshift64).unwrap();
        assert_eq!(job.seeding, Seeding::Fresh);

        let job = JobSpec::Fixed { value: 9 }.instantiate(Algorithm::Xorshift64).unwrap();
        assert_eq!(job.generator.seed(), 9);
    }
}
