//! Regression tests for pinned generator output, parsing and fault handling

use blkverify::pattern::{ChaCha12, ChaCha20, ChaCha8, Xorshift64};
use blkverify::{
    parse_tokens, EngineConfig, ErrorRecord, Generator, JobSpec, MemDevice, PatternGenerator,
    Phase, RecordLog, Seeding, TestEngine,
};
use nix::errno::Errno;

const SEED: u64 = 0x0123_4567_89ab_cdef;

fn first_words<G: PatternGenerator<Word = u64>>(mut gen: G, seed: u64, n: usize) -> Vec<u64> {
    gen.set_seed(seed).unwrap();
    let mut out = vec![0u64; n];
    gen.fill(&mut out);
    out
}

// ============================================================================
// Generator reference vectors
// ============================================================================

#[test]
fn test_chacha20_first_16_words() {
    let expected: [u64; 16] = [
        0xfa1a_2dab_8d6e_d49e,
        0xe1da_b07e_5909_e822,
        0x380c_6885_4987_704e,
        0x53f8_cdd8_9ee2_9377,
        0xdf32_95c9_f6c5_d750,
        0xfc99_4ad4_324e_abdf,
        0x2bc4_b3f9_e6ae_07cd,
        0x92a7_eef3_e71a_8873,
        0x3ae5_a911_9a60_2eef,
        0x3f90_cc65_e4f2_7984,
        0xe0b6_6d5f_2e07_f772,
        0xf31c_b034_3e34_4177,
        0x6c52_b876_0af0_7b72,
        0xf590_eeb2_d394_1e72,
        0x1ed4_530b_5f7a_bef1,
        0x31e0_1e96_56e4_f688,
    ];
    assert_eq!(first_words(ChaCha20::new(), SEED, 16), expected);
}

#[test]
fn test_chacha8_first_16_words() {
    let expected: [u64; 16] = [
        0x7f89_3f2c_12a2_d80a,
        0x9526_55cd_d07d_a73c,
        0xf93b_8d1a_99cc_c968,
        0x0a70_a6ff_91a6_1cdf,
        0xb53a_9feb_5627_1b32,
        0x702a_ca19_a91e_a740,
        0x185e_30a7_dac3_e7ed,
        0xb480_06bd_def9_d450,
        0x7006_56fb_883c_09b6,
        0x1eaa_da08_d1a4_e293,
        0x8d56_42e0_8a41_7968,
        0xd347_3c87_5248_98ce,
        0x9504_984b_3ea9_bf18,
        0x56eb_00e1_e3f9_9c8c,
        0x4c79_1596_2ebc_acea,
        0x68f2_d2a2_7de9_8a59,
    ];
    assert_eq!(first_words(ChaCha8::new(), SEED, 16), expected);
}

#[test]
fn test_chacha12_first_16_words() {
    let expected: [u64; 16] = [
        0x07a8_1d66_ff31_f800,
        0xf64a_cc4c_712e_ca50,
        0x3a2b_df48_c139_bab0,
        0x4911_685f_e6bc_42a0,
        0x45a6_c735_14ea_3548,
        0x8d8b_cfb3_105c_5810,
        0x69e0_cf1f_dc4e_cbef,
        0x7e3e_3be3_a1cd_7525,
        0xf957_ddce_2ceb_f4e8,
        0x618d_cef9_3adc_eeec,
        0x812c_08d9_cf69_0c54,
        0xafac_c361_13d8_48b1,
        0xe84d_6e3d_a05e_4214,
        0xf3b4_2f2d_7493_7d51,
        0xe749_ccc8_c52c_84a2,
        0x75b4_a7e9_3310_4958,
    ];
    assert_eq!(first_words(ChaCha12::new(), SEED, 16), expected);
}

#[test]
fn test_chacha_round_counts_differ() {
    let c8 = first_words(ChaCha8::new(), SEED, 16);
    let c12 = first_words(ChaCha12::new(), SEED, 16);
    let c20 = first_words(ChaCha20::new(), SEED, 16);
    assert_ne!(c8, c12);
    assert_ne!(c12, c20);
}

#[test]
fn test_xorshift_vectors() {
    assert_eq!(
        first_words(Xorshift64::new(false), 1, 4),
        [0x4082_2041_u64, 0x1000_4106_0c01_1441, 0x9b1e_842f_6e86_2629, 0xf554_f503_555d_8025]
    );
    assert_eq!(
        first_words(Xorshift64::new(true), 1, 2),
        [0xbafa_cf62_4f01_c45d_u64, 0x02da_6891_e507_685d]
    );
}

// ============================================================================
// Job spec examples
// ============================================================================

#[test]
fn test_job_spec_examples() {
    let parsed = parse_tokens(["<deadbeef>", "a", "<r1234>"]).unwrap();
    assert_eq!(
        parsed.jobs,
        vec![
            JobSpec::Fixed { value: 0xdead_beef_dead_beef },
            JobSpec::Fixed { value: 0xaaaa_aaaa_aaaa_aaaa },
            JobSpec::Random { seed: Some(0x1234) },
        ]
    );
    assert!(parsed.diagnostics.is_empty());
}

#[test]
fn test_bracket_does_not_span_tokens() {
    let parsed = parse_tokens(["<12", "34>"]).unwrap();
    // "<12" is unclosed and dropped; in "34>" the digits are jobs and '>' is unmatched.
    assert_eq!(
        parsed.jobs,
        vec![
            JobSpec::Fixed { value: 0x3333_3333_3333_3333 },
            JobSpec::Fixed { value: 0x4444_4444_4444_4444 },
        ]
    );
    assert_eq!(parsed.diagnostics.len(), 2);
}

// ============================================================================
// Fault handling on a simulated device
// ============================================================================

const BLOCK: u64 = 4096;
const CHUNK: u64 = BLOCK * 4;

fn run(dev: &mut MemDevice, seed: u64) -> (blkverify::JobReport, RecordLog) {
    let engine = TestEngine::new(EngineConfig::new(true, true, 4, 2).unwrap());
    let mut gen = Generator::random(blkverify::Algorithm::ChaCha20);
    gen.set_seed(seed).unwrap();
    let mut log = RecordLog::new();
    let report = engine.run_job(dev, &mut gen, Seeding::Replay, &mut log).unwrap();
    (report, log)
}

#[test]
fn test_write_fault_at_chunk_k() {
    let mut dev = MemDevice::new(10 * CHUNK as usize, BLOCK);
    dev.fail_write_at(7 * 4, Errno::EIO);
    let (report, log) = run(&mut dev, SEED);

    let writes: Vec<_> = log.errors_in(Phase::Write).copied().collect();
    assert_eq!(
        writes,
        vec![ErrorRecord::Io {
            phase: Phase::Write,
            byte_offset: 7 * CHUNK,
            ret: -1,
            errno: libc::EIO,
        }]
    );
    assert_eq!(report.write_errors, 1);
    assert_eq!(report.read_errors, 0);
    // Chunks after k were still written and verify clean.
    assert!(log
        .errors_in(Phase::Verify)
        .all(|r| r.byte_offset() == 7 * CHUNK));
    assert_eq!(report.last_chunk, 10);
}

#[test]
fn test_read_fault_at_chunk_k() {
    let mut dev = MemDevice::new(10 * CHUNK as usize, BLOCK);
    dev.fail_read_at(0, Errno::EIO);
    let (report, log) = run(&mut dev, SEED);

    assert_eq!(log.errors.len(), 1);
    assert_eq!(log.errors[0].phase(), Phase::Read);
    assert_eq!(log.errors[0].byte_offset(), 0);
    assert_eq!(report.read_errors, 1);
    assert_eq!(report.verify_errors, 0);
    assert_eq!(log.errors[0].to_tsv(), "R\t0000000000000000\t-0000001\t5");
}

#[test]
fn test_corruption_offsets() {
    let mut dev = MemDevice::new(10 * CHUNK as usize, BLOCK);
    let word = 1000u64;
    dev.corrupt_read(5 * CHUNK + word * 8, 0x8000_0000_0000_0000);
    let (report, log) = run(&mut dev, SEED);

    assert_eq!(report.verify_errors, 1);
    let ErrorRecord::Mismatch {
        byte_offset,
        word_offset,
        expected,
        actual,
    } = log.errors[0]
    else {
        panic!("expected a mismatch, got {:?}", log.errors[0]);
    };
    assert_eq!(byte_offset, 5 * CHUNK);
    assert_eq!(word_offset, word * 8);
    assert_eq!(actual, expected ^ 0x8000_0000_0000_0000);
    assert!(log.errors[0].to_tsv().starts_with("V\t0000000000014000\t00001f40\t"));
}

#[test]
fn test_mismatches_beyond_console_cap_are_all_logged() {
    let mut dev = MemDevice::new(2 * CHUNK as usize, BLOCK);
    let n = blkverify::CONSOLE_MISMATCHES_PER_CHUNK * 3;
    for w in 0..n {
        dev.corrupt_read(w * 8, 0xff);
    }
    let (report, log) = run(&mut dev, 42);
    assert_eq!(report.verify_errors, n);
    assert_eq!(log.errors_in(Phase::Verify).count() as u64, n);
}
