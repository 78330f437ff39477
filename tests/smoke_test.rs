//! Smoke tests for basic functionality

use blkverify::{
    parse_tokens, Algorithm, EngineConfig, Generator, MemDevice, PatternGenerator, RecordLog,
    TestEngine,
};

#[test]
fn test_version_exists() {
    // Verify the crate version string is valid semver
    let version = env!("CARGO_PKG_VERSION");
    assert!(!version.is_empty());
    let parts: Vec<&str> = version.split('.').collect();
    assert_eq!(parts.len(), 3, "Version should be semver: {version}");
}

#[test]
fn test_default_jobs_run_clean() {
    let parsed = parse_tokens(Vec::<&str>::new()).unwrap();
    assert_eq!(parsed.jobs.len(), 2);

    let engine = TestEngine::new(EngineConfig::default());
    let mut device = MemDevice::new(1 << 20, 4096);
    let mut log = RecordLog::new();

    for spec in &parsed.jobs {
        let mut job = spec.instantiate(Algorithm::default()).unwrap();
        let report = engine
            .run_job(&mut device, &mut job.generator, job.seeding, &mut log)
            .unwrap();
        assert_eq!(report.total_errors(), 0, "{}", report.name);
        assert_eq!(report.device_bytes, 1 << 20);
    }

    assert_eq!(log.jobs.len(), 2);
    assert!(log.jobs[0].starts_with("Random "));
    assert_eq!(log.jobs[1], "Sequence 0000000000000000");
    assert!(device.contents().iter().all(|&b| b == 0));
}

#[test]
fn test_every_algorithm_runs() {
    let engine = TestEngine::new(EngineConfig::new(true, true, 2, 4).unwrap());
    for &algo in Algorithm::all() {
        let mut device = MemDevice::new(64 * 1024, 512);
        let mut gen = Generator::random(algo);
        gen.set_seed(0x5eed).unwrap();
        let report = engine
            .run_job(&mut device, &mut gen, blkverify::Seeding::Replay, &mut RecordLog::new())
            .unwrap();
        assert_eq!(report.total_errors(), 0, "{algo}");
        assert!(report.name.ends_with(&format!("({algo})")));
    }
}
