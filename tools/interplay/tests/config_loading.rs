use interplay::config::{load_config, parse_config};
use interplay::errors::InterplayError;
use interplay::logging::JsonlLogger;
use interplay::runtime::FakeClock;
use interplay::sink::JsonlFailureSink;
use interplay::{Pattern, Recorder, VerifyOptions};
use std::sync::Arc;
use std::time::Duration;

#[test]
fn config_file_drives_pattern_mode_and_verification_options() {
    let dir = tempfile::tempdir().expect("tempdir");
    let log_path = dir.path().join("verify.jsonl");
    let config_path = dir.path().join("interplay.toml");
    std::fs::write(
        &config_path,
        format!(
            "[pattern]\nstrict = false\nordered = false\n\n\
             [verification]\npoll_interval_ms = 5\ntimeout_ms = 40\n\n\
             [logging]\npath = {:?}\nmax_payload_bytes = 512\n",
            log_path.display().to_string()
        ),
    )
    .expect("write config");

    let cfg = load_config(&config_path).expect("load config");
    let pattern = Pattern::from_config(&cfg.pattern);
    assert!(!pattern.is_strict());
    assert!(!pattern.is_ordered());

    let options = VerifyOptions::from_config(&cfg);
    assert_eq!(options.poll_interval, Duration::from_millis(5));
    assert_eq!(options.timeout, Duration::from_millis(40));
    let logger = options.logger.clone().expect("logger configured");
    assert_eq!(logger.path, log_path);
    assert_eq!(logger.max_payload_bytes, 512);

    let recorder: Arc<Recorder<i32>> = Arc::new(Recorder::new());
    recorder.record(1);
    pattern.expect(1, &recorder);
    let mut sink = JsonlFailureSink::new(JsonlLogger::new(dir.path().join("failures.jsonl")));
    let report = pattern
        .verify_with(&options, &FakeClock::default(), &mut sink)
        .expect("verify");
    assert!(report.is_success());
    assert_eq!(sink.written(), 0);

    let log = std::fs::read_to_string(&log_path).expect("read log");
    assert!(log.lines().any(|line| line.contains("\"verify_result\"")));
}

#[test]
fn failures_go_to_jsonl_sink() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("failures.jsonl");
    let recorder: Arc<Recorder<i32>> = Arc::new(Recorder::new());
    let pattern = Pattern::default();
    pattern.expect(9, &recorder);

    let mut sink = JsonlFailureSink::new(JsonlLogger::new(&path));
    pattern
        .verify_with(&VerifyOptions::default(), &FakeClock::default(), &mut sink)
        .expect("verify");
    assert_eq!(sink.written(), 1);
    assert!(sink.take_error().is_none());

    let text = std::fs::read_to_string(&path).expect("read failures");
    assert!(text.contains("Expectation <9> not fulfilled"));
}

#[test]
fn missing_config_file_is_an_io_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let err = load_config(&dir.path().join("absent.toml")).expect_err("missing file");
    assert!(matches!(err, InterplayError::Io(_)));
}

#[test]
fn empty_logging_path_is_rejected() {
    let err = parse_config("[logging]\npath = \"\"\n").expect_err("invalid");
    assert!(matches!(err, InterplayError::InvalidConfig(_)));
}

#[test]
fn defaults_give_a_single_attempt_without_logging() {
    let cfg = parse_config("").expect("parse");
    let options = VerifyOptions::from_config(&cfg);
    assert_eq!(options, VerifyOptions::default());
    assert!(Pattern::from_config(&cfg.pattern).is_strict());
}
