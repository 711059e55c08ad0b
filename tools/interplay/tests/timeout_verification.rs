use interplay::errors::InterplayError;
use interplay::logging::JsonlLogger;
use interplay::logical_clock::LogicalClock;
use interplay::runtime::{Clock, FakeClock, ProductionClock};
use interplay::{FailureCollector, Pattern, Recorder, VerifyOptions};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

fn recorder() -> Arc<Recorder<i32>> {
    Arc::new(Recorder::with_clock(Arc::new(LogicalClock::new())))
}

/// Fake clock that records a value on the recorder during the n-th sleep,
/// standing in for a collaborator thread finishing its work.
struct RecordingDuringSleep {
    inner: FakeClock,
    recorder: Arc<Recorder<i32>>,
    on_sleep: usize,
    value: i32,
    sleeps: AtomicUsize,
}

impl Clock for RecordingDuringSleep {
    fn now(&self) -> SystemTime {
        self.inner.now()
    }

    fn sleep_until(&self, deadline: SystemTime) -> Result<(), InterplayError> {
        let n = self.sleeps.fetch_add(1, Ordering::SeqCst) + 1;
        if n == self.on_sleep {
            self.recorder.record(self.value);
        }
        self.inner.sleep_until(deadline)
    }
}

#[test]
fn zero_timeout_makes_exactly_one_attempt() {
    let r = recorder();
    let pattern = Pattern::default();
    pattern.expect(1, &r);

    let clock = FakeClock::default();
    let mut collector = FailureCollector::new();
    let report = pattern
        .verify_with(&VerifyOptions::default(), &clock, &mut collector)
        .expect("verify");

    assert_eq!(report.attempts, 1);
    assert!(clock.sleeps().is_empty());
    assert_eq!(collector.messages(), vec!["Expectation <1> not fulfilled"]);
}

#[test]
fn poll_interval_doubles_and_is_capped_by_the_deadline() {
    let r = recorder();
    let pattern = Pattern::default();
    pattern.expect(1, &r);

    let clock = FakeClock::default();
    let options = VerifyOptions::with_timeout(Duration::from_millis(100))
        .poll_interval(Duration::from_millis(10));
    let mut collector = FailureCollector::new();
    let report = pattern
        .verify_with(&options, &clock, &mut collector)
        .expect("verify");

    let at = |ms| UNIX_EPOCH + Duration::from_millis(ms);
    assert_eq!(clock.sleeps(), vec![at(10), at(30), at(70), at(100)]);
    assert_eq!(report.attempts, 5);
    // Intermediate attempts are never reported, only the final one.
    assert_eq!(collector.messages(), vec!["Expectation <1> not fulfilled"]);
}

#[test]
fn write_before_the_deadline_satisfies_the_pattern() {
    let r = recorder();
    let pattern = Pattern::default();
    pattern.expect(1, &r);

    let clock = RecordingDuringSleep {
        inner: FakeClock::default(),
        recorder: Arc::clone(&r),
        on_sleep: 2,
        value: 1,
        sleeps: AtomicUsize::new(0),
    };
    let mut collector = FailureCollector::new();
    let report = pattern
        .verify_with(
            &VerifyOptions::with_timeout(Duration::from_secs(1)),
            &clock,
            &mut collector,
        )
        .expect("verify");

    assert!(report.is_success());
    assert_eq!(report.attempts, 3);
    assert!(collector.is_empty());
    assert!(pattern.is_empty());
}

#[test]
fn wrong_write_before_the_deadline_is_reported_once() {
    let r = recorder();
    let pattern = Pattern::default();
    pattern.expect(1, &r);

    let clock = RecordingDuringSleep {
        inner: FakeClock::default(),
        recorder: Arc::clone(&r),
        on_sleep: 1,
        value: 2,
        sleeps: AtomicUsize::new(0),
    };
    let mut collector = FailureCollector::new();
    pattern
        .verify_with(
            &VerifyOptions::with_timeout(Duration::from_millis(50)),
            &clock,
            &mut collector,
        )
        .expect("verify");

    assert_eq!(
        collector.messages(),
        vec![
            "Interaction <2> does not match expectation <1>",
            "Expectation <1> not fulfilled",
        ]
    );
}

#[test]
fn timed_out_verification_keeps_fulfilled_expectations_removed() {
    let r = recorder();
    r.record(1);
    let pattern = Pattern::nice(true);
    pattern.expect(1, &r);
    pattern.expect(2, &r);

    let mut collector = FailureCollector::new();
    pattern
        .verify_with(
            &VerifyOptions::with_timeout(Duration::from_millis(20)),
            &FakeClock::default(),
            &mut collector,
        )
        .expect("verify");

    assert_eq!(collector.messages(), vec!["Expectation <2> not fulfilled"]);
    assert_eq!(pattern.len(), 1);
}

#[test]
fn write_from_another_thread_satisfies_the_pattern() {
    let r = recorder();
    let pattern = Pattern::default();
    pattern.expect(1, &r);

    let writer = {
        let r = Arc::clone(&r);
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(50));
            r.record(1);
        })
    };

    let mut collector = FailureCollector::new();
    let report = pattern
        .verify_with(
            &VerifyOptions::with_timeout(Duration::from_secs(5))
                .poll_interval(Duration::from_millis(5)),
            &ProductionClock,
            &mut collector,
        )
        .expect("verify");
    writer.join().expect("join writer");

    assert!(report.is_success(), "failures: {:?}", collector.messages());
    assert!(report.attempts > 1);
}

#[test]
fn overflowing_timeout_is_a_clock_error() {
    let r = recorder();
    let pattern = Pattern::default();
    pattern.expect(1, &r);

    let clock = FakeClock::new(UNIX_EPOCH);
    let mut collector = FailureCollector::new();
    let err = pattern
        .verify_with(&VerifyOptions::with_timeout(Duration::MAX), &clock, &mut collector)
        .expect_err("overflow");
    assert!(matches!(err, InterplayError::Clock(_)));
    assert!(collector.is_empty());
}

#[test]
fn attempts_and_result_are_logged_as_jsonl() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("logs").join("verify.jsonl");

    let r = recorder();
    let pattern = Pattern::default();
    pattern.expect(1, &r);

    let options = VerifyOptions::with_timeout(Duration::from_millis(10))
        .poll_interval(Duration::from_millis(10))
        .logger(JsonlLogger::new(&path));
    let mut collector = FailureCollector::new();
    pattern
        .verify_with(&options, &FakeClock::default(), &mut collector)
        .expect("verify");

    let text = std::fs::read_to_string(&path).expect("read log");
    let events = text
        .lines()
        .map(|line| serde_json::from_str::<serde_json::Value>(line).expect("json line"))
        .collect::<Vec<_>>();
    let types = events
        .iter()
        .map(|e| e["event_type"].as_str().unwrap_or_default().to_string())
        .collect::<Vec<_>>();
    assert_eq!(types, vec!["verify_attempt", "verify_attempt", "verify_result"]);

    let result = &events[2];
    assert_eq!(result["level"], "error");
    assert_eq!(result["payload"]["success"], false);
    assert_eq!(result["payload"]["attempts"], 2);
    assert_eq!(
        result["payload"]["failures"][0],
        "Expectation <1> not fulfilled"
    );
}
