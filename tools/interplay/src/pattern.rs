//! Expectation patterns verified against recorded interactions.
//!
//! A [`Pattern`] collects expectations over any number of recorders and
//! replays their interactions in global timestamp order:
//!
//! | strict | ordered | unexpected interaction | out-of-order interaction | unfulfilled expectation |
//! |--------|---------|------------------------|--------------------------|-------------------------|
//! | yes    | yes     | failure                | failure                  | failure                 |
//! | yes    | no      | failure                | n/a                      | failure                 |
//! | no     | yes     | ignored                | ignored                  | failure (non-negative)  |
//! | no     | no      | ignored                | ignored                  | failure (non-negative)  |
//!
//! In ordered mode an interaction is only compared with expectations up to
//! and including the first non-negative one, so a later expectation can never
//! be fulfilled ahead of an earlier one.

use crate::config::{InterplayConfig, PatternConfig};
use crate::errors::InterplayError;
use crate::expectation::{Expectation, ExpectationHandle};
use crate::interaction::SourceLocation;
use crate::logging::JsonlLogger;
use crate::matcher::IntoMatcher;
use crate::merge::{ChronologicalMerge, MergedInteraction};
use crate::recorder::{Recorder, RecorderId};
use crate::runtime::{Clock, ProductionClock};
use crate::sink::{Failure, FailureCollector, FailureSink};
use serde_json::json;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyOptions {
    /// Initial wait between attempts; doubles after every failed attempt.
    pub poll_interval: Duration,
    /// Total time to keep retrying. Zero means exactly one attempt.
    pub timeout: Duration,
    pub logger: Option<JsonlLogger>,
}

impl Default for VerifyOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(10),
            timeout: Duration::ZERO,
            logger: None,
        }
    }
}

impl VerifyOptions {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout,
            ..Self::default()
        }
    }

    pub fn from_config(cfg: &InterplayConfig) -> Self {
        let logger = cfg.logging.path.as_ref().map(|path: &PathBuf| {
            let mut logger = JsonlLogger::new(path);
            logger.max_payload_bytes = cfg.logging.max_payload_bytes;
            logger
        });
        Self {
            poll_interval: Duration::from_millis(cfg.verification.poll_interval_ms),
            timeout: Duration::from_millis(cfg.verification.timeout_ms),
            logger,
        }
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn logger(mut self, logger: JsonlLogger) -> Self {
        self.logger = Some(logger);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyReport {
    pub attempts: u32,
    /// Failures of the final attempt, already delivered to the sink.
    pub failures: Vec<Failure>,
}

impl VerifyReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Identifies one recorded interaction: its recorder and its position there.
type InteractionKey = (RecorderId, usize);

#[derive(Default)]
struct Expectations {
    next_handle: u64,
    items: Vec<Expectation>,
    /// Interactions that fulfilled a committed expectation. Later attempts
    /// skip them so a match is never replayed against what remains.
    consumed: BTreeSet<InteractionKey>,
}

/// A positive expectation and the interaction that fulfilled it.
struct Fulfilment {
    handle: ExpectationHandle,
    interaction: InteractionKey,
}

struct Attempt {
    failures: Vec<Failure>,
    fulfilled: Vec<Fulfilment>,
    interactions: usize,
}

pub struct Pattern {
    strict: bool,
    ordered: bool,
    expectations: Mutex<Expectations>,
}

impl Pattern {
    pub fn new(strict: bool, ordered: bool) -> Self {
        Self {
            strict,
            ordered,
            expectations: Mutex::new(Expectations::default()),
        }
    }

    /// Unmatched interactions are failures.
    pub fn strict(ordered: bool) -> Self {
        Self::new(true, ordered)
    }

    /// Unmatched interactions are tolerated; negative expectations allowed.
    pub fn nice(ordered: bool) -> Self {
        Self::new(false, ordered)
    }

    pub fn from_config(cfg: &PatternConfig) -> Self {
        Self::new(cfg.strict, cfg.ordered)
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    pub fn is_ordered(&self) -> bool {
        self.ordered
    }

    /// Number of expectations still pending (including negative ones).
    pub fn len(&self) -> usize {
        self.expectations.lock().expect("expectations lock").items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Expects `recorder` to record a value matching `matcher`.
    #[track_caller]
    pub fn expect<M, V>(&self, matcher: M, recorder: &Arc<Recorder<V>>) -> ExpectationHandle
    where
        M: IntoMatcher<Value = V>,
        V: Send + Sync + 'static,
    {
        self.push(matcher, recorder, false, SourceLocation::caller())
    }

    /// Rejects any value matching `matcher` recorded by `recorder`.
    ///
    /// # Panics
    ///
    /// Panics when called on a strict pattern; negative expectations are only
    /// meaningful when unmatched interactions are otherwise tolerated.
    #[track_caller]
    pub fn reject<M, V>(&self, matcher: M, recorder: &Arc<Recorder<V>>) -> ExpectationHandle
    where
        M: IntoMatcher<Value = V>,
        V: Send + Sync + 'static,
    {
        match self.try_reject(matcher, recorder) {
            Ok(handle) => handle,
            Err(err) => panic!("{err}"),
        }
    }

    #[track_caller]
    pub fn try_reject<M, V>(
        &self,
        matcher: M,
        recorder: &Arc<Recorder<V>>,
    ) -> Result<ExpectationHandle, InterplayError>
    where
        M: IntoMatcher<Value = V>,
        V: Send + Sync + 'static,
    {
        if self.strict {
            return Err(InterplayError::NegativeExpectationOnStrictPattern);
        }
        Ok(self.push(matcher, recorder, true, SourceLocation::caller()))
    }

    /// Withdraws a pending expectation. Returns `false` when it was already
    /// fulfilled or removed.
    pub fn remove(&self, handle: ExpectationHandle) -> bool {
        let mut expectations = self.expectations.lock().expect("expectations lock");
        let before = expectations.items.len();
        expectations.items.retain(|e| e.handle() != handle);
        expectations.items.len() != before
    }

    fn push<M, V>(
        &self,
        matcher: M,
        recorder: &Arc<Recorder<V>>,
        negative: bool,
        location: SourceLocation,
    ) -> ExpectationHandle
    where
        M: IntoMatcher<Value = V>,
        V: Send + Sync + 'static,
    {
        let matcher = matcher.into_matcher();
        let mut expectations = self.expectations.lock().expect("expectations lock");
        expectations.next_handle += 1;
        let handle = ExpectationHandle(expectations.next_handle);
        expectations
            .items
            .push(Expectation::new(handle, matcher, recorder, negative, location));
        handle
    }

    /// Verifies once and panics with every failure message if any
    /// expectation is violated.
    #[track_caller]
    pub fn verify(&self) {
        let mut collector = FailureCollector::new();
        let outcome = self.verify_with(&VerifyOptions::default(), &ProductionClock, &mut collector);
        if let Err(err) = outcome {
            panic!("verification could not run: {err}");
        }
        if !collector.is_empty() {
            let lines = collector
                .failures()
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("\n");
            panic!("verification failed:\n{lines}");
        }
    }

    /// Verifies, retrying until every expectation holds or `options.timeout`
    /// has passed. Only the final attempt's failures reach `sink`.
    pub fn verify_with(
        &self,
        options: &VerifyOptions,
        clock: &dyn Clock,
        sink: &mut dyn FailureSink,
    ) -> Result<VerifyReport, InterplayError> {
        let deadline = clock
            .now()
            .checked_add(options.timeout)
            .ok_or_else(|| InterplayError::Clock("verification timeout overflows".to_string()))?;
        let mut interval = options.poll_interval.max(Duration::from_millis(1));
        let mut attempts = 0u32;

        loop {
            attempts = attempts.saturating_add(1);
            let attempt = self.attempt();
            if let Some(logger) = &options.logger {
                // Progress lines are best effort; only the result line is checked.
                let _ = logger.log(
                    "info",
                    "verify_attempt",
                    json!({
                        "attempt": attempts,
                        "interactions": attempt.interactions,
                        "fulfilled": attempt.fulfilled.len(),
                        "failures": attempt.failures.len(),
                    }),
                );
            }

            let now = clock.now();
            if attempt.failures.is_empty() || now >= deadline {
                self.commit(&attempt.fulfilled);
                for failure in &attempt.failures {
                    sink.fail(&failure.message, &failure.file, failure.line);
                }
                if let Some(logger) = &options.logger {
                    let success = attempt.failures.is_empty();
                    logger.log(
                        if success { "info" } else { "error" },
                        "verify_result",
                        json!({
                            "success": success,
                            "attempts": attempts,
                            "failures": attempt
                                .failures
                                .iter()
                                .map(|f| f.message.as_str())
                                .collect::<Vec<_>>(),
                        }),
                    )?;
                }
                return Ok(VerifyReport {
                    attempts,
                    failures: attempt.failures,
                });
            }

            let wake = now
                .checked_add(interval)
                .map_or(deadline, |wake| wake.min(deadline));
            clock.sleep_until(wake)?;
            interval = interval.saturating_mul(2);
        }
    }

    /// Runs one matching pass over a working copy of the expectations,
    /// leaving out interactions already consumed by earlier verifications.
    fn attempt(&self) -> Attempt {
        let (mut working, consumed) = {
            let expectations = self.expectations.lock().expect("expectations lock");
            (expectations.items.clone(), expectations.consumed.clone())
        };
        let pending = ChronologicalMerge::new(working.iter().map(Expectation::recorder))
            .filter(|merged| !consumed.contains(&(merged.recorder_id(), merged.index)))
            .collect::<Vec<_>>();
        let interactions = pending.len();
        let mut failures = Vec::new();
        let fulfilled = replay(
            self.strict,
            self.ordered,
            &mut working,
            pending.into_iter(),
            &mut failures,
        );
        Attempt {
            failures,
            fulfilled,
            interactions,
        }
    }

    /// Drops fulfilled expectations and retires the interactions that
    /// fulfilled them; anything added meanwhile is kept.
    fn commit(&self, fulfilled: &[Fulfilment]) {
        if fulfilled.is_empty() {
            return;
        }
        let mut expectations = self.expectations.lock().expect("expectations lock");
        expectations
            .items
            .retain(|e| !fulfilled.iter().any(|f| f.handle == e.handle()));
        expectations
            .consumed
            .extend(fulfilled.iter().map(|f| f.interaction));
    }
}

impl Default for Pattern {
    fn default() -> Self {
        Self::new(true, true)
    }
}

impl std::fmt::Debug for Pattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pattern")
            .field("strict", &self.strict)
            .field("ordered", &self.ordered)
            .field("pending", &self.len())
            .finish()
    }
}

enum Scan {
    Matched(usize),
    Blocked,
    Unmatched,
}

/// Matches `interactions` against `expectations`, removing fulfilled ones.
/// Returns the fulfilled expectations in fulfilment order.
fn replay(
    strict: bool,
    ordered: bool,
    expectations: &mut Vec<Expectation>,
    interactions: impl Iterator<Item = MergedInteraction>,
    failures: &mut Vec<Failure>,
) -> Vec<Fulfilment> {
    let mut fulfilled = Vec::new();

    for merged in interactions {
        let mut scan = Scan::Unmatched;
        for (position, expectation) in expectations.iter().enumerate() {
            if expectation.matches(&merged) {
                scan = Scan::Matched(position);
                break;
            }
            if ordered {
                if strict {
                    failures.push(interaction_failure(
                        format!(
                            "Interaction <{}> does not match expectation <{expectation}>",
                            merged.interaction
                        ),
                        &merged,
                    ));
                }
                if !expectation.is_negative() {
                    scan = Scan::Blocked;
                    break;
                }
            }
        }

        match scan {
            Scan::Matched(position) if expectations[position].is_negative() => {
                failures.push(interaction_failure(
                    format!("Interaction <{}> not allowed", merged.interaction),
                    &merged,
                ));
            }
            Scan::Matched(position) => {
                fulfilled.push(Fulfilment {
                    handle: expectations.remove(position).handle(),
                    interaction: (merged.recorder_id(), merged.index),
                });
            }
            Scan::Blocked => {}
            Scan::Unmatched => {
                if strict {
                    failures.push(interaction_failure(
                        format!("Interaction <{}> not expected", merged.interaction),
                        &merged,
                    ));
                }
            }
        }
    }

    for expectation in expectations.iter().filter(|e| !e.is_negative()) {
        let location = expectation.location();
        failures.push(Failure {
            message: format!("Expectation <{expectation}> not fulfilled"),
            file: location.file.to_string(),
            line: location.line,
        });
    }

    fulfilled
}

fn interaction_failure(message: String, merged: &MergedInteraction) -> Failure {
    let location = merged.interaction.location;
    Failure {
        message,
        file: location.file.to_string(),
        line: location.line,
    }
}
