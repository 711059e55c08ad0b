use crate::errors::InterplayError;
use crate::expectation::ExpectationHandle;
use crate::logical_clock::Timestamp;
use crate::matcher::IntoMatcher;
use crate::pattern::{Pattern, VerifyOptions, VerifyReport};
use crate::recorder::Recorder;
use crate::runtime::Clock;
use crate::sink::FailureSink;
use std::fmt::Debug;
use std::sync::Arc;

/// A single recorder verified by its own pattern.
#[derive(Debug)]
pub struct Mock<V> {
    recorder: Arc<Recorder<V>>,
    pattern: Pattern,
}

impl<V> Mock<V>
where
    V: Debug + Send + Sync + 'static,
{
    pub fn new(strict: bool, ordered: bool) -> Self {
        Self::with_recorder(Arc::new(Recorder::new()), Pattern::new(strict, ordered))
    }

    pub fn with_recorder(recorder: Arc<Recorder<V>>, pattern: Pattern) -> Self {
        Self { recorder, pattern }
    }

    pub fn strict(ordered: bool) -> Self {
        Self::new(true, ordered)
    }

    pub fn nice(ordered: bool) -> Self {
        Self::new(false, ordered)
    }

    pub fn recorder(&self) -> &Arc<Recorder<V>> {
        &self.recorder
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    #[track_caller]
    pub fn record(&self, value: V) -> Timestamp {
        self.recorder.record(value)
    }

    #[track_caller]
    pub fn expect<M>(&self, matcher: M) -> ExpectationHandle
    where
        M: IntoMatcher<Value = V>,
    {
        self.pattern.expect(matcher, &self.recorder)
    }

    #[track_caller]
    pub fn reject<M>(&self, matcher: M) -> ExpectationHandle
    where
        M: IntoMatcher<Value = V>,
    {
        self.pattern.reject(matcher, &self.recorder)
    }

    pub fn remove(&self, handle: ExpectationHandle) -> bool {
        self.pattern.remove(handle)
    }

    #[track_caller]
    pub fn verify(&self) {
        self.pattern.verify()
    }

    pub fn verify_with(
        &self,
        options: &VerifyOptions,
        clock: &dyn Clock,
        sink: &mut dyn FailureSink,
    ) -> Result<VerifyReport, InterplayError> {
        self.pattern.verify_with(options, clock, sink)
    }
}

impl<V> Default for Mock<V>
where
    V: Debug + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new(true, true)
    }
}
