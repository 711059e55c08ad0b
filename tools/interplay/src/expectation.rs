use crate::interaction::SourceLocation;
use crate::matcher::Matcher;
use crate::merge::MergedInteraction;
use crate::recorder::{InteractionRecording, Recorder, RecorderId};
use std::fmt;
use std::sync::Arc;

/// Identifies an expectation within the pattern that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ExpectationHandle(pub(crate) u64);

/// A matcher bound to one recorder, erased over the recorder's value type.
#[derive(Clone)]
pub struct Expectation {
    handle: ExpectationHandle,
    description: String,
    recorder: Arc<dyn InteractionRecording>,
    matches_index: Arc<dyn Fn(usize) -> bool + Send + Sync>,
    negative: bool,
    location: SourceLocation,
}

impl Expectation {
    pub(crate) fn new<V>(
        handle: ExpectationHandle,
        matcher: Matcher<V>,
        recorder: &Arc<Recorder<V>>,
        negative: bool,
        location: SourceLocation,
    ) -> Self
    where
        V: Send + Sync + 'static,
    {
        let description = matcher.description().to_string();
        let typed = Arc::clone(recorder);
        let matches_index = move |index: usize| typed.matches_at(index, |v| matcher.matches(v));
        Self {
            handle,
            description,
            recorder: Arc::clone(recorder) as Arc<dyn InteractionRecording>,
            matches_index: Arc::new(matches_index),
            negative,
            location,
        }
    }

    pub fn handle(&self) -> ExpectationHandle {
        self.handle
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn recorder_id(&self) -> RecorderId {
        self.recorder.id()
    }

    pub(crate) fn recorder(&self) -> Arc<dyn InteractionRecording> {
        Arc::clone(&self.recorder)
    }

    pub fn is_negative(&self) -> bool {
        self.negative
    }

    pub fn location(&self) -> SourceLocation {
        self.location
    }

    /// Whether `merged` was recorded by this expectation's recorder and its
    /// value satisfies the matcher.
    pub fn matches(&self, merged: &MergedInteraction) -> bool {
        merged.recorder_id() == self.recorder.id() && (self.matches_index)(merged.index)
    }
}

impl fmt::Display for Expectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description)
    }
}

impl fmt::Debug for Expectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Expectation")
            .field("handle", &self.handle)
            .field("description", &self.description)
            .field("recorder", &self.recorder.id())
            .field("negative", &self.negative)
            .field("location", &self.location)
            .finish()
    }
}
