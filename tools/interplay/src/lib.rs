//! Records interactions between a unit under test and its collaborators and
//! verifies them against expectation patterns.
//!
//! Recorders share a logical clock, so interactions captured on different
//! recorders (and threads) can be replayed in one global order. See
//! [`pattern`] for the four verification modes.

pub mod behavior;
pub mod config;
pub mod errors;
pub mod expectation;
pub mod interaction;
pub mod logging;
pub mod logical_clock;
pub mod matcher;
pub mod merge;
pub mod mock;
pub mod pattern;
pub mod recorder;
pub mod runtime;
pub mod sink;

pub use behavior::{Behavior, ReactionHandle};
pub use errors::{BehaviorError, InterplayError};
pub use expectation::ExpectationHandle;
pub use matcher::{any, elements, entries, equals, matches, none, not, some, IntoMatcher, Matcher};
pub use mock::Mock;
pub use pattern::{Pattern, VerifyOptions, VerifyReport};
pub use recorder::Recorder;
pub use sink::{Failure, FailureCollector, FailureSink};
