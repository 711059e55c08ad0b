use std::fmt::Debug;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InterplayError {
    #[error("io error: {0}")]
    Io(String),
    #[error("config parse error: {0}")]
    ConfigParse(String),
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("clock error: {0}")]
    Clock(String),
    #[error("only nice patterns may have negative expectations")]
    NegativeExpectationOnStrictPattern,
}

/// Raised synchronously by a [`crate::behavior::Behavior`] when no reaction
/// matches the invoked value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BehaviorError<V: Debug> {
    #[error("unexpected interaction: {0:?}")]
    UnexpectedInteraction(V),
}
