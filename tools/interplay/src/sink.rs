//! Destinations for verification failures.
//!
//! Verification never aborts on the first mismatch; every failure of a pass is
//! handed to a [`FailureSink`]. Tests usually bind a closure or a
//! [`FailureCollector`]; [`crate::pattern::Pattern::verify`] binds the panic of
//! the host test harness.

use crate::errors::InterplayError;
use crate::logging::JsonlLogger;
use serde::Serialize;
use serde_json::json;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Failure {
    pub message: String,
    pub file: String,
    pub line: u32,
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.file, self.line, self.message)
    }
}

pub trait FailureSink {
    fn fail(&mut self, message: &str, file: &str, line: u32);
}

impl<F> FailureSink for F
where
    F: FnMut(&str, &str, u32),
{
    fn fail(&mut self, message: &str, file: &str, line: u32) {
        self(message, file, line)
    }
}

/// In-memory sink.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FailureCollector {
    failures: Vec<Failure>,
}

impl FailureCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failures(&self) -> &[Failure] {
        &self.failures
    }

    pub fn messages(&self) -> Vec<String> {
        self.failures.iter().map(|f| f.message.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn into_failures(self) -> Vec<Failure> {
        self.failures
    }
}

impl FailureSink for FailureCollector {
    fn fail(&mut self, message: &str, file: &str, line: u32) {
        self.failures.push(Failure {
            message: message.to_string(),
            file: file.to_string(),
            line,
        });
    }
}

/// Writes each failure as a `verification_failure` event. The sink interface
/// cannot fail, so the first write error is held until [`Self::take_error`].
#[derive(Debug)]
pub struct JsonlFailureSink {
    logger: JsonlLogger,
    error: Option<InterplayError>,
    written: usize,
}

impl JsonlFailureSink {
    pub fn new(logger: JsonlLogger) -> Self {
        Self {
            logger,
            error: None,
            written: 0,
        }
    }

    pub fn written(&self) -> usize {
        self.written
    }

    pub fn take_error(&mut self) -> Option<InterplayError> {
        self.error.take()
    }
}

impl FailureSink for JsonlFailureSink {
    fn fail(&mut self, message: &str, file: &str, line: u32) {
        let result = self.logger.log(
            "error",
            "verification_failure",
            json!({ "message": message, "file": file, "line": line }),
        );
        match result {
            Ok(()) => self.written += 1,
            Err(err) => {
                if self.error.is_none() {
                    self.error = Some(err);
                }
            }
        }
    }
}
