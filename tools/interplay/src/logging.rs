use crate::errors::InterplayError;
use serde::Serialize;
use serde_json::Value;
use std::fmt::Display;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

pub const DEFAULT_MAX_PAYLOAD_BYTES: usize = 4096;

/// Appends structured verification events to a JSONL file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonlLogger {
    pub path: PathBuf,
    pub max_payload_bytes: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct LogEvent<'a> {
    pub level: &'a str,
    pub event_type: &'a str,
    pub payload: Value,
}

fn io_error(context: &Path, err: impl Display) -> InterplayError {
    InterplayError::Io(format!("{}: {err}", context.display()))
}

impl JsonlLogger {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
        }
    }

    pub fn log(&self, level: &str, event_type: &str, payload: Value) -> Result<(), InterplayError> {
        self.append(&LogEvent {
            level,
            event_type,
            payload,
        })
    }

    pub fn append(&self, event: &LogEvent<'_>) -> Result<(), InterplayError> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|e| io_error(dir, e))?;
        }
        let bounded = LogEvent {
            payload: truncate_json(event.payload.clone(), self.max_payload_bytes),
            ..event.clone()
        };
        let line = serde_json::to_string(&bounded).map_err(|e| io_error(&self.path, e))?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| io_error(&self.path, e))?;
        writeln!(file, "{line}").map_err(|e| io_error(&self.path, e))
    }
}

/// Replaces a payload whose rendering exceeds `max_bytes` with a string
/// holding its cut-off rendering followed by `...`.
fn truncate_json(value: Value, max_bytes: usize) -> Value {
    let rendered = value.to_string();
    if rendered.len() <= max_bytes {
        return value;
    }
    let mut cut = max_bytes.saturating_sub(3);
    while !rendered.is_char_boundary(cut) {
        cut -= 1;
    }
    Value::String(format!("{}...", &rendered[..cut]))
}

#[cfg(test)]
mod tests {
    use super::{truncate_json, JsonlLogger};
    use crate::errors::InterplayError;
    use serde_json::json;

    #[test]
    fn oversized_payloads_are_cut_and_each_event_is_one_line() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("verify.jsonl");
        let mut logger = JsonlLogger::new(&path);
        logger.max_payload_bytes = 20;

        logger
            .log(
                "info",
                "verify_attempt",
                json!({"text": "abcdefghijklmnopqrstuvwxyz"}),
            )
            .expect("append");
        logger
            .log("error", "verify_result", json!({"ok": false}))
            .expect("append");

        let text = std::fs::read_to_string(&path).expect("read");
        let lines = text.lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("\"event_type\":\"verify_attempt\""));
        assert!(lines[0].contains("..."));
        assert!(lines[1].contains("\"ok\":false"));
    }

    #[test]
    fn truncation_never_splits_a_character() {
        let truncated = truncate_json(json!("ééééééééé"), 8);
        let text = truncated.as_str().expect("string payload");
        assert!(text.ends_with("..."));
        assert!(text.len() <= 8);
    }

    #[test]
    fn unwritable_path_is_an_io_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = JsonlLogger::new(dir.path())
            .log("info", "verify_attempt", json!({}))
            .expect_err("directory is not appendable");
        assert!(matches!(err, InterplayError::Io(_)));
    }
}
