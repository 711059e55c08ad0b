use crate::errors::InterplayError;
use crate::logging::DEFAULT_MAX_PAYLOAD_BYTES;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InterplayConfig {
    pub pattern: PatternConfig,
    pub verification: VerificationConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PatternConfig {
    pub strict: bool,
    pub ordered: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct VerificationConfig {
    pub poll_interval_ms: u64,
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoggingConfig {
    pub path: Option<PathBuf>,
    pub max_payload_bytes: usize,
}

impl Default for InterplayConfig {
    fn default() -> Self {
        Self {
            pattern: PatternConfig {
                strict: true,
                ordered: true,
            },
            verification: VerificationConfig {
                poll_interval_ms: 10,
                timeout_ms: 0,
            },
            logging: LoggingConfig {
                path: None,
                max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PartialInterplayConfig {
    pattern: Option<PartialPatternConfig>,
    verification: Option<PartialVerificationConfig>,
    logging: Option<PartialLoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PartialPatternConfig {
    strict: Option<bool>,
    ordered: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PartialVerificationConfig {
    poll_interval_ms: Option<u64>,
    timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PartialLoggingConfig {
    path: Option<PathBuf>,
    max_payload_bytes: Option<usize>,
}

/// Parses a TOML document; omitted keys keep their defaults.
pub fn parse_config(text: &str) -> Result<InterplayConfig, InterplayError> {
    let partial: PartialInterplayConfig =
        toml::from_str(text).map_err(|e| InterplayError::ConfigParse(e.to_string()))?;
    let mut cfg = InterplayConfig::default();
    merge_partial_config(&mut cfg, partial);
    validate_config(&cfg)?;
    Ok(cfg)
}

pub fn load_config(path: &Path) -> Result<InterplayConfig, InterplayError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| InterplayError::Io(format!("{}: {e}", path.display())))?;
    parse_config(&text)
}

fn merge_partial_config(cfg: &mut InterplayConfig, partial: PartialInterplayConfig) {
    if let Some(pattern) = partial.pattern {
        if let Some(strict) = pattern.strict {
            cfg.pattern.strict = strict;
        }
        if let Some(ordered) = pattern.ordered {
            cfg.pattern.ordered = ordered;
        }
    }

    if let Some(verification) = partial.verification {
        if let Some(value) = verification.poll_interval_ms {
            cfg.verification.poll_interval_ms = value;
        }
        if let Some(value) = verification.timeout_ms {
            cfg.verification.timeout_ms = value;
        }
    }

    if let Some(logging) = partial.logging {
        if let Some(path) = logging.path {
            cfg.logging.path = Some(path);
        }
        if let Some(value) = logging.max_payload_bytes {
            cfg.logging.max_payload_bytes = value;
        }
    }
}

fn validate_config(cfg: &InterplayConfig) -> Result<(), InterplayError> {
    if cfg.verification.poll_interval_ms == 0 {
        return Err(InterplayError::InvalidConfig(
            "verification.poll_interval_ms must be greater than zero".to_string(),
        ));
    }

    if cfg.logging.max_payload_bytes == 0 {
        return Err(InterplayError::InvalidConfig(
            "logging.max_payload_bytes must be greater than zero".to_string(),
        ));
    }

    if let Some(path) = &cfg.logging.path {
        if path.as_os_str().is_empty() {
            return Err(InterplayError::InvalidConfig(
                "logging.path must not be empty".to_string(),
            ));
        }
    }

    Ok(())
}
