// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{Result, TaskGraphError};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = TaskGraphError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.executor, raw.logging))
    }
}

/// Check the semantic invariants serde cannot express.
pub fn validate_config(cfg: &RawConfigFile) -> Result<()> {
    validate_executor(cfg)?;
    Ok(())
}

fn validate_executor(cfg: &RawConfigFile) -> Result<()> {
    if cfg.executor.event_buffer == 0 {
        return Err(TaskGraphError::ConfigError(
            "[executor].event_buffer must be >= 1 (got 0)".to_string(),
        ));
    }

    if cfg.executor.timeout_ms == Some(0) {
        return Err(TaskGraphError::ConfigError(
            "[executor].timeout_ms must be >= 1 when set (got 0)".to_string(),
        ));
    }

    Ok(())
}
