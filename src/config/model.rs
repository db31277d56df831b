// src/config/model.rs

use std::time::Duration;

use serde::Deserialize;

use crate::logging::LogLevel;

/// Configuration as read from a TOML file, before validation.
///
/// ```toml
/// [executor]
/// event_buffer = 64
/// timeout_ms = 5000
///
/// [logging]
/// level = "debug"
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    /// Executor behaviour from `[executor]`.
    #[serde(default)]
    pub executor: ExecutorSection,

    /// Logging from `[logging]`.
    #[serde(default)]
    pub logging: LoggingSection,
}

/// Validated configuration. Obtain one through `TryFrom<RawConfigFile>` or
/// the loader functions.
#[derive(Debug, Clone, Default)]
pub struct ConfigFile {
    pub executor: ExecutorSection,
    pub logging: LoggingSection,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(executor: ExecutorSection, logging: LoggingSection) -> Self {
        Self { executor, logging }
    }
}

/// `[executor]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExecutorSection {
    /// Capacity of the completion-event channel of a run. Must be >= 1.
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,

    /// Run-wide timeout in milliseconds, layered on top of the caller's
    /// context. `None` means the caller's context alone bounds the run.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

fn default_event_buffer() -> usize {
    64
}

impl Default for ExecutorSection {
    fn default() -> Self {
        Self {
            event_buffer: default_event_buffer(),
            timeout_ms: None,
        }
    }
}

/// `[logging]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingSection {
    /// If `None`, `TASKGRAPH_LOG` or the default level is used.
    #[serde(default)]
    pub level: Option<LogLevel>,
}

/// Runtime view of the `[executor]` section consumed by `Executor`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutorConfig {
    pub event_buffer: usize,
    pub timeout: Option<Duration>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self::from(&ExecutorSection::default())
    }
}

impl From<&ExecutorSection> for ExecutorConfig {
    fn from(section: &ExecutorSection) -> Self {
        Self {
            event_buffer: section.event_buffer,
            timeout: section.timeout_ms.map(Duration::from_millis),
        }
    }
}

impl From<&ConfigFile> for ExecutorConfig {
    fn from(cfg: &ConfigFile) -> Self {
        Self::from(&cfg.executor)
    }
}
