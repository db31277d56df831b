// src/errors.rs

//! Crate-wide error types.
//!
//! - [`ExecError`] is what a single execution run reports to its caller.
//! - [`TaskGraphError`] covers everything around a run: configuration
//!   loading and logging setup.

use thiserror::Error;

use crate::context::CancelReason;
use crate::exec::PanicPayload;

/// Terminal failure of an execution run.
///
/// Derives `PartialEq` whenever `E` does, so callers can compare both explicit
/// failures and recovered panics by value.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExecError<E> {
    /// A task returned `Err(e)`.
    #[error("task failed: {0}")]
    Failed(E),

    /// A task panicked; carries the panic payload.
    #[error("task panicked: {0}")]
    Panicked(PanicPayload),

    /// The run's context fired before the run concluded.
    #[error("{0}")]
    Cancelled(CancelReason),
}

impl<E> ExecError<E> {
    /// Whether this error came from the run's context rather than a task.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ExecError::Cancelled(_))
    }
}

impl<E> From<CancelReason> for ExecError<E> {
    fn from(reason: CancelReason) -> Self {
        ExecError::Cancelled(reason)
    }
}

#[derive(Error, Debug)]
pub enum TaskGraphError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, TaskGraphError>;
