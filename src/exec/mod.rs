// src/exec/mod.rs

//! Task execution layer.
//!
//! This module is responsible for actually running task work functions and
//! reporting back to the run's runtime via `RunEvent`s.
//!
//! - [`fault`] invokes a work function and normalizes return values and
//!   panics into a [`TaskOutcome`].
//! - [`task_runner`] runs one scheduled task and reports its outcome.
//! - [`backend`] provides the `TaskSpawner` trait and the `TokioSpawner` used
//!   in production, which tests can replace with a fake implementation.

pub mod backend;
pub mod fault;
pub mod task_runner;

pub use backend::{ScheduledTask, TaskSpawner, TokioSpawner};
pub use fault::{OpaquePayload, PanicPayload, TaskOutcome, invoke};
