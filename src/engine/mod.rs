// src/engine/mod.rs

//! Orchestration engine for a single run.
//!
//! The pure state machine lives in [`crate::dag::scheduler`]; the async shell
//! that launches ready nodes and drains completion events is implemented in
//! [`runtime`].

use crate::dag::NodeIndex;
use crate::exec::TaskOutcome;

/// Events flowing into the runtime from running tasks.
#[derive(Debug)]
pub enum RunEvent<E> {
    /// A task finished with a concrete outcome.
    TaskCompleted {
        node: NodeIndex,
        outcome: TaskOutcome<E>,
    },
}

pub mod runtime;

pub use runtime::Runtime;
