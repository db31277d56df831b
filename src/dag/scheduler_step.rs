// src/dag/scheduler_step.rs

//! Step-by-step execution result types for the scheduler.

use crate::dag::NodeIndex;

/// Structured result of a single scheduler "step".
///
/// The runtime acts on it directly; tests use it to step the DAG by hand and
/// make assertions about what changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchedulerStep {
    /// Nodes that became ready in this step and are now marked running. The
    /// caller must launch every one of them.
    pub newly_ready: Vec<NodeIndex>,
    /// The node whose failure concluded the run, if this step observed one.
    pub failed: Option<NodeIndex>,
    /// Whether this step concluded the run (all nodes done, or first failure).
    pub run_just_finished: bool,
}
