// src/dag/task_info.rs

//! Per-run node bookkeeping.

use crate::dag::NodeIndex;

/// Per-run state of a node (internal).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Waiting on at least one dependency.
    Pending,
    /// Every dependency is done; about to be launched.
    Ready,
    /// Handed to the spawner.
    Running,
    /// Reported an outcome (success or failure).
    Done,
}

/// Public, read-only view of a node's per-run state.
///
/// This is exposed for tests and diagnostics without leaking the internal
/// `RunState` type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRunState {
    Pending,
    Ready,
    Running,
    DoneSuccess,
    DoneFailed,
}

/// What the scheduler tracks for one node of the closure.
#[derive(Debug, Clone)]
pub struct NodeInfo {
    /// Dependencies that have not reported success yet.
    pub unmet: usize,
    /// Nodes to notify when this one completes.
    pub dependents: Vec<NodeIndex>,
    pub run_state: RunState,
    /// Outcome once `Done`; `None` before.
    pub succeeded: Option<bool>,
}

impl NodeInfo {
    pub fn new(unmet: usize, dependents: Vec<NodeIndex>) -> Self {
        let run_state = if unmet == 0 {
            RunState::Ready
        } else {
            RunState::Pending
        };
        Self {
            unmet,
            dependents,
            run_state,
            succeeded: None,
        }
    }

    pub fn public_state(&self) -> NodeRunState {
        match (self.run_state, self.succeeded) {
            (RunState::Pending, _) => NodeRunState::Pending,
            (RunState::Ready, _) => NodeRunState::Ready,
            (RunState::Running, _) => NodeRunState::Running,
            (RunState::Done, Some(false)) => NodeRunState::DoneFailed,
            (RunState::Done, _) => NodeRunState::DoneSuccess,
        }
    }
}
