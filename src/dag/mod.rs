// src/dag/mod.rs

//! Dependency closure and scheduling.
//!
//! - [`graph`] builds the deduplicated closure of the requested roots.
//! - [`scheduler`] contains the per-run state machine that decides which
//!   nodes are ready to run, and when the run is over.
//! - [`task_info`] provides per-node bookkeeping and run states.
//! - [`scheduler_step`] defines the result type for scheduler steps.

pub mod graph;
pub mod scheduler;
pub mod scheduler_step;
pub mod task_info;

/// Run-local index of a node in a [`RunGraph`].
pub type NodeIndex = petgraph::graph::NodeIndex;

pub use graph::RunGraph;
pub use scheduler::Scheduler;
pub use scheduler_step::SchedulerStep;
pub use task_info::NodeRunState;
