// src/exec/backend.rs

//! Pluggable spawner abstraction.
//!
//! The runtime hands ready nodes to a `TaskSpawner` instead of calling
//! `tokio::spawn` itself. This makes it easy to swap in a fake spawner in
//! tests while keeping the production implementation in [`TokioSpawner`].
//!
//! A spawner must eventually send exactly one `RunEvent::TaskCompleted` per
//! scheduled node, or the run waits for the context to fire.

use tokio::sync::mpsc;

use crate::context::Context;
use crate::dag::NodeIndex;
use crate::engine::RunEvent;
use crate::exec::task_runner::run_task;
use crate::task::Task;

/// A node the scheduler wants launched now.
#[derive(Debug)]
pub struct ScheduledTask<E> {
    pub node: NodeIndex,
    pub task: Task<E>,
    /// All tasks that belong to the same run share the same `run_id`.
    pub run_id: u64,
}

/// Trait abstracting how ready tasks are launched.
pub trait TaskSpawner<E>: Send {
    /// Launch every task in `tasks` without waiting for any of them.
    ///
    /// Each task gets a clone of `ctx`; each completion goes to `events`.
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<ScheduledTask<E>>,
        ctx: &Context,
        events: &mpsc::Sender<RunEvent<E>>,
    );
}

/// Production spawner: one tokio task per node, no concurrency cap.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSpawner;

impl<E: Send + 'static> TaskSpawner<E> for TokioSpawner {
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<ScheduledTask<E>>,
        ctx: &Context,
        events: &mpsc::Sender<RunEvent<E>>,
    ) {
        for task in tasks {
            tokio::spawn(run_task(task, ctx.clone(), events.clone()));
        }
    }
}
