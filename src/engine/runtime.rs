// src/engine/runtime.rs

use std::fmt;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::context::Context;
use crate::dag::{NodeIndex, RunGraph, Scheduler};
use crate::errors::ExecError;
use crate::exec::{ScheduledTask, TaskSpawner};

use super::RunEvent;

/// Drives the scheduler of one run in response to `RunEvent`s and delegates
/// launching to a `TaskSpawner`.
///
/// This is the IO shell around [`Scheduler`]: it is the only consumer of the
/// completion channel and the only owner of the scheduler, so every
/// in-degree update happens on this one task, one event at a time.
pub struct Runtime<E, S> {
    graph: RunGraph<E>,
    scheduler: Scheduler,
    ctx: Context,
    event_tx: mpsc::Sender<RunEvent<E>>,
    event_rx: mpsc::Receiver<RunEvent<E>>,
    spawner: S,
}

impl<E, S> fmt::Debug for Runtime<E, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("scheduler", &self.scheduler)
            .field("ctx", &self.ctx)
            .finish_non_exhaustive()
    }
}

impl<E, S> Runtime<E, S>
where
    E: Send + 'static,
    S: TaskSpawner<E>,
{
    /// Prepare a run over `graph`.
    ///
    /// `event_buffer` is the capacity of the completion channel; it must be
    /// at least 1.
    pub fn new(
        graph: RunGraph<E>,
        run_id: u64,
        ctx: Context,
        event_buffer: usize,
        spawner: S,
    ) -> Self {
        let scheduler = Scheduler::new(&graph, run_id);
        let (event_tx, event_rx) = mpsc::channel(event_buffer.max(1));
        Self {
            graph,
            scheduler,
            ctx,
            event_tx,
            event_rx,
            spawner,
        }
    }

    /// Main event loop.
    ///
    /// - Launches the initial wave of dependency-free nodes.
    /// - Consumes `RunEvent`s and feeds them to the scheduler.
    /// - Launches whatever the scheduler reports as newly ready.
    ///
    /// Resolves with `Ok(())` once every node succeeded, or with the first
    /// failure observed. It does not watch the context; racing against it is
    /// the caller's job.
    pub async fn run(mut self) -> Result<(), ExecError<E>> {
        let run_id = self.scheduler.run_id();

        let step = self.scheduler.start();
        self.spawn_ready(step.newly_ready);
        if step.run_just_finished {
            return Ok(());
        }

        while let Some(event) = self.event_rx.recv().await {
            match event {
                RunEvent::TaskCompleted { node, outcome } => {
                    debug!(run_id, node = node.index(), "runtime received completion");

                    let step = self.scheduler.handle_completion(node, outcome.is_success());

                    if step.failed.is_some() {
                        info!(run_id, node = node.index(), "run concluded with a failure");
                        return outcome.into_result();
                    }

                    self.spawn_ready(step.newly_ready);

                    if step.run_just_finished {
                        info!(run_id, "run concluded successfully");
                        return Ok(());
                    }
                }
            }
        }

        // The runtime keeps its own sender, so the channel cannot close while
        // we are here. Should a spawner lose a task anyway, the run never
        // concludes and only the context can end it.
        warn!(run_id, "completion channel closed before the run finished");
        std::future::pending().await
    }

    fn spawn_ready(&mut self, nodes: Vec<NodeIndex>) {
        if nodes.is_empty() {
            return;
        }

        let run_id = self.scheduler.run_id();
        let tasks: Vec<ScheduledTask<E>> = nodes
            .into_iter()
            .filter_map(|node| {
                self.graph.task(node).map(|task| ScheduledTask {
                    node,
                    task: task.clone(),
                    run_id,
                })
            })
            .collect();

        debug!(run_id, count = tasks.len(), "spawning ready tasks");

        self.spawner
            .spawn_ready_tasks(tasks, &self.ctx, &self.event_tx);
    }
}
