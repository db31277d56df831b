// src/exec/task_runner.rs

//! Individual task runner.

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::context::Context;
use crate::engine::RunEvent;
use crate::exec::backend::ScheduledTask;
use crate::exec::fault::{TaskOutcome, invoke};

/// Run a single task to completion and report its outcome.
///
/// If the run has already concluded (the receiver is gone), the outcome is
/// dropped: a task that outlives its run never touches caller state.
pub async fn run_task<E: Send + 'static>(
    scheduled: ScheduledTask<E>,
    ctx: Context,
    events: mpsc::Sender<RunEvent<E>>,
) {
    let ScheduledTask { node, task, run_id } = scheduled;

    debug!(task = %task, run_id, "starting task");

    let outcome = invoke(&task, ctx).await;

    match &outcome {
        TaskOutcome::Success => {
            debug!(task = %task, run_id, "task completed");
        }
        TaskOutcome::Failed(_) => {
            warn!(task = %task, run_id, "task returned an error");
        }
        TaskOutcome::Panicked(payload) => {
            warn!(task = %task, run_id, payload = %payload, "task panicked");
        }
    }

    if events
        .send(RunEvent::TaskCompleted { node, outcome })
        .await
        .is_err()
    {
        debug!(
            task = %task,
            run_id,
            "run already concluded; discarding task outcome"
        );
    }
}
