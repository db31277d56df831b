// src/lib.rs

//! Dependency-ordered concurrent task execution.
//!
//! A [`Task`] wraps a unit of async work and the tasks it must wait for.
//! [`execute`] runs the dependency closure of a set of root tasks, launching
//! every task as soon as all of its dependencies have succeeded, and stops at
//! the first failure, the first panic, or when the [`Context`] fires,
//! whichever comes first.
//!
//! ```no_run
//! use taskgraph::{Context, Task, execute};
//!
//! # async fn demo() {
//! let fetch = Task::<String>::new(|_ctx| async { Ok(()) }, &[]);
//! let parse = Task::new(|_ctx| async { Ok(()) }, &[&fetch]);
//!
//! execute(&Context::new(), &[&parse]).await.unwrap();
//! # }
//! ```

pub mod config;
pub mod context;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod task;

use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, info, warn};

pub use crate::config::ExecutorConfig;
pub use crate::context::{CancelReason, Context};
pub use crate::errors::ExecError;
pub use crate::exec::{OpaquePayload, PanicPayload, TaskOutcome};
pub use crate::task::{Task, TaskBuilder, TaskId};

use crate::dag::RunGraph;
use crate::engine::Runtime;
use crate::exec::{TaskSpawner, TokioSpawner};

static RUN_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Runs task graphs according to an [`ExecutorConfig`].
///
/// An executor holds no per-run state; one instance can drive any number of
/// runs, sequentially or concurrently.
#[derive(Debug, Clone, Default)]
pub struct Executor {
    config: ExecutorConfig,
}

impl Executor {
    pub fn new(config: ExecutorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Run the dependency closure of `roots` under `ctx`.
    ///
    /// Resolves with `Ok(())` once every task in the closure has succeeded,
    /// or with the first terminal condition observed:
    /// - [`ExecError::Failed`] when a task returned an error,
    /// - [`ExecError::Panicked`] when a task panicked,
    /// - [`ExecError::Cancelled`] when `ctx` (or the configured timeout)
    ///   fired first.
    ///
    /// Tasks still running when the call returns are not awaited. They keep
    /// their context clone and should stop once it is done; their outcomes
    /// are discarded.
    pub async fn execute<E>(&self, ctx: &Context, roots: &[&Task<E>]) -> Result<(), ExecError<E>>
    where
        E: Send + 'static,
    {
        self.execute_with(ctx, roots, TokioSpawner).await
    }

    /// Like [`Executor::execute`], with a caller-supplied spawner.
    pub async fn execute_with<E, S>(
        &self,
        ctx: &Context,
        roots: &[&Task<E>],
        spawner: S,
    ) -> Result<(), ExecError<E>>
    where
        E: Send + 'static,
        S: TaskSpawner<E>,
    {
        if roots.is_empty() {
            debug!("no root tasks; nothing to run");
            return Ok(());
        }

        let run_id = RUN_COUNTER.fetch_add(1, Ordering::Relaxed);

        let ctx = match self.config.timeout {
            Some(timeout) => ctx.with_timeout(timeout),
            None => ctx.clone(),
        };

        let graph = RunGraph::from_roots(roots);
        info!(
            run_id,
            roots = roots.len(),
            tasks = graph.len(),
            "run started"
        );

        let runtime = Runtime::new(graph, run_id, ctx.clone(), self.config.event_buffer, spawner);

        // A run that concluded wins over a context that fired in the same poll.
        let result = tokio::select! {
            biased;
            result = runtime.run() => result,
            reason = ctx.done() => Err(ExecError::Cancelled(reason)),
        };

        match &result {
            Ok(()) => info!(run_id, "run succeeded"),
            Err(ExecError::Cancelled(reason)) => warn!(run_id, %reason, "run cancelled"),
            Err(ExecError::Panicked(payload)) => warn!(run_id, %payload, "run ended by a panic"),
            Err(ExecError::Failed(_)) => info!(run_id, "run ended by a task failure"),
        }

        result
    }
}

/// Run the dependency closure of `roots` under `ctx` with the default
/// configuration. See [`Executor::execute`].
pub async fn execute<E>(ctx: &Context, roots: &[&Task<E>]) -> Result<(), ExecError<E>>
where
    E: Send + 'static,
{
    Executor::default().execute(ctx, roots).await
}
