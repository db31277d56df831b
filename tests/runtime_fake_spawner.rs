// tests/runtime_fake_spawner.rs

mod common;
use crate::common::builders::TestError;
use crate::common::fake_spawner::ScriptedSpawner;
use crate::common::{init_tracing, with_timeout};

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tokio::time::Duration;

use taskgraph::dag::RunGraph;
use taskgraph::engine::{RunEvent, Runtime};
use taskgraph::exec::{ScheduledTask, TaskSpawner};
use taskgraph::{
    CancelReason, Context, ExecError, Executor, PanicPayload, Task, TaskOutcome,
};

fn named(name: &str, deps: &[&Task<TestError>]) -> Task<TestError> {
    Task::builder()
        .name(name)
        .after_all(deps)
        .build(|_ctx| async { Ok(()) })
}

/// Launch waves with names sorted inside each wave; order within a wave is
/// not part of the contract.
fn sorted_waves(waves: &Arc<Mutex<Vec<Vec<String>>>>) -> Vec<Vec<String>> {
    waves
        .lock()
        .unwrap()
        .iter()
        .map(|wave| {
            let mut wave = wave.clone();
            wave.sort();
            wave
        })
        .collect()
}

fn wave(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn runtime_launches_diamond_in_three_waves() {
    init_tracing();

    let a = named("A", &[]);
    let b = named("B", &[&a]);
    let c = named("C", &[&a]);
    let d = named("D", &[&b, &c]);

    let spawner = ScriptedSpawner::new();
    let waves = spawner.waves();

    let graph = RunGraph::from_roots(&[&d]);
    let runtime = Runtime::new(graph, 0, Context::new(), 8, spawner);

    let result = with_timeout(runtime.run()).await;

    assert_eq!(result, Ok(()));
    let waves = sorted_waves(&waves);
    assert_eq!(waves.len(), 3, "{waves:?}");
    assert_eq!(waves[0], wave(&["A"]));
    assert_eq!(waves[1], wave(&["B", "C"]));
    assert_eq!(waves[2], wave(&["D"]));
}

#[tokio::test]
async fn runtime_stops_launching_after_a_failure() {
    init_tracing();

    let a = named("A", &[]);
    let b = named("B", &[&a]);
    let c = named("C", &[&b]);

    let spawner = ScriptedSpawner::new().script("B", TaskOutcome::Failed("nope".to_string()));
    let waves = spawner.waves();

    let graph = RunGraph::from_roots(&[&c]);
    let runtime = Runtime::new(graph, 1, Context::new(), 8, spawner);

    let result = with_timeout(runtime.run()).await;

    assert_eq!(result, Err(ExecError::Failed("nope".to_string())));
    assert_eq!(sorted_waves(&waves), vec![wave(&["A"]), wave(&["B"])]);
}

#[tokio::test]
async fn runtime_with_single_event_buffer_still_completes() {
    init_tracing();

    let base = named("base", &[]);
    let leaves: Vec<Task<TestError>> = (0..16)
        .map(|i| named(&format!("leaf{i}"), &[&base]))
        .collect();
    let roots: Vec<&Task<TestError>> = leaves.iter().collect();

    let spawner = ScriptedSpawner::new();
    let waves = spawner.waves();

    let graph = RunGraph::from_roots(&roots);
    let runtime = Runtime::new(graph, 2, Context::new(), 1, spawner);

    assert_eq!(with_timeout(runtime.run()).await, Ok(()));

    let waves = sorted_waves(&waves);
    assert_eq!(waves.len(), 2);
    assert_eq!(waves[1].len(), 16);
}

#[tokio::test]
async fn scripted_panic_is_reported_by_executor() {
    init_tracing();

    let a = named("A", &[]);
    let b = named("B", &[&a]);

    let spawner =
        ScriptedSpawner::new().script("A", TaskOutcome::Panicked(PanicPayload::Bool(false)));
    let waves = spawner.waves();

    let result = with_timeout(Executor::default().execute_with(&Context::new(), &[&b], spawner)).await;

    assert_eq!(result, Err(ExecError::Panicked(PanicPayload::Bool(false))));
    assert_eq!(sorted_waves(&waves), vec![wave(&["A"])]);
}

#[tokio::test(start_paused = true)]
async fn held_task_leaves_the_run_to_the_context() {
    init_tracing();

    let a = named("A", &[]);
    let b = named("B", &[&a]);

    let spawner = ScriptedSpawner::new().hold("B");
    let waves = spawner.waves();
    let ctx = Context::new().with_timeout(Duration::from_millis(10));

    let result = with_timeout(Executor::default().execute_with(&ctx, &[&b], spawner)).await;

    assert_eq!(result, Err(ExecError::Cancelled(CancelReason::DeadlineExceeded)));
    assert_eq!(sorted_waves(&waves), vec![wave(&["A"]), wave(&["B"])]);
}

#[tokio::test]
async fn executor_never_calls_spawner_for_zero_roots() {
    init_tracing();

    let spawner = ScriptedSpawner::<TestError>::new();
    let waves = spawner.waves();
    let roots: [&Task<TestError>; 0] = [];

    let result = Executor::default().execute_with(&Context::new(), &roots, spawner).await;

    assert_eq!(result, Ok(()));
    assert!(waves.lock().unwrap().is_empty());
}

/// Completes every task synchronously and cancels the run context in the
/// same call, so the run and the context become ready together.
struct CompleteAndCancel;

impl TaskSpawner<TestError> for CompleteAndCancel {
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<ScheduledTask<TestError>>,
        ctx: &Context,
        events: &mpsc::Sender<RunEvent<TestError>>,
    ) {
        for t in tasks {
            events
                .try_send(RunEvent::TaskCompleted {
                    node: t.node,
                    outcome: TaskOutcome::Success,
                })
                .unwrap();
        }
        ctx.cancel();
    }
}

#[tokio::test]
async fn finished_run_wins_over_a_context_firing_at_the_same_time() {
    init_tracing();

    for _ in 0..32 {
        let a = named("A", &[]);
        let ctx = Context::new();

        let result = with_timeout(Executor::default().execute_with(&ctx, &[&a], CompleteAndCancel)).await;

        assert_eq!(result, Ok(()));
        assert!(ctx.is_done());
    }
}
