use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use taskgraph::Context;
use taskgraph::engine::RunEvent;
use taskgraph::exec::{ScheduledTask, TaskSpawner};
use taskgraph::TaskOutcome;

/// A fake spawner that never calls a work function. It:
/// - records every launch wave (the names handed over in one call)
/// - reports a scripted outcome for each task, `Success` by default
/// - never reports tasks marked with `hold`.
pub struct ScriptedSpawner<E> {
    outcomes: HashMap<String, TaskOutcome<E>>,
    held: HashSet<String>,
    waves: Arc<Mutex<Vec<Vec<String>>>>,
}

impl<E> ScriptedSpawner<E> {
    pub fn new() -> Self {
        Self {
            outcomes: HashMap::new(),
            held: HashSet::new(),
            waves: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Report `outcome` for the task displayed as `name`.
    pub fn script(mut self, name: &str, outcome: TaskOutcome<E>) -> Self {
        self.outcomes.insert(name.to_string(), outcome);
        self
    }

    /// Never report a completion for `name`.
    pub fn hold(mut self, name: &str) -> Self {
        self.held.insert(name.to_string());
        self
    }

    /// Handle to the launch log; stays valid after the spawner is moved
    /// into a run.
    pub fn waves(&self) -> Arc<Mutex<Vec<Vec<String>>>> {
        Arc::clone(&self.waves)
    }
}

impl<E> Default for ScriptedSpawner<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Clone + Send + 'static> TaskSpawner<E> for ScriptedSpawner<E> {
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<ScheduledTask<E>>,
        _ctx: &Context,
        events: &mpsc::Sender<RunEvent<E>>,
    ) {
        let names: Vec<String> = tasks.iter().map(|t| t.task.to_string()).collect();
        self.waves.lock().unwrap().push(names);

        let completions: Vec<RunEvent<E>> = tasks
            .into_iter()
            .filter(|t| !self.held.contains(&t.task.to_string()))
            .map(|t| RunEvent::TaskCompleted {
                node: t.node,
                outcome: self
                    .outcomes
                    .get(&t.task.to_string())
                    .cloned()
                    .unwrap_or(TaskOutcome::Success),
            })
            .collect();

        let tx = events.clone();
        tokio::spawn(async move {
            for event in completions {
                if tx.send(event).await.is_err() {
                    break;
                }
            }
        });
    }
}
