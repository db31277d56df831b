//! Recording task builders.
//!
//! `TaskSpec` describes a task by behaviour (sleep, then succeed, fail, panic
//! or hang) and builds a real `Task<String>` that logs its start and finish
//! into a shared `FlowRecorder`, so tests can assert on execution order.

#![allow(dead_code)]

use std::any::Any;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use taskgraph::{Context, Task};

/// Error type used by recorded tasks.
pub type TestError = String;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowEvent {
    Started(String),
    Finished(String),
}

/// Shared, append-only log of task start/finish events.
#[derive(Debug, Clone, Default)]
pub struct FlowRecorder {
    log: Arc<Mutex<Vec<FlowEvent>>>,
}

impl FlowRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, event: FlowEvent) {
        self.log.lock().unwrap().push(event);
    }

    pub fn events(&self) -> Vec<FlowEvent> {
        self.log.lock().unwrap().clone()
    }

    /// Task names in the order they started.
    pub fn started(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                FlowEvent::Started(name) => Some(name),
                FlowEvent::Finished(_) => None,
            })
            .collect()
    }

    /// Task names in the order they finished.
    pub fn finished(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                FlowEvent::Finished(name) => Some(name),
                FlowEvent::Started(_) => None,
            })
            .collect()
    }

    pub fn start_count(&self, name: &str) -> usize {
        self.started().iter().filter(|n| *n == name).count()
    }

    fn position(&self, event: &FlowEvent) -> Option<usize> {
        self.events().iter().position(|e| e == event)
    }

    /// Panics unless `dep` finished before `dependent` started.
    pub fn assert_finished_before_started(&self, dep: &str, dependent: &str) {
        let finished = self
            .position(&FlowEvent::Finished(dep.to_string()))
            .unwrap_or_else(|| panic!("{dep} never finished: {:?}", self.events()));
        let started = self
            .position(&FlowEvent::Started(dependent.to_string()))
            .unwrap_or_else(|| panic!("{dependent} never started: {:?}", self.events()));
        assert!(
            finished < started,
            "{dep} should finish before {dependent} starts: {:?}",
            self.events()
        );
    }

    /// Panics if `name` started at all.
    pub fn assert_never_started(&self, name: &str) {
        assert_eq!(
            self.start_count(name),
            0,
            "{name} should not have run: {:?}",
            self.events()
        );
    }
}

#[derive(Clone)]
enum Behaviour {
    Succeed,
    Fail(TestError),
    Panic(Arc<dyn Fn() + Send + Sync>),
    Hang,
}

/// Builder for a recorded `Task<String>`.
pub struct TaskSpec {
    name: String,
    sleep: Duration,
    behaviour: Behaviour,
    blocking: bool,
    deps: Vec<Task<TestError>>,
}

impl TaskSpec {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            sleep: Duration::ZERO,
            behaviour: Behaviour::Succeed,
            blocking: false,
            deps: Vec::new(),
        }
    }

    pub fn sleep_ms(mut self, ms: u64) -> Self {
        self.sleep = Duration::from_millis(ms);
        self
    }

    pub fn fails_with(mut self, err: &str) -> Self {
        self.behaviour = Behaviour::Fail(err.to_string());
        self
    }

    /// Panic with `payload` after sleeping. Any `'static` payload works,
    /// including `false`, `0` and `""`.
    pub fn panics_with<P>(mut self, payload: P) -> Self
    where
        P: Any + Clone + Send + Sync,
    {
        self.behaviour = Behaviour::Panic(Arc::new(move || raise(&payload)));
        self
    }

    /// Never return on its own, ignoring the context.
    pub fn hangs(mut self) -> Self {
        self.behaviour = Behaviour::Hang;
        self
    }

    /// Run on the blocking pool with `std::thread::sleep`. Not combinable
    /// with `hangs`.
    pub fn blocking(mut self) -> Self {
        self.blocking = true;
        self
    }

    pub fn after(mut self, dep: &Task<TestError>) -> Self {
        self.deps.push(dep.clone());
        self
    }

    pub fn build(self, recorder: &FlowRecorder) -> Task<TestError> {
        let builder = self
            .deps
            .iter()
            .fold(Task::builder().name(self.name.clone()), |b, dep| b.after(dep));

        let recorder = recorder.clone();
        let name = self.name;
        let sleep = self.sleep;
        let behaviour = self.behaviour;

        if self.blocking {
            return builder.build_blocking(move |_ctx: Context| {
                recorder.record(FlowEvent::Started(name.clone()));
                std::thread::sleep(sleep);
                let result = finish(&behaviour);
                recorder.record(FlowEvent::Finished(name.clone()));
                result
            });
        }

        builder.build(move |_ctx: Context| {
            let recorder = recorder.clone();
            let name = name.clone();
            let behaviour = behaviour.clone();
            async move {
                recorder.record(FlowEvent::Started(name.clone()));
                if !sleep.is_zero() {
                    tokio::time::sleep(sleep).await;
                }
                if let Behaviour::Hang = behaviour {
                    std::future::pending::<()>().await;
                }
                let result = finish(&behaviour);
                recorder.record(FlowEvent::Finished(name));
                result
            }
        })
    }
}

fn raise<P: Any + Clone + Send>(payload: &P) {
    std::panic::panic_any(payload.clone())
}

fn finish(behaviour: &Behaviour) -> Result<(), TestError> {
    match behaviour {
        Behaviour::Succeed | Behaviour::Hang => Ok(()),
        Behaviour::Fail(err) => Err(err.clone()),
        Behaviour::Panic(trigger) => {
            trigger();
            Ok(())
        }
    }
}
