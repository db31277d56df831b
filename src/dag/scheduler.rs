// src/dag/scheduler.rs

use tracing::{debug, info, warn};

use crate::dag::graph::RunGraph;
use crate::dag::scheduler_step::SchedulerStep;
use crate::dag::task_info::{NodeInfo, NodeRunState, RunState};
use crate::dag::NodeIndex;

/// Per-run state machine over a [`RunGraph`].
///
/// It is responsible for:
/// - tracking the number of unmet dependencies of every node
/// - deciding when a node is ready and marking it running
/// - concluding the run once every node is done, or on the first failure
///
/// The scheduler is synchronous and performs no IO; the runtime feeds it one
/// completion at a time, which is what serializes all bookkeeping.
#[derive(Debug)]
pub struct Scheduler {
    nodes: Vec<NodeInfo>,
    run_id: u64,
    done: usize,
    /// Set once the first failure has been observed.
    halted: bool,
}

impl Scheduler {
    pub fn new<E>(graph: &RunGraph<E>, run_id: u64) -> Self {
        let nodes = graph
            .nodes()
            .map(|node| NodeInfo::new(graph.dependency_count(node), graph.dependents_of(node)))
            .collect();

        Self {
            nodes,
            run_id,
            done: 0,
            halted: false,
        }
    }

    pub fn run_id(&self) -> u64 {
        self.run_id
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Whether the run has concluded, successfully or not.
    pub fn is_finished(&self) -> bool {
        self.halted || self.done == self.nodes.len()
    }

    /// Read-only view of the given node's run state.
    pub fn run_state_of(&self, node: NodeIndex) -> Option<NodeRunState> {
        self.nodes.get(node.index()).map(NodeInfo::public_state)
    }

    /// Launch the initial wave: every node without dependencies.
    ///
    /// An empty closure concludes immediately.
    pub fn start(&mut self) -> SchedulerStep {
        let candidates: Vec<NodeIndex> = self
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, info)| info.run_state == RunState::Ready)
            .map(|(i, _)| NodeIndex::new(i))
            .collect();

        let newly_ready = self.mark_running(candidates);

        info!(
            run_id = self.run_id,
            nodes = self.nodes.len(),
            initial = newly_ready.len(),
            "scheduler: starting run"
        );

        SchedulerStep {
            newly_ready,
            failed: None,
            run_just_finished: self.nodes.is_empty(),
        }
    }

    /// Record the outcome of a running node.
    ///
    /// On success, dependents whose last unmet dependency this was become
    /// ready and are returned. On failure the run halts: the failure is
    /// reported once and nothing else is launched. Completions for unknown
    /// nodes, nodes that are not running, or any completion after the run
    /// concluded are ignored.
    pub fn handle_completion(&mut self, node: NodeIndex, succeeded: bool) -> SchedulerStep {
        if self.halted {
            warn!(
                run_id = self.run_id,
                node = node.index(),
                "completion after run halted; discarding"
            );
            return SchedulerStep::default();
        }

        let run_id = self.run_id;
        let Some(info) = self.nodes.get_mut(node.index()) else {
            warn!(run_id, node = node.index(), "completion for unknown node; ignoring");
            return SchedulerStep::default();
        };

        if info.run_state != RunState::Running {
            warn!(
                run_id,
                node = node.index(),
                state = ?info.run_state,
                "completion for node that is not running; ignoring"
            );
            return SchedulerStep::default();
        }

        info.run_state = RunState::Done;
        info.succeeded = Some(succeeded);
        self.done += 1;

        if !succeeded {
            self.halted = true;
            warn!(
                run_id,
                node = node.index(),
                "node failed; halting run"
            );
            return SchedulerStep {
                newly_ready: Vec::new(),
                failed: Some(node),
                run_just_finished: true,
            };
        }

        debug!(run_id, node = node.index(), "node completed successfully");

        let dependents = info.dependents.clone();
        let mut candidates = Vec::new();
        for dependent in dependents {
            let Some(dep_info) = self.nodes.get_mut(dependent.index()) else {
                continue;
            };
            dep_info.unmet = dep_info.unmet.saturating_sub(1);
            if dep_info.unmet == 0 && dep_info.run_state == RunState::Pending {
                dep_info.run_state = RunState::Ready;
                candidates.push(dependent);
            }
        }

        let newly_ready = self.mark_running(candidates);
        let run_just_finished = self.done == self.nodes.len();
        if run_just_finished {
            info!(run_id, "scheduler: all nodes done; run finished");
        }

        SchedulerStep {
            newly_ready,
            failed: None,
            run_just_finished,
        }
    }

    /// Move `Ready` nodes to `Running` and return them.
    fn mark_running(&mut self, candidates: Vec<NodeIndex>) -> Vec<NodeIndex> {
        let mut ready = Vec::with_capacity(candidates.len());

        for node in candidates {
            if let Some(info) = self.nodes.get_mut(node.index()) {
                if info.run_state == RunState::Ready {
                    debug!(
                        run_id = self.run_id,
                        node = node.index(),
                        "dependencies satisfied; marking Running"
                    );
                    info.run_state = RunState::Running;
                    ready.push(node);
                }
            }
        }

        ready
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::Task;

    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tracing_subscriber::layer::{Context as LayerContext, Layer, SubscriberExt};

    fn task(deps: &[&Task<()>]) -> Task<()> {
        Task::new(|_ctx| async { Ok(()) }, deps)
    }

    struct Diamond {
        graph: RunGraph<()>,
        a: NodeIndex,
        b: NodeIndex,
        c: NodeIndex,
        d: NodeIndex,
    }

    fn diamond() -> Diamond {
        let a = task(&[]);
        let b = task(&[&a]);
        let c = task(&[&a]);
        let d = task(&[&b, &c]);
        let graph = RunGraph::from_roots(&[&d]);
        let node = |t: &Task<()>| graph.node_of(t.id()).unwrap();
        let (a, b, c, d) = (node(&a), node(&b), node(&c), node(&d));
        Diamond { graph, a, b, c, d }
    }

    fn sorted(mut nodes: Vec<NodeIndex>) -> Vec<NodeIndex> {
        nodes.sort();
        nodes
    }

    #[test]
    fn empty_run_finishes_on_start() {
        let graph = RunGraph::<()>::from_roots(&[]);
        let mut scheduler = Scheduler::new(&graph, 1);
        assert!(scheduler.is_empty());
        assert_eq!(scheduler.len(), 0);
        let step = scheduler.start();
        assert!(step.newly_ready.is_empty());
        assert!(step.run_just_finished);
        assert!(scheduler.is_finished());
    }

    #[test]
    fn diamond_launches_in_dependency_order() {
        let Diamond { graph, a, b, c, d } = diamond();
        let mut scheduler = Scheduler::new(&graph, 1);
        assert_eq!(scheduler.len(), 4);
        assert!(!scheduler.is_empty());

        assert_eq!(scheduler.run_state_of(a), Some(NodeRunState::Ready));
        assert_eq!(scheduler.run_state_of(d), Some(NodeRunState::Pending));

        let step = scheduler.start();
        assert_eq!(step.newly_ready, vec![a]);
        assert_eq!(scheduler.run_state_of(a), Some(NodeRunState::Running));

        let step = scheduler.handle_completion(a, true);
        assert_eq!(sorted(step.newly_ready), sorted(vec![b, c]));
        assert!(!step.run_just_finished);

        let step = scheduler.handle_completion(b, true);
        assert!(step.newly_ready.is_empty());
        assert_eq!(scheduler.run_state_of(d), Some(NodeRunState::Pending));

        let step = scheduler.handle_completion(c, true);
        assert_eq!(step.newly_ready, vec![d]);

        let step = scheduler.handle_completion(d, true);
        assert!(step.run_just_finished);
        assert_eq!(step.failed, None);
        assert!(scheduler.is_finished());
        assert_eq!(scheduler.run_state_of(d), Some(NodeRunState::DoneSuccess));
    }

    #[test]
    fn failure_halts_and_prunes_dependents() {
        let Diamond { graph, a, b, c, d } = diamond();
        let mut scheduler = Scheduler::new(&graph, 1);
        scheduler.start();
        scheduler.handle_completion(a, true);

        let step = scheduler.handle_completion(b, false);
        assert_eq!(step.failed, Some(b));
        assert!(step.run_just_finished);
        assert_eq!(scheduler.run_state_of(b), Some(NodeRunState::DoneFailed));

        // c keeps running in the background; its completion is discarded.
        let step = scheduler.handle_completion(c, true);
        assert_eq!(step, SchedulerStep::default());
        assert_eq!(scheduler.run_state_of(d), Some(NodeRunState::Pending));
    }

    #[test]
    fn failure_is_reported_once() {
        let Diamond { graph, a, b, c, .. } = diamond();
        let mut scheduler = Scheduler::new(&graph, 1);
        scheduler.start();
        scheduler.handle_completion(a, true);

        assert_eq!(scheduler.handle_completion(b, false).failed, Some(b));
        assert_eq!(scheduler.handle_completion(c, false).failed, None);
    }

    /// Counts `WARN` events.
    struct WarnCounter(Arc<AtomicUsize>);

    impl<S: tracing::Subscriber> Layer<S> for WarnCounter {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: LayerContext<'_, S>) {
            if *event.metadata().level() == tracing::Level::WARN {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    #[test]
    fn completion_after_halt_is_a_warning() {
        let warnings = Arc::new(AtomicUsize::new(0));
        let subscriber = tracing_subscriber::registry().with(WarnCounter(Arc::clone(&warnings)));

        tracing::subscriber::with_default(subscriber, || {
            let Diamond { graph, a, b, c, .. } = diamond();
            let mut scheduler = Scheduler::new(&graph, 1);
            scheduler.start();
            scheduler.handle_completion(a, true);
            scheduler.handle_completion(b, false);

            let before = warnings.load(Ordering::SeqCst);
            let late = scheduler.handle_completion(c, true);

            assert_eq!(late, SchedulerStep::default());
            assert_eq!(warnings.load(Ordering::SeqCst), before + 1);
        });
    }

    #[test]
    fn stray_completions_are_ignored() {
        let Diamond { graph, a, d, .. } = diamond();
        let mut scheduler = Scheduler::new(&graph, 1);
        scheduler.start();

        // d is still pending.
        assert_eq!(scheduler.handle_completion(d, true), SchedulerStep::default());
        // unknown node.
        assert_eq!(
            scheduler.handle_completion(NodeIndex::new(99), true),
            SchedulerStep::default()
        );

        scheduler.handle_completion(a, true);
        // a is already done.
        assert_eq!(scheduler.handle_completion(a, true), SchedulerStep::default());
        assert!(!scheduler.is_finished());
    }

    #[test]
    fn repeated_dependency_needs_a_single_completion() {
        let a = task(&[]);
        let b = task(&[&a, &a]);
        let graph = RunGraph::from_roots(&[&b]);
        let na = graph.node_of(a.id()).unwrap();
        let nb = graph.node_of(b.id()).unwrap();

        let mut scheduler = Scheduler::new(&graph, 1);
        scheduler.start();
        let step = scheduler.handle_completion(na, true);
        assert_eq!(step.newly_ready, vec![nb]);
    }
}
