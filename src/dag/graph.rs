// src/dag/graph.rs

use std::collections::HashMap;

use petgraph::Direction;
use petgraph::graph::DiGraph;

use crate::dag::NodeIndex;
use crate::task::{Task, TaskId};

/// Dependency closure of a set of root tasks.
///
/// Holds every task reachable from the roots exactly once, together with
/// forward and reverse edges. Edges point from a dependency to its dependent,
/// so a node's in-degree is its number of unmet dependencies at the start of
/// a run. Tasks that are not reachable from any root are not part of the
/// closure, even if they depend on a node that is.
#[derive(Debug)]
pub struct RunGraph<E> {
    graph: DiGraph<Task<E>, ()>,
    index: HashMap<TaskId, NodeIndex>,
}

impl<E> RunGraph<E> {
    /// Build the closure of `roots`.
    ///
    /// Shared ancestors are visited once no matter how many paths lead to
    /// them. Zero roots yield an empty graph.
    pub fn from_roots(roots: &[&Task<E>]) -> Self {
        let mut run = RunGraph {
            graph: DiGraph::new(),
            index: HashMap::new(),
        };

        let mut stack: Vec<NodeIndex> = Vec::new();
        for root in roots {
            run.intern(root, &mut stack);
        }

        // Every node on the stack is already interned; expand its edges once.
        while let Some(node) = stack.pop() {
            let deps = run.graph[node].dependencies().to_vec();
            for dep in &deps {
                let dep_node = run.intern(dep, &mut stack);
                run.graph.add_edge(dep_node, node, ());
            }
        }

        run
    }

    /// Return the node of `task`, adding it and queueing it for expansion on
    /// first sight.
    fn intern(&mut self, task: &Task<E>, stack: &mut Vec<NodeIndex>) -> NodeIndex {
        if let Some(&node) = self.index.get(&task.id()) {
            return node;
        }

        let node = self.graph.add_node(task.clone());
        self.index.insert(task.id(), node);
        stack.push(node);
        node
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn nodes(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.node_indices()
    }

    pub fn task(&self, node: NodeIndex) -> Option<&Task<E>> {
        self.graph.node_weight(node)
    }

    pub fn node_of(&self, id: TaskId) -> Option<NodeIndex> {
        self.index.get(&id).copied()
    }

    /// Number of direct dependency edges of a node.
    ///
    /// A task that lists the same dependency twice counts it twice; its
    /// dependent list holds it twice as well, so the counts stay balanced.
    pub fn dependency_count(&self, node: NodeIndex) -> usize {
        self.graph.edges_directed(node, Direction::Incoming).count()
    }

    /// Immediate dependencies of a node.
    pub fn dependencies_of(&self, node: NodeIndex) -> Vec<NodeIndex> {
        self.graph
            .neighbors_directed(node, Direction::Incoming)
            .collect()
    }

    /// Immediate dependents of a node within this closure.
    pub fn dependents_of(&self, node: NodeIndex) -> Vec<NodeIndex> {
        self.graph
            .neighbors_directed(node, Direction::Outgoing)
            .collect()
    }
}
