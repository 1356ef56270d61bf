//! Per-box activity dependency graph.
//!
//! Edges run predecessor -> successor. The graph must stay a DAG; a
//! violating edge is rolled back before the error is returned.

use boxtrack_core::{BoxActivityId, DependencyMeta};
use petgraph::algo::{is_cyclic_directed, toposort};
use petgraph::graphmap::DiGraphMap;
use petgraph::Direction;

/// Violation detected while wiring dependencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyViolation {
    /// An activity cannot depend on itself.
    SelfLoop,
    /// The edge would close a cycle.
    Cycle,
}

/// Dependency DAG over one box's activities.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    inner: DiGraphMap<BoxActivityId, DependencyMeta>,
}

impl DependencyGraph {
    /// Empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: DiGraphMap::new(),
        }
    }

    /// Register an activity node.
    pub fn add_activity(&mut self, id: BoxActivityId) {
        self.inner.add_node(id);
    }

    /// Wire `successor` to wait on `predecessor`.
    ///
    /// # Errors
    /// - `DependencyViolation::SelfLoop` when both ids are equal
    /// - `DependencyViolation::Cycle` when the edge would close a cycle;
    ///   the edge is removed again before returning
    pub fn add_dependency(
        &mut self,
        successor: BoxActivityId,
        predecessor: BoxActivityId,
        meta: DependencyMeta,
    ) -> Result<(), DependencyViolation> {
        if successor == predecessor {
            return Err(DependencyViolation::SelfLoop);
        }

        self.inner.add_node(successor);
        self.inner.add_node(predecessor);
        self.inner.add_edge(predecessor, successor, meta);

        if is_cyclic_directed(&self.inner) {
            self.inner.remove_edge(predecessor, successor);
            return Err(DependencyViolation::Cycle);
        }

        Ok(())
    }

    /// Whether the node is known.
    #[inline]
    #[must_use]
    pub fn contains(&self, id: BoxActivityId) -> bool {
        self.inner.contains_node(id)
    }

    /// Direct predecessors of an activity with their edge metadata.
    #[must_use]
    pub fn predecessors(&self, id: BoxActivityId) -> Vec<(BoxActivityId, DependencyMeta)> {
        self.inner
            .neighbors_directed(id, Direction::Incoming)
            .filter_map(|p| self.inner.edge_weight(p, id).map(|meta| (p, *meta)))
            .collect()
    }

    /// Activities nothing waits on to start.
    #[must_use]
    pub fn entry_activities(&self) -> Vec<BoxActivityId> {
        self.inner
            .nodes()
            .filter(|n| {
                self.inner
                    .neighbors_directed(*n, Direction::Incoming)
                    .next()
                    .is_none()
            })
            .collect()
    }

    /// Topological order, predecessors first.
    ///
    /// # Errors
    /// `DependencyViolation::Cycle` when the graph is not a DAG.
    pub fn topological_order(&self) -> Result<Vec<BoxActivityId>, DependencyViolation> {
        toposort(&self.inner, None).map_err(|_| DependencyViolation::Cycle)
    }

    /// Validate the whole graph is acyclic.
    pub fn validate(&self) -> Result<(), DependencyViolation> {
        if is_cyclic_directed(&self.inner) {
            return Err(DependencyViolation::Cycle);
        }
        Ok(())
    }

    /// Node count.
    #[inline]
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.inner.node_count()
    }

    /// Edge count.
    #[inline]
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.inner.edge_count()
    }
}
