//! Execution plan for a pipeline's step graph
//!
//! Steps form a DAG through `depends_on_step_id`. The plan is a topological
//! order of that graph in which independent steps keep their stored order,
//! so a pipeline whose stored order already respects its dependencies runs
//! exactly in stored order.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use petgraph::Direction;
use petgraph::algo::kosaraju_scc;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::domain::pipeline::{PipelineError, Step};

/// Ordered list of step indices (into the pipeline's stored step list)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionPlan {
    order: Vec<usize>,
}

impl ExecutionPlan {
    /// Builds the plan, failing on dangling or cyclic dependencies
    pub fn build(steps: &[Step]) -> Result<Self, PipelineError> {
        let mut graph: DiGraph<usize, ()> = DiGraph::with_capacity(steps.len(), steps.len());
        let mut by_id: HashMap<&str, NodeIndex> = HashMap::with_capacity(steps.len());

        for (idx, step) in steps.iter().enumerate() {
            let node = graph.add_node(idx);
            if by_id.insert(step.id.as_str(), node).is_some() {
                return Err(PipelineError::DuplicateStepId(step.id.clone()));
            }
        }

        for step in steps {
            let Some(dependency) = step.depends_on_step_id.as_deref() else {
                continue;
            };

            let dep_node = by_id.get(dependency).ok_or_else(|| {
                PipelineError::UnknownDependency {
                    step_id: step.id.clone(),
                    dependency: dependency.to_string(),
                }
            })?;

            graph.add_edge(*dep_node, by_id[step.id.as_str()], ());
        }

        // Kahn's algorithm; the min-heap on stored index is the tie-break.
        let mut in_degree: Vec<usize> = graph
            .node_indices()
            .map(|n| graph.neighbors_directed(n, Direction::Incoming).count())
            .collect();

        let mut ready: BinaryHeap<Reverse<usize>> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, degree)| **degree == 0)
            .map(|(idx, _)| Reverse(idx))
            .collect();

        let mut order = Vec::with_capacity(steps.len());
        while let Some(Reverse(idx)) = ready.pop() {
            order.push(idx);

            for child in graph.neighbors_directed(NodeIndex::new(idx), Direction::Outgoing) {
                let child_idx = graph[child];
                in_degree[child_idx] -= 1;
                if in_degree[child_idx] == 0 {
                    ready.push(Reverse(child_idx));
                }
            }
        }

        if order.len() < steps.len() {
            return Err(PipelineError::CyclicDependency(cycle_members(&graph, steps)));
        }

        Ok(Self { order })
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Iterates the steps in execution order
    pub fn steps<'a>(&'a self, steps: &'a [Step]) -> impl Iterator<Item = &'a Step> + 'a {
        self.order.iter().map(move |&idx| &steps[idx])
    }
}

/// Ids of the steps that sit on a cycle, in stored order. Steps that only
/// depend on a cycle are left out.
fn cycle_members(graph: &DiGraph<usize, ()>, steps: &[Step]) -> Vec<String> {
    let mut members: Vec<usize> = kosaraju_scc(graph)
        .into_iter()
        .filter(|component| match component.as_slice() {
            [node] => graph.contains_edge(*node, *node),
            _ => true,
        })
        .flatten()
        .map(|node| graph[node])
        .collect();
    members.sort_unstable();

    members.into_iter().map(|idx| steps[idx].id.clone()).collect()
}
