//! Leaf-pruning minimizer for connected cost graphs.
//!
//! Greedy heuristic: while the lifetime cost of the network members exceeds
//! `min(Σ baseline, budget)`, drop the leaf with the longest connecting edge.
//! It only ever reduces cost and is not guaranteed to find the cheapest
//! feasible subset.

use super::cost_graph::ConnectedCostGraph;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub struct PruneReport {
    /// Removed node ids, in removal order
    pub removed: Vec<String>,
    pub initial_cost: f64,
    pub final_cost: f64,
    pub final_constraint: f64,
}

impl PruneReport {
    pub fn steps(&self) -> usize {
        self.removed.len()
    }
}

pub struct CostTreePruner<F>
where
    F: Fn(&str) -> f64,
{
    /// Project-lifetime cost of connecting one member
    cost_fn: F,
    /// Best standalone cost per member; missing entries are unbounded
    baseline: HashMap<String, f64>,
    budget: f64,
}

impl<F> CostTreePruner<F>
where
    F: Fn(&str) -> f64,
{
    pub fn new(cost_fn: F) -> Self {
        Self {
            cost_fn,
            baseline: HashMap::new(),
            budget: f64::INFINITY,
        }
    }

    pub fn with_baseline(mut self, baseline: HashMap<String, f64>) -> Self {
        self.baseline = baseline;
        self
    }

    pub fn with_budget(mut self, budget: f64) -> Self {
        self.budget = budget;
        self
    }

    fn evaluate(&self, graph: &ConnectedCostGraph) -> (f64, f64) {
        let members = graph.members();
        let cost: f64 = members.iter().map(|id| (self.cost_fn)(id)).sum();
        let baseline: f64 = members
            .iter()
            .map(|id| self.baseline.get(*id).copied().unwrap_or(f64::INFINITY))
            .sum();
        (cost, baseline.min(self.budget))
    }

    /// Prune `graph` in place.
    pub fn run(&self, graph: &mut ConnectedCostGraph) -> PruneReport {
        let (initial_cost, mut constraint) = self.evaluate(graph);
        let mut cost = initial_cost;
        let mut removed = Vec::new();

        while cost > constraint && graph.node_count() > 1 {
            let Some(leaf) = graph.largest_cost_leaf_node().map(str::to_string) else {
                break;
            };
            graph.remove_node(&leaf);
            tracing::trace!(node = %leaf, cost, constraint, "pruned leaf");
            removed.push(leaf);
            (cost, constraint) = self.evaluate(graph);
        }

        PruneReport {
            removed,
            initial_cost,
            final_cost: cost,
            final_constraint: constraint,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gcm_core::{DistanceType, PairwiseDistance, UniqueCoordinate};

    fn edge(from: &str, to: &str, distance: f64) -> PairwiseDistance {
        PairwiseDistance::new(
            UniqueCoordinate::new(from, 0.0, 0.0),
            UniqueCoordinate::new(to, 0.0, 0.0),
            distance,
            DistanceType::Haversine,
        )
    }

    /// f -> a (1 km), a -> b (4 km), f -> c (2 km)
    fn graph() -> ConnectedCostGraph {
        ConnectedCostGraph::from_pairwise_distances(&[
            edge("f", "a", 1_000.0),
            edge("a", "b", 4_000.0),
            edge("f", "c", 2_000.0),
        ])
    }

    /// $1 per meter of connecting edge
    fn per_meter(graph: &ConnectedCostGraph) -> HashMap<String, f64> {
        ["a", "b", "c"]
            .iter()
            .map(|id| (id.to_string(), graph.incoming(id).map(|e| e.weight as f64).unwrap_or(0.0)))
            .collect()
    }

    #[test]
    fn test_no_pruning_when_cheaper_than_baseline() {
        let mut g = graph();
        let costs = per_meter(&g);
        let baseline = [("a", 5_000.0), ("b", 5_000.0), ("c", 5_000.0)]
            .iter()
            .map(|(k, v)| (k.to_string(), *v))
            .collect();
        let report = CostTreePruner::new(|id| costs[id]).with_baseline(baseline).run(&mut g);
        assert!(report.removed.is_empty());
        assert_eq!(g.node_count(), 4);
    }

    #[test]
    fn test_prunes_expensive_leaf_against_baseline() {
        let mut g = graph();
        let costs = per_meter(&g);
        // b is cheap on another technology
        let baseline = [("a", 3_000.0), ("b", 500.0), ("c", 3_000.0)]
            .iter()
            .map(|(k, v)| (k.to_string(), *v))
            .collect();
        let report = CostTreePruner::new(|id| costs[id]).with_baseline(baseline).run(&mut g);
        assert_eq!(report.removed, vec!["b"]);
        assert_eq!(report.final_cost, 3_000.0);
        assert!(report.final_cost <= report.final_constraint);
    }

    #[test]
    fn test_budget_prunes_until_fit() {
        let mut g = graph();
        let costs = per_meter(&g);
        let before = g.total_cost();
        let report = CostTreePruner::new(|id| costs[id]).with_budget(1_500.0).run(&mut g);
        assert_eq!(report.removed, vec!["b", "c"]);
        assert_eq!(report.final_cost, 1_000.0);
        assert!(g.total_cost() <= before);
    }

    #[test]
    fn test_always_leaves_a_node() {
        let mut g = graph();
        let costs = per_meter(&g);
        let n = g.node_count();
        let report = CostTreePruner::new(|id| costs[id]).with_budget(0.0).run(&mut g);
        assert_eq!(g.node_count(), 1);
        assert!(report.steps() <= n - 1);
        assert_eq!(report.final_cost, 0.0);
    }

    #[test]
    fn test_missing_baseline_is_unbounded() {
        let mut g = graph();
        let costs = per_meter(&g);
        let report = CostTreePruner::new(|id| costs[id]).run(&mut g);
        assert!(report.removed.is_empty());
        assert!(report.final_constraint.is_infinite());
    }
}
