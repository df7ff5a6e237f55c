use super::baseline::{alternative_costs, baseline_choices};
use super::{log_result, CostMinimizer, LifetimeCost, MinimizerResult};
use crate::connect::group_by_source;
use crate::graph::{ConnectedCostGraph, CostTreePruner, PruneReport};
use crate::output::{AggregatedCosts, OutputSpace};
#[cfg(feature = "desktop")]
use rayon::prelude::*;
use gcm_core::{GcmResult, PairwiseDistance, Technology};
use std::collections::{HashMap, HashSet};

/// Fiber network hanging from one root source.
#[derive(Debug, Clone)]
pub(crate) struct FiberCluster {
    pub source: String,
    pub graph: ConnectedCostGraph,
    /// Every school the greedy network connected under this source
    pub initial_members: Vec<String>,
}

impl FiberCluster {
    pub fn members(&self) -> Vec<String> {
        self.graph.members().into_iter().map(str::to_string).collect()
    }
}

/// One cluster per root source, in source id order.
pub(crate) fn fiber_clusters(distances: &[PairwiseDistance]) -> Vec<FiberCluster> {
    group_by_source(distances)
        .into_iter()
        .map(|(source, edges)| {
            let graph = ConnectedCostGraph::from_pairwise_distances(&edges);
            let initial_members = graph.members().into_iter().map(str::to_string).collect();
            FiberCluster {
                source,
                graph,
                initial_members,
            }
        })
        .collect()
}

/// Lifetime fiber cost of a cluster member.
pub(crate) fn fiber_cost_fn(aggregated: &AggregatedCosts, lifetime: LifetimeCost) -> impl Fn(&str) -> f64 + '_ {
    move |id: &str| {
        aggregated
            .get(id)
            .and_then(|costs| costs.get(&Technology::Fiber))
            .map(|c| lifetime.of(c))
            .unwrap_or(f64::INFINITY)
    }
}

/// Prune `cluster` against the alternatives of its members and `budget`.
pub(crate) fn prune_cluster(
    cluster: &mut FiberCluster,
    aggregated: &AggregatedCosts,
    alternatives: &HashMap<String, f64>,
    lifetime: LifetimeCost,
    budget: f64,
) -> PruneReport {
    let baseline: HashMap<String, f64> = cluster
        .initial_members
        .iter()
        .filter_map(|id| alternatives.get(id).map(|v| (id.clone(), *v)))
        .collect();
    let report = CostTreePruner::new(fiber_cost_fn(aggregated, lifetime))
        .with_baseline(baseline)
        .with_budget(budget)
        .run(&mut cluster.graph);
    tracing::debug!(
        source = %cluster.source,
        removed = report.steps(),
        initial_cost = report.initial_cost,
        final_cost = report.final_cost,
        "pruned fiber cluster"
    );
    report
}

/// Fiber connections whose served school is in `kept`, in connection order.
pub(crate) fn kept_distances(distances: &[PairwiseDistance], kept: &HashSet<String>) -> Vec<PairwiseDistance> {
    distances
        .iter()
        .filter(|d| kept.contains(d.second_id()))
        .cloned()
        .collect()
}

/// Fiber clusters pruned wherever another technology is cheaper.
///
/// Each cluster is trimmed leaf by leaf until its members' fiber cost no
/// longer exceeds the sum of their best alternatives. Surviving members keep
/// fiber; pruned members fall back to their best non-fiber technology;
/// everyone else gets the baseline choice.
#[derive(Debug, Clone)]
pub struct EconomiesOfScaleMinimizer {
    lifetime: LifetimeCost,
}

impl EconomiesOfScaleMinimizer {
    pub fn new(lifetime: LifetimeCost) -> Self {
        Self { lifetime }
    }
}

impl CostMinimizer for EconomiesOfScaleMinimizer {
    fn name(&self) -> &'static str {
        "economies_of_scale"
    }

    fn minimize(&self, output: &OutputSpace) -> GcmResult<MinimizerResult> {
        let aggregated = &output.aggregated_costs;
        let distances: &[PairwiseDistance] = output
            .get(Technology::Fiber)
            .map(|s| s.distances.as_slice())
            .unwrap_or(&[]);
        let alternatives = alternative_costs(aggregated, self.lifetime);

        let prune = |mut cluster: FiberCluster| {
            prune_cluster(&mut cluster, aggregated, &alternatives, self.lifetime, f64::INFINITY);
            cluster
        };
        // clusters share no nodes, so they prune independently
        #[cfg(feature = "desktop")]
        let clusters: Vec<FiberCluster> = fiber_clusters(distances).into_par_iter().map(prune).collect();
        #[cfg(not(feature = "desktop"))]
        let clusters: Vec<FiberCluster> = fiber_clusters(distances).into_iter().map(prune).collect();

        let mut on_fiber: HashSet<String> = HashSet::new();
        let mut pruned: HashSet<String> = HashSet::new();
        for cluster in clusters {
            let kept: HashSet<String> = cluster.members().into_iter().collect();
            for id in &cluster.initial_members {
                if !kept.contains(id) {
                    pruned.insert(id.clone());
                }
            }
            on_fiber.extend(kept);
        }

        let mut choices = baseline_choices(aggregated, self.lifetime, &pruned);
        for id in &on_fiber {
            if let Some(fiber) = aggregated.get(id).and_then(|c| c.get(&Technology::Fiber)) {
                choices.insert(id.clone(), fiber.clone());
            }
        }

        let result = MinimizerResult {
            costs: choices.into_values().collect(),
            fiber_distances: Some(kept_distances(distances, &on_fiber)),
        };
        log_result(self.name(), &result);
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use gcm_core::NonConnectionReason;

    /// f -> a -> b, fiber $1000 each; satellite $1500 for a, $200 for b
    fn scenario() -> OutputSpace {
        output(vec![
            (
                Technology::Fiber,
                vec![edge("f", "a", 1_000.0, "f"), edge("a", "b", 3_000.0, "f")],
                vec![
                    cost("a", Technology::Fiber, 1_000.0),
                    cost("b", Technology::Fiber, 1_000.0),
                    infeasible("c", Technology::Fiber, NonConnectionReason::FiberDistanceThreshold),
                ],
            ),
            (
                Technology::Satellite,
                Vec::new(),
                vec![
                    cost("a", Technology::Satellite, 1_500.0),
                    cost("b", Technology::Satellite, 200.0),
                    cost("c", Technology::Satellite, 500.0),
                ],
            ),
        ])
    }

    #[test]
    fn test_prunes_leaf_with_cheaper_alternative() {
        let result = EconomiesOfScaleMinimizer::new(lifetime()).minimize(&scenario()).unwrap();
        let techs: Vec<Option<Technology>> = result.costs.iter().map(|c| c.technology).collect();
        assert_eq!(
            techs,
            vec![Some(Technology::Fiber), Some(Technology::Satellite), Some(Technology::Satellite)]
        );
        let kept = result.fiber_distances.unwrap();
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].second_id(), "a");
    }

    #[test]
    fn test_cluster_kept_when_cheaper_than_alternatives() {
        let mut output = scenario();
        output
            .aggregated_costs
            .get_mut("b")
            .unwrap()
            .insert(Technology::Satellite, cost("b", Technology::Satellite, 5_000.0));
        let result = EconomiesOfScaleMinimizer::new(lifetime()).minimize(&output).unwrap();
        assert_eq!(result.costs[1].technology, Some(Technology::Fiber));
        assert_eq!(result.fiber_distances.unwrap().len(), 2);
    }

    #[test]
    fn test_every_school_once() {
        let output = scenario();
        let result = EconomiesOfScaleMinimizer::new(lifetime()).minimize(&output).unwrap();
        let ids: Vec<&str> = result.costs.iter().map(|c| c.school_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }
}
