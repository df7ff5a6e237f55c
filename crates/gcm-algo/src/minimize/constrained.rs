use super::baseline::{alternative_costs, baseline_choices, spend_cheapest_first};
use super::economies::{fiber_clusters, fiber_cost_fn, kept_distances, prune_cluster, FiberCluster};
use super::{log_result, CostMinimizer, LifetimeCost, MinimizerResult};
use crate::output::OutputSpace;
use gcm_core::{GcmResult, PairwiseDistance, SchoolConnectionCosts, Technology};
use std::collections::HashSet;

/// Economies of scale under a total budget.
///
/// 1. Clusters are pruned against their members' alternatives, then bought in
///    ascending cost-per-school order while they fit entirely.
/// 2. The first cluster that does not fit is pruned down to the remaining
///    budget; every later cluster is dropped.
/// 3. What is left buys baseline connections cheapest-first. Schools that
///    still do not fit are marked as over budget.
#[derive(Debug, Clone)]
pub struct ConstrainedEconomiesOfScaleMinimizer {
    lifetime: LifetimeCost,
    budget: f64,
}

struct PricedCluster {
    cluster: FiberCluster,
    cost: f64,
    per_school: f64,
}

impl ConstrainedEconomiesOfScaleMinimizer {
    pub fn new(lifetime: LifetimeCost, budget: f64) -> Self {
        Self { lifetime, budget }
    }
}

impl CostMinimizer for ConstrainedEconomiesOfScaleMinimizer {
    fn name(&self) -> &'static str {
        "constrained_economies_of_scale"
    }

    fn minimize(&self, output: &OutputSpace) -> GcmResult<MinimizerResult> {
        let aggregated = &output.aggregated_costs;
        let distances: &[PairwiseDistance] = output
            .get(Technology::Fiber)
            .map(|s| s.distances.as_slice())
            .unwrap_or(&[]);
        let alternatives = alternative_costs(aggregated, self.lifetime);
        let fiber_cost = fiber_cost_fn(aggregated, self.lifetime);

        let mut in_clusters: HashSet<String> = HashSet::new();
        let mut priced = Vec::new();
        for mut cluster in fiber_clusters(distances) {
            in_clusters.extend(cluster.initial_members.iter().cloned());
            let report = prune_cluster(&mut cluster, aggregated, &alternatives, self.lifetime, f64::INFINITY);
            let members = cluster.graph.members().len();
            if members == 0 {
                continue;
            }
            priced.push(PricedCluster {
                cost: report.final_cost,
                per_school: report.final_cost / members as f64,
                cluster,
            });
        }
        priced.sort_by(|a, b| {
            a.per_school
                .total_cmp(&b.per_school)
                .then_with(|| a.cluster.source.cmp(&b.cluster.source))
        });

        let mut remaining = self.budget;
        let mut on_fiber: HashSet<String> = HashSet::new();
        for mut entry in priced {
            if entry.cost <= remaining {
                remaining -= entry.cost;
                on_fiber.extend(entry.cluster.members());
                continue;
            }
            let report = prune_cluster(&mut entry.cluster, aggregated, &alternatives, self.lifetime, remaining);
            let members = entry.cluster.members();
            let spent: f64 = members.iter().map(|id| fiber_cost(id)).sum();
            if spent <= remaining {
                remaining -= spent;
                on_fiber.extend(members);
            }
            tracing::debug!(
                source = %entry.cluster.source,
                removed = report.steps(),
                remaining,
                "partially bought fiber cluster"
            );
            break;
        }

        // dropped cluster members cannot use the network that would have reached them
        let no_fiber: HashSet<String> = in_clusters.difference(&on_fiber).cloned().collect();
        let mut others = baseline_choices(aggregated, self.lifetime, &no_fiber);
        let mut fiber_costs: Vec<SchoolConnectionCosts> = Vec::new();
        for id in &on_fiber {
            others.remove(id);
            if let Some(fiber) = aggregated.get(id).and_then(|c| c.get(&Technology::Fiber)) {
                fiber_costs.push(fiber.clone());
            }
        }
        let (mut costs, unspent) = spend_cheapest_first(others, self.lifetime, remaining);
        costs.extend(fiber_costs);
        costs.sort_by(|a, b| a.school_id.cmp(&b.school_id));

        tracing::info!(
            budget = self.budget,
            unspent,
            fiber_schools = on_fiber.len(),
            "spent connection budget"
        );
        let result = MinimizerResult {
            costs,
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

    /// Two clusters: "f" serves a and b for $400 each, "g" serves c for $1000.
    /// Satellite costs $5000 everywhere and $100 for d.
    fn scenario() -> OutputSpace {
        output(vec![
            (
                Technology::Fiber,
                vec![
                    edge("f", "a", 1_000.0, "f"),
                    edge("a", "b", 2_000.0, "f"),
                    edge("g", "c", 1_000.0, "g"),
                ],
                vec![
                    cost("a", Technology::Fiber, 400.0),
                    cost("b", Technology::Fiber, 400.0),
                    cost("c", Technology::Fiber, 1_000.0),
                    infeasible("d", Technology::Fiber, NonConnectionReason::FiberDistanceThreshold),
                ],
            ),
            (
                Technology::Satellite,
                Vec::new(),
                vec![
                    cost("a", Technology::Satellite, 5_000.0),
                    cost("b", Technology::Satellite, 5_000.0),
                    cost("c", Technology::Satellite, 5_000.0),
                    cost("d", Technology::Satellite, 100.0),
                ],
            ),
        ])
    }

    fn spent(result: &MinimizerResult) -> f64 {
        result.costs.iter().filter(|c| c.feasible).map(|c| c.capex).sum()
    }

    #[test]
    fn test_large_budget_buys_everything() {
        let result = ConstrainedEconomiesOfScaleMinimizer::new(lifetime(), 10_000.0)
            .minimize(&scenario())
            .unwrap();
        assert!(result.costs.iter().all(|c| c.feasible));
        assert_eq!(result.costs[2].technology, Some(Technology::Fiber));
        assert_eq!(spent(&result), 1_900.0);
    }

    #[test]
    fn test_cheapest_cluster_first_then_partial() {
        // the $800 cluster fits, the $1000 one does not and shrinks to its root
        let result = ConstrainedEconomiesOfScaleMinimizer::new(lifetime(), 950.0)
            .minimize(&scenario())
            .unwrap();
        let techs: Vec<Option<Technology>> = result.costs.iter().map(|c| c.technology).collect();
        assert_eq!(
            techs,
            vec![Some(Technology::Fiber), Some(Technology::Fiber), None, Some(Technology::Satellite)]
        );
        assert_eq!(result.costs[2].reason(), Some(NonConnectionReason::BudgetExceeded));
        assert!(spent(&result) <= 950.0);
        assert_eq!(result.fiber_distances.unwrap().len(), 2);
    }

    #[test]
    fn test_partial_cluster_is_pruned_to_budget() {
        let result = ConstrainedEconomiesOfScaleMinimizer::new(lifetime(), 500.0)
            .minimize(&scenario())
            .unwrap();
        // only a fits in the partial "f" cluster; "g" is dropped
        assert_eq!(result.costs[0].technology, Some(Technology::Fiber));
        assert_eq!(result.costs[1].reason(), Some(NonConnectionReason::BudgetExceeded));
        assert_eq!(result.costs[2].reason(), Some(NonConnectionReason::BudgetExceeded));
        assert_eq!(result.costs[3].technology, Some(Technology::Satellite));
        assert!(spent(&result) <= 500.0);
    }
}
