use super::{cheapest, combined_infeasible, log_result, CostMinimizer, LifetimeCost, MinimizerResult};
use crate::output::{AggregatedCosts, OutputSpace};
use gcm_core::{GcmResult, NonConnectionReason, SchoolConnectionCosts, Technology};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Cheapest feasible technology per school.
///
/// With a budget, schools are bought cheapest-first until the next one no
/// longer fits; the rest are marked [`NonConnectionReason::BudgetExceeded`].
#[derive(Debug, Clone)]
pub struct BaselineMinimizer {
    lifetime: LifetimeCost,
    budget: Option<f64>,
}

impl BaselineMinimizer {
    pub fn new(lifetime: LifetimeCost, budget: Option<f64>) -> Self {
        Self { lifetime, budget }
    }
}

impl CostMinimizer for BaselineMinimizer {
    fn name(&self) -> &'static str {
        "baseline"
    }

    fn minimize(&self, output: &OutputSpace) -> GcmResult<MinimizerResult> {
        let choices = baseline_choices(&output.aggregated_costs, self.lifetime, &HashSet::new());
        let costs = match self.budget {
            Some(budget) => spend_cheapest_first(choices, self.lifetime, budget).0,
            None => choices.into_values().collect(),
        };
        let result = MinimizerResult {
            costs,
            fiber_distances: None,
        };
        log_result(self.name(), &result);
        Ok(result)
    }
}

/// Best record per school; `no_fiber` schools only consider other technologies.
pub(crate) fn baseline_choices(
    aggregated: &AggregatedCosts,
    lifetime: LifetimeCost,
    no_fiber: &HashSet<String>,
) -> BTreeMap<String, SchoolConnectionCosts> {
    aggregated
        .iter()
        .map(|(id, costs)| {
            let exclude: &[Technology] = if no_fiber.contains(id) { &[Technology::Fiber] } else { &[] };
            let choice = cheapest(costs, lifetime, exclude)
                .cloned()
                .unwrap_or_else(|| combined_infeasible(id, costs));
            (id.clone(), choice)
        })
        .collect()
}

/// Best non-fiber lifetime cost per school, for the cluster pruner.
pub(crate) fn alternative_costs(aggregated: &AggregatedCosts, lifetime: LifetimeCost) -> HashMap<String, f64> {
    aggregated
        .iter()
        .filter_map(|(id, costs)| {
            cheapest(costs, lifetime, &[Technology::Fiber]).map(|c| (id.clone(), lifetime.of(c)))
        })
        .collect()
}

/// Buy feasible choices cheapest-first while they fit in `budget`.
///
/// Ties go to the smaller school id. Returns the records in school id order
/// and the unspent budget.
pub(crate) fn spend_cheapest_first(
    choices: BTreeMap<String, SchoolConnectionCosts>,
    lifetime: LifetimeCost,
    budget: f64,
) -> (Vec<SchoolConnectionCosts>, f64) {
    let mut remaining = budget;
    let mut feasible: Vec<(f64, String)> = choices
        .iter()
        .filter(|(_, c)| c.feasible)
        .map(|(id, c)| (lifetime.of(c), id.clone()))
        .collect();
    feasible.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.cmp(&b.1)));

    let mut over_budget = HashSet::new();
    for (cost, id) in feasible {
        if cost <= remaining {
            remaining -= cost;
        } else {
            over_budget.insert(id);
        }
    }

    let costs = choices
        .into_iter()
        .map(|(id, choice)| {
            if over_budget.contains(&id) {
                SchoolConnectionCosts::combined_infeasible(id, vec![NonConnectionReason::BudgetExceeded])
            } else {
                choice
            }
        })
        .collect();
    (costs, remaining)
}
