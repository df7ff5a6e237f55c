//! Per-school technology selection.
//!
//! Every minimizer is a pure function of the aggregated costs: each school id
//! in [`OutputSpace::aggregated_costs`] appears exactly once in the result,
//! either with the winning feasible record or with the reasons it could not
//! be connected.
//!
//! | Minimizer | Policy |
//! |-----------|--------|
//! | [`BaselineMinimizer`] | cheapest lifetime cost per school, optionally cheapest-first under a budget |
//! | [`EconomiesOfScaleMinimizer`] | fiber clusters pruned against each school's best alternative |
//! | [`ConstrainedEconomiesOfScaleMinimizer`] | as above, clusters bought cheapest-per-school first under a budget |
//! | [`PriorityMinimizer`] | first feasible technology in fiber, cellular, P2P, satellite order |

pub mod baseline;
pub mod constrained;
pub mod economies;
pub mod priority;

pub use baseline::BaselineMinimizer;
pub use constrained::ConstrainedEconomiesOfScaleMinimizer;
pub use economies::EconomiesOfScaleMinimizer;
pub use priority::PriorityMinimizer;

use crate::output::OutputSpace;
use gcm_core::{
    CostMinimizerConfig, GcmResult, MinimizerKind, OpexResponsibility, PairwiseDistance, SchoolConnectionCosts,
    Technology,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Project-lifetime cost of a record: capex plus `years_opex` years of opex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifetimeCost {
    pub years_opex: u32,
    pub responsibility: OpexResponsibility,
}

impl LifetimeCost {
    pub fn new(years_opex: u32, responsibility: OpexResponsibility) -> Self {
        Self {
            years_opex,
            responsibility,
        }
    }

    pub fn from_config(config: &CostMinimizerConfig) -> Self {
        Self::new(config.years_opex, config.opex_responsible)
    }

    pub fn of(&self, costs: &SchoolConnectionCosts) -> f64 {
        costs.lifetime_cost(self.years_opex, self.responsibility)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MinimizerResult {
    /// One record per school, ordered by school id
    pub costs: Vec<SchoolConnectionCosts>,
    /// Fiber connections still in use, when the minimizer trimmed the network
    pub fiber_distances: Option<Vec<PairwiseDistance>>,
}

pub trait CostMinimizer {
    fn name(&self) -> &'static str;

    fn minimize(&self, output: &OutputSpace) -> GcmResult<MinimizerResult>;
}

/// Minimizer for a scenario's settings.
///
/// Priority when requested; otherwise fiber clustering when economies of
/// scale are on and fiber was costed, budget-constrained when a budget is
/// set; otherwise the baseline.
pub fn select_minimizer(config: &CostMinimizerConfig, has_fiber: bool) -> Box<dyn CostMinimizer> {
    let lifetime = LifetimeCost::from_config(config);
    match (config.minimizer, config.economies_of_scale && has_fiber, config.budget_constraint) {
        (MinimizerKind::Priority, _, _) => Box::new(PriorityMinimizer),
        (MinimizerKind::CostOptimal, true, Some(budget)) => {
            Box::new(ConstrainedEconomiesOfScaleMinimizer::new(lifetime, budget))
        }
        (MinimizerKind::CostOptimal, true, None) => Box::new(EconomiesOfScaleMinimizer::new(lifetime)),
        (MinimizerKind::CostOptimal, false, budget) => Box::new(BaselineMinimizer::new(lifetime, budget)),
    }
}

/// Cheapest feasible record, skipping `exclude`; the earlier technology wins ties.
pub(crate) fn cheapest<'a>(
    costs: &'a BTreeMap<Technology, SchoolConnectionCosts>,
    lifetime: LifetimeCost,
    exclude: &[Technology],
) -> Option<&'a SchoolConnectionCosts> {
    let mut best: Option<(&SchoolConnectionCosts, f64)> = None;
    for (technology, cost) in costs {
        if !cost.feasible || exclude.contains(technology) {
            continue;
        }
        let value = lifetime.of(cost);
        if best.map_or(true, |(_, b)| value < b) {
            best = Some((cost, value));
        }
    }
    best.map(|(c, _)| c)
}

/// Infeasible record listing every technology's reasons, first seen first.
pub(crate) fn combined_infeasible(school_id: &str, costs: &BTreeMap<Technology, SchoolConnectionCosts>) -> SchoolConnectionCosts {
    let mut reasons = Vec::new();
    for cost in costs.values() {
        for reason in &cost.reasons {
            if !reasons.contains(reason) {
                reasons.push(*reason);
            }
        }
    }
    SchoolConnectionCosts::combined_infeasible(school_id, reasons)
}

pub(crate) fn log_result(name: &str, result: &MinimizerResult) {
    let feasible: Vec<&SchoolConnectionCosts> = result.costs.iter().filter(|c| c.feasible).collect();
    let capex: f64 = feasible.iter().map(|c| c.capex).sum();
    tracing::info!(
        minimizer = name,
        schools = result.costs.len(),
        connected = feasible.len(),
        capex,
        "minimizer finished"
    );
}
