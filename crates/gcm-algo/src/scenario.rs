//! Minimum-cost scenario: cost every configured technology, then pick one
//! technology per school.

use crate::cost::{model_for, AlwaysVisible, CostModelContext, LineOfSightOracle, ScenarioData};
use crate::minimize::baseline::alternative_costs;
use crate::minimize::{select_minimizer, LifetimeCost};
use crate::output::OutputSpace;
use crate::sat::{ConstraintSolver, GoodLpSolver, SatOutcomeKind};
use gcm_core::{GcmResult, GreedyConnectCache, ScenarioConfig, Technology};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

pub struct MinimumCostScenario {
    config: ScenarioConfig,
    data: ScenarioData,
    greedy_cache: Option<GreedyConnectCache>,
    line_of_sight: Box<dyn LineOfSightOracle>,
    solver: Box<dyn ConstraintSolver>,
}

impl MinimumCostScenario {
    /// Validate configuration and inputs before any work is done.
    pub fn new(config: ScenarioConfig, data: ScenarioData) -> GcmResult<Self> {
        config.validate()?;
        data.validate()?;
        Ok(Self {
            config,
            data,
            greedy_cache: None,
            line_of_sight: Box::new(AlwaysVisible),
            solver: Box::new(GoodLpSolver::default()),
        })
    }

    pub fn with_greedy_cache(mut self, cache: GreedyConnectCache) -> Self {
        self.greedy_cache = Some(cache);
        self
    }

    pub fn with_line_of_sight(mut self, oracle: Box<dyn LineOfSightOracle>) -> Self {
        self.line_of_sight = oracle;
        self
    }

    pub fn with_solver(mut self, solver: Box<dyn ConstraintSolver>) -> Self {
        self.solver = solver;
        self
    }

    pub fn config(&self) -> &ScenarioConfig {
        &self.config
    }

    pub fn run(&self) -> GcmResult<OutputSpace> {
        let minimizer_config = &self.config.cost_minimizer;
        let lifetime = LifetimeCost::from_config(minimizer_config);
        tracing::info!(
            schools = self.data.schools.len(),
            fiber_nodes = self.data.fiber_nodes.len(),
            cell_towers = self.data.cell_towers.len(),
            technologies = self.config.technologies.len(),
            "running minimum cost scenario"
        );

        let mut ctx = CostModelContext {
            data: &self.data,
            nearest: self.config.distance_cache,
            greedy_cache: self.greedy_cache.as_ref(),
            line_of_sight: self.line_of_sight.as_ref(),
            solver: self.solver.as_ref(),
            economies_of_scale: minimizer_config.economies_of_scale,
            alternative_costs: HashMap::new(),
        };

        // the other technologies price what leaving a school off fiber costs
        let (fiber, others): (Vec<_>, Vec<_>) = self
            .config
            .technologies
            .iter()
            .partition(|c| c.technology() == Technology::Fiber);
        let mut output = OutputSpace::new();
        for conf in others {
            output.insert(model_for(conf).compute(&ctx)?);
        }
        if let Some(conf) = fiber.first() {
            output.aggregate();
            ctx.alternative_costs = alternative_costs(&output.aggregated_costs, lifetime);
            output.insert(model_for(conf).compute(&ctx)?);
        }
        output.aggregate();

        let minimizer = select_minimizer(minimizer_config, output.get(Technology::Fiber).is_some());
        let result = minimizer.minimize(&output)?;
        if let Some(kept) = result.fiber_distances {
            output.retain_fiber_distances(kept);
        }
        output.minimum_cost_result = result.costs;
        Ok(output)
    }
}

/// Headline numbers of a scenario run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioSummary {
    pub schools: usize,
    pub connected: usize,
    pub infeasible: usize,
    pub by_technology: BTreeMap<Technology, usize>,
    pub total_capex: f64,
    pub total_opex: f64,
    pub sat_status: Option<SatOutcomeKind>,
}

impl ScenarioSummary {
    pub fn from_output(output: &OutputSpace) -> Self {
        let mut by_technology = BTreeMap::new();
        let (mut total_capex, mut total_opex, mut connected) = (0.0, 0.0, 0);
        for cost in output.minimum_cost_result.iter().filter(|c| c.feasible) {
            connected += 1;
            total_capex += cost.capex;
            total_opex += cost.opex;
            if let Some(technology) = cost.technology {
                *by_technology.entry(technology).or_insert(0) += 1;
            }
        }
        Self {
            schools: output.minimum_cost_result.len(),
            connected,
            infeasible: output.minimum_cost_result.len() - connected,
            by_technology,
            total_capex,
            total_opex,
            sat_status: output.sat_status,
        }
    }
}
