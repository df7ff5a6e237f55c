//! Per-technology cost models.
//!
//! Each model turns the scenario inputs into one [`SchoolConnectionCosts`]
//! per school. Technical limits (bandwidth, range, power) are recorded as
//! infeasible results with a [`NonConnectionReason`], never as errors.
//!
//! Checks run in a fixed order per school: bandwidth, reach (distance or
//! range), then electricity. Fiber checks electricity before building the
//! network, since an unpowered school cannot relay a connection.

pub mod cellular;
pub mod electricity;
pub mod fiber;
pub mod p2p;
pub mod satellite;

pub use cellular::CellularCostModel;
pub use electricity::electricity_costs;
pub use fiber::{fiber_network_inputs, FiberCostModel};
pub use p2p::{AlwaysVisible, LineOfSightOracle, P2PCacheBuilder, P2PCostModel};
pub use satellite::SatelliteCostModel;

use crate::output::CostResultSpace;
use crate::sat::ConstraintSolver;
use gcm_core::{
    CellTowerTable, FixedOpexConf, GcmResult, GigaSchool, GigaSchoolTable, GreedyConnectCache,
    NearestNeighborConf, NonConnectionReason, SchoolConnectionCosts, Technology, TechnologyConfig,
    UniqueCoordinate, UniqueCoordinateTable,
};
use std::collections::HashMap;

/// Input tables of a scenario.
#[derive(Debug, Clone, Default)]
pub struct ScenarioData {
    pub schools: GigaSchoolTable,
    pub fiber_nodes: UniqueCoordinateTable,
    pub cell_towers: CellTowerTable,
}

impl ScenarioData {
    pub fn new(schools: GigaSchoolTable, fiber_nodes: UniqueCoordinateTable, cell_towers: CellTowerTable) -> Self {
        Self {
            schools,
            fiber_nodes,
            cell_towers,
        }
    }

    pub fn validate(&self) -> GcmResult<()> {
        self.schools.validate()?;
        self.fiber_nodes.validate()?;
        self.cell_towers.validate()
    }
}

/// Everything a cost model reads besides its own configuration.
pub struct CostModelContext<'a> {
    pub data: &'a ScenarioData,
    pub nearest: NearestNeighborConf,
    pub greedy_cache: Option<&'a GreedyConnectCache>,
    pub line_of_sight: &'a dyn LineOfSightOracle,
    pub solver: &'a dyn ConstraintSolver,
    /// Newly connected fiber schools become connection points
    pub economies_of_scale: bool,
    /// Cheapest non-fiber lifetime cost per school
    pub alternative_costs: HashMap<String, f64>,
}

pub trait CostModel {
    fn technology(&self) -> Technology;

    fn compute(&self, ctx: &CostModelContext<'_>) -> GcmResult<CostResultSpace>;
}

/// Cost model for one configured technology.
pub fn model_for(config: &TechnologyConfig) -> Box<dyn CostModel + '_> {
    match config {
        TechnologyConfig::Fiber(c) => Box::new(FiberCostModel::new(c)),
        TechnologyConfig::Cellular(c) => Box::new(CellularCostModel::new(c)),
        TechnologyConfig::P2P(c) => Box::new(P2PCostModel::new(c)),
        TechnologyConfig::Satellite(c) => Box::new(SatelliteCostModel::new(c)),
    }
}

/// Annual consumer fee: flat part plus bandwidth.
pub(crate) fn subscription_opex(school: &GigaSchool, opex: &FixedOpexConf) -> f64 {
    opex.fixed_costs + school.bandwidth_demand * opex.annual_bandwidth_cost_per_mbps
}

pub(crate) fn exceeds_bandwidth(school: &GigaSchool, maximum_bandwidth_mbps: f64) -> bool {
    school.bandwidth_demand > maximum_bandwidth_mbps
}

pub(crate) fn log_model_summary(technology: Technology, costs: &[SchoolConnectionCosts]) {
    let feasible = costs.iter().filter(|c| c.feasible).count();
    let mut reasons: HashMap<NonConnectionReason, usize> = HashMap::new();
    for reason in costs.iter().filter_map(SchoolConnectionCosts::reason) {
        *reasons.entry(reason).or_default() += 1;
    }
    tracing::info!(
        technology = %technology,
        schools = costs.len(),
        feasible,
        infeasible = costs.len() - feasible,
        "cost model finished"
    );
    for (reason, count) in reasons {
        tracing::debug!(technology = %technology, reason = %reason, count, "infeasible schools");
    }
}

/// Coordinates of the towers offering one of `valid` technologies.
pub(crate) fn valid_tower_coordinates(towers: &CellTowerTable, valid: &[String]) -> Vec<UniqueCoordinate> {
    towers
        .filter_technologies(valid)
        .into_iter()
        .map(|t| t.to_coordinate())
        .collect()
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::sat::GoodLpSolver;

    pub fn at_km(id: &str, x_km: f64) -> UniqueCoordinate {
        UniqueCoordinate::new(id, 0.0, (x_km * 1000.0 / gcm_core::EARTH_RADIUS_M).to_degrees())
    }

    pub fn school_at_km(id: &str, x_km: f64) -> GigaSchool {
        let c = at_km(id, x_km);
        GigaSchool::new(id, c.lat(), c.lon())
    }

    pub struct Fixture {
        pub data: ScenarioData,
        pub solver: GoodLpSolver,
    }

    impl Fixture {
        pub fn new(data: ScenarioData) -> Self {
            Self {
                data,
                solver: GoodLpSolver::default(),
            }
        }

        pub fn context(&self) -> CostModelContext<'_> {
            CostModelContext {
                data: &self.data,
                nearest: NearestNeighborConf::defaults(),
                greedy_cache: None,
                line_of_sight: &AlwaysVisible,
                solver: &self.solver,
                economies_of_scale: true,
                alternative_costs: HashMap::new(),
            }
        }
    }
}
