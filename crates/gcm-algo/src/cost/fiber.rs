//! Fiber cost model.
//!
//! The network is grown from the existing backbone: fiber nodes plus schools
//! already on fiber. Either the greedy connector builds it (chaining through
//! newly connected schools when economies of scale are enabled) or the exact
//! network design solver does. Each connected school pays for the cable that
//! reaches it.

use super::{
    electricity_costs, exceeds_bandwidth, log_model_summary, CostModel, CostModelContext,
};
use crate::connect::{GreedyConnectorConf, GreedyDistanceConnector};
use crate::graph::SatCostGraphBuilder;
use crate::output::CostResultSpace;
use crate::sat::{SatOptimizer, SatOutcome, SatOutcomeKind};
use gcm_core::{
    CostParts, ElectricityCosts, FiberSolver, FiberTechnologyCostConf, GcmResult, GigaSchool, GigaSchoolTable,
    NonConnectionReason, PairwiseDistance, SchoolConnectionCosts, Technology, UniqueCoordinate,
};
use std::collections::{HashMap, HashSet};

/// Split the scenario into schools still to connect and the fixed backbone.
///
/// The backbone is every fiber node followed by every school already on
/// fiber, in input order.
pub fn fiber_network_inputs(
    schools: &GigaSchoolTable,
    fiber_nodes: &[UniqueCoordinate],
) -> (Vec<UniqueCoordinate>, Vec<UniqueCoordinate>) {
    let mut connected: Vec<UniqueCoordinate> = fiber_nodes.to_vec();
    let mut unconnected = Vec::new();
    for school in &schools.schools {
        if school.has_fiber {
            connected.push(school.to_coordinate());
        } else {
            unconnected.push(school.to_coordinate());
        }
    }
    (unconnected, connected)
}

/// Connections plus how the network was found.
struct FiberNetwork {
    distances: Vec<PairwiseDistance>,
    /// Reason for candidates the network does not reach
    missing_reason: HashMap<String, NonConnectionReason>,
    sat_status: Option<SatOutcomeKind>,
}

pub struct FiberCostModel<'a> {
    conf: &'a FiberTechnologyCostConf,
}

impl<'a> FiberCostModel<'a> {
    pub fn new(conf: &'a FiberTechnologyCostConf) -> Self {
        Self { conf }
    }

    fn costs_for(&self, school: &GigaSchool, distance_m: f64, electricity: ElectricityCosts) -> SchoolConnectionCosts {
        let km = distance_m / 1_000.0;
        let parts = CostParts {
            capex_provider: km * self.conf.capex.cost_per_km,
            capex_consumer: self.conf.capex.fixed_costs,
            opex_provider: km * self.conf.opex.cost_per_km,
            opex_consumer: school.bandwidth_demand * self.conf.opex.annual_bandwidth_cost_per_mbps,
        };
        SchoolConnectionCosts::connected(school.giga_id.clone(), Technology::Fiber, parts, Some(electricity))
    }

    fn greedy_network(
        &self,
        ctx: &CostModelContext<'_>,
        candidates: &[UniqueCoordinate],
        backbone: &[UniqueCoordinate],
    ) -> FiberNetwork {
        let conf = GreedyConnectorConf {
            distance_type: ctx.nearest.distance_type,
            ..GreedyConnectorConf::new(
                self.conf.constraints.maximum_connection_length_m,
                ctx.economies_of_scale,
            )
        };
        let mut connector = GreedyDistanceConnector::new(conf);
        if let Some(cache) = ctx.greedy_cache {
            connector = connector.with_cache(cache);
        }
        FiberNetwork {
            distances: connector.run(candidates, backbone),
            missing_reason: HashMap::new(),
            sat_status: None,
        }
    }

    fn sat_network(
        &self,
        ctx: &CostModelContext<'_>,
        candidates: &[UniqueCoordinate],
    ) -> GcmResult<FiberNetwork> {
        let mut builder =
            SatCostGraphBuilder::new(self.conf.capex.cost_per_km).distance_type(ctx.nearest.distance_type);
        for node in &ctx.data.fiber_nodes.coordinates {
            builder = builder.fiber_node(node.clone());
        }
        for school in ctx.data.schools.schools.iter().filter(|s| s.has_fiber) {
            builder = builder.connected_school(school.to_coordinate());
        }
        for coord in candidates {
            // unknown alternative: leaving the school out costs nothing
            let ncost = ctx.alternative_costs.get(coord.id()).copied().unwrap_or(0.0);
            builder = builder.unconnected_school(coord.clone(), self.conf.capex.fixed_costs, ncost);
        }
        let graph = builder.build(self.conf.constraints.maximum_connection_length_m);
        let reachable: HashSet<String> = graph
            .reachable()
            .into_iter()
            .map(|n| graph.node(n).id.clone())
            .collect();

        let outcome = SatOptimizer::new(ctx.solver, self.conf.sat_solver.clone()).solve(&graph)?;
        let left_out = if self.conf.sat_solver.budget > 0.0 {
            NonConnectionReason::BudgetExceeded
        } else {
            NonConnectionReason::FiberDistanceThreshold
        };
        let mut missing_reason = HashMap::new();
        for coord in candidates {
            let reason = match &outcome {
                SatOutcome::NoSolution => NonConnectionReason::FiberSolverNoSolution,
                _ if reachable.contains(coord.id()) => left_out,
                _ => NonConnectionReason::FiberDistanceThreshold,
            };
            missing_reason.insert(coord.coordinate_id.clone(), reason);
        }

        Ok(FiberNetwork {
            distances: outcome.solution().map(|s| s.edges.clone()).unwrap_or_default(),
            missing_reason,
            sat_status: Some(outcome.kind()),
        })
    }
}

impl CostModel for FiberCostModel<'_> {
    fn technology(&self) -> Technology {
        Technology::Fiber
    }

    fn compute(&self, ctx: &CostModelContext<'_>) -> GcmResult<CostResultSpace> {
        let constraints = &self.conf.constraints;
        let schools: HashMap<&str, &GigaSchool> = ctx
            .data
            .schools
            .schools
            .iter()
            .map(|s| (s.giga_id.as_str(), s))
            .collect();

        let mut results: HashMap<String, SchoolConnectionCosts> = HashMap::new();
        let mut power: HashMap<String, ElectricityCosts> = HashMap::new();
        for school in &ctx.data.schools.schools {
            let id = school.giga_id.clone();
            if exceeds_bandwidth(school, constraints.maximum_bandwidth_mbps) {
                results.insert(
                    id.clone(),
                    SchoolConnectionCosts::infeasible(id, Technology::Fiber, NonConnectionReason::FiberBwThreshold),
                );
                continue;
            }
            match electricity_costs(school, constraints.required_power_w, &self.conf.electricity_config) {
                Some(e) if school.has_fiber => {
                    results.insert(id, self.costs_for(school, 0.0, e));
                }
                Some(e) => {
                    power.insert(id, e);
                }
                None => {
                    results.insert(
                        id.clone(),
                        SchoolConnectionCosts::infeasible(id, Technology::Fiber, NonConnectionReason::NoElectricity),
                    );
                }
            }
        }

        let (unconnected, backbone) =
            fiber_network_inputs(&ctx.data.schools, &ctx.data.fiber_nodes.coordinates);
        let candidates: Vec<UniqueCoordinate> = unconnected
            .into_iter()
            .filter(|c| power.contains_key(c.id()))
            .collect();

        let network = match self.conf.solver {
            FiberSolver::Greedy => self.greedy_network(ctx, &candidates, &backbone),
            FiberSolver::Sat => self.sat_network(ctx, &candidates)?,
        };

        for d in &network.distances {
            let id = d.second_id();
            let (Some(school), Some(e)) = (schools.get(id), power.get(id)) else {
                continue;
            };
            results.insert(id.to_string(), self.costs_for(school, d.distance, *e));
        }
        for coord in &candidates {
            if results.contains_key(coord.id()) {
                continue;
            }
            let reason = network
                .missing_reason
                .get(coord.id())
                .copied()
                .unwrap_or(NonConnectionReason::FiberDistanceThreshold);
            results.insert(
                coord.coordinate_id.clone(),
                SchoolConnectionCosts::infeasible(coord.coordinate_id.clone(), Technology::Fiber, reason),
            );
        }

        let cost_results: Vec<SchoolConnectionCosts> = ctx
            .data
            .schools
            .schools
            .iter()
            .filter_map(|s| results.remove(&s.giga_id))
            .collect();
        log_model_summary(Technology::Fiber, &cost_results);

        let mut space = CostResultSpace::new(Technology::Fiber, network.distances, cost_results);
        space.sat_status = network.sat_status;
        Ok(space)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cost::test_support::{at_km, school_at_km, Fixture};
    use crate::cost::ScenarioData;
    use gcm_core::{GigaSchoolTable, UniqueCoordinateTable};

    fn conf(cost_per_km: f64) -> FiberTechnologyCostConf {
        let mut conf = FiberTechnologyCostConf::defaults();
        conf.capex.cost_per_km = cost_per_km;
        conf.capex.fixed_costs = 0.0;
        conf
    }

    fn data(schools: Vec<GigaSchool>) -> ScenarioData {
        ScenarioData {
            schools: GigaSchoolTable::new(schools),
            fiber_nodes: UniqueCoordinateTable::new(vec![at_km("fiber", 0.0)]),
            ..Default::default()
        }
    }

    fn by_id(space: &CostResultSpace, id: &str) -> SchoolConnectionCosts {
        space.cost_results.iter().find(|c| c.school_id == id).cloned().unwrap()
    }

    #[test]
    fn test_only_school_in_range_connects() {
        let fixture = Fixture::new(data(vec![
            school_at_km("A", 2.0),
            school_at_km("B", 40.0),
            school_at_km("C", -40.0),
        ]));
        let conf = conf(10.0);
        let space = FiberCostModel::new(&conf).compute(&fixture.context()).unwrap();

        let a = by_id(&space, "A");
        assert!(a.feasible);
        assert!((a.capex - 20.0).abs() < 1e-6, "capex {}", a.capex);
        for id in ["B", "C"] {
            let c = by_id(&space, id);
            assert!(!c.feasible);
            assert_eq!(c.reason(), Some(NonConnectionReason::FiberDistanceThreshold));
        }
        assert_eq!(space.distances.len(), 1);
        assert_eq!(space.cost_results.len(), 3);
    }

    #[test]
    fn test_economies_of_scale_chain_through_schools() {
        let fixture = Fixture::new(data(vec![school_at_km("A", 15.0), school_at_km("B", 30.0)]));
        let conf = conf(1_000.0);
        let space = FiberCostModel::new(&conf).compute(&fixture.context()).unwrap();
        let b = by_id(&space, "B");
        assert!(b.feasible);
        assert!((b.capex_provider - 15_000.0).abs() < 1e-3);
        let edge = space.distances.iter().find(|d| d.second_id() == "B").unwrap();
        assert_eq!(edge.first_id(), "A");
        assert_eq!(edge.coordinate1.source(), Some("fiber"));

        let mut ctx = fixture.context();
        ctx.economies_of_scale = false;
        let space = FiberCostModel::new(&conf).compute(&ctx).unwrap();
        assert!(!by_id(&space, "B").feasible);
    }

    #[test]
    fn test_bandwidth_and_power_are_checked_first() {
        let fixture = Fixture::new(data(vec![
            school_at_km("greedy", 1.0).with_bandwidth_demand(5_000.0),
            school_at_km("dark", 1.5).with_electricity(false),
        ]));
        let mut conf = conf(10.0);
        conf.electricity_config.allow_new_electricity = false;
        let space = FiberCostModel::new(&conf).compute(&fixture.context()).unwrap();
        assert_eq!(by_id(&space, "greedy").reason(), Some(NonConnectionReason::FiberBwThreshold));
        assert_eq!(by_id(&space, "dark").reason(), Some(NonConnectionReason::NoElectricity));
        assert!(space.distances.is_empty());
    }

    #[test]
    fn test_fiber_school_is_a_source() {
        let fixture = Fixture::new(data(vec![
            school_at_km("on-fiber", 50.0).with_fiber(true),
            school_at_km("near", 55.0),
        ]));
        let conf = conf(10.0);
        let space = FiberCostModel::new(&conf).compute(&fixture.context()).unwrap();
        let own = by_id(&space, "on-fiber");
        assert!(own.feasible);
        assert_eq!(own.capex_provider, 0.0);
        let edge = space.distances.iter().find(|d| d.second_id() == "near").unwrap();
        assert_eq!(edge.coordinate1.source(), Some("on-fiber"));
    }

    #[cfg(feature = "solver-microlp")]
    #[test]
    fn test_sat_solver_path() {
        let fixture = Fixture::new(data(vec![
            school_at_km("A", 2.0),
            school_at_km("B", 4.0),
            school_at_km("far", 90.0),
        ]));
        let mut conf = conf(10.0);
        conf.solver = FiberSolver::Sat;
        conf.constraints.maximum_connection_length_m = 3_000.0;
        conf.sat_solver.time_limit = 60.0;
        let space = FiberCostModel::new(&conf).compute(&fixture.context()).unwrap();

        assert_eq!(space.sat_status, Some(SatOutcomeKind::Optimal));
        assert!(by_id(&space, "A").feasible);
        assert!(by_id(&space, "B").feasible);
        assert_eq!(by_id(&space, "far").reason(), Some(NonConnectionReason::FiberDistanceThreshold));
    }
}
