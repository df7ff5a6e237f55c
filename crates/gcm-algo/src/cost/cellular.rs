//! Cellular cost model: a school is covered by the nearest tower offering a
//! valid radio technology, or by the coverage it already reports.

use super::{
    electricity_costs, exceeds_bandwidth, log_model_summary, subscription_opex, valid_tower_coordinates,
    CostModel, CostModelContext,
};
use crate::output::CostResultSpace;
use gcm_core::{
    nearest_distances, CellularTechnologyCostConf, CostParts, GcmResult, GigaSchool, NonConnectionReason,
    SchoolConnectionCosts, SingleLookupDistanceCache, Technology,
};

pub struct CellularCostModel<'a> {
    conf: &'a CellularTechnologyCostConf,
}

impl<'a> CellularCostModel<'a> {
    pub fn new(conf: &'a CellularTechnologyCostConf) -> Self {
        Self { conf }
    }

    fn reported_coverage(&self, school: &GigaSchool) -> bool {
        school.cell_coverage_type.as_deref().is_some_and(|coverage| {
            self.conf
                .constraints
                .valid_technologies
                .iter()
                .any(|v| v.eq_ignore_ascii_case(coverage))
        })
    }

    /// Nearest valid tower per school.
    pub fn tower_cache(&self, ctx: &CostModelContext<'_>) -> SingleLookupDistanceCache {
        let towers = valid_tower_coordinates(&ctx.data.cell_towers, &self.conf.constraints.valid_technologies);
        let schools = ctx.data.schools.to_coordinates();
        let nearest = nearest_distances(&schools, &towers, &ctx.nearest.with_neighbors(1));
        SingleLookupDistanceCache::from_distances(nearest)
    }
}

impl CostModel for CellularCostModel<'_> {
    fn technology(&self) -> Technology {
        Technology::Cellular
    }

    fn compute(&self, ctx: &CostModelContext<'_>) -> GcmResult<CostResultSpace> {
        let constraints = &self.conf.constraints;
        let cache = self.tower_cache(ctx);
        let mut distances = Vec::new();
        let mut cost_results = Vec::with_capacity(ctx.data.schools.len());

        for school in &ctx.data.schools.schools {
            let id = school.giga_id.as_str();
            if exceeds_bandwidth(school, constraints.maximum_bandwidth_mbps) {
                cost_results.push(SchoolConnectionCosts::infeasible(
                    id,
                    Technology::Cellular,
                    NonConnectionReason::CellularBwThreshold,
                ));
                continue;
            }
            let tower = cache.get(id).filter(|d| d.distance <= constraints.maximum_range_m);
            if tower.is_none() && !self.reported_coverage(school) {
                cost_results.push(SchoolConnectionCosts::infeasible(
                    id,
                    Technology::Cellular,
                    NonConnectionReason::CellularRangeThreshold,
                ));
                continue;
            }
            let Some(power) = electricity_costs(school, constraints.required_power_w, &self.conf.electricity_config)
            else {
                cost_results.push(SchoolConnectionCosts::infeasible(
                    id,
                    Technology::Cellular,
                    NonConnectionReason::NoElectricity,
                ));
                continue;
            };

            if let Some(d) = tower {
                distances.push(d.clone());
            }
            let parts = CostParts {
                capex_consumer: self.conf.capex.fixed_costs,
                opex_consumer: subscription_opex(school, &self.conf.opex),
                ..CostParts::default()
            };
            cost_results.push(SchoolConnectionCosts::connected(id, Technology::Cellular, parts, Some(power)));
        }

        log_model_summary(Technology::Cellular, &cost_results);
        Ok(CostResultSpace::new(Technology::Cellular, distances, cost_results))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cost::test_support::{at_km, school_at_km, Fixture};
    use crate::cost::ScenarioData;
    use gcm_core::{CellTower, CellTowerTable, GigaSchoolTable};

    fn tower_at_km(id: &str, x_km: f64, technologies: &[&str]) -> CellTower {
        let c = at_km(id, x_km);
        CellTower::new(id, c.lat(), c.lon()).with_technologies(technologies)
    }

    fn run(schools: Vec<GigaSchool>, towers: Vec<CellTower>) -> CostResultSpace {
        let fixture = Fixture::new(ScenarioData {
            schools: GigaSchoolTable::new(schools),
            cell_towers: CellTowerTable::new(towers),
            ..Default::default()
        });
        let conf = CellularTechnologyCostConf::defaults();
        CellularCostModel::new(&conf).compute(&fixture.context()).unwrap()
    }

    #[test]
    fn test_tower_in_range() {
        let space = run(vec![school_at_km("s", 3.0)], vec![tower_at_km("t", 0.0, &["4G"])]);
        let cost = &space.cost_results[0];
        assert!(cost.feasible);
        assert_eq!(cost.capex_consumer, 500.0);
        // 200 flat + 20 Mbps at $10, plus 10 W of grid power
        assert!((cost.opex_consumer - (400.0 + 10.0 * 8.76 * 0.1)).abs() < 1e-9);
        assert_eq!(space.distances[0].second_id(), "t");
    }

    #[test]
    fn test_out_of_range_and_wrong_technology() {
        let space = run(
            vec![school_at_km("far", 20.0), school_at_km("near", 1.0)],
            vec![tower_at_km("t", 0.0, &["4G"]), tower_at_km("old", 1.0, &["2G"])],
        );
        assert_eq!(
            space.cost_results[0].reason(),
            Some(NonConnectionReason::CellularRangeThreshold)
        );
        // the 2G tower sits on the school but does not count
        assert_eq!(space.distances.len(), 1);
        assert_eq!(space.distances[0].second_id(), "t");
    }

    #[test]
    fn test_reported_coverage_counts() {
        let space = run(vec![school_at_km("s", 50.0).with_coverage("4g")], Vec::new());
        assert!(space.cost_results[0].feasible);
        assert!(space.distances.is_empty());
    }

    #[test]
    fn test_bandwidth_threshold() {
        let space = run(
            vec![school_at_km("s", 1.0).with_bandwidth_demand(500.0)],
            vec![tower_at_km("t", 0.0, &["4G"])],
        );
        assert_eq!(space.cost_results[0].reason(), Some(NonConnectionReason::CellularBwThreshold));
    }
}
