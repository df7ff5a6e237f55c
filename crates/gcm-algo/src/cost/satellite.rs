//! Satellite cost model. Reachable everywhere; only bandwidth and power limit it.

use super::{electricity_costs, exceeds_bandwidth, log_model_summary, subscription_opex, CostModel, CostModelContext};
use crate::output::CostResultSpace;
use gcm_core::{
    CostParts, GcmResult, NonConnectionReason, SatelliteTechnologyCostConf, SchoolConnectionCosts, Technology,
};

pub struct SatelliteCostModel<'a> {
    conf: &'a SatelliteTechnologyCostConf,
}

impl<'a> SatelliteCostModel<'a> {
    pub fn new(conf: &'a SatelliteTechnologyCostConf) -> Self {
        Self { conf }
    }
}

impl CostModel for SatelliteCostModel<'_> {
    fn technology(&self) -> Technology {
        Technology::Satellite
    }

    fn compute(&self, ctx: &CostModelContext<'_>) -> GcmResult<CostResultSpace> {
        let constraints = &self.conf.constraints;
        let cost_results: Vec<SchoolConnectionCosts> = ctx
            .data
            .schools
            .schools
            .iter()
            .map(|school| {
                let id = school.giga_id.as_str();
                if exceeds_bandwidth(school, constraints.maximum_bandwidth_mbps) {
                    return SchoolConnectionCosts::infeasible(
                        id,
                        Technology::Satellite,
                        NonConnectionReason::SatelliteBwThreshold,
                    );
                }
                match electricity_costs(school, constraints.required_power_w, &self.conf.electricity_config) {
                    Some(power) => {
                        let parts = CostParts {
                            capex_consumer: self.conf.capex.fixed_costs,
                            opex_consumer: subscription_opex(school, &self.conf.opex),
                            ..CostParts::default()
                        };
                        SchoolConnectionCosts::connected(id, Technology::Satellite, parts, Some(power))
                    }
                    None => SchoolConnectionCosts::infeasible(id, Technology::Satellite, NonConnectionReason::NoElectricity),
                }
            })
            .collect();

        log_model_summary(Technology::Satellite, &cost_results);
        Ok(CostResultSpace::new(Technology::Satellite, Vec::new(), cost_results))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cost::test_support::{school_at_km, Fixture};
    use crate::cost::ScenarioData;
    use gcm_core::GigaSchoolTable;

    #[test]
    fn test_satellite_costs() {
        let fixture = Fixture::new(ScenarioData {
            schools: GigaSchoolTable::new(vec![
                school_at_km("ok", 0.0),
                school_at_km("heavy", 1.0).with_bandwidth_demand(1_000.0),
                school_at_km("solar", 2.0).with_electricity(false),
            ]),
            ..Default::default()
        });
        let conf = SatelliteTechnologyCostConf::defaults();
        let space = SatelliteCostModel::new(&conf).compute(&fixture.context()).unwrap();

        let ok = &space.cost_results[0];
        assert!(ok.feasible);
        assert_eq!(ok.capex, 500.0);
        // 20 Mbps at $15 plus 200 W of grid power
        assert!((ok.opex - (300.0 + 175.2)).abs() < 1e-9);
        assert_eq!(
            space.cost_results[1].reason(),
            Some(NonConnectionReason::SatelliteBwThreshold)
        );
        // 200 W of solar at $10/W
        assert_eq!(space.cost_results[2].capex, 2_500.0);
    }
}
