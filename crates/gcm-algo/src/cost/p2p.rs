//! Point-to-point microwave backhaul from a visible cell tower.

use super::{
    electricity_costs, exceeds_bandwidth, log_model_summary, subscription_opex, valid_tower_coordinates,
    CostModel, CostModelContext,
};
use crate::output::CostResultSpace;
use gcm_core::{
    nearest_distances, CostParts, GcmError, GcmResult, NearestNeighborConf, NonConnectionReason, P2PTechnologyCostConf,
    PairwiseDistance, SchoolConnectionCosts, SingleLookupDistanceCache, Technology, UniqueCoordinate,
};

/// Visibility between the two endpoints of each distance.
///
/// Implementations typically sample an elevation profile along the path; the
/// cost model only relies on the boolean answer, one per input pair.
pub trait LineOfSightOracle {
    fn line_of_sight(&self, pairs: &[PairwiseDistance]) -> GcmResult<Vec<bool>>;
}

/// Treats every pair as visible, for offline runs without elevation data.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysVisible;

impl LineOfSightOracle for AlwaysVisible {
    fn line_of_sight(&self, pairs: &[PairwiseDistance]) -> GcmResult<Vec<bool>> {
        Ok(vec![true; pairs.len()])
    }
}

/// Closest visible tower within range, per school.
pub struct P2PCacheBuilder<'a> {
    oracle: &'a dyn LineOfSightOracle,
    n_candidates: usize,
    maximum_range_m: f64,
}

impl<'a> P2PCacheBuilder<'a> {
    pub fn new(oracle: &'a dyn LineOfSightOracle, n_candidates: usize, maximum_range_m: f64) -> Self {
        Self {
            oracle,
            n_candidates,
            maximum_range_m,
        }
    }

    pub fn build(
        &self,
        schools: &[UniqueCoordinate],
        towers: &[UniqueCoordinate],
        nearest: &NearestNeighborConf,
    ) -> GcmResult<SingleLookupDistanceCache> {
        let ranked: Vec<PairwiseDistance> = nearest_distances(schools, towers, &nearest.with_neighbors(self.n_candidates))
            .into_iter()
            .filter(|d| d.distance <= self.maximum_range_m)
            .collect();
        let visible = self.oracle.line_of_sight(&ranked)?;
        if visible.len() != ranked.len() {
            return Err(GcmError::Other(format!(
                "line of sight oracle answered {} of {} pairs",
                visible.len(),
                ranked.len()
            )));
        }
        let kept = ranked
            .into_iter()
            .zip(visible)
            .filter_map(|(d, ok)| ok.then_some(d));
        let cache = SingleLookupDistanceCache::from_distances(kept);
        tracing::debug!(schools = schools.len(), with_tower = cache.len(), "built P2P tower cache");
        Ok(cache)
    }
}

pub struct P2PCostModel<'a> {
    conf: &'a P2PTechnologyCostConf,
}

impl<'a> P2PCostModel<'a> {
    pub fn new(conf: &'a P2PTechnologyCostConf) -> Self {
        Self { conf }
    }
}

impl CostModel for P2PCostModel<'_> {
    fn technology(&self) -> Technology {
        Technology::P2P
    }

    fn compute(&self, ctx: &CostModelContext<'_>) -> GcmResult<CostResultSpace> {
        let constraints = &self.conf.constraints;
        let towers = valid_tower_coordinates(&ctx.data.cell_towers, &constraints.valid_technologies);
        let cache = P2PCacheBuilder::new(ctx.line_of_sight, self.conf.n_candidate_towers, constraints.maximum_range_m)
            .build(&ctx.data.schools.to_coordinates(), &towers, &ctx.nearest)?;

        let mut distances = Vec::new();
        let mut cost_results = Vec::with_capacity(ctx.data.schools.len());
        for school in &ctx.data.schools.schools {
            let id = school.giga_id.as_str();
            if exceeds_bandwidth(school, constraints.maximum_bandwidth_mbps) {
                cost_results.push(SchoolConnectionCosts::infeasible(
                    id,
                    Technology::P2P,
                    NonConnectionReason::P2pBwThreshold,
                ));
                continue;
            }
            let Some(tower) = cache.get(id) else {
                cost_results.push(SchoolConnectionCosts::infeasible(
                    id,
                    Technology::P2P,
                    NonConnectionReason::P2pRangeThreshold,
                ));
                continue;
            };
            let Some(power) = electricity_costs(school, constraints.required_power_w, &self.conf.electricity_config)
            else {
                cost_results.push(SchoolConnectionCosts::infeasible(
                    id,
                    Technology::P2P,
                    NonConnectionReason::NoElectricity,
                ));
                continue;
            };

            distances.push(tower.clone());
            let parts = CostParts {
                capex_provider: self.conf.capex.tower_fixed_costs,
                capex_consumer: self.conf.capex.fixed_costs,
                opex_provider: 0.0,
                opex_consumer: subscription_opex(school, &self.conf.opex),
            };
            cost_results.push(SchoolConnectionCosts::connected(id, Technology::P2P, parts, Some(power)));
        }

        log_model_summary(Technology::P2P, &cost_results);
        Ok(CostResultSpace::new(Technology::P2P, distances, cost_results))
    }
}
