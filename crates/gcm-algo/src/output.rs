//! Results of a scenario run, filled in one technology at a time.

use crate::sat::SatOutcomeKind;
use gcm_core::{PairwiseDistance, SchoolConnectionCosts, Technology};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Costs keyed by school id, then technology.
pub type AggregatedCosts = BTreeMap<String, BTreeMap<Technology, SchoolConnectionCosts>>;

/// Output of one technology's cost model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostResultSpace {
    pub technology: Technology,
    /// Connections the costs were derived from
    pub distances: Vec<PairwiseDistance>,
    pub cost_results: Vec<SchoolConnectionCosts>,
    /// Full network before a minimizer trimmed `distances`
    #[serde(default)]
    pub complete_network_distances: Option<Vec<PairwiseDistance>>,
    #[serde(default)]
    pub sat_status: Option<SatOutcomeKind>,
}

impl CostResultSpace {
    pub fn new(
        technology: Technology,
        distances: Vec<PairwiseDistance>,
        cost_results: Vec<SchoolConnectionCosts>,
    ) -> Self {
        Self {
            technology,
            distances,
            cost_results,
            complete_network_distances: None,
            sat_status: None,
        }
    }

    pub fn feasible_count(&self) -> usize {
        self.cost_results.iter().filter(|c| c.feasible).count()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputSpace {
    pub technology_outputs: BTreeMap<Technology, CostResultSpace>,
    pub aggregated_costs: AggregatedCosts,
    pub minimum_cost_result: Vec<SchoolConnectionCosts>,
    /// Outcome of the exact fiber solver, when it ran
    pub sat_status: Option<SatOutcomeKind>,
}

impl OutputSpace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, space: CostResultSpace) {
        if let Some(status) = space.sat_status {
            self.sat_status = Some(status);
        }
        self.technology_outputs.insert(space.technology, space);
    }

    pub fn get(&self, technology: Technology) -> Option<&CostResultSpace> {
        self.technology_outputs.get(&technology)
    }

    /// Regroup every technology's cost records by school id.
    pub fn aggregate(&mut self) {
        let mut aggregated = AggregatedCosts::new();
        for (&technology, space) in &self.technology_outputs {
            for cost in &space.cost_results {
                aggregated
                    .entry(cost.school_id.clone())
                    .or_default()
                    .insert(technology, cost.clone());
            }
        }
        self.aggregated_costs = aggregated;
    }

    /// Replace the fiber network with the connections a minimizer kept,
    /// retaining the full network for audit.
    pub fn retain_fiber_distances(&mut self, kept: Vec<PairwiseDistance>) {
        if let Some(space) = self.technology_outputs.get_mut(&Technology::Fiber) {
            let complete = std::mem::replace(&mut space.distances, kept);
            space.complete_network_distances = Some(complete);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gcm_core::{CostParts, NonConnectionReason, UniqueCoordinate};

    fn space(technology: Technology, ids: &[&str]) -> CostResultSpace {
        let costs = ids
            .iter()
            .map(|id| SchoolConnectionCosts::connected(*id, technology, CostParts::default(), None))
            .collect();
        CostResultSpace::new(technology, Vec::new(), costs)
    }

    #[test]
    fn test_aggregate_groups_by_school() {
        let mut output = OutputSpace::new();
        output.insert(space(Technology::Satellite, &["a", "b"]));
        let mut fiber = space(Technology::Fiber, &["a"]);
        fiber
            .cost_results
            .push(SchoolConnectionCosts::infeasible("b", Technology::Fiber, NonConnectionReason::FiberDistanceThreshold));
        output.insert(fiber);
        output.aggregate();

        assert_eq!(output.aggregated_costs.len(), 2);
        assert_eq!(output.aggregated_costs["a"].len(), 2);
        assert!(!output.aggregated_costs["b"][&Technology::Fiber].feasible);
    }

    #[test]
    fn test_retain_fiber_keeps_complete_network() {
        let mut output = OutputSpace::new();
        let mut fiber = space(Technology::Fiber, &["a", "b"]);
        let edge = |to: &str| {
            PairwiseDistance::new(
                UniqueCoordinate::new("f", 0.0, 0.0),
                UniqueCoordinate::new(to, 0.0, 0.0),
                10.0,
                Default::default(),
            )
        };
        fiber.distances = vec![edge("a"), edge("b")];
        output.insert(fiber);
        output.retain_fiber_distances(vec![edge("a")]);

        let fiber = output.get(Technology::Fiber).unwrap();
        assert_eq!(fiber.distances.len(), 1);
        assert_eq!(fiber.complete_network_distances.as_ref().unwrap().len(), 2);
    }

    #[test]
    fn test_output_serializes_with_technology_keys() {
        let mut output = OutputSpace::new();
        output.insert(space(Technology::Cellular, &["a"]));
        output.aggregate();
        let json = serde_json::to_value(&output).unwrap();
        assert!(json["technology_outputs"]["Cellular"].is_object());
        assert!(json["aggregated_costs"]["a"]["Cellular"]["feasible"].as_bool().unwrap());
    }
}
