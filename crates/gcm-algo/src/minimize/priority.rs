use super::{combined_infeasible, log_result, CostMinimizer, MinimizerResult};
use crate::output::OutputSpace;
use gcm_core::{GcmResult, Technology};

/// First feasible technology in [`Technology::PRIORITY_ORDER`], regardless of cost.
#[derive(Debug, Clone, Copy, Default)]
pub struct PriorityMinimizer;

impl CostMinimizer for PriorityMinimizer {
    fn name(&self) -> &'static str {
        "priority"
    }

    fn minimize(&self, output: &OutputSpace) -> GcmResult<MinimizerResult> {
        let costs = output
            .aggregated_costs
            .iter()
            .map(|(id, costs)| {
                Technology::PRIORITY_ORDER
                    .iter()
                    .filter_map(|t| costs.get(t))
                    .find(|c| c.feasible)
                    .cloned()
                    .unwrap_or_else(|| combined_infeasible(id, costs))
            })
            .collect();
        let result = MinimizerResult {
            costs,
            fiber_distances: None,
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

    #[test]
    fn test_preference_beats_cost() {
        let output = output(vec![
            (
                Technology::Satellite,
                Vec::new(),
                vec![cost("a", Technology::Satellite, 10.0), cost("b", Technology::Satellite, 10.0)],
            ),
            (
                Technology::Cellular,
                Vec::new(),
                vec![
                    cost("a", Technology::Cellular, 10_000.0),
                    infeasible("b", Technology::Cellular, NonConnectionReason::CellularRangeThreshold),
                ],
            ),
            (
                Technology::P2P,
                Vec::new(),
                vec![
                    infeasible("a", Technology::P2P, NonConnectionReason::P2pRangeThreshold),
                    infeasible("b", Technology::P2P, NonConnectionReason::P2pRangeThreshold),
                ],
            ),
        ]);
        let result = PriorityMinimizer.minimize(&output).unwrap();
        assert_eq!(result.costs[0].technology, Some(Technology::Cellular));
        assert_eq!(result.costs[1].technology, Some(Technology::Satellite));
    }

    #[test]
    fn test_nothing_feasible() {
        let output = output(vec![(
            Technology::P2P,
            Vec::new(),
            vec![infeasible("a", Technology::P2P, NonConnectionReason::P2pRangeThreshold)],
        )]);
        let result = PriorityMinimizer.minimize(&output).unwrap();
        assert!(!result.costs[0].feasible);
        assert_eq!(result.costs[0].reasons, vec![NonConnectionReason::P2pRangeThreshold]);
    }
}
