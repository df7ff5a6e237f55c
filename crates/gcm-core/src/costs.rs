//! Per-school connection cost records.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Candidate connection technology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Technology {
    Fiber,
    Cellular,
    P2P,
    Satellite,
}

impl Technology {
    /// Strict preference order used by the priority minimizer.
    pub const PRIORITY_ORDER: [Technology; 4] = [
        Technology::Fiber,
        Technology::Cellular,
        Technology::P2P,
        Technology::Satellite,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Technology::Fiber => "Fiber",
            Technology::Cellular => "Cellular",
            Technology::P2P => "P2P",
            Technology::Satellite => "Satellite",
        }
    }
}

impl fmt::Display for Technology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a school could not be connected with a technology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NonConnectionReason {
    FiberDistanceThreshold,
    FiberBwThreshold,
    FiberSolverNoSolution,
    CellularRangeThreshold,
    CellularBwThreshold,
    P2pRangeThreshold,
    P2pBwThreshold,
    SatelliteBwThreshold,
    NoElectricity,
    BudgetExceeded,
}

impl NonConnectionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            NonConnectionReason::FiberDistanceThreshold => "FIBER_DISTANCE_THRESHOLD",
            NonConnectionReason::FiberBwThreshold => "FIBER_BW_THRESHOLD",
            NonConnectionReason::FiberSolverNoSolution => "FIBER_SOLVER_NO_SOLUTION",
            NonConnectionReason::CellularRangeThreshold => "CELLULAR_RANGE_THRESHOLD",
            NonConnectionReason::CellularBwThreshold => "CELLULAR_BW_THRESHOLD",
            NonConnectionReason::P2pRangeThreshold => "P2P_RANGE_THRESHOLD",
            NonConnectionReason::P2pBwThreshold => "P2P_BW_THRESHOLD",
            NonConnectionReason::SatelliteBwThreshold => "SATELLITE_BW_THRESHOLD",
            NonConnectionReason::NoElectricity => "NO_ELECTRICITY",
            NonConnectionReason::BudgetExceeded => "BUDGET_EXCEEDED",
        }
    }
}

impl fmt::Display for NonConnectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who pays the recurring costs counted in a project lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpexResponsibility {
    #[default]
    Consumer,
    Provider,
    Both,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElectricitySource {
    Existing,
    Solar,
}

/// Power supply costs for the equipment a technology installs at a school.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ElectricityCosts {
    pub capex: f64,
    pub opex: f64,
    pub source: ElectricitySource,
}

/// Provider/consumer split of a connection's one-off and annual costs.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CostParts {
    pub capex_provider: f64,
    pub capex_consumer: f64,
    pub opex_provider: f64,
    pub opex_consumer: f64,
}

/// Cost of connecting one school with one technology.
///
/// Infeasible records carry zero costs and at least one reason. A record with
/// `technology == None` is the combined result for a school no technology
/// could connect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchoolConnectionCosts {
    pub school_id: String,
    pub capex: f64,
    pub capex_provider: f64,
    pub capex_consumer: f64,
    pub opex: f64,
    pub opex_provider: f64,
    pub opex_consumer: f64,
    pub technology: Option<Technology>,
    pub feasible: bool,
    #[serde(default)]
    pub reasons: Vec<NonConnectionReason>,
    #[serde(default)]
    pub electricity: Option<ElectricityCosts>,
}

impl SchoolConnectionCosts {
    /// Feasible connection; electricity costs are borne by the consumer.
    pub fn connected(
        school_id: impl Into<String>,
        technology: Technology,
        parts: CostParts,
        electricity: Option<ElectricityCosts>,
    ) -> Self {
        let (e_capex, e_opex) = electricity.map(|e| (e.capex, e.opex)).unwrap_or((0.0, 0.0));
        let capex_consumer = parts.capex_consumer + e_capex;
        let opex_consumer = parts.opex_consumer + e_opex;
        Self {
            school_id: school_id.into(),
            capex: parts.capex_provider + capex_consumer,
            capex_provider: parts.capex_provider,
            capex_consumer,
            opex: parts.opex_provider + opex_consumer,
            opex_provider: parts.opex_provider,
            opex_consumer,
            technology: Some(technology),
            feasible: true,
            reasons: Vec::new(),
            electricity,
        }
    }

    pub fn infeasible(
        school_id: impl Into<String>,
        technology: Technology,
        reason: NonConnectionReason,
    ) -> Self {
        Self::zero(school_id.into(), Some(technology), vec![reason])
    }

    /// Result for a school that no technology could connect.
    pub fn combined_infeasible(school_id: impl Into<String>, reasons: Vec<NonConnectionReason>) -> Self {
        Self::zero(school_id.into(), None, reasons)
    }

    fn zero(school_id: String, technology: Option<Technology>, reasons: Vec<NonConnectionReason>) -> Self {
        Self {
            school_id,
            capex: 0.0,
            capex_provider: 0.0,
            capex_consumer: 0.0,
            opex: 0.0,
            opex_provider: 0.0,
            opex_consumer: 0.0,
            technology,
            feasible: false,
            reasons,
            electricity: None,
        }
    }

    /// First recorded reason, if infeasible.
    pub fn reason(&self) -> Option<NonConnectionReason> {
        self.reasons.first().copied()
    }

    pub fn opex_part(&self, responsibility: OpexResponsibility) -> f64 {
        match responsibility {
            OpexResponsibility::Consumer => self.opex_consumer,
            OpexResponsibility::Provider => self.opex_provider,
            OpexResponsibility::Both => self.opex,
        }
    }

    /// `capex + years * opex_part`; infinite when infeasible.
    pub fn lifetime_cost(&self, years_opex: u32, responsibility: OpexResponsibility) -> f64 {
        if !self.feasible {
            return f64::INFINITY;
        }
        self.capex + f64::from(years_opex) * self.opex_part(responsibility)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_serializes_screaming_snake() {
        let json = serde_json::to_string(&NonConnectionReason::P2pRangeThreshold).unwrap();
        assert_eq!(json, "\"P2P_RANGE_THRESHOLD\"");
        let back: NonConnectionReason = serde_json::from_str("\"FIBER_DISTANCE_THRESHOLD\"").unwrap();
        assert_eq!(back, NonConnectionReason::FiberDistanceThreshold);
        assert_eq!(back.to_string(), "FIBER_DISTANCE_THRESHOLD");
    }

    #[test]
    fn test_electricity_is_folded_into_consumer() {
        let parts = CostParts {
            capex_provider: 100.0,
            capex_consumer: 10.0,
            opex_provider: 5.0,
            opex_consumer: 1.0,
        };
        let electricity = ElectricityCosts {
            capex: 50.0,
            opex: 2.0,
            source: ElectricitySource::Solar,
        };
        let c = SchoolConnectionCosts::connected("s", Technology::Fiber, parts, Some(electricity));
        assert_eq!(c.capex_consumer, 60.0);
        assert_eq!(c.capex, 160.0);
        assert_eq!(c.opex_consumer, 3.0);
        assert_eq!(c.opex, 8.0);
    }

    #[test]
    fn test_lifetime_cost_by_responsibility() {
        let parts = CostParts {
            capex_provider: 0.0,
            capex_consumer: 100.0,
            opex_provider: 20.0,
            opex_consumer: 10.0,
        };
        let c = SchoolConnectionCosts::connected("s", Technology::Satellite, parts, None);
        assert_eq!(c.lifetime_cost(5, OpexResponsibility::Consumer), 150.0);
        assert_eq!(c.lifetime_cost(5, OpexResponsibility::Provider), 200.0);
        assert_eq!(c.lifetime_cost(5, OpexResponsibility::Both), 250.0);
    }

    #[test]
    fn test_infeasible_lifetime_is_infinite() {
        let c = SchoolConnectionCosts::infeasible("s", Technology::Cellular, NonConnectionReason::CellularRangeThreshold);
        assert!(!c.feasible);
        assert_eq!(c.reason(), Some(NonConnectionReason::CellularRangeThreshold));
        assert!(c.lifetime_cost(5, OpexResponsibility::Both).is_infinite());
    }

    #[test]
    fn test_priority_order() {
        assert_eq!(Technology::PRIORITY_ORDER[0], Technology::Fiber);
        assert_eq!(Technology::PRIORITY_ORDER[3], Technology::Satellite);
    }
}
