//! Scenario and per-technology configuration.
//!
//! Every struct here is fully specified: deserialization requires every field,
//! and documented defaults come only from the `defaults()` factories, which
//! return fresh values on each call.
//!
//! ```toml
//! [cost_minimizer]
//! years_opex = 5
//! economies_of_scale = true
//! opex_responsible = "consumer"
//! minimizer = "cost_optimal"
//!
//! [[technologies]]
//! technology = "Satellite"
//! # ...
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::costs::{OpexResponsibility, Technology};
use crate::distance::NearestNeighborConf;
use crate::error::{GcmError, GcmResult};

/// Power supply costs shared by every technology.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElectricityCostConf {
    /// Installed solar cost in USD per watt
    pub solar_cost_per_watt: f64,
    /// Grid electricity in USD per kWh
    pub cost_per_kwh: f64,
    /// Whether schools without electricity may get a new (solar) supply
    pub allow_new_electricity: bool,
}

impl ElectricityCostConf {
    pub fn defaults() -> Self {
        Self {
            solar_cost_per_watt: 10.0,
            cost_per_kwh: 0.10,
            allow_new_electricity: true,
        }
    }
}

/// How the fiber network is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FiberSolver {
    /// Nearest-first greedy connector
    #[default]
    Greedy,
    /// Exact constraint-model network design
    Sat,
}

/// Settings for the exact fiber network design solver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SatSolverConfig {
    /// Total USD budget; 0 solves without a budget
    pub budget: f64,
    /// Wall-clock limit per solve, in seconds
    pub time_limit: f64,
    /// Worker threads handed to backends that support them
    pub parallelism: usize,
    /// Shortest incident edges kept per node on top of the spanning tree
    pub max_neighbors: usize,
    /// Charge unconnected schools their alternative-technology cost
    pub use_alternative_costs: bool,
}

impl SatSolverConfig {
    pub fn defaults() -> Self {
        Self {
            budget: 0.0,
            time_limit: 600.0,
            parallelism: 4,
            max_neighbors: 8,
            use_alternative_costs: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FiberCapexConf {
    pub cost_per_km: f64,
    pub fixed_costs: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FiberOpexConf {
    pub cost_per_km: f64,
    pub annual_bandwidth_cost_per_mbps: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FiberConstraints {
    pub maximum_connection_length_m: f64,
    pub maximum_bandwidth_mbps: f64,
    pub required_power_w: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FiberTechnologyCostConf {
    pub capex: FiberCapexConf,
    pub opex: FiberOpexConf,
    pub constraints: FiberConstraints,
    pub electricity_config: ElectricityCostConf,
    pub solver: FiberSolver,
    pub sat_solver: SatSolverConfig,
}

impl FiberTechnologyCostConf {
    pub fn defaults() -> Self {
        Self {
            capex: FiberCapexConf {
                cost_per_km: 8_900.0,
                fixed_costs: 500.0,
            },
            opex: FiberOpexConf {
                cost_per_km: 100.0,
                annual_bandwidth_cost_per_mbps: 10.0,
            },
            constraints: FiberConstraints {
                maximum_connection_length_m: 20_000.0,
                maximum_bandwidth_mbps: 2_000.0,
                required_power_w: 500.0,
            },
            electricity_config: ElectricityCostConf::defaults(),
            solver: FiberSolver::Greedy,
            sat_solver: SatSolverConfig::defaults(),
        }
    }
}

/// One-off cost paid per school.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixedCapexConf {
    pub fixed_costs: f64,
}

/// Annual cost paid per school: a flat fee plus bandwidth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixedOpexConf {
    pub fixed_costs: f64,
    pub annual_bandwidth_cost_per_mbps: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeConstraints {
    pub maximum_range_m: f64,
    pub maximum_bandwidth_mbps: f64,
    pub required_power_w: f64,
    /// Tower radio technologies that count as coverage
    pub valid_technologies: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellularTechnologyCostConf {
    pub capex: FixedCapexConf,
    pub opex: FixedOpexConf,
    pub constraints: RangeConstraints,
    pub electricity_config: ElectricityCostConf,
}

impl CellularTechnologyCostConf {
    pub fn defaults() -> Self {
        Self {
            capex: FixedCapexConf { fixed_costs: 500.0 },
            opex: FixedOpexConf {
                fixed_costs: 200.0,
                annual_bandwidth_cost_per_mbps: 10.0,
            },
            constraints: RangeConstraints {
                maximum_range_m: 8_000.0,
                maximum_bandwidth_mbps: 100.0,
                required_power_w: 10.0,
                valid_technologies: vec!["3G".into(), "4G".into(), "5G".into()],
            },
            electricity_config: ElectricityCostConf::defaults(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct P2PCapexConf {
    pub fixed_costs: f64,
    /// Equipment installed on the tower side, paid by the provider
    pub tower_fixed_costs: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct P2PTechnologyCostConf {
    pub capex: P2PCapexConf,
    pub opex: FixedOpexConf,
    pub constraints: RangeConstraints,
    pub electricity_config: ElectricityCostConf,
    /// Towers ranked per school before asking the line-of-sight oracle
    pub n_candidate_towers: usize,
}

impl P2PTechnologyCostConf {
    pub fn defaults() -> Self {
        Self {
            capex: P2PCapexConf {
                fixed_costs: 500.0,
                tower_fixed_costs: 2_500.0,
            },
            opex: FixedOpexConf {
                fixed_costs: 200.0,
                annual_bandwidth_cost_per_mbps: 10.0,
            },
            constraints: RangeConstraints {
                maximum_range_m: 35_000.0,
                maximum_bandwidth_mbps: 200.0,
                required_power_w: 40.0,
                valid_technologies: vec!["3G".into(), "4G".into(), "5G".into()],
            },
            electricity_config: ElectricityCostConf::defaults(),
            n_candidate_towers: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SatelliteConstraints {
    pub maximum_bandwidth_mbps: f64,
    pub required_power_w: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SatelliteTechnologyCostConf {
    pub capex: FixedCapexConf,
    pub opex: FixedOpexConf,
    pub constraints: SatelliteConstraints,
    pub electricity_config: ElectricityCostConf,
}

impl SatelliteTechnologyCostConf {
    pub fn defaults() -> Self {
        Self {
            capex: FixedCapexConf { fixed_costs: 500.0 },
            opex: FixedOpexConf {
                fixed_costs: 0.0,
                annual_bandwidth_cost_per_mbps: 15.0,
            },
            constraints: SatelliteConstraints {
                maximum_bandwidth_mbps: 150.0,
                required_power_w: 200.0,
            },
            electricity_config: ElectricityCostConf::defaults(),
        }
    }
}

/// Configuration of one technology, tagged by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "technology")]
pub enum TechnologyConfig {
    Fiber(FiberTechnologyCostConf),
    Cellular(CellularTechnologyCostConf),
    P2P(P2PTechnologyCostConf),
    Satellite(SatelliteTechnologyCostConf),
}

impl TechnologyConfig {
    pub fn technology(&self) -> Technology {
        match self {
            TechnologyConfig::Fiber(_) => Technology::Fiber,
            TechnologyConfig::Cellular(_) => Technology::Cellular,
            TechnologyConfig::P2P(_) => Technology::P2P,
            TechnologyConfig::Satellite(_) => Technology::Satellite,
        }
    }

    pub fn electricity_config(&self) -> &ElectricityCostConf {
        match self {
            TechnologyConfig::Fiber(c) => &c.electricity_config,
            TechnologyConfig::Cellular(c) => &c.electricity_config,
            TechnologyConfig::P2P(c) => &c.electricity_config,
            TechnologyConfig::Satellite(c) => &c.electricity_config,
        }
    }

    fn validate(&self) -> GcmResult<()> {
        let name = self.technology();
        let electricity = self.electricity_config();
        let mut values: Vec<(&str, f64)> = vec![
            ("solar_cost_per_watt", electricity.solar_cost_per_watt),
            ("cost_per_kwh", electricity.cost_per_kwh),
        ];
        match self {
            TechnologyConfig::Fiber(c) => {
                values.extend([
                    ("capex.cost_per_km", c.capex.cost_per_km),
                    ("capex.fixed_costs", c.capex.fixed_costs),
                    ("opex.cost_per_km", c.opex.cost_per_km),
                    ("opex.annual_bandwidth_cost_per_mbps", c.opex.annual_bandwidth_cost_per_mbps),
                    ("maximum_connection_length_m", c.constraints.maximum_connection_length_m),
                    ("maximum_bandwidth_mbps", c.constraints.maximum_bandwidth_mbps),
                    ("required_power_w", c.constraints.required_power_w),
                    ("sat_solver.budget", c.sat_solver.budget),
                ]);
                if c.sat_solver.time_limit <= 0.0 || !c.sat_solver.time_limit.is_finite() {
                    return Err(GcmError::Config(format!(
                        "{name}: sat_solver.time_limit must be a positive number of seconds"
                    )));
                }
                if c.sat_solver.max_neighbors == 0 {
                    return Err(GcmError::Config(format!(
                        "{name}: sat_solver.max_neighbors must be at least 1"
                    )));
                }
            }
            TechnologyConfig::Cellular(c) => {
                values.extend([
                    ("capex.fixed_costs", c.capex.fixed_costs),
                    ("opex.fixed_costs", c.opex.fixed_costs),
                    ("opex.annual_bandwidth_cost_per_mbps", c.opex.annual_bandwidth_cost_per_mbps),
                    ("maximum_range_m", c.constraints.maximum_range_m),
                    ("maximum_bandwidth_mbps", c.constraints.maximum_bandwidth_mbps),
                    ("required_power_w", c.constraints.required_power_w),
                ]);
            }
            TechnologyConfig::P2P(c) => {
                values.extend([
                    ("capex.fixed_costs", c.capex.fixed_costs),
                    ("capex.tower_fixed_costs", c.capex.tower_fixed_costs),
                    ("opex.fixed_costs", c.opex.fixed_costs),
                    ("opex.annual_bandwidth_cost_per_mbps", c.opex.annual_bandwidth_cost_per_mbps),
                    ("maximum_range_m", c.constraints.maximum_range_m),
                    ("maximum_bandwidth_mbps", c.constraints.maximum_bandwidth_mbps),
                    ("required_power_w", c.constraints.required_power_w),
                ]);
                if c.n_candidate_towers == 0 {
                    return Err(GcmError::Config(format!(
                        "{name}: n_candidate_towers must be at least 1"
                    )));
                }
            }
            TechnologyConfig::Satellite(c) => {
                values.extend([
                    ("capex.fixed_costs", c.capex.fixed_costs),
                    ("opex.fixed_costs", c.opex.fixed_costs),
                    ("opex.annual_bandwidth_cost_per_mbps", c.opex.annual_bandwidth_cost_per_mbps),
                    ("maximum_bandwidth_mbps", c.constraints.maximum_bandwidth_mbps),
                    ("required_power_w", c.constraints.required_power_w),
                ]);
            }
        }
        for (field, value) in values {
            if !value.is_finite() || value < 0.0 {
                return Err(GcmError::Config(format!(
                    "{name}: {field} must be a non-negative number, got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// Policy used to pick one technology per school.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MinimizerKind {
    /// Lowest project-lifetime cost, with fiber clustering when enabled
    #[default]
    CostOptimal,
    /// First feasible technology in fixed preference order
    Priority,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostMinimizerConfig {
    /// Years of operating cost counted in a project lifetime
    pub years_opex: u32,
    /// Total USD budget; `None` leaves spending unconstrained
    pub budget_constraint: Option<f64>,
    /// Let fiber-connected schools extend the network to their neighbors
    pub economies_of_scale: bool,
    pub opex_responsible: OpexResponsibility,
    pub minimizer: MinimizerKind,
}

impl CostMinimizerConfig {
    pub fn defaults() -> Self {
        Self {
            years_opex: 5,
            budget_constraint: None,
            economies_of_scale: true,
            opex_responsible: OpexResponsibility::Consumer,
            minimizer: MinimizerKind::CostOptimal,
        }
    }
}

/// Everything a minimum-cost scenario needs besides the data tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioConfig {
    pub cost_minimizer: CostMinimizerConfig,
    pub distance_cache: NearestNeighborConf,
    pub technologies: Vec<TechnologyConfig>,
}

impl ScenarioConfig {
    /// All four technologies with their documented defaults.
    pub fn defaults() -> Self {
        Self {
            cost_minimizer: CostMinimizerConfig::defaults(),
            distance_cache: NearestNeighborConf::defaults(),
            technologies: vec![
                TechnologyConfig::Fiber(FiberTechnologyCostConf::defaults()),
                TechnologyConfig::Cellular(CellularTechnologyCostConf::defaults()),
                TechnologyConfig::P2P(P2PTechnologyCostConf::defaults()),
                TechnologyConfig::Satellite(SatelliteTechnologyCostConf::defaults()),
            ],
        }
    }

    pub fn with_technologies(mut self, technologies: Vec<TechnologyConfig>) -> Self {
        self.technologies = technologies;
        self
    }

    pub fn technology(&self, technology: Technology) -> Option<&TechnologyConfig> {
        self.technologies.iter().find(|c| c.technology() == technology)
    }

    pub fn fiber(&self) -> Option<&FiberTechnologyCostConf> {
        self.technologies.iter().find_map(|c| match c {
            TechnologyConfig::Fiber(f) => Some(f),
            _ => None,
        })
    }

    pub fn validate(&self) -> GcmResult<()> {
        if self.technologies.is_empty() {
            return Err(GcmError::Config("no technologies configured".into()));
        }
        let mut seen = HashSet::new();
        for tech in &self.technologies {
            if !seen.insert(tech.technology()) {
                return Err(GcmError::Config(format!(
                    "technology {} configured more than once",
                    tech.technology()
                )));
            }
            tech.validate()?;
        }

        let minimizer = &self.cost_minimizer;
        if minimizer.years_opex == 0 {
            return Err(GcmError::Config("years_opex must be at least 1".into()));
        }
        if let Some(budget) = minimizer.budget_constraint {
            if !budget.is_finite() || budget < 0.0 {
                return Err(GcmError::Config(format!(
                    "budget_constraint must be a non-negative number, got {budget}"
                )));
            }
        }
        if self.distance_cache.n_nearest_neighbors == 0 {
            return Err(GcmError::Config("n_nearest_neighbors must be at least 1".into()));
        }
        if self.distance_cache.n_chunks == 0 {
            return Err(GcmError::Config("n_chunks must be at least 1".into()));
        }
        Ok(())
    }
}
