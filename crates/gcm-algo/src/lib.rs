//! # gcm-algo: Connectivity Cost Modelling Algorithms
//!
//! This crate prices connecting schools to the internet with several
//! technologies and selects one technology per school.
//!
//! ## Cost Models
//!
//! Every model implements [`CostModel`] and yields one
//! [`gcm_core::SchoolConnectionCosts`] per school:
//!
//! | Model | Reach check | Network |
//! |-------|-------------|---------|
//! | [`FiberCostModel`] | cable length to a fiber node or connected school | greedy or SAT |
//! | [`CellularCostModel`] | range to the nearest valid tower | none |
//! | [`P2PCostModel`] | range and line of sight to a tower | none |
//! | [`SatelliteCostModel`] | none | none |
//!
//! ### Fiber Networks
//!
//! - **[`GreedyDistanceConnector`]**: repeatedly attaches the closest
//!   unconnected school, optionally letting connected schools relay
//! - **[`SatOptimizer`]**: exact network design on a [`SatCostGraph`],
//!   either connecting every reachable school at minimum cable length or
//!   as many schools as a budget allows
//!
//! The exact solver runs through the [`ConstraintSolver`] trait;
//! [`GoodLpSolver`] is the default backend.
//!
//! ## Minimizers
//!
//! | Minimizer | Selection |
//! |-----------|-----------|
//! | [`BaselineMinimizer`] | cheapest feasible technology, optionally under a budget |
//! | [`EconomiesOfScaleMinimizer`] | fiber clusters pruned where alternatives are cheaper |
//! | [`ConstrainedEconomiesOfScaleMinimizer`] | fiber clusters bought under a budget |
//! | [`PriorityMinimizer`] | first feasible technology in preference order |
//!
//! Cluster pruning walks a [`ConnectedCostGraph`] with the
//! [`CostTreePruner`].
//!
//! ## Example
//!
//! ```ignore
//! use gcm_algo::{MinimumCostScenario, ScenarioData, ScenarioSummary};
//! use gcm_core::ScenarioConfig;
//!
//! let data = ScenarioData::new(schools, fiber_nodes, cell_towers);
//! let output = MinimumCostScenario::new(ScenarioConfig::defaults(), data)?.run()?;
//!
//! let summary = ScenarioSummary::from_output(&output);
//! println!("connected {} of {} schools", summary.connected, summary.schools);
//! ```

pub mod connect;
pub mod cost;
pub mod graph;
pub mod minimize;
pub mod output;
pub mod sat;
pub mod scenario;

pub use connect::{group_by_source, GreedyConnectorConf, GreedyDistanceConnector};
pub use cost::{
    electricity_costs, fiber_network_inputs, model_for, AlwaysVisible, CellularCostModel, CostModel,
    CostModelContext, FiberCostModel, LineOfSightOracle, P2PCacheBuilder, P2PCostModel, SatelliteCostModel,
    ScenarioData,
};
pub use graph::{ConnectedCostGraph, CostTreePruner, PruneReport, SatCostGraph, SatCostGraphBuilder};
pub use minimize::{
    select_minimizer, BaselineMinimizer, ConstrainedEconomiesOfScaleMinimizer, CostMinimizer,
    EconomiesOfScaleMinimizer, LifetimeCost, MinimizerResult, PriorityMinimizer,
};
pub use output::{AggregatedCosts, CostResultSpace, OutputSpace};
pub use sat::{ConstraintSolver, GoodLpSolver, SatError, SatOptimizer, SatOutcome, SatOutcomeKind, SatSolution};
pub use scenario::{MinimumCostScenario, ScenarioSummary};
