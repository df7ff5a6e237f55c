//! Exact fiber network design.
//!
//! Two modes, chosen by `SatSolverConfig::budget`:
//!
//! - **Unconstrained** (`budget == 0`): minimize cable and node cost. Every
//!   school reachable from the backbone is connected unless
//!   `use_alternative_costs` is set, in which case a school may be left out
//!   at its alternative-technology cost.
//! - **Budget-constrained**: phase 1 maximizes the number of connected
//!   schools with the cost under the budget; phase 2 minimizes cost at that
//!   school count without exceeding the phase 1 cost. If phase 2 does not
//!   prove optimality the phase 1 plan is returned as [`SatOutcome::Feasible`].
//!
//! A solver that reports neither optimal nor feasible yields
//! [`SatOutcome::NoSolution`], which is distinct from an empty optimal plan.

use super::formula::NetworkFormula;
use super::model::{Assignment, ConstraintSolver, SolveParams, SolveStatus};
use crate::graph::sat_graph::{NodeLabel, SatCostGraph};
use gcm_core::{DistanceType, GcmError, PairwiseDistance, SatSolverConfig, SOURCE_PROPERTY};
use petgraph::graph::NodeIndex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SatError {
    #[error("network design graph has no metanode")]
    MissingMetanode,

    #[error("invalid solver configuration: {0}")]
    Config(String),

    #[error("constraint solver failed: {0}")]
    Backend(#[from] GcmError),
}

impl From<SatError> for GcmError {
    fn from(err: SatError) -> Self {
        match err {
            SatError::Backend(inner) => inner,
            other => GcmError::Solver(other.to_string()),
        }
    }
}

/// Network chosen by the solver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SatSolution {
    /// Connected school ids, in graph order
    pub connected_schools: Vec<String>,
    /// Cables as `(parent, child)` distances; both ends carry the root source
    pub edges: Vec<PairwiseDistance>,
    /// Cable plus node cost of the selected network
    pub network_cost: f64,
    /// Total cable length in meters
    pub cable_length_m: u64,
    /// Σ shortest backbone distance over connected schools, an upper bound
    /// on the cable a shortest-path tree would need
    pub path_length_upper_bound_m: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SatOutcome {
    Optimal(SatSolution),
    /// Valid plan without an optimality proof
    Feasible(SatSolution),
    /// The solver gave up or proved infeasibility
    NoSolution,
}

impl SatOutcome {
    pub fn solution(&self) -> Option<&SatSolution> {
        match self {
            SatOutcome::Optimal(s) | SatOutcome::Feasible(s) => Some(s),
            SatOutcome::NoSolution => None,
        }
    }

    pub fn kind(&self) -> SatOutcomeKind {
        match self {
            SatOutcome::Optimal(_) => SatOutcomeKind::Optimal,
            SatOutcome::Feasible(_) => SatOutcomeKind::Feasible,
            SatOutcome::NoSolution => SatOutcomeKind::NoSolution,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SatOutcomeKind {
    Optimal,
    Feasible,
    NoSolution,
}

pub struct SatOptimizer<'a> {
    solver: &'a dyn ConstraintSolver,
    config: SatSolverConfig,
}

impl<'a> SatOptimizer<'a> {
    pub fn new(solver: &'a dyn ConstraintSolver, config: SatSolverConfig) -> Self {
        Self { solver, config }
    }

    fn params(&self) -> Result<SolveParams, SatError> {
        if !self.config.time_limit.is_finite() || self.config.time_limit <= 0.0 {
            return Err(SatError::Config(format!(
                "time_limit must be positive, got {}",
                self.config.time_limit
            )));
        }
        Ok(SolveParams::new(
            Duration::from_secs_f64(self.config.time_limit),
            self.config.parallelism.max(1),
        ))
    }

    /// Prepare the graph: drop what the backbone cannot reach and thin out edges.
    pub fn preprocess(&self, graph: &SatCostGraph) -> SatCostGraph {
        let reachable = graph.prune_unreachable();
        if self.config.max_neighbors == 0 {
            reachable
        } else {
            reachable.reduce_edges(self.config.max_neighbors)
        }
    }

    pub fn solve(&self, graph: &SatCostGraph) -> Result<SatOutcome, SatError> {
        if graph.node(graph.metanode()).label != NodeLabel::Metanode {
            return Err(SatError::MissingMetanode);
        }
        let params = self.params()?;
        let graph = self.preprocess(graph);
        let uschools = graph.nodes_with_label(NodeLabel::USchool).len();
        tracing::info!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            schools = uschools,
            budget = self.config.budget,
            backend = self.solver.name(),
            "solving fiber network design"
        );

        let outcome = if self.config.budget > 0.0 {
            self.solve_constrained(&graph, &params)?
        } else {
            self.solve_unconstrained(&graph, &params)?
        };

        match &outcome {
            SatOutcome::NoSolution => tracing::warn!("network design found no solution"),
            other => {
                if let Some(s) = other.solution() {
                    tracing::info!(
                        status = ?other.kind(),
                        connected = s.connected_schools.len(),
                        cost = s.network_cost,
                        "network design solved"
                    );
                }
            }
        }
        Ok(outcome)
    }

    fn solve_unconstrained(&self, graph: &SatCostGraph, params: &SolveParams) -> Result<SatOutcome, SatError> {
        let mut formula = NetworkFormula::build(graph);
        // without alternative costs there is no price for leaving a school out
        if !self.config.use_alternative_costs {
            formula.require_all_schools(graph);
        }
        formula.minimize_cost();

        let result = self.solver.solve(&formula.model, params)?;
        Ok(match (result.status, result.assignment) {
            (SolveStatus::Optimal, Some(a)) => SatOutcome::Optimal(extract(graph, &formula, &a)),
            (SolveStatus::Feasible, Some(a)) => SatOutcome::Feasible(extract(graph, &formula, &a)),
            _ => SatOutcome::NoSolution,
        })
    }

    fn solve_constrained(&self, graph: &SatCostGraph, params: &SolveParams) -> Result<SatOutcome, SatError> {
        let budget = self.config.budget;

        let mut phase1 = NetworkFormula::build(graph);
        phase1.maximize_schools(budget);
        let first = self.solver.solve(&phase1.model, params)?;
        let (first_status, first_assignment) = match (first.status, first.assignment) {
            (status, Some(a)) if status.has_solution() => (status, a),
            _ => return Ok(SatOutcome::NoSolution),
        };
        let max_schools = first_assignment.evaluate(&phase1.schools).round();
        let first_cost = first_assignment.evaluate(&phase1.cost);
        let first_solution = extract(graph, &phase1, &first_assignment);
        tracing::debug!(max_schools, first_cost, "phase 1 finished");

        let mut phase2 = NetworkFormula::build(graph);
        // tolerance keeps the phase 1 plan itself feasible
        phase2.minimize_cost_at(max_schools, first_cost + 1e-6);
        let second = self.solver.solve(&phase2.model, params)?;
        Ok(match (second.status, second.assignment) {
            (SolveStatus::Optimal, Some(a)) if first_status == SolveStatus::Optimal => {
                SatOutcome::Optimal(extract(graph, &phase2, &a))
            }
            (status, Some(a)) if status.has_solution() => {
                SatOutcome::Feasible(extract(graph, &phase2, &a))
            }
            _ => {
                tracing::warn!("phase 2 found no solution, keeping phase 1 plan");
                SatOutcome::Feasible(first_solution)
            }
        })
    }
}

/// Read the selected tree out of an assignment.
fn extract(graph: &SatCostGraph, formula: &NetworkFormula, assignment: &Assignment) -> SatSolution {
    let meta = graph.metanode();
    let mut parent: HashMap<NodeIndex, NodeIndex> = HashMap::new();
    for (&(child, p), &var) in &formula.p {
        if assignment.is_true(var) {
            parent.insert(child, p);
        }
    }

    let root_of = |mut n: NodeIndex| -> NodeIndex {
        // bounded walk; a valid tree never revisits a node
        for _ in 0..graph.node_count() {
            match parent.get(&n) {
                Some(&p) if p != meta => n = p,
                _ => break,
            }
        }
        n
    };

    let lengths = graph.shortest_path_lengths();
    let mut connected_schools = Vec::new();
    let mut edges = Vec::new();
    let mut cable_length_m = 0;
    let mut path_length_upper_bound_m = 0;

    for (&n, &xv) in &formula.x {
        let node = graph.node(n);
        if !assignment.is_true(xv) {
            continue;
        }
        if node.label == NodeLabel::USchool {
            connected_schools.push(node.id.clone());
            path_length_upper_bound_m += lengths.get(&n).copied().unwrap_or(0);
        }
        let Some(&p) = parent.get(&n) else { continue };
        if p == meta {
            continue;
        }
        let weight = graph.edge_weight(n, p).unwrap_or(0);
        cable_length_m += weight;
        let source = graph.node(root_of(n)).id.clone();
        let (Some(from), Some(to)) = (graph.node(p).coordinate.clone(), node.coordinate.clone()) else {
            continue;
        };
        edges.push(PairwiseDistance::new(
            from.with_property(SOURCE_PROPERTY, source.clone()),
            to.with_property(SOURCE_PROPERTY, source),
            weight as f64,
            DistanceType::default(),
        ));
    }

    SatSolution {
        connected_schools,
        edges,
        network_cost: assignment.evaluate(&formula.cost),
        cable_length_m,
        path_length_upper_bound_m,
    }
}
