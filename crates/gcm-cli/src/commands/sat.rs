use super::util::{load_fiber_nodes, load_schools, write_json};
use anyhow::{Context, Result};
use gcm_algo::{GoodLpSolver, SatCostGraphBuilder, SatOptimizer, SatOutcomeKind, SatSolution};
use gcm_core::{FiberTechnologyCostConf, SatSolverConfig};
use serde::Serialize;
use std::path::Path;

pub struct SolveArgs<'a> {
    pub schools: &'a Path,
    pub fiber: &'a Path,
    pub out: &'a Path,
    pub budget: Option<f64>,
    pub time_limit: f64,
    pub workers: usize,
    pub max_length_m: f64,
    pub cost_per_km: f64,
}

#[derive(Debug, Serialize)]
struct SatReport {
    status: SatOutcomeKind,
    solution: Option<SatSolution>,
}

pub fn handle_solve(args: SolveArgs<'_>) -> Result<()> {
    if let Some(budget) = args.budget {
        anyhow::ensure!(budget.is_finite() && budget > 0.0, "--budget must be a positive number");
    }
    let schools = load_schools(args.schools)?;
    schools.validate()?;
    let fiber_nodes = load_fiber_nodes(args.fiber)?;
    fiber_nodes.validate()?;

    let fixed_costs = FiberTechnologyCostConf::defaults().capex.fixed_costs;
    let mut builder = SatCostGraphBuilder::new(args.cost_per_km);
    for node in &fiber_nodes.coordinates {
        builder = builder.fiber_node(node.clone());
    }
    for school in &schools.schools {
        builder = if school.has_fiber {
            builder.connected_school(school.to_coordinate())
        } else {
            builder.unconnected_school(school.to_coordinate(), fixed_costs, 0.0)
        };
    }
    let graph = builder.build(args.max_length_m);

    let config = SatSolverConfig {
        budget: args.budget.unwrap_or(0.0),
        time_limit: args.time_limit,
        parallelism: args.workers,
        ..SatSolverConfig::defaults()
    };
    let solver = GoodLpSolver::default();
    let outcome = SatOptimizer::new(&solver, config)
        .solve(&graph)
        .context("solving fiber network")?;

    let report = SatReport {
        status: outcome.kind(),
        solution: outcome.solution().cloned(),
    };
    write_json(args.out, &report)?;

    match &report.solution {
        Some(solution) => println!(
            "{:?}: {} schools connected, {} m of cable, cost {:.2}",
            report.status,
            solution.connected_schools.len(),
            solution.cable_length_m,
            solution.network_cost
        ),
        None => println!("{:?}: no network found", report.status),
    }
    Ok(())
}
