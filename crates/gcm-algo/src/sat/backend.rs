//! `good_lp` backend for [`ConstraintModel`].
//!
//! The pure-Rust `microlp` MILP solver is the default. Both backends receive
//! `time_limit` as their native limit and stop on their own, so a solve never
//! outlives the call. A limit hit before any incumbent is
//! [`SolveStatus::Unknown`]; an incumbent that is not proven optimal is
//! [`SolveStatus::Feasible`].

use super::model::{
    Assignment, ConstraintModel, ConstraintSolver, LinearExpr, Relation, Sense, SolveParams,
    SolveResult, SolveStatus, VarKind,
};
use gcm_core::{GcmError, GcmResult};
use good_lp::{
    constraint, variable, variables, Expression, ResolutionError, Solution, SolutionStatus, SolverModel,
    Variable, WithTimeLimit,
};
use std::time::Instant;

/// Tolerance for checking incumbents that were not proven optimal.
const INCUMBENT_TOLERANCE: f64 = 1e-6;

/// MILP engine behind [`GoodLpSolver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SolverBackend {
    #[default]
    Microlp,
    Highs,
}

impl SolverBackend {
    pub fn name(&self) -> &'static str {
        match self {
            SolverBackend::Microlp => "microlp",
            SolverBackend::Highs => "highs",
        }
    }

    pub fn is_available(&self) -> bool {
        match self {
            SolverBackend::Microlp => cfg!(feature = "solver-microlp"),
            SolverBackend::Highs => cfg!(feature = "solver-highs"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct GoodLpSolver {
    backend: SolverBackend,
}

impl GoodLpSolver {
    pub fn new(backend: SolverBackend) -> Self {
        Self { backend }
    }
}

impl ConstraintSolver for GoodLpSolver {
    fn name(&self) -> &str {
        self.backend.name()
    }

    fn solve(&self, model: &ConstraintModel, params: &SolveParams) -> GcmResult<SolveResult> {
        if !self.backend.is_available() {
            return Err(GcmError::Solver(format!(
                "{} backend not compiled in (enable the solver-{} feature)",
                self.backend.name(),
                self.backend.name()
            )));
        }

        let result = solve_blocking(self.backend, model, params);
        tracing::debug!(
            backend = self.backend.name(),
            status = ?result.status,
            objective = ?result.objective,
            elapsed_ms = result.solve_time.as_millis() as u64,
            "MILP solve finished"
        );
        if result.status == SolveStatus::Unknown && result.solve_time >= params.time_limit {
            tracing::warn!(
                backend = self.backend.name(),
                time_limit_s = params.time_limit.as_secs_f64(),
                "MILP solve hit the time limit"
            );
        }
        Ok(result)
    }
}

fn to_expression(expr: &LinearExpr, handles: &[Variable]) -> Expression {
    let mut out = Expression::from(expr.constant);
    for &(var, coef) in &expr.terms {
        out += coef * handles[var.index()];
    }
    out
}

fn solve_blocking(backend: SolverBackend, model: &ConstraintModel, params: &SolveParams) -> SolveResult {
    let start = Instant::now();
    if model.num_variables() == 0 {
        let objective = model.objective().constant;
        return SolveResult {
            status: SolveStatus::Optimal,
            assignment: Some(Assignment::new(Vec::new())),
            objective: Some(objective),
            solve_time: start.elapsed(),
        };
    }

    let mut vars = variables!();
    let handles: Vec<Variable> = model
        .variables()
        .iter()
        .map(|def| {
            vars.add(match def.kind {
                VarKind::Binary => variable().binary(),
                VarKind::Integer { min, max } => variable().integer().min(min).max(max),
                VarKind::Continuous { min, max } => variable().min(min).max(max),
            })
        })
        .collect();

    let objective = to_expression(model.objective(), &handles);
    let unsolved = match model.sense() {
        Sense::Minimize => vars.minimise(objective),
        Sense::Maximize => vars.maximise(objective),
    };

    let time_limit_s = params.time_limit.as_secs_f64();
    match backend {
        #[cfg(feature = "solver-microlp")]
        SolverBackend::Microlp => {
            let problem = unsolved
                .using(good_lp::solvers::microlp::microlp)
                .with_time_limit(time_limit_s);
            run_model(problem, model, &handles, start)
        }
        #[cfg(feature = "solver-highs")]
        SolverBackend::Highs => {
            let problem = unsolved
                .using(good_lp::solvers::highs::highs)
                .with_time_limit(time_limit_s)
                .set_threads(params.parallelism.max(1) as u32);
            run_model(problem, model, &handles, start)
        }
        #[allow(unreachable_patterns)]
        _ => {
            let _ = (unsolved, time_limit_s);
            SolveResult::without_solution(SolveStatus::Unknown, start.elapsed())
        }
    }
}

/// Status of an assignment returned by the backend.
///
/// Only a proven optimum is trusted as is. Time or gap limited incumbents are
/// checked against the model and dropped when they violate it.
fn incumbent_status(status: SolutionStatus, model: &ConstraintModel, values: &[f64]) -> SolveStatus {
    match status {
        SolutionStatus::Optimal => SolveStatus::Optimal,
        SolutionStatus::TimeLimit | SolutionStatus::GapLimit => {
            if model.is_feasible(values, INCUMBENT_TOLERANCE) {
                SolveStatus::Feasible
            } else {
                tracing::warn!(?status, "discarding incumbent that violates the model");
                SolveStatus::Unknown
            }
        }
    }
}

fn run_model<M>(mut problem: M, model: &ConstraintModel, handles: &[Variable], start: Instant) -> SolveResult
where
    M: SolverModel<Error = ResolutionError>,
{
    for c in model.constraints() {
        let lhs = to_expression(&c.expr, handles);
        let rhs = c.rhs;
        problem = match c.relation {
            Relation::Le => problem.with(constraint!(lhs <= rhs)),
            Relation::Ge => problem.with(constraint!(lhs >= rhs)),
            Relation::Eq => problem.with(constraint!(lhs == rhs)),
        };
    }

    match problem.solve() {
        Ok(solution) => {
            let values: Vec<f64> = handles.iter().map(|v| solution.value(*v)).collect();
            let status = incumbent_status(solution.status(), model, &values);
            if !status.has_solution() {
                return SolveResult::without_solution(status, start.elapsed());
            }
            let objective = model.objective().evaluate(&values);
            SolveResult {
                status,
                assignment: Some(Assignment::new(values)),
                objective: Some(objective),
                solve_time: start.elapsed(),
            }
        }
        Err(ResolutionError::Infeasible) => {
            SolveResult::without_solution(SolveStatus::Infeasible, start.elapsed())
        }
        Err(err) => {
            tracing::warn!(error = %err, "MILP backend returned no solution");
            SolveResult::without_solution(SolveStatus::Unknown, start.elapsed())
        }
    }
}

#[cfg(all(test, feature = "solver-microlp"))]
mod tests {
    use super::*;
    use std::time::Duration;

    fn params() -> SolveParams {
        SolveParams::new(Duration::from_secs(30), 1)
    }

    #[test]
    fn test_small_knapsack() {
        // values 6, 5, 4 with weights 3, 2, 2 and capacity 4
        let mut model = ConstraintModel::new();
        let items: Vec<_> = (0..3).map(|i| model.new_bool(format!("x{i}"))).collect();
        let weight = LinearExpr::new()
            .term(items[0], 3.0)
            .term(items[1], 2.0)
            .term(items[2], 2.0);
        model.add_le(weight, 4.0);
        model.maximize(
            LinearExpr::new()
                .term(items[0], 6.0)
                .term(items[1], 5.0)
                .term(items[2], 4.0),
        );

        let result = GoodLpSolver::default().solve(&model, &params()).unwrap();
        assert_eq!(result.status, SolveStatus::Optimal);
        let assignment = result.assignment.unwrap();
        assert!(!assignment.is_true(items[0]));
        assert!(assignment.is_true(items[1]));
        assert!(assignment.is_true(items[2]));
        assert!((result.objective.unwrap() - 9.0).abs() < 1e-6);
        assert!(model.is_feasible(assignment.values(), 1e-6));
    }

    #[test]
    fn test_infeasible_model() {
        let mut model = ConstraintModel::new();
        let x = model.new_bool("x");
        model.add_ge(LinearExpr::from(x), 2.0);
        model.minimize(LinearExpr::from(x));
        let result = GoodLpSolver::default().solve(&model, &params()).unwrap();
        assert!(!result.status.has_solution());
        assert!(result.assignment.is_none());
    }

    /// `n` items with awkward weights, so the relaxation is never integral.
    fn knapsack(n: usize) -> ConstraintModel {
        let mut model = ConstraintModel::new();
        let items: Vec<_> = (0..n).map(|i| model.new_bool(format!("x{i}"))).collect();
        let mut weight = LinearExpr::new();
        let mut value = LinearExpr::new();
        for (i, &item) in items.iter().enumerate() {
            weight = weight.term(item, 3.0 + (i * 7 % 11) as f64 + 0.13 * i as f64);
            value = value.term(item, 5.0 + (i * 5 % 13) as f64 + 0.07 * i as f64);
        }
        model.add_le(weight, 61.5);
        model.maximize(value);
        model
    }

    #[test]
    fn test_time_limit_before_any_incumbent_is_unknown() {
        let model = knapsack(30);
        let started = Instant::now();
        let result = GoodLpSolver::default()
            .solve(&model, &SolveParams::new(Duration::ZERO, 1))
            .unwrap();
        assert_eq!(result.status, SolveStatus::Unknown);
        assert!(result.assignment.is_none());
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_limited_incumbents_are_feasible_not_optimal() {
        let mut model = ConstraintModel::new();
        let x = model.new_bool("x");
        let y = model.new_bool("y");
        model.add_le(LinearExpr::new().term(x, 1.0).term(y, 1.0), 1.0);
        model.maximize(LinearExpr::new().term(x, 2.0).term(y, 1.0));

        assert_eq!(
            incumbent_status(SolutionStatus::TimeLimit, &model, &[0.0, 1.0]),
            SolveStatus::Feasible
        );
        assert_eq!(
            incumbent_status(SolutionStatus::GapLimit, &model, &[1.0, 0.0]),
            SolveStatus::Feasible
        );
        assert_eq!(
            incumbent_status(SolutionStatus::TimeLimit, &model, &[1.0, 1.0]),
            SolveStatus::Unknown
        );
        assert_eq!(
            incumbent_status(SolutionStatus::Optimal, &model, &[1.0, 0.0]),
            SolveStatus::Optimal
        );
    }

    #[test]
    fn test_empty_model_is_trivially_optimal() {
        let mut model = ConstraintModel::new();
        model.minimize(LinearExpr::constant(4.0));
        let result = GoodLpSolver::default().solve(&model, &params()).unwrap();
        assert_eq!(result.status, SolveStatus::Optimal);
        assert_eq!(result.objective, Some(4.0));
    }
}
