//! Backend-independent constraint model.
//!
//! The network design formula is written once against [`ConstraintModel`];
//! any [`ConstraintSolver`] (MILP, CP, custom search) can then solve it.

use gcm_core::GcmResult;
use std::time::Duration;

/// Handle to a model variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(usize);

impl VarId {
    pub fn index(&self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VarKind {
    Binary,
    Integer { min: f64, max: f64 },
    Continuous { min: f64, max: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariableDef {
    pub name: String,
    pub kind: VarKind,
}

/// `Σ coef·var + constant`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LinearExpr {
    pub terms: Vec<(VarId, f64)>,
    pub constant: f64,
}

impl LinearExpr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn constant(value: f64) -> Self {
        Self {
            terms: Vec::new(),
            constant: value,
        }
    }

    pub fn term(mut self, var: VarId, coef: f64) -> Self {
        self.add_term(var, coef);
        self
    }

    pub fn add_term(&mut self, var: VarId, coef: f64) {
        if coef != 0.0 {
            self.terms.push((var, coef));
        }
    }

    pub fn add_constant(&mut self, value: f64) {
        self.constant += value;
    }

    /// Append every term of `other` scaled by `factor`.
    pub fn add_scaled(&mut self, other: &LinearExpr, factor: f64) {
        for &(var, coef) in &other.terms {
            self.add_term(var, coef * factor);
        }
        self.constant += other.constant * factor;
    }

    /// Sum of the given variables with unit coefficients.
    pub fn sum(vars: impl IntoIterator<Item = VarId>) -> Self {
        let mut expr = Self::new();
        for var in vars {
            expr.add_term(var, 1.0);
        }
        expr
    }

    pub fn evaluate(&self, values: &[f64]) -> f64 {
        self.terms
            .iter()
            .map(|(var, coef)| coef * values.get(var.0).copied().unwrap_or(0.0))
            .sum::<f64>()
            + self.constant
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

impl From<VarId> for LinearExpr {
    fn from(var: VarId) -> Self {
        LinearExpr::new().term(var, 1.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Le,
    Ge,
    Eq,
}

/// `expr (<=|>=|==) rhs`
#[derive(Debug, Clone, PartialEq)]
pub struct LinearConstraint {
    pub expr: LinearExpr,
    pub relation: Relation,
    pub rhs: f64,
}

impl LinearConstraint {
    pub fn is_satisfied(&self, values: &[f64], tolerance: f64) -> bool {
        let lhs = self.expr.evaluate(values);
        match self.relation {
            Relation::Le => lhs <= self.rhs + tolerance,
            Relation::Ge => lhs >= self.rhs - tolerance,
            Relation::Eq => (lhs - self.rhs).abs() <= tolerance,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Sense {
    #[default]
    Minimize,
    Maximize,
}

#[derive(Debug, Clone, Default)]
pub struct ConstraintModel {
    variables: Vec<VariableDef>,
    constraints: Vec<LinearConstraint>,
    objective: LinearExpr,
    sense: Sense,
}

impl ConstraintModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_bool(&mut self, name: impl Into<String>) -> VarId {
        self.push_var(name.into(), VarKind::Binary)
    }

    pub fn new_int(&mut self, name: impl Into<String>, min: f64, max: f64) -> VarId {
        self.push_var(name.into(), VarKind::Integer { min, max })
    }

    pub fn new_continuous(&mut self, name: impl Into<String>, min: f64, max: f64) -> VarId {
        self.push_var(name.into(), VarKind::Continuous { min, max })
    }

    fn push_var(&mut self, name: String, kind: VarKind) -> VarId {
        self.variables.push(VariableDef { name, kind });
        VarId(self.variables.len() - 1)
    }

    pub fn add_le(&mut self, expr: LinearExpr, rhs: f64) {
        self.add(expr, Relation::Le, rhs);
    }

    pub fn add_ge(&mut self, expr: LinearExpr, rhs: f64) {
        self.add(expr, Relation::Ge, rhs);
    }

    pub fn add_eq(&mut self, expr: LinearExpr, rhs: f64) {
        self.add(expr, Relation::Eq, rhs);
    }

    fn add(&mut self, mut expr: LinearExpr, relation: Relation, rhs: f64) {
        // constants live on the right-hand side
        let rhs = rhs - expr.constant;
        expr.constant = 0.0;
        self.constraints.push(LinearConstraint { expr, relation, rhs });
    }

    /// `a ⟹ b` for booleans: `a - b <= 0`.
    pub fn add_implication(&mut self, a: VarId, b: VarId) {
        self.add_le(LinearExpr::new().term(a, 1.0).term(b, -1.0), 0.0);
    }

    /// Pin a variable to a value.
    pub fn fix(&mut self, var: VarId, value: f64) {
        self.add_eq(LinearExpr::from(var), value);
    }

    pub fn minimize(&mut self, objective: LinearExpr) {
        self.objective = objective;
        self.sense = Sense::Minimize;
    }

    pub fn maximize(&mut self, objective: LinearExpr) {
        self.objective = objective;
        self.sense = Sense::Maximize;
    }

    pub fn variables(&self) -> &[VariableDef] {
        &self.variables
    }

    pub fn constraints(&self) -> &[LinearConstraint] {
        &self.constraints
    }

    pub fn objective(&self) -> &LinearExpr {
        &self.objective
    }

    pub fn sense(&self) -> Sense {
        self.sense
    }

    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    /// Check an assignment against every constraint and variable domain.
    pub fn is_feasible(&self, values: &[f64], tolerance: f64) -> bool {
        if values.len() != self.variables.len() {
            return false;
        }
        let domains_ok = self.variables.iter().zip(values).all(|(def, &v)| match def.kind {
            VarKind::Binary => v.abs() <= tolerance || (v - 1.0).abs() <= tolerance,
            VarKind::Integer { min, max } => {
                (v - v.round()).abs() <= tolerance && v >= min - tolerance && v <= max + tolerance
            }
            VarKind::Continuous { min, max } => v >= min - tolerance && v <= max + tolerance,
        });
        domains_ok && self.constraints.iter().all(|c| c.is_satisfied(values, tolerance))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveStatus {
    Optimal,
    Feasible,
    Infeasible,
    Unknown,
}

impl SolveStatus {
    pub fn has_solution(&self) -> bool {
        matches!(self, SolveStatus::Optimal | SolveStatus::Feasible)
    }
}

/// Values of every model variable, indexed by [`VarId`].
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    values: Vec<f64>,
}

impl Assignment {
    pub fn new(values: Vec<f64>) -> Self {
        Self { values }
    }

    pub fn value(&self, var: VarId) -> f64 {
        self.values.get(var.0).copied().unwrap_or(0.0)
    }

    pub fn is_true(&self, var: VarId) -> bool {
        self.value(var) > 0.5
    }

    pub fn evaluate(&self, expr: &LinearExpr) -> f64 {
        expr.evaluate(&self.values)
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SolveResult {
    pub status: SolveStatus,
    /// Present only for optimal or feasible results
    pub assignment: Option<Assignment>,
    pub objective: Option<f64>,
    pub solve_time: Duration,
}

impl SolveResult {
    pub fn without_solution(status: SolveStatus, solve_time: Duration) -> Self {
        Self {
            status,
            assignment: None,
            objective: None,
            solve_time,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SolveParams {
    /// Wall-clock bound on a single solve
    pub time_limit: Duration,
    /// Worker threads for backends that support them
    pub parallelism: usize,
}

impl SolveParams {
    pub fn new(time_limit: Duration, parallelism: usize) -> Self {
        Self {
            time_limit,
            parallelism,
        }
    }
}

/// A solver able to optimize a [`ConstraintModel`].
pub trait ConstraintSolver {
    fn name(&self) -> &str;

    /// Any status other than optimal/feasible carries no assignment.
    fn solve(&self, model: &ConstraintModel, params: &SolveParams) -> GcmResult<SolveResult>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_moves_to_rhs() {
        let mut model = ConstraintModel::new();
        let x = model.new_bool("x");
        let mut expr = LinearExpr::from(x);
        expr.add_constant(3.0);
        model.add_le(expr, 4.0);
        assert_eq!(model.constraints()[0].rhs, 1.0);
        assert_eq!(model.constraints()[0].expr.constant, 0.0);
    }

    #[test]
    fn test_feasibility_check() {
        let mut model = ConstraintModel::new();
        let a = model.new_bool("a");
        let b = model.new_bool("b");
        model.add_implication(a, b);
        assert!(model.is_feasible(&[1.0, 1.0], 1e-6));
        assert!(model.is_feasible(&[0.0, 1.0], 1e-6));
        assert!(!model.is_feasible(&[1.0, 0.0], 1e-6));
        assert!(!model.is_feasible(&[0.5, 1.0], 1e-6));
    }

    #[test]
    fn test_zero_coefficients_are_dropped() {
        let expr = LinearExpr::new().term(VarId(0), 0.0).term(VarId(1), 2.0);
        assert_eq!(expr.terms.len(), 1);
        assert_eq!(expr.evaluate(&[5.0, 3.0]), 6.0);
    }
}
