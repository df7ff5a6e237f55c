//! Exact fiber network design on a generic constraint model.

pub mod backend;
pub mod formula;
pub mod model;
pub mod optimizer;

pub use backend::{GoodLpSolver, SolverBackend};
pub use formula::NetworkFormula;
pub use model::{
    Assignment, ConstraintModel, ConstraintSolver, LinearConstraint, LinearExpr, Relation, Sense, SolveParams,
    SolveResult, SolveStatus, VarId, VarKind,
};
pub use optimizer::{SatError, SatOptimizer, SatOutcome, SatOutcomeKind, SatSolution};
