//! Tree-shaped fiber network design as a constraint model.
//!
//! Variables over a [`SatCostGraph`]:
//!
//! | Variable | Meaning |
//! |----------|---------|
//! | `X[v]`   | node `v` is part of the network |
//! | `P[i,j]` | `i` takes `j` as its parent (cable from `j` to `i`) |
//! | `A[i,j]` | `j` lies on the path from `i` to the metanode |
//!
//! Constraints:
//!
//! 1. `Σ_j P[i,j] == X[i]`: every selected node has exactly one parent.
//!    Backbone nodes take the metanode; schools and splitters take a neighbor.
//!    Fixed nodes have `X = 1`.
//! 2. `P[i,j] <= X[j]` and `P[i,j] ⟹ A[i,j]`.
//! 3. `A[i,j] + A[j,k] - 1 <= A[i,k]` (transitivity) and
//!    `A[i,j] + A[j,i] <= 1` (asymmetry). The triple loop is cubic in the
//!    node count and is the scalability limit of this formulation.
//! 4. `X[i] <= A[i,meta]` for every non-metanode.
//! 5. `Σ X == Σ P`: one edge per selected node, a spanning tree.
//!
//! Ancestry variables only exist between nodes of the same component, which
//! after [`SatCostGraph::prune_unreachable`] is the whole graph.

use super::model::{ConstraintModel, LinearExpr, VarId};
use crate::graph::sat_graph::{NodeLabel, SatCostGraph};
use petgraph::graph::NodeIndex;
use std::collections::BTreeMap;

/// Variables and cost expressions of a built formula.
#[derive(Debug, Clone)]
pub struct NetworkFormula {
    pub model: ConstraintModel,
    pub x: BTreeMap<NodeIndex, VarId>,
    /// `(child, parent)` → parenthood variable
    pub p: BTreeMap<(NodeIndex, NodeIndex), VarId>,
    /// `(descendant, ancestor)` → ancestry variable
    pub a: BTreeMap<(NodeIndex, NodeIndex), VarId>,
    /// Cable plus node costs of the selected network
    pub cost: LinearExpr,
    /// Alternative costs of schools left out
    pub unselected_cost: LinearExpr,
    /// Number of selected unconnected schools
    pub schools: LinearExpr,
}

impl NetworkFormula {
    /// Build all variables and structural constraints; no objective yet.
    pub fn build(graph: &SatCostGraph) -> Self {
        let mut model = ConstraintModel::new();
        let meta = graph.metanode();
        let nodes: Vec<NodeIndex> = graph.node_indices().filter(|&n| n != meta).collect();

        let mut x = BTreeMap::new();
        for &n in &nodes {
            let var = model.new_bool(format!("x[{}]", graph.node(n).id));
            if graph.node(n).label.is_fixed() {
                model.fix(var, 1.0);
            }
            x.insert(n, var);
        }

        let mut p = BTreeMap::new();
        for &n in &nodes {
            let label = graph.node(n).label;
            let parents: Vec<(NodeIndex, u64)> = if label.is_backbone() {
                vec![(meta, 0)]
            } else {
                graph
                    .neighbors(n)
                    .into_iter()
                    .filter(|&(m, _)| m != meta)
                    .collect()
            };
            for (parent, _) in parents {
                let var = model.new_bool(format!("p[{},{}]", graph.node(n).id, graph.node(parent).id));
                p.insert((n, parent), var);
            }
        }

        let mut a = BTreeMap::new();
        let all: Vec<NodeIndex> = graph.node_indices().collect();
        for &i in &nodes {
            for &j in &all {
                if i != j {
                    let var = model.new_bool(format!("a[{},{}]", graph.node(i).id, graph.node(j).id));
                    a.insert((i, j), var);
                }
            }
        }

        // 1: exactly one parent when selected
        for &n in &nodes {
            let mut expr = LinearExpr::sum(
                p.range((n, NodeIndex::new(0))..=(n, NodeIndex::end()))
                    .map(|(_, &v)| v),
            );
            expr.add_term(x[&n], -1.0);
            model.add_eq(expr, 0.0);
        }

        // 2: parents are selected, parenthood implies ancestry
        for (&(child, parent), &pv) in &p {
            if let Some(&xp) = x.get(&parent) {
                model.add_implication(pv, xp);
            }
            model.add_implication(pv, a[&(child, parent)]);
        }

        // 3: transitivity and asymmetry
        for &i in &nodes {
            for &j in &nodes {
                if i == j {
                    continue;
                }
                let aij = a[&(i, j)];
                if i < j {
                    model.add_le(LinearExpr::new().term(aij, 1.0).term(a[&(j, i)], 1.0), 1.0);
                }
                for &k in &all {
                    if k == i || k == j {
                        continue;
                    }
                    model.add_le(
                        LinearExpr::new()
                            .term(aij, 1.0)
                            .term(a[&(j, k)], 1.0)
                            .term(a[&(i, k)], -1.0),
                        1.0,
                    );
                }
            }
        }

        // 4: every selected node reaches the backbone
        for &n in &nodes {
            model.add_implication(x[&n], a[&(n, meta)]);
        }

        // 5: spanning tree edge count
        let mut tree = LinearExpr::sum(x.values().copied());
        for &v in p.values() {
            tree.add_term(v, -1.0);
        }
        model.add_eq(tree, 0.0);

        let mut cost = LinearExpr::new();
        let mut unselected_cost = LinearExpr::new();
        let mut schools = LinearExpr::new();
        for (&(child, parent), &pv) in &p {
            if parent == meta {
                continue;
            }
            let node = graph.node(child);
            let weight = graph.edge_weight(child, parent).unwrap_or(0);
            cost.add_term(pv, weight as f64 / 1000.0 * node.pkmcost);
        }
        for &n in &nodes {
            let node = graph.node(n);
            if !node.label.is_fixed() {
                cost.add_term(x[&n], node.cost);
            }
            if node.label == NodeLabel::USchool {
                schools.add_term(x[&n], 1.0);
                // ncost * (1 - X)
                unselected_cost.add_constant(node.ncost);
                unselected_cost.add_term(x[&n], -node.ncost);
            }
        }

        tracing::debug!(
            variables = model.num_variables(),
            constraints = model.num_constraints(),
            "built network design formula"
        );

        Self {
            model,
            x,
            p,
            a,
            cost,
            unselected_cost,
            schools,
        }
    }

    /// Force every unconnected school into the network.
    pub fn require_all_schools(&mut self, graph: &SatCostGraph) {
        for n in graph.nodes_with_label(NodeLabel::USchool) {
            if let Some(&var) = self.x.get(&n) {
                self.model.fix(var, 1.0);
            }
        }
    }

    /// Minimize network cost plus the alternative cost of left-out schools.
    pub fn minimize_cost(&mut self) {
        let mut objective = self.cost.clone();
        objective.add_scaled(&self.unselected_cost, 1.0);
        self.model.minimize(objective);
    }

    /// Maximize connected schools with the network cost under `budget`.
    pub fn maximize_schools(&mut self, budget: f64) {
        self.model.add_le(self.cost.clone(), budget);
        self.model.maximize(self.schools.clone());
    }

    /// Minimize cost while connecting at least `schools` schools for at most `budget`.
    pub fn minimize_cost_at(&mut self, schools: f64, budget: f64) {
        self.model.add_ge(self.schools.clone(), schools);
        self.model.add_le(self.cost.clone(), budget);
        self.model.minimize(self.cost.clone());
    }
}
