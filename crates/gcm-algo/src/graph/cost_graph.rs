//! Directed cost graph over connection edges.
//!
//! Each [`PairwiseDistance`] becomes an edge from the endpoint connected to
//! (`coordinate1`) to the coordinate it serves (`coordinate2`), weighted by
//! the distance rounded to the nearest meter. A leaf is therefore a member
//! that serves nobody: out-degree 0, in-degree 1. Roots (in-degree 0) are the
//! fixed infrastructure the network hangs from.

use gcm_core::PairwiseDistance;
use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::HashMap;

/// Integer edge weight for a distance in meters.
pub fn distance_weight(distance_m: f64) -> u64 {
    distance_m.max(0.0).round() as u64
}

#[derive(Debug, Clone)]
pub struct CostEdge {
    pub weight: u64,
    pub distance: PairwiseDistance,
}

#[derive(Debug, Clone, Default)]
pub struct ConnectedCostGraph {
    graph: StableDiGraph<String, CostEdge>,
    index: HashMap<String, NodeIndex>,
}

impl ConnectedCostGraph {
    pub fn from_pairwise_distances(distances: &[PairwiseDistance]) -> Self {
        let mut graph = Self::default();
        for d in distances {
            let from = graph.ensure_node(d.first_id());
            let to = graph.ensure_node(d.second_id());
            graph.graph.add_edge(
                from,
                to,
                CostEdge {
                    weight: distance_weight(d.distance),
                    distance: d.clone(),
                },
            );
        }
        graph
    }

    fn ensure_node(&mut self, id: &str) -> NodeIndex {
        if let Some(&idx) = self.index.get(id) {
            return idx;
        }
        let idx = self.graph.add_node(id.to_string());
        self.index.insert(id.to_string(), idx);
        idx
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Node ids in insertion order.
    pub fn node_ids(&self) -> Vec<&str> {
        self.graph
            .node_indices()
            .map(|idx| self.graph[idx].as_str())
            .collect()
    }

    /// Nodes nothing connects to.
    pub fn roots(&self) -> Vec<&str> {
        self.graph
            .node_indices()
            .filter(|&idx| self.in_degree(idx) == 0)
            .map(|idx| self.graph[idx].as_str())
            .collect()
    }

    /// Nodes something connects to.
    pub fn members(&self) -> Vec<&str> {
        self.graph
            .node_indices()
            .filter(|&idx| self.in_degree(idx) > 0)
            .map(|idx| self.graph[idx].as_str())
            .collect()
    }

    fn in_degree(&self, idx: NodeIndex) -> usize {
        self.graph.edges_directed(idx, Direction::Incoming).count()
    }

    fn out_degree(&self, idx: NodeIndex) -> usize {
        self.graph.edges_directed(idx, Direction::Outgoing).count()
    }

    pub fn total_cost(&self) -> u64 {
        self.graph.edge_weights().map(|e| e.weight).sum()
    }

    pub fn leaf_nodes(&self) -> Vec<&str> {
        self.graph
            .node_indices()
            .filter(|&idx| self.out_degree(idx) == 0 && self.in_degree(idx) == 1)
            .map(|idx| self.graph[idx].as_str())
            .collect()
    }

    /// Heaviest edge ending in a leaf; the earliest one wins ties.
    pub fn largest_leaf_edge(&self) -> Option<&CostEdge> {
        let mut best: Option<EdgeIndex> = None;
        for idx in self.graph.node_indices() {
            if self.out_degree(idx) != 0 || self.in_degree(idx) != 1 {
                continue;
            }
            if let Some(edge) = self.graph.edges_directed(idx, Direction::Incoming).next() {
                let better = match best {
                    None => true,
                    Some(b) => edge.weight().weight > self.graph[b].weight,
                };
                if better {
                    best = Some(edge.id());
                }
            }
        }
        best.map(|e| &self.graph[e])
    }

    pub fn largest_cost_leaf_node(&self) -> Option<&str> {
        self.largest_leaf_edge().map(|e| e.distance.second_id())
    }

    /// Edge that connects `id`, if any.
    pub fn incoming(&self, id: &str) -> Option<&CostEdge> {
        let idx = *self.index.get(id)?;
        self.graph
            .edges_directed(idx, Direction::Incoming)
            .next()
            .map(|e| e.weight())
    }

    pub fn remove_node(&mut self, id: &str) -> bool {
        match self.index.remove(id) {
            Some(idx) => self.graph.remove_node(idx).is_some(),
            None => false,
        }
    }

    /// Remaining edges as distances, in their original order.
    pub fn to_pairwise_distances(&self) -> Vec<PairwiseDistance> {
        let mut edges: Vec<EdgeIndex> = self.graph.edge_indices().collect();
        edges.sort();
        edges
            .into_iter()
            .map(|e| self.graph[e].distance.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gcm_core::{DistanceType, UniqueCoordinate};

    fn edge(from: &str, to: &str, distance: f64) -> PairwiseDistance {
        PairwiseDistance::new(
            UniqueCoordinate::new(from, 0.0, 0.0),
            UniqueCoordinate::new(to, 0.0, 0.0),
            distance,
            DistanceType::Haversine,
        )
    }

    fn tree() -> ConnectedCostGraph {
        // f -> a -> b, f -> c
        ConnectedCostGraph::from_pairwise_distances(&[
            edge("f", "a", 100.4),
            edge("a", "b", 300.0),
            edge("f", "c", 250.6),
        ])
    }

    #[test]
    fn test_weights_are_rounded() {
        let graph = tree();
        assert_eq!(graph.total_cost(), 100 + 300 + 251);
        assert_eq!(graph.node_count(), 4);
    }

    #[test]
    fn test_leaves_and_roots() {
        let graph = tree();
        assert_eq!(graph.leaf_nodes(), vec!["b", "c"]);
        assert_eq!(graph.roots(), vec!["f"]);
        assert_eq!(graph.members(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_largest_leaf() {
        let graph = tree();
        assert_eq!(graph.largest_cost_leaf_node(), Some("b"));
        assert_eq!(graph.largest_leaf_edge().unwrap().weight, 300);
    }

    #[test]
    fn test_largest_leaf_tie_is_first() {
        let graph = ConnectedCostGraph::from_pairwise_distances(&[edge("f", "x", 10.0), edge("f", "y", 10.0)]);
        assert_eq!(graph.largest_cost_leaf_node(), Some("x"));
    }

    #[test]
    fn test_remove_leaf_exposes_parent() {
        let mut graph = tree();
        assert!(graph.remove_node("b"));
        assert!(!graph.remove_node("b"));
        assert_eq!(graph.leaf_nodes(), vec!["a", "c"]);
        assert_eq!(graph.total_cost(), 351);
        let ids: Vec<String> = graph
            .to_pairwise_distances()
            .iter()
            .map(|d| d.second_id().to_string())
            .collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[test]
    fn test_incoming_edge() {
        let graph = tree();
        assert_eq!(graph.incoming("b").unwrap().distance.first_id(), "a");
        assert!(graph.incoming("f").is_none());
    }
}
