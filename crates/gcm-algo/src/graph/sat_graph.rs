//! Undirected cost graph consumed by the network design formula.
//!
//! A synthetic metanode anchors everything already on the backbone: fixed
//! fiber nodes and connected schools attach to it with zero-weight edges, and
//! candidate fiber nodes attach to it at their activation cost. All other
//! edges come from pairwise distances below the maximum connection length.

use super::cost_graph::distance_weight;
use gcm_core::{pairwise_distances, DistanceType, UniqueCoordinate};
use petgraph::algo::{dijkstra, min_spanning_tree};
use petgraph::data::Element;
use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::{Bfs, EdgeRef};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

pub const METANODE_ID: &str = "__metanode__";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeLabel {
    Metanode,
    /// Existing fiber node
    CfNode,
    /// Candidate fiber node, optional
    UfNode,
    /// School already on fiber
    CSchool,
    /// School to connect
    USchool,
    /// Optional intermediate junction
    Splitter,
}

impl NodeLabel {
    /// Already connected; selected unconditionally.
    pub fn is_fixed(&self) -> bool {
        matches!(self, NodeLabel::CfNode | NodeLabel::CSchool)
    }

    /// Attaches directly to the metanode.
    pub fn is_backbone(&self) -> bool {
        matches!(self, NodeLabel::CfNode | NodeLabel::CSchool | NodeLabel::UfNode)
    }

    /// Needs a parent among its neighbors when selected.
    pub fn is_child(&self) -> bool {
        matches!(self, NodeLabel::USchool | NodeLabel::Splitter)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SatNode {
    pub id: String,
    pub label: NodeLabel,
    /// Cost of selecting the node
    pub cost: f64,
    /// Cost charged when the node stays unselected
    pub ncost: f64,
    /// Cable cost per km of the edge to the node's parent
    pub pkmcost: f64,
    pub coordinate: Option<UniqueCoordinate>,
}

#[derive(Debug, Clone)]
pub struct SatCostGraph {
    graph: UnGraph<SatNode, u64>,
    index: HashMap<String, NodeIndex>,
    metanode: NodeIndex,
}

/// Collects nodes, then derives the distance edges in one pass.
#[derive(Debug, Clone)]
pub struct SatCostGraphBuilder {
    nodes: Vec<SatNode>,
    pkmcost: f64,
    distance_type: DistanceType,
}

impl SatCostGraphBuilder {
    pub fn new(pkmcost: f64) -> Self {
        Self {
            nodes: Vec::new(),
            pkmcost,
            distance_type: DistanceType::Haversine,
        }
    }

    pub fn distance_type(mut self, distance_type: DistanceType) -> Self {
        self.distance_type = distance_type;
        self
    }

    fn push(mut self, coordinate: UniqueCoordinate, label: NodeLabel, cost: f64, ncost: f64) -> Self {
        self.nodes.push(SatNode {
            id: coordinate.coordinate_id.clone(),
            label,
            cost,
            ncost,
            pkmcost: self.pkmcost,
            coordinate: Some(coordinate),
        });
        self
    }

    pub fn fiber_node(self, coordinate: UniqueCoordinate) -> Self {
        self.push(coordinate, NodeLabel::CfNode, 0.0, 0.0)
    }

    pub fn candidate_fiber_node(self, coordinate: UniqueCoordinate, activation_cost: f64) -> Self {
        self.push(coordinate, NodeLabel::UfNode, activation_cost, 0.0)
    }

    pub fn connected_school(self, coordinate: UniqueCoordinate) -> Self {
        self.push(coordinate, NodeLabel::CSchool, 0.0, 0.0)
    }

    pub fn unconnected_school(self, coordinate: UniqueCoordinate, cost: f64, ncost: f64) -> Self {
        self.push(coordinate, NodeLabel::USchool, cost, ncost)
    }

    pub fn splitter(self, coordinate: UniqueCoordinate, cost: f64) -> Self {
        self.push(coordinate, NodeLabel::Splitter, cost, 0.0)
    }

    /// Edges between every pair closer than `maximum_length_m`, except
    /// between two backbone nodes, which never need a cable.
    pub fn build(self, maximum_length_m: f64) -> SatCostGraph {
        let mut graph: UnGraph<SatNode, u64> = UnGraph::default();
        let metanode = graph.add_node(SatNode {
            id: METANODE_ID.to_string(),
            label: NodeLabel::Metanode,
            cost: 0.0,
            ncost: 0.0,
            pkmcost: 0.0,
            coordinate: None,
        });
        let mut index = HashMap::new();
        index.insert(METANODE_ID.to_string(), metanode);

        let coords: Vec<UniqueCoordinate> = self.nodes.iter().filter_map(|n| n.coordinate.clone()).collect();
        for node in self.nodes {
            if index.contains_key(&node.id) {
                tracing::warn!(id = %node.id, "duplicate network design node ignored");
                continue;
            }
            let backbone = node.label.is_backbone();
            let id = node.id.clone();
            let idx = graph.add_node(node);
            index.insert(id, idx);
            if backbone {
                graph.add_edge(metanode, idx, 0);
            }
        }

        let pairs = pairwise_distances(&coords, &coords, self.distance_type);
        for pair in pairs {
            let (Some(&a), Some(&b)) = (index.get(pair.first_id()), index.get(pair.second_id())) else {
                continue;
            };
            // each unordered pair once
            if a.index() >= b.index() || pair.distance >= maximum_length_m {
                continue;
            }
            if graph[a].label.is_backbone() && graph[b].label.is_backbone() {
                continue;
            }
            graph.add_edge(a, b, distance_weight(pair.distance));
        }

        SatCostGraph {
            graph,
            index,
            metanode,
        }
    }
}

impl SatCostGraph {
    pub fn metanode(&self) -> NodeIndex {
        self.metanode
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn node(&self, idx: NodeIndex) -> &SatNode {
        &self.graph[idx]
    }

    pub fn node_index(&self, id: &str) -> Option<NodeIndex> {
        self.index.get(id).copied()
    }

    pub fn node_indices(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.node_indices()
    }

    /// Neighbors with the connecting edge weight, in edge insertion order.
    pub fn neighbors(&self, idx: NodeIndex) -> Vec<(NodeIndex, u64)> {
        let mut out: Vec<(NodeIndex, u64, usize)> = self
            .graph
            .edges(idx)
            .map(|e| {
                let other = if e.source() == idx { e.target() } else { e.source() };
                (other, *e.weight(), e.id().index())
            })
            .collect();
        out.sort_by_key(|&(_, _, edge)| edge);
        out.into_iter().map(|(n, w, _)| (n, w)).collect()
    }

    pub fn edge_weight(&self, a: NodeIndex, b: NodeIndex) -> Option<u64> {
        self.graph.find_edge(a, b).map(|e| self.graph[e])
    }

    pub fn nodes_with_label(&self, label: NodeLabel) -> Vec<NodeIndex> {
        self.graph
            .node_indices()
            .filter(|&i| self.graph[i].label == label)
            .collect()
    }

    /// Nodes reachable from the metanode, breadth-first.
    pub fn reachable(&self) -> BTreeSet<NodeIndex> {
        let mut seen = BTreeSet::new();
        let mut bfs = Bfs::new(&self.graph, self.metanode);
        while let Some(n) = bfs.next(&self.graph) {
            seen.insert(n);
        }
        seen
    }

    /// Subgraph keeping only the nodes reachable from the metanode.
    pub fn prune_unreachable(&self) -> SatCostGraph {
        let keep = self.reachable();
        let dropped = self.node_count() - keep.len();
        if dropped > 0 {
            tracing::debug!(dropped, "removed nodes unreachable from the backbone");
        }
        self.rebuild(|n| keep.contains(&n), |_| true)
    }

    /// Keep the minimum spanning tree plus each node's `max_neighbors`
    /// shortest incident edges.
    pub fn reduce_edges(&self, max_neighbors: usize) -> SatCostGraph {
        let mut keep: BTreeSet<(NodeIndex, NodeIndex)> = BTreeSet::new();
        let ordered = |a: NodeIndex, b: NodeIndex| if a <= b { (a, b) } else { (b, a) };

        for element in min_spanning_tree(&self.graph) {
            if let Element::Edge { source, target, .. } = element {
                keep.insert(ordered(NodeIndex::new(source), NodeIndex::new(target)));
            }
        }
        for idx in self.graph.node_indices() {
            let mut incident = self.neighbors(idx);
            incident.sort_by_key(|&(_, w)| w);
            for (other, _) in incident.into_iter().take(max_neighbors) {
                keep.insert(ordered(idx, other));
            }
        }

        let reduced = self.rebuild(|_| true, |(a, b)| keep.contains(&ordered(a, b)));
        tracing::debug!(
            before = self.edge_count(),
            after = reduced.edge_count(),
            "reduced network design edges"
        );
        reduced
    }

    fn rebuild(
        &self,
        keep_node: impl Fn(NodeIndex) -> bool,
        keep_edge: impl Fn((NodeIndex, NodeIndex)) -> bool,
    ) -> SatCostGraph {
        let mut graph: UnGraph<SatNode, u64> = UnGraph::default();
        let mut index = HashMap::new();
        let mut remap = HashMap::new();
        for old in self.graph.node_indices().filter(|&n| keep_node(n)) {
            let node = self.graph[old].clone();
            let id = node.id.clone();
            let new = graph.add_node(node);
            remap.insert(old, new);
            index.insert(id, new);
        }
        for edge in self.graph.edge_references() {
            let (a, b) = (edge.source(), edge.target());
            if let (Some(&na), Some(&nb)) = (remap.get(&a), remap.get(&b)) {
                if keep_edge((a, b)) {
                    graph.add_edge(na, nb, *edge.weight());
                }
            }
        }
        let metanode = remap.get(&self.metanode).copied().unwrap_or_default();
        SatCostGraph {
            graph,
            index,
            metanode,
        }
    }

    /// Shortest cable length in meters from the backbone to every reachable node.
    pub fn shortest_path_lengths(&self) -> HashMap<NodeIndex, u64> {
        dijkstra(&self.graph, self.metanode, None, |e| *e.weight())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at_km(id: &str, x_km: f64) -> UniqueCoordinate {
        UniqueCoordinate::new(id, 0.0, (x_km * 1000.0 / gcm_core::EARTH_RADIUS_M).to_degrees())
    }

    fn line() -> SatCostGraph {
        SatCostGraphBuilder::new(1_000.0)
            .fiber_node(at_km("f", 0.0))
            .unconnected_school(at_km("s1", 2.0), 10.0, 0.0)
            .unconnected_school(at_km("s2", 4.0), 10.0, 0.0)
            .unconnected_school(at_km("far", 50.0), 10.0, 0.0)
            .build(3_000.0)
    }

    #[test]
    fn test_edges_respect_maximum_length() {
        let g = line();
        let f = g.node_index("f").unwrap();
        let s1 = g.node_index("s1").unwrap();
        let s2 = g.node_index("s2").unwrap();
        assert_eq!(g.edge_weight(f, s1), Some(2_000));
        assert_eq!(g.edge_weight(s1, s2), Some(2_000));
        assert_eq!(g.edge_weight(f, s2), None);
        assert_eq!(g.edge_weight(g.metanode(), f), Some(0));
    }

    #[test]
    fn test_unreachable_nodes_are_pruned() {
        let g = line().prune_unreachable();
        assert!(g.node_index("far").is_none());
        assert_eq!(g.node_count(), 4);
        assert_eq!(g.node(g.metanode()).label, NodeLabel::Metanode);
    }

    #[test]
    fn test_shortest_paths() {
        let g = line();
        let lengths = g.shortest_path_lengths();
        assert_eq!(lengths[&g.node_index("s2").unwrap()], 4_000);
        assert!(!lengths.contains_key(&g.node_index("far").unwrap()));
    }

    #[test]
    fn test_backbone_pairs_have_no_edge() {
        let g = SatCostGraphBuilder::new(1.0)
            .fiber_node(at_km("f1", 0.0))
            .connected_school(at_km("c", 1.0))
            .build(10_000.0);
        let f1 = g.node_index("f1").unwrap();
        let c = g.node_index("c").unwrap();
        assert_eq!(g.edge_weight(f1, c), None);
        assert_eq!(g.edge_count(), 2);
    }

    #[test]
    fn test_reduce_edges_keeps_spanning_tree() {
        let mut builder = SatCostGraphBuilder::new(1.0).fiber_node(at_km("f", 0.0));
        for i in 1..=6 {
            builder = builder.unconnected_school(at_km(&format!("s{i}"), i as f64), 0.0, 0.0);
        }
        let g = builder.build(100_000.0);
        let reduced = g.reduce_edges(1);
        assert!(reduced.edge_count() < g.edge_count());
        // still connected
        assert_eq!(reduced.reachable().len(), reduced.node_count());
    }
}
