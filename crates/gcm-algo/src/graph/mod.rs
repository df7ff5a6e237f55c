pub mod cost_graph;
pub mod pruner;
pub mod sat_graph;

pub use cost_graph::{distance_weight, ConnectedCostGraph, CostEdge};
pub use pruner::{CostTreePruner, PruneReport};
pub use sat_graph::{NodeLabel, SatCostGraph, SatCostGraphBuilder, SatNode, METANODE_ID};
