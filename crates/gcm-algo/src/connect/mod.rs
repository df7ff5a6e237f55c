//! Greedy nearest-first network construction.

pub mod greedy;

pub use greedy::{group_by_source, GreedyConnectorConf, GreedyDistanceConnector};
