//! Nearest-first greedy network builder.
//!
//! Starting from a fixed connected set (fiber nodes, towers), repeatedly
//! connects the closest unconnected coordinate. With `dynamic_connect`, every
//! newly connected coordinate becomes a connection point for the rest, which
//! is how fiber economies of scale are modelled.
//!
//! Queue entries are `(unconnected, connected)` pairs ordered by distance and
//! then by insertion sequence, so equal distances resolve the same way on
//! every run.

use gcm_core::{
    nearest_distances, DistanceType, GreedyConnectCache, NearestNeighborConf, PairwiseDistance,
    UniqueCoordinate, SOURCE_PROPERTY,
};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BinaryHeap, HashMap};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GreedyConnectorConf {
    /// Candidate connections at or above this length are never made
    pub maximum_connection_length_m: f64,
    /// Newly connected coordinates become connection points
    pub dynamic_connect: bool,
    pub distance_type: DistanceType,
}

impl GreedyConnectorConf {
    pub fn new(maximum_connection_length_m: f64, dynamic_connect: bool) -> Self {
        Self {
            maximum_connection_length_m,
            dynamic_connect,
            distance_type: DistanceType::Haversine,
        }
    }
}

/// Min-heap entry: smaller distance first, then earlier insertion.
#[derive(Debug)]
struct Candidate {
    distance: f64,
    seq: u64,
    pair: PairwiseDistance,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .distance
            .total_cmp(&self.distance)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug, Clone)]
pub struct GreedyDistanceConnector<'a> {
    conf: GreedyConnectorConf,
    cache: Option<&'a GreedyConnectCache>,
}

struct ConnectorState {
    connected: HashMap<String, UniqueCoordinate>,
    unconnected: HashMap<String, UniqueCoordinate>,
    sources: HashMap<String, String>,
    queue: BinaryHeap<Candidate>,
    seq: u64,
}

impl ConnectorState {
    fn push(&mut self, pair: PairwiseDistance) {
        self.seq += 1;
        self.queue.push(Candidate {
            distance: pair.distance,
            seq: self.seq,
            pair,
        });
    }
}

impl<'a> GreedyDistanceConnector<'a> {
    pub fn new(conf: GreedyConnectorConf) -> Self {
        Self { conf, cache: None }
    }

    pub fn with_cache(mut self, cache: &'a GreedyConnectCache) -> Self {
        self.cache = Some(cache);
        self
    }

    fn within_range(&self, pair: &PairwiseDistance) -> bool {
        pair.distance < self.conf.maximum_connection_length_m
    }

    /// Connect `unconnected` to the network rooted at `connected`.
    ///
    /// Returns one distance per newly connected coordinate in connection
    /// order. `coordinate1` is the endpoint connected to and `coordinate2` the
    /// new member; both carry the root id under [`SOURCE_PROPERTY`].
    /// Coordinates that never come within range are simply absent.
    pub fn run(
        &self,
        unconnected: &[UniqueCoordinate],
        connected: &[UniqueCoordinate],
    ) -> Vec<PairwiseDistance> {
        let mut state = ConnectorState {
            connected: HashMap::new(),
            unconnected: HashMap::new(),
            sources: HashMap::new(),
            queue: BinaryHeap::new(),
            seq: 0,
        };
        for coord in connected {
            state.sources.insert(coord.coordinate_id.clone(), coord.coordinate_id.clone());
            state.connected.insert(coord.coordinate_id.clone(), coord.clone());
        }
        let candidates: Vec<&UniqueCoordinate> = unconnected
            .iter()
            .filter(|c| !state.connected.contains_key(&c.coordinate_id))
            .collect();
        for coord in &candidates {
            state.unconnected.insert(coord.coordinate_id.clone(), (*coord).clone());
        }

        self.seed(&mut state, &candidates, connected);

        let mut connections = Vec::new();
        while let Some(Candidate { pair, .. }) = state.queue.pop() {
            let first_connected = state.connected.contains_key(pair.first_id());
            let second_connected = state.connected.contains_key(pair.second_id());
            let (new_id, endpoint_id) = match (first_connected, second_connected) {
                (false, true) => (pair.first_id(), pair.second_id()),
                (true, false) => (pair.second_id(), pair.first_id()),
                // obsolete entry
                _ => continue,
            };

            let Some(mut new_coord) = state.unconnected.remove(new_id) else {
                continue;
            };
            let source = state
                .sources
                .get(endpoint_id)
                .cloned()
                .unwrap_or_else(|| endpoint_id.to_string());
            let Some(endpoint) = state.connected.get_mut(endpoint_id) else {
                continue;
            };
            endpoint.set_property(SOURCE_PROPERTY, source.clone());
            new_coord.set_property(SOURCE_PROPERTY, source.clone());
            let endpoint = endpoint.clone();

            let new_id = new_coord.coordinate_id.clone();
            state.sources.insert(new_id.clone(), source);
            state.connected.insert(new_id, new_coord.clone());
            connections.push(PairwiseDistance::new(
                endpoint,
                new_coord.clone(),
                pair.distance,
                pair.distance_type,
            ));

            if self.conf.dynamic_connect {
                self.reseed(&mut state, &candidates, &new_coord);
            }
        }

        tracing::debug!(
            connected = connections.len(),
            unreachable = state.unconnected.len(),
            dynamic = self.conf.dynamic_connect,
            "greedy connector finished"
        );
        connections
    }

    /// Nearest fixed connection point per candidate.
    ///
    /// Fixed points never change state, so only the closest pair per
    /// candidate can ever be accepted; the rest would be popped as obsolete.
    /// Candidates the cache does not know are measured live.
    fn seed(&self, state: &mut ConnectorState, candidates: &[&UniqueCoordinate], connected: &[UniqueCoordinate]) {
        let mut live: Vec<UniqueCoordinate> = Vec::new();
        match self.cache.and_then(|c| c.connected_cache.as_ref()) {
            Some(cache) => {
                for coord in candidates {
                    match cache.get(&coord.coordinate_id) {
                        Some(pair) if state.connected.contains_key(pair.second_id()) => {
                            if self.within_range(pair) {
                                state.push(pair.clone());
                            }
                        }
                        // absent key, or an endpoint that is not part of this run
                        _ => live.push((*coord).clone()),
                    }
                }
                if !live.is_empty() {
                    tracing::debug!(misses = live.len(), "connected cache misses, measuring live");
                }
            }
            None => live = candidates.iter().map(|c| (*c).clone()).collect(),
        }
        if live.is_empty() {
            return;
        }

        let conf = NearestNeighborConf {
            n_nearest_neighbors: 1,
            n_chunks: NearestNeighborConf::defaults().n_chunks,
            distance_type: self.conf.distance_type,
        };
        for pair in nearest_distances(&live, connected, &conf) {
            if self.within_range(&pair) {
                state.push(pair);
            }
        }
    }

    /// Distances from the remaining candidates to a newly connected coordinate.
    ///
    /// Cached neighbors are used when the new member has any; candidates the
    /// cache has never seen are always measured live.
    fn reseed(&self, state: &mut ConnectorState, candidates: &[&UniqueCoordinate], new_coord: &UniqueCoordinate) {
        let cache = self
            .cache
            .and_then(|c| c.unconnected_cache.as_ref())
            .filter(|c| c.contains(&new_coord.coordinate_id));
        if let Some(cache) = cache {
            // entries are stored as (other, new)
            for pair in cache.get(&new_coord.coordinate_id) {
                if self.within_range(pair) && state.unconnected.contains_key(pair.first_id()) {
                    state.push(pair.clone());
                }
            }
        }

        for coord in candidates {
            if !state.unconnected.contains_key(&coord.coordinate_id) {
                continue;
            }
            if cache.is_some_and(|c| c.contains(&coord.coordinate_id)) {
                continue;
            }
            let pair = PairwiseDistance::between(coord, new_coord, self.conf.distance_type);
            if self.within_range(&pair) {
                state.push(pair);
            }
        }
    }
}

/// Group connections by the root source recorded on `coordinate1`,
/// keeping connection order within each group.
pub fn group_by_source(distances: &[PairwiseDistance]) -> BTreeMap<String, Vec<PairwiseDistance>> {
    let mut groups: BTreeMap<String, Vec<PairwiseDistance>> = BTreeMap::new();
    for d in distances {
        let source = d
            .coordinate1
            .source()
            .unwrap_or_else(|| d.first_id())
            .to_string();
        groups.entry(source).or_default().push(d.clone());
    }
    groups
}
