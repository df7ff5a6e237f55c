//! Distance primitives between coordinate sets.
//!
//! Two execution strategies are provided:
//!
//! - [`pairwise_distances`]: exact O(|A|·|B|) enumeration, used for small
//!   sets and wherever every candidate pair matters (P2P tower matching).
//! - [`nearest_distances`]: converts both sets to radians once, computes a
//!   distance matrix per chunk of the first set with a batched haversine
//!   routine and keeps the `n_nearest_neighbors` smallest entries per row.
//!   Chunking bounds peak memory to `chunk_len × |B|` floats.
//!
//! Ties between equal distances keep the target input order (stable sort),
//! so identical inputs always produce identical outputs.

#[cfg(feature = "desktop")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::coordinate::UniqueCoordinate;

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// How a distance between two coordinates is measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceType {
    /// Great-circle distance in meters
    #[default]
    Haversine,
    /// Planar distance in coordinate units (projected inputs)
    Euclidean,
}

impl DistanceType {
    pub fn distance(&self, from: (f64, f64), to: (f64, f64)) -> f64 {
        match self {
            DistanceType::Haversine => haversine_m(from, to),
            DistanceType::Euclidean => euclidean(from, to),
        }
    }
}

/// Great-circle distance in meters between two (lat, lon) points in degrees.
pub fn haversine_m(from: (f64, f64), to: (f64, f64)) -> f64 {
    haversine_rad(
        from.0.to_radians(),
        from.1.to_radians(),
        to.0.to_radians(),
        to.1.to_radians(),
    )
}

#[inline]
fn haversine_rad(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let s1 = ((lat2 - lat1) / 2.0).sin();
    let s2 = ((lon2 - lon1) / 2.0).sin();
    let h = s1 * s1 + lat1.cos() * lat2.cos() * s2 * s2;
    2.0 * EARTH_RADIUS_M * h.sqrt().min(1.0).asin()
}

pub fn euclidean(from: (f64, f64), to: (f64, f64)) -> f64 {
    ((to.0 - from.0).powi(2) + (to.1 - from.1).powi(2)).sqrt()
}

/// Distance between two identified coordinates.
///
/// The pair is ordered: downstream consumers treat `coordinate1` as the
/// endpoint being connected *to*. [`PairwiseDistance::reversed`] swaps both
/// the endpoints and the ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairwiseDistance {
    pub pair_ids: (String, String),
    pub distance: f64,
    pub coordinate1: UniqueCoordinate,
    pub coordinate2: UniqueCoordinate,
    #[serde(default)]
    pub distance_type: DistanceType,
}

impl PairwiseDistance {
    pub fn new(
        coordinate1: UniqueCoordinate,
        coordinate2: UniqueCoordinate,
        distance: f64,
        distance_type: DistanceType,
    ) -> Self {
        Self {
            pair_ids: (
                coordinate1.coordinate_id.clone(),
                coordinate2.coordinate_id.clone(),
            ),
            distance,
            coordinate1,
            coordinate2,
            distance_type,
        }
    }

    /// Measure the distance between two coordinates.
    pub fn between(
        coordinate1: &UniqueCoordinate,
        coordinate2: &UniqueCoordinate,
        distance_type: DistanceType,
    ) -> Self {
        let distance = distance_type.distance(coordinate1.coordinate, coordinate2.coordinate);
        Self::new(coordinate1.clone(), coordinate2.clone(), distance, distance_type)
    }

    #[inline]
    pub fn first_id(&self) -> &str {
        &self.pair_ids.0
    }

    #[inline]
    pub fn second_id(&self) -> &str {
        &self.pair_ids.1
    }

    pub fn is_self_pair(&self) -> bool {
        self.pair_ids.0 == self.pair_ids.1
    }

    pub fn reversed(&self) -> Self {
        self.clone().into_reversed()
    }

    pub fn into_reversed(self) -> Self {
        Self {
            pair_ids: (self.pair_ids.1, self.pair_ids.0),
            distance: self.distance,
            coordinate1: self.coordinate2,
            coordinate2: self.coordinate1,
            distance_type: self.distance_type,
        }
    }
}

/// Settings for the chunked nearest-k routine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NearestNeighborConf {
    /// Entries kept per source row
    pub n_nearest_neighbors: usize,
    /// Number of pieces the source set is split into
    pub n_chunks: usize,
    pub distance_type: DistanceType,
}

impl NearestNeighborConf {
    /// Documented defaults: 10 neighbors, 500 chunks, haversine.
    pub fn defaults() -> Self {
        Self {
            n_nearest_neighbors: 10,
            n_chunks: 500,
            distance_type: DistanceType::Haversine,
        }
    }

    pub fn with_neighbors(mut self, n_nearest_neighbors: usize) -> Self {
        self.n_nearest_neighbors = n_nearest_neighbors;
        self
    }

    pub fn with_chunks(mut self, n_chunks: usize) -> Self {
        self.n_chunks = n_chunks;
        self
    }
}

/// Exact distances between every pair of `sources × targets`, source-major.
pub fn pairwise_distances(
    sources: &[UniqueCoordinate],
    targets: &[UniqueCoordinate],
    distance_type: DistanceType,
) -> Vec<PairwiseDistance> {
    let mut out = Vec::with_capacity(sources.len() * targets.len());
    for source in sources {
        for target in targets {
            out.push(PairwiseDistance::between(source, target, distance_type));
        }
    }
    out
}

/// Column-oriented copy of a coordinate set, converted once.
#[derive(Debug, Clone)]
pub struct CoordinateMatrix {
    lat_deg: Vec<f64>,
    lon_deg: Vec<f64>,
    lat_rad: Vec<f64>,
    lon_rad: Vec<f64>,
}

impl CoordinateMatrix {
    pub fn from_coordinates(coordinates: &[UniqueCoordinate]) -> Self {
        let lat_deg: Vec<f64> = coordinates.iter().map(UniqueCoordinate::lat).collect();
        let lon_deg: Vec<f64> = coordinates.iter().map(UniqueCoordinate::lon).collect();
        let lat_rad = lat_deg.iter().map(|v| v.to_radians()).collect();
        let lon_rad = lon_deg.iter().map(|v| v.to_radians()).collect();
        Self {
            lat_deg,
            lon_deg,
            lat_rad,
            lon_rad,
        }
    }

    pub fn len(&self) -> usize {
        self.lat_deg.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lat_deg.is_empty()
    }

    /// Distances from row `i` of `self` to every row of `other`, written into `out`.
    pub fn distance_row(
        &self,
        i: usize,
        other: &CoordinateMatrix,
        distance_type: DistanceType,
        out: &mut Vec<f64>,
    ) {
        out.clear();
        match distance_type {
            DistanceType::Haversine => {
                let (lat1, lon1) = (self.lat_rad[i], self.lon_rad[i]);
                out.extend(
                    other
                        .lat_rad
                        .iter()
                        .zip(&other.lon_rad)
                        .map(|(&lat2, &lon2)| haversine_rad(lat1, lon1, lat2, lon2)),
                );
            }
            DistanceType::Euclidean => {
                let from = (self.lat_deg[i], self.lon_deg[i]);
                out.extend(
                    other
                        .lat_deg
                        .iter()
                        .zip(&other.lon_deg)
                        .map(|(&lat2, &lon2)| euclidean(from, (lat2, lon2))),
                );
            }
        }
    }

    /// Full `self × other` distance matrix, one row per coordinate in `self`.
    pub fn distance_matrix(&self, other: &CoordinateMatrix, distance_type: DistanceType) -> Vec<Vec<f64>> {
        let mut rows = Vec::with_capacity(self.len());
        for i in 0..self.len() {
            let mut row = Vec::with_capacity(other.len());
            self.distance_row(i, other, distance_type, &mut row);
            rows.push(row);
        }
        rows
    }
}

/// Nearest `n_nearest_neighbors` targets for every source, chunked over sources.
///
/// Output is source-major; within a source, ascending by distance. A row with
/// fewer targets than the cap keeps all of them. An empty target set yields an
/// empty result. Self-pairs are *not* filtered here; the cache builders do that.
pub fn nearest_distances(
    sources: &[UniqueCoordinate],
    targets: &[UniqueCoordinate],
    conf: &NearestNeighborConf,
) -> Vec<PairwiseDistance> {
    if sources.is_empty() || targets.is_empty() || conf.n_nearest_neighbors == 0 {
        return Vec::new();
    }
    let target_matrix = CoordinateMatrix::from_coordinates(targets);
    let chunk_len = chunk_length(sources.len(), conf.n_chunks);

    let process = |chunk: &[UniqueCoordinate]| nearest_in_chunk(chunk, targets, &target_matrix, conf);

    #[cfg(feature = "desktop")]
    let chunks: Vec<Vec<PairwiseDistance>> = sources.par_chunks(chunk_len).map(process).collect();
    #[cfg(not(feature = "desktop"))]
    let chunks: Vec<Vec<PairwiseDistance>> = sources.chunks(chunk_len).map(process).collect();

    tracing::debug!(
        sources = sources.len(),
        targets = targets.len(),
        chunks = chunks.len(),
        "computed nearest distances"
    );
    chunks.into_iter().flatten().collect()
}

fn chunk_length(n_items: usize, n_chunks: usize) -> usize {
    let n_chunks = n_chunks.clamp(1, n_items.max(1));
    n_items.div_ceil(n_chunks).max(1)
}

fn nearest_in_chunk(
    chunk: &[UniqueCoordinate],
    targets: &[UniqueCoordinate],
    target_matrix: &CoordinateMatrix,
    conf: &NearestNeighborConf,
) -> Vec<PairwiseDistance> {
    let chunk_matrix = CoordinateMatrix::from_coordinates(chunk);
    let matrix = chunk_matrix.distance_matrix(target_matrix, conf.distance_type);
    let keep = conf.n_nearest_neighbors.min(targets.len());

    let mut out = Vec::with_capacity(chunk.len() * keep);
    let mut order: Vec<usize> = Vec::with_capacity(targets.len());
    for (source, row) in chunk.iter().zip(&matrix) {
        order.clear();
        order.extend(0..row.len());
        order.sort_by(|&a, &b| row[a].total_cmp(&row[b]));
        for &j in order.iter().take(keep) {
            out.push(PairwiseDistance::new(
                source.clone(),
                targets[j].clone(),
                row[j],
                conf.distance_type,
            ));
        }
    }
    out
}
