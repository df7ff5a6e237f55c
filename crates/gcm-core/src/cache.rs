//! Persisted nearest-distance lookups keyed by coordinate id.
//!
//! The on-disk document shape is fixed for interoperability with existing
//! workspaces:
//!
//! ```text
//! {"lookup": {...}, "cache_type": "one-to-one" | "one-to-many", "n_neighbors"?: int}
//! ```
//!
//! A missing cache file is never an error: loaders return `None` and callers
//! fall back to live distance computation.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use crate::coordinate::UniqueCoordinate;
use crate::distance::{nearest_distances, NearestNeighborConf, PairwiseDistance};
use crate::error::{GcmError, GcmResult};

/// File name of the one-to-one cache inside a greedy cache directory.
pub const CONNECTED_CACHE_FILE: &str = "connected_cache.json";
/// File name of the one-to-many cache inside a greedy cache directory.
pub const UNCONNECTED_CACHE_FILE: &str = "unconnected_cache.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CacheType {
    #[serde(rename = "one-to-one")]
    OneToOne,
    #[serde(rename = "one-to-many")]
    OneToMany,
}

#[derive(Debug, Serialize, Deserialize)]
struct CacheDocument<L> {
    lookup: L,
    cache_type: CacheType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    n_neighbors: Option<usize>,
}

fn write_document<L: Serialize>(path: &Path, document: &CacheDocument<L>) -> GcmResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer(&mut writer, document)?;
    writer.flush()?;
    Ok(())
}

fn read_document<L: for<'de> Deserialize<'de>>(
    path: &Path,
    expected: CacheType,
) -> GcmResult<CacheDocument<L>> {
    let reader = BufReader::new(File::open(path)?);
    let document: CacheDocument<L> = serde_json::from_reader(reader)?;
    if document.cache_type != expected {
        return Err(GcmError::Cache(format!(
            "{} holds a {:?} cache, expected {:?}",
            path.display(),
            document.cache_type,
            expected
        )));
    }
    Ok(document)
}

/// One nearest distance per source id.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SingleLookupDistanceCache {
    pub lookup: BTreeMap<String, PairwiseDistance>,
}

impl SingleLookupDistanceCache {
    /// Keep the minimum-distance entry per source id, dropping self-pairs.
    ///
    /// On equal distances the first entry seen wins.
    pub fn from_distances(distances: impl IntoIterator<Item = PairwiseDistance>) -> Self {
        let mut lookup: BTreeMap<String, PairwiseDistance> = BTreeMap::new();
        for distance in distances {
            if distance.is_self_pair() {
                continue;
            }
            match lookup.get(distance.first_id()) {
                Some(current) if current.distance <= distance.distance => {}
                _ => {
                    lookup.insert(distance.pair_ids.0.clone(), distance);
                }
            }
        }
        Self { lookup }
    }

    pub fn get(&self, source_id: &str) -> Option<&PairwiseDistance> {
        self.lookup.get(source_id)
    }

    pub fn len(&self) -> usize {
        self.lookup.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lookup.is_empty()
    }

    pub fn to_json(&self, path: impl AsRef<Path>) -> GcmResult<()> {
        write_document(
            path.as_ref(),
            &CacheDocument {
                lookup: &self.lookup,
                cache_type: CacheType::OneToOne,
                n_neighbors: None,
            },
        )
    }

    pub fn from_json(path: impl AsRef<Path>) -> GcmResult<Self> {
        let document: CacheDocument<BTreeMap<String, PairwiseDistance>> =
            read_document(path.as_ref(), CacheType::OneToOne)?;
        Ok(Self {
            lookup: document.lookup,
        })
    }

    /// Load the cache if the file exists; a missing file is a cache miss.
    pub fn load_if_exists(path: impl AsRef<Path>) -> GcmResult<Option<Self>> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "one-to-one cache miss");
            return Ok(None);
        }
        Self::from_json(path).map(Some)
    }
}

/// Up to `n_neighbors` nearest distances per source id, ascending.
///
/// Entries are stored reversed relative to the input: a distance
/// `(source, other)` is kept under `source` as `(other, source)`.
#[derive(Debug, Clone, PartialEq)]
pub struct MultiLookupDistanceCache {
    pub lookup: BTreeMap<String, Vec<PairwiseDistance>>,
    pub n_neighbors: usize,
}

impl MultiLookupDistanceCache {
    pub fn from_distances(
        distances: impl IntoIterator<Item = PairwiseDistance>,
        n_neighbors: usize,
    ) -> Self {
        let mut lookup: BTreeMap<String, Vec<PairwiseDistance>> = BTreeMap::new();
        for distance in distances {
            if distance.is_self_pair() {
                continue;
            }
            let source = distance.pair_ids.0.clone();
            lookup.entry(source).or_default().push(distance.into_reversed());
        }
        for entries in lookup.values_mut() {
            entries.sort_by(|a, b| a.distance.total_cmp(&b.distance));
            entries.truncate(n_neighbors);
        }
        Self {
            lookup,
            n_neighbors,
        }
    }

    pub fn get(&self, source_id: &str) -> &[PairwiseDistance] {
        self.lookup.get(source_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains(&self, source_id: &str) -> bool {
        self.lookup.contains_key(source_id)
    }

    pub fn len(&self) -> usize {
        self.lookup.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lookup.is_empty()
    }

    pub fn to_json(&self, path: impl AsRef<Path>) -> GcmResult<()> {
        write_document(
            path.as_ref(),
            &CacheDocument {
                lookup: &self.lookup,
                cache_type: CacheType::OneToMany,
                n_neighbors: Some(self.n_neighbors),
            },
        )
    }

    pub fn from_json(path: impl AsRef<Path>) -> GcmResult<Self> {
        let path = path.as_ref();
        let document: CacheDocument<BTreeMap<String, Vec<PairwiseDistance>>> =
            read_document(path, CacheType::OneToMany)?;
        let n_neighbors = document.n_neighbors.ok_or_else(|| {
            GcmError::Cache(format!("{} is missing n_neighbors", path.display()))
        })?;
        Ok(Self {
            lookup: document.lookup,
            n_neighbors,
        })
    }

    pub fn load_if_exists(path: impl AsRef<Path>) -> GcmResult<Option<Self>> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "one-to-many cache miss");
            return Ok(None);
        }
        Self::from_json(path).map(Some)
    }
}

/// Distance caches consumed by the greedy connector.
///
/// Either half may be absent, which forces live computation for that half.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GreedyConnectCache {
    /// Nearest fixed-infrastructure distance per unconnected coordinate
    pub connected_cache: Option<SingleLookupDistanceCache>,
    /// Nearest other unconnected coordinates per unconnected coordinate
    pub unconnected_cache: Option<MultiLookupDistanceCache>,
}

impl GreedyConnectCache {
    pub fn new(
        connected_cache: Option<SingleLookupDistanceCache>,
        unconnected_cache: Option<MultiLookupDistanceCache>,
    ) -> Self {
        Self {
            connected_cache,
            unconnected_cache,
        }
    }

    /// Compute both caches from scratch.
    ///
    /// Distances are not filtered by length: the connector applies its own
    /// maximum, so one cache serves runs with any maximum connection length.
    pub fn build(
        unconnected: &[UniqueCoordinate],
        connected: &[UniqueCoordinate],
        conf: &NearestNeighborConf,
    ) -> Self {
        let to_infra = nearest_distances(unconnected, connected, &conf.with_neighbors(1));
        let connected_cache = SingleLookupDistanceCache::from_distances(to_infra);

        // one extra neighbor because each row contains its own self-pair
        let among = nearest_distances(
            unconnected,
            unconnected,
            &conf.with_neighbors(conf.n_nearest_neighbors + 1),
        );
        let unconnected_cache =
            MultiLookupDistanceCache::from_distances(among, conf.n_nearest_neighbors);

        tracing::info!(
            connected_entries = connected_cache.len(),
            unconnected_entries = unconnected_cache.len(),
            "built greedy connect cache"
        );
        Self::new(Some(connected_cache), Some(unconnected_cache))
    }

    pub fn save(&self, dir: impl AsRef<Path>) -> GcmResult<()> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        if let Some(cache) = &self.connected_cache {
            cache.to_json(dir.join(CONNECTED_CACHE_FILE))?;
        }
        if let Some(cache) = &self.unconnected_cache {
            cache.to_json(dir.join(UNCONNECTED_CACHE_FILE))?;
        }
        Ok(())
    }

    /// Load whichever halves exist in `dir`.
    pub fn load(dir: impl AsRef<Path>) -> GcmResult<Self> {
        let dir = dir.as_ref();
        Ok(Self {
            connected_cache: SingleLookupDistanceCache::load_if_exists(
                dir.join(CONNECTED_CACHE_FILE),
            )?,
            unconnected_cache: MultiLookupDistanceCache::load_if_exists(
                dir.join(UNCONNECTED_CACHE_FILE),
            )?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::DistanceType;

    fn pd(a: &str, b: &str, distance: f64) -> PairwiseDistance {
        PairwiseDistance::new(
            UniqueCoordinate::new(a, 0.0, 0.0),
            UniqueCoordinate::new(b, 0.0, 0.0),
            distance,
            DistanceType::Haversine,
        )
    }

    #[test]
    fn test_single_keeps_minimum_and_drops_self_pairs() {
        let cache = SingleLookupDistanceCache::from_distances(vec![
            pd("s1", "s1", 0.0),
            pd("s1", "f1", 300.0),
            pd("s1", "f2", 100.0),
            pd("s2", "f1", 50.0),
        ]);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("s1").unwrap().second_id(), "f2");
        assert_eq!(cache.get("s2").unwrap().distance, 50.0);
        assert!(cache.lookup.values().all(|d| !d.is_self_pair()));
    }

    #[test]
    fn test_single_tie_keeps_first() {
        let cache =
            SingleLookupDistanceCache::from_distances(vec![pd("s", "a", 10.0), pd("s", "b", 10.0)]);
        assert_eq!(cache.get("s").unwrap().second_id(), "a");
    }

    #[test]
    fn test_multi_reverses_sorts_and_truncates() {
        let cache = MultiLookupDistanceCache::from_distances(
            vec![
                pd("s1", "s1", 0.0),
                pd("s1", "s3", 30.0),
                pd("s1", "s2", 10.0),
                pd("s1", "s4", 20.0),
            ],
            2,
        );
        let entries = cache.get("s1");
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].pair_ids, ("s2".into(), "s1".into()));
        assert_eq!(entries[1].pair_ids, ("s4".into(), "s1".into()));
        assert!(cache.get("missing").is_empty());
    }

    #[test]
    fn test_document_shape() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("multi.json");
        MultiLookupDistanceCache::from_distances(vec![pd("a", "b", 1.0)], 3)
            .to_json(&path)
            .unwrap();
        let raw: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["cache_type"], "one-to-many");
        assert_eq!(raw["n_neighbors"], 3);
        assert_eq!(raw["lookup"]["a"][0]["pair_ids"][0], "b");
    }

    #[test]
    fn test_wrong_cache_type_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("single.json");
        SingleLookupDistanceCache::from_distances(vec![pd("a", "b", 1.0)])
            .to_json(&path)
            .unwrap();
        let err = MultiLookupDistanceCache::from_json(&path).unwrap_err();
        assert!(matches!(err, GcmError::Cache(_)));
    }

    #[test]
    fn test_missing_file_is_cache_miss() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = GreedyConnectCache::load(dir.path().join("nope")).unwrap();
        assert!(loaded.connected_cache.is_none());
        assert!(loaded.unconnected_cache.is_none());
    }
}
