use super::util::{load_fiber_nodes, load_schools};
use anyhow::{Context, Result};
use gcm_algo::fiber_network_inputs;
use gcm_core::{GreedyConnectCache, NearestNeighborConf};
use std::path::Path;

pub fn handle_build(schools: &Path, fiber: &Path, out_dir: &Path, n_neighbors: usize) -> Result<()> {
    anyhow::ensure!(n_neighbors > 0, "--n-neighbors must be at least 1");
    let schools = load_schools(schools)?;
    schools.validate()?;
    let fiber_nodes = load_fiber_nodes(fiber)?;
    fiber_nodes.validate()?;

    let (unconnected, connected) = fiber_network_inputs(&schools, &fiber_nodes.coordinates);
    let conf = NearestNeighborConf::defaults().with_neighbors(n_neighbors);
    let cache = GreedyConnectCache::build(&unconnected, &connected, &conf);
    cache
        .save(out_dir)
        .with_context(|| format!("saving caches to {}", out_dir.display()))?;

    println!(
        "Cached {} school-to-backbone and {} school-to-school lookups in {}",
        cache.connected_cache.as_ref().map_or(0, |c| c.len()),
        cache.unconnected_cache.as_ref().map_or(0, |c| c.len()),
        out_dir.display()
    );
    Ok(())
}
