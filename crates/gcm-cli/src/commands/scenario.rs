use super::util::{load_config, load_fiber_nodes, load_schools, load_towers, print_summary, write_json};
use anyhow::{Context, Result};
use gcm_algo::{MinimumCostScenario, ScenarioData, ScenarioSummary};
use gcm_core::GreedyConnectCache;
use std::path::Path;

pub struct RunArgs<'a> {
    pub schools: &'a Path,
    pub fiber: Option<&'a Path>,
    pub towers: Option<&'a Path>,
    pub config: Option<&'a Path>,
    pub out: &'a Path,
    pub cache_dir: Option<&'a Path>,
}

pub fn handle_run(args: RunArgs<'_>) -> Result<()> {
    let config = load_config(args.config)?;
    let data = ScenarioData::new(
        load_schools(args.schools)?,
        args.fiber.map(load_fiber_nodes).transpose()?.unwrap_or_default(),
        args.towers.map(load_towers).transpose()?.unwrap_or_default(),
    );

    let mut scenario = MinimumCostScenario::new(config, data).context("invalid scenario")?;
    if let Some(dir) = args.cache_dir {
        let cache = GreedyConnectCache::load(dir).with_context(|| format!("loading caches from {}", dir.display()))?;
        scenario = scenario.with_greedy_cache(cache);
    }

    let output = scenario.run().context("running scenario")?;
    write_json(args.out, &output)?;
    tracing::info!(path = %args.out.display(), "wrote scenario output");

    print_summary(&ScenarioSummary::from_output(&output))
}
