use anyhow::{anyhow, bail, Context, Result};
use gcm_algo::ScenarioSummary;
use gcm_core::{
    CellTower, CellTowerTable, GigaSchool, GigaSchoolTable, ScenarioConfig, UniqueCoordinate,
    UniqueCoordinateTable,
};
use rayon::ThreadPoolBuilder;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::Path;
use tabwriter::TabWriter;

pub fn configure_threads(spec: &str) {
    let count = if spec.eq_ignore_ascii_case("auto") {
        num_cpus::get()
    } else {
        spec.parse().unwrap_or_else(|_| num_cpus::get())
    };
    let _ = ThreadPoolBuilder::new().num_threads(count).build_global();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TableFormat {
    Json,
    Csv,
}

fn table_format(path: &Path) -> Result<TableFormat> {
    match path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase).as_deref() {
        Some("json") => Ok(TableFormat::Json),
        Some("csv") => Ok(TableFormat::Csv),
        _ => bail!("unsupported table format for {} (expected .json or .csv)", path.display()),
    }
}

/// Rows of a JSON array or a headed CSV file.
fn read_rows<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    match table_format(path)? {
        TableFormat::Json => {
            let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
            serde_json::from_reader(BufReader::new(file)).with_context(|| format!("parsing {}", path.display()))
        }
        TableFormat::Csv => {
            let mut reader = csv::Reader::from_path(path).with_context(|| format!("opening {}", path.display()))?;
            reader
                .deserialize()
                .enumerate()
                .map(|(i, row)| row.with_context(|| format!("{}: row {}", path.display(), i + 1)))
                .collect()
        }
    }
}

pub fn load_schools(path: &Path) -> Result<GigaSchoolTable> {
    let schools: Vec<GigaSchool> = read_rows(path)?;
    tracing::info!(path = %path.display(), rows = schools.len(), "loaded schools");
    Ok(GigaSchoolTable::new(schools))
}

#[derive(Debug, Deserialize)]
struct FiberNodeRow {
    #[serde(alias = "coordinate_id", alias = "fiber_id")]
    id: String,
    lat: f64,
    lon: f64,
}

pub fn load_fiber_nodes(path: &Path) -> Result<UniqueCoordinateTable> {
    let rows: Vec<FiberNodeRow> = read_rows(path)?;
    tracing::info!(path = %path.display(), rows = rows.len(), "loaded fiber nodes");
    Ok(UniqueCoordinateTable::new(
        rows.into_iter().map(|r| UniqueCoordinate::new(r.id, r.lat, r.lon)).collect(),
    ))
}

/// CSV form of a tower; `technologies` is a `;`-separated list.
#[derive(Debug, Deserialize)]
struct TowerRow {
    tower_id: String,
    lat: f64,
    lon: f64,
    #[serde(default)]
    height_m: Option<f64>,
    #[serde(default)]
    technologies: String,
}

impl From<TowerRow> for CellTower {
    fn from(row: TowerRow) -> Self {
        CellTower {
            tower_id: row.tower_id,
            lat: row.lat,
            lon: row.lon,
            height_m: row.height_m.unwrap_or_default(),
            technologies: row
                .technologies
                .split(';')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(String::from)
                .collect(),
        }
    }
}

pub fn load_towers(path: &Path) -> Result<CellTowerTable> {
    let towers: Vec<CellTower> = match table_format(path)? {
        TableFormat::Json => read_rows(path)?,
        TableFormat::Csv => read_rows::<TowerRow>(path)?.into_iter().map(CellTower::from).collect(),
    };
    tracing::info!(path = %path.display(), rows = towers.len(), "loaded cell towers");
    Ok(CellTowerTable::new(towers))
}

pub fn load_config(path: Option<&Path>) -> Result<ScenarioConfig> {
    let Some(path) = path else {
        return Ok(ScenarioConfig::defaults());
    };
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let config = match path.extension().and_then(|e| e.to_str()) {
        Some("toml") => toml::from_str(&text).with_context(|| format!("parsing {}", path.display()))?,
        Some("json") => serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?,
        _ => bail!("unsupported config format for {} (expected .json or .toml)", path.display()),
    };
    Ok(config)
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
    }
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value)
        .map_err(|err| anyhow!("serializing {}: {err}", path.display()))?;
    writer.flush()?;
    Ok(())
}

pub fn print_summary(summary: &ScenarioSummary) -> Result<()> {
    let mut writer = TabWriter::new(io::stdout());
    writeln!(writer, "TECHNOLOGY\tSCHOOLS")?;
    for (technology, count) in &summary.by_technology {
        writeln!(writer, "{technology}\t{count}")?;
    }
    writeln!(writer, "infeasible\t{}", summary.infeasible)?;
    writeln!(writer, "total\t{}", summary.schools)?;
    writer.flush()?;
    println!("Total capex: {:.2}", summary.total_capex);
    println!("Total opex:  {:.2}", summary.total_opex);
    if let Some(status) = summary.sat_status {
        println!("Fiber solver: {status:?}");
    }
    Ok(())
}
