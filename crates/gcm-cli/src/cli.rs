use clap::{CommandFactory, Parser, Subcommand, ValueEnum, ValueHint};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "gcm", author, version, about = "School connectivity cost model", long_about = None)]
pub struct Cli {
    /// Set the logging level
    #[arg(long, default_value = "info")]
    pub log_level: tracing::Level,

    /// Worker threads for distance computation ("auto" uses every core)
    #[arg(long, default_value = "auto")]
    pub threads: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Cost every technology and pick one per school
    Scenario {
        #[command(subcommand)]
        command: ScenarioCommands,
    },
    /// Precompute distance caches for the greedy fiber connector
    Cache {
        #[command(subcommand)]
        command: CacheCommands,
    },
    /// Exact fiber network design
    Sat {
        #[command(subcommand)]
        command: SatCommands,
    },
    /// Scenario configuration helpers
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Generate shell completion scripts
    Completions {
        /// Shell type
        #[arg(value_enum)]
        shell: Shell,
        /// Write output to a file instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
pub enum ScenarioCommands {
    /// Run a minimum-cost scenario
    Run {
        /// School table (.json or .csv)
        #[arg(long, value_hint = ValueHint::FilePath)]
        schools: PathBuf,
        /// Fiber node table (.json or .csv)
        #[arg(long, value_hint = ValueHint::FilePath)]
        fiber: Option<PathBuf>,
        /// Cell tower table (.json or .csv)
        #[arg(long, value_hint = ValueHint::FilePath)]
        towers: Option<PathBuf>,
        /// Scenario configuration (.json or .toml); documented defaults when omitted
        #[arg(long, value_hint = ValueHint::FilePath)]
        config: Option<PathBuf>,
        /// Output JSON file
        #[arg(long, value_hint = ValueHint::FilePath)]
        out: PathBuf,
        /// Directory holding greedy connect caches
        #[arg(long, value_hint = ValueHint::DirPath)]
        cache_dir: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
pub enum CacheCommands {
    /// Build and save the greedy connect caches
    Build {
        #[arg(long, value_hint = ValueHint::FilePath)]
        schools: PathBuf,
        #[arg(long, value_hint = ValueHint::FilePath)]
        fiber: PathBuf,
        #[arg(long, value_hint = ValueHint::DirPath)]
        out_dir: PathBuf,
        /// Nearest other schools kept per school
        #[arg(long, default_value_t = 10)]
        n_neighbors: usize,
    },
}

#[derive(Subcommand, Debug)]
pub enum SatCommands {
    /// Design a fiber network with the exact solver
    Solve {
        #[arg(long, value_hint = ValueHint::FilePath)]
        schools: PathBuf,
        #[arg(long, value_hint = ValueHint::FilePath)]
        fiber: PathBuf,
        /// Output JSON file
        #[arg(long, value_hint = ValueHint::FilePath)]
        out: PathBuf,
        /// Total budget in USD; connects every reachable school when omitted
        #[arg(long)]
        budget: Option<f64>,
        /// Wall-clock limit per solve, in seconds
        #[arg(long, default_value_t = 600.0)]
        time_limit: f64,
        /// Solver worker threads
        #[arg(long, default_value_t = 4)]
        workers: usize,
        /// Longest cable considered between two nodes
        #[arg(long, default_value_t = 20_000.0)]
        max_length_m: f64,
        /// Cable cost in USD per km
        #[arg(long, default_value_t = 8_900.0)]
        cost_per_km: f64,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print the documented default scenario configuration
    Defaults {
        #[arg(long, value_enum, default_value_t = ConfigFormat::Json)]
        format: ConfigFormat,
        /// Write to a file instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Toml,
}

pub fn build_cli_command() -> clap::Command {
    Cli::command()
}
