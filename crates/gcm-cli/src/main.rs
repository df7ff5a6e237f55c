use clap::Parser;
use gcm_cli::cli::{CacheCommands, Cli, Commands, ConfigCommands, SatCommands, ScenarioCommands};
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::FmtSubscriber;

mod commands;

use commands::util::configure_threads;

fn run(cli: &Cli) -> anyhow::Result<()> {
    match &cli.command {
        Commands::Scenario { command } => match command {
            ScenarioCommands::Run {
                schools,
                fiber,
                towers,
                config,
                out,
                cache_dir,
            } => commands::scenario::handle_run(commands::scenario::RunArgs {
                schools,
                fiber: fiber.as_deref(),
                towers: towers.as_deref(),
                config: config.as_deref(),
                out,
                cache_dir: cache_dir.as_deref(),
            }),
        },
        Commands::Cache { command } => match command {
            CacheCommands::Build {
                schools,
                fiber,
                out_dir,
                n_neighbors,
            } => commands::cache::handle_build(schools, fiber, out_dir, *n_neighbors),
        },
        Commands::Sat { command } => match command {
            SatCommands::Solve {
                schools,
                fiber,
                out,
                budget,
                time_limit,
                workers,
                max_length_m,
                cost_per_km,
            } => commands::sat::handle_solve(commands::sat::SolveArgs {
                schools,
                fiber,
                out,
                budget: *budget,
                time_limit: *time_limit,
                workers: *workers,
                max_length_m: *max_length_m,
                cost_per_km: *cost_per_km,
            }),
        },
        Commands::Config { command } => match command {
            ConfigCommands::Defaults { format, out } => commands::config::handle_defaults(*format, out.as_deref()),
        },
        Commands::Completions { shell, out } => commands::completions::handle(*shell, out.as_deref()),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // logs go to stderr so JSON written to stdout stays clean
    let subscriber = FmtSubscriber::builder()
        .with_max_level(cli.log_level)
        .with_writer(std::io::stderr)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("a global tracing subscriber was already installed");
    }

    configure_threads(&cli.threads);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
