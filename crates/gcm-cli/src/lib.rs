pub mod cli;

pub use cli::{build_cli_command, CacheCommands, Cli, Commands, ConfigCommands, ConfigFormat, SatCommands, ScenarioCommands};
