use anyhow::{Context, Result};
use gcm_cli::ConfigFormat;
use gcm_core::ScenarioConfig;
use std::fs;
use std::path::Path;

pub fn handle_defaults(format: ConfigFormat, out: Option<&Path>) -> Result<()> {
    let config = ScenarioConfig::defaults();
    let text = match format {
        ConfigFormat::Json => serde_json::to_string_pretty(&config).context("serializing defaults to JSON")?,
        ConfigFormat::Toml => toml::to_string_pretty(&config).context("serializing defaults to TOML")?,
    };
    match out {
        Some(path) => {
            fs::write(path, text).with_context(|| format!("writing {}", path.display()))?;
            tracing::info!(path = %path.display(), "wrote default configuration");
        }
        None => println!("{text}"),
    }
    Ok(())
}
