//! Show or write the effective configuration.

use std::path::{Path, PathBuf};

use citypulse_common::config::{config_file_path, AppConfig};

pub fn run(config: &AppConfig, path: Option<&Path>, save: bool) -> anyhow::Result<()> {
    if !save {
        println!("{}", serde_json::to_string_pretty(config)?);
        return Ok(());
    }

    let target: PathBuf = path.map(Path::to_path_buf).unwrap_or_else(config_file_path);
    config
        .save_to(&target)
        .map_err(|e| anyhow::anyhow!("Failed to write {}: {e}", target.display()))?;
    println!("Configuration written to {}", target.display());
    Ok(())
}
