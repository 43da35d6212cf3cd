use crate::organizer::Config;
use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

const APP_DIR: &str = "triage";
const LATEST_CONFIG_FILE: &str = "latest-config.json";

/// The most recently loaded configuration is kept in the per-user config
/// directory so it can be offered again at startup. A convenience only:
/// the organizer never depends on it.
fn latest_config_path() -> Result<PathBuf> {
    let base = dirs::config_dir().context("no user configuration directory")?;
    Ok(base.join(APP_DIR).join(LATEST_CONFIG_FILE))
}

pub fn save_latest(config: &Config) -> Result<()> {
    let path = latest_config_path()?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(config)?;
    fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

pub fn load_latest() -> Result<Config> {
    let path = latest_config_path()?;
    let json = fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
    Ok(serde_json::from_str(&json)?)
}
