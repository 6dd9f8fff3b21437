//! Default locations for the config file and the state snapshot.

use std::path::{Path, PathBuf};

use {
    anyhow::{Context, Result},
    directories::BaseDirs,
    tracing::info,
};

const DEFAULT_CONFIG_NAME: &str = ".napcron.yaml";

/// Stub written when bootstrapping a fresh default config: one empty
/// cadence section for the user to fill in.
const DEFAULT_CONFIG_STUB: &str = "daily:\n";

/// `~/.napcron.yaml`.
pub fn default_config_path() -> Result<PathBuf> {
    let dirs = BaseDirs::new().context("cannot determine home directory")?;
    Ok(dirs.home_dir().join(DEFAULT_CONFIG_NAME))
}

/// Create the default config with a stub section if it does not exist
/// yet, so a bare first invocation succeeds as a no-op.
pub fn ensure_default_config(path: &Path) -> Result<()> {
    if path.exists() {
        return Ok(());
    }
    std::fs::write(path, DEFAULT_CONFIG_STUB)
        .with_context(|| format!("failed to create {}", path.display()))?;
    info!(path = %path.display(), "created default config");
    Ok(())
}

/// Default state path: `<state dir>/napcron/<config stem>.state.json`,
/// named after the config so multiple configs keep separate state.
///
/// Linux has a real state directory (`~/.local/state`); platforms
/// without one fall back to the data directory.
pub fn default_state_path(config_path: &Path) -> Result<PathBuf> {
    let stem = config_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("napcron");
    let dirs = BaseDirs::new().context("cannot determine home directory")?;
    let base = dirs
        .state_dir()
        .unwrap_or_else(|| dirs.data_dir())
        .to_path_buf();
    Ok(base.join("napcron").join(format!("{stem}.state.json")))
}
