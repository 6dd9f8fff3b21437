//! Durable task state: one JSON snapshot, loaded whole, saved atomically.

use std::path::{Path, PathBuf};

use {tokio::fs, tracing::warn};

use crate::{
    error::{Error, Result},
    types::StateFile,
};

/// Owns the state file path and the load/save protocol around it.
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the snapshot. A missing or corrupt file yields an empty state,
    /// never an error: prior history is useful but not load-bearing.
    pub async fn load(&self) -> StateFile {
        let raw = match fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(_) => return StateFile::default(),
        };
        match serde_json::from_str(&raw) {
            Ok(state) => state,
            Err(error) => {
                warn!(path = %self.path.display(), %error, "state file unreadable, starting fresh");
                StateFile::default()
            }
        }
    }

    /// Atomic save: write a sibling temp file, then rename over the
    /// target, so a crash mid-write leaves the previous snapshot intact
    /// and a concurrent reader never sees a partial file.
    pub async fn save(&self, state: &StateFile) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::context(format!("create {}", parent.display()), e))?;
        }
        // BTreeMap keys keep the output sorted and diffable.
        let json = serde_json::to_string_pretty(state)?;
        let tmp = sibling(&self.path, ".tmp");
        fs::write(&tmp, json.as_bytes())
            .await
            .map_err(|e| Error::context(format!("write {}", tmp.display()), e))?;
        fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| Error::context(format!("replace {}", self.path.display()), e))?;
        Ok(())
    }
}

/// `path` with `suffix` appended to the full file name (keeps the original
/// extension visible, e.g. `state.json.tmp`).
pub(crate) fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}
