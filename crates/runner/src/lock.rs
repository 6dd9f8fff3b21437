//! Single-instance lock: an exclusively-created marker file next to the
//! state snapshot.
//!
//! The marker holds the owning PID for diagnostics only; liveness is
//! judged purely by file age. Contention is a normal outcome, not an
//! error: the losing invocation bows out with a success exit.

use std::{
    fs, io,
    io::Write,
    path::{Path, PathBuf},
    time::{Duration, SystemTime},
};

use tracing::{debug, warn};

/// Markers at least this old are assumed to be leftovers of a crashed run
/// and are broken.
const STALE_AFTER: Duration = Duration::from_secs(2 * 60 * 60);

const LOCK_SUFFIX: &str = ".lock";

/// Holds the lock while alive. Dropping it removes the marker, so every
/// termination path releases.
#[derive(Debug)]
pub struct LockFile {
    path: PathBuf,
    released: bool,
}

impl LockFile {
    /// Try to take the lock guarding `state_path`.
    ///
    /// `Ok(None)` means another live instance holds it. A marker older
    /// than [`STALE_AFTER`] is removed and creation retried once. Real
    /// I/O failures (unwritable directory) propagate; they are setup
    /// errors the caller should treat as fatal.
    pub fn acquire(state_path: &Path) -> io::Result<Option<LockFile>> {
        let path = crate::state::sibling(state_path, LOCK_SUFFIX);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        if try_create(&path)? {
            return Ok(Some(LockFile {
                path,
                released: false,
            }));
        }

        if is_stale(&path) {
            warn!(path = %path.display(), "breaking stale lock");
            let _ = fs::remove_file(&path);
            if try_create(&path)? {
                return Ok(Some(LockFile {
                    path,
                    released: false,
                }));
            }
        }

        debug!(path = %path.display(), "lock held by another instance");
        Ok(None)
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the marker now instead of waiting for drop.
    pub fn release(mut self) {
        self.remove();
    }

    fn remove(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if let Err(error) = fs::remove_file(&self.path) {
            if error.kind() != io::ErrorKind::NotFound {
                warn!(path = %self.path.display(), %error, "failed to remove lock");
            }
        }
    }
}

impl Drop for LockFile {
    fn drop(&mut self) {
        self.remove();
    }
}

/// Exclusive create: fails if the marker exists, with no window between
/// the existence check and the write.
fn try_create(path: &Path) -> io::Result<bool> {
    match fs::OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(mut file) => {
            let _ = write!(file, "{}", std::process::id());
            Ok(true)
        }
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(e),
    }
}

fn is_stale(path: &Path) -> bool {
    let Ok(metadata) = fs::metadata(path) else {
        return false;
    };
    let Ok(modified) = metadata.modified() else {
        return false;
    };
    SystemTime::now()
        .duration_since(modified)
        .map(|age| age >= STALE_AFTER)
        .unwrap_or(false)
}
