//! Process-wide record of database files with an open connection

use crate::Result;
use crate::error::Error;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{LazyLock, Mutex, MutexGuard};
use tracing::debug;

static OPEN_PATHS: LazyLock<Mutex<HashSet<PathBuf>>> =
   LazyLock::new(|| Mutex::new(HashSet::new()));

fn open_paths() -> MutexGuard<'static, HashSet<PathBuf>> {
   // The set is never left half-updated, so a poisoned lock is still usable
   OPEN_PATHS.lock().unwrap_or_else(|e| e.into_inner())
}

/// Returns true for SQLite's in-memory database names.
pub(crate) fn is_memory_database(path: &Path) -> bool {
   let path = path.to_string_lossy();
   path == ":memory:" || path.starts_with("file::memory:")
}

/// Marks a path as open until dropped
#[derive(Debug)]
pub(crate) struct Registration {
   path: PathBuf,
}

impl Drop for Registration {
   fn drop(&mut self) {
      if open_paths().remove(&self.path) {
         debug!(path = %self.path.display(), "released database path");
      }
   }
}

/// Claim `path` for this process.
///
/// `path` must already be canonical. Fails with [`Error::AlreadyOpen`] if
/// another live registration holds it.
pub(crate) fn register(path: &Path) -> Result<Registration> {
   if !open_paths().insert(path.to_path_buf()) {
      return Err(Error::AlreadyOpen(path.to_path_buf()));
   }

   Ok(Registration {
      path: path.to_path_buf(),
   })
}
