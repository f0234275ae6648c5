use std::fs::create_dir_all;
use std::path::{Path, PathBuf};

use crate::Error;

/// Resolve an application's database file inside the user's config directory.
///
/// The file lives at `<config_dir>/<app_name>/<file_name>` (e.g.
/// `~/.config/<app_name>/storage.db` on Linux). The application directory is
/// created if it doesn't exist; the file itself is created on connect.
pub fn resolve_database_path(app_name: &str, file_name: &str) -> Result<PathBuf, Error> {
   let config_dir = dirs::config_dir()
      .ok_or_else(|| Error::InvalidPath("No config directory found".to_string()))?;

   resolve_in(&config_dir, app_name, file_name)
}

fn resolve_in(config_dir: &Path, app_name: &str, file_name: &str) -> Result<PathBuf, Error> {
   for (what, part) in [("app name", app_name), ("file name", file_name)] {
      if !is_single_component(part) {
         return Err(Error::InvalidPath(format!(
            "{what} '{part}' must be a single non-empty path component"
         )));
      }
   }

   let app_path = config_dir.join(app_name);
   create_dir_all(&app_path)?;

   Ok(app_path.join(file_name))
}

fn is_single_component(part: &str) -> bool {
   !part.is_empty()
      && part != "."
      && part != ".."
      && !part.contains(['/', '\\'])
}
