//! Configuration for the SQLite database connection

use serde::{Deserialize, Serialize};

/// Configuration for SqliteDatabase
///
/// # Examples
///
/// ```
/// use sqlx_sqlite_conn_mgr::SqliteDatabaseConfig;
///
/// // Use defaults
/// let config = SqliteDatabaseConfig::default();
///
/// // Override just one field
/// let config = SqliteDatabaseConfig {
///     busy_timeout_secs: 10,
///     ..Default::default()
/// };
///
/// // Keep the rollback journal instead of switching to WAL
/// let config = SqliteDatabaseConfig {
///     pragmas: vec![("foreign_keys".into(), "ON".into())],
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SqliteDatabaseConfig {
   /// How long a statement waits on a locked database before failing (in seconds)
   ///
   /// Default: 5
   pub busy_timeout_secs: u64,

   /// Pragmas applied by `apply_pragmas()`, in order, as `(name, value)` pairs
   ///
   /// These are applied once schema migration has finished, since some of them
   /// (`journal_mode`, `foreign_keys`) cannot change inside a transaction.
   /// Foreign key enforcement stays off until then.
   ///
   /// Default: `journal_mode = WAL`, `synchronous = NORMAL`, `foreign_keys = ON`
   pub pragmas: Vec<(String, String)>,

   /// Run `PRAGMA optimize` when the database is closed
   ///
   /// Default: true
   pub optimize_on_close: bool,
}

impl Default for SqliteDatabaseConfig {
   fn default() -> Self {
      Self {
         busy_timeout_secs: 5,
         pragmas: vec![
            ("journal_mode".to_string(), "WAL".to_string()),
            // https://www.sqlite.org/wal.html#performance_considerations
            ("synchronous".to_string(), "NORMAL".to_string()),
            ("foreign_keys".to_string(), "ON".to_string()),
         ],
         optimize_on_close: true,
      }
   }
}
