//! # sqlx-sqlite-lifecycle
//!
//! Opens an application's SQLite database, brings its schema to the version
//! the application expects, and closes it cleanly.
//!
//! ```no_run
//! use sqlx_sqlite_lifecycle::{Builder, MigrationRegistry, MigrationStep};
//! use std::sync::Arc;
//!
//! # async fn example() -> sqlx_sqlite_lifecycle::Result<()> {
//! let registry = Arc::new(MigrationRegistry::new([
//!    MigrationStep::new(1).forward_sql("CREATE TABLE polls (id TEXT PRIMARY KEY, title TEXT NOT NULL)"),
//!    MigrationStep::new(2)
//!       .forward_sql("CREATE TABLE votes (poll_id TEXT NOT NULL REFERENCES polls (id), voter TEXT NOT NULL)")
//!       .backward_sql("DROP TABLE votes"),
//! ])?);
//!
//! let db = Builder::new(registry).app_name("polls").open().await?;
//!
//! db.tx(|tx| {
//!    Box::pin(async move {
//!       sqlx::query("INSERT INTO polls (id, title) VALUES ('p1', 'Lunch?')")
//!          .execute(&mut *tx)
//!          .await?;
//!       Ok::<_, sqlx_sqlite_lifecycle::Error>(())
//!    })
//! })
//! .await?;
//!
//! db.close().await?;
//! # Ok(())
//! # }
//! ```

mod error;
mod resolve;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::future::BoxFuture;
use sqlx::SqliteConnection;
use sqlx_sqlite_conn_mgr::SqliteDatabase;
use sqlx_sqlite_schema::{MigrationEngine, run_in_transaction};
use tracing::{debug, info, warn};

pub use error::{Error, Result};
pub use resolve::resolve_database_path;

// Re-export the building blocks callers need to describe their schema
pub use sqlx_sqlite_conn_mgr::SqliteDatabaseConfig;
pub use sqlx_sqlite_schema::{
   Direction, MigrationRegistry, MigrationStep, Operation, StepFuture,
};

/// Default database file name inside the application's config directory.
pub const DEFAULT_FILE_NAME: &str = "storage.db";

/// Configures and opens a [`Database`].
///
/// Either [`path`](Builder::path) or [`app_name`](Builder::app_name) must be
/// set. An explicit path wins over the app name.
#[derive(Debug)]
pub struct Builder {
   registry: Arc<MigrationRegistry>,
   target_version: Option<u32>,
   path: Option<PathBuf>,
   app_name: Option<String>,
   file_name: String,
   config: Option<SqliteDatabaseConfig>,
}

impl Builder {
   pub fn new(registry: Arc<MigrationRegistry>) -> Self {
      Self {
         registry,
         target_version: None,
         path: None,
         app_name: None,
         file_name: DEFAULT_FILE_NAME.to_string(),
         config: None,
      }
   }

   /// Schema version the database is brought to on open.
   ///
   /// Defaults to the latest version in the registry.
   pub fn target_version(mut self, version: u32) -> Self {
      self.target_version = Some(version);
      self
   }

   /// Open the database at an explicit path (or `:memory:`).
   pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
      self.path = Some(path.into());
      self
   }

   /// Store the database under the user's config directory, in a folder
   /// named after the application.
   pub fn app_name(mut self, app_name: impl Into<String>) -> Self {
      self.app_name = Some(app_name.into());
      self
   }

   /// File name used with [`app_name`](Builder::app_name). Defaults to
   /// [`DEFAULT_FILE_NAME`].
   pub fn file_name(mut self, file_name: impl Into<String>) -> Self {
      self.file_name = file_name.into();
      self
   }

   pub fn config(mut self, config: SqliteDatabaseConfig) -> Self {
      self.config = Some(config);
      self
   }

   /// Open the database and bring its schema to the target version.
   ///
   /// The stored version is read and, if it differs from the target, every
   /// step in between is applied, all inside one transaction. The configured
   /// pragmas are applied afterwards. If anything fails once the file is
   /// open, the database is closed again before the error is returned and
   /// the stored schema is left as it was.
   ///
   /// # Errors
   ///
   /// - [`Error::Schema`] if the registry has a gap, or a migration fails
   /// - [`Error::InvalidPath`] if no location was configured
   /// - [`Error::ConnectionManager`] if the file is already open in this
   ///   process, cannot be opened, or a pragma is invalid
   pub async fn open(self) -> Result<Database> {
      self.registry.validate()?;

      let target_version = self
         .target_version
         .unwrap_or_else(|| self.registry.latest_version());

      let path = match (self.path, self.app_name) {
         (Some(path), _) => path,
         (None, Some(app_name)) => resolve_database_path(&app_name, &self.file_name)?,
         (None, None) => {
            return Err(Error::InvalidPath(
               "either a path or an app name is required".to_string(),
            ));
         }
      };

      let db = SqliteDatabase::connect(&path, self.config).await?;
      let database = Database {
         db,
         engine: MigrationEngine::new(self.registry),
         target_version,
      };

      if let Err(e) = database.initialize().await {
         if let Err(close_err) = database.db.close().await {
            warn!(error = %close_err, "failed to close database after open error");
         }
         return Err(e);
      }

      info!(
         path = %database.path().display(),
         version = target_version,
         "database opened"
      );
      Ok(database)
   }
}

/// An open database whose schema is at the target version.
///
/// All access goes through one connection; [`tx`](Database::tx) calls from
/// concurrent tasks wait for each other.
#[derive(Debug)]
pub struct Database {
   db: SqliteDatabase,
   engine: MigrationEngine,
   target_version: u32,
}

impl Database {
   async fn initialize(&self) -> Result<()> {
      self.migrate_to(self.target_version).await?;
      self.db.apply_pragmas().await?;
      Ok(())
   }

   /// Run `f` inside a transaction on the database connection.
   ///
   /// Commits when `f` returns `Ok`, rolls back when it returns `Err`. A
   /// failed rollback is reported as [`Error::TransactionRollbackFailed`].
   pub async fn tx<T, F>(&self, f: F) -> Result<T>
   where
      F: for<'t> FnOnce(&'t mut SqliteConnection) -> BoxFuture<'t, Result<T>>,
   {
      let mut conn = self.db.acquire_writer().await?;
      run_in_transaction(&mut conn, f).await
   }

   /// The schema version currently stored in the database.
   pub async fn current_version(&self) -> Result<u32> {
      let mut conn = self.db.acquire_writer().await?;
      Ok(self.engine.current_version(&mut conn).await?)
   }

   /// Move the schema up or down to `version` in one transaction.
   ///
   /// Does nothing when the database is already at `version`. On failure the
   /// transaction is rolled back and the stored version is unchanged.
   pub async fn migrate_to(&self, version: u32) -> Result<()> {
      let engine = self.engine.clone();
      let mut conn = self.db.acquire_writer().await?;

      run_in_transaction(&mut conn, move |tx| {
         Box::pin(async move {
            let current = engine.current_version(tx).await?;
            if current == version {
               debug!(version, "database schema already at requested version");
            } else {
               engine.apply_migrations(tx, current, version).await?;
            }
            Ok::<_, Error>(())
         })
      })
      .await
   }

   /// The version this database was opened at.
   pub fn target_version(&self) -> u32 {
      self.target_version
   }

   pub fn path(&self) -> &Path {
      self.db.path()
   }

   /// Optimize and close the database, releasing the file for other opens.
   pub async fn close(self) -> Result<()> {
      self.db.close().await?;
      info!(path = %self.db.path().display(), "database closed");
      Ok(())
   }

   /// Close the database and delete its files.
   pub async fn remove(self) -> Result<()> {
      self.db.remove().await?;
      info!(path = %self.db.path().display(), "database removed");
      Ok(())
   }
}
