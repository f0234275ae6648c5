//! SQLite database backed by a single read-write connection

use crate::Result;
use crate::config::SqliteDatabaseConfig;
use crate::error::Error;
use crate::guard::ConnectionGuard;
use crate::registry::{Registration, is_memory_database, register};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

/// SQLite database holding exactly one read-write connection.
///
/// Every query, transaction, and migration goes through [`acquire_writer()`],
/// so all access to the file from this process is serialized. Each database
/// file may be opened at most once per process; a second `connect()` for the
/// same file fails with [`Error::AlreadyOpen`] until the first is closed or
/// dropped.
///
/// Connections start with foreign key enforcement off. Call
/// [`apply_pragmas()`] once the schema is in place to apply the configured
/// pragmas.
///
/// [`acquire_writer()`]: SqliteDatabase::acquire_writer
/// [`apply_pragmas()`]: SqliteDatabase::apply_pragmas
///
/// # Example
///
/// ```no_run
/// use sqlx_sqlite_conn_mgr::SqliteDatabase;
///
/// # async fn example() -> Result<(), sqlx_sqlite_conn_mgr::Error> {
/// let db = SqliteDatabase::connect("test.db", None).await?;
/// db.apply_pragmas().await?;
///
/// let mut conn = db.acquire_writer().await?;
/// sqlx::query("INSERT INTO users (name) VALUES (?)")
///     .bind("Alice")
///     .execute(&mut *conn)
///     .await?;
/// drop(conn);
///
/// db.close().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct SqliteDatabase {
   /// Pool with max_connections=1 that never expires its connection
   conn: Pool<Sqlite>,

   config: SqliteDatabaseConfig,

   /// Marks database as closed to prevent further operations
   closed: AtomicBool,

   /// Canonical path to the database file, or `:memory:`
   path: PathBuf,

   /// Held while open; `None` for in-memory databases and after close
   registration: Mutex<Option<Registration>>,
}

impl SqliteDatabase {
   /// Connect to a SQLite database
   ///
   /// The file and its parent directories are created if they don't exist.
   /// The connection is opened eagerly, so an unreadable file fails here
   /// rather than on first use.
   ///
   /// # Arguments
   ///
   /// * `path` - Path to the SQLite database file, or `:memory:`
   /// * `custom_config` - Optional custom configuration. Pass `None` to use
   ///   defaults (5 second busy timeout, WAL journal, foreign keys on,
   ///   optimize on close).
   ///
   /// # Errors
   ///
   /// - [`Error::AlreadyOpen`] if the file is already open in this process
   /// - [`Error::Io`] if the path is empty or the file cannot be created
   /// - [`Error::Sqlx`] if SQLite cannot open the file
   pub async fn connect(
      path: impl AsRef<Path>,
      custom_config: Option<SqliteDatabaseConfig>,
   ) -> Result<Self> {
      let config = custom_config.unwrap_or_default();
      let path = path.as_ref();

      if path.as_os_str().is_empty() {
         return Err(Error::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "Database path cannot be empty",
         )));
      }

      let (path, registration) = if is_memory_database(path) {
         (path.to_path_buf(), None)
      } else {
         if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
         }

         // Create the file up front so the path can be canonicalized and
         // two spellings of the same file share one registry entry
         std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;

         let path = std::fs::canonicalize(path)?;
         let registration = register(&path)?;
         (path, Some(registration))
      };

      let options = if registration.is_some() {
         SqliteConnectOptions::new().filename(&path)
      } else {
         SqliteConnectOptions::from_str("sqlite::memory:")?
      };

      let options = options
         .create_if_missing(true)
         .read_only(false)
         .foreign_keys(false)
         .busy_timeout(Duration::from_secs(config.busy_timeout_secs));

      // The single connection lives as long as the pool so in-memory
      // databases keep their contents and session pragmas persist
      let conn = SqlitePoolOptions::new()
         .max_connections(1)
         .min_connections(1)
         .idle_timeout(None)
         .max_lifetime(None)
         .connect_with(options)
         .await?;

      debug!(path = %path.display(), "opened database connection");

      Ok(Self {
         conn,
         config,
         closed: AtomicBool::new(false),
         path,
         registration: Mutex::new(registration),
      })
   }

   /// Path to the database file
   ///
   /// Canonicalized for files on disk; `:memory:` databases return the name
   /// they were opened with.
   pub fn path(&self) -> &Path {
      &self.path
   }

   /// The configuration this database was opened with
   pub fn config(&self) -> &SqliteDatabaseConfig {
      &self.config
   }

   /// Acquire exclusive access to the database connection
   ///
   /// Waits until any other holder drops its [`ConnectionGuard`].
   ///
   /// # Errors
   ///
   /// [`Error::DatabaseClosed`] after [`close()`](SqliteDatabase::close).
   pub async fn acquire_writer(&self) -> Result<ConnectionGuard> {
      if self.closed.load(Ordering::SeqCst) {
         return Err(Error::DatabaseClosed);
      }

      match self.conn.acquire().await {
         Ok(conn) => Ok(ConnectionGuard::from(conn)),
         Err(sqlx::Error::PoolClosed) => Err(Error::DatabaseClosed),
         Err(e) => Err(Error::Sqlx(e)),
      }
   }

   /// Apply the configured pragmas to the connection, in order
   ///
   /// Must run outside any transaction: SQLite silently ignores
   /// `foreign_keys` and rejects `journal_mode = WAL` inside one.
   ///
   /// # Errors
   ///
   /// [`Error::InvalidPragma`] before anything runs if any name or value is
   /// not a plain identifier or integer.
   pub async fn apply_pragmas(&self) -> Result<()> {
      for (name, value) in &self.config.pragmas {
         if !is_valid_pragma_name(name) {
            return Err(Error::InvalidPragma(name.clone()));
         }
         if !is_valid_pragma_value(value) {
            return Err(Error::InvalidPragma(format!("{name} = {value}")));
         }
      }

      let mut conn = self.acquire_writer().await?;
      for (name, value) in &self.config.pragmas {
         sqlx::query(&format!("PRAGMA {name} = {value}"))
            .execute(&mut *conn)
            .await?;
      }

      debug!(
         path = %self.path.display(),
         count = self.config.pragmas.len(),
         "applied connection pragmas"
      );
      Ok(())
   }

   /// Close the database
   ///
   /// Runs `PRAGMA optimize` if configured, checkpoints and truncates the
   /// WAL file if the database is in WAL mode, then closes the connection
   /// and releases the path so it can be opened again.
   ///
   /// The connection is closed even when optimize fails; the optimize error
   /// is returned afterwards. Calling `close()` again is a no-op.
   pub async fn close(&self) -> Result<()> {
      if self.closed.swap(true, Ordering::SeqCst) {
         return Ok(());
      }

      let mut result = Ok(());

      match self.conn.acquire().await {
         Ok(mut conn) => {
            if self.config.optimize_on_close
               && let Err(e) = sqlx::query("PRAGMA optimize").execute(&mut *conn).await
            {
               warn!(path = %self.path.display(), error = %e, "PRAGMA optimize failed");
               result = Err(Error::Sqlx(e));
            }

            let journal_mode: std::result::Result<String, _> =
               sqlx::query_scalar("PRAGMA journal_mode")
                  .fetch_one(&mut *conn)
                  .await;

            if matches!(&journal_mode, Ok(mode) if mode.eq_ignore_ascii_case("wal"))
               && let Err(e) = sqlx::query("PRAGMA wal_checkpoint(TRUNCATE)")
                  .execute(&mut *conn)
                  .await
            {
               warn!(path = %self.path.display(), error = %e, "WAL checkpoint failed");
            }
         }
         Err(e) => result = Err(Error::Sqlx(e)),
      }

      self.conn.close().await;

      self
         .registration
         .lock()
         .unwrap_or_else(|e| e.into_inner())
         .take();

      debug!(path = %self.path.display(), "closed database");
      result
   }

   /// Close the database and delete all database files
   ///
   /// This closes the connection and then deletes the database file,
   /// WAL file, and SHM file from disk. Use with caution!
   ///
   /// In-memory databases are only closed.
   pub async fn remove(&self) -> Result<()> {
      self.close().await?;

      if is_memory_database(&self.path) {
         return Ok(());
      }

      // Remove main database file - propagate errors (file should exist)
      std::fs::remove_file(&self.path).map_err(Error::Io)?;

      // Remove WAL and SHM files - ignore "not found" but propagate other errors
      for suffix in ["-wal", "-shm"] {
         let mut sidecar = self.path.clone().into_os_string();
         sidecar.push(suffix);

         if let Err(e) = std::fs::remove_file(&sidecar)
            && e.kind() != std::io::ErrorKind::NotFound
         {
            return Err(Error::Io(e));
         }
      }

      debug!(path = %self.path.display(), "removed database files");
      Ok(())
   }
}

/// Validates that a pragma name is a plain SQLite identifier
fn is_valid_pragma_name(name: &str) -> bool {
   name
      .chars()
      .next()
      .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
      && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Validates that a pragma value is a keyword or an optionally negative integer
fn is_valid_pragma_value(value: &str) -> bool {
   let digits = value.strip_prefix('-').unwrap_or(value);
   !value.is_empty()
      && (is_valid_pragma_name(value)
         || (!digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())))
}
