//! # sqlx-sqlite-conn-mgr
//!
//! A minimal wrapper around SQLx that gives each SQLite database file exactly
//! one read-write connection for the life of the process.
//!
//! ## Core Types
//!
//! - **[`SqliteDatabase`]**: Main database type owning the single connection
//! - **[`SqliteDatabaseConfig`]**: Busy timeout, pragmas, and close behavior
//! - **[`ConnectionGuard`]**: RAII guard ensuring exclusive access to the connection
//! - **[`Error`]**: Error type for database operations
//!
//! ## Architecture
//!
//! - **One connection**: A pool capped at one connection that never idles out,
//!   so every caller is serialized and session state survives between uses
//! - **One owner per file**: Opening a file that is already open in this
//!   process fails with [`Error::AlreadyOpen`]
//! - **Deferred pragmas**: Foreign keys stay off until [`SqliteDatabase::apply_pragmas`]
//!   runs, so schema migrations can rebuild tables freely
//! - **Tidy close**: `PRAGMA optimize` and a WAL checkpoint run before the
//!   connection closes
//!
//! ## Usage
//!
//! ```no_run
//! use sqlx_sqlite_conn_mgr::SqliteDatabase;
//!
//! #[tokio::main]
//! async fn main() -> sqlx_sqlite_conn_mgr::Result<()> {
//!     let db = SqliteDatabase::connect("example.db", None).await?;
//!
//!     // A second open of the same file is rejected
//!     assert!(SqliteDatabase::connect("example.db", None).await.is_err());
//!
//!     // Create schema here, then turn on WAL and foreign keys
//!     db.apply_pragmas().await?;
//!
//!     let mut conn = db.acquire_writer().await?;
//!     let rows = sqlx::query("SELECT * FROM users")
//!         .fetch_all(&mut *conn)
//!         .await?;
//!     drop(conn);
//!
//!     // Close when done
//!     db.close().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Design Principles
//!
//! - Uses sqlx's `SqlitePoolOptions` for all pool configuration
//! - Uses sqlx's `SqliteConnectOptions` for connection flags and configuration
//! - Minimal custom logic - delegates to sqlx wherever possible
//! - Global registry tracks open paths and releases them on close or drop
//!
mod config;
mod database;
mod error;
mod guard;
mod registry;

// Re-export public types
pub use config::SqliteDatabaseConfig;
pub use database::SqliteDatabase;
pub use error::Error;
pub use guard::ConnectionGuard;

/// A type alias for Results with our custom Error type
pub type Result<T> = std::result::Result<T, Error>;
