//! # sqlx-sqlite-schema
//!
//! Linear, reversible schema migrations for SQLite, tracked in the database
//! file's own header (`PRAGMA user_version`) rather than in a bookkeeping table.
//!
//! ## Core Types
//!
//! - **[`MigrationStep`]**: forward and backward [`Operation`]s for one version
//! - **[`MigrationRegistry`]**: immutable, ordered mapping from version to step
//! - **[`MigrationEngine`]**: walks the registry between two versions inside the
//!   caller's transaction and records the new version
//! - **[`VersionStore`]**: reads and writes the persisted version ([`UserVersion`] by default)
//! - **[`run_in_transaction`]**: begin, run, commit or roll back
//! - **[`Error`]**: error type for schema operations
//!
//! ## Usage
//!
//! ```no_run
//! use sqlx::{Connection, SqliteConnection};
//! use sqlx_sqlite_schema::{MigrationEngine, MigrationRegistry, MigrationStep, run_in_transaction};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> sqlx_sqlite_schema::Result<()> {
//!     let registry = Arc::new(MigrationRegistry::new([
//!         MigrationStep::new(1).forward_sql("CREATE TABLE polls (id TEXT PRIMARY KEY, title TEXT NOT NULL)"),
//!         MigrationStep::new(2)
//!             .forward_sql("CREATE TABLE votes (poll_id TEXT NOT NULL, voter_id TEXT NOT NULL)")
//!             .backward_sql("DROP TABLE votes"),
//!     ])?);
//!     let target = registry.latest_version();
//!     let engine = MigrationEngine::new(registry);
//!
//!     let mut conn = SqliteConnection::connect("sqlite:polls.db?mode=rwc").await?;
//!     run_in_transaction(&mut conn, move |tx| {
//!         Box::pin(async move {
//!             let current = engine.current_version(tx).await?;
//!             if current != target {
//!                 engine.apply_migrations(tx, current, target).await?;
//!             }
//!             Ok::<_, sqlx_sqlite_schema::Error>(())
//!         })
//!     })
//!     .await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Design Principles
//!
//! - Versions are strictly linear: every integer between the current and the
//!   target version is visited, one step at a time
//! - The engine never commits or rolls back; atomicity comes from the caller's transaction
//! - Registries are built once and injected, never mutated at runtime
//! - Missing steps are detected when a migration reaches them; call
//!   [`MigrationRegistry::validate`] to detect gaps eagerly
//!
mod engine;
mod error;
mod plan;
mod registry;
mod transaction;
mod version;

// Re-export public types
pub use engine::MigrationEngine;
pub use error::{Error, Result};
pub use plan::{Direction, MAX_SCHEMA_VERSION, MigrationPlan, PlanSteps};
pub use registry::{MigrationRegistry, MigrationStep, Operation, StepFuture};
pub use transaction::{RollbackFailure, run_in_transaction};
pub use version::{UserVersion, VersionStore};
