//! Atomic unit of work around a caller-supplied function

use futures::future::BoxFuture;
use sqlx::Connection;
use sqlx::sqlite::SqliteConnection;
use tracing::{debug, error};

/// Errors that can absorb a failed rollback.
///
/// When the work inside a transaction fails and the rollback fails too, both
/// errors are kept so callers can tell a bad migration from a storage-layer
/// fault.
pub trait RollbackFailure: From<sqlx::Error> {
   /// Combine `self` (the original failure) with the rollback's own error.
   fn with_rollback_error(self, rollback_error: sqlx::Error) -> Self;
}

/// Run `f` inside a transaction on `conn`.
///
/// Commits when `f` succeeds and returns the commit's own error if it fails.
/// Rolls back when `f` fails; if the rollback fails too, the returned error
/// carries both failures (see [`RollbackFailure`]).
///
/// `f` should own the state it captures (clone an `Arc` or the engine into it)
/// since the returned future may only borrow the connection.
///
/// # Example
///
/// ```no_run
/// use sqlx::{Connection, SqliteConnection};
/// use sqlx_sqlite_schema::{MigrationEngine, MigrationRegistry, MigrationStep, run_in_transaction};
/// use std::sync::Arc;
///
/// # async fn example() -> sqlx_sqlite_schema::Result<()> {
/// let registry = Arc::new(MigrationRegistry::new([
///    MigrationStep::new(1).forward_sql("CREATE TABLE notes (id INTEGER PRIMARY KEY, body TEXT)"),
/// ])?);
/// let engine = MigrationEngine::new(registry);
/// let mut conn = SqliteConnection::connect("sqlite:notes.db").await?;
///
/// run_in_transaction(&mut conn, move |tx| {
///    Box::pin(async move {
///       let current = engine.current_version(tx).await?;
///       if current != 1 {
///          engine.apply_migrations(tx, current, 1).await?;
///       }
///       Ok::<_, sqlx_sqlite_schema::Error>(())
///    })
/// })
/// .await?;
/// # Ok(())
/// # }
/// ```
pub async fn run_in_transaction<T, E, F>(conn: &mut SqliteConnection, f: F) -> Result<T, E>
where
   F: for<'t> FnOnce(&'t mut SqliteConnection) -> BoxFuture<'t, Result<T, E>>,
   E: RollbackFailure + std::fmt::Display,
{
   let mut tx = conn.begin().await?;

   match f(&mut *tx).await {
      Ok(value) => {
         tx.commit().await?;
         debug!("transaction committed");
         Ok(value)
      }
      Err(err) => match tx.rollback().await {
         Ok(()) => {
            debug!(error = %err, "transaction rolled back");
            Err(err)
         }
         Err(rollback_error) => {
            error!(
               error = %err,
               rollback_error = %rollback_error,
               "transaction rollback failed"
            );
            Err(err.with_rollback_error(rollback_error))
         }
      },
   }
}
