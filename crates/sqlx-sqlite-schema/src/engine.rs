//! Up/down traversal of the migration registry

use std::sync::Arc;

use sqlx::sqlite::SqliteConnection;
use tracing::{debug, info};

use crate::plan::{Direction, MigrationPlan};
use crate::registry::{MigrationRegistry, Operation};
use crate::version::{UserVersion, VersionStore};
use crate::{Error, Result};

/// Brings a schema from one version to another inside the caller's transaction.
///
/// The engine never begins, commits, or rolls back. Every step runs on the
/// connection it is handed, so the caller's transaction makes the whole plan
/// all-or-nothing: either every step in the range ran and the new version was
/// written, or the caller rolls back and none of it is visible.
///
/// Cloning is cheap; the registry is shared.
#[derive(Debug, Clone)]
pub struct MigrationEngine<S = UserVersion> {
   registry: Arc<MigrationRegistry>,
   store: S,
}

impl MigrationEngine<UserVersion> {
   /// Create an engine that tracks versions with `PRAGMA user_version`.
   pub fn new(registry: Arc<MigrationRegistry>) -> Self {
      Self::with_store(registry, UserVersion)
   }
}

impl<S: VersionStore> MigrationEngine<S> {
   /// Create an engine with a custom [`VersionStore`].
   pub fn with_store(registry: Arc<MigrationRegistry>, store: S) -> Self {
      Self { registry, store }
   }

   pub fn registry(&self) -> &MigrationRegistry {
      &self.registry
   }

   /// The schema version visible to the transaction on `conn`.
   pub async fn current_version(&self, conn: &mut SqliteConnection) -> Result<u32> {
      self.store.current_version(conn).await
   }

   /// Apply every step between `from_version` and `to_version`, then record
   /// `to_version`.
   ///
   /// Steps run one at a time in order: ascending `forward` operations for an
   /// upgrade, descending `backward` operations for a downgrade. The first
   /// missing operation or failing step aborts the remaining range.
   ///
   /// # Errors
   ///
   /// - [`Error::NoOp`] when the versions are equal (nothing is written)
   /// - [`Error::MissingForwardStep`] / [`Error::MissingBackwardStep`] when
   ///   the registry has no operation for a version in the range
   /// - [`Error::StepExecution`] when a migration body fails
   /// - [`Error::VersionPersist`] when the final version cannot be written
   ///
   /// Cancelling (dropping the returned future) stops after the in-flight
   /// statement; the caller's transaction discards what already ran.
   pub async fn apply_migrations(
      &self,
      conn: &mut SqliteConnection,
      from_version: u32,
      to_version: u32,
   ) -> Result<()> {
      let plan = MigrationPlan::new(from_version, to_version)?;
      let direction = plan.direction();

      info!(
         from = from_version,
         to = to_version,
         %direction,
         "migrating database schema"
      );

      for version in plan.steps() {
         let operation = self.operation_for(direction, version)?;
         let (step_from, step_to) = plan.transition(version);

         debug!(
            from = step_from,
            to = step_to,
            description = self.registry.lookup(version).and_then(|s| s.summary()),
            "running migration step"
         );

         operation
            .run(conn)
            .await
            .map_err(|source| Error::StepExecution {
               direction,
               from_version: step_from,
               to_version: step_to,
               source,
            })?;
      }

      self
         .store
         .set_version(conn, to_version)
         .await
         .map_err(|source| Error::VersionPersist {
            version: to_version,
            source,
         })?;

      info!(version = to_version, "database schema version updated");
      Ok(())
   }

   /// The operation to run for the step at `version`, or the matching
   /// missing-step error.
   fn operation_for(&self, direction: Direction, version: u32) -> Result<&Operation> {
      let step = self.registry.lookup(version);

      match direction {
         Direction::Upgrade => step
            .and_then(|s| s.forward_operation())
            .ok_or(Error::MissingForwardStep { version }),
         Direction::Downgrade => step
            .and_then(|s| s.backward_operation())
            .ok_or(Error::MissingBackwardStep { version }),
      }
   }
}

#[cfg(test)]
mod tests {
   use super::*;
   use crate::registry::MigrationStep;
   use sqlx::{Connection, SqliteConnection};

   async fn memory_connection() -> SqliteConnection {
      SqliteConnection::connect("sqlite::memory:").await.unwrap()
   }

   fn engine(steps: Vec<MigrationStep>) -> MigrationEngine {
      MigrationEngine::new(Arc::new(MigrationRegistry::new(steps).unwrap()))
   }

   #[tokio::test]
   async fn test_equal_versions_write_nothing() {
      let mut conn = memory_connection().await;
      let engine = engine(vec![
         MigrationStep::new(1).forward_sql("CREATE TABLE a (id INTEGER)"),
      ]);

      let err = engine.apply_migrations(&mut conn, 0, 0).await.unwrap_err();
      assert!(err.is_no_op());
      assert_eq!(engine.current_version(&mut conn).await.unwrap(), 0);
   }

   #[tokio::test]
   async fn test_missing_forward_step_runs_nothing_further() {
      let mut conn = memory_connection().await;
      let engine = engine(vec![
         MigrationStep::new(1).forward_sql("CREATE TABLE a (id INTEGER)"),
         MigrationStep::new(3).forward_sql("CREATE TABLE c (id INTEGER)"),
      ]);

      let err = engine.apply_migrations(&mut conn, 0, 3).await.unwrap_err();
      assert!(matches!(err, Error::MissingForwardStep { version: 2 }));

      // Step 3 never ran and no version was written
      let tables: Vec<String> =
         sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
            .fetch_all(&mut conn)
            .await
            .unwrap();
      assert_eq!(tables, vec!["a".to_string()]);
      assert_eq!(engine.current_version(&mut conn).await.unwrap(), 0);
   }

   #[tokio::test]
   async fn test_target_beyond_registry_is_missing_forward_step() {
      let mut conn = memory_connection().await;
      let engine = engine(vec![
         MigrationStep::new(1).forward_sql("CREATE TABLE a (id INTEGER)"),
      ]);

      let err = engine.apply_migrations(&mut conn, 0, 2).await.unwrap_err();
      assert!(matches!(err, Error::MissingForwardStep { version: 2 }));
   }

   #[tokio::test]
   async fn test_failing_sql_reports_transition() {
      let mut conn = memory_connection().await;
      let engine = engine(vec![
         MigrationStep::new(1).forward_sql("CREATE TABLE a (id INTEGER)"),
         MigrationStep::new(2).forward_sql("ALTER TABLE missing ADD COLUMN x TEXT"),
      ]);

      let err = engine.apply_migrations(&mut conn, 0, 2).await.unwrap_err();
      match err {
         Error::StepExecution {
            direction,
            from_version,
            to_version,
            source,
         } => {
            assert_eq!(direction, Direction::Upgrade);
            assert_eq!((from_version, to_version), (1, 2));
            assert!(source.to_string().contains("no such table"));
         }
         other => panic!("unexpected error: {other:?}"),
      }
   }

   #[tokio::test]
   async fn test_multi_statement_sql_step() {
      let mut conn = memory_connection().await;
      let engine = engine(vec![MigrationStep::new(1).forward_sql(
         "CREATE TABLE a (id INTEGER); CREATE TABLE b (id INTEGER); INSERT INTO a VALUES (1);",
      )]);

      engine.apply_migrations(&mut conn, 0, 1).await.unwrap();

      let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM a")
         .fetch_one(&mut conn)
         .await
         .unwrap();
      assert_eq!(count, 1);
      assert_eq!(engine.current_version(&mut conn).await.unwrap(), 1);
   }
}
