//! Schema version stored in the database header

use futures::future::BoxFuture;
use sqlx::sqlite::SqliteConnection;

use crate::{Error, Result};

/// Reads and writes the persisted schema version.
///
/// Both operations run on the caller's transaction. A written version becomes
/// visible to other readers only after that transaction commits. Callers keep
/// versions within `0..=MAX_SCHEMA_VERSION`; [`MigrationPlan`](crate::MigrationPlan)
/// enforces this for the engine.
pub trait VersionStore: Send + Sync {
   /// The schema version visible to the transaction on `conn`.
   fn current_version<'c>(&'c self, conn: &'c mut SqliteConnection) -> BoxFuture<'c, Result<u32>>;

   /// Record `version` as the schema version.
   fn set_version<'c>(
      &'c self,
      conn: &'c mut SqliteConnection,
      version: u32,
   ) -> BoxFuture<'c, std::result::Result<(), sqlx::Error>>;
}

/// [`VersionStore`] backed by `PRAGMA user_version`.
///
/// The version lives in the file header, not in a table. A freshly created
/// database reports 0.
#[derive(Debug, Clone, Copy, Default)]
pub struct UserVersion;

impl VersionStore for UserVersion {
   fn current_version<'c>(&'c self, conn: &'c mut SqliteConnection) -> BoxFuture<'c, Result<u32>> {
      Box::pin(async move {
         let version: i64 = sqlx::query_scalar("PRAGMA user_version")
            .fetch_one(&mut *conn)
            .await?;

         u32::try_from(version).map_err(|_| Error::InvalidStoredVersion(version))
      })
   }

   fn set_version<'c>(
      &'c self,
      conn: &'c mut SqliteConnection,
      version: u32,
   ) -> BoxFuture<'c, std::result::Result<(), sqlx::Error>> {
      Box::pin(async move {
         // PRAGMA arguments cannot be bound
         sqlx::query(&format!("PRAGMA user_version = {version}"))
            .execute(&mut *conn)
            .await
            .map(|_| ())
      })
   }
}
