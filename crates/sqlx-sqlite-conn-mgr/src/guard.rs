//! Exclusive handle on a database's only connection

use sqlx::Sqlite;
use sqlx::pool::PoolConnection;
use sqlx::sqlite::SqliteConnection;
use std::ops::{Deref, DerefMut};
use std::time::Instant;
use tracing::trace;

/// Exclusive use of the database connection, returned to the database on drop.
///
/// While a guard is alive every other `acquire_writer()` call waits, so keep
/// it for one unit of work. Pass `&mut *guard` wherever sqlx or
/// `run_in_transaction` expects a `&mut SqliteConnection`.
#[derive(Debug)]
pub struct ConnectionGuard {
   conn: PoolConnection<Sqlite>,
   acquired_at: Instant,
}

impl From<PoolConnection<Sqlite>> for ConnectionGuard {
   fn from(conn: PoolConnection<Sqlite>) -> Self {
      trace!("database connection acquired");
      Self {
         conn,
         acquired_at: Instant::now(),
      }
   }
}

impl Drop for ConnectionGuard {
   fn drop(&mut self) {
      trace!(
         held_ms = self.acquired_at.elapsed().as_millis() as u64,
         "database connection released"
      );
   }
}

impl Deref for ConnectionGuard {
   type Target = SqliteConnection;

   fn deref(&self) -> &SqliteConnection {
      &self.conn
   }
}

impl DerefMut for ConnectionGuard {
   fn deref_mut(&mut self) -> &mut SqliteConnection {
      &mut self.conn
   }
}

impl AsMut<SqliteConnection> for ConnectionGuard {
   fn as_mut(&mut self) -> &mut SqliteConnection {
      &mut self.conn
   }
}
