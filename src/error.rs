use serde::{Serialize, Serializer};
use sqlx_sqlite_schema::RollbackFailure;

/// Result type alias for database lifecycle operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Structured error response for callers that report errors as data.
#[derive(Serialize)]
struct ErrorResponse {
   code: String,
   message: String,
}

/// Error types for opening, migrating, and closing a database.
#[derive(Debug, thiserror::Error)]
pub enum Error {
   /// Error from SQLx operations.
   #[error(transparent)]
   Sqlx(#[from] sqlx::Error),

   /// Error from the connection manager.
   #[error(transparent)]
   ConnectionManager(#[from] sqlx_sqlite_conn_mgr::Error),

   /// Error from schema migration.
   #[error(transparent)]
   Schema(#[from] sqlx_sqlite_schema::Error),

   /// Invalid database path provided.
   #[error("invalid database path: {0}")]
   InvalidPath(String),

   /// I/O error when accessing database files.
   #[error("io error: {0}")]
   Io(#[from] std::io::Error),

   /// The transaction failed and so did its rollback.
   #[error("{source} (rollback also failed: {rollback_error})")]
   TransactionRollbackFailed {
      #[source]
      source: Box<Error>,
      rollback_error: sqlx::Error,
   },
}

impl Error {
   /// Extract a structured error code from the error type.
   ///
   /// Schema errors keep their own codes so callers can tell a missing step
   /// from a failed one without unpacking the error.
   pub fn error_code(&self) -> String {
      match self {
         Error::Sqlx(e) => {
            // Extract SQLite error codes from sqlx errors
            if let Some(code) = e.as_database_error().and_then(|db_err| db_err.code()) {
               return format!("SQLITE_{}", code);
            }
            "SQLX_ERROR".to_string()
         }
         Error::ConnectionManager(e) => match e {
            sqlx_sqlite_conn_mgr::Error::AlreadyOpen(_) => "DATABASE_ALREADY_OPEN".to_string(),
            sqlx_sqlite_conn_mgr::Error::DatabaseClosed => "DATABASE_CLOSED".to_string(),
            sqlx_sqlite_conn_mgr::Error::InvalidPragma(_) => "INVALID_PRAGMA".to_string(),
            _ => "CONNECTION_ERROR".to_string(),
         },
         Error::Schema(e) => e.error_code(),
         Error::InvalidPath(_) => "INVALID_PATH".to_string(),
         Error::Io(_) => "IO_ERROR".to_string(),
         Error::TransactionRollbackFailed { .. } => "TRANSACTION_ROLLBACK_FAILED".to_string(),
      }
   }
}

impl RollbackFailure for Error {
   fn with_rollback_error(self, rollback_error: sqlx::Error) -> Self {
      Error::TransactionRollbackFailed {
         source: Box::new(self),
         rollback_error,
      }
   }
}

impl Serialize for Error {
   fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
   where
      S: Serializer,
   {
      let response = ErrorResponse {
         code: self.error_code(),
         message: self.to_string(),
      };
      response.serialize(serializer)
   }
}
