use sqlx::error::BoxDynError;

use crate::plan::Direction;

/// Result type alias for schema operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for schema versioning and migration.
#[derive(Debug, thiserror::Error)]
pub enum Error {
   /// Migration requested between equal versions. Callers should compare
   /// versions first and skip the call.
   #[error("current version v{version} already equals the target version")]
   NoOp { version: u32 },

   /// No forward operation exists for a version on the upgrade path.
   ///
   /// This is a registry defect (a gap below the declared maximum) and is not
   /// retryable until the missing step is added.
   #[error("cannot migrate database further up than v{version}: no forward step registered")]
   MissingForwardStep { version: u32 },

   /// No backward operation exists for a version on the downgrade path.
   ///
   /// The schema author chose not to make this version reversible.
   #[error("cannot migrate database further down than v{version}")]
   MissingBackwardStep { version: u32 },

   /// A migration body failed.
   #[error("error during {direction} of database from v{from_version} to v{to_version}: {source}")]
   StepExecution {
      direction: Direction,
      from_version: u32,
      to_version: u32,
      #[source]
      source: BoxDynError,
   },

   /// Every step succeeded but writing the new version did not.
   #[error("failed to persist schema version v{version}: {source}")]
   VersionPersist {
      version: u32,
      #[source]
      source: sqlx::Error,
   },

   /// The version stored in the database header is not a valid schema version.
   #[error("stored schema version {0} is negative")]
   InvalidStoredVersion(i64),

   /// The requested version cannot be stored in the database header.
   #[error("schema version v{0} exceeds the maximum storable version")]
   VersionOutOfRange(u32),

   /// Migration steps are numbered from 1.
   #[error("migration step version must be positive, got v{0}")]
   InvalidStepVersion(u32),

   /// Two steps were registered for the same version.
   #[error("migration step v{0} is registered more than once")]
   DuplicateStep(u32),

   /// Transaction failed and rollback also failed.
   #[error("transaction failed: {source}; rollback also failed: {rollback_error}")]
   TransactionRollbackFailed {
      #[source]
      source: Box<Error>,
      rollback_error: sqlx::Error,
   },

   /// Error from SQLx operations.
   #[error(transparent)]
   Sqlx(#[from] sqlx::Error),
}

impl Error {
   /// Extract a structured error code from the error type.
   ///
   /// This provides machine-readable error codes for error handling.
   pub fn error_code(&self) -> String {
      match self {
         Error::NoOp { .. } => "NO_OP".to_string(),
         Error::MissingForwardStep { .. } => "MISSING_FORWARD_STEP".to_string(),
         Error::MissingBackwardStep { .. } => "MISSING_BACKWARD_STEP".to_string(),
         Error::StepExecution { .. } => "STEP_EXECUTION_FAILED".to_string(),
         Error::VersionPersist { .. } => "VERSION_PERSIST_FAILED".to_string(),
         Error::InvalidStoredVersion(_) => "INVALID_STORED_VERSION".to_string(),
         Error::VersionOutOfRange(_) => "VERSION_OUT_OF_RANGE".to_string(),
         Error::InvalidStepVersion(_) => "INVALID_STEP_VERSION".to_string(),
         Error::DuplicateStep(_) => "DUPLICATE_STEP".to_string(),
         Error::TransactionRollbackFailed { .. } => "TRANSACTION_ROLLBACK_FAILED".to_string(),
         Error::Sqlx(e) => {
            if let Some(code) = e.as_database_error().and_then(|db_err| db_err.code()) {
               return format!("SQLITE_{}", code);
            }
            "SQLX_ERROR".to_string()
         }
      }
   }

   /// True when the caller asked to migrate between equal versions.
   pub fn is_no_op(&self) -> bool {
      matches!(self, Error::NoOp { .. })
   }

   /// True when a rollback was attempted and failed as well.
   ///
   /// This points at a storage-layer problem rather than a bad migration.
   pub fn is_rollback_failure(&self) -> bool {
      matches!(self, Error::TransactionRollbackFailed { .. })
   }
}

impl crate::transaction::RollbackFailure for Error {
   fn with_rollback_error(self, rollback_error: sqlx::Error) -> Self {
      Error::TransactionRollbackFailed {
         source: Box::new(self),
         rollback_error,
      }
   }
}
