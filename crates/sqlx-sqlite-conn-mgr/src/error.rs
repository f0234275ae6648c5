//! Error types for sqlx-sqlite-conn-mgr

use std::path::PathBuf;

use thiserror::Error;

/// Errors that may occur when working with sqlx-sqlite-conn-mgr
#[derive(Error, Debug)]
pub enum Error {
   /// IO error when accessing database files. Standard library IO errors
   /// are converted to this variant.
   #[error("IO error: {0}")]
   Io(#[from] std::io::Error),

   /// Error from the sqlx library. Standard sqlx errors are converted to this variant
   #[error("Sqlx error: {0}")]
   Sqlx(#[from] sqlx::Error),

   /// Database has been closed and cannot be used
   #[error("Database has been closed")]
   DatabaseClosed,

   /// The database file already has an open connection in this process
   #[error("Database '{}' is already open", .0.display())]
   AlreadyOpen(PathBuf),

   /// Invalid pragma name or value in the configuration
   #[error(
      "Invalid pragma '{0}': names must be identifiers, values must be identifiers or integers"
   )]
   InvalidPragma(String),
}
