//! Migration steps and the immutable registry that holds them

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;
use sqlx::error::BoxDynError;
use sqlx::sqlite::SqliteConnection;

use crate::{Error, Result};

/// Future returned by a migration body.
pub type StepFuture<'c> = BoxFuture<'c, std::result::Result<(), BoxDynError>>;

type CustomFn = dyn for<'c> Fn(&'c mut SqliteConnection) -> StepFuture<'c> + Send + Sync;

/// A single migration body.
///
/// Most steps are plain SQL. Use [`Operation::custom`] when a step needs Rust
/// logic (for example, reading rows to decide how to rewrite them).
#[derive(Clone)]
pub enum Operation {
   /// One or more `;`-separated statements executed as raw SQL.
   Sql(Cow<'static, str>),
   /// An async function run against the migration transaction.
   Custom(Arc<CustomFn>),
}

impl Operation {
   /// Create an operation from SQL text.
   pub fn sql(sql: impl Into<Cow<'static, str>>) -> Self {
      Operation::Sql(sql.into())
   }

   /// Create an operation from an async function.
   ///
   /// The function should own whatever state it needs; it is shared by every
   /// migration that runs through the registry.
   ///
   /// # Example
   ///
   /// ```
   /// use sqlx_sqlite_schema::Operation;
   ///
   /// let op = Operation::custom(|conn| {
   ///    Box::pin(async move {
   ///       sqlx::query("UPDATE users SET name = trim(name)")
   ///          .execute(&mut *conn)
   ///          .await?;
   ///       Ok::<_, sqlx::error::BoxDynError>(())
   ///    })
   /// });
   /// # let _ = op;
   /// ```
   pub fn custom<F>(f: F) -> Self
   where
      F: for<'c> Fn(&'c mut SqliteConnection) -> StepFuture<'c> + Send + Sync + 'static,
   {
      Operation::Custom(Arc::new(f))
   }

   /// Run this operation against `conn`.
   pub fn run<'c>(&'c self, conn: &'c mut SqliteConnection) -> StepFuture<'c> {
      match self {
         Operation::Sql(sql) => Box::pin(async move {
            sqlx::Executor::execute(conn, sqlx::raw_sql(sql)).await?;
            Ok::<_, BoxDynError>(())
         }),
         Operation::Custom(f) => f(conn),
      }
   }
}

impl fmt::Debug for Operation {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      match self {
         Operation::Sql(sql) => f.debug_tuple("Sql").field(sql).finish(),
         Operation::Custom(_) => f.write_str("Custom(..)"),
      }
   }
}

/// The pair of reversible operations for one version transition.
///
/// `forward` moves the schema from `version - 1` to `version`; `backward`
/// moves it from `version` back to `version - 1`. Either may be absent.
/// Omitting `backward` marks the version as a point the schema cannot be
/// downgraded past.
///
/// # Example
///
/// ```
/// use sqlx_sqlite_schema::MigrationStep;
///
/// let step = MigrationStep::new(2)
///    .description("add tags table")
///    .forward_sql("CREATE TABLE tags (id INTEGER PRIMARY KEY, name TEXT NOT NULL)")
///    .backward_sql("DROP TABLE tags");
///
/// assert_eq!(step.version(), 2);
/// assert!(step.backward_operation().is_some());
/// ```
#[derive(Debug, Clone)]
pub struct MigrationStep {
   version: u32,
   description: Option<String>,
   forward: Option<Operation>,
   backward: Option<Operation>,
}

impl MigrationStep {
   pub fn new(version: u32) -> Self {
      Self {
         version,
         description: None,
         forward: None,
         backward: None,
      }
   }

   /// Human-readable summary, included in migration logs.
   pub fn description(mut self, description: impl Into<String>) -> Self {
      self.description = Some(description.into());
      self
   }

   pub fn forward(mut self, operation: Operation) -> Self {
      self.forward = Some(operation);
      self
   }

   pub fn backward(mut self, operation: Operation) -> Self {
      self.backward = Some(operation);
      self
   }

   pub fn forward_sql(self, sql: impl Into<Cow<'static, str>>) -> Self {
      self.forward(Operation::sql(sql))
   }

   pub fn backward_sql(self, sql: impl Into<Cow<'static, str>>) -> Self {
      self.backward(Operation::sql(sql))
   }

   pub fn version(&self) -> u32 {
      self.version
   }

   pub fn summary(&self) -> Option<&str> {
      self.description.as_deref()
   }

   pub fn forward_operation(&self) -> Option<&Operation> {
      self.forward.as_ref()
   }

   pub fn backward_operation(&self) -> Option<&Operation> {
      self.backward.as_ref()
   }
}

/// Immutable mapping from version number to [`MigrationStep`].
///
/// Built once, before any migration runs. Steps conceptually form the
/// contiguous sequence `1..=latest_version()`. Gaps are accepted here and
/// reported when a migration reaches them; call [`MigrationRegistry::validate`]
/// to find them up front.
///
/// # Example
///
/// ```
/// use sqlx_sqlite_schema::{MigrationRegistry, MigrationStep};
///
/// let registry = MigrationRegistry::new([
///    MigrationStep::new(1).forward_sql("CREATE TABLE a (id INTEGER PRIMARY KEY)"),
///    MigrationStep::new(2)
///       .forward_sql("CREATE TABLE b (id INTEGER PRIMARY KEY)")
///       .backward_sql("DROP TABLE b"),
/// ])
/// .unwrap();
///
/// assert_eq!(registry.latest_version(), 2);
/// assert!(registry.lookup(3).is_none());
/// registry.validate().unwrap();
/// ```
#[derive(Debug, Clone, Default)]
pub struct MigrationRegistry {
   steps: BTreeMap<u32, MigrationStep>,
}

impl MigrationRegistry {
   /// Build a registry from a set of steps.
   ///
   /// Fails with [`Error::InvalidStepVersion`] for a step numbered 0 and with
   /// [`Error::DuplicateStep`] when two steps share a version.
   pub fn new(steps: impl IntoIterator<Item = MigrationStep>) -> Result<Self> {
      let mut map = BTreeMap::new();

      for step in steps {
         if step.version == 0 {
            return Err(Error::InvalidStepVersion(0));
         }

         match map.entry(step.version) {
            Entry::Occupied(_) => return Err(Error::DuplicateStep(step.version)),
            Entry::Vacant(slot) => {
               slot.insert(step);
            }
         }
      }

      Ok(Self { steps: map })
   }

   pub fn lookup(&self, version: u32) -> Option<&MigrationStep> {
      self.steps.get(&version)
   }

   /// Highest registered version, or 0 for an empty registry.
   pub fn latest_version(&self) -> u32 {
      self.steps.keys().next_back().copied().unwrap_or(0)
   }

   pub fn len(&self) -> usize {
      self.steps.len()
   }

   pub fn is_empty(&self) -> bool {
      self.steps.is_empty()
   }

   /// Steps in ascending version order.
   pub fn iter(&self) -> impl Iterator<Item = &MigrationStep> {
      self.steps.values()
   }

   /// Check that every version from 1 to [`latest_version`](Self::latest_version)
   /// has a forward operation.
   ///
   /// Returns [`Error::MissingForwardStep`] for the first version that
   /// does not.
   pub fn validate(&self) -> Result<()> {
      for version in 1..=self.latest_version() {
         let has_forward = self
            .lookup(version)
            .is_some_and(|step| step.forward.is_some());

         if !has_forward {
            return Err(Error::MissingForwardStep { version });
         }
      }

      Ok(())
   }
}
