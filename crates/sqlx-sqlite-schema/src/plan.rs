//! Direction and step range for a single migration request

use std::fmt;

use crate::{Error, Result};

/// Largest version `PRAGMA user_version` can hold (a signed 32-bit field).
pub const MAX_SCHEMA_VERSION: u32 = i32::MAX as u32;

/// Which way a migration moves the schema version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
   /// Moves the schema version forward, running `forward` operations.
   Upgrade,
   /// Moves the schema version backward, running `backward` operations.
   Downgrade,
}

impl fmt::Display for Direction {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      match self {
         Direction::Upgrade => f.write_str("upgrade"),
         Direction::Downgrade => f.write_str("downgrade"),
      }
   }
}

/// A derived `(from, to, direction)` triple computed once per migration request.
///
/// Plans are never persisted.
///
/// # Example
///
/// ```
/// use sqlx_sqlite_schema::{Direction, MigrationPlan};
///
/// let plan = MigrationPlan::new(3, 1).unwrap();
/// assert_eq!(plan.direction(), Direction::Downgrade);
/// assert_eq!(plan.steps().collect::<Vec<_>>(), vec![3, 2]);
/// assert_eq!(plan.transition(3), (3, 2));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MigrationPlan {
   from_version: u32,
   to_version: u32,
   direction: Direction,
}

impl MigrationPlan {
   /// Plan a migration from `from_version` to `to_version`.
   ///
   /// Returns [`Error::NoOp`] when both versions are equal and
   /// [`Error::VersionOutOfRange`] when the target cannot be stored.
   pub fn new(from_version: u32, to_version: u32) -> Result<Self> {
      if from_version == to_version {
         return Err(Error::NoOp {
            version: from_version,
         });
      }

      if to_version > MAX_SCHEMA_VERSION {
         return Err(Error::VersionOutOfRange(to_version));
      }

      let direction = if to_version > from_version {
         Direction::Upgrade
      } else {
         Direction::Downgrade
      };

      Ok(Self {
         from_version,
         to_version,
         direction,
      })
   }

   pub fn from_version(&self) -> u32 {
      self.from_version
   }

   pub fn to_version(&self) -> u32 {
      self.to_version
   }

   pub fn direction(&self) -> Direction {
      self.direction
   }

   /// Versions whose step must run, in execution order.
   ///
   /// An upgrade visits `from+1..=to` ascending. A downgrade visits
   /// `from..=to+1` descending. Every integer in the range is visited.
   pub fn steps(&self) -> PlanSteps {
      let (next, remaining) = match self.direction {
         Direction::Upgrade => (self.from_version + 1, self.to_version - self.from_version),
         Direction::Downgrade => (self.from_version, self.from_version - self.to_version),
      };

      PlanSteps {
         next,
         remaining,
         direction: self.direction,
      }
   }

   /// The `(from, to)` version transition performed by the step at `version`.
   ///
   /// Upgrades give `(version - 1, version)`; downgrades give
   /// `(version, version - 1)`.
   pub fn transition(&self, version: u32) -> (u32, u32) {
      match self.direction {
         Direction::Upgrade => (version - 1, version),
         Direction::Downgrade => (version, version - 1),
      }
   }
}

/// Iterator over the step versions of a [`MigrationPlan`].
#[derive(Debug, Clone)]
pub struct PlanSteps {
   next: u32,
   remaining: u32,
   direction: Direction,
}

impl Iterator for PlanSteps {
   type Item = u32;

   fn next(&mut self) -> Option<u32> {
      if self.remaining == 0 {
         return None;
      }

      let version = self.next;
      self.remaining -= 1;

      // `next` is never read again once `remaining` reaches zero
      self.next = match self.direction {
         Direction::Upgrade => self.next.wrapping_add(1),
         Direction::Downgrade => self.next.wrapping_sub(1),
      };

      Some(version)
   }

   fn size_hint(&self) -> (usize, Option<usize>) {
      let remaining = self.remaining as usize;
      (remaining, Some(remaining))
   }
}

impl ExactSizeIterator for PlanSteps {}

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn test_equal_versions_are_a_no_op() {
      let err = MigrationPlan::new(4, 4).unwrap_err();
      assert!(matches!(err, Error::NoOp { version: 4 }));
   }

   #[test]
   fn test_upgrade_from_fresh_database() {
      let plan = MigrationPlan::new(0, 3).unwrap();

      assert_eq!(plan.direction(), Direction::Upgrade);
      assert_eq!(plan.steps().collect::<Vec<_>>(), vec![1, 2, 3]);
      assert_eq!(plan.transition(1), (0, 1));
      assert_eq!(plan.transition(3), (2, 3));
   }

   #[test]
   fn test_downgrade_visits_versions_descending() {
      let plan = MigrationPlan::new(5, 2).unwrap();

      assert_eq!(plan.direction(), Direction::Downgrade);
      assert_eq!(plan.steps().collect::<Vec<_>>(), vec![5, 4, 3]);
      assert_eq!(plan.transition(3), (3, 2));
   }

   #[test]
   fn test_downgrade_to_zero_includes_step_one() {
      let plan = MigrationPlan::new(2, 0).unwrap();
      assert_eq!(plan.steps().collect::<Vec<_>>(), vec![2, 1]);
      assert_eq!(plan.steps().len(), 2);
   }

   #[test]
   fn test_target_above_header_range_rejected() {
      let err = MigrationPlan::new(0, MAX_SCHEMA_VERSION + 1).unwrap_err();
      assert!(matches!(err, Error::VersionOutOfRange(v) if v == MAX_SCHEMA_VERSION + 1));

      assert!(MigrationPlan::new(0, MAX_SCHEMA_VERSION).is_ok());
   }

   #[test]
   fn test_direction_display() {
      assert_eq!(Direction::Upgrade.to_string(), "upgrade");
      assert_eq!(Direction::Downgrade.to_string(), "downgrade");
   }
}
