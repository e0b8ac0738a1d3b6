//! Storage ports the calculation engine runs against.

use chrono::{DateTime, NaiveDate, Utc};

use crate::event::TimeEvent;
use crate::summary::WeeklySummary;
use crate::types::EmployeeId;

/// A storage failure surfaced to the engine.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backing store could not be reached or operated on.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A stored row could not be decoded into its domain type.
    #[error("invalid stored data: {0}")]
    InvalidData(String),
}

/// Read access to raw time events.
///
/// This trait allows the engine to work with different event sources
/// (e.g., `Database` from tally-db, or test fixtures).
pub trait EventStore: Send + Sync {
    /// Returns an employee's events with `start <= timestamp < end`,
    /// ordered by timestamp ascending.
    fn list_events(
        &self,
        employee: &EmployeeId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<TimeEvent>, StoreError>;
}

/// Enumeration of the employees a batch run covers.
pub trait EmployeeDirectory: Send + Sync {
    /// Returns every known employee ID.
    fn list_employee_ids(&self) -> Result<Vec<EmployeeId>, StoreError>;
}

/// Persistence for computed weekly summaries.
pub trait SummaryStore: Send + Sync {
    /// Inserts the summary, or overwrites the row with the same
    /// `(employee, week_start)` key.
    fn upsert_summary(&self, summary: &WeeklySummary) -> Result<(), StoreError>;

    /// Returns an employee's stored summaries with
    /// `start <= week_start <= end`, ordered by week start ascending.
    fn list_summaries(
        &self,
        employee: &EmployeeId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<WeeklySummary>, StoreError>;
}
